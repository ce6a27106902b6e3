//! `SizeHint::classify` and `Cardinality::infer` boundary behavior, plus
//! `Relationship::dedup_key`'s order-independence.

use schema_grounder::{Cardinality, Relationship, SizeHint};

#[test]
fn size_hint_classifies_every_boundary() {
    assert_eq!(SizeHint::classify(0), SizeHint::Tiny);
    assert_eq!(SizeHint::classify(99), SizeHint::Tiny);
    assert_eq!(SizeHint::classify(100), SizeHint::Small);
    assert_eq!(SizeHint::classify(999), SizeHint::Small);
    assert_eq!(SizeHint::classify(1_000), SizeHint::Medium);
    assert_eq!(SizeHint::classify(9_999), SizeHint::Medium);
    assert_eq!(SizeHint::classify(10_000), SizeHint::Large);
    assert_eq!(SizeHint::classify(99_999), SizeHint::Large);
    assert_eq!(SizeHint::classify(100_000), SizeHint::Huge);
}

#[test]
fn cardinality_infers_many_to_one_above_a_five_to_one_ratio() {
    assert_eq!(Cardinality::infer(600, 100), Some(Cardinality::ManyToOne));
    assert_eq!(Cardinality::infer(501, 100), Some(Cardinality::ManyToOne));
}

#[test]
fn cardinality_infers_one_to_one_within_near_parity() {
    assert_eq!(Cardinality::infer(100, 100), Some(Cardinality::OneToOne));
    assert_eq!(Cardinality::infer(80, 100), Some(Cardinality::OneToOne));
    assert_eq!(Cardinality::infer(119, 100), Some(Cardinality::OneToOne));
}

#[test]
fn cardinality_infers_one_to_many_below_a_one_in_five_ratio() {
    assert_eq!(Cardinality::infer(19, 100), Some(Cardinality::OneToMany));
    assert_eq!(Cardinality::infer(1, 100), Some(Cardinality::OneToMany));
}

#[test]
fn cardinality_is_unset_in_the_ambiguous_middle_band() {
    assert_eq!(Cardinality::infer(250, 100), None);
    assert_eq!(Cardinality::infer(120, 100), None);
}

#[test]
fn cardinality_is_unset_when_the_target_has_no_rows() {
    assert_eq!(Cardinality::infer(100, 0), None);
}

#[test]
fn relationship_dedup_key_ignores_column_order() {
    let a = Relationship {
        table: "order_items".to_string(),
        from: vec!["order_id".to_string(), "product_id".to_string()],
        referenced_table: "order_product_prices".to_string(),
        to: vec!["order_id".to_string(), "product_id".to_string()],
    };
    let b = Relationship {
        table: "order_items".to_string(),
        from: vec!["product_id".to_string(), "order_id".to_string()],
        referenced_table: "order_product_prices".to_string(),
        to: vec!["product_id".to_string(), "order_id".to_string()],
    };
    assert_eq!(a.dedup_key(), b.dedup_key());
}
