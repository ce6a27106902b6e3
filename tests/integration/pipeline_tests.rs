//! End-to-end pipeline tests: a full `Adapter::introspect()` run against the
//! mock SQLite executor, exercising chain traversal, composite foreign keys,
//! row-count-derived size hints, index annotation, and low-cardinality
//! value resolution together, the way a caller would actually use the crate.

use crate::common::mock::{sample_fixture, MockExecutor};
use schema_grounder::dialects::sqlite::{self, SqliteOptions};
use schema_grounder::{
    column_values, constraints, indexes, info, row_count, tables, views, AdapterOptions, ColumnValuesConfig,
    Depth, Fragment, TableFilter, TablesConfig, ViewsConfig,
};
use std::sync::Arc;

fn build_adapter(seed: &[&str], forward: Depth, backward: Depth) -> schema_grounder::Adapter {
    let fixture = sample_fixture();
    let executor = Arc::new(MockExecutor::new(fixture));
    let options = AdapterOptions {
        executor,
        validator: None,
        groundings: vec![
            info(),
            tables(TablesConfig {
                filter: TableFilter::List(seed.iter().map(|s| s.to_string()).collect()),
                forward,
                backward,
            }),
            row_count(),
            indexes(),
            constraints(),
            column_values(ColumnValuesConfig::default()),
            views(ViewsConfig::default()),
        ],
    };
    sqlite::build(SqliteOptions::default(), options).expect("adapter construction should succeed")
}

fn find_table<'a>(fragments: &'a [Fragment], name: &str) -> &'a Fragment {
    fragments
        .iter()
        .find(|f| matches!(f, Fragment::Table { name: n, .. } if n == name))
        .unwrap_or_else(|| panic!("no table fragment named {name}"))
}

#[tokio::test]
async fn bounded_forward_traversal_stops_at_depth() {
    let adapter = build_adapter(&["t_d"], Depth::Bounded(2), Depth::None);
    let fragments = adapter.introspect().await.expect("introspect should succeed");

    // t_d -> t_c (depth 1) -> t_b (depth 2); t_a (depth 3) must not appear.
    assert!(fragments.iter().any(|f| matches!(f, Fragment::Table { name, .. } if name == "t_d")));
    assert!(fragments.iter().any(|f| matches!(f, Fragment::Table { name, .. } if name == "t_c")));
    assert!(fragments.iter().any(|f| matches!(f, Fragment::Table { name, .. } if name == "t_b")));
    assert!(!fragments.iter().any(|f| matches!(f, Fragment::Table { name, .. } if name == "t_a")));
}

#[tokio::test]
async fn unbounded_forward_traversal_reaches_the_whole_chain() {
    let adapter = build_adapter(&["t_d"], Depth::Unbounded, Depth::None);
    let fragments = adapter.introspect().await.expect("introspect should succeed");

    for name in ["t_d", "t_c", "t_b", "t_a"] {
        assert!(
            fragments.iter().any(|f| matches!(f, Fragment::Table { name: n, .. } if n == name)),
            "expected {name} to be discovered"
        );
    }
}

#[tokio::test]
async fn composite_foreign_key_is_recorded_as_one_relationship() {
    let adapter = build_adapter(&["order_items"], Depth::Unbounded, Depth::None);
    let fragments = adapter.introspect().await.expect("introspect should succeed");

    let rels: Vec<&Fragment> = fragments.iter().filter(|f| matches!(f, Fragment::Relationship { .. })).collect();
    assert_eq!(rels.len(), 1, "the two-column FK must dedup into a single relationship fragment");

    match rels[0] {
        Fragment::Relationship { from, to, cardinality } => {
            assert_eq!(from.table, "order_items");
            assert_eq!(from.columns, vec!["order_id".to_string(), "product_id".to_string()]);
            assert_eq!(to.table, "order_product_prices");
            assert_eq!(to.columns, vec!["order_id".to_string(), "product_id".to_string()]);
            // order_items and order_product_prices both have row_count 3000.
            assert_eq!(*cardinality, Some(schema_grounder::Cardinality::OneToOne));
        }
        _ => unreachable!(),
    }
}

#[tokio::test]
async fn row_count_drives_size_hint_classification() {
    let adapter = build_adapter(&["t_a", "t_b", "t_c", "t_d"], Depth::None, Depth::None);
    let fragments = adapter.introspect().await.expect("introspect should succeed");

    let hint_of = |name: &str| match find_table(&fragments, name) {
        Fragment::Table { size_hint, .. } => size_hint.expect("size hint should be set"),
        _ => unreachable!(),
    };
    assert_eq!(hint_of("t_a"), schema_grounder::SizeHint::Tiny); // 10
    assert_eq!(hint_of("t_b"), schema_grounder::SizeHint::Tiny); // 99
    assert_eq!(hint_of("t_c"), schema_grounder::SizeHint::Medium); // 1000
    assert_eq!(hint_of("t_d"), schema_grounder::SizeHint::Huge); // 100000
}

#[tokio::test]
async fn index_columns_are_flagged_on_the_table() {
    let adapter = build_adapter(&["orders"], Depth::None, Depth::None);
    let fragments = adapter.introspect().await.expect("introspect should succeed");

    match find_table(&fragments, "orders") {
        Fragment::Table { columns, indexes, .. } => {
            let customer_id = columns.iter().find(|c| c.name == "customer_id").unwrap();
            assert!(customer_id.indexed);
            let amount = columns.iter().find(|c| c.name == "amount").unwrap();
            assert!(!amount.indexed);
            assert!(indexes.is_some());
        }
        _ => unreachable!(),
    }
}

#[tokio::test]
async fn low_cardinality_scan_populates_enum_like_values() {
    let adapter = build_adapter(&["customers"], Depth::None, Depth::None);
    let fragments = adapter.introspect().await.expect("introspect should succeed");

    match find_table(&fragments, "customers") {
        Fragment::Table { columns, .. } => {
            let status = columns.iter().find(|c| c.name == "status").unwrap();
            assert_eq!(status.kind, Some(schema_grounder::ColumnKind::LowCardinality));
            assert_eq!(status.values.len(), 3);
            assert!(status.values.contains(&"active".to_string()));

            let name = columns.iter().find(|c| c.name == "name").unwrap();
            assert!(name.values.is_empty(), "unconstrained text column should get no values");
        }
        _ => unreachable!(),
    }
}

#[tokio::test]
async fn view_is_emitted_with_its_definition() {
    let adapter = build_adapter(&["customers"], Depth::None, Depth::None);
    let fragments = adapter.introspect().await.expect("introspect should succeed");

    let view = fragments
        .iter()
        .find(|f| matches!(f, Fragment::View { name, .. } if name == "active_customers"))
        .expect("active_customers view should be emitted");
    match view {
        Fragment::View { definition, .. } => {
            assert_eq!(definition.as_deref(), Some("SELECT * FROM customers WHERE status = 'active'"));
        }
        _ => unreachable!(),
    }
}

#[tokio::test]
async fn primary_key_columns_are_marked_not_null_without_a_separate_constraint() {
    let adapter = build_adapter(&["order_items"], Depth::None, Depth::None);
    let fragments = adapter.introspect().await.expect("introspect should succeed");

    match find_table(&fragments, "order_items") {
        Fragment::Table { columns, constraints, .. } => {
            let order_id = columns.iter().find(|c| c.name == "order_id").unwrap();
            assert!(order_id.pk);
            assert!(order_id.not_null);
            // PK-implies-NOT-NULL is absorbed into the column flags; no
            // separate NOT_NULL constraint should survive for a PK column.
            let has_redundant_not_null = constraints
                .iter()
                .flatten()
                .any(|c| c.constraint_type == schema_grounder::ConstraintType::NotNull);
            assert!(!has_redundant_not_null);
        }
        _ => unreachable!(),
    }
}
