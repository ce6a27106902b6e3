//! `TableFilter` and `Depth` arm/boundary behavior.

use schema_grounder::{Depth, TableFilter};
use std::sync::Arc;

#[test]
fn list_filter_matches_only_listed_names() {
    let filter = TableFilter::List(vec!["customers".to_string(), "orders".to_string()]);
    assert!(filter.matches("customers"));
    assert!(!filter.matches("products"));
    assert!(filter.is_explicit_list());
    assert_eq!(filter.explicit_names(), Some(&["customers".to_string(), "orders".to_string()][..]));
}

#[test]
fn regex_filter_matches_by_pattern() {
    let filter = TableFilter::Regex(regex::Regex::new(r"^staging_").unwrap());
    assert!(filter.matches("staging_orders"));
    assert!(!filter.matches("orders"));
    assert!(!filter.is_explicit_list());
    assert_eq!(filter.explicit_names(), None);
}

#[test]
fn predicate_filter_delegates_to_the_closure() {
    let filter = TableFilter::Predicate(Arc::new(|name: &str| name.ends_with("_v2")));
    assert!(filter.matches("orders_v2"));
    assert!(!filter.matches("orders"));
}

#[test]
fn depth_none_never_traverses() {
    let depth = Depth::None;
    assert!(!depth.traverses());
    assert!(!depth.allows(0));
    assert!(!depth.allows(1));
}

#[test]
fn depth_unbounded_always_allows() {
    let depth = Depth::Unbounded;
    assert!(depth.traverses());
    assert!(depth.allows(0));
    assert!(depth.allows(1_000));
}

#[test]
fn depth_bounded_allows_up_to_and_including_the_limit() {
    let depth = Depth::Bounded(2);
    assert!(depth.traverses());
    assert!(depth.allows(0));
    assert!(depth.allows(1));
    assert!(depth.allows(2));
    assert!(!depth.allows(3));
}

#[test]
fn depth_default_is_none() {
    assert_eq!(Depth::default(), Depth::None);
}
