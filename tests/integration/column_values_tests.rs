//! Exercises `ColumnValuesGrounding`'s three-tier priority directly against
//! a hand-built `GroundingContext`, bypassing table/constraint discovery so
//! the CHECK-vs-scan priority and abandon-on-unnormalizable-value semantics
//! can be asserted precisely.

use crate::common::mock::{Fixture, FixtureTable, MockExecutor};
use schema_grounder::dialects::sqlite::{self, SqliteOptions};
use schema_grounder::{
    AdapterOptions, CancellationToken, Column, ColumnKind, ColumnValuesConfig, ColumnValuesGrounding,
    ConstraintType, Grounding, GroundingContext, Table, TableConstraint,
};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

fn adapter_over(fixture: Fixture) -> schema_grounder::Adapter {
    let executor = Arc::new(MockExecutor::new(fixture));
    let options = AdapterOptions {
        executor,
        validator: None,
        groundings: vec![schema_grounder::info()],
    };
    sqlite::build(SqliteOptions::default(), options).expect("adapter construction should succeed")
}

#[tokio::test]
async fn check_constraint_wins_over_a_contradicting_low_cardinality_scan() {
    let mut fixture = Fixture::default();
    fixture.tables.push(FixtureTable {
        name: "orders",
        columns: vec![("status", "TEXT", false)],
        // The scan, if it ran, would see a different value set than the CHECK.
        distinct: HashMap::from([("status", vec![json!("shipped"), json!("returned")])]),
        row_count: 10,
        ..Default::default()
    });
    let adapter = adapter_over(fixture);

    let mut table = Table::new("orders", None);
    table.columns.push(Column::new("status", "TEXT"));
    table.constraints.push(TableConstraint {
        name: "orders_status_check".to_string(),
        constraint_type: ConstraintType::Check,
        columns: vec!["status".to_string()],
        definition: Some("status IN ('pending', 'completed')".to_string()),
        default_value: None,
        referenced_table: None,
        referenced_columns: Vec::new(),
    });
    let mut ctx = GroundingContext::new();
    ctx.tables.push(table);

    let grounding = ColumnValuesGrounding::new(ColumnValuesConfig::default());
    grounding
        .run(&adapter, &mut ctx, &CancellationToken::new())
        .await
        .expect("grounding should succeed");

    let status = ctx.table("orders").unwrap().columns.iter().find(|c| c.name == "status").unwrap();
    assert_eq!(status.kind, Some(ColumnKind::Enum));
    assert_eq!(status.values, vec!["pending".to_string(), "completed".to_string()]);
}

#[tokio::test]
async fn a_null_value_in_the_scan_abandons_the_whole_column() {
    let mut fixture = Fixture::default();
    fixture.tables.push(FixtureTable {
        name: "widgets",
        columns: vec![("color", "TEXT", false)],
        distinct: HashMap::from([("color", vec![json!("red"), json!(null), json!("blue")])]),
        row_count: 10,
        ..Default::default()
    });
    let adapter = adapter_over(fixture);

    let mut table = Table::new("widgets", None);
    table.columns.push(Column::new("color", "TEXT"));
    let mut ctx = GroundingContext::new();
    ctx.tables.push(table);

    let grounding = ColumnValuesGrounding::new(ColumnValuesConfig::default());
    grounding
        .run(&adapter, &mut ctx, &CancellationToken::new())
        .await
        .expect("grounding should succeed");

    let color = ctx.table("widgets").unwrap().columns.iter().find(|c| c.name == "color").unwrap();
    assert_eq!(color.kind, None);
    assert!(color.values.is_empty());
}

#[tokio::test]
async fn a_scan_over_the_low_cardinality_limit_yields_no_values() {
    let many: Vec<serde_json::Value> = (0..25).map(|i| json!(format!("v{i}"))).collect();
    let mut fixture = Fixture::default();
    fixture.tables.push(FixtureTable {
        name: "events",
        columns: vec![("kind", "TEXT", false)],
        distinct: HashMap::from([("kind", many)]),
        row_count: 1000,
        ..Default::default()
    });
    let adapter = adapter_over(fixture);

    let mut table = Table::new("events", None);
    table.columns.push(Column::new("kind", "TEXT"));
    let mut ctx = GroundingContext::new();
    ctx.tables.push(table);

    let grounding = ColumnValuesGrounding::new(ColumnValuesConfig { low_cardinality_limit: 20 });
    grounding
        .run(&adapter, &mut ctx, &CancellationToken::new())
        .await
        .expect("grounding should succeed");

    let kind = ctx.table("events").unwrap().columns.iter().find(|c| c.name == "kind").unwrap();
    assert_eq!(kind.kind, None);
    assert!(kind.values.is_empty());
}
