//! `fetch_constraints` end-to-end: NOT NULL / DEFAULT synthesized from
//! `PRAGMA table_info` flags, and CHECK clauses recovered from raw
//! `CREATE TABLE` text, the way `SqliteAdapter` actually issues queries.

use crate::common::mock::{Fixture, FixtureTable, MockExecutor};
use schema_grounder::dialects::sqlite::{self, SqliteOptions};
use schema_grounder::{
    constraints, info, tables, AdapterOptions, ConstraintType, Depth, Fragment, TableFilter, TablesConfig,
};
use std::sync::Arc;

fn build_adapter(fixture: Fixture, seed: &[&str]) -> schema_grounder::Adapter {
    let executor = Arc::new(MockExecutor::new(fixture));
    let options = AdapterOptions {
        executor,
        validator: None,
        groundings: vec![
            info(),
            tables(TablesConfig {
                filter: TableFilter::List(seed.iter().map(|s| s.to_string()).collect()),
                forward: Depth::None,
                backward: Depth::None,
            }),
            constraints(),
        ],
    };
    sqlite::build(SqliteOptions::default(), options).expect("adapter construction should succeed")
}

fn constraint_fragments<'a>(fragments: &'a [Fragment], table: &str) -> &'a [schema_grounder::ConstraintFragment] {
    fragments
        .iter()
        .find_map(|f| match f {
            Fragment::Table { name, constraints, .. } if name == table => {
                Some(constraints.as_deref().unwrap_or(&[]))
            }
            _ => None,
        })
        .unwrap_or_else(|| panic!("no table fragment named {table}"))
}

#[tokio::test]
async fn not_null_and_default_columns_surface_as_column_flags_not_constraints() {
    let mut fixture = Fixture::default();
    fixture.tables.push(FixtureTable {
        name: "widgets",
        columns: vec![("id", "INTEGER", true), ("name", "TEXT", false), ("color", "TEXT", false)],
        not_null: vec!["name"],
        defaults: std::collections::HashMap::from([("color", "'unknown'")]),
        row_count: 5,
        ..Default::default()
    });
    let adapter = build_adapter(fixture, &["widgets"]);
    let fragments = adapter.introspect().await.expect("introspect should succeed");

    let table = fragments
        .iter()
        .find_map(|f| match f {
            Fragment::Table { name, columns, .. } if name == "widgets" => Some(columns),
            _ => None,
        })
        .expect("widgets table fragment");

    let name_col = table.iter().find(|c| c.name == "name").unwrap();
    assert!(name_col.not_null);
    let color_col = table.iter().find(|c| c.name == "color").unwrap();
    assert_eq!(color_col.default.as_deref(), Some("'unknown'"));

    // NOT NULL/DEFAULT are absorbed into column flags; they never survive as
    // separate constraint fragments.
    let cs = constraint_fragments(&fragments, "widgets");
    assert!(cs.iter().all(|c| c.constraint_type != ConstraintType::NotNull));
    assert!(cs.iter().all(|c| c.constraint_type != ConstraintType::Default));
}

#[tokio::test]
async fn check_clause_is_recovered_from_raw_create_table_text() {
    let mut fixture = Fixture::default();
    fixture.tables.push(FixtureTable {
        name: "orders",
        columns: vec![("id", "INTEGER", true), ("status", "TEXT", false)],
        ddl: Some(
            "CREATE TABLE orders (id INTEGER PRIMARY KEY, status TEXT CHECK (status IN ('pending', 'shipped')))",
        ),
        row_count: 5,
        ..Default::default()
    });
    let adapter = build_adapter(fixture, &["orders"]);
    let fragments = adapter.introspect().await.expect("introspect should succeed");

    let cs = constraint_fragments(&fragments, "orders");
    let check = cs
        .iter()
        .find(|c| c.constraint_type == ConstraintType::Check)
        .expect("CHECK constraint should be recovered from the DDL scan");
    assert_eq!(check.definition.as_deref(), Some("status IN ('pending', 'shipped')"));
}

#[tokio::test]
async fn table_with_no_ddl_text_yields_no_check_constraints() {
    let mut fixture = Fixture::default();
    fixture.tables.push(FixtureTable {
        name: "plain",
        columns: vec![("id", "INTEGER", true)],
        row_count: 1,
        ..Default::default()
    });
    let adapter = build_adapter(fixture, &["plain"]);
    let fragments = adapter.introspect().await.expect("introspect should succeed");

    let cs = constraint_fragments(&fragments, "plain");
    assert!(cs.iter().all(|c| c.constraint_type != ConstraintType::Check));
}
