//! In-memory `Executor` answering the fixed SQL vocabulary `SqliteAdapter`
//! issues, grounded in `adapter::spreadsheet::SyntheticCatalogExecutor`'s
//! technique: pattern-match the query shape, then extract the table/column
//! name(s) it was built from, rather than a real connection.

use async_trait::async_trait;
use schema_grounder::Executor;
use serde_json::{json, Value};
use std::collections::HashMap;

#[derive(Clone, Default)]
pub struct FixtureFk {
    pub columns: Vec<&'static str>,
    pub ref_table: &'static str,
    pub ref_columns: Vec<&'static str>,
}

#[derive(Clone, Default)]
pub struct FixtureIndex {
    pub name: &'static str,
    pub columns: Vec<&'static str>,
    pub unique: bool,
}

#[derive(Clone, Default)]
pub struct FixtureTable {
    pub name: &'static str,
    /// (column name, sqlite type, is primary key)
    pub columns: Vec<(&'static str, &'static str, bool)>,
    pub fks: Vec<FixtureFk>,
    pub indexes: Vec<FixtureIndex>,
    pub row_count: u64,
    /// answers for `SELECT DISTINCT` low-cardinality scans
    pub distinct: HashMap<&'static str, Vec<Value>>,
    /// (min, max, null_count) per column; total_count comes from `row_count`
    pub stats: HashMap<&'static str, (Option<String>, Option<String>, i64)>,
    /// columns reported as `notnull = 1` by `PRAGMA table_info`
    pub not_null: Vec<&'static str>,
    /// columns reported with a `dflt_value` by `PRAGMA table_info`
    pub defaults: HashMap<&'static str, &'static str>,
    /// raw `CREATE TABLE` text, answered for the `sqlite_master` DDL scan
    /// `fetch_constraints` uses to recover CHECK clauses
    pub ddl: Option<&'static str>,
}

#[derive(Clone, Default)]
pub struct FixtureView {
    pub name: &'static str,
    pub definition: &'static str,
}

#[derive(Clone, Default)]
pub struct Fixture {
    pub tables: Vec<FixtureTable>,
    pub views: Vec<FixtureView>,
}

impl Fixture {
    fn table(&self, name: &str) -> Option<&FixtureTable> {
        self.tables.iter().find(|t| t.name == name)
    }
}

pub struct MockExecutor {
    fixture: Fixture,
}

impl MockExecutor {
    pub fn new(fixture: Fixture) -> Self {
        MockExecutor { fixture }
    }
}

fn quoted_name_in(sql: &str) -> Option<&str> {
    let start = sql.find('"')? + 1;
    let end = start + sql[start..].find('"')?;
    Some(&sql[start..end])
}

fn table_after_from(sql: &str) -> Option<&str> {
    let idx = sql.rfind(" FROM ")?;
    let rest = sql[idx + 6..].trim();
    let name = rest.split(|c: char| c == ' ' || c == '"').find(|s| !s.is_empty())?;
    Some(name)
}

#[async_trait]
impl Executor for MockExecutor {
    async fn execute(&self, sql: &str) -> anyhow::Result<Value> {
        let trimmed = sql.trim();

        if trimmed.contains("sqlite_version()") {
            return Ok(Value::Array(vec![json!({ "version": "3.44.0" })]));
        }

        if trimmed.starts_with("SELECT sql FROM sqlite_master WHERE type = 'table'") {
            let name = trimmed
                .rsplit('\'')
                .nth(1)
                .ok_or_else(|| anyhow::anyhow!("malformed ddl query: {trimmed}"))?;
            let ddl = self.fixture.table(name).and_then(|t| t.ddl);
            return Ok(Value::Array(vec![json!({ "sql": ddl })]));
        }

        if trimmed.contains("type = 'table'") {
            let rows: Vec<Value> = self.fixture.tables.iter().map(|t| json!({ "name": t.name })).collect();
            return Ok(Value::Array(rows));
        }

        if trimmed.contains("type = 'view'") {
            let rows: Vec<Value> = self
                .fixture
                .views
                .iter()
                .map(|v| json!({ "name": v.name, "sql": v.definition }))
                .collect();
            return Ok(Value::Array(rows));
        }

        if trimmed.starts_with("PRAGMA table_info") {
            let name = quoted_name_in(trimmed).ok_or_else(|| anyhow::anyhow!("malformed table_info: {trimmed}"))?;
            let table = self
                .fixture
                .table(name)
                .ok_or_else(|| anyhow::anyhow!("no such table: {name}"))?;
            let rows: Vec<Value> = table
                .columns
                .iter()
                .map(|(col, ty, pk)| {
                    json!({
                        "name": col,
                        "type": ty,
                        "notnull": if table.not_null.contains(col) { 1 } else { 0 },
                        "dflt_value": table.defaults.get(col),
                        "pk": if *pk { 1 } else { 0 },
                    })
                })
                .collect();
            return Ok(Value::Array(rows));
        }

        if trimmed.starts_with("PRAGMA foreign_key_list") {
            let name = quoted_name_in(trimmed).ok_or_else(|| anyhow::anyhow!("malformed fk_list: {trimmed}"))?;
            let table = self
                .fixture
                .table(name)
                .ok_or_else(|| anyhow::anyhow!("no such table: {name}"))?;
            let mut rows = Vec::new();
            for (id, fk) in table.fks.iter().enumerate() {
                for (seq, (from, to)) in fk.columns.iter().zip(fk.ref_columns.iter()).enumerate() {
                    rows.push(json!({
                        "id": id as i64,
                        "seq": seq as i64,
                        "table": fk.ref_table,
                        "from": from,
                        "to": to,
                    }));
                }
            }
            return Ok(Value::Array(rows));
        }

        if trimmed.starts_with("PRAGMA index_list") {
            let name = quoted_name_in(trimmed).ok_or_else(|| anyhow::anyhow!("malformed index_list: {trimmed}"))?;
            let table = self
                .fixture
                .table(name)
                .ok_or_else(|| anyhow::anyhow!("no such table: {name}"))?;
            let rows: Vec<Value> = table
                .indexes
                .iter()
                .map(|idx| json!({ "name": idx.name, "unique": if idx.unique { 1 } else { 0 } }))
                .collect();
            return Ok(Value::Array(rows));
        }

        if trimmed.starts_with("PRAGMA index_info") {
            let idx_name = quoted_name_in(trimmed).ok_or_else(|| anyhow::anyhow!("malformed index_info: {trimmed}"))?;
            for table in &self.fixture.tables {
                if let Some(idx) = table.indexes.iter().find(|i| i.name == idx_name) {
                    let rows: Vec<Value> = idx.columns.iter().map(|c| json!({ "name": c })).collect();
                    return Ok(Value::Array(rows));
                }
            }
            return Ok(Value::Array(Vec::new()));
        }

        if trimmed.starts_with("SELECT COUNT(*) AS count FROM") {
            let name = quoted_name_in(trimmed).ok_or_else(|| anyhow::anyhow!("malformed count: {trimmed}"))?;
            let table = self
                .fixture
                .table(name)
                .ok_or_else(|| anyhow::anyhow!("no such table: {name}"))?;
            return Ok(Value::Array(vec![json!({ "count": table.row_count })]));
        }

        if trimmed.starts_with("SELECT DISTINCT") {
            let col = quoted_name_in(trimmed).ok_or_else(|| anyhow::anyhow!("malformed distinct: {trimmed}"))?;
            let table_name = table_after_from(trimmed).ok_or_else(|| anyhow::anyhow!("malformed distinct: {trimmed}"))?;
            let table = self
                .fixture
                .table(table_name)
                .ok_or_else(|| anyhow::anyhow!("no such table: {table_name}"))?;
            let values = table.distinct.get(col).cloned().unwrap_or_default();
            let rows: Vec<Value> = values.into_iter().map(|v| json!({ "value": v })).collect();
            return Ok(Value::Array(rows));
        }

        if trimmed.starts_with("SELECT CAST(MIN(") {
            let col = quoted_name_in(trimmed).ok_or_else(|| anyhow::anyhow!("malformed stats: {trimmed}"))?;
            let table_name = table_after_from(trimmed).ok_or_else(|| anyhow::anyhow!("malformed stats: {trimmed}"))?;
            let table = self
                .fixture
                .table(table_name)
                .ok_or_else(|| anyhow::anyhow!("no such table: {table_name}"))?;
            let (min, max, null_count) = table.stats.get(col).cloned().unwrap_or((None, None, 0));
            return Ok(Value::Array(vec![json!({
                "min_value": min,
                "max_value": max,
                "null_count": null_count,
                "total_count": table.row_count,
            })]));
        }

        Err(anyhow::anyhow!("unsupported mock query: {trimmed}"))
    }
}

/// A chain `t_a <- t_b <- t_c <- t_d` (each `prev_id` FK points at its
/// parent), a `customers`/`orders` many-to-one pair, and a composite-FK pair
/// `order_items` -> `order_product_prices`, sized to exercise every
/// `SizeHint` boundary and both `Cardinality::infer` bands.
pub fn sample_fixture() -> Fixture {
    Fixture {
        tables: vec![
            FixtureTable {
                name: "t_a",
                columns: vec![("id", "INTEGER", true)],
                row_count: 10,
                ..Default::default()
            },
            FixtureTable {
                name: "t_b",
                columns: vec![("id", "INTEGER", true), ("a_id", "INTEGER", false)],
                fks: vec![FixtureFk {
                    columns: vec!["a_id"],
                    ref_table: "t_a",
                    ref_columns: vec!["id"],
                }],
                row_count: 99,
                ..Default::default()
            },
            FixtureTable {
                name: "t_c",
                columns: vec![("id", "INTEGER", true), ("b_id", "INTEGER", false)],
                fks: vec![FixtureFk {
                    columns: vec!["b_id"],
                    ref_table: "t_b",
                    ref_columns: vec!["id"],
                }],
                row_count: 1_000,
                ..Default::default()
            },
            FixtureTable {
                name: "t_d",
                columns: vec![("id", "INTEGER", true), ("c_id", "INTEGER", false)],
                fks: vec![FixtureFk {
                    columns: vec!["c_id"],
                    ref_table: "t_c",
                    ref_columns: vec!["id"],
                }],
                row_count: 100_000,
                ..Default::default()
            },
            FixtureTable {
                name: "customers",
                columns: vec![("id", "INTEGER", true), ("name", "TEXT", false), ("status", "TEXT", false)],
                row_count: 100,
                distinct: HashMap::from([(
                    "status",
                    vec![json!("active"), json!("inactive"), json!("pending")],
                )]),
                ..Default::default()
            },
            FixtureTable {
                name: "orders",
                columns: vec![
                    ("id", "INTEGER", true),
                    ("customer_id", "INTEGER", false),
                    ("amount", "REAL", false),
                ],
                fks: vec![FixtureFk {
                    columns: vec!["customer_id"],
                    ref_table: "customers",
                    ref_columns: vec!["id"],
                }],
                indexes: vec![FixtureIndex {
                    name: "idx_orders_customer",
                    columns: vec!["customer_id"],
                    unique: false,
                }],
                row_count: 5_000,
                stats: HashMap::from([("amount", (Some("0.5".to_string()), Some("999.99".to_string()), 3))]),
                ..Default::default()
            },
            FixtureTable {
                name: "order_product_prices",
                columns: vec![
                    ("order_id", "INTEGER", true),
                    ("product_id", "INTEGER", true),
                    ("price", "REAL", false),
                ],
                row_count: 3_000,
                ..Default::default()
            },
            FixtureTable {
                name: "order_items",
                columns: vec![
                    ("order_id", "INTEGER", true),
                    ("product_id", "INTEGER", true),
                    ("qty", "INTEGER", false),
                ],
                fks: vec![FixtureFk {
                    columns: vec!["order_id", "product_id"],
                    ref_table: "order_product_prices",
                    ref_columns: vec!["order_id", "product_id"],
                }],
                row_count: 3_000,
                ..Default::default()
            },
        ],
        views: vec![FixtureView {
            name: "active_customers",
            definition: "SELECT * FROM customers WHERE status = 'active'",
        }],
    }
}
