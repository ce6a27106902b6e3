//! Spreadsheet-backed SQLite dialect: reuses `SqliteAdapter` verbatim,
//! paired with an executor that answers the small, fixed set of queries
//! `SqliteAdapter` issues directly out of an in-memory synthetic catalog
//! instead of a live connection. The spreadsheet file parser that produces
//! the catalog is an external collaborator outside this crate's scope.

use super::{Adapter, AdapterOptions};
use super::sqlite::{SqliteAdapter, SqliteOptions};
use crate::error::Result;
use crate::executor::Executor;
use async_trait::async_trait;
use serde_json::{json, Value};

/// One sheet/table already parsed into rows by the external spreadsheet
/// collaborator.
#[derive(Debug, Clone)]
pub struct SyntheticTable {
    pub name: String,
    pub columns: Vec<String>,
    /// SQLite-typed-enough strings; the low-cardinality/stats groundings
    /// only ever need string-normalized values.
    pub rows: Vec<Vec<Value>>,
}

#[derive(Debug, Clone, Default)]
pub struct SyntheticCatalog {
    pub tables: Vec<SyntheticTable>,
}

impl SyntheticCatalog {
    fn table(&self, name: &str) -> Option<&SyntheticTable> {
        self.tables.iter().find(|t| t.name == name)
    }
}

/// Answers the fixed query vocabulary `SqliteAdapter` emits
/// (`sqlite_master` enumeration, `PRAGMA table_info`, `PRAGMA
/// foreign_key_list`, `PRAGMA index_list`, row counts, distinct scans, and
/// min/max/null-fraction aggregates) against an in-memory catalog rather
/// than a real connection.
pub struct SyntheticCatalogExecutor {
    catalog: SyntheticCatalog,
}

impl SyntheticCatalogExecutor {
    pub fn new(catalog: SyntheticCatalog) -> Self {
        SyntheticCatalogExecutor { catalog }
    }
}

fn quoted_name_after(sql: &str, marker: &str) -> Option<String> {
    let rest = sql.split_once(marker)?.1;
    let rest = rest.trim_start().strip_prefix('(')?;
    let rest = rest.trim_start().strip_prefix('"')?;
    let end = rest.find('"')?;
    Some(rest[..end].to_string())
}

#[async_trait]
impl Executor for SyntheticCatalogExecutor {
    async fn execute(&self, sql: &str) -> anyhow::Result<Value> {
        let trimmed = sql.trim();

        if trimmed.starts_with("SELECT name FROM sqlite_master WHERE type = 'table'") {
            let names: Vec<Value> = self
                .catalog
                .tables
                .iter()
                .map(|t| json!({ "name": t.name }))
                .collect();
            return Ok(Value::Array(names));
        }

        if trimmed.starts_with("SELECT name, sql FROM sqlite_master WHERE type = 'view'") {
            return Ok(Value::Array(Vec::new()));
        }

        if trimmed.starts_with("SELECT sql FROM sqlite_master WHERE type = 'table'") {
            // Synthetic spreadsheet tables have no backing CREATE TABLE text
            // to scan for CHECK clauses.
            return Ok(Value::Array(Vec::new()));
        }

        if trimmed.starts_with("PRAGMA table_info") {
            let name = quoted_name_after(trimmed, "table_info")
                .ok_or_else(|| anyhow::anyhow!("malformed PRAGMA table_info in {trimmed}"))?;
            let table = self
                .catalog
                .table(&name)
                .ok_or_else(|| anyhow::anyhow!("no such table: {name}"))?;
            let rows: Vec<Value> = table
                .columns
                .iter()
                .map(|c| json!({ "name": c, "type": "TEXT", "notnull": 0, "dflt_value": Value::Null, "pk": 0 }))
                .collect();
            return Ok(Value::Array(rows));
        }

        if trimmed.starts_with("PRAGMA foreign_key_list") || trimmed.starts_with("PRAGMA index_list") {
            // Synthetic spreadsheet tables carry no declared FKs or indexes.
            return Ok(Value::Array(Vec::new()));
        }

        if trimmed.starts_with("SELECT COUNT(*) AS count FROM") {
            let name = sql
                .rsplit('"')
                .nth(1)
                .ok_or_else(|| anyhow::anyhow!("malformed COUNT query in {trimmed}"))?;
            let table = self
                .catalog
                .table(name)
                .ok_or_else(|| anyhow::anyhow!("no such table: {name}"))?;
            return Ok(Value::Array(vec![json!({ "count": table.rows.len() })]));
        }

        if trimmed.starts_with("SELECT DISTINCT") {
            return self.answer_distinct(trimmed);
        }

        if trimmed.contains("null_count") {
            return self.answer_stats(trimmed);
        }

        Err(anyhow::anyhow!("unsupported synthetic query: {trimmed}"))
    }
}

impl SyntheticCatalogExecutor {
    fn column_index(table: &SyntheticTable, column: &str) -> Option<usize> {
        table.columns.iter().position(|c| c == column)
    }

    fn answer_distinct(&self, sql: &str) -> anyhow::Result<Value> {
        let (table_name, column) = extract_table_and_column(sql, "FROM")?;
        let table = self
            .catalog
            .table(&table_name)
            .ok_or_else(|| anyhow::anyhow!("no such table: {table_name}"))?;
        let idx = Self::column_index(table, &column)
            .ok_or_else(|| anyhow::anyhow!("no such column: {column}"))?;
        let mut seen = Vec::new();
        for row in &table.rows {
            let v = &row[idx];
            if v.is_null() {
                continue;
            }
            if !seen.contains(v) {
                seen.push(v.clone());
            }
        }
        let rows: Vec<Value> = seen.into_iter().map(|v| json!({ column.clone(): v })).collect();
        Ok(Value::Array(rows))
    }

    fn answer_stats(&self, sql: &str) -> anyhow::Result<Value> {
        let (table_name, column) = extract_table_and_column(sql, "FROM")?;
        let table = self
            .catalog
            .table(&table_name)
            .ok_or_else(|| anyhow::anyhow!("no such table: {table_name}"))?;
        let idx = Self::column_index(table, &column)
            .ok_or_else(|| anyhow::anyhow!("no such column: {column}"))?;
        let mut values: Vec<&Value> = Vec::new();
        let mut null_count = 0i64;
        for row in &table.rows {
            if row[idx].is_null() {
                null_count += 1;
            } else {
                values.push(&row[idx]);
            }
        }
        let to_text = |v: &Value| -> String {
            match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            }
        };
        let min_value = values.iter().map(|v| to_text(v)).min();
        let max_value = values.iter().map(|v| to_text(v)).max();
        Ok(Value::Array(vec![json!({
            "min_value": min_value,
            "max_value": max_value,
            "null_count": null_count,
            "total_count": table.rows.len(),
        })]))
    }
}

/// Pulls `table` and `column` out of a `... "column" FROM table ...` shaped
/// query built by `DialectAdapter::quote_identifier`/`build_distinct_query`
/// (column quoted, table bare — `build_distinct_query`'s default impl and
/// `SqliteAdapter::fetch_column_stats` never quote the table name).
fn extract_table_and_column(sql: &str, from_marker: &str) -> anyhow::Result<(String, String)> {
    let from_idx = sql
        .find(from_marker)
        .ok_or_else(|| anyhow::anyhow!("missing FROM in {sql}"))?;
    let before = &sql[..from_idx];
    let after = &sql[from_idx + from_marker.len()..];
    let column = before
        .rsplit('"')
        .nth(1)
        .ok_or_else(|| anyhow::anyhow!("malformed column reference in {sql}"))?
        .to_string();
    let table = after
        .trim_start()
        .split(|c: char| c == ' ' || c == '"')
        .find(|s| !s.is_empty())
        .ok_or_else(|| anyhow::anyhow!("malformed table reference in {sql}"))?
        .to_string();
    Ok((table, column))
}

/// Builds a `SqliteAdapter` over a synthetic catalog executor; the caller
/// composes the rest (`Executor`, groundings) through `AdapterOptions` as
/// with any other dialect.
pub fn synthetic_executor(catalog: SyntheticCatalog) -> SyntheticCatalogExecutor {
    SyntheticCatalogExecutor::new(catalog)
}

pub fn adapter() -> SqliteAdapter {
    SqliteAdapter::new(SqliteOptions::default())
}

/// Builds an `Adapter` over the spreadsheet-backed dialect. `adapter_options.executor`
/// must already be a `synthetic_executor` built from the caller's parsed catalog;
/// this only wires in the SQLite dialect hooks, identically to `sqlite::build`.
pub fn build(adapter_options: AdapterOptions) -> Result<Adapter> {
    Adapter::new(std::sync::Arc::new(adapter()), adapter_options)
}
