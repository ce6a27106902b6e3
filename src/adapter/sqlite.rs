//! SQLite dialect adapter (and the spreadsheet-backed dialect's transport,
//! via `SqliteAdapter::new` over a synthetic-rows executor). Grounded in
//! `sqlite_master` + `PRAGMA table_info` / `PRAGMA foreign_key_list` /
//! `PRAGMA index_list`, since SQLite has no `information_schema`.

use super::{Adapter, AdapterOptions, DialectAdapter};
use crate::error::{ErrorKind, Result};
use crate::executor::{run_query, Executor};
use crate::model::{Column, ColumnStats, Relationship, Table, TableConstraint, TableIndex, View};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::OnceCell;

#[derive(Debug, Clone, Default)]
pub struct SqliteOptions {
    /// SQLite has no schema concept; present for interface symmetry only.
    pub schemas: Option<Vec<String>>,
}

pub struct SqliteAdapter {
    #[allow(dead_code)]
    options: SqliteOptions,
    // SQLite cannot enumerate reverse FKs directly: the backward grounding
    // hook scans every table's outgoing FKs once and filters. Built lazily
    // on first use, then reused for the rest of the run.
    reverse_fk_cache: OnceCell<HashMap<String, Vec<FkEdge>>>,
}

#[derive(Clone)]
struct FkEdge {
    constraint_id: i64,
    source_table: String,
    column_name: String,
    seq: i64,
    referenced_table: String,
    referenced_column: String,
}

impl SqliteAdapter {
    pub fn new(options: SqliteOptions) -> Self {
        SqliteAdapter {
            options,
            reverse_fk_cache: OnceCell::new(),
        }
    }

    async fn reverse_fk_index(
        &self,
        executor: &dyn Executor,
    ) -> anyhow::Result<&HashMap<String, Vec<FkEdge>>> {
        self.reverse_fk_cache
            .get_or_try_init(|| async {
                let names = self.get_all_table_names(executor).await?;
                let mut index: HashMap<String, Vec<FkEdge>> = HashMap::new();
                for table in names {
                    let sql = format!("PRAGMA foreign_key_list(\"{table}\")");
                    let rows: Vec<FkListRow> = run_query(executor, "reverse_fk_scan", &sql).await?;
                    for row in rows {
                        index.entry(row.table.clone()).or_default().push(FkEdge {
                            constraint_id: row.id,
                            source_table: table.clone(),
                            column_name: row.from,
                            seq: row.seq,
                            referenced_table: row.table,
                            referenced_column: row.to,
                        });
                    }
                }
                anyhow::Ok(index)
            })
            .await
    }
}

static ERROR_PATTERNS: &[(&str, ErrorKind, &str)] = &[
    (
        "no such table",
        ErrorKind::MissingTable,
        "check the table name; SQLite has no schema-qualified names",
    ),
    (
        "no such column",
        ErrorKind::InvalidColumn,
        "verify the column name and its owning table",
    ),
    (
        "syntax error",
        ErrorKind::SyntaxError,
        "check for unbalanced parentheses or a missing keyword",
    ),
    (
        "no such function",
        ErrorKind::InvalidFunction,
        "verify the function name; SQLite's built-in function set is limited",
    ),
    (
        "constraint failed",
        ErrorKind::ConstraintError,
        "the statement violates a constraint on the target table",
    ),
];

#[derive(Deserialize)]
struct NameRow {
    name: String,
}

#[derive(Deserialize)]
struct TableInfoRow {
    name: String,
    #[serde(rename = "type")]
    data_type: String,
    #[serde(default)]
    notnull: i64,
    #[serde(default)]
    dflt_value: Option<String>,
    pk: i64,
}

#[derive(Deserialize)]
struct TableDdlRow {
    sql: Option<String>,
}

#[derive(Deserialize)]
struct FkListRow {
    id: i64,
    seq: i64,
    table: String,
    from: String,
    to: String,
}

#[derive(Deserialize)]
struct IndexListRow {
    name: String,
    unique: i64,
}

#[derive(Deserialize)]
struct IndexInfoRow {
    name: Option<String>,
}

#[derive(Deserialize)]
struct CountRow {
    count: i64,
}

#[derive(Deserialize)]
struct StatsRow {
    min_value: Option<String>,
    max_value: Option<String>,
    null_count: i64,
    total_count: i64,
}

#[derive(Deserialize)]
struct ViewRow {
    name: String,
    sql: Option<String>,
}

#[async_trait]
impl DialectAdapter for SqliteAdapter {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn default_schema(&self) -> &str {
        "main"
    }

    fn quote_identifier(&self, name: &str) -> String {
        name.split('.')
            .map(|segment| format!("\"{}\"", segment.replace('"', "\"\"")))
            .collect::<Vec<_>>()
            .join(".")
    }

    fn parse_table_name(&self, name: &str) -> (String, String) {
        // SQLite has no real schema namespace; treat the whole name as the table.
        (self.default_schema().to_string(), name.to_string())
    }

    fn build_sample_rows_query(&self, table: &str, columns: Option<&[String]>, limit: u32) -> String {
        let cols = columns
            .map(|c| c.join(", "))
            .unwrap_or_else(|| "*".to_string());
        format!("SELECT {cols} FROM {table} LIMIT {limit}")
    }

    async fn collect_info(&self, executor: &dyn Executor) -> anyhow::Result<crate::model::DialectInfo> {
        #[derive(Deserialize)]
        struct InfoRow {
            version: String,
        }
        let rows: Vec<InfoRow> = run_query(executor, "collect_info", "SELECT sqlite_version() AS version").await?;
        Ok(crate::model::DialectInfo {
            dialect: "sqlite".to_string(),
            version: rows.into_iter().next().map(|r| r.version),
            database: None,
            details: std::collections::BTreeMap::new(),
        })
    }

    async fn get_all_table_names(&self, executor: &dyn Executor) -> anyhow::Result<Vec<String>> {
        let sql = "SELECT name FROM sqlite_master WHERE type = 'table' AND name != 'sqlite_sequence' ORDER BY name";
        let rows: Vec<NameRow> = run_query(executor, "get_all_table_names", sql).await?;
        Ok(rows.into_iter().map(|r| r.name).collect())
    }

    async fn get_table(&self, executor: &dyn Executor, name: &str) -> anyhow::Result<Table> {
        let sql = format!("PRAGMA table_info(\"{name}\")");
        let rows: Vec<TableInfoRow> = run_query(executor, "get_table", &sql).await?;
        let mut t = Table::new(name, None);
        t.columns = rows
            .into_iter()
            .map(|r| Column::new(r.name, r.data_type))
            .collect();
        Ok(t)
    }

    async fn find_outgoing_relations(
        &self,
        executor: &dyn Executor,
        name: &str,
    ) -> anyhow::Result<Vec<Relationship>> {
        let sql = format!("PRAGMA foreign_key_list(\"{name}\")");
        let rows: Vec<FkListRow> = run_query(executor, "find_outgoing_relations", &sql).await?;
        let mut by_id: BTreeMap<i64, Vec<FkListRow>> = BTreeMap::new();
        for row in rows {
            by_id.entry(row.id).or_default().push(row);
        }
        Ok(by_id
            .into_values()
            .map(|mut group| {
                group.sort_by_key(|r| r.seq);
                Relationship {
                    table: name.to_string(),
                    from: group.iter().map(|r| r.from.clone()).collect(),
                    referenced_table: group[0].table.clone(),
                    to: group.iter().map(|r| r.to.clone()).collect(),
                }
            })
            .collect())
    }

    async fn find_incoming_relations(
        &self,
        executor: &dyn Executor,
        name: &str,
    ) -> anyhow::Result<Vec<Relationship>> {
        let index = self.reverse_fk_index(executor).await?;
        let Some(edges) = index.get(name) else {
            return Ok(Vec::new());
        };
        let mut by_source_and_id: BTreeMap<(String, i64), Vec<FkEdge>> = BTreeMap::new();
        for edge in edges {
            by_source_and_id
                .entry((edge.source_table.clone(), edge.constraint_id))
                .or_default()
                .push(edge.clone());
        }
        Ok(by_source_and_id
            .into_values()
            .map(|mut group| {
                group.sort_by_key(|e| e.seq);
                Relationship {
                    table: group[0].source_table.clone(),
                    from: group.iter().map(|e| e.column_name.clone()).collect(),
                    referenced_table: name.to_string(),
                    to: group.iter().map(|e| e.referenced_column.clone()).collect(),
                }
            })
            .collect())
    }

    async fn list_views(&self, executor: &dyn Executor) -> anyhow::Result<Vec<View>> {
        let sql = "SELECT name, sql FROM sqlite_master WHERE type = 'view' ORDER BY name";
        let rows: Vec<ViewRow> = run_query(executor, "list_views", sql).await?;
        Ok(rows
            .into_iter()
            .map(|r| {
                let mut v = View::new(r.name, None);
                v.definition = r.sql;
                v
            })
            .collect())
    }

    async fn count_exact(&self, executor: &dyn Executor, name: &str) -> anyhow::Result<u64> {
        let sql = format!("SELECT COUNT(*) AS count FROM \"{name}\"");
        let rows: Vec<CountRow> = run_query(executor, "count_exact", &sql).await?;
        Ok(rows.first().map(|r| r.count as u64).unwrap_or(0))
    }

    async fn fetch_indexes(&self, executor: &dyn Executor, name: &str) -> anyhow::Result<Vec<TableIndex>> {
        let sql = format!("PRAGMA index_list(\"{name}\")");
        let indexes: Vec<IndexListRow> = run_query(executor, "fetch_indexes", &sql).await?;
        let mut result = Vec::new();
        for idx in indexes {
            let info_sql = format!("PRAGMA index_info(\"{}\")", idx.name);
            let cols: Vec<IndexInfoRow> = run_query(executor, "fetch_index_info", &info_sql).await?;
            result.push(TableIndex {
                name: idx.name,
                columns: cols.into_iter().filter_map(|c| c.name).collect(),
                unique: idx.unique != 0,
                index_type: None,
            });
        }
        Ok(result)
    }

    async fn fetch_constraints(
        &self,
        executor: &dyn Executor,
        name: &str,
    ) -> anyhow::Result<Vec<TableConstraint>> {
        use crate::model::ConstraintType;
        let sql = format!("PRAGMA table_info(\"{name}\")");
        let rows: Vec<TableInfoRow> = run_query(executor, "fetch_constraints", &sql).await?;
        let pk_columns: Vec<String> = rows.iter().filter(|r| r.pk > 0).map(|r| r.name.clone()).collect();
        let mut constraints = Vec::new();
        if !pk_columns.is_empty() {
            constraints.push(TableConstraint {
                name: format!("{name}_pk"),
                constraint_type: ConstraintType::PrimaryKey,
                columns: pk_columns,
                definition: None,
                default_value: None,
                referenced_table: None,
                referenced_columns: Vec::new(),
            });
        }
        let fks = self.find_outgoing_relations(executor, name).await?;
        for (i, fk) in fks.into_iter().enumerate() {
            constraints.push(TableConstraint {
                name: format!("{name}_fk_{i}"),
                constraint_type: ConstraintType::ForeignKey,
                columns: fk.from,
                definition: None,
                default_value: None,
                referenced_table: Some(fk.referenced_table),
                referenced_columns: fk.to,
            });
        }

        // NOT NULL / DEFAULT are per-column flags in `PRAGMA table_info`, not
        // named catalog entries; the dialect-agnostic constraints grounding
        // already suppresses any NOT_NULL whose columns are a PK subset.
        for row in &rows {
            if row.notnull != 0 {
                constraints.push(TableConstraint {
                    name: format!("{name}_{}_not_null", row.name),
                    constraint_type: ConstraintType::NotNull,
                    columns: vec![row.name.clone()],
                    definition: None,
                    default_value: None,
                    referenced_table: None,
                    referenced_columns: Vec::new(),
                });
            }
            if let Some(default) = &row.dflt_value {
                constraints.push(TableConstraint {
                    name: format!("{name}_{}_default", row.name),
                    constraint_type: ConstraintType::Default,
                    columns: vec![row.name.clone()],
                    definition: None,
                    default_value: Some(default.clone()),
                    referenced_table: None,
                    referenced_columns: Vec::new(),
                });
            }
        }

        // CHECK constraints have no pragma; SQLite only stores the original
        // CREATE TABLE text, so they're recovered by scanning it for
        // balanced-paren `CHECK (...)` clauses.
        let ddl_sql = format!(
            "SELECT sql FROM sqlite_master WHERE type = 'table' AND name = '{}'",
            self.escape_string(name)
        );
        let ddl_rows: Vec<TableDdlRow> = run_query(executor, "fetch_constraints_ddl", &ddl_sql).await?;
        if let Some(ddl) = ddl_rows.into_iter().next().and_then(|r| r.sql) {
            for (i, definition) in parse_check_clauses(&ddl).into_iter().enumerate() {
                constraints.push(TableConstraint {
                    name: format!("{name}_check_{i}"),
                    constraint_type: ConstraintType::Check,
                    columns: Vec::new(),
                    definition: Some(definition),
                    default_value: None,
                    referenced_table: None,
                    referenced_columns: Vec::new(),
                });
            }
        }

        Ok(constraints)
    }

    async fn fetch_column_stats(
        &self,
        executor: &dyn Executor,
        table: &str,
        column: &str,
    ) -> anyhow::Result<Option<ColumnStats>> {
        let quoted = self.quote_identifier(column);
        let sql = format!(
            "SELECT CAST(MIN({quoted}) AS TEXT) AS min_value, CAST(MAX({quoted}) AS TEXT) AS max_value, \
             SUM(CASE WHEN {quoted} IS NULL THEN 1 ELSE 0 END) AS null_count, COUNT(*) AS total_count \
             FROM {table}"
        );
        let rows: Vec<StatsRow> = run_query(executor, "fetch_column_stats", &sql).await?;
        Ok(rows.into_iter().next().map(|r| ColumnStats {
            min: r.min_value,
            max: r.max_value,
            null_fraction: if r.total_count > 0 {
                Some(r.null_count as f64 / r.total_count as f64)
            } else {
                None
            },
        }))
    }

    fn dry_run_wrap(&self, sql: &str) -> String {
        format!("EXPLAIN QUERY PLAN {sql}")
    }

    fn classify_error(&self, message: &str) -> (ErrorKind, String) {
        let lower = message.to_lowercase();
        for (pattern, kind, hint) in ERROR_PATTERNS {
            if lower.contains(pattern) {
                return (*kind, hint.to_string());
            }
        }
        (ErrorKind::UnknownError, "no further diagnostic information available".to_string())
    }
}

/// Builds a SqliteAdapter-backed `Adapter`.
pub fn build(options: SqliteOptions, adapter_options: AdapterOptions) -> Result<Adapter> {
    let dialect = std::sync::Arc::new(SqliteAdapter::new(options));
    Adapter::new(dialect, adapter_options)
}

/// Scans a `CREATE TABLE` statement for `CHECK (...)` clauses, tracking
/// paren depth by hand since a CHECK expression commonly nests its own
/// parens (e.g. `CHECK (status IN ('a', 'b'))`) and a non-nesting regex
/// would stop at the first closing paren.
fn parse_check_clauses(ddl: &str) -> Vec<String> {
    let bytes = ddl.as_bytes();
    let lower = ddl.to_lowercase();
    let mut clauses = Vec::new();
    let mut search_from = 0;

    while let Some(rel_pos) = lower[search_from..].find("check") {
        let kw_start = search_from + rel_pos;
        let mut cursor = kw_start + "check".len();
        while cursor < bytes.len() && (bytes[cursor] as char).is_whitespace() {
            cursor += 1;
        }
        if cursor >= bytes.len() || bytes[cursor] != b'(' {
            search_from = kw_start + "check".len();
            continue;
        }
        let open = cursor;
        let mut depth = 0i32;
        let mut close = None;
        for (i, &b) in bytes[open..].iter().enumerate() {
            match b {
                b'(' => depth += 1,
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        close = Some(open + i);
                        break;
                    }
                }
                _ => {}
            }
        }
        let Some(close) = close else { break };
        // Strip the outer parens the same way the other dialects' definitions do.
        clauses.push(ddl[open + 1..close].trim().to_string());
        search_from = close + 1;
    }

    clauses
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_single_check_clause() {
        let ddl = "CREATE TABLE orders (id INTEGER PRIMARY KEY, status TEXT CHECK (status IN ('pending', 'completed')))";
        let clauses = parse_check_clauses(ddl);
        assert_eq!(clauses, vec!["status IN ('pending', 'completed')".to_string()]);
    }

    #[test]
    fn extracts_multiple_check_clauses() {
        let ddl = "CREATE TABLE t (a INTEGER CHECK (a > 0), b INTEGER CHECK (b < 100))";
        let clauses = parse_check_clauses(ddl);
        assert_eq!(clauses, vec!["a > 0".to_string(), "b < 100".to_string()]);
    }

    #[test]
    fn returns_empty_when_no_check_clause() {
        let ddl = "CREATE TABLE t (a INTEGER, b TEXT)";
        assert!(parse_check_clauses(ddl).is_empty());
    }
}
