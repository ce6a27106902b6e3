//! MySQL / MariaDB dialect adapter: `information_schema` queries plus
//! parsing of inline `ENUM(...)` column types, which MySQL has instead of a
//! native enum catalog object.

use super::{Adapter, AdapterOptions, DialectAdapter};
use crate::error::{ErrorKind, Result};
use crate::executor::{run_query, Executor};
use crate::model::{Column, ColumnStats, Relationship, Table, TableConstraint, TableIndex, View};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
pub struct MySqlOptions {
    pub databases: Option<Vec<String>>,
}

pub struct MySqlAdapter {
    options: MySqlOptions,
}

impl MySqlAdapter {
    pub fn new(options: MySqlOptions) -> Self {
        MySqlAdapter { options }
    }

    fn database_filter(&self, column: &str) -> String {
        self.build_schema_filter(column, self.options.databases.as_deref())
    }
}

static ENUM_TYPE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^enum\((.*)\)$").unwrap());
static ENUM_LITERAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"'((?:[^'\\]|\\.)*)'").unwrap());

static ERROR_PATTERNS: &[(&str, ErrorKind, &str)] = &[
    (
        "doesn't exist",
        ErrorKind::MissingTable,
        "check the database prefix; MySQL scopes tables per-database rather than per-schema",
    ),
    (
        "unknown column",
        ErrorKind::InvalidColumn,
        "verify the column name and its owning table",
    ),
    (
        "you have an error in your sql syntax",
        ErrorKind::SyntaxError,
        "check for unbalanced parentheses or a missing keyword",
    ),
    (
        "function",
        ErrorKind::InvalidFunction,
        "verify the function name and argument count",
    ),
    (
        "foreign key constraint",
        ErrorKind::ConstraintError,
        "the statement violates a constraint on the target table",
    ),
];

#[derive(Deserialize)]
struct NameRow {
    name: String,
}

#[derive(Deserialize)]
struct ColumnRow {
    column_name: String,
    column_type: String,
}

#[derive(Deserialize)]
struct FkRow {
    constraint_name: String,
    column_name: String,
    ordinal_position: i64,
    referenced_table_schema: String,
    referenced_table_name: String,
    referenced_column_name: String,
}

#[derive(Deserialize)]
struct IndexRow {
    index_name: String,
    column_name: String,
    non_unique: i64,
    index_type: String,
    seq_in_index: i64,
}

#[derive(Deserialize)]
struct ConstraintRow {
    constraint_name: String,
    constraint_type: String,
    column_name: Option<String>,
    check_clause: Option<String>,
    referenced_table_schema: Option<String>,
    referenced_table_name: Option<String>,
    referenced_column_name: Option<String>,
}

#[derive(Deserialize)]
struct NullableColumnRow {
    column_name: String,
}

#[derive(Deserialize)]
struct DefaultColumnRow {
    column_name: String,
    column_default: String,
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
    table_schema: String,
    table_name: String,
    view_definition: Option<String>,
}

#[async_trait]
impl DialectAdapter for MySqlAdapter {
    fn name(&self) -> &str {
        "mysql"
    }

    fn default_schema(&self) -> &str {
        ""
    }

    fn system_schemas(&self) -> &[&str] {
        &["information_schema", "mysql", "performance_schema", "sys"]
    }

    fn quote_identifier(&self, name: &str) -> String {
        name.split('.')
            .map(|segment| format!("`{}`", segment.replace('`', "``")))
            .collect::<Vec<_>>()
            .join(".")
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
            database: Option<String>,
        }
        let rows: Vec<InfoRow> =
            run_query(executor, "collect_info", "SELECT VERSION() AS version, DATABASE() AS database").await?;
        let row = rows.into_iter().next();
        Ok(crate::model::DialectInfo {
            dialect: "mysql".to_string(),
            version: row.as_ref().map(|r| r.version.clone()),
            database: row.and_then(|r| r.database),
            details: std::collections::BTreeMap::new(),
        })
    }

    async fn get_all_table_names(&self, executor: &dyn Executor) -> anyhow::Result<Vec<String>> {
        let filter = self.database_filter("table_schema");
        let sql = format!(
            "SELECT CONCAT(table_schema, '.', table_name) AS name FROM information_schema.tables \
             WHERE table_type = 'BASE TABLE'{filter} ORDER BY name"
        );
        let rows: Vec<NameRow> = run_query(executor, "get_all_table_names", &sql).await?;
        Ok(rows.into_iter().map(|r| r.name).collect())
    }

    async fn get_table(&self, executor: &dyn Executor, name: &str) -> anyhow::Result<Table> {
        let (schema, table) = self.parse_table_name(name);
        let sql = format!(
            "SELECT column_name, column_type FROM information_schema.columns \
             WHERE table_schema = '{}' AND table_name = '{}' ORDER BY ordinal_position",
            self.escape_string(&schema),
            self.escape_string(&table)
        );
        let rows: Vec<ColumnRow> = run_query(executor, "get_table", &sql).await?;
        let mut t = Table::new(name, Some(schema));
        t.raw_name = Some(table);
        t.columns = rows
            .into_iter()
            .map(|r| Column::new(r.column_name, r.column_type))
            .collect();
        Ok(t)
    }

    async fn find_outgoing_relations(
        &self,
        executor: &dyn Executor,
        name: &str,
    ) -> anyhow::Result<Vec<Relationship>> {
        let (schema, table) = self.parse_table_name(name);
        let sql = format!(
            "SELECT constraint_name, column_name, ordinal_position, \
             referenced_table_schema, referenced_table_name, referenced_column_name \
             FROM information_schema.key_column_usage \
             WHERE table_schema = '{}' AND table_name = '{}' AND referenced_table_name IS NOT NULL \
             ORDER BY constraint_name, ordinal_position",
            self.escape_string(&schema),
            self.escape_string(&table)
        );
        let rows: Vec<FkRow> = run_query(executor, "find_outgoing_relations", &sql).await?;
        Ok(group_fk_rows(name, rows))
    }

    async fn find_incoming_relations(
        &self,
        executor: &dyn Executor,
        name: &str,
    ) -> anyhow::Result<Vec<Relationship>> {
        let (schema, table) = self.parse_table_name(name);
        let sql = format!(
            "SELECT constraint_name, column_name, ordinal_position, \
             table_schema AS referenced_table_schema, table_name AS referenced_table_name, \
             referenced_column_name \
             FROM information_schema.key_column_usage \
             WHERE referenced_table_schema = '{}' AND referenced_table_name = '{}' \
             ORDER BY constraint_name, ordinal_position",
            self.escape_string(&schema),
            self.escape_string(&table)
        );
        let rows: Vec<FkRow> = run_query(executor, "find_incoming_relations", &sql).await?;
        let mut by_constraint: BTreeMap<String, Vec<FkRow>> = BTreeMap::new();
        for row in rows {
            by_constraint.entry(row.constraint_name.clone()).or_default().push(row);
        }
        let mut relationships = Vec::new();
        for (_, mut group) in by_constraint {
            group.sort_by_key(|r| r.ordinal_position);
            relationships.push(Relationship {
                table: format!("{}.{}", group[0].referenced_table_schema, group[0].referenced_table_name),
                from: group.iter().map(|r| r.column_name.clone()).collect(),
                referenced_table: name.to_string(),
                to: group.iter().map(|r| r.referenced_column_name.clone()).collect(),
            });
        }
        Ok(relationships)
    }

    async fn list_views(&self, executor: &dyn Executor) -> anyhow::Result<Vec<View>> {
        let filter = self.database_filter("table_schema");
        let sql = format!(
            "SELECT table_schema, table_name, view_definition FROM information_schema.views \
             WHERE true{filter} ORDER BY table_schema, table_name"
        );
        let rows: Vec<ViewRow> = run_query(executor, "list_views", &sql).await?;
        Ok(rows
            .into_iter()
            .map(|r| {
                let mut v = View::new(format!("{}.{}", r.table_schema, r.table_name), Some(r.table_schema));
                v.definition = r.view_definition;
                v
            })
            .collect())
    }

    async fn count_exact(&self, executor: &dyn Executor, name: &str) -> anyhow::Result<u64> {
        let sql = format!("SELECT COUNT(*) AS count FROM {name}");
        let rows: Vec<CountRow> = run_query(executor, "count_exact", &sql).await?;
        Ok(rows.first().map(|r| r.count as u64).unwrap_or(0))
    }

    async fn fetch_indexes(&self, executor: &dyn Executor, name: &str) -> anyhow::Result<Vec<TableIndex>> {
        let (schema, table) = self.parse_table_name(name);
        let sql = format!(
            "SELECT index_name, column_name, non_unique, index_type, seq_in_index \
             FROM information_schema.statistics \
             WHERE table_schema = '{}' AND table_name = '{}' ORDER BY index_name, seq_in_index",
            self.escape_string(&schema),
            self.escape_string(&table)
        );
        let rows: Vec<IndexRow> = run_query(executor, "fetch_indexes", &sql).await?;
        let mut by_name: BTreeMap<String, Vec<IndexRow>> = BTreeMap::new();
        for row in rows {
            by_name.entry(row.index_name.clone()).or_default().push(row);
        }
        Ok(by_name
            .into_values()
            .map(|group| TableIndex {
                name: group[0].index_name.clone(),
                columns: group.iter().map(|r| r.column_name.clone()).collect(),
                unique: group[0].non_unique == 0,
                index_type: Some(group[0].index_type.clone()),
            })
            .collect())
    }

    async fn fetch_constraints(
        &self,
        executor: &dyn Executor,
        name: &str,
    ) -> anyhow::Result<Vec<TableConstraint>> {
        use crate::model::ConstraintType;
        let (schema, table) = self.parse_table_name(name);
        let schema_lit = self.escape_string(&schema);
        let table_lit = self.escape_string(&table);

        let sql = format!(
            "SELECT tc.constraint_name, tc.constraint_type, kcu.column_name, kcu.ordinal_position, \
             cc.check_clause, kcu.referenced_table_schema, kcu.referenced_table_name, \
             kcu.referenced_column_name \
             FROM information_schema.table_constraints tc \
             LEFT JOIN information_schema.key_column_usage kcu \
                ON kcu.constraint_name = tc.constraint_name AND kcu.table_schema = tc.table_schema \
                AND kcu.table_name = tc.table_name \
             LEFT JOIN information_schema.check_constraints cc \
                ON cc.constraint_name = tc.constraint_name AND cc.constraint_schema = tc.table_schema \
             WHERE tc.table_schema = '{schema_lit}' AND tc.table_name = '{table_lit}' \
             ORDER BY tc.constraint_name, kcu.ordinal_position"
        );
        let mut rows: Vec<ConstraintRow> = run_query(executor, "fetch_constraints", &sql).await?;

        // NOT NULL / DEFAULT aren't named constraints in MySQL's catalog;
        // synthesize one pseudo-constraint per column, same as PostgreSQL's
        // adapter does from information_schema.columns.
        let not_null_sql = format!(
            "SELECT column_name FROM information_schema.columns \
             WHERE table_schema = '{schema_lit}' AND table_name = '{table_lit}' \
                AND is_nullable = 'NO' ORDER BY ordinal_position"
        );
        let not_null_rows: Vec<NullableColumnRow> =
            run_query(executor, "fetch_constraints_not_null", &not_null_sql).await?;
        for r in not_null_rows {
            rows.push(ConstraintRow {
                constraint_name: format!("{table}_{}_not_null", r.column_name),
                constraint_type: "NOT NULL".to_string(),
                column_name: Some(r.column_name),
                check_clause: None,
                referenced_table_schema: None,
                referenced_table_name: None,
                referenced_column_name: None,
            });
        }

        let default_sql = format!(
            "SELECT column_name, column_default FROM information_schema.columns \
             WHERE table_schema = '{schema_lit}' AND table_name = '{table_lit}' \
                AND column_default IS NOT NULL ORDER BY ordinal_position"
        );
        let default_rows: Vec<DefaultColumnRow> =
            run_query(executor, "fetch_constraints_default", &default_sql).await?;
        let defaults_by_column: BTreeMap<String, String> = default_rows
            .into_iter()
            .map(|r| (r.column_name.clone(), r.column_default))
            .collect();
        for (column, _) in &defaults_by_column {
            rows.push(ConstraintRow {
                constraint_name: format!("{table}_{column}_default"),
                constraint_type: "DEFAULT".to_string(),
                column_name: Some(column.clone()),
                check_clause: None,
                referenced_table_schema: None,
                referenced_table_name: None,
                referenced_column_name: None,
            });
        }

        let mut by_name: BTreeMap<String, Vec<ConstraintRow>> = BTreeMap::new();
        for row in rows {
            by_name.entry(row.constraint_name.clone()).or_default().push(row);
        }
        Ok(by_name
            .into_values()
            .filter_map(|group| {
                let constraint_type = match group[0].constraint_type.as_str() {
                    "PRIMARY KEY" => ConstraintType::PrimaryKey,
                    "FOREIGN KEY" => ConstraintType::ForeignKey,
                    "UNIQUE" => ConstraintType::Unique,
                    "CHECK" => ConstraintType::Check,
                    "NOT NULL" => ConstraintType::NotNull,
                    "DEFAULT" => ConstraintType::Default,
                    _ => return None,
                };
                let referenced_table = match (&group[0].referenced_table_schema, &group[0].referenced_table_name) {
                    (Some(s), Some(t)) => Some(format!("{s}.{t}")),
                    _ => None,
                };
                let default_value = if constraint_type == ConstraintType::Default {
                    group[0]
                        .column_name
                        .as_ref()
                        .and_then(|c| defaults_by_column.get(c).cloned())
                } else {
                    None
                };
                Some(TableConstraint {
                    name: group[0].constraint_name.clone(),
                    constraint_type,
                    columns: group.iter().filter_map(|r| r.column_name.clone()).collect(),
                    definition: group[0].check_clause.clone(),
                    default_value,
                    referenced_table,
                    referenced_columns: group
                        .iter()
                        .filter_map(|r| r.referenced_column_name.clone())
                        .collect(),
                })
            })
            .collect())
    }

    async fn fetch_column_stats(
        &self,
        executor: &dyn Executor,
        table: &str,
        column: &str,
    ) -> anyhow::Result<Option<ColumnStats>> {
        let quoted = self.quote_identifier(column);
        let sql = format!(
            "SELECT CAST(MIN({quoted}) AS CHAR) AS min_value, CAST(MAX({quoted}) AS CHAR) AS max_value, \
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

    async fn collect_enum_values(
        &self,
        executor: &dyn Executor,
        table: &str,
        column: &str,
    ) -> anyhow::Result<Option<Vec<String>>> {
        let (schema, raw_table) = self.parse_table_name(table);
        let sql = format!(
            "SELECT column_type FROM information_schema.columns \
             WHERE table_schema = '{}' AND table_name = '{}' AND column_name = '{}'",
            self.escape_string(&schema),
            self.escape_string(&raw_table),
            self.escape_string(column)
        );
        let rows: Vec<ColumnRow> = run_query(executor, "collect_enum_values", &sql).await?;
        let Some(row) = rows.into_iter().next() else {
            return Ok(None);
        };
        Ok(parse_enum_column_type(&row.column_type))
    }

    fn dry_run_wrap(&self, sql: &str) -> String {
        format!("EXPLAIN {sql}")
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

/// Parses MySQL's `COLUMN_TYPE` value for an `ENUM(...)` column, e.g.
/// `enum('a','b','c')`, into its literal values.
fn parse_enum_column_type(column_type: &str) -> Option<Vec<String>> {
    let captures = ENUM_TYPE.captures(column_type.trim())?;
    let inner = captures.get(1)?.as_str();
    let values: Vec<String> = ENUM_LITERAL
        .captures_iter(inner)
        .map(|c| c[1].replace("\\'", "'"))
        .collect();
    if values.is_empty() {
        None
    } else {
        Some(values)
    }
}

fn group_fk_rows(table: &str, rows: Vec<FkRow>) -> Vec<Relationship> {
    let mut by_constraint: BTreeMap<String, Vec<FkRow>> = BTreeMap::new();
    for row in rows {
        by_constraint.entry(row.constraint_name.clone()).or_default().push(row);
    }
    by_constraint
        .into_values()
        .map(|mut group| {
            group.sort_by_key(|r| r.ordinal_position);
            Relationship {
                table: table.to_string(),
                from: group.iter().map(|r| r.column_name.clone()).collect(),
                referenced_table: format!(
                    "{}.{}",
                    group[0].referenced_table_schema, group[0].referenced_table_name
                ),
                to: group.iter().map(|r| r.referenced_column_name.clone()).collect(),
            }
        })
        .collect()
}

/// Builds a MySqlAdapter-backed `Adapter`.
pub fn build(options: MySqlOptions, adapter_options: AdapterOptions) -> Result<Adapter> {
    let dialect = std::sync::Arc::new(MySqlAdapter::new(options));
    Adapter::new(dialect, adapter_options)
}
