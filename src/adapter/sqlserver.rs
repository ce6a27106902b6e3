//! SQL Server dialect adapter: `sys.*` catalog views, bracket quoting, and
//! `SELECT TOP n` sampling instead of trailing `LIMIT`.

use super::{Adapter, AdapterOptions, DialectAdapter};
use crate::error::{ErrorKind, Result};
use crate::executor::{run_query, Executor};
use crate::model::{Column, ColumnStats, Relationship, Table, TableConstraint, TableIndex, View};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
pub struct SqlServerOptions {
    pub schemas: Option<Vec<String>>,
}

pub struct SqlServerAdapter {
    options: SqlServerOptions,
}

impl SqlServerAdapter {
    pub fn new(options: SqlServerOptions) -> Self {
        SqlServerAdapter { options }
    }

    fn schema_filter(&self, column: &str) -> String {
        self.build_schema_filter(column, self.options.schemas.as_deref())
    }
}

static ERROR_PATTERNS: &[(&str, ErrorKind, &str)] = &[
    (
        "invalid object name",
        ErrorKind::MissingTable,
        "check the schema prefix; unqualified names resolve against the default schema",
    ),
    (
        "invalid column name",
        ErrorKind::InvalidColumn,
        "verify the column name and its owning table",
    ),
    (
        "incorrect syntax",
        ErrorKind::SyntaxError,
        "check for unbalanced parentheses or a missing keyword",
    ),
    (
        "is not a recognized",
        ErrorKind::InvalidFunction,
        "verify the function name and argument count",
    ),
    (
        "conflicted with the",
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
    data_type: String,
}

#[derive(Deserialize)]
struct FkRow {
    constraint_name: String,
    column_name: String,
    ordinal_position: i64,
    referenced_schema: String,
    referenced_table: String,
    referenced_column: String,
}

#[derive(Deserialize)]
struct IndexRow {
    index_name: String,
    column_name: String,
    is_unique: bool,
    index_type: String,
    key_ordinal: i64,
}

#[derive(Deserialize)]
struct ConstraintRow {
    constraint_name: String,
    constraint_type: String,
    column_name: Option<String>,
    definition: Option<String>,
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
struct RowCountEstimateRow {
    estimate: Option<i64>,
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
    schema_name: String,
    view_name: String,
    definition: Option<String>,
}

#[async_trait]
impl DialectAdapter for SqlServerAdapter {
    fn name(&self) -> &str {
        "sqlserver"
    }

    fn default_schema(&self) -> &str {
        "dbo"
    }

    fn system_schemas(&self) -> &[&str] {
        &["sys", "INFORMATION_SCHEMA", "guest"]
    }

    fn quote_identifier(&self, name: &str) -> String {
        name.split('.')
            .map(|segment| format!("[{}]", segment.replace(']', "]]")))
            .collect::<Vec<_>>()
            .join(".")
    }

    fn build_sample_rows_query(&self, table: &str, columns: Option<&[String]>, limit: u32) -> String {
        let cols = columns
            .map(|c| c.join(", "))
            .unwrap_or_else(|| "*".to_string());
        format!("SELECT TOP {limit} {cols} FROM {table}")
    }

    fn build_distinct_query(&self, table: &str, column: &str, limit: u32) -> String {
        let quoted_col = self.quote_identifier(column);
        format!(
            "SELECT DISTINCT TOP {limit} {quoted_col} FROM {table} WHERE {quoted_col} IS NOT NULL"
        )
    }

    async fn collect_info(&self, executor: &dyn Executor) -> anyhow::Result<crate::model::DialectInfo> {
        #[derive(Deserialize)]
        struct InfoRow {
            version: String,
            database: String,
        }
        let rows: Vec<InfoRow> = run_query(
            executor,
            "collect_info",
            "SELECT @@VERSION AS version, DB_NAME() AS database",
        )
        .await?;
        let row = rows.into_iter().next();
        Ok(crate::model::DialectInfo {
            dialect: "sqlserver".to_string(),
            version: row.as_ref().map(|r| r.version.clone()),
            database: row.map(|r| r.database),
            details: std::collections::BTreeMap::new(),
        })
    }

    async fn get_all_table_names(&self, executor: &dyn Executor) -> anyhow::Result<Vec<String>> {
        let filter = self.schema_filter("table_schema");
        let sql = format!(
            "SELECT table_schema + '.' + table_name AS name FROM information_schema.tables \
             WHERE table_type = 'BASE TABLE'{filter} ORDER BY name"
        );
        let rows: Vec<NameRow> = run_query(executor, "get_all_table_names", &sql).await?;
        Ok(rows.into_iter().map(|r| r.name).collect())
    }

    async fn get_table(&self, executor: &dyn Executor, name: &str) -> anyhow::Result<Table> {
        let (schema, table) = self.parse_table_name(name);
        let sql = format!(
            "SELECT column_name, data_type FROM information_schema.columns \
             WHERE table_schema = '{}' AND table_name = '{}' ORDER BY ordinal_position",
            self.escape_string(&schema),
            self.escape_string(&table)
        );
        let rows: Vec<ColumnRow> = run_query(executor, "get_table", &sql).await?;
        let mut t = Table::new(name, Some(schema));
        t.raw_name = Some(table);
        t.columns = rows
            .into_iter()
            .map(|r| Column::new(r.column_name, r.data_type))
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
            "SELECT fk.name AS constraint_name, pc.name AS column_name, fkc.constraint_column_id AS ordinal_position, \
             rs.name AS referenced_schema, rt.name AS referenced_table, rc.name AS referenced_column \
             FROM sys.foreign_keys fk \
             JOIN sys.foreign_key_columns fkc ON fkc.constraint_object_id = fk.object_id \
             JOIN sys.tables pt ON pt.object_id = fk.parent_object_id \
             JOIN sys.schemas ps ON ps.schema_id = pt.schema_id \
             JOIN sys.columns pc ON pc.object_id = pt.object_id AND pc.column_id = fkc.parent_column_id \
             JOIN sys.tables rt ON rt.object_id = fk.referenced_object_id \
             JOIN sys.schemas rs ON rs.schema_id = rt.schema_id \
             JOIN sys.columns rc ON rc.object_id = rt.object_id AND rc.column_id = fkc.referenced_column_id \
             WHERE ps.name = '{}' AND pt.name = '{}' ORDER BY fk.name, fkc.constraint_column_id",
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
            "SELECT fk.name AS constraint_name, pc.name AS column_name, fkc.constraint_column_id AS ordinal_position, \
             ps.name AS referenced_schema, pt.name AS referenced_table, rc.name AS referenced_column \
             FROM sys.foreign_keys fk \
             JOIN sys.foreign_key_columns fkc ON fkc.constraint_object_id = fk.object_id \
             JOIN sys.tables pt ON pt.object_id = fk.parent_object_id \
             JOIN sys.schemas ps ON ps.schema_id = pt.schema_id \
             JOIN sys.columns pc ON pc.object_id = pt.object_id AND pc.column_id = fkc.parent_column_id \
             JOIN sys.tables rt ON rt.object_id = fk.referenced_object_id \
             JOIN sys.schemas rs ON rs.schema_id = rt.schema_id \
             JOIN sys.columns rc ON rc.object_id = rt.object_id AND rc.column_id = fkc.referenced_column_id \
             WHERE rs.name = '{}' AND rt.name = '{}' ORDER BY fk.name, fkc.constraint_column_id",
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
                table: format!("{}.{}", group[0].referenced_schema, group[0].referenced_table),
                from: group.iter().map(|r| r.column_name.clone()).collect(),
                referenced_table: name.to_string(),
                to: group.iter().map(|r| r.referenced_column.clone()).collect(),
            });
        }
        Ok(relationships)
    }

    async fn list_views(&self, executor: &dyn Executor) -> anyhow::Result<Vec<View>> {
        let filter = self.schema_filter("table_schema");
        let sql = format!(
            "SELECT table_schema AS schema_name, table_name AS view_name, view_definition AS definition \
             FROM information_schema.views WHERE 1 = 1{filter} ORDER BY table_schema, table_name"
        );
        let rows: Vec<ViewRow> = run_query(executor, "list_views", &sql).await?;
        Ok(rows
            .into_iter()
            .map(|r| {
                let mut v = View::new(format!("{}.{}", r.schema_name, r.view_name), Some(r.schema_name));
                v.definition = r.definition;
                v
            })
            .collect())
    }

    async fn estimate_row_count(
        &self,
        executor: &dyn Executor,
        name: &str,
    ) -> anyhow::Result<Option<u64>> {
        let (schema, table) = self.parse_table_name(name);
        let sql = format!(
            "SELECT SUM(p.rows) AS estimate FROM sys.partitions p \
             JOIN sys.tables t ON t.object_id = p.object_id \
             JOIN sys.schemas s ON s.schema_id = t.schema_id \
             WHERE s.name = '{}' AND t.name = '{}' AND p.index_id IN (0, 1)",
            self.escape_string(&schema),
            self.escape_string(&table)
        );
        let rows: Vec<RowCountEstimateRow> = run_query(executor, "estimate_row_count", &sql).await?;
        Ok(rows
            .into_iter()
            .next()
            .and_then(|r| r.estimate)
            .filter(|v| *v > 0)
            .map(|v| v as u64))
    }

    async fn count_exact(&self, executor: &dyn Executor, name: &str) -> anyhow::Result<u64> {
        let sql = format!("SELECT COUNT(*) AS count FROM {name}");
        let rows: Vec<CountRow> = run_query(executor, "count_exact", &sql).await?;
        Ok(rows.first().map(|r| r.count as u64).unwrap_or(0))
    }

    async fn fetch_indexes(&self, executor: &dyn Executor, name: &str) -> anyhow::Result<Vec<TableIndex>> {
        let (schema, table) = self.parse_table_name(name);
        let sql = format!(
            "SELECT i.name AS index_name, c.name AS column_name, i.is_unique, i.type_desc AS index_type, \
             ic.key_ordinal \
             FROM sys.indexes i \
             JOIN sys.index_columns ic ON ic.object_id = i.object_id AND ic.index_id = i.index_id \
             JOIN sys.columns c ON c.object_id = ic.object_id AND c.column_id = ic.column_id \
             JOIN sys.tables t ON t.object_id = i.object_id \
             JOIN sys.schemas s ON s.schema_id = t.schema_id \
             WHERE s.name = '{}' AND t.name = '{}' AND i.name IS NOT NULL \
             ORDER BY i.name, ic.key_ordinal",
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
                unique: group[0].is_unique,
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
             cc.check_clause AS definition, ccu.table_schema AS referenced_table_schema, \
             ccu.table_name AS referenced_table_name, ccu.column_name AS referenced_column_name \
             FROM information_schema.table_constraints tc \
             LEFT JOIN information_schema.key_column_usage kcu \
                ON kcu.constraint_name = tc.constraint_name AND kcu.table_schema = tc.table_schema \
             LEFT JOIN information_schema.check_constraints cc \
                ON cc.constraint_name = tc.constraint_name AND cc.constraint_schema = tc.constraint_schema \
             LEFT JOIN information_schema.referential_constraints rc \
                ON rc.constraint_name = tc.constraint_name AND rc.constraint_schema = tc.constraint_schema \
                AND tc.constraint_type = 'FOREIGN KEY' \
             LEFT JOIN information_schema.constraint_column_usage ccu \
                ON ccu.constraint_name = rc.unique_constraint_name \
             WHERE tc.table_schema = '{schema_lit}' AND tc.table_name = '{table_lit}' \
             ORDER BY tc.constraint_name, kcu.ordinal_position"
        );
        let mut rows: Vec<ConstraintRow> = run_query(executor, "fetch_constraints", &sql).await?;

        // NOT NULL / DEFAULT aren't named catalog constraints in SQL Server
        // either; synthesize one pseudo-constraint per column.
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
                definition: None,
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
        for column in defaults_by_column.keys() {
            rows.push(ConstraintRow {
                constraint_name: format!("{table}_{column}_default"),
                constraint_type: "DEFAULT".to_string(),
                column_name: Some(column.clone()),
                definition: None,
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
                    definition: group[0].definition.clone(),
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
            "SELECT CAST(MIN({quoted}) AS NVARCHAR(MAX)) AS min_value, \
             CAST(MAX({quoted}) AS NVARCHAR(MAX)) AS max_value, \
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
        format!("SET PARSEONLY ON; {sql}; SET PARSEONLY OFF;")
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
                referenced_table: format!("{}.{}", group[0].referenced_schema, group[0].referenced_table),
                to: group.iter().map(|r| r.referenced_column.clone()).collect(),
            }
        })
        .collect()
}

/// Builds a SqlServerAdapter-backed `Adapter`.
pub fn build(options: SqlServerOptions, adapter_options: AdapterOptions) -> Result<Adapter> {
    let dialect = std::sync::Arc::new(SqlServerAdapter::new(options));
    Adapter::new(dialect, adapter_options)
}
