//! PostgreSQL dialect adapter: `information_schema` plus `pg_catalog`
//! extensions for enums, constraints, and statistics estimates.

use super::{Adapter, AdapterOptions, DialectAdapter};
use crate::error::{ErrorKind, Result};
use crate::executor::{run_query, Executor};
use crate::model::{Column, ColumnStats, Relationship, Table, TableConstraint, TableIndex, View};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;

/// Options accepted at construction; mirrors the shared per-dialect options
/// shape, extended with PostgreSQL's `schemas` scoping.
#[derive(Debug, Clone, Default)]
pub struct PostgresOptions {
    pub schemas: Option<Vec<String>>,
}

pub struct PostgresAdapter {
    options: PostgresOptions,
}

impl PostgresAdapter {
    pub fn new(options: PostgresOptions) -> Self {
        PostgresAdapter { options }
    }

    fn schema_filter(&self, column: &str) -> String {
        self.build_schema_filter(column, self.options.schemas.as_deref())
    }
}

static ERROR_PATTERNS: &[(&str, ErrorKind, &str)] = &[
    (
        "does not exist",
        ErrorKind::MissingTable,
        "check the schema prefix; unqualified names resolve against search_path",
    ),
    (
        "column",
        ErrorKind::InvalidColumn,
        "verify the column name and its owning table",
    ),
    (
        "syntax error",
        ErrorKind::SyntaxError,
        "check for unbalanced parentheses or a missing keyword",
    ),
    (
        "function",
        ErrorKind::InvalidFunction,
        "verify the function name and argument types",
    ),
    (
        "violates",
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
    is_nullable: String,
}

#[derive(Deserialize)]
struct FkRow {
    constraint_name: String,
    column_name: String,
    ordinal_position: i64,
    referenced_table: String,
    referenced_column: String,
}

#[derive(Deserialize)]
struct IndexRow {
    index_name: String,
    column_name: String,
    is_unique: bool,
    index_type: String,
}

#[derive(Deserialize)]
struct ConstraintRow {
    constraint_name: String,
    constraint_type: String,
    column_name: Option<String>,
    definition: Option<String>,
    referenced_table: Option<String>,
    referenced_column: Option<String>,
    default_value: Option<String>,
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
struct RowCountEstimateRow {
    estimate: Option<f64>,
}

#[derive(Deserialize)]
struct CountRow {
    count: i64,
}

#[derive(Deserialize)]
struct EnumValueRow {
    value: String,
}

#[derive(Deserialize)]
struct StatsRow {
    min_value: Option<String>,
    max_value: Option<String>,
    null_fraction: Option<f64>,
}

#[derive(Deserialize)]
struct ViewRow {
    view_name: String,
    schema_name: String,
    definition: Option<String>,
}

#[async_trait]
impl DialectAdapter for PostgresAdapter {
    fn name(&self) -> &str {
        "postgresql"
    }

    fn default_schema(&self) -> &str {
        "public"
    }

    fn system_schemas(&self) -> &[&str] {
        &["pg_catalog", "information_schema", "pg_toast"]
    }

    fn quote_identifier(&self, name: &str) -> String {
        name.split('.')
            .map(|segment| format!("\"{}\"", segment.replace('"', "\"\"")))
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
            database: String,
        }
        let rows: Vec<InfoRow> =
            run_query(executor, "collect_info", "SELECT version() AS version, current_database() AS database")
                .await?;
        let row = rows.into_iter().next();
        Ok(crate::model::DialectInfo {
            dialect: "postgresql".to_string(),
            version: row.as_ref().map(|r| r.version.clone()),
            database: row.map(|r| r.database),
            details: BTreeMap::new(),
        })
    }

    async fn get_all_table_names(&self, executor: &dyn Executor) -> anyhow::Result<Vec<String>> {
        let filter = self.schema_filter("table_schema");
        let sql = format!(
            "SELECT table_schema || '.' || table_name AS name FROM information_schema.tables \
             WHERE table_type = 'BASE TABLE'{filter} ORDER BY name"
        );
        let rows: Vec<NameRow> = run_query(executor, "get_all_table_names", &sql).await?;
        Ok(rows.into_iter().map(|r| r.name).collect())
    }

    async fn get_table(&self, executor: &dyn Executor, name: &str) -> anyhow::Result<Table> {
        let (schema, table) = self.parse_table_name(name);
        let sql = format!(
            "SELECT column_name, data_type, is_nullable FROM information_schema.columns \
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
            "SELECT con.conname AS constraint_name, att.attname AS column_name, \
             ord.ordinal_position, ref_ns.nspname || '.' || ref_cls.relname AS referenced_table, \
             ref_att.attname AS referenced_column \
             FROM pg_constraint con \
             JOIN pg_class cls ON cls.oid = con.conrelid \
             JOIN pg_namespace ns ON ns.oid = cls.relnamespace \
             JOIN pg_class ref_cls ON ref_cls.oid = con.confrelid \
             JOIN pg_namespace ref_ns ON ref_ns.oid = ref_cls.relnamespace \
             JOIN unnest(con.conkey) WITH ORDINALITY AS ord(attnum, ordinal_position) ON true \
             JOIN pg_attribute att ON att.attrelid = cls.oid AND att.attnum = ord.attnum \
             JOIN pg_attribute ref_att ON ref_att.attrelid = ref_cls.oid \
                AND ref_att.attnum = con.confkey[ord.ordinal_position] \
             WHERE con.contype = 'f' AND ns.nspname = '{}' AND cls.relname = '{}' \
             ORDER BY con.conname, ord.ordinal_position",
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
            "SELECT con.conname AS constraint_name, att.attname AS column_name, \
             ord.ordinal_position, src_ns.nspname || '.' || src_cls.relname AS referenced_table, \
             ref_att.attname AS referenced_column \
             FROM pg_constraint con \
             JOIN pg_class src_cls ON src_cls.oid = con.conrelid \
             JOIN pg_namespace src_ns ON src_ns.oid = src_cls.relnamespace \
             JOIN pg_class ref_cls ON ref_cls.oid = con.confrelid \
             JOIN pg_namespace ref_ns ON ref_ns.oid = ref_cls.relnamespace \
             JOIN unnest(con.conkey) WITH ORDINALITY AS ord(attnum, ordinal_position) ON true \
             JOIN pg_attribute att ON att.attrelid = src_cls.oid AND att.attnum = ord.attnum \
             JOIN pg_attribute ref_att ON ref_att.attrelid = ref_cls.oid \
                AND ref_att.attnum = con.confkey[ord.ordinal_position] \
             WHERE con.contype = 'f' AND ref_ns.nspname = '{}' AND ref_cls.relname = '{}' \
             ORDER BY con.conname, ord.ordinal_position",
            self.escape_string(&schema),
            self.escape_string(&table)
        );
        let rows: Vec<FkRow> = run_query(executor, "find_incoming_relations", &sql).await?;
        // Rows describe `referenced_table -> name`; flip so the source table is the FK owner.
        let mut by_constraint: BTreeMap<String, Vec<FkRow>> = BTreeMap::new();
        for row in rows {
            by_constraint.entry(row.constraint_name.clone()).or_default().push(row);
        }
        let mut relationships = Vec::new();
        for (_, mut group) in by_constraint {
            group.sort_by_key(|r| r.ordinal_position);
            let source_table = group[0].referenced_table.clone();
            relationships.push(Relationship {
                table: source_table,
                from: group.iter().map(|r| r.column_name.clone()).collect(),
                referenced_table: name.to_string(),
                to: group.iter().map(|r| r.referenced_column.clone()).collect(),
            });
        }
        Ok(relationships)
    }

    async fn list_views(&self, executor: &dyn Executor) -> anyhow::Result<Vec<View>> {
        let filter = self.schema_filter("schemaname");
        let sql = format!(
            "SELECT viewname AS view_name, schemaname AS schema_name, definition \
             FROM pg_views WHERE true{filter} ORDER BY schemaname, viewname"
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
            "SELECT reltuples AS estimate FROM pg_class c JOIN pg_namespace n ON n.oid = c.relnamespace \
             WHERE n.nspname = '{}' AND c.relname = '{}'",
            self.escape_string(&schema),
            self.escape_string(&table)
        );
        let rows: Vec<RowCountEstimateRow> = run_query(executor, "estimate_row_count", &sql).await?;
        Ok(rows
            .into_iter()
            .next()
            .and_then(|r| r.estimate)
            .filter(|v| *v > 0.0)
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
            "SELECT ic.relname AS index_name, a.attname AS column_name, ix.indisunique AS is_unique, \
             am.amname AS index_type \
             FROM pg_index ix \
             JOIN pg_class ic ON ic.oid = ix.indexrelid \
             JOIN pg_class tc ON tc.oid = ix.indrelid \
             JOIN pg_namespace n ON n.oid = tc.relnamespace \
             JOIN pg_am am ON am.oid = ic.relam \
             JOIN unnest(ix.indkey) WITH ORDINALITY AS cols(attnum, ord) ON true \
             JOIN pg_attribute a ON a.attrelid = tc.oid AND a.attnum = cols.attnum \
             WHERE n.nspname = '{}' AND tc.relname = '{}' ORDER BY ic.relname, cols.ord",
            self.escape_string(&schema),
            self.escape_string(&table)
        );
        let rows: Vec<IndexRow> = run_query(executor, "fetch_indexes", &sql).await?;
        Ok(group_index_rows(rows))
    }

    async fn fetch_constraints(
        &self,
        executor: &dyn Executor,
        name: &str,
    ) -> anyhow::Result<Vec<TableConstraint>> {
        let (schema, table) = self.parse_table_name(name);
        let schema_lit = self.escape_string(&schema);
        let table_lit = self.escape_string(&table);

        // PRIMARY KEY / UNIQUE / FOREIGN KEY / CHECK all live in pg_constraint;
        // conkey covers composite keys for all four, confkey/confrelid only
        // resolve for 'f'. Same unnest-with-ordinality shape as
        // find_outgoing_relations/fetch_indexes so composite keys come back
        // column-ordered.
        let sql = format!(
            "SELECT con.conname AS constraint_name, con.contype AS constraint_type, \
             att.attname AS column_name, ord.ordinal_position, \
             pg_get_constraintdef(con.oid) AS definition, \
             ref_ns.nspname || '.' || ref_cls.relname AS referenced_table, \
             ref_att.attname AS referenced_column \
             FROM pg_constraint con \
             JOIN pg_class cls ON cls.oid = con.conrelid \
             JOIN pg_namespace ns ON ns.oid = cls.relnamespace \
             JOIN unnest(con.conkey) WITH ORDINALITY AS ord(attnum, ordinal_position) ON true \
             JOIN pg_attribute att ON att.attrelid = cls.oid AND att.attnum = ord.attnum \
             LEFT JOIN pg_class ref_cls ON ref_cls.oid = con.confrelid \
             LEFT JOIN pg_namespace ref_ns ON ref_ns.oid = ref_cls.relnamespace \
             LEFT JOIN pg_attribute ref_att ON ref_att.attrelid = ref_cls.oid \
                AND ref_att.attnum = con.confkey[ord.ordinal_position] \
             WHERE con.contype IN ('p', 'u', 'f', 'c') AND ns.nspname = '{schema_lit}' \
                AND cls.relname = '{table_lit}' \
             ORDER BY con.conname, ord.ordinal_position"
        );
        #[derive(Deserialize)]
        struct RawConstraintRow {
            constraint_name: String,
            constraint_type: String,
            column_name: String,
            definition: Option<String>,
            referenced_table: Option<String>,
            referenced_column: Option<String>,
        }
        let raw: Vec<RawConstraintRow> = run_query(executor, "fetch_constraints", &sql).await?;
        let mut rows: Vec<ConstraintRow> = raw
            .into_iter()
            .map(|r| ConstraintRow {
                constraint_name: r.constraint_name,
                constraint_type: r.constraint_type,
                column_name: Some(r.column_name),
                definition: r.definition,
                referenced_table: r.referenced_table,
                referenced_column: r.referenced_column,
                default_value: None,
            })
            .collect();

        // NOT NULL and DEFAULT aren't named pg_constraint entries for plain
        // columns; synthesize one per-column pseudo-constraint from
        // information_schema.columns, same source get_table already reads.
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
                constraint_type: "n".to_string(),
                column_name: Some(r.column_name),
                definition: None,
                referenced_table: None,
                referenced_column: None,
                default_value: None,
            });
        }

        let default_sql = format!(
            "SELECT column_name, column_default FROM information_schema.columns \
             WHERE table_schema = '{schema_lit}' AND table_name = '{table_lit}' \
                AND column_default IS NOT NULL ORDER BY ordinal_position"
        );
        let default_rows: Vec<DefaultColumnRow> =
            run_query(executor, "fetch_constraints_default", &default_sql).await?;
        for r in default_rows {
            rows.push(ConstraintRow {
                constraint_name: format!("{table}_{}_default", r.column_name),
                constraint_type: "d".to_string(),
                column_name: Some(r.column_name.clone()),
                definition: None,
                referenced_table: None,
                referenced_column: None,
                default_value: Some(r.column_default),
            });
        }

        Ok(group_constraint_rows(rows))
    }

    async fn fetch_column_stats(
        &self,
        executor: &dyn Executor,
        table: &str,
        column: &str,
    ) -> anyhow::Result<Option<ColumnStats>> {
        let quoted = self.quote_identifier(column);
        let table_lit = self.escape_string(table);
        let column_lit = self.escape_string(column);
        let sql = format!(
            "SELECT MIN({quoted})::text AS min_value, MAX({quoted})::text AS max_value, \
             (SELECT null_frac FROM pg_stats WHERE schemaname || '.' || tablename = '{table_lit}' \
                AND attname = '{column_lit}') AS null_fraction \
             FROM {table}"
        );
        let rows: Vec<StatsRow> = run_query(executor, "fetch_column_stats", &sql).await?;
        Ok(rows.into_iter().next().map(|r| ColumnStats {
            min: r.min_value,
            max: r.max_value,
            null_fraction: r.null_fraction,
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
            "SELECT e.enumlabel AS value FROM pg_type t \
             JOIN pg_enum e ON e.enumtypid = t.oid \
             JOIN pg_attribute a ON a.atttypid = t.oid \
             JOIN pg_class c ON c.oid = a.attrelid \
             JOIN pg_namespace n ON n.oid = c.relnamespace \
             WHERE n.nspname = '{}' AND c.relname = '{}' AND a.attname = '{}' \
             ORDER BY e.enumsortorder",
            self.escape_string(&schema),
            self.escape_string(&raw_table),
            self.escape_string(column)
        );
        let rows: Vec<EnumValueRow> = run_query(executor, "collect_enum_values", &sql).await?;
        if rows.is_empty() {
            Ok(None)
        } else {
            Ok(Some(rows.into_iter().map(|r| r.value).collect()))
        }
    }

    fn dry_run_wrap(&self, sql: &str) -> String {
        format!("EXPLAIN {sql}")
    }

    fn classify_error(&self, message: &str) -> (ErrorKind, String) {
        for (pattern, kind, hint) in ERROR_PATTERNS {
            if message.to_lowercase().contains(pattern) {
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
                referenced_table: group[0].referenced_table.clone(),
                to: group.iter().map(|r| r.referenced_column.clone()).collect(),
            }
        })
        .collect()
}

fn group_index_rows(rows: Vec<IndexRow>) -> Vec<TableIndex> {
    let mut by_name: BTreeMap<String, Vec<IndexRow>> = BTreeMap::new();
    for row in rows {
        by_name.entry(row.index_name.clone()).or_default().push(row);
    }
    by_name
        .into_values()
        .map(|group| TableIndex {
            name: group[0].index_name.clone(),
            columns: group.iter().map(|r| r.column_name.clone()).collect(),
            unique: group[0].is_unique,
            index_type: Some(group[0].index_type.clone()),
        })
        .collect()
}

fn group_constraint_rows(rows: Vec<ConstraintRow>) -> Vec<TableConstraint> {
    use crate::model::ConstraintType;
    let mut by_name: BTreeMap<String, Vec<ConstraintRow>> = BTreeMap::new();
    for row in rows {
        by_name.entry(row.constraint_name.clone()).or_default().push(row);
    }
    by_name
        .into_values()
        .filter_map(|group| {
            // pg_constraint.contype tags: p=primary key, f=foreign key,
            // u=unique, c=check. `n`/`d` are this adapter's own synthesized
            // tags for the per-column NOT NULL / DEFAULT pseudo-constraints.
            let constraint_type = match group[0].constraint_type.as_str() {
                "p" => ConstraintType::PrimaryKey,
                "f" => ConstraintType::ForeignKey,
                "u" => ConstraintType::Unique,
                "c" => ConstraintType::Check,
                "n" => ConstraintType::NotNull,
                "d" => ConstraintType::Default,
                _ => return None,
            };
            Some(TableConstraint {
                name: group[0].constraint_name.clone(),
                constraint_type,
                columns: group.iter().filter_map(|r| r.column_name.clone()).collect(),
                definition: group[0].definition.clone(),
                default_value: group[0].default_value.clone(),
                referenced_table: group[0].referenced_table.clone(),
                referenced_columns: group.iter().filter_map(|r| r.referenced_column.clone()).collect(),
            })
        })
        .collect()
}

/// Builds a PostgreSQL-backed `Adapter`. PostgreSQL has no BigQuery-style
/// Configuration checks of its own beyond the at-least-one-grounding check
/// `Adapter::new` already performs.
pub fn build(options: PostgresOptions, adapter_options: AdapterOptions) -> Result<Adapter> {
    let dialect = std::sync::Arc::new(PostgresAdapter::new(options));
    Adapter::new(dialect, adapter_options)
}
