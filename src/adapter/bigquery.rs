//! BigQuery dialect adapter. Unlike the other four, BigQuery has no
//! enforced foreign-key constraints, so relationships are never discovered
//! from catalog metadata; it also requires dataset scoping and a
//! caller-supplied dry-run `validate` capability (BigQuery's own dry-run is
//! not exposed through a plain SQL string).

use super::{Adapter, AdapterOptions, DialectAdapter};
use crate::error::{ErrorKind, GroundingError, Result};
use crate::executor::{run_query, Executor};
use crate::model::{Column, ColumnStats, Relationship, Table, TableConstraint, TableIndex, View};
use async_trait::async_trait;
use serde::Deserialize;

#[derive(Debug, Clone)]
pub struct BigQueryOptions {
    pub datasets: Vec<String>,
    pub project_id: Option<String>,
}

pub struct BigQueryAdapter {
    options: BigQueryOptions,
}

impl BigQueryAdapter {
    /// `datasets` must be non-empty and `validate` must be supplied by the
    /// caller; both are Configuration failures, checked at construction by
    /// `adapter::bigquery::build`.
    pub fn new(options: BigQueryOptions) -> Self {
        BigQueryAdapter { options }
    }

    /// `project.dataset` when `project_id` is set, else bare `dataset`,
    /// leaving the executor to resolve project context from its own
    /// connection defaults.
    fn info_schema_view(&self, dataset: &str, view: &str) -> String {
        match &self.options.project_id {
            Some(project) => format!("`{project}`.`{dataset}`.INFORMATION_SCHEMA.{view}"),
            None => format!("`{dataset}`.INFORMATION_SCHEMA.{view}"),
        }
    }
}

/// Checks BigQuery's construction-time requirements: `datasets` non-empty
/// and a caller-supplied `validate` capability.
pub fn validate_options(options: &BigQueryOptions, has_validator: bool) -> Result<(), GroundingError> {
    if options.datasets.is_empty() {
        return Err(GroundingError::Configuration {
            message: "BigQuery adapter requires at least one dataset in `datasets`".to_string(),
        });
    }
    if !has_validator {
        return Err(GroundingError::Configuration {
            message: "BigQuery adapter requires a caller-supplied `validate` capability".to_string(),
        });
    }
    Ok(())
}

static ERROR_PATTERNS: &[(&str, ErrorKind, &str)] = &[
    (
        "not found",
        ErrorKind::MissingTable,
        "check the dataset prefix; BigQuery tables are scoped as `dataset.table`",
    ),
    (
        "unrecognized name",
        ErrorKind::InvalidColumn,
        "verify the column name and its owning table",
    ),
    (
        "syntax error",
        ErrorKind::SyntaxError,
        "check for unbalanced parentheses or a missing keyword",
    ),
    (
        "no matching signature",
        ErrorKind::InvalidFunction,
        "verify the function name and argument types",
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
struct PartitionRow {
    column_name: Option<String>,
}

#[derive(Deserialize)]
struct ClusteringRow {
    column_name: String,
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
    view_schema: String,
    view_name: String,
    view_definition: Option<String>,
}

#[async_trait]
impl DialectAdapter for BigQueryAdapter {
    fn name(&self) -> &str {
        "bigquery"
    }

    fn default_schema(&self) -> &str {
        self.options.datasets.first().map(String::as_str).unwrap_or("")
    }

    fn quote_identifier(&self, name: &str) -> String {
        name.split('.')
            .map(|segment| format!("`{}`", segment.replace('`', "\\`")))
            .collect::<Vec<_>>()
            .join(".")
    }

    fn build_sample_rows_query(&self, table: &str, columns: Option<&[String]>, limit: u32) -> String {
        let cols = columns
            .map(|c| c.join(", "))
            .unwrap_or_else(|| "*".to_string());
        format!("SELECT {cols} FROM {table} LIMIT {limit}")
    }

    fn is_dataset_allowed(&self, schema: &str) -> bool {
        self.options.datasets.iter().any(|d| d == schema)
    }

    async fn collect_info(&self, _executor: &dyn Executor) -> anyhow::Result<crate::model::DialectInfo> {
        let mut details = std::collections::BTreeMap::new();
        details.insert("datasets".to_string(), self.options.datasets.join(","));
        Ok(crate::model::DialectInfo {
            dialect: "bigquery".to_string(),
            version: None,
            database: self.options.project_id.clone(),
            details,
        })
    }

    async fn get_all_table_names(&self, executor: &dyn Executor) -> anyhow::Result<Vec<String>> {
        let mut names = Vec::new();
        for dataset in &self.options.datasets {
            let sql = format!(
                "SELECT CONCAT(table_schema, '.', table_name) AS name FROM {} \
                 WHERE table_type = 'BASE TABLE' ORDER BY name",
                self.info_schema_view(dataset, "TABLES")
            );
            let rows: Vec<NameRow> = run_query(executor, "get_all_table_names", &sql).await?;
            names.extend(rows.into_iter().map(|r| r.name));
        }
        Ok(names)
    }

    async fn get_table(&self, executor: &dyn Executor, name: &str) -> anyhow::Result<Table> {
        let (dataset, table) = self.parse_table_name(name);
        let sql = format!(
            "SELECT column_name, data_type FROM {} \
             WHERE table_name = '{}' ORDER BY ordinal_position",
            self.info_schema_view(&dataset, "COLUMNS"),
            self.escape_string(&table)
        );
        let rows: Vec<ColumnRow> = run_query(executor, "get_table", &sql).await?;
        let mut t = Table::new(name, Some(dataset));
        t.raw_name = Some(table);
        t.columns = rows
            .into_iter()
            .map(|r| Column::new(r.column_name, r.data_type))
            .collect();
        Ok(t)
    }

    async fn find_outgoing_relations(
        &self,
        _executor: &dyn Executor,
        _name: &str,
    ) -> anyhow::Result<Vec<Relationship>> {
        // BigQuery has no enforced FK constraints to discover.
        Ok(Vec::new())
    }

    async fn find_incoming_relations(
        &self,
        _executor: &dyn Executor,
        _name: &str,
    ) -> anyhow::Result<Vec<Relationship>> {
        Ok(Vec::new())
    }

    async fn list_views(&self, executor: &dyn Executor) -> anyhow::Result<Vec<View>> {
        let mut views = Vec::new();
        for dataset in &self.options.datasets {
            let sql = format!(
                "SELECT table_schema AS view_schema, table_name AS view_name, view_definition \
                 FROM {}",
                self.info_schema_view(dataset, "VIEWS")
            );
            let rows: Vec<ViewRow> = run_query(executor, "list_views", &sql).await?;
            views.extend(rows.into_iter().map(|r| {
                let mut v = View::new(format!("{}.{}", r.view_schema, r.view_name), Some(r.view_schema));
                v.definition = r.view_definition;
                v
            }));
        }
        Ok(views)
    }

    async fn estimate_row_count(
        &self,
        executor: &dyn Executor,
        name: &str,
    ) -> anyhow::Result<Option<u64>> {
        let (dataset, table) = self.parse_table_name(name);
        let sql = format!(
            "SELECT total_rows AS estimate FROM {} WHERE table_name = '{}'",
            self.info_schema_view(&dataset, "TABLE_STORAGE"),
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
        let (dataset, table) = self.parse_table_name(name);
        let mut indexes = Vec::new();

        let partition_sql = format!(
            "SELECT column_name FROM {} WHERE table_name = '{}' AND is_partitioning_column = 'YES'",
            self.info_schema_view(&dataset, "COLUMNS"),
            self.escape_string(&table)
        );
        let partition_rows: Vec<PartitionRow> = run_query(executor, "fetch_partition_info", &partition_sql).await?;
        let partition_columns: Vec<String> = partition_rows.into_iter().filter_map(|r| r.column_name).collect();
        if !partition_columns.is_empty() {
            indexes.push(TableIndex {
                name: format!("{table}_partition"),
                columns: partition_columns,
                unique: false,
                index_type: Some("PARTITION".to_string()),
            });
        }

        let clustering_sql = format!(
            "SELECT column_name FROM {} WHERE table_name = '{}' AND clustering_ordinal_position IS NOT NULL \
             ORDER BY clustering_ordinal_position",
            self.info_schema_view(&dataset, "COLUMNS"),
            self.escape_string(&table)
        );
        let clustering_rows: Vec<ClusteringRow> = run_query(executor, "fetch_clustering_info", &clustering_sql).await?;
        if !clustering_rows.is_empty() {
            indexes.push(TableIndex {
                name: format!("{table}_clustering"),
                columns: clustering_rows.into_iter().map(|r| r.column_name).collect(),
                unique: false,
                index_type: Some("CLUSTERING".to_string()),
            });
        }

        Ok(indexes)
    }

    async fn fetch_constraints(
        &self,
        _executor: &dyn Executor,
        _name: &str,
    ) -> anyhow::Result<Vec<TableConstraint>> {
        // BigQuery does not enforce PK/FK/UNIQUE/CHECK constraints.
        Ok(Vec::new())
    }

    async fn fetch_column_stats(
        &self,
        executor: &dyn Executor,
        table: &str,
        column: &str,
    ) -> anyhow::Result<Option<ColumnStats>> {
        let quoted = self.quote_identifier(column);
        let sql = format!(
            "SELECT CAST(MIN({quoted}) AS STRING) AS min_value, CAST(MAX({quoted}) AS STRING) AS max_value, \
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
        sql.to_string()
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

/// Builds a BigQuery-backed `Adapter`, checking BigQuery's own Configuration
/// requirements (non-empty `datasets`, a caller-supplied `validate`) before
/// `Adapter::new`'s at-least-one-grounding check.
pub fn build(options: BigQueryOptions, adapter_options: AdapterOptions) -> Result<Adapter> {
    validate_options(&options, adapter_options.validator.is_some())?;
    let dialect = std::sync::Arc::new(BigQueryAdapter::new(options));
    Adapter::new(dialect, adapter_options)
}
