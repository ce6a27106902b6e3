//! Per-dialect adapters and the dialect-agnostic orchestration that ties an
//! adapter, an executor, and an ordered grounding list into `introspect()`.

pub mod bigquery;
pub mod mysql;
pub mod postgresql;
pub mod spreadsheet;
pub mod sqlite;
pub mod sqlserver;

use crate::cancel::CancellationToken;
use crate::error::{ErrorKind, GroundingError, Result};
use crate::executor::{Executor, Validate};
use crate::fragment::{self, Fragment};
use crate::grounding::Grounding;
use crate::model::{GroundingContext, Relationship, Table, View};
use async_trait::async_trait;
use std::sync::Arc;

/// Per-dialect hooks. One large, object-safe trait with sensible defaults
/// for hooks that only some dialects meaningfully implement (BigQuery
/// dataset scoping, native enums), rather than a chain of abstract-base
/// subtypes.
#[async_trait]
pub trait DialectAdapter: Send + Sync {
    /// Short tag identifying the dialect, e.g. `"postgresql"`.
    fn name(&self) -> &str;

    fn default_schema(&self) -> &str;

    /// Engine-internal schemas excluded from introspection by default.
    fn system_schemas(&self) -> &[&str] {
        &[]
    }

    /// Dialect-correct identifier quoting, splitting on `.` and quoting each
    /// segment independently, doubling any embedded quote character.
    fn quote_identifier(&self, name: &str) -> String;

    /// Single-quote doubling for SQL string literals.
    fn escape_string(&self, value: &str) -> String {
        value.replace('\'', "''")
    }

    /// Splits on the first `.` into `(schema, table)`, defaulting the schema
    /// to `default_schema()` when unqualified.
    fn parse_table_name(&self, name: &str) -> (String, String) {
        match name.split_once('.') {
            Some((schema, table)) => (schema.to_string(), table.to_string()),
            None => (self.default_schema().to_string(), name.to_string()),
        }
    }

    /// `AND <col> IN (...)` for an explicit allow-list, `AND <col> NOT IN
    /// (...)` to exclude system schemas, or empty when neither applies.
    fn build_schema_filter(&self, column: &str, allowed: Option<&[String]>) -> String {
        if let Some(allowed) = allowed {
            if allowed.is_empty() {
                return String::new();
            }
            let list = allowed
                .iter()
                .map(|s| format!("'{}'", self.escape_string(s)))
                .collect::<Vec<_>>()
                .join(", ");
            return format!(" AND {column} IN ({list})");
        }
        let system = self.system_schemas();
        if system.is_empty() {
            return String::new();
        }
        let list = system
            .iter()
            .map(|s| format!("'{}'", self.escape_string(s)))
            .collect::<Vec<_>>()
            .join(", ");
        format!(" AND {column} NOT IN ({list})")
    }

    /// `SELECT ... LIMIT n` vs `SELECT TOP n ...`.
    fn build_sample_rows_query(&self, table: &str, columns: Option<&[String]>, limit: u32) -> String;

    /// Bounded `SELECT DISTINCT` used by the column-values low-cardinality scan.
    fn build_distinct_query(&self, table: &str, column: &str, limit: u32) -> String {
        let quoted_col = self.quote_identifier(column);
        format!(
            "SELECT DISTINCT {quoted_col} FROM {table} WHERE {quoted_col} IS NOT NULL LIMIT {limit}"
        )
    }

    /// Populates `ctx.info` exactly once; no dependency on any other phase.
    async fn collect_info(&self, executor: &dyn Executor) -> anyhow::Result<crate::model::DialectInfo>;

    /// Every table name in scope (schema-qualified), excluding system schemas.
    async fn get_all_table_names(&self, executor: &dyn Executor) -> anyhow::Result<Vec<String>>;

    /// Fetches one table's shape (columns only; row count/indexes/constraints
    /// are filled in by later phases).
    async fn get_table(&self, executor: &dyn Executor, name: &str) -> anyhow::Result<Table>;

    /// Outgoing FKs (this table references others), grouped by constraint
    /// name and ordered by ordinal position.
    async fn find_outgoing_relations(
        &self,
        executor: &dyn Executor,
        name: &str,
    ) -> anyhow::Result<Vec<Relationship>>;

    /// Incoming FKs (other tables reference this one).
    async fn find_incoming_relations(
        &self,
        executor: &dyn Executor,
        name: &str,
    ) -> anyhow::Result<Vec<Relationship>>;

    /// BigQuery dataset scoping gate; every other dialect allows everything.
    fn is_dataset_allowed(&self, _schema: &str) -> bool {
        true
    }

    async fn list_views(&self, executor: &dyn Executor) -> anyhow::Result<Vec<View>>;

    /// Metadata-estimated row count (statistics view), when the dialect has one.
    async fn estimate_row_count(
        &self,
        _executor: &dyn Executor,
        _name: &str,
    ) -> anyhow::Result<Option<u64>> {
        Ok(None)
    }

    async fn count_exact(&self, executor: &dyn Executor, name: &str) -> anyhow::Result<u64>;

    async fn fetch_indexes(
        &self,
        executor: &dyn Executor,
        name: &str,
    ) -> anyhow::Result<Vec<crate::model::TableIndex>>;

    async fn fetch_constraints(
        &self,
        executor: &dyn Executor,
        name: &str,
    ) -> anyhow::Result<Vec<crate::model::TableConstraint>>;

    async fn fetch_column_stats(
        &self,
        executor: &dyn Executor,
        table: &str,
        column: &str,
    ) -> anyhow::Result<Option<crate::model::ColumnStats>>;

    /// Native enum values (PostgreSQL enum types, MySQL `ENUM(...)`), when supported.
    async fn collect_enum_values(
        &self,
        _executor: &dyn Executor,
        _table: &str,
        _column: &str,
    ) -> anyhow::Result<Option<Vec<String>>> {
        Ok(None)
    }

    /// Wraps `sql` with the dialect's natural dry-run primitive
    /// (`EXPLAIN`, `PARSEONLY`, BigQuery dry-run) when the caller supplies
    /// no `Validate` capability of its own.
    fn dry_run_wrap(&self, sql: &str) -> String {
        format!("EXPLAIN {sql}")
    }

    /// Maps an engine error message to a canonical kind and a hint.
    fn classify_error(&self, message: &str) -> (ErrorKind, String);
}

/// Construction-time options shared by every dialect, before dialect-specific extension.
pub struct AdapterOptions {
    pub executor: Arc<dyn Executor>,
    pub validator: Option<Arc<dyn Validate>>,
    pub groundings: Vec<Box<dyn Grounding>>,
}

/// Dialect-agnostic orchestration: owns the dialect hooks, the executor, the
/// optional validator, and the ordered grounding list, and drives `introspect()`.
pub struct Adapter {
    dialect: Arc<dyn DialectAdapter>,
    executor: Arc<dyn Executor>,
    validator: Option<Arc<dyn Validate>>,
    groundings: Vec<Box<dyn Grounding>>,
}

impl Adapter {
    pub fn new(
        dialect: Arc<dyn DialectAdapter>,
        options: AdapterOptions,
    ) -> Result<Self> {
        if options.groundings.is_empty() {
            return Err(GroundingError::Configuration {
                message: "adapter requires at least one grounding phase".to_string(),
            });
        }
        Ok(Adapter {
            dialect,
            executor: options.executor,
            validator: options.validator,
            groundings: options.groundings,
        })
    }

    pub fn dialect(&self) -> &dyn DialectAdapter {
        self.dialect.as_ref()
    }

    pub fn executor(&self) -> &dyn Executor {
        self.executor.as_ref()
    }

    /// Runs every configured grounding in order against a fresh context and
    /// projects the result into fragments. Equivalent to
    /// `introspect_cancellable` with a token that is never tripped.
    pub async fn introspect(&self) -> Result<Vec<Fragment>> {
        self.introspect_cancellable(&CancellationToken::new()).await
    }

    pub async fn introspect_cancellable(&self, token: &CancellationToken) -> Result<Vec<Fragment>> {
        let mut ctx = GroundingContext::new();
        for grounding in &self.groundings {
            if token.is_cancelled() {
                return Err(GroundingError::Cancelled {
                    phase: grounding.name().to_string(),
                });
            }
            grounding.run(self, &mut ctx, token).await?;
        }
        Ok(fragment::emit(&ctx))
    }

    /// Dry-runs `sql` and returns either an empty string (success) or a
    /// JSON-encoded `{error, error_type, suggestion, sql_attempted}` diagnostic.
    pub async fn validate(&self, sql: &str) -> String {
        crate::validate::validate(
            self.dialect.as_ref(),
            self.executor.as_ref(),
            self.validator.as_deref(),
            sql,
        )
        .await
    }
}
