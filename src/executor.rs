//! The caller-supplied "run SQL, return rows" capability and the optional
//! dry-run validator. The engine never opens a connection itself.

use crate::error::{GroundingError, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Opaque async query capability. Implementations normally wrap a pooled
/// connection; this crate only ever calls `execute`.
#[async_trait]
pub trait Executor: Send + Sync {
    async fn execute(&self, sql: &str) -> anyhow::Result<Value>;
}

/// Optional dry-run capability. When a dialect has no natural primitive
/// supplied by the caller, the adapter falls back to its own (`EXPLAIN`,
/// `PARSEONLY`, or a BigQuery dry-run query) built on top of `Executor`.
#[async_trait]
pub trait Validate: Send + Sync {
    async fn validate(&self, sql: &str) -> anyhow::Result<()>;
}

/// Normalizes the two row shapes an executor may return: a bare array, or a
/// wrapper carrying `rows` or `recordset` (SQL Server idiom).
pub fn normalize_rows(value: Value) -> Result<Vec<Value>> {
    match value {
        Value::Array(rows) => Ok(rows),
        Value::Object(mut map) => {
            if let Some(Value::Array(rows)) = map.remove("rows") {
                Ok(rows)
            } else if let Some(Value::Array(rows)) = map.remove("recordset") {
                Ok(rows)
            } else {
                Err(GroundingError::ExecutorFailure {
                    query_kind: "unknown".to_string(),
                    message: "executor returned an object without a `rows` or `recordset` array"
                        .to_string(),
                })
            }
        }
        other => Err(GroundingError::ExecutorFailure {
            query_kind: "unknown".to_string(),
            message: format!(
                "executor must return an array or {{rows}}/{{recordset}} wrapper, got {other}"
            ),
        }),
    }
}

/// Runs `sql`, normalizes the row shape, and deserializes each row into `T`.
pub async fn run_query<T: DeserializeOwned>(
    executor: &dyn Executor,
    query_kind: &str,
    sql: &str,
) -> Result<Vec<T>> {
    let raw = executor
        .execute(sql)
        .await
        .map_err(|e| GroundingError::ExecutorFailure {
            query_kind: query_kind.to_string(),
            message: e.to_string(),
        })?;
    let rows = normalize_rows(raw)?;
    rows.into_iter()
        .map(|row| {
            serde_json::from_value(row).map_err(|source| GroundingError::RowShape {
                query_kind: query_kind.to_string(),
                source,
            })
        })
        .collect()
}

/// Tolerant numeric coercion: finite numbers, big integers, and non-empty
/// numeric-looking strings all coerce; everything else yields `None`.
pub fn to_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                trimmed.parse::<f64>().ok()
            }
        }
        _ => None,
    }
}
