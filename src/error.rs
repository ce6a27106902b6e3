//! Error types for schema-grounder

use thiserror::Error;

/// Errors that can occur while assembling or emitting a grounding.
#[derive(Error, Debug)]
pub enum GroundingError {
    #[error("invalid adapter configuration: {message}")]
    Configuration { message: String },

    #[error("executor failed while running {query_kind} query: {message}")]
    ExecutorFailure { query_kind: String, message: String },

    #[error("failed to deserialize rows returned by executor for {query_kind}: {source}")]
    RowShape {
        query_kind: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("no seed tables resolved for schema filter {filter}")]
    NoSeedTables { filter: String },

    #[error("grounding phase {phase} was cancelled")]
    Cancelled { phase: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, GroundingError>;

/// Canonical classification of a failed dry-run validation, per the
/// error handling design: every adapter failure is mapped into one of
/// these kinds rather than propagated as a raw string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    MissingTable,
    InvalidColumn,
    SyntaxError,
    InvalidFunction,
    ConstraintError,
    UnknownError,
}
