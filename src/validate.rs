//! Dry-run validation: wraps the dialect's natural dry-run primitive (or a
//! caller-supplied `Validate` capability) and turns failures into a
//! structured diagnostic string instead of propagating an error.

use crate::adapter::DialectAdapter;
use crate::executor::{Executor, Validate};
use serde::Serialize;

#[derive(Serialize)]
struct Diagnostic<'a> {
    error: &'a str,
    error_type: &'a str,
    suggestion: &'a str,
    sql_attempted: &'a str,
}

fn error_type_tag(kind: crate::error::ErrorKind) -> &'static str {
    use crate::error::ErrorKind::*;
    match kind {
        MissingTable => "MISSING_TABLE",
        InvalidColumn => "INVALID_COLUMN",
        SyntaxError => "SYNTAX_ERROR",
        InvalidFunction => "INVALID_FUNCTION",
        ConstraintError => "CONSTRAINT_ERROR",
        UnknownError => "UNKNOWN_ERROR",
    }
}

/// Returns an empty string on success, or a JSON-encoded diagnostic object
/// `{error, error_type, suggestion, sql_attempted}` otherwise. Never returns
/// an `Err`: dry-run failures are data, not exceptions.
pub async fn validate(
    dialect: &dyn DialectAdapter,
    executor_impl: &dyn Executor,
    validator: Option<&dyn Validate>,
    sql: &str,
) -> String {
    let outcome = if let Some(validator) = validator {
        validator.validate(sql).await
    } else {
        let wrapped = dialect.dry_run_wrap(sql);
        executor_impl.execute(&wrapped).await.map(|_| ())
    };

    match outcome {
        Ok(()) => String::new(),
        Err(err) => {
            let message = err.to_string();
            let (kind, hint) = dialect.classify_error(&message);
            let diagnostic = Diagnostic {
                error: &message,
                error_type: error_type_tag(kind),
                suggestion: &hint,
                sql_attempted: sql,
            };
            serde_json::to_string(&diagnostic).unwrap_or_default()
        }
    }
}
