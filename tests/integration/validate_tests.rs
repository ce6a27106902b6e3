//! `Adapter::validate` dry-run diagnostic shape, using a caller-free dialect
//! fallback (`dry_run_wrap` + `Executor`) rather than a supplied `Validate`.

use async_trait::async_trait;
use schema_grounder::dialects::sqlite::{self, SqliteOptions};
use schema_grounder::{info, AdapterOptions, Executor};
use serde_json::Value;
use std::sync::Arc;

struct AlwaysFailsExecutor;

#[async_trait]
impl Executor for AlwaysFailsExecutor {
    async fn execute(&self, sql: &str) -> anyhow::Result<Value> {
        if sql.starts_with("EXPLAIN QUERY PLAN") {
            Err(anyhow::anyhow!("no such table: bogus"))
        } else {
            Ok(Value::Array(Vec::new()))
        }
    }
}

struct AlwaysSucceedsExecutor;

#[async_trait]
impl Executor for AlwaysSucceedsExecutor {
    async fn execute(&self, _sql: &str) -> anyhow::Result<Value> {
        Ok(Value::Array(Vec::new()))
    }
}

fn adapter_with(executor: Arc<dyn Executor>) -> schema_grounder::Adapter {
    let options = AdapterOptions {
        executor,
        validator: None,
        groundings: vec![info()],
    };
    sqlite::build(SqliteOptions::default(), options).expect("adapter construction should succeed")
}

#[tokio::test]
async fn successful_dry_run_returns_an_empty_string() {
    let adapter = adapter_with(Arc::new(AlwaysSucceedsExecutor));
    let result = adapter.validate("SELECT * FROM bogus").await;
    assert_eq!(result, "");
}

#[tokio::test]
async fn failed_dry_run_returns_a_structured_diagnostic() {
    let adapter = adapter_with(Arc::new(AlwaysFailsExecutor));
    let result = adapter.validate("SELECT * FROM bogus").await;
    assert!(!result.is_empty());

    let parsed: Value = serde_json::from_str(&result).expect("diagnostic should be valid JSON");
    assert_eq!(parsed["error_type"], "MISSING_TABLE");
    assert_eq!(parsed["sql_attempted"], "SELECT * FROM bogus");
    assert_eq!(parsed["error"], "no such table: bogus");
    assert!(parsed["suggestion"].as_str().unwrap().contains("table name"));
}
