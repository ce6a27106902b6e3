//! Column-values grounding: the value-resolution core. For each column in
//! each table and view, resolves a `values` annotation by consulting three
//! sources in strict priority order, stopping at the first hit: native
//! enum, CHECK-constraint parsing, low-cardinality scan.

use super::Grounding;
use crate::adapter::Adapter;
use crate::cancel::CancellationToken;
use crate::error::{GroundingError, Result};
use crate::executor::{normalize_rows, Executor};
use crate::model::{ColumnKind, ConstraintType, GroundingContext};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

pub const DEFAULT_LOW_CARDINALITY_LIMIT: usize = 20;

#[derive(Debug, Clone)]
pub struct ColumnValuesConfig {
    pub low_cardinality_limit: usize,
}

impl Default for ColumnValuesConfig {
    fn default() -> Self {
        ColumnValuesConfig {
            low_cardinality_limit: DEFAULT_LOW_CARDINALITY_LIMIT,
        }
    }
}

pub struct ColumnValuesGrounding {
    config: ColumnValuesConfig,
}

impl ColumnValuesGrounding {
    pub fn new(config: ColumnValuesConfig) -> Self {
        ColumnValuesGrounding { config }
    }

    /// Resolves one column's `values` annotation, or `None` if no source
    /// produced one. Any executor error propagates to the caller, which logs
    /// and absorbs it: a per-entity failure never aborts the grounding for
    /// other columns.
    async fn resolve_column(
        &self,
        adapter: &Adapter,
        table: &str,
        column: &str,
        checks: &[(Vec<String>, String)],
    ) -> anyhow::Result<Option<(ColumnKind, Vec<String>)>> {
        let dialect = adapter.dialect();
        let executor = adapter.executor();

        if let Some(values) = dialect.collect_enum_values(executor, table, column).await? {
            if !values.is_empty() {
                return Ok(Some((ColumnKind::Enum, values)));
            }
        }

        for (check_columns, definition) in checks {
            if !check_columns.is_empty() && !check_columns.iter().any(|c| c == column) {
                continue;
            }
            if let Some(values) = extract_check_values(definition, column) {
                if !values.is_empty() {
                    return Ok(Some((ColumnKind::Enum, values)));
                }
            }
        }

        if self.config.low_cardinality_limit == 0 {
            return Ok(None);
        }

        let sql = dialect.build_distinct_query(table, column, (self.config.low_cardinality_limit + 1) as u32);
        let raw = executor.execute(&sql).await?;
        let rows = normalize_rows(raw).map_err(anyhow::Error::from)?;
        if rows.len() > self.config.low_cardinality_limit {
            return Ok(None);
        }

        let mut values = Vec::with_capacity(rows.len());
        for row in rows {
            let cell = first_field(row);
            match normalize_value(&cell) {
                Some(s) => values.push(s),
                None => return Ok(None),
            }
        }
        if values.is_empty() {
            return Ok(None);
        }
        Ok(Some((ColumnKind::LowCardinality, values)))
    }
}

/// Pulls the sole value out of a `{"col": value}` row (or passes through a
/// bare scalar, in case an executor returns rows that way already).
fn first_field(row: Value) -> Value {
    match row {
        Value::Object(map) => map.into_values().next().unwrap_or(Value::Null),
        other => other,
    }
}

/// Normalizes one distinct-scan value into its string form: text as-is,
/// numbers stringified, booleans to `"true"`/`"false"`. Dates and binary
/// data are expected to already arrive as ISO-8601 / UTF-8 text, since the
/// executor's row transport is JSON and carries no native Date/bytes type.
/// Objects and arrays are non-normalizable and signal the caller to abandon
/// the whole column.
fn normalize_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => None,
        Value::Array(_) | Value::Object(_) => None,
    }
}

static CHECK_IN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?is)\(?\s*["'`]?(?P<col>[A-Za-z_][A-Za-z0-9_]*)["'`]?\s*(?:::\s*[A-Za-z_][A-Za-z0-9_]*)?\s*\)?\s*(?:::\s*[A-Za-z_][A-Za-z0-9_]*)?\s+IN\s*\(\s*(?P<list>'(?:[^'\\]|\\.)*'(?:\s*::\s*[A-Za-z_][A-Za-z0-9_]*)?(?:\s*,\s*'(?:[^'\\]|\\.)*'(?:\s*::\s*[A-Za-z_][A-Za-z0-9_]*)?)*)\s*\)"#,
    )
    .unwrap()
});

static CHECK_ANY_ARRAY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?is)(?P<col>[A-Za-z_][A-Za-z0-9_]*)\s*=\s*ANY\s*\(\s*ARRAY\s*\[\s*(?P<list>'(?:[^'\\]|\\.)*'(?:\s*::\s*[A-Za-z_][A-Za-z0-9_]*)?(?:\s*,\s*'(?:[^'\\]|\\.)*'(?:\s*::\s*[A-Za-z_][A-Za-z0-9_]*)?)*)\s*\]\s*\)"#,
    )
    .unwrap()
});

static QUOTED_LITERAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"'((?:[^'\\]|\\.)*)'").unwrap());

/// Tries three CHECK-constraint shapes in order: `IN (...)`, PostgreSQL
/// `= ANY(ARRAY[...])`, and two-or-more disjoined `column = 'val'` clauses.
/// Returns the first match whose captured column is `column`.
fn extract_check_values(definition: &str, column: &str) -> Option<Vec<String>> {
    for caps in CHECK_IN.captures_iter(definition) {
        if column_matches(&caps, column) {
            let list = caps.name("list").unwrap().as_str();
            return Some(quoted_literals(list));
        }
    }
    for caps in CHECK_ANY_ARRAY.captures_iter(definition) {
        if column_matches(&caps, column) {
            let list = caps.name("list").unwrap().as_str();
            return Some(quoted_literals(list));
        }
    }
    parse_disjunction(definition, column)
}

fn column_matches(caps: &regex::Captures, column: &str) -> bool {
    caps.name("col")
        .map(|m| m.as_str().eq_ignore_ascii_case(column))
        .unwrap_or(false)
}

fn quoted_literals(list: &str) -> Vec<String> {
    QUOTED_LITERAL
        .captures_iter(list)
        .map(|c| c[1].replace("\\'", "'"))
        .collect()
}

/// `regex` has no backreferences, so the "two or more `col = 'val'`
/// clauses" shape is matched by building a column-specific pattern at
/// lookup time and requiring at least two hits, rather than a single
/// backreferenced pattern.
fn parse_disjunction(definition: &str, column: &str) -> Option<Vec<String>> {
    let pattern = format!(
        r"(?i){}\s*=\s*'((?:[^'\\]|\\.)*)'",
        regex::escape(column)
    );
    let re = Regex::new(&pattern).ok()?;
    let values: Vec<String> = re
        .captures_iter(definition)
        .map(|c| c[1].replace("\\'", "'"))
        .collect();
    if values.len() >= 2 {
        Some(values)
    } else {
        None
    }
}

pub fn column_values(config: ColumnValuesConfig) -> Box<dyn Grounding> {
    Box::new(ColumnValuesGrounding::new(config))
}

#[async_trait]
impl Grounding for ColumnValuesGrounding {
    fn name(&self) -> &str {
        "column_values"
    }

    async fn run(
        &self,
        adapter: &Adapter,
        ctx: &mut GroundingContext,
        token: &CancellationToken,
    ) -> Result<()> {
        let table_targets: Vec<(String, Vec<String>, Vec<(Vec<String>, String)>)> = ctx
            .tables
            .iter()
            .map(|t| {
                let columns = t.columns.iter().map(|c| c.name.clone()).collect();
                let checks = t
                    .constraints
                    .iter()
                    .filter(|c| c.constraint_type == ConstraintType::Check)
                    .filter_map(|c| c.definition.clone().map(|d| (c.columns.clone(), d)))
                    .collect();
                (t.name.clone(), columns, checks)
            })
            .collect();

        for (table_name, columns, checks) in table_targets {
            for column_name in columns {
                if token.is_cancelled() {
                    return Err(GroundingError::Cancelled {
                        phase: self.name().to_string(),
                    });
                }
                match self.resolve_column(adapter, &table_name, &column_name, &checks).await {
                    Ok(Some((kind, values))) => {
                        if let Some(table) = ctx.table_mut(&table_name) {
                            if let Some(column) = table.column_mut(&column_name) {
                                column.kind = Some(kind);
                                column.values = values;
                            }
                        }
                    }
                    Ok(None) => {}
                    Err(e) => {
                        tracing::warn!(
                            table = %table_name, column = %column_name, error = %e,
                            "column value resolution failed, leaving column unannotated"
                        );
                    }
                }
            }
        }

        let view_targets: Vec<(String, Vec<String>)> = ctx
            .views
            .iter()
            .map(|v| (v.name.clone(), v.columns.iter().map(|c| c.name.clone()).collect()))
            .collect();

        for (view_name, columns) in view_targets {
            for column_name in columns {
                if token.is_cancelled() {
                    return Err(GroundingError::Cancelled {
                        phase: self.name().to_string(),
                    });
                }
                match self.resolve_column(adapter, &view_name, &column_name, &[]).await {
                    Ok(Some((kind, values))) => {
                        if let Some(view) = ctx.view_mut(&view_name) {
                            if let Some(column) = view.columns.iter_mut().find(|c| c.name == column_name) {
                                column.kind = Some(kind);
                                column.values = values;
                            }
                        }
                    }
                    Ok(None) => {}
                    Err(e) => {
                        tracing::warn!(
                            view = %view_name, column = %column_name, error = %e,
                            "column value resolution failed, leaving column unannotated"
                        );
                    }
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_simple_in_list() {
        let values = extract_check_values("status IN ('pending', 'completed')", "status").unwrap();
        assert_eq!(values, vec!["pending".to_string(), "completed".to_string()]);
    }

    #[test]
    fn extracts_in_list_with_cast_and_parens() {
        let values =
            extract_check_values("((status)::text IN ('a'::text, 'b'::text))", "status").unwrap();
        assert_eq!(values, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn extracts_any_array() {
        let values =
            extract_check_values("status = ANY (ARRAY['a'::text, 'b'::text])", "status").unwrap();
        assert_eq!(values, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn extracts_disjunction() {
        let values =
            extract_check_values("status = 'a' OR status = 'b' OR status = 'c'", "status").unwrap();
        assert_eq!(values, vec!["a".to_string(), "b".to_string(), "c".to_string()]);
    }

    #[test]
    fn rejects_single_equality_as_not_a_disjunction() {
        assert!(extract_check_values("status = 'a'", "status").is_none());
    }

    #[test]
    fn ignores_unrelated_column() {
        assert!(extract_check_values("kind IN ('a', 'b')", "status").is_none());
    }
}
