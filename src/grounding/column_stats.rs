//! Column-stats grounding: for numeric / temporal / boolean columns
//! (type-string classified by regex), emits min, max, and null-fraction.

use super::Grounding;
use crate::adapter::Adapter;
use crate::cancel::CancellationToken;
use crate::error::{GroundingError, Result};
use crate::model::GroundingContext;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

static STATS_ELIGIBLE_TYPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^((tiny|small|big)?int(eger)?(2|4|8)?|numeric|decimal|float\d*|double|real|money|date|time(stamp)?|datetime\d*|bool(ean)?|bit)",
    )
    .unwrap()
});

fn is_stats_eligible(data_type: &str) -> bool {
    STATS_ELIGIBLE_TYPE.is_match(data_type.trim())
}

pub struct ColumnStatsGrounding;

pub fn column_stats() -> Box<dyn Grounding> {
    Box::new(ColumnStatsGrounding)
}

#[async_trait]
impl Grounding for ColumnStatsGrounding {
    fn name(&self) -> &str {
        "column_stats"
    }

    async fn run(
        &self,
        adapter: &Adapter,
        ctx: &mut GroundingContext,
        token: &CancellationToken,
    ) -> Result<()> {
        let dialect = adapter.dialect();
        let executor = adapter.executor();

        let targets: Vec<(String, Vec<String>)> = ctx
            .tables
            .iter()
            .map(|t| {
                let cols = t
                    .columns
                    .iter()
                    .filter(|c| is_stats_eligible(&c.data_type))
                    .map(|c| c.name.clone())
                    .collect();
                (t.name.clone(), cols)
            })
            .collect();

        for (table_name, columns) in targets {
            for column_name in columns {
                if token.is_cancelled() {
                    return Err(GroundingError::Cancelled {
                        phase: self.name().to_string(),
                    });
                }

                let stats = match dialect
                    .fetch_column_stats(executor, &table_name, &column_name)
                    .await
                {
                    Ok(stats) => stats,
                    Err(e) => {
                        tracing::warn!(
                            table = %table_name, column = %column_name, error = %e,
                            "failed to fetch column stats"
                        );
                        continue;
                    }
                };
                let Some(stats) = stats else { continue };

                if let Some(table) = ctx.table_mut(&table_name) {
                    if let Some(column) = table.column_mut(&column_name) {
                        column.stats = Some(stats);
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
    fn classifies_numeric_temporal_boolean_types() {
        for ty in ["integer", "bigint", "numeric(10,2)", "timestamp", "boolean", "date", "bit"] {
            assert!(is_stats_eligible(ty), "{ty} should be eligible");
        }
    }

    #[test]
    fn rejects_text_and_json_types() {
        for ty in ["text", "varchar(255)", "json", "jsonb", "uuid"] {
            assert!(!is_stats_eligible(ty), "{ty} should not be eligible");
        }
    }
}
