//! Index grounding: fetches index definitions per table, then marks
//! `column.isIndexed = true` on every column referenced by at least one
//! index.

use super::Grounding;
use crate::adapter::Adapter;
use crate::cancel::CancellationToken;
use crate::error::{GroundingError, Result};
use crate::model::GroundingContext;
use async_trait::async_trait;
use std::collections::HashSet;

pub struct IndexesGrounding;

pub fn indexes() -> Box<dyn Grounding> {
    Box::new(IndexesGrounding)
}

#[async_trait]
impl Grounding for IndexesGrounding {
    fn name(&self) -> &str {
        "indexes"
    }

    async fn run(
        &self,
        adapter: &Adapter,
        ctx: &mut GroundingContext,
        token: &CancellationToken,
    ) -> Result<()> {
        let dialect = adapter.dialect();
        let executor = adapter.executor();
        let names: Vec<String> = ctx.tables.iter().map(|t| t.name.clone()).collect();

        for name in names {
            if token.is_cancelled() {
                return Err(GroundingError::Cancelled {
                    phase: self.name().to_string(),
                });
            }

            let fetched = match dialect.fetch_indexes(executor, &name).await {
                Ok(indexes) => indexes,
                Err(e) => {
                    tracing::warn!(table = %name, error = %e, "failed to fetch indexes");
                    continue;
                }
            };

            let Some(table) = ctx.table_mut(&name) else {
                continue;
            };
            let indexed_columns: HashSet<String> = fetched
                .iter()
                .flat_map(|idx| idx.columns.iter().cloned())
                .collect();
            table.indexes = fetched;
            for column in table.columns.iter_mut() {
                column.is_indexed = indexed_columns.contains(&column.name);
            }
        }

        Ok(())
    }
}
