//! Row-count grounding: prefers a metadata estimate when available and
//! positive, otherwise falls back to `COUNT(*)`. Sets `rowCount` and derives
//! `sizeHint`.

use super::Grounding;
use crate::adapter::Adapter;
use crate::cancel::CancellationToken;
use crate::error::{GroundingError, Result};
use crate::model::{GroundingContext, SizeHint};
use async_trait::async_trait;

pub struct RowCountGrounding;

pub fn row_count() -> Box<dyn Grounding> {
    Box::new(RowCountGrounding)
}

#[async_trait]
impl Grounding for RowCountGrounding {
    fn name(&self) -> &str {
        "row_count"
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

            let estimate = match dialect.estimate_row_count(executor, &name).await {
                Ok(v) => v,
                Err(e) => {
                    tracing::warn!(table = %name, error = %e, "row count estimate query failed, falling back to COUNT(*)");
                    None
                }
            };

            let count = match estimate {
                Some(c) => c,
                None => match dialect.count_exact(executor, &name).await {
                    Ok(c) => c,
                    Err(e) => {
                        tracing::warn!(table = %name, error = %e, "COUNT(*) failed, leaving row count unset");
                        continue;
                    }
                },
            };

            if let Some(table) = ctx.table_mut(&name) {
                table.row_count = Some(count);
                table.size_hint = Some(SizeHint::classify(count));
            }
        }

        Ok(())
    }
}
