//! Constraint grounding: emits PRIMARY_KEY, FOREIGN_KEY, UNIQUE, CHECK,
//! NOT_NULL, DEFAULT per table.
//!
//! A `PRIMARY_KEY` constraint implies its columns are NOT NULL, so any
//! `NOT_NULL` constraint whose columns are a subset of the table's PK
//! columns is dropped here, once, in the dialect-agnostic phase rather than
//! duplicated per dialect query.

use super::Grounding;
use crate::adapter::Adapter;
use crate::cancel::CancellationToken;
use crate::error::{GroundingError, Result};
use crate::model::{ConstraintType, GroundingContext};
use async_trait::async_trait;
use std::collections::HashSet;

pub struct ConstraintsGrounding;

pub fn constraints() -> Box<dyn Grounding> {
    Box::new(ConstraintsGrounding)
}

#[async_trait]
impl Grounding for ConstraintsGrounding {
    fn name(&self) -> &str {
        "constraints"
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

            let mut fetched = match dialect.fetch_constraints(executor, &name).await {
                Ok(constraints) => constraints,
                Err(e) => {
                    tracing::warn!(table = %name, error = %e, "failed to fetch constraints");
                    continue;
                }
            };

            let pk_columns: HashSet<String> = fetched
                .iter()
                .find(|c| c.constraint_type == ConstraintType::PrimaryKey)
                .map(|c| c.columns.iter().cloned().collect())
                .unwrap_or_default();
            fetched.retain(|c| {
                !(c.constraint_type == ConstraintType::NotNull
                    && !c.columns.is_empty()
                    && c.columns.iter().all(|col| pk_columns.contains(col)))
            });

            if let Some(table) = ctx.table_mut(&name) {
                table.constraints = fetched;
            }
        }

        Ok(())
    }
}
