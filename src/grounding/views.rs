//! View grounding: enumerates views, applies the same filter shapes as
//! tables, and records each with its column list and DDL text. No
//! traversal.

use super::Grounding;
use crate::adapter::Adapter;
use crate::cancel::CancellationToken;
use crate::error::{GroundingError, Result};
use crate::filter::TableFilter;
use crate::model::GroundingContext;
use async_trait::async_trait;
use std::sync::Arc;

#[derive(Clone)]
pub struct ViewsConfig {
    pub filter: TableFilter,
}

impl Default for ViewsConfig {
    fn default() -> Self {
        ViewsConfig {
            filter: TableFilter::Predicate(Arc::new(|_| true)),
        }
    }
}

pub struct ViewsGrounding {
    config: ViewsConfig,
}

impl ViewsGrounding {
    pub fn new(config: ViewsConfig) -> Self {
        ViewsGrounding { config }
    }
}

pub fn views(config: ViewsConfig) -> Box<dyn Grounding> {
    Box::new(ViewsGrounding::new(config))
}

#[async_trait]
impl Grounding for ViewsGrounding {
    fn name(&self) -> &str {
        "views"
    }

    async fn run(
        &self,
        adapter: &Adapter,
        ctx: &mut GroundingContext,
        token: &CancellationToken,
    ) -> Result<()> {
        let candidates = adapter.dialect().list_views(adapter.executor()).await?;
        for view in candidates {
            if token.is_cancelled() {
                return Err(GroundingError::Cancelled {
                    phase: self.name().to_string(),
                });
            }
            if self.config.filter.matches(&view.name) {
                ctx.push_view_if_new(view);
            }
        }
        Ok(())
    }
}
