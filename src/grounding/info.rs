//! Info grounding: populates `ctx.info` exactly once. No dependency on any
//! other phase.

use super::Grounding;
use crate::adapter::Adapter;
use crate::cancel::CancellationToken;
use crate::error::{GroundingError, Result};
use crate::model::GroundingContext;
use async_trait::async_trait;

pub struct InfoGrounding;

#[async_trait]
impl Grounding for InfoGrounding {
    fn name(&self) -> &str {
        "info"
    }

    async fn run(
        &self,
        adapter: &Adapter,
        ctx: &mut GroundingContext,
        token: &CancellationToken,
    ) -> Result<()> {
        if token.is_cancelled() {
            return Err(GroundingError::Cancelled {
                phase: self.name().to_string(),
            });
        }
        let info = adapter.dialect().collect_info(adapter.executor()).await?;
        tracing::debug!(dialect = %info.dialect, version = ?info.version, "collected dialect info");
        ctx.info = Some(info);
        Ok(())
    }
}

pub fn info() -> Box<dyn Grounding> {
    Box::new(InfoGrounding)
}
