//! Report grounding: optionally generates a business-context narrative by
//! delegating to an external LLM agent with tool access limited to
//! `execute`. Contract: check cache → if miss, drive the agent → write
//! `ctx.report` → populate cache. The agent runtime and its prompt
//! engineering are out of scope; this module only models the contract the
//! caller's agent implementation must satisfy.

use super::Grounding;
use crate::adapter::Adapter;
use crate::cancel::CancellationToken;
use crate::error::{GroundingError, Result};
use crate::executor::Executor;
use crate::model::GroundingContext;
use async_trait::async_trait;
use std::sync::Arc;

/// Caller-supplied narrative generator. Receives the accumulated context so
/// far (every prior-ordered grounding has already run) and the raw executor
/// so it can drive its own tool-call loop.
#[async_trait]
pub trait ReportAgent: Send + Sync {
    async fn generate(
        &self,
        executor: &dyn Executor,
        ctx: &GroundingContext,
        model: Option<&str>,
    ) -> anyhow::Result<String>;
}

/// Caller-supplied cache. The engine never owns cache storage; absent cache
/// means always regenerate.
#[async_trait]
pub trait ReportCache: Send + Sync {
    async fn get(&self) -> anyhow::Result<Option<String>>;
    async fn set(&self, value: &str) -> anyhow::Result<()>;
}

#[derive(Clone, Default)]
pub struct ReportConfig {
    pub agent: Option<Arc<dyn ReportAgent>>,
    pub cache: Option<Arc<dyn ReportCache>>,
    pub model: Option<String>,
    pub force_refresh: bool,
}

pub struct ReportGrounding {
    config: ReportConfig,
}

impl ReportGrounding {
    pub fn new(config: ReportConfig) -> Self {
        ReportGrounding { config }
    }
}

pub fn report(config: ReportConfig) -> Box<dyn Grounding> {
    Box::new(ReportGrounding::new(config))
}

#[async_trait]
impl Grounding for ReportGrounding {
    fn name(&self) -> &str {
        "report"
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

        let Some(agent) = &self.config.agent else {
            tracing::debug!("no report agent configured, skipping business-context grounding");
            return Ok(());
        };

        if !self.config.force_refresh {
            if let Some(cache) = &self.config.cache {
                match cache.get().await {
                    Ok(Some(cached)) => {
                        ctx.report = Some(cached);
                        return Ok(());
                    }
                    Ok(None) => {}
                    Err(e) => {
                        tracing::warn!(error = %e, "report cache read failed, regenerating");
                    }
                }
            }
        }

        let report = agent
            .generate(adapter.executor(), ctx, self.config.model.as_deref())
            .await?;

        if let Some(cache) = &self.config.cache {
            if let Err(e) = cache.set(&report).await {
                tracing::warn!(error = %e, "failed to populate report cache");
            }
        }

        ctx.report = Some(report);
        Ok(())
    }
}
