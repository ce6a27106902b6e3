//! The nine grounding phases and the `Grounding` trait that drives them.
//!
//! Each submodule owns one phase's configuration struct, a free-function
//! constructor (`grounding::tables`, `grounding::views`, ...), and the
//! phase's `Grounding` impl. Phases run in
//! the order the caller lists them in `AdapterOptions::groundings`; nothing
//! in this module enforces an order beyond what each phase's own doc
//! comment states it depends on (tables before row-count/indexes/
//! constraints/column-stats/column-values; constraints before
//! column-values).

mod column_stats;
mod column_values;
mod constraints;
mod indexes;
mod info;
mod report;
mod row_count;
mod tables;
mod views;

pub use column_stats::{column_stats, ColumnStatsGrounding};
pub use column_values::{column_values, ColumnValuesConfig, ColumnValuesGrounding};
pub use constraints::{constraints, ConstraintsGrounding};
pub use indexes::{indexes, IndexesGrounding};
pub use info::{info, InfoGrounding};
pub use report::{report, ReportAgent, ReportCache, ReportConfig, ReportGrounding};
pub use row_count::{row_count, RowCountGrounding};
pub use tables::{tables, TablesConfig, TablesGrounding};
pub use views::{views, ViewsConfig, ViewsGrounding};

use crate::adapter::Adapter;
use crate::cancel::CancellationToken;
use crate::error::Result;
use crate::model::GroundingContext;
use async_trait::async_trait;

/// One pipeline phase. Receives the context by mutable reference and may
/// append entities or annotate ones earlier phases created, per
/// `GroundingContext`'s sanctioned mutation helpers; it must never remove
/// or replace an existing table/view entry.
#[async_trait]
pub trait Grounding: Send + Sync {
    /// Short tag used in cancellation errors and tracing spans, e.g. `"tables"`.
    fn name(&self) -> &str;

    async fn run(
        &self,
        adapter: &Adapter,
        ctx: &mut GroundingContext,
        token: &CancellationToken,
    ) -> Result<()>;
}
