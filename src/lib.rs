//! schema-grounder: introspects a relational database and produces a
//! structured "grounding" (tables, views, relationships, and optional
//! business context) for an LLM agent to consult before writing SQL
//! against a schema it has never seen.
//!
//! The crate never opens a connection itself. Callers supply an
//! [`Executor`] that runs SQL and returns rows as JSON, pick a
//! [`DialectAdapter`] for their engine (`adapter::postgresql`,
//! `adapter::mysql`, `adapter::sqlserver`, `adapter::sqlite`,
//! `adapter::bigquery`, or the spreadsheet-backed `adapter::spreadsheet`),
//! and assemble an ordered list of [`Grounding`] phases. [`Adapter::introspect`]
//! drives the phases and returns the resulting [`Fragment`] sequence.

mod adapter;
mod cancel;
mod error;
mod executor;
mod filter;
mod fragment;
mod grounding;
mod model;
mod validate;

pub use adapter::{Adapter, AdapterOptions, DialectAdapter};
pub use cancel::CancellationToken;
pub use error::{ErrorKind, GroundingError, Result};
pub use executor::{Executor, Validate};
pub use filter::{Depth, TableFilter};
pub use fragment::{ColumnFragment, ConstraintFragment, Fragment, IndexFragment, RelationshipEndpoint};
pub use grounding::{
    column_stats, column_values, constraints, indexes, info, report, row_count, tables, views,
    ColumnStatsGrounding, ColumnValuesConfig, ColumnValuesGrounding, ConstraintsGrounding, Grounding,
    IndexesGrounding, InfoGrounding, ReportAgent, ReportCache, ReportConfig, ReportGrounding,
    RowCountGrounding, TablesConfig, TablesGrounding, ViewsConfig, ViewsGrounding,
};
pub use model::{
    Cardinality, Column, ColumnKind, ColumnStats, ConstraintType, DialectInfo, GroundingContext,
    Relationship, SizeHint, Table, TableConstraint, TableIndex, View,
};

pub mod dialects {
    //! Per-dialect `Options`/`Adapter` types and `build()` constructors.
    pub use crate::adapter::bigquery;
    pub use crate::adapter::mysql;
    pub use crate::adapter::postgresql;
    pub use crate::adapter::spreadsheet;
    pub use crate::adapter::sqlite;
    pub use crate::adapter::sqlserver;
}
