//! Schema model: the entities and accumulator a grounding run populates.

mod context;
mod schema;

pub use context::GroundingContext;
pub use schema::*;
