//! Unit tests for schema-grounder.
//!
//! This file serves as the entry point for all unit tests.

#[path = "unit/filter_tests.rs"]
mod filter_tests;

#[path = "unit/schema_tests.rs"]
mod schema_tests;
