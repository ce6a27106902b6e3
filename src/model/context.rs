//! The mutable accumulator threaded through a single introspection run.

use super::schema::{DialectInfo, Relationship, Table, View};
use std::collections::HashSet;

/// Scoped to exactly one `introspect()` call. Created empty, mutated by
/// groundings in phase order, consumed by the fragment emitter, then
/// dropped. Never shared across concurrent runs.
#[derive(Debug, Default)]
pub struct GroundingContext {
    pub info: Option<DialectInfo>,
    pub tables: Vec<Table>,
    pub views: Vec<View>,
    pub relationships: Vec<Relationship>,
    pub report: Option<String>,

    seen_relationships: HashSet<(String, Vec<String>, String, Vec<String>)>,
}

impl GroundingContext {
    pub fn new() -> Self {
        GroundingContext::default()
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn table_mut(&mut self, name: &str) -> Option<&mut Table> {
        self.tables.iter_mut().find(|t| t.name == name)
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.tables.iter().any(|t| t.name == name)
    }

    pub fn view_mut(&mut self, name: &str) -> Option<&mut View> {
        self.views.iter_mut().find(|v| v.name == name)
    }

    /// Appends a table unless one with the same name is already present.
    pub fn push_table_if_new(&mut self, table: Table) {
        if !self.has_table(&table.name) {
            self.tables.push(table);
        }
    }

    pub fn push_view_if_new(&mut self, view: View) {
        if !self.views.iter().any(|v| v.name == view.name) {
            self.views.push(view);
        }
    }

    /// Appends a relationship unless its dedup key has already been recorded
    /// in this run. Returns whether it was newly inserted.
    pub fn push_relationship_if_new(&mut self, relationship: Relationship) -> bool {
        let key = relationship.dedup_key();
        if self.seen_relationships.contains(&key) {
            return false;
        }
        self.seen_relationships.insert(key);
        self.relationships.push(relationship);
        true
    }
}
