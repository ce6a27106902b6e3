//! Schema data model: the entities a grounding run accumulates.

use serde::{Deserialize, Serialize};

/// Metadata about the dialect/engine being introspected. Populated once by
/// the info grounding and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialectInfo {
    pub dialect: String,
    pub version: Option<String>,
    pub database: Option<String>,
    pub details: std::collections::BTreeMap<String, String>,
}

/// Coarse-grained size classification, derived from `row_count`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeHint {
    Tiny,
    Small,
    Medium,
    Large,
    Huge,
}

impl SizeHint {
    /// `<100 -> tiny; <1,000 -> small; <10,000 -> medium; <100,000 -> large; else huge`.
    pub fn classify(row_count: u64) -> SizeHint {
        if row_count < 100 {
            SizeHint::Tiny
        } else if row_count < 1_000 {
            SizeHint::Small
        } else if row_count < 10_000 {
            SizeHint::Medium
        } else if row_count < 100_000 {
            SizeHint::Large
        } else {
            SizeHint::Huge
        }
    }
}

/// Why a column's `values` were populated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Enum,
    LowCardinality,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnStats {
    pub min: Option<String>,
    pub max: Option<String>,
    pub null_fraction: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub data_type: String,
    pub kind: Option<ColumnKind>,
    pub values: Vec<String>,
    pub is_indexed: bool,
    pub stats: Option<ColumnStats>,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Column {
            name: name.into(),
            data_type: data_type.into(),
            kind: None,
            values: Vec::new(),
            is_indexed: false,
            stats: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableIndex {
    pub name: String,
    pub columns: Vec<String>,
    pub unique: bool,
    pub index_type: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConstraintType {
    PrimaryKey,
    ForeignKey,
    Unique,
    Check,
    NotNull,
    Default,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableConstraint {
    pub name: String,
    pub constraint_type: ConstraintType,
    pub columns: Vec<String>,
    pub definition: Option<String>,
    pub default_value: Option<String>,
    pub referenced_table: Option<String>,
    pub referenced_columns: Vec<String>,
}

/// A table, identified by its (possibly schema/dataset-qualified) `name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub schema: Option<String>,
    pub raw_name: Option<String>,
    pub columns: Vec<Column>,
    pub row_count: Option<u64>,
    pub size_hint: Option<SizeHint>,
    pub indexes: Vec<TableIndex>,
    pub constraints: Vec<TableConstraint>,
}

impl Table {
    pub fn new(name: impl Into<String>, schema: Option<String>) -> Self {
        Table {
            name: name.into(),
            schema,
            raw_name: None,
            columns: Vec::new(),
            row_count: None,
            size_hint: None,
            indexes: Vec::new(),
            constraints: Vec::new(),
        }
    }

    pub fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| c.name == name)
    }

    pub fn primary_key_columns(&self) -> Vec<String> {
        self.constraints
            .iter()
            .find(|c| c.constraint_type == ConstraintType::PrimaryKey)
            .map(|c| c.columns.clone())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct View {
    pub name: String,
    pub schema: Option<String>,
    pub raw_name: Option<String>,
    pub definition: Option<String>,
    pub columns: Vec<Column>,
}

impl View {
    pub fn new(name: impl Into<String>, schema: Option<String>) -> Self {
        View {
            name: name.into(),
            schema,
            raw_name: None,
            definition: None,
            columns: Vec::new(),
        }
    }
}

/// An edge in the foreign-key graph: `from[i]` in `table` maps to `to[i]` in
/// `referenced_table`. Invariant: `from.len() == to.len() >= 1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub table: String,
    pub from: Vec<String>,
    pub referenced_table: String,
    pub to: Vec<String>,
}

impl Relationship {
    /// Dedup key: `(table, sorted(from), referenced_table, sorted(to))`.
    pub fn dedup_key(&self) -> (String, Vec<String>, String, Vec<String>) {
        let mut from = self.from.clone();
        let mut to = self.to.clone();
        from.sort();
        to.sort();
        (self.table.clone(), from, self.referenced_table.clone(), to)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Cardinality {
    ManyToOne,
    OneToOne,
    OneToMany,
}

impl Cardinality {
    /// `ratio > 5` -> many-to-one; `0.8 <= ratio < 1.2` -> one-to-one;
    /// `ratio < 0.2` -> one-to-many; otherwise unset. Requires `target > 0`.
    pub fn infer(source_row_count: u64, target_row_count: u64) -> Option<Cardinality> {
        if target_row_count == 0 {
            return None;
        }
        let ratio = source_row_count as f64 / target_row_count as f64;
        if ratio > 5.0 {
            Some(Cardinality::ManyToOne)
        } else if (0.8..1.2).contains(&ratio) {
            Some(Cardinality::OneToOne)
        } else if ratio < 0.2 {
            Some(Cardinality::OneToMany)
        } else {
            None
        }
    }
}
