//! Fragment emitter: after all groundings complete, projects the context
//! into a stable, dialect-agnostic fragment sequence. `emit` is a pure
//! function `&GroundingContext -> Vec<Fragment>`; it never mutates the
//! context it reads.

use crate::model::{
    Cardinality, ColumnKind, ColumnStats, ConstraintType, GroundingContext, SizeHint, Table, View,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnFragment {
    pub name: String,
    pub data_type: String,
    pub pk: bool,
    pub fk: Option<String>,
    pub unique: bool,
    pub not_null: bool,
    pub default: Option<String>,
    pub indexed: bool,
    pub kind: Option<ColumnKind>,
    pub values: Vec<String>,
    pub stats: Option<ColumnStats>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexFragment {
    pub name: String,
    pub columns: Vec<String>,
    pub unique: bool,
    pub index_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintFragment {
    pub name: String,
    pub constraint_type: ConstraintType,
    pub columns: Vec<String>,
    pub definition: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipEndpoint {
    pub table: String,
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Fragment {
    DialectInfo {
        dialect: String,
        version: Option<String>,
        database: Option<String>,
        details: BTreeMap<String, String>,
    },
    Table {
        name: String,
        row_count: Option<u64>,
        size_hint: Option<SizeHint>,
        columns: Vec<ColumnFragment>,
        indexes: Option<Vec<IndexFragment>>,
        constraints: Option<Vec<ConstraintFragment>>,
    },
    View {
        name: String,
        definition: Option<String>,
        columns: Vec<ColumnFragment>,
    },
    Relationship {
        from: RelationshipEndpoint,
        to: RelationshipEndpoint,
        cardinality: Option<Cardinality>,
    },
    BusinessContext {
        report: String,
    },
}

/// Projects `ctx` into the ordered fragment sequence: one `dialect_info`,
/// one `table` per table (columns carrying
/// PK/FK/unique/not-null/default/indexed flags derived from the table's
/// constraints, with PK/FK/single-column-UNIQUE/NOT_NULL/DEFAULT absorbed
/// into those flags so the `constraints` child only carries multi-column
/// UNIQUE and CHECK), one `view` per view, one `relationship` per
/// relationship (with inferred cardinality), and an optional
/// `business_context`.
pub fn emit(ctx: &GroundingContext) -> Vec<Fragment> {
    let mut out = Vec::new();

    if let Some(info) = &ctx.info {
        out.push(Fragment::DialectInfo {
            dialect: info.dialect.clone(),
            version: info.version.clone(),
            database: info.database.clone(),
            details: info.details.clone(),
        });
    }

    for table in &ctx.tables {
        out.push(emit_table(table));
    }

    for view in &ctx.views {
        out.push(emit_view(view));
    }

    for relationship in &ctx.relationships {
        let cardinality = match (
            ctx.table(&relationship.table).and_then(|t| t.row_count),
            ctx.table(&relationship.referenced_table).and_then(|t| t.row_count),
        ) {
            (Some(source), Some(target)) => Cardinality::infer(source, target),
            _ => None,
        };
        out.push(Fragment::Relationship {
            from: RelationshipEndpoint {
                table: relationship.table.clone(),
                columns: relationship.from.clone(),
            },
            to: RelationshipEndpoint {
                table: relationship.referenced_table.clone(),
                columns: relationship.to.clone(),
            },
            cardinality,
        });
    }

    if let Some(report) = &ctx.report {
        out.push(Fragment::BusinessContext {
            report: report.clone(),
        });
    }

    out
}

fn emit_table(table: &Table) -> Fragment {
    let pk_columns: HashSet<&str> = table
        .constraints
        .iter()
        .find(|c| c.constraint_type == ConstraintType::PrimaryKey)
        .map(|c| c.columns.iter().map(String::as_str).collect())
        .unwrap_or_default();

    let unique_single_columns: HashSet<&str> = table
        .constraints
        .iter()
        .filter(|c| c.constraint_type == ConstraintType::Unique && c.columns.len() == 1)
        .map(|c| c.columns[0].as_str())
        .collect();

    let not_null_columns: HashSet<&str> = table
        .constraints
        .iter()
        .filter(|c| c.constraint_type == ConstraintType::NotNull)
        .flat_map(|c| c.columns.iter().map(String::as_str))
        .collect();

    let default_by_column: HashMap<&str, &str> = table
        .constraints
        .iter()
        .filter(|c| c.constraint_type == ConstraintType::Default)
        .filter_map(|c| {
            let column = c.columns.first()?;
            let value = c.default_value.as_deref()?;
            Some((column.as_str(), value))
        })
        .collect();

    let fk_by_column: HashMap<&str, String> = table
        .constraints
        .iter()
        .filter(|c| c.constraint_type == ConstraintType::ForeignKey)
        .flat_map(|c| {
            let referenced_table = c.referenced_table.as_deref().unwrap_or("");
            c.columns.iter().enumerate().filter_map(move |(i, col)| {
                c.referenced_columns
                    .get(i)
                    .map(|refcol| (col.as_str(), format!("{referenced_table}.{refcol}")))
            })
        })
        .collect();

    let columns = table
        .columns
        .iter()
        .map(|column| {
            let name = column.name.as_str();
            ColumnFragment {
                name: column.name.clone(),
                data_type: column.data_type.clone(),
                pk: pk_columns.contains(name),
                fk: fk_by_column.get(name).cloned(),
                unique: unique_single_columns.contains(name),
                not_null: pk_columns.contains(name) || not_null_columns.contains(name),
                default: default_by_column.get(name).map(|s| s.to_string()),
                indexed: column.is_indexed,
                kind: column.kind,
                values: column.values.clone(),
                stats: column.stats.clone(),
            }
        })
        .collect();

    let indexes = if table.indexes.is_empty() {
        None
    } else {
        Some(
            table
                .indexes
                .iter()
                .map(|idx| IndexFragment {
                    name: idx.name.clone(),
                    columns: idx.columns.clone(),
                    unique: idx.unique,
                    index_type: idx.index_type.clone(),
                })
                .collect(),
        )
    };

    let constraint_fragments: Vec<ConstraintFragment> = table
        .constraints
        .iter()
        .filter(|c| match c.constraint_type {
            ConstraintType::PrimaryKey
            | ConstraintType::ForeignKey
            | ConstraintType::NotNull
            | ConstraintType::Default => false,
            ConstraintType::Unique => c.columns.len() > 1,
            ConstraintType::Check => true,
        })
        .map(|c| ConstraintFragment {
            name: c.name.clone(),
            constraint_type: c.constraint_type,
            columns: c.columns.clone(),
            definition: c.definition.clone(),
        })
        .collect();
    let constraints = if constraint_fragments.is_empty() {
        None
    } else {
        Some(constraint_fragments)
    };

    Fragment::Table {
        name: table.name.clone(),
        row_count: table.row_count,
        size_hint: table.size_hint,
        columns,
        indexes,
        constraints,
    }
}

fn emit_view(view: &View) -> Fragment {
    let columns = view
        .columns
        .iter()
        .map(|column| ColumnFragment {
            name: column.name.clone(),
            data_type: column.data_type.clone(),
            pk: false,
            fk: None,
            unique: false,
            not_null: false,
            default: None,
            indexed: column.is_indexed,
            kind: column.kind,
            values: column.values.clone(),
            stats: column.stats.clone(),
        })
        .collect();

    Fragment::View {
        name: view.name.clone(),
        definition: view.definition.clone(),
        columns,
    }
}
