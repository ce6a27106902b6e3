//! Pipeline benchmarks for schema-grounder
//!
//! Measures the two stages most sensitive to schema shape:
//! - BFS table traversal at increasing depth bounds
//! - Column-values resolution (low-cardinality scan) over wider tables
//!
//! Run with: cargo bench
//! Compare against baseline: cargo bench -- --save-baseline before
//!                          (make changes)
//!                          cargo bench -- --baseline before

#[path = "../tests/common/mod.rs"]
mod common;

use common::mock::{Fixture, FixtureFk, FixtureTable, MockExecutor};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use schema_grounder::dialects::sqlite::{self, SqliteOptions};
use schema_grounder::{
    column_values, info, tables, AdapterOptions, ColumnValuesConfig, Depth, TableFilter, TablesConfig,
};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::runtime::Runtime;

/// A linear FK chain `t_0 <- t_1 <- ... <- t_{n-1}`, one row each, so the
/// benchmark isolates traversal cost from query-answering cost.
fn chain_fixture(len: usize) -> Fixture {
    let mut tables = Vec::with_capacity(len);
    for i in 0..len {
        let name: &'static str = Box::leak(format!("t_{i}").into_boxed_str());
        let mut table = FixtureTable {
            name,
            columns: vec![("id", "INTEGER", true)],
            row_count: 1,
            ..Default::default()
        };
        if i > 0 {
            let parent: &'static str = Box::leak(format!("t_{}", i - 1).into_boxed_str());
            table.columns.push(("prev_id", "INTEGER", false));
            table.fks.push(FixtureFk {
                columns: vec!["prev_id"],
                ref_table: parent,
                ref_columns: vec!["id"],
            });
        }
        tables.push(table);
    }
    Fixture { tables, views: Vec::new() }
}

fn bench_bfs_traversal(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("bfs_traversal");

    for depth in [5usize, 25, 100] {
        let fixture = chain_fixture(depth + 1);
        let seed = format!("t_{depth}");

        group.bench_function(BenchmarkId::new("forward_unbounded", depth), |b| {
            b.iter(|| {
                let executor = Arc::new(MockExecutor::new(fixture.clone()));
                let options = AdapterOptions {
                    executor,
                    validator: None,
                    groundings: vec![
                        info(),
                        tables(TablesConfig {
                            filter: TableFilter::List(vec![seed.clone()]),
                            forward: Depth::Unbounded,
                            backward: Depth::None,
                        }),
                    ],
                };
                let adapter = sqlite::build(SqliteOptions::default(), options).unwrap();
                rt.block_on(async { black_box(adapter.introspect().await.unwrap()) })
            })
        });
    }

    group.finish();
}

/// A single table with a growing number of low-cardinality columns, so the
/// benchmark isolates per-column scan cost as table width scales.
fn wide_table_fixture(columns: usize, distinct_values: usize) -> Fixture {
    let mut cols = vec![("id", "INTEGER", true)];
    let mut distinct = HashMap::new();
    for i in 0..columns {
        let name: &'static str = Box::leak(format!("col_{i}").into_boxed_str());
        cols.push((name, "TEXT", false));
        let values: Vec<serde_json::Value> = (0..distinct_values).map(|v| json!(format!("v{v}"))).collect();
        distinct.insert(name, values);
    }
    Fixture {
        tables: vec![FixtureTable {
            name: "wide",
            columns: cols,
            distinct,
            row_count: 1_000,
            ..Default::default()
        }],
        views: Vec::new(),
    }
}

fn bench_column_values_resolution(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("column_values_resolution");

    for columns in [5usize, 20, 50] {
        let fixture = wide_table_fixture(columns, 8);

        group.bench_function(BenchmarkId::new("low_cardinality_columns", columns), |b| {
            b.iter(|| {
                let executor = Arc::new(MockExecutor::new(fixture.clone()));
                let options = AdapterOptions {
                    executor,
                    validator: None,
                    groundings: vec![
                        info(),
                        tables(TablesConfig {
                            filter: TableFilter::List(vec!["wide".to_string()]),
                            forward: Depth::None,
                            backward: Depth::None,
                        }),
                        column_values(ColumnValuesConfig::default()),
                    ],
                };
                let adapter = sqlite::build(SqliteOptions::default(), options).unwrap();
                rt.block_on(async { black_box(adapter.introspect().await.unwrap()) })
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_bfs_traversal, bench_column_values_resolution);
criterion_main!(benches);
