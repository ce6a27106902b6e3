//! Table grounding: the BFS core. Seeds a table set from a filter, then runs
//! two independent bounded breadth-first searches along the foreign-key
//! graph (forward = follow FKs to parents, backward = follow FKs from
//! children), discovering tables and relationships as it goes.

use super::Grounding;
use crate::adapter::{Adapter, DialectAdapter};
use crate::cancel::CancellationToken;
use crate::error::{GroundingError, Result};
use crate::executor::Executor;
use crate::filter::{Depth, TableFilter};
use crate::model::{GroundingContext, Relationship, Table};
use async_trait::async_trait;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

#[derive(Clone)]
pub struct TablesConfig {
    pub filter: TableFilter,
    pub forward: Depth,
    pub backward: Depth,
}

impl Default for TablesConfig {
    fn default() -> Self {
        TablesConfig {
            filter: TableFilter::Predicate(Arc::new(|_| true)),
            forward: Depth::None,
            backward: Depth::None,
        }
    }
}

pub struct TablesGrounding {
    config: TablesConfig,
}

impl TablesGrounding {
    pub fn new(config: TablesConfig) -> Self {
        TablesGrounding { config }
    }
}

pub fn tables(config: TablesConfig) -> Box<dyn Grounding> {
    Box::new(TablesGrounding::new(config))
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Direction {
    Forward,
    Backward,
}

/// Per-direction bounded BFS state. `table_cache`/`order` are shared across
/// both directions (and the initial seed fetch) so a table discovered by one
/// direction is never fetched twice; `visited` is direction-local since
/// forward and backward explorations may meet but must respect their own
/// depth bounds independently.
#[allow(clippy::too_many_arguments)]
async fn bfs_direction(
    dialect: &dyn DialectAdapter,
    executor: &dyn Executor,
    seeds: &[String],
    limit: Depth,
    direction: Direction,
    phase_name: &str,
    token: &CancellationToken,
    table_cache: &mut std::collections::HashMap<String, Table>,
    order: &mut Vec<String>,
    relationships_seen: &mut HashSet<String>,
    relationships: &mut Vec<Relationship>,
) -> Result<()> {
    let mut visited: HashSet<String> = HashSet::new();
    let mut queue: VecDeque<(String, u32)> = seeds.iter().cloned().map(|n| (n, 0)).collect();

    while let Some((name, depth)) = queue.pop_front() {
        if token.is_cancelled() {
            return Err(GroundingError::Cancelled {
                phase: phase_name.to_string(),
            });
        }
        if visited.contains(&name) {
            continue;
        }
        visited.insert(name.clone());

        if !table_cache.contains_key(&name) {
            match dialect.get_table(executor, &name).await {
                Ok(t) => {
                    order.push(name.clone());
                    table_cache.insert(name.clone(), t);
                }
                Err(e) => {
                    tracing::warn!(table = %name, error = %e, "failed to fetch table metadata during traversal");
                }
            }
        }

        if !limit.allows(depth + 1) {
            continue;
        }

        let rels = match direction {
            Direction::Forward => dialect.find_outgoing_relations(executor, &name).await,
            Direction::Backward => dialect.find_incoming_relations(executor, &name).await,
        };
        let rels = match rels {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(table = %name, error = %e, "failed to fetch relations during traversal");
                continue;
            }
        };

        for rel in rels {
            let neighbor = match direction {
                Direction::Forward => rel.referenced_table.clone(),
                Direction::Backward => rel.table.clone(),
            };
            let (neighbor_schema, _) = dialect.parse_table_name(&neighbor);
            if !dialect.is_dataset_allowed(&neighbor_schema) {
                // Relationships crossing out of the configured dataset/schema
                // scope are dropped entirely, never emitted.
                continue;
            }

            let key = format!(
                "{}|{}|{}|{}",
                rel.table,
                rel.from.join(","),
                rel.referenced_table,
                rel.to.join(",")
            );
            if relationships_seen.insert(key) {
                relationships.push(rel);
            }

            if !visited.contains(&neighbor) {
                queue.push_back((neighbor, depth + 1));
            }
        }
    }

    Ok(())
}

async fn resolve_seed(
    dialect: &dyn DialectAdapter,
    executor: &dyn Executor,
    filter: &TableFilter,
) -> Result<Vec<String>> {
    if let Some(names) = filter.explicit_names() {
        return Ok(names.to_vec());
    }
    let all = dialect.get_all_table_names(executor).await?;
    Ok(all
        .into_iter()
        .filter(|name| {
            if !filter.matches(name) {
                return false;
            }
            let (schema, _) = dialect.parse_table_name(name);
            dialect.is_dataset_allowed(&schema)
        })
        .collect())
}

#[async_trait]
impl Grounding for TablesGrounding {
    fn name(&self) -> &str {
        "tables"
    }

    async fn run(
        &self,
        adapter: &Adapter,
        ctx: &mut GroundingContext,
        token: &CancellationToken,
    ) -> Result<()> {
        let dialect = adapter.dialect();
        let executor = adapter.executor();

        let seeds = resolve_seed(dialect, executor, &self.config.filter).await?;
        if seeds.is_empty() {
            tracing::debug!("table grounding resolved zero seed tables");
            return Ok(());
        }

        let mut table_cache: std::collections::HashMap<String, Table> = std::collections::HashMap::new();
        let mut order: Vec<String> = Vec::new();
        let mut relationships_seen: HashSet<String> = HashSet::new();
        let mut relationships: Vec<Relationship> = Vec::new();

        for name in &seeds {
            if token.is_cancelled() {
                return Err(GroundingError::Cancelled {
                    phase: self.name().to_string(),
                });
            }
            if table_cache.contains_key(name) {
                continue;
            }
            match dialect.get_table(executor, name).await {
                Ok(t) => {
                    order.push(name.clone());
                    table_cache.insert(name.clone(), t);
                }
                Err(e) => {
                    tracing::warn!(table = %name, error = %e, "failed to fetch seed table metadata");
                }
            }
        }

        if self.config.forward.traverses() {
            bfs_direction(
                dialect,
                executor,
                &seeds,
                self.config.forward,
                Direction::Forward,
                self.name(),
                token,
                &mut table_cache,
                &mut order,
                &mut relationships_seen,
                &mut relationships,
            )
            .await?;
        }
        if self.config.backward.traverses() {
            bfs_direction(
                dialect,
                executor,
                &seeds,
                self.config.backward,
                Direction::Backward,
                self.name(),
                token,
                &mut table_cache,
                &mut order,
                &mut relationships_seen,
                &mut relationships,
            )
            .await?;
        }

        for name in order {
            if let Some(t) = table_cache.remove(&name) {
                ctx.push_table_if_new(t);
            }
        }
        for rel in relationships {
            ctx.push_relationship_if_new(rel);
        }

        Ok(())
    }
}
