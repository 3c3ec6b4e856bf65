//! Dependency graph over feature tables and deterministic build ordering

use crate::error::{CoreError, CoreResult};
use crate::table_name::TableName;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// A directed graph of feature table dependencies.
///
/// Edges point from a dependency to its dependent, so "A must build before B"
/// is the edge `A -> B`.
#[derive(Debug, Clone, Default)]
pub struct FeatureDag {
    graph: DiGraph<TableName, ()>,
    node_map: HashMap<TableName, NodeIndex>,
}

impl FeatureDag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a table node, returning the existing index if already present.
    pub fn add_table(&mut self, name: &TableName) -> NodeIndex {
        if let Some(&idx) = self.node_map.get(name) {
            return idx;
        }
        let idx = self.graph.add_node(name.clone());
        self.node_map.insert(name.clone(), idx);
        idx
    }

    /// Record that `dependent` reads from `dependency`.
    pub fn add_dependency(&mut self, dependent: &TableName, dependency: &TableName) {
        let from = self.add_table(dependency);
        let to = self.add_table(dependent);
        self.graph.update_edge(from, to, ());
    }

    /// Build the graph from a map of table -> upstream tables.
    ///
    /// Every upstream must itself be a key of the map. Cycles are not checked
    /// here; they surface from [`topological_order`](Self::topological_order).
    pub fn build(dependencies: &BTreeMap<TableName, Vec<TableName>>) -> CoreResult<Self> {
        let mut dag = Self::new();
        for table in dependencies.keys() {
            dag.add_table(table);
        }
        for (table, upstream) in dependencies {
            for dep in upstream {
                if !dependencies.contains_key(dep) {
                    return Err(CoreError::UnresolvedUpstream {
                        table: table.to_string(),
                        kind: "table".to_string(),
                        name: dep.to_string(),
                    });
                }
                dag.add_dependency(table, dep);
            }
        }
        Ok(dag)
    }

    pub fn contains(&self, table: &str) -> bool {
        self.node_map.contains_key(table)
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Full build order (Kahn's algorithm).
    ///
    /// Each round takes every node whose in-degree is zero, sorts the round by
    /// name, appends it, then releases its dependents. When no node is ready
    /// but some remain, every remaining node is reported as a cycle member.
    pub fn topological_order(&self) -> CoreResult<Vec<TableName>> {
        let mut in_degree: HashMap<NodeIndex, usize> = self
            .graph
            .node_indices()
            .map(|idx| {
                let degree = self.graph.edges_directed(idx, Direction::Incoming).count();
                (idx, degree)
            })
            .collect();

        let mut order = Vec::with_capacity(self.graph.node_count());
        while !in_degree.is_empty() {
            let mut ready: Vec<NodeIndex> = in_degree
                .iter()
                .filter(|(_, &deg)| deg == 0)
                .map(|(&idx, _)| idx)
                .collect();

            if ready.is_empty() {
                let mut members: Vec<String> = in_degree
                    .keys()
                    .map(|&idx| self.graph[idx].to_string())
                    .collect();
                members.sort();
                return Err(CoreError::CircularDependency { members });
            }

            ready.sort_by(|a, b| self.graph[*a].cmp(&self.graph[*b]));
            for &idx in &ready {
                in_degree.remove(&idx);
            }
            for &idx in &ready {
                for edge in self.graph.edges_directed(idx, Direction::Outgoing) {
                    if let Some(deg) = in_degree.get_mut(&edge.target()) {
                        *deg = deg.saturating_sub(1);
                    }
                }
                order.push(self.graph[idx].clone());
            }
        }
        Ok(order)
    }

    /// Build order sliced to the closed range `[start, end]`.
    ///
    /// Either bound may be omitted. A bound that is not in the graph fails
    /// with an unknown-table error; `start` after `end` is an invalid range.
    pub fn scoped_order(
        &self,
        start: Option<&str>,
        end: Option<&str>,
    ) -> CoreResult<Vec<TableName>> {
        let order = self.topological_order()?;
        let position = |name: &str| {
            order
                .iter()
                .position(|t| t == name)
                .ok_or_else(|| CoreError::UnknownTable {
                    name: name.to_string(),
                })
        };
        let lo = start.map(position).transpose()?.unwrap_or(0);
        let hi = match end {
            Some(name) => position(name)?,
            None => order.len().saturating_sub(1),
        };
        if order.is_empty() {
            return Ok(order);
        }
        if lo > hi {
            return Err(CoreError::InvalidRange {
                start: order[lo].to_string(),
                end: order[hi].to_string(),
            });
        }
        Ok(order[lo..=hi].to_vec())
    }

    /// Direct upstream tables, sorted.
    pub fn dependencies(&self, table: &str) -> Vec<TableName> {
        self.neighbors_sorted(table, Direction::Incoming)
    }

    /// Direct downstream tables, sorted.
    pub fn dependents(&self, table: &str) -> Vec<TableName> {
        self.neighbors_sorted(table, Direction::Outgoing)
    }

    /// All transitive upstream tables.
    pub fn ancestors(&self, table: &str) -> BTreeSet<TableName> {
        self.reachable(table, Direction::Incoming)
    }

    /// All transitive downstream tables.
    pub fn descendants(&self, table: &str) -> BTreeSet<TableName> {
        self.reachable(table, Direction::Outgoing)
    }

    fn neighbors_sorted(&self, table: &str, direction: Direction) -> Vec<TableName> {
        let Some(&idx) = self.node_map.get(table) else {
            return Vec::new();
        };
        let mut out: Vec<TableName> = self
            .graph
            .neighbors_directed(idx, direction)
            .map(|n| self.graph[n].clone())
            .collect();
        out.sort();
        out.dedup();
        out
    }

    fn reachable(&self, table: &str, direction: Direction) -> BTreeSet<TableName> {
        let mut result = BTreeSet::new();
        let Some(&start) = self.node_map.get(table) else {
            return result;
        };
        let mut visited = HashSet::from([start]);
        let mut stack = vec![start];
        while let Some(idx) = stack.pop() {
            for next in self.graph.neighbors_directed(idx, direction) {
                if visited.insert(next) {
                    result.insert(self.graph[next].clone());
                    stack.push(next);
                }
            }
        }
        result
    }
}

#[cfg(test)]
#[path = "dag_test.rs"]
mod tests;
