//! Path calculation over the store.

use crate::error::{Error, Result};
use crate::graph::RelationGraph;
use crate::targets::Targets;
use crate::value::PathValue;
use canopy_topology::NodeStore;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Computes path integers against the current contents of a [`NodeStore`].
///
/// Every public calculation takes one [`RelationGraph`] snapshot, so a
/// single call never mixes two versions of the tree.
#[derive(Clone)]
pub struct PathEncoder {
    store: Arc<dyn NodeStore>,
}

impl PathEncoder {
    pub fn new(store: Arc<dyn NodeStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn NodeStore> {
        &self.store
    }

    /// Snapshot the relation graph.
    pub fn graph(&self) -> Result<RelationGraph> {
        RelationGraph::snapshot(self.store.as_ref())
    }

    /// Product of the values on the shortest route from `from` to `to`,
    /// `from` excluded.
    pub fn node_path(&self, from: &str, to: &str) -> Result<PathValue> {
        self.graph()?.node_path(from, to)
    }

    /// Per-member paths for every known member of `group`.
    pub fn group_path(&self, from: &str, group: &str) -> Result<BTreeMap<String, PathValue>> {
        let graph = self.graph()?;
        let members = self.store.get_group_members(group)?;
        member_paths(&graph, from, members)
    }

    /// Per-member paths for every known node carrying `tag`.
    pub fn tag_path(&self, from: &str, tag: &str) -> Result<BTreeMap<String, PathValue>> {
        let graph = self.graph()?;
        let members = self.store.get_members_by_tag(tag)?;
        member_paths(&graph, from, members)
    }

    /// Fold `paths` with LCM, then multiply each target value in once more.
    pub fn merge<'a, P, T>(paths: P, target_values: T) -> PathValue
    where
        P: IntoIterator<Item = &'a PathValue>,
        T: IntoIterator<Item = u64>,
    {
        let mut merged = paths
            .into_iter()
            .fold(PathValue::one(), |acc, path| acc.lcm(path));
        for value in target_values {
            merged.mul_value(value);
        }
        merged
    }

    /// Path from `from` to every node named by `targets`.
    ///
    /// Unknown names, groups and tags are skipped with a warning. A target
    /// the graph cannot reach fails the whole call. The wildcard ignores all
    /// other targets and squares every known value.
    pub fn calculate_path(&self, from: &str, targets: &Targets) -> Result<PathValue> {
        let graph = self.graph()?;
        self.calculate_on(&graph, from, targets)
    }

    /// Path for a reply travelling back to an API client.
    ///
    /// The first explicit node in `targets` is the client's entry node: one
    /// factor of it is divided out, so it relays instead of receiving, and
    /// the client's value is multiplied in twice.
    pub fn calculate_path_for_api(
        &self,
        from: &str,
        targets: &Targets,
        api_value: u64,
    ) -> Result<PathValue> {
        let entry = targets.first_node().ok_or(Error::MissingApiEntry)?;
        let graph = self.graph()?;
        let entry_value = graph
            .value(entry)
            .ok_or_else(|| Error::UnknownNode(entry.to_string()))?;

        let mut path = self.calculate_on(&graph, from, targets)?;
        path.div_value(entry_value);
        path.mul_value(api_value);
        path.mul_value(api_value);
        Ok(path)
    }

    fn calculate_on(&self, graph: &RelationGraph, from: &str, targets: &Targets) -> Result<PathValue> {
        if !graph.contains(from) {
            return Err(Error::UnknownNode(from.to_string()));
        }

        if targets.is_wildcard() {
            let mut path = PathValue::one();
            for value in graph.values() {
                path.mul_value(value);
                path.mul_value(value);
            }
            debug!(from = %from, nodes = graph.len(), "wildcard path");
            return Ok(path);
        }

        let mut per_target: BTreeMap<String, PathValue> = BTreeMap::new();
        for name in &targets.nodes {
            if per_target.contains_key(name) {
                continue;
            }
            if !graph.contains(name) {
                warn!(target_node = %name, "unknown target node, skipping");
                continue;
            }
            per_target.insert(name.clone(), graph.node_path(from, name)?);
        }
        for group in &targets.groups {
            let members = self.store.get_group_members(group)?;
            if members.is_empty() {
                warn!(group = %group, "group has no members, skipping");
            }
            per_target.extend(member_paths(graph, from, members)?);
        }
        for tag in &targets.tags {
            let members = self.store.get_members_by_tag(tag)?;
            if members.is_empty() {
                warn!(tag = %tag, "tag has no members, skipping");
            }
            per_target.extend(member_paths(graph, from, members)?);
        }

        let target_values: Vec<u64> = per_target
            .keys()
            .filter_map(|name| graph.value(name))
            .collect();
        let path = Self::merge(per_target.values(), target_values);
        debug!(from = %from, targets = per_target.len(), bits = path.bits(), "calculated path");
        Ok(path)
    }
}

impl std::fmt::Debug for PathEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PathEncoder").finish_non_exhaustive()
    }
}

fn member_paths(
    graph: &RelationGraph,
    from: &str,
    members: Vec<String>,
) -> Result<BTreeMap<String, PathValue>> {
    let mut paths = BTreeMap::new();
    for member in members {
        if !graph.contains(&member) {
            warn!(member = %member, "unknown member, skipping");
            continue;
        }
        let path = graph.node_path(from, &member)?;
        paths.insert(member, path);
    }
    Ok(paths)
}
