//! Undirected relation graph and breadth-first route discovery.

use crate::error::{Error, Result};
use crate::value::PathValue;
use canopy_topology::NodeStore;
use std::collections::{HashMap, VecDeque};

/// Point-in-time copy of the tree's parent/child edges, treated as
/// undirected, plus every node's value.
#[derive(Debug, Clone, Default)]
pub struct RelationGraph {
    values: HashMap<String, u64>,
    edges: HashMap<String, Vec<String>>,
}

impl RelationGraph {
    /// Take a snapshot of the store.
    ///
    /// Relations naming nodes the store does not know are dropped.
    pub fn snapshot(store: &dyn NodeStore) -> Result<Self> {
        let nodes = store.list_nodes()?;
        let mut graph = Self {
            values: nodes.iter().map(|n| (n.name.clone(), n.value)).collect(),
            edges: HashMap::with_capacity(nodes.len()),
        };
        for node in &nodes {
            for related in store.get_relations(&node.name)? {
                if graph.values.contains_key(&related) {
                    graph.link(&node.name, &related);
                }
            }
        }
        Ok(graph)
    }

    fn link(&mut self, a: &str, b: &str) {
        for (from, to) in [(a, b), (b, a)] {
            let adjacent = self.edges.entry(from.to_string()).or_default();
            if !adjacent.iter().any(|n| n == to) {
                adjacent.push(to.to_string());
            }
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn value(&self, name: &str) -> Option<u64> {
        self.values.get(name).copied()
    }

    /// Values of every node in the snapshot.
    pub fn values(&self) -> impl Iterator<Item = u64> + '_ {
        self.values.values().copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Shortest route from `from` to `to`: every node after `from`, ending
    /// with `to`. Empty when `from == to`.
    pub fn route(&self, from: &str, to: &str) -> Result<Vec<String>> {
        for name in [from, to] {
            if !self.contains(name) {
                return Err(Error::UnknownNode(name.to_string()));
            }
        }
        if from == to {
            return Ok(Vec::new());
        }

        let mut previous: HashMap<&str, &str> = HashMap::new();
        let mut queue = VecDeque::from([from]);
        previous.insert(from, from);

        while let Some(current) = queue.pop_front() {
            if current == to {
                break;
            }
            for next in self.edges.get(current).into_iter().flatten() {
                if !previous.contains_key(next.as_str()) {
                    previous.insert(next.as_str(), current);
                    queue.push_back(next.as_str());
                }
            }
        }

        if !previous.contains_key(to) {
            return Err(Error::NoRoute {
                from: from.to_string(),
                to: to.to_string(),
            });
        }

        let mut route = Vec::new();
        let mut step = to;
        while step != from {
            route.push(step.to_string());
            step = previous[step];
        }
        route.reverse();
        Ok(route)
    }

    /// Product of the values along the route from `from` to `to`, `from`
    /// excluded.
    pub fn node_path(&self, from: &str, to: &str) -> Result<PathValue> {
        let mut path = PathValue::one();
        for name in self.route(from, to)? {
            // Route only yields names present in the snapshot.
            if let Some(value) = self.value(&name) {
                path.mul_value(value);
            }
        }
        Ok(path)
    }
}
