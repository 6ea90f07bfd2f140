//! Cached view of the current node and its neighbours.

use crate::error::{Error, Result};
use crate::node::Node;
use crate::store::NodeStore;
use std::collections::{BTreeMap, HashMap};
use tracing::warn;

/// What a running node knows about its place in the tree.
///
/// Loaded once at start-up and reloaded on an explicit restart; the network
/// layer reconciles its connections against this snapshot.
#[derive(Debug, Clone)]
pub struct Topology {
    current: Node,
    parent: Option<Node>,
    children: HashMap<String, Node>,
}

impl Topology {
    /// Build a topology from already resolved records.
    pub fn new(current: Node, parent: Option<Node>, children: Vec<Node>) -> Self {
        Self {
            current,
            parent,
            children: children.into_iter().map(|n| (n.name.clone(), n)).collect(),
        }
    }

    /// Load the view of `name` from the store.
    ///
    /// The parent is whichever node lists `name` as a child. Children the
    /// store does not know are skipped with a warning.
    pub fn load(store: &dyn NodeStore, name: &str) -> Result<Self> {
        let current = store.get_node(name)?;
        let parent = store.list_nodes()?.into_iter().find(|n| n.has_child(name));

        let mut children = Vec::with_capacity(current.children.len());
        for child in &current.children {
            match store.get_node(child) {
                Ok(node) => children.push(node),
                Err(Error::NodeNotFound(_)) => {
                    warn!(node = %name, child = %child, "unknown child in topology, skipping");
                }
                Err(e) => return Err(e),
            }
        }

        Ok(Self::new(current, parent, children))
    }

    pub fn current(&self) -> &Node {
        &self.current
    }

    pub fn parent(&self) -> Option<&Node> {
        self.parent.as_ref()
    }

    pub fn children(&self) -> &HashMap<String, Node> {
        &self.children
    }

    pub fn is_parent(&self, name: &str) -> bool {
        self.parent.as_ref().is_some_and(|p| p.name == name)
    }

    pub fn is_child(&self, name: &str) -> bool {
        self.children.contains_key(name)
    }
}

/// Expand explicit names, tags and groups into the set of known nodes.
///
/// Unknown names are logged and skipped. Each node appears once, in name
/// order.
pub fn resolve(
    store: &dyn NodeStore,
    names: &[String],
    tags: &[String],
    groups: &[String],
) -> Result<Vec<Node>> {
    let mut wanted: Vec<String> = names.to_vec();
    for tag in tags {
        wanted.extend(store.get_members_by_tag(tag)?);
    }
    for group in groups {
        wanted.extend(store.get_group_members(group)?);
    }

    let mut resolved = BTreeMap::new();
    for name in wanted {
        if resolved.contains_key(&name) {
            continue;
        }
        match store.get_node(&name) {
            Ok(node) => {
                resolved.insert(name, node);
            }
            Err(Error::NodeNotFound(_)) => warn!(node = %name, "unknown target node, skipping"),
            Err(e) => return Err(e),
        }
    }
    Ok(resolved.into_values().collect())
}
