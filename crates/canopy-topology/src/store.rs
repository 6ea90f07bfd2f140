//! Identity and relationship store.

use crate::error::{Error, Result};
use crate::node::Node;
use crate::primes::next_prime;
use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

/// Lookup interface over the identity/relationship store.
///
/// The routing core never touches files or databases itself; everything it
/// knows about the tree comes through this trait.
pub trait NodeStore: Send + Sync {
    /// Get a node by name.
    fn get_node(&self, name: &str) -> Result<Node>;

    /// Names related to `name`: its parent first (if any), then its children.
    fn get_relations(&self, name: &str) -> Result<Vec<String>>;

    /// Names of the nodes in `group`. Unknown groups have no members.
    fn get_group_members(&self, group: &str) -> Result<Vec<String>>;

    /// Names of the nodes carrying `tag`. Unknown tags have no members.
    fn get_members_by_tag(&self, tag: &str) -> Result<Vec<String>>;

    /// Every known node.
    fn list_nodes(&self) -> Result<Vec<Node>>;

    /// Insert or replace the record stored under `node.name`.
    fn set_node(&self, node: Node) -> Result<()>;
}

/// In-memory store keyed by node name.
#[derive(Debug, Default)]
pub struct MemoryStore {
    nodes: RwLock<BTreeMap<String, Node>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl NodeStore for MemoryStore {
    fn get_node(&self, name: &str) -> Result<Node> {
        self.nodes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
            .ok_or_else(|| Error::NodeNotFound(name.to_string()))
    }

    fn get_relations(&self, name: &str) -> Result<Vec<String>> {
        let nodes = self.nodes.read().unwrap_or_else(PoisonError::into_inner);
        let node = nodes
            .get(name)
            .ok_or_else(|| Error::NodeNotFound(name.to_string()))?;

        let mut relations = Vec::with_capacity(node.children.len() + 1);
        if let Some(parent) = nodes.values().find(|n| n.has_child(name)) {
            relations.push(parent.name.clone());
        }
        relations.extend(node.children.iter().cloned());
        Ok(relations)
    }

    fn get_group_members(&self, group: &str) -> Result<Vec<String>> {
        let nodes = self.nodes.read().unwrap_or_else(PoisonError::into_inner);
        Ok(nodes
            .values()
            .filter(|n| n.in_group(group))
            .map(|n| n.name.clone())
            .collect())
    }

    fn get_members_by_tag(&self, tag: &str) -> Result<Vec<String>> {
        let nodes = self.nodes.read().unwrap_or_else(PoisonError::into_inner);
        Ok(nodes
            .values()
            .filter(|n| n.has_tag(tag))
            .map(|n| n.name.clone())
            .collect())
    }

    fn list_nodes(&self) -> Result<Vec<Node>> {
        let nodes = self.nodes.read().unwrap_or_else(PoisonError::into_inner);
        Ok(nodes.values().cloned().collect())
    }

    fn set_node(&self, node: Node) -> Result<()> {
        if node.name.is_empty() {
            return Err(Error::InvalidNode("empty node name".to_string()));
        }
        self.nodes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(node.name.clone(), node);
        Ok(())
    }
}

/// Store `node`, assigning its prime value on first registration.
///
/// A name the store already knows keeps its existing value whatever the
/// incoming record says; a new name gets the next prime above the largest
/// value currently assigned. Registration is not atomic across concurrent
/// callers; compile the topology from a single task.
pub fn register_node(store: &dyn NodeStore, mut node: Node) -> Result<Node> {
    if node.name.is_empty() {
        return Err(Error::InvalidNode("empty node name".to_string()));
    }
    if node.is_api() {
        return Err(Error::InvalidNode(format!(
            "{} is an API client name",
            node.name
        )));
    }

    match store.get_node(&node.name) {
        Ok(existing) => node.value = existing.value,
        Err(Error::NodeNotFound(_)) => {
            let max = store
                .list_nodes()?
                .iter()
                .map(|n| n.value)
                .max()
                .unwrap_or(0);
            node.value = next_prime(max);
            tracing::debug!(node = %node.name, value = node.value, "assigned node value");
        }
        Err(e) => return Err(e),
    }

    store.set_node(node.clone())?;
    Ok(node)
}
