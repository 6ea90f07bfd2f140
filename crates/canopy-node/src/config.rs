//! Node configuration and topology file loading.

use crate::error::{Error, Result};
use crate::network::DeliveryPolicy;
use canopy_topology::{register_node, Node, NodeStore};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default interval between child reconciliation passes.
pub const DEFAULT_RECONNECT_INTERVAL: Duration = Duration::from_millis(2000);

/// Configuration for a Canopy node.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Name of this node in the topology
    pub node_name: String,

    /// Topology file compiled into the store at start-up
    pub topology_file: PathBuf,

    /// Admin socket path (for canopy-admin CLI)
    pub admin_socket: PathBuf,

    /// Child reconciliation interval
    pub reconnect_interval: Duration,

    /// Local delivery policy
    pub delivery: DeliveryPolicy,
}

impl NodeConfig {
    /// Create config from environment variables with defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create config from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let node_name = lookup("CANOPY_NODE_NAME")
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| Error::Config("CANOPY_NODE_NAME is not set".to_string()))?;

        let topology_file = lookup("CANOPY_TOPOLOGY")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./canopy-topology.json"));

        let admin_socket = lookup("CANOPY_ADMIN_SOCKET")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./canopy-data/admin.sock"));

        let reconnect_interval = match lookup("CANOPY_RECONNECT_MS") {
            Some(ms) => {
                let ms: u64 = ms
                    .trim()
                    .parse()
                    .map_err(|_| Error::Config(format!("invalid CANOPY_RECONNECT_MS: {}", ms)))?;
                if ms == 0 {
                    return Err(Error::Config("CANOPY_RECONNECT_MS must be positive".to_string()));
                }
                Duration::from_millis(ms)
            }
            None => DEFAULT_RECONNECT_INTERVAL,
        };

        let delivery = match lookup("CANOPY_DELIVERY") {
            Some(policy) => policy.parse()?,
            None => DeliveryPolicy::default(),
        };

        Ok(Self {
            node_name: node_name.trim().to_string(),
            topology_file,
            admin_socket,
            reconnect_interval,
            delivery,
        })
    }
}

/// On-disk topology: every node of the tree.
#[derive(Debug, Deserialize)]
pub struct TopologyFile {
    pub nodes: Vec<Node>,
}

/// Register every node of a topology file into `store`, in file order.
///
/// Nodes the store already knows keep their values. Returns the number of
/// nodes loaded.
pub fn load_topology(path: &Path, store: &dyn NodeStore) -> Result<usize> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("cannot read topology {}: {}", path.display(), e)))?;
    let file: TopologyFile = serde_json::from_str(&raw)?;
    for node in &file.nodes {
        register_node(store, node.clone())?;
    }
    tracing::info!("Loaded {} nodes from {}", file.nodes.len(), path.display());
    Ok(file.nodes.len())
}
