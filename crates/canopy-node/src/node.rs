//! Canopy Node - the main application entry point.
//!
//! Architecture:
//! - Single daemon process with an in-memory store compiled from the topology file
//! - Tree listener for the parent and API clients
//! - Child connector reconciling children on a fixed interval
//! - Unix admin socket for local admin ops (canopy-admin CLI)

use crate::admin_socket::AdminSocket;
use crate::bus::EventBus;
use crate::config::{load_topology, NodeConfig};
use crate::error::Result;
use crate::events;
use crate::network::TreeNetwork;
use canopy_protocols::Event;
use canopy_topology::{MemoryStore, NodeStore};
use std::sync::Arc;

/// A Canopy node instance.
pub struct CanopyNode {
    config: NodeConfig,
    network: Arc<TreeNetwork>,
}

impl CanopyNode {
    /// Create a node: load the topology file into a fresh store and set up
    /// the network for `config.node_name`.
    pub async fn new(config: NodeConfig) -> Result<Self> {
        let store: Arc<dyn NodeStore> = Arc::new(MemoryStore::new());
        load_topology(&config.topology_file, store.as_ref())?;
        Self::with_store(config, store)
    }

    /// Create a node over an already populated store.
    pub fn with_store(config: NodeConfig, store: Arc<dyn NodeStore>) -> Result<Self> {
        let bus = Arc::new(EventBus::new());
        let network = TreeNetwork::new(store, &config.node_name, bus, config.delivery)?;
        Ok(Self { config, network })
    }

    pub fn network(&self) -> Arc<TreeNetwork> {
        Arc::clone(&self.network)
    }

    pub fn bus(&self) -> Arc<EventBus> {
        Arc::clone(self.network.bus())
    }

    /// Run the node (tree listener, child connector, admin socket) until
    /// [`CanopyNode::shutdown`] is called.
    pub async fn run(&self) -> Result<()> {
        let current = self.network.current();
        tracing::info!("Canopy node starting");
        tracing::info!("  Node: {} (value {})", current.name, current.value);
        tracing::info!("  Tree: {}", current.address());
        tracing::info!("  Admin: {:?}", self.config.admin_socket);
        tracing::info!("  Delivery: {}", self.network.policy());

        let listener = self.network.bind().await?;

        let admin_socket = AdminSocket::new(self.network(), self.config.admin_socket.clone());
        let admin = tokio::spawn(async move {
            if let Err(e) = admin_socket.run().await {
                tracing::error!("Admin socket error: {}", e);
            }
        });

        let connector = tokio::spawn(
            self.network()
                .run_child_connector(self.config.reconnect_interval),
        );

        let result = self.network().serve(listener).await;

        admin.abort();
        let _ = connector.await;
        let _ = std::fs::remove_file(&self.config.admin_socket);
        result
    }

    /// Process-exit hook: fire `program_exit` locally, then close every
    /// connection and stop the listener and connector.
    pub async fn shutdown(&self) {
        self.network
            .bus()
            .trigger(Event::new(events::PROGRAM_EXIT, Vec::new()));
        self.network.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::DeliveryPolicy;
    use std::io::Write;
    use std::path::Path;
    use std::time::Duration;

    fn config(topology: &Path, admin: &Path) -> NodeConfig {
        NodeConfig {
            node_name: "root".to_string(),
            topology_file: topology.to_path_buf(),
            admin_socket: admin.to_path_buf(),
            reconnect_interval: Duration::from_millis(50),
            delivery: DeliveryPolicy::Targets,
        }
    }

    fn free_port() -> u16 {
        std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port()
    }

    #[tokio::test]
    async fn loads_topology_file() {
        let dir = tempfile::tempdir().unwrap();
        let topology = dir.path().join("tree.json");
        std::fs::write(
            &topology,
            r#"{"nodes": [{"name": "root", "children": ["a"]}, {"name": "a"}]}"#,
        )
        .unwrap();

        let node = CanopyNode::new(config(&topology, &dir.path().join("admin.sock")))
            .await
            .unwrap();
        assert_eq!(node.network().value(), 2);
        assert!(node.network().topology().is_child("a"));
    }

    #[tokio::test]
    async fn unknown_node_name_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"nodes": [{{"name": "a"}}]}}"#).unwrap();
        let dir = tempfile::tempdir().unwrap();
        assert!(CanopyNode::new(config(file.path(), &dir.path().join("admin.sock")))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn run_until_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let topology = dir.path().join("tree.json");
        std::fs::write(
            &topology,
            format!(
                r#"{{"nodes": [{{"name": "root", "tree_ip": "127.0.0.1", "tree_port": {}}}]}}"#,
                free_port()
            ),
        )
        .unwrap();
        let admin = dir.path().join("run").join("admin.sock");

        let node = Arc::new(CanopyNode::new(config(&topology, &admin)).await.unwrap());
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        node.bus().on(events::PROGRAM_EXIT, move |_| {
            let _ = tx.send(());
        });

        let running = tokio::spawn({
            let node = Arc::clone(&node);
            async move { node.run().await }
        });
        for _ in 0..200 {
            if admin.exists() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(admin.exists());

        node.shutdown().await;
        tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        tokio::time::timeout(Duration::from_secs(2), running)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert!(!admin.exists());
    }
}
