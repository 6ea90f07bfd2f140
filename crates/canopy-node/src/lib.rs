//! Canopy Node - Multicast Event Routing over a Tree
//!
//! A node of a Canopy tree: it holds the connection to its parent and its
//! children, and moves events between them using prime-product path
//! integers (see `canopy_path`).
//!
//! # Architecture
//!
//! - **Bus**: in-process handler registry with fire-and-forget dispatch
//! - **Network**: tree listener, child connector, per-connection read loops,
//!   divisibility-based forwarding; registers itself as the bus's emitter
//! - **API**: external clients attached to one entry node
//! - **Config**: environment variables and the topology file
//! - **Admin Socket**: Unix socket for local admin commands (canopy-admin CLI)
//!
//! # Example
//!
//! ```no_run
//! use canopy_node::{CanopyNode, NodeConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = NodeConfig::from_env()?;
//!     let node = CanopyNode::new(config).await?;
//!     node.bus().on("deploy", |event| {
//!         println!("deploy requested: {}", event.data_str());
//!     });
//!     node.run().await?;
//!     Ok(())
//! }
//! ```

pub mod admin_socket;
pub mod api;
pub mod bus;
pub mod config;
pub mod connection;
pub mod error;
pub mod events;
pub mod network;
pub mod node;

pub use api::{api_identity, ApiClient};
pub use bus::{EventBus, Handler, HandlerId, NetworkEmitter};
pub use config::{load_topology, NodeConfig, TopologyFile};
pub use connection::{ConnectionInfo, ConnectionKind};
pub use error::{Error, Result};
pub use network::{DeliveryPolicy, Role, TreeNetwork};
pub use node::CanopyNode;

pub use canopy_path::{PathValue, Targets, WILDCARD};
pub use canopy_protocols::{Event, Origin};
pub use canopy_topology::Node;
