//! Names of the events the node fires on its own bus.
//!
//! Connection events carry the peer's identity record as JSON data.

/// Process is shutting down.
pub const PROGRAM_EXIT: &str = "program_exit";

pub const PARENT_CONNECTED: &str = "parent_connected";
pub const PARENT_DISCONNECTED: &str = "parent_disconnected";

pub const CHILD_CONNECTED: &str = "child_connected";
pub const CHILD_DISCONNECTED: &str = "child_disconnected";

pub const API_CONNECTED: &str = "api_connected";
pub const API_DISCONNECTED: &str = "api_disconnected";

/// Data is a node record; store it and reload the topology.
pub const UPDATE_NODE_INFO: &str = "update_node_info";

/// Reload the topology from the store.
pub const RESTART_NODE: &str = "restart_node";
