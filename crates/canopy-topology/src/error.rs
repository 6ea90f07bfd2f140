//! Error types for canopy-topology.

use thiserror::Error;

/// Result type for topology operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while looking up or registering nodes.
#[derive(Debug, Error)]
pub enum Error {
    /// No node with this name is known to the store.
    #[error("node not found: {0}")]
    NodeNotFound(String),

    /// The node record cannot be stored as given.
    #[error("invalid node: {0}")]
    InvalidNode(String),
}
