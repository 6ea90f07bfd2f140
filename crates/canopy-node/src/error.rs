//! Error types for the Canopy node.

use thiserror::Error;

/// Result type for node operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while running a node.
#[derive(Debug, Error)]
pub enum Error {
    /// Topology or store error
    #[error("Topology error: {0}")]
    Topology(#[from] canopy_topology::Error),

    /// Path calculation error
    #[error("Path error: {0}")]
    Path(#[from] canopy_path::Error),

    /// Wire protocol error
    #[error("Protocol error: {0}")]
    Protocol(#[from] canopy_protocols::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Network error
    #[error("Network error: {0}")]
    Network(String),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
