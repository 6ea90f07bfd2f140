//! Error types for canopy-path.

use thiserror::Error;

/// Result type for path calculations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while computing a path.
#[derive(Debug, Error)]
pub enum Error {
    /// The relation graph has no route between the two nodes.
    #[error("no route from {from} to {to}")]
    NoRoute { from: String, to: String },

    /// A node the calculation cannot proceed without is unknown.
    #[error("unknown node: {0}")]
    UnknownNode(String),

    /// An API path was requested without naming the entry node.
    #[error("API path needs the entry node as first target")]
    MissingApiEntry,

    /// The store failed.
    #[error(transparent)]
    Topology(#[from] canopy_topology::Error),
}
