//! Error types for canopy-protocols.

use thiserror::Error;

/// Result type for wire operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that tear a connection down.
#[derive(Debug, Error)]
pub enum Error {
    /// Reading or writing the stream failed, including short reads.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// An identity or event record could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The length prefix exceeds [`crate::MAX_MESSAGE_LEN`].
    #[error("message of {0} bytes exceeds the size limit")]
    MessageTooLarge(usize),

    /// The body does not hold a valid frame.
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    /// The peer sent the close mark during the handshake.
    #[error("handshake rejected by peer")]
    HandshakeRejected,

    /// The peer identified as someone other than the expected node.
    #[error("unexpected peer: expected {expected}, got {actual}")]
    UnexpectedPeer { expected: String, actual: String },
}
