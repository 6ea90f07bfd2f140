//! Canopy Protocols - Wire Format for the Tree Network
//!
//! Everything that crosses a tree connection is defined here.
//!
//! # Overview
//!
//! ## Messages
//!
//! Every message on every connection is length prefixed:
//!
//! ```text
//! [4 bytes LE: body length N]
//! [N bytes: body]
//! ```
//!
//! The two identity records exchanged by the [`handshake`] are plain message
//! bodies. After the handshake every body is a routed [`Frame`]:
//!
//! ```text
//! [4 bytes LE: path length L]
//! [L bytes: path integer, big-endian magnitude]
//! [N - L - 4 bytes: serialized Event]
//! ```
//!
//! ## Events
//!
//! [`Event`] is the self-describing record carried as frame payload: a name,
//! opaque data bytes and the [`Origin`] it was emitted from, serialized with
//! `serde_json`.
//!
//! ## Handshake
//!
//! Both ends send their own [`canopy_topology::Node`] record, then read the
//! peer's. Either side may answer with [`CLOSE_CONNECTION_MARK`] instead,
//! which refuses the connection.

pub mod error;
pub mod event;
pub mod frame;
pub mod handshake;

pub use error::{Error, Result};
pub use event::{Event, Origin};
pub use frame::{read_message, write_message, Frame, MAX_MESSAGE_LEN};
pub use handshake::{exchange_identity, expect_identity, is_close_mark, reject, CLOSE_CONNECTION_MARK};
