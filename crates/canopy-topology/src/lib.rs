//! Canopy Tree Topology
//!
//! Identity and membership for the nodes of a Canopy tree.
//!
//! # Overview
//!
//! Every node of the tree carries a unique prime `value`. Because values are
//! pairwise coprime, any set of nodes can be encoded as a product of their
//! values and membership tested with a single divisibility check. This crate
//! owns everything needed to hand out and look up those identities:
//!
//! - [`Node`]: the identity record (name, prime value, listener address,
//!   tags, groups, ordered children)
//! - [`primes`]: the "next prime after X" generator used for value assignment
//! - [`NodeStore`]: the lookup interface over the identity/relationship store,
//!   with [`MemoryStore`] as the in-process implementation
//! - [`register_node`]: assigns a value once, on first registration
//! - [`Topology`]: the cached view a running node has of itself, its parent
//!   and its children
//!
//! Edges point parent to child. A node has at most one parent, found by
//! scanning every node for one whose child list contains it.

mod error;
mod node;
pub mod primes;
mod store;
mod topology;

pub use error::{Error, Result};
pub use node::{Node, API_NAME_PREFIX, DEFAULT_TREE_PORT};
pub use primes::{is_prime, next_prime};
pub use store::{register_node, MemoryStore, NodeStore};
pub use topology::{resolve, Topology};
