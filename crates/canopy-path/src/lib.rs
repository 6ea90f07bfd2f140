//! Canopy Path Encoding
//!
//! Compresses a multicast target set into one integer.
//!
//! # Overview
//!
//! Each tree node owns a distinct prime. A message's path is the product of
//! the primes of every node it must pass through, so at every hop a node can
//! decide what to do with nothing but a remainder check:
//!
//! - `path % value == 0`: the node is on the route and relays
//! - `path % value² == 0`: the node is one of the intended targets
//!
//! Paths for several targets are merged with LCM, so shared ancestors are
//! counted once. After the merge every literal target is multiplied in once
//! more, which is what lifts targets to multiplicity two while relays stay at
//! one.
//!
//! ```text
//!         root(2)
//!         /     \
//!      a(3)     b(5)
//!       |
//!      c(7)
//!
//! root -> c : route a, c      = 3 * 7
//!             square target c = 3 * 7 * 7 = 147
//! ```
//!
//! The wildcard target [`WILDCARD`] skips route discovery and squares every
//! known value. Paths travelling back to an API client drop one factor of the
//! entry node and carry the client's pseudo-value squared.
//!
//! # Size
//!
//! A path is bounded by the product of all squared values. With the n-th
//! prime near `n ln n`, a wildcard over 1 000 nodes is about 2.8 KiB on the
//! wire; growth is linear in the number of nodes named.

mod encoder;
mod error;
mod graph;
mod targets;
mod value;

pub use encoder::PathEncoder;
pub use error::{Error, Result};
pub use graph::RelationGraph;
pub use targets::{Targets, WILDCARD};
pub use value::PathValue;
