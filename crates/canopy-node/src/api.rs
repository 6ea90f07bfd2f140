//! API clients: external processes attached to one entry node.
//!
//! An API client is not part of the tree. It connects to a single entry node,
//! identifies itself with a name carrying [`API_NAME_PREFIX`] and a
//! pseudo-value, and from then on can emit events into the tree and receive
//! replies addressed to it.

use crate::bus::{EventBus, HandlerId};
use crate::error::{Error, Result};
use crate::network::TreeNetwork;
use canopy_path::Targets;
use canopy_protocols::Event;
use canopy_topology::{next_prime, Node, NodeStore, API_NAME_PREFIX};
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::sync::Arc;

/// Range of the random offset above the largest tree value.
const API_VALUE_SPREAD: u64 = 1_000_000;

/// Build a fresh API identity.
///
/// The pseudo-value is a prime above every value the store knows, offset by
/// a random amount so clients attached at the same time rarely collide. An
/// entry node refuses a second client holding a value already in use.
pub fn api_identity(store: &dyn NodeStore) -> Result<Node> {
    let mut rng = rand::thread_rng();
    let suffix: String = (&mut rng)
        .sample_iter(&Alphanumeric)
        .take(10)
        .map(char::from)
        .collect();
    let max = store
        .list_nodes()?
        .iter()
        .map(|n| n.value)
        .max()
        .unwrap_or(0);

    let mut identity = Node::new(format!("{}|{}", API_NAME_PREFIX, suffix));
    identity.value = next_prime(max + rng.gen_range(0..API_VALUE_SPREAD));
    Ok(identity)
}

/// A connected API client.
pub struct ApiClient {
    network: Arc<TreeNetwork>,
    bus: Arc<EventBus>,
}

impl ApiClient {
    /// Attach to `entry`.
    pub async fn attach(store: Arc<dyn NodeStore>, entry: &str) -> Result<Self> {
        let identity = api_identity(store.as_ref())?;
        let bus = Arc::new(EventBus::new());
        let network = TreeNetwork::new_api(store, identity, entry, Arc::clone(&bus))?;

        network.reconcile_children().await;
        if !network.has_child(entry) {
            return Err(Error::Network(format!("could not attach to entry node {}", entry)));
        }
        tracing::info!(api = %network.name(), value = network.value(), entry = %entry, "API client attached");

        Ok(Self { network, bus })
    }

    pub fn name(&self) -> String {
        self.network.name()
    }

    pub fn value(&self) -> u64 {
        self.network.value()
    }

    pub fn network(&self) -> &Arc<TreeNetwork> {
        &self.network
    }

    /// Register a handler for events addressed to this client.
    pub fn on<F>(&self, name: &str, handler: F) -> HandlerId
    where
        F: Fn(Arc<Event>) + Send + Sync + 'static,
    {
        self.bus.on(name, handler)
    }

    pub fn off(&self, name: &str, id: HandlerId) -> bool {
        self.bus.off(name, id)
    }

    /// Emit into the tree through the entry node.
    pub async fn emit(&self, event: Event, targets: &Targets) -> Result<()> {
        self.network.emit(event, targets).await
    }

    /// Detach from the entry node.
    pub async fn close(&self) {
        self.network.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canopy_topology::{is_prime, register_node, MemoryStore};

    #[test]
    fn identity_is_above_every_tree_value() {
        let store = MemoryStore::new();
        for name in ["root", "a", "b", "c"] {
            register_node(&store, Node::new(name)).unwrap();
        }

        for _ in 0..20 {
            let identity = api_identity(&store).unwrap();
            assert!(identity.is_api());
            assert!(identity.value > 7);
            assert!(is_prime(identity.value));
            let suffix = identity.name.split('|').nth(1).unwrap();
            assert_eq!(suffix.len(), 10);
        }
    }

    #[test]
    fn identities_spread_over_a_wide_range() {
        let store = MemoryStore::new();
        for name in ["root", "a", "b", "c"] {
            register_node(&store, Node::new(name)).unwrap();
        }

        let values: std::collections::BTreeSet<u64> =
            (0..200).map(|_| api_identity(&store).unwrap().value).collect();
        // 200 draws over ~78k primes: a handful of repeats at most
        assert!(values.len() > 190, "only {} distinct values", values.len());
        assert!(values.iter().all(|v| *v < 7 + API_VALUE_SPREAD + 200));
    }

    #[tokio::test]
    async fn attach_fails_without_listener() {
        let store = MemoryStore::new();
        // Port 1 on loopback is not listening.
        register_node(&store, Node::new("a").with_address("127.0.0.1", 1)).unwrap();
        let result = ApiClient::attach(Arc::new(store), "a").await;
        assert!(matches!(result, Err(Error::Network(_))));
    }

    #[tokio::test]
    async fn attach_to_unknown_entry() {
        let store: Arc<dyn NodeStore> = Arc::new(MemoryStore::new());
        assert!(matches!(
            ApiClient::attach(store, "nowhere").await,
            Err(Error::Topology(_))
        ));
    }
}
