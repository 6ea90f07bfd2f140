//! Tree network: connections, dispatch and emission.
//!
//! # Connection lifecycle
//!
//! ```text
//!               accept                       connect (every tick)
//!  listener ───────────┐           child connector ────────────┐
//!                      ▼                                       ▼
//!             exchange identities                     exchange identities
//!                      │                                       │
//!        ┌─────────────┼───────────────┐               name == expected?
//!        ▼             ▼               ▼                       │
//!   API marker   topology parent   anyone else                 ▼
//!   (by value)    (singular)       close mark               child
//!        │             │                                       │
//!        └─────────────┴──────────── read loop ◄───────────────┘
//! ```
//!
//! Every tracked connection has exactly one read task. The read task
//! dispatches each frame: it delivers locally if the delivery policy says
//! so, then forwards the unchanged body to every other connection whose
//! peer value divides the path. When the stream ends the connection is
//! untracked and the matching `*_disconnected` event fires. Children are
//! retried by the next reconciliation pass; parent and API peers are not.

use crate::bus::{EventBus, NetworkEmitter};
use crate::connection::{Connection, ConnectionInfo, ConnectionKind, Connections};
use crate::error::{Error, Result};
use crate::events;
use bytes::Bytes;
use canopy_path::{PathEncoder, PathValue, Targets};
use canopy_protocols::{self as wire, Event, Frame, Origin};
use canopy_topology::{register_node, Node, NodeStore, Topology};
use futures::future::BoxFuture;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak};
use std::time::Duration;
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, trace, warn};

/// When a node hands a received event to its own bus.
///
/// Forwarding is the same under both policies; only local delivery differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeliveryPolicy {
    /// Deliver only when the node is a target (`value² | path`). Relays
    /// stay silent.
    #[default]
    Targets,
    /// Deliver whenever the node is on the route (`value | path`).
    Route,
}

impl DeliveryPolicy {
    pub fn delivers(self, path: &PathValue, value: u64) -> bool {
        match self {
            DeliveryPolicy::Targets => path.targets(value),
            DeliveryPolicy::Route => path.contains(value),
        }
    }
}

impl FromStr for DeliveryPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "targets" | "target" => Ok(DeliveryPolicy::Targets),
            "route" | "flood" => Ok(DeliveryPolicy::Route),
            other => Err(Error::Config(format!("unknown delivery policy: {}", other))),
        }
    }
}

impl fmt::Display for DeliveryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryPolicy::Targets => write!(f, "targets"),
            DeliveryPolicy::Route => write!(f, "route"),
        }
    }
}

/// What this process is on the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    /// A tree member with a listener and children.
    Node,
    /// An API client attached to `entry`.
    Api { entry: String },
}

/// Connection owner and network emitter for one node.
pub struct TreeNetwork {
    store: Arc<dyn NodeStore>,
    encoder: PathEncoder,
    topology: RwLock<Topology>,
    bus: Arc<EventBus>,
    connections: Mutex<Connections>,
    policy: DeliveryPolicy,
    role: Role,
    next_conn_id: AtomicU64,
    shutdown: watch::Sender<bool>,
    me: Weak<TreeNetwork>,
}

impl TreeNetwork {
    /// Network for tree node `name`, registered as `bus`'s emitter.
    pub fn new(
        store: Arc<dyn NodeStore>,
        name: &str,
        bus: Arc<EventBus>,
        policy: DeliveryPolicy,
    ) -> Result<Arc<Self>> {
        let topology = Topology::load(store.as_ref(), name)?;
        let network = Self::build(store, topology, Role::Node, bus, policy);
        network.register_builtin_handlers();
        Ok(network)
    }

    /// Network for an API client whose only peer is `entry`.
    pub(crate) fn new_api(
        store: Arc<dyn NodeStore>,
        identity: Node,
        entry: &str,
        bus: Arc<EventBus>,
    ) -> Result<Arc<Self>> {
        let topology = api_topology(store.as_ref(), identity, entry)?;
        let role = Role::Api {
            entry: entry.to_string(),
        };
        Ok(Self::build(store, topology, role, bus, DeliveryPolicy::Targets))
    }

    fn build(
        store: Arc<dyn NodeStore>,
        topology: Topology,
        role: Role,
        bus: Arc<EventBus>,
        policy: DeliveryPolicy,
    ) -> Arc<Self> {
        let (shutdown, _) = watch::channel(false);
        let network = Arc::new_cyclic(|me| Self {
            encoder: PathEncoder::new(Arc::clone(&store)),
            store,
            topology: RwLock::new(topology),
            bus,
            connections: Mutex::new(Connections::default()),
            policy,
            role,
            next_conn_id: AtomicU64::new(1),
            shutdown,
            me: me.clone(),
        });
        let emitter: Weak<dyn NetworkEmitter> = network.me.clone();
        network.bus.set_emitter(emitter);
        network
    }

    fn register_builtin_handlers(&self) {
        let me = self.me.clone();
        self.bus.on(events::UPDATE_NODE_INFO, move |event| {
            let Some(network) = me.upgrade() else { return };
            if let Err(e) = network.update_node_info(&event.data) {
                warn!("Ignoring node update: {}", e);
            }
        });

        let me = self.me.clone();
        self.bus.on(events::RESTART_NODE, move |_| {
            let Some(network) = me.upgrade() else { return };
            if let Err(e) = network.refresh_topology() {
                warn!("Topology refresh failed: {}", e);
            }
        });
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    pub fn store(&self) -> &Arc<dyn NodeStore> {
        &self.store
    }

    pub fn encoder(&self) -> &PathEncoder {
        &self.encoder
    }

    pub fn policy(&self) -> DeliveryPolicy {
        self.policy
    }

    pub fn role(&self) -> &Role {
        &self.role
    }

    fn topology_guard(&self) -> std::sync::RwLockReadGuard<'_, Topology> {
        self.topology.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn conns(&self) -> MutexGuard<'_, Connections> {
        self.connections.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of the cached topology.
    pub fn topology(&self) -> Topology {
        self.topology_guard().clone()
    }

    /// This node's own identity record.
    pub fn current(&self) -> Node {
        self.topology_guard().current().clone()
    }

    pub fn name(&self) -> String {
        self.topology_guard().current().name.clone()
    }

    pub fn value(&self) -> u64 {
        self.topology_guard().current().value
    }

    /// Origin stamped on everything this node emits.
    pub fn origin(&self) -> Origin {
        match &self.role {
            Role::Node => Origin::Node { name: self.name() },
            Role::Api { entry } => Origin::Api {
                entry: entry.clone(),
                value: self.value(),
            },
        }
    }

    /// Live connections.
    pub fn connections(&self) -> Vec<ConnectionInfo> {
        self.conns().all().iter().map(|c| c.info()).collect()
    }

    pub fn has_child(&self, name: &str) -> bool {
        self.conns().child(name).is_some()
    }

    pub fn parent_name(&self) -> Option<String> {
        self.conns().parent().map(|p| p.peer().name.clone())
    }

    pub fn has_api(&self, value: u64) -> bool {
        self.conns().api(value).is_some()
    }

    /// Reload the cached topology from the store.
    ///
    /// Connections are not touched; the next reconciliation pass brings the
    /// child set in line.
    pub fn refresh_topology(&self) -> Result<()> {
        let topology = match &self.role {
            Role::Node => Topology::load(self.store.as_ref(), &self.name())?,
            Role::Api { entry } => api_topology(self.store.as_ref(), self.current(), entry)?,
        };
        info!(
            node = %topology.current().name,
            parent = ?topology.parent().map(|p| &p.name),
            children = topology.children().len(),
            "Topology refreshed"
        );
        *self.topology.write().unwrap_or_else(PoisonError::into_inner) = topology;
        Ok(())
    }

    /// Store an updated node record, keeping its value, and reload.
    pub fn update_node_info(&self, data: &[u8]) -> Result<()> {
        let node: Node = serde_json::from_slice(data)?;
        let stored = register_node(self.store.as_ref(), node)?;
        info!(node = %stored.name, value = stored.value, "Node info updated");
        self.refresh_topology()
    }

    /// Bind this node's tree listener address.
    pub async fn bind(&self) -> Result<TcpListener> {
        let addr = self.current().address();
        let listener = TcpListener::bind(&addr).await?;
        info!("Tree listener bound on {}", addr);
        Ok(listener)
    }

    /// Bind and serve until shutdown.
    pub async fn listen(self: Arc<Self>) -> Result<()> {
        let listener = self.bind().await?;
        self.serve(listener).await
    }

    /// Accept connections until shutdown.
    pub async fn serve(self: Arc<Self>, listener: TcpListener) -> Result<()> {
        let mut shutdown = self.shutdown.subscribe();
        loop {
            if *shutdown.borrow_and_update() {
                break;
            }
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        debug!("Incoming tree connection from {}", addr);
                        let this = Arc::clone(&self);
                        tokio::spawn(async move {
                            if let Err(e) = this.handle_inbound(stream).await {
                                warn!("Inbound connection from {} refused: {}", addr, e);
                            }
                        });
                    }
                    Err(e) => warn!("Accept error: {}", e),
                },
                _ = shutdown.changed() => {}
            }
        }
        info!("Tree listener stopped");
        Ok(())
    }

    async fn handle_inbound(self: Arc<Self>, mut stream: TcpStream) -> Result<()> {
        let peer = wire::exchange_identity(&mut stream, &self.current()).await?;

        if peer.is_api() && self.role == Role::Node {
            info!(api = %peer.name, value = peer.value, "API client connected");
            self.attach(stream, ConnectionKind::Api, peer).await?;
            return Ok(());
        }

        match self.topology().parent() {
            Some(parent) if parent.name == peer.name => {
                info!("Parent {} connected", parent.name);
                self.attach(stream, ConnectionKind::Parent, parent.clone()).await?;
                Ok(())
            }
            expected => {
                if let Err(e) = wire::reject(&mut stream).await {
                    debug!("Could not send close mark to {}: {}", peer.name, e);
                }
                Err(wire::Error::UnexpectedPeer {
                    expected: expected.map_or_else(|| "<no parent>".to_string(), |p| p.name.clone()),
                    actual: peer.name,
                }
                .into())
            }
        }
    }

    /// Track a handshaken stream and start its read task.
    ///
    /// The stream is refused with the close mark once shutdown has begun, or
    /// when an API peer's value is already held by a live client.
    async fn attach(&self, stream: TcpStream, kind: ConnectionKind, peer: Node) -> Result<Arc<Connection>> {
        let (reader, writer) = stream.into_split();
        let id = self.next_conn_id.fetch_add(1, Ordering::Relaxed);
        let conn = Arc::new(Connection::new(id, kind, peer, writer));

        // Check, insert and spawn under one lock: shutdown drains under the
        // same lock, and the read task cannot untrack before it is tracked.
        let admitted = {
            let mut conns = self.conns();
            if *self.shutdown.borrow() {
                Err("shutting down".to_string())
            } else if kind == ConnectionKind::Api && conns.api(conn.value()).is_some() {
                Err(format!("API value {} already attached", conn.value()))
            } else {
                let replaced = conns.insert(Arc::clone(&conn));
                if let Some(network) = self.me.upgrade() {
                    let task = tokio::spawn(network.read_loop(Arc::clone(&conn), reader));
                    conn.set_reader(task.abort_handle());
                }
                Ok(replaced)
            }
        };

        let replaced = match admitted {
            Ok(replaced) => replaced,
            Err(reason) => {
                if let Err(e) = conn.send(wire::CLOSE_CONNECTION_MARK).await {
                    debug!("Close mark to {} not sent: {}", conn.peer().name, e);
                }
                conn.shutdown_writer().await;
                return Err(Error::Network(format!(
                    "{} {} refused: {}",
                    kind,
                    conn.peer().name,
                    reason
                )));
            }
        };

        if let Some(old) = replaced {
            debug!(peer = %old.peer().name, kind = %kind, "replacing connection");
            old.close().await;
        }

        self.fire(connected_event(kind), conn.peer());
        Ok(conn)
    }

    async fn read_loop(self: Arc<Self>, conn: Arc<Connection>, mut reader: OwnedReadHalf) {
        let peer = conn.peer().name.clone();
        loop {
            match wire::read_message(&mut reader).await {
                Ok(body) if wire::is_close_mark(&body) => {
                    info!("{} {} closed the connection", conn.kind(), peer);
                    break;
                }
                Ok(body) => {
                    if let Err(e) = self.dispatch(&conn, body).await {
                        warn!("Dropping {} {}: {}", conn.kind(), peer, e);
                        break;
                    }
                }
                Err(wire::Error::Io(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    info!("{} {} disconnected", conn.kind(), peer);
                    break;
                }
                Err(e) => {
                    warn!("Read error from {} {}: {}", conn.kind(), peer, e);
                    break;
                }
            }
        }
        self.untrack(&conn);
        conn.shutdown_writer().await;
    }

    /// Handle one frame received on `arrived`.
    async fn dispatch(&self, arrived: &Connection, body: Bytes) -> Result<()> {
        let frame = Frame::decode_body(body.clone())?;
        let value = self.value();

        if self.policy.delivers(&frame.path, value) {
            match Event::from_bytes(&frame.payload) {
                Ok(event) => {
                    debug!(event = %event.name, from = ?event.from, "delivering locally");
                    self.bus.trigger(event);
                }
                Err(e) => warn!(peer = %arrived.peer().name, "Undecodable event payload: {}", e),
            }
        } else if frame.path.contains(value) {
            trace!(peer = %arrived.peer().name, "relaying");
        }

        self.forward(&body, &frame.path, Some(arrived.id())).await;
        Ok(())
    }

    /// Write `body` to every connection (except `except`) whose peer value
    /// divides `path`. Failed peers are dropped. Returns how many got it.
    async fn forward(&self, body: &[u8], path: &PathValue, except: Option<u64>) -> usize {
        let qualifying: Vec<Arc<Connection>> = self
            .conns()
            .all()
            .into_iter()
            .filter(|c| Some(c.id()) != except && path.contains(c.value()))
            .collect();

        let mut sent = 0;
        for conn in qualifying {
            match conn.send(body).await {
                Ok(()) => sent += 1,
                Err(e) => {
                    warn!("Write to {} {} failed, dropping: {}", conn.kind(), conn.peer().name, e);
                    self.untrack(&conn);
                    conn.close().await;
                }
            }
        }
        sent
    }

    /// Path from this node (or, for an API client, through its entry) to
    /// `targets`.
    pub fn path_for(&self, targets: &Targets) -> Result<PathValue> {
        match &self.role {
            Role::Node => Ok(self.encoder.calculate_path(&self.name(), targets)?),
            Role::Api { entry } => {
                let mut path = self.encoder.calculate_path(entry, targets)?;
                path.mul_value(self.store.get_node(entry)?.value);
                Ok(path)
            }
        }
    }

    /// Send `event` to `targets`.
    pub async fn emit(&self, event: Event, targets: &Targets) -> Result<()> {
        let path = self.path_for(targets)?;
        self.emit_with_path(event, path).await
    }

    /// Send `event` along `path`.
    ///
    /// A tree node whose own value divides the path also delivers the event
    /// to itself.
    pub async fn emit_with_path(&self, mut event: Event, path: PathValue) -> Result<()> {
        if path.is_zero() {
            return Err(Error::Network("refusing to emit on a zero path".to_string()));
        }
        event.from = Some(self.origin());
        let body = Frame::new(path.clone(), event.to_bytes()?).encode_body();

        if self.role == Role::Node && path.contains(self.value()) {
            self.bus.trigger(event.clone());
        }

        let sent = self.forward(&body, &path, None).await;
        debug!(event = %event.name, path = %path, peers = sent, "emitted");
        Ok(())
    }

    /// Answer whoever emitted an event.
    pub async fn reply(&self, origin: &Origin, event: Event) -> Result<()> {
        match origin {
            Origin::Node { name } => self.emit(event, &Targets::nodes([name.clone()])).await,
            Origin::Api { entry, value } => {
                let path = match &self.role {
                    Role::Node => self.encoder.calculate_path_for_api(
                        &self.name(),
                        &Targets::nodes([entry.clone()]),
                        *value,
                    )?,
                    Role::Api { .. } => {
                        return Err(Error::Network("API clients cannot reach other API clients".to_string()))
                    }
                };
                self.emit_with_path(event, path).await
            }
        }
    }

    /// One reconciliation pass: close children that left the topology and
    /// connect every desired child not currently connected.
    pub async fn reconcile_children(&self) {
        let desired = self.topology().children().clone();

        let stale: Vec<Arc<Connection>> = {
            let conns = self.conns();
            conns
                .child_names()
                .iter()
                .filter(|name| !desired.contains_key(*name))
                .filter_map(|name| conns.child(name).cloned())
                .collect()
        };
        for conn in stale {
            info!("Child {} left the topology, closing", conn.peer().name);
            self.untrack(&conn);
            conn.close().await;
        }

        let mut missing: Vec<Node> = {
            let conns = self.conns();
            desired
                .into_values()
                .filter(|child| conns.child(&child.name).is_none())
                .collect()
        };
        missing.sort_by(|a, b| a.name.cmp(&b.name));

        for child in missing {
            if let Err(e) = self.connect_child(&child).await {
                warn!("Failed to connect to child {} at {}: {}", child.name, child.address(), e);
            }
        }
    }

    async fn connect_child(&self, child: &Node) -> Result<()> {
        let mut stream = TcpStream::connect(child.address()).await?;
        let peer = wire::exchange_identity(&mut stream, &self.current()).await?;
        wire::expect_identity(&peer, &child.name)?;
        info!("Connected to child {} at {}", child.name, child.address());
        self.attach(stream, ConnectionKind::Child, child.clone()).await?;
        Ok(())
    }

    /// Reconcile children every `interval` until shutdown.
    pub async fn run_child_connector(self: Arc<Self>, interval: Duration) {
        let mut shutdown = self.shutdown.subscribe();
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            if *shutdown.borrow_and_update() {
                break;
            }
            tokio::select! {
                _ = ticker.tick() => self.reconcile_children().await,
                _ = shutdown.changed() => {}
            }
        }
        info!("Child connector stopped");
    }

    /// Teardown: stop the listener and connector, close every connection.
    pub async fn shutdown(&self) {
        self.shutdown.send_replace(true);
        let all = self.conns().drain();
        let count = all.len();
        for conn in all {
            if let Err(e) = conn.send(wire::CLOSE_CONNECTION_MARK).await {
                debug!("Close mark to {} not sent: {}", conn.peer().name, e);
            }
            conn.close().await;
        }
        info!("Tree network shut down, {} connections closed", count);
    }

    /// Stop tracking `conn` and fire its disconnect event. No-op if it was
    /// already replaced or removed.
    fn untrack(&self, conn: &Connection) -> bool {
        let removed = self.conns().remove(conn).is_some();
        if removed {
            self.fire(disconnected_event(conn.kind()), conn.peer());
        }
        removed
    }

    /// Fire a local lifecycle event carrying `peer`'s record.
    fn fire(&self, name: &str, peer: &Node) {
        match serde_json::to_vec(peer) {
            Ok(data) => self.bus.trigger(Event::new(name, data).with_origin(self.origin())),
            Err(e) => warn!("Could not encode {} event: {}", name, e),
        }
    }
}

impl NetworkEmitter for TreeNetwork {
    fn emit(&self, event: Event, targets: Targets) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move { TreeNetwork::emit(self, event, &targets).await })
    }

    fn emit_with_path(&self, event: Event, path: PathValue) -> BoxFuture<'_, Result<()>> {
        Box::pin(TreeNetwork::emit_with_path(self, event, path))
    }
}

impl fmt::Debug for TreeNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeNetwork")
            .field("node", &self.name())
            .field("role", &self.role)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

fn api_topology(store: &dyn NodeStore, identity: Node, entry: &str) -> Result<Topology> {
    let entry = store.get_node(entry)?;
    Ok(Topology::new(identity, None, vec![entry]))
}

fn connected_event(kind: ConnectionKind) -> &'static str {
    match kind {
        ConnectionKind::Parent => events::PARENT_CONNECTED,
        ConnectionKind::Child => events::CHILD_CONNECTED,
        ConnectionKind::Api => events::API_CONNECTED,
    }
}

fn disconnected_event(kind: ConnectionKind) -> &'static str {
    match kind {
        ConnectionKind::Parent => events::PARENT_DISCONNECTED,
        ConnectionKind::Child => events::CHILD_DISCONNECTED,
        ConnectionKind::Api => events::API_DISCONNECTED,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canopy_topology::MemoryStore;

    fn store() -> Arc<MemoryStore> {
        let store = MemoryStore::new();
        for node in [
            Node::new("root").with_children(["a", "b"]),
            Node::new("a").with_children(["c"]),
            Node::new("b"),
            Node::new("c"),
        ] {
            register_node(&store, node).unwrap();
        }
        Arc::new(store)
    }

    #[test]
    fn delivery_policy_at_relay_and_target() {
        let path = PathValue::from(147);
        // a relays, c is the target
        assert!(!DeliveryPolicy::Targets.delivers(&path, 3));
        assert!(DeliveryPolicy::Targets.delivers(&path, 7));
        assert!(DeliveryPolicy::Route.delivers(&path, 3));
        assert!(DeliveryPolicy::Route.delivers(&path, 7));
        assert!(!DeliveryPolicy::Route.delivers(&path, 5));
    }

    #[test]
    fn delivery_policy_parsing() {
        assert_eq!("targets".parse::<DeliveryPolicy>().unwrap(), DeliveryPolicy::Targets);
        assert_eq!(" Route ".parse::<DeliveryPolicy>().unwrap(), DeliveryPolicy::Route);
        assert!(matches!("sometimes".parse::<DeliveryPolicy>(), Err(Error::Config(_))));
        assert_eq!(DeliveryPolicy::default().to_string(), "targets");
    }

    #[tokio::test]
    async fn path_from_node() {
        let network = TreeNetwork::new(store(), "root", Arc::new(EventBus::new()), DeliveryPolicy::Targets).unwrap();
        assert_eq!(network.path_for(&Targets::nodes(["c"])).unwrap(), PathValue::from(147));
        assert_eq!(network.origin(), Origin::Node { name: "root".to_string() });
    }

    #[tokio::test]
    async fn api_path_goes_through_entry() {
        let identity = Node { value: 211, ..Node::new("___TREE_API___|t") };
        let network = TreeNetwork::new_api(store(), identity, "a", Arc::new(EventBus::new())).unwrap();
        // entry a relays (3), c is the target (7 * 7)
        assert_eq!(network.path_for(&Targets::nodes(["c"])).unwrap(), PathValue::from(147));
        assert_eq!(
            network.origin(),
            Origin::Api { entry: "a".to_string(), value: 211 }
        );
        assert!(network.topology().is_child("a"));
    }

    #[tokio::test]
    async fn emit_to_self_delivers_locally() {
        let bus = Arc::new(EventBus::new());
        let network = TreeNetwork::new(store(), "b", Arc::clone(&bus), DeliveryPolicy::Targets).unwrap();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        bus.on("note", move |event| {
            let _ = tx.send(event.from.clone());
        });

        network.emit(Event::new("note", "x"), &Targets::nodes(["b"])).await.unwrap();
        let from = tokio::time::timeout(Duration::from_secs(1), rx.recv()).await.unwrap().unwrap();
        assert_eq!(from, Some(Origin::Node { name: "b".to_string() }));
    }

    #[tokio::test]
    async fn update_node_info_event_refreshes_topology() {
        let bus = Arc::new(EventBus::new());
        let network = TreeNetwork::new(store(), "a", Arc::clone(&bus), DeliveryPolicy::Targets).unwrap();
        assert!(network.topology().is_child("c"));

        let update = serde_json::to_vec(&Node::new("a")).unwrap();
        bus.trigger(Event::new(events::UPDATE_NODE_INFO, update));

        for _ in 0..100 {
            if !network.topology().is_child("c") {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(!network.topology().is_child("c"));
        // value survives the update
        assert_eq!(network.value(), 3);
    }

    #[tokio::test]
    async fn zero_path_is_refused() {
        let network = TreeNetwork::new(store(), "a", Arc::new(EventBus::new()), DeliveryPolicy::Targets).unwrap();
        let err = network
            .emit_with_path(Event::new("x", ""), PathValue::from(0))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Network(_)));
    }
}
