//! Live connections held by a node.

use crate::error::Result;
use canopy_protocols::write_message;
use canopy_topology::Node;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::task::AbortHandle;

/// Role of the peer on the other end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionKind {
    Parent,
    Child,
    Api,
}

impl fmt::Display for ConnectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionKind::Parent => write!(f, "parent"),
            ConnectionKind::Child => write!(f, "child"),
            ConnectionKind::Api => write!(f, "api"),
        }
    }
}

/// One stream to a peer. Only the network layer writes to or closes it.
pub struct Connection {
    id: u64,
    kind: ConnectionKind,
    peer: Node,
    writer: tokio::sync::Mutex<OwnedWriteHalf>,
    reader: Mutex<Option<AbortHandle>>,
}

impl Connection {
    pub(crate) fn new(id: u64, kind: ConnectionKind, peer: Node, writer: OwnedWriteHalf) -> Self {
        Self {
            id,
            kind,
            peer,
            writer: tokio::sync::Mutex::new(writer),
            reader: Mutex::new(None),
        }
    }

    pub(crate) fn set_reader(&self, handle: AbortHandle) {
        *self.reader.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn kind(&self) -> ConnectionKind {
        self.kind
    }

    pub fn peer(&self) -> &Node {
        &self.peer
    }

    pub fn value(&self) -> u64 {
        self.peer.value
    }

    /// Write one message body. Writers are serialized, so bodies never
    /// interleave.
    pub async fn send(&self, body: &[u8]) -> Result<()> {
        let mut writer = self.writer.lock().await;
        write_message(&mut *writer, body).await?;
        Ok(())
    }

    /// Shut down the write side; the peer sees end of stream.
    pub(crate) async fn shutdown_writer(&self) {
        let mut writer = self.writer.lock().await;
        if let Err(e) = writer.shutdown().await {
            tracing::debug!(peer = %self.peer.name, "shutdown error: {}", e);
        }
    }

    /// Stop the read task and shut down the stream.
    pub(crate) async fn close(&self) {
        if let Some(reader) = self
            .reader
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            reader.abort();
        }
        self.shutdown_writer().await;
    }

    pub fn info(&self) -> ConnectionInfo {
        ConnectionInfo {
            kind: self.kind,
            name: self.peer.name.clone(),
            value: self.peer.value,
            address: self.peer.address(),
        }
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("peer", &self.peer.name)
            .field("value", &self.peer.value)
            .finish()
    }
}

/// Summary of a live connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionInfo {
    pub kind: ConnectionKind,
    pub name: String,
    pub value: u64,
    pub address: String,
}

/// Connection maps: the single parent, children by name, API peers by value.
#[derive(Debug, Default)]
pub(crate) struct Connections {
    parent: Option<Arc<Connection>>,
    children: HashMap<String, Arc<Connection>>,
    api: HashMap<u64, Arc<Connection>>,
}

impl Connections {
    /// Track `conn`, returning whatever it replaced.
    pub fn insert(&mut self, conn: Arc<Connection>) -> Option<Arc<Connection>> {
        match conn.kind() {
            ConnectionKind::Parent => self.parent.replace(conn),
            ConnectionKind::Child => self.children.insert(conn.peer().name.clone(), conn),
            ConnectionKind::Api => self.api.insert(conn.value(), conn),
        }
    }

    /// Remove the connection with this id, if it is still the tracked one.
    pub fn remove(&mut self, conn: &Connection) -> Option<Arc<Connection>> {
        let id = conn.id();
        match conn.kind() {
            ConnectionKind::Parent => {
                if self.parent.as_ref().is_some_and(|p| p.id() == id) {
                    self.parent.take()
                } else {
                    None
                }
            }
            ConnectionKind::Child => {
                let name = &conn.peer().name;
                if self.children.get(name).is_some_and(|c| c.id() == id) {
                    self.children.remove(name)
                } else {
                    None
                }
            }
            ConnectionKind::Api => {
                let value = conn.value();
                if self.api.get(&value).is_some_and(|c| c.id() == id) {
                    self.api.remove(&value)
                } else {
                    None
                }
            }
        }
    }

    pub fn parent(&self) -> Option<&Arc<Connection>> {
        self.parent.as_ref()
    }

    pub fn child(&self, name: &str) -> Option<&Arc<Connection>> {
        self.children.get(name)
    }

    pub fn api(&self, value: u64) -> Option<&Arc<Connection>> {
        self.api.get(&value)
    }

    pub fn child_names(&self) -> Vec<String> {
        self.children.keys().cloned().collect()
    }

    /// Every live connection: parent first, then children, then API peers.
    pub fn all(&self) -> Vec<Arc<Connection>> {
        self.parent
            .iter()
            .chain(self.children.values())
            .chain(self.api.values())
            .cloned()
            .collect()
    }

    /// Remove and return everything.
    pub fn drain(&mut self) -> Vec<Arc<Connection>> {
        let mut all: Vec<Arc<Connection>> = self.parent.take().into_iter().collect();
        all.extend(self.children.drain().map(|(_, c)| c));
        all.extend(self.api.drain().map(|(_, c)| c));
        all
    }
}
