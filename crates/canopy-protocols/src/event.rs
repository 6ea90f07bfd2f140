//! Event records carried inside frames.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where an event was emitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Origin {
    /// A tree node.
    Node { name: String },
    /// An API client attached to `entry`.
    Api { entry: String, value: u64 },
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Node { name } => write!(f, "{}", name),
            Origin::Api { entry, value } => write!(f, "api:{}@{}", value, entry),
        }
    }
}

/// A named event with opaque data.
///
/// `from` is stamped by the network layer when the event is emitted; events
/// built locally start without one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub name: String,
    #[serde(with = "serde_bytes")]
    pub data: Vec<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<Origin>,
}

impl Event {
    pub fn new(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
            from: None,
        }
    }

    #[must_use]
    pub fn with_origin(mut self, origin: Origin) -> Self {
        self.from = Some(origin);
        self
    }

    /// Serialize as frame payload.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Parse a frame payload.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Data as UTF-8, lossily.
    pub fn data_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn payload_round_trip_keeps_origin() {
        let event = Event::new("deploy", b"\x00\x01binary".to_vec()).with_origin(Origin::Api {
            entry: "a".to_string(),
            value: 211,
        });
        let parsed = Event::from_bytes(&event.to_bytes().unwrap()).unwrap();
        assert_eq!(parsed, event);
    }

    #[test]
    fn origin_is_optional_on_the_wire() {
        let parsed = Event::from_bytes(br#"{"name":"ping","data":[104,105]}"#).unwrap();
        assert_eq!(parsed.name, "ping");
        assert_eq!(parsed.data_str(), "hi");
        assert!(parsed.from.is_none());
    }

    #[test]
    fn garbage_payload() {
        assert!(matches!(
            Event::from_bytes(b"not json"),
            Err(Error::Serialization(_))
        ));
    }

    #[test]
    fn origin_display() {
        let node = Origin::Node { name: "root".to_string() };
        let api = Origin::Api { entry: "a".to_string(), value: 211 };
        assert_eq!(node.to_string(), "root");
        assert_eq!(api.to_string(), "api:211@a");
    }
}
