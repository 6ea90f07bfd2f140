//! Node identity record.

/// Name prefix carried by API clients. Peers whose name starts with it are
/// attached clients, never tree members.
pub const API_NAME_PREFIX: &str = "___TREE_API___";

/// Tree listener port used when a record does not set one.
pub const DEFAULT_TREE_PORT: u16 = 8888;

/// A member of the tree.
///
/// `value` is zero until the node has been registered; after that it is a
/// prime that never changes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Node {
    /// Unique name
    pub name: String,
    /// Routing address (prime)
    pub value: u64,
    /// Listener host
    pub tree_ip: String,
    /// Listener port
    pub tree_port: u16,
    /// Labels for tag targets
    pub tags: Vec<String>,
    /// Labels for group targets
    pub groups: Vec<String>,
    /// Ordered child names
    pub children: Vec<String>,
}

impl Node {
    /// Create an unregistered node listening on the default port.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tree_ip: "127.0.0.1".to_string(),
            tree_port: DEFAULT_TREE_PORT,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_address(mut self, ip: impl Into<String>, port: u16) -> Self {
        self.tree_ip = ip.into();
        self.tree_port = port;
        self
    }

    #[must_use]
    pub fn with_children<I, S>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.children = children.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups = groups.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// `host:port` of the tree listener. Unset parts fall back to loopback
    /// and [`DEFAULT_TREE_PORT`].
    pub fn address(&self) -> String {
        let ip = if self.tree_ip.is_empty() {
            "127.0.0.1"
        } else {
            self.tree_ip.as_str()
        };
        let port = if self.tree_port == 0 {
            DEFAULT_TREE_PORT
        } else {
            self.tree_port
        };
        format!("{}:{}", ip, port)
    }

    /// Whether this record identifies an API client.
    pub fn is_api(&self) -> bool {
        self.name.starts_with(API_NAME_PREFIX)
    }

    pub fn has_child(&self, name: &str) -> bool {
        self.children.iter().any(|c| c == name)
    }

    pub fn in_group(&self, group: &str) -> bool {
        self.groups.iter().any(|g| g == group)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}
