//! Multicast target descriptions.

/// Target name meaning "every known node".
pub const WILDCARD: &str = "*";

/// Who an event is addressed to: explicit node names, groups and tags.
///
/// A [`WILDCARD`] among the node names overrides everything else.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Targets {
    pub nodes: Vec<String>,
    pub groups: Vec<String>,
    pub tags: Vec<String>,
}

impl Targets {
    /// Address explicit nodes.
    pub fn nodes<I, S>(nodes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            nodes: nodes.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Address every node in the tree.
    pub fn all() -> Self {
        Self::nodes([WILDCARD])
    }

    #[must_use]
    pub fn with_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups.extend(groups.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn is_wildcard(&self) -> bool {
        self.nodes.iter().any(|n| n == WILDCARD)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.groups.is_empty() && self.tags.is_empty()
    }

    /// First explicit, non-wildcard node name.
    pub fn first_node(&self) -> Option<&str> {
        self.nodes
            .iter()
            .map(String::as_str)
            .find(|n| *n != WILDCARD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_detection() {
        assert!(Targets::all().is_wildcard());
        assert!(Targets::nodes(["a", "*"]).is_wildcard());
        assert!(!Targets::nodes(["a"]).with_groups(["g"]).is_wildcard());
    }

    #[test]
    fn first_node_skips_wildcard() {
        assert_eq!(Targets::nodes(["*", "a", "b"]).first_node(), Some("a"));
        assert_eq!(Targets::all().first_node(), None);
    }

    #[test]
    fn empty() {
        assert!(Targets::default().is_empty());
        assert!(!Targets::default().with_tags(["gpu"]).is_empty());
    }
}
