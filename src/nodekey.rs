/// [crate::nodekey] contains the identifiers used to address navigation nodes: the per-collection
/// [NodeKey], the arena-level [NodeId], and the aliases for the ids of the records the
/// [crate::repository::Repository] hands out.
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

use crate::properties::NodeType;

pub type CategoryId = i64;
pub type CourseId = i64;
pub type SectionId = i64;
pub type ActivityId = i64;
pub type UserId = i64;

/// The key of a node within its parent's collection.
///
/// Keys are either numeric (record ids, or the child count assigned when no key was given) or
/// named (reserved structural keys such as `mycourses` or `participants`). The two never compare
/// equal: `Id(5)` and `Name("5")` are different keys.
#[derive(Debug, Clone, Serialize, Deserialize, PartialOrd, Ord, PartialEq, Eq, Hash)]
#[serde(untagged)]
pub enum NodeKey {
    Id(i64),
    Name(String),
}

impl NodeKey {
    pub fn as_id(&self) -> Option<i64> {
        match self {
            NodeKey::Id(id) => Some(*id),
            NodeKey::Name(_) => None,
        }
    }

    pub fn as_name(&self) -> Option<&str> {
        match self {
            NodeKey::Id(_) => None,
            NodeKey::Name(name) => Some(name),
        }
    }

    /// Key rendered with only `[A-Za-z0-9_-]`, suitable for DOM ids.
    pub fn cleaned(&self) -> String {
        self.to_string()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
            .collect()
    }
}

impl Display for NodeKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeKey::Id(id) => write!(f, "{id}"),
            NodeKey::Name(name) => write!(f, "{name}"),
        }
    }
}

impl From<i64> for NodeKey {
    fn from(id: i64) -> Self {
        NodeKey::Id(id)
    }
}

impl From<usize> for NodeKey {
    fn from(id: usize) -> Self {
        NodeKey::Id(id as i64)
    }
}

impl From<&str> for NodeKey {
    fn from(name: &str) -> Self {
        NodeKey::Name(name.to_string())
    }
}

impl From<String> for NodeKey {
    fn from(name: String) -> Self {
        NodeKey::Name(name)
    }
}

impl PartialEq<i64> for NodeKey {
    fn eq(&self, other: &i64) -> bool {
        matches!(self, NodeKey::Id(id) if id == other)
    }
}

impl PartialEq<&str> for NodeKey {
    fn eq(&self, other: &&str) -> bool {
        matches!(self, NodeKey::Name(name) if name == other)
    }
}

/// Arena address of a node inside a [crate::tree::NavigationTree]. Ids are never reused, so an id
/// that outlived its node simply resolves to nothing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialOrd, Ord, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The (key, type) identity of a node, independent of the arena it lives in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct NodeRef {
    pub key: NodeKey,
    pub node_type: NodeType,
}

impl NodeRef {
    pub fn new<K: Into<NodeKey>>(key: K, node_type: NodeType) -> Self {
        NodeRef {
            key: key.into(),
            node_type,
        }
    }
}

impl Display for NodeRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.node_type, self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_and_named_keys_never_collide() {
        assert_ne!(NodeKey::from(5i64), NodeKey::from("5"));
        assert_eq!(NodeKey::from(5i64), 5i64);
        assert_eq!(NodeKey::from("home"), "home");
    }

    #[test]
    fn cleaned_key_drops_punctuation() {
        assert_eq!(NodeKey::from("user 7/profile").cleaned(), "user7profile");
        assert_eq!(NodeKey::from(-3i64).cleaned(), "-3");
    }
}
