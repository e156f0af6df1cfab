//! Non-fatal problems recorded while a navigation tree is built.
//!
//! Structural violations (duplicate keys, a missing `before` key), missing records, broken category
//! paths and failed branches do not abort a build. They are logged as they happen and accumulated
//! on the [crate::tree::NavigationTree] so callers and tests can inspect them afterwards through
//! [crate::tree::NavigationTree::diagnostics].

use serde::{Deserialize, Serialize};

use crate::{nodekey::NodeKey, properties::NodeType};

/// The offending (key, type) pair of a structural violation, plus where it happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuralViolation {
    /// Key of the collection owner, if the owner has one (the root's parent has none).
    pub parent: Option<NodeKey>,
    pub key: NodeKey,
    pub node_type: NodeType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TreeDiagnostic {
    /// A second child with the same (key, type) pair was attached to a collection. The sequence
    /// keeps both nodes; keyed lookup resolves to the newer one.
    DuplicateKey(StructuralViolation),

    /// An insert-before referenced a key that is not in the collection; the node was appended.
    MissingBeforeKey {
        violation: StructuralViolation,
        before: NodeKey,
        available: Vec<NodeKey>,
    },

    /// A record the builder asked for does not exist. The affected branch was skipped.
    NotFound(String),

    /// The category hierarchy is inconsistent (cycle, missing ancestor, excessive depth). Reported
    /// once per category; its subtree was skipped.
    Configuration(String),

    /// A branch failed for any other reason and was skipped.
    BranchFailed { branch: String, message: String },

    /// A registered navigation extension returned an error.
    Extension { module: String, message: String },
}

impl TreeDiagnostic {
    pub fn duplicate_key(parent: Option<NodeKey>, key: NodeKey, node_type: NodeType) -> Self {
        Self::DuplicateKey(StructuralViolation {
            parent,
            key,
            node_type,
        })
    }

    pub fn branch_failed(branch: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BranchFailed {
            branch: branch.into(),
            message: message.into(),
        }
    }

    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::DuplicateKey(_) | Self::MissingBeforeKey { .. }
        )
    }

    pub fn as_structural(&self) -> Option<&StructuralViolation> {
        match self {
            Self::DuplicateKey(violation) => Some(violation),
            Self::MissingBeforeKey { violation, .. } => Some(violation),
            _ => None,
        }
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

impl std::fmt::Display for TreeDiagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateKey(v) => write!(
                f,
                "Duplicate key {}:{} under {:?}",
                v.node_type, v.key, v.parent
            ),
            Self::MissingBeforeKey {
                violation,
                before,
                available,
            } => write!(
                f,
                "Could not insert {}:{} before '{before}', available keys: {available:?}",
                violation.node_type, violation.key
            ),
            Self::NotFound(msg) => write!(f, "Not found: {msg}"),
            Self::Configuration(msg) => write!(f, "Configuration error: {msg}"),
            Self::BranchFailed { branch, message } => {
                write!(f, "Branch '{branch}' skipped: {message}")
            }
            Self::Extension { module, message } => {
                write!(f, "Extension '{module}' failed: {message}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structural_accessors() {
        let dup = TreeDiagnostic::duplicate_key(Some("courses".into()), 5i64.into(), NodeType::Course);
        assert!(dup.is_structural());
        assert_eq!(dup.as_structural().unwrap().key, 5i64);

        let failed = TreeDiagnostic::branch_failed("mycourses", "repository offline");
        assert!(!failed.is_structural());
        assert!(failed.as_structural().is_none());
        assert_eq!(
            failed.to_string(),
            "Branch 'mycourses' skipped: repository offline"
        );
    }
}
