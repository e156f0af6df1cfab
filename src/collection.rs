//! The ordered, type-indexed child container every navigation node owns.
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::{
    diagnostic::{StructuralViolation, TreeDiagnostic},
    nodekey::{NodeId, NodeKey},
    properties::NodeType,
    tree::NavigationTree,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub key: NodeKey,
    pub node_type: NodeType,
    pub id: NodeId,
}

/// Children of a node in document order, plus a (type, key) index for constant time lookup.
///
/// The sequence is the source of truth for order; the index is the source of truth for keyed
/// lookup. Inserting before an existing key only moves entries in the sequence. When the same
/// (type, key) pair is added twice both nodes stay in the sequence and the index points at the
/// newest one.
#[derive(Debug, Clone, Default)]
pub struct NodeCollection {
    ordered: Vec<Slot>,
    index: HashMap<(NodeType, NodeKey), NodeId>,
    label: Option<String>,
}

impl NodeCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn set_label(&mut self, label: Option<String>) {
        self.label = label;
    }

    /// Attach `id` under (`key`, `node_type`). With `before` set, the node is placed at the
    /// position of the first slot carrying that key; if no slot does, it is appended and a
    /// [TreeDiagnostic::MissingBeforeKey] is returned. `owner` only labels diagnostics.
    pub fn add(
        &mut self,
        id: NodeId,
        key: NodeKey,
        node_type: NodeType,
        before: Option<&NodeKey>,
        owner: Option<&NodeKey>,
    ) -> Vec<TreeDiagnostic> {
        let mut diagnostics = Vec::new();
        let violation = || StructuralViolation {
            parent: owner.cloned(),
            key: key.clone(),
            node_type,
        };

        if self.index.contains_key(&(node_type, key.clone())) {
            tracing::warn!(
                "[NodeCollection::add] duplicate key {node_type}:{key} under {:?}",
                owner
            );
            diagnostics.push(TreeDiagnostic::DuplicateKey(violation()));
        }

        let slot = Slot {
            key: key.clone(),
            node_type,
            id,
        };
        match before {
            Some(before_key) => match self.ordered.iter().position(|s| &s.key == before_key) {
                Some(position) => self.ordered.insert(position, slot),
                None => {
                    tracing::warn!(
                        "[NodeCollection::add] no key '{before_key}' to insert {node_type}:{key} \
                        before, appending instead"
                    );
                    diagnostics.push(TreeDiagnostic::MissingBeforeKey {
                        violation: violation(),
                        before: before_key.clone(),
                        available: self.key_list(),
                    });
                    self.ordered.push(slot);
                }
            },
            None => self.ordered.push(slot),
        }
        self.index.insert((node_type, key), id);
        diagnostics
    }

    /// Direct lookup. Without a type this is a linear scan returning the first slot in document
    /// order with the key.
    pub fn get(&self, key: &NodeKey, node_type: Option<NodeType>) -> Option<NodeId> {
        match node_type {
            Some(node_type) => self.index.get(&(node_type, key.clone())).copied(),
            None => self.ordered.iter().find(|s| &s.key == key).map(|s| s.id),
        }
    }

    /// Recursive lookup: this collection first, then each child's collection depth-first in
    /// document order.
    pub fn find(
        &self,
        tree: &NavigationTree,
        key: &NodeKey,
        node_type: Option<NodeType>,
    ) -> Option<NodeId> {
        if let Some(id) = self.get(key, node_type) {
            return Some(id);
        }
        self.ordered.iter().find_map(|slot| {
            tree.node(slot.id)
                .and_then(|child| child.children.find(tree, key, node_type))
        })
    }

    /// Detach the first slot matching (`key`, `node_type`). Returns the detached id.
    pub fn remove(&mut self, key: &NodeKey, node_type: Option<NodeType>) -> Option<NodeId> {
        let position = self
            .ordered
            .iter()
            .position(|s| &s.key == key && node_type.map_or(true, |t| t == s.node_type))?;
        Some(self.remove_at(position))
    }

    /// Detach the slot holding `id`, if any.
    pub fn remove_id(&mut self, id: NodeId) -> bool {
        match self.ordered.iter().position(|s| s.id == id) {
            Some(position) => {
                self.remove_at(position);
                true
            }
            None => false,
        }
    }

    fn remove_at(&mut self, position: usize) -> NodeId {
        let slot = self.ordered.remove(position);
        let index_key = (slot.node_type, slot.key);
        if self.index.get(&index_key) == Some(&slot.id) {
            // Fall back to the newest remaining duplicate, if there is one.
            match self
                .ordered
                .iter()
                .rev()
                .find(|s| s.node_type == index_key.0 && s.key == index_key.1)
            {
                Some(remaining) => {
                    self.index.insert(index_key, remaining.id);
                }
                None => {
                    self.index.remove(&index_key);
                }
            }
        }
        slot.id
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn count(&self) -> usize {
        self.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    /// Child ids in document order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = NodeId> + '_ {
        self.ordered.iter().map(|s| s.id)
    }

    pub fn slots(&self) -> &[Slot] {
        &self.ordered
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.ordered.iter().any(|s| s.id == id)
    }

    /// Direct children of `node_type`, in insertion order.
    pub fn of_type(&self, node_type: NodeType) -> Vec<NodeId> {
        self.ordered
            .iter()
            .filter(|s| s.node_type == node_type)
            .map(|s| s.id)
            .collect()
    }

    pub fn key_list(&self) -> Vec<NodeKey> {
        self.ordered.iter().map(|s| s.key.clone()).collect()
    }

    pub fn last(&self) -> Option<NodeId> {
        self.ordered.last().map(|s| s.id)
    }

    /// Move `ids` (which must already be in this collection) to the front, keeping their relative
    /// order.
    pub(crate) fn move_to_front(&mut self, ids: &[NodeId]) {
        let (mut front, rest): (Vec<Slot>, Vec<Slot>) =
            self.ordered.drain(..).partition(|s| ids.contains(&s.id));
        front.sort_by_key(|s| ids.iter().position(|id| *id == s.id));
        front.extend(rest);
        self.ordered = front;
    }

    /// Every index entry points into the sequence, and every (type, key) pair in the sequence has
    /// an index entry pointing at one of its slots.
    pub fn is_consistent(&self) -> bool {
        let index_in_order = self.index.iter().all(|((t, k), id)| {
            self.ordered
                .iter()
                .any(|s| s.id == *id && s.node_type == *t && &s.key == k)
        });
        let order_in_index = self
            .ordered
            .iter()
            .all(|s| self.index.contains_key(&(s.node_type, s.key.clone())));
        index_in_order && order_in_index
    }

    /// Number of distinct (type, key) pairs. Equals [NodeCollection::len] unless duplicates were
    /// added.
    pub fn index_len(&self) -> usize {
        self.index.len()
    }
}
