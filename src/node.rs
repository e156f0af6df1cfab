//! A single navigation node and the builder-style [NewNode] used to create one.
//!
//! Nodes never hold references to each other. Parent and children are [NodeId]s into the owning
//! [crate::tree::NavigationTree]; every operation that walks the tree (activation, search, hiding)
//! lives on the tree.
use serde::{Deserialize, Serialize};

use crate::{
    collection::NodeCollection,
    locator::Locator,
    nodekey::{NodeId, NodeKey, NodeRef},
    properties::{NodeFlag, NodeFlags, NodeKind, NodeType},
};

/// Everything needed to create a node. The key is optional: when absent the node is keyed by its
/// parent's child count at the time it is attached.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewNode {
    pub text: String,
    pub action: Option<Locator>,
    pub node_type: NodeType,
    pub short_text: Option<String>,
    pub key: Option<NodeKey>,
    pub icon: Option<String>,
}

impl NewNode {
    pub fn new(text: impl Into<String>) -> Self {
        NewNode {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn node_type(mut self, node_type: NodeType) -> Self {
        self.node_type = node_type;
        self
    }

    pub fn key(mut self, key: impl Into<NodeKey>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn action(mut self, action: Locator) -> Self {
        self.action = Some(action);
        self
    }

    pub fn maybe_action(mut self, action: Option<Locator>) -> Self {
        self.action = action;
        self
    }

    pub fn short_text(mut self, short_text: impl Into<String>) -> Self {
        self.short_text = Some(short_text.into());
        self
    }

    pub fn icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) id: NodeId,
    pub key: NodeKey,
    pub node_type: NodeType,
    pub kind: NodeKind,
    pub text: String,
    pub short_text: Option<String>,
    title: Option<String>,
    force_title: bool,
    pub action: Option<Locator>,
    pub icon: Option<String>,
    pub flags: NodeFlags,
    classes: Vec<String>,
    /// Assigned by `find_expandable` for branches handed to the asynchronous loader.
    pub dom_id: Option<String>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: NodeCollection,
}

impl Node {
    pub(crate) fn create(id: NodeId, new: NewNode, default_key: NodeKey) -> Self {
        Node {
            id,
            key: new.key.unwrap_or(default_key),
            node_type: new.node_type,
            kind: NodeKind::Leaf,
            title: Some(new.text.clone()),
            text: new.text,
            short_text: new.short_text,
            force_title: false,
            action: new.action,
            icon: new.icon,
            flags: NodeFlags::default(),
            classes: Vec::new(),
            dom_id: None,
            parent: None,
            children: NodeCollection::new(),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn node_ref(&self) -> NodeRef {
        NodeRef::new(self.key.clone(), self.node_type)
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &NodeCollection {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut NodeCollection {
        &mut self.children
    }

    pub fn is(&self, flag: NodeFlag) -> bool {
        self.flags.contains(flag)
    }

    pub fn set(&mut self, flag: NodeFlag, on: bool) {
        self.flags.set(flag, on);
    }

    pub fn is_active(&self) -> bool {
        self.is(NodeFlag::Active)
    }

    pub fn is_displayed(&self) -> bool {
        self.is(NodeFlag::Displayed)
    }

    pub fn is_hidden(&self) -> bool {
        self.is(NodeFlag::Hidden)
    }

    pub fn is_force_open(&self) -> bool {
        self.is(NodeFlag::ForceOpen)
    }

    pub fn is_expandable(&self) -> bool {
        self.is(NodeFlag::Expandable)
    }

    /// True when the node has children or could have them once expanded.
    pub fn has_children(&self) -> bool {
        self.kind == NodeKind::Branch || !self.children.is_empty() || self.is_expandable()
    }

    pub fn has_action(&self) -> bool {
        self.action.is_some()
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    pub fn add_class(&mut self, class: &str) {
        if !self.has_class(class) {
            self.classes.push(class.to_string());
        }
    }

    /// Returns whether the class was present.
    pub fn remove_class(&mut self, class: &str) -> bool {
        let before = self.classes.len();
        self.classes.retain(|c| c != class);
        before != self.classes.len()
    }

    /// Set the title and make sure it is shown even when the node has no action.
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = Some(title.into());
        self.force_title = true;
    }

    pub fn title(&self) -> &str {
        match (&self.title, self.force_title || self.action.is_some()) {
            (Some(title), true) => title,
            _ => "",
        }
    }

    pub fn content(&self, short: bool) -> &str {
        match (&self.short_text, short) {
            (Some(short_text), true) => short_text,
            _ => &self.text,
        }
    }

    pub fn css_type(&self) -> &'static str {
        self.node_type.css_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(new: NewNode) -> Node {
        Node::create(NodeId(0), new, NodeKey::Id(0))
    }

    #[test]
    fn defaults() {
        let n = node(NewNode::new("Plain"));
        assert_eq!(n.node_type, NodeType::Custom);
        assert_eq!(n.kind, NodeKind::Leaf);
        assert!(n.is_displayed());
        assert!(n.is(NodeFlag::ShowInSecondaryNavigation));
        assert!(!n.has_children());
        assert_eq!(n.key, 0i64);
        assert_eq!(n.css_type(), "type_custom");
    }

    #[test]
    fn title_requires_action_or_force() {
        let mut n = node(NewNode::new("Grades"));
        assert_eq!(n.title(), "");
        n.set_title("All grades");
        assert_eq!(n.title(), "All grades");

        let linked = node(NewNode::new("Home").action(Locator::new("/")));
        assert_eq!(linked.title(), "Home");
    }

    #[test]
    fn content_prefers_short_text_only_when_asked() {
        let n = node(NewNode::new("Introduction to Rust").short_text("RUST101"));
        assert_eq!(n.content(true), "RUST101");
        assert_eq!(n.content(false), "Introduction to Rust");
        assert_eq!(node(NewNode::new("x")).content(true), "x");
    }

    #[test]
    fn classes_are_a_set() {
        let mut n = node(NewNode::new("x"));
        n.add_class("canexpand");
        n.add_class("canexpand");
        assert_eq!(n.classes().len(), 1);
        assert!(n.remove_class("canexpand"));
        assert!(!n.remove_class("canexpand"));
    }

    #[test]
    fn expandable_counts_as_children() {
        let mut n = node(NewNode::new("x").node_type(NodeType::Course));
        n.set(NodeFlag::Expandable, true);
        assert!(n.has_children());
    }
}
