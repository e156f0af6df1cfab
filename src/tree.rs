//! [NavigationTree] is the arena that owns every navigation node of one build.
//!
//! Nodes address each other through [NodeId]s. Ids are handed out sequentially and never reused,
//! so a removed node (and its whole subtree) simply stops resolving. All recursive operations are
//! depth-first in document order and return their results by value.
use serde::{Deserialize, Serialize};
use std::fmt::Write;

use crate::{
    diagnostic::TreeDiagnostic,
    error::NavigationError,
    locator::{Locator, MatchStrength},
    node::{NewNode, Node},
    nodekey::{NodeId, NodeKey},
    properties::{
        NodeFlag, NodeFlags, NodeKind, NodeType, CLASS_ACTIVE_TREE_NODE, CLASS_CAN_EXPAND,
        SHORT_BRANCH_LIMIT,
    },
};

/// A branch that has (or may have) children which are not materialized yet. Handed to the
/// asynchronous loader, which answers with a narrow [crate::builder::TreeBuilder::expand] pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpandableBranch {
    /// DOM id, `expandable_branch_<type code>_<cleaned key>`.
    pub id: String,
    pub node: NodeId,
    pub key: NodeKey,
    pub node_type: NodeType,
}

/// Serializable, self-contained view of a subtree for presentation layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    pub key: NodeKey,
    pub node_type: NodeType,
    pub kind: NodeKind,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_text: Option<String>,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    pub css_type: String,
    pub flags: NodeFlags,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub classes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dom_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeSnapshot>,
}

#[derive(Debug, Clone)]
pub struct NavigationTree {
    nodes: Vec<Option<Node>>,
    root: NodeId,
    /// The locator of the page being viewed. Node actions are compared against it.
    active_url: Option<Locator>,
    auto_find_active: bool,
    /// Whether the viewer is logged in. Course children are pre-marked as branches only then.
    authenticated: bool,
    /// Whether the viewer may see the profile pages of the current course.
    can_view_course_profile: bool,
    diagnostics: Vec<TreeDiagnostic>,
}

/// Id of the next arena slot. Slots are never reused, so the arena length is the id.
fn next_id(len: usize) -> Result<NodeId, NavigationError> {
    u32::try_from(len)
        .map(NodeId)
        .map_err(|_| NavigationError::Capacity(u32::MAX as usize))
}

impl NavigationTree {
    pub fn new(root: NewNode) -> Self {
        let root_id = NodeId(0);
        let mut root = Node::create(root_id, root, NodeKey::Id(0));
        root.kind = NodeKind::Branch;
        NavigationTree {
            nodes: vec![Some(root)],
            root: root_id,
            active_url: None,
            auto_find_active: true,
            authenticated: false,
            can_view_course_profile: true,
            diagnostics: Vec::new(),
        }
    }

    pub fn with_active_url(mut self, active_url: Option<Locator>) -> Self {
        self.active_url = active_url;
        self
    }

    pub fn with_authenticated(mut self, authenticated: bool) -> Self {
        self.authenticated = authenticated;
        self
    }

    pub fn with_auto_find_active(mut self, auto_find_active: bool) -> Self {
        self.auto_find_active = auto_find_active;
        self
    }

    pub fn active_url(&self) -> Option<&Locator> {
        self.active_url.as_ref()
    }

    /// Replace the locator new nodes are compared against. Does not re-evaluate existing nodes.
    pub fn override_active_url(&mut self, active_url: Locator) {
        self.active_url = Some(active_url);
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// False when the current course could not be resolved or entered.
    pub fn can_view_course_profile(&self) -> bool {
        self.can_view_course_profile
    }

    pub(crate) fn set_can_view_course_profile(&mut self, can_view: bool) {
        self.can_view_course_profile = can_view;
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index()).and_then(Option::as_ref)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.index()).and_then(Option::as_mut)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    /// Number of live nodes, root included.
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn diagnostics(&self) -> &[TreeDiagnostic] {
        &self.diagnostics
    }

    pub(crate) fn record(&mut self, diagnostic: TreeDiagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// Child ids of `id` in document order (empty when `id` is stale).
    pub fn children_of(&self, id: NodeId) -> Vec<NodeId> {
        self.node(id)
            .map(|n| n.children.iter().collect())
            .unwrap_or_default()
    }

    fn live(&self, id: NodeId) -> Result<&Node, NavigationError> {
        self.node(id)
            .ok_or_else(|| NavigationError::StaleNode(id.to_string()))
    }

    fn alloc(&mut self, new: NewNode, default_key: NodeKey) -> Result<NodeId, NavigationError> {
        let id = next_id(self.nodes.len())?;
        self.nodes.push(Some(Node::create(id, new, default_key)));
        Ok(id)
    }

    pub fn add_child(&mut self, parent: NodeId, new: NewNode) -> Result<NodeId, NavigationError> {
        self.add_node(parent, new, None)
    }

    /// Create a node from `new` and attach it under `parent`, before the sibling keyed `before` if
    /// given.
    pub fn add_node(
        &mut self,
        parent: NodeId,
        new: NewNode,
        before: Option<&NodeKey>,
    ) -> Result<NodeId, NavigationError> {
        let (default_key, parent_hidden, parent_key) = {
            let p = self.live(parent)?;
            (
                NodeKey::from(p.children.len()),
                p.is_hidden(),
                p.key.clone(),
            )
        };
        let id = self.alloc(new, default_key)?;
        let authenticated = self.authenticated;

        let (key, node_type) = {
            let child = self
                .node_mut(id)
                .ok_or_else(|| NavigationError::StaleNode(id.to_string()))?;
            child.parent = Some(parent);
            if child.node_type.is_structural_branch()
                || (authenticated && child.node_type == NodeType::Course)
            {
                child.kind = NodeKind::Branch;
            }
            if parent_hidden {
                child.set(NodeFlag::Hidden, true);
            }
            (child.key.clone(), child.node_type)
        };

        let diagnostics = {
            let p = self
                .node_mut(parent)
                .ok_or_else(|| NavigationError::StaleNode(parent.to_string()))?;
            p.kind = NodeKind::Branch;
            p.children
                .add(id, key, node_type, before, Some(&parent_key))
        };
        self.diagnostics.extend(diagnostics);

        if self.auto_find_active {
            self.check_if_active(id, MatchStrength::Exact);
        }
        Ok(id)
    }

    /// Mark `id` active. Every ancestor is forced open and made inactive, and any other active
    /// node in the tree is deactivated.
    pub fn make_active(&mut self, id: NodeId) {
        if !self.contains(id) {
            return;
        }
        // The upward cascade below only clears ancestors. An active node in another branch (set
        // by an extension, or auto-found before the builder picked the current course) would
        // survive it, so every other active node is cleared here.
        let previously_active: Vec<NodeId> = self
            .nodes
            .iter()
            .flatten()
            .filter(|n| n.is_active() && n.id != id)
            .map(|n| n.id)
            .collect();
        for other in previously_active {
            self.deactivate(other);
        }
        if let Some(node) = self.node_mut(id) {
            node.set(NodeFlag::Active, true);
            node.add_class(CLASS_ACTIVE_TREE_NODE);
        }
        self.force_open(id);
        if let Some(parent) = self.node(id).and_then(|n| n.parent) {
            self.make_inactive(parent);
        }
    }

    fn deactivate(&mut self, id: NodeId) {
        if let Some(node) = self.node_mut(id) {
            node.set(NodeFlag::Active, false);
            node.remove_class(CLASS_ACTIVE_TREE_NODE);
        }
    }

    /// Mark `id` and all of its ancestors inactive.
    pub fn make_inactive(&mut self, id: NodeId) {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            self.deactivate(current);
            cursor = self.node(current).and_then(|n| n.parent);
        }
    }

    /// Force `id` and all of its ancestors open.
    pub fn force_open(&mut self, id: NodeId) {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            cursor = match self.node_mut(current) {
                Some(node) => {
                    node.set(NodeFlag::ForceOpen, true);
                    node.parent
                }
                None => None,
            };
        }
    }

    pub fn find_active_node(&self) -> Option<NodeId> {
        self.find_active_node_from(self.root)
    }

    pub fn find_active_node_from(&self, id: NodeId) -> Option<NodeId> {
        let node = self.node(id)?;
        if node.is_active() {
            return Some(id);
        }
        node.children
            .iter()
            .find_map(|child| self.find_active_node_from(child))
    }

    pub fn contains_active_node(&self, id: NodeId) -> bool {
        self.find_active_node_from(id).is_some()
    }

    /// Compare the action of `id` against the current locator and make it active on a match.
    pub fn check_if_active(&mut self, id: NodeId, strength: MatchStrength) -> bool {
        let matched = match (self.node(id).and_then(|n| n.action.as_ref()), &self.active_url) {
            (Some(action), Some(current)) => action.matches(current, strength),
            _ => false,
        };
        if matched {
            tracing::debug!(
                "[NavigationTree::check_if_active] {id} matches the active url ({strength:?})"
            );
            self.make_active(id);
        }
        matched
    }

    pub fn search_for_active_node(&mut self, strength: MatchStrength) -> Option<NodeId> {
        self.search_for_active_node_from(self.root, strength)
    }

    /// First node in document order below (and including) `id` whose action matches the current
    /// locator with `strength`. The match is made active.
    pub fn search_for_active_node_from(
        &mut self,
        id: NodeId,
        strength: MatchStrength,
    ) -> Option<NodeId> {
        if self.check_if_active(id, strength) {
            return Some(id);
        }
        self.children_of(id)
            .into_iter()
            .find_map(|child| self.search_for_active_node_from(child, strength))
    }

    /// Hide `id` if its type passes `types` (or `types` is `None`), then apply the same to every
    /// child. Recursion does not depend on whether this level matched.
    pub fn hide(&mut self, id: NodeId, types: Option<&[NodeType]>) {
        let Some(node) = self.node_mut(id) else {
            return;
        };
        if types.map_or(true, |types| types.contains(&node.node_type)) {
            node.set(NodeFlag::Displayed, false);
        }
        for child in self.children_of(id) {
            self.hide(child, types);
        }
    }

    pub fn find_expandable(&mut self) -> Vec<ExpandableBranch> {
        self.find_expandable_from(self.root)
    }

    /// Displayed descendants that claim children but hold none. Each gets a DOM id and the
    /// requires-async-load flag, and its parent gets the `canexpand` class.
    pub fn find_expandable_from(&mut self, id: NodeId) -> Vec<ExpandableBranch> {
        let mut found = Vec::new();
        for child_id in self.children_of(id) {
            let branch = match self.node_mut(child_id) {
                Some(child)
                    if child.is_displayed()
                        && child.has_children()
                        && child.children.is_empty() =>
                {
                    let dom_id = format!(
                        "expandable_branch_{}_{}",
                        child.node_type.code(),
                        child.key.cleaned()
                    );
                    child.dom_id = Some(dom_id.clone());
                    child.set(NodeFlag::RequiresAsyncLoad, true);
                    Some(ExpandableBranch {
                        id: dom_id,
                        node: child_id,
                        key: child.key.clone(),
                        node_type: child.node_type,
                    })
                }
                _ => None,
            };
            if let Some(branch) = branch {
                if let Some(parent) = self.node_mut(id) {
                    parent.add_class(CLASS_CAN_EXPAND);
                }
                found.push(branch);
            }
            found.extend(self.find_expandable_from(child_id));
        }
        found
    }

    /// Fewer than [SHORT_BRANCH_LIMIT] children, none of which has children of its own.
    pub fn is_short_branch(&self, id: NodeId) -> bool {
        let Some(node) = self.node(id) else {
            return false;
        };
        node.children.len() < SHORT_BRANCH_LIMIT
            && node
                .children
                .iter()
                .filter_map(|child| self.node(child))
                .all(|child| !child.has_children())
    }

    pub fn find_all_of_type(&self, node_type: NodeType) -> Vec<NodeId> {
        self.find_all_of_type_from(self.root, node_type)
    }

    /// Children of `id` with `node_type`, followed by each child's own results in order.
    pub fn find_all_of_type_from(&self, id: NodeId, node_type: NodeType) -> Vec<NodeId> {
        let Some(node) = self.node(id) else {
            return Vec::new();
        };
        let mut found = node.children.of_type(node_type);
        for child in node.children.iter() {
            found.extend(self.find_all_of_type_from(child, node_type));
        }
        found
    }

    /// Recursive lookup below the root.
    pub fn find(&self, key: impl Into<NodeKey>, node_type: Option<NodeType>) -> Option<NodeId> {
        self.find_in(self.root, key, node_type)
    }

    pub fn find_in(
        &self,
        id: NodeId,
        key: impl Into<NodeKey>,
        node_type: Option<NodeType>,
    ) -> Option<NodeId> {
        let key = key.into();
        self.node(id)?.children.find(self, &key, node_type)
    }

    /// Direct child of the root.
    pub fn get(&self, key: impl Into<NodeKey>, node_type: Option<NodeType>) -> Option<NodeId> {
        self.get_in(self.root, key, node_type)
    }

    pub fn get_in(
        &self,
        id: NodeId,
        key: impl Into<NodeKey>,
        node_type: Option<NodeType>,
    ) -> Option<NodeId> {
        self.node(id)?.children.get(&key.into(), node_type)
    }

    /// Detach `id` from its parent and free its subtree. The root cannot be removed.
    pub fn remove(&mut self, id: NodeId) -> bool {
        let Some(parent) = self.node(id).and_then(|n| n.parent) else {
            return false;
        };
        if let Some(p) = self.node_mut(parent) {
            p.children.remove_id(id);
        }
        self.free(id);
        true
    }

    fn free(&mut self, id: NodeId) {
        if let Some(node) = self.nodes.get_mut(id.index()).and_then(Option::take) {
            for child in node.children.iter() {
                self.free(child);
            }
        }
    }

    /// Remove `id` if it has no children. Returns whether it was removed.
    pub fn trim_if_empty(&mut self, id: NodeId) -> bool {
        match self.node(id) {
            Some(node) if node.children.is_empty() => self.remove(id),
            _ => false,
        }
    }

    pub fn has_siblings(&self, id: NodeId) -> bool {
        self.node(id)
            .and_then(|n| n.parent)
            .and_then(|p| self.node(p))
            .map_or(false, |p| p.children.len() > 1)
    }

    /// Displayed children of the parent, `id` included. `None` when `id` has no siblings.
    pub fn get_siblings(&self, id: NodeId) -> Option<Vec<NodeId>> {
        if !self.has_siblings(id) {
            return None;
        }
        let parent = self.node(id)?.parent?;
        Some(
            self.children_of(parent)
                .into_iter()
                .filter(|sibling| self.node(*sibling).is_some_and(Node::is_displayed))
                .collect(),
        )
    }

    fn set_recursive(&mut self, id: NodeId, flag: NodeFlag, on: bool) {
        if let Some(node) = self.node_mut(id) {
            node.set(flag, on);
        }
        for child in self.children_of(id) {
            self.set_recursive(child, flag, on);
        }
    }

    pub fn set_show_in_secondary_navigation(&mut self, id: NodeId, show: bool) {
        self.set_recursive(id, NodeFlag::ShowInSecondaryNavigation, show);
    }

    pub fn set_force_into_more_menu(&mut self, id: NodeId, force: bool) {
        self.set_recursive(id, NodeFlag::ForceIntoMoreMenu, force);
    }

    /// Parent first, root last.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut found = Vec::new();
        let mut cursor = self.node(id).and_then(|n| n.parent);
        while let Some(current) = cursor {
            found.push(current);
            cursor = self.node(current).and_then(|n| n.parent);
        }
        found
    }

    /// Root first, `id` last.
    pub fn breadcrumb(&self, id: NodeId) -> Vec<NodeId> {
        if !self.contains(id) {
            return Vec::new();
        }
        let mut path = self.ancestors(id);
        path.reverse();
        path.push(id);
        path
    }

    /// All nodes below `id` in document order.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut found = Vec::new();
        for child in self.children_of(id) {
            found.push(child);
            found.extend(self.descendants(child));
        }
        found
    }

    /// Move the children of `branch` to the front of its parent's children (keeping their order)
    /// and remove `branch`.
    pub fn hoist_children(&mut self, branch: NodeId) -> Result<Vec<NodeId>, NavigationError> {
        let parent = self
            .live(branch)?
            .parent
            .ok_or_else(|| NavigationError::Custom("Cannot hoist the children of the root".into()))?;
        let parent_key = self.live(parent)?.key.clone();
        let moved = self.children_of(branch);
        if let Some(b) = self.node_mut(branch) {
            b.children = Default::default();
        }
        let mut diagnostics = Vec::new();
        for child in moved.iter().copied() {
            let Some(node) = self.node_mut(child) else {
                continue;
            };
            node.parent = Some(parent);
            let (key, node_type) = (node.key.clone(), node.node_type);
            if let Some(p) = self.node_mut(parent) {
                diagnostics.extend(p.children.add(child, key, node_type, None, Some(&parent_key)));
            }
        }
        self.diagnostics.extend(diagnostics);
        if let Some(p) = self.node_mut(parent) {
            p.children.move_to_front(&moved);
        }
        self.remove(branch);
        Ok(moved)
    }

    /// Copy the children of `source_node` in `source` under `target`, recursively. Used to attach
    /// the result of a narrow expansion pass to the branch it was requested for.
    pub fn splice_branch(
        &mut self,
        target: NodeId,
        source: &NavigationTree,
        source_node: NodeId,
    ) -> Result<Vec<NodeId>, NavigationError> {
        self.live(target)?;
        let mut grafted = Vec::new();
        for child in source.live(source_node)?.children.iter() {
            grafted.push(self.graft(target, source, child)?);
        }
        if let Some(t) = self.node_mut(target) {
            t.set(NodeFlag::RequiresAsyncLoad, false);
        }
        if let Some(active) = source
            .find_active_node_from(source_node)
            .filter(|active| *active != source_node)
        {
            let active_ref = source.live(active)?.node_ref();
            if let Some(local) = self.find_in(target, active_ref.key, Some(active_ref.node_type)) {
                self.make_active(local);
            }
        }
        Ok(grafted)
    }

    fn graft(
        &mut self,
        parent: NodeId,
        source: &NavigationTree,
        source_id: NodeId,
    ) -> Result<NodeId, NavigationError> {
        let original = source.live(source_id)?;
        let id = next_id(self.nodes.len())?;
        let mut copy = original.clone();
        copy.id = id;
        copy.parent = Some(parent);
        copy.children = Default::default();
        copy.set(NodeFlag::Active, false);
        copy.remove_class(CLASS_ACTIVE_TREE_NODE);
        let (key, node_type) = (copy.key.clone(), copy.node_type);
        self.nodes.push(Some(copy));

        let parent_key = self.live(parent)?.key.clone();
        let diagnostics = match self.node_mut(parent) {
            Some(p) => {
                p.kind = NodeKind::Branch;
                p.children.add(id, key, node_type, None, Some(&parent_key))
            }
            None => Vec::new(),
        };
        self.diagnostics.extend(diagnostics);

        for child in original.children.iter() {
            self.graft(id, source, child)?;
        }
        Ok(id)
    }

    pub fn snapshot(&self, id: NodeId) -> Option<NodeSnapshot> {
        let node = self.node(id)?;
        Some(NodeSnapshot {
            key: node.key.clone(),
            node_type: node.node_type,
            kind: node.kind,
            text: node.text.clone(),
            short_text: node.short_text.clone(),
            title: node.title().to_string(),
            action: node.action.as_ref().map(Locator::to_string),
            icon: node.icon.clone(),
            css_type: node.css_type().to_string(),
            flags: node.flags,
            classes: node.classes().to_vec(),
            dom_id: node.dom_id.clone(),
            label: node.children.label().map(str::to_string),
            children: node
                .children
                .iter()
                .filter_map(|child| self.snapshot(child))
                .collect(),
        })
    }

    /// Indented text outline of the displayed tree. Active nodes are starred, hidden ones marked.
    pub fn outline(&self) -> Result<String, NavigationError> {
        let mut out = String::new();
        self.write_outline(&mut out, self.root, 0)?;
        Ok(out)
    }

    fn write_outline(
        &self,
        out: &mut String,
        id: NodeId,
        depth: usize,
    ) -> Result<(), NavigationError> {
        let Some(node) = self.node(id) else {
            return Ok(());
        };
        if !node.is_displayed() {
            return Ok(());
        }
        let marker = if node.is_active() { "*" } else { "-" };
        write!(
            out,
            "{:indent$}{marker} {} [{}:{}]",
            "",
            node.text,
            node.node_type,
            node.key,
            indent = depth * 2
        )?;
        if let Some(action) = &node.action {
            write!(out, " -> {action}")?;
        }
        if node.is_hidden() {
            write!(out, " (hidden)")?;
        }
        if node.children.is_empty() && node.has_children() {
            write!(out, " (+)")?;
        }
        writeln!(out)?;
        for child in node.children.iter() {
            self.write_outline(out, child, depth + 1)?;
        }
        Ok(())
    }

    /// Check the structural invariants of the tree. Returns one message per violation.
    pub fn built_in_test(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let mut active = Vec::new();
        for node in self.nodes.iter().flatten() {
            if !node.children.is_consistent() {
                errors.push(format!(
                    "[NavigationTree::built_in_test] children of {} ({}:{}) are inconsistent between \
                    sequence and index",
                    node.id, node.node_type, node.key
                ));
            }
            for slot in node.children.slots() {
                match self.node(slot.id) {
                    None => errors.push(format!(
                        "[NavigationTree::built_in_test] {} lists freed child {}",
                        node.id, slot.id
                    )),
                    Some(child) => {
                        if child.parent != Some(node.id) {
                            errors.push(format!(
                                "[NavigationTree::built_in_test] {} is listed under {} but its \
                                parent is {:?}",
                                child.id, node.id, child.parent
                            ));
                        }
                        if child.key != slot.key || child.node_type != slot.node_type {
                            errors.push(format!(
                                "[NavigationTree::built_in_test] slot {}:{} holds node {}:{}",
                                slot.node_type, slot.key, child.node_type, child.key
                            ));
                        }
                    }
                }
            }
            match node.parent {
                None if node.id != self.root => errors.push(format!(
                    "[NavigationTree::built_in_test] {} is detached but still allocated",
                    node.id
                )),
                Some(parent) if !self.node(parent).is_some_and(|p| p.children.contains(node.id)) => {
                    errors.push(format!(
                        "[NavigationTree::built_in_test] {} is not listed by its parent {parent}",
                        node.id
                    ))
                }
                _ => {}
            }
            if node.is_active() {
                active.push(node.id);
            }
        }
        if active.len() > 1 {
            errors.push(format!(
                "[NavigationTree::built_in_test] more than one active node: {active:?}"
            ));
        }
        for id in active {
            for ancestor in self.ancestors(id) {
                if let Some(a) = self.node(ancestor) {
                    if !a.is_force_open() {
                        errors.push(format!(
                            "[NavigationTree::built_in_test] ancestor {ancestor} of active {id} \
                            is not forced open"
                        ));
                    }
                    if a.is_active() {
                        errors.push(format!(
                            "[NavigationTree::built_in_test] ancestor {ancestor} of active {id} \
                            is active too"
                        ));
                    }
                }
            }
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::helpers::{init_logging, three_level_tree};

    #[test]
    fn add_child_defaults_key_and_promotes_parent() {
        init_logging();
        let mut tree = NavigationTree::new(NewNode::new("Home"));
        let a = tree.add_child(tree.root(), NewNode::new("a")).unwrap();
        let b = tree.add_child(a, NewNode::new("b")).unwrap();
        let c = tree.add_child(a, NewNode::new("c")).unwrap();
        assert_eq!(tree.node(a).unwrap().kind, NodeKind::Branch);
        assert_eq!(tree.node(b).unwrap().key, 0i64);
        assert_eq!(tree.node(c).unwrap().key, 1i64);
        assert_eq!(tree.node(c).unwrap().kind, NodeKind::Leaf);
        assert!(tree.built_in_test().is_empty());
    }

    #[test]
    fn courses_are_branches_only_when_authenticated() {
        let course = || NewNode::new("c").node_type(NodeType::Course).key(5i64);
        let mut anon = NavigationTree::new(NewNode::new("Home"));
        let id = anon.add_child(anon.root(), course()).unwrap();
        assert_eq!(anon.node(id).unwrap().kind, NodeKind::Leaf);

        let mut user = NavigationTree::new(NewNode::new("Home")).with_authenticated(true);
        let id = user.add_child(user.root(), course()).unwrap();
        assert_eq!(user.node(id).unwrap().kind, NodeKind::Branch);

        let cat = user
            .add_child(user.root(), NewNode::new("cat").node_type(NodeType::Category))
            .unwrap();
        assert_eq!(user.node(cat).unwrap().kind, NodeKind::Branch);
    }

    #[test]
    fn hidden_is_inherited() {
        let mut tree = NavigationTree::new(NewNode::new("Home"));
        let parent = tree.add_child(tree.root(), NewNode::new("p")).unwrap();
        tree.node_mut(parent).unwrap().set(NodeFlag::Hidden, true);
        let child = tree.add_child(parent, NewNode::new("c")).unwrap();
        assert!(tree.node(child).unwrap().is_hidden());
    }

    #[test]
    fn auto_find_active_on_add() {
        let mut tree = NavigationTree::new(NewNode::new("Home"))
            .with_active_url(Some(Locator::parse("/course/view.php?id=5").unwrap()));
        let course = tree
            .add_child(
                tree.root(),
                NewNode::new("c")
                    .node_type(NodeType::Course)
                    .action(Locator::new("/course/view.php").with_param("id", 5)),
            )
            .unwrap();
        assert_eq!(tree.find_active_node(), Some(course));
        assert!(tree.node(tree.root()).unwrap().is_force_open());

        let mut quiet = NavigationTree::new(NewNode::new("Home"))
            .with_active_url(Some(Locator::parse("/").unwrap()))
            .with_auto_find_active(false);
        quiet
            .add_child(quiet.root(), NewNode::new("home").action(Locator::new("/")))
            .unwrap();
        assert_eq!(quiet.find_active_node(), None);
    }

    #[test]
    fn make_active_keeps_a_single_active_path() {
        let (mut tree, ids) = three_level_tree();
        tree.make_active(ids.course_a);
        tree.make_active(ids.section);
        assert_eq!(tree.find_active_node(), Some(ids.section));
        assert!(!tree.node(ids.course_a).unwrap().is_active());
        assert!(tree.node(ids.course_a).unwrap().is_force_open());
        assert!(tree.node(ids.category).unwrap().is_force_open());

        // Activating a node in a different subtree deactivates the previous one.
        tree.make_active(ids.course_b);
        assert_eq!(tree.find_active_node(), Some(ids.course_b));
        assert!(!tree.node(ids.section).unwrap().is_active());
        assert!(!tree
            .node(ids.section)
            .unwrap()
            .has_class(CLASS_ACTIVE_TREE_NODE));
        assert!(tree.built_in_test().is_empty());
    }

    #[test]
    fn force_open_is_idempotent() {
        let (mut tree, ids) = three_level_tree();
        tree.force_open(ids.section);
        let once: Vec<NodeFlags> = tree
            .breadcrumb(ids.section)
            .iter()
            .map(|id| tree.node(*id).unwrap().flags)
            .collect();
        tree.force_open(ids.section);
        let twice: Vec<NodeFlags> = tree
            .breadcrumb(ids.section)
            .iter()
            .map(|id| tree.node(*id).unwrap().flags)
            .collect();
        assert_eq!(once, twice);
        assert!(once.iter().all(|f| f.contains(NodeFlag::ForceOpen)));
    }

    #[test]
    fn recursive_find_reaches_two_levels_down() {
        let (tree, ids) = three_level_tree();
        assert_eq!(tree.find(11i64, Some(NodeType::Course)), Some(ids.course_a));
        assert_eq!(tree.get(11i64, Some(NodeType::Course)), None);
        assert_eq!(tree.find(11i64, Some(NodeType::Category)), None);
        assert_eq!(tree.find(1i64, None), Some(ids.category));
    }

    #[test]
    fn hide_filters_per_level_and_always_recurses() {
        let (mut tree, ids) = three_level_tree();
        tree.hide(tree.root(), Some(&[NodeType::Course]));
        assert!(!tree.node(ids.course_a).unwrap().is_displayed());
        assert!(!tree.node(ids.course_b).unwrap().is_displayed());
        assert!(tree.node(ids.category).unwrap().is_displayed());
        assert!(tree.node(ids.section).unwrap().is_displayed());

        tree.hide(ids.category, None);
        assert!(!tree.node(ids.section).unwrap().is_displayed());
    }

    #[test]
    fn short_branch_boundary() {
        let mut tree = NavigationTree::new(NewNode::new("Home"));
        let seven = tree.add_child(tree.root(), NewNode::new("seven")).unwrap();
        let eight = tree.add_child(tree.root(), NewNode::new("eight")).unwrap();
        for n in 0..7 {
            tree.add_child(seven, NewNode::new(format!("leaf {n}"))).unwrap();
            tree.add_child(eight, NewNode::new(format!("leaf {n}"))).unwrap();
        }
        tree.add_child(eight, NewNode::new("leaf 7")).unwrap();
        assert!(tree.is_short_branch(seven));
        assert!(!tree.is_short_branch(eight));

        let first = tree.children_of(seven)[0];
        tree.add_child(first, NewNode::new("grandchild")).unwrap();
        assert!(!tree.is_short_branch(seven));
    }

    #[test]
    fn find_expandable_marks_unloaded_branches() {
        let mut tree = NavigationTree::new(NewNode::new("Home")).with_authenticated(true);
        let courses = tree
            .add_child(tree.root(), NewNode::new("Courses").key("courses"))
            .unwrap();
        let course = tree
            .add_child(courses, NewNode::new("c").node_type(NodeType::Course).key(7i64))
            .unwrap();
        let hidden = tree
            .add_child(courses, NewNode::new("h").node_type(NodeType::Course).key(8i64))
            .unwrap();
        tree.hide(hidden, None);

        let found = tree.find_expandable();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "expandable_branch_20_7");
        assert_eq!(found[0].node, course);
        assert!(tree.node(course).unwrap().is(NodeFlag::RequiresAsyncLoad));
        assert!(tree.node(courses).unwrap().has_class(CLASS_CAN_EXPAND));
        assert_eq!(
            tree.node(course).unwrap().dom_id.as_deref(),
            Some("expandable_branch_20_7")
        );
    }

    #[test]
    fn find_all_of_type_orders_level_before_descendants() {
        let (tree, ids) = three_level_tree();
        assert_eq!(
            tree.find_all_of_type(NodeType::Course),
            vec![ids.course_a, ids.course_b]
        );
        assert_eq!(tree.find_all_of_type(NodeType::Section), vec![ids.section]);
        assert!(tree.find_all_of_type(NodeType::User).is_empty());
    }

    #[test]
    fn remove_frees_the_subtree() {
        let (mut tree, ids) = three_level_tree();
        let before = tree.len();
        assert!(tree.remove(ids.course_a));
        assert!(!tree.contains(ids.course_a));
        assert!(!tree.contains(ids.section));
        assert_eq!(tree.len(), before - 2);
        assert!(!tree.remove(tree.root()));
        assert!(tree.built_in_test().is_empty());

        assert!(tree.trim_if_empty(ids.course_b));
        assert!(!tree.trim_if_empty(tree.root()));
    }

    #[test]
    fn siblings() {
        let (tree, ids) = three_level_tree();
        assert_eq!(
            tree.get_siblings(ids.course_a),
            Some(vec![ids.course_a, ids.course_b])
        );
        assert_eq!(tree.get_siblings(ids.section), None);
        assert!(!tree.has_siblings(tree.root()));
    }

    #[test]
    fn hoist_children_moves_to_front() {
        let mut tree = NavigationTree::new(NewNode::new("Home"));
        let site = tree.add_child(tree.root(), NewNode::new("Site").key("site")).unwrap();
        let other = tree.add_child(tree.root(), NewNode::new("Courses").key("courses")).unwrap();
        let a = tree.add_child(site, NewNode::new("a").key("a")).unwrap();
        let b = tree.add_child(site, NewNode::new("b").key("b")).unwrap();
        let moved = tree.hoist_children(site).unwrap();
        assert_eq!(moved, vec![a, b]);
        assert_eq!(tree.children_of(tree.root()), vec![a, b, other]);
        assert!(!tree.contains(site));
        assert_eq!(tree.node(a).unwrap().parent(), Some(tree.root()));
        assert!(tree.built_in_test().is_empty());
    }

    #[test]
    fn splice_branch_grafts_children() {
        let (mut tree, ids) = three_level_tree();
        let mut narrow = NavigationTree::new(NewNode::new("Course").node_type(NodeType::Course));
        let section = narrow
            .add_child(narrow.root(), NewNode::new("Week 1").node_type(NodeType::Section).key(1i64))
            .unwrap();
        narrow
            .add_child(section, NewNode::new("Quiz").node_type(NodeType::Activity).key(42i64))
            .unwrap();

        let grafted = tree.splice_branch(ids.course_b, &narrow, narrow.root()).unwrap();
        assert_eq!(grafted.len(), 1);
        let quiz = tree
            .find_in(ids.course_b, 42i64, Some(NodeType::Activity))
            .unwrap();
        assert_eq!(tree.breadcrumb(quiz).len(), 5);
        assert!(tree.built_in_test().is_empty());
    }

    #[test]
    fn snapshot_and_outline() {
        let (mut tree, ids) = three_level_tree();
        tree.make_active(ids.section);
        let snap = tree.snapshot(tree.root()).unwrap();
        assert_eq!(snap.children.len(), 1);
        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["children"][0]["css_type"], "type_category");

        let outline = tree.outline().unwrap();
        assert!(outline.contains("* Week 1 [Section:1]"));
    }

    #[test]
    fn node_ids_stop_at_the_u32_range() {
        assert_eq!(next_id(7).unwrap(), NodeId(7));
        let overflow = u32::MAX as usize + 1;
        assert!(matches!(
            next_id(overflow),
            Err(NavigationError::Capacity(_))
        ));
    }

    #[test]
    fn leaf_snapshots_parse_back() {
        let (tree, ids) = three_level_tree();
        let leaf = tree.snapshot(ids.section).unwrap();
        assert!(leaf.children.is_empty());
        let json = serde_json::to_string(&leaf).unwrap();
        assert!(!json.contains("\"children\""));
        let back: NodeSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, leaf);
    }

    #[test]
    fn search_for_active_node_loosens() {
        let (mut tree, ids) = three_level_tree();
        tree.override_active_url(Locator::parse("/course/view.php?id=12&section=3").unwrap());
        assert_eq!(tree.search_for_active_node(MatchStrength::Exact), None);
        assert_eq!(
            tree.search_for_active_node(MatchStrength::Params),
            Some(ids.course_b)
        );
    }
}
