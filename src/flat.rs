//! The flat navigation: a one-level list derived from a built [NavigationTree].
//!
//! Inside a real course the list opens with a `coursehome` entry and the linked children of the
//! course node. Then every node flagged [NodeFlag::ShowInFlatNavigation] follows in document
//! order, whether or not it is displayed in the tree.
use serde::{Deserialize, Serialize};

use crate::{
    builder::Services,
    config::NavigationConfig,
    error::NavigationError,
    format::FormatContext,
    locator::{Locator, Resource},
    node::Node,
    nodekey::{CourseId, NodeId, NodeKey},
    properties::{NodeFlag, NodeType},
    tree::NavigationTree,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatNode {
    /// The tree node this entry was made from. `None` for synthesized entries.
    pub node: Option<NodeId>,
    pub key: NodeKey,
    pub node_type: NodeType,
    pub text: String,
    pub action: Option<Locator>,
    pub icon: Option<String>,
    pub indent: u8,
    pub show_divider: bool,
    /// Heading of the group this entry opens.
    pub label: Option<String>,
    pub active: bool,
}

impl FlatNode {
    fn from_node(tree: &NavigationTree, node: &Node, indent: u8) -> Self {
        FlatNode {
            node: Some(node.id()),
            key: node.key.clone(),
            node_type: node.node_type,
            text: node.text.clone(),
            action: node.action.clone(),
            icon: node.icon.clone(),
            indent,
            show_divider: false,
            label: None,
            active: is_flat_active(tree, node),
        }
    }
}

/// Sections count as active while one of their activities is.
fn is_flat_active(tree: &NavigationTree, node: &Node) -> bool {
    if node.node_type == NodeType::Section {
        if let Some(active) = tree.find_active_node() {
            if tree.ancestors(active).contains(&node.id()) {
                return true;
            }
        }
    }
    node.is_active()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlatNavigation {
    nodes: Vec<FlatNode>,
    label: Option<String>,
}

impl FlatNavigation {
    /// Flatten `tree`. `course` is the course of the page being viewed, if any.
    pub fn build(
        tree: &NavigationTree,
        services: &Services,
        config: &NavigationConfig,
        course: Option<CourseId>,
    ) -> Result<Self, NavigationError> {
        let mut flat = FlatNavigation::default();
        let site = services.repository.site_course()?;
        let site_label = services.formatter.string("site");

        let Some(course_id) = course.filter(|id| *id != site.id) else {
            flat.add_tree(tree, tree.root(), false, Some(site_label));
            return Ok(flat);
        };

        let course = services.repository.get_course(course_id)?;
        let raw_name = if config.show_full_course_names {
            &course.full_name
        } else {
            &course.short_name
        };
        let course_name = services
            .formatter
            .format_display_name(raw_name, FormatContext::Course(course.id));

        let course_node = tree.find_active_node().and_then(|active| {
            tree.breadcrumb(active)
                .into_iter()
                .rev()
                .find(|id| tree.node(*id).is_some_and(|n| n.node_type == NodeType::Course))
        });
        match course_node.and_then(|id| tree.node(id)) {
            Some(node) if node.key != site.id => {
                flat.add(FlatNode {
                    node: Some(node.id()),
                    key: NodeKey::from("coursehome"),
                    node_type: NodeType::Course,
                    text: course_name.clone(),
                    action: Some(
                        services
                            .locators
                            .locate(&Resource::Course(course.id), &[]),
                    ),
                    icon: Some("i/course".to_string()),
                    indent: 0,
                    show_divider: false,
                    label: Some(course_name),
                    active: node.is_active(),
                });
                for child in node.children().iter().filter_map(|id| tree.node(id)) {
                    if child.has_action() {
                        flat.add(FlatNode::from_node(tree, child, 0));
                    }
                }
            }
            _ => {
                tracing::debug!(
                    "[FlatNavigation::build] no course node above the active node for course \
                    {course_id}"
                );
            }
        }

        flat.add_tree(tree, tree.root(), true, Some(site_label));
        Ok(flat)
    }

    fn add(&mut self, node: FlatNode) {
        if self.label.is_none() {
            self.label = node.label.clone();
        }
        self.nodes.push(node);
    }

    /// Depth-first walk. Only the entry for `id` itself carries the divider and label.
    fn add_tree(&mut self, tree: &NavigationTree, id: NodeId, show_divider: bool, label: Option<String>) {
        let Some(node) = tree.node(id) else {
            return;
        };
        if node.is(NodeFlag::ShowInFlatNavigation) {
            let indent = if node.node_type == NodeType::Course || node.key == "courseindexpage" {
                1
            } else {
                0
            };
            let mut entry = FlatNode::from_node(tree, node, indent);
            entry.show_divider = show_divider;
            entry.label = label;
            self.add(entry);
        }
        for child in node.children().iter() {
            self.add_tree(tree, child, false, None);
        }
    }

    pub fn nodes(&self) -> &[FlatNode] {
        &self.nodes
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, key: impl Into<NodeKey>) -> Option<&FlatNode> {
        let key = key.into();
        self.nodes.iter().find(|n| n.key == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        context::{Location, NavigationContext, Viewer},
        tests::helpers::{build, init_logging, sample_services},
    };

    #[test]
    fn course_pages_lead_with_the_course() {
        init_logging();
        let services = sample_services();
        let config = NavigationConfig::default();
        let tree = build(
            &services,
            config.clone(),
            NavigationContext::new(Viewer::User(2), Location::activity(5, 42)),
        )
        .unwrap();
        let flat = FlatNavigation::build(&tree, &services, &config, Some(5)).unwrap();

        assert_eq!(flat.label(), Some("PHY101"));
        let keys: Vec<String> = flat.nodes().iter().map(|n| n.key.to_string()).collect();
        assert_eq!(
            keys,
            vec![
                "coursehome",
                "participants",
                "grades",
                "50",
                "51",
                "52",
                "home",
                "myhome",
                "privatefiles",
                "mycourses",
                "5",
                "6"
            ]
        );

        let week = flat.get(51i64).unwrap();
        assert!(week.active);
        assert!(!flat.get(50i64).unwrap().active);

        let home = flat.get("home").unwrap();
        assert!(home.show_divider);
        assert_eq!(home.label.as_deref(), Some("Site"));
        assert_eq!(flat.get(5i64).map(|n| n.indent), Some(1));
        assert_eq!(flat.get("grades").map(|n| n.indent), Some(0));
    }

    #[test]
    fn site_pages_only_list_flagged_nodes() {
        init_logging();
        let services = sample_services();
        let config = NavigationConfig::default();
        let tree = build(
            &services,
            config.clone(),
            NavigationContext::new(Viewer::User(2), Location::system()),
        )
        .unwrap();
        let flat = FlatNavigation::build(&tree, &services, &config, None).unwrap();
        assert_eq!(flat.label(), Some("Site"));
        assert!(!flat.nodes()[0].show_divider);
        assert!(flat.get("coursehome").is_none());
        assert_eq!(flat.len(), 6);
    }
}
