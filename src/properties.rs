/// [crate::properties] contains the basic building blocks describing a navigation node: its
/// [NodeType], its structural [NodeKind], and the boolean state carried in [NodeFlags].
pub use enumset::EnumSet;
use enumset::*;
use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};

use crate::error::NavigationError;

/// Class added to the node that is currently active.
pub const CLASS_ACTIVE_TREE_NODE: &str = "active_tree_node";
/// Class added to a parent that owns at least one branch awaiting an asynchronous load.
pub const CLASS_CAN_EXPAND: &str = "canexpand";
/// Branches with this many children (or more) are never rendered as a short, flat branch.
pub const SHORT_BRANCH_LIMIT: usize = 8;

/// What a navigation node represents. The numeric codes are stable and used when generating DOM
/// ids for expandable branches.
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Root,
    System,
    Category,
    MyCategory,
    Course,
    Section,
    Activity,
    Resource,
    #[default]
    Custom,
    Setting,
    SiteAdmin,
    User,
    Container,
}

impl NodeType {
    pub fn all() -> &'static [NodeType] {
        &[
            NodeType::Root,
            NodeType::System,
            NodeType::Category,
            NodeType::MyCategory,
            NodeType::Course,
            NodeType::Section,
            NodeType::Activity,
            NodeType::Resource,
            NodeType::Custom,
            NodeType::Setting,
            NodeType::SiteAdmin,
            NodeType::User,
            NodeType::Container,
        ]
    }

    pub fn code(&self) -> u8 {
        match self {
            NodeType::Root => 0,
            NodeType::System => 1,
            NodeType::Category => 10,
            NodeType::MyCategory => 11,
            NodeType::Course => 20,
            NodeType::Section => 30,
            NodeType::Activity => 40,
            NodeType::Resource => 50,
            NodeType::Custom => 60,
            NodeType::Setting => 70,
            NodeType::SiteAdmin => 71,
            NodeType::User => 80,
            NodeType::Container => 90,
        }
    }

    /// Types that are pre-marked as branches when attached to a parent, regardless of children.
    /// Courses join this list only for logged-in viewers, see
    /// [crate::tree::NavigationTree::add_node].
    pub fn is_structural_branch(&self) -> bool {
        matches!(
            self,
            NodeType::Category | NodeType::MyCategory | NodeType::SiteAdmin
        )
    }

    /// The node types an expansion limit is allowed to hide. Everything else carries information
    /// that must stay visible.
    pub fn hideable_structure() -> &'static [NodeType] {
        &[
            NodeType::Category,
            NodeType::Course,
            NodeType::Section,
            NodeType::Activity,
        ]
    }

    pub fn css_name(&self) -> &'static str {
        match self {
            NodeType::Root => "type_system",
            NodeType::Category => "type_category",
            NodeType::Course => "type_course",
            NodeType::Section => "type_structure",
            NodeType::Activity => "type_activity",
            NodeType::Resource => "type_resource",
            NodeType::Custom => "type_custom",
            NodeType::Setting => "type_setting",
            NodeType::SiteAdmin => "type_siteadmin",
            NodeType::User => "type_user",
            NodeType::Container => "type_container",
            NodeType::System | NodeType::MyCategory => "type_unknown",
        }
    }
}

impl Display for NodeType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

impl FromStr for NodeType {
    type Err = NavigationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['-', ' '], "_");
        NodeType::all()
            .iter()
            .find(|t| {
                let name = format!("{t:?}");
                let mut snake = String::new();
                for (idx, c) in name.chars().enumerate() {
                    if c.is_uppercase() && idx > 0 {
                        snake.push('_');
                    }
                    snake.push(c.to_ascii_lowercase());
                }
                snake == normalized || t.code().to_string() == normalized
            })
            .copied()
            .ok_or_else(|| NavigationError::Serialization(format!("Unknown node type '{s}'")))
    }
}

/// Leaf nodes have no children; a node turns into a branch as soon as a child is attached, or when
/// it is known to have children that are not materialized yet.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    #[default]
    Leaf,
    Branch,
}

#[derive(EnumSetType, Debug, Serialize, Deserialize)]
#[enumset(serialize_repr = "list")]
pub enum NodeFlag {
    /// The node matches the page currently being viewed.
    Active,
    /// The entity behind the node is hidden from regular users (still rendered, dimmed).
    Hidden,
    /// The node is rendered at all.
    Displayed,
    /// Rendering must keep the node expanded.
    ForceOpen,
    /// Rendering starts the node collapsed.
    Collapsed,
    /// Children exist logically but have not been loaded into the tree.
    Expandable,
    /// The node was handed to the asynchronous loader by `find_expandable`.
    RequiresAsyncLoad,
    ShowInFlatNavigation,
    ShowInSecondaryNavigation,
    ForceIntoMoreMenu,
    /// Only shown in the main navigation, never in breadcrumbs.
    MainNavOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeFlags(pub EnumSet<NodeFlag>);

impl Default for NodeFlags {
    fn default() -> Self {
        NodeFlags(NodeFlag::Displayed | NodeFlag::ShowInSecondaryNavigation)
    }
}

impl NodeFlags {
    pub fn contains(&self, flag: NodeFlag) -> bool {
        self.0.contains(flag)
    }

    pub fn set(&mut self, flag: NodeFlag, on: bool) {
        if on {
            self.0.insert(flag);
        } else {
            self.0.remove(flag);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_type_parses_names_and_codes() {
        assert_eq!("course".parse::<NodeType>().unwrap(), NodeType::Course);
        assert_eq!("my_category".parse::<NodeType>().unwrap(), NodeType::MyCategory);
        assert_eq!("site-admin".parse::<NodeType>().unwrap(), NodeType::SiteAdmin);
        assert_eq!("40".parse::<NodeType>().unwrap(), NodeType::Activity);
        assert!("planet".parse::<NodeType>().is_err());
    }

    #[test]
    fn default_flags_are_displayed_and_secondary() {
        let flags = NodeFlags::default();
        assert!(flags.contains(NodeFlag::Displayed));
        assert!(flags.contains(NodeFlag::ShowInSecondaryNavigation));
        assert!(!flags.contains(NodeFlag::Active));
        assert!(!flags.contains(NodeFlag::Expandable));
    }

    #[test]
    fn structural_branch_types() {
        assert!(NodeType::Category.is_structural_branch());
        assert!(NodeType::SiteAdmin.is_structural_branch());
        assert!(!NodeType::Course.is_structural_branch());
        assert!(!NodeType::Activity.is_structural_branch());
    }
}
