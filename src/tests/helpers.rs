//! Shared test utilities for navigation tree and builder tests

use std::sync::Arc;

use crate::{
    access::StaticAccessPolicy,
    builder::{Services, TreeBuilder},
    cache::ExpansionCache,
    config::NavigationConfig,
    context::NavigationContext,
    error::NavigationError,
    locator::Locator,
    node::NewNode,
    nodekey::NodeId,
    properties::NodeType,
    repository::{Dataset, MemoryRepository},
    tree::NavigationTree,
};

/// Initialize logging for tests
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .ok();
}

pub struct TreeIds {
    pub category: NodeId,
    pub course_a: NodeId,
    pub course_b: NodeId,
    pub section: NodeId,
}

/// Home > Science (1) > { Course A (11) > Week 1 (1), Course B (12) }
pub fn three_level_tree() -> (NavigationTree, TreeIds) {
    init_logging();
    let mut tree = NavigationTree::new(
        NewNode::new("Home")
            .node_type(NodeType::System)
            .key("home")
            .action(Locator::new("/")),
    );
    let category = tree
        .add_child(
            tree.root(),
            NewNode::new("Science")
                .node_type(NodeType::Category)
                .key(1i64)
                .action(Locator::new("/course/index.php").with_param("categoryid", 1)),
        )
        .unwrap();
    let course_a = tree
        .add_child(
            category,
            NewNode::new("Course A")
                .node_type(NodeType::Course)
                .key(11i64)
                .action(Locator::new("/course/view.php").with_param("id", 11)),
        )
        .unwrap();
    let course_b = tree
        .add_child(
            category,
            NewNode::new("Course B")
                .node_type(NodeType::Course)
                .key(12i64)
                .action(Locator::new("/course/view.php").with_param("id", 12)),
        )
        .unwrap();
    let section = tree
        .add_child(
            course_a,
            NewNode::new("Week 1")
                .node_type(NodeType::Section)
                .key(1i64)
                .action(
                    Locator::new("/course/view.php")
                        .with_param("id", 11)
                        .with_anchor("section-1"),
                ),
        )
        .unwrap();
    (
        tree,
        TreeIds {
            category,
            course_a,
            course_b,
            section,
        },
    )
}

/// A small site: three categories, four courses (one hidden), a front page forum, and a physics
/// course with three sections.
pub const SAMPLE_SITE: &str = r#"
[site]
id = 1
short_name = "lms"
full_name = "Example LMS"

[[categories]]
id = 1
name = "Science"
sort_order = 1

[[categories]]
id = 2
parent = 1
name = "Physics"

[[categories]]
id = 3
name = "Arts"
sort_order = 2

[[courses]]
id = 5
category = 2
short_name = "PHY101"
full_name = "Introduction to Physics"
sort_order = 1

[[courses]]
id = 6
category = 1
short_name = "CHEM101"
full_name = "Chemistry"
sort_order = 2

[[courses]]
id = 7
category = 3
short_name = "ART101"
full_name = "Drawing"
sort_order = 3

[[courses]]
id = 8
category = 3
short_name = "ART900"
full_name = "Unreleased"
visible = false
sort_order = 4

[[sections]]
id = 100
course = 1
number = 0

[[sections]]
id = 50
course = 5
number = 0

[[sections]]
id = 51
course = 5
number = 1
name = "Week 1"

[[sections]]
id = 52
course = 5
number = 2

[[activities]]
id = 900
course = 1
section = 100
section_number = 0
module = "forum"
name = "Site news"

[[activities]]
id = 44
course = 5
section = 50
section_number = 0
module = "forum"
name = "Announcements"

[[activities]]
id = 42
course = 5
section = 51
section_number = 1
module = "quiz"
name = "Midterm"

[[activities]]
id = 43
course = 5
section = 51
section_number = 1
module = "label"
name = "Read this first"
has_view_page = false

[[users]]
id = 2
full_name = "Alice Student"

[[users]]
id = 3
full_name = "Bob Teacher"

[[users]]
id = 9
full_name = "Pat Parent"

[[enrolments]]
user = 2
course = 5

[[enrolments]]
user = 2
course = 6

[[enrolments]]
user = 3
course = 5
"#;

pub fn sample_repository() -> MemoryRepository {
    MemoryRepository::from_toml(SAMPLE_SITE).unwrap()
}

/// Services over [SAMPLE_SITE] with enrolment-based access.
pub fn sample_services() -> Services {
    let repository = sample_repository();
    let dataset: Dataset = toml::from_str(SAMPLE_SITE).unwrap();
    let access = StaticAccessPolicy::from_enrolments(&dataset.enrolments);
    Services::new(Arc::new(repository), Arc::new(access))
}

pub fn build(
    services: &Services,
    config: NavigationConfig,
    context: NavigationContext,
) -> Result<NavigationTree, NavigationError> {
    TreeBuilder::new(services.clone(), config, context, ExpansionCache::default()).build()
}
