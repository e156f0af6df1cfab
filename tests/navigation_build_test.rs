//! End-to-end builds over a TOML dataset.

mod common;

use navtree_core::{
    cache::ExpansionCache,
    config::{ConfigProvider, NavigationConfig, TomlConfigProvider},
    context::{Location, NavigationContext, Viewer},
    properties::{NodeKind, NodeType},
    tree::NodeSnapshot,
    NavigationError, TreeBuilder, TreeDiagnostic,
};
use tempfile::TempDir;
use test_log::test;

use common::{dataset, services_for, write_file, CYCLIC_SITE, SITE};

#[test]
fn activity_page_breadcrumb_and_snapshot() {
    let services = services_for(dataset(SITE));
    let tree = TreeBuilder::new(
        services,
        NavigationConfig::default(),
        NavigationContext::new(Viewer::User(2), Location::activity(5, 42)),
        ExpansionCache::default(),
    )
    .build()
    .unwrap();

    let violations = tree.built_in_test();
    assert!(violations.is_empty(), "{violations:?}");

    let active = tree.find_active_node().expect("the quiz is active");
    let trail: Vec<String> = tree
        .breadcrumb(active)
        .into_iter()
        .filter_map(|id| tree.node(id))
        .map(|n| n.key.to_string())
        .collect();
    assert_eq!(trail, vec!["home", "mycourses", "5", "51", "42"]);

    let snapshot = tree.snapshot(tree.root()).unwrap();
    let json = serde_json::to_string(&snapshot).unwrap();
    let back: NodeSnapshot = serde_json::from_str(&json).unwrap();
    assert_eq!(back, snapshot);

    let outline = tree.outline().unwrap();
    assert!(outline.contains("* Midterm [Activity:42]"), "{outline}");
}

#[test]
fn anonymous_visitors_get_the_front_page_at_the_top() {
    let services = services_for(dataset(SITE));
    let mut tree = TreeBuilder::new(
        services,
        NavigationConfig::default(),
        NavigationContext::new(Viewer::Anonymous, Location::system()),
        ExpansionCache::default(),
    )
    .build()
    .unwrap();

    let root = tree.node(tree.root()).unwrap();
    let first = tree.node(root.children().iter().next().unwrap()).unwrap();
    assert_eq!(first.key, "frontpageloaded");
    assert!(tree.get(1i64, Some(NodeType::Course)).is_none());
    assert!(tree.get(900i64, Some(NodeType::Activity)).is_some());
    assert!(tree.get("myprofile", None).is_none());

    let courses = tree.get("courses", Some(NodeType::Root)).unwrap();
    assert!(tree.node(courses).unwrap().is_expandable());
    let expandable = tree.find_expandable();
    assert!(expandable.iter().any(|b| b.node == courses));
    assert!(tree.built_in_test().is_empty());
}

#[test]
fn broken_category_hierarchy_is_reported_once() {
    let services = services_for(dataset(CYCLIC_SITE));
    let config = NavigationConfig {
        show_my_course_categories: true,
        ..Default::default()
    };
    let tree = TreeBuilder::new(
        services,
        config,
        NavigationContext::new(Viewer::User(2), Location::category(3)),
        ExpansionCache::default(),
    )
    .build()
    .unwrap();

    let reported: Vec<&TreeDiagnostic> = tree
        .diagnostics()
        .iter()
        .filter(|d| d.is_configuration())
        .collect();
    assert_eq!(reported.len(), 1, "{:?}", tree.diagnostics());

    // The course is still listed, directly below "My courses".
    let my_courses = tree.get("mycourses", Some(NodeType::Root)).unwrap();
    assert!(tree.get_in(my_courses, 20i64, Some(NodeType::Course)).is_some());

    // A course filed under the broken category is left out of the catalogue.
    let tree = TreeBuilder::new(
        services_for(dataset(CYCLIC_SITE)),
        NavigationConfig::default(),
        NavigationContext::new(Viewer::User(2), Location::course(21)),
        ExpansionCache::default(),
    )
    .build()
    .unwrap();
    let reported = tree
        .diagnostics()
        .iter()
        .filter(|d| d.is_configuration())
        .count();
    assert_eq!(reported, 1, "{:?}", tree.diagnostics());
    assert!(tree.find(21i64, Some(NodeType::Course)).is_none());
    assert!(!tree.can_view_course_profile());
    assert!(tree.built_in_test().is_empty());
}

#[test]
fn config_file_drives_the_expansion_limit() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_file(
        &temp_dir,
        "navtree.toml",
        r#"
[navigation]
expansion_limit = "course"
show_full_course_names = true
"#,
    );
    let config = TomlConfigProvider::new(path).get_config().unwrap();
    assert_eq!(config.expansion_limit, Some(NodeType::Course));

    let services = services_for(dataset(SITE));
    let tree = TreeBuilder::new(
        services,
        config,
        NavigationContext::new(Viewer::User(2), Location::course(5)),
        ExpansionCache::default(),
    )
    .build()
    .unwrap();
    let course = tree.find(5i64, Some(NodeType::Course)).unwrap();
    let node = tree.node(course).unwrap();
    assert_eq!(node.text, "Introduction to Physics");
    assert_eq!(node.short_text.as_deref(), Some("PHY101"));
    for child in tree.children_of(course) {
        let child = tree.node(child).unwrap();
        let hideable = NodeType::hideable_structure().contains(&child.node_type);
        assert_eq!(child.is_displayed(), !hideable, "{}", child.key);
    }
}

#[test]
fn config_round_trips_through_the_provider() {
    let temp_dir = TempDir::new().unwrap();
    let provider = TomlConfigProvider::new(temp_dir.path().join("navtree.toml"));
    assert_eq!(provider.get_config().unwrap(), NavigationConfig::default());

    let config = NavigationConfig {
        course_limit: 3,
        show_empty_sections: false,
        ..Default::default()
    };
    provider.set_config(&config).unwrap();
    assert_eq!(provider.get_config().unwrap(), config);

    let invalid = NavigationConfig {
        course_limit: 0,
        ..Default::default()
    };
    assert!(matches!(
        provider.set_config(&invalid),
        Err(NavigationError::Configuration(_))
    ));
}

#[test]
fn empty_sections_can_be_skipped() {
    // Section 50 of PHY101 holds no activities.
    let services = services_for(dataset(SITE));
    let config = NavigationConfig {
        show_empty_sections: false,
        ..Default::default()
    };
    let tree = TreeBuilder::new(
        services,
        config,
        NavigationContext::new(Viewer::User(2), Location::course(5)),
        ExpansionCache::default(),
    )
    .build()
    .unwrap();
    let course = tree.find(5i64, Some(NodeType::Course)).unwrap();
    assert!(tree.get_in(course, 50i64, Some(NodeType::Section)).is_none());
    let week = tree.get_in(course, 51i64, Some(NodeType::Section)).unwrap();
    assert_eq!(tree.node(week).unwrap().kind, NodeKind::Branch);
}
