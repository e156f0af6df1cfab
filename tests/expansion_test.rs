//! Narrow expansion passes, splicing, and the shared expansion cache.

mod common;

use navtree_core::{
    access::StaticAccessPolicy,
    cache::{Expandability, ExpansionCache},
    config::NavigationConfig,
    context::{Location, NavigationContext, Viewer},
    properties::NodeType,
    ExpandRequest, NavigationError, NavigationTree, TreeBuilder,
};
use test_log::test;

use common::{dataset, services_for, services_with, SITE};

fn child_keys(tree: &NavigationTree, id: navtree_core::NodeId) -> Vec<String> {
    tree.children_of(id)
        .into_iter()
        .filter_map(|child| tree.node(child))
        .map(|n| n.key.to_string())
        .collect()
}

#[test]
fn courses_branch_is_filled_on_demand() {
    let services = services_for(dataset(SITE));
    let cache = ExpansionCache::default();
    let context = NavigationContext::new(Viewer::Anonymous, Location::system());
    let mut tree = TreeBuilder::new(
        services.clone(),
        NavigationConfig::default(),
        context.clone(),
        cache.clone(),
    )
    .build()
    .unwrap();

    let branch = tree
        .find_expandable()
        .into_iter()
        .find(|b| b.node_type == NodeType::Root && b.key == "courses")
        .expect("courses waits for the loader");
    assert_eq!(branch.id, "expandable_branch_0_courses");
    let request = ExpandRequest::from_branch(&tree, &branch).unwrap();
    assert_eq!(request, ExpandRequest::Courses);

    let expanded = TreeBuilder::new(services, NavigationConfig::default(), context, cache.clone())
        .expand(request)
        .unwrap();
    assert_eq!(child_keys(&expanded, expanded.root()), vec!["1", "3"]);

    tree.splice_branch(branch.node, &expanded, expanded.root())
        .unwrap();
    let science = tree
        .get_in(branch.node, 1i64, Some(NodeType::Category))
        .unwrap();
    let arts = tree
        .get_in(branch.node, 3i64, Some(NodeType::Category))
        .unwrap();
    assert_eq!(child_keys(&tree, science), vec!["6"]);
    assert_eq!(child_keys(&tree, arts), vec!["7"]);

    // Anonymous visitors cannot enter any course.
    let chemistry = tree.get_in(science, 6i64, Some(NodeType::Course)).unwrap();
    assert!(!tree.node(chemistry).unwrap().is_expandable());
    assert_eq!(cache.get(6), Expandability::NotExpandable);
    assert!(tree.built_in_test().is_empty());
}

#[test]
fn sections_are_filled_on_demand() {
    let services = services_for(dataset(SITE));
    let cache = ExpansionCache::default();
    let context = NavigationContext::new(Viewer::User(2), Location::course(5));
    let mut tree = TreeBuilder::new(
        services.clone(),
        NavigationConfig::default(),
        context.clone(),
        cache.clone(),
    )
    .build()
    .unwrap();

    let branch = tree
        .find_expandable()
        .into_iter()
        .find(|b| b.node_type == NodeType::Section && b.key == 51i64)
        .unwrap();
    let request = ExpandRequest::from_branch(&tree, &branch).unwrap();
    assert_eq!(
        request,
        ExpandRequest::Section {
            course: 5,
            section: 51
        }
    );

    let expanded = TreeBuilder::new(services, NavigationConfig::default(), context, cache)
        .expand(request)
        .unwrap();
    tree.splice_branch(branch.node, &expanded, expanded.root())
        .unwrap();
    assert_eq!(child_keys(&tree, branch.node), vec!["42", "43"]);
    assert!(tree.find_expandable().iter().all(|b| b.node != branch.node));
}

#[test]
fn revoked_access_is_picked_up_by_the_next_full_build() {
    let data = dataset(SITE);
    let access = StaticAccessPolicy::from_enrolments(&data.enrolments);
    let cache = ExpansionCache::default();
    let viewer = Viewer::User(2);

    let services = services_with(data.clone(), access.clone());
    TreeBuilder::new(
        services,
        NavigationConfig::default(),
        NavigationContext::new(viewer, Location::course(6)),
        cache.clone(),
    )
    .build()
    .unwrap();
    assert_eq!(cache.get(6), Expandability::Expandable);

    let mut revoked = access;
    revoked.unenrol(2, 6);
    let services = services_with(data, revoked);
    let category = |cache: &ExpansionCache| {
        let tree = TreeBuilder::new(
            services.clone(),
            NavigationConfig::default(),
            NavigationContext::new(viewer, Location::system()),
            cache.clone(),
        )
        .expand(ExpandRequest::Category(1))
        .unwrap();
        let course = tree.get(6i64, Some(NodeType::Course)).unwrap();
        tree.node(course).unwrap().is_expandable()
    };

    // Listings trust the cache until a direct check says otherwise.
    assert!(category(&cache));

    let tree = TreeBuilder::new(
        services.clone(),
        NavigationConfig::default(),
        NavigationContext::new(viewer, Location::course(6)),
        cache.clone(),
    )
    .build()
    .unwrap();
    let active = tree.node(tree.find_active_node().unwrap()).unwrap();
    assert_eq!(active.key, 6i64);
    assert!(active.children().is_empty());
    assert_eq!(cache.get(6), Expandability::NotExpandable);
    assert!(!category(&cache));

    assert_eq!(
        TreeBuilder::new(
            services,
            NavigationConfig::default(),
            NavigationContext::new(viewer, Location::system()),
            cache,
        )
        .expand(ExpandRequest::Course(6))
        .unwrap_err(),
        NavigationError::PermissionDenied
    );
}
