//! Construction of the global navigation.
//!
//! [TreeBuilder] turns a [NavigationContext] into a [NavigationTree] in one synchronous pass. The
//! root branches come first, followed by the front page, the viewer's own courses, the branch of
//! the current location and the users. The pass ends with clean-up: empty root branches are
//! pruned, the active node is searched for, anonymous trees are flattened and the expansion limit
//! is applied.
//!
//! [TreeBuilder::expand] is the narrow variant behind the asynchronous loader: it produces the
//! children of a single branch, which [NavigationTree::splice_branch] grafts into the tree the
//! branch came from.
//!
//! ```
//! use navtree_core::{
//!     access::StaticAccessPolicy,
//!     builder::{Services, TreeBuilder},
//!     cache::ExpansionCache,
//!     config::NavigationConfig,
//!     context::{Location, NavigationContext, Viewer},
//!     repository::MemoryRepository,
//! };
//! use std::sync::Arc;
//!
//! let repository = MemoryRepository::from_toml(
//!     r#"
//!     [site]
//!     id = 1
//!     short_name = "lms"
//!     full_name = "Example LMS"
//!
//!     [[courses]]
//!     id = 5
//!     short_name = "PHY101"
//!     full_name = "Physics"
//!     "#,
//! )?;
//! let services = Services::new(Arc::new(repository), Arc::new(StaticAccessPolicy::allow_all()));
//! let context = NavigationContext::new(Viewer::User(2), Location::course(5));
//! let tree = TreeBuilder::new(services, NavigationConfig::default(), context, ExpansionCache::default())
//!     .build()?;
//! let active = tree.find_active_node().unwrap();
//! assert_eq!(tree.node(active).unwrap().key, 5i64);
//! # Ok::<(), navtree_core::NavigationError>(())
//! ```
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

use crate::{
    access::AccessPolicy,
    cache::{Expandability, ExpansionCache},
    config::{HomePage, NavigationConfig},
    context::{ContextLevel, NavigationContext},
    diagnostic::TreeDiagnostic,
    error::NavigationError,
    extension::ExtensionRegistry,
    format::{FormatContext, Formatter, PlainFormatter},
    locator::{Locator, LocatorFactory, MatchStrength, PathLocatorFactory, Resource},
    node::{NewNode, Node},
    nodekey::{ActivityId, CategoryId, CourseId, NodeId, SectionId},
    properties::{NodeFlag, NodeKind, NodeType},
    repository::{Course, Repository},
    tree::{ExpandableBranch, NavigationTree},
};

mod categories;
mod courses;
mod sections;
mod users;

pub(crate) use categories::CategoryLoad;
pub(crate) use courses::CourseKind;

/// Root branch keys that survive pruning even when empty.
const PERMANENT_ROOT_KEYS: [&str; 3] = ["home", "mycourses", "myhome"];

/// The collaborators a build consults. Cheap to clone; every field is shared.
#[derive(Clone)]
pub struct Services {
    pub repository: Arc<dyn Repository>,
    pub access: Arc<dyn AccessPolicy>,
    pub formatter: Arc<dyn Formatter>,
    pub locators: Arc<dyn LocatorFactory>,
    pub extensions: ExtensionRegistry,
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services")
            .field("extensions", &self.extensions)
            .finish_non_exhaustive()
    }
}

impl Services {
    /// Services with the plain English formatter, conventional page paths and no extensions.
    pub fn new(repository: Arc<dyn Repository>, access: Arc<dyn AccessPolicy>) -> Self {
        Services {
            repository,
            access,
            formatter: Arc::new(PlainFormatter::default()),
            locators: Arc::new(PathLocatorFactory),
            extensions: ExtensionRegistry::default(),
        }
    }

    pub fn with_formatter(mut self, formatter: Arc<dyn Formatter>) -> Self {
        self.formatter = formatter;
        self
    }

    pub fn with_locators(mut self, locators: Arc<dyn LocatorFactory>) -> Self {
        self.locators = locators;
        self
    }

    pub fn with_extensions(mut self, extensions: ExtensionRegistry) -> Self {
        self.extensions = extensions;
        self
    }
}

/// A branch the asynchronous loader asks to be materialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpandRequest {
    /// The `courses` root branch.
    Courses,
    Category(CategoryId),
    Course(CourseId),
    Section {
        course: CourseId,
        section: SectionId,
    },
}

impl ExpandRequest {
    /// The request that fills `branch`, as reported by [NavigationTree::find_expandable].
    pub fn from_branch(tree: &NavigationTree, branch: &ExpandableBranch) -> Option<Self> {
        match branch.node_type {
            NodeType::Category | NodeType::MyCategory => {
                branch.key.as_id().map(ExpandRequest::Category)
            }
            NodeType::Course => branch.key.as_id().map(ExpandRequest::Course),
            NodeType::Section => {
                let section = branch.key.as_id()?;
                let course = tree
                    .ancestors(branch.node)
                    .into_iter()
                    .filter_map(|id| tree.node(id))
                    .find(|n| n.node_type == NodeType::Course)
                    .and_then(|n| n.key.as_id())?;
                Some(ExpandRequest::Section { course, section })
            }
            NodeType::Root if branch.key == "courses" => Some(ExpandRequest::Courses),
            _ => None,
        }
    }
}

/// Ids of the root branches. Before a build (and during a narrow expand pass) they all point at
/// the tree root.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RootNodes {
    pub home: Option<NodeId>,
    pub site: NodeId,
    pub my_profile: NodeId,
    pub current_course: NodeId,
    pub my_courses: NodeId,
    pub courses: NodeId,
    pub users: NodeId,
}

impl RootNodes {
    fn all(root: NodeId) -> Self {
        RootNodes {
            home: None,
            site: root,
            my_profile: root,
            current_course: root,
            my_courses: root,
            courses: root,
            users: root,
        }
    }

    fn branches(&self) -> Vec<NodeId> {
        self.home
            .into_iter()
            .chain([
                self.site,
                self.my_profile,
                self.current_course,
                self.my_courses,
                self.courses,
                self.users,
            ])
            .collect()
    }
}

/// Which page of the current course is being viewed; decides how much of the course is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CoursePage {
    Course,
    Module,
    User,
}

/// Builds one [NavigationTree]. Consumed by [TreeBuilder::build] or [TreeBuilder::expand].
#[derive(Debug)]
pub struct TreeBuilder {
    services: Services,
    config: NavigationConfig,
    context: NavigationContext,
    cache: ExpansionCache,
    tree: NavigationTree,
    roots: RootNodes,
    site_id: CourseId,
    /// The course the current page belongs to, once resolved.
    page_course: Option<Course>,
    added_courses: BTreeMap<CourseId, NodeId>,
    added_categories: BTreeMap<CategoryId, NodeId>,
    added_my_categories: BTreeMap<CategoryId, NodeId>,
    root_categories_loaded: bool,
    all_categories_loaded: bool,
    include_section: Option<u32>,
    reported_categories: BTreeSet<CategoryId>,
    category_count: Option<usize>,
    can_view_course_profile: bool,
}

impl TreeBuilder {
    pub fn new(
        services: Services,
        config: NavigationConfig,
        context: NavigationContext,
        cache: ExpansionCache,
    ) -> Self {
        let (key, text, resource, icon) = match config.home_page {
            HomePage::Site => ("home", "home", Resource::SiteHome, "i/home"),
            HomePage::MyCourses => ("mycourses", "mycourses", Resource::MyCourses, "i/course"),
            HomePage::Dashboard => ("myhome", "myhome", Resource::Dashboard, "i/dashboard"),
        };
        let root = NewNode::new(services.formatter.string(text))
            .key(key)
            .node_type(NodeType::System)
            .action(services.locators.locate(&resource, &[]))
            .icon(icon);
        let tree = Self::empty_tree(&config, &context, root);
        let roots = RootNodes::all(tree.root());
        TreeBuilder {
            services,
            config,
            context,
            cache,
            tree,
            roots,
            site_id: 0,
            page_course: None,
            added_courses: BTreeMap::new(),
            added_categories: BTreeMap::new(),
            added_my_categories: BTreeMap::new(),
            root_categories_loaded: false,
            all_categories_loaded: false,
            include_section: None,
            reported_categories: BTreeSet::new(),
            category_count: None,
            can_view_course_profile: true,
        }
    }

    fn empty_tree(
        config: &NavigationConfig,
        context: &NavigationContext,
        root: NewNode,
    ) -> NavigationTree {
        let mut tree = NavigationTree::new(root)
            .with_active_url(context.active_url.clone())
            .with_authenticated(context.viewer.is_logged_in())
            .with_auto_find_active(config.auto_find_active);
        let root_id = tree.root();
        if let Some(root) = tree.node_mut(root_id) {
            root.set(NodeFlag::ForceOpen, true);
            root.set(NodeFlag::ShowInFlatNavigation, true);
        }
        tree
    }

    fn reset_tree(&mut self, root: NewNode) {
        self.tree = Self::empty_tree(&self.config, &self.context, root);
        self.roots = RootNodes::all(self.tree.root());
    }

    /// Build the global navigation for the context. Only a missing site course (or an invalid
    /// configuration) fails the build; every other failure is confined to its branch and
    /// recorded on the tree.
    pub fn build(mut self) -> Result<NavigationTree, NavigationError> {
        self.config.validate()?;
        let site = self.services.repository.site_course()?;
        self.site_id = site.id;

        tracing::debug!(
            "[TreeBuilder::build] Step 1: root branches for {:?} at {:?}",
            self.context.viewer,
            self.context.level()
        );
        self.add_root_branches(&site)?;

        tracing::debug!("[TreeBuilder::build] Step 2: front page");
        let site_node = self.roots.site;
        self.add_front_page_course_essentials(site_node, &site)?;
        if let Err(e) = self.load_course_sections(&site, site_node, None) {
            self.branch_failed("site", e);
        }

        tracing::debug!("[TreeBuilder::build] Step 3: enrolled courses");
        let enrolled = match self.load_courses_enrolled() {
            Ok(enrolled) => enrolled,
            Err(e) => {
                self.branch_failed("mycourses", e);
                false
            }
        };
        self.mark_root_expandability(enrolled);

        tracing::debug!("[TreeBuilder::build] Step 4: context branch");
        if let Err(e) = self.load_context_branch(&site) {
            self.branch_failed("context", e);
            self.can_view_course_profile = false;
        }

        tracing::debug!("[TreeBuilder::build] Step 5: users");
        self.load_users(&site);

        tracing::debug!("[TreeBuilder::build] Step 6: global extensions");
        self.run_global_extensions();

        tracing::debug!("[TreeBuilder::build] Step 7: prune empty root branches");
        self.prune_root_branches();

        let root = self.tree.root();
        if !self.tree.contains_active_node(root) {
            tracing::debug!("[TreeBuilder::build] Step 8: searching for the active node");
            for strength in MatchStrength::loosening() {
                if let Some(found) = self.tree.search_for_active_node(strength) {
                    tracing::debug!("[TreeBuilder::build] {found} is active ({strength:?})");
                    break;
                }
            }
        }

        if !self.context.viewer.is_logged_in() && self.tree.contains(self.roots.site) {
            tracing::debug!("[TreeBuilder::build] Step 9: hoisting the site branch");
            self.tree.hoist_children(self.roots.site)?;
        }

        if let Some(limit) = self.config.expansion_limit {
            tracing::debug!("[TreeBuilder::build] Step 10: expansion limit {limit}");
            self.set_expansion_limit(limit);
        }

        self.tree
            .set_can_view_course_profile(self.can_view_course_profile);
        Ok(self.tree)
    }

    /// Produce the children of a single branch. The returned tree's root stands for the branch;
    /// graft its children with [NavigationTree::splice_branch].
    pub fn expand(mut self, request: ExpandRequest) -> Result<NavigationTree, NavigationError> {
        self.config.validate()?;
        let site = self.services.repository.site_course()?;
        self.site_id = site.id;
        // Ancestors are already in the tree the result is spliced into.
        self.all_categories_loaded = true;
        tracing::debug!("[TreeBuilder::expand] {request:?}");

        match request {
            ExpandRequest::Courses => {
                let root = NewNode::new(self.string("courses"))
                    .action(self.locate(Resource::CourseIndex))
                    .node_type(NodeType::Root)
                    .key("courses");
                self.reset_tree(root);
                if self.show_categories()? {
                    let root = self.tree.root();
                    for category in self.services.repository.get_categories_by_parent(None)? {
                        self.add_category(&category, root, NodeType::Category)?;
                    }
                }
                self.load_all_courses(None)?;
            }
            ExpandRequest::Category(id) => {
                let category = self.services.repository.get_category(id)?;
                let name = self
                    .services
                    .formatter
                    .format_display_name(&category.name, FormatContext::Category(id));
                let root = NewNode::new(name)
                    .action(self.locate(Resource::Category(id)))
                    .node_type(NodeType::Category)
                    .key(id);
                self.reset_tree(root);
                let root = self.tree.root();
                self.added_categories.insert(id, root);
                for child in self.services.repository.get_categories_by_parent(Some(id))? {
                    self.add_category(&child, root, NodeType::Category)?;
                }
                self.load_courses_for_category(id)?;
                self.add_view_all_links()?;
            }
            ExpandRequest::Course(id) => {
                let course = self.services.repository.get_course(id)?;
                self.require_course_access(&course)?;
                let root = NewNode::new(self.course_name(&course))
                    .action(self.locate(Resource::Course(id)))
                    .node_type(NodeType::Course)
                    .key(id);
                self.reset_tree(root);
                let root = self.tree.root();
                self.added_courses.insert(id, root);
                self.page_course = Some(course.clone());
                self.add_course_essentials(root, &course)?;
                self.load_course_sections(&course, root, None)?;
            }
            ExpandRequest::Section { course, section } => {
                let course = self.services.repository.get_course(course)?;
                self.require_course_access(&course)?;
                let record = self
                    .services
                    .repository
                    .get_course_sections(course.id)?
                    .into_iter()
                    .find(|s| s.id == section)
                    .ok_or_else(|| {
                        NavigationError::not_found(format!("section {section} of course {}", course.id))
                    })?;
                let root = NewNode::new(self.section_name(&course, &record))
                    .action(self.locate(Resource::Section {
                        course: course.id,
                        number: record.number,
                    }))
                    .node_type(NodeType::Section)
                    .key(record.id);
                self.reset_tree(root);
                self.include_section = Some(record.number);
                let activities = self
                    .services
                    .repository
                    .get_section_activities(record.id)?;
                let root = self.tree.root();
                self.load_section_activities(root, &course, &activities)?;
            }
        }

        if let Some(limit) = self.config.expansion_limit {
            self.set_expansion_limit(limit);
        }
        Ok(self.tree)
    }

    /// Narrow passes answer for one course only; the access check is made fresh and written back
    /// to the cache.
    fn require_course_access(&self, course: &Course) -> Result<(), NavigationError> {
        let viewer = self.context.viewer;
        let accessible =
            viewer.is_logged_in() && self.services.access.can_access_course(&viewer, course);
        self.cache
            .set(course.id, Expandability::from_bool(accessible));
        if accessible {
            Ok(())
        } else {
            Err(NavigationError::PermissionDenied)
        }
    }

    fn add_root_branches(&mut self, site: &Course) -> Result<(), NavigationError> {
        let root = self.tree.root();
        let viewer = self.context.viewer;

        self.roots.home = match self.config.home_page {
            HomePage::Site => {
                if viewer.is_authenticated() && self.config.enable_dashboard {
                    let home = NewNode::new(self.string("myhome"))
                        .action(self.locate(Resource::Dashboard))
                        .node_type(NodeType::Setting)
                        .key("myhome")
                        .icon("i/dashboard");
                    let id = self.tree.add_child(root, home)?;
                    self.set_flag(id, NodeFlag::ShowInFlatNavigation, true);
                    Some(id)
                } else {
                    None
                }
            }
            HomePage::Dashboard | HomePage::MyCourses => {
                // The root stands for a personal page; the site link must not redirect back.
                let home = NewNode::new(self.string("sitehome"))
                    .action(self.locate(Resource::SiteHome).with_param("redirect", 0))
                    .node_type(NodeType::Setting)
                    .key("home")
                    .icon("i/home");
                let id = self.tree.add_child(root, home)?;
                self.set_flag(id, NodeFlag::ShowInFlatNavigation, true);
                Some(id)
            }
        };

        self.roots.site = self
            .add_course(site, CourseKind::Site)?
            .ok_or_else(|| NavigationError::Custom("The site course was not added".into()))?;

        let my_profile = NewNode::new(self.string("profile"))
            .node_type(NodeType::User)
            .key("myprofile");
        self.roots.my_profile = self.tree.add_child(root, my_profile)?;

        let current_course = NewNode::new(self.string("currentcourse"))
            .node_type(NodeType::Root)
            .key("currentcourse");
        self.roots.current_course = self.tree.add_child(root, current_course)?;
        self.set_flag(self.roots.current_course, NodeFlag::MainNavOnly, true);

        let my_courses = NewNode::new(self.string("mycourses"))
            .action(self.locate(Resource::MyCourses))
            .node_type(NodeType::Root)
            .key("mycourses")
            .icon("i/course");
        self.roots.my_courses = self.tree.add_child(root, my_courses)?;
        if self.config.home_page == HomePage::MyCourses {
            self.set_flag(self.roots.my_courses, NodeFlag::MainNavOnly, true);
        }

        let courses = NewNode::new(self.string("courses"))
            .action(self.locate(Resource::CourseIndex))
            .node_type(NodeType::Root)
            .key("courses");
        self.roots.courses = self.tree.add_child(root, courses)?;
        if !self.services.access.can_browse_categories(&viewer) {
            self.tree.hide(self.roots.courses, None);
        }

        let users = NewNode::new(self.string("users"))
            .node_type(NodeType::Root)
            .key("users");
        self.roots.users = self.tree.add_child(root, users)?;
        Ok(())
    }

    fn mark_root_expandability(&mut self, enrolled: bool) {
        if enrolled {
            self.set_flag(self.roots.my_courses, NodeFlag::Expandable, true);
            self.set_flag(self.roots.my_courses, NodeFlag::ShowInFlatNavigation, true);
            if self.config.show_all_courses {
                self.set_flag(self.roots.courses, NodeFlag::Expandable, true);
            }
        } else {
            self.set_flag(self.roots.courses, NodeFlag::Expandable, true);
        }
        self.set_flag(self.roots.my_courses, NodeFlag::ForceOpen, true);
    }

    fn load_context_branch(&mut self, site: &Course) -> Result<(), NavigationError> {
        match self.context.level() {
            ContextLevel::System => Ok(()),
            ContextLevel::Category(id) => self.load_all_categories(CategoryLoad::Category(id), true),
            ContextLevel::Course(id) => {
                if id == site.id {
                    return Ok(());
                }
                let Some((course, node)) = self.load_current_course(id, CoursePage::Course)? else {
                    return Ok(());
                };
                self.load_course_sections(&course, node, None)?;
                self.ensure_active_within(node);
                Ok(())
            }
            ContextLevel::Module {
                course_id,
                activity_id,
            } => self.load_module_branch(site, course_id, activity_id),
            ContextLevel::User { course_id, .. } => match course_id {
                Some(id) if id != site.id => {
                    if let Some((course, node)) = self.load_current_course(id, CoursePage::User)? {
                        self.load_course_sections(&course, node, None)?;
                    }
                    Ok(())
                }
                _ => Ok(()),
            },
        }
    }

    fn load_module_branch(
        &mut self,
        site: &Course,
        course_id: Option<CourseId>,
        activity_id: ActivityId,
    ) -> Result<(), NavigationError> {
        let activity = match self.services.repository.get_activity(activity_id) {
            Ok(activity) => activity,
            Err(e) if e.is_not_found() => {
                self.record_not_found(e);
                self.can_view_course_profile = false;
                return Ok(());
            }
            Err(e) => return Err(e),
        };
        let course_id = course_id.unwrap_or(activity.course);

        if course_id == site.id {
            // Front page activities were loaded with the site branch.
            if let Some(node) =
                self.tree
                    .find_in(self.roots.site, activity.id, Some(NodeType::Activity))
            {
                self.load_activity(&activity, site, node)?;
            }
            return Ok(());
        }

        let Some((course, node)) = self.load_current_course(course_id, CoursePage::Module)? else {
            return Ok(());
        };
        self.load_course_sections(&course, node, Some(&activity))?;
        if let Some(activity_node) = self
            .tree
            .find_in(node, activity.id, Some(NodeType::Activity))
        {
            self.load_activity(&activity, &course, activity_node)?;
            self.ensure_active_within(activity_node);
        }
        Ok(())
    }

    /// Add the course of the current page and its essentials. Returns `None` when the course is
    /// not shown or the viewer may not enter it (the course node is then made active).
    fn load_current_course(
        &mut self,
        course_id: CourseId,
        page: CoursePage,
    ) -> Result<Option<(Course, NodeId)>, NavigationError> {
        let course = match self.services.repository.get_course(course_id) {
            Ok(course) => course,
            Err(e) if e.is_not_found() => {
                self.record_not_found(e);
                self.can_view_course_profile = false;
                self.add_unknown_course(course_id)?;
                return Ok(None);
            }
            Err(e) => return Err(e),
        };
        self.page_course = Some(course.clone());

        let Some(node) = self.add_course(&course, CourseKind::Current)? else {
            self.can_view_course_profile = false;
            return Ok(None);
        };

        let viewer = self.context.viewer;
        let accessible = self.services.access.can_access_course(&viewer, &course);
        self.refresh_expandability(&course, node, accessible);
        if !accessible && !(page == CoursePage::Course && self.current_user_is_parent()) {
            self.tree.make_active(node);
            self.can_view_course_profile = false;
            return Ok(None);
        }

        self.add_course_essentials(node, &course)?;
        Ok(Some((course, node)))
    }

    /// Stand-in for a current course the repository cannot resolve: an active leaf with no
    /// action that can never be expanded.
    fn add_unknown_course(&mut self, course_id: CourseId) -> Result<NodeId, NavigationError> {
        let new = NewNode::new(self.string("unknowncourse"))
            .node_type(NodeType::Course)
            .key(course_id);
        let node = self.tree.add_child(self.roots.courses, new)?;
        if let Some(n) = self.tree.node_mut(node) {
            n.set(NodeFlag::Expandable, false);
            n.kind = NodeKind::Leaf;
        }
        self.added_courses.insert(course_id, node);
        self.tree.make_active(node);
        Ok(node)
    }

    /// A direct access check always wins over the cached answer.
    fn refresh_expandability(&mut self, course: &Course, node: NodeId, accessible: bool) {
        let cached = self.cache.get(course.id).as_bool();
        if cached.is_some_and(|cached| cached != accessible) {
            tracing::debug!(
                "[TreeBuilder::refresh_expandability] access to course {} changed to {accessible}",
                course.id
            );
        }
        self.cache
            .set(course.id, Expandability::from_bool(accessible));
        if let Some(n) = self.tree.node_mut(node) {
            n.set(NodeFlag::Expandable, accessible);
            n.kind = if accessible || !n.children().is_empty() {
                NodeKind::Branch
            } else {
                NodeKind::Leaf
            };
        }
    }

    fn current_user_is_parent(&self) -> bool {
        let viewer = self.context.viewer;
        match self.context.parent_check_user {
            Some(child) if viewer.user_id() != Some(child) => {
                self.services.access.is_parent_of(&viewer, child)
            }
            _ => false,
        }
    }

    /// Make `node` active unless it, or a node below it matching the current locator, already is.
    fn ensure_active_within(&mut self, node: NodeId) {
        if !self.tree.contains_active_node(node)
            && self
                .tree
                .search_for_active_node_from(node, MatchStrength::Base)
                .is_none()
        {
            self.tree.make_active(node);
        }
    }

    fn run_global_extensions(&mut self) {
        for (name, extension) in self.services.extensions.globals() {
            if let Err(e) = extension.extend_global(&mut self.tree, &self.context) {
                tracing::warn!("[TreeBuilder::run_global_extensions] {name} failed: {e}");
                self.tree.record(TreeDiagnostic::Extension {
                    module: name,
                    message: e.to_string(),
                });
            }
        }
    }

    fn prune_root_branches(&mut self) {
        for id in self.roots.branches() {
            let Some(node) = self.tree.node(id) else {
                continue;
            };
            let permanent = node
                .key
                .as_name()
                .is_some_and(|key| PERMANENT_ROOT_KEYS.contains(&key));
            if !permanent && !node.has_children() && !node.is_active() {
                tracing::debug!(
                    "[TreeBuilder::prune_root_branches] removing empty branch {}",
                    node.key
                );
                self.tree.remove(id);
            }
        }
    }

    /// Hide the structure below every node of `node_type`. The nodes stay in the tree so the
    /// breadcrumb still resolves.
    fn set_expansion_limit(&mut self, node_type: NodeType) {
        for node in self.tree.find_all_of_type(node_type) {
            if node_type == NodeType::Course
                && self.tree.node(node).is_some_and(|n| n.key == self.site_id)
            {
                continue;
            }
            for child in self.tree.children_of(node) {
                self.tree.hide(child, Some(NodeType::hideable_structure()));
            }
        }
    }

    fn string(&self, identifier: &str) -> String {
        self.services.formatter.string(identifier)
    }

    fn locate(&self, resource: Resource) -> Locator {
        self.services.locators.locate(&resource, &[])
    }

    fn set_flag(&mut self, id: NodeId, flag: NodeFlag, on: bool) {
        if let Some(node) = self.tree.node_mut(id) {
            node.set(flag, on);
        }
    }

    fn live(&self, id: NodeId) -> Result<&Node, NavigationError> {
        self.tree
            .node(id)
            .ok_or_else(|| NavigationError::StaleNode(id.to_string()))
    }

    fn branch_failed(&mut self, branch: &str, error: NavigationError) {
        if error.is_not_found() {
            self.record_not_found(error);
            return;
        }
        tracing::warn!("[TreeBuilder] the {branch} branch failed: {error}");
        self.tree
            .record(TreeDiagnostic::branch_failed(branch, error.to_string()));
    }

    fn record_not_found(&mut self, error: NavigationError) {
        tracing::warn!("[TreeBuilder] skipping branch: {error}");
        self.tree.record(TreeDiagnostic::NotFound(error.to_string()));
    }

    /// Broken category hierarchies are logged once per category.
    fn report_configuration(&mut self, category: CategoryId, message: String) {
        if self.reported_categories.insert(category) {
            tracing::error!("[TreeBuilder] category {category}: {message}");
            self.tree.record(TreeDiagnostic::Configuration(message));
        }
    }
}
