//! Course nodes: the viewer's own courses, the course listings and the per-course essentials.
use std::collections::BTreeSet;

use super::TreeBuilder;
use crate::{
    context::ContextLevel,
    error::NavigationError,
    format::FormatContext,
    locator::Resource,
    node::NewNode,
    nodekey::{CategoryId, CourseId, NodeId},
    properties::{NodeFlag, NodeKind, NodeType},
    repository::{Course, CourseTimeline},
};

/// Where a course node is placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CourseKind {
    /// The front page, directly below the root.
    Site,
    /// The course of the page being viewed.
    Current,
    /// A course the viewer is enrolled in, below `mycourses`.
    Mine,
    /// Any other course, below `courses` or its category.
    Other,
}

impl TreeBuilder {
    pub(super) fn course_name(&self, course: &Course) -> String {
        let context = FormatContext::Course(course.id);
        let formatter = &self.services.formatter;
        if self.config.show_full_course_names {
            formatter.format_display_name(&course.full_name, context)
        } else {
            formatter.format_display_name(&course.short_name, context)
        }
    }

    /// Add a course node, or return the one already in the tree. `None` when the viewer may not
    /// see the course listed.
    pub(super) fn add_course(
        &mut self,
        course: &Course,
        kind: CourseKind,
    ) -> Result<Option<NodeId>, NavigationError> {
        if let Some(node) = self.added_courses.get(&course.id) {
            return Ok(Some(*node));
        }
        let viewer = self.context.viewer;
        let is_site = course.id == self.site_id;
        if kind == CourseKind::Other
            && !is_site
            && !self.services.access.can_view_course_info(&viewer, course)
        {
            return Ok(None);
        }

        let short_name = self
            .services
            .formatter
            .format_display_name(&course.short_name, FormatContext::Course(course.id));
        let full_name = self
            .services
            .formatter
            .format_display_name(&course.full_name, FormatContext::Course(course.id));

        let mut kind = kind;
        if kind == CourseKind::Current {
            if let Some(node) =
                self.tree
                    .find_in(self.roots.my_courses, course.id, Some(NodeType::Course))
            {
                self.added_courses.insert(course.id, node);
                return Ok(Some(node));
            }
            // Not one of the viewer's courses: placed like any other course.
            kind = CourseKind::Other;
        }

        let mut can_expand = true;
        let (parent, text, action) = match kind {
            CourseKind::Site => {
                let text = if self.config.use_site_name_for_site_pages {
                    full_name.clone()
                } else {
                    self.string("sitepages")
                };
                (self.tree.root(), text, None)
            }
            CourseKind::Mine => {
                let parent = if self.show_my_categories()? {
                    self.added_my_categories
                        .get(&course.category)
                        .copied()
                        .unwrap_or(self.roots.my_courses)
                } else {
                    self.roots.my_courses
                };
                (
                    parent,
                    self.course_name(course),
                    Some(self.locate(Resource::Course(course.id))),
                )
            }
            CourseKind::Other | CourseKind::Current => {
                let access = self.services.access.clone();
                can_expand = self.cache.get_or_compute(course.id, || {
                    viewer.is_logged_in() && access.can_access_course(&viewer, course)
                });
                let mut parent = self.roots.courses;
                if course.category != 0 && self.show_categories()? {
                    if !self.is_category_fully_loaded(course.category) {
                        let show_base = self.show_categories()?;
                        self.load_all_categories(
                            super::CategoryLoad::Category(course.category),
                            show_base,
                        )?;
                    }
                    if self.reported_categories.contains(&course.category) {
                        return Ok(None);
                    }
                    // Loading the category may have added the course already.
                    if let Some(node) = self.added_courses.get(&course.id) {
                        return Ok(Some(*node));
                    }
                    if let Some(node) = self.added_categories.get(&course.category) {
                        parent = *node;
                    }
                }
                (
                    parent,
                    self.course_name(course),
                    Some(self.locate(Resource::Course(course.id))),
                )
            }
        };

        let new = NewNode::new(text)
            .maybe_action(action)
            .node_type(NodeType::Course)
            .short_text(short_name)
            .key(course.id)
            .icon("i/course");
        let id = self.tree.add_child(parent, new)?;
        if let Some(node) = self.tree.node_mut(id) {
            node.set(NodeFlag::ShowInFlatNavigation, kind == CourseKind::Mine);
            node.set(NodeFlag::Hidden, !course.visible);
            node.set_title(full_name);
            node.set(NodeFlag::Expandable, can_expand);
            node.kind = if can_expand {
                NodeKind::Branch
            } else {
                NodeKind::Leaf
            };
        }
        self.added_courses.insert(course.id, id);
        Ok(Some(id))
    }

    /// Fill `courses`: by category when categories are shown, as a flat list otherwise. `filter`
    /// restricts the flat list to the given courses.
    pub(super) fn load_all_courses(
        &mut self,
        filter: Option<Vec<CourseId>>,
    ) -> Result<(), NavigationError> {
        if self.show_categories()? {
            let load = if self.config.show_all_courses {
                super::CategoryLoad::All
            } else {
                super::CategoryLoad::Root
            };
            self.load_all_categories(load, false)?;
            let categories: Vec<CategoryId> = self.added_categories.keys().copied().collect();
            for category in categories {
                self.load_courses_for_category(category)?;
            }
            return self.add_view_all_links();
        }

        let limit = self.config.course_limit;
        let page_course = self.page_course.as_ref().map(|c| c.id);
        let viewer = self.context.viewer;
        let mut added = 0;
        for course in self.services.repository.list_courses(None)? {
            if added >= limit {
                break;
            }
            if course.id == self.site_id
                || Some(course.id) == page_course
                || filter.as_ref().is_some_and(|f| !f.contains(&course.id))
            {
                continue;
            }
            if !course.visible
                && !self
                    .services
                    .access
                    .can_view_hidden_course(&viewer, &course)
            {
                continue;
            }
            if self.add_course(&course, CourseKind::Other)?.is_some() {
                added += 1;
            }
        }
        Ok(())
    }

    /// Fill `mycourses` with the viewer's enrolled courses. Returns whether the viewer is enrolled
    /// in any course besides the front page.
    pub(super) fn load_courses_enrolled(&mut self) -> Result<bool, NavigationError> {
        let viewer = self.context.viewer;
        let Some(user) = viewer.user_id() else {
            return Ok(false);
        };
        let limit = self.config.course_limit;
        let access = self.services.access.clone();
        let mut courses: Vec<Course> = self
            .services
            .repository
            .get_enrolled_courses(user)?
            .into_iter()
            .filter(|c| c.id != self.site_id)
            .filter(|c| c.visible || access.can_view_hidden_course(&viewer, c))
            .collect();
        let mut flat: Vec<Course> = courses
            .iter()
            .filter(|c| c.timeline == CourseTimeline::InProgress)
            .cloned()
            .collect();
        let enrolled = !courses.is_empty();
        let (total, total_flat) = (courses.len(), flat.len());
        courses.truncate(limit);
        flat.truncate(limit);
        tracing::debug!(
            "[TreeBuilder::load_courses_enrolled] showing {} of {total} courses, {} of {total_flat} \
            in flat navigation",
            courses.len(),
            flat.len()
        );

        if !courses.is_empty() && self.show_my_categories()? {
            self.add_my_categories(&courses)?;
        }

        let flat_ids: BTreeSet<CourseId> = flat.iter().map(|c| c.id).collect();
        let shown_ids: BTreeSet<CourseId> = courses.iter().map(|c| c.id).collect();
        for course in &courses {
            if let Some(node) = self.add_course(course, CourseKind::Mine)? {
                self.set_flag(
                    node,
                    NodeFlag::ShowInFlatNavigation,
                    flat_ids.contains(&course.id),
                );
            }
        }
        for course in flat.iter().filter(|c| !shown_ids.contains(&c.id)) {
            if let Some(node) = self.add_course(course, CourseKind::Mine)? {
                self.set_flag(node, NodeFlag::Displayed, false);
                self.set_flag(node, NodeFlag::ShowInFlatNavigation, true);
            }
        }

        let more_in_nav = total > courses.len();
        let more_in_flat = total_flat > flat.len();
        if more_in_nav || more_in_flat {
            // The anchor keeps the link from matching the "My courses" page itself.
            let more = NewNode::new(self.string("morenavigationlinks"))
                .action(self.locate(Resource::MyCourses).with_anchor("more"))
                .node_type(NodeType::Custom)
                .key("courseindexpage");
            let node = self.tree.add_child(self.roots.my_courses, more)?;
            self.set_flag(node, NodeFlag::Displayed, more_in_nav);
            self.set_flag(node, NodeFlag::ShowInFlatNavigation, more_in_flat);
        }
        Ok(enrolled)
    }

    /// Add the category closure of `courses` below `mycourses`, parents first.
    fn add_my_categories(&mut self, courses: &[Course]) -> Result<(), NavigationError> {
        let mut ordered: Vec<CategoryId> = Vec::new();
        let leaves: BTreeSet<CategoryId> = courses.iter().map(|c| c.category).collect();
        for leaf in leaves.into_iter().filter(|c| *c != 0) {
            let Some(path) = self.category_path(leaf)? else {
                continue;
            };
            for id in path {
                if !ordered.contains(&id) {
                    ordered.push(id);
                }
            }
        }
        let viewer = self.context.viewer;
        for id in ordered {
            if self.added_my_categories.contains_key(&id) {
                continue;
            }
            let category = self.services.repository.get_category(id)?;
            if !self.services.access.can_view_category(&viewer, &category) {
                continue;
            }
            let parent = self
                .added_my_categories
                .get(&category.parent)
                .copied()
                .unwrap_or(self.roots.my_courses);
            self.add_category(&category, parent, NodeType::MyCategory)?;
        }
        Ok(())
    }

    /// Participants, blogs, notes, badges, competencies and grades of a course.
    pub(super) fn add_course_essentials(
        &mut self,
        course_node: NodeId,
        course: &Course,
    ) -> Result<(), NavigationError> {
        if course.id == self.site_id {
            return self.add_front_page_course_essentials(course_node, course);
        }
        if self
            .tree
            .get_in(course_node, "participants", Some(NodeType::Container))
            .is_some()
        {
            return Ok(());
        }
        let viewer = self.context.viewer;
        let options = self.services.access.navigation_options(&viewer, course);

        if options.participants {
            let participants = NewNode::new(self.string("participants"))
                .action(self.locate(Resource::Participants(course.id)))
                .node_type(NodeType::Container)
                .key("participants")
                .icon("i/users");
            let node = self.tree.add_child(course_node, participants)?;
            if options.blogs {
                let blogs = NewNode::new(self.string("blogscourse"))
                    .action(self.locate(Resource::Blogs {
                        course: Some(course.id),
                    }))
                    .node_type(NodeType::Setting)
                    .key("courseblogs");
                self.tree.add_child(node, blogs)?;
            }
            if options.notes {
                let notes = NewNode::new(self.string("notes"))
                    .action(self.locate(Resource::Notes { course: course.id }))
                    .node_type(NodeType::Setting)
                    .key("currentcoursenotes");
                self.tree.add_child(node, notes)?;
            }
        } else if !self.context.extend_for_users.is_empty() {
            // Profiles seen through the course still need a place to hang.
            let participants = NewNode::new(self.string("participants"))
                .node_type(NodeType::Container)
                .key("participants");
            self.tree.add_child(course_node, participants)?;
        }

        if options.badges {
            let badges = NewNode::new(self.string("coursebadges"))
                .action(self.locate(Resource::Badges {
                    course: Some(course.id),
                }))
                .node_type(NodeType::Setting)
                .key("badgesview")
                .icon("i/badge");
            self.tree.add_child(course_node, badges)?;
        }

        if options.competencies {
            let competencies = NewNode::new(self.string("competencies"))
                .action(self.locate(Resource::Competencies(course.id)))
                .node_type(NodeType::Setting)
                .key("competencies")
                .icon("i/competencies");
            self.tree.add_child(course_node, competencies)?;
        }

        if options.grades {
            let grades = NewNode::new(self.string("grades"))
                .action(self.locate(Resource::Grades(course.id)))
                .node_type(NodeType::Setting)
                .key("grades")
                .icon("i/grades");
            let node = self.tree.add_child(course_node, grades)?;
            let on_grade_page = self
                .context
                .page_type
                .as_deref()
                .is_some_and(|t| t.starts_with("grade-"));
            if on_grade_page && !matches!(self.context.level(), ContextLevel::Module { .. }) {
                self.tree.make_active(node);
            }
        }
        Ok(())
    }

    /// The site-wide links hung below the front page node. Added once per tree.
    pub(super) fn add_front_page_course_essentials(
        &mut self,
        course_node: NodeId,
        course: &Course,
    ) -> Result<(), NavigationError> {
        if self
            .tree
            .get_in(course_node, "frontpageloaded", Some(NodeType::Custom))
            .is_some()
        {
            return Ok(());
        }
        let viewer = self.context.viewer;
        let options = self.services.access.navigation_options(&viewer, course);

        let marker = NewNode::new("frontpageloaded")
            .node_type(NodeType::Custom)
            .key("frontpageloaded");
        let marker = self.tree.add_child(course_node, marker)?;
        self.set_flag(marker, NodeFlag::Displayed, false);

        if viewer.is_logged_in() {
            let my_courses = NewNode::new(self.string("mycourses"))
                .action(self.locate(Resource::MyCourses))
                .node_type(NodeType::Custom)
                .key("mycourses");
            self.tree.add_child(course_node, my_courses)?;
        }

        if options.participants {
            let participants = NewNode::new(self.string("participants"))
                .action(self.locate(Resource::Participants(course.id)))
                .node_type(NodeType::Custom)
                .key("participants");
            self.tree.add_child(course_node, participants)?;
        }

        if options.blogs {
            let blogs = NewNode::new(self.string("blogssite"))
                .action(self.locate(Resource::Blogs { course: None }))
                .node_type(NodeType::System)
                .key("siteblog");
            self.tree.add_child(course_node, blogs)?;
        }

        if options.badges {
            let badges = NewNode::new(self.string("sitebadges"))
                .action(self.locate(Resource::Badges { course: None }))
                .node_type(NodeType::Custom)
                .key("sitebadges");
            self.tree.add_child(course_node, badges)?;
        }

        if options.notes {
            let notes = NewNode::new(self.string("notes"))
                .action(self.locate(Resource::Notes { course: 0 }))
                .node_type(NodeType::Setting)
                .key("notes");
            self.tree.add_child(course_node, notes)?;
        }

        if options.tags {
            let tags = NewNode::new(self.string("tags"))
                .action(self.locate(Resource::Tags))
                .node_type(NodeType::Setting)
                .key("tags");
            self.tree.add_child(course_node, tags)?;
        }

        if options.search {
            let search = NewNode::new(self.string("search"))
                .action(self.locate(Resource::Search))
                .node_type(NodeType::Setting)
                .key("search");
            self.tree.add_child(course_node, search)?;
        }

        if viewer.is_logged_in() && options.private_files {
            let files = NewNode::new(self.string("privatefiles"))
                .action(self.locate(Resource::PrivateFiles))
                .node_type(NodeType::Setting)
                .key("privatefiles")
                .icon("i/privatefiles");
            let node = self.tree.add_child(course_node, files)?;
            self.set_flag(node, NodeFlag::Displayed, false);
            self.set_flag(node, NodeFlag::ShowInFlatNavigation, true);
            self.set_flag(node, NodeFlag::MainNavOnly, true);
        }

        if viewer.is_logged_in() && options.content_bank {
            let bank_course = match self.page_course.as_ref() {
                Some(page) if page.id != self.site_id => page.id,
                _ => self.site_id,
            };
            let bank = NewNode::new(self.string("contentbank"))
                .action(self.locate(Resource::ContentBank {
                    course: bank_course,
                }))
                .node_type(NodeType::Custom)
                .key("contentbank")
                .icon("i/contentbank");
            let node = self.tree.add_child(course_node, bank)?;
            self.set_flag(node, NodeFlag::ShowInFlatNavigation, true);
        }
        Ok(())
    }
}
