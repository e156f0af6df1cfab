//! Category branches below `courses` (and `mycourses`), plus the courses filed under them.
use std::collections::VecDeque;

use super::{CourseKind, TreeBuilder};
use crate::{
    context::ContextLevel,
    error::NavigationError,
    format::FormatContext,
    locator::Resource,
    node::NewNode,
    nodekey::{CategoryId, NodeId},
    properties::{NodeFlag, NodeType},
    repository::Category,
};

/// How much of the category hierarchy to materialize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CategoryLoad {
    /// The top-level categories.
    Root,
    /// The whole hierarchy.
    All,
    /// The path to one category, the children of every category on it, and its courses.
    Category(CategoryId),
}

impl TreeBuilder {
    fn category_count(&mut self) -> Result<usize, NavigationError> {
        if let Some(count) = self.category_count {
            return Ok(count);
        }
        let count = self.services.repository.count_categories()?;
        self.category_count = Some(count);
        Ok(count)
    }

    /// Courses are grouped by category on category pages, or when configured and the site has
    /// more than one category.
    pub(super) fn show_categories(&mut self) -> Result<bool, NavigationError> {
        if matches!(self.context.level(), ContextLevel::Category(_)) {
            return Ok(true);
        }
        Ok(self.config.show_categories && self.category_count()? > 1)
    }

    pub(super) fn show_my_categories(&mut self) -> Result<bool, NavigationError> {
        Ok(self.config.show_my_course_categories && self.category_count()? > 1)
    }

    pub(super) fn is_category_fully_loaded(&self, id: CategoryId) -> bool {
        match self.added_categories.get(&id) {
            Some(node) => {
                self.all_categories_loaded
                    || self
                        .tree
                        .node(*node)
                        .is_some_and(|n| !n.children().is_empty())
            }
            None => false,
        }
    }

    /// Whether the category node has room for another course. Categories that are not in the
    /// tree yet always do.
    pub(super) fn can_add_more_courses_to_category(&self, id: CategoryId) -> bool {
        match self.added_categories.get(&id).and_then(|n| self.tree.node(*n)) {
            Some(node) => node.children().of_type(NodeType::Course).len() < self.config.course_limit,
            None => true,
        }
    }

    /// Root-to-leaf path of `id`, or `None` when the hierarchy is broken. Broken hierarchies are
    /// reported, never propagated.
    pub(super) fn category_path(
        &mut self,
        id: CategoryId,
    ) -> Result<Option<Vec<CategoryId>>, NavigationError> {
        let path = match self.services.repository.get_category_path(id) {
            Ok(path) => path,
            Err(NavigationError::Configuration(message)) => {
                self.report_configuration(id, message);
                return Ok(None);
            }
            Err(e) => return Err(e),
        };
        let max_depth = self.services.repository.max_category_depth()?;
        if path.len() > max_depth {
            self.report_configuration(
                id,
                format!(
                    "category {id} is {} levels deep, more than the maximum of {max_depth}",
                    path.len()
                ),
            );
            return Ok(None);
        }
        Ok(Some(path))
    }

    pub(super) fn load_all_categories(
        &mut self,
        load: CategoryLoad,
        show_base: bool,
    ) -> Result<(), NavigationError> {
        match load {
            CategoryLoad::Root => self.load_root_categories()?,
            CategoryLoad::All => self.load_category_hierarchy()?,
            CategoryLoad::Category(id) => {
                // Courses are only loaded on the first visit; add_course calls back in here.
                let newly_added = !self.added_categories.contains_key(&id);
                let Some(path) = self.category_path(id)? else {
                    return Ok(());
                };
                if show_base {
                    self.load_root_categories()?;
                }
                let mut parent = self.roots.courses;
                for category_id in path {
                    let node = match self.added_categories.get(&category_id) {
                        Some(node) => *node,
                        None => {
                            let category = self.services.repository.get_category(category_id)?;
                            self.add_category(&category, parent, NodeType::Category)?
                        }
                    };
                    for child in self
                        .services
                        .repository
                        .get_categories_by_parent(Some(category_id))?
                    {
                        if !self.added_categories.contains_key(&child.id) {
                            self.add_category(&child, node, NodeType::Category)?;
                        }
                    }
                    parent = node;
                }
                if newly_added {
                    self.load_courses_for_category(id)?;
                }
            }
        }
        self.add_view_all_links()
    }

    fn load_root_categories(&mut self) -> Result<(), NavigationError> {
        if self.root_categories_loaded {
            return Ok(());
        }
        for category in self.services.repository.get_categories_by_parent(None)? {
            if !self.added_categories.contains_key(&category.id) {
                self.add_category(&category, self.roots.courses, NodeType::Category)?;
            }
        }
        self.root_categories_loaded = true;
        Ok(())
    }

    /// Breadth-first, so every parent is in the tree before its children.
    fn load_category_hierarchy(&mut self) -> Result<(), NavigationError> {
        if self.all_categories_loaded {
            return Ok(());
        }
        let mut queue = VecDeque::from([None]);
        while let Some(parent) = queue.pop_front() {
            let parent_node = parent
                .and_then(|id| self.added_categories.get(&id).copied())
                .unwrap_or(self.roots.courses);
            for category in self.services.repository.get_categories_by_parent(parent)? {
                if !self.added_categories.contains_key(&category.id) {
                    self.add_category(&category, parent_node, NodeType::Category)?;
                }
                queue.push_back(Some(category.id));
            }
        }
        self.root_categories_loaded = true;
        self.all_categories_loaded = true;
        Ok(())
    }

    /// Add a category node under `parent`. MyCategory nodes are tracked apart from the Category
    /// nodes below `courses`.
    pub(super) fn add_category(
        &mut self,
        category: &Category,
        parent: NodeId,
        node_type: NodeType,
    ) -> Result<NodeId, NavigationError> {
        let can_view = self
            .services
            .access
            .can_view_category(&self.context.viewer, category);
        let name = self
            .services
            .formatter
            .format_display_name(&category.name, FormatContext::Category(category.id));
        let new = if can_view {
            NewNode::new(name.clone())
                .action(self.locate(Resource::Category(category.id)))
                .short_text(name)
        } else {
            NewNode::new(self.string("categoryhidden"))
        };
        let id = self
            .tree
            .add_child(parent, new.node_type(node_type).key(category.id))?;
        if let Some(node) = self.tree.node_mut(id) {
            if !can_view {
                node.set(NodeFlag::Displayed, false);
            } else if !category.visible {
                node.set(NodeFlag::Hidden, true);
            }
        }
        match node_type {
            NodeType::MyCategory => self.added_my_categories.insert(category.id, id),
            _ => self.added_categories.insert(category.id, id),
        };
        Ok(id)
    }

    /// Categories whose courses did not all fit get a "View all courses" link.
    pub(super) fn add_view_all_links(&mut self) -> Result<(), NavigationError> {
        let added: Vec<(CategoryId, NodeId)> = self
            .added_categories
            .iter()
            .map(|(category, node)| (*category, *node))
            .collect();
        for (category, node) in added {
            if self.can_add_more_courses_to_category(category)
                || self
                    .tree
                    .get_in(node, "viewallcourses", Some(NodeType::Setting))
                    .is_some()
            {
                continue;
            }
            if self.services.repository.count_courses_in_category(category)?
                > self.config.course_limit
            {
                let link = NewNode::new(self.string("viewallcourses"))
                    .action(self.locate(Resource::Category(category)))
                    .node_type(NodeType::Setting)
                    .key("viewallcourses");
                self.tree.add_child(node, link)?;
            }
        }
        Ok(())
    }

    /// Add the courses of one category, up to the course limit. Very large categories are sampled
    /// instead of fetched in full.
    pub(super) fn load_courses_for_category(
        &mut self,
        id: CategoryId,
    ) -> Result<(), NavigationError> {
        let limit = self.config.course_limit;
        let count = self.services.repository.count_courses_in_category(id)?;
        let sampled = count > limit * 5;
        let courses = if sampled {
            self.services
                .repository
                .get_courses_by_category(id, Some(limit * 5), 0)?
        } else if count > 0 {
            self.services
                .repository
                .get_courses_by_category(id, None, 0)?
        } else {
            return Ok(());
        };
        tracing::debug!(
            "[TreeBuilder::load_courses_for_category] category {id}: {} of {count} courses",
            courses.len()
        );

        let viewer = self.context.viewer;
        for course in courses {
            if course.id == self.site_id || self.added_courses.contains_key(&course.id) {
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
            if !self.can_add_more_courses_to_category(course.category) {
                if sampled {
                    break;
                }
                continue;
            }
            self.add_course(&course, CourseKind::Other)?;
        }
        Ok(())
    }
}
