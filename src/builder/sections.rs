//! Sections and activities of a course.
use super::TreeBuilder;
use crate::{
    diagnostic::TreeDiagnostic,
    error::NavigationError,
    format::FormatContext,
    locator::Resource,
    node::NewNode,
    nodekey::NodeId,
    properties::{NodeFlag, NodeKind, NodeType},
    repository::{Activity, Course, Section},
};

impl TreeBuilder {
    pub(super) fn section_name(&self, course: &Course, section: &Section) -> String {
        match section.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => self
                .services
                .formatter
                .format_display_name(name, FormatContext::Course(course.id)),
            _ if section.number == 0 => self.string("general"),
            _ => format!("{} {}", self.string("section"), section.number),
        }
    }

    /// Add the sections of `course` below `course_node`. Only the section holding `activity` (if
    /// any) gets its activities; the other sections stay expandable. An activity whose section is
    /// not shown is attached to the course node directly.
    pub(super) fn load_course_sections(
        &mut self,
        course: &Course,
        course_node: NodeId,
        activity: Option<&Activity>,
    ) -> Result<(), NavigationError> {
        let mut sections = self.services.repository.get_course_sections(course.id)?;
        sections.sort_by_key(|s| s.number);

        if course.id == self.site_id {
            // Front page activities hang off the site node itself.
            for section in &sections {
                let activities = self
                    .services
                    .repository
                    .get_section_activities(section.id)?;
                self.load_section_activities(course_node, course, &activities)?;
            }
            return Ok(());
        }

        if let Some(activity) = activity {
            self.include_section = Some(activity.section_number);
        }
        if let Some(limit) = course.num_sections {
            sections.retain(|s| s.number <= limit);
        }

        for section in &sections {
            let activities = self
                .services
                .repository
                .get_section_activities(section.id)?;
            let included = self.include_section == Some(section.number);
            if !section.user_visible
                || (!self.config.show_empty_sections && activities.is_empty() && !included)
            {
                continue;
            }
            let node = match self
                .tree
                .get_in(course_node, section.id, Some(NodeType::Section))
            {
                Some(node) => node,
                None => {
                    let new = NewNode::new(self.section_name(course, section))
                        .action(self.locate(Resource::Section {
                            course: course.id,
                            number: section.number,
                        }))
                        .node_type(NodeType::Section)
                        .key(section.id)
                        .icon("i/section");
                    let node = self.tree.add_child(course_node, new)?;
                    if let Some(n) = self.tree.node_mut(node) {
                        n.kind = NodeKind::Branch;
                        n.set(NodeFlag::Hidden, !section.visible || !section.available);
                    }
                    node
                }
            };
            if included {
                self.load_section_activities(node, course, &activities)?;
            }
        }

        if let Some(activity) = activity {
            if self
                .tree
                .find_in(course_node, activity.id, Some(NodeType::Activity))
                .is_none()
            {
                tracing::debug!(
                    "[TreeBuilder::load_course_sections] activity {} is not in a shown section",
                    activity.id
                );
                self.add_activity_node(course_node, course, activity)?;
            }
        }
        Ok(())
    }

    pub(super) fn load_section_activities(
        &mut self,
        parent: NodeId,
        course: &Course,
        activities: &[Activity],
    ) -> Result<(), NavigationError> {
        for activity in activities {
            if self
                .tree
                .get_in(parent, activity.id, Some(NodeType::Activity))
                .is_some()
            {
                continue;
            }
            self.add_activity_node(parent, course, activity)?;
        }
        Ok(())
    }

    fn add_activity_node(
        &mut self,
        parent: NodeId,
        course: &Course,
        activity: &Activity,
    ) -> Result<NodeId, NavigationError> {
        let shown = course.id != self.site_id || self.config.show_front_page_mods;
        let name = self
            .services
            .formatter
            .format_display_name(&activity.name, FormatContext::Activity(activity.id));
        let action = activity.has_view_page.then(|| {
            self.locate(Resource::Activity {
                module: activity.module.clone(),
                id: activity.id,
            })
        });
        let new = NewNode::new(name)
            .maybe_action(action)
            .node_type(NodeType::Activity)
            .key(activity.id)
            .icon(format!("mod/{}", activity.module));
        let id = self.tree.add_child(parent, new)?;
        let extended = activity.has_view_page && self.services.extensions.extends(&activity.module);
        if let Some(node) = self.tree.node_mut(id) {
            node.set_title(activity.module.clone());
            node.set(NodeFlag::Hidden, !activity.visible);
            node.set(
                NodeFlag::Displayed,
                shown && activity.has_view_page && activity.visible_on_course_page,
            );
            if extended {
                node.kind = NodeKind::Branch;
            }
        }
        Ok(id)
    }

    /// Make the activity active and let its module extension add to it.
    pub(super) fn load_activity(
        &mut self,
        activity: &Activity,
        course: &Course,
        node: NodeId,
    ) -> Result<(), NavigationError> {
        self.live(node)?;
        self.tree.make_active(node);
        let Some(extension) = self.services.extensions.get(&activity.module) else {
            if let Some(n) = self.tree.node_mut(node) {
                if n.children().is_empty() {
                    n.kind = NodeKind::Leaf;
                }
            }
            return Ok(());
        };
        if let Some(n) = self.tree.node_mut(node) {
            n.kind = NodeKind::Branch;
        }
        if let Err(e) = extension.extend_navigation(&mut self.tree, node, course, activity) {
            tracing::warn!(
                "[TreeBuilder::load_activity] extension for {} failed on activity {}: {e}",
                activity.module,
                activity.id
            );
            self.tree.record(TreeDiagnostic::Extension {
                module: activity.module.clone(),
                message: e.to_string(),
            });
        }
        Ok(())
    }
}
