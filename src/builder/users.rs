//! Profile nodes for the viewer and for the users the page is about.
use super::TreeBuilder;
use crate::{
    context::ContextLevel,
    error::NavigationError,
    format::FormatContext,
    locator::Resource,
    node::NewNode,
    nodekey::{NodeId, UserId},
    properties::NodeType,
    repository::Course,
};

impl TreeBuilder {
    /// The viewer, the user a profile page is about, and any further users the caller asked for.
    pub(super) fn load_users(&mut self, site: &Course) {
        let viewer = self.context.viewer;
        if let Err(e) = self.load_for_user(site, None, false) {
            self.branch_failed("myprofile", e);
        }

        let in_course_page = matches!(
            self.context.level(),
            ContextLevel::Course(_) | ContextLevel::Module { .. }
        );
        let real_course = self.page_course.as_ref().is_some_and(|c| c.id != site.id);
        if in_course_page && real_course && self.can_view_course_profile {
            if let Err(e) = self.load_for_user(site, None, true) {
                self.branch_failed("participants", e);
            }
        }

        let mut others = self.context.extend_for_users.clone();
        if let ContextLevel::User { user_id, .. } = self.context.level() {
            if !others.contains(&user_id) {
                others.insert(0, user_id);
            }
        }
        for user in others {
            if Some(user) == viewer.user_id() {
                continue;
            }
            if let Err(e) = self.load_for_user(site, Some(user), false) {
                self.branch_failed("users", e);
            }
        }
    }

    /// Add a profile node for `user` (the viewer when `None`). The viewer's own profile goes below
    /// `myprofile` unless `force` asks for the course participants list instead. Returns the new
    /// node, if one was added.
    pub(super) fn load_for_user(
        &mut self,
        site: &Course,
        user: Option<UserId>,
        force: bool,
    ) -> Result<Option<NodeId>, NavigationError> {
        let viewer = self.context.viewer;
        let Some(user_id) = user.or(viewer.user_id()) else {
            return Ok(None);
        };
        let current = viewer.user_id() == Some(user_id);
        let record = self.services.repository.get_user(user_id)?;
        let course = self
            .page_course
            .clone()
            .filter(|c| c.id != site.id && self.can_view_course_profile);
        let in_course = course.is_some() && (!current || force);

        let (parent, action) = match course.as_ref().filter(|_| in_course) {
            Some(course) => {
                let Some(course_node) = self.added_courses.get(&course.id).copied() else {
                    return Ok(None);
                };
                let Some(participants) =
                    self.tree
                        .get_in(course_node, "participants", Some(NodeType::Container))
                else {
                    return Ok(None);
                };
                (
                    participants,
                    self.locate(Resource::UserProfile {
                        user: user_id,
                        course: Some(course.id),
                    }),
                )
            }
            None if current => (
                self.roots.my_profile,
                self.locate(Resource::UserProfile {
                    user: user_id,
                    course: None,
                }),
            ),
            None => {
                if self.services.access.can_view_participants(&viewer, site) {
                    let participants = self.locate(Resource::Participants(site.id));
                    if let Some(users) = self.tree.node_mut(self.roots.users) {
                        users.action = Some(participants);
                    }
                }
                (
                    self.roots.users,
                    self.locate(Resource::UserProfile {
                        user: user_id,
                        course: None,
                    }),
                )
            }
        };

        let key = format!("user{user_id}");
        if let Some(existing) = self.tree.get_in(parent, key.as_str(), Some(NodeType::User)) {
            return Ok(Some(existing));
        }

        let can_view = self.services.access.can_view_profile(
            &viewer,
            &record,
            course.as_ref().filter(|_| in_course),
        );
        if !can_view {
            let generic = NewNode::new(self.string("user"))
                .node_type(NodeType::User)
                .key(key);
            return Ok(Some(self.tree.add_child(parent, generic)?));
        }

        let name = self
            .services
            .formatter
            .format_display_name(&record.full_name, FormatContext::User(user_id));
        let new = NewNode::new(name)
            .action(action)
            .node_type(NodeType::User)
            .key(key)
            .icon("i/user");
        let node = self.tree.add_child(parent, new)?;
        if matches!(self.context.level(), ContextLevel::User { user_id: page_user, .. } if page_user == user_id)
        {
            self.tree.make_active(node);
        }
        if in_course {
            return Ok(Some(node));
        }

        let options = self.services.access.navigation_options(&viewer, site);
        let view_profile = NewNode::new(self.string("viewprofile"))
            .action(self.locate(Resource::UserProfile {
                user: user_id,
                course: None,
            }))
            .node_type(NodeType::Setting)
            .key("viewprofile");
        self.tree.add_child(node, view_profile)?;

        if self.config.messaging {
            if let Some(me) = viewer.user_id() {
                let mut params = vec![("user1", me.to_string())];
                if !current {
                    params.push(("user2", user_id.to_string()));
                }
                let messages = NewNode::new(self.string("messages"))
                    .action(self.services.locators.locate(&Resource::Messages, &params))
                    .node_type(NodeType::Setting)
                    .key("messages");
                self.tree.add_child(node, messages)?;
            }
        }

        if current && options.private_files {
            let files = NewNode::new(self.string("privatefiles"))
                .action(self.locate(Resource::PrivateFiles))
                .node_type(NodeType::Setting)
                .key("privatefiles");
            self.tree.add_child(node, files)?;
        }

        if options.grades {
            let grades = NewNode::new(self.string("grades"))
                .action(self.services.locators.locate(
                    &Resource::Grades(site.id),
                    &[("user", user_id.to_string())],
                ))
                .node_type(NodeType::Setting)
                .key(if current { "grades" } else { "usergrades" });
            self.tree.add_child(node, grades)?;
        }
        Ok(Some(node))
    }
}
