//! Permission predicates consulted while building the navigation.
//!
//! Permissions never fail a build: every check is a plain boolean that steers which branch or
//! detail is shown. Checks are evaluated on every call; caching them is the job of
//! [crate::cache::ExpansionCache] where it matters.
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::{
    context::Viewer,
    nodekey::{CategoryId, CourseId, UserId},
    repository::{Category, Course, Enrolment, User},
};

/// Which optional links a viewer gets inside a course (or the front page).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationOptions {
    pub participants: bool,
    pub blogs: bool,
    pub badges: bool,
    pub notes: bool,
    pub tags: bool,
    pub search: bool,
    pub grades: bool,
    pub competencies: bool,
    pub private_files: bool,
    pub content_bank: bool,
}

impl Default for NavigationOptions {
    fn default() -> Self {
        NavigationOptions {
            participants: true,
            blogs: false,
            badges: false,
            notes: false,
            tags: false,
            search: false,
            grades: true,
            competencies: false,
            private_files: true,
            content_bank: false,
        }
    }
}

impl NavigationOptions {
    pub fn none() -> Self {
        NavigationOptions {
            participants: false,
            blogs: false,
            badges: false,
            notes: false,
            tags: false,
            search: false,
            grades: false,
            competencies: false,
            private_files: false,
            content_bank: false,
        }
    }

    pub fn all() -> Self {
        NavigationOptions {
            participants: true,
            blogs: true,
            badges: true,
            notes: true,
            tags: true,
            search: true,
            grades: true,
            competencies: true,
            private_files: true,
            content_bank: true,
        }
    }
}

pub trait AccessPolicy: Send + Sync {
    /// Whether `viewer` may enter `course`. This is the expensive check the expansion cache
    /// avoids repeating.
    fn can_access_course(&self, viewer: &Viewer, course: &Course) -> bool;

    fn can_view_category(&self, viewer: &Viewer, category: &Category) -> bool;

    /// Whether the course may be listed at all (outside of "My courses").
    fn can_view_course_info(&self, viewer: &Viewer, course: &Course) -> bool;

    fn can_view_hidden_course(&self, viewer: &Viewer, course: &Course) -> bool;

    /// Whether the viewer has any category to browse; the "Courses" branch is hidden otherwise.
    fn can_browse_categories(&self, viewer: &Viewer) -> bool;

    fn can_view_profile(&self, viewer: &Viewer, user: &User, course: Option<&Course>) -> bool;

    fn can_view_participants(&self, viewer: &Viewer, course: &Course) -> bool;

    /// Whether `viewer` holds a parent role over `user`.
    fn is_parent_of(&self, viewer: &Viewer, user: UserId) -> bool;

    fn navigation_options(&self, viewer: &Viewer, course: &Course) -> NavigationOptions;
}

/// Rule-based [AccessPolicy]: everything is allowed unless restricted by one of the builder
/// methods. With [StaticAccessPolicy::from_enrolments], signed-in users can only access the
/// courses they are enrolled in.
#[derive(Debug, Clone)]
pub struct StaticAccessPolicy {
    enrolled: Option<BTreeMap<UserId, BTreeSet<CourseId>>>,
    denied_courses: BTreeSet<CourseId>,
    guest_courses: BTreeSet<CourseId>,
    hidden_categories: BTreeSet<CategoryId>,
    managers: BTreeSet<UserId>,
    parents: BTreeMap<UserId, BTreeSet<UserId>>,
    browse_categories: bool,
    options: NavigationOptions,
}

impl Default for StaticAccessPolicy {
    fn default() -> Self {
        StaticAccessPolicy {
            enrolled: None,
            denied_courses: BTreeSet::new(),
            guest_courses: BTreeSet::new(),
            hidden_categories: BTreeSet::new(),
            managers: BTreeSet::new(),
            parents: BTreeMap::new(),
            browse_categories: true,
            options: NavigationOptions::default(),
        }
    }
}

impl StaticAccessPolicy {
    pub fn allow_all() -> Self {
        Self::default()
    }

    pub fn from_enrolments(enrolments: &[Enrolment]) -> Self {
        let mut enrolled: BTreeMap<UserId, BTreeSet<CourseId>> = BTreeMap::new();
        for e in enrolments {
            enrolled.entry(e.user).or_default().insert(e.course);
        }
        StaticAccessPolicy {
            enrolled: Some(enrolled),
            ..Default::default()
        }
    }

    pub fn deny_course(mut self, course: CourseId) -> Self {
        self.denied_courses.insert(course);
        self
    }

    /// Let anonymous visitors and guests into `course`.
    pub fn allow_guests(mut self, course: CourseId) -> Self {
        self.guest_courses.insert(course);
        self
    }

    pub fn hide_category(mut self, category: CategoryId) -> Self {
        self.hidden_categories.insert(category);
        self
    }

    /// Managers see hidden courses and categories and every profile.
    pub fn with_manager(mut self, user: UserId) -> Self {
        self.managers.insert(user);
        self
    }

    pub fn with_parent(mut self, parent: UserId, child: UserId) -> Self {
        self.parents.entry(parent).or_default().insert(child);
        self
    }

    pub fn without_category_browsing(mut self) -> Self {
        self.browse_categories = false;
        self
    }

    pub fn with_options(mut self, options: NavigationOptions) -> Self {
        self.options = options;
        self
    }

    /// Revoke `user`'s enrolment in `course`. Only meaningful for enrolment-based policies.
    pub fn unenrol(&mut self, user: UserId, course: CourseId) {
        if let Some(courses) = self.enrolled.as_mut().and_then(|e| e.get_mut(&user)) {
            courses.remove(&course);
        }
    }

    fn is_manager(&self, viewer: &Viewer) -> bool {
        viewer.user_id().is_some_and(|id| self.managers.contains(&id))
    }

    fn is_enrolled(&self, user: UserId, course: CourseId) -> bool {
        match &self.enrolled {
            Some(enrolled) => enrolled.get(&user).is_some_and(|c| c.contains(&course)),
            None => true,
        }
    }
}

impl AccessPolicy for StaticAccessPolicy {
    fn can_access_course(&self, viewer: &Viewer, course: &Course) -> bool {
        if self.denied_courses.contains(&course.id) {
            return false;
        }
        if !course.visible && !self.can_view_hidden_course(viewer, course) {
            return false;
        }
        match viewer {
            Viewer::Anonymous | Viewer::Guest => self.guest_courses.contains(&course.id),
            Viewer::User(user) => self.is_manager(viewer) || self.is_enrolled(*user, course.id),
        }
    }

    fn can_view_category(&self, viewer: &Viewer, category: &Category) -> bool {
        if self.is_manager(viewer) {
            return true;
        }
        category.visible && !self.hidden_categories.contains(&category.id)
    }

    fn can_view_course_info(&self, viewer: &Viewer, course: &Course) -> bool {
        course.visible || self.can_view_hidden_course(viewer, course)
    }

    fn can_view_hidden_course(&self, viewer: &Viewer, _course: &Course) -> bool {
        self.is_manager(viewer)
    }

    fn can_browse_categories(&self, _viewer: &Viewer) -> bool {
        self.browse_categories
    }

    fn can_view_profile(&self, viewer: &Viewer, user: &User, course: Option<&Course>) -> bool {
        match viewer {
            Viewer::User(id) if *id == user.id => true,
            Viewer::User(id) => {
                self.is_manager(viewer)
                    || self.is_parent_of(viewer, user.id)
                    || course.is_some_and(|c| {
                        self.is_enrolled(*id, c.id) && self.is_enrolled(user.id, c.id)
                    })
            }
            _ => false,
        }
    }

    fn can_view_participants(&self, viewer: &Viewer, course: &Course) -> bool {
        self.options.participants && self.can_access_course(viewer, course)
    }

    fn is_parent_of(&self, viewer: &Viewer, user: UserId) -> bool {
        viewer
            .user_id()
            .and_then(|id| self.parents.get(&id))
            .is_some_and(|children| children.contains(&user))
    }

    fn navigation_options(&self, viewer: &Viewer, _course: &Course) -> NavigationOptions {
        if viewer.is_authenticated() {
            self.options
        } else {
            NavigationOptions {
                private_files: false,
                content_bank: false,
                notes: false,
                ..self.options
            }
        }
    }
}
