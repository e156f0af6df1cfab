//! Who is looking, and at what. The [NavigationContext] replaces the page and session globals a
//! navigation build would otherwise read.
use serde::{Deserialize, Serialize};

use crate::{
    locator::Locator,
    nodekey::{ActivityId, CategoryId, CourseId, UserId},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Viewer {
    #[default]
    Anonymous,
    Guest,
    User(UserId),
}

impl Viewer {
    /// Logged in at all, guests included.
    pub fn is_logged_in(&self) -> bool {
        !matches!(self, Viewer::Anonymous)
    }

    /// Logged in as a real account.
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Viewer::User(_))
    }

    pub fn user_id(&self) -> Option<UserId> {
        match self {
            Viewer::User(id) => Some(*id),
            _ => None,
        }
    }
}

/// The ids describing the page being viewed. Any combination may be present; the deepest one
/// decides the [ContextLevel].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub category_id: Option<CategoryId>,
    pub course_id: Option<CourseId>,
    pub activity_id: Option<ActivityId>,
    pub user_id: Option<UserId>,
}

impl Location {
    pub fn system() -> Self {
        Location::default()
    }

    pub fn category(id: CategoryId) -> Self {
        Location {
            category_id: Some(id),
            ..Default::default()
        }
    }

    pub fn course(id: CourseId) -> Self {
        Location {
            course_id: Some(id),
            ..Default::default()
        }
    }

    pub fn activity(course: CourseId, activity: ActivityId) -> Self {
        Location {
            course_id: Some(course),
            activity_id: Some(activity),
            ..Default::default()
        }
    }

    pub fn user(user: UserId, course: Option<CourseId>) -> Self {
        Location {
            user_id: Some(user),
            course_id: course,
            ..Default::default()
        }
    }

    /// Module > User > Course > Category > System.
    pub fn level(&self) -> ContextLevel {
        if let Some(activity_id) = self.activity_id {
            ContextLevel::Module {
                course_id: self.course_id,
                activity_id,
            }
        } else if let Some(user_id) = self.user_id {
            ContextLevel::User {
                course_id: self.course_id,
                user_id,
            }
        } else if let Some(course_id) = self.course_id {
            ContextLevel::Course(course_id)
        } else if let Some(category_id) = self.category_id {
            ContextLevel::Category(category_id)
        } else {
            ContextLevel::System
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContextLevel {
    System,
    Category(CategoryId),
    Course(CourseId),
    /// The course is looked up from the activity when it is not given.
    Module {
        course_id: Option<CourseId>,
        activity_id: ActivityId,
    },
    /// A user profile, optionally seen through a course.
    User {
        course_id: Option<CourseId>,
        user_id: UserId,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NavigationContext {
    pub viewer: Viewer,
    pub location: Location,
    /// Locator of the page being viewed; node actions are matched against it.
    pub active_url: Option<Locator>,
    /// Page type such as `grade-report`, used to pick the active course node.
    pub page_type: Option<String>,
    /// User whose parents may see a course without being enrolled in it.
    pub parent_check_user: Option<UserId>,
    /// Further users whose profiles are added to the navigation.
    pub extend_for_users: Vec<UserId>,
}

impl NavigationContext {
    pub fn new(viewer: Viewer, location: Location) -> Self {
        NavigationContext {
            viewer,
            location,
            ..Default::default()
        }
    }

    pub fn with_active_url(mut self, active_url: Locator) -> Self {
        self.active_url = Some(active_url);
        self
    }

    pub fn with_page_type(mut self, page_type: impl Into<String>) -> Self {
        self.page_type = Some(page_type.into());
        self
    }

    pub fn with_parent_check_user(mut self, user: UserId) -> Self {
        self.parent_check_user = Some(user);
        self
    }

    pub fn extend_for_user(mut self, user: UserId) -> Self {
        self.extend_for_users.push(user);
        self
    }

    pub fn level(&self) -> ContextLevel {
        self.location.level()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deepest_location_wins() {
        assert_eq!(Location::system().level(), ContextLevel::System);
        assert_eq!(Location::category(3).level(), ContextLevel::Category(3));
        let mut loc = Location::course(5);
        loc.category_id = Some(3);
        assert_eq!(loc.level(), ContextLevel::Course(5));
        assert_eq!(
            Location::activity(5, 42).level(),
            ContextLevel::Module {
                course_id: Some(5),
                activity_id: 42
            }
        );
        assert_eq!(
            Location::user(9, Some(5)).level(),
            ContextLevel::User {
                course_id: Some(5),
                user_id: 9
            }
        );
    }

    #[test]
    fn viewer_kinds() {
        assert!(!Viewer::Anonymous.is_logged_in());
        assert!(Viewer::Guest.is_logged_in());
        assert!(!Viewer::Guest.is_authenticated());
        assert_eq!(Viewer::User(4).user_id(), Some(4));
    }
}
