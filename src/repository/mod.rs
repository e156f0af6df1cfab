//! Read-only access to the records the navigation is built from.
//!
//! The builder never talks to a database directly. Everything it needs (courses, categories,
//! sections, activities, enrolments, users) comes through the [Repository] trait. Calls are
//! synchronous, idempotent reads; retries and timeouts are the implementation's business.
use serde::{Deserialize, Serialize};

use crate::{
    error::NavigationError,
    nodekey::{ActivityId, CategoryId, CourseId, SectionId, UserId},
};

mod memory;

pub use memory::{Dataset, Enrolment, MemoryRepository};

/// Where a course sits on the viewer's timeline. Only in-progress courses make it into the flat
/// navigation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CourseTimeline {
    Past,
    #[default]
    InProgress,
    Future,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub id: CourseId,
    /// Owning category. The site course belongs to none (`0`).
    #[serde(default)]
    pub category: CategoryId,
    pub short_name: String,
    pub full_name: String,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default)]
    pub sort_order: i64,
    /// Number of numbered sections to show; sections beyond it are trimmed. `None` shows all.
    #[serde(default)]
    pub num_sections: Option<u32>,
    #[serde(default)]
    pub timeline: CourseTimeline,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    /// `0` for top-level categories.
    #[serde(default)]
    pub parent: CategoryId,
    pub name: String,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default)]
    pub sort_order: i64,
    /// Root-to-leaf ancestry including the category itself. Filled in by the repository.
    #[serde(default)]
    pub path: Vec<CategoryId>,
}

impl Category {
    pub fn depth(&self) -> usize {
        self.path.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub id: SectionId,
    pub course: CourseId,
    /// Position within the course; `0` is the general section.
    pub number: u32,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default = "default_true")]
    pub available: bool,
    /// Whether the current viewer may see the section at all.
    #[serde(default = "default_true")]
    pub user_visible: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub id: ActivityId,
    pub course: CourseId,
    pub section: SectionId,
    /// Number of the section the activity is placed in.
    pub section_number: u32,
    /// Activity type, e.g. `forum` or `quiz`. Selects the navigation extension.
    pub module: String,
    pub name: String,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default = "default_true")]
    pub visible_on_course_page: bool,
    /// Activities without a view page (labels) are never linked.
    #[serde(default = "default_true")]
    pub has_view_page: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub full_name: String,
}

fn default_true() -> bool {
    true
}

pub trait Repository: Send + Sync {
    /// The front page course. Every build needs it.
    fn site_course(&self) -> Result<Course, NavigationError>;

    fn get_course(&self, id: CourseId) -> Result<Course, NavigationError>;

    /// Courses in sort order, site course excluded.
    fn list_courses(&self, limit: Option<usize>) -> Result<Vec<Course>, NavigationError>;

    fn get_category(&self, id: CategoryId) -> Result<Category, NavigationError>;

    /// Root-to-leaf ids ending with `id`.
    fn get_category_path(&self, id: CategoryId) -> Result<Vec<CategoryId>, NavigationError>;

    /// Children of `parent` in sort order; `None` lists the top-level categories.
    fn get_categories_by_parent(
        &self,
        parent: Option<CategoryId>,
    ) -> Result<Vec<Category>, NavigationError>;

    fn count_categories(&self) -> Result<usize, NavigationError>;

    /// Upper bound for the length of any category path.
    fn max_category_depth(&self) -> Result<usize, NavigationError>;

    fn count_courses_in_category(&self, id: CategoryId) -> Result<usize, NavigationError>;

    /// Courses of a category in sort order, `offset` skipped, at most `limit` returned.
    fn get_courses_by_category(
        &self,
        id: CategoryId,
        limit: Option<usize>,
        offset: usize,
    ) -> Result<Vec<Course>, NavigationError>;

    fn get_course_sections(&self, course: CourseId) -> Result<Vec<Section>, NavigationError>;

    fn get_section_activities(&self, section: SectionId)
        -> Result<Vec<Activity>, NavigationError>;

    fn get_activity(&self, id: ActivityId) -> Result<Activity, NavigationError>;

    /// Courses `user` is enrolled in, in sort order.
    fn get_enrolled_courses(&self, user: UserId) -> Result<Vec<Course>, NavigationError>;

    fn get_user(&self, id: UserId) -> Result<User, NavigationError>;
}
