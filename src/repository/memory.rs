use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, path::Path};

use super::{Activity, Category, Course, Repository, Section, User};
use crate::{
    error::NavigationError,
    nodekey::{ActivityId, CategoryId, CourseId, SectionId, UserId},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrolment {
    pub user: UserId,
    pub course: CourseId,
}

/// Serializable snapshot of a site, the input of [MemoryRepository].
///
/// ```toml
/// [site]
/// id = 1
/// short_name = "lms"
/// full_name = "Example LMS"
///
/// [[categories]]
/// id = 1
/// name = "Science"
///
/// [[courses]]
/// id = 5
/// category = 1
/// short_name = "PHY101"
/// full_name = "Physics"
///
/// [[enrolments]]
/// user = 2
/// course = 5
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub site: Course,
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub courses: Vec<Course>,
    #[serde(default)]
    pub sections: Vec<Section>,
    #[serde(default)]
    pub activities: Vec<Activity>,
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub enrolments: Vec<Enrolment>,
    /// Overrides the depth computed from the category tree.
    #[serde(default)]
    pub max_category_depth: Option<usize>,
}

/// [Repository] over an in-memory [Dataset]. Category paths are resolved on demand by walking
/// parent links, so inconsistent hierarchies surface as [NavigationError::Configuration] when they
/// are asked for.
#[derive(Debug, Clone)]
pub struct MemoryRepository {
    site: Course,
    categories: BTreeMap<CategoryId, Category>,
    courses: BTreeMap<CourseId, Course>,
    sections: BTreeMap<SectionId, Section>,
    activities: BTreeMap<ActivityId, Activity>,
    users: BTreeMap<UserId, User>,
    enrolments: Vec<Enrolment>,
    max_category_depth: Option<usize>,
}

impl MemoryRepository {
    pub fn new(dataset: Dataset) -> Self {
        let Dataset {
            site,
            categories,
            courses,
            sections,
            activities,
            users,
            enrolments,
            max_category_depth,
        } = dataset;
        MemoryRepository {
            site,
            categories: categories.into_iter().map(|c| (c.id, c)).collect(),
            courses: courses.into_iter().map(|c| (c.id, c)).collect(),
            sections: sections.into_iter().map(|s| (s.id, s)).collect(),
            activities: activities.into_iter().map(|a| (a.id, a)).collect(),
            users: users.into_iter().map(|u| (u.id, u)).collect(),
            enrolments,
            max_category_depth,
        }
    }

    pub fn from_toml(source: &str) -> Result<Self, NavigationError> {
        let dataset: Dataset = toml::from_str(source)?;
        Ok(Self::new(dataset))
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, NavigationError> {
        let source = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&source)
    }

    fn resolve_path(&self, id: CategoryId) -> Result<Vec<CategoryId>, NavigationError> {
        let mut path = Vec::new();
        let mut cursor = id;
        while cursor != 0 {
            if path.contains(&cursor) {
                return Err(NavigationError::configuration(format!(
                    "category {id} has a cycle in its ancestry at {cursor}"
                )));
            }
            let category = self.categories.get(&cursor).ok_or_else(|| {
                if cursor == id {
                    NavigationError::not_found(format!("category {id}"))
                } else {
                    NavigationError::configuration(format!(
                        "category {id} references missing ancestor {cursor}"
                    ))
                }
            })?;
            path.push(cursor);
            cursor = category.parent;
        }
        path.reverse();
        Ok(path)
    }

    fn sorted_courses<'a>(&self, courses: impl Iterator<Item = &'a Course>) -> Vec<Course> {
        let mut courses: Vec<Course> = courses.cloned().collect();
        courses.sort_by_key(|c| (c.sort_order, c.id));
        courses
    }
}

impl Repository for MemoryRepository {
    fn site_course(&self) -> Result<Course, NavigationError> {
        Ok(self.site.clone())
    }

    fn get_course(&self, id: CourseId) -> Result<Course, NavigationError> {
        if id == self.site.id {
            return Ok(self.site.clone());
        }
        self.courses
            .get(&id)
            .cloned()
            .ok_or_else(|| NavigationError::not_found(format!("course {id}")))
    }

    fn list_courses(&self, limit: Option<usize>) -> Result<Vec<Course>, NavigationError> {
        let mut courses = self.sorted_courses(self.courses.values().filter(|c| c.id != self.site.id));
        if let Some(limit) = limit {
            courses.truncate(limit);
        }
        Ok(courses)
    }

    fn get_category(&self, id: CategoryId) -> Result<Category, NavigationError> {
        let mut category = self
            .categories
            .get(&id)
            .cloned()
            .ok_or_else(|| NavigationError::not_found(format!("category {id}")))?;
        category.path = self.resolve_path(id).unwrap_or_default();
        Ok(category)
    }

    fn get_category_path(&self, id: CategoryId) -> Result<Vec<CategoryId>, NavigationError> {
        self.resolve_path(id)
    }

    fn get_categories_by_parent(
        &self,
        parent: Option<CategoryId>,
    ) -> Result<Vec<Category>, NavigationError> {
        let parent = parent.unwrap_or(0);
        let mut children: Vec<Category> = self
            .categories
            .values()
            .filter(|c| c.parent == parent)
            .map(|c| {
                let mut c = c.clone();
                c.path = self.resolve_path(c.id).unwrap_or_default();
                c
            })
            .collect();
        children.sort_by_key(|c| (c.sort_order, c.id));
        Ok(children)
    }

    fn count_categories(&self) -> Result<usize, NavigationError> {
        Ok(self.categories.len())
    }

    fn max_category_depth(&self) -> Result<usize, NavigationError> {
        if let Some(depth) = self.max_category_depth {
            return Ok(depth);
        }
        Ok(self
            .categories
            .keys()
            .filter_map(|id| self.resolve_path(*id).ok())
            .map(|path| path.len())
            .max()
            .unwrap_or(0))
    }

    fn count_courses_in_category(&self, id: CategoryId) -> Result<usize, NavigationError> {
        Ok(self.courses.values().filter(|c| c.category == id).count())
    }

    fn get_courses_by_category(
        &self,
        id: CategoryId,
        limit: Option<usize>,
        offset: usize,
    ) -> Result<Vec<Course>, NavigationError> {
        let courses = self.sorted_courses(self.courses.values().filter(|c| c.category == id));
        Ok(courses
            .into_iter()
            .skip(offset)
            .take(limit.unwrap_or(usize::MAX))
            .collect())
    }

    fn get_course_sections(&self, course: CourseId) -> Result<Vec<Section>, NavigationError> {
        self.get_course(course)?;
        let mut sections: Vec<Section> = self
            .sections
            .values()
            .filter(|s| s.course == course)
            .cloned()
            .collect();
        sections.sort_by_key(|s| s.number);
        Ok(sections)
    }

    fn get_section_activities(
        &self,
        section: SectionId,
    ) -> Result<Vec<Activity>, NavigationError> {
        Ok(self
            .activities
            .values()
            .filter(|a| a.section == section)
            .cloned()
            .collect())
    }

    fn get_activity(&self, id: ActivityId) -> Result<Activity, NavigationError> {
        self.activities
            .get(&id)
            .cloned()
            .ok_or_else(|| NavigationError::not_found(format!("activity {id}")))
    }

    fn get_enrolled_courses(&self, user: UserId) -> Result<Vec<Course>, NavigationError> {
        let enrolled = self
            .enrolments
            .iter()
            .filter(|e| e.user == user)
            .filter_map(|e| self.courses.get(&e.course));
        Ok(self.sorted_courses(enrolled))
    }

    fn get_user(&self, id: UserId) -> Result<User, NavigationError> {
        self.users
            .get(&id)
            .cloned()
            .ok_or_else(|| NavigationError::not_found(format!("user {id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SITE: &str = r#"
        [site]
        id = 1
        short_name = "lms"
        full_name = "Example LMS"

        [[categories]]
        id = 1
        name = "Science"

        [[categories]]
        id = 2
        parent = 1
        name = "Physics"

        [[categories]]
        id = 3
        parent = 4
        name = "Loop A"

        [[categories]]
        id = 4
        parent = 3
        name = "Loop B"

        [[categories]]
        id = 5
        parent = 99
        name = "Orphan"

        [[courses]]
        id = 10
        category = 2
        short_name = "B"
        full_name = "Second"
        sort_order = 2

        [[courses]]
        id = 11
        category = 2
        short_name = "A"
        full_name = "First"
        sort_order = 1

        [[enrolments]]
        user = 7
        course = 10
    "#;

    #[test]
    fn paths_and_hierarchy_errors() {
        let repo = MemoryRepository::from_toml(SITE).unwrap();
        assert_eq!(repo.get_category_path(2).unwrap(), vec![1, 2]);
        assert_eq!(repo.get_category(2).unwrap().depth(), 2);
        assert!(matches!(
            repo.get_category_path(3),
            Err(NavigationError::Configuration(_))
        ));
        assert!(matches!(
            repo.get_category_path(5),
            Err(NavigationError::Configuration(_))
        ));
        assert!(repo.get_category_path(42).unwrap_err().is_not_found());
        assert_eq!(repo.max_category_depth().unwrap(), 2);
    }

    #[test]
    fn courses_are_sorted_and_paged() {
        let repo = MemoryRepository::from_toml(SITE).unwrap();
        let ids = |courses: Vec<Course>| courses.iter().map(|c| c.id).collect::<Vec<_>>();
        assert_eq!(ids(repo.get_courses_by_category(2, None, 0).unwrap()), vec![11, 10]);
        assert_eq!(ids(repo.get_courses_by_category(2, Some(1), 1).unwrap()), vec![10]);
        assert_eq!(repo.count_courses_in_category(2).unwrap(), 2);
        assert_eq!(ids(repo.get_enrolled_courses(7).unwrap()), vec![10]);
        assert_eq!(repo.get_course(1).unwrap().short_name, "lms");
        assert!(repo.get_course(404).unwrap_err().is_not_found());
    }
}
