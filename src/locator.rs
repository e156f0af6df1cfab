//! Action locators: the comparable "where does this node lead" value attached to navigation nodes.
//!
//! A [Locator] is an origin-relative path, a sorted parameter map and an optional anchor. The
//! builder never inspects locators beyond comparing them with the tree's current locator through
//! [Locator::matches], which is what active-node resolution is built on.
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fmt::{Display, Formatter},
    str::FromStr,
};
use url::{form_urlencoded, Url};

use crate::{
    error::NavigationError,
    nodekey::{ActivityId, CategoryId, CourseId, UserId},
};

/// Base used to resolve origin-relative locators. Never leaks into a [Locator].
const RELATIVE_ORIGIN: &str = "navtree://local/";

/// Parameters that identify a session rather than a page.
const IGNORED_PARAMS: &[&str] = &["sesskey"];

/// How closely two locators have to agree to be considered the same page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MatchStrength {
    /// Same path, same parameters (both ways), same anchor.
    Exact,
    /// Same path, and every parameter of the node's locator is present in the current locator
    /// with the same value.
    Params,
    /// Same path only.
    Base,
}

impl MatchStrength {
    /// The fallback order used when nothing was marked active during construction.
    pub fn loosening() -> [MatchStrength; 3] {
        [MatchStrength::Exact, MatchStrength::Params, MatchStrength::Base]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Locator {
    /// Scheme and authority for absolute locators, e.g. `https://lms.example.org`.
    origin: Option<String>,
    path: String,
    params: BTreeMap<String, String>,
    anchor: Option<String>,
}

impl Locator {
    pub fn new(path: impl Into<String>) -> Self {
        let mut path = path.into();
        if !path.starts_with('/') {
            path.insert(0, '/');
        }
        Locator {
            path,
            ..Default::default()
        }
    }

    pub fn parse(input: &str) -> Result<Self, NavigationError> {
        let (url, origin) = match Url::parse(input) {
            Ok(url) => {
                let origin = url.origin().ascii_serialization();
                (url, Some(origin))
            }
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                (Url::parse(RELATIVE_ORIGIN)?.join(input)?, None)
            }
            Err(e) => return Err(e.into()),
        };
        let params = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        Ok(Locator {
            origin,
            path: url.path().to_string(),
            params,
            anchor: url.fragment().map(str::to_string),
        })
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.params.insert(key.into(), value.to_string());
        self
    }

    pub fn with_anchor(mut self, anchor: impl Into<String>) -> Self {
        self.anchor = Some(anchor.into());
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    pub fn anchor(&self) -> Option<&str> {
        self.anchor.as_deref()
    }

    /// The path with a trailing `/` expanded to `/index.php`, so directory locators and their index
    /// pages compare equal.
    fn normalized_path(&self) -> String {
        if self.path.ends_with('/') {
            format!("{}index.php", self.path)
        } else {
            self.path.clone()
        }
    }

    fn significant_params(&self) -> impl Iterator<Item = (&String, &String)> {
        self.params
            .iter()
            .filter(|(k, _)| !IGNORED_PARAMS.contains(&k.as_str()))
    }

    fn params_subset_of(&self, other: &Locator) -> bool {
        self.significant_params()
            .all(|(k, v)| other.params.get(k) == Some(v))
    }

    /// Compare `self` (a node's action) against `current` (the page being viewed).
    pub fn matches(&self, current: &Locator, strength: MatchStrength) -> bool {
        if self.origin.is_some() && current.origin.is_some() && self.origin != current.origin {
            return false;
        }
        if self.normalized_path() != current.normalized_path() {
            return false;
        }
        match strength {
            MatchStrength::Base => true,
            MatchStrength::Params => self.params_subset_of(current),
            MatchStrength::Exact => {
                self.params_subset_of(current)
                    && current.params_subset_of(self)
                    && self.anchor == current.anchor
            }
        }
    }
}

impl FromStr for Locator {
    type Err = NavigationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Locator::parse(s)
    }
}

impl Display for Locator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if let Some(origin) = &self.origin {
            write!(f, "{origin}")?;
        }
        write!(f, "{}", self.path)?;
        if !self.params.is_empty() {
            let query = form_urlencoded::Serializer::new(String::new())
                .extend_pairs(self.params.iter())
                .finish();
            write!(f, "?{query}")?;
        }
        if let Some(anchor) = &self.anchor {
            write!(f, "#{anchor}")?;
        }
        Ok(())
    }
}

/// The pages the builder links nodes to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resource {
    SiteHome,
    Dashboard,
    MyCourses,
    CourseIndex,
    Category(CategoryId),
    Course(CourseId),
    Section { course: CourseId, number: u32 },
    Activity { module: String, id: ActivityId },
    UserProfile { user: UserId, course: Option<CourseId> },
    Participants(CourseId),
    Blogs { course: Option<CourseId> },
    Badges { course: Option<CourseId> },
    Notes { course: CourseId },
    Tags,
    Search,
    Grades(CourseId),
    Competencies(CourseId),
    PrivateFiles,
    ContentBank { course: CourseId },
    Messages,
}

/// Produces action locators for [Resource]s. Implementations must be deterministic: two calls with
/// equal arguments must produce locators that match each other with [MatchStrength::Exact].
pub trait LocatorFactory: Send + Sync {
    fn locate(&self, resource: &Resource, params: &[(&str, String)]) -> Locator;
}

/// Maps resources onto the conventional LMS page paths (`/course/view.php?id=..` and friends).
#[derive(Debug, Clone, Default)]
pub struct PathLocatorFactory;

impl LocatorFactory for PathLocatorFactory {
    fn locate(&self, resource: &Resource, params: &[(&str, String)]) -> Locator {
        let loc = match resource {
            Resource::SiteHome => Locator::new("/"),
            Resource::Dashboard => Locator::new("/my/"),
            Resource::MyCourses => Locator::new("/my/courses.php"),
            Resource::CourseIndex => Locator::new("/course/index.php"),
            Resource::Category(id) => Locator::new("/course/index.php").with_param("categoryid", id),
            Resource::Course(id) => Locator::new("/course/view.php").with_param("id", id),
            Resource::Section { course, number } => Locator::new("/course/view.php")
                .with_param("id", course)
                .with_anchor(format!("section-{number}")),
            Resource::Activity { module, id } => {
                Locator::new(format!("/mod/{module}/view.php")).with_param("id", id)
            }
            Resource::UserProfile { user, course } => match course {
                Some(course) => Locator::new("/user/view.php")
                    .with_param("id", user)
                    .with_param("course", course),
                None => Locator::new("/user/profile.php").with_param("id", user),
            },
            Resource::Participants(course) => {
                Locator::new("/user/index.php").with_param("id", course)
            }
            Resource::Blogs { course } => match course {
                Some(course) => Locator::new("/blog/index.php").with_param("courseid", course),
                None => Locator::new("/blog/index.php"),
            },
            Resource::Badges { course } => match course {
                Some(course) => Locator::new("/badges/view.php")
                    .with_param("type", 2)
                    .with_param("id", course),
                None => Locator::new("/badges/view.php").with_param("type", 1),
            },
            Resource::Notes { course } => Locator::new("/notes/index.php")
                .with_param("filtertype", "course")
                .with_param("filterselect", course),
            Resource::Tags => Locator::new("/tag/search.php"),
            Resource::Search => Locator::new("/search/index.php"),
            Resource::Grades(course) => {
                Locator::new("/grade/report/index.php").with_param("id", course)
            }
            Resource::Competencies(course) => {
                Locator::new("/admin/tool/lp/coursecompetencies.php").with_param("courseid", course)
            }
            Resource::PrivateFiles => Locator::new("/user/files.php"),
            Resource::ContentBank { course } => {
                Locator::new("/contentbank/index.php").with_param("contextid", course)
            }
            Resource::Messages => Locator::new("/message/index.php"),
        };
        params
            .iter()
            .fold(loc, |loc, (k, v)| loc.with_param(*k, v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_relative_and_absolute() {
        let rel = Locator::parse("/course/view.php?id=5#section-2").unwrap();
        assert_eq!(rel.path(), "/course/view.php");
        assert_eq!(rel.param("id"), Some("5"));
        assert_eq!(rel.anchor(), Some("section-2"));
        assert_eq!(rel.to_string(), "/course/view.php?id=5#section-2");

        let abs = Locator::parse("https://lms.example.org/my/").unwrap();
        assert_eq!(abs.path(), "/my/");
        assert_eq!(abs.to_string(), "https://lms.example.org/my/");
    }

    #[test]
    fn match_strengths() {
        let node = Locator::new("/course/view.php").with_param("id", 5);
        let current = Locator::parse("/course/view.php?id=5&section=2").unwrap();
        assert!(!node.matches(&current, MatchStrength::Exact));
        assert!(node.matches(&current, MatchStrength::Params));
        assert!(node.matches(&current, MatchStrength::Base));

        let other_course = Locator::parse("/course/view.php?id=6").unwrap();
        assert!(!node.matches(&other_course, MatchStrength::Params));
        assert!(node.matches(&other_course, MatchStrength::Base));
    }

    #[test]
    fn sesskey_is_ignored_and_index_is_implicit() {
        let node = Locator::new("/my/");
        let current = Locator::parse("/my/index.php?sesskey=abc").unwrap();
        assert!(node.matches(&current, MatchStrength::Exact));
    }

    #[test]
    fn anchors_only_matter_for_exact() {
        let section = PathLocatorFactory.locate(&Resource::Section { course: 5, number: 1 }, &[]);
        let course = PathLocatorFactory.locate(&Resource::Course(5), &[]);
        assert!(!section.matches(&course, MatchStrength::Exact));
        assert!(section.matches(&course, MatchStrength::Params));
    }

    #[test]
    fn param_values_are_encoded() {
        let loc = Locator::new("/search/index.php")
            .with_param("q", "rock & roll #1")
            .with_param("id", 3);
        let printed = loc.to_string();
        assert_eq!(printed, "/search/index.php?id=3&q=rock+%26+roll+%231");
        let back = Locator::parse(&printed).unwrap();
        assert_eq!(back, loc);
        assert!(back.matches(&loc, MatchStrength::Exact));
    }

    #[test]
    fn extra_params_are_appended() {
        let loc = PathLocatorFactory.locate(&Resource::Course(5), &[("section", "3".to_string())]);
        assert_eq!(loc.to_string(), "/course/view.php?id=5&section=3");
    }
}
