//! Display-string formatting and UI string lookup.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::nodekey::{ActivityId, CategoryId, CourseId, UserId};

/// The entity a display name belongs to. Formatters may apply per-context filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormatContext {
    System,
    Category(CategoryId),
    Course(CourseId),
    Activity(ActivityId),
    User(UserId),
}

pub trait Formatter: Send + Sync {
    /// Localize/escape a name stored in the repository.
    fn format_display_name(&self, raw: &str, context: FormatContext) -> String;

    /// Look up a UI string by identifier (`mycourses`, `participants`, ...).
    fn string(&self, identifier: &str) -> String;
}

const ENGLISH: &[(&str, &str)] = &[
    ("badges", "Badges"),
    ("blogssite", "Site blogs"),
    ("blogscourse", "Course blogs"),
    ("categoryhidden", "Category hidden"),
    ("competencies", "Competencies"),
    ("contentbank", "Content bank"),
    ("coursebadges", "Badges"),
    ("courses", "Courses"),
    ("currentcourse", "Current course"),
    ("general", "General"),
    ("grades", "Grades"),
    ("home", "Home"),
    ("messages", "Messages"),
    ("morenavigationlinks", "More..."),
    ("mycourses", "My courses"),
    ("myhome", "Dashboard"),
    ("notes", "Notes"),
    ("participants", "Participants"),
    ("privatefiles", "Private files"),
    ("profile", "Profile"),
    ("search", "Search"),
    ("section", "Section"),
    ("site", "Site"),
    ("sitebadges", "Site badges"),
    ("sitehome", "Site home"),
    ("sitepages", "Site pages"),
    ("tags", "Tags"),
    ("unknowncourse", "Unknown course"),
    ("user", "User"),
    ("users", "Users"),
    ("viewallcourses", "View all courses"),
    ("viewprofile", "View profile"),
];

/// Passes names through (trimmed) and resolves strings from a built-in English table, with
/// per-identifier overrides. Unknown identifiers render as `[[identifier]]`.
#[derive(Debug, Clone, Default)]
pub struct PlainFormatter {
    overrides: BTreeMap<String, String>,
}

impl PlainFormatter {
    pub fn with_string(mut self, identifier: impl Into<String>, text: impl Into<String>) -> Self {
        self.overrides.insert(identifier.into(), text.into());
        self
    }
}

impl Formatter for PlainFormatter {
    fn format_display_name(&self, raw: &str, _context: FormatContext) -> String {
        raw.trim().to_string()
    }

    fn string(&self, identifier: &str) -> String {
        if let Some(text) = self.overrides.get(identifier) {
            return text.clone();
        }
        ENGLISH
            .iter()
            .find(|(id, _)| *id == identifier)
            .map(|(_, text)| text.to_string())
            .unwrap_or_else(|| format!("[[{identifier}]]"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strings_and_overrides() {
        let formatter = PlainFormatter::default().with_string("mycourses", "Meine Kurse");
        assert_eq!(formatter.string("mycourses"), "Meine Kurse");
        assert_eq!(formatter.string("participants"), "Participants");
        assert_eq!(formatter.string("nope"), "[[nope]]");
        assert_eq!(
            formatter.format_display_name("  Physics ", FormatContext::Course(5)),
            "Physics"
        );
    }
}
