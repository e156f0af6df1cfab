//! Session-scoped memo of whether a course can be expanded by the current viewer.
//!
//! Deciding whether a course is expandable means an access check, which is too expensive to run
//! for every course on every request. The answer is cached per course id for the lifetime of the
//! session and only re-verified when the viewer navigates into the course, where the builder runs
//! a direct check and overwrites the entry.
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, sync::Arc};

use crate::nodekey::CourseId;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Expandability {
    #[default]
    Unknown,
    NotExpandable,
    Expandable,
}

impl Expandability {
    pub fn from_bool(expandable: bool) -> Self {
        if expandable {
            Expandability::Expandable
        } else {
            Expandability::NotExpandable
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Expandability::Unknown => None,
            Expandability::NotExpandable => Some(false),
            Expandability::Expandable => Some(true),
        }
    }
}

/// Key-value backing for an [ExpansionCache]. Implementations only need atomic get and set;
/// callers serialize concurrent builds of the same session themselves.
pub trait ExpansionStore: Send + Sync {
    fn get(&self, course: CourseId) -> Option<Expandability>;
    fn set(&self, course: CourseId, state: Expandability);
    fn clear(&self);
}

#[derive(Debug, Default)]
pub struct MemoryExpansionStore {
    entries: RwLock<BTreeMap<CourseId, Expandability>>,
}

impl ExpansionStore for MemoryExpansionStore {
    fn get(&self, course: CourseId) -> Option<Expandability> {
        self.entries.read().get(&course).copied()
    }

    fn set(&self, course: CourseId, state: Expandability) {
        self.entries.write().insert(course, state);
    }

    fn clear(&self) {
        self.entries.write().clear();
    }
}

/// Cheaply clonable handle; clones share the same store.
#[derive(Clone)]
pub struct ExpansionCache {
    store: Arc<dyn ExpansionStore>,
}

impl Default for ExpansionCache {
    fn default() -> Self {
        ExpansionCache::new(Arc::new(MemoryExpansionStore::default()))
    }
}

impl std::fmt::Debug for ExpansionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpansionCache").finish_non_exhaustive()
    }
}

impl ExpansionCache {
    pub fn new(store: Arc<dyn ExpansionStore>) -> Self {
        ExpansionCache { store }
    }

    pub fn get(&self, course: CourseId) -> Expandability {
        self.store.get(course).unwrap_or_default()
    }

    pub fn set(&self, course: CourseId, state: Expandability) {
        tracing::debug!("[ExpansionCache::set] course {course} -> {state:?}");
        self.store.set(course, state);
    }

    /// Cached answer for `course`, or the result of `compute` (which is then stored). `compute`
    /// runs without any lock held; when two callers race, the last write wins.
    pub fn get_or_compute<F>(&self, course: CourseId, compute: F) -> bool
    where
        F: FnOnce() -> bool,
    {
        if let Some(known) = self.get(course).as_bool() {
            return known;
        }
        let expandable = compute();
        self.set(course, Expandability::from_bool(expandable));
        expandable
    }

    pub fn clear(&self) {
        self.store.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn get_or_compute_runs_once() {
        let cache = ExpansionCache::default();
        let calls = Cell::new(0);
        let first = cache.get_or_compute(5, || {
            calls.set(calls.get() + 1);
            true
        });
        let second = cache.get_or_compute(5, || {
            calls.set(calls.get() + 1);
            false
        });
        assert!(first);
        assert!(second);
        assert_eq!(calls.get(), 1);
        assert_eq!(cache.get(5), Expandability::Expandable);
    }

    #[test]
    fn clones_share_state_and_set_overwrites() {
        let cache = ExpansionCache::default();
        let other = cache.clone();
        assert_eq!(other.get(9), Expandability::Unknown);
        cache.set(9, Expandability::Expandable);
        other.set(9, Expandability::NotExpandable);
        assert!(!cache.get_or_compute(9, || true));
        cache.clear();
        assert_eq!(other.get(9), Expandability::Unknown);
    }
}
