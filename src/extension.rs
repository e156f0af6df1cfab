//! Activity-type specific and site-wide navigation extensions.
//!
//! Extensions are registered explicitly against an activity module name (`forum`, `quiz`, ...).
//! An activity whose module has an extension is pre-marked as a branch, since the extension may
//! add children once the activity is loaded.
//!
//! ```
//! use navtree_core::{
//!     extension::{ExtensionRegistry, NavigationExtension},
//!     repository::{Activity, Course},
//!     tree::NavigationTree,
//!     NavigationError, NewNode, NodeId,
//! };
//!
//! struct ForumSubscriptions;
//!
//! impl NavigationExtension for ForumSubscriptions {
//!     fn extend_navigation(
//!         &self,
//!         tree: &mut NavigationTree,
//!         node: NodeId,
//!         _course: &Course,
//!         _activity: &Activity,
//!     ) -> Result<(), NavigationError> {
//!         tree.add_child(node, NewNode::new("Subscriptions").key("subscriptions"))?;
//!         Ok(())
//!     }
//! }
//!
//! let registry = ExtensionRegistry::default();
//! registry.register("forum", ForumSubscriptions);
//! assert!(registry.extends("forum"));
//! assert!(!registry.extends("quiz"));
//! ```
use parking_lot::RwLock;
use std::sync::Arc;

use crate::{
    context::NavigationContext,
    error::NavigationError,
    nodekey::NodeId,
    repository::{Activity, Course},
    tree::NavigationTree,
};

pub trait NavigationExtension: Send + Sync {
    /// Add nodes below the activity `node`. Called after the activity was made active.
    fn extend_navigation(
        &self,
        tree: &mut NavigationTree,
        node: NodeId,
        course: &Course,
        activity: &Activity,
    ) -> Result<(), NavigationError>;
}

/// Runs once per build, after every context branch was loaded.
pub trait GlobalExtension: Send + Sync {
    fn extend_global(
        &self,
        tree: &mut NavigationTree,
        context: &NavigationContext,
    ) -> Result<(), NavigationError>;
}

type ModuleExtensions = Vec<(String, Arc<dyn NavigationExtension>)>;

/// Shared, cheaply clonable registry. Clones see each other's registrations.
#[derive(Clone, Default)]
pub struct ExtensionRegistry {
    modules: Arc<RwLock<ModuleExtensions>>,
    globals: Arc<RwLock<Vec<(String, Arc<dyn GlobalExtension>)>>>,
}

impl std::fmt::Debug for ExtensionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionRegistry")
            .field("modules", &self.modules())
            .field(
                "globals",
                &self
                    .globals
                    .read()
                    .iter()
                    .map(|(name, _)| name.clone())
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl ExtensionRegistry {
    /// Register (or replace) the extension for `module`.
    pub fn register<T: NavigationExtension + 'static>(&self, module: impl Into<String>, ext: T) {
        let module = module.into();
        let mut writer = self.modules.write_arc();
        if let Some(entry) = writer.iter_mut().find(|(m, _)| m == &module) {
            tracing::debug!("[ExtensionRegistry::register] replacing extension for {module}");
            entry.1 = Arc::new(ext);
        } else {
            writer.push((module, Arc::new(ext)));
        }
    }

    pub fn register_global<T: GlobalExtension + 'static>(&self, name: impl Into<String>, ext: T) {
        let name = name.into();
        let mut writer = self.globals.write_arc();
        if let Some(entry) = writer.iter_mut().find(|(n, _)| n == &name) {
            entry.1 = Arc::new(ext);
        } else {
            writer.push((name, Arc::new(ext)));
        }
    }

    pub fn get(&self, module: &str) -> Option<Arc<dyn NavigationExtension>> {
        let reader = self.modules.read_arc();
        reader
            .iter()
            .find(|(m, _)| m == module)
            .map(|(_, ext)| ext.clone())
    }

    pub fn extends(&self, module: &str) -> bool {
        self.modules.read().iter().any(|(m, _)| m == module)
    }

    pub fn modules(&self) -> Vec<String> {
        self.modules.read().iter().map(|(m, _)| m.clone()).collect()
    }

    /// Registered global extensions in registration order.
    pub fn globals(&self) -> Vec<(String, Arc<dyn GlobalExtension>)> {
        self.globals.read().iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NewNode;

    struct Marker(&'static str);

    impl NavigationExtension for Marker {
        fn extend_navigation(
            &self,
            tree: &mut NavigationTree,
            node: NodeId,
            _course: &Course,
            _activity: &Activity,
        ) -> Result<(), NavigationError> {
            tree.add_child(node, NewNode::new(self.0).key(self.0))?;
            Ok(())
        }
    }

    #[test]
    fn registration_replaces_by_module() {
        let registry = ExtensionRegistry::default();
        let shared = registry.clone();
        registry.register("forum", Marker("first"));
        shared.register("forum", Marker("second"));
        registry.register("quiz", Marker("quiz"));
        assert_eq!(registry.modules(), vec!["forum".to_string(), "quiz".to_string()]);
        assert!(shared.extends("quiz"));
        assert!(registry.get("page").is_none());
    }
}
