//! # navtree-core
//!
//! Builds the global navigation of a learning management site: a tree of links rooted at the
//! site home, holding the viewer's courses, the course catalogue, the course being viewed down to
//! its sections and activities, and profile links.
//!
//! ## Overview
//!
//! A [TreeBuilder] reads records through the [repository::Repository] trait, asks an
//! [access::AccessPolicy] what the viewer may see, and produces a [NavigationTree] for one
//! [context::NavigationContext]. Large branches are not materialized eagerly: they are flagged
//! expandable, listed by [NavigationTree::find_expandable], and filled later by a narrow
//! [TreeBuilder::expand] pass that [NavigationTree::splice_branch] grafts into place.
//!
//! ### Key Features
//!
//! - **Arena storage**: nodes live in one `Vec` and address each other by [NodeId]
//! - **Active node resolution**: node actions are matched against the current locator with
//!   decreasing strictness ([locator::MatchStrength])
//! - **Expansion cache**: whether a course can be expanded is remembered per session in a
//!   shared [cache::ExpansionCache]
//! - **Error tolerance**: failed branches are skipped and reported as [TreeDiagnostic]s instead
//!   of failing the build
//! - **Extensions**: activity modules hook into their activity node through an
//!   [extension::ExtensionRegistry]
//!
//! ## Architecture
//!
//! - **[`tree`]**: [NavigationTree], the arena, and every operation that walks it
//! - **[`node`]** / **[`collection`]**: single nodes and their ordered, keyed children
//! - **[`builder`]**: [TreeBuilder] and the [builder::Services] it consults
//! - **[`flat`]**: the one-level [flat::FlatNavigation] derived from a built tree
//! - **[`repository`]**, **[`access`]**, **[`format`]**, **[`locator`]**: the seams to the host
//!   application, each with a self-contained default implementation
//! - **[`config`]**: [config::NavigationConfig] and the TOML [config::ConfigProvider]
//!
//! ## Quick Start
//!
//! ```rust
//! use navtree_core::{
//!     access::StaticAccessPolicy,
//!     builder::{Services, TreeBuilder},
//!     cache::ExpansionCache,
//!     config::NavigationConfig,
//!     context::{Location, NavigationContext, Viewer},
//!     repository::MemoryRepository,
//! };
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), navtree_core::NavigationError> {
//! let repository = MemoryRepository::from_toml(
//!     r#"
//!     [site]
//!     id = 1
//!     short_name = "lms"
//!     full_name = "Example LMS"
//!
//!     [[courses]]
//!     id = 5
//!     short_name = "PHY101"
//!     full_name = "Physics"
//!
//!     [[enrolments]]
//!     user = 2
//!     course = 5
//!     "#,
//! )?;
//! let services = Services::new(Arc::new(repository), Arc::new(StaticAccessPolicy::allow_all()));
//! let context = NavigationContext::new(Viewer::User(2), Location::system());
//! let cache = ExpansionCache::default();
//!
//! let mut tree = TreeBuilder::new(services, NavigationConfig::default(), context, cache).build()?;
//! assert!(tree.built_in_test().is_empty());
//!
//! // Branches the client should fetch lazily.
//! for branch in tree.find_expandable() {
//!     println!("{} -> {:?}", branch.id, branch.node_type);
//! }
//! println!("{}", tree.outline()?);
//! # Ok(())
//! # }
//! ```
//!
//! ### Working with Diagnostics
//!
//! Nothing short of a missing site course fails a build. Everything else is recorded on the tree:
//!
//! ```rust,no_run
//! # use navtree_core::{tree::NavigationTree, TreeDiagnostic};
//! # fn report(tree: &NavigationTree) {
//! for diagnostic in tree.diagnostics() {
//!     match diagnostic {
//!         TreeDiagnostic::Configuration(message) => eprintln!("fix the categories: {message}"),
//!         other => eprintln!("{other}"),
//!     }
//! }
//! # }
//! ```

pub mod access;
pub mod builder;
pub mod cache;
pub mod collection;
pub mod config;
pub mod context;
pub mod diagnostic;
pub mod error;
pub mod extension;
pub mod flat;
pub mod format;
pub mod locator;
pub mod node;
pub mod nodekey;
pub mod properties;
pub mod repository;
#[cfg(test)]
mod tests;
pub mod tree;

pub use builder::{ExpandRequest, Services, TreeBuilder};
pub use diagnostic::TreeDiagnostic;
pub use error::*;
pub use node::{NewNode, Node};
pub use nodekey::{NodeId, NodeKey};
pub use tree::NavigationTree;
