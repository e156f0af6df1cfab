//! Shared test utilities for integration tests.
//!
//! Import from integration test files as:
//! ```ignore
//! mod common;
//! ```

use std::{path::PathBuf, sync::Arc};

use navtree_core::{
    access::StaticAccessPolicy,
    builder::Services,
    repository::{Dataset, MemoryRepository},
};
use tempfile::TempDir;

/// Initialize tracing for tests, respecting RUST_LOG env var.
///
/// Safe to call multiple times; later calls are no-ops.
#[allow(dead_code)]
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .ok();
}

/// Science (1) > Physics (2) > PHY101 (5), Science > CHEM101 (6), Arts (3) > ART101 (7).
/// Alice (2) takes PHY101 and CHEM101.
#[allow(dead_code)]
pub const SITE: &str = r#"
[site]
id = 1
short_name = "lms"
full_name = "Example LMS"

[[categories]]
id = 1
name = "Science"
sort_order = 1

[[categories]]
id = 2
parent = 1
name = "Physics"

[[categories]]
id = 3
name = "Arts"
sort_order = 2

[[courses]]
id = 5
category = 2
short_name = "PHY101"
full_name = "Introduction to Physics"
sort_order = 1

[[courses]]
id = 6
category = 1
short_name = "CHEM101"
full_name = "Chemistry"
sort_order = 2

[[courses]]
id = 7
category = 3
short_name = "ART101"
full_name = "Drawing"
sort_order = 3

[[sections]]
id = 100
course = 1
number = 0

[[sections]]
id = 50
course = 5
number = 0

[[sections]]
id = 51
course = 5
number = 1
name = "Week 1"

[[activities]]
id = 900
course = 1
section = 100
section_number = 0
module = "forum"
name = "Site news"

[[activities]]
id = 42
course = 5
section = 51
section_number = 1
module = "quiz"
name = "Midterm"

[[activities]]
id = 43
course = 5
section = 51
section_number = 1
module = "page"
name = "Reading list"

[[users]]
id = 2
full_name = "Alice Student"

[[enrolments]]
user = 2
course = 5

[[enrolments]]
user = 2
course = 6
"#;

/// Categories 3 and 4 are each other's parent. Alice (2) takes course 20 but not course 21.
#[allow(dead_code)]
pub const CYCLIC_SITE: &str = r#"
[site]
id = 1
short_name = "lms"
full_name = "Example LMS"

[[categories]]
id = 1
name = "Science"

[[categories]]
id = 3
parent = 4
name = "Loop A"

[[categories]]
id = 4
parent = 3
name = "Loop B"

[[courses]]
id = 20
category = 3
short_name = "LOOP"
full_name = "Stuck in a loop"

[[courses]]
id = 21
category = 3
short_name = "LOOP2"
full_name = "Also stuck"

[[users]]
id = 2
full_name = "Alice Student"

[[enrolments]]
user = 2
course = 20
"#;

#[allow(dead_code)]
pub fn dataset(source: &str) -> Dataset {
    toml::from_str(source).unwrap()
}

/// Services over `dataset` where users can only enter the courses they are enrolled in.
#[allow(dead_code)]
pub fn services_for(dataset: Dataset) -> Services {
    let access = StaticAccessPolicy::from_enrolments(&dataset.enrolments);
    services_with(dataset, access)
}

#[allow(dead_code)]
pub fn services_with(dataset: Dataset, access: StaticAccessPolicy) -> Services {
    Services::new(Arc::new(MemoryRepository::new(dataset)), Arc::new(access))
}

/// Write `contents` to `name` inside the temp dir and return the path.
#[allow(dead_code)]
pub fn write_file(temp_dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = temp_dir.path().join(name);
    std::fs::write(&path, contents).unwrap();
    path
}
