//! Index construction.
//!
//! This module builds a fresh store from a root directory:
//! - `walk` - pre-order walk, classification and content hashing
//! - `exclude` - directory and extension filters
//! - `build` - build state and progress counters

mod build;
mod exclude;
mod walk;

pub use build::{
    unix_now_millis, zero_to_none, IndexBuildProgress, IndexBuildState, ProgressSnapshot,
};
pub use exclude::{path_is_excluded, should_exclude};
pub use walk::{create_index_entry, BuildSummary, IndexBuilder};
