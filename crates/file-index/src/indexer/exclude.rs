//! Inclusion and exclusion rules applied while walking.

use std::path::Path;

use crate::classify::split_extension;
use crate::config::IndexConfig;
use crate::types::{DirectoryEntry, EntryType};

/// Returns true if `path` equals or lies under one of the absolute entries
/// of `excluded`.
pub fn path_is_excluded(excluded: &[String], path: &Path) -> bool {
    excluded
        .iter()
        .map(Path::new)
        .filter(|candidate| candidate.is_absolute())
        .any(|excluded| path == excluded || path.starts_with(excluded))
}

/// Returns true if the child at `path` must not be indexed.
///
/// Anything under an absolute entry of `excluded_directories` is excluded.
/// Directories are also matched by name. Files are matched by extension, and
/// must carry an included extension when that list is set.
pub fn should_exclude(config: &IndexConfig, path: &Path, child: &DirectoryEntry) -> bool {
    if path_is_excluded(&config.excluded_directories, path) {
        return true;
    }
    match child.entry_type {
        EntryType::Directory => config
            .excluded_directories
            .iter()
            .any(|excluded| excluded == &child.name),
        EntryType::File => {
            let extension = split_extension(&child.name);
            if contains_extension(&config.excluded_extensions, &extension) {
                return true;
            }
            !config.included_extensions.is_empty()
                && !contains_extension(&config.included_extensions, &extension)
        }
    }
}

fn contains_extension(list: &[String], extension: &str) -> bool {
    !extension.is_empty()
        && list
            .iter()
            .any(|candidate| candidate.trim_start_matches('.').eq_ignore_ascii_case(extension))
}
