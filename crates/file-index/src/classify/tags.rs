//! Descriptive tags derived from an entry's kind, size and name.
//!
//! Tags are plain strings in a `namespace:value` form so the UI can group
//! them. They are recomputed on every build and never read from disk.

use std::collections::BTreeSet;

use crate::types::IndexEntry;

pub const SMALL_FILE_BYTES: u64 = 1024;
pub const MEDIUM_FILE_BYTES: u64 = 1024 * 1024;

/// Name substrings mapped to the tag they imply.
const NAME_PATTERNS: &[(&[&str], &str)] = &[
    (&["test", "spec"], "category:test"),
    (&["config", "cfg"], "category:config"),
    (&["readme", "doc"], "category:documentation"),
    (
        &["package.json", "cargo.toml", "go.mod", "pyproject.toml", "pom.xml"],
        "dev:package",
    ),
    (&["index", "main"], "dev:entrypoint"),
    (&["util", "helper"], "dev:utility"),
    (&["data", "db"], "category:data"),
    (&["log"], "category:log"),
    (&["secret", "key", "token"], "security:sensitive"),
];

/// Returns the size bucket tag for a file size.
pub fn size_bucket(size: u64) -> &'static str {
    if size < SMALL_FILE_BYTES {
        "size:small"
    } else if size < MEDIUM_FILE_BYTES {
        "size:medium"
    } else {
        "size:large"
    }
}

/// Generates the tag set for an entry.
pub fn generate_file_tags(entry: &IndexEntry) -> BTreeSet<String> {
    let mut tags = BTreeSet::new();
    tags.insert(format!("type:{}", entry.entry_type.as_str()));

    if entry.is_file() {
        tags.insert(size_bucket(entry.size).to_string());
        if !entry.extension.is_empty() {
            tags.insert(format!("ext:{}", entry.extension));
        }
    }

    let name = entry.name.to_lowercase();
    for (needles, tag) in NAME_PATTERNS {
        if needles.iter().any(|needle| name.contains(needle)) {
            tags.insert((*tag).to_string());
        }
    }

    tags
}
