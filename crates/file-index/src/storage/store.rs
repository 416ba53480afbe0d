//! Path-keyed entry store with validation and aggregate statistics.

use std::collections::BTreeMap;
use std::mem::size_of;
use std::path::Path;

use fnv::FnvHashMap;

use crate::types::{FileCategory, IndexEntry, IndexEntryPatch};

/// Fixed per-entry overhead used by the memory estimate (map slot, struct, set nodes).
const ENTRY_OVERHEAD_BYTES: usize = 96;

/// Reason an entry was refused by the store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EntryRejection {
    #[error("entry path is empty")]
    EmptyPath,
    #[error("entry path is not absolute: {0}")]
    RelativePath(String),
    #[error("entry name is empty")]
    EmptyName,
    #[error("entry name contains a path separator: {0}")]
    NameHasSeparator(String),
    #[error("entry weight is not a finite number")]
    NonFiniteWeight,
}

/// Checks the invariants every stored entry must satisfy.
///
/// Sizes, timestamps and access counts are unsigned, so they cannot be negative.
pub fn validate_entry(entry: &IndexEntry) -> Result<(), EntryRejection> {
    if entry.path.is_empty() {
        return Err(EntryRejection::EmptyPath);
    }
    if !Path::new(&entry.path).is_absolute() {
        return Err(EntryRejection::RelativePath(entry.path.clone()));
    }
    if entry.name.is_empty() {
        return Err(EntryRejection::EmptyName);
    }
    if entry.name.contains('/') || entry.name.contains(std::path::MAIN_SEPARATOR) {
        return Err(EntryRejection::NameHasSeparator(entry.name.clone()));
    }
    if !entry.weight.is_finite() {
        return Err(EntryRejection::NonFiniteWeight);
    }
    Ok(())
}

/// Heuristic heap footprint of one entry in bytes.
pub fn estimated_entry_bytes(entry: &IndexEntry) -> usize {
    let optional = [
        entry.permissions.as_ref(),
        entry.owner.as_ref(),
        entry.group.as_ref(),
        entry.content_hash.as_ref(),
    ]
    .into_iter()
    .flatten()
    .map(|value| value.len() + size_of::<String>())
    .sum::<usize>();
    let tags = entry
        .tags
        .iter()
        .map(|tag| tag.len() + size_of::<String>())
        .sum::<usize>();

    ENTRY_OVERHEAD_BYTES
        + size_of::<IndexEntry>()
        // The path is stored twice: as the map key and inside the entry.
        + entry.path.len() * 2
        + entry.name.len()
        + entry.extension.len()
        + optional
        + tags
}

/// Aggregate figures over the stored entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStatistics {
    pub entries: usize,
    pub files: usize,
    pub directories: usize,
    pub total_size: u64,
    pub category_counts: BTreeMap<FileCategory, usize>,
    pub memory_bytes: usize,
}

/// In-memory index store keyed by absolute path.
#[derive(Debug, Clone, Default)]
pub struct IndexStore {
    entries: FnvHashMap<String, IndexEntry>,
}

impl IndexStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: FnvHashMap::with_capacity_and_hasher(capacity, Default::default()),
        }
    }

    /// Inserts or replaces an entry keyed by its path.
    ///
    /// Returns `false` and leaves the store untouched if the entry is invalid.
    pub fn add_entry(&mut self, entry: IndexEntry) -> bool {
        if let Err(rejection) = validate_entry(&entry) {
            log::debug!("index entry rejected: {rejection}");
            return false;
        }
        self.entries.insert(entry.path.clone(), entry);
        true
    }

    pub fn get_entry(&self, path: &str) -> Option<&IndexEntry> {
        self.entries.get(path)
    }

    /// Merges `patch` into the entry at `path`.
    ///
    /// The merged entry is validated first; an invalid merge leaves the
    /// stored entry unchanged and returns `false`.
    pub fn update_entry(&mut self, path: &str, patch: &IndexEntryPatch) -> bool {
        let Some(current) = self.entries.get_mut(path) else {
            return false;
        };
        let mut merged = current.clone();
        patch.apply_to(&mut merged);
        if let Err(rejection) = validate_entry(&merged) {
            log::debug!("index entry update rejected path={path}: {rejection}");
            return false;
        }
        *current = merged;
        true
    }

    /// Bumps the access counter and stamps the access time of an entry.
    pub fn record_access(&mut self, path: &str, accessed_at: u64) -> bool {
        match self.entries.get_mut(path) {
            Some(entry) => {
                entry.access_count = entry.access_count.saturating_add(1);
                entry.last_accessed = accessed_at;
                true
            }
            None => false,
        }
    }

    pub fn remove_entry(&mut self, path: &str) -> Option<IndexEntry> {
        self.entries.remove(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entries(&self) -> impl Iterator<Item = &IndexEntry> + Send + '_ {
        self.entries.values()
    }

    /// Counts entries strictly below `directory`.
    pub fn count_under(&self, directory: &str) -> usize {
        let directory = Path::new(directory);
        self.entries
            .keys()
            .filter(|path| {
                let path = Path::new(path.as_str());
                path != directory && path.starts_with(directory)
            })
            .count()
    }

    pub fn statistics(&self) -> StoreStatistics {
        let mut stats = StoreStatistics {
            entries: self.entries.len(),
            ..Default::default()
        };
        for entry in self.entries.values() {
            if entry.is_dir() {
                stats.directories += 1;
            } else {
                stats.files += 1;
                stats.total_size = stats.total_size.saturating_add(entry.size);
            }
            *stats.category_counts.entry(entry.category).or_insert(0) += 1;
            stats.memory_bytes += estimated_entry_bytes(entry);
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::types::EntryType;

    fn entry(path: &str, entry_type: EntryType, size: u64) -> IndexEntry {
        let name = path.rsplit('/').next().unwrap_or_default().to_string();
        IndexEntry {
            path: path.to_string(),
            extension: crate::classify::split_extension(&name),
            category: crate::classify::determine_file_type(&name, ""),
            name,
            size,
            modified_time: 1,
            entry_type,
            permissions: None,
            owner: None,
            group: None,
            content_hash: None,
            tags: BTreeSet::new(),
            access_count: 0,
            last_accessed: 0,
            weight: 1.0,
        }
    }

    #[test]
    fn stored_entry_round_trips() {
        let mut store = IndexStore::new();
        let original = entry("/home/user/notes.md", EntryType::File, 42);
        assert!(store.add_entry(original.clone()));
        assert_eq!(store.get_entry("/home/user/notes.md"), Some(&original));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn invalid_entries_are_never_stored() {
        let mut store = IndexStore::new();

        let mut empty_path = entry("/a/b", EntryType::File, 1);
        empty_path.path = String::new();
        assert!(!store.add_entry(empty_path));

        let mut relative = entry("/a/b", EntryType::File, 1);
        relative.path = "a/b".to_string();
        assert!(!store.add_entry(relative));
        assert!(store.get_entry("a/b").is_none());

        let mut nan_weight = entry("/a/c", EntryType::File, 1);
        nan_weight.weight = f64::NAN;
        assert!(!store.add_entry(nan_weight));
        assert!(store.get_entry("/a/c").is_none());

        let mut slashed = entry("/a/d", EntryType::File, 1);
        slashed.name = "x/y".to_string();
        assert!(!store.add_entry(slashed));

        assert!(store.is_empty());
    }

    #[test]
    fn validation_reports_reason() {
        let mut relative = entry("/a/b", EntryType::File, 1);
        relative.path = "rel".to_string();
        assert_eq!(
            validate_entry(&relative),
            Err(EntryRejection::RelativePath("rel".to_string()))
        );
    }

    #[test]
    fn re_adding_a_path_replaces_the_entry() {
        let mut store = IndexStore::new();
        store.add_entry(entry("/a/file.txt", EntryType::File, 1));
        store.add_entry(entry("/a/file.txt", EntryType::File, 99));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get_entry("/a/file.txt").map(|e| e.size), Some(99));
    }

    #[test]
    fn update_merges_and_revalidates() {
        let mut store = IndexStore::new();
        store.add_entry(entry("/a/file.txt", EntryType::File, 1));

        let patch = IndexEntryPatch {
            size: Some(10),
            content_hash: Some("abc".to_string()),
            ..Default::default()
        };
        assert!(store.update_entry("/a/file.txt", &patch));
        let updated = store.get_entry("/a/file.txt").unwrap();
        assert_eq!(updated.size, 10);
        assert_eq!(updated.content_hash.as_deref(), Some("abc"));

        let bad = IndexEntryPatch {
            name: Some(String::new()),
            ..Default::default()
        };
        assert!(!store.update_entry("/a/file.txt", &bad));
        assert_eq!(store.get_entry("/a/file.txt").unwrap().name, "file.txt");

        assert!(!store.update_entry("/missing", &patch));
    }

    #[test]
    fn record_access_bumps_counter() {
        let mut store = IndexStore::new();
        store.add_entry(entry("/a/file.txt", EntryType::File, 1));
        assert!(store.record_access("/a/file.txt", 500));
        assert!(store.record_access("/a/file.txt", 900));
        let stored = store.get_entry("/a/file.txt").unwrap();
        assert_eq!(stored.access_count, 2);
        assert_eq!(stored.last_accessed, 900);
        assert!(!store.record_access("/nope", 1));
    }

    #[test]
    fn remove_and_clear() {
        let mut store = IndexStore::new();
        store.add_entry(entry("/a/one", EntryType::File, 1));
        store.add_entry(entry("/a/two", EntryType::File, 1));
        assert_eq!(store.remove_entry("/a/one").map(|e| e.name), Some("one".to_string()));
        assert!(store.get_entry("/a/one").is_none());
        store.clear();
        assert!(store.is_empty());
    }

    #[test]
    fn statistics_aggregate_kinds_and_sizes() {
        let mut store = IndexStore::new();
        store.add_entry(entry("/r/report.pdf", EntryType::File, 1_200_000));
        store.add_entry(entry("/r/main.ts", EntryType::File, 2_048));
        store.add_entry(entry("/r/src", EntryType::Directory, 4096));

        let stats = store.statistics();
        assert_eq!(stats.entries, 3);
        assert_eq!(stats.files, 2);
        assert_eq!(stats.directories, 1);
        assert_eq!(stats.total_size, 1_202_048);
        assert!(stats.memory_bytes > 0);
    }

    #[test]
    fn count_under_uses_path_components() {
        let mut store = IndexStore::new();
        store.add_entry(entry("/r/.git", EntryType::Directory, 0));
        store.add_entry(entry("/r/.git/config", EntryType::File, 1));
        store.add_entry(entry("/r/.github", EntryType::Directory, 0));
        assert_eq!(store.count_under("/r/.git"), 1);
        assert_eq!(store.count_under("/r"), 3);
    }
}
