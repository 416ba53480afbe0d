//! Depth-first index construction through the directory collaborators.
//!
//! The walk is pre-order: a directory's entry is stored before any of its
//! descendants, and a subtree is finished before the next sibling is visited.
//! Open directories live on an explicit frame stack, so deep trees never grow
//! the async call stack.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::time::Instant;

use futures_util::future::join_all;
use serde::{Deserialize, Serialize};

use super::build::IndexBuildProgress;
use super::exclude::should_exclude;
use crate::classify::{
    determine_file_type, file_type_preference_weight, generate_file_tags, split_extension,
};
use crate::config::IndexConfig;
use crate::error::{IndexError, Result};
use crate::source::{ContentHasher, DirectoryLister};
use crate::storage::IndexStore;
use crate::types::{DirectoryEntry, EntryType, FileCategory, IndexEntry};

/// Outcome of one completed build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildSummary {
    pub root: String,
    pub entries: usize,
    pub files: usize,
    pub directories: usize,
    pub skipped: usize,
    pub errors: usize,
    pub hashed: usize,
    /// True when the walk stopped at `max_entries`.
    pub truncated: bool,
    pub duration_ms: u64,
}

struct Frame {
    dir: PathBuf,
    depth: usize,
    children: std::vec::IntoIter<DirectoryEntry>,
    hashes: HashMap<String, String>,
}

/// Builds a fresh `IndexStore` from a root directory.
pub struct IndexBuilder<'a> {
    lister: &'a dyn DirectoryLister,
    hasher: &'a dyn ContentHasher,
    config: &'a IndexConfig,
    progress: &'a IndexBuildProgress,
}

impl<'a> IndexBuilder<'a> {
    pub fn new(
        lister: &'a dyn DirectoryLister,
        hasher: &'a dyn ContentHasher,
        config: &'a IndexConfig,
        progress: &'a IndexBuildProgress,
    ) -> Self {
        Self {
            lister,
            hasher,
            config,
            progress,
        }
    }

    /// Walks `root` and returns the populated store.
    ///
    /// Only an invalid root or a failed root listing is an error; failures
    /// below the root are logged, counted and skipped.
    pub async fn build(&self, root: &str) -> Result<(IndexStore, BuildSummary)> {
        let started = Instant::now();
        let root_path = validate_root(root)?;
        let mut store = IndexStore::new();
        let mut summary = BuildSummary {
            root: root.to_string(),
            ..BuildSummary::default()
        };

        let children = self.lister.list_directory(&root_path).await?;
        self.progress.scanned_dirs.fetch_add(1, Ordering::Relaxed);
        let mut stack = vec![self.open_frame(root_path, 0, children, &store, &mut summary).await];

        'walk: while let Some(frame) = stack.last_mut() {
            let Some(child) = frame.children.next() else {
                stack.pop();
                continue;
            };
            let dir = frame.dir.clone();
            let depth = frame.depth;
            let child_path = dir.join(&child.name);

            if should_exclude(self.config, &child_path, &child) {
                self.progress.skipped.fetch_add(1, Ordering::Relaxed);
                summary.skipped += 1;
                continue;
            }
            if store.len() >= self.config.max_entries {
                summary.truncated = true;
                break 'walk;
            }

            let hash = frame.hashes.remove(&child.name);
            let entry = create_index_entry(&dir, &child, hash, self.config);
            if !store.add_entry(entry) {
                summary.skipped += 1;
                continue;
            }

            match child.entry_type {
                EntryType::File => {
                    self.progress.scanned_files.fetch_add(1, Ordering::Relaxed);
                }
                EntryType::Directory => {
                    let child_depth = depth + 1;
                    if child_depth > self.config.max_depth {
                        continue;
                    }
                    let children = match self.lister.list_directory(&child_path).await {
                        Ok(children) => children,
                        Err(error) => {
                            log::warn!(
                                "file index listing failed path={}: {}",
                                child_path.display(),
                                error
                            );
                            self.progress.errors.fetch_add(1, Ordering::Relaxed);
                            summary.errors += 1;
                            Vec::new()
                        }
                    };
                    self.progress.scanned_dirs.fetch_add(1, Ordering::Relaxed);
                    let frame = self
                        .open_frame(child_path, child_depth, children, &store, &mut summary)
                        .await;
                    stack.push(frame);
                }
            }
        }

        let statistics = store.statistics();
        summary.entries = statistics.entries;
        summary.files = statistics.files;
        summary.directories = statistics.directories;
        summary.duration_ms = started.elapsed().as_millis() as u64;

        if statistics.memory_bytes > self.config.performance.memory_limit {
            log::warn!(
                "file index exceeds memory budget root={} estimated_bytes={} limit_bytes={}",
                root,
                statistics.memory_bytes,
                self.config.performance.memory_limit
            );
        }
        Ok((store, summary))
    }

    async fn open_frame(
        &self,
        dir: PathBuf,
        depth: usize,
        children: Vec<DirectoryEntry>,
        store: &IndexStore,
        summary: &mut BuildSummary,
    ) -> Frame {
        let remaining = self.config.max_entries.saturating_sub(store.len());
        let hashes = self.hash_children(&dir, &children, remaining, summary).await;
        Frame {
            dir,
            depth,
            children: children.into_iter(),
            hashes,
        }
    }

    /// Hashes the eligible files of one directory in batches.
    async fn hash_children(
        &self,
        dir: &Path,
        children: &[DirectoryEntry],
        limit: usize,
        summary: &mut BuildSummary,
    ) -> HashMap<String, String> {
        let mut hashes = HashMap::new();
        if !self.config.enable_content_index {
            return hashes;
        }

        let eligible: Vec<&DirectoryEntry> = children
            .iter()
            .filter(|child| child.entry_type == EntryType::File)
            .filter(|child| self.hashable_size(child.size.unwrap_or(0)))
            .filter(|child| !should_exclude(self.config, &dir.join(&child.name), child))
            .take(limit)
            .collect();

        for batch in eligible.chunks(self.config.performance.batch_size.max(1)) {
            let paths: Vec<PathBuf> = batch.iter().map(|child| dir.join(&child.name)).collect();
            let results = if self.config.performance.concurrent_indexing {
                join_all(paths.iter().map(|path| self.hasher.hash_content(path))).await
            } else {
                let mut results = Vec::with_capacity(paths.len());
                for path in &paths {
                    results.push(self.hasher.hash_content(path).await);
                }
                results
            };

            for ((child, path), result) in batch.iter().zip(&paths).zip(results) {
                match result {
                    Ok(hash) => {
                        summary.hashed += 1;
                        hashes.insert(child.name.clone(), hash);
                    }
                    Err(error) => {
                        log::warn!(
                            "file index hashing failed path={}: {}",
                            path.display(),
                            error
                        );
                        self.progress.errors.fetch_add(1, Ordering::Relaxed);
                        summary.errors += 1;
                    }
                }
            }
        }
        hashes
    }

    fn hashable_size(&self, size: u64) -> bool {
        (self.config.content_index_min_size..=self.config.content_index_max_size).contains(&size)
    }
}

fn validate_root(root: &str) -> Result<PathBuf> {
    if root.trim().is_empty() {
        return Err(IndexError::InvalidRoot("root path is empty".to_string()));
    }
    let path = PathBuf::from(root);
    if !path.is_absolute() {
        return Err(IndexError::InvalidRoot(format!(
            "root path must be absolute: {root}"
        )));
    }
    Ok(path)
}

/// Turns a listing record into a classified, tagged index entry.
pub fn create_index_entry(
    dir: &Path,
    child: &DirectoryEntry,
    content_hash: Option<String>,
    config: &IndexConfig,
) -> IndexEntry {
    let (extension, category) = match child.entry_type {
        EntryType::File => {
            let extension = split_extension(&child.name);
            let category = determine_file_type(&child.name, &extension);
            (extension, category)
        }
        EntryType::Directory => (String::new(), FileCategory::Other),
    };
    let compact = config.performance.enable_compression;

    let mut entry = IndexEntry {
        path: dir.join(&child.name).to_string_lossy().into_owned(),
        name: child.name.clone(),
        extension,
        size: child.size.unwrap_or(0),
        modified_time: child.modified_time.unwrap_or(0),
        entry_type: child.entry_type,
        permissions: child.permissions.clone().filter(|_| !compact),
        owner: child.owner.clone().filter(|_| !compact),
        group: child.group.clone().filter(|_| !compact),
        content_hash,
        tags: Default::default(),
        access_count: 0,
        last_accessed: 0,
        category,
        weight: f64::from(file_type_preference_weight(category)),
    };
    entry.tags = generate_file_tags(&entry);
    entry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemoryFileSystem;

    async fn run(fs: &MemoryFileSystem, config: &IndexConfig, root: &str) -> Result<(IndexStore, BuildSummary)> {
        let progress = IndexBuildProgress::default();
        IndexBuilder::new(fs, fs, config, &progress).build(root).await
    }

    fn fixture() -> MemoryFileSystem {
        let fs = MemoryFileSystem::new();
        fs.add_file("/home/u/report.pdf", 1_200_000, 1_000)
            .add_file("/home/u/main.ts", 2_048, 2_000)
            .add_file("/home/u/.git/config", 120, 3_000);
        fs
    }

    #[tokio::test]
    async fn excluded_directories_are_not_entered() {
        let fs = fixture();
        let (store, summary) = run(&fs, &IndexConfig::default(), "/home/u").await.unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(store.count_under("/home/u/.git"), 0);
        assert_eq!(summary.files, 2);
        assert_eq!(summary.skipped, 1);
        // root only; .git was never listed
        assert_eq!(fs.listing_calls(), 1);

        let report = store.get_entry("/home/u/report.pdf").unwrap();
        assert_eq!(report.category, FileCategory::Document);
        assert!(report.tags.contains("size:large"));
        assert_eq!(report.weight, 8.0);
    }

    #[tokio::test]
    async fn invalid_roots_are_fatal() {
        let fs = fixture();
        let config = IndexConfig::default();
        assert!(matches!(run(&fs, &config, "").await, Err(IndexError::InvalidRoot(_))));
        assert!(matches!(run(&fs, &config, "home/u").await, Err(IndexError::InvalidRoot(_))));
        assert!(run(&fs, &config, "/missing").await.is_err());

        fs.fail_listing("/home/u");
        assert!(matches!(run(&fs, &config, "/home/u").await, Err(IndexError::Listing { .. })));
    }

    #[tokio::test]
    async fn failing_subdirectory_counts_as_empty() {
        let fs = MemoryFileSystem::new();
        fs.add_file("/r/ok/a.txt", 1, 1)
            .add_file("/r/bad/b.txt", 1, 1)
            .fail_listing("/r/bad");

        let (store, summary) = run(&fs, &IndexConfig::default(), "/r").await.unwrap();
        assert!(store.contains("/r/bad"));
        assert!(store.contains("/r/ok/a.txt"));
        assert!(!store.contains("/r/bad/b.txt"));
        assert_eq!(summary.errors, 1);
    }

    #[tokio::test]
    async fn depth_limit_stops_listing() {
        let fs = MemoryFileSystem::new();
        fs.add_file("/r/a/b/c/deep.txt", 1, 1).add_file("/r/a/top.txt", 1, 1);
        let config = IndexConfig {
            max_depth: 1,
            ..IndexConfig::default()
        };

        let (store, _) = run(&fs, &config, "/r").await.unwrap();
        assert!(store.contains("/r/a"));
        assert!(store.contains("/r/a/top.txt"));
        // /r/a/b is depth 2: stored as a child of /r/a but never listed
        assert!(store.contains("/r/a/b"));
        assert!(!store.contains("/r/a/b/c"));
    }

    #[tokio::test]
    async fn stops_at_max_entries() {
        let fs = MemoryFileSystem::new();
        for index in 0..10 {
            fs.add_file(format!("/r/file{index}.txt"), 1, 1);
        }
        let config = IndexConfig {
            max_entries: 4,
            ..IndexConfig::default()
        };

        let (store, summary) = run(&fs, &config, "/r").await.unwrap();
        assert_eq!(store.len(), 4);
        assert!(summary.truncated);
    }

    #[tokio::test]
    async fn content_hashes_respect_size_window() {
        let fs = MemoryFileSystem::new();
        fs.add_text_file("/r/small.md", "hello", 1)
            .add_file("/r/empty.txt", 0, 1)
            .add_file("/r/huge.bin", 50 * 1024 * 1024, 1);
        let config = IndexConfig {
            enable_content_index: true,
            ..IndexConfig::default()
        };

        let (store, summary) = run(&fs, &config, "/r").await.unwrap();
        assert!(store.get_entry("/r/small.md").unwrap().content_hash.is_some());
        assert!(store.get_entry("/r/empty.txt").unwrap().content_hash.is_none());
        assert!(store.get_entry("/r/huge.bin").unwrap().content_hash.is_none());
        assert_eq!(summary.hashed, 1);
        assert_eq!(fs.hash_calls(), 1);
    }

    #[tokio::test]
    async fn hashing_failure_keeps_entry_without_hash() {
        let fs = MemoryFileSystem::new();
        fs.add_text_file("/r/good.md", "fine", 1)
            .add_text_file("/r/bad.md", "broken", 1)
            .fail_hashing("/r/bad.md");
        let config = IndexConfig {
            enable_content_index: true,
            ..IndexConfig::default()
        };

        let (store, summary) = run(&fs, &config, "/r").await.unwrap();
        assert_eq!(store.len(), 2);
        assert!(store.get_entry("/r/bad.md").unwrap().content_hash.is_none());
        assert!(store.get_entry("/r/good.md").unwrap().content_hash.is_some());
        assert_eq!(summary.errors, 1);
        assert_eq!(summary.hashed, 1);
    }

    #[tokio::test]
    async fn root_under_excluded_path_indexes_nothing() {
        let fs = MemoryFileSystem::new();
        fs.add_file("/p/private/notes.txt", 10, 1)
            .add_file("/p/private/sub/deep.txt", 10, 1);
        let config = IndexConfig {
            excluded_directories: vec!["/p/private".to_string()],
            ..IndexConfig::default()
        };

        let (store, summary) = run(&fs, &config, "/p/private").await.unwrap();
        assert!(store.is_empty());
        assert_eq!(summary.skipped, 2);
    }

    #[tokio::test]
    async fn sequential_hashing_matches_concurrent() {
        let fs = MemoryFileSystem::new();
        for index in 0..5 {
            fs.add_text_file(format!("/r/n{index}.md"), format!("note {index}"), 1);
        }
        let mut config = IndexConfig {
            enable_content_index: true,
            ..IndexConfig::default()
        };
        config.performance.batch_size = 2;
        let (concurrent, _) = run(&fs, &config, "/r").await.unwrap();

        config.performance.concurrent_indexing = false;
        let (sequential, _) = run(&fs, &config, "/r").await.unwrap();

        for index in 0..5 {
            let path = format!("/r/n{index}.md");
            assert_eq!(
                concurrent.get_entry(&path).unwrap().content_hash,
                sequential.get_entry(&path).unwrap().content_hash
            );
        }
    }

    #[test]
    fn compact_entries_drop_ownership() {
        let mut child = DirectoryEntry::file("a.rs", 10, 5);
        child.permissions = Some("644".to_string());
        child.owner = Some("501".to_string());
        let mut config = IndexConfig::default();

        let full = create_index_entry(Path::new("/src"), &child, None, &config);
        assert_eq!(full.path, "/src/a.rs");
        assert_eq!(full.permissions.as_deref(), Some("644"));
        assert_eq!(full.category, FileCategory::Code);

        config.performance.enable_compression = true;
        let compact = create_index_entry(Path::new("/src"), &child, None, &config);
        assert!(compact.permissions.is_none());
        assert!(compact.owner.is_none());
    }
}
