//! In-memory filesystem used as a collaborator double.

use std::collections::{BTreeMap, HashSet};
use std::hash::Hasher;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use fnv::FnvHasher;
use parking_lot::RwLock;

use super::{extract_snippet, ContentHasher, DirectoryLister, SnippetExtractor};
use crate::error::{IndexError, Result};
use crate::types::{DirectoryEntry, EntryType};

#[derive(Debug, Clone)]
struct MemoryNode {
    entry_type: EntryType,
    size: u64,
    modified_time: u64,
    content: Option<String>,
}

impl MemoryNode {
    fn directory(modified_time: u64) -> Self {
        Self {
            entry_type: EntryType::Directory,
            size: 0,
            modified_time,
            content: None,
        }
    }
}

/// A mutable in-memory directory tree.
///
/// Adding a path creates its missing ancestors. Listings can be made to fail
/// or to sleep, which lets callers exercise error recovery and overlapping
/// builds deterministically.
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    nodes: RwLock<BTreeMap<PathBuf, MemoryNode>>,
    failing: RwLock<HashSet<PathBuf>>,
    failing_hashes: RwLock<HashSet<PathBuf>>,
    listing_delay: RwLock<Option<Duration>>,
    listing_calls: AtomicUsize,
    hash_calls: AtomicUsize,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) -> &Self {
        let path = path.as_ref();
        self.ensure_ancestors(path);
        self.nodes
            .write()
            .entry(path.to_path_buf())
            .or_insert_with(|| MemoryNode::directory(0));
        self
    }

    pub fn add_file(&self, path: impl AsRef<Path>, size: u64, modified_time: u64) -> &Self {
        self.insert_file(path.as_ref(), size, modified_time, None)
    }

    pub fn add_text_file(
        &self,
        path: impl AsRef<Path>,
        content: impl Into<String>,
        modified_time: u64,
    ) -> &Self {
        let content = content.into();
        let size = content.len() as u64;
        self.insert_file(path.as_ref(), size, modified_time, Some(content))
    }

    /// Removes a path and everything below it.
    pub fn remove(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        self.nodes
            .write()
            .retain(|candidate, _| !candidate.starts_with(path));
    }

    /// Makes every listing of `path` fail.
    pub fn fail_listing(&self, path: impl AsRef<Path>) -> &Self {
        self.failing.write().insert(path.as_ref().to_path_buf());
        self
    }

    /// Makes every content hash of `path` fail.
    pub fn fail_hashing(&self, path: impl AsRef<Path>) -> &Self {
        self.failing_hashes.write().insert(path.as_ref().to_path_buf());
        self
    }

    /// Makes every listing sleep before answering.
    pub fn set_listing_delay(&self, delay: Option<Duration>) -> &Self {
        *self.listing_delay.write() = delay;
        self
    }

    pub fn listing_calls(&self) -> usize {
        self.listing_calls.load(Ordering::Relaxed)
    }

    pub fn hash_calls(&self) -> usize {
        self.hash_calls.load(Ordering::Relaxed)
    }

    fn insert_file(
        &self,
        path: &Path,
        size: u64,
        modified_time: u64,
        content: Option<String>,
    ) -> &Self {
        self.ensure_ancestors(path);
        self.nodes.write().insert(
            path.to_path_buf(),
            MemoryNode {
                entry_type: EntryType::File,
                size,
                modified_time,
                content,
            },
        );
        self
    }

    fn ensure_ancestors(&self, path: &Path) {
        let mut nodes = self.nodes.write();
        for ancestor in path.ancestors().skip(1) {
            nodes
                .entry(ancestor.to_path_buf())
                .or_insert_with(|| MemoryNode::directory(0));
        }
    }

    fn node(&self, path: &Path) -> Option<MemoryNode> {
        self.nodes.read().get(path).cloned()
    }
}

#[async_trait]
impl DirectoryLister for MemoryFileSystem {
    async fn list_directory(&self, path: &Path) -> Result<Vec<DirectoryEntry>> {
        self.listing_calls.fetch_add(1, Ordering::Relaxed);
        let delay = *self.listing_delay.read();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing.read().contains(path) {
            return Err(IndexError::Listing {
                path: path.display().to_string(),
                reason: "injected listing failure".to_string(),
            });
        }
        match self.node(path) {
            Some(node) if node.entry_type == EntryType::Directory => {}
            _ => return Err(IndexError::PathNotFound(path.to_path_buf())),
        }

        let nodes = self.nodes.read();
        let entries = nodes
            .iter()
            .filter(|(candidate, _)| candidate.parent() == Some(path))
            .filter_map(|(candidate, node)| {
                let name = candidate.file_name()?.to_string_lossy().into_owned();
                Some(DirectoryEntry {
                    name,
                    entry_type: node.entry_type,
                    size: (node.entry_type == EntryType::File).then_some(node.size),
                    modified_time: Some(node.modified_time),
                    permissions: None,
                    owner: None,
                    group: None,
                })
            })
            .collect();
        Ok(entries)
    }
}

#[async_trait]
impl ContentHasher for MemoryFileSystem {
    async fn hash_content(&self, path: &Path) -> Result<String> {
        self.hash_calls.fetch_add(1, Ordering::Relaxed);
        if self.failing_hashes.read().contains(path) {
            return Err(IndexError::Hashing {
                path: path.display().to_string(),
                reason: "injected hashing failure".to_string(),
            });
        }
        let node = self
            .node(path)
            .filter(|node| node.entry_type == EntryType::File)
            .ok_or_else(|| IndexError::PathNotFound(path.to_path_buf()))?;

        let mut hasher = FnvHasher::default();
        match &node.content {
            Some(content) => hasher.write(content.as_bytes()),
            None => {
                hasher.write_u64(node.size);
                hasher.write_u64(node.modified_time);
            }
        }
        Ok(format!("{:016x}", hasher.finish()))
    }
}

#[async_trait]
impl SnippetExtractor for MemoryFileSystem {
    async fn content_snippet(&self, path: &Path, query: &str) -> Result<Option<String>> {
        let node = self
            .node(path)
            .ok_or_else(|| IndexError::PathNotFound(path.to_path_buf()))?;
        Ok(node
            .content
            .as_deref()
            .and_then(|content| extract_snippet(content, query)))
    }
}
