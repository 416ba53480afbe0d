//! Filesystem collaborators used by the index.
//!
//! The index core never touches the disk directly. It lists directories,
//! hashes content and extracts snippets through these traits:
//! - `local` - real implementation backed by `tokio::fs`
//! - `memory` - in-memory tree for tests and previews

mod local;
mod memory;

use std::path::Path;

use async_trait::async_trait;
use memchr::memmem;

use crate::error::Result;
use crate::types::DirectoryEntry;

pub use local::{LocalFileSystem, CONTENT_BUFFER_BYTES};
pub use memory::MemoryFileSystem;

/// Bytes of context kept on each side of a snippet match.
pub const SNIPPET_CONTEXT_BYTES: usize = 60;

/// Lists the direct children of a directory.
#[async_trait]
pub trait DirectoryLister: Send + Sync {
    async fn list_directory(&self, path: &Path) -> Result<Vec<DirectoryEntry>>;
}

/// Produces a stable digest of a file's content.
#[async_trait]
pub trait ContentHasher: Send + Sync {
    async fn hash_content(&self, path: &Path) -> Result<String>;
}

/// Extracts a short excerpt of a file around the first query match.
#[async_trait]
pub trait SnippetExtractor: Send + Sync {
    /// Returns `Ok(None)` when the file has no textual match.
    async fn content_snippet(&self, path: &Path, query: &str) -> Result<Option<String>>;
}

/// Finds `query` in `text` (ASCII case-insensitive) and returns the match with
/// surrounding context on a single line.
pub fn extract_snippet(text: &str, query: &str) -> Option<String> {
    let needle = query.trim().to_ascii_lowercase();
    if needle.is_empty() {
        return None;
    }
    // ASCII lower-casing keeps byte offsets aligned with `text`.
    let haystack = text.to_ascii_lowercase();
    let position = memmem::find(haystack.as_bytes(), needle.as_bytes())?;

    let start = floor_char_boundary(text, position.saturating_sub(SNIPPET_CONTEXT_BYTES));
    let end = ceil_char_boundary(text, position + needle.len() + SNIPPET_CONTEXT_BYTES);

    let mut snippet = text[start..end]
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    if start > 0 {
        snippet.insert_str(0, "...");
    }
    if end < text.len() {
        snippet.push_str("...");
    }
    Some(snippet)
}

fn floor_char_boundary(text: &str, mut index: usize) -> usize {
    index = index.min(text.len());
    while !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

fn ceil_char_boundary(text: &str, mut index: usize) -> usize {
    index = index.min(text.len());
    while !text.is_char_boundary(index) {
        index += 1;
    }
    index
}
