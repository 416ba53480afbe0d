//! Local filesystem collaborators backed by `tokio::fs`.

use std::hash::Hasher;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use fnv::FnvHasher;
use tokio::io::AsyncReadExt;

use super::{extract_snippet, ContentHasher, DirectoryLister, SnippetExtractor};
use crate::error::{IndexError, Result};
use crate::types::{DirectoryEntry, EntryType};

/// Buffer size for file content reading (64KB).
pub const CONTENT_BUFFER_BYTES: usize = 64 * 1024;

/// Upper bound on bytes read when looking for a snippet.
const SNIPPET_SCAN_BYTES: u64 = 1024 * 1024;

/// Prefix inspected for NUL bytes to detect binary files.
const BINARY_PROBE_BYTES: usize = 8 * 1024;

/// Reads directories and file content from the local disk.
///
/// Symlinks are reported as files and never followed, so a link cycle cannot
/// trap a walk.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileSystem;

impl LocalFileSystem {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DirectoryLister for LocalFileSystem {
    async fn list_directory(&self, path: &Path) -> Result<Vec<DirectoryEntry>> {
        let mut reader = tokio::fs::read_dir(path)
            .await
            .map_err(|error| listing_error(path, error))?;
        let mut entries = Vec::new();

        while let Some(child) = reader
            .next_entry()
            .await
            .map_err(|error| listing_error(path, error))?
        {
            let name = child.file_name().to_string_lossy().into_owned();
            let metadata = match tokio::fs::symlink_metadata(child.path()).await {
                Ok(metadata) => metadata,
                Err(error) => {
                    log::debug!(
                        "skipping unreadable entry path={}: {}",
                        child.path().display(),
                        error
                    );
                    continue;
                }
            };
            let entry_type = if metadata.is_dir() {
                EntryType::Directory
            } else {
                EntryType::File
            };
            let (permissions, owner, group) = ownership(&metadata);
            entries.push(DirectoryEntry {
                name,
                entry_type,
                size: (entry_type == EntryType::File).then(|| metadata.len()),
                modified_time: metadata.modified().ok().map(system_time_millis),
                permissions,
                owner,
                group,
            });
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }
}

#[async_trait]
impl ContentHasher for LocalFileSystem {
    async fn hash_content(&self, path: &Path) -> Result<String> {
        let mut file = tokio::fs::File::open(path)
            .await
            .map_err(|error| hashing_error(path, error))?;
        let mut hasher = FnvHasher::default();
        let mut buffer = vec![0u8; CONTENT_BUFFER_BYTES];

        loop {
            let read = file
                .read(&mut buffer)
                .await
                .map_err(|error| hashing_error(path, error))?;
            if read == 0 {
                break;
            }
            hasher.write(&buffer[..read]);
        }

        Ok(format!("{:016x}", hasher.finish()))
    }
}

#[async_trait]
impl SnippetExtractor for LocalFileSystem {
    async fn content_snippet(&self, path: &Path, query: &str) -> Result<Option<String>> {
        let file = tokio::fs::File::open(path).await?;
        let mut bytes = Vec::new();
        file.take(SNIPPET_SCAN_BYTES).read_to_end(&mut bytes).await?;

        let probe = &bytes[..bytes.len().min(BINARY_PROBE_BYTES)];
        if memchr::memchr(0, probe).is_some() {
            return Err(IndexError::NotTextFile(path.to_path_buf()));
        }

        let text = String::from_utf8_lossy(&bytes);
        Ok(extract_snippet(&text, query))
    }
}

fn listing_error(path: &Path, error: std::io::Error) -> IndexError {
    IndexError::Listing {
        path: path.display().to_string(),
        reason: error.to_string(),
    }
}

fn hashing_error(path: &Path, error: std::io::Error) -> IndexError {
    IndexError::Hashing {
        path: path.display().to_string(),
        reason: error.to_string(),
    }
}

fn system_time_millis(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|value| value.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(unix)]
fn ownership(metadata: &std::fs::Metadata) -> (Option<String>, Option<String>, Option<String>) {
    use std::os::unix::fs::MetadataExt;

    (
        Some(format!("{:o}", metadata.mode() & 0o7777)),
        Some(metadata.uid().to_string()),
        Some(metadata.gid().to_string()),
    )
}

#[cfg(not(unix))]
fn ownership(metadata: &std::fs::Metadata) -> (Option<String>, Option<String>, Option<String>) {
    let permissions = if metadata.permissions().readonly() {
        "readonly"
    } else {
        "readwrite"
    };
    (Some(permissions.to_string()), None, None)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[tokio::test]
    async fn lists_children_sorted_with_metadata() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.txt"), b"hello").unwrap();
        fs::create_dir(dir.path().join("a_dir")).unwrap();

        let entries = LocalFileSystem::new()
            .list_directory(dir.path())
            .await
            .unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "a_dir");
        assert_eq!(entries[0].entry_type, EntryType::Directory);
        assert_eq!(entries[0].size, None);
        assert_eq!(entries[1].name, "b.txt");
        assert_eq!(entries[1].entry_type, EntryType::File);
        assert_eq!(entries[1].size, Some(5));
        assert!(entries[1].modified_time.is_some());
    }

    #[tokio::test]
    async fn listing_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = LocalFileSystem::new()
            .list_directory(&dir.path().join("missing"))
            .await;
        assert!(matches!(result, Err(IndexError::Listing { .. })));
    }

    #[tokio::test]
    async fn hash_is_stable_and_content_sensitive() {
        let dir = tempfile::tempdir().unwrap();
        let one = dir.path().join("one.txt");
        let two = dir.path().join("two.txt");
        let three = dir.path().join("three.txt");
        fs::write(&one, b"same content").unwrap();
        fs::write(&two, b"same content").unwrap();
        fs::write(&three, b"other content").unwrap();

        let fs_impl = LocalFileSystem::new();
        let hash_one = fs_impl.hash_content(&one).await.unwrap();
        assert_eq!(hash_one.len(), 16);
        assert_eq!(hash_one, fs_impl.hash_content(&two).await.unwrap());
        assert_ne!(hash_one, fs_impl.hash_content(&three).await.unwrap());
    }

    #[tokio::test]
    async fn snippet_from_text_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.md");
        fs::write(&path, "# Notes\nThe Quarterly Report is due friday.\n").unwrap();

        let snippet = LocalFileSystem::new()
            .content_snippet(&path, "report")
            .await
            .unwrap();
        assert_eq!(
            snippet.as_deref(),
            Some("# Notes The Quarterly Report is due friday.")
        );
    }

    #[tokio::test]
    async fn snippet_refuses_binary_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blob.bin");
        fs::write(&path, [0u8, 1, 2, b'r', b'e', b'p']).unwrap();

        let result = LocalFileSystem::new().content_snippet(&path, "rep").await;
        assert!(matches!(result, Err(IndexError::NotTextFile(_))));
    }
}
