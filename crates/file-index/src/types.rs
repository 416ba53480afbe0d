//! Core record types shared by the index, the search engine and callers.
//!
//! These are the shapes the launcher UI exchanges with the index service, so
//! they serialize with camelCase field names.

use std::collections::{BTreeMap, BTreeSet};

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Whether an entry is a file or a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    File,
    Directory,
}

impl EntryType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Directory => "directory",
        }
    }

    pub fn is_dir(self) -> bool {
        self == Self::Directory
    }
}

/// Content category assigned by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileCategory {
    Document,
    Image,
    Video,
    Audio,
    Code,
    Archive,
    Executable,
    System,
    Other,
}

impl FileCategory {
    pub const ALL: [FileCategory; 9] = [
        Self::Document,
        Self::Image,
        Self::Video,
        Self::Audio,
        Self::Code,
        Self::Archive,
        Self::Executable,
        Self::System,
        Self::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::Image => "image",
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Code => "code",
            Self::Archive => "archive",
            Self::Executable => "executable",
            Self::System => "system",
            Self::Other => "other",
        }
    }
}

/// The indexed metadata record for one filesystem path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexEntry {
    /// Absolute path; the store key.
    pub path: String,
    pub name: String,
    /// Lower-cased extension without the dot, empty when there is none.
    pub extension: String,
    pub size: u64,
    /// Milliseconds since the Unix epoch.
    pub modified_time: u64,
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
    pub tags: BTreeSet<String>,
    pub access_count: u64,
    /// Milliseconds since the Unix epoch, 0 when never accessed.
    pub last_accessed: u64,
    pub category: FileCategory,
    pub weight: f64,
}

impl IndexEntry {
    pub fn is_file(&self) -> bool {
        self.entry_type == EntryType::File
    }

    pub fn is_dir(&self) -> bool {
        self.entry_type == EntryType::Directory
    }
}

/// Partial update merged into an existing entry by `IndexStore::update_entry`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IndexEntryPatch {
    pub name: Option<String>,
    pub size: Option<u64>,
    pub modified_time: Option<u64>,
    pub permissions: Option<String>,
    pub owner: Option<String>,
    pub group: Option<String>,
    pub content_hash: Option<String>,
    pub tags: Option<BTreeSet<String>>,
    pub access_count: Option<u64>,
    pub last_accessed: Option<u64>,
    pub category: Option<FileCategory>,
    pub weight: Option<f64>,
}

impl IndexEntryPatch {
    /// Applies every populated field onto `entry`.
    pub fn apply_to(&self, entry: &mut IndexEntry) {
        if let Some(name) = &self.name {
            entry.name = name.clone();
        }
        if let Some(size) = self.size {
            entry.size = size;
        }
        if let Some(modified_time) = self.modified_time {
            entry.modified_time = modified_time;
        }
        if let Some(permissions) = &self.permissions {
            entry.permissions = Some(permissions.clone());
        }
        if let Some(owner) = &self.owner {
            entry.owner = Some(owner.clone());
        }
        if let Some(group) = &self.group {
            entry.group = Some(group.clone());
        }
        if let Some(content_hash) = &self.content_hash {
            entry.content_hash = Some(content_hash.clone());
        }
        if let Some(tags) = &self.tags {
            entry.tags = tags.clone();
        }
        if let Some(access_count) = self.access_count {
            entry.access_count = access_count;
        }
        if let Some(last_accessed) = self.last_accessed {
            entry.last_accessed = last_accessed;
        }
        if let Some(category) = self.category {
            entry.category = category;
        }
        if let Some(weight) = self.weight {
            entry.weight = weight;
        }
    }
}

/// Raw record returned by a `DirectoryLister` for one child of a directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub modified_time: Option<u64>,
    #[serde(default)]
    pub permissions: Option<String>,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub group: Option<String>,
}

impl DirectoryEntry {
    pub fn file(name: impl Into<String>, size: u64, modified_time: u64) -> Self {
        Self {
            name: name.into(),
            entry_type: EntryType::File,
            size: Some(size),
            modified_time: Some(modified_time),
            permissions: None,
            owner: None,
            group: None,
        }
    }

    pub fn directory(name: impl Into<String>, modified_time: u64) -> Self {
        Self {
            name: name.into(),
            entry_type: EntryType::Directory,
            size: None,
            modified_time: Some(modified_time),
            permissions: None,
            owner: None,
            group: None,
        }
    }
}

/// Kind filter for search results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KindFilter {
    #[default]
    All,
    File,
    Directory,
}

impl KindFilter {
    pub fn matches(&self, entry_type: EntryType) -> bool {
        match self {
            Self::All => true,
            Self::File => entry_type == EntryType::File,
            Self::Directory => entry_type == EntryType::Directory,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchType {
    Fuzzy,
    Exact,
    Prefix,
    #[default]
    Smart,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    Relevance,
    Name,
    Modified,
    Size,
    #[default]
    Recommendation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

pub const DEFAULT_MAX_RESULTS: usize = 50;

/// Per-query options. Hashable so the result cache can key on them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchOptions {
    pub max_results: usize,
    pub search_type: SearchType,
    pub include_content: bool,
    pub sort_by: SortBy,
    pub sort_order: SortOrder,
    /// Categories to keep; empty keeps every category.
    pub type_filter: Vec<FileCategory>,
    pub kind: KindFilter,
    pub enable_cache: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            max_results: DEFAULT_MAX_RESULTS,
            search_type: SearchType::default(),
            include_content: false,
            sort_by: SortBy::default(),
            sort_order: SortOrder::default(),
            type_filter: Vec::new(),
            kind: KindFilter::default(),
            enable_cache: true,
        }
    }
}

impl SearchOptions {
    /// Returns true if the entry passes the category and kind filters.
    pub fn accepts(&self, entry: &IndexEntry) -> bool {
        if !self.kind.matches(entry.entry_type) {
            return false;
        }
        self.type_filter.is_empty() || self.type_filter.contains(&entry.category)
    }
}

/// How the query matched the entry name, in precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    Exact,
    Prefix,
    Contain,
    Fuzzy,
}

impl MatchType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Prefix => "prefix",
            Self::Contain => "contain",
            Self::Fuzzy => "fuzzy",
        }
    }
}

/// Half-open `[start, end)` character range into the entry name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MatchPosition {
    pub start: usize,
    pub end: usize,
}

impl MatchPosition {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

bitflags! {
    /// Entry fields that contributed to a match.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct MatchedFields: u8 {
        const NAME = 1 << 0;
        const EXTENSION = 1 << 1;
        const CONTENT = 1 << 2;
    }
}

impl MatchedFields {
    pub fn names(self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.contains(Self::NAME) {
            names.push("name");
        }
        if self.contains(Self::EXTENSION) {
            names.push("extension");
        }
        if self.contains(Self::CONTENT) {
            names.push("content");
        }
        names
    }
}

/// One ranked search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhancedSearchResult {
    pub entry: IndexEntry,
    pub score: f64,
    pub matched_fields: MatchedFields,
    pub match_type: MatchType,
    pub match_positions: Vec<MatchPosition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_snippet: Option<String>,
    /// Milliseconds.
    pub estimated_open_time: u64,
    pub recommendation_score: f64,
}

/// Aggregate index, search and cache statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexStatistics {
    pub total_entries: usize,
    pub total_files: usize,
    pub total_directories: usize,
    pub total_size: u64,
    pub category_counts: BTreeMap<FileCategory, usize>,
    pub build_count: u64,
    /// Milliseconds since the Unix epoch, 0 before the first build.
    pub last_build_time: u64,
    pub last_build_duration_ms: u64,
    pub average_build_time_ms: f64,
    pub last_build_errors: usize,
    pub search_count: u64,
    pub average_search_time_ms: f64,
    pub cache_hit_rate: f64,
    pub memory_usage_bytes: usize,
    pub memory_limit_bytes: usize,
    /// 0 to 100.
    pub health_score: u8,
    pub state: String,
}

/// Build progress information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexStatus {
    /// Current state of the index.
    pub state: String,
    /// Root path of the last build.
    pub root: Option<String>,
    /// Number of entries in the index.
    pub indexed_entries: usize,
    /// Number of files scanned by the current or last build.
    pub scanned_files: usize,
    /// Number of directories scanned by the current or last build.
    pub scanned_dirs: usize,
    /// Number of children rejected by exclusion rules.
    pub skipped: usize,
    /// Number of listing or hashing errors.
    pub errors: usize,
    pub started_at: Option<u64>,
    pub finished_at: Option<u64>,
    /// Last error message if state is "error".
    pub last_error: Option<String>,
    /// Whether the auto-rebuild task is running.
    pub auto_update_enabled: bool,
}
