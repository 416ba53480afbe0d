//! File search index for launcher-style lookups.
//!
//! This crate provides:
//! - Recursive indexing of a root directory with exclusion rules
//! - Entry classification into categories and tags
//! - Ranked exact, prefix, contain and fuzzy search with match positions
//! - A bounded TTL result cache with performance metrics
//! - Periodic background rebuilds and health statistics

pub mod cache;
pub mod classify;
pub mod config;
pub mod error;
pub mod indexer;
pub mod query;
pub mod search;
pub mod service;
pub mod source;
pub mod storage;
pub mod types;

// Re-export main types
pub use cache::{PerformanceReport, ResultCache};
pub use config::{CacheConfig, EvictionPolicy, IndexConfig, IndexConfigPatch};
pub use error::{CacheError, IndexError, Result};
pub use indexer::BuildSummary;
pub use query::{BasicNormalizer, QueryNormalizer};
pub use service::{AutoUpdateHandle, BuildOutcome, Collaborators, IndexService};
pub use source::{
    ContentHasher, DirectoryLister, LocalFileSystem, MemoryFileSystem, SnippetExtractor,
};
pub use storage::IndexStore;
pub use types::{
    DirectoryEntry, EnhancedSearchResult, EntryType, FileCategory, IndexEntry, IndexEntryPatch,
    IndexStatistics, IndexStatus, KindFilter, MatchPosition, MatchType, MatchedFields,
    SearchOptions, SearchType, SortBy, SortOrder,
};
