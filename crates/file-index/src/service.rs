//! IndexService - the public facade over builder, store, search and cache.
//!
//! Callers own their service instances. A build populates a fresh store that
//! replaces the current one only on success, so searches always see the last
//! complete index.

mod auto_update;
mod health;

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::cache::{CacheErrorCallback, PerformanceReport};
use crate::config::{IndexConfig, IndexConfigPatch};
use crate::error::{IndexError, Result};
use crate::indexer::{
    unix_now_millis, BuildSummary, IndexBuildProgress, IndexBuildState, IndexBuilder,
};
use crate::query::{BasicNormalizer, QueryNormalizer};
use crate::search::{SearchContext, SearchEngine};
use crate::source::{ContentHasher, DirectoryLister, LocalFileSystem, SnippetExtractor};
use crate::storage::IndexStore;
use crate::types::{
    EnhancedSearchResult, IndexEntry, IndexEntryPatch, IndexStatistics, IndexStatus,
    SearchOptions,
};

pub use auto_update::AutoUpdateHandle;
pub use health::health_score;

/// External services the index calls into.
#[derive(Clone)]
pub struct Collaborators {
    pub lister: Arc<dyn DirectoryLister>,
    pub hasher: Arc<dyn ContentHasher>,
    pub snippets: Arc<dyn SnippetExtractor>,
    pub normalizer: Arc<dyn QueryNormalizer>,
}

impl Collaborators {
    /// Local disk access with the basic normalizer.
    pub fn local() -> Self {
        Self::from_source(Arc::new(LocalFileSystem::new()))
    }

    /// Uses one source for listing, hashing and snippets.
    pub fn from_source<S>(source: Arc<S>) -> Self
    where
        S: DirectoryLister + ContentHasher + SnippetExtractor + 'static,
    {
        Self {
            lister: source.clone(),
            hasher: source.clone(),
            snippets: source,
            normalizer: Arc::new(BasicNormalizer),
        }
    }

    pub fn with_normalizer(mut self, normalizer: Arc<dyn QueryNormalizer>) -> Self {
        self.normalizer = normalizer;
        self
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}

/// Result of a `build_index` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
    Completed(BuildSummary),
    /// Another build was in flight; nothing was done.
    AlreadyRunning,
}

#[derive(Debug, Default)]
struct BuildRecord {
    root: Option<String>,
    build_count: u64,
    last_build_time: u64,
    last_build_duration_ms: u64,
    total_build_ms: u64,
    last_build_errors: usize,
    last_error: Option<String>,
}

/// Clears the indexing flag when a build ends, including when its future is
/// dropped mid-walk.
struct IndexingGuard<'a> {
    service: &'a IndexService,
    finished: bool,
}

impl Drop for IndexingGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            let state = if self.service.store.read().is_empty() {
                IndexBuildState::Idle
            } else {
                IndexBuildState::Ready
            };
            state.store(&self.service.build_state);
        }
        self.service.indexing.store(false, Ordering::Release);
    }
}

#[derive(Debug)]
pub struct IndexService {
    config: RwLock<IndexConfig>,
    collaborators: Collaborators,
    store: RwLock<IndexStore>,
    engine: SearchEngine,
    indexing: AtomicBool,
    build_state: AtomicU8,
    progress: IndexBuildProgress,
    builds: Mutex<BuildRecord>,
    auto_update: Mutex<Option<AutoUpdateHandle>>,
    destroyed: AtomicBool,
}

impl IndexService {
    /// Creates a service after validating `config`.
    pub fn new(config: IndexConfig, collaborators: Collaborators) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            engine: SearchEngine::new(config.cache.clone()),
            config: RwLock::new(config),
            collaborators,
            store: RwLock::new(IndexStore::new()),
            indexing: AtomicBool::new(false),
            build_state: AtomicU8::new(IndexBuildState::Idle as u8),
            progress: IndexBuildProgress::default(),
            builds: Mutex::new(BuildRecord::default()),
            auto_update: Mutex::new(None),
            destroyed: AtomicBool::new(false),
        })
    }

    /// A service over the local filesystem.
    pub fn local(config: IndexConfig) -> Result<Self> {
        Self::new(config, Collaborators::local())
    }

    /// Routes rejected cache writes to `callback`.
    pub fn with_cache_error_callback(self, callback: CacheErrorCallback) -> Self {
        Self {
            engine: self.engine.with_cache_error_callback(callback),
            ..self
        }
    }

    /// Rebuilds the index from `root`.
    ///
    /// Without a root the previous build's root is reused, then `$HOME`.
    /// Returns `AlreadyRunning` immediately if a build is in flight.
    pub async fn build_index(&self, root: Option<&str>) -> Result<BuildOutcome> {
        self.ensure_alive()?;
        let root = self.resolve_root(root)?;

        if self
            .indexing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            log::warn!("file index build already running, ignoring request root={}", root);
            return Ok(BuildOutcome::AlreadyRunning);
        }
        let mut guard = IndexingGuard {
            service: self,
            finished: false,
        };

        let config = self.config();
        let started_at = unix_now_millis();
        self.progress.reset_for_build(started_at);
        IndexBuildState::Building.store(&self.build_state);
        log::info!("file index build started root={}", root);

        let builder = IndexBuilder::new(
            self.collaborators.lister.as_ref(),
            self.collaborators.hasher.as_ref(),
            &config,
            &self.progress,
        );
        let result = builder.build(&root).await;
        let finished_at = unix_now_millis();
        self.progress.finish(finished_at);
        guard.finished = true;

        match result {
            Ok((store, summary)) => {
                *self.store.write() = store;
                self.engine.clear_cache();
                {
                    let mut builds = self.builds.lock();
                    builds.root = Some(root.clone());
                    builds.build_count += 1;
                    builds.last_build_time = finished_at;
                    builds.last_build_duration_ms = summary.duration_ms;
                    builds.total_build_ms += summary.duration_ms;
                    builds.last_build_errors = summary.errors;
                    builds.last_error = None;
                }
                IndexBuildState::Ready.store(&self.build_state);
                log::info!(
                    "file index build finished root={} entries={} files={} dirs={} skipped={} errors={} duration_ms={}",
                    root,
                    summary.entries,
                    summary.files,
                    summary.directories,
                    summary.skipped,
                    summary.errors,
                    summary.duration_ms
                );
                Ok(BuildOutcome::Completed(summary))
            }
            Err(error) => {
                self.builds.lock().last_error = Some(error.to_string());
                IndexBuildState::Error.store(&self.build_state);
                log::warn!("file index build failed root={}: {}", root, error);
                Err(error)
            }
        }
    }

    fn resolve_root(&self, root: Option<&str>) -> Result<String> {
        if let Some(root) = root {
            return Ok(root.to_string());
        }
        if let Some(previous) = self.builds.lock().root.clone() {
            return Ok(previous);
        }
        std::env::var("HOME")
            .ok()
            .filter(|home| !home.is_empty())
            .ok_or_else(|| IndexError::InvalidRoot("no root given and HOME is not set".to_string()))
    }

    /// Ranked search; never fails, errors yield an empty list.
    pub async fn search(&self, query: &str, options: &SearchOptions) -> Vec<EnhancedSearchResult> {
        if self.destroyed.load(Ordering::Acquire) {
            log::debug!("file index search on destroyed service ignored");
            return Vec::new();
        }
        let config = self.config();
        let context = SearchContext {
            store: &self.store,
            config: &config,
            normalizer: self.collaborators.normalizer.as_ref(),
            snippets: self.collaborators.snippets.as_ref(),
        };
        self.engine.search(&context, query, options).await
    }

    /// Records that the user opened `path`. Returns false for unknown paths.
    pub fn update_access_info(&self, path: &str) -> bool {
        let updated = self.store.write().record_access(path, unix_now_millis());
        if updated {
            // Cached rankings no longer reflect the access counts.
            self.engine.clear_cache();
        } else {
            log::debug!("file index access for unknown path={}", path);
        }
        updated
    }

    pub fn get_entry(&self, path: &str) -> Option<IndexEntry> {
        self.store.read().get_entry(path).cloned()
    }

    /// Inserts an entry outside of a build; invalid entries are refused.
    pub fn add_entry(&self, entry: IndexEntry) -> bool {
        let added = self.store.write().add_entry(entry);
        if added {
            self.engine.clear_cache();
        }
        added
    }

    /// Merges `patch` into the entry at `path`, keeping it unchanged if the
    /// result would be invalid.
    pub fn update_entry(&self, path: &str, patch: &IndexEntryPatch) -> bool {
        let updated = self.store.write().update_entry(path, patch);
        if updated {
            self.engine.clear_cache();
        }
        updated
    }

    pub fn remove_entry(&self, path: &str) -> Option<IndexEntry> {
        let removed = self.store.write().remove_entry(path);
        if removed.is_some() {
            self.engine.clear_cache();
        }
        removed
    }

    pub fn statistics(&self) -> IndexStatistics {
        let store = self.store.read().statistics();
        let search = self.engine.statistics();
        let cache = self.engine.cache().metrics();
        let builds = self.builds.lock();
        let config = self.config.read();

        let mut statistics = IndexStatistics {
            total_entries: store.entries,
            total_files: store.files,
            total_directories: store.directories,
            total_size: store.total_size,
            category_counts: store.category_counts,
            build_count: builds.build_count,
            last_build_time: builds.last_build_time,
            last_build_duration_ms: builds.last_build_duration_ms,
            average_build_time_ms: if builds.build_count == 0 {
                0.0
            } else {
                builds.total_build_ms as f64 / builds.build_count as f64
            },
            last_build_errors: builds.last_build_errors,
            search_count: search.search_count,
            average_search_time_ms: search.average_search_time_ms,
            cache_hit_rate: cache.hit_rate(),
            memory_usage_bytes: store.memory_bytes,
            memory_limit_bytes: config.performance.memory_limit,
            health_score: 0,
            state: IndexBuildState::load(&self.build_state).as_str().to_string(),
        };
        statistics.health_score = health_score(&statistics, cache.hits + cache.misses);
        statistics
    }

    pub fn index_status(&self) -> IndexStatus {
        let progress = self.progress.snapshot();
        let builds = self.builds.lock();
        IndexStatus {
            state: IndexBuildState::load(&self.build_state).as_str().to_string(),
            root: builds.root.clone(),
            indexed_entries: self.store.read().len(),
            scanned_files: progress.scanned_files,
            scanned_dirs: progress.scanned_dirs,
            skipped: progress.skipped,
            errors: progress.errors,
            started_at: progress.started_at,
            finished_at: progress.finished_at,
            last_error: builds.last_error.clone(),
            auto_update_enabled: self
                .auto_update
                .lock()
                .as_ref()
                .is_some_and(AutoUpdateHandle::is_running),
        }
    }

    /// Drops every entry and cached result. Build history is kept.
    pub fn clear_index(&self) {
        self.store.write().clear();
        self.engine.clear_cache();
        if !self.indexing.load(Ordering::Acquire) {
            IndexBuildState::Idle.store(&self.build_state);
        }
        log::info!("file index cleared");
    }

    /// Stops background work and releases the index. Later builds fail with
    /// `IndexError::Destroyed` and searches return nothing.
    pub fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.stop_auto_update();
        self.store.write().clear();
        self.engine.clear_cache();
        self.engine.reset_statistics();
        self.engine.cache().reset_metrics();
        *self.builds.lock() = BuildRecord::default();
        IndexBuildState::Idle.store(&self.build_state);
        log::info!("file index destroyed");
    }

    pub fn config(&self) -> IndexConfig {
        self.config.read().clone()
    }

    /// Applies a partial config update; invalid updates leave the old config.
    pub fn update_config(&self, patch: &IndexConfigPatch) -> Result<()> {
        self.ensure_alive()?;
        let mut config = self.config.write();
        let updated = patch.merged_into(&config)?;
        if updated.cache != config.cache {
            self.engine.reconfigure_cache(updated.cache.clone());
        }
        if patch.affects_results() {
            self.engine.clear_cache();
        }
        *config = updated;
        log::info!("file index config updated");
        Ok(())
    }

    pub fn cache_report(&self) -> PerformanceReport {
        self.engine.cache_report()
    }

    /// Starts periodic rebuilds of `root` (or the last root) on the current
    /// tokio runtime, replacing any running schedule.
    pub fn start_auto_update(self: &Arc<Self>, root: Option<&str>) -> Result<AutoUpdateHandle> {
        self.ensure_alive()?;
        let root = self.resolve_root(root)?;
        if !Path::new(&root).is_absolute() {
            return Err(IndexError::InvalidRoot(format!(
                "root path must be absolute: {root}"
            )));
        }
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|error| IndexError::Internal(format!("no tokio runtime: {error}")))?;

        let handle = auto_update::spawn_auto_update(&runtime, Arc::downgrade(self), root.clone());
        if let Some(previous) = self.auto_update.lock().replace(handle.clone()) {
            previous.stop();
        }
        log::info!(
            "file index auto update started root={} interval_ms={}",
            root,
            self.config.read().update_interval_ms
        );
        Ok(handle)
    }

    /// Cancels the auto-rebuild task. Returns false if none was running.
    pub fn stop_auto_update(&self) -> bool {
        match self.auto_update.lock().take() {
            Some(handle) => {
                handle.stop();
                log::info!("file index auto update stopped");
                true
            }
            None => false,
        }
    }

    fn ensure_alive(&self) -> Result<()> {
        if self.destroyed.load(Ordering::Acquire) {
            Err(IndexError::Destroyed)
        } else {
            Ok(())
        }
    }
}
