//! Ranked search over the index store.

use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::time::{Duration, Instant};

use futures_util::future::join_all;
use parking_lot::{Mutex, RwLock};
use rayon::iter::{ParallelBridge, ParallelIterator};
use serde::{Deserialize, Serialize};

use crate::cache::{cache_key, CacheErrorCallback, PerformanceReport, ResultCache};
use crate::config::{CacheConfig, IndexConfig, RankingWeights, SearchWeights};
use crate::error::{panic_error, Result};
use crate::indexer::unix_now_millis;
use crate::query::{access_factor, MatchStrategy, QueryMatcher, QueryNormalizer};
use crate::source::SnippetExtractor;
use crate::storage::IndexStore;
use crate::types::{EnhancedSearchResult, MatchedFields, SearchOptions, SortBy, SortOrder};

/// Everything a search reads besides its own cache.
pub struct SearchContext<'a> {
    pub store: &'a RwLock<IndexStore>,
    pub config: &'a IndexConfig,
    pub normalizer: &'a dyn QueryNormalizer,
    pub snippets: &'a dyn SnippetExtractor,
}

/// Running search counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchStats {
    pub search_count: u64,
    pub average_search_time_ms: f64,
}

impl SearchStats {
    fn record(&mut self, elapsed: Duration) {
        self.search_count += 1;
        let sample = elapsed.as_secs_f64() * 1000.0;
        self.average_search_time_ms +=
            (sample - self.average_search_time_ms) / self.search_count as f64;
    }
}

/// Evaluates queries against a store and caches the ranked lists.
#[derive(Debug)]
pub struct SearchEngine {
    cache: ResultCache<u64, Vec<EnhancedSearchResult>>,
    stats: Mutex<SearchStats>,
}

impl SearchEngine {
    pub fn new(cache_config: CacheConfig) -> Self {
        Self {
            cache: ResultCache::new(cache_config),
            stats: Mutex::new(SearchStats::default()),
        }
    }

    pub fn with_cache_error_callback(self, callback: CacheErrorCallback) -> Self {
        Self {
            cache: self.cache.with_error_callback(callback),
            stats: self.stats,
        }
    }

    /// Runs a search. Failures are logged and yield an empty list.
    pub async fn search(
        &self,
        context: &SearchContext<'_>,
        query: &str,
        options: &SearchOptions,
    ) -> Vec<EnhancedSearchResult> {
        match self.try_search(context, query, options).await {
            Ok(results) => results,
            Err(error) => {
                log::warn!("file index search failed query={:?}: {}", query, error);
                Vec::new()
            }
        }
    }

    async fn try_search(
        &self,
        context: &SearchContext<'_>,
        raw_query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<EnhancedSearchResult>> {
        let query = guarded(|| context.normalizer.normalize(raw_query))??;
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let key = cache_key(&query, options);
        if options.enable_cache {
            if let Some(cached) = self.cache.get(&key) {
                log::debug!("file index cache hit query={:?}", query);
                return Ok(cached);
            }
        }

        let started = Instant::now();
        let generation = self.cache.generation();
        let strategy = MatchStrategy::select(options.search_type, &query);
        let mut results = {
            let store = context.store.read();
            let now_ms = unix_now_millis();
            guarded(|| {
                evaluate_entries(&store, &query, strategy, options, &context.config.search, now_ms)
            })?
        };
        sort_results(
            &mut results,
            options.sort_by,
            options.sort_order,
            &context.config.ranking,
        );
        results.truncate(options.max_results);

        if options.include_content {
            attach_snippets(context.snippets, &query, &mut results).await;
        }
        if options.enable_cache {
            self.cache.set_if_current(key, results.clone(), generation);
        }
        self.stats.lock().record(started.elapsed());

        log::debug!(
            "file index search query={:?} strategy={:?} results={} elapsed_ms={}",
            query,
            strategy,
            results.len(),
            started.elapsed().as_millis()
        );
        Ok(results)
    }

    pub fn statistics(&self) -> SearchStats {
        self.stats.lock().clone()
    }

    pub fn reset_statistics(&self) {
        *self.stats.lock() = SearchStats::default();
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub fn reconfigure_cache(&self, config: CacheConfig) {
        self.cache.reconfigure(config);
    }

    pub fn cache(&self) -> &ResultCache<u64, Vec<EnhancedSearchResult>> {
        &self.cache
    }

    pub fn cache_report(&self) -> PerformanceReport {
        self.cache.generate_performance_report()
    }
}

fn guarded<T>(work: impl FnOnce() -> T) -> Result<T> {
    panic::catch_unwind(AssertUnwindSafe(work)).map_err(panic_error)
}

/// Scores every entry that passes the option filters, in parallel.
///
/// Entries without a positive score are dropped; the output order is
/// unspecified until sorted.
pub fn evaluate_entries(
    store: &IndexStore,
    query: &str,
    strategy: MatchStrategy,
    options: &SearchOptions,
    weights: &SearchWeights,
    now_ms: u64,
) -> Vec<EnhancedSearchResult> {
    let matcher = QueryMatcher::new(query, strategy, weights, now_ms);
    store
        .entries()
        .par_bridge()
        .filter(|entry| options.accepts(entry))
        .filter_map(|entry| {
            let matched = matcher.evaluate(entry)?;
            (matched.score > 0.0).then(|| matched.into_result(entry.clone()))
        })
        .collect()
}

/// Blended key used by `SortBy::Recommendation`.
pub fn recommendation_key(result: &EnhancedSearchResult, ranking: &RankingWeights) -> f64 {
    ranking.relevance * result.score
        + ranking.recommendation * result.recommendation_score
        + ranking.access_bonus * access_factor(result.entry.access_count)
}

/// Stable sort by `sort_by`; ties fall back to name, then path, ascending.
pub fn sort_results(
    results: &mut [EnhancedSearchResult],
    sort_by: SortBy,
    order: SortOrder,
    ranking: &RankingWeights,
) {
    results.sort_by(|a, b| {
        let primary = match sort_by {
            SortBy::Relevance => a.score.total_cmp(&b.score),
            SortBy::Name => a.entry.name.to_lowercase().cmp(&b.entry.name.to_lowercase()),
            SortBy::Modified => a.entry.modified_time.cmp(&b.entry.modified_time),
            SortBy::Size => a.entry.size.cmp(&b.entry.size),
            SortBy::Recommendation => {
                recommendation_key(a, ranking).total_cmp(&recommendation_key(b, ranking))
            }
        };
        let primary = match order {
            SortOrder::Asc => primary,
            SortOrder::Desc => primary.reverse(),
        };
        primary
            .then_with(|| a.entry.name.cmp(&b.entry.name))
            .then_with(|| a.entry.path.cmp(&b.entry.path))
    });
}

async fn attach_snippets(
    snippets: &dyn SnippetExtractor,
    query: &str,
    results: &mut [EnhancedSearchResult],
) {
    let lookups = results.iter().map(|result| async move {
        if !result.entry.is_file() {
            return None;
        }
        let path = Path::new(&result.entry.path);
        match snippets.content_snippet(path, query).await {
            Ok(snippet) => snippet,
            Err(error) => {
                log::debug!(
                    "file index snippet skipped path={}: {}",
                    result.entry.path,
                    error
                );
                None
            }
        }
    });
    let found = join_all(lookups).await;

    for (result, snippet) in results.iter_mut().zip(found) {
        if let Some(snippet) = snippet {
            result.matched_fields |= MatchedFields::CONTENT;
            result.content_snippet = Some(snippet);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::error::IndexError;
    use crate::query::BasicNormalizer;
    use crate::source::MemoryFileSystem;
    use crate::types::{EntryType, FileCategory, KindFilter, MatchType, SearchType};

    fn entry(path: &str, category: FileCategory, access_count: u64) -> crate::types::IndexEntry {
        let name = path.rsplit('/').next().unwrap_or(path).to_string();
        crate::types::IndexEntry {
            path: path.to_string(),
            extension: crate::classify::split_extension(&name),
            name,
            size: 4096,
            modified_time: 0,
            entry_type: EntryType::File,
            permissions: None,
            owner: None,
            group: None,
            content_hash: None,
            tags: BTreeSet::new(),
            access_count,
            last_accessed: 0,
            category,
            weight: 1.0,
        }
    }

    fn store() -> RwLock<IndexStore> {
        let mut store = IndexStore::new();
        store.add_entry(entry("/w/report.pdf", FileCategory::Document, 0));
        store.add_entry(entry("/w/report-draft.md", FileCategory::Document, 3));
        store.add_entry(entry("/w/main.ts", FileCategory::Code, 0));
        store.add_entry(entry("/w/domain.rs", FileCategory::Code, 0));
        let mut dir = entry("/w/reports", FileCategory::Other, 0);
        dir.entry_type = EntryType::Directory;
        dir.extension.clear();
        store.add_entry(dir);
        RwLock::new(store)
    }

    struct Fixture {
        store: RwLock<IndexStore>,
        config: IndexConfig,
        fs: MemoryFileSystem,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                store: store(),
                config: IndexConfig::default(),
                fs: MemoryFileSystem::new(),
            }
        }

        fn context<'a>(&'a self, normalizer: &'a dyn QueryNormalizer) -> SearchContext<'a> {
            SearchContext {
                store: &self.store,
                config: &self.config,
                normalizer,
                snippets: &self.fs,
            }
        }
    }

    fn names(results: &[EnhancedSearchResult]) -> Vec<&str> {
        results.iter().map(|r| r.entry.name.as_str()).collect()
    }

    #[tokio::test]
    async fn empty_query_skips_cache_and_statistics() {
        let fixture = Fixture::new();
        let engine = SearchEngine::new(CacheConfig::default());
        let results = engine
            .search(&fixture.context(&BasicNormalizer), "   ", &SearchOptions::default())
            .await;
        assert!(results.is_empty());
        assert_eq!(engine.cache().metrics().total_requests, 0);
        assert_eq!(engine.statistics().search_count, 0);
    }

    #[tokio::test]
    async fn short_queries_prefer_prefix_matches() {
        let fixture = Fixture::new();
        let engine = SearchEngine::new(CacheConfig::default());
        let results = engine
            .search(&fixture.context(&BasicNormalizer), "Main", &SearchOptions::default())
            .await;
        assert_eq!(results[0].entry.name, "main.ts");
        assert_eq!(results[0].match_type, MatchType::Prefix);
        let domain = results.iter().find(|r| r.entry.name == "domain.rs").unwrap();
        assert_eq!(domain.match_type, MatchType::Contain);
        assert!(results.iter().all(|r| r.score > 0.0));
    }

    #[tokio::test]
    async fn second_search_is_served_from_cache() {
        let fixture = Fixture::new();
        let engine = SearchEngine::new(CacheConfig::default());
        let context = fixture.context(&BasicNormalizer);
        let options = SearchOptions::default();

        let first = engine.search(&context, "report", &options).await;
        let second = engine.search(&context, "REPORT ", &options).await;
        assert_eq!(first, second);
        assert_eq!(engine.cache().metrics().hits, 1);
        assert_eq!(engine.statistics().search_count, 1);

        let uncached = SearchOptions {
            enable_cache: false,
            ..SearchOptions::default()
        };
        engine.search(&context, "report", &uncached).await;
        assert_eq!(engine.cache().metrics().hits, 1);
        assert_eq!(engine.statistics().search_count, 2);
    }

    #[tokio::test]
    async fn filters_and_truncation_apply() {
        let fixture = Fixture::new();
        let engine = SearchEngine::new(CacheConfig::default());
        let context = fixture.context(&BasicNormalizer);

        let documents = SearchOptions {
            type_filter: vec![FileCategory::Document],
            ..SearchOptions::default()
        };
        let results = engine.search(&context, "report", &documents).await;
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.entry.category == FileCategory::Document));

        let directories = SearchOptions {
            kind: KindFilter::Directory,
            ..SearchOptions::default()
        };
        assert_eq!(
            names(&engine.search(&context, "report", &directories).await),
            vec!["reports"]
        );

        let one = SearchOptions {
            max_results: 1,
            ..SearchOptions::default()
        };
        assert_eq!(engine.search(&context, "report", &one).await.len(), 1);
    }

    #[tokio::test]
    async fn exact_search_type_matches_whole_names_only() {
        let fixture = Fixture::new();
        let engine = SearchEngine::new(CacheConfig::default());
        let options = SearchOptions {
            search_type: SearchType::Exact,
            ..SearchOptions::default()
        };
        let results = engine
            .search(&fixture.context(&BasicNormalizer), "report.pdf", &options)
            .await;
        assert_eq!(names(&results), vec!["report.pdf"]);
        assert_eq!(results[0].match_type, MatchType::Exact);
    }

    #[tokio::test]
    async fn snippets_mark_content_field() {
        let fixture = Fixture::new();
        fixture
            .fs
            .add_text_file("/w/report-draft.md", "quarterly report for the board", 1);
        let engine = SearchEngine::new(CacheConfig::default());
        let options = SearchOptions {
            include_content: true,
            ..SearchOptions::default()
        };
        let results = engine
            .search(&fixture.context(&BasicNormalizer), "report", &options)
            .await;

        let draft = results
            .iter()
            .find(|r| r.entry.name == "report-draft.md")
            .unwrap();
        assert!(draft.matched_fields.contains(MatchedFields::CONTENT));
        assert_eq!(
            draft.content_snippet.as_deref(),
            Some("quarterly report for the board")
        );
        // Missing from the snippet source: no snippet, still returned.
        let pdf = results.iter().find(|r| r.entry.name == "report.pdf").unwrap();
        assert!(pdf.content_snippet.is_none());
    }

    struct FailingNormalizer;

    impl QueryNormalizer for FailingNormalizer {
        fn normalize(&self, _raw: &str) -> Result<String> {
            Err(IndexError::Normalize("rejected".to_string()))
        }
    }

    struct PanickingNormalizer;

    impl QueryNormalizer for PanickingNormalizer {
        fn normalize(&self, _raw: &str) -> Result<String> {
            panic!("normalizer exploded")
        }
    }

    #[tokio::test]
    async fn failures_become_empty_results() {
        let fixture = Fixture::new();
        let engine = SearchEngine::new(CacheConfig::default());
        let options = SearchOptions::default();
        assert!(engine
            .search(&fixture.context(&FailingNormalizer), "report", &options)
            .await
            .is_empty());
        assert!(engine
            .search(&fixture.context(&PanickingNormalizer), "report", &options)
            .await
            .is_empty());
    }

    #[test]
    fn recommendation_sort_is_monotonic_in_access_count() {
        let mut store = IndexStore::new();
        for (index, count) in [0u64, 7, 2, 40, 1].into_iter().enumerate() {
            store.add_entry(entry(&format!("/w/notes{index}.md"), FileCategory::Document, count));
        }
        let weights = SearchWeights::default();
        let mut results = evaluate_entries(
            &store,
            "notes",
            MatchStrategy::Fuzzy,
            &SearchOptions::default(),
            &weights,
            0,
        );
        sort_results(
            &mut results,
            SortBy::Recommendation,
            SortOrder::Desc,
            &RankingWeights::default(),
        );
        let counts: Vec<u64> = results.iter().map(|r| r.entry.access_count).collect();
        assert_eq!(counts, vec![40, 7, 2, 1, 0]);
    }

    #[test]
    fn ties_break_by_name_then_path() {
        let mut store = IndexStore::new();
        store.add_entry(entry("/b/same.txt", FileCategory::Document, 0));
        store.add_entry(entry("/a/same.txt", FileCategory::Document, 0));
        store.add_entry(entry("/a/other.txt", FileCategory::Document, 0));
        let mut results = evaluate_entries(
            &store,
            "txt",
            MatchStrategy::Prefix,
            &SearchOptions::default(),
            &SearchWeights::default(),
            0,
        );
        sort_results(
            &mut results,
            SortBy::Relevance,
            SortOrder::Desc,
            &RankingWeights::default(),
        );
        let paths: Vec<&str> = results.iter().map(|r| r.entry.path.as_str()).collect();
        assert_eq!(paths, vec!["/a/other.txt", "/a/same.txt", "/b/same.txt"]);
    }

    #[test]
    fn size_sort_honors_direction() {
        let mut store = IndexStore::new();
        for (name, size) in [("a.log", 30u64), ("b.log", 10), ("c.log", 20)] {
            let mut item = entry(&format!("/l/{name}"), FileCategory::Other, 0);
            item.size = size;
            store.add_entry(item);
        }
        let mut results = evaluate_entries(
            &store,
            "log",
            MatchStrategy::Prefix,
            &SearchOptions::default(),
            &SearchWeights::default(),
            0,
        );
        sort_results(&mut results, SortBy::Size, SortOrder::Asc, &RankingWeights::default());
        assert_eq!(names(&results), vec!["b.log", "c.log", "a.log"]);
    }
}
