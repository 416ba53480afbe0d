//! Index configuration.
//!
//! `IndexConfig` is the full, versioned configuration of an index service.
//! Unknown fields are rejected when deserializing, so a misspelled option is
//! an error rather than a silently ignored key. `IndexConfigPatch` carries a
//! partial update applied by `IndexService::update_config`.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{IndexError, Result};

/// Current configuration schema version.
pub const CONFIG_VERSION: u32 = 1;

const DEFAULT_EXCLUDED_DIRECTORIES: &[&str] = &[
    ".git",
    ".svn",
    ".hg",
    "node_modules",
    "target",
    "__pycache__",
    ".cache",
    ".idea",
    ".vscode",
    ".Trash",
];

const DEFAULT_EXCLUDED_EXTENSIONS: &[&str] = &["tmp", "temp", "swp", "swo", "bak", "crdownload"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct IndexConfig {
    pub version: u32,
    /// Auto-rebuild period in milliseconds; 0 disables auto-rebuild.
    pub update_interval_ms: u64,
    pub max_entries: usize,
    pub max_depth: usize,
    /// When non-empty, only files with one of these extensions are indexed.
    pub included_extensions: Vec<String>,
    pub excluded_extensions: Vec<String>,
    /// Directory names, or absolute directory paths, that are never entered.
    pub excluded_directories: Vec<String>,
    pub enable_content_index: bool,
    pub content_index_min_size: u64,
    pub content_index_max_size: u64,
    pub search: SearchWeights,
    pub performance: PerformanceConfig,
    pub ranking: RankingWeights,
    pub cache: CacheConfig,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            update_interval_ms: 5 * 60 * 1000,
            max_entries: 100_000,
            max_depth: 10,
            included_extensions: Vec::new(),
            excluded_extensions: DEFAULT_EXCLUDED_EXTENSIONS
                .iter()
                .map(|value| value.to_string())
                .collect(),
            excluded_directories: DEFAULT_EXCLUDED_DIRECTORIES
                .iter()
                .map(|value| value.to_string())
                .collect(),
            enable_content_index: false,
            content_index_min_size: 1,
            content_index_max_size: 10 * 1024 * 1024,
            search: SearchWeights::default(),
            performance: PerformanceConfig::default(),
            ranking: RankingWeights::default(),
            cache: CacheConfig::default(),
        }
    }
}

/// Weights used by the matching and scoring engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct SearchWeights {
    /// Maximum normalized edit distance (0..=1) accepted as a fuzzy match.
    pub fuzzy_threshold: f64,
    pub prefix_weight: f64,
    pub contain_weight: f64,
    pub type_preference_weight: f64,
    pub access_weight: f64,
    /// Weight of the recency term.
    pub prediction_weight: f64,
}

impl Default for SearchWeights {
    fn default() -> Self {
        Self {
            fuzzy_threshold: 0.4,
            prefix_weight: 0.8,
            contain_weight: 0.6,
            type_preference_weight: 1.0,
            access_weight: 5.0,
            prediction_weight: 10.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct PerformanceConfig {
    /// Hash the eligible files of a directory concurrently.
    pub concurrent_indexing: bool,
    /// Number of hash requests issued together.
    pub batch_size: usize,
    /// Estimated memory budget in bytes; exceeding it is logged, not enforced.
    pub memory_limit: usize,
    /// Store compact entries without owner, group and permission metadata.
    pub enable_compression: bool,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            concurrent_indexing: true,
            batch_size: 32,
            memory_limit: 256 * 1024 * 1024,
            enable_compression: false,
        }
    }
}

/// Blend used by the `recommendation` sort order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct RankingWeights {
    pub relevance: f64,
    pub recommendation: f64,
    pub access_bonus: f64,
}

impl Default for RankingWeights {
    fn default() -> Self {
        Self {
            relevance: 1.0,
            recommendation: 0.5,
            access_bonus: 2.0,
        }
    }
}

/// Which keys a full cache evicts first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EvictionPolicy {
    /// Oldest inserted keys go first, regardless of reads.
    #[default]
    InsertionOrder,
    /// Least recently read or written keys go first.
    LeastRecentlyUsed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct CacheConfig {
    pub max_size: usize,
    pub ttl_ms: u64,
    /// Fraction of entries dropped by one bulk eviction.
    pub cleanup_threshold: f64,
    pub eviction_policy: EvictionPolicy,
    /// A sample is anomalous when slower than `anomaly_factor` times the average.
    pub anomaly_factor: f64,
    /// Values estimated larger than this are refused.
    pub max_entry_bytes: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size: 100,
            ttl_ms: 5 * 60 * 1000,
            cleanup_threshold: 0.2,
            eviction_policy: EvictionPolicy::InsertionOrder,
            anomaly_factor: 3.0,
            max_entry_bytes: 4 * 1024 * 1024,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }
}

impl IndexConfig {
    /// Parses and validates a JSON configuration document.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let config: IndexConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn update_interval(&self) -> Option<Duration> {
        (self.update_interval_ms > 0).then(|| Duration::from_millis(self.update_interval_ms))
    }

    pub fn validate(&self) -> Result<()> {
        if self.version != CONFIG_VERSION {
            return Err(invalid(format!(
                "unsupported config version {} (expected {CONFIG_VERSION})",
                self.version
            )));
        }
        if self.max_entries == 0 {
            return Err(invalid("maxEntries must be greater than 0"));
        }
        if self.content_index_min_size > self.content_index_max_size {
            return Err(invalid(
                "contentIndexMinSize must not exceed contentIndexMaxSize",
            ));
        }
        let search = &self.search;
        if !(0.0..=1.0).contains(&search.fuzzy_threshold) {
            return Err(invalid("search.fuzzyThreshold must be within 0..=1"));
        }
        for (name, value) in [
            ("search.prefixWeight", search.prefix_weight),
            ("search.containWeight", search.contain_weight),
            ("search.typePreferenceWeight", search.type_preference_weight),
            ("search.accessWeight", search.access_weight),
            ("search.predictionWeight", search.prediction_weight),
            ("ranking.relevance", self.ranking.relevance),
            ("ranking.recommendation", self.ranking.recommendation),
            ("ranking.accessBonus", self.ranking.access_bonus),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(format!("{name} must be a non-negative number")));
            }
        }
        if self.performance.batch_size == 0 {
            return Err(invalid("performance.batchSize must be greater than 0"));
        }
        let cache = &self.cache;
        if cache.max_size == 0 {
            return Err(invalid("cache.maxSize must be greater than 0"));
        }
        if !(cache.cleanup_threshold > 0.0 && cache.cleanup_threshold <= 1.0) {
            return Err(invalid("cache.cleanupThreshold must be within (0, 1]"));
        }
        if !cache.anomaly_factor.is_finite() || cache.anomaly_factor <= 1.0 {
            return Err(invalid("cache.anomalyFactor must be greater than 1"));
        }
        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> IndexError {
    IndexError::InvalidConfig(message.into())
}

/// Partial configuration update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct IndexConfigPatch {
    pub update_interval_ms: Option<u64>,
    pub max_entries: Option<usize>,
    pub max_depth: Option<usize>,
    pub included_extensions: Option<Vec<String>>,
    pub excluded_extensions: Option<Vec<String>>,
    pub excluded_directories: Option<Vec<String>>,
    pub enable_content_index: Option<bool>,
    pub content_index_min_size: Option<u64>,
    pub content_index_max_size: Option<u64>,
    pub search: Option<SearchWeightsPatch>,
    pub performance: Option<PerformancePatch>,
    pub ranking: Option<RankingWeights>,
    pub cache: Option<CacheConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct SearchWeightsPatch {
    pub fuzzy_threshold: Option<f64>,
    pub prefix_weight: Option<f64>,
    pub contain_weight: Option<f64>,
    pub type_preference_weight: Option<f64>,
    pub access_weight: Option<f64>,
    pub prediction_weight: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct PerformancePatch {
    pub concurrent_indexing: Option<bool>,
    pub batch_size: Option<usize>,
    pub memory_limit: Option<usize>,
    pub enable_compression: Option<bool>,
}

impl IndexConfigPatch {
    /// Returns a validated copy of `base` with this patch applied.
    pub fn merged_into(&self, base: &IndexConfig) -> Result<IndexConfig> {
        let mut config = base.clone();
        set(&mut config.update_interval_ms, self.update_interval_ms);
        set(&mut config.max_entries, self.max_entries);
        set(&mut config.max_depth, self.max_depth);
        set(&mut config.included_extensions, self.included_extensions.clone());
        set(&mut config.excluded_extensions, self.excluded_extensions.clone());
        set(&mut config.excluded_directories, self.excluded_directories.clone());
        set(&mut config.enable_content_index, self.enable_content_index);
        set(&mut config.content_index_min_size, self.content_index_min_size);
        set(&mut config.content_index_max_size, self.content_index_max_size);

        if let Some(search) = &self.search {
            let target = &mut config.search;
            set(&mut target.fuzzy_threshold, search.fuzzy_threshold);
            set(&mut target.prefix_weight, search.prefix_weight);
            set(&mut target.contain_weight, search.contain_weight);
            set(&mut target.type_preference_weight, search.type_preference_weight);
            set(&mut target.access_weight, search.access_weight);
            set(&mut target.prediction_weight, search.prediction_weight);
        }
        if let Some(performance) = &self.performance {
            let target = &mut config.performance;
            set(&mut target.concurrent_indexing, performance.concurrent_indexing);
            set(&mut target.batch_size, performance.batch_size);
            set(&mut target.memory_limit, performance.memory_limit);
            set(&mut target.enable_compression, performance.enable_compression);
        }
        set(&mut config.ranking, self.ranking.clone());
        set(&mut config.cache, self.cache.clone());

        config.validate()?;
        Ok(config)
    }

    /// Returns true if applying this patch changes scoring or filtering, which
    /// makes cached result lists stale.
    pub fn affects_results(&self) -> bool {
        self.search.is_some()
            || self.ranking.is_some()
            || self.cache.is_some()
            || self.included_extensions.is_some()
            || self.excluded_extensions.is_some()
            || self.excluded_directories.is_some()
    }
}

fn set<T>(target: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *target = value;
    }
}
