//! Search result caching.
//!
//! - `result_cache` - bounded TTL cache with bulk eviction
//! - `metrics` - counters, latency window and anomaly detection
//! - `key` - deterministic keys for (query, options) pairs
//! - `footprint` - size estimates used to refuse oversized values

mod footprint;
mod key;
mod metrics;
mod result_cache;

pub use footprint::MemoryFootprint;
pub use key::cache_key;
pub use metrics::{
    CacheAnomaly, CacheMetrics, CacheOperation, PerformanceReport, LATENCY_WINDOW,
    MIN_ANOMALY_SAMPLES,
};
pub use result_cache::{CacheErrorCallback, ResultCache};
