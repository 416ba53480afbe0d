//! Derived index health score.

use crate::types::IndexStatistics;

/// Cache lookups needed before the hit rate affects health.
const MIN_CACHE_LOOKUPS: u64 = 10;

/// Scores index health from 0 (unusable) to 100.
///
/// Penalties: failed last build, empty index, memory pressure, listing and
/// hashing errors, slow searches and a poor cache hit rate.
pub fn health_score(statistics: &IndexStatistics, cache_lookups: u64) -> u8 {
    let mut score: f64 = 100.0;

    match statistics.state.as_str() {
        "error" => score -= 30.0,
        "building" => {}
        _ if statistics.total_entries == 0 => score -= 20.0,
        _ => {}
    }

    if statistics.memory_limit_bytes > 0 {
        let pressure = statistics.memory_usage_bytes as f64 / statistics.memory_limit_bytes as f64;
        if pressure > 1.0 {
            score -= 20.0;
        } else if pressure > 0.8 {
            score -= 10.0;
        }
    }

    score -= (statistics.last_build_errors as f64 * 2.0).min(20.0);

    if statistics.average_search_time_ms > 100.0 {
        score -= 15.0;
    } else if statistics.average_search_time_ms > 50.0 {
        score -= 5.0;
    }

    if cache_lookups >= MIN_CACHE_LOOKUPS {
        score -= (1.0 - statistics.cache_hit_rate).clamp(0.0, 1.0) * 15.0;
    }

    score.clamp(0.0, 100.0).round() as u8
}
