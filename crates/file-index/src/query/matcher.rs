//! Per-entry matching and scoring.

use super::fuzzy::fuzzy_similarity;
use super::positions::{fold_chars, match_positions};
use super::strategy::MatchStrategy;
use crate::classify::{file_stem, file_type_preference_weight};
use crate::config::SearchWeights;
use crate::types::{
    EnhancedSearchResult, FileCategory, IndexEntry, MatchPosition, MatchType, MatchedFields,
};

const BASE_SCORE: f64 = 100.0;
const FUZZY_SCALE: f64 = 0.4;
const MILLIS_PER_DAY: f64 = 86_400_000.0;
const RECENCY_HALF_DAYS: f64 = 30.0;
const BYTES_PER_MIB: u64 = 1024 * 1024;
const OPEN_MILLIS_PER_MIB: u64 = 10;

/// Outcome of scoring one entry against one query.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryMatch {
    pub score: f64,
    pub match_type: MatchType,
    pub match_positions: Vec<MatchPosition>,
    pub matched_fields: MatchedFields,
    pub recommendation_score: f64,
    pub estimated_open_time: u64,
}

impl EntryMatch {
    pub fn into_result(self, entry: IndexEntry) -> EnhancedSearchResult {
        EnhancedSearchResult {
            entry,
            score: self.score,
            matched_fields: self.matched_fields,
            match_type: self.match_type,
            match_positions: self.match_positions,
            content_snippet: None,
            estimated_open_time: self.estimated_open_time,
            recommendation_score: self.recommendation_score,
        }
    }
}

/// A normalized query prepared for scoring many entries.
///
/// `now_ms` is captured once so every entry of a search sees the same clock.
#[derive(Debug, Clone)]
pub struct QueryMatcher<'a> {
    query: &'a str,
    chars: Vec<char>,
    strategy: MatchStrategy,
    weights: &'a SearchWeights,
    now_ms: u64,
}

impl<'a> QueryMatcher<'a> {
    pub fn new(
        query: &'a str,
        strategy: MatchStrategy,
        weights: &'a SearchWeights,
        now_ms: u64,
    ) -> Self {
        Self {
            query,
            chars: fold_chars(query),
            strategy,
            weights,
            now_ms,
        }
    }

    pub fn strategy(&self) -> MatchStrategy {
        self.strategy
    }

    /// Scores `entry`, returning `None` when no match term fires.
    pub fn evaluate(&self, entry: &IndexEntry) -> Option<EntryMatch> {
        if self.chars.is_empty() {
            return None;
        }
        let name = fold_chars(&entry.name);
        let (match_type, base) = self.classify(entry, &name)?;
        if base <= 0.0 {
            return None;
        }

        let preference = f64::from(file_type_preference_weight(entry.category));
        let frequency = access_factor(entry.access_count);
        let recency = recency_factor(entry, self.now_ms);
        let score = base
            + preference * self.weights.type_preference_weight
            + frequency * self.weights.access_weight
            + recency * self.weights.prediction_weight;

        let mut matched_fields = MatchedFields::NAME;
        if !entry.extension.is_empty() && entry.extension == self.query {
            matched_fields |= MatchedFields::EXTENSION;
        }

        Some(EntryMatch {
            score,
            match_type,
            match_positions: match_positions(match_type, &name, &self.chars),
            matched_fields,
            recommendation_score: recommendation_score(entry, match_type, self.now_ms),
            estimated_open_time: estimate_open_time(entry),
        })
    }

    fn classify(&self, entry: &IndexEntry, name: &[char]) -> Option<(MatchType, f64)> {
        let query = self.chars.as_slice();
        if name == query {
            return Some((MatchType::Exact, BASE_SCORE));
        }
        if self.strategy == MatchStrategy::Exact {
            return None;
        }

        if name.starts_with(query) {
            return Some(if self.strategy.allows_prefix() {
                (MatchType::Prefix, BASE_SCORE * self.weights.prefix_weight)
            } else {
                (MatchType::Contain, BASE_SCORE * self.weights.contain_weight)
            });
        }
        if contains(name, query) {
            return Some((MatchType::Contain, BASE_SCORE * self.weights.contain_weight));
        }

        if self.strategy.allows_fuzzy() {
            let stem = fold_chars(file_stem(&entry.name));
            let similarity =
                fuzzy_similarity(query, &[name, &stem], self.weights.fuzzy_threshold)?;
            return Some((MatchType::Fuzzy, BASE_SCORE * FUZZY_SCALE * similarity));
        }
        None
    }
}

/// Convenience wrapper for scoring a single entry.
pub fn score_entry(
    entry: &IndexEntry,
    query: &str,
    strategy: MatchStrategy,
    weights: &SearchWeights,
    now_ms: u64,
) -> Option<EntryMatch> {
    QueryMatcher::new(query, strategy, weights, now_ms).evaluate(entry)
}

fn contains(haystack: &[char], needle: &[char]) -> bool {
    needle.len() <= haystack.len() && haystack.windows(needle.len()).any(|w| w == needle)
}

/// `ln(1 + access_count)`.
pub fn access_factor(access_count: u64) -> f64 {
    (access_count as f64).ln_1p()
}

/// Decays from 1 towards 0 with the age of the most recent touch.
pub fn recency_factor(entry: &IndexEntry, now_ms: u64) -> f64 {
    let touched = entry.last_accessed.max(entry.modified_time);
    let age_days = now_ms.saturating_sub(touched) as f64 / MILLIS_PER_DAY;
    (-age_days / RECENCY_HALF_DAYS).exp()
}

/// Secondary ranking signal that favors used and recent entries.
pub fn recommendation_score(entry: &IndexEntry, match_type: MatchType, now_ms: u64) -> f64 {
    let bonus = match match_type {
        MatchType::Exact => 30.0,
        MatchType::Prefix => 20.0,
        MatchType::Contain => 10.0,
        MatchType::Fuzzy => 5.0,
    };
    bonus
        + f64::from(file_type_preference_weight(entry.category))
        + 10.0 * access_factor(entry.access_count)
        + 20.0 * recency_factor(entry, now_ms)
}

/// Rough time to open the entry in milliseconds.
pub fn estimate_open_time(entry: &IndexEntry) -> u64 {
    let base = if entry.is_dir() {
        20
    } else {
        match entry.category {
            FileCategory::Code => 30,
            FileCategory::Other | FileCategory::System => 50,
            FileCategory::Image => 80,
            FileCategory::Document | FileCategory::Audio => 100,
            FileCategory::Video => 200,
            FileCategory::Archive => 300,
            FileCategory::Executable => 500,
        }
    };
    base + entry.size / BYTES_PER_MIB * OPEN_MILLIS_PER_MIB
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::types::EntryType;

    const NOW: u64 = 1_700_000_000_000;
    const DAY: u64 = 86_400_000;

    fn entry(name: &str, category: FileCategory) -> IndexEntry {
        let extension = crate::classify::split_extension(name);
        IndexEntry {
            path: format!("/home/user/{name}"),
            name: name.to_string(),
            extension,
            size: 2048,
            modified_time: NOW - 400 * DAY,
            entry_type: EntryType::File,
            permissions: None,
            owner: None,
            group: None,
            content_hash: None,
            tags: BTreeSet::new(),
            access_count: 0,
            last_accessed: 0,
            category,
            weight: 1.0,
        }
    }

    fn evaluate(name: &str, query: &str, strategy: MatchStrategy) -> Option<EntryMatch> {
        let weights = SearchWeights::default();
        score_entry(&entry(name, FileCategory::Code), query, strategy, &weights, NOW)
    }

    #[test]
    fn exact_strategy_requires_full_name() {
        assert_eq!(
            evaluate("main.ts", "main.ts", MatchStrategy::Exact).map(|m| m.match_type),
            Some(MatchType::Exact)
        );
        assert!(evaluate("main.ts", "main", MatchStrategy::Exact).is_none());
    }

    #[test]
    fn prefix_strategy_orders_prefix_before_contain() {
        let prefix = evaluate("main.ts", "main", MatchStrategy::Prefix).unwrap();
        assert_eq!(prefix.match_type, MatchType::Prefix);
        assert_eq!(prefix.match_positions, vec![MatchPosition::new(0, 4)]);

        let contain = evaluate("domain.ts", "main", MatchStrategy::Prefix).unwrap();
        assert_eq!(contain.match_type, MatchType::Contain);
        assert!(prefix.score > contain.score);

        assert!(evaluate("mian.ts", "main", MatchStrategy::Prefix).is_none());
    }

    #[test]
    fn fuzzy_strategy_reports_prefix_hits_as_contain() {
        let hit = evaluate("report.pdf", "report", MatchStrategy::Fuzzy).unwrap();
        assert_eq!(hit.match_type, MatchType::Contain);
        assert_eq!(hit.match_positions, vec![MatchPosition::new(0, 6)]);
    }

    #[test]
    fn fuzzy_match_uses_stem_distance() {
        let hit = evaluate("report.pdf", "reprot", MatchStrategy::Fuzzy).unwrap();
        assert_eq!(hit.match_type, MatchType::Fuzzy);
        assert!(hit.score > 0.0);
        assert!(evaluate("report.pdf", "xyzxyz", MatchStrategy::Fuzzy).is_none());
        assert!(evaluate("report.pdf", "reprot", MatchStrategy::Prefix).is_none());
    }

    #[test]
    fn score_components_add_up() {
        let weights = SearchWeights::default();
        let mut candidate = entry("main.ts", FileCategory::Code);
        candidate.modified_time = NOW;
        let hit = score_entry(&candidate, "main.ts", MatchStrategy::Hybrid, &weights, NOW).unwrap();
        // exact 100 + code preference 7 + no accesses + full recency 10
        assert!((hit.score - 117.0).abs() < 1e-9);
        assert!((hit.recommendation_score - (30.0 + 7.0 + 20.0)).abs() < 1e-9);
    }

    #[test]
    fn access_and_recency_raise_score() {
        let weights = SearchWeights::default();
        let cold = entry("notes.md", FileCategory::Document);
        let mut warm = cold.clone();
        warm.access_count = 5;
        warm.last_accessed = NOW - DAY;

        let cold_hit = score_entry(&cold, "notes", MatchStrategy::Prefix, &weights, NOW).unwrap();
        let warm_hit = score_entry(&warm, "notes", MatchStrategy::Prefix, &weights, NOW).unwrap();
        assert!(warm_hit.score > cold_hit.score);
        assert!(warm_hit.recommendation_score > cold_hit.recommendation_score);
    }

    #[test]
    fn extension_field_is_flagged() {
        let hit = evaluate("pdf", "pdf", MatchStrategy::Hybrid).unwrap();
        assert_eq!(hit.matched_fields, MatchedFields::NAME);

        let hit = evaluate("archive.pdf", "pdf", MatchStrategy::Prefix).unwrap();
        assert!(hit.matched_fields.contains(MatchedFields::EXTENSION));
    }

    #[test]
    fn open_time_scales_with_category_and_size() {
        let mut video = entry("clip.mp4", FileCategory::Video);
        video.size = 3 * BYTES_PER_MIB + 10;
        assert_eq!(estimate_open_time(&video), 230);

        let mut dir = entry("photos", FileCategory::Other);
        dir.entry_type = EntryType::Directory;
        dir.size = 0;
        assert_eq!(estimate_open_time(&dir), 20);
    }

    #[test]
    fn recency_decays_with_age() {
        let mut fresh = entry("a.txt", FileCategory::Document);
        fresh.modified_time = NOW;
        assert!((recency_factor(&fresh, NOW) - 1.0).abs() < 1e-12);

        fresh.modified_time = NOW - 30 * DAY;
        assert!((recency_factor(&fresh, NOW) - (-1.0f64).exp()).abs() < 1e-12);
    }

    #[test]
    fn empty_query_never_matches() {
        assert!(evaluate("main.ts", "", MatchStrategy::Hybrid).is_none());
    }
}
