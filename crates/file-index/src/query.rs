//! Query matching and scoring.
//!
//! - `normalize` - the `QueryNormalizer` seam and its default implementation
//! - `strategy` - which match kinds a query may produce
//! - `fuzzy` - optimal string alignment distance
//! - `positions` - highlight ranges inside entry names
//! - `matcher` - per-entry score, recommendation score and open-time estimate

mod fuzzy;
mod matcher;
mod normalize;
mod positions;
mod strategy;

pub use fuzzy::{normalized_distance, osa_distance};
pub use matcher::{
    access_factor, estimate_open_time, recency_factor, recommendation_score, score_entry,
    EntryMatch, QueryMatcher,
};
pub use normalize::{normalize_query, BasicNormalizer, QueryNormalizer, MAX_QUERY_CHARS};
pub use positions::{fold_chars, match_positions};
pub use strategy::{MatchStrategy, SHORT_QUERY_CHARS};
