//! Ranked search over the file index.
//!
//! `SearchEngine` owns the result cache and search counters; the store,
//! configuration and collaborators are borrowed per call through
//! `SearchContext`.

mod engine;

pub use engine::{
    evaluate_entries, recommendation_key, sort_results, SearchContext, SearchEngine, SearchStats,
};
