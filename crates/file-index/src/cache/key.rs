use std::hash::{Hash, Hasher};

use fnv::FnvHasher;

use crate::types::SearchOptions;

/// Deterministic cache key for a normalized query and its options.
pub fn cache_key(query: &str, options: &SearchOptions) -> u64 {
    let mut hasher = FnvHasher::default();
    query.hash(&mut hasher);
    options.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FileCategory, SortBy};

    #[test]
    fn key_is_stable_and_option_sensitive() {
        let options = SearchOptions::default();
        assert_eq!(cache_key("main", &options), cache_key("main", &options));
        assert_ne!(cache_key("main", &options), cache_key("mai", &options));

        let sorted = SearchOptions {
            sort_by: SortBy::Name,
            ..SearchOptions::default()
        };
        assert_ne!(cache_key("main", &options), cache_key("main", &sorted));

        let filtered = SearchOptions {
            type_filter: vec![FileCategory::Code],
            ..SearchOptions::default()
        };
        assert_ne!(cache_key("main", &options), cache_key("main", &filtered));
    }
}
