//! Match strategy selection.

use crate::types::SearchType;

/// Queries up to this many characters are treated as "still typing".
pub const SHORT_QUERY_CHARS: usize = 4;

/// Governs which match kinds are considered for a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStrategy {
    /// Full-name equality only.
    Exact,
    /// Exact, then prefix, then substring.
    Prefix,
    /// Exact, then substring, then edit-distance similarity.
    Fuzzy,
    /// Every match kind.
    Hybrid,
}

impl MatchStrategy {
    /// Picks the strategy for a normalized query.
    ///
    /// `Smart` prefers prefix matching for short queries, exact-leaning hybrid
    /// matching when the query looks like a file name, and fuzzy matching
    /// otherwise.
    pub fn select(search_type: SearchType, query: &str) -> Self {
        match search_type {
            SearchType::Exact => Self::Exact,
            SearchType::Prefix => Self::Prefix,
            SearchType::Fuzzy => Self::Fuzzy,
            SearchType::Smart => {
                if query.chars().count() <= SHORT_QUERY_CHARS {
                    Self::Prefix
                } else if query.contains('.') {
                    Self::Hybrid
                } else {
                    Self::Fuzzy
                }
            }
        }
    }

    pub fn allows_prefix(self) -> bool {
        matches!(self, Self::Prefix | Self::Hybrid)
    }

    pub fn allows_contain(self) -> bool {
        !matches!(self, Self::Exact)
    }

    pub fn allows_fuzzy(self) -> bool {
        matches!(self, Self::Fuzzy | Self::Hybrid)
    }
}
