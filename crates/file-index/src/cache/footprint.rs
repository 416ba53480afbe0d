use std::mem::size_of;

use crate::storage::estimated_entry_bytes;
use crate::types::{EnhancedSearchResult, MatchPosition};

/// Approximate heap size of a cached value.
pub trait MemoryFootprint {
    fn footprint_bytes(&self) -> usize;
}

impl MemoryFootprint for String {
    fn footprint_bytes(&self) -> usize {
        size_of::<String>() + self.len()
    }
}

impl MemoryFootprint for EnhancedSearchResult {
    fn footprint_bytes(&self) -> usize {
        size_of::<EnhancedSearchResult>()
            + estimated_entry_bytes(&self.entry)
            + self.match_positions.len() * size_of::<MatchPosition>()
            + self.content_snippet.as_ref().map_or(0, String::len)
    }
}

impl<T: MemoryFootprint> MemoryFootprint for Vec<T> {
    fn footprint_bytes(&self) -> usize {
        size_of::<Vec<T>>() + self.iter().map(T::footprint_bytes).sum::<usize>()
    }
}
