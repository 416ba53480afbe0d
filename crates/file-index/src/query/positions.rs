//! Match position extraction for highlighting.
//!
//! Positions are half-open character ranges into the entry name, computed on
//! case-folded characters so offsets line up one-to-one with the original
//! name.

use super::fuzzy::aligned_char_indices;
use crate::types::{MatchPosition, MatchType};

/// Lower-cases each character to exactly one character, keeping offsets
/// aligned with the input.
pub fn fold_chars(value: &str) -> Vec<char> {
    value
        .chars()
        .map(|c| c.to_lowercase().next().unwrap_or(c))
        .collect()
}

/// Positions for a match of `match_type` between a folded name and query.
pub fn match_positions(match_type: MatchType, name: &[char], query: &[char]) -> Vec<MatchPosition> {
    match match_type {
        MatchType::Exact => vec![MatchPosition::new(0, name.len())],
        MatchType::Prefix => vec![MatchPosition::new(0, query.len().min(name.len()))],
        MatchType::Contain => occurrence_positions(name, query),
        MatchType::Fuzzy => subsequence_positions(name, query),
    }
}

/// Every non-overlapping occurrence of `query`, left to right.
pub fn occurrence_positions(name: &[char], query: &[char]) -> Vec<MatchPosition> {
    let mut positions = Vec::new();
    if query.is_empty() || query.len() > name.len() {
        return positions;
    }
    let mut start = 0usize;
    while start + query.len() <= name.len() {
        if name[start..start + query.len()] == *query {
            positions.push(MatchPosition::new(start, start + query.len()));
            start += query.len();
        } else {
            start += 1;
        }
    }
    positions
}

/// Greedily matched query characters, merged into contiguous runs.
pub fn subsequence_positions(name: &[char], query: &[char]) -> Vec<MatchPosition> {
    let mut positions: Vec<MatchPosition> = Vec::new();
    for index in aligned_char_indices(query, name) {
        match positions.last_mut() {
            Some(run) if run.end == index => run.end += 1,
            _ => positions.push(MatchPosition::new(index, index + 1)),
        }
    }
    positions
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(start: usize, end: usize) -> MatchPosition {
        MatchPosition::new(start, end)
    }

    #[test]
    fn fold_keeps_offsets() {
        let folded = fold_chars("ÄrgerLICH.TXT");
        assert_eq!(folded.len(), "ÄrgerLICH.TXT".chars().count());
        assert_eq!(folded.iter().collect::<String>(), "ärgerlich.txt");
    }

    #[test]
    fn exact_and_prefix_ranges() {
        let name = fold_chars("main.ts");
        assert_eq!(
            match_positions(MatchType::Exact, &name, &name),
            vec![span(0, 7)]
        );
        assert_eq!(
            match_positions(MatchType::Prefix, &name, &fold_chars("main")),
            vec![span(0, 4)]
        );
    }

    #[test]
    fn contain_lists_non_overlapping_occurrences() {
        let name = fold_chars("aaaa-b-aa");
        assert_eq!(
            occurrence_positions(&name, &fold_chars("aa")),
            vec![span(0, 2), span(2, 4), span(7, 9)]
        );
        assert!(occurrence_positions(&name, &fold_chars("zz")).is_empty());
    }

    #[test]
    fn contain_offsets_are_characters() {
        let name = fold_chars("résumé-report.pdf");
        assert_eq!(
            occurrence_positions(&name, &fold_chars("report")),
            vec![span(7, 13)]
        );
    }

    #[test]
    fn fuzzy_runs_are_merged() {
        let name = fold_chars("report.pdf");
        assert_eq!(
            subsequence_positions(&name, &fold_chars("repot")),
            vec![span(0, 4), span(5, 6)]
        );
    }
}
