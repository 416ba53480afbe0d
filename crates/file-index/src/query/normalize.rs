//! Query normalization.

use crate::error::Result;

/// Longest query kept after normalization, in characters.
pub const MAX_QUERY_CHARS: usize = 256;

/// Turns raw user input into the form the matcher compares against.
///
/// Implementations may sanitize input further; the matcher only requires the
/// result to be trimmed and lower-cased.
pub trait QueryNormalizer: Send + Sync {
    fn normalize(&self, raw: &str) -> Result<String>;
}

/// Trims, lower-cases, drops control characters and collapses whitespace.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicNormalizer;

impl QueryNormalizer for BasicNormalizer {
    fn normalize(&self, raw: &str) -> Result<String> {
        Ok(normalize_query(raw))
    }
}

pub fn normalize_query(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();
    cleaned
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
        .chars()
        .take(MAX_QUERY_CHARS)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_and_lowercases() {
        assert_eq!(normalize_query("  Main.TS  "), "main.ts");
    }

    #[test]
    fn collapses_whitespace_and_controls() {
        assert_eq!(normalize_query("q3\t\treport\u{0007}draft"), "q3 report draft");
    }

    #[test]
    fn blank_input_is_empty() {
        assert_eq!(normalize_query(" \n\t "), "");
    }

    #[test]
    fn caps_length() {
        let long = "a".repeat(MAX_QUERY_CHARS + 10);
        assert_eq!(normalize_query(&long).chars().count(), MAX_QUERY_CHARS);
    }
}
