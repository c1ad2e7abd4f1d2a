//! Similarity scorers for fuzzy token matching
//!
//! All scorers return an integer percentage in `0..=100` and are
//! deterministic. Inputs are expected to be case-normalized by the caller.

use serde::{Deserialize, Serialize};
use strsim::{jaro_winkler, normalized_levenshtein};

/// A similarity function usable by the token matcher
pub trait ScoreFn {
    fn score(&self, a: &str, b: &str) -> u8;
}

impl<F> ScoreFn for F
where
    F: Fn(&str, &str) -> u8,
{
    fn score(&self, a: &str, b: &str) -> u8 {
        self(a, b)
    }
}

/// Built-in scorers, selectable from configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scorer {
    /// Levenshtein ratio with substitutions costing two edits
    #[default]
    IndelRatio,
    /// strsim normalized Levenshtein distance
    NormalizedLevenshtein,
    /// strsim Jaro-Winkler similarity
    JaroWinkler,
}

impl Scorer {
    pub fn name(&self) -> &'static str {
        match self {
            Scorer::IndelRatio => "indel_ratio",
            Scorer::NormalizedLevenshtein => "normalized_levenshtein",
            Scorer::JaroWinkler => "jaro_winkler",
        }
    }

    pub fn all() -> [Scorer; 3] {
        [Scorer::IndelRatio, Scorer::NormalizedLevenshtein, Scorer::JaroWinkler]
    }
}

impl ScoreFn for Scorer {
    fn score(&self, a: &str, b: &str) -> u8 {
        match self {
            Scorer::IndelRatio => indel_ratio(a, b),
            Scorer::NormalizedLevenshtein => to_percent(normalized_levenshtein(a, b)),
            Scorer::JaroWinkler => to_percent(jaro_winkler(a, b)),
        }
    }
}

/// `2 * LCS / (|a| + |b|)` as a percentage, counted in chars.
///
/// Equivalent to `(|a| + |b| - indel_distance) / (|a| + |b|)`.
pub fn indel_ratio(a: &str, b: &str) -> u8 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    let total = a.len() + b.len();
    if total == 0 {
        return 100;
    }

    let lcs = lcs_len(&a, &b);
    to_percent(2.0 * lcs as f64 / total as f64)
}

/// Longest common subsequence length, two-row DP
fn lcs_len(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }

    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];

    for ca in a {
        for (j, cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

fn to_percent(ratio: f64) -> u8 {
    (ratio * 100.0).round().clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indel_ratio_identical() {
        assert_eq!(indel_ratio("42.50", "42.50"), 100);
        assert_eq!(indel_ratio("", ""), 100);
    }

    #[test]
    fn test_indel_ratio_disjoint() {
        assert_eq!(indel_ratio("abc", "xyz"), 0);
        assert_eq!(indel_ratio("abc", ""), 0);
    }

    #[test]
    fn test_indel_ratio_known_values() {
        // lcs("hello", "hallo") = 4 -> 8 / 10
        assert_eq!(indel_ratio("hello", "hallo"), 80);
        // lcs = 5 -> 10 / 17
        assert_eq!(indel_ratio("total: 42.50", "42.50"), 59);
        assert_eq!(indel_ratio("total: 42.50", "total"), 59);
        // lcs("coffee", "cofee") = 5 -> 10 / 11
        assert_eq!(indel_ratio("coffee", "cofee"), 91);
    }

    #[test]
    fn test_indel_ratio_counts_chars_not_bytes() {
        assert_eq!(indel_ratio("café", "cafe"), 75);
    }

    #[test]
    fn test_lcs_len() {
        let a: Vec<char> = "kitten".chars().collect();
        let b: Vec<char> = "sitting".chars().collect();
        assert_eq!(lcs_len(&a, &b), 4);
    }

    #[test]
    fn test_strsim_scorers_in_range() {
        for scorer in Scorer::all() {
            assert_eq!(scorer.score("receipt", "receipt"), 100, "{}", scorer.name());
            assert!(scorer.score("receipt", "invoice") < 100);
        }
        assert_eq!(Scorer::NormalizedLevenshtein.score("hello", "hallo"), 80);
    }

    #[test]
    fn test_closure_scorer() {
        let always_90 = |_: &str, _: &str| 90u8;
        assert_eq!(always_90.score("a", "b"), 90);
    }

    #[test]
    fn test_scorer_serde_names() {
        let json = serde_json::to_string(&Scorer::JaroWinkler).unwrap();
        assert_eq!(json, "\"jaro_winkler\"");
        let parsed: Scorer = serde_json::from_str("\"indel_ratio\"").unwrap();
        assert_eq!(parsed, Scorer::IndelRatio);
    }
}
