//! Text-to-box matcher
//!
//! Finds the single OCR token that best matches a free-text value. An exact
//! (case-insensitive) containment pass runs first; only if it finds nothing
//! does a fuzzy pass score every token. Multi-word values are not stitched
//! across tokens: a phrase like "Starbucks Coffee" can only match a token
//! that itself contains the whole phrase, or fuzzily match one word.

use tracing::debug;

use super::scoring::{ScoreFn, Scorer};
use crate::vision::{OcrToken, Polygon};

/// Default minimum fuzzy score (0-100)
pub const DEFAULT_MATCH_THRESHOLD: u8 = 80;

/// How a token was matched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// Target is a case-insensitive substring of the token text
    Exact,
    /// Best fuzzy score at or above the threshold
    Fuzzy(u8),
}

/// A matched token together with how it matched
#[derive(Debug, Clone, Copy)]
pub struct TokenMatch<'a> {
    pub index: usize,
    pub token: &'a OcrToken,
    pub kind: MatchKind,
}

/// Matches extracted values against OCR tokens
#[derive(Debug, Clone)]
pub struct TokenMatcher<S = Scorer> {
    threshold: u8,
    scorer: S,
}

impl Default for TokenMatcher<Scorer> {
    fn default() -> Self {
        Self::new(DEFAULT_MATCH_THRESHOLD, Scorer::default())
    }
}

impl<S: ScoreFn> TokenMatcher<S> {
    pub fn new(threshold: u8, scorer: S) -> Self {
        Self { threshold, scorer }
    }

    /// Polygon of the best-matching token, or `None` when nothing matches
    pub fn find_bounding_box<'a>(&self, target: &str, tokens: &'a [OcrToken]) -> Option<&'a Polygon> {
        self.find_match(target, tokens).map(|m| &m.token.polygon)
    }

    /// Best-matching token with match details
    pub fn find_match<'a>(&self, target: &str, tokens: &'a [OcrToken]) -> Option<TokenMatch<'a>> {
        let target = target.trim().to_lowercase();
        if target.is_empty() || tokens.is_empty() {
            return None;
        }

        let lowered: Vec<String> = tokens.iter().map(|t| t.text.to_lowercase()).collect();

        if let Some(index) = lowered.iter().position(|text| text.contains(&target)) {
            debug!("Exact match for {:?}: token #{} {:?}", target, index, tokens[index].text);
            return Some(TokenMatch {
                index,
                token: &tokens[index],
                kind: MatchKind::Exact,
            });
        }

        let mut best: Option<(usize, u8)> = None;
        let mut highest_score = 0u8;

        for (index, text) in lowered.iter().enumerate() {
            let score = self.scorer.score(&target, text);
            // Strict '>' keeps the earliest token on ties
            if score > highest_score && score >= self.threshold {
                highest_score = score;
                best = Some((index, score));
            }
        }

        match best {
            Some((index, score)) => {
                debug!(
                    "Fuzzy match for {:?}: token #{} {:?} scored {}",
                    target, index, tokens[index].text, score
                );
                Some(TokenMatch {
                    index,
                    token: &tokens[index],
                    kind: MatchKind::Fuzzy(score),
                })
            }
            None => {
                debug!("No token cleared threshold {} for {:?}", self.threshold, target);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(text: &str, id: i32) -> OcrToken {
        OcrToken::new(text, Polygon::from_pairs(&[(id, id), (id + 10, id), (id + 10, id + 5), (id, id + 5)]))
    }

    #[test]
    fn test_exact_substring_case_insensitive() {
        let tokens = vec![token("Receipt", 0), token("STARBUCKS", 1), token("42.50", 2)];
        let matcher = TokenMatcher::default();

        let m = matcher.find_match("starbucks", &tokens).unwrap();
        assert_eq!(m.index, 1);
        assert_eq!(m.kind, MatchKind::Exact);

        // Target contained in a longer token
        let m = matcher.find_match("42.5", &tokens).unwrap();
        assert_eq!(m.index, 2);
        assert_eq!(m.kind, MatchKind::Exact);
    }

    #[test]
    fn test_first_exact_token_wins() {
        let tokens = vec![token("Total", 0), token("SUBTOTAL", 1), token("total", 2)];
        let polygon = TokenMatcher::default().find_bounding_box("total", &tokens).unwrap();
        assert_eq!(polygon, &tokens[0].polygon);
    }

    #[test]
    fn test_exact_match_never_falls_through_to_fuzzy() {
        // The second token would score higher fuzzily, but the first contains the target
        let tokens = vec![token("xxcoffeexx", 0), token("coffee", 1)];
        let m = TokenMatcher::default().find_match("coffee", &tokens).unwrap();
        assert_eq!(m.index, 0);
        assert_eq!(m.kind, MatchKind::Exact);
    }

    #[test]
    fn test_empty_tokens_is_no_match() {
        let matcher = TokenMatcher::default();
        assert!(matcher.find_bounding_box("Total", &[]).is_none());
    }

    #[test]
    fn test_blank_target_is_no_match() {
        let tokens = vec![token("TOTAL", 0)];
        let matcher = TokenMatcher::default();
        assert!(matcher.find_match("", &tokens).is_none());
        assert!(matcher.find_match("   ", &tokens).is_none());
    }

    #[test]
    fn test_token_is_not_matched_against_longer_target() {
        // "42.50" is inside the target, but only target-in-token counts as exact,
        // and both tokens score 59 against the full target.
        let tokens = vec![token("TOTAL", 0), token("42.50", 1)];
        let matcher = TokenMatcher::default();
        assert!(matcher.find_match("Total: 42.50", &tokens).is_none());

        // With a permissive threshold the higher (here: equal, so first) score wins
        let relaxed = TokenMatcher::new(50, Scorer::IndelRatio);
        let m = relaxed.find_match("Total: 42.50", &tokens).unwrap();
        assert_eq!(m.index, 0);
        assert_eq!(m.kind, MatchKind::Fuzzy(59));
    }

    #[test]
    fn test_fuzzy_picks_highest_score() {
        // "coffe3" scores 83, "cofee" scores 91
        let tokens = vec![token("COFFE3", 0), token("cofee", 1), token("tea", 2)];
        let m = TokenMatcher::default().find_match("Coffee", &tokens).unwrap();
        assert_eq!(m.index, 1);
        assert_eq!(m.kind, MatchKind::Fuzzy(91));
    }

    #[test]
    fn test_fuzzy_tie_keeps_first_token() {
        // Both score exactly 80 against "hello"
        let tokens = vec![token("hallo", 0), token("hullo", 1)];
        let m = TokenMatcher::default().find_match("hello", &tokens).unwrap();
        assert_eq!(m.index, 0);
        assert_eq!(m.kind, MatchKind::Fuzzy(80));
    }

    #[test]
    fn test_threshold_is_inclusive_and_tunable() {
        let tokens = vec![token("hallo", 0)];
        assert!(TokenMatcher::new(80, Scorer::IndelRatio).find_match("hello", &tokens).is_some());
        assert!(TokenMatcher::new(81, Scorer::IndelRatio).find_match("hello", &tokens).is_none());
    }

    #[test]
    fn test_fuzzy_is_deterministic() {
        let tokens = vec![token("St4rbucks", 0), token("Starbuck", 1), token("Coffee", 2)];
        let matcher = TokenMatcher::default();
        let first = matcher.find_match("starbucks", &tokens).map(|m| m.index);
        for _ in 0..10 {
            assert_eq!(matcher.find_match("starbucks", &tokens).map(|m| m.index), first);
        }
    }

    #[test]
    fn test_multi_word_value_matches_single_token_only() {
        let tokens = vec![token("Starbucks", 0), token("Coffee", 1), token("#42", 2)];
        assert!(TokenMatcher::default().find_match("Starbucks Coffee #42", &tokens).is_none());
    }

    #[test]
    fn test_custom_scorer() {
        let tokens = vec![token("abc", 0), token("xyz", 1)];
        let prefers_x = |_: &str, b: &str| if b.starts_with('x') { 95u8 } else { 10u8 };
        let matcher = TokenMatcher::new(90, prefers_x);
        assert_eq!(matcher.find_match("q", &tokens).unwrap().index, 1);
    }
}
