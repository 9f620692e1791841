//! Fuzzy matching primitive backed by `nucleo-matcher`.
//!
//! Ranking code depends only on the [`FuzzyMatcher`] trait, so tests can
//! substitute a scripted matcher with fixed scores.

use nucleo_matcher::pattern::{CaseMatching, Normalization, Pattern};
use nucleo_matcher::{Config, Matcher, Utf32Str};

/// Outcome of matching one query against one candidate text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuzzyMatch {
    pub score: i64,
    /// Char indices into the candidate text, ascending and unique.
    pub positions: Vec<usize>,
}

/// Decide whether `query` matches `text`, and how well.
pub trait FuzzyMatcher {
    fn fuzzy_match(&mut self, query: &str, text: &str) -> Option<FuzzyMatch>;
}

/// Default matcher: nucleo fuzzy atoms with smart case and normalization.
pub struct NucleoMatcher {
    matcher: Matcher,
    indices: Vec<u32>,
    buf: Vec<char>,
}

impl NucleoMatcher {
    pub fn new() -> Self {
        Self {
            matcher: Matcher::new(Config::DEFAULT),
            indices: Vec::new(),
            buf: Vec::new(),
        }
    }
}

impl Default for NucleoMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl FuzzyMatcher for NucleoMatcher {
    fn fuzzy_match(&mut self, query: &str, text: &str) -> Option<FuzzyMatch> {
        let pattern = Pattern::parse(query, CaseMatching::Smart, Normalization::Smart);
        self.indices.clear();
        let haystack = Utf32Str::new(text, &mut self.buf);
        let score = pattern.indices(haystack, &mut self.matcher, &mut self.indices)?;
        // Multi-atom patterns report indices per atom.
        self.indices.sort_unstable();
        self.indices.dedup();
        Some(FuzzyMatch {
            score: i64::from(score),
            positions: self.indices.iter().map(|&i| i as usize).collect(),
        })
    }
}
