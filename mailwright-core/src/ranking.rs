//! Fuzzy candidate ranking.
//!
//! [`rank`] is pure given its inputs: it runs the matcher once per item,
//! drops non-matches, lets the caller adjust scores and shape the display
//! fields, then sorts by descending score. The sort is stable, so tied
//! candidates keep the order the items were supplied in.

use crate::fuzzy::{FuzzyMatch, FuzzyMatcher};

/// A scored match ready for display in an autocomplete dropdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedCandidate {
    /// Text shown in the dropdown row.
    pub display: String,
    /// Text inserted into the input when the candidate is accepted.
    pub value: String,
    pub score: i64,
    /// Char indices into `display` to highlight.
    pub positions: Vec<usize>,
    pub description: String,
    pub subtitle: String,
    pub icon: String,
}

/// Rank `items` against `query`.
///
/// `key` derives the search text for an item. `build` turns a matched item
/// into a candidate and is where source-specific score adjustments belong.
pub fn rank<T, M, K, B>(
    matcher: &mut M,
    query: &str,
    items: &[T],
    key: K,
    build: B,
) -> Vec<RankedCandidate>
where
    M: FuzzyMatcher + ?Sized,
    K: Fn(&T) -> String,
    B: Fn(&T, FuzzyMatch) -> RankedCandidate,
{
    let mut ranked: Vec<RankedCandidate> = items
        .iter()
        .filter_map(|item| {
            let text = key(item);
            matcher
                .fuzzy_match(query, &text)
                .map(|hit| build(item, hit))
        })
        .collect();
    // `sort_by` is stable; ties keep input order.
    ranked.sort_by(|a, b| b.score.cmp(&a.score));
    ranked
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::collections::HashMap;

    /// Matcher returning scripted scores keyed by candidate text.
    /// Texts without a script entry do not match.
    pub struct ScriptedMatcher {
        pub scores: HashMap<String, i64>,
        pub calls: usize,
    }

    impl ScriptedMatcher {
        pub fn new(entries: &[(&str, i64)]) -> Self {
            Self {
                scores: entries
                    .iter()
                    .map(|(text, score)| (text.to_string(), *score))
                    .collect(),
                calls: 0,
            }
        }
    }

    impl FuzzyMatcher for ScriptedMatcher {
        fn fuzzy_match(&mut self, _query: &str, text: &str) -> Option<FuzzyMatch> {
            self.calls += 1;
            self.scores.get(text).map(|&score| FuzzyMatch {
                score,
                positions: vec![0],
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::ScriptedMatcher;
    use super::*;
    use pretty_assertions::assert_eq;

    fn plain(item: &&str, hit: FuzzyMatch) -> RankedCandidate {
        RankedCandidate {
            display: item.to_string(),
            value: item.to_string(),
            score: hit.score,
            positions: hit.positions,
            description: String::new(),
            subtitle: String::new(),
            icon: String::new(),
        }
    }

    fn displays(ranked: &[RankedCandidate]) -> Vec<&str> {
        ranked.iter().map(|c| c.display.as_str()).collect()
    }

    #[test]
    fn test_sorted_descending_by_score() {
        let mut m = ScriptedMatcher::new(&[("a", 10), ("b", 30), ("c", 20)]);
        let items = ["a", "b", "c"];
        let ranked = rank(&mut m, "q", &items, |s| s.to_string(), plain);
        assert_eq!(displays(&ranked), vec!["b", "c", "a"]);
    }

    #[test]
    fn test_ties_preserve_input_order() {
        let mut m = ScriptedMatcher::new(&[("w", 5), ("x", 7), ("y", 5), ("z", 5)]);
        let items = ["w", "x", "y", "z"];
        let ranked = rank(&mut m, "q", &items, |s| s.to_string(), plain);
        assert_eq!(displays(&ranked), vec!["x", "w", "y", "z"]);
    }

    #[test]
    fn test_non_matches_dropped_and_matcher_called_once_each() {
        let mut m = ScriptedMatcher::new(&[("keep", 1)]);
        let items = ["keep", "drop", "gone"];
        let ranked = rank(&mut m, "q", &items, |s| s.to_string(), plain);
        assert_eq!(displays(&ranked), vec!["keep"]);
        assert_eq!(m.calls, 3);
    }

    #[test]
    fn test_build_can_adjust_score() {
        let mut m = ScriptedMatcher::new(&[("a", 10), ("b", 10)]);
        let items = ["a", "b"];
        let ranked = rank(
            &mut m,
            "q",
            &items,
            |s| s.to_string(),
            |item, hit| {
                let mut c = plain(item, hit);
                if c.display == "b" {
                    c.score += 50;
                }
                c
            },
        );
        assert_eq!(displays(&ranked), vec!["b", "a"]);
        assert_eq!(ranked[0].score - ranked[1].score, 50);
    }
}
