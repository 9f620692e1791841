//! Property tests for ranking order and provider selection.

use mailwright_core::composition::{ProviderFlags, ToolScope, select_active_provider};
use mailwright_core::fuzzy::{FuzzyMatch, FuzzyMatcher};
use mailwright_core::ranking::{RankedCandidate, rank};
use mailwright_core::ProviderKind;
use proptest::prelude::*;

/// Scores each candidate by a fixed value parsed from its text.
struct FixedScore;

impl FuzzyMatcher for FixedScore {
    fn fuzzy_match(&mut self, _query: &str, text: &str) -> Option<FuzzyMatch> {
        let (score, _) = text.split_once(':')?;
        Some(FuzzyMatch {
            score: score.parse().ok()?,
            positions: Vec::new(),
        })
    }
}

fn candidate(item: &(i64, usize), hit: FuzzyMatch) -> RankedCandidate {
    RankedCandidate {
        display: format!("{}:{}", item.0, item.1),
        value: item.1.to_string(),
        score: hit.score,
        positions: hit.positions,
        description: String::new(),
        subtitle: String::new(),
        icon: String::new(),
    }
}

proptest! {
    #[test]
    fn ranking_is_descending_and_stable(scores in prop::collection::vec(0i64..5, 0..40)) {
        let items: Vec<(i64, usize)> = scores.iter().copied().zip(0..).collect();
        let ranked = rank(
            &mut FixedScore,
            "q",
            &items,
            |item| format!("{}:{}", item.0, item.1),
            candidate,
        );
        prop_assert_eq!(ranked.len(), items.len());
        for pair in ranked.windows(2) {
            prop_assert!(pair[0].score >= pair[1].score);
            if pair[0].score == pair[1].score {
                let a: usize = pair[0].value.parse().unwrap();
                let b: usize = pair[1].value.parse().unwrap();
                prop_assert!(a < b, "tie order changed: {} before {}", a, b);
            }
        }
    }

    #[test]
    fn selection_is_deterministic(gmail in any::<bool>(), outlook in any::<bool>()) {
        let flags = ProviderFlags { gmail, outlook };
        let first = select_active_provider(flags);
        let second = select_active_provider(flags);
        prop_assert_eq!(first.active, second.active);

        let expected = if gmail {
            Some(ProviderKind::Gmail)
        } else if outlook {
            Some(ProviderKind::Outlook)
        } else {
            None
        };
        prop_assert_eq!(first.active, expected);

        let provider_tools = first
            .tools
            .tools()
            .iter()
            .filter(|t| matches!(t.scope, ToolScope::Provider(_)))
            .count();
        prop_assert_eq!(provider_tools == 0, expected.is_none());
        prop_assert!(first.tools.contains("memory"));
    }
}
