//! Ranking and filtering of scored candidates.
//!
//! Sorts by total score descending (ties broken by most-recent update),
//! drops everything under the caller's `min_score`, and truncates to the
//! result limit. Never errors — an empty list is valid output.

use crate::knowledge::scoring::ScoredSuggestion;

/// Default suggestion limit.
pub const DEFAULT_LIMIT: usize = 5;
/// Default score floor for generic lookups.
pub const DEFAULT_MIN_SCORE: f64 = 30.0;
/// Score floor for tag-only lookups, where prefiltering already guarantees
/// every candidate shares at least one tag.
pub const TAG_QUERY_MIN_SCORE: f64 = 15.0;

/// Sort, filter, and truncate scored suggestions.
pub fn rank(
    mut scored: Vec<ScoredSuggestion>,
    min_score: f64,
    limit: usize,
) -> Vec<ScoredSuggestion> {
    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(b.updated_at.cmp(&a.updated_at))
    });
    scored.retain(|s| s.score >= min_score);
    scored.truncate(limit);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::scoring::ScoreBreakdown;

    fn suggestion(id: &str, score: f64, updated_at: i64) -> ScoredSuggestion {
        ScoredSuggestion {
            id: id.into(),
            key: format!("key/{id}"),
            value: "v".into(),
            score,
            reason: "test".into(),
            score_breakdown: ScoreBreakdown::default(),
            version: "1.0.0".into(),
            updated_at,
            matched_tags: Vec::new(),
        }
    }

    #[test]
    fn sorts_descending_by_score() {
        let ranked = rank(
            vec![
                suggestion("low", 20.0, 0),
                suggestion("high", 80.0, 0),
                suggestion("mid", 50.0, 0),
            ],
            0.0,
            10,
        );
        let ids: Vec<&str> = ranked.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, ["high", "mid", "low"]);
    }

    #[test]
    fn ties_break_by_most_recent_update() {
        let ranked = rank(
            vec![suggestion("old", 50.0, 100), suggestion("new", 50.0, 200)],
            0.0,
            10,
        );
        assert_eq!(ranked[0].id, "new");
        assert_eq!(ranked[1].id, "old");
    }

    #[test]
    fn drops_below_min_score() {
        let ranked = rank(
            vec![suggestion("keep", 40.0, 0), suggestion("drop", 29.9, 0)],
            30.0,
            10,
        );
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].id, "keep");
    }

    #[test]
    fn truncates_to_limit() {
        let scored = (0..10)
            .map(|i| suggestion(&i.to_string(), 50.0, i))
            .collect();
        assert_eq!(rank(scored, 0.0, 3).len(), 3);
    }

    #[test]
    fn empty_input_is_valid() {
        assert!(rank(Vec::new(), 30.0, 5).is_empty());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            // Raising min_score never increases the returned count.
            #[test]
            fn min_score_filtering_is_monotonic(
                scores in proptest::collection::vec(0.0f64..100.0, 0..20),
                floor_a in 0.0f64..100.0,
                floor_b in 0.0f64..100.0,
            ) {
                let (lo, hi) = if floor_a <= floor_b {
                    (floor_a, floor_b)
                } else {
                    (floor_b, floor_a)
                };
                let build = || {
                    scores
                        .iter()
                        .enumerate()
                        .map(|(i, s)| suggestion(&i.to_string(), *s, i as i64))
                        .collect::<Vec<_>>()
                };
                let at_lo = rank(build(), lo, usize::MAX);
                let at_hi = rank(build(), hi, usize::MAX);
                prop_assert!(at_hi.len() <= at_lo.len());
            }
        }
    }
}
