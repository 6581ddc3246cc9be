//! Multi-factor similarity scoring.
//!
//! [`score_candidate`] combines tag overlap, layer match, key or value
//! similarity, recency, and (for constraints) priority into one composite
//! score with an itemized breakdown and a short human-readable reason. The
//! function is pure — `now` is an explicit argument — so identical inputs
//! always produce identical output.

use serde::Serialize;

use crate::knowledge::similarity;
use crate::knowledge::types::{Candidate, QueryContext, RecordKind};

/// Points per shared tag.
pub const TAG_POINTS: f64 = 10.0;
/// Tag-overlap cap for decisions (3 tags' worth).
pub const TAG_CAP_DECISION: f64 = 30.0;
/// Tag-overlap cap for constraints (4 tags' worth).
pub const TAG_CAP_CONSTRAINT: f64 = 40.0;
/// Flat bonus when both records declare the same layer.
pub const LAYER_POINTS: f64 = 25.0;
/// Key-similarity scale for decisions.
pub const KEY_SCALE_DECISION: f64 = 15.0;
/// Value-similarity scale for constraints.
pub const VALUE_SCALE_CONSTRAINT: f64 = 20.0;
/// Composite scores are clamped to this ceiling.
pub const MAX_SCORE: f64 = 100.0;

const SECS_PER_DAY: i64 = 86_400;

/// Itemized score components. No component is ever negative.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScoreBreakdown {
    pub tag_overlap: f64,
    pub layer_match: f64,
    pub key_similarity: f64,
    pub value_similarity: f64,
    pub recency: f64,
    pub priority: f64,
}

impl ScoreBreakdown {
    /// Component sum clamped to `[0, MAX_SCORE]`.
    pub fn total(&self) -> f64 {
        (self.tag_overlap
            + self.layer_match
            + self.key_similarity
            + self.value_similarity
            + self.recency
            + self.priority)
            .clamp(0.0, MAX_SCORE)
    }
}

/// A candidate ranked against a query context. Ephemeral — never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredSuggestion {
    pub id: String,
    pub key: String,
    pub value: String,
    pub score: f64,
    pub reason: String,
    pub score_breakdown: ScoreBreakdown,
    #[serde(skip)]
    pub version: String,
    #[serde(skip)]
    pub updated_at: i64,
    /// Context tags found on the candidate; feeds auto-update reasons.
    #[serde(skip)]
    pub matched_tags: Vec<String>,
}

/// Score one candidate against the query context at time `now` (epoch secs).
pub fn score_candidate(
    ctx: &QueryContext,
    kind: RecordKind,
    candidate: &Candidate,
    now: i64,
) -> ScoredSuggestion {
    let matched_tags = shared_tags(&ctx.tags, &candidate.tags);
    let tag_cap = match kind {
        RecordKind::Decision => TAG_CAP_DECISION,
        RecordKind::Constraint => TAG_CAP_CONSTRAINT,
    };

    let mut breakdown = ScoreBreakdown {
        tag_overlap: (matched_tags.len() as f64 * TAG_POINTS).min(tag_cap),
        ..Default::default()
    };

    if let (Some(ctx_layer), Some(cand_layer)) = (&ctx.layer, &candidate.layer) {
        if ctx_layer.eq_ignore_ascii_case(cand_layer) {
            breakdown.layer_match = LAYER_POINTS;
        }
    }

    match kind {
        RecordKind::Decision => {
            if let Some(key) = &ctx.key {
                breakdown.key_similarity =
                    similarity::key_similarity(key, &candidate.key) * KEY_SCALE_DECISION;
            }
        }
        RecordKind::Constraint => {
            if let Some(value) = &ctx.value {
                breakdown.value_similarity =
                    similarity::text_ratio(value, &candidate.value) * VALUE_SCALE_CONSTRAINT;
            }
            if let Some(priority) = candidate.priority {
                breakdown.priority = priority.score_points();
            }
        }
    }

    breakdown.recency = recency_points(now - candidate.updated_at);

    let reason = build_reason(ctx, candidate, &breakdown, matched_tags.len());

    ScoredSuggestion {
        id: candidate.id.clone(),
        key: candidate.key.clone(),
        value: candidate.value.clone(),
        score: breakdown.total(),
        reason,
        score_breakdown: breakdown,
        version: candidate.version.clone(),
        updated_at: candidate.updated_at,
        matched_tags,
    }
}

/// Tiered recency bonus: ≤30 days → 10, ≤90 → 5, ≤180 → 2, older → 0.
fn recency_points(age_secs: i64) -> f64 {
    let days = age_secs.max(0) / SECS_PER_DAY;
    if days <= 30 {
        10.0
    } else if days <= 90 {
        5.0
    } else if days <= 180 {
        2.0
    } else {
        0.0
    }
}

/// Context tags present on the candidate, in context order.
fn shared_tags(ctx_tags: &[String], candidate_tags: &[String]) -> Vec<String> {
    ctx_tags
        .iter()
        .filter(|t| candidate_tags.iter().any(|c| &c == t))
        .cloned()
        .collect()
}

/// Render the top 1–2 contributing factors as a short phrase.
fn build_reason(
    ctx: &QueryContext,
    candidate: &Candidate,
    breakdown: &ScoreBreakdown,
    shared_count: usize,
) -> String {
    let mut factors: Vec<(f64, String)> = Vec::new();

    if breakdown.tag_overlap > 0.0 {
        factors.push((
            breakdown.tag_overlap,
            format!("{shared_count}/{} tags match", ctx.tags.len()),
        ));
    }
    if breakdown.layer_match > 0.0 {
        factors.push((breakdown.layer_match, "same layer".to_string()));
    }
    if breakdown.key_similarity > 0.0 {
        factors.push((breakdown.key_similarity, "similar key".to_string()));
    }
    if breakdown.value_similarity > 0.0 {
        factors.push((breakdown.value_similarity, "similar value".to_string()));
    }
    if breakdown.recency > 0.0 {
        factors.push((breakdown.recency, "recently updated".to_string()));
    }
    if breakdown.priority > 0.0 {
        if let Some(priority) = candidate.priority {
            factors.push((breakdown.priority, format!("{priority} priority")));
        }
    }

    factors.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

    if factors.is_empty() {
        return "weak match".to_string();
    }
    factors
        .into_iter()
        .take(2)
        .map(|(_, phrase)| phrase)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::types::Priority;

    const NOW: i64 = 1_754_000_000;

    fn candidate(key: &str, tags: &[&str], layer: Option<&str>) -> Candidate {
        Candidate {
            id: "c1".into(),
            key: key.into(),
            value: "Use parameterized queries everywhere".into(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            layer: layer.map(String::from),
            priority: None,
            version: "1.0.0".into(),
            updated_at: NOW,
        }
    }

    fn context(key: Option<&str>, tags: &[&str], layer: Option<&str>) -> QueryContext {
        QueryContext {
            key: key.map(String::from),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            layer: layer.map(String::from),
            priority: None,
            value: None,
        }
    }

    #[test]
    fn tag_overlap_counts_shared_tags_only() {
        let cand = candidate("a", &["security", "vulnerability", "auth"], None);
        let ctx = context(None, &["security", "vulnerability", "frontend"], None);
        let scored = score_candidate(&ctx, RecordKind::Decision, &cand, NOW);
        assert_eq!(scored.score_breakdown.tag_overlap, 20.0);
        assert_eq!(scored.matched_tags, vec!["security", "vulnerability"]);
    }

    #[test]
    fn tag_overlap_is_capped_per_kind() {
        let tags = ["a", "b", "c", "d", "e"];
        let cand = candidate("k", &tags, None);
        let ctx = context(None, &tags, None);

        let decision = score_candidate(&ctx, RecordKind::Decision, &cand, NOW);
        assert_eq!(decision.score_breakdown.tag_overlap, TAG_CAP_DECISION);

        let constraint = score_candidate(&ctx, RecordKind::Constraint, &cand, NOW);
        assert_eq!(constraint.score_breakdown.tag_overlap, TAG_CAP_CONSTRAINT);
    }

    #[test]
    fn layer_match_is_all_or_nothing() {
        let cand = candidate("k", &[], Some("infrastructure"));

        let same = context(None, &[], Some("infrastructure"));
        assert_eq!(
            score_candidate(&same, RecordKind::Decision, &cand, NOW)
                .score_breakdown
                .layer_match,
            LAYER_POINTS
        );

        let other = context(None, &[], Some("presentation"));
        assert_eq!(
            score_candidate(&other, RecordKind::Decision, &cand, NOW)
                .score_breakdown
                .layer_match,
            0.0
        );
    }

    #[test]
    fn decisions_score_keys_constraints_score_values() {
        let cand = candidate("sec/auth-1", &[], None);
        let ctx = QueryContext {
            key: Some("sec/auth-1".into()),
            value: Some(cand.value.clone()),
            ..Default::default()
        };

        let decision = score_candidate(&ctx, RecordKind::Decision, &cand, NOW);
        assert_eq!(decision.score_breakdown.key_similarity, KEY_SCALE_DECISION);
        assert_eq!(decision.score_breakdown.value_similarity, 0.0);

        let constraint = score_candidate(&ctx, RecordKind::Constraint, &cand, NOW);
        assert_eq!(constraint.score_breakdown.key_similarity, 0.0);
        assert_eq!(
            constraint.score_breakdown.value_similarity,
            VALUE_SCALE_CONSTRAINT
        );
    }

    #[test]
    fn recency_tiers() {
        let mut cand = candidate("k", &[], None);
        let ctx = context(None, &[], None);

        for (age_days, expected) in
            [(0, 10.0), (30, 10.0), (31, 5.0), (90, 5.0), (180, 2.0), (181, 0.0)]
        {
            cand.updated_at = NOW - age_days * 86_400;
            let scored = score_candidate(&ctx, RecordKind::Decision, &cand, NOW);
            assert_eq!(scored.score_breakdown.recency, expected, "age {age_days}d");
        }
    }

    #[test]
    fn candidate_priority_feeds_constraint_scores_only() {
        let mut cand = candidate("k", &[], None);
        cand.priority = Some(Priority::Critical);
        let ctx = context(None, &[], None);

        let constraint = score_candidate(&ctx, RecordKind::Constraint, &cand, NOW);
        assert_eq!(constraint.score_breakdown.priority, 5.0);

        let decision = score_candidate(&ctx, RecordKind::Decision, &cand, NOW);
        assert_eq!(decision.score_breakdown.priority, 0.0);
    }

    #[test]
    fn overlapping_security_records_land_in_nudge_band() {
        // Candidate sec/auth-1 in infrastructure vs a fresh sibling record in
        // presentation: two shared tags, no layer match, similar key.
        let cand = candidate(
            "sec/auth-1",
            &["security", "vulnerability", "auth"],
            Some("infrastructure"),
        );
        let ctx = context(
            Some("sec/auth-2"),
            &["security", "vulnerability", "frontend"],
            Some("presentation"),
        );

        let scored = score_candidate(&ctx, RecordKind::Decision, &cand, NOW);
        assert!(
            scored.score >= 35.0 && scored.score < 45.0,
            "expected nudge-band score, got {}",
            scored.score
        );
    }

    #[test]
    fn identical_records_clear_the_auto_update_bar() {
        let cand = candidate(
            "arch/db-choice",
            &["database", "postgres", "architecture"],
            Some("infrastructure"),
        );
        let mut ctx = context(
            Some("arch/db-choice-v2"),
            &["database", "postgres", "architecture"],
            Some("infrastructure"),
        );
        ctx.value = Some(cand.value.clone());

        let scored = score_candidate(&ctx, RecordKind::Decision, &cand, NOW);
        assert!(scored.score >= 60.0, "got {}", scored.score);
    }

    #[test]
    fn scoring_is_deterministic() {
        let cand = candidate("sec/auth-1", &["security", "auth"], Some("infrastructure"));
        let ctx = context(Some("sec/auth-9"), &["security"], Some("infrastructure"));
        let a = score_candidate(&ctx, RecordKind::Decision, &cand, NOW);
        let b = score_candidate(&ctx, RecordKind::Decision, &cand, NOW);
        assert_eq!(a.score, b.score);
        assert_eq!(a.reason, b.reason);
    }

    #[test]
    fn no_component_is_negative_and_total_is_clamped() {
        let mut cand = candidate("k", &["a", "b", "c", "d", "e"], Some("infrastructure"));
        cand.priority = Some(Priority::Critical);
        cand.value = "exact".into();
        let ctx = QueryContext {
            key: Some("k".into()),
            tags: cand.tags.clone(),
            layer: Some("infrastructure".into()),
            priority: None,
            value: Some("exact".into()),
        };

        let scored = score_candidate(&ctx, RecordKind::Constraint, &cand, NOW);
        let b = &scored.score_breakdown;
        for component in [
            b.tag_overlap,
            b.layer_match,
            b.key_similarity,
            b.value_similarity,
            b.recency,
            b.priority,
        ] {
            assert!(component >= 0.0);
        }
        assert!(scored.score <= MAX_SCORE);
    }

    #[test]
    fn reason_lists_dominant_factors() {
        let cand = candidate(
            "sec/auth-1",
            &["security", "vulnerability", "auth"],
            Some("infrastructure"),
        );
        let ctx = context(
            None,
            &["security", "vulnerability", "auth"],
            Some("infrastructure"),
        );
        let scored = score_candidate(&ctx, RecordKind::Decision, &cand, NOW);
        assert_eq!(scored.reason, "3/3 tags match, same layer");
    }

    #[test]
    fn reason_for_nothing_shared() {
        let cand = candidate("k", &[], None);
        let mut ctx = context(None, &[], None);
        ctx.tags = vec!["unrelated".into()];
        let mut stale = cand.clone();
        stale.updated_at = NOW - 400 * 86_400;
        let scored = score_candidate(&ctx, RecordKind::Decision, &stale, NOW);
        assert_eq!(scored.reason, "weak match");
    }
}
