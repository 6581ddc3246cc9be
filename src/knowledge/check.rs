//! Two-phase duplicate check, exposed as `check_*_duplicate`.
//!
//! Phase one looks for an exact match on the normalized key or value text.
//! Only if that finds nothing does phase two run a similarity sweep against
//! the fixed [`DUPLICATE_THRESHOLD`]. The response always carries a
//! recommendation string the caller can act on directly.

use anyhow::Result;
use rusqlite::Connection;
use serde::Serialize;

use crate::knowledge::retrieval;
use crate::knowledge::similarity;
use crate::knowledge::types::RecordKind;

/// Similarity score (0–100) at or above which phase two reports a duplicate.
pub const DUPLICATE_THRESHOLD: f64 = 70.0;

/// Similar records listed alongside a phase-two verdict.
const SIMILAR_LIMIT: usize = 5;

#[derive(Debug, Serialize)]
pub struct ExistingMatch {
    pub key: String,
    pub value: String,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct SimilarRecord {
    pub key: String,
    pub value: String,
    pub score: f64,
}

#[derive(Debug, Serialize)]
pub struct DuplicateCheck {
    pub is_duplicate: bool,
    /// `"exact"`, `"similar"`, or `"none"`.
    pub match_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub existing: Option<ExistingMatch>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub similar_records: Vec<SimilarRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    pub recommendation: String,
}

/// Check whether `input` (a key or value text) duplicates an existing record
/// of the given kind. `category` optionally restricts the search to records
/// under that key/category.
pub fn check_duplicate(
    conn: &Connection,
    kind: RecordKind,
    input: &str,
    category: Option<&str>,
) -> Result<DuplicateCheck> {
    let normalized_input = normalize(input);
    let mut candidates = retrieval::by_kind(conn, kind)?;
    if let Some(category) = category {
        let category = normalize(category);
        candidates.retain(|c| normalize(&c.key) == category);
    }

    // Phase 1: exact match on normalized key or value.
    if let Some(hit) = candidates
        .iter()
        .find(|c| normalize(&c.key) == normalized_input || normalize(&c.value) == normalized_input)
    {
        return Ok(DuplicateCheck {
            is_duplicate: true,
            match_type: "exact".into(),
            existing: Some(ExistingMatch {
                key: hit.key.clone(),
                value: hit.value.clone(),
                version: hit.version.clone(),
            }),
            similar_records: Vec::new(),
            score: Some(100.0),
            recommendation: format!(
                "'{}' already exists — update the existing {kind} instead of creating a duplicate",
                hit.key
            ),
        });
    }

    // Phase 2: similarity sweep against the fixed threshold.
    let mut similar: Vec<SimilarRecord> = candidates
        .iter()
        .map(|c| {
            let key_score = similarity::key_similarity(input, &c.key);
            let value_score = similarity::text_ratio(&normalized_input, &normalize(&c.value));
            SimilarRecord {
                key: c.key.clone(),
                value: c.value.clone(),
                score: key_score.max(value_score) * 100.0,
            }
        })
        .filter(|s| s.score >= DUPLICATE_THRESHOLD)
        .collect();
    similar.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    similar.truncate(SIMILAR_LIMIT);

    if let Some(best) = similar.first() {
        let (best_key, best_score) = (best.key.clone(), best.score);
        return Ok(DuplicateCheck {
            is_duplicate: true,
            match_type: "similar".into(),
            existing: None,
            similar_records: similar,
            score: Some(best_score),
            recommendation: format!(
                "closely matches '{best_key}' (score {best_score:.0}) — review it before creating a new {kind}"
            ),
        });
    }

    Ok(DuplicateCheck {
        is_duplicate: false,
        match_type: "none".into(),
        existing: None,
        similar_records: Vec::new(),
        score: None,
        recommendation: "no duplicate found — safe to create".into(),
    })
}

/// Lowercase, trim, and collapse internal whitespace.
fn normalize(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
