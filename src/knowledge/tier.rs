//! Tier classification and duplicate-response building.
//!
//! The top similarity score is mapped onto four mutually exclusive response
//! bands with half-open `[low, high)` boundaries: below the nudge threshold
//! nothing happens; the nudge band attaches a [`DuplicateRisk`] warning; the
//! block band aborts the write; at or above the auto-update threshold the
//! write is redirected into the existing record.

use serde::{Deserialize, Serialize};

use crate::knowledge::scoring::{ScoredSuggestion, MAX_SCORE};
use crate::knowledge::types::RecordKind;

/// Maximum suggestions carried in a Tier 1 warning.
pub const RISK_SUGGESTION_LIMIT: usize = 3;

/// The three ascending cutoffs separating the four tiers.
///
/// Process-wide configuration, loaded once at startup and validated fatally
/// before any request is served.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct TierThresholds {
    pub gentle_nudge: f64,
    pub hard_block: f64,
    pub auto_update: f64,
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self {
            gentle_nudge: 35.0,
            hard_block: 45.0,
            auto_update: 60.0,
        }
    }
}

impl TierThresholds {
    /// Thresholds must be strictly ascending; anything else is a fatal
    /// configuration error.
    pub fn validate(&self) -> Result<(), String> {
        if self.gentle_nudge < self.hard_block && self.hard_block < self.auto_update {
            Ok(())
        } else {
            Err(format!(
                "tier thresholds must be strictly ascending: gentle_nudge={} hard_block={} auto_update={}",
                self.gentle_nudge, self.hard_block, self.auto_update
            ))
        }
    }
}

/// The four response bands, keyed by top similarity score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// Below every threshold — the write proceeds silently.
    None,
    /// Warn: the write proceeds with a [`DuplicateRisk`] attached.
    GentleNudge,
    /// Block: the write is aborted with a structured failure.
    HardBlock,
    /// Merge: the existing record is updated instead of creating a new one.
    AutoUpdate,
}

/// Map a top score onto its tier. Pure; boundaries are half-open `[low, high)`.
pub fn classify(score: f64, thresholds: &TierThresholds) -> Tier {
    if score >= thresholds.auto_update {
        Tier::AutoUpdate
    } else if score >= thresholds.hard_block {
        Tier::HardBlock
    } else if score >= thresholds.gentle_nudge {
        Tier::GentleNudge
    } else {
        Tier::None
    }
}

/// Tier 1 payload: a non-blocking warning attached to a successful create.
#[derive(Debug, Clone, Serialize)]
pub struct DuplicateRisk {
    pub severity: String,
    pub max_score: f64,
    /// Top suggestions, ranked, at most [`RISK_SUGGESTION_LIMIT`].
    pub suggestions: Vec<ScoredSuggestion>,
    /// Version of the closest existing match.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closest_version: Option<String>,
    /// Ready-to-use remediation: update the existing record instead.
    pub update_command: String,
    /// Estimated probability that the new record duplicates an existing one.
    pub is_duplicate_confidence: f64,
    /// Estimated probability that updating the existing record is the right move.
    pub should_update_confidence: f64,
}

/// Build the Tier 1 warning from ranked suggestions (must be non-empty).
pub fn build_duplicate_risk(
    ranked: &[ScoredSuggestion],
    kind: RecordKind,
    thresholds: &TierThresholds,
) -> DuplicateRisk {
    let top = &ranked[0];
    let max_score = top.score;

    let span = (thresholds.auto_update - thresholds.gentle_nudge).max(1.0);
    let should_update = ((max_score - thresholds.gentle_nudge) / span).clamp(0.0, 1.0);

    DuplicateRisk {
        severity: "MODERATE".to_string(),
        max_score,
        suggestions: ranked.iter().take(RISK_SUGGESTION_LIMIT).cloned().collect(),
        closest_version: Some(top.version.clone()),
        update_command: update_command(kind, &top.key),
        is_duplicate_confidence: (max_score / MAX_SCORE).clamp(0.0, 1.0),
        should_update_confidence: should_update,
    }
}

/// The remediation command surfaced in warnings and block errors.
pub fn update_command(kind: RecordKind, existing_key: &str) -> String {
    format!("create_{kind} {{\"key\": \"{existing_key}\", \"value\": \"<new value>\"}}")
}
