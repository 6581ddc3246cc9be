//! Core knowledge-base type definitions.
//!
//! Defines [`RecordKind`] (the two record categories), [`Priority`] (the
//! four-level constraint ordinal), [`Record`] (a full stored row), and the
//! ephemeral [`Candidate`] / [`QueryContext`] snapshots that flow through the
//! similarity engine.

#![allow(dead_code)]

use serde::{Deserialize, Serialize};

/// The two kinds of knowledge records agents can write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    /// An architectural decision — "we chose X because Y".
    Decision,
    /// A constraint or rule the codebase must honor.
    Constraint,
}

impl RecordKind {
    /// SQL-compatible string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Decision => "decision",
            Self::Constraint => "constraint",
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RecordKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "decision" => Ok(Self::Decision),
            "constraint" => Ok(Self::Constraint),
            _ => Err(format!("unknown record kind: {s}")),
        }
    }
}

/// Constraint priority, ordinal 1 (low) through 4 (critical).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    /// Storage ordinal: low=1 … critical=4.
    pub fn ordinal(&self) -> i64 {
        match self {
            Self::Low => 1,
            Self::Medium => 2,
            Self::High => 3,
            Self::Critical => 4,
        }
    }

    /// Inverse of [`Priority::ordinal`]. Out-of-range values map to `None`.
    pub fn from_ordinal(n: i64) -> Option<Self> {
        match n {
            1 => Some(Self::Low),
            2 => Some(Self::Medium),
            3 => Some(Self::High),
            4 => Some(Self::Critical),
            _ => None,
        }
    }

    /// Similarity-score contribution of a candidate carrying this priority.
    pub fn score_points(&self) -> f64 {
        match self {
            Self::Critical => 5.0,
            Self::High => 4.0,
            Self::Medium => 3.0,
            Self::Low => 2.0,
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            _ => Err(format!("unknown priority: {s}")),
        }
    }
}

/// A knowledge record, matching the `records` table schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    /// UUID v7 (time-sortable) primary key.
    pub id: String,
    /// Record kind — decision or constraint.
    pub kind: RecordKind,
    /// Display key / category. Unique per kind among non-deleted rows.
    pub key: String,
    /// The full text value of the record.
    pub value: String,
    /// Coarse architectural layer (e.g. `infrastructure`, `presentation`).
    pub layer: Option<String>,
    /// Constraint priority. `None` for decisions.
    pub priority: Option<Priority>,
    /// Normalized (trimmed, lowercased) tag set.
    pub tags: Vec<String>,
    /// Semantic version string, e.g. `"1.0.0"`.
    pub version: String,
    /// Lifecycle status, `"active"` unless the writer says otherwise.
    pub status: String,
    /// ISO 8601 creation timestamp.
    pub created_at: String,
    /// ISO 8601 last-modification timestamp.
    pub updated_at: String,
}

/// An existing record snapshot considered for similarity comparison.
///
/// Immutable once read; `updated_at` is pre-converted to epoch seconds so
/// scoring stays a pure function of its inputs.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub id: String,
    pub key: String,
    pub value: String,
    pub tags: Vec<String>,
    pub layer: Option<String>,
    pub priority: Option<Priority>,
    pub version: String,
    /// Last-update time, seconds since epoch.
    pub updated_at: i64,
}

/// The new record being evaluated against existing candidates.
///
/// Constructed per request and never persisted.
#[derive(Debug, Clone, Default)]
pub struct QueryContext {
    pub key: Option<String>,
    pub tags: Vec<String>,
    pub layer: Option<String>,
    pub priority: Option<Priority>,
    pub value: Option<String>,
}

/// Normalize a tag list: trim, lowercase, drop empties, dedup preserving order.
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let t = tag.trim().to_lowercase();
        if !t.is_empty() && !out.contains(&t) {
            out.push(t);
        }
    }
    out
}
