//! Write orchestration — the entry point for record creation.
//!
//! [`create_record`] sequences the whole pipeline per request: upsert check →
//! bypass check → policy validation → candidate retrieval → scoring → tier
//! action → persistence. All mutations run inside a transaction and append a
//! `record_history` row. Scoring only ever runs when a *new* key is being
//! created; writing to an existing key is an unconditional versioned update.
//!
//! The suggestion pipeline fails open: any internal error there degrades to
//! "no suggestion available" and the write itself still succeeds.

use rusqlite::{params, Connection, Transaction};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use crate::knowledge::policy::{self, PolicyValidation};
use crate::knowledge::ranking::{self, DEFAULT_LIMIT, DEFAULT_MIN_SCORE};
use crate::knowledge::retrieval;
use crate::knowledge::scoring::{score_candidate, ScoredSuggestion};
use crate::knowledge::tier::{self, DuplicateRisk, Tier, TierThresholds};
use crate::knowledge::types::{normalize_tags, Priority, QueryContext, RecordKind};
use crate::knowledge::version::{self, Bump, INITIAL_VERSION};

/// Errors surfaced by the write path.
#[derive(Debug, Error)]
pub enum WriteError {
    /// Tier 2 hard block. The message is self-sufficient: it names the
    /// existing key, a remediation command, and the bypass flag.
    #[error(
        "DUPLICATE DETECTED: '{requested_key}' scored {score:.0}/100 against existing \
         {kind} '{existing_key}'. Update the existing record instead ({command}), \
         or retry with ignore_suggest=true to create a new record anyway."
    )]
    DuplicateDetected {
        kind: RecordKind,
        requested_key: String,
        existing_key: String,
        score: f64,
        command: String,
    },

    #[error("{0}")]
    InvalidInput(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// One create/update request with every default resolved in the constructor.
#[derive(Debug, Clone)]
pub struct CreateRequest {
    pub kind: RecordKind,
    pub key: String,
    pub value: String,
    pub tags: Vec<String>,
    pub layer: Option<String>,
    pub priority: Option<Priority>,
    /// Explicit initial version for new records. Defaults to `1.0.0`.
    pub version: Option<String>,
    /// Lifecycle status. Defaults to `"active"` on create; untouched on update.
    pub status: Option<String>,
    /// Version increment for updates. Defaults to patch.
    pub bump: Option<Bump>,
    /// Bypass flag: skip policy and scoring, always create a new record.
    pub ignore_suggest: bool,
    /// Validate against this policy only, instead of the first-match scan.
    pub policy_name: Option<String>,
}

impl CreateRequest {
    pub fn new(kind: RecordKind, key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind,
            key: key.into(),
            value: value.into(),
            tags: Vec::new(),
            layer: None,
            priority: None,
            version: None,
            status: None,
            bump: None,
            ignore_suggest: false,
            policy_name: None,
        }
    }
}

/// Process-wide suggestion settings, resolved once from configuration.
#[derive(Debug, Clone, Copy)]
pub struct SuggestionSettings {
    pub thresholds: TierThresholds,
    pub limit: usize,
    pub min_score: f64,
}

impl Default for SuggestionSettings {
    fn default() -> Self {
        Self {
            thresholds: TierThresholds::default(),
            limit: DEFAULT_LIMIT,
            min_score: DEFAULT_MIN_SCORE,
        }
    }
}

/// Successful create or update of a record under the requested key.
#[derive(Debug, Serialize)]
pub struct CreateResponse {
    pub success: bool,
    pub key: String,
    pub version: String,
    /// `"created"` for new rows, otherwise the bump level applied.
    pub version_action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy_validation: Option<PolicyValidation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duplicate_risk: Option<DuplicateRisk>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggest_bypassed: Option<bool>,
}

/// Structured explanation of why an auto-update was chosen.
#[derive(Debug, Serialize)]
pub struct DuplicateReason {
    pub matched_tags: Vec<String>,
    pub layer_match: bool,
    pub similarity: String,
}

/// Tier 3 outcome: the existing record absorbed the write.
#[derive(Debug, Serialize)]
pub struct AutoUpdateOutcome {
    pub success: bool,
    pub auto_updated: bool,
    pub requested_key: String,
    pub actual_key: String,
    pub similarity_score: f64,
    pub duplicate_reason: DuplicateReason,
    pub value: String,
    pub version: String,
}

/// What a write request produced.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum CreateOutcome {
    Created(CreateResponse),
    AutoUpdated(AutoUpdateOutcome),
}

struct ExistingRow {
    id: String,
    version: String,
    value: String,
}

/// Create a new record, or update it if the key already exists.
///
/// See the module docs for the full state machine.
pub fn create_record(
    conn: &mut Connection,
    settings: &SuggestionSettings,
    req: CreateRequest,
) -> Result<CreateOutcome, WriteError> {
    let key = req.key.trim().to_string();
    if key.is_empty() {
        return Err(WriteError::InvalidInput("key must not be empty".into()));
    }
    if req.value.trim().is_empty() {
        return Err(WriteError::InvalidInput("value must not be empty".into()));
    }
    let tags = normalize_tags(&req.tags);
    let now = chrono::Utc::now();

    // 1. Same kind + key → unconditional versioned update, never scored.
    if let Some(existing) = fetch_existing(conn, req.kind, &key)? {
        let response = update_existing(conn, &req, &key, &tags, existing, &now.to_rfc3339())?;
        return Ok(CreateOutcome::Created(response));
    }

    // 2. Bypass flag skips policy and scoring entirely.
    if req.ignore_suggest {
        let version = persist_new(conn, &req, &key, &tags, &now.to_rfc3339())?;
        tracing::info!(kind = %req.kind, key = %key, "record created (suggestion bypassed)");
        return Ok(CreateOutcome::Created(CreateResponse {
            success: true,
            key,
            version,
            version_action: "created".into(),
            policy_validation: None,
            duplicate_risk: None,
            suggest_bypassed: Some(true),
        }));
    }

    // 3. Policy validation. Advisory only — violations ride along in the
    //    response; a broken policy table degrades to "no policies".
    let policies = policy::load_policies(conn).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "policy load failed; continuing without policies");
        Vec::new()
    });
    let provided = provided_fields(&req, &key, &tags);
    let validation = policy::validate(&policies, &key, &provided, req.policy_name.as_deref());
    let suggest_enabled = validation
        .matched_policy
        .as_deref()
        .and_then(|name| policies.iter().find(|p| p.name == name))
        .map(|p| p.suggest_on_create)
        .unwrap_or(true);

    // 4. Suggestion pipeline: retrieval → scoring → ranking. Fails open.
    let ranked = if suggest_enabled {
        run_suggestion_pipeline(conn, &req, &key, &tags, now.timestamp(), settings)
    } else {
        tracing::debug!(key = %key, "suggestion disabled by matched policy");
        Vec::new()
    };

    let top_tier = ranked
        .first()
        .map(|top| tier::classify(top.score, &settings.thresholds))
        .unwrap_or(Tier::None);

    // 5. Tier action.
    match top_tier {
        Tier::HardBlock => {
            let top = &ranked[0];
            tracing::info!(key = %key, existing = %top.key, score = top.score, "create blocked as duplicate");
            Err(WriteError::DuplicateDetected {
                kind: req.kind,
                requested_key: key,
                existing_key: top.key.clone(),
                score: top.score,
                command: tier::update_command(req.kind, &top.key),
            })
        }
        Tier::AutoUpdate => {
            let top = ranked.into_iter().next().expect("non-empty ranked list");
            let outcome = auto_update(conn, &req, &key, &tags, top, &now.to_rfc3339())?;
            Ok(CreateOutcome::AutoUpdated(outcome))
        }
        Tier::GentleNudge | Tier::None => {
            let duplicate_risk = (top_tier == Tier::GentleNudge)
                .then(|| tier::build_duplicate_risk(&ranked, req.kind, &settings.thresholds));
            let version = persist_new(conn, &req, &key, &tags, &now.to_rfc3339())?;
            tracing::info!(kind = %req.kind, key = %key, "record created");
            Ok(CreateOutcome::Created(CreateResponse {
                success: true,
                key,
                version,
                version_action: "created".into(),
                policy_validation: (validation.matched_policy.is_some()
                    || !validation.violations.is_empty())
                .then_some(validation),
                duplicate_risk,
                suggest_bypassed: None,
            }))
        }
    }
}

/// Retrieval → scoring → ranking, restricted to other keys. Any error here
/// degrades to an empty suggestion list.
fn run_suggestion_pipeline(
    conn: &Connection,
    req: &CreateRequest,
    key: &str,
    tags: &[String],
    now: i64,
    settings: &SuggestionSettings,
) -> Vec<ScoredSuggestion> {
    let ctx = QueryContext {
        key: Some(key.to_string()),
        tags: tags.to_vec(),
        layer: req.layer.clone(),
        priority: req.priority,
        value: Some(req.value.clone()),
    };

    match retrieval::for_context(conn, req.kind, &ctx) {
        Ok(candidates) => {
            let scored = candidates
                .iter()
                .filter(|c| c.key != key)
                .map(|c| score_candidate(&ctx, req.kind, c, now))
                .collect();
            ranking::rank(scored, settings.min_score, settings.limit)
        }
        Err(e) => {
            tracing::warn!(error = %e, "suggestion pipeline failed; continuing without suggestions");
            Vec::new()
        }
    }
}

fn fetch_existing(
    conn: &Connection,
    kind: RecordKind,
    key: &str,
) -> Result<Option<ExistingRow>, rusqlite::Error> {
    use rusqlite::OptionalExtension;
    conn.query_row(
        "SELECT id, version, value FROM records WHERE kind = ?1 AND key = ?2 AND deleted = 0",
        params![kind.as_str(), key],
        |row| {
            Ok(ExistingRow {
                id: row.get(0)?,
                version: row.get(1)?,
                value: row.get(2)?,
            })
        },
    )
    .optional()
}

/// Unconditional update of an existing key: overwrite content, bump version,
/// append history.
fn update_existing(
    conn: &mut Connection,
    req: &CreateRequest,
    key: &str,
    tags: &[String],
    existing: ExistingRow,
    now: &str,
) -> Result<CreateResponse, WriteError> {
    let bump = req.bump.unwrap_or_default();
    let version = version::increment(&existing.version, bump);

    let tx = conn.transaction()?;
    tx.execute(
        "UPDATE records SET value = ?1, layer = COALESCE(?2, layer), \
         priority = COALESCE(?3, priority), tags = ?4, \
         status = COALESCE(?5, status), version = ?6, updated_at = ?7 WHERE id = ?8",
        params![
            req.value,
            req.layer,
            req.priority.map(|p| p.ordinal()),
            serde_json::to_string(tags).unwrap_or_else(|_| "[]".into()),
            req.status,
            version,
            now,
            existing.id,
        ],
    )?;
    replace_tags(&tx, &existing.id, tags)?;
    write_history(
        &tx,
        &existing.id,
        "update",
        &version,
        Some(&existing.value),
        None,
        now,
    )?;
    tx.commit()?;

    tracing::info!(kind = %req.kind, key = %key, version = %version, "record updated");
    Ok(CreateResponse {
        success: true,
        key: key.to_string(),
        version,
        version_action: bump.as_str().into(),
        policy_validation: None,
        duplicate_risk: None,
        suggest_bypassed: None,
    })
}

/// Insert a brand-new record row with its tag index and history entry.
fn persist_new(
    conn: &mut Connection,
    req: &CreateRequest,
    key: &str,
    tags: &[String],
    now: &str,
) -> Result<String, WriteError> {
    let id = uuid::Uuid::now_v7().to_string();
    let version = req
        .version
        .clone()
        .unwrap_or_else(|| INITIAL_VERSION.to_string());
    let status = req.status.clone().unwrap_or_else(|| "active".to_string());

    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO records (id, kind, key, value, layer, priority, tags, version, status, \
         deleted, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 0, ?10, ?10)",
        params![
            id,
            req.kind.as_str(),
            key,
            req.value,
            req.layer,
            req.priority.map(|p| p.ordinal()),
            serde_json::to_string(tags).unwrap_or_else(|_| "[]".into()),
            version,
            status,
            now,
        ],
    )?;
    replace_tags(&tx, &id, tags)?;
    write_history(&tx, &id, "create", &version, None, None, now)?;
    tx.commit()?;

    Ok(version)
}

/// Tier 3: redirect the write into the top-matched existing record.
fn auto_update(
    conn: &mut Connection,
    req: &CreateRequest,
    requested_key: &str,
    tags: &[String],
    top: ScoredSuggestion,
    now: &str,
) -> Result<AutoUpdateOutcome, WriteError> {
    let bump = req.bump.unwrap_or_default();
    let version = version::increment(&top.version, bump);

    let tx = conn.transaction()?;
    tx.execute(
        "UPDATE records SET value = ?1, tags = ?2, layer = COALESCE(?3, layer), \
         priority = COALESCE(?4, priority), version = ?5, updated_at = ?6 WHERE id = ?7",
        params![
            req.value,
            serde_json::to_string(tags).unwrap_or_else(|_| "[]".into()),
            req.layer,
            req.priority.map(|p| p.ordinal()),
            version,
            now,
            top.id,
        ],
    )?;
    replace_tags(&tx, &top.id, tags)?;
    write_history(
        &tx,
        &top.id,
        "auto_update",
        &version,
        Some(&top.value),
        Some(&json!({ "requested_key": requested_key, "score": top.score })),
        now,
    )?;
    tx.commit()?;

    tracing::info!(
        requested = %requested_key,
        actual = %top.key,
        score = top.score,
        version = %version,
        "auto-updated existing record instead of creating a duplicate"
    );

    Ok(AutoUpdateOutcome {
        success: true,
        auto_updated: true,
        requested_key: requested_key.to_string(),
        actual_key: top.key,
        similarity_score: top.score,
        duplicate_reason: DuplicateReason {
            matched_tags: top.matched_tags,
            layer_match: top.score_breakdown.layer_match > 0.0,
            similarity: top.reason,
        },
        value: req.value.clone(),
        version,
    })
}

/// Rebuild the tag index rows for a record.
fn replace_tags(tx: &Transaction, record_id: &str, tags: &[String]) -> Result<(), rusqlite::Error> {
    tx.execute("DELETE FROM record_tags WHERE record_id = ?1", params![record_id])?;
    let mut stmt = tx.prepare("INSERT INTO record_tags (record_id, tag) VALUES (?1, ?2)")?;
    for tag in tags {
        stmt.execute(params![record_id, tag])?;
    }
    Ok(())
}

/// Append a row to the record_history audit table.
fn write_history(
    tx: &Transaction,
    record_id: &str,
    operation: &str,
    version: &str,
    previous_value: Option<&str>,
    details: Option<&serde_json::Value>,
    now: &str,
) -> Result<(), rusqlite::Error> {
    tx.execute(
        "INSERT INTO record_history (record_id, operation, version, previous_value, details, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            record_id,
            operation,
            version,
            previous_value,
            details.map(|d| d.to_string()),
            now,
        ],
    )?;
    Ok(())
}

/// Field map handed to the policy quality gate.
fn provided_fields(
    req: &CreateRequest,
    key: &str,
    tags: &[String],
) -> serde_json::Map<String, serde_json::Value> {
    let mut map = serde_json::Map::new();
    map.insert("key".into(), json!(key));
    map.insert("value".into(), json!(req.value));
    map.insert("tags".into(), json!(tags));
    if let Some(layer) = &req.layer {
        map.insert("layer".into(), json!(layer));
    }
    if let Some(priority) = req.priority {
        map.insert("priority".into(), json!(priority.as_str()));
    }
    map
}
