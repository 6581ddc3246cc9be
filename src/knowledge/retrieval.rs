//! Candidate retrieval — bounded, unscored reads of existing records.
//!
//! Queries are restricted to one record kind, exclude soft-deleted rows, and
//! return at most [`CANDIDATE_CAP`] rows ordered by most-recent update. Tag
//! queries go through the `record_tags` index. No scoring happens here; that
//! keeps the expensive work off the storage path. An empty list, never an
//! error, is the answer when nothing matches.

use anyhow::Result;
use rusqlite::{params, Connection};

use crate::knowledge::types::{Candidate, Priority, QueryContext, RecordKind};

/// Upper bound on candidates returned by any single retrieval query.
pub const CANDIDATE_CAP: usize = 200;

const CANDIDATE_COLUMNS: &str = "id, key, value, tags, layer, priority, version, updated_at";

/// Retrieve candidates for a query context: tag intersection when tags are
/// given, layer match when a layer is given (results are unioned), falling
/// back to a kind-wide scan when only a key is available for comparison.
pub fn for_context(
    conn: &Connection,
    kind: RecordKind,
    ctx: &QueryContext,
) -> Result<Vec<Candidate>> {
    let mut candidates = Vec::new();

    if !ctx.tags.is_empty() {
        candidates = by_tags(conn, kind, &ctx.tags)?;
    }
    if let Some(layer) = &ctx.layer {
        merge(&mut candidates, by_layer(conn, kind, layer)?);
    }
    if candidates.is_empty() && ctx.tags.is_empty() && ctx.layer.is_none() && ctx.key.is_some() {
        candidates = by_kind(conn, kind)?;
    }

    candidates.truncate(CANDIDATE_CAP);
    Ok(candidates)
}

/// Candidates whose tag set intersects `tags`, via the `record_tags` index.
pub fn by_tags(conn: &Connection, kind: RecordKind, tags: &[String]) -> Result<Vec<Candidate>> {
    if tags.is_empty() {
        return Ok(Vec::new());
    }

    // Parameterized IN clause: ?1 is the kind, tags start at ?2.
    let placeholders: Vec<String> = (0..tags.len()).map(|i| format!("?{}", i + 2)).collect();
    let sql = format!(
        "SELECT DISTINCT r.{CANDIDATE_COLUMNS} \
         FROM records r JOIN record_tags rt ON rt.record_id = r.id \
         WHERE r.kind = ?1 AND r.deleted = 0 AND rt.tag IN ({}) \
         ORDER BY r.updated_at DESC LIMIT {CANDIDATE_CAP}",
        placeholders.join(", ")
    );

    let mut stmt = conn.prepare(&sql)?;
    let kind = kind.as_str();
    let mut bound: Vec<&dyn rusqlite::types::ToSql> = vec![&kind];
    for tag in tags {
        bound.push(tag);
    }
    let result = collect_candidates(stmt.query(bound.as_slice())?);
    result
}

/// Candidates declaring the given layer.
pub fn by_layer(conn: &Connection, kind: RecordKind, layer: &str) -> Result<Vec<Candidate>> {
    let sql = format!(
        "SELECT {CANDIDATE_COLUMNS} FROM records \
         WHERE kind = ?1 AND deleted = 0 AND layer = ?2 COLLATE NOCASE \
         ORDER BY updated_at DESC LIMIT {CANDIDATE_CAP}"
    );
    let mut stmt = conn.prepare(&sql)?;
    let result = collect_candidates(stmt.query(params![kind.as_str(), layer])?);
    result
}

/// All non-deleted candidates of a kind, most recent first, capped.
pub fn by_kind(conn: &Connection, kind: RecordKind) -> Result<Vec<Candidate>> {
    let sql = format!(
        "SELECT {CANDIDATE_COLUMNS} FROM records \
         WHERE kind = ?1 AND deleted = 0 \
         ORDER BY updated_at DESC LIMIT {CANDIDATE_CAP}"
    );
    let mut stmt = conn.prepare(&sql)?;
    let result = collect_candidates(stmt.query(params![kind.as_str()])?);
    result
}

/// Append `extra` onto `base`, skipping ids already present.
fn merge(base: &mut Vec<Candidate>, extra: Vec<Candidate>) {
    for candidate in extra {
        if !base.iter().any(|c| c.id == candidate.id) {
            base.push(candidate);
        }
    }
}

/// Map rows into [`Candidate`] snapshots.
///
/// Rows with unparseable tags or timestamps are skipped with a warning —
/// malformed data degrades suggestions, it never fails the caller.
fn collect_candidates(mut rows: rusqlite::Rows<'_>) -> Result<Vec<Candidate>> {
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let id: String = row.get(0)?;
        let key: String = row.get(1)?;
        let value: String = row.get(2)?;
        let tags_json: String = row.get(3)?;
        let layer: Option<String> = row.get(4)?;
        let priority: Option<i64> = row.get(5)?;
        let version: String = row.get(6)?;
        let updated_at: String = row.get(7)?;

        let tags: Vec<String> = match serde_json::from_str(&tags_json) {
            Ok(tags) => tags,
            Err(e) => {
                tracing::warn!(record = %id, error = %e, "skipping candidate with malformed tags");
                continue;
            }
        };
        let updated_at = match chrono::DateTime::parse_from_rfc3339(&updated_at) {
            Ok(ts) => ts.timestamp(),
            Err(e) => {
                tracing::warn!(record = %id, error = %e, "skipping candidate with malformed timestamp");
                continue;
            }
        };

        out.push(Candidate {
            id,
            key,
            value,
            tags,
            layer,
            priority: priority.and_then(Priority::from_ordinal),
            version,
            updated_at,
        });
    }
    Ok(out)
}
