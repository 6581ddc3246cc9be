use anyhow::Result;
use rusqlite::Connection;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;

/// Response from knowledge_stats.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub total_records: u64,
    pub active_records: u64,
    pub deleted_records: u64,
    pub by_kind: HashMap<String, u64>,
    pub by_layer: HashMap<String, u64>,
    pub by_status: HashMap<String, u64>,
    pub policies: u64,
    pub history_entries: u64,
    pub db_size_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oldest_record: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub newest_record: Option<String>,
}

/// Compute knowledge-store statistics.
///
/// `db_path` is used for file size calculation; pass None for in-memory
/// databases.
pub fn knowledge_stats(conn: &Connection, db_path: Option<&Path>) -> Result<StatsResponse> {
    let total: i64 = conn.query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))?;
    let active: i64 = conn.query_row(
        "SELECT COUNT(*) FROM records WHERE deleted = 0",
        [],
        |row| row.get(0),
    )?;

    let by_kind = group_counts(conn, "SELECT kind, COUNT(*) FROM records WHERE deleted = 0 GROUP BY kind")?;
    let by_layer = group_counts(
        conn,
        "SELECT COALESCE(layer, 'none'), COUNT(*) FROM records WHERE deleted = 0 GROUP BY layer",
    )?;
    let by_status = group_counts(
        conn,
        "SELECT status, COUNT(*) FROM records WHERE deleted = 0 GROUP BY status",
    )?;

    let policies: i64 = conn.query_row("SELECT COUNT(*) FROM policies", [], |row| row.get(0))?;
    let history_entries: i64 =
        conn.query_row("SELECT COUNT(*) FROM record_history", [], |row| row.get(0))?;

    let (oldest, newest): (Option<String>, Option<String>) = conn.query_row(
        "SELECT MIN(created_at), MAX(created_at) FROM records WHERE deleted = 0",
        [],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;

    let db_size_bytes = db_path
        .and_then(|p| std::fs::metadata(p).ok())
        .map(|m| m.len())
        .unwrap_or(0);

    Ok(StatsResponse {
        total_records: total as u64,
        active_records: active as u64,
        deleted_records: (total - active) as u64,
        by_kind,
        by_layer,
        by_status,
        policies: policies as u64,
        history_entries: history_entries as u64,
        db_size_bytes,
        oldest_record: oldest,
        newest_record: newest,
    })
}

fn group_counts(conn: &Connection, sql: &str) -> Result<HashMap<String, u64>> {
    let mut stmt = conn.prepare(sql)?;
    let rows: Vec<(String, i64)> = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows.into_iter().map(|(k, v)| (k, v as u64)).collect())
}
