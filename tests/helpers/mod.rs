#![allow(dead_code)]

use rusqlite::Connection;
use tenet::db;
use tenet::knowledge::types::RecordKind;
use tenet::knowledge::write::{create_record, CreateOutcome, CreateRequest, SuggestionSettings};

/// Open a fresh in-memory database with schema and migrations applied.
pub fn test_db() -> Connection {
    db::open_memory_database().unwrap()
}

pub fn settings() -> SuggestionSettings {
    SuggestionSettings::default()
}

/// Insert a record directly through the write path with suggestion bypassed.
pub fn seed_record(
    conn: &mut Connection,
    kind: RecordKind,
    key: &str,
    value: &str,
    tags: &[&str],
    layer: Option<&str>,
) {
    let mut req = CreateRequest::new(kind, key, value);
    req.tags = tags.iter().map(|t| t.to_string()).collect();
    req.layer = layer.map(String::from);
    req.ignore_suggest = true;
    create_record(conn, &settings(), req).unwrap();
}

/// Insert a policy row the way the surrounding storage layer would.
pub fn insert_policy(
    conn: &Connection,
    name: &str,
    key_pattern: &str,
    required_fields: &[&str],
    suggest_on_create: bool,
) {
    let required = serde_json::to_string(required_fields).unwrap();
    conn.execute(
        "INSERT INTO policies (name, key_pattern, required_fields, suggest_on_create, \
         match_priority, created_at) VALUES (?1, ?2, ?3, ?4, 0, '2026-01-01T00:00:00Z')",
        rusqlite::params![name, key_pattern, required, suggest_on_create],
    )
    .unwrap();
}

/// Number of non-deleted rows stored under (kind, key).
pub fn record_count(conn: &Connection, kind: RecordKind, key: &str) -> i64 {
    conn.query_row(
        "SELECT COUNT(*) FROM records WHERE kind = ?1 AND key = ?2 AND deleted = 0",
        rusqlite::params![kind.as_str(), key],
        |row| row.get(0),
    )
    .unwrap()
}

/// Version of the row stored under (kind, key).
pub fn record_version(conn: &Connection, kind: RecordKind, key: &str) -> String {
    conn.query_row(
        "SELECT version FROM records WHERE kind = ?1 AND key = ?2 AND deleted = 0",
        rusqlite::params![kind.as_str(), key],
        |row| row.get(0),
    )
    .unwrap()
}

/// Value of the row stored under (kind, key).
pub fn record_value(conn: &Connection, kind: RecordKind, key: &str) -> String {
    conn.query_row(
        "SELECT value FROM records WHERE kind = ?1 AND key = ?2 AND deleted = 0",
        rusqlite::params![kind.as_str(), key],
        |row| row.get(0),
    )
    .unwrap()
}

/// Unwrap a plain (non-auto-update) create outcome.
pub fn expect_created(outcome: CreateOutcome) -> tenet::knowledge::write::CreateResponse {
    match outcome {
        CreateOutcome::Created(response) => response,
        CreateOutcome::AutoUpdated(_) => panic!("expected plain create, got auto-update"),
    }
}

/// Unwrap an auto-update outcome.
pub fn expect_auto_updated(outcome: CreateOutcome) -> tenet::knowledge::write::AutoUpdateOutcome {
    match outcome {
        CreateOutcome::AutoUpdated(outcome) => outcome,
        CreateOutcome::Created(_) => panic!("expected auto-update, got plain create"),
    }
}
