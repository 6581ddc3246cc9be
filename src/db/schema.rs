//! SQL DDL for all Tenet tables.
//!
//! Defines the `records`, `record_tags`, `record_history`, `policies`, and
//! `schema_meta` tables. All DDL uses `IF NOT EXISTS` for idempotent
//! initialization.

use rusqlite::Connection;

/// All schema DDL statements for Tenet's core tables.
const SCHEMA_SQL: &str = r#"
-- Decisions and constraints
CREATE TABLE IF NOT EXISTS records (
    id TEXT PRIMARY KEY,
    kind TEXT NOT NULL CHECK(kind IN ('decision','constraint')),
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    layer TEXT,
    priority INTEGER CHECK(priority BETWEEN 1 AND 4),
    tags TEXT NOT NULL DEFAULT '[]',
    version TEXT NOT NULL DEFAULT '1.0.0',
    status TEXT NOT NULL DEFAULT 'active',
    deleted INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE(kind, key)
);

CREATE INDEX IF NOT EXISTS idx_records_kind ON records(kind);
CREATE INDEX IF NOT EXISTS idx_records_layer ON records(layer);
CREATE INDEX IF NOT EXISTS idx_records_updated ON records(updated_at);

-- Tag index for candidate retrieval
CREATE TABLE IF NOT EXISTS record_tags (
    record_id TEXT NOT NULL REFERENCES records(id) ON DELETE CASCADE,
    tag TEXT NOT NULL,
    PRIMARY KEY (record_id, tag)
);

CREATE INDEX IF NOT EXISTS idx_record_tags_tag ON record_tags(tag);

-- Append-only version history
CREATE TABLE IF NOT EXISTS record_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    record_id TEXT NOT NULL,
    operation TEXT NOT NULL CHECK(operation IN ('create','update','auto_update')),
    version TEXT NOT NULL,
    previous_value TEXT,
    details TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_history_record ON record_history(record_id);

-- Named rule sets; read-only to the suggestion engine
CREATE TABLE IF NOT EXISTS policies (
    name TEXT PRIMARY KEY,
    category TEXT,
    key_pattern TEXT NOT NULL,
    required_fields TEXT,
    defaults TEXT,
    suggest_on_create INTEGER NOT NULL DEFAULT 1,
    match_priority INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);

-- Schema metadata
CREATE TABLE IF NOT EXISTS schema_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Initialize all schema tables. Idempotent (uses IF NOT EXISTS).
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;

    // Set initial schema version if not already present
    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('schema_version', '1')",
        [],
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_creates_all_tables() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();

        assert!(tables.contains(&"records".to_string()));
        assert!(tables.contains(&"record_tags".to_string()));
        assert!(tables.contains(&"record_history".to_string()));
        assert!(tables.contains(&"policies".to_string()));
        assert!(tables.contains(&"schema_meta".to_string()));
    }

    #[test]
    fn schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap(); // second call should not error
    }

    #[test]
    fn key_is_unique_per_kind() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        let insert = "INSERT INTO records (id, kind, key, value, created_at, updated_at) \
                      VALUES (?1, ?2, ?3, 'v', '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z')";
        conn.execute(insert, rusqlite::params!["a", "decision", "arch/db"])
            .unwrap();
        // Same key, other kind — allowed
        conn.execute(insert, rusqlite::params!["b", "constraint", "arch/db"])
            .unwrap();
        // Same kind and key — rejected by the uniqueness backstop
        let dup = conn.execute(insert, rusqlite::params!["c", "decision", "arch/db"]);
        assert!(dup.is_err());
    }
}
