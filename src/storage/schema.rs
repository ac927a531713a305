//! SQLite schema for the raw-event store and derived history.

use crate::error::Result;
use rusqlite::Connection;

/// Schema version recorded in `user_version`.
pub const SCHEMA_VERSION: i32 = 1;

/// Full schema, applied idempotently.
///
/// `raw_events.seq` is the insertion id; it orders replay and survives
/// forever because the table is append-only. The uniqueness constraint on
/// (project, item_type, identity) is what makes ingestion idempotent.
pub const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS projects (
    name          TEXT PRIMARY KEY,
    issue_since   TEXT NOT NULL DEFAULT '',
    comment_since TEXT NOT NULL DEFAULT '',
    event_id      INTEGER NOT NULL DEFAULT 0,
    event_etag    TEXT NOT NULL DEFAULT ''
) WITHOUT ROWID;

CREATE TABLE IF NOT EXISTS raw_events (
    seq         INTEGER PRIMARY KEY AUTOINCREMENT,
    identity    TEXT NOT NULL,
    project     TEXT NOT NULL,
    issue       INTEGER NOT NULL,
    item_type   TEXT NOT NULL,
    payload     BLOB NOT NULL,
    observed_at TEXT NOT NULL DEFAULT '',
    UNIQUE (project, item_type, identity)
);

CREATE INDEX IF NOT EXISTS idx_raw_events_project_issue
    ON raw_events (project, issue);

CREATE TABLE IF NOT EXISTS history (
    project TEXT NOT NULL,
    issue   INTEGER NOT NULL,
    time    TEXT NOT NULL,
    actor   TEXT NOT NULL,
    action  TEXT NOT NULL,
    text    TEXT NOT NULL,
    seq     INTEGER NOT NULL,
    PRIMARY KEY (project, seq, action)
) WITHOUT ROWID;

CREATE INDEX IF NOT EXISTS idx_history_project_issue
    ON history (project, issue, time);

CREATE INDEX IF NOT EXISTS idx_history_project_time
    ON history (project, time);
";

/// Apply pragmas and the schema to a fresh or existing connection.
pub fn apply_schema(conn: &Connection) -> Result<()> {
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.execute_batch(SCHEMA_SQL)?;
    conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    Ok(())
}
