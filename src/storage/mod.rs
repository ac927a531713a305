//! SQLite-backed raw-event store.
//!
//! The store holds three things: per-project sync checkpoints, the
//! append-only raw event log, and the history table derived from it by
//! replay. All ingestion goes through [`Store::ingest`], which stages
//! work in a [`BatchContext`] and commits events plus checkpoint
//! advancement in one transaction, so a crash can lose a batch but never
//! tear one.

pub mod schema;

use crate::error::{GhistError, Result};
use crate::model::{ActionKind, HistoryAction, ItemType, RawEvent};
use rusqlite::{Connection, OpenFlags, TransactionBehavior, params};
use std::path::{Path, PathBuf};

/// Per-project sync checkpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectSync {
    pub name: String,
    /// High-water `updated_at` of the dated issues feed.
    pub issue_since: String,
    /// High-water `updated_at` of the dated comments feed.
    pub comment_since: String,
    /// Highest event id seen in the newest-first events feed.
    pub event_id: i64,
    /// Cache validator of the first events page at that mark.
    pub event_etag: String,
}

/// A checkpoint advancement staged inside an ingestion batch.
///
/// Advancement is monotonic: applying an older value than what is stored
/// is a no-op, so replaying a sync pass can never move a cursor backward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckpointUpdate {
    IssueSince(String),
    CommentSince(String),
    EventMark { id: i64, etag: String },
}

/// Work staged by one ingestion batch: raw events to append and
/// checkpoint updates to apply, all committed atomically.
#[derive(Debug, Default)]
pub struct BatchContext {
    events: Vec<RawEvent>,
    checkpoints: Vec<(String, CheckpointUpdate)>,
}

impl BatchContext {
    /// Stage one raw event for appending.
    pub fn record(&mut self, event: RawEvent) {
        self.events.push(event);
    }

    /// Stage a checkpoint advancement for `project`.
    pub fn set_checkpoint(&mut self, project: &str, update: CheckpointUpdate) {
        self.checkpoints.push((project.to_string(), update));
    }

    /// Number of events staged so far.
    #[must_use]
    pub fn staged(&self) -> usize {
        self.events.len()
    }
}

/// Handle to one database file.
#[derive(Debug)]
pub struct Store {
    conn: Connection,
    path: PathBuf,
}

impl Store {
    /// Open an existing database.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(GhistError::DatabaseNotFound {
                path: path.to_path_buf(),
            });
        }
        let conn = Connection::open(path)?;
        schema::apply_schema(&conn)?;
        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    /// Create a new database, refusing to clobber an existing file.
    pub fn init(path: &Path) -> Result<Self> {
        if path.exists() {
            return Err(GhistError::DatabaseExists {
                path: path.to_path_buf(),
            });
        }
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
        )?;
        schema::apply_schema(&conn)?;
        tracing::info!(path = %path.display(), "initialized database");
        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    /// In-memory store for tests.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::apply_schema(&conn)?;
        Ok(Self {
            conn,
            path: PathBuf::from(":memory:"),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    // === Projects ===

    /// Start tracking a project, with zeroed checkpoints.
    pub fn add_project(&self, name: &str) -> Result<()> {
        let n = self.conn.execute(
            "INSERT OR IGNORE INTO projects (name) VALUES (?1)",
            params![name],
        )?;
        if n == 0 {
            return Err(GhistError::ProjectExists {
                name: name.to_string(),
            });
        }
        Ok(())
    }

    /// All tracked projects, sorted by name.
    pub fn projects(&self) -> Result<Vec<ProjectSync>> {
        let mut stmt = self.conn.prepare(
            "SELECT name, issue_since, comment_since, event_id, event_etag
             FROM projects ORDER BY name",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(ProjectSync {
                name: row.get(0)?,
                issue_since: row.get(1)?,
                comment_since: row.get(2)?,
                event_id: row.get(3)?,
                event_etag: row.get(4)?,
            })
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    /// One tracked project's checkpoints.
    pub fn project(&self, name: &str) -> Result<ProjectSync> {
        self.projects()?
            .into_iter()
            .find(|p| p.name == name)
            .ok_or_else(|| GhistError::ProjectNotFound {
                name: name.to_string(),
            })
    }

    // === Ingestion ===

    /// Run one ingestion batch transactionally.
    ///
    /// The closure stages events and checkpoint updates; on success the
    /// staged events are appended with duplicate identities ignored, the
    /// checkpoints advanced, and everything committed. Returns the
    /// closure's value and the number of events actually appended.
    pub fn ingest<R, F>(&mut self, f: F) -> Result<(R, usize)>
    where
        F: FnOnce(&mut BatchContext) -> Result<R>,
    {
        let mut batch = BatchContext::default();
        let value = f(&mut batch)?;

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let mut appended = 0;
        {
            let mut insert = tx.prepare_cached(
                "INSERT OR IGNORE INTO raw_events
                     (identity, project, issue, item_type, payload, observed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for ev in &batch.events {
                appended += insert.execute(params![
                    ev.identity,
                    ev.project,
                    ev.issue,
                    ev.item_type.as_str(),
                    ev.payload,
                    ev.observed_at,
                ])?;
            }
        }
        for (project, update) in &batch.checkpoints {
            apply_checkpoint(&tx, project, update)?;
        }
        tx.commit()?;
        if appended > 0 {
            tracing::debug!(appended, "ingested raw events");
        }
        Ok((value, appended))
    }

    // === Raw events ===

    /// All raw events for a project in insertion order, with their
    /// sequence ids. This order is the replay order.
    pub fn raw_events(&self, project: &str) -> Result<Vec<(i64, RawEvent)>> {
        let mut stmt = self.conn.prepare(
            "SELECT seq, identity, project, issue, item_type, payload, observed_at
             FROM raw_events WHERE project = ?1 ORDER BY seq",
        )?;
        let rows = stmt.query_map(params![project], |row| {
            let type_str: String = row.get(4)?;
            Ok((
                row.get::<_, i64>(0)?,
                type_str,
                RawEvent {
                    identity: row.get(1)?,
                    project: row.get(2)?,
                    issue: row.get(3)?,
                    item_type: ItemType::Issue,
                    payload: row.get(5)?,
                    observed_at: row.get(6)?,
                },
            ))
        })?;
        let mut out = Vec::new();
        for row in rows {
            let (seq, type_str, mut ev) = row?;
            ev.item_type = ItemType::parse(&type_str).ok_or_else(|| GhistError::Payload {
                reason: format!("unknown item type in store: {type_str}"),
            })?;
            out.push((seq, ev));
        }
        Ok(out)
    }

    /// Distinct issue numbers a project has raw events for.
    pub fn issue_numbers(&self, project: &str) -> Result<Vec<i64>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT issue FROM raw_events
             WHERE project = ?1 AND issue > 0 ORDER BY issue",
        )?;
        let rows = stmt.query_map(params![project], |row| row.get(0))?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    /// Total raw-event count for a project.
    pub fn raw_event_count(&self, project: &str) -> Result<i64> {
        self.conn
            .query_row(
                "SELECT COUNT(*) FROM raw_events WHERE project = ?1",
                params![project],
                |row| row.get(0),
            )
            .map_err(Into::into)
    }

    // === History ===

    /// Replace a project's derived history wholesale, in one transaction.
    pub fn replace_history(&mut self, project: &str, actions: &[HistoryAction]) -> Result<()> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute("DELETE FROM history WHERE project = ?1", params![project])?;
        {
            let mut insert = tx.prepare_cached(
                "INSERT INTO history (project, issue, time, actor, action, text, seq)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for a in actions {
                insert.execute(params![
                    a.project,
                    a.issue,
                    a.time,
                    a.actor,
                    a.action.as_str(),
                    a.text,
                    a.sequence_key,
                ])?;
            }
        }
        tx.commit()?;
        tracing::info!(project, actions = actions.len(), "history rebuilt");
        Ok(())
    }

    /// History of one issue, oldest first.
    pub fn issue_history(&self, project: &str, issue: i64) -> Result<Vec<HistoryAction>> {
        let mut stmt = self.conn.prepare(
            "SELECT project, issue, time, actor, action, text, seq
             FROM history WHERE project = ?1 AND issue = ?2
             ORDER BY time, seq",
        )?;
        let rows = stmt.query_map(params![project, issue], history_row)?;
        collect_history(rows)
    }

    /// All history for a project, oldest first.
    pub fn project_history(&self, project: &str) -> Result<Vec<HistoryAction>> {
        let mut stmt = self.conn.prepare(
            "SELECT project, issue, time, actor, action, text, seq
             FROM history WHERE project = ?1 ORDER BY time, seq",
        )?;
        let rows = stmt.query_map(params![project], history_row)?;
        collect_history(rows)
    }

    /// Action counts per ISO-ish week (`%Y-%W`), oldest week first.
    pub fn weekly_action_counts(&self, project: &str) -> Result<Vec<(String, i64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT strftime('%Y-%W', time) AS week, COUNT(*)
             FROM history WHERE project = ?1 AND time != ''
             GROUP BY week ORDER BY week",
        )?;
        let rows = stmt.query_map(params![project], |row| Ok((row.get(0)?, row.get(1)?)))?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    /// Most active actors, descending, with action counts.
    pub fn top_actors(&self, project: &str, limit: usize) -> Result<Vec<(String, i64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT actor, COUNT(*) AS n FROM history
             WHERE project = ?1 AND actor != ''
             GROUP BY actor ORDER BY n DESC, actor LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![project, limit as i64], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }
}

fn history_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<(HistoryAction, String)> {
    Ok((
        HistoryAction {
            project: row.get(0)?,
            issue: row.get(1)?,
            time: row.get(2)?,
            actor: row.get(3)?,
            action: ActionKind::Create,
            text: row.get(5)?,
            sequence_key: row.get(6)?,
        },
        row.get(4)?,
    ))
}

fn collect_history(
    rows: impl Iterator<Item = rusqlite::Result<(HistoryAction, String)>>,
) -> Result<Vec<HistoryAction>> {
    let mut out = Vec::new();
    for row in rows {
        let (mut action, kind) = row?;
        action.action = ActionKind::parse(&kind).ok_or_else(|| GhistError::Payload {
            reason: format!("unknown action in store: {kind}"),
        })?;
        out.push(action);
    }
    Ok(out)
}

fn apply_checkpoint(
    conn: &Connection,
    project: &str,
    update: &CheckpointUpdate,
) -> Result<()> {
    let n = match update {
        CheckpointUpdate::IssueSince(since) => conn.execute(
            "UPDATE projects SET issue_since = ?2
             WHERE name = ?1 AND issue_since < ?2",
            params![project, since],
        )?,
        CheckpointUpdate::CommentSince(since) => conn.execute(
            "UPDATE projects SET comment_since = ?2
             WHERE name = ?1 AND comment_since < ?2",
            params![project, since],
        )?,
        CheckpointUpdate::EventMark { id, etag } => conn.execute(
            "UPDATE projects SET event_id = ?2, event_etag = ?3
             WHERE name = ?1 AND event_id <= ?2",
            params![project, id, etag],
        )?,
    };
    if n == 0 {
        tracing::debug!(project, ?update, "checkpoint not advanced");
    }
    Ok(())
}
