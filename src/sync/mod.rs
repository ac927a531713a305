//! Incremental synchronizer: pulls the dated feeds and the event feed
//! into the raw-event store.
//!
//! Three feeds per project. Issues and comments are dated feeds walked
//! oldest-first from a `since` cursor; each page commits in its own
//! batch, advancing the cursor to the page's highest `updated_at`, so an
//! interrupted sync resumes at page granularity and re-fetching already
//! stored items is harmless. Events have no dated form: the feed is
//! walked newest-first until the stored high-water id, and the first
//! item's id plus the first page's etag become the new mark.

use crate::error::{GhistError, Result};
use crate::model::{ItemType, RawEvent};
use crate::remote::{Fetched, Transport};
use crate::storage::{CheckpointUpdate, Store};
use serde_json::Value;

const API_ROOT: &str = "https://api.github.com";

/// Earliest cursor for a project that has never been synced.
const EPOCH_SINCE: &str = "2000-01-01T00:00:00Z";

/// How much of the remote state to pull.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Dated feeds from their cursors plus new events.
    Incremental,
    /// Incremental, then a per-issue re-download of every issue's full
    /// event timeline, to backfill gaps from before the project was added.
    Full,
}

/// Counts of raw events appended by one sync pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub issues: usize,
    pub comments: usize,
    pub events: usize,
}

impl SyncSummary {
    #[must_use]
    pub const fn total(&self) -> usize {
        self.issues + self.comments + self.events
    }
}

/// Drives one project's sync against a [`Transport`].
pub struct Synchronizer<'a, T: Transport> {
    store: &'a mut Store,
    transport: &'a T,
}

impl<'a, T: Transport> Synchronizer<'a, T> {
    pub fn new(store: &'a mut Store, transport: &'a T) -> Self {
        Self { store, transport }
    }

    /// Sync one project. Feed order is issues, comments, events, so a
    /// partial run leaves earlier feeds complete.
    pub fn sync(&mut self, project: &str, mode: SyncMode) -> Result<SyncSummary> {
        let state = self.store.project(project)?;
        tracing::info!(project, ?mode, "sync starting");

        let issues = self.sync_dated(project, Feed::Issues, &state.issue_since)?;
        let comments = self.sync_dated(project, Feed::Comments, &state.comment_since)?;
        let events = match mode {
            SyncMode::Incremental => {
                self.sync_events(project, state.event_id, &state.event_etag, false)?
            }
            SyncMode::Full => {
                // Record the mark first so the next incremental pass does
                // not skip anything published during the long backfill.
                self.sync_events(project, state.event_id, &state.event_etag, true)?;
                self.backfill_issue_events(project)?
            }
        };
        let summary = SyncSummary {
            issues,
            comments,
            events,
        };
        tracing::info!(
            project,
            issues = summary.issues,
            comments = summary.comments,
            events = summary.events,
            "sync finished"
        );
        Ok(summary)
    }

    /// Walk a dated feed from `since`, committing one batch per page.
    fn sync_dated(&mut self, project: &str, feed: Feed, since: &str) -> Result<usize> {
        let since = if since.is_empty() { EPOCH_SINCE } else { since };
        let mut url = feed.start_url(project, since);
        let mut appended = 0;
        while !url.is_empty() {
            let page = match self.transport.fetch_page(&url, None)? {
                Fetched::NotModified => break,
                Fetched::Page(page) => page,
            };
            let next = page.next.clone().unwrap_or_default();
            let (_, n) = self.store.ingest(|batch| {
                let mut high_water = String::new();
                for item in &page.items {
                    let ev = feed.to_raw_event(project, item)?;
                    let updated = text_field(item, "updated_at");
                    if updated > high_water.as_str() {
                        high_water = updated.to_string();
                    }
                    batch.record(ev);
                }
                if !high_water.is_empty() {
                    batch.set_checkpoint(project, feed.checkpoint(high_water));
                }
                Ok(())
            })?;
            appended += n;
            url = next;
        }
        Ok(appended)
    }

    /// Walk the whole-repo event feed newest-first down to the stored
    /// high-water id. With `record_only`, read just the first page to
    /// capture the new mark and store nothing (the caller is about to
    /// backfill every issue anyway).
    fn sync_events(
        &mut self,
        project: &str,
        high_water: i64,
        etag: &str,
        record_only: bool,
    ) -> Result<usize> {
        let mut url = format!("{API_ROOT}/repos/{project}/issues/events?page=1&per_page=100");
        let mut collected: Vec<Value> = Vec::new();
        let mut mark: Option<(i64, String)> = None;
        let mut first_page = true;

        while !url.is_empty() {
            let req_etag = (first_page && !etag.is_empty()).then_some(etag);
            let page = match self.transport.fetch_page(&url, req_etag)? {
                Fetched::NotModified => {
                    tracing::debug!(project, "event feed unchanged");
                    return Ok(0);
                }
                Fetched::Page(page) => page,
            };
            if first_page {
                if let Some(first) = page.items.first() {
                    let id = int_field(first, "id");
                    mark = Some((id, page.etag.clone().unwrap_or_default()));
                }
                first_page = false;
                if record_only {
                    break;
                }
            }
            let mut done = false;
            for item in page.items {
                if int_field(&item, "id") <= high_water {
                    done = true;
                    break;
                }
                collected.push(item);
            }
            if done {
                break;
            }
            url = page.next.unwrap_or_default();
        }

        let (_, appended) = self.store.ingest(|batch| {
            for item in &collected {
                batch.record(event_to_raw(project, item, None)?);
            }
            if let Some((id, etag)) = &mark {
                batch.set_checkpoint(
                    project,
                    CheckpointUpdate::EventMark {
                        id: *id,
                        etag: etag.clone(),
                    },
                );
            }
            Ok(())
        })?;
        Ok(appended)
    }

    /// Re-download the full event timeline of every known issue.
    fn backfill_issue_events(&mut self, project: &str) -> Result<usize> {
        let numbers = self.store.issue_numbers(project)?;
        tracing::info!(project, issues = numbers.len(), "backfilling issue events");
        let mut appended = 0;
        for number in numbers {
            let mut url = format!(
                "{API_ROOT}/repos/{project}/issues/{number}/events?page=1&per_page=100"
            );
            let mut items = Vec::new();
            while !url.is_empty() {
                let page = match self.transport.fetch_page(&url, None)? {
                    Fetched::NotModified => break,
                    Fetched::Page(page) => page,
                };
                items.extend(page.items);
                url = page.next.unwrap_or_default();
            }
            let (_, n) = self.store.ingest(|batch| {
                for item in &items {
                    batch.record(event_to_raw(project, item, Some(number))?);
                }
                Ok(())
            })?;
            appended += n;
        }
        Ok(appended)
    }
}

#[derive(Debug, Clone, Copy)]
enum Feed {
    Issues,
    Comments,
}

impl Feed {
    fn start_url(self, project: &str, since: &str) -> String {
        let since = since.replace(':', "%3A");
        match self {
            Self::Issues => format!(
                "{API_ROOT}/repos/{project}/issues?direction=asc&page=1&per_page=100&sort=updated&state=all&since={since}"
            ),
            Self::Comments => format!(
                "{API_ROOT}/repos/{project}/issues/comments?direction=asc&page=1&sort=updated&since={since}"
            ),
        }
    }

    fn checkpoint(self, high_water: String) -> CheckpointUpdate {
        match self {
            Self::Issues => CheckpointUpdate::IssueSince(high_water),
            Self::Comments => CheckpointUpdate::CommentSince(high_water),
        }
    }

    fn to_raw_event(self, project: &str, item: &Value) -> Result<RawEvent> {
        let identity = text_field(item, "url").to_string();
        if identity.is_empty() {
            return Err(GhistError::Payload {
                reason: "feed item missing url".to_string(),
            });
        }
        let issue = match self {
            Self::Issues => int_field(item, "number"),
            Self::Comments => issue_from_url(text_field(item, "issue_url")),
        };
        Ok(RawEvent {
            identity,
            project: project.to_string(),
            issue,
            item_type: match self {
                Self::Issues => ItemType::Issue,
                Self::Comments => ItemType::Comment,
            },
            payload: serde_json::to_vec(item)?,
            observed_at: text_field(item, "created_at").to_string(),
        })
    }
}

fn event_to_raw(project: &str, item: &Value, issue: Option<i64>) -> Result<RawEvent> {
    let id = int_field(item, "id");
    let identity = {
        let url = text_field(item, "url");
        if url.is_empty() {
            format!("{API_ROOT}/repos/{project}/issues/events/{id}")
        } else {
            url.to_string()
        }
    };
    let issue = issue.unwrap_or_else(|| {
        item.get("issue")
            .and_then(|i| i.get("number"))
            .and_then(Value::as_i64)
            .unwrap_or(0)
    });
    Ok(RawEvent {
        identity,
        project: project.to_string(),
        issue,
        item_type: ItemType::Event,
        payload: serde_json::to_vec(item)?,
        observed_at: text_field(item, "created_at").to_string(),
    })
}

fn text_field<'v>(item: &'v Value, name: &str) -> &'v str {
    item.get(name).and_then(Value::as_str).unwrap_or("")
}

fn int_field(item: &Value, name: &str) -> i64 {
    item.get(name).and_then(Value::as_i64).unwrap_or(0)
}

/// Trailing number of an API issue URL.
fn issue_from_url(url: &str) -> i64 {
    url.rsplit('/').next().and_then(|n| n.parse().ok()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::Page;
    use std::cell::RefCell;
    use std::collections::HashMap;

    /// Canned pages keyed by URL; etag hits return NotModified.
    struct FakeTransport {
        pages: HashMap<String, Page>,
        etags: HashMap<String, String>,
        log: RefCell<Vec<String>>,
    }

    impl FakeTransport {
        fn new() -> Self {
            Self {
                pages: HashMap::new(),
                etags: HashMap::new(),
                log: RefCell::new(Vec::new()),
            }
        }

        fn page(&mut self, url: &str, items: Vec<Value>, next: Option<&str>, etag: Option<&str>) {
            self.pages.insert(
                url.to_string(),
                Page {
                    items,
                    next: next.map(ToString::to_string),
                    etag: etag.map(ToString::to_string),
                },
            );
        }

        fn not_modified_for(&mut self, url: &str, etag: &str) {
            self.etags.insert(url.to_string(), etag.to_string());
        }
    }

    impl Transport for FakeTransport {
        fn fetch_page(&self, url: &str, etag: Option<&str>) -> Result<Fetched> {
            self.log.borrow_mut().push(url.to_string());
            if let (Some(expected), Some(got)) = (self.etags.get(url), etag) {
                if expected == got {
                    return Ok(Fetched::NotModified);
                }
            }
            self.pages
                .get(url)
                .cloned()
                .map(Fetched::Page)
                .ok_or_else(|| GhistError::Transport(format!("unexpected fetch: {url}")))
        }
    }

    fn issue_item(number: i64, updated: &str) -> Value {
        serde_json::json!({
            "number": number,
            "url": format!("https://api.github.com/repos/o/r/issues/{number}"),
            "title": format!("issue {number}"),
            "state": "open",
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": updated,
            "user": {"login": "gopher"}
        })
    }

    fn comment_item(id: i64, issue: i64, updated: &str) -> Value {
        serde_json::json!({
            "url": format!("https://api.github.com/repos/o/r/issues/comments/{id}"),
            "issue_url": format!("https://api.github.com/repos/o/r/issues/{issue}"),
            "body": "hi",
            "created_at": "2024-01-02T00:00:00Z",
            "updated_at": updated,
            "user": {"login": "gopher"}
        })
    }

    fn event_item(id: i64, issue: i64) -> Value {
        serde_json::json!({
            "id": id,
            "url": format!("https://api.github.com/repos/o/r/issues/events/{id}"),
            "event": "closed",
            "created_at": "2024-01-03T00:00:00Z",
            "issue": {"number": issue}
        })
    }

    const ISSUES_P1: &str = "https://api.github.com/repos/o/r/issues?direction=asc&page=1&per_page=100&sort=updated&state=all&since=2000-01-01T00%3A00%3A00Z";
    const COMMENTS_P1: &str = "https://api.github.com/repos/o/r/issues/comments?direction=asc&page=1&sort=updated&since=2000-01-01T00%3A00%3A00Z";
    const EVENTS_P1: &str = "https://api.github.com/repos/o/r/issues/events?page=1&per_page=100";

    #[test]
    fn test_first_sync_walks_pages_and_sets_cursors() {
        let mut store = Store::open_memory().unwrap();
        store.add_project("o/r").unwrap();

        let mut fake = FakeTransport::new();
        let issues_p2 = "https://api.github.com/repos/o/r/issues?page=2";
        fake.page(
            ISSUES_P1,
            vec![issue_item(1, "2024-05-01T00:00:00Z")],
            Some(issues_p2),
            None,
        );
        fake.page(
            issues_p2,
            vec![issue_item(2, "2024-05-02T00:00:00Z")],
            None,
            None,
        );
        fake.page(
            COMMENTS_P1,
            vec![comment_item(10, 1, "2024-05-03T00:00:00Z")],
            None,
            None,
        );
        fake.page(EVENTS_P1, vec![event_item(100, 1)], None, Some("\"e1\""));

        let summary = Synchronizer::new(&mut store, &fake)
            .sync("o/r", SyncMode::Incremental)
            .unwrap();
        assert_eq!(summary.issues, 2);
        assert_eq!(summary.comments, 1);
        assert_eq!(summary.events, 1);

        let proj = store.project("o/r").unwrap();
        assert_eq!(proj.issue_since, "2024-05-02T00:00:00Z");
        assert_eq!(proj.comment_since, "2024-05-03T00:00:00Z");
        assert_eq!(proj.event_id, 100);
        assert_eq!(proj.event_etag, "\"e1\"");
    }

    #[test]
    fn test_second_sync_is_idempotent() {
        let mut store = Store::open_memory().unwrap();
        store.add_project("o/r").unwrap();

        let mut fake = FakeTransport::new();
        fake.page(ISSUES_P1, vec![issue_item(1, "2024-05-01T00:00:00Z")], None, None);
        fake.page(COMMENTS_P1, vec![], None, None);
        fake.page(EVENTS_P1, vec![event_item(100, 1)], None, Some("\"e1\""));
        Synchronizer::new(&mut store, &fake)
            .sync("o/r", SyncMode::Incremental)
            .unwrap();

        // Second pass: dated feeds start from the advanced cursor and
        // return the boundary item again; the event feed etag matches.
        let mut fake = FakeTransport::new();
        let issues_again = "https://api.github.com/repos/o/r/issues?direction=asc&page=1&per_page=100&sort=updated&state=all&since=2024-05-01T00%3A00%3A00Z";
        fake.page(issues_again, vec![issue_item(1, "2024-05-01T00:00:00Z")], None, None);
        fake.page(COMMENTS_P1, vec![], None, None);
        fake.not_modified_for(EVENTS_P1, "\"e1\"");

        let summary = Synchronizer::new(&mut store, &fake)
            .sync("o/r", SyncMode::Incremental)
            .unwrap();
        assert_eq!(summary.total(), 0);
        assert_eq!(store.raw_event_count("o/r").unwrap(), 2);
    }

    #[test]
    fn test_event_walk_stops_at_high_water() {
        let mut store = Store::open_memory().unwrap();
        store.add_project("o/r").unwrap();
        store
            .ingest(|batch| {
                batch.set_checkpoint(
                    "o/r",
                    CheckpointUpdate::EventMark {
                        id: 9,
                        etag: String::new(),
                    },
                );
                Ok(())
            })
            .unwrap();

        let mut fake = FakeTransport::new();
        fake.page(ISSUES_P1, vec![], None, None);
        fake.page(COMMENTS_P1, vec![], None, None);
        // Newest first; ids 10 and 9, 9 is already stored.
        fake.page(
            EVENTS_P1,
            vec![event_item(10, 2), event_item(9, 1)],
            Some("https://api.github.com/repos/o/r/issues/events?page=2"),
            Some("\"e2\""),
        );

        let summary = Synchronizer::new(&mut store, &fake)
            .sync("o/r", SyncMode::Incremental)
            .unwrap();
        // Stopped at the boundary without fetching page 2.
        assert_eq!(summary.events, 1);
        assert_eq!(store.project("o/r").unwrap().event_id, 10);
        assert!(
            !fake
                .log
                .borrow()
                .iter()
                .any(|u| u.contains("events?page=2"))
        );
    }

    #[test]
    fn test_full_sync_backfills_per_issue() {
        let mut store = Store::open_memory().unwrap();
        store.add_project("o/r").unwrap();

        let mut fake = FakeTransport::new();
        fake.page(ISSUES_P1, vec![issue_item(7, "2024-05-01T00:00:00Z")], None, None);
        fake.page(COMMENTS_P1, vec![], None, None);
        fake.page(EVENTS_P1, vec![event_item(100, 7)], None, Some("\"e1\""));
        fake.page(
            "https://api.github.com/repos/o/r/issues/7/events?page=1&per_page=100",
            vec![event_item(50, 7), event_item(100, 7)],
            None,
            None,
        );

        let summary = Synchronizer::new(&mut store, &fake)
            .sync("o/r", SyncMode::Full)
            .unwrap();
        // Whole-repo walk recorded the mark only; the backfill stored
        // both historical events.
        assert_eq!(summary.events, 2);
        assert_eq!(store.project("o/r").unwrap().event_id, 100);
    }

    #[test]
    fn test_full_sync_reads_one_event_page_for_the_mark() {
        let mut store = Store::open_memory().unwrap();
        store.add_project("o/r").unwrap();

        let mut fake = FakeTransport::new();
        fake.page(ISSUES_P1, vec![issue_item(7, "2024-05-01T00:00:00Z")], None, None);
        fake.page(COMMENTS_P1, vec![], None, None);
        // The whole-repo feed claims more pages; page 2 is not registered,
        // so walking past the first page would fail the sync.
        fake.page(
            EVENTS_P1,
            vec![event_item(100, 7)],
            Some("https://api.github.com/repos/o/r/issues/events?page=2"),
            Some("\"e1\""),
        );
        fake.page(
            "https://api.github.com/repos/o/r/issues/7/events?page=1&per_page=100",
            vec![event_item(100, 7)],
            None,
            None,
        );

        Synchronizer::new(&mut store, &fake)
            .sync("o/r", SyncMode::Full)
            .unwrap();
        let proj = store.project("o/r").unwrap();
        assert_eq!(proj.event_id, 100);
        assert_eq!(proj.event_etag, "\"e1\"");
        assert!(
            !fake
                .log
                .borrow()
                .iter()
                .any(|u| u.contains("events?page=2"))
        );
    }

    #[test]
    fn test_issue_from_url() {
        assert_eq!(
            issue_from_url("https://api.github.com/repos/o/r/issues/8786"),
            8786
        );
        assert_eq!(issue_from_url(""), 0);
    }
}
