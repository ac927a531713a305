//! Store-to-report pipeline against a real database file: ingest wire
//! payloads, rebuild history, and aggregate, across a close and reopen
//! of the database.

use ghist::history;
use ghist::model::{ActionKind, ItemType, RawEvent};
use ghist::report;
use ghist::storage::{CheckpointUpdate, Store};
use serde_json::json;
use tempfile::TempDir;

fn raw(identity: &str, issue: i64, item_type: ItemType, payload: serde_json::Value) -> RawEvent {
    RawEvent {
        identity: identity.to_string(),
        project: "golang/go".to_string(),
        issue,
        item_type,
        payload: serde_json::to_vec(&payload).unwrap(),
        observed_at: "2024-01-01T00:00:00Z".to_string(),
    }
}

#[test]
fn test_ingest_refill_report_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("gh.db");

    {
        let mut store = Store::init(&path).unwrap();
        store.add_project("golang/go").unwrap();
        store
            .ingest(|batch| {
                batch.record(raw(
                    "https://api.github.com/repos/golang/go/issues/1",
                    1,
                    ItemType::Issue,
                    json!({
                        "number": 1,
                        "title": "spec: generics",
                        "state": "open",
                        "user": {"login": "gopher"},
                        "created_at": "2024-01-01T00:00:00Z"
                    }),
                ));
                batch.record(raw(
                    "https://api.github.com/repos/golang/go/issues/comments/7",
                    1,
                    ItemType::Comment,
                    json!({
                        "body": "+1",
                        "user": {"login": "rsc"},
                        "created_at": "2024-01-08T00:00:00Z"
                    }),
                ));
                batch.record(raw(
                    "https://api.github.com/repos/golang/go/issues/events/9",
                    1,
                    ItemType::Event,
                    json!({
                        "id": 9,
                        "event": "labeled",
                        "label": {"name": "proposal"},
                        "actor": {"login": "rsc"},
                        "created_at": "2024-01-08T01:00:00Z"
                    }),
                ));
                batch.set_checkpoint(
                    "golang/go",
                    CheckpointUpdate::IssueSince("2024-01-08T01:00:00Z".to_string()),
                );
                Ok(())
            })
            .unwrap();
        history::refill(&mut store, "golang/go").unwrap();
    }

    // Everything above must be durable across a reopen.
    let mut store = Store::open(&path).unwrap();
    let proj = store.project("golang/go").unwrap();
    assert_eq!(proj.issue_since, "2024-01-08T01:00:00Z");

    let actions = store.issue_history("golang/go", 1).unwrap();
    let kinds: Vec<ActionKind> = actions.iter().map(|a| a.action).collect();
    assert_eq!(
        kinds,
        vec![ActionKind::Create, ActionKind::Comment, ActionKind::Label]
    );

    // Refilling from the reopened store reproduces identical rows.
    history::refill(&mut store, "golang/go").unwrap();
    assert_eq!(store.issue_history("golang/go", 1).unwrap(), actions);

    let report = report::activity(&store, "golang/go").unwrap();
    assert_eq!(report.total_actions, 3);
    assert_eq!(report.weeks.len(), 2);
    assert_eq!(report.actors[0].0, "rsc");
    assert_eq!(report.open_issues, 1);
}
