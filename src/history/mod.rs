//! History projection: replay raw events into normalized actions.
//!
//! The raw store is the source of truth; the history table is a pure
//! function of it. Replay walks a project's raw events in insertion
//! order, so rebuilding from the same store always yields the same rows
//! with the same sequence keys.

use crate::error::Result;
use crate::model::{ActionKind, HistoryAction, ItemType, RawEvent};
use crate::remote::wire::{WireComment, WireEvent, WireIssue};
use crate::storage::Store;

/// Replay a project's raw events into history actions.
///
/// Malformed payloads are logged and skipped rather than aborting the
/// rebuild; one bad row must not hold the rest of the history hostage.
#[must_use]
pub fn project_history(project: &str, events: &[(i64, RawEvent)]) -> Vec<HistoryAction> {
    let mut actions = Vec::new();
    for (seq, ev) in events {
        match replay_one(project, *seq, ev, &mut actions) {
            Ok(()) => {}
            Err(e) => {
                tracing::warn!(identity = %ev.identity, error = %e, "skipping malformed payload");
            }
        }
    }
    actions
}

/// Rebuild a project's stored history from its raw events.
pub fn refill(store: &mut Store, project: &str) -> Result<usize> {
    let events = store.raw_events(project)?;
    let actions = project_history(project, &events);
    store.replace_history(project, &actions)?;
    Ok(actions.len())
}

fn replay_one(
    project: &str,
    seq: i64,
    ev: &RawEvent,
    out: &mut Vec<HistoryAction>,
) -> Result<()> {
    let make = |time: &str, actor: &str, action: ActionKind, text: String| HistoryAction {
        project: project.to_string(),
        issue: ev.issue,
        time: time.to_string(),
        actor: actor.to_string(),
        action,
        text,
        sequence_key: seq,
    };

    match ev.item_type {
        ItemType::Issue => {
            let issue: WireIssue = serde_json::from_slice(&ev.payload)?;
            if issue.pull_request.is_some() {
                tracing::debug!(issue = issue.number, "skipping pull request snapshot");
                return Ok(());
            }
            out.push(make(
                &issue.created_at,
                &issue.user.login,
                ActionKind::Create,
                issue.title.clone(),
            ));
            // The snapshot does not say when these happened; the event
            // feed carries the precise records. These probes only keep
            // the history usable before events have been synced.
            if let Some(assignee) = &issue.assignee {
                if !assignee.login.is_empty() {
                    out.push(make(
                        &issue.created_at,
                        &issue.user.login,
                        ActionKind::Assign,
                        assignee.login.clone(),
                    ));
                }
            }
            if let Some(milestone) = &issue.milestone {
                if !milestone.title.is_empty() {
                    out.push(make(
                        &issue.created_at,
                        &issue.user.login,
                        ActionKind::Milestone,
                        milestone.title.clone(),
                    ));
                }
            }
            if let Some(closed_at) = &issue.closed_at {
                out.push(make(closed_at, "", ActionKind::Close, String::new()));
            }
        }
        ItemType::Comment => {
            let comment: WireComment = serde_json::from_slice(&ev.payload)?;
            out.push(make(
                &comment.created_at,
                &comment.user.login,
                ActionKind::Comment,
                comment.body,
            ));
        }
        ItemType::Event => {
            let event: WireEvent = serde_json::from_slice(&ev.payload)?;
            let actor = event.actor_login().to_string();
            let (kind, text) = match event.event.as_str() {
                "labeled" => (ActionKind::Label, event.label_names()),
                "unlabeled" => (ActionKind::Unlabel, event.label_names()),
                "milestoned" => (
                    ActionKind::Milestone,
                    event.milestone.as_ref().map_or_else(String::new, |m| m.title.clone()),
                ),
                "demilestoned" => (
                    ActionKind::Demilestone,
                    event.milestone.as_ref().map_or_else(String::new, |m| m.title.clone()),
                ),
                "closed" | "merged" => (
                    ActionKind::Close,
                    event.commit_id.clone().unwrap_or_default(),
                ),
                "reopened" => (ActionKind::Reopen, String::new()),
                "renamed" => (
                    ActionKind::Rename,
                    event.rename.as_ref().map_or_else(String::new, |r| {
                        format!("{} -> {}", r.from, r.to)
                    }),
                ),
                "assigned" => (ActionKind::Assign, event.assignee_logins()),
                "unassigned" => (ActionKind::Unassign, event.assignee_logins()),
                other => {
                    tracing::debug!(kind = other, id = event.id, "dropping unmapped event");
                    return Ok(());
                }
            };
            out.push(make(&event.created_at, &actor, kind, text));
        }
    }
    Ok(())
}
