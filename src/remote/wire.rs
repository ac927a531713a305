//! Wire shapes for the fields this toolkit reads from the remote API.
//!
//! Everything else in a payload is carried opaquely; these structs name
//! only the fields the synchronizer, projection, and edit engine depend
//! on, with `#[serde(default)]` so that absent fields never abort a sync.

use crate::model::{IssueState, Milestone, Reactions};
use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireUser {
    #[serde(default)]
    pub login: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireLabel {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireMilestoneRef {
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireRename {
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: String,
}

/// An issue as delivered by the dated issues feed or a single-issue get.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireIssue {
    #[serde(default)]
    pub number: i64,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub user: WireUser,
    #[serde(default)]
    pub assignee: Option<WireUser>,
    #[serde(default)]
    pub assignees: Vec<WireUser>,
    #[serde(default)]
    pub labels: Vec<WireLabel>,
    #[serde(default)]
    pub milestone: Option<WireMilestoneRef>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
    #[serde(default)]
    pub closed_at: Option<String>,
    #[serde(default)]
    pub locked: bool,
    /// Present iff the "issue" is actually a pull request.
    #[serde(default)]
    pub pull_request: Option<serde_json::Value>,
    #[serde(default)]
    pub reactions: Option<Reactions>,
}

/// A comment from the dated comments feed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireComment {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub issue_url: String,
    #[serde(default)]
    pub user: WireUser,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
    #[serde(default)]
    pub reactions: Option<Reactions>,
}

/// An issue event from the newest-first events feed.
///
/// The `issue` field is only present in the whole-repo feed, not when
/// downloading events for one specific issue.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireEvent {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub event: String,
    #[serde(default)]
    pub actor: Option<WireUser>,
    #[serde(default)]
    pub commit_id: Option<String>,
    #[serde(default)]
    pub label: Option<WireLabel>,
    #[serde(default)]
    pub labels: Vec<WireLabel>,
    #[serde(default)]
    pub assignee: Option<WireUser>,
    #[serde(default)]
    pub assignees: Vec<WireUser>,
    #[serde(default)]
    pub milestone: Option<WireMilestoneRef>,
    #[serde(default)]
    pub rename: Option<WireRename>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub issue: Option<WireIssueRef>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireIssueRef {
    #[serde(default)]
    pub number: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireMilestone {
    #[serde(default)]
    pub number: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub due_on: Option<String>,
    #[serde(default)]
    pub open_issues: i64,
}

impl WireEvent {
    /// The actor's login, empty when the remote omits the actor.
    #[must_use]
    pub fn actor_login(&self) -> &str {
        self.actor.as_ref().map_or("", |u| u.login.as_str())
    }

    /// Label name(s) attached to a labeled/unlabeled event.
    #[must_use]
    pub fn label_names(&self) -> String {
        if let Some(lab) = &self.label {
            return lab.name.clone();
        }
        self.labels
            .iter()
            .map(|l| l.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Assignee login(s) attached to an assigned/unassigned event.
    #[must_use]
    pub fn assignee_logins(&self) -> String {
        if self.assignees.is_empty() {
            return self.assignee.as_ref().map_or_else(String::new, |u| u.login.clone());
        }
        self.assignees
            .iter()
            .map(|u| u.login.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn parse_time(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

impl From<WireIssue> for IssueState {
    fn from(w: WireIssue) -> Self {
        let mut labels: Vec<String> = w.labels.into_iter().map(|l| l.name).collect();
        labels.sort();
        Self {
            number: w.number,
            title: w.title,
            state: w.state,
            assignee: w.assignee.map_or_else(String::new, |u| u.login),
            labels,
            milestone: w.milestone.map_or_else(String::new, |m| m.title),
            url: w.html_url,
            reporter: w.user.login,
            created_at: parse_time(&w.created_at),
            closed_at: w.closed_at.as_deref().and_then(parse_time),
            locked: w.locked,
            body: w.body.unwrap_or_default(),
            reactions: w.reactions.unwrap_or_default(),
        }
    }
}

impl From<WireMilestone> for Milestone {
    fn from(w: WireMilestone) -> Self {
        Self {
            number: w.number,
            title: w.title,
            due_on: w.due_on.unwrap_or_default(),
            open_issues: w.open_issues,
        }
    }
}
