//! Remote API boundary: transport contract and issue operations.
//!
//! The synchronizer depends only on [`Transport`] (a paginated page
//! fetcher), and the edit engine only on [`IssueService`] (snapshot reads
//! plus the mutation set). Both are traits so tests can substitute
//! in-memory fakes; [`client::Client`] implements them against GitHub.

pub mod client;
pub mod wire;

pub use client::Client;

use crate::error::Result;
use crate::model::{IssueState, Milestone};
use serde_json::Value;

/// One page of a paginated feed.
#[derive(Debug, Clone, Default)]
pub struct Page {
    /// Raw JSON items, carried opaquely to the raw-event store.
    pub items: Vec<Value>,
    /// URL of the next page, if the server supplied one.
    pub next: Option<String>,
    /// Cache validator for this response.
    pub etag: Option<String>,
}

/// Result of a conditional page fetch.
#[derive(Debug, Clone)]
pub enum Fetched {
    Page(Page),
    /// The supplied etag still matches; nothing new.
    NotModified,
}

/// Rate budget as reported by the most recent response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RateInfo {
    pub limit: i64,
    pub remaining: i64,
    /// Unix timestamp at which the budget resets.
    pub reset: i64,
}

impl RateInfo {
    /// Whether the budget is known to be exhausted.
    #[must_use]
    pub const fn exhausted(&self) -> bool {
        self.limit > 0 && self.remaining == 0
    }
}

/// A combined metadata update for one issue. Empty fields are left alone.
///
/// `assignee` uses the empty string for "clear"; `milestone` is
/// `Some(None)` for "clear" and `Some(Some(id))` to set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssuePatch {
    pub title: Option<String>,
    pub state: Option<String>,
    pub assignee: Option<String>,
    pub labels: Option<Vec<String>>,
    pub milestone: Option<Option<i64>>,
    pub body: Option<String>,
}

impl IssuePatch {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.state.is_none()
            && self.assignee.is_none()
            && self.labels.is_none()
            && self.milestone.is_none()
            && self.body.is_none()
    }

    /// Request body, with empty-string assignee mapped to JSON null.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let mut obj = serde_json::Map::new();
        if let Some(title) = &self.title {
            obj.insert("title".to_string(), Value::from(title.clone()));
        }
        if let Some(state) = &self.state {
            obj.insert("state".to_string(), Value::from(state.clone()));
        }
        if let Some(assignee) = &self.assignee {
            let v = if assignee.is_empty() {
                Value::Null
            } else {
                Value::from(assignee.clone())
            };
            obj.insert("assignee".to_string(), v);
        }
        if let Some(labels) = &self.labels {
            obj.insert("labels".to_string(), Value::from(labels.clone()));
        }
        if let Some(milestone) = &self.milestone {
            let v = milestone.map_or(Value::Null, Value::from);
            obj.insert("milestone".to_string(), v);
        }
        if let Some(body) = &self.body {
            obj.insert("body".to_string(), Value::from(body.clone()));
        }
        Value::Object(obj)
    }
}

/// Paginated page fetcher. Side-effect free beyond network I/O; retries
/// transient failures internally per the backoff policy.
pub trait Transport {
    /// Fetch one page, following the conditional-request protocol: a 304
    /// against `etag` is a successful no-op, not an error.
    fn fetch_page(&self, url: &str, etag: Option<&str>) -> Result<Fetched>;
}

/// Issue snapshot reads and the mutation set used by the edit engine.
pub trait IssueService {
    fn get_issue(&self, project: &str, number: i64) -> Result<IssueState>;
    fn search_issues(&self, project: &str, query: &str) -> Result<Vec<IssueState>>;
    fn list_comments(&self, project: &str, number: i64) -> Result<Vec<wire::WireComment>>;
    fn list_issue_events(&self, project: &str, number: i64) -> Result<Vec<wire::WireEvent>>;
    fn list_milestones(&self, project: &str) -> Result<Vec<Milestone>>;
    fn create_issue(&self, project: &str, patch: &IssuePatch) -> Result<IssueState>;
    fn edit_issue(&self, project: &str, number: i64, patch: &IssuePatch) -> Result<()>;
    fn add_labels(&self, project: &str, number: i64, labels: &[String]) -> Result<()>;
    fn remove_label(&self, project: &str, number: i64, label: &str) -> Result<()>;
    fn create_comment(&self, project: &str, number: i64, body: &str) -> Result<()>;
    /// Rate budget observed on the most recent call.
    fn rate(&self) -> RateInfo;
}

/// Split "owner/repo" into its owner half.
#[must_use]
pub fn project_owner(project: &str) -> &str {
    project.split('/').next().unwrap_or(project)
}

/// Split "owner/repo" into its repo half.
#[must_use]
pub fn project_repo(project: &str) -> &str {
    project.split('/').nth(1).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_split() {
        assert_eq!(project_owner("golang/go"), "golang");
        assert_eq!(project_repo("golang/go"), "go");
    }

    #[test]
    fn test_patch_json_clear_fields() {
        let patch = IssuePatch {
            assignee: Some(String::new()),
            milestone: Some(None),
            ..IssuePatch::default()
        };
        let v = patch.to_json();
        assert_eq!(v["assignee"], Value::Null);
        assert_eq!(v["milestone"], Value::Null);
        assert!(v.get("title").is_none());
    }

    #[test]
    fn test_patch_is_empty() {
        assert!(IssuePatch::default().is_empty());
        assert!(
            !IssuePatch {
                state: Some("closed".to_string()),
                ..IssuePatch::default()
            }
            .is_empty()
        );
    }

    #[test]
    fn test_rate_exhausted() {
        assert!(
            RateInfo {
                limit: 5000,
                remaining: 0,
                reset: 0
            }
            .exhausted()
        );
        assert!(!RateInfo::default().exhausted());
    }
}
