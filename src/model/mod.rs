//! Core data model: raw events, history actions, and issue snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of remote item an ingested payload represents.
///
/// A single sync pass pulls three feeds; the type tag is part of the
/// raw-event identity so that an issue and one of its events can never
/// collide even if the remote hands back the same URL for both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    Issue,
    Comment,
    Event,
}

impl ItemType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Issue => "issue",
            Self::Comment => "comment",
            Self::Event => "event",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "issue" => Some(Self::Issue),
            "comment" => Some(Self::Comment),
            "event" => Some(Self::Event),
            _ => None,
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One immutable ingested copy of a remote item, exactly as received.
///
/// Rows are append-only: re-ingesting the same identity for the same
/// (project, type) pair is a no-op, and nothing ever mutates or deletes
/// a stored payload. The derived history is rebuilt from these rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    /// Natural key: the item's canonical API URL.
    pub identity: String,
    /// Owning project, "owner/repo".
    pub project: String,
    /// Owning issue number.
    pub issue: i64,
    pub item_type: ItemType,
    /// Opaque JSON payload as received from the remote.
    pub payload: Vec<u8>,
    /// The item's own creation timestamp (RFC3339), empty if unknown.
    pub observed_at: String,
}

/// One normalized, replay-derived record of an observable action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Create,
    Comment,
    Label,
    Unlabel,
    Milestone,
    Demilestone,
    Close,
    Reopen,
    Rename,
    Assign,
    Unassign,
}

impl ActionKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Comment => "comment",
            Self::Label => "label",
            Self::Unlabel => "unlabel",
            Self::Milestone => "milestone",
            Self::Demilestone => "demilestone",
            Self::Close => "close",
            Self::Reopen => "reopen",
            Self::Rename => "rename",
            Self::Assign => "assign",
            Self::Unassign => "unassign",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "create" => Some(Self::Create),
            "comment" => Some(Self::Comment),
            "label" => Some(Self::Label),
            "unlabel" => Some(Self::Unlabel),
            "milestone" => Some(Self::Milestone),
            "demilestone" => Some(Self::Demilestone),
            "close" => Some(Self::Close),
            "reopen" => Some(Self::Reopen),
            "rename" => Some(Self::Rename),
            "assign" => Some(Self::Assign),
            "unassign" => Some(Self::Unassign),
            _ => None,
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of derived history, produced only by replaying raw events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryAction {
    pub project: String,
    pub issue: i64,
    /// RFC3339 timestamp of the action itself.
    pub time: String,
    pub actor: String,
    pub action: ActionKind,
    /// Type-specific payload: comment body, label name, milestone title,
    /// commit id, "from → to" pair, or actor list.
    pub text: String,
    /// Raw-event insertion id this action was derived from. Stable because
    /// the raw store is append-only, so replay output is reproducible.
    pub sequence_key: i64,
}

/// Reaction tallies on an issue or comment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reactions {
    #[serde(rename = "+1", default)]
    pub plus_one: i64,
    #[serde(rename = "-1", default)]
    pub minus_one: i64,
    #[serde(default)]
    pub laugh: i64,
    #[serde(default)]
    pub confused: i64,
    #[serde(default)]
    pub heart: i64,
    #[serde(default)]
    pub hooray: i64,
    #[serde(default)]
    pub rocket: i64,
    #[serde(default)]
    pub eyes: i64,
}

impl Reactions {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.plus_one == 0
            && self.minus_one == 0
            && self.laugh == 0
            && self.confused == 0
            && self.heart == 0
            && self.hooray == 0
            && self.rocket == 0
            && self.eyes == 0
    }
}

impl fmt::Display for Reactions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        let mut add = |sym: &str, n: i64| -> fmt::Result {
            if n != 0 {
                if !first {
                    write!(f, " ")?;
                }
                first = false;
                write!(f, "{sym} {n}")?;
            }
            Ok(())
        };
        add("👍", self.plus_one)?;
        add("👎", self.minus_one)?;
        add("😆", self.laugh)?;
        add("😕", self.confused)?;
        add("♥", self.heart)?;
        add("🎉", self.hooray)?;
        add("🚀", self.rocket)?;
        add("👀", self.eyes)
    }
}

/// A live snapshot of one remote issue, fetched at edit-session start and
/// discarded once the diff has been applied. Never persisted.
///
/// Absent assignee/milestone are represented as the empty string: the
/// textual form renders blank either way, and applying an empty value
/// means "clear the field".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IssueState {
    pub number: i64,
    pub title: String,
    pub state: String,
    pub assignee: String,
    /// Sorted label names.
    pub labels: Vec<String>,
    pub milestone: String,
    pub url: String,
    pub reporter: String,
    pub created_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub locked: bool,
    pub body: String,
    pub reactions: Reactions,
}

impl IssueState {
    /// Template state for an issue-creation editor session.
    #[must_use]
    pub fn template() -> Self {
        Self {
            state: "open".to_string(),
            ..Self::default()
        }
    }
}

/// An open milestone, as needed to resolve `Milestone:` header edits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Milestone {
    pub number: i64,
    pub title: String,
    /// Due date, RFC3339 or empty.
    pub due_on: String,
    pub open_issues: i64,
}
