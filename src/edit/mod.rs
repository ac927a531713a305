//! Text-form edit engine: render an issue as an editable buffer, then
//! diff the edited buffer back into a set of intended changes.
//!
//! The buffer is a header block (`Title:`, `State:`, ...) followed by a
//! comment area and a read-only transcript. Only header lines that
//! actually changed, and a non-placeholder comment, become part of the
//! resulting [`EditIntent`]; everything below the sentinel is ignored.

pub mod apply;
pub mod editor;
pub mod session;

use crate::error::{GhistError, Result};
use crate::model::IssueState;
use crate::remote::wire::{WireComment, WireEvent};
use chrono::DateTime;
use std::collections::BTreeSet;
use std::fmt::Write as _;

/// Marks the start of the read-only transcript in a single-issue buffer.
pub const REPORT_SENTINEL: &str = "\nReported by ";
/// Marks the start of the issue list in a bulk buffer.
pub const BULK_SENTINEL: &str = "\nBulk editing these issues:";
/// Placeholder shown in the comment area; removed on parse.
pub const COMMENT_PLACEHOLDER: &str = "<optional comment here>";
/// Placeholder body for a new issue; removed on parse.
pub const BODY_PLACEHOLDER: &str = "<describe issue here>";

const WRAP_WIDTH: usize = 70;

/// How a buffer's label edits are interpreted.
///
/// A single-issue diff replaces the label set wholesale. A bulk diff is
/// applied to many issues with different label sets, so it becomes
/// separate add and remove lists relative to the rendered common set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditMode {
    Single,
    Bulk,
    Create,
}

/// The changes extracted from an edited buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditIntent {
    pub title: Option<String>,
    pub state: Option<String>,
    /// Empty string means clear.
    pub assignee: Option<String>,
    /// Full replacement set (single/create mode only).
    pub labels: Option<Vec<String>>,
    /// Labels to add (bulk mode only).
    pub label_adds: Vec<String>,
    /// Labels to remove (bulk mode only).
    pub label_removes: Vec<String>,
    /// Milestone by title; empty string means clear.
    pub milestone: Option<String>,
    /// New comment text, or the body in create mode.
    pub comment: Option<String>,
}

impl EditIntent {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.state.is_none()
            && self.assignee.is_none()
            && self.labels.is_none()
            && self.label_adds.is_empty()
            && self.label_removes.is_empty()
            && self.milestone.is_none()
            && self.comment.is_none()
    }
}

/// Render one issue as an editable buffer with its full transcript.
#[must_use]
pub fn render_issue(issue: &IssueState, comments: &[WireComment], events: &[WireEvent]) -> String {
    let mut buf = String::new();
    write_headers(&mut buf, issue, true);
    buf.push('\n');
    buf.push_str(COMMENT_PLACEHOLDER);
    buf.push('\n');

    let _ = write!(
        buf,
        "\nReported by {} ({})\n",
        issue.reporter,
        display_time(issue.created_at.map(|t| t.to_rfc3339()).as_deref().unwrap_or(""))
    );
    if !issue.body.is_empty() {
        buf.push('\n');
        buf.push_str(&wrap(&issue.body, "\t"));
        buf.push('\n');
    }

    // Blocks carry a machine-sortable first line so that comments and
    // events interleave chronologically, with rendered text as the
    // tie-break; the first line is stripped before printing.
    let mut blocks = Vec::new();
    for c in comments {
        let mut b = format!("{}\n", c.created_at);
        let _ = write!(b, "\nComment by {} ({})\n", c.user.login, display_time(&c.created_at));
        if !c.body.is_empty() {
            b.push('\n');
            b.push_str(&wrap(&c.body, "\t"));
            b.push('\n');
        }
        blocks.push(b);
    }
    for e in events {
        if let Some(line) = event_line(e) {
            blocks.push(format!("{}\n\n{line}\n", e.created_at));
        }
    }
    blocks.sort();
    for block in blocks {
        if let Some((_, rest)) = block.split_once('\n') {
            buf.push_str(rest);
        }
    }
    buf
}

/// Render a template buffer for creating a new issue.
#[must_use]
pub fn create_template() -> String {
    let issue = IssueState::template();
    let mut buf = String::new();
    write_headers(&mut buf, &issue, false);
    buf.push('\n');
    buf.push_str(BODY_PLACEHOLDER);
    buf.push('\n');
    buf
}

/// The fields every issue in a bulk selection agrees on, as a pseudo
/// issue (number -1). Labels are the intersection. Rendering and the
/// later diff both work against this, so an untouched buffer is an
/// empty diff by construction.
#[must_use]
pub fn bulk_common(issues: &[IssueState]) -> IssueState {
    let common = |get: fn(&IssueState) -> &str| -> String {
        let mut iter = issues.iter().map(get);
        match iter.next() {
            Some(first) if iter.clone().all(|v| v == first) => first.to_string(),
            _ => String::new(),
        }
    };
    let mut labels: BTreeSet<String> = issues
        .first()
        .map(|i| i.labels.iter().cloned().collect())
        .unwrap_or_default();
    for issue in issues.iter().skip(1) {
        let set: BTreeSet<String> = issue.labels.iter().cloned().collect();
        labels = labels.intersection(&set).cloned().collect();
    }
    IssueState {
        number: -1,
        state: common(|i| &i.state),
        assignee: common(|i| &i.assignee),
        labels: labels.into_iter().collect(),
        milestone: common(|i| &i.milestone),
        ..IssueState::default()
    }
}

/// Render the shared header block for a bulk edit of `issues`.
///
/// A header shows a value only when every issue agrees on it. The issue
/// list after the sentinel is what the apply step reads back, so the
/// titles are informational only.
#[must_use]
pub fn bulk_template(issues: &[IssueState]) -> String {
    let common = bulk_common(issues);
    let mut buf = String::new();
    let _ = writeln!(buf, "State: {}", common.state);
    let _ = writeln!(buf, "Assignee: {}", common.assignee);
    let _ = writeln!(buf, "Labels: {}", common.labels.join(" "));
    let _ = writeln!(buf, "Milestone: {}", common.milestone);
    buf.push('\n');
    buf.push_str(COMMENT_PLACEHOLDER);
    buf.push('\n');
    let _ = write!(buf, "{BULK_SENTINEL}\n\n");
    for issue in issues {
        let _ = writeln!(buf, "{}\t{}", issue.number, issue.title);
    }
    buf
}

/// The issue numbers listed after the bulk sentinel.
pub fn read_bulk_ids(text: &str) -> Result<Vec<i64>> {
    let idx = text.find(BULK_SENTINEL).ok_or(GhistError::NoBulkList)?;
    let mut ids = Vec::new();
    for line in text[idx + BULK_SENTINEL.len()..].lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let head = line
            .split(['\t', ' '])
            .next()
            .unwrap_or("");
        if let Ok(id) = head.parse() {
            ids.push(id);
        }
    }
    if ids.is_empty() {
        return Err(GhistError::NoBulkList);
    }
    Ok(ids)
}

/// Diff an edited buffer against the state it was rendered from.
///
/// Header parsing stops at the first blank line; `#` lines are skipped;
/// an unrecognized header aborts with the offending line. The comment is
/// everything between the headers and the sentinel, minus placeholders.
pub fn parse_edit(original: &IssueState, edited: &str, mode: EditMode) -> Result<EditIntent> {
    let mut intent = EditIntent::default();
    let mut off = 0;

    for line in edited.split_inclusive('\n') {
        off += line.len();
        let line = line.trim();
        if line.is_empty() {
            break;
        }
        if line.starts_with('#') {
            continue;
        }
        let Some((header, value)) = line.split_once(':') else {
            return Err(GhistError::UnknownHeader {
                line: line.to_string(),
            });
        };
        let value = value.trim();
        match header {
            "Title" => intent.title = changed(value, &original.title),
            "State" => intent.state = changed(value, &original.state),
            "Assignee" => intent.assignee = changed(value, &original.assignee),
            "Milestone" => intent.milestone = changed(value, &original.milestone),
            "Labels" => diff_labels(value, &original.labels, mode, &mut intent),
            // Informational lines round-trip unchanged and are never edits.
            "Closed" | "URL" | "Reactions" => {}
            _ => {
                return Err(GhistError::UnknownHeader {
                    line: line.to_string(),
                });
            }
        }
    }

    // In single and bulk mode the comment ends at the sentinel. A buffer
    // whose sentinel was deleted yields no comment at all; the tail is
    // transcript text, not something to post. Only a creation buffer
    // treats the whole tail as the body.
    let end = match mode {
        EditMode::Create => edited.len(),
        EditMode::Single => match edited.find(REPORT_SENTINEL) {
            Some(idx) if idx >= off => idx,
            _ => off,
        },
        EditMode::Bulk => match edited.find(BULK_SENTINEL) {
            Some(idx) if idx >= off => idx,
            _ => off,
        },
    };
    let comment = edited[off.min(end)..end].trim();
    if !comment.is_empty() && comment != COMMENT_PLACEHOLDER && comment != BODY_PLACEHOLDER {
        intent.comment = Some(comment.to_string());
    }
    Ok(intent)
}

fn changed(new: &str, old: &str) -> Option<String> {
    (new != old.trim()).then(|| new.to_string())
}

fn diff_labels(value: &str, old: &[String], mode: EditMode, intent: &mut EditIntent) {
    let new: BTreeSet<String> = value.split_whitespace().map(ToString::to_string).collect();
    let old: BTreeSet<String> = old.iter().cloned().collect();
    if new == old {
        return;
    }
    match mode {
        EditMode::Single | EditMode::Create => {
            intent.labels = Some(new.into_iter().collect());
        }
        EditMode::Bulk => {
            intent.label_adds = new.difference(&old).cloned().collect();
            intent.label_removes = old.difference(&new).cloned().collect();
        }
    }
}

fn write_headers(buf: &mut String, issue: &IssueState, full: bool) {
    let _ = writeln!(buf, "Title: {}", issue.title);
    let _ = writeln!(buf, "State: {}", issue.state);
    let _ = writeln!(buf, "Assignee: {}", issue.assignee);
    if let Some(closed) = issue.closed_at {
        let _ = writeln!(buf, "Closed: {}", display_time(&closed.to_rfc3339()));
    }
    let _ = writeln!(buf, "Labels: {}", issue.labels.join(" "));
    let _ = writeln!(buf, "Milestone: {}", issue.milestone);
    if full {
        let _ = writeln!(buf, "URL: {}", issue.url);
        if !issue.reactions.is_empty() {
            let _ = writeln!(buf, "Reactions: {}", issue.reactions);
        }
    }
}

/// One-line rendering of a timeline event, `None` for kinds not shown.
fn event_line(e: &WireEvent) -> Option<String> {
    let who = e.actor_login();
    let when = display_time(&e.created_at);
    let line = match e.event.as_str() {
        "closed" => format!("Closed by {who} ({when})"),
        "merged" => format!("Merged by {who} ({when})"),
        "reopened" => format!("Reopened by {who} ({when})"),
        "labeled" => format!("Labeled {} by {who} ({when})", e.label_names()),
        "unlabeled" => format!("Unlabeled {} by {who} ({when})", e.label_names()),
        "milestoned" => format!(
            "Milestoned {} by {who} ({when})",
            e.milestone.as_ref().map_or("", |m| m.title.as_str())
        ),
        "demilestoned" => format!("Removed from milestone by {who} ({when})"),
        "assigned" => format!("Assigned to {} by {who} ({when})", e.assignee_logins()),
        "unassigned" => format!("Unassigned {} by {who} ({when})", e.assignee_logins()),
        "renamed" => {
            let r = e.rename.as_ref()?;
            format!("Renamed from {:?} to {:?} by {who} ({when})", r.from, r.to)
        }
        _ => return None,
    };
    Some(line)
}

/// RFC3339 timestamp rendered for humans, or the raw text if unparsable.
fn display_time(raw: &str) -> String {
    DateTime::parse_from_rfc3339(raw).map_or_else(
        |_| raw.to_string(),
        |t| t.format("%Y-%m-%d %H:%M:%S").to_string(),
    )
}

/// Wrap text to a fixed width, prefixing every output line.
#[must_use]
pub fn wrap(text: &str, prefix: &str) -> String {
    let mut out = String::new();
    for (i, line) in text.replace("\r\n", "\n").trim_end().split('\n').enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let mut col = 0;
        out.push_str(prefix);
        for word in line.split(' ') {
            if col > 0 && col + 1 + word.len() > WRAP_WIDTH {
                out.push('\n');
                out.push_str(prefix);
                col = 0;
            }
            if col > 0 {
                out.push(' ');
                col += 1;
            }
            out.push_str(word);
            col += word.len();
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn issue() -> IssueState {
        IssueState {
            number: 8786,
            title: "time: Duration should implement fmt.Formatter".to_string(),
            state: "open".to_string(),
            assignee: "robpike".to_string(),
            labels: vec!["release-none".to_string(), "size-m".to_string()],
            milestone: "Unplanned".to_string(),
            url: "https://github.com/golang/go/issues/8786".to_string(),
            reporter: "dsymonds".to_string(),
            created_at: Some(Utc.with_ymd_and_hms(2014, 9, 21, 23, 2, 50).unwrap()),
            body: "It'd be nice if Duration implemented fmt.Formatter.".to_string(),
            ..IssueState::default()
        }
    }

    #[test]
    fn test_render_then_parse_is_empty_diff() {
        let issue = issue();
        let text = render_issue(&issue, &[], &[]);
        let intent = parse_edit(&issue, &text, EditMode::Single).unwrap();
        assert!(intent.is_empty(), "unexpected diff: {intent:?}");
    }

    #[test]
    fn test_render_header_order() {
        let text = render_issue(&issue(), &[], &[]);
        let headers: Vec<&str> = text
            .lines()
            .take_while(|l| !l.is_empty())
            .map(|l| l.split(':').next().unwrap())
            .collect();
        assert_eq!(
            headers,
            vec!["Title", "State", "Assignee", "Labels", "Milestone", "URL"]
        );
        assert!(text.contains("\nReported by dsymonds (2014-09-21 23:02:50)\n"));
        assert!(text.contains(COMMENT_PLACEHOLDER));
    }

    #[test]
    fn test_closed_header_only_when_closed() {
        let mut closed = issue();
        closed.state = "closed".to_string();
        closed.closed_at = Some(Utc.with_ymd_and_hms(2015, 1, 8, 5, 20, 0).unwrap());
        let text = render_issue(&closed, &[], &[]);
        assert!(text.contains("Closed: 2015-01-08 05:20:00\n"));
        assert!(!render_issue(&issue(), &[], &[]).contains("Closed:"));
    }

    #[test]
    fn test_parse_detects_changes() {
        let original = issue();
        let text = render_issue(&original, &[], &[]);
        let edited = text
            .replace("State: open", "State: closed")
            .replace("Assignee: robpike", "Assignee: ")
            .replace(COMMENT_PLACEHOLDER, "Fixed at tip.");
        let intent = parse_edit(&original, &edited, EditMode::Single).unwrap();
        assert_eq!(intent.state.as_deref(), Some("closed"));
        assert_eq!(intent.assignee.as_deref(), Some(""));
        assert_eq!(intent.comment.as_deref(), Some("Fixed at tip."));
        assert!(intent.title.is_none());
        assert!(intent.labels.is_none());
    }

    #[test]
    fn test_label_diff_single_vs_bulk() {
        let mut original = issue();
        original.labels = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let text = render_issue(&original, &[], &[])
            .replace("Labels: a b c", "Labels: a c d");

        let single = parse_edit(&original, &text, EditMode::Single).unwrap();
        assert_eq!(
            single.labels,
            Some(vec!["a".to_string(), "c".to_string(), "d".to_string()])
        );
        assert!(single.label_adds.is_empty());

        let bulk = parse_edit(&original, &text, EditMode::Bulk).unwrap();
        assert!(bulk.labels.is_none());
        assert_eq!(bulk.label_adds, vec!["d".to_string()]);
        assert_eq!(bulk.label_removes, vec!["b".to_string()]);
    }

    #[test]
    fn test_unknown_header_rejected() {
        let err = parse_edit(&issue(), "Titel: oops\n\n", EditMode::Single).unwrap_err();
        assert!(matches!(err, GhistError::UnknownHeader { .. }));
    }

    #[test]
    fn test_hash_lines_ignored() {
        let original = issue();
        let mut text = String::from("# edit below\n");
        text.push_str(&render_issue(&original, &[], &[]));
        let intent = parse_edit(&original, &text, EditMode::Single).unwrap();
        assert!(intent.is_empty());
    }

    #[test]
    fn test_transcript_never_parsed_as_comment() {
        let original = issue();
        let comment = WireComment {
            user: crate::remote::wire::WireUser {
                login: "rsc".to_string(),
            },
            body: "Title: this looks like a header".to_string(),
            created_at: "2015-01-07T21:20:00Z".to_string(),
            ..WireComment::default()
        };
        let text = render_issue(&original, &[comment], &[]);
        let intent = parse_edit(&original, &text, EditMode::Single).unwrap();
        assert!(intent.is_empty());
    }

    #[test]
    fn test_deleted_sentinel_posts_no_comment() {
        let original = issue();
        let comment = WireComment {
            user: crate::remote::wire::WireUser {
                login: "rsc".to_string(),
            },
            body: "private discussion transcript".to_string(),
            created_at: "2015-01-07T21:20:00Z".to_string(),
            ..WireComment::default()
        };
        let text = render_issue(&original, &[comment], &[]);
        // Delete the sentinel line; the transcript below it must not
        // become a comment to post.
        let sentinel_line = format!(
            "Reported by {} ({})",
            original.reporter,
            display_time(&original.created_at.unwrap().to_rfc3339())
        );
        let edited: String = text
            .lines()
            .filter(|l| *l != sentinel_line)
            .map(|l| format!("{l}\n"))
            .collect();
        let intent = parse_edit(&original, &edited, EditMode::Single).unwrap();
        assert!(intent.comment.is_none(), "got comment: {:?}", intent.comment);

        // Same for a bulk buffer with its sentinel removed.
        let bulk = "State: open\n\nstray text\n";
        let intent = parse_edit(&bulk_common(&[original]), bulk, EditMode::Bulk).unwrap();
        assert!(intent.comment.is_none());
    }

    #[test]
    fn test_blocks_sorted_by_time() {
        let mk = |t: &str, body: &str| WireComment {
            user: crate::remote::wire::WireUser {
                login: "u".to_string(),
            },
            body: body.to_string(),
            created_at: t.to_string(),
            ..WireComment::default()
        };
        let text = render_issue(
            &issue(),
            &[
                mk("2020-06-01T00:00:00Z", "second"),
                mk("2020-01-01T00:00:00Z", "first"),
            ],
            &[],
        );
        let a = text.find("first").unwrap();
        let b = text.find("second").unwrap();
        assert!(a < b);
        // The sortable timestamp prefix is stripped from output.
        assert!(!text.contains("2020-06-01T00:00:00Z\n"));
    }

    #[test]
    fn test_bulk_template_common_fields() {
        let mut a = issue();
        a.number = 1;
        a.labels = vec!["bug".to_string(), "help".to_string()];
        let mut b = issue();
        b.number = 2;
        b.assignee = "someone".to_string();
        b.labels = vec!["bug".to_string()];

        let text = bulk_template(&[a, b]);
        assert!(text.contains("State: open\n"));
        assert!(text.contains("Assignee: \n"));
        assert!(text.contains("Labels: bug\n"));
        assert!(text.contains("Milestone: Unplanned\n"));
        assert!(!text.contains("Title:"));
        assert_eq!(read_bulk_ids(&text).unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_read_bulk_ids_requires_list() {
        assert!(matches!(
            read_bulk_ids("State: open\n"),
            Err(GhistError::NoBulkList)
        ));
    }

    #[test]
    fn test_create_template_round_trip() {
        let template = IssueState::template();
        let text = create_template();
        let intent = parse_edit(&template, &text, EditMode::Create).unwrap();
        assert!(intent.is_empty());

        let filled = text
            .replace("Title: ", "Title: new thing")
            .replace(BODY_PLACEHOLDER, "It is broken.");
        let intent = parse_edit(&template, &filled, EditMode::Create).unwrap();
        assert_eq!(intent.title.as_deref(), Some("new thing"));
        assert_eq!(intent.comment.as_deref(), Some("It is broken."));
    }

    #[test]
    fn test_wrap_width_and_prefix() {
        let text = "word ".repeat(30);
        let wrapped = wrap(&text, "\t");
        for line in wrapped.lines() {
            assert!(line.starts_with('\t'));
            assert!(line.len() <= WRAP_WIDTH + 1, "line too long: {line:?}");
        }
        assert_eq!(wrap("short", "\t"), "\tshort");
    }
}
