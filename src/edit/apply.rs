//! Applying an [`EditIntent`] against the remote, one step at a time.
//!
//! The steps are independent: a failed comment does not block a label
//! change. Failures accumulate into one report that also names what did
//! succeed, so the user knows exactly what state the issue is in.

use crate::edit::{EditIntent, read_bulk_ids};
use crate::error::{GhistError, Result};
use crate::model::IssueState;
use crate::remote::{IssuePatch, IssueService};
use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Extra sleep past the declared reset when pausing a bulk run.
const BULK_RATE_MARGIN: Duration = Duration::from_secs(120);

/// What one apply pass managed to do.
#[derive(Debug, Default)]
pub struct ApplyOutcome {
    did: Vec<&'static str>,
    errors: Vec<String>,
}

impl ApplyOutcome {
    fn ok(&mut self, what: &'static str) {
        self.did.push(what);
    }

    fn fail(&mut self, what: &str, err: &GhistError) {
        self.errors.push(format!("{what}: {err}"));
    }

    /// Collapse into a result, wording the report by how far we got.
    fn into_result(self) -> Result<()> {
        if self.errors.is_empty() {
            return Ok(());
        }
        let mut report = self.errors.join("\n");
        if !self.did.is_empty() {
            report.push_str(&format!("\n({} successfully.)", oxford_join(&self.did)));
        }
        Err(GhistError::EditFailed { report })
    }
}

/// "a", "a and b", or "a, b, and c".
fn oxford_join(items: &[&str]) -> String {
    match items {
        [] => String::new(),
        [only] => (*only).to_string(),
        [a, b] => format!("{a} and {b}"),
        [rest @ .., last] => format!("{}, and {last}", rest.join(", ")),
    }
}

/// Apply one intent to one existing issue.
///
/// Order: comment, combined metadata edit, label additions, then one
/// removal call per removed label.
pub fn apply_edit<S: IssueService + ?Sized>(
    svc: &S,
    project: &str,
    number: i64,
    intent: &EditIntent,
) -> Result<()> {
    let mut outcome = ApplyOutcome::default();

    if let Some(comment) = &intent.comment {
        match svc.create_comment(project, number, comment) {
            Ok(()) => outcome.ok("saved comment"),
            Err(e) => outcome.fail("error saving comment", &e),
        }
    }

    let patch = metadata_patch(svc, project, intent);
    if !patch.is_empty() {
        match svc.edit_issue(project, number, &patch) {
            Ok(()) => outcome.ok("updated issue"),
            Err(e) => outcome.fail("error changing issue", &e),
        }
    }

    if !intent.label_adds.is_empty() {
        match svc.add_labels(project, number, &intent.label_adds) {
            Ok(()) => outcome.ok("added labels"),
            Err(e) => outcome.fail("error adding labels", &e),
        }
    }
    let mut removed_any = false;
    for label in &intent.label_removes {
        match svc.remove_label(project, number, label) {
            Ok(()) => removed_any = true,
            Err(e) => outcome.fail(&format!("error removing label {label}"), &e),
        }
    }
    if removed_any {
        outcome.ok("removed labels");
    }

    outcome.into_result()
}

/// Create a new issue from a creation-mode intent.
pub fn apply_create<S: IssueService + ?Sized>(
    svc: &S,
    project: &str,
    intent: &EditIntent,
) -> Result<IssueState> {
    let mut patch = metadata_patch(svc, project, intent);
    patch.body = intent.comment.clone();
    if patch.title.as_deref().unwrap_or("").is_empty() {
        return Err(GhistError::EditFailed {
            report: "new issue needs a title".to_string(),
        });
    }
    svc.create_issue(project, &patch)
}

/// Build the combined metadata patch, resolving the milestone title
/// against the project's open milestones. An unresolvable title, or a
/// failure to load the milestone list at all, is a warning and no
/// change, never a hard failure: the remaining edits still apply.
fn metadata_patch<S: IssueService + ?Sized>(
    svc: &S,
    project: &str,
    intent: &EditIntent,
) -> IssuePatch {
    let milestone = match intent.milestone.as_deref() {
        None => None,
        Some("") => Some(None),
        Some(title) => match svc.list_milestones(project) {
            Ok(list) => match list.into_iter().find(|m| m.title == title) {
                Some(m) => Some(Some(m.number)),
                None => {
                    tracing::warn!(project, milestone = title, "unknown milestone, ignoring");
                    None
                }
            },
            Err(e) => {
                tracing::warn!(
                    project,
                    milestone = title,
                    error = %e,
                    "cannot load milestones, ignoring milestone change"
                );
                None
            }
        },
    };
    IssuePatch {
        title: intent.title.clone(),
        state: intent.state.clone(),
        assignee: intent.assignee.clone(),
        labels: intent.labels.clone(),
        milestone,
        body: None,
    }
}

/// Apply one parsed bulk intent to every issue listed in the buffer.
///
/// The intent must already have been parsed (the dry run); this only
/// walks the list. Each issue is attempted independently: a failure is
/// recorded and the walk continues, so one locked issue cannot block the
/// rest of the batch. When the rate budget runs out mid-batch, sleeps
/// until past the reset and resumes.
pub fn bulk_apply<S: IssueService + ?Sized>(
    svc: &S,
    project: &str,
    intent: &EditIntent,
    edited: &str,
    sleep: &dyn Fn(Duration),
) -> Result<usize> {
    if intent.is_empty() {
        return Ok(0);
    }
    let ids = read_bulk_ids(edited)?;
    let bar = ProgressBar::new(ids.len() as u64);
    if let Ok(style) = ProgressStyle::with_template("{pos}/{len} {bar:30} {msg}") {
        bar.set_style(style);
    }

    let mut updated = 0;
    let mut errors = Vec::new();
    for (i, id) in ids.iter().enumerate() {
        let rate = svc.rate();
        if rate.exhausted() {
            let wait = Duration::from_secs(u64::try_from((rate.reset - Utc::now().timestamp()).max(0)).unwrap_or(0))
                + BULK_RATE_MARGIN;
            tracing::warn!(secs = wait.as_secs(), "rate budget exhausted, pausing bulk edit");
            sleep(wait);
        }
        match apply_edit(svc, project, *id, intent) {
            Ok(()) => updated += 1,
            Err(e) => {
                tracing::error!(issue = *id, error = %e, "bulk edit failed for issue");
                errors.push(format!("issue {id}: {e}"));
            }
        }
        bar.inc(1);
        if (i + 1) % 10 == 0 {
            tracing::info!(done = i + 1, total = ids.len(), "bulk edit progress");
        }
    }
    bar.finish_and_clear();
    if errors.is_empty() {
        return Ok(updated);
    }
    Err(GhistError::EditFailed {
        report: format!(
            "updated {updated} of {} issues with errors:\n{}",
            ids.len(),
            errors.join("\n")
        ),
    })
}
