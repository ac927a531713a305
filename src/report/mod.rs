//! Activity report: time-bucketed aggregates over the derived history.

use crate::error::Result;
use crate::model::{ActionKind, HistoryAction};
use crate::storage::Store;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write as _;

const BAR_WIDTH: usize = 50;
const TOP_ACTORS: usize = 15;

/// Aggregated activity for one project.
#[derive(Debug, Clone, Serialize)]
pub struct ActivityReport {
    pub project: String,
    /// (week bucket `%Y-%W`, action count), oldest first.
    pub weeks: Vec<(String, i64)>,
    /// (actor, action count), busiest first.
    pub actors: Vec<(String, i64)>,
    pub total_actions: i64,
    /// Issues currently open, as derived from replayed history.
    pub open_issues: i64,
    /// (milestone title, open-issue count), by title.
    pub milestones: Vec<(String, i64)>,
}

/// Build the report from stored history.
pub fn activity(store: &Store, project: &str) -> Result<ActivityReport> {
    let weeks = store.weekly_action_counts(project)?;
    let actors = store.top_actors(project, TOP_ACTORS)?;
    let total_actions = weeks.iter().map(|(_, n)| n).sum();
    let (open_issues, milestones) = open_tallies(&store.project_history(project)?);
    Ok(ActivityReport {
        project: project.to_string(),
        weeks,
        actors,
        total_actions,
        open_issues,
        milestones,
    })
}

/// Current open-issue count and per-milestone open counts, derived by
/// folding each issue's create/close/reopen and milestone actions in
/// history order.
fn open_tallies(history: &[HistoryAction]) -> (i64, Vec<(String, i64)>) {
    #[derive(Default)]
    struct IssueFold {
        created: bool,
        open: bool,
        milestone: String,
    }
    let mut issues: BTreeMap<i64, IssueFold> = BTreeMap::new();
    for a in history {
        let fold = issues.entry(a.issue).or_default();
        match a.action {
            ActionKind::Create => {
                fold.created = true;
                fold.open = true;
            }
            ActionKind::Close => fold.open = false,
            ActionKind::Reopen => fold.open = true,
            ActionKind::Milestone => fold.milestone = a.text.clone(),
            ActionKind::Demilestone => fold.milestone.clear(),
            _ => {}
        }
    }

    let mut open = 0;
    let mut by_milestone: BTreeMap<String, i64> = BTreeMap::new();
    for fold in issues.values() {
        if fold.created && fold.open {
            open += 1;
            if !fold.milestone.is_empty() {
                *by_milestone.entry(fold.milestone.clone()).or_insert(0) += 1;
            }
        }
    }
    (open, by_milestone.into_iter().collect())
}

impl ActivityReport {
    /// Plain-text rendering with scaled bars per week.
    #[must_use]
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{}: {} actions, {} open issues",
            self.project, self.total_actions, self.open_issues
        );
        let max = self.weeks.iter().map(|(_, n)| *n).max().unwrap_or(0);
        for (week, n) in &self.weeks {
            let _ = writeln!(out, "{week} {:>6} {}", n, bar(*n, max));
        }
        if !self.milestones.is_empty() {
            out.push('\n');
            for (title, n) in &self.milestones {
                let _ = writeln!(out, "{n:>6} open in {title}");
            }
        }
        if !self.actors.is_empty() {
            out.push('\n');
            for (actor, n) in &self.actors {
                let _ = writeln!(out, "{n:>6} {actor}");
            }
        }
        out
    }
}

fn bar(n: i64, max: i64) -> String {
    if max <= 0 || n <= 0 {
        return String::new();
    }
    let len = ((n as f64 / max as f64) * BAR_WIDTH as f64).ceil() as usize;
    "∎".repeat(len.clamp(1, BAR_WIDTH))
}
