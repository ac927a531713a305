//! Per-invocation issue cache for edit sessions.
//!
//! A bulk edit renders from the same snapshots it later diffs against,
//! so those snapshots must be read once and reused, not re-fetched. The
//! cache lives in an explicit context passed around by the CLI, never in
//! process-wide state.

use crate::error::Result;
use crate::model::IssueState;
use crate::remote::IssueService;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Default)]
pub struct SessionContext {
    cache: Mutex<HashMap<(String, i64), IssueState>>,
}

impl SessionContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember a snapshot (for example from a search result page).
    pub fn update(&self, project: &str, issue: IssueState) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.insert((project.to_string(), issue.number), issue);
        }
    }

    #[must_use]
    pub fn get(&self, project: &str, number: i64) -> Option<IssueState> {
        self.cache
            .lock()
            .ok()
            .and_then(|c| c.get(&(project.to_string(), number)).cloned())
    }

    /// Snapshots for `numbers`, reading through the cache.
    pub fn read_issues<S: IssueService + ?Sized>(
        &self,
        svc: &S,
        project: &str,
        numbers: &[i64],
    ) -> Result<Vec<IssueState>> {
        let mut out = Vec::with_capacity(numbers.len());
        for &number in numbers {
            let issue = match self.get(project, number) {
                Some(issue) => issue,
                None => {
                    let issue = svc.get_issue(project, number)?;
                    self.update(project, issue.clone());
                    issue
                }
            };
            out.push(issue);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_round_trip() {
        let ctx = SessionContext::new();
        assert!(ctx.get("o/r", 1).is_none());
        ctx.update(
            "o/r",
            IssueState {
                number: 1,
                title: "t".to_string(),
                ..IssueState::default()
            },
        );
        assert_eq!(ctx.get("o/r", 1).unwrap().title, "t");
        // Same number under a different project is a different key.
        assert!(ctx.get("o/other", 1).is_none());
    }
}
