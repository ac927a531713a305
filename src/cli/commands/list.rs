use crate::config::Config;
use crate::error::{GhistError, Result};
use crate::model::IssueState;
use crate::remote::IssueService;

/// Execute the list command: search open issues.
pub fn execute(config: &Config, query: &[String], json: bool) -> Result<()> {
    let project = config.require_project()?;
    let client = super::client(config);
    let mut issues = client.search_issues(project, &query.join(" "))?;
    if issues.is_empty() {
        return Err(GhistError::NoMatches);
    }
    sort_for_display(&mut issues);

    if json {
        println!("{}", serde_json::to_string_pretty(&issues)?);
        return Ok(());
    }
    for issue in &issues {
        println!("{}\t{}", issue.number, issue.title);
    }
    Ok(())
}

/// Search results arrive in relevance order; display wants title order,
/// with the issue number as the tie-break.
fn sort_for_display(issues: &mut [IssueState]) {
    issues.sort_by(|a, b| a.title.cmp(&b.title).then(a.number.cmp(&b.number)));
}
