use crate::config::Config;
use crate::edit::render_issue;
use crate::error::Result;
use crate::remote::IssueService;

/// Execute the show command: print one issue with its transcript.
pub fn execute(config: &Config, number: i64, json: bool) -> Result<()> {
    let project = config.require_project()?;
    let client = super::client(config);
    let issue = client.get_issue(project, number)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&issue)?);
        return Ok(());
    }

    let comments = client.list_comments(project, number)?;
    let events = client.list_issue_events(project, number)?;
    print!("{}", render_issue(&issue, &comments, &events));
    Ok(())
}
