//! The interactive commands: edit, new, and bulk.

use crate::config::Config;
use crate::edit::{
    self, EditMode, apply, bulk_common, bulk_template, create_template, editor, render_issue,
    session::SessionContext,
};
use crate::error::{GhistError, Result};
use crate::model::IssueState;
use crate::remote::IssueService;

const DEFAULT_EDITOR: &str = "vi";

fn editor_command(config: &Config) -> String {
    config
        .editor
        .clone()
        .unwrap_or_else(|| DEFAULT_EDITOR.to_string())
}

/// Execute the edit command for one issue.
pub fn execute_edit(config: &Config, number: i64) -> Result<()> {
    let project = config.require_project()?;
    config.require_token()?;
    let client = super::client(config);

    let issue = client.get_issue(project, number)?;
    let comments = client.list_comments(project, number)?;
    let events = client.list_issue_events(project, number)?;
    let original = render_issue(&issue, &comments, &events);

    let edited = editor::edit_text(&editor_command(config), &original)?;
    let intent = edit::parse_edit(&issue, &edited, EditMode::Single)?;
    if intent.is_empty() {
        println!("No changes.");
        return Ok(());
    }
    apply::apply_edit(&client, project, number, &intent)?;
    println!("Updated issue {number}.");
    Ok(())
}

/// Execute the new command: create an issue from a filled-in template.
pub fn execute_new(config: &Config) -> Result<()> {
    let project = config.require_project()?;
    config.require_token()?;
    let client = super::client(config);

    let edited = editor::edit_text(&editor_command(config), &create_template())?;
    let intent = edit::parse_edit(&IssueState::template(), &edited, EditMode::Create)?;
    if intent.is_empty() {
        println!("Empty template; nothing created.");
        return Ok(());
    }
    let created = apply::apply_create(&client, project, &intent)?;
    println!("Created issue {}: {}", created.number, created.url);
    Ok(())
}

/// Execute the bulk command: edit every issue matching a query.
pub fn execute_bulk(config: &Config, query: &[String]) -> Result<()> {
    let project = config.require_project()?;
    config.require_token()?;
    let client = super::client(config);

    let matches = client.search_issues(project, &query.join(" "))?;
    if matches.is_empty() {
        return Err(GhistError::NoMatches);
    }
    // Seed the session cache with the search snapshots; the render below
    // reads through it, so each issue is fetched at most once.
    let session = SessionContext::new();
    let numbers: Vec<i64> = matches.iter().map(|i| i.number).collect();
    for issue in matches {
        session.update(project, issue);
    }
    let issues = session.read_issues(&client, project, &numbers)?;

    let template = bulk_template(&issues);
    let edited = editor::edit_text(&editor_command(config), &template)?;

    // Dry-run parse before any mutation: a bad header aborts the whole
    // batch while nothing has been touched yet.
    let intent = edit::parse_edit(&bulk_common(&issues), &edited, EditMode::Bulk)?;
    if intent.is_empty() {
        println!("No changes.");
        return Ok(());
    }
    let n = apply::bulk_apply(&client, project, &intent, &edited, &std::thread::sleep)?;
    println!("Updated {n} issues.");
    Ok(())
}
