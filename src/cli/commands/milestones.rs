use crate::config::Config;
use crate::error::Result;
use crate::remote::IssueService;

/// Execute the milestones command: list open milestones.
pub fn execute(config: &Config, json: bool) -> Result<()> {
    let project = config.require_project()?;
    let client = super::client(config);
    let milestones = client.list_milestones(project)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&milestones)?);
        return Ok(());
    }
    for m in &milestones {
        let due = if m.due_on.is_empty() {
            "no due date"
        } else {
            m.due_on.as_str()
        };
        println!("{}\t{} ({} open, {due})", m.number, m.title, m.open_issues);
    }
    Ok(())
}
