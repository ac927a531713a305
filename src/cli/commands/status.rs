use crate::config::Config;
use crate::error::Result;
use crate::storage::Store;

/// Execute the status command: projects and their sync checkpoints.
pub fn execute(config: &Config, json: bool) -> Result<()> {
    let store = Store::open(&config.db)?;
    let projects = store.projects()?;

    if json {
        let rows: Vec<serde_json::Value> = projects
            .iter()
            .map(|p| {
                serde_json::json!({
                    "project": p.name,
                    "issue_since": p.issue_since,
                    "comment_since": p.comment_since,
                    "event_id": p.event_id,
                    "raw_events": store.raw_event_count(&p.name).unwrap_or(0),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if projects.is_empty() {
        println!("No projects tracked.");
        return Ok(());
    }
    for p in &projects {
        let raw = store.raw_event_count(&p.name)?;
        println!("{} ({raw} raw events)", p.name);
        println!("  issues through   {}", dash_if_empty(&p.issue_since));
        println!("  comments through {}", dash_if_empty(&p.comment_since));
        println!("  events through   id {}", p.event_id);
    }
    Ok(())
}

fn dash_if_empty(s: &str) -> &str {
    if s.is_empty() { "-" } else { s }
}
