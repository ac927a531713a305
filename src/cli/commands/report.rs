use crate::config::Config;
use crate::error::Result;
use crate::report;
use crate::storage::Store;

/// Execute the report command: activity summary from derived history.
pub fn execute(config: &Config, json: bool) -> Result<()> {
    let store = Store::open(&config.db)?;
    let project = config.require_project()?;
    store.project(project)?;
    let report = report::activity(&store, project)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report.render_text());
    }
    Ok(())
}
