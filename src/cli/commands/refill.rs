use crate::config::Config;
use crate::error::Result;
use crate::history;
use crate::storage::Store;

/// Execute the refill command: rebuild history from raw events.
pub fn execute(config: &Config, projects: &[String]) -> Result<()> {
    let mut store = Store::open(&config.db)?;
    let projects = super::sync::resolve_projects(&store, projects)?;
    for project in &projects {
        let n = history::refill(&mut store, project)?;
        println!("{project}: {n} history actions");
    }
    Ok(())
}
