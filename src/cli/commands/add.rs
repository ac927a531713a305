use crate::config::Config;
use crate::error::{GhistError, Result};
use crate::storage::Store;

/// Execute the add command.
pub fn execute(config: &Config, project: &str) -> Result<()> {
    if !project.contains('/') {
        return Err(GhistError::Config(format!(
            "project must be owner/repo, got '{project}'"
        )));
    }
    let store = Store::open(&config.db)?;
    store.add_project(project)?;
    println!("Tracking {project}");
    Ok(())
}
