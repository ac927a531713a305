use crate::config::Config;
use crate::error::{GhistError, Result};
use crate::storage::Store;
use crate::sync::{SyncMode, Synchronizer};

/// Execute the sync or resync command.
///
/// Each project syncs independently; a failure is reported and the rest
/// still run. The command fails only when nothing succeeded.
pub fn execute(config: &Config, projects: &[String], mode: SyncMode) -> Result<()> {
    let mut store = Store::open(&config.db)?;
    let projects = resolve_projects(&store, projects)?;
    let client = super::client(config);

    let mut first_error = None;
    let mut succeeded = 0;
    for project in &projects {
        match Synchronizer::new(&mut store, &client).sync(project, mode) {
            Ok(summary) => {
                succeeded += 1;
                println!(
                    "{project}: +{} issues, +{} comments, +{} events",
                    summary.issues, summary.comments, summary.events
                );
            }
            Err(e) => {
                tracing::error!(project, error = %e, "sync failed");
                eprintln!("{project}: sync failed: {e}");
                first_error.get_or_insert(e);
            }
        }
    }
    match first_error {
        Some(e) if succeeded == 0 => Err(e),
        _ => Ok(()),
    }
}

/// Explicit projects, or every tracked one.
pub(crate) fn resolve_projects(store: &Store, requested: &[String]) -> Result<Vec<String>> {
    if !requested.is_empty() {
        for name in requested {
            store.project(name)?;
        }
        return Ok(requested.to_vec());
    }
    let all: Vec<String> = store.projects()?.into_iter().map(|p| p.name).collect();
    if all.is_empty() {
        return Err(GhistError::Config(
            "no projects tracked; run: ghist add <owner/repo>".to_string(),
        ));
    }
    Ok(all)
}
