use crate::config::Config;
use crate::error::Result;
use crate::storage::Store;

/// Execute the init command.
pub fn execute(config: &Config) -> Result<()> {
    let store = Store::init(&config.db)?;
    println!("Created {}", store.path().display());
    Ok(())
}
