//! One module per subcommand; each exposes an `execute` function.

pub mod add;
pub mod edit;
pub mod init;
pub mod list;
pub mod milestones;
pub mod refill;
pub mod report;
pub mod show;
pub mod status;
pub mod sync;

use crate::config::Config;
use crate::remote::Client;

/// Authenticated client, or unauthenticated when no token is configured
/// (read-only commands still work within the anonymous rate budget).
pub(crate) fn client(config: &Config) -> Client {
    if config.token.is_none() {
        tracing::warn!("no token configured; using the anonymous rate budget");
    }
    Client::new(config.token.clone())
}
