//! Logging initialization built on `tracing`.
//!
//! Verbosity maps to a default `EnvFilter` directive; `GHIST_LOG` (via
//! `RUST_LOG` syntax) overrides it entirely. Output goes to stderr so
//! report output on stdout stays clean for pipelines.

use tracing_subscriber::EnvFilter;

/// Initialize the global subscriber.
///
/// `verbose` counts `-v` flags; `quiet` wins over any verbosity.
pub fn init_logging(verbose: u8, quiet: bool) {
    let default = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };
    let filter = EnvFilter::try_from_env("GHIST_LOG")
        .unwrap_or_else(|_| EnvFilter::new(default));

    // Ignore the error if a subscriber is already set (tests).
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
