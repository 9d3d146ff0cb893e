//! Tracing subscriber setup for the binary.

use crate::{Error, Result};
use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber.
///
/// `RUST_LOG` takes precedence over the `verbose` switch when it is set.
pub fn init_logging(verbose: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(verbose));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .try_init()
        .map_err(|e| Error::Configuration {
            reason: format!("failed to install logger: {}", e),
        })
}

fn default_filter(verbose: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new("flatmirror=debug")
    } else {
        EnvFilter::new("flatmirror=info")
    }
}
