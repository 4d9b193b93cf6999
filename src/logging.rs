//! Tracing setup for binaries and tests that use dynoframe.
//!
//! The library only emits `tracing` events; nothing is printed until a
//! subscriber is installed, either by the application or with [`init_tracing`].

use tracing_subscriber::EnvFilter;

use crate::errors::{Error, Result};

/// Install a formatting subscriber on stderr.
///
/// `RUST_LOG` wins over `default_filter` when set. Calling this again after a
/// subscriber is installed is a no-op.
pub fn init_tracing(default_filter: &str) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_filter)
            .map_err(|e| Error::domain(format!("invalid log filter '{}': {}", default_filter, e)))?,
    };

    // Err here only means a global subscriber already exists
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init();
    Ok(())
}
