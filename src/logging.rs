//! Diagnostic logging setup.
//!
//! The codec reports through `tracing`; embedders that have no subscriber of
//! their own can call [`init_tracing`].

use tracing_subscriber::EnvFilter;

/// Environment variable holding the filter directives.
pub const LOG_FILTER_ENV: &str = "TAPE_LOG";

const DEFAULT_FILTER: &str = "warn";

/// Install a stderr `fmt` subscriber filtered by `TAPE_LOG` (default `warn`).
///
/// Returns `false` if a global subscriber was already installed.
pub fn init_tracing() -> bool {
    let filter = EnvFilter::try_from_env(LOG_FILTER_ENV)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .compact()
        .try_init()
        .is_ok()
}
