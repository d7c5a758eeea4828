//! Logging initialization.
//!
//! Simplified from `magi::telemetry::logging::init`'s hand-rolled ANSI
//! layer to `tracing_subscriber::fmt`'s own formatter — nothing this crate
//! needs depends on colorized terminal output, and the demo binary is
//! expected to run in whatever terminal or log-aggregation context the
//! embedder already has.

use eyre::Result;
use tracing_subscriber::EnvFilter;

/// Initializes a global `tracing` subscriber. `verbose` selects
/// `eth_allowance_scanner=debug` as the default filter when `RUST_LOG`
/// isn't set; otherwise `eth_allowance_scanner=info`. Errors if a
/// subscriber has already been registered.
pub fn init(verbose: bool) -> Result<()> {
    let default_filter = if verbose {
        "eth_allowance_scanner=debug"
    } else {
        "eth_allowance_scanner=info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .try_init()
        .map_err(|e| eyre::eyre!("failed to set global tracing subscriber: {e}"))
}
