//! Telemetry module.
//!
//! Logging is built on [`tracing`](https://crates.io/crates/tracing), the
//! same crate `magi::telemetry::logging` uses. [`logging::init`]
//! initializes a global subscriber from a `verbose` flag (or the
//! `RUST_LOG` environment variable, if set); it errors if a subscriber has
//! already been registered. There is no metrics server or shutdown-signal
//! handler here — this crate is a library with no long-running process of
//! its own, unlike the node `magi` instruments (see DESIGN.md for the
//! drop note).

pub mod logging;

pub use logging::init;

/// Re-exports the tracing macros and subscriber-builder pieces this
/// crate's call sites use.
pub mod prelude {
    pub use tracing::{debug, error, info, warn};
    pub use tracing_subscriber::{fmt, prelude::*};
}
