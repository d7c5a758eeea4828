//! Error kinds for the allowance scanner.
//!
//! Almost every failure is handled locally (skip the log, skip the cache
//! entry, skip the chain) rather than surfaced to a caller of `discover()`.
//! `Error` exists for the places that do need to observe a failure —
//! tracing, and the handful of call sites that propagate with `?`.

use thiserror::Error as ThisError;

/// Coarse classification of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The RPC client reported an error, or the response body carried a
    /// JSON-RPC `error` object.
    Transport,
    /// A hex string, topic array, or amount was malformed.
    Decode,
    /// The preference store returned malformed cache data.
    Cache,
    /// A task completed after `reset()`; always silently discarded by the
    /// orchestrator, never propagated to a caller.
    Aborted,
}

/// An error produced by some component of the scanner.
#[derive(Debug, Clone, ThisError)]
#[error("{kind:?}: {message}")]
pub struct Error {
    pub kind: ErrorKind,
    pub message: String,
}

impl Error {
    pub fn transport(message: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Transport, message: message.into() }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Decode, message: message.into() }
    }

    pub fn cache(message: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Cache, message: message.into() }
    }

    pub fn aborted() -> Self {
        Self { kind: ErrorKind::Aborted, message: "task completed after reset".to_string() }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
