//! # eth-allowance-scanner
//!
//! A multi-chain ERC-20 allowance discovery and caching engine.
//!
//! Given a set of EVM accounts and a per-chain list of token contracts, the
//! scanner incrementally follows each chain's `Approval` event log from a
//! persisted per-account checkpoint, folds the observed approvals and
//! revocations into a monotonic allowance set, and delivers the current
//! union of positive allowances to every caller that asked for a refresh
//! while one was already in flight.
//!
//! ## Modules
//!
//! - [`common`]: the data model — chain ids, the two address encodings,
//!   256-bit amounts, and the `Allowance`/`AllowanceKey` types.
//! - [`topic`]: the `Approval(address,address,uint256)` event topic hash.
//! - [`cache`]: typed read/write of the persistent allowance cache over an
//!   injected [`cache::KeyValueStore`].
//! - [`rpc`]: the `eth_blockNumber`/`eth_getLogs` surface consumed from an
//!   injected [`rpc::JsonRpcClient`].
//! - [`reducer`]: the pure fold from a prior allowance map plus a batch of
//!   logs to the current allowance map.
//! - [`scan_task`]: one scan unit per `(chain, account)` pair.
//! - [`scanner`]: the orchestrator — coalesces overlapping callers, spawns
//!   tasks, merges results, writes the cache, and fans replies back out.
//! - [`collaborators`]: the account- and token-enumeration seams the
//!   orchestrator reads from before spawning tasks.
//! - [`error`]: the crate's structured error type.
//! - [`telemetry`]: logging initialization for embedding applications and
//!   the demo binary.
//! - [`config`]: the demo binary's RPC-endpoint configuration.
//!
//! ## Getting started
//!
//! ```toml
//! [dependencies]
//! eth-allowance-scanner = "0.1.0"
//! ```
//!
//! Construct an [`AllowanceScanner`] with your own `JsonRpcClient`,
//! `KeyValueStore`, `Keyring`, and `TokenRegistry` implementations and call
//! [`AllowanceScanner::discover`].
#![warn(missing_debug_implementations, rustdoc::all)]
#![deny(unused_must_use, rust_2018_idioms)]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

pub mod cache;
pub mod collaborators;
pub mod common;
pub mod config;
pub mod error;
pub mod reducer;
pub mod rpc;
pub mod scan_task;
pub mod scanner;
pub mod telemetry;
pub mod topic;

pub use error::{Error, ErrorKind, Result};
pub use scanner::AllowanceScanner;
