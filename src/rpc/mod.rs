//! The RPC surface the scanner consumes and the `JsonRpcClient` collaborator
//! trait it is built on.
//!
//! The actual transport is external: callers provide a
//! [`JsonRpcClient`] implementation, the same way `magi::engine::traits::Engine`
//! is the abstract seam the driver talks to instead of a concrete `op-geth`
//! client.

pub mod fetcher;

pub use fetcher::{LogFetcher, LogRecord};

use async_trait::async_trait;
use ethers_core::types::{H256, U256};
use serde::{Deserialize, Serialize};

use crate::common::ChainId;

/// A JSON-RPC filter for `eth_getLogs`: a contract address list, the
/// `Approval` topic plus the padded approver as `topics[1]`, and an
/// explicit numeric `toBlock` pinned to the block number observed earlier
/// in the same scan step.
#[derive(Debug, Clone, Serialize)]
pub struct LogFilter {
    pub address: Vec<String>,
    pub topics: Vec<Option<String>>,
    #[serde(rename = "fromBlock")]
    pub from_block: BlockTag,
    #[serde(rename = "toBlock")]
    pub to_block: BlockTag,
}

/// A block bound in a log filter: either the literal `"earliest"` or an
/// explicit block number rendered as `0x`-prefixed hex.
#[derive(Debug, Clone, Copy)]
pub enum BlockTag {
    Earliest,
    Number(U256),
}

impl Serialize for BlockTag {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            BlockTag::Earliest => serializer.serialize_str("earliest"),
            BlockTag::Number(n) => serializer.serialize_str(&format!("{n:#x}")),
        }
    }
}

/// A log entry as returned by `eth_getLogs`, before any validation. Field
/// names match the JSON-RPC response shape; `block_number` and
/// `log_index` are left as raw hex strings here and parsed by the reducer
/// so that a malformed value can be skipped locally instead of failing the
/// whole batch.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireLog {
    pub address: String,
    #[serde(default)]
    pub block_number: Option<String>,
    #[serde(default)]
    pub log_index: Option<String>,
    pub topics: Vec<H256>,
    pub data: String,
}

/// Distinguishes a transport-level failure from a JSON-RPC response that
/// structurally carries an `"error"` object. Both are folded into the same
/// externally observable behavior: the caller logs the distinction and the
/// scan task simply produces no result.
#[derive(Debug, Clone)]
pub enum RpcCallError {
    /// The client itself failed (connection refused, timeout, malformed
    /// body that isn't even JSON-RPC shaped, etc).
    Transport(String),
    /// The response was well-formed JSON-RPC but carried an `"error"`
    /// object instead of a `"result"`.
    RpcError { code: i64, message: String },
}

impl std::fmt::Display for RpcCallError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RpcCallError::Transport(msg) => write!(f, "transport error: {msg}"),
            RpcCallError::RpcError { code, message } => {
                write!(f, "rpc error {code}: {message}")
            }
        }
    }
}

impl std::error::Error for RpcCallError {}

/// The JSON-RPC operations the scanner issues against a chain. Implemented
/// externally by the embedder; the scanner never constructs an HTTP client
/// itself.
#[async_trait]
pub trait JsonRpcClient: Send + Sync {
    /// `eth_blockNumber`.
    async fn eth_block_number(&self, chain_id: &ChainId) -> Result<U256, RpcCallError>;

    /// `eth_getLogs`.
    async fn eth_get_logs(
        &self,
        chain_id: &ChainId,
        filter: &LogFilter,
    ) -> Result<Vec<WireLog>, RpcCallError>;
}
