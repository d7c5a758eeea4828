//! `LogFetcher`: the only component that talks to the injected
//! [`JsonRpcClient`].

use ethers_core::types::U256;

use crate::common::{Address20, Address32Padded, ChainId};
use crate::error::{Error, Result};
use crate::topic::APPROVAL_TOPIC;

use super::{BlockTag, JsonRpcClient, LogFilter, RpcCallError, WireLog};

/// A single Approval log, decoded just enough to be handed to the reducer.
/// `block_number` of `0` means the log is still pending (not yet mined);
/// amount and topic-shape validation happen in the reducer, not here.
#[derive(Debug, Clone)]
pub struct LogRecord {
    pub address: Address20,
    pub block_number: U256,
    pub log_index: U256,
    pub topics: Vec<ethers_core::types::H256>,
    pub data: String,
}

/// Issues `eth_blockNumber` and `eth_getLogs` against a chain, translating
/// transport-level failures into [`crate::error::Error`] and leaving
/// higher-level interpretation (per-task skip vs. hard failure) to the
/// caller.
pub struct LogFetcher<'a> {
    client: &'a dyn JsonRpcClient,
}

impl<'a> LogFetcher<'a> {
    pub fn new(client: &'a dyn JsonRpcClient) -> Self {
        Self { client }
    }

    /// `eth_blockNumber`. A transport failure or an `"error"` response body
    /// both map to `ErrorKind::Transport`; a result body that isn't valid
    /// hex maps to `ErrorKind::Decode`.
    pub async fn get_block_number(&self, chain_id: &ChainId) -> Result<U256> {
        match self.client.eth_block_number(chain_id).await {
            Ok(n) => Ok(n),
            Err(RpcCallError::Transport(msg)) => Err(Error::transport(msg)),
            Err(RpcCallError::RpcError { code, message }) => {
                Err(Error::transport(format!("rpc error {code}: {message}")))
            }
        }
    }

    /// `eth_getLogs`, scoped to one token contract list and one approver, for
    /// the half-open range `[from_block, to_block]`. `from_block` is
    /// `checkpoint + 1` if a checkpoint exists, else `None` meaning
    /// `"earliest"`; `to_block` is the block number obtained from
    /// `get_block_number` earlier in the same scan step, never the literal
    /// `"latest"`, so the checkpoint written afterward is bounded by a
    /// block number the node confirmed it has seen.
    ///
    /// A transport error is surfaced to the caller as an `Err`; a
    /// structurally present `"error"` object in a well-formed JSON-RPC
    /// response is also surfaced as an `Err` here — it is the caller's
    /// (`ChainScanTask`'s) job to treat either as a local per-chain skip.
    pub async fn get_logs(
        &self,
        chain_id: &ChainId,
        contracts: &[Address20],
        approver: &Address32Padded,
        checkpoint: Option<U256>,
        to_block: U256,
    ) -> Result<Vec<LogRecord>> {
        let filter = LogFilter {
            address: contracts.iter().map(|a| a.to_checksum()).collect(),
            topics: vec![
                Some(format!("{:#x}", *APPROVAL_TOPIC)),
                Some(approver.as_str().to_string()),
            ],
            from_block: match checkpoint {
                Some(n) => BlockTag::Number(n + U256::one()),
                None => BlockTag::Earliest,
            },
            to_block: BlockTag::Number(to_block),
        };

        let wire_logs = match self.client.eth_get_logs(chain_id, &filter).await {
            Ok(logs) => logs,
            Err(RpcCallError::Transport(msg)) => return Err(Error::transport(msg)),
            Err(RpcCallError::RpcError { code, message }) => {
                return Err(Error::transport(format!("rpc error {code}: {message}")));
            }
        };

        Ok(wire_logs.into_iter().filter_map(decode_log).collect())
    }
}

/// Decodes a wire log into a [`LogRecord`], dropping anything that doesn't
/// even parse as a well-formed address/number (amount and topic-count
/// validation happen downstream in the reducer; this only handles the
/// fields the reducer cannot itself recover from).
fn decode_log(wire: WireLog) -> Option<LogRecord> {
    let address = Address20::parse(&wire.address).ok()?;
    let block_number = wire
        .block_number
        .as_deref()
        .map(parse_u256)
        .transpose()
        .ok()?
        .unwrap_or_else(U256::zero);
    let log_index = wire
        .log_index
        .as_deref()
        .map(parse_u256)
        .transpose()
        .ok()?
        .unwrap_or_else(U256::zero);
    Some(LogRecord {
        address,
        block_number,
        log_index,
        topics: wire.topics,
        data: wire.data,
    })
}

fn parse_u256(s: &str) -> std::result::Result<U256, ()> {
    let stripped = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).ok_or(())?;
    U256::from_str_radix(stripped, 16).map_err(|_| ())
}
