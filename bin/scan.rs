//! Demo binary: wires concrete (intentionally minimal) adapters for the
//! Scanner's external collaborators — a `reqwest`-based `JsonRpcClient`, a
//! JSON-file-backed `KeyValueStore`, and static `Keyring`/`TokenRegistry`
//! implementations built from CLI flags — so the library can be exercised
//! end to end outside of an embedding wallet. Not part of the Scanner's
//! contract (`spec.md` §6 names no CLI surface); this mirrors the way
//! `magi` ships `bin/magi.rs` alongside its library crate.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use clap::Parser;
use ethers_core::types::U256;
use eyre::{eyre, Result};
use serde::Deserialize;

use eth_allowance_scanner::cache::KeyValueStore;
use eth_allowance_scanner::collaborators::{StaticKeyring, StaticTokenRegistry};
use eth_allowance_scanner::common::{default_supported_chains, Address20, ChainId};
use eth_allowance_scanner::config::{ChainConfig, Config};
use eth_allowance_scanner::error::Error;
use eth_allowance_scanner::rpc::{JsonRpcClient, LogFilter, RpcCallError, WireLog};
use eth_allowance_scanner::{telemetry, AllowanceScanner};

#[derive(Parser)]
#[command(about = "Discover ERC-20 allowances for a set of accounts across configured chains")]
struct Cli {
    /// A chain's RPC endpoint, as `CHAIN_ID=URL` (e.g. `0x1=https://rpc.example/mainnet`).
    /// May be repeated; only chains with both an RPC endpoint and at least
    /// one `--contract` entry are scanned.
    #[arg(long = "rpc", value_parser = parse_chain_value)]
    rpc: Vec<(ChainId, String)>,

    /// A token contract to scan, as `CHAIN_ID=ADDRESS`. May be repeated.
    #[arg(long = "contract", value_parser = parse_chain_value)]
    contract: Vec<(ChainId, String)>,

    /// An account to discover allowances for. May be repeated.
    #[arg(long = "account")]
    account: Vec<String>,

    /// Path to the JSON file backing the persistent allowance cache.
    #[arg(long, default_value = "./allowance_cache.json", env = "ALLOWANCE_CACHE_PATH")]
    cache_file: PathBuf,

    /// Enable debug-level logging.
    #[arg(short, long)]
    verbose: bool,
}

fn parse_chain_value(s: &str) -> Result<(ChainId, String), String> {
    let (chain, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected CHAIN_ID=VALUE, got `{s}`"))?;
    Ok((ChainId::new(chain), value.to_string()))
}

impl Cli {
    fn into_config(self) -> Result<Config> {
        let mut chains: HashMap<ChainId, ChainConfig> = HashMap::new();
        for (chain_id, rpc_url) in self.rpc {
            chains.entry(chain_id.clone()).or_insert_with(|| ChainConfig {
                chain_id,
                rpc_url,
                contracts: Vec::new(),
            });
        }
        for (chain_id, address) in self.contract {
            let contract = Address20::parse(&address)
                .map_err(|e| eyre!("invalid --contract address `{address}`: {e}"))?;
            chains
                .entry(chain_id.clone())
                .or_insert_with(|| ChainConfig {
                    chain_id,
                    rpc_url: String::new(),
                    contracts: Vec::new(),
                })
                .contracts
                .push(contract);
        }

        let accounts = self
            .account
            .iter()
            .map(|a| {
                Address20::parse(a).map_err(|e| eyre!("invalid --account address `{a}`: {e}"))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Config {
            chains: chains.into_values().collect(),
            accounts,
            cache_path: Some(self.cache_file),
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    telemetry::init(cli.verbose)?;

    let config = cli.into_config()?;
    if config.accounts.is_empty() {
        return Err(eyre!("no --account supplied; nothing to scan"));
    }

    let cache_path = config
        .cache_path
        .clone()
        .unwrap_or_else(|| PathBuf::from("./allowance_cache.json"));

    let rpc_endpoints: HashMap<ChainId, String> = config
        .chains
        .iter()
        .filter(|c| !c.rpc_url.is_empty())
        .map(|c| (c.chain_id.clone(), c.rpc_url.clone()))
        .collect();

    let token_registry = StaticTokenRegistry::new(
        config
            .chains
            .iter()
            .filter(|c| !c.contracts.is_empty() && rpc_endpoints.contains_key(&c.chain_id))
            .map(|c| (c.chain_id.clone(), c.contracts.clone()))
            .collect(),
    );

    let missing_rpc = default_supported_chains()
        .into_iter()
        .filter(|chain| !rpc_endpoints.contains_key(chain))
        .count();
    if missing_rpc > 0 {
        tracing::debug!(
            missing_rpc,
            "not every default supported chain has an RPC endpoint configured; those chains are skipped"
        );
    }

    let keyring = StaticKeyring::new(config.accounts.iter().map(|a| a.pad_to_topic()).collect());
    let client = ReqwestJsonRpcClient::new(rpc_endpoints);
    let kv_store = FileKeyValueStore::new(cache_path);

    let scanner = AllowanceScanner::new(
        Arc::new(client),
        Arc::new(kv_store),
        Arc::new(keyring),
        Arc::new(token_registry),
    );

    let allowances = scanner.discover().await;
    tracing::info!(count = allowances.len(), "discovery complete");
    for allowance in &allowances {
        println!(
            "{}\t{}\tapprover={} spender={} amount={}",
            allowance.chain_id,
            allowance.contract_address,
            allowance.approver_address,
            allowance.spender_address,
            allowance.amount,
        );
    }

    Ok(())
}

/// A minimal JSON-RPC 2.0 client over `reqwest`, one HTTP endpoint per
/// chain. Not part of the Scanner's contract — `spec.md` §1 assumes this is
/// supplied externally; this exists only so the demo binary can run
/// against a real node.
struct ReqwestJsonRpcClient {
    http: reqwest::Client,
    endpoints: HashMap<ChainId, String>,
}

impl ReqwestJsonRpcClient {
    fn new(endpoints: HashMap<ChainId, String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoints,
        }
    }

    async fn call<T: for<'de> Deserialize<'de>>(
        &self,
        chain_id: &ChainId,
        method: &str,
        params: serde_json::Value,
    ) -> Result<T, RpcCallError> {
        let url = self
            .endpoints
            .get(chain_id)
            .ok_or_else(|| RpcCallError::Transport(format!("no RPC endpoint for chain {chain_id}")))?;

        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let response: JsonRpcResponse<T> = self
            .http
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| RpcCallError::Transport(e.to_string()))?
            .json()
            .await
            .map_err(|e| RpcCallError::Transport(format!("malformed response body: {e}")))?;

        match (response.result, response.error) {
            (Some(result), _) => Ok(result),
            (None, Some(err)) => Err(RpcCallError::RpcError {
                code: err.code,
                message: err.message,
            }),
            (None, None) => Err(RpcCallError::Transport(
                "response carried neither result nor error".to_string(),
            )),
        }
    }
}

#[derive(Deserialize)]
struct JsonRpcResponse<T> {
    #[serde(default)]
    result: Option<T>,
    #[serde(default)]
    error: Option<JsonRpcErrorBody>,
}

#[derive(Deserialize)]
struct JsonRpcErrorBody {
    code: i64,
    message: String,
}

#[async_trait]
impl JsonRpcClient for ReqwestJsonRpcClient {
    async fn eth_block_number(&self, chain_id: &ChainId) -> Result<U256, RpcCallError> {
        let hex: String = self
            .call(chain_id, "eth_blockNumber", serde_json::json!([]))
            .await?;
        let stripped = hex
            .strip_prefix("0x")
            .ok_or_else(|| RpcCallError::Transport(format!("non-hex block number: {hex}")))?;
        U256::from_str_radix(stripped, 16)
            .map_err(|e| RpcCallError::Transport(format!("invalid block number {hex}: {e}")))
    }

    async fn eth_get_logs(
        &self,
        chain_id: &ChainId,
        filter: &LogFilter,
    ) -> Result<Vec<WireLog>, RpcCallError> {
        self.call(chain_id, "eth_getLogs", serde_json::json!([filter]))
            .await
    }
}

/// A `KeyValueStore` backed by a single JSON file on disk — enough to
/// demonstrate that the cache survives a process restart, without pulling
/// in the embedder's real preference-storage stack.
struct FileKeyValueStore {
    path: PathBuf,
}

impl FileKeyValueStore {
    fn new(path: PathBuf) -> Self {
        Self { path }
    }

    async fn read_document(&self) -> serde_json::Value {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null),
            Err(_) => serde_json::Value::Null,
        }
    }
}

#[async_trait]
impl KeyValueStore for FileKeyValueStore {
    async fn get_json(&self, key: &str) -> eth_allowance_scanner::Result<Option<serde_json::Value>> {
        let doc = self.read_document().await;
        Ok(doc.get(key).cloned())
    }

    async fn set_json(&self, key: &str, value: serde_json::Value) -> eth_allowance_scanner::Result<()> {
        let mut doc = self.read_document().await;
        if !doc.is_object() {
            doc = serde_json::json!({});
        }
        doc[key] = value;
        let serialized = serde_json::to_vec_pretty(&doc)
            .map_err(|e| Error::cache(format!("failed to serialize cache file: {e}")))?;
        tokio::fs::write(&self.path, serialized)
            .await
            .map_err(|e| Error::cache(format!("failed to write cache file {}: {e}", self.path.display())))
    }
}
