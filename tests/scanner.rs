//! End-to-end scenarios driving `AllowanceScanner` against hand-written
//! mock collaborators, mirroring the `magi::engine::mock_engine::MockEngine`
//! + `tests/driver.rs` pattern: a `Mock*` struct with canned responses,
//! asserting on the orchestrator's resulting state. These are the six
//! numbered scenarios from `spec.md` §8 plus the idempotence and
//! coalescing properties.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ethers_core::types::{H256, U256};

use eth_allowance_scanner::cache::KeyValueStore;
use eth_allowance_scanner::collaborators::{StaticKeyring, StaticTokenRegistry};
use eth_allowance_scanner::common::{Address20, ChainId};
use eth_allowance_scanner::rpc::{JsonRpcClient, LogFilter, RpcCallError, WireLog};
use eth_allowance_scanner::AllowanceScanner;

const CHAIN: &str = "0x1";
const CONTRACT: &str = "0x3333333333333333333333333333333333333333";
const ACCOUNT: &str = "0xf81229fbed5a3e0aea77cf12e2c0d2f5aa437db5";
const SPENDER_TOPIC: &str = "0x000000000000000000000000dac300000000000000000000000000000000bf01";

fn chain() -> ChainId {
    ChainId::new(CHAIN)
}

fn contract() -> Address20 {
    Address20::parse(CONTRACT).unwrap()
}

fn account() -> Address20 {
    Address20::parse(ACCOUNT).unwrap()
}

fn topic(hex: &str) -> H256 {
    hex.parse().unwrap()
}

fn log(block_hex: &str, log_index_hex: &str, amount_hex: &str, topic_count: usize) -> WireLog {
    let mut topics = vec![
        *eth_allowance_scanner::topic::APPROVAL_TOPIC,
        account().pad_to_topic().as_str().parse().unwrap(),
        topic(SPENDER_TOPIC),
    ];
    topics.truncate(topic_count);

    WireLog {
        address: contract().to_checksum(),
        block_number: Some(block_hex.to_string()),
        log_index: Some(log_index_hex.to_string()),
        topics,
        data: amount_hex.to_string(),
    }
}

#[derive(Default)]
struct ChainResponses {
    block_number: Option<U256>,
    logs: Option<Result<Vec<WireLog>, RpcCallError>>,
}

#[derive(Default)]
struct MockRpcClient {
    responses: Mutex<HashMap<String, ChainResponses>>,
    get_logs_calls: AtomicUsize,
}

impl MockRpcClient {
    fn with_chain(self, chain_id: &str, block_number: u64, logs: Vec<WireLog>) -> Self {
        self.responses.lock().unwrap().insert(
            chain_id.to_string(),
            ChainResponses {
                block_number: Some(U256::from(block_number)),
                logs: Some(Ok(logs)),
            },
        );
        self
    }

    fn with_logs_error(self, chain_id: &str, block_number: u64) -> Self {
        self.responses.lock().unwrap().insert(
            chain_id.to_string(),
            ChainResponses {
                block_number: Some(U256::from(block_number)),
                logs: Some(Err(RpcCallError::RpcError {
                    code: -32000,
                    message: "execution reverted".to_string(),
                })),
            },
        );
        self
    }
}

#[async_trait]
impl JsonRpcClient for MockRpcClient {
    async fn eth_block_number(&self, chain_id: &ChainId) -> Result<U256, RpcCallError> {
        self.responses
            .lock()
            .unwrap()
            .get(chain_id.as_str())
            .and_then(|r| r.block_number)
            .ok_or_else(|| RpcCallError::Transport("no block number configured".to_string()))
    }

    async fn eth_get_logs(
        &self,
        chain_id: &ChainId,
        _filter: &LogFilter,
    ) -> Result<Vec<WireLog>, RpcCallError> {
        self.get_logs_calls.fetch_add(1, Ordering::SeqCst);
        self.responses
            .lock()
            .unwrap()
            .get(chain_id.as_str())
            .and_then(|r| r.logs.clone())
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

#[derive(Default)]
struct MockStore {
    value: Mutex<Option<serde_json::Value>>,
}

#[async_trait]
impl KeyValueStore for MockStore {
    async fn get_json(&self, _key: &str) -> eth_allowance_scanner::Result<Option<serde_json::Value>> {
        Ok(self.value.lock().unwrap().clone())
    }

    async fn set_json(&self, _key: &str, value: serde_json::Value) -> eth_allowance_scanner::Result<()> {
        *self.value.lock().unwrap() = Some(value);
        Ok(())
    }
}

fn keyring() -> Arc<StaticKeyring> {
    Arc::new(StaticKeyring::new(vec![account().pad_to_topic()]))
}

fn token_registry() -> Arc<StaticTokenRegistry> {
    Arc::new(StaticTokenRegistry::new(vec![(chain(), vec![contract()])]))
}

#[tokio::test]
async fn fresh_scan_detects_one_approval() {
    let client = Arc::new(
        MockRpcClient::default().with_chain(
            CHAIN,
            0x10964ec,
            vec![log("0x101a7f1", "0x92", "0x1", 3)],
        ),
    );
    let store = Arc::new(MockStore::default());
    let scanner = AllowanceScanner::new(client, store.clone(), keyring(), token_registry());

    let allowances = scanner.discover().await;
    assert_eq!(allowances.len(), 1);
    assert_eq!(allowances[0].amount.to_hex(), "0x1");
    assert_eq!(
        allowances[0].spender_address.as_str().to_ascii_lowercase(),
        SPENDER_TOPIC
    );

    let doc = store.value.lock().unwrap().clone().unwrap();
    let chain_entry = &doc["0x1"];
    assert_eq!(chain_entry["allowances_found"].as_array().unwrap().len(), 1);
    assert_eq!(
        chain_entry["last_block_number"][account().pad_to_topic().as_str()],
        "0x10964ec"
    );
}

#[tokio::test]
async fn revocation_produces_empty_output_and_cache() {
    let client = Arc::new(MockRpcClient::default().with_chain(
        CHAIN,
        0x10964ec,
        vec![
            log("0x101a7f1", "0x92", "0x1", 3),
            log("0x101a7f1", "0x93", "0x0", 3),
        ],
    ));
    let store = Arc::new(MockStore::default());
    let scanner = AllowanceScanner::new(client, store.clone(), keyring(), token_registry());

    let allowances = scanner.discover().await;
    assert!(allowances.is_empty());

    let doc = store.value.lock().unwrap().clone().unwrap();
    let chain_entry = &doc["0x1"];
    assert_eq!(chain_entry["allowances_found"].as_array().unwrap().len(), 0);
    assert_eq!(
        chain_entry["last_block_number"][account().pad_to_topic().as_str()],
        "0x10964ec"
    );
}

#[tokio::test]
async fn pending_log_is_ignored_and_no_chain_section_is_written() {
    // Unlike a malformed-topics log, a pending log (block_number == 0) was
    // never actually mined, so the task completing (eth_blockNumber
    // succeeded) does not advance the checkpoint — there is nothing to
    // bound `fromBlock` by that the node has confirmed it has seen.
    let client = Arc::new(MockRpcClient::default().with_chain(
        CHAIN,
        0x10964ec,
        vec![log("0x0", "0x92", "0x1", 3)],
    ));
    let store = Arc::new(MockStore::default());
    let scanner = AllowanceScanner::new(client, store.clone(), keyring(), token_registry());

    let allowances = scanner.discover().await;
    assert!(allowances.is_empty());

    assert!(store.value.lock().unwrap().is_none());
}

#[tokio::test]
async fn malformed_topics_are_skipped() {
    let client = Arc::new(MockRpcClient::default().with_chain(
        CHAIN,
        0x10964ec,
        vec![log("0x101a7f1", "0x92", "0x1", 2)],
    ));
    let store = Arc::new(MockStore::default());
    let scanner = AllowanceScanner::new(client, store.clone(), keyring(), token_registry());

    let allowances = scanner.discover().await;
    assert!(allowances.is_empty());

    let doc = store.value.lock().unwrap().clone().unwrap();
    let chain_entry = &doc["0x1"];
    assert_eq!(chain_entry["allowances_found"].as_array().unwrap().len(), 0);
    assert_eq!(
        chain_entry["last_block_number"][account().pad_to_topic().as_str()],
        "0x10964ec"
    );
}

#[tokio::test]
async fn transport_error_mid_run_skips_only_that_chain() {
    let client = Arc::new(MockRpcClient::default().with_logs_error(CHAIN, 0x10964ec));
    let store = Arc::new(MockStore::default());
    let scanner = AllowanceScanner::new(client, store.clone(), keyring(), token_registry());

    let allowances = scanner.discover().await;
    assert!(allowances.is_empty());
    assert!(store.value.lock().unwrap().is_none());
}

#[tokio::test]
async fn reset_on_idle_scanner_is_a_no_op_for_the_next_discover() {
    let client = Arc::new(
        MockRpcClient::default().with_chain(
            CHAIN,
            0x10964ec,
            vec![log("0x101a7f1", "0x92", "0x1", 3)],
        ),
    );
    let store = Arc::new(MockStore::default());
    let scanner = AllowanceScanner::new(client, store.clone(), keyring(), token_registry());

    scanner.reset().await;

    assert!(store.value.lock().unwrap().is_none());

    let allowances = scanner.discover().await;
    assert_eq!(allowances.len(), 1);
}

/// A `JsonRpcClient` whose `eth_get_logs` blocks on a `Notify` until the
/// test releases it, so a test can reset() the scanner while a task's RPC
/// call is genuinely still outstanding rather than already resolved.
struct GatedRpcClient {
    block_number: U256,
    logs: Vec<WireLog>,
    gate: tokio::sync::Notify,
    get_logs_calls: AtomicUsize,
}

impl GatedRpcClient {
    fn new(block_number: u64, logs: Vec<WireLog>) -> Self {
        Self {
            block_number: U256::from(block_number),
            logs,
            gate: tokio::sync::Notify::new(),
            get_logs_calls: AtomicUsize::new(0),
        }
    }

    fn release(&self) {
        self.gate.notify_one();
    }
}

#[async_trait]
impl JsonRpcClient for GatedRpcClient {
    async fn eth_block_number(&self, _chain_id: &ChainId) -> Result<U256, RpcCallError> {
        Ok(self.block_number)
    }

    async fn eth_get_logs(
        &self,
        _chain_id: &ChainId,
        _filter: &LogFilter,
    ) -> Result<Vec<WireLog>, RpcCallError> {
        self.get_logs_calls.fetch_add(1, Ordering::SeqCst);
        self.gate.notified().await;
        Ok(self.logs.clone())
    }
}

#[tokio::test]
async fn reset_during_in_flight_run_delivers_empty_and_drops_the_late_completion() {
    let client = Arc::new(GatedRpcClient::new(
        0x10964ec,
        vec![log("0x101a7f1", "0x92", "0x1", 3)],
    ));
    let store = Arc::new(MockStore::default());
    let scanner = AllowanceScanner::new(client.clone(), store.clone(), keyring(), token_registry());

    let discover = tokio::spawn({
        let scanner = scanner.clone();
        async move { scanner.discover().await }
    });

    // Give the spawned ChainScanTask a chance to reach `eth_get_logs` and
    // block on the gate before resetting — it is genuinely in flight now.
    while client.get_logs_calls.load(Ordering::SeqCst) == 0 {
        tokio::task::yield_now().await;
    }

    scanner.reset().await;
    let allowances = discover.await.unwrap();
    assert!(allowances.is_empty());
    assert!(store.value.lock().unwrap().is_none());

    // The gated call still completes after reset; the orchestrator must
    // discard it silently rather than writing a stale cache entry.
    client.release();
    tokio::task::yield_now().await;
    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    assert!(store.value.lock().unwrap().is_none());

    // A fresh discover() proceeds normally afterward.
    let client2 = Arc::new(
        MockRpcClient::default().with_chain(
            CHAIN,
            0x10964ec,
            vec![log("0x101a7f1", "0x92", "0x1", 3)],
        ),
    );
    let scanner2 = AllowanceScanner::new(client2, store.clone(), keyring(), token_registry());
    let allowances = scanner2.discover().await;
    assert_eq!(allowances.len(), 1);
}

#[tokio::test]
async fn idempotent_rescan_with_no_new_logs_yields_identical_cache() {
    let client = Arc::new(
        MockRpcClient::default().with_chain(
            CHAIN,
            0x10964ec,
            vec![log("0x101a7f1", "0x92", "0x1", 3)],
        ),
    );
    let store = Arc::new(MockStore::default());
    let scanner = AllowanceScanner::new(client.clone(), store.clone(), keyring(), token_registry());

    scanner.discover().await;
    let first = store.value.lock().unwrap().clone();

    client.responses.lock().unwrap().insert(
        CHAIN.to_string(),
        ChainResponses {
            block_number: Some(U256::from(0x10964ecu64)),
            logs: Some(Ok(Vec::new())),
        },
    );
    let scanner = AllowanceScanner::new(client, store.clone(), keyring(), token_registry());
    scanner.discover().await;
    let second = store.value.lock().unwrap().clone();

    assert_eq!(first, second);
}

#[tokio::test]
async fn concurrent_discover_calls_coalesce_into_one_transport_call() {
    let client = Arc::new(
        MockRpcClient::default().with_chain(
            CHAIN,
            0x10964ec,
            vec![log("0x101a7f1", "0x92", "0x1", 3)],
        ),
    );
    let store = Arc::new(MockStore::default());
    let scanner = AllowanceScanner::new(client.clone(), store.clone(), keyring(), token_registry());

    let a = scanner.discover();
    let b = scanner.discover();
    let (allowances_a, allowances_b) = tokio::join!(a, b);

    assert_eq!(allowances_a.len(), 1);
    assert_eq!(allowances_b.len(), 1);
    assert_eq!(client.get_logs_calls.load(Ordering::SeqCst), 1);
}
