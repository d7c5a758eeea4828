//! `ChainScanTask`: one scan unit per `(chain, approver)` pair. Runs to
//! completion as a free function spawned onto its own `tokio` task by the
//! orchestrator; it holds no back-pointer to the orchestrator, only the
//! `task_id` it reports against.

use std::collections::BTreeMap;

use ethers_core::types::U256;

use crate::cache::LoadedAllowances;
use crate::common::{Address20, Address32Padded, Allowance, AllowanceKey, ChainId};
use crate::reducer::AllowanceReducer;
use crate::rpc::{JsonRpcClient, LogFetcher};

/// Everything a task needs to run, captured at spawn time so the task
/// itself never reaches back into orchestrator state.
#[derive(Debug)]
pub struct ChainScanTaskInputs {
    pub task_id: u64,
    pub chain_id: ChainId,
    pub approver: Address32Padded,
    pub contracts: Vec<Address20>,
    pub checkpoint: Option<U256>,
    pub prior_cache_map: LoadedAllowances,
}

/// The outcome of one completed task.
#[derive(Debug)]
pub struct ChainScanResult {
    pub task_id: u64,
    pub chain_id: ChainId,
    pub approver: Address32Padded,
    pub latest_block: U256,
    pub allowances: BTreeMap<AllowanceKey, Allowance>,
    /// Whether `eth_getLogs` returned at least one non-pending log on this
    /// task, independent of whether any of them decoded into a usable
    /// allowance. `AllowanceScanner::finalize` gates the checkpoint write
    /// on this bit (spec.md §8 scenario 3 vs. scenario 4).
    pub saw_mined_log: bool,
}

/// Runs a scan task's four-step sequence against `client`. Returns `None`
/// if `eth_blockNumber` or `eth_getLogs` failed (or the response body
/// carried an `"error"` object), which the caller must treat as "this task
/// produced nothing, leave the chain's cache untouched".
pub async fn run_chain_scan_task(
    client: &dyn JsonRpcClient,
    inputs: ChainScanTaskInputs,
) -> Option<ChainScanResult> {
    let fetcher = LogFetcher::new(client);

    // Step 1: latest block.
    let latest_block = fetcher.get_block_number(&inputs.chain_id).await.ok()?;

    // Step 2: logs from checkpoint+1 (or earliest) to latest_block.
    let logs = fetcher
        .get_logs(
            &inputs.chain_id,
            &inputs.contracts,
            &inputs.approver,
            inputs.checkpoint,
            latest_block,
        )
        .await
        .ok()?;

    // Step 3: fold prior cache + new logs.
    let outcome = AllowanceReducer::fold(
        &inputs.chain_id,
        &inputs.approver,
        inputs.prior_cache_map,
        logs,
    );

    // Step 4: produce the result. `latest_block` (not the reducer's
    // max_block_number) is the checkpoint witness: `last_block_number` must
    // equal the `eth_blockNumber` observed during this task.
    Some(ChainScanResult {
        task_id: inputs.task_id,
        chain_id: inputs.chain_id,
        approver: inputs.approver,
        latest_block,
        allowances: outcome.allowances,
        saw_mined_log: outcome.saw_mined_log,
    })
}
