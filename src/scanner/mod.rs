//! `AllowanceScanner` and its reset path: the orchestrator that coalesces
//! overlapping `discover()` calls, spawns one `ChainScanTask` per
//! `(chain, approver)` pair, merges results, writes the cache, and fans
//! replies back out to every waiting caller.
//!
//! All mutable orchestrator state lives behind one `tokio::sync::Mutex` —
//! single-writer rather than single-threaded, since tasks run concurrently
//! but touch shared state only through this lock. Tasks report completion
//! through a `task_id` and a `generation` counter rather than holding a
//! reference back to the scanner's state, so a `reset()` mid-run can simply
//! bump the generation and let late completions fall through as no-ops.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use ethers_core::types::U256;
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, info, warn};

use crate::cache::AllowanceCacheStore;
use crate::collaborators::{Keyring, TokenRegistry};
use crate::common::{Address20, Address32Padded, Allowance, ChainId};
use crate::rpc::JsonRpcClient;
use crate::scan_task::{run_chain_scan_task, ChainScanResult, ChainScanTaskInputs};

use crate::cache::KeyValueStore;

enum TaskOutcome {
    Pending,
    Completed(ChainScanResult),
    Aborted,
}

#[derive(Default)]
struct RunState {
    running: bool,
    generation: u64,
    expected_tasks: usize,
    completed_tasks: usize,
    task_table: HashMap<u64, TaskOutcome>,
    pending_callbacks: Vec<oneshot::Sender<Vec<Allowance>>>,
}

/// The allowance-discovery orchestrator. Construct with [`AllowanceScanner::new`]
/// and call [`AllowanceScanner::discover`] from as many overlapping callers
/// as needed — concurrent calls before the first completion are coalesced
/// into one scan.
pub struct AllowanceScanner {
    client: Arc<dyn JsonRpcClient>,
    kv_store: Arc<dyn KeyValueStore>,
    keyring: Arc<dyn Keyring>,
    token_registry: Arc<dyn TokenRegistry>,
    state: Mutex<RunState>,
    next_task_id: AtomicU64,
}

impl std::fmt::Debug for AllowanceScanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AllowanceScanner")
            .field("client", &"<dyn JsonRpcClient>")
            .field("kv_store", &"<dyn KeyValueStore>")
            .field("keyring", &"<dyn Keyring>")
            .field("token_registry", &"<dyn TokenRegistry>")
            .field("next_task_id", &self.next_task_id.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl AllowanceScanner {
    pub fn new(
        client: Arc<dyn JsonRpcClient>,
        kv_store: Arc<dyn KeyValueStore>,
        keyring: Arc<dyn Keyring>,
        token_registry: Arc<dyn TokenRegistry>,
    ) -> Arc<Self> {
        Arc::new(Self {
            client,
            kv_store,
            keyring,
            token_registry,
            state: Mutex::new(RunState::default()),
            next_task_id: AtomicU64::new(1),
        })
    }

    /// Resolves once the coalesced run this call joined or started has
    /// delivered its result.
    pub async fn discover(self: &Arc<Self>) -> Vec<Allowance> {
        let (tx, rx) = oneshot::channel();

        let already_running = {
            let mut state = self.state.lock().await;
            state.pending_callbacks.push(tx);
            if state.running {
                true
            } else {
                state.running = true;
                false
            }
        };

        if already_running {
            debug!("discover() coalesced into an in-flight run");
            return rx.await.unwrap_or_default();
        }

        self.start_run().await;
        rx.await.unwrap_or_default()
    }

    async fn start_run(self: &Arc<Self>) {
        let accounts = self.keyring.evm_accounts().await;
        let chains = self.token_registry.supported_chains();

        if accounts.is_empty() || chains.is_empty() {
            info!("discover(): empty account or chain enumeration, delivering empty result");
            self.deliver_immediately(Vec::new()).await;
            return;
        }

        let generation = {
            let state = self.state.lock().await;
            state.generation
        };

        // Resolve every chain's contract list before spawning anything. A
        // spawned task can complete (and call back into `on_task_complete`)
        // before this async function next yields, so `expected_tasks` must
        // already reflect the full task count by the time the first task is
        // spawned — otherwise a fast completion could see `completed_tasks
        // >= expected_tasks` (still its zero default) and finalize the run
        // after only one of many tasks has reported.
        let mut chain_contracts = Vec::with_capacity(chains.len());
        for chain_id in &chains {
            let contracts = self.token_registry.token_contracts(chain_id).await;
            if !contracts.is_empty() {
                chain_contracts.push((chain_id.clone(), contracts));
            }
        }

        let total_tasks = chain_contracts.len() * accounts.len();
        if total_tasks == 0 {
            info!("discover(): no token contracts configured on any supported chain");
            self.deliver_immediately(Vec::new()).await;
            return;
        }

        {
            let mut state = self.state.lock().await;
            state.expected_tasks = total_tasks;
            state.completed_tasks = 0;
        }

        for (chain_id, contracts) in chain_contracts {
            for approver in &accounts {
                self.spawn_task(generation, chain_id.clone(), approver.clone(), contracts.clone())
                    .await;
            }
        }
    }

    async fn spawn_task(
        self: &Arc<Self>,
        generation: u64,
        chain_id: ChainId,
        approver: Address32Padded,
        contracts: Vec<Address20>,
    ) {
        let task_id = self.next_task_id.fetch_add(1, Ordering::SeqCst);
        {
            let mut state = self.state.lock().await;
            state
                .task_table
                .insert(task_id, TaskOutcome::Pending);
        }

        let scanner = Arc::clone(self);
        tokio::spawn(async move {
            let cache = AllowanceCacheStore::new(&*scanner.kv_store);
            let prior_cache_map = cache
                .load_allowances(&chain_id, &approver)
                .await
                .unwrap_or_default();
            let checkpoint = cache
                .load_checkpoint(&chain_id, &approver)
                .await
                .unwrap_or(None);

            let inputs = ChainScanTaskInputs {
                task_id,
                chain_id,
                approver,
                contracts,
                checkpoint,
                prior_cache_map,
            };

            let result = run_chain_scan_task(&*scanner.client, inputs).await;
            if result.is_none() {
                warn!(task_id, "chain scan task produced no result (transport failure)");
            }
            scanner.on_task_complete(generation, task_id, result).await;
        });
    }

    /// Invoked by a task on completion.
    async fn on_task_complete(
        self: &Arc<Self>,
        generation: u64,
        task_id: u64,
        result: Option<ChainScanResult>,
    ) {
        let (table, callbacks) = {
            let mut state = self.state.lock().await;
            if generation != state.generation {
                let err = crate::error::Error::aborted();
                debug!(task_id, %err, "discarding late completion from a prior generation");
                return;
            }

            state.task_table.insert(
                task_id,
                match result {
                    Some(r) => TaskOutcome::Completed(r),
                    None => TaskOutcome::Aborted,
                },
            );
            state.completed_tasks += 1;

            if state.completed_tasks < state.expected_tasks {
                return;
            }

            state.running = false;
            (
                std::mem::take(&mut state.task_table),
                std::mem::take(&mut state.pending_callbacks),
            )
        };

        self.finalize(table, callbacks).await;
    }

    /// Writes the cache and delivers the merged result to every queued
    /// callback in FIFO order.
    async fn finalize(
        &self,
        table: HashMap<u64, TaskOutcome>,
        callbacks: Vec<oneshot::Sender<Vec<Allowance>>>,
    ) {
        let mut per_chain: HashMap<ChainId, (BTreeMap<Address32Padded, U256>, Vec<Allowance>)> =
            HashMap::new();

        for outcome in table.into_values() {
            let TaskOutcome::Completed(result) = outcome else {
                continue;
            };
            // The checkpoint advances only when `eth_getLogs` returned at
            // least one non-pending log (spec.md §8 scenario 4: malformed
            // topics still advances the checkpoint) — a task that completed
            // but saw nothing but pending logs leaves the chain's cache
            // entry for that approver untouched (scenario 3), even though
            // `eth_blockNumber` itself succeeded. A task that never
            // completed at all (transport failure, or reset) is already
            // excluded above.
            if !result.saw_mined_log {
                continue;
            }
            let entry = per_chain.entry(result.chain_id.clone()).or_default();
            entry.0.insert(result.approver.clone(), result.latest_block);
            entry.1.extend(result.allowances.into_values());
        }

        let cache = AllowanceCacheStore::new(&*self.kv_store);
        for (chain_id, (checkpoints, allowances)) in &per_chain {
            if let Err(err) = cache.write_chain(chain_id, checkpoints, allowances).await {
                warn!(%chain_id, error = %err, "failed to write allowance cache for chain");
            }
        }

        let mut all: Vec<Allowance> = per_chain.into_values().flat_map(|(_, v)| v).collect();
        all.sort_by(|a, b| {
            a.chain_id
                .as_str()
                .cmp(b.chain_id.as_str())
                .then_with(|| a.contract_address.to_checksum().cmp(&b.contract_address.to_checksum()))
                .then_with(|| {
                    a.spender_address
                        .as_str()
                        .to_ascii_lowercase()
                        .cmp(&b.spender_address.as_str().to_ascii_lowercase())
                })
        });

        info!(count = all.len(), "discover() run finalized");
        self.dispatch(all, callbacks);
    }

    async fn deliver_immediately(&self, result: Vec<Allowance>) {
        let callbacks = {
            let mut state = self.state.lock().await;
            state.running = false;
            std::mem::take(&mut state.pending_callbacks)
        };
        self.dispatch(result, callbacks);
    }

    fn dispatch(&self, result: Vec<Allowance>, callbacks: Vec<oneshot::Sender<Vec<Allowance>>>) {
        for tx in callbacks {
            let _ = tx.send(result.clone());
        }
    }

    /// Aborts the in-flight run, if any: queued
    /// callers get an empty result immediately, the task table is
    /// discarded, and any RPC completions still in flight will find a
    /// stale generation and no-op when they arrive.
    pub async fn reset(self: &Arc<Self>) {
        let callbacks = {
            let mut state = self.state.lock().await;
            state.generation = state.generation.wrapping_add(1);
            state.running = false;
            state.task_table.clear();
            state.expected_tasks = 0;
            state.completed_tasks = 0;
            std::mem::take(&mut state.pending_callbacks)
        };
        info!("reset(): aborting in-flight run, if any");
        self.dispatch(Vec::new(), callbacks);
    }
}
