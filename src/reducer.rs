//! `AllowanceReducer`: folds a prior allowance map plus a batch of Approval
//! logs into the current allowance map for one `(chain, approver)`.

use std::collections::BTreeMap;

use ethers_core::types::U256;

use crate::cache::LoadedAllowances;
use crate::common::{Address32Padded, Allowance, AllowanceKey, ChainId};
use crate::rpc::fetcher::LogRecord;

/// The result of one fold: the allowances that remain positive afterward,
/// the highest block number considered, and whether `logs` contained at
/// least one non-pending (mined) entry.
///
/// `saw_mined_log` is tracked independently of the topics/amount filters
/// below it: a log can be mined (`block_number != 0`) yet still be
/// malformed (too few topics, unparseable amount) and contribute nothing to
/// `allowances`. The checkpoint-advance decision in
/// `AllowanceScanner::finalize` needs exactly this bit, not "did any
/// allowance survive" — `eth_getLogs` having returned a real log is what
/// makes the observed block range meaningfully scanned, independent of
/// whether that log happened to decode into a usable allowance.
pub struct ReduceOutcome {
    pub allowances: BTreeMap<AllowanceKey, Allowance>,
    pub max_block_number: Option<U256>,
    pub saw_mined_log: bool,
}

/// Folds `logs` over `prior`, following the ordering and skip rules that
/// keep revocations from being overwritten by a same-block earlier
/// approval. Pure and synchronous: no suspension points.
pub struct AllowanceReducer;

impl AllowanceReducer {
    pub fn fold(
        chain_id: &ChainId,
        approver: &Address32Padded,
        prior: LoadedAllowances,
        mut logs: Vec<LogRecord>,
    ) -> ReduceOutcome {
        // Whether `eth_getLogs` returned at least one non-pending log,
        // computed before any topics/amount filtering so a malformed-but-
        // mined log still counts (spec.md §8 scenario 4 vs. scenario 3).
        let saw_mined_log = logs.iter().any(|log| !log.block_number.is_zero());

        // Step 1: seed the working map with the prior cache.
        let mut working: BTreeMap<AllowanceKey, Allowance> = BTreeMap::new();
        let mut max_block_number: Option<U256> = None;
        for (key, (checkpoint, allowance)) in prior {
            working.insert(key, allowance);
            max_block_number = Some(match max_block_number {
                Some(current) if current >= checkpoint => current,
                _ => checkpoint,
            });
        }

        // Step 2: sort by (block_number ASC, log_index ASC), stable.
        logs.sort_by(|a, b| {
            a.block_number
                .cmp(&b.block_number)
                .then(a.log_index.cmp(&b.log_index))
        });

        for log in logs {
            // Step 3: filter pending logs and malformed topic shapes.
            if log.block_number.is_zero() || log.topics.len() < 3 {
                continue;
            }

            // Step 4: decode the amount; skip the log on failure.
            let Ok(amount) = crate::common::Amount::from_hex(&log.data) else {
                continue;
            };

            let spender_address = match Address32Padded::parse(&format!("{:#x}", log.topics[2])) {
                Ok(addr) => addr,
                Err(_) => continue,
            };
            let key = AllowanceKey::new(&log.address, approver.clone(), spender_address.clone());

            if amount.is_zero() {
                working.remove(&key);
            } else {
                working.insert(
                    key,
                    Allowance {
                        chain_id: chain_id.clone(),
                        contract_address: log.address,
                        approver_address: approver.clone(),
                        spender_address,
                        amount,
                    },
                );
            }

            // Step 5: track the highest block number considered.
            max_block_number = Some(match max_block_number {
                Some(current) if current >= log.block_number => current,
                _ => log.block_number,
            });
        }

        ReduceOutcome {
            allowances: working,
            max_block_number,
            saw_mined_log,
        }
    }
}
