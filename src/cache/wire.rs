//! The on-disk JSON shape of the allowance cache (spec.md §6), kept
//! separate from the in-memory [`Allowance`](crate::common::Allowance) type
//! so that a malformed field can be dropped without poisoning the rest of
//! the document.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::common::{Address20, Address32Padded, Allowance, AllowanceKey, ChainId};

/// The whole cache document: one entry per chain id, keyed by the chain's
/// string form (e.g. `"0x1"`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheDocument {
    #[serde(flatten)]
    pub chains: BTreeMap<String, ChainCacheEntryWire>,
}

/// One chain's cache section, exactly as stored (spec.md §6).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChainCacheEntryWire {
    pub allowances_found: Vec<AllowanceWire>,
    pub last_block_number: BTreeMap<String, String>,
}

/// One allowance, in its raw hex-string field form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllowanceWire {
    pub contract_address: String,
    pub approver_address: String,
    pub spender_address: String,
    pub amount: String,
}

impl AllowanceWire {
    pub fn from_allowance(allowance: &Allowance) -> Self {
        Self {
            contract_address: allowance.contract_address.to_checksum(),
            approver_address: allowance.approver_address.as_str().to_string(),
            spender_address: allowance.spender_address.as_str().to_string(),
            amount: allowance.amount.to_hex(),
        }
    }

    /// Parses this entry back into an `(AllowanceKey, Allowance)` pair,
    /// returning `None` on any malformed field (spec.md §4.3, §6: malformed
    /// entries are dropped silently) or when the entry's approver does not
    /// match the approver this load is scoped to.
    pub fn to_allowance(
        &self,
        chain_id: &ChainId,
        expected_approver: &Address32Padded,
    ) -> Option<(AllowanceKey, Allowance)> {
        let contract_address = Address20::parse(&self.contract_address).ok()?;
        let approver_address = Address32Padded::parse(&self.approver_address).ok()?;
        if &approver_address != expected_approver {
            return None;
        }
        let spender_address = Address32Padded::parse(&self.spender_address).ok()?;
        let amount = crate::common::Amount::from_hex(&self.amount).ok()?;
        if amount.is_zero() {
            // Invariant (spec.md §3): amount=0 entries are never persisted;
            // if one slipped in anyway, it is not a valid allowance.
            return None;
        }

        let key = AllowanceKey::new(&contract_address, approver_address.clone(), spender_address.clone());
        let allowance = Allowance {
            chain_id: chain_id.clone(),
            contract_address,
            approver_address,
            spender_address,
            amount,
        };
        Some((key, allowance))
    }
}
