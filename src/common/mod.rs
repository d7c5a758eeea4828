//! Core data model shared across the scanner (spec.md §3).

mod address;
mod amount;

pub use address::{Address20, Address32Padded};
pub use amount::Amount;

use std::fmt;
use std::hash::{Hash, Hasher};

/// A chain identifier, e.g. `0x1` for Ethereum mainnet. Lowercase hex with a
/// `0x` prefix; equality is case-insensitive, and the canonical form stored
/// internally is lowercase since nothing downstream needs to observe the
/// original casing (unlike `Address32Padded`, which does).
#[derive(Clone, Debug)]
pub struct ChainId(String);

impl ChainId {
    pub fn new(s: impl AsRef<str>) -> Self {
        Self(s.as_ref().to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl PartialEq for ChainId {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for ChainId {}

impl Hash for ChainId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl Ord for ChainId {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}

impl PartialOrd for ChainId {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The six chains the source hardcodes as the allowance-discovery set.
/// Kept here as a default for parity with the original implementation;
/// callers can supply a different set via `TokenRegistry::supported_chains`.
pub fn default_supported_chains() -> Vec<ChainId> {
    ["0x1", "0x89", "0xa86a", "0xa4ec", "0xa4b1", "0xa"]
        .into_iter()
        .map(ChainId::new)
        .collect()
}

/// One ERC-20 allowance: an approver granting a spender the right to move
/// up to `amount` of `contract_address`'s token. Key identity is the triple
/// `(contract_address, approver_address, spender_address)`.
#[derive(Clone, Debug)]
pub struct Allowance {
    pub chain_id: ChainId,
    pub contract_address: Address20,
    pub approver_address: Address32Padded,
    pub spender_address: Address32Padded,
    pub amount: Amount,
}

/// The `(contract_address, approver_address, spender_address)` triple that
/// identifies one allowance, normalized for use as a map key: `Address32Padded`
/// already compares case-insensitively, and the contract address is
/// lowercased the same way since a log's `address` field may arrive in any
/// casing.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AllowanceKey {
    contract_address_lower: String,
    approver_address: Address32Padded,
    spender_address: Address32Padded,
}

impl AllowanceKey {
    pub fn new(
        contract_address: &Address20,
        approver_address: Address32Padded,
        spender_address: Address32Padded,
    ) -> Self {
        Self {
            contract_address_lower: contract_address.to_checksum().to_ascii_lowercase(),
            approver_address,
            spender_address,
        }
    }
}
