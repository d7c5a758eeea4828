//! The account- and token-enumeration collaborators the orchestrator reads
//! from before spawning tasks. Both are external to the core subsystem;
//! this module only defines the seams and small in-memory implementations
//! suitable for the demo binary and for tests.

use async_trait::async_trait;

use crate::common::{Address32Padded, ChainId};

/// Enumerates the accounts capable of holding EVM allowances. Signing,
/// keyring internals, and address derivation are explicitly out of scope
/// beyond this enumeration.
#[async_trait]
pub trait Keyring: Send + Sync {
    /// All EVM-capable accounts, in padded 32-byte topic form.
    async fn evm_accounts(&self) -> Vec<Address32Padded>;
}

/// Enumerates the token contracts to scan per chain. Token list ingestion
/// itself is out of scope; this only exposes the filtered result for a
/// supported chain.
#[async_trait]
pub trait TokenRegistry: Send + Sync {
    /// The chains this registry has a token list for.
    fn supported_chains(&self) -> Vec<ChainId>;

    /// The token contracts to scan on `chain_id`, or an empty list if the
    /// chain is unsupported.
    async fn token_contracts(&self, chain_id: &ChainId) -> Vec<crate::common::Address20>;
}

/// A `Keyring`/`TokenRegistry` pair backed by in-memory vectors, useful for
/// the demo binary and for tests that don't need live enumeration.
pub struct StaticKeyring {
    accounts: Vec<Address32Padded>,
}

impl StaticKeyring {
    pub fn new(accounts: Vec<Address32Padded>) -> Self {
        Self { accounts }
    }
}

#[async_trait]
impl Keyring for StaticKeyring {
    async fn evm_accounts(&self) -> Vec<Address32Padded> {
        self.accounts.clone()
    }
}

/// A static per-chain token contract list.
pub struct StaticTokenRegistry {
    chains: Vec<(ChainId, Vec<crate::common::Address20>)>,
}

impl StaticTokenRegistry {
    pub fn new(chains: Vec<(ChainId, Vec<crate::common::Address20>)>) -> Self {
        Self { chains }
    }
}

#[async_trait]
impl TokenRegistry for StaticTokenRegistry {
    fn supported_chains(&self) -> Vec<ChainId> {
        self.chains.iter().map(|(id, _)| id.clone()).collect()
    }

    async fn token_contracts(&self, chain_id: &ChainId) -> Vec<crate::common::Address20> {
        self.chains
            .iter()
            .find(|(id, _)| id == chain_id)
            .map(|(_, contracts)| contracts.clone())
            .unwrap_or_default()
    }
}
