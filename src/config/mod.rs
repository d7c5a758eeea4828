//! Demo-binary configuration.
//!
//! `spec.md` §1 treats RPC transport and preference storage as external
//! collaborators and has no on-disk config file of its own — the Scanner's
//! only "configuration" is the supported-chain list and the per-chain RPC
//! endpoint, both supplied by the embedder. `magi`'s `figment`-based
//! file-config merging has no counterpart here; see DESIGN.md for the drop
//! note. This module only assembles what `bin/scan.rs` needs to run the
//! demo end to end.

use crate::common::{Address20, ChainId};

/// One chain's RPC endpoint and the token contracts to scan on it.
#[derive(Debug, Clone)]
pub struct ChainConfig {
    pub chain_id: ChainId,
    pub rpc_url: String,
    pub contracts: Vec<Address20>,
}

/// The demo binary's assembled configuration: one [`ChainConfig`] per chain
/// to scan, and the accounts to discover allowances for.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub chains: Vec<ChainConfig>,
    pub accounts: Vec<Address20>,
    pub cache_path: Option<std::path::PathBuf>,
}

impl Config {
    /// The RPC endpoint configured for `chain_id`, if any.
    pub fn rpc_url_for(&self, chain_id: &ChainId) -> Option<&str> {
        self.chains
            .iter()
            .find(|c| &c.chain_id == chain_id)
            .map(|c| c.rpc_url.as_str())
    }
}
