//! `AllowanceCacheStore` (spec.md §4.3, §6): typed read/write of the
//! persistent allowance cache over an injected [`KeyValueStore`].

mod wire;

pub use wire::{AllowanceWire, CacheDocument, ChainCacheEntryWire};

use std::collections::BTreeMap;

use async_trait::async_trait;
use ethers_core::types::U256;

use crate::common::{Address20, Address32Padded, Allowance, AllowanceKey, ChainId};
use crate::error::Result;

/// The root key under which the whole cache document lives in the
/// preference store.
pub const CACHE_ROOT_KEY: &str = "wallet.eth_allowances_cache";

/// The external preference-storage collaborator (spec.md §1, §6). Values
/// are opaque JSON-shaped documents keyed by string; the scanner only ever
/// reads and writes the single document rooted at [`CACHE_ROOT_KEY`].
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get_json(&self, key: &str) -> Result<Option<serde_json::Value>>;
    async fn set_json(&self, key: &str, value: serde_json::Value) -> Result<()>;
}

/// One loaded allowance entry paired with the checkpoint it was last seen
/// under, keyed by its [`AllowanceKey`] — the shape `load_allowances`
/// returns per spec.md §4.3.
pub type LoadedAllowances = BTreeMap<AllowanceKey, (U256, Allowance)>;

/// Typed access to the persistent cache document, backed by a
/// [`KeyValueStore`] handle. Every method is a pure transformation: reads
/// never mutate the store, and the only write path is [`write_chain`].
pub struct AllowanceCacheStore<'a> {
    store: &'a dyn KeyValueStore,
}

impl<'a> AllowanceCacheStore<'a> {
    pub fn new(store: &'a dyn KeyValueStore) -> Self {
        Self { store }
    }

    async fn load_document(&self) -> Result<CacheDocument> {
        match self.store.get_json(CACHE_ROOT_KEY).await? {
            Some(value) => Ok(serde_json::from_value(value).unwrap_or_default()),
            None => Ok(CacheDocument::default()),
        }
    }

    /// Loads every allowance persisted for `(chain_id, approver)`, skipping
    /// malformed entries silently (spec.md §4.3: "cache corruption must
    /// never block a new scan"). Returns an empty map if the chain section
    /// is absent, if `last_block_number` is absent, or if the checkpoint
    /// value for this approver isn't a valid hex u256.
    pub async fn load_allowances(
        &self,
        chain_id: &ChainId,
        approver: &Address32Padded,
    ) -> Result<LoadedAllowances> {
        let doc = self.load_document().await?;
        let Some(chain_entry) = doc.chains.get(chain_id.as_str()) else {
            return Ok(BTreeMap::new());
        };
        let Some(checkpoint_hex) = find_checkpoint(chain_entry, approver) else {
            return Ok(BTreeMap::new());
        };
        let Ok(checkpoint) = crate::common::Amount::from_hex(&checkpoint_hex) else {
            return Ok(BTreeMap::new());
        };

        let mut out = BTreeMap::new();
        for wire in &chain_entry.allowances_found {
            let Some((key, allowance)) = wire.to_allowance(chain_id, approver) else {
                continue;
            };
            out.insert(key, (checkpoint.0, allowance));
        }
        Ok(out)
    }

    /// `last_block_number[approver]` for one chain, if present and valid.
    pub async fn load_checkpoint(
        &self,
        chain_id: &ChainId,
        approver: &Address32Padded,
    ) -> Result<Option<U256>> {
        let doc = self.load_document().await?;
        let Some(chain_entry) = doc.chains.get(chain_id.as_str()) else {
            return Ok(None);
        };
        let Some(hex) = find_checkpoint(chain_entry, approver) else {
            return Ok(None);
        };
        Ok(crate::common::Amount::from_hex(&hex).ok().map(|a| a.0))
    }

    /// Rewrites one chain's section wholesale. If `allowances` is empty the
    /// chain section is left untouched by this call (spec.md §4.3: the
    /// orchestrator decides not to call in that case; this method simply
    /// honors the no-op when it is called anyway).
    pub async fn write_chain(
        &self,
        chain_id: &ChainId,
        checkpoints: &BTreeMap<Address32Padded, U256>,
        allowances: &[Allowance],
    ) -> Result<()> {
        if allowances.is_empty() && checkpoints.is_empty() {
            return Ok(());
        }

        let mut doc = self.load_document().await?;
        let mut entry = ChainCacheEntryWire::default();
        for allowance in allowances {
            entry.allowances_found.push(AllowanceWire::from_allowance(allowance));
        }
        for (approver, block) in checkpoints {
            entry
                .last_block_number
                .insert(approver.as_str().to_string(), crate::common::Amount(*block).to_hex());
        }
        doc.chains.insert(chain_id.as_str().to_string(), entry);

        let value = serde_json::to_value(&doc).map_err(|e| {
            crate::error::Error::cache(format!("failed to serialize cache document: {e}"))
        })?;
        self.store.set_json(CACHE_ROOT_KEY, value).await
    }
}

/// Case-insensitive lookup of an approver's checkpoint (spec.md §9: casing
/// is preserved on write, so lookups must not assume a canonical case).
fn find_checkpoint(entry: &ChainCacheEntryWire, approver: &Address32Padded) -> Option<String> {
    entry.last_block_number.iter().find_map(|(k, v)| {
        Address32Padded::parse(k)
            .ok()
            .filter(|parsed| parsed == approver)
            .map(|_| v.clone())
    })
}
