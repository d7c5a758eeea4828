//! `TopicHasher`.
//!
//! Computes the Keccak-256 digest of the `Approval(address,address,uint256)`
//! event signature once, at first use, and exposes it as a 32-byte constant.
//! Mirrors the `static CONFIG_UPDATE_TOPIC: Lazy<H256> = Lazy::new(...)`
//! pattern used for the same purpose in `magi::l1::chain_watcher`.

use ethers_core::types::H256;
use ethers_core::utils::keccak256;
use once_cell::sync::Lazy;

const APPROVAL_EVENT_SIGNATURE: &str = "Approval(address,address,uint256)";

/// The Keccak-256 topic hash of `Approval(address,address,uint256)`.
pub static APPROVAL_TOPIC: Lazy<H256> =
    Lazy::new(|| H256::from_slice(&keccak256(APPROVAL_EVENT_SIGNATURE.as_bytes())));
