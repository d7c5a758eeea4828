//! `Amount`/`U256` hex codec (spec.md §3, §4.1).
//!
//! Stored and transmitted as a `0x`-prefixed hex string with no leading
//! zeros (except the literal value zero, rendered as `0x0`). Backed by
//! `ethers_core::types::U256`, whose `LowerHex` implementation already
//! produces exactly that rendering.

use ethers_core::types::U256;
use std::fmt;

use crate::error::{Error, Result};

/// An unsigned 256-bit integer rendered as `0x`-prefixed hex.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Hash)]
pub struct Amount(pub U256);

impl Amount {
    pub const ZERO: Amount = Amount(U256::zero());

    /// `AddressCodec::hex_to_u256` — fails on anything that isn't a
    /// `0x`-prefixed hex string fitting in 256 bits.
    pub fn from_hex(s: &str) -> Result<Self> {
        let stripped = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .ok_or_else(|| Error::decode(format!("amount missing 0x prefix: {s}")))?;
        if stripped.is_empty() || stripped.len() > 64 || !stripped.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(Error::decode(format!("not a valid u256 hex value: {s}")));
        }
        U256::from_str_radix(stripped, 16)
            .map(Amount)
            .map_err(|e| Error::decode(format!("invalid u256 hex {s}: {e}")))
    }

    /// `AddressCodec::u256_to_hex` — `0x`-prefixed lowercase, no leading
    /// zero padding (except `0x0`).
    pub fn to_hex(&self) -> String {
        format!("{:#x}", self.0)
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl fmt::Debug for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Amount({})", self.to_hex())
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}
