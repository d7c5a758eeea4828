//! Address types and the `AddressCodec` component (spec.md §4.1).
//!
//! Two renderings coexist, matching the REDESIGN FLAGS note about
//! implicit string-typed addresses: `Address20` is the 20-byte contract/EOA
//! form, byte-exact and checksum-rendered on output; `Address32Padded` is
//! the 32-byte topic-encoded form that approvers and spenders are always
//! stored as. `Address32Padded` keeps the raw hex string it was built from
//! (rather than normalizing into bytes) because the spec requires the exact
//! casing a log or a cached entry arrived with to survive a round trip,
//! while still comparing equal case-insensitively.

use ethers_core::types::H160;
use ethers_core::utils::to_checksum;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::error::{Error, Result};

/// A 20-byte EVM address (contract or externally-owned account).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address20(H160);

impl Address20 {
    /// Parses a `0x`-prefixed, 40-hex-character address. Case-insensitive;
    /// bytes are canonical so no casing information is lost or needed.
    pub fn parse(s: &str) -> Result<Self> {
        let stripped = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .ok_or_else(|| Error::decode(format!("address missing 0x prefix: {s}")))?;
        if stripped.len() != 40 || !stripped.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(Error::decode(format!("not a 20-byte hex address: {s}")));
        }
        let mut bytes = [0u8; 20];
        hex::decode_to_slice(stripped, &mut bytes)
            .map_err(|e| Error::decode(format!("invalid address hex {s}: {e}")))?;
        Ok(Self(H160::from(bytes)))
    }

    pub fn from_h160(h: H160) -> Self {
        Self(h)
    }

    pub fn inner(&self) -> H160 {
        self.0
    }

    /// `AddressCodec::to_checksum` — standard EIP-55 checksum casing.
    pub fn to_checksum(&self) -> String {
        to_checksum(&self.0, None)
    }

    /// `AddressCodec::pad_to_topic` — left-pads with 12 zero bytes to the
    /// 32-byte topic-encoded form used inside event topics and the cache.
    pub fn pad_to_topic(&self) -> Address32Padded {
        let mut padded = String::with_capacity(66);
        padded.push_str("0x");
        padded.push_str(&"0".repeat(24));
        for byte in self.0.as_bytes() {
            padded.push_str(&format!("{byte:02x}"));
        }
        Address32Padded(padded)
    }
}

impl fmt::Debug for Address20 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address20({})", self.to_checksum())
    }
}

impl fmt::Display for Address20 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_checksum())
    }
}

/// A 32-byte zero-padded address as it appears in event topics and in the
/// persistent cache. Equality and hashing are case-insensitive; the raw
/// string is preserved verbatim for serialization (open question in
/// spec.md §9: casing is never canonicalized on write).
#[derive(Clone, Debug)]
pub struct Address32Padded(String);

impl Address32Padded {
    /// Parses a `0x`-prefixed, 64-hex-character padded address, preserving
    /// the exact casing of the input.
    pub fn parse(s: &str) -> Result<Self> {
        let stripped = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .ok_or_else(|| Error::decode(format!("padded address missing 0x prefix: {s}")))?;
        if stripped.len() != 64 || !stripped.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(Error::decode(format!("not a 32-byte hex padded address: {s}")));
        }
        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl PartialEq for Address32Padded {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Eq for Address32Padded {}

impl Hash for Address32Padded {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_ascii_lowercase().hash(state);
    }
}

impl Ord for Address32Padded {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.to_ascii_lowercase().cmp(&other.0.to_ascii_lowercase())
    }
}

impl PartialOrd for Address32Padded {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Address32Padded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pad_to_topic_left_pads_with_zero_bytes() {
        let addr = Address20::parse("0xF81229FBED5A3E0aeA77Cf12E2C0D2f5aA437Db5").unwrap();
        let padded = addr.pad_to_topic();
        assert_eq!(padded.as_str().len(), 66);
        assert!(padded.as_str().starts_with("0x000000000000000000000000"));
        assert!(padded.as_str().to_lowercase().ends_with("f81229fbed5a3e0aea77cf12e2c0d2f5aa437db5"));
    }

    #[test]
    fn address32_equality_is_case_insensitive() {
        let too_long = Address32Padded::parse(
            "0x000000000000000000000000f81229fbed5a3e0aea77cf12e2c0d2f5aa437db55",
        );
        assert!(too_long.is_err());

        let a = Address32Padded::parse(
            "0x000000000000000000000000f81229fbed5a3e0aea77cf12e2c0d2f5aa437db5",
        )
        .unwrap();
        let b = Address32Padded::parse(
            "0x000000000000000000000000F81229FBED5A3E0AEA77CF12E2C0D2F5AA437DB5",
        )
        .unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "0x000000000000000000000000f81229fbed5a3e0aea77cf12e2c0d2f5aa437db5");
        assert_eq!(b.as_str(), "0x000000000000000000000000F81229FBED5A3E0AEA77CF12E2C0D2F5AA437DB5");
    }

    #[test]
    fn parse_rejects_missing_prefix() {
        assert!(Address20::parse("F81229FBED5A3E0aeA77Cf12E2C0D2f5aA437Db5").is_err());
    }
}
