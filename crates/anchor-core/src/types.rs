//! Common types used across the anchor workspace

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::{AnchorError, Result};

/// Strip an optional `0x`/`0X` prefix
fn strip_0x(s: &str) -> &str {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}

/// Decode a hex string (optional `0x` prefix) into exactly `N` bytes
pub fn decode_fixed_hex<const N: usize>(s: &str, what: &'static str) -> Result<[u8; N]> {
    let bytes = hex::decode(strip_0x(s.trim()))?;
    let actual = bytes.len();
    bytes.try_into().map_err(|_| AnchorError::InvalidLength {
        what,
        expected: N,
        actual,
    })
}

/// Decode an arbitrary-length hex string with an optional `0x` prefix
pub fn decode_hex(s: &str) -> Result<Vec<u8>> {
    Ok(hex::decode(strip_0x(s.trim()))?)
}

/// Encode bytes as lowercase `0x`-prefixed hex
pub fn encode_hex(bytes: impl AsRef<[u8]>) -> String {
    format!("0x{}", hex::encode(bytes))
}

macro_rules! hex_serde {
    ($ty:ty) => {
        impl Serialize for $ty {
            fn serialize<S: Serializer>(
                &self,
                serializer: S,
            ) -> std::result::Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(
                deserializer: D,
            ) -> std::result::Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }

        impl fmt::Debug for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(self, f)
            }
        }
    };
}

/// A 20-byte ledger account address
///
/// Parsing accepts any hex case; the canonical rendering is lowercase with
/// a `0x` prefix, so two addresses compare equal regardless of how the
/// caller capitalized them.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address([u8; 20]);

impl Address {
    /// The all-zero address
    pub const ZERO: Address = Address([0u8; 20]);

    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Build an address from a 32-byte ABI word (right-aligned)
    pub fn from_word(word: &[u8; 32]) -> Self {
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&word[12..]);
        Self(bytes)
    }
}

impl FromStr for Address {
    type Err = AnchorError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let digits = strip_0x(trimmed);
        if digits.len() != 40 {
            return Err(AnchorError::InvalidAddress(format!(
                "expected 40 hex digits, got {} in '{}'",
                digits.len(),
                trimmed
            )));
        }
        let bytes = decode_fixed_hex::<20>(digits, "address")
            .map_err(|e| AnchorError::InvalidAddress(e.to_string()))?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

hex_serde!(Address);

/// A 32-byte digest (Merkle nodes, roots, credential and transaction hashes)
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Hash32([u8; 32]);

/// A Merkle root over the issuer set
pub type RootHash = Hash32;

impl Hash32 {
    /// The all-zero digest, used as the root of an empty registry
    pub const ZERO: Hash32 = Hash32([0u8; 32]);

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_bytes(self) -> [u8; 32] {
        self.0
    }

    /// Parse a 32-byte value from hex (optional `0x` prefix)
    pub fn from_hex(s: &str) -> Result<Self> {
        decode_fixed_hex::<32>(s, "hash").map(Self)
    }
}

impl FromStr for Hash32 {
    type Err = AnchorError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl fmt::Display for Hash32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl AsRef<[u8]> for Hash32 {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

hex_serde!(Hash32);

/// A credential-issuing authority
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issuer {
    /// Unique identifier, rendered lowercase
    pub address: Address,

    /// Human-readable name
    pub name: String,

    /// Opaque randomness contributed by the issuer; salts their leaf
    pub entropy: String,
}

impl Issuer {
    pub fn new(address: Address, name: impl Into<String>, entropy: impl Into<String>) -> Self {
        Self {
            address,
            name: name.into(),
            entropy: entropy.into(),
        }
    }
}

/// A credential as stored by the credential contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
    /// 32-byte credential digest
    pub credential_hash: Hash32,

    /// Issuing authority
    pub issuer: Address,

    /// Credential holder
    pub holder: Address,

    /// Issuance time (ledger block timestamp, seconds)
    pub issued_at: u64,

    /// Free-form payload: `"{issuer_name} {metadata}"`
    pub data: String,
}
