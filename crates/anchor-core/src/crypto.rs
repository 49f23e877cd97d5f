//! Cryptographic primitives for administrator approvals and ledger accounts
//!
//! Administrators approve a root by signing a personal message (EIP-191)
//! with their secp256k1 account key. The coordinator never receives a
//! public key: it recovers one from the signature and derives the account
//! address from it, then compares that with the claimed signer.
//!
//! Key types:
//! - `KeyPair`: secp256k1 signing key with its derived address
//! - `RecoverableSignature`: 65-byte `r || s || v` signature

use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use sha3::{Digest, Keccak256};
use std::fmt;
use std::str::FromStr;

use crate::error::{AnchorError, Result};
use crate::types::{decode_hex, encode_hex, Address, Hash32};

/// Keccak-256 digest of arbitrary bytes
pub fn keccak256(data: impl AsRef<[u8]>) -> Hash32 {
    let digest = Keccak256::digest(data.as_ref());
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    Hash32::from_bytes(out)
}

/// Digest signed by `personal_sign`: `"\x19Ethereum Signed Message:\n" || len || message`
pub fn eip191_hash(message: &[u8]) -> Hash32 {
    let mut hasher = Keccak256::new();
    hasher.update(b"\x19Ethereum Signed Message:\n");
    hasher.update(message.len().to_string().as_bytes());
    hasher.update(message);
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    Hash32::from_bytes(out)
}

/// Account address of a public key: last 20 bytes of keccak(x || y)
pub fn address_of(key: &VerifyingKey) -> Address {
    let point = key.to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&hash.as_bytes()[12..]);
    Address::from_bytes(bytes)
}

/// Recover the address that produced a personal-message signature
pub fn recover_personal_signer(message: &str, signature: &RecoverableSignature) -> Result<Address> {
    signature.recover_prehash(&eip191_hash(message.as_bytes()))
}

/// A recoverable secp256k1 signature (`r || s || v`)
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct RecoverableSignature {
    r: [u8; 32],
    s: [u8; 32],
    /// Normalized recovery id (0 or 1)
    v: u8,
}

impl RecoverableSignature {
    /// Parse 65 raw bytes; `v` may be 0/1 or 27/28
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != 65 {
            return Err(AnchorError::InvalidSignature(format!(
                "expected 65 bytes, got {}",
                bytes.len()
            )));
        }
        let v = match bytes[64] {
            0 | 1 => bytes[64],
            27 | 28 => bytes[64] - 27,
            other => {
                return Err(AnchorError::InvalidSignature(format!(
                    "invalid recovery byte {}",
                    other
                )))
            }
        };
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..64]);
        Ok(Self { r, s, v })
    }

    /// Parse a hex-encoded signature (optional `0x` prefix)
    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = decode_hex(s).map_err(|e| AnchorError::InvalidSignature(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    /// Serialize with the Ethereum-style `v` of 27/28
    pub fn to_bytes(&self) -> [u8; 65] {
        let mut out = [0u8; 65];
        out[..32].copy_from_slice(&self.r);
        out[32..64].copy_from_slice(&self.s);
        out[64] = self.v + 27;
        out
    }

    pub fn to_hex(&self) -> String {
        encode_hex(self.to_bytes())
    }

    pub fn r(&self) -> &[u8; 32] {
        &self.r
    }

    pub fn s(&self) -> &[u8; 32] {
        &self.s
    }

    /// Recovery id, 0 or 1
    pub fn recovery_id(&self) -> u8 {
        self.v
    }

    /// Recover the signer's address from a 32-byte prehash
    ///
    /// High-s signatures are rejected.
    pub fn recover_prehash(&self, hash: &Hash32) -> Result<Address> {
        let mut rs = [0u8; 64];
        rs[..32].copy_from_slice(&self.r);
        rs[32..].copy_from_slice(&self.s);
        let signature = Signature::from_slice(&rs)
            .map_err(|e| AnchorError::InvalidSignature(e.to_string()))?;
        let recovery_id = RecoveryId::from_byte(self.v)
            .ok_or_else(|| AnchorError::InvalidSignature("invalid recovery id".into()))?;
        let key = VerifyingKey::recover_from_prehash(hash.as_bytes(), &signature, recovery_id)
            .map_err(|e| AnchorError::InvalidSignature(e.to_string()))?;
        Ok(address_of(&key))
    }
}

impl fmt::Display for RecoverableSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for RecoverableSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecoverableSignature")
            .field("v", &self.v)
            .finish_non_exhaustive()
    }
}

impl FromStr for RecoverableSignature {
    type Err = AnchorError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

/// secp256k1 key pair used for personal-message and transaction signing
#[derive(Clone)]
pub struct KeyPair {
    signing_key: SigningKey,
    address: Address,
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("address", &self.address)
            .field("signing_key", &"[redacted]")
            .finish()
    }
}

impl KeyPair {
    /// Generate a new random key pair
    pub fn generate() -> Self {
        Self::from_signing_key(SigningKey::random(&mut OsRng))
    }

    pub fn from_signing_key(signing_key: SigningKey) -> Self {
        let address = address_of(signing_key.verifying_key());
        Self {
            signing_key,
            address,
        }
    }

    /// Create a key pair from a raw 32-byte secret
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self> {
        let signing_key = SigningKey::from_slice(bytes)?;
        Ok(Self::from_signing_key(signing_key))
    }

    /// Create a key pair from a hex-encoded secret (optional `0x` prefix)
    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = crate::types::decode_fixed_hex::<32>(s, "private key")?;
        Self::from_bytes(&bytes)
    }

    /// Account address controlled by this key
    pub fn address(&self) -> Address {
        self.address
    }

    /// Raw secret bytes
    pub fn secret_bytes(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        out.copy_from_slice(&self.signing_key.to_bytes());
        out
    }

    /// Sign a 32-byte prehash, returning a recoverable signature
    pub fn sign_prehash(&self, hash: &Hash32) -> Result<RecoverableSignature> {
        let (signature, recovery_id) = self.signing_key.sign_prehash_recoverable(hash.as_bytes())?;
        let bytes = signature.to_bytes();
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..]);
        Ok(RecoverableSignature {
            r,
            s,
            v: recovery_id.to_byte(),
        })
    }

    /// Sign a personal message the way wallets do for `personal_sign`
    pub fn sign_personal_message(&self, message: &str) -> Result<RecoverableSignature> {
        self.sign_prehash(&eip191_hash(message.as_bytes()))
    }
}
