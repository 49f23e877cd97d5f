//! # Anchor Core
//!
//! Core types and cryptographic primitives for anchoring an issuer trust
//! registry on a ledger.
//!
//! ## Key Concepts
//!
//! - **Issuer**: a credential-issuing authority identified by its account address
//! - **Leaf**: domain-separated hash of an issuer's canonical fields
//! - **Root**: Merkle root over all leaves, the value committed on the ledger
//! - **Inclusion proof**: sibling path from a leaf up to the root
//! - **Approval**: an administrator's EIP-191 signature over
//!   `"Update Merkle Root: {root}"`
//!
//! ## Invariants
//!
//! 1. **Determinism**: the root is a pure function of the issuer set
//! 2. **Sensitivity**: changing any canonical field of any issuer changes the root
//! 3. **Soundness**: every proof produced for a member folds back to the root

pub mod crypto;
pub mod error;
pub mod merkle;
pub mod types;

pub use crypto::{keccak256, recover_personal_signer, KeyPair, RecoverableSignature};
pub use error::{AnchorError, Result};
pub use merkle::{leaf_hash, InclusionProof, MerkleTree, ProofStep};
pub use types::{Address, CredentialRecord, Hash32, Issuer, RootHash};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Message an administrator signs to approve a root
///
/// `root` is used exactly as the signer rendered it.
pub fn approval_message(root: &str) -> String {
    format!("Update Merkle Root: {}", root)
}

/// Message an issuer signs to register (or rename) itself
pub fn registration_message(address: &Address, name: &str) -> String {
    format!("{},{}", address, name)
}
