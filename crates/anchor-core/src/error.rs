//! Error types for the anchor core

use thiserror::Error;

/// Result type alias using AnchorError
pub type Result<T> = std::result::Result<T, AnchorError>;

/// Errors that can occur while parsing identities, recovering signers or
/// building Merkle proofs
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnchorError {
    /// Input was not valid hexadecimal
    #[error("Invalid hex encoding: {0}")]
    InvalidHex(String),

    /// Decoded value had the wrong number of bytes
    #[error("Invalid length for {what}: expected {expected} bytes, got {actual}")]
    InvalidLength {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Malformed account address
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Malformed signature or failed recovery
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    /// Key material rejected by the curve implementation
    #[error("Cryptographic error: {0}")]
    CryptoError(String),

    /// A Merkle tree could not be built over the given leaves
    #[error("Merkle tree error: {0}")]
    MerkleError(String),

    /// Leaf index outside the tree
    #[error("Leaf index {index} out of bounds (num leaves: {len})")]
    LeafOutOfBounds { index: usize, len: usize },
}

impl From<hex::FromHexError> for AnchorError {
    fn from(err: hex::FromHexError) -> Self {
        AnchorError::InvalidHex(err.to_string())
    }
}

impl From<k256::ecdsa::Error> for AnchorError {
    fn from(err: k256::ecdsa::Error) -> Self {
        AnchorError::CryptoError(err.to_string())
    }
}
