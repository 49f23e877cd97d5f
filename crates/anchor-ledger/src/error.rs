//! Error types for ledger access

use thiserror::Error;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Errors that can occur while talking to the ledger
#[derive(Error, Debug)]
pub enum LedgerError {
    /// The node answered with a JSON-RPC error object
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// Transport-level failure
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Response could not be interpreted
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// ABI or RLP encoding/decoding failure
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Transaction could not be signed
    #[error("Signing error: {0}")]
    Signing(String),

    /// The transaction was never accepted by the node
    #[error("Submission rejected: {0}")]
    Rejected(String),

    /// No confirmation within the allowed time
    #[error("Timed out waiting for confirmation after {0:?}")]
    Timeout(std::time::Duration),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<reqwest::Error> for LedgerError {
    fn from(err: reqwest::Error) -> Self {
        LedgerError::HttpError(err.to_string())
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        LedgerError::InvalidResponse(err.to_string())
    }
}

impl From<anchor_core::AnchorError> for LedgerError {
    fn from(err: anchor_core::AnchorError) -> Self {
        LedgerError::Signing(err.to_string())
    }
}
