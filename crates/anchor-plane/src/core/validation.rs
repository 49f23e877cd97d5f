//! Request field validation
//!
//! Shared by the coordinator, the issuer and the HTTP handlers so that every
//! surface rejects malformed input the same way, before any state is read.

use thiserror::Error;

use anchor_core::{Address, Hash32};

/// A request field that is missing or malformed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid {field}: {reason}")]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

/// Reject empty or whitespace-only values
pub fn require_non_empty<'a>(
    field: &'static str,
    value: &'a str,
) -> Result<&'a str, ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new(field, "must not be empty"));
    }
    Ok(value)
}

/// Parse a `0x`-prefixed (or bare) 20-byte hex address
pub fn parse_address(field: &'static str, value: &str) -> Result<Address, ValidationError> {
    require_non_empty(field, value)?
        .parse()
        .map_err(|e: anchor_core::AnchorError| ValidationError::new(field, e.to_string()))
}

/// Parse a 32-byte hex digest
pub fn parse_hash(field: &'static str, value: &str) -> Result<Hash32, ValidationError> {
    require_non_empty(field, value)?
        .parse()
        .map_err(|e: anchor_core::AnchorError| ValidationError::new(field, e.to_string()))
}
