//! API error types and responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

use anchor_core::{Address, RootHash};

use crate::core::{CoordinatorError, IssuanceError, ValidationError};
use crate::registry::RegistryError;
use crate::storage::StorageError;

/// API error type
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Malformed credential hash: {0}")]
    MalformedCredentialHash(String),

    #[error("Unauthorized signer: {0}")]
    UnauthorizedSigner(Address),

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("Duplicate signer {admin} for root {root}")]
    DuplicateSigner { root: RootHash, admin: Address },

    #[error("Stale root")]
    StaleRoot { claimed: RootHash, current: RootHash },

    #[error("Submission in progress for root {0}")]
    SubmissionInProgress(RootHash),

    #[error("Issuer not found: {0}")]
    IssuerNotFound(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Ledger submission failed: {0}")]
    LedgerSubmissionFailed(String),

    #[error("Ledger timeout after {0:?}")]
    LedgerTimeout(Duration),

    #[error("Registry unavailable: {0}")]
    RegistryUnavailable(String),

    #[error("Proof construction failed: {0}")]
    ProofConstruction(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// API error response body
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// HTTP status and stable machine-readable code
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            ApiError::MalformedCredentialHash(_) => {
                (StatusCode::BAD_REQUEST, "MALFORMED_CREDENTIAL_HASH")
            }
            ApiError::UnauthorizedSigner(_) => (StatusCode::FORBIDDEN, "UNAUTHORIZED_SIGNER"),
            ApiError::InvalidSignature(_) => (StatusCode::UNAUTHORIZED, "INVALID_SIGNATURE"),
            ApiError::DuplicateSigner { .. } => (StatusCode::CONFLICT, "DUPLICATE_SIGNER"),
            ApiError::StaleRoot { .. } => (StatusCode::CONFLICT, "STALE_ROOT"),
            ApiError::SubmissionInProgress(_) => (StatusCode::CONFLICT, "SUBMISSION_IN_PROGRESS"),
            ApiError::IssuerNotFound(_) => (StatusCode::NOT_FOUND, "UNKNOWN_ISSUER"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::LedgerSubmissionFailed(_) => {
                (StatusCode::BAD_GATEWAY, "LEDGER_SUBMISSION_FAILED")
            }
            ApiError::LedgerTimeout(_) => (StatusCode::GATEWAY_TIMEOUT, "LEDGER_TIMEOUT"),
            ApiError::RegistryUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "REGISTRY_UNAVAILABLE")
            }
            ApiError::ProofConstruction(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "PROOF_CONSTRUCTION_ERROR")
            }
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let details = match &self {
            ApiError::StaleRoot { claimed, current } => Some(serde_json::json!({
                "claimed_root": claimed,
                "current_root": current,
            })),
            ApiError::DuplicateSigner { root, admin } => Some(serde_json::json!({
                "root": root,
                "admin_address": admin,
            })),
            _ => None,
        };

        let message = match &self {
            ApiError::StaleRoot { claimed, current } => {
                format!("Root {} is stale; the current root is {}", claimed, current)
            }
            other => other.to_string(),
        };

        let body = ErrorResponse {
            error: message,
            code: code.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<CoordinatorError> for ApiError {
    fn from(err: CoordinatorError) -> Self {
        match err {
            CoordinatorError::Validation(v) => v.into(),
            CoordinatorError::UnauthorizedSigner(admin) => ApiError::UnauthorizedSigner(admin),
            CoordinatorError::InvalidSignature(msg) => ApiError::InvalidSignature(msg),
            CoordinatorError::StaleRoot { claimed, current } => {
                ApiError::StaleRoot { claimed, current }
            }
            CoordinatorError::DuplicateSigner { root, admin } => {
                ApiError::DuplicateSigner { root, admin }
            }
            CoordinatorError::SubmissionInProgress(root) => ApiError::SubmissionInProgress(root),
            CoordinatorError::LedgerSubmissionFailed(msg) => ApiError::LedgerSubmissionFailed(msg),
            CoordinatorError::LedgerTimeout(waited) => ApiError::LedgerTimeout(waited),
            CoordinatorError::RegistryUnavailable(msg) => ApiError::RegistryUnavailable(msg),
            CoordinatorError::ProofConstruction(msg) => ApiError::ProofConstruction(msg),
        }
    }
}

impl From<IssuanceError> for ApiError {
    fn from(err: IssuanceError) -> Self {
        match err {
            IssuanceError::Validation(v) => v.into(),
            IssuanceError::MalformedCredentialHash(msg) => ApiError::MalformedCredentialHash(msg),
            err @ IssuanceError::UnknownIssuer { .. } => ApiError::IssuerNotFound(err.to_string()),
            IssuanceError::LedgerSubmissionFailed(msg) => ApiError::LedgerSubmissionFailed(msg),
            IssuanceError::LedgerTimeout(waited) => ApiError::LedgerTimeout(waited),
            IssuanceError::RegistryUnavailable(msg) => ApiError::RegistryUnavailable(msg),
            IssuanceError::ProofConstruction(msg) => ApiError::ProofConstruction(msg),
        }
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::Unavailable(msg) => ApiError::RegistryUnavailable(msg),
            err @ RegistryError::IssuerNotFound { .. } => ApiError::IssuerNotFound(err.to_string()),
            RegistryError::ProofConstruction(msg) => ApiError::ProofConstruction(msg),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        ApiError::RegistryUnavailable(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anchor_core::Hash32;

    #[test]
    fn test_status_table() {
        let root = Hash32::ZERO;
        let cases = [
            (ApiError::from(ValidationError::new("root", "bad")), 400, "VALIDATION_ERROR"),
            (
                ApiError::from(CoordinatorError::UnauthorizedSigner(Address::ZERO)),
                403,
                "UNAUTHORIZED_SIGNER",
            ),
            (
                ApiError::from(CoordinatorError::InvalidSignature("x".into())),
                401,
                "INVALID_SIGNATURE",
            ),
            (
                ApiError::from(CoordinatorError::SubmissionInProgress(root)),
                409,
                "SUBMISSION_IN_PROGRESS",
            ),
            (
                ApiError::from(CoordinatorError::LedgerTimeout(Duration::from_secs(1))),
                504,
                "LEDGER_TIMEOUT",
            ),
            (
                ApiError::from(IssuanceError::UnknownIssuer {
                    address: Address::ZERO,
                    name: "x".into(),
                }),
                404,
                "UNKNOWN_ISSUER",
            ),
            (
                ApiError::from(RegistryError::Unavailable("down".into())),
                503,
                "REGISTRY_UNAVAILABLE",
            ),
            (ApiError::LedgerSubmissionFailed("reverted".into()), 502, "LEDGER_SUBMISSION_FAILED"),
        ];

        for (err, status, code) in cases {
            let (s, c) = err.status_and_code();
            assert_eq!(s.as_u16(), status, "{}", code);
            assert_eq!(c, code);
        }
    }
}
