//! Credential Handlers

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use anchor_core::{CredentialRecord, Hash32};
use anchor_ledger::TxHash;

use crate::api::error::ApiError;
use crate::api::handlers::AppState;
use crate::core::IssueCredentialRequest;

/// Response from credential issuance
#[derive(Debug, Serialize)]
pub struct IssueCredentialResponse {
    pub transaction_hash: TxHash,
    pub credential_hash: Hash32,
}

/// Credentials held by one address
#[derive(Debug, Serialize)]
pub struct PullCredentialsResponse {
    pub credentials: Vec<CredentialRecord>,
    pub count: usize,
}

/// Issue a credential on behalf of a registered issuer
///
/// POST /v1/credentials
pub async fn issue_credential(
    State(state): State<Arc<AppState>>,
    Json(request): Json<IssueCredentialRequest>,
) -> Result<Json<IssueCredentialResponse>, ApiError> {
    let issued = state.issuer.issue_credential(&request).await?;
    Ok(Json(IssueCredentialResponse {
        transaction_hash: issued.receipt.transaction_hash,
        credential_hash: issued.credential_hash,
    }))
}

/// Credentials stored on the ledger for a holder
///
/// GET /v1/credentials/{holder}
pub async fn pull_credentials(
    State(state): State<Arc<AppState>>,
    Path(holder): Path<String>,
) -> Result<Json<PullCredentialsResponse>, ApiError> {
    let credentials = state.issuer.pull_credentials(&holder).await?;
    let count = credentials.len();
    Ok(Json(PullCredentialsResponse { credentials, count }))
}
