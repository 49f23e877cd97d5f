//! Issuer Registration Handlers
//!
//! Issuers register themselves by signing `"{address},{name}"` with the key
//! behind `address`. Registration changes the live root but never touches the
//! ledger; the new root still needs two administrator approvals.

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use anchor_core::{
    recover_personal_signer, registration_message, Address, Issuer, RecoverableSignature, RootHash,
};

use crate::api::error::ApiError;
use crate::api::handlers::AppState;
use crate::core::{parse_address, require_non_empty};
use crate::storage::IssuerRecord;

/// Request to register or rename an issuer
#[derive(Debug, Deserialize)]
pub struct RegisterIssuerRequest {
    pub address: String,
    pub name: String,
    /// EIP-191 signature by `address` over `"{address},{name}"`
    pub signature: String,
    /// Issuer-chosen randomness; ignored when the address is already registered
    pub entropy: String,
}

/// Response from issuer registration
#[derive(Debug, Serialize)]
pub struct RegisterIssuerResponse {
    pub address: Address,
    pub name: String,
    pub registered_at: DateTime<Utc>,
    /// Registry root after this registration
    pub root: RootHash,
}

/// One registered issuer, without its entropy
#[derive(Debug, Serialize)]
pub struct IssuerEntry {
    pub address: Address,
    pub name: String,
    pub registered_at: DateTime<Utc>,
}

/// Registered issuers
#[derive(Debug, Serialize)]
pub struct ListIssuersResponse {
    pub issuers: Vec<IssuerEntry>,
    pub count: usize,
}

/// Register an issuer, or rename an existing one
///
/// POST /v1/issuers
pub async fn register_issuer(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RegisterIssuerRequest>,
) -> Result<Json<RegisterIssuerResponse>, ApiError> {
    let address = parse_address("address", &request.address)?;
    let name = require_non_empty("name", &request.name)?;
    require_non_empty("signature", &request.signature)?;
    let entropy = require_non_empty("entropy", &request.entropy)?;

    let signature = RecoverableSignature::from_hex(&request.signature)
        .map_err(|e| ApiError::InvalidSignature(e.to_string()))?;
    let signer = recover_personal_signer(&registration_message(&address, name), &signature)
        .map_err(|e| ApiError::InvalidSignature(e.to_string()))?;
    if signer != address {
        warn!(
            address = %address,
            recovered = %signer,
            "SECURITY: Issuer registration signed by a different key"
        );
        return Err(ApiError::InvalidSignature(format!(
            "registration was signed by {}, not {}",
            signer, address
        )));
    }

    let record = IssuerRecord::new(Issuer::new(address, name, entropy), request.signature.clone());
    let stored = state.store.upsert_issuer(record).await?;
    let root = state.registry.compute_root().await?;

    info!(address = %address, name = %stored.issuer.name, root = %root, "Issuer registered");

    Ok(Json(RegisterIssuerResponse {
        address,
        name: stored.issuer.name,
        registered_at: stored.registered_at,
        root,
    }))
}

/// List registered issuers in address order
///
/// GET /v1/issuers
pub async fn list_issuers(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ListIssuersResponse>, ApiError> {
    let mut issuers: Vec<IssuerEntry> = state
        .store
        .list_issuers()
        .await?
        .into_iter()
        .map(|r| IssuerEntry {
            address: r.issuer.address,
            name: r.issuer.name,
            registered_at: r.registered_at,
        })
        .collect();
    issuers.sort_by_key(|i| i.address);
    let count = issuers.len();

    Ok(Json(ListIssuersResponse { issuers, count }))
}
