//! Registry Root Handlers
//!
//! Read-only views of the live issuer tree: the current root and per-issuer
//! inclusion proofs.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use anchor_core::{Hash32, RootHash};

use crate::api::error::ApiError;
use crate::api::handlers::AppState;
use crate::core::{parse_address, require_non_empty};

/// Current registry root
#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub root: RootHash,
}

/// Query for an inclusion proof
#[derive(Debug, Deserialize)]
pub struct ProofQuery {
    /// Registered issuer name; must match the stored name exactly
    #[serde(default)]
    pub name: String,
}

/// Inclusion proof for one issuer
#[derive(Debug, Serialize)]
pub struct ProofResponse {
    pub leaf: Hash32,
    pub proof: Vec<Hash32>,
    /// `true` where the sibling sits on the left
    pub side_bits: Vec<bool>,
    pub root: RootHash,
}

/// Current root over all registered issuers
///
/// GET /v1/root
pub async fn get_root(State(state): State<Arc<AppState>>) -> Result<Json<RootResponse>, ApiError> {
    let root = state.registry.compute_root().await?;
    Ok(Json(RootResponse { root }))
}

/// Inclusion proof for a registered issuer
///
/// GET /v1/proof/{address}?name=
pub async fn get_proof(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
    Query(query): Query<ProofQuery>,
) -> Result<Json<ProofResponse>, ApiError> {
    let address = parse_address("address", &address)?;
    let name = require_non_empty("name", &query.name)?;

    let proof = state.registry.proof_for(&address, name).await?;
    Ok(Json(ProofResponse {
        leaf: proof.leaf,
        proof: proof.proof,
        side_bits: proof.side_bits,
        root: proof.root,
    }))
}
