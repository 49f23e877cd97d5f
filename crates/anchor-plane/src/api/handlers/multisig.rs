//! Root Approval Handlers
//!
//! Administrators post their approval signatures here. The first approval of
//! a root is held pending; a second from a different administrator commits
//! the root on the ledger.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use anchor_core::RootHash;
use anchor_ledger::TxHash;

use crate::api::error::ApiError;
use crate::api::handlers::AppState;
use crate::core::{LastUpdate, SubmitOutcome};
use crate::notify::PendingSummary;

/// An administrator's approval of a root
#[derive(Debug, Deserialize)]
pub struct SubmitSignatureRequest {
    pub admin_address: String,
    /// EIP-191 signature over `"Update Merkle Root: {root}"`
    pub signature: String,
    /// The root exactly as it was signed
    pub root: String,
}

/// Outcome of an approval
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum SubmitSignatureResponse {
    AwaitingSecond {
        needs_second_signature: bool,
        root: RootHash,
    },
    Finalized {
        finalized: bool,
        root: RootHash,
        transaction_hash: TxHash,
    },
}

impl From<SubmitOutcome> for SubmitSignatureResponse {
    fn from(outcome: SubmitOutcome) -> Self {
        match outcome {
            SubmitOutcome::AwaitingSecond { root } => SubmitSignatureResponse::AwaitingSecond {
                needs_second_signature: true,
                root,
            },
            SubmitOutcome::Finalized {
                root,
                transaction_hash,
            } => SubmitSignatureResponse::Finalized {
                finalized: true,
                root,
                transaction_hash,
            },
        }
    }
}

/// Roots awaiting a second approval
#[derive(Debug, Serialize)]
pub struct PendingUpdatesResponse {
    pub pending: Vec<PendingSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_update: Option<LastUpdate>,
}

/// Acknowledgement of a clear request
#[derive(Debug, Serialize)]
pub struct ClearLastUpdateResponse {
    pub cleared: bool,
    pub message: String,
}

/// Submit an approval signature
///
/// POST /v1/multisig/signatures
pub async fn submit_signature(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SubmitSignatureRequest>,
) -> Result<Json<SubmitSignatureResponse>, ApiError> {
    let outcome = state
        .coordinator
        .submit_signature(&request.admin_address, &request.signature, &request.root)
        .await?;
    Ok(Json(outcome.into()))
}

/// Pending approvals and the last committed root
///
/// GET /v1/multisig/pending
pub async fn get_pending(State(state): State<Arc<AppState>>) -> Json<PendingUpdatesResponse> {
    Json(PendingUpdatesResponse {
        pending: state.coordinator.get_pending(),
        last_update: state.coordinator.get_last_update(),
    })
}

/// The last root committed on the ledger
///
/// GET /v1/multisig/last-update
pub async fn get_last_update(
    State(state): State<Arc<AppState>>,
) -> Result<Json<LastUpdate>, ApiError> {
    state
        .coordinator
        .get_last_update()
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("none".into()))
}

/// Forget the last committed root
///
/// POST /v1/multisig/last-update/clear
pub async fn clear_last_update(
    State(state): State<Arc<AppState>>,
) -> Json<ClearLastUpdateResponse> {
    let cleared = state.coordinator.clear_last_update();
    Json(ClearLastUpdateResponse {
        cleared,
        message: if cleared {
            "Last update cleared".into()
        } else {
            "No last update recorded".into()
        },
    })
}
