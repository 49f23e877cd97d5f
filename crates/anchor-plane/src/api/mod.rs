//! API module for the anchor plane server

pub mod error;
pub mod handlers;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use handlers::AppState;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Readiness check response
#[derive(Serialize)]
pub struct ReadyResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub issuer_count: usize,
    pub admin_count: usize,
    pub pending_count: usize,
}

/// Health check endpoint
///
/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
    })
}

/// Readiness check endpoint
///
/// GET /ready
///
/// Not ready while the issuer store cannot be read.
pub async fn ready(State(state): State<Arc<AppState>>) -> Json<ReadyResponse> {
    let issuers = state.store.list_issuers().await.map(|v| v.len());

    Json(ReadyResponse {
        ready: issuers.is_ok(),
        name: state.name.clone(),
        issuer_count: issuers.unwrap_or(0),
        admin_count: state.coordinator.admins().count(),
        pending_count: state.coordinator.pending_count(),
    })
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    // CORS configuration for browser-based admin consoles
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health endpoints
        .route("/health", get(health))
        .route("/ready", get(ready))
        // Registry endpoints
        .route("/v1/root", get(handlers::get_root))
        .route("/v1/proof/{address}", get(handlers::get_proof))
        .route("/v1/issuers", get(handlers::list_issuers).post(handlers::register_issuer))
        // Multi-signature endpoints
        .route("/v1/multisig/signatures", post(handlers::submit_signature))
        .route("/v1/multisig/pending", get(handlers::get_pending))
        .route("/v1/multisig/last-update", get(handlers::get_last_update))
        .route("/v1/multisig/last-update/clear", post(handlers::clear_last_update))
        // Credential endpoints
        .route("/v1/credentials", post(handlers::issue_credential))
        .route("/v1/credentials/{holder}", get(handlers::pull_credentials))
        // Event stream
        .route("/v1/events", get(handlers::events))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
