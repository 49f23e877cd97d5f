//! Anchor Plane Server Binary
//!
//! Runs the anchor plane HTTP server for issuer registration, root approval
//! and credential issuance.

use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::FmtSubscriber;

use anchor_core::KeyPair;
use anchor_ledger::adapters::{MockLedger, RpcClient};
use anchor_ledger::{AnchorLedger, ContractConfig, ContractLedger};
use anchor_plane::{create_router, AdminSet, AppState, IssuerStore, MemoryStore, PlaneConfig};

/// Per-request bound on JSON-RPC calls
const RPC_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() {
    let config = PlaneConfig::from_env().expect("Invalid configuration");

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.log_level)
        .with_target(true)
        .with_thread_ids(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    // Initialize ledger
    let ledger: Arc<dyn AnchorLedger> = match &config.rpc {
        Some(rpc) => {
            let client = RpcClient::new(rpc.url.clone(), RPC_REQUEST_TIMEOUT)
                .expect("Failed to build RPC client");
            let signer = KeyPair::from_hex(&rpc.signer_key)
                .expect("ANCHOR_SIGNER_KEY must be a valid secp256k1 key");
            let contracts = ContractConfig::new(rpc.registry_contract, rpc.credential_contract)
                .with_chain_id(rpc.chain_id)
                .with_poll_interval(rpc.receipt_poll)
                .with_receipt_timeout(config.ledger_timeout);
            Arc::new(ContractLedger::new(Arc::new(client), signer, contracts))
        }
        None => {
            warn!("ANCHOR_RPC_URL not set, using in-memory mock ledger");
            Arc::new(MockLedger::new())
        }
    };

    // Initialize storage
    let store = open_store(&config).await;

    let admins = AdminSet::new(config.admin_addresses.iter().copied());

    info!(
        name = ?config.name,
        port = config.port,
        admins = admins.count(),
        ledger = ledger.description(),
        "Starting anchor plane server"
    );
    warn!("Pending approvals and the last root update are held in memory and lost on restart");

    // Create application state
    let state = Arc::new(AppState::new(
        store,
        ledger,
        admins,
        config.ledger_timeout,
        config.name.clone(),
    ));

    // Build router
    let app = create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    info!(addr = %addr, "Anchor plane listening");

    axum::serve(listener, app)
        .await
        .expect("Server error");
}

#[cfg(feature = "postgres")]
async fn open_store(config: &PlaneConfig) -> Arc<dyn IssuerStore> {
    match &config.database_url {
        Some(url) => Arc::new(
            anchor_plane::storage::PostgresStore::new(url)
                .await
                .expect("Failed to connect to PostgreSQL"),
        ),
        None => {
            info!("ANCHOR_DATABASE_URL not set, using in-memory issuer store");
            Arc::new(MemoryStore::new())
        }
    }
}

#[cfg(not(feature = "postgres"))]
async fn open_store(config: &PlaneConfig) -> Arc<dyn IssuerStore> {
    if config.database_url.is_some() {
        warn!(
            "ANCHOR_DATABASE_URL is set but the postgres feature is disabled, \
             using in-memory issuer store"
        );
    }
    Arc::new(MemoryStore::new())
}
