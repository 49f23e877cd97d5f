//! API request handlers

pub mod credentials;
pub mod events;
pub mod issuers;
pub mod multisig;
pub mod root;

use std::sync::Arc;
use std::time::Duration;

use anchor_ledger::AnchorLedger;

use crate::core::{CredentialIssuer, MultiSigCoordinator};
use crate::keys::AdminSet;
use crate::notify::BroadcastNotifier;
use crate::registry::MerkleRegistry;
use crate::storage::IssuerStore;

pub use credentials::{
    issue_credential, pull_credentials, IssueCredentialResponse, PullCredentialsResponse,
};
pub use events::events;
pub use issuers::{
    list_issuers, register_issuer, ListIssuersResponse, RegisterIssuerRequest,
    RegisterIssuerResponse,
};
pub use multisig::{
    clear_last_update, get_last_update, get_pending, submit_signature, ClearLastUpdateResponse,
    PendingUpdatesResponse, SubmitSignatureRequest, SubmitSignatureResponse,
};
pub use root::{get_proof, get_root, ProofQuery, ProofResponse, RootResponse};

/// Application state shared across handlers
pub struct AppState {
    /// Where registered issuers live
    pub store: Arc<dyn IssuerStore>,
    /// Root and proof computation over `store`
    pub registry: MerkleRegistry,
    /// Two-of-N approval of root updates
    pub coordinator: MultiSigCoordinator,
    /// Credential anchoring
    pub issuer: CredentialIssuer,
    /// Event fan-out, also the source of the SSE stream
    pub notifier: Arc<BroadcastNotifier>,
    /// Human-readable name of this deployment
    pub name: Option<String>,
}

impl AppState {
    /// Wire the registry, coordinator and issuer over one store and ledger
    pub fn new(
        store: Arc<dyn IssuerStore>,
        ledger: Arc<dyn AnchorLedger>,
        admins: AdminSet,
        ledger_timeout: Duration,
        name: Option<String>,
    ) -> Self {
        let registry = MerkleRegistry::new(store.clone());
        let notifier = Arc::new(BroadcastNotifier::default());
        let coordinator =
            MultiSigCoordinator::new(admins, registry.clone(), ledger.clone(), notifier.clone())
                .with_ledger_timeout(ledger_timeout);
        let issuer =
            CredentialIssuer::new(registry.clone(), ledger).with_ledger_timeout(ledger_timeout);

        Self {
            store,
            registry,
            coordinator,
            issuer,
            notifier,
            name,
        }
    }
}
