//! Two-of-N approval of registry roots
//!
//! A root reaches the ledger only after two distinct administrators have
//! signed `"Update Merkle Root: {root}"` for it, and only while it is still
//! the live root of the issuer set.
//!
//! ## Lifecycle of a root
//!
//! ```text
//! Absent --first signature--> AwaitingSecond --second signer--> Finalized
//!                                  ^                               |
//!                                  +------ ledger failure ---------+
//! ```
//!
//! Finalized entries are removed. The check-for-pending and the create or
//! promote step happen under one write lock. The ledger call itself runs in
//! a detached task outside the lock, with the entry marked in-flight, and
//! the outcome is committed by that task once the ledger has answered. A
//! caller that stops waiting therefore never leaves the entry stuck.
//!
//! All of this state is process-local and is lost on restart.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, warn};

use anchor_core::{
    approval_message, recover_personal_signer, Address, RecoverableSignature, RootHash,
};
use anchor_ledger::{AnchorLedger, LedgerError, TxHash};

use super::validation::{parse_address, parse_hash, ValidationError};
use crate::keys::AdminSet;
use crate::notify::{Notifier, PendingSummary, RegistryEvent};
use crate::registry::{MerkleRegistry, RegistryError};

/// Default bound on a ledger confirmation
pub const DEFAULT_LEDGER_TIMEOUT: Duration = Duration::from_secs(120);

/// Errors from signature submission
#[derive(Error, Debug, Clone)]
pub enum CoordinatorError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{0} is not an authorized administrator")]
    UnauthorizedSigner(Address),

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    /// The signed root is no longer the registry's root
    #[error("Stale root: signed {claimed}, current root is {current}")]
    StaleRoot { claimed: RootHash, current: RootHash },

    #[error("{admin} has already signed root {root}")]
    DuplicateSigner { root: RootHash, admin: Address },

    /// A second signature for this root is already being submitted
    #[error("Ledger submission for root {0} already in progress")]
    SubmissionInProgress(RootHash),

    /// The ledger refused or reverted the update; the approval stays pending
    #[error("Ledger submission failed: {0}")]
    LedgerSubmissionFailed(String),

    /// No confirmation in time; the approval stays pending
    #[error("Ledger confirmation timed out after {0:?}")]
    LedgerTimeout(Duration),

    #[error("Issuer registry unavailable: {0}")]
    RegistryUnavailable(String),

    #[error("Proof construction failed: {0}")]
    ProofConstruction(String),
}

impl From<RegistryError> for CoordinatorError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::Unavailable(msg) => CoordinatorError::RegistryUnavailable(msg),
            RegistryError::ProofConstruction(msg) => CoordinatorError::ProofConstruction(msg),
            other => CoordinatorError::ProofConstruction(other.to_string()),
        }
    }
}

/// Result of an accepted signature
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// First approval recorded; another administrator must sign
    AwaitingSecond { root: RootHash },

    /// Second approval; the root is now on the ledger
    Finalized {
        root: RootHash,
        transaction_hash: TxHash,
    },
}

/// The most recent root committed on the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LastUpdate {
    pub root: RootHash,
    pub transaction_hash: TxHash,
    pub finalized_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct PendingUpdate {
    first_signer: Address,
    #[allow(dead_code)] // Kept for the record, never re-verified
    first_signature: String,
    root_bytes: [u8; 32],
    created_at: DateTime<Utc>,
    in_flight: bool,
}

#[derive(Debug, Default)]
struct CoordinatorState {
    pending: HashMap<RootHash, PendingUpdate>,
    last: Option<LastUpdate>,
}

impl CoordinatorState {
    /// Oldest first
    fn summaries(&self) -> Vec<PendingSummary> {
        let mut entries: Vec<_> = self.pending.iter().collect();
        entries.sort_by(|(ra, a), (rb, b)| a.created_at.cmp(&b.created_at).then(ra.cmp(rb)));
        entries
            .into_iter()
            .map(|(root, p)| PendingSummary {
                root: *root,
                first_admin: p.first_signer,
            })
            .collect()
    }
}

/// Gates registry root updates behind two administrator signatures
pub struct MultiSigCoordinator {
    admins: AdminSet,
    registry: MerkleRegistry,
    ledger: Arc<dyn AnchorLedger>,
    notifier: Arc<dyn Notifier>,
    state: Arc<RwLock<CoordinatorState>>,
    ledger_timeout: Duration,
}

impl MultiSigCoordinator {
    pub fn new(
        admins: AdminSet,
        registry: MerkleRegistry,
        ledger: Arc<dyn AnchorLedger>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            admins,
            registry,
            ledger,
            notifier,
            state: Arc::new(RwLock::new(CoordinatorState::default())),
            ledger_timeout: DEFAULT_LEDGER_TIMEOUT,
        }
    }

    pub fn with_ledger_timeout(mut self, timeout: Duration) -> Self {
        self.ledger_timeout = timeout;
        self
    }

    pub fn admins(&self) -> &AdminSet {
        &self.admins
    }

    /// Record an administrator's approval of `claimed_root`
    ///
    /// The approval message is rebuilt from `claimed_root` exactly as given,
    /// so it must match the string the administrator signed.
    pub async fn submit_signature(
        &self,
        admin_address: &str,
        signature: &str,
        claimed_root: &str,
    ) -> Result<SubmitOutcome, CoordinatorError> {
        let admin = parse_address("admin_address", admin_address)?;
        let root = parse_hash("root", claimed_root)?;
        if signature.trim().is_empty() {
            return Err(ValidationError::new("signature", "must not be empty").into());
        }

        if !self.admins.contains(&admin) {
            warn!(
                admin = %admin,
                root = %root,
                "SECURITY: Signature from unauthorized address rejected"
            );
            return Err(CoordinatorError::UnauthorizedSigner(admin));
        }

        let parsed = RecoverableSignature::from_hex(signature)
            .map_err(|e| CoordinatorError::InvalidSignature(e.to_string()))?;
        let signer = recover_personal_signer(&approval_message(claimed_root), &parsed)
            .map_err(|e| CoordinatorError::InvalidSignature(e.to_string()))?;
        if signer != admin {
            warn!(
                admin = %admin,
                recovered = %signer,
                root = %root,
                "SECURITY: Approval signature does not match claimed administrator"
            );
            return Err(CoordinatorError::InvalidSignature(format!(
                "signature was produced by {}, not {}",
                signer, admin
            )));
        }

        let current = self.registry.compute_root().await?;
        if current != root {
            warn!(
                claimed = %root,
                current = %current,
                admin = %admin,
                "Approval for stale root rejected"
            );
            return Err(CoordinatorError::StaleRoot { claimed: root, current });
        }

        let root_bytes = {
            let mut state = self.state.write();
            match state.pending.get_mut(&root) {
                None => {
                    state.pending.insert(
                        root,
                        PendingUpdate {
                            first_signer: admin,
                            first_signature: signature.to_string(),
                            root_bytes: root.to_bytes(),
                            created_at: Utc::now(),
                            in_flight: false,
                        },
                    );
                    state.last = None;
                    let pending = state.summaries();
                    drop(state);

                    info!(
                        root = %root,
                        admin = %admin,
                        "First approval recorded, awaiting second signature"
                    );
                    self.notifier.publish(RegistryEvent::PendingUpdates { pending });
                    return Ok(SubmitOutcome::AwaitingSecond { root });
                }
                Some(entry) if entry.first_signer == admin => {
                    warn!(
                        root = %root,
                        admin = %admin,
                        "Duplicate approval from the same administrator"
                    );
                    return Err(CoordinatorError::DuplicateSigner { root, admin });
                }
                Some(entry) if entry.in_flight => {
                    return Err(CoordinatorError::SubmissionInProgress(root));
                }
                Some(entry) => {
                    entry.in_flight = true;
                    entry.root_bytes
                }
            }
        };

        info!(root = %root, admin = %admin, "Quorum reached, submitting root to ledger");
        self.finalize(root, root_bytes).await
    }

    /// Submit the approved root and commit the outcome
    ///
    /// The ledger call and the commit run in a spawned task so they complete
    /// even if this future is dropped.
    async fn finalize(
        &self,
        root: RootHash,
        root_bytes: [u8; 32],
    ) -> Result<SubmitOutcome, CoordinatorError> {
        let ledger = self.ledger.clone();
        let notifier = self.notifier.clone();
        let state = self.state.clone();
        let timeout = self.ledger_timeout;

        let task = tokio::spawn(async move {
            let target = RootHash::from_bytes(root_bytes);
            let submission = ledger.update_merkle_root(&target);
            let result = match tokio::time::timeout(timeout, submission).await {
                Ok(Ok(receipt)) if receipt.is_success() => Ok(receipt.transaction_hash),
                Ok(Ok(receipt)) => Err(CoordinatorError::LedgerSubmissionFailed(format!(
                    "root update transaction {} reverted",
                    receipt.transaction_hash
                ))),
                Ok(Err(LedgerError::Timeout(waited))) => {
                    Err(CoordinatorError::LedgerTimeout(waited))
                }
                Ok(Err(e)) => Err(CoordinatorError::LedgerSubmissionFailed(e.to_string())),
                Err(_) => Err(CoordinatorError::LedgerTimeout(timeout)),
            };
            commit(&state, notifier.as_ref(), root, result)
        });

        match task.await {
            Ok(result) => result,
            Err(join_error) => {
                error!(root = %root, error = %join_error, "Finalize task aborted");
                release(&self.state, &root);
                Err(CoordinatorError::LedgerSubmissionFailed(join_error.to_string()))
            }
        }
    }

    /// Roots awaiting a second signature, oldest first
    pub fn get_pending(&self) -> Vec<PendingSummary> {
        self.state.read().summaries()
    }

    pub fn pending_count(&self) -> usize {
        self.state.read().pending.len()
    }

    pub fn get_last_update(&self) -> Option<LastUpdate> {
        self.state.read().last.clone()
    }

    /// Forget the last finalized update; returns whether one was recorded
    pub fn clear_last_update(&self) -> bool {
        let cleared = self.state.write().last.take().is_some();
        if cleared {
            info!("Cleared last root update");
        }
        cleared
    }
}

fn commit(
    state: &RwLock<CoordinatorState>,
    notifier: &dyn Notifier,
    root: RootHash,
    result: Result<TxHash, CoordinatorError>,
) -> Result<SubmitOutcome, CoordinatorError> {
    match result {
        Ok(transaction_hash) => {
            let pending = {
                let mut state = state.write();
                state.pending.remove(&root);
                state.last = Some(LastUpdate {
                    root,
                    transaction_hash,
                    finalized_at: Utc::now(),
                });
                state.summaries()
            };

            info!(root = %root, tx = %transaction_hash, "Merkle root committed on ledger");
            notifier.publish(RegistryEvent::MerkleRootUpdated {
                root,
                transaction_hash,
            });
            notifier.publish(RegistryEvent::PendingUpdates { pending });
            Ok(SubmitOutcome::Finalized {
                root,
                transaction_hash,
            })
        }
        Err(e) => {
            release(state, &root);
            error!(root = %root, error = %e, "Root update failed, approval kept pending");
            Err(e)
        }
    }
}

/// Clear the in-flight marker so a later signature can retry
fn release(state: &RwLock<CoordinatorState>, root: &RootHash) {
    if let Some(entry) = state.write().pending.get_mut(root) {
        entry.in_flight = false;
    }
}
