//! In-memory ledger
//!
//! For tests and local development. Every submission is mined immediately
//! (after an optional delay) and recorded so tests can assert on exactly what
//! was sent.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

use anchor_core::{keccak256, Address, CredentialRecord, RootHash};

use crate::contract::AnchorLedger;
use crate::error::{LedgerError, Result};
use crate::types::{CredentialSubmission, Receipt, TxHash};

/// A failure to inject into upcoming submissions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockFailure {
    /// The node refuses the transaction
    Reject(String),
    /// The transaction is mined but reverts
    Revert,
}

#[derive(Default)]
struct MockState {
    roots: Vec<(RootHash, TxHash)>,
    credentials: HashMap<Address, Vec<CredentialRecord>>,
    submissions: Vec<CredentialSubmission>,
    failures: Vec<MockFailure>,
    sequence: u64,
}

/// Mock ledger for testing
pub struct MockLedger {
    state: RwLock<MockState>,
    delay: RwLock<Option<Duration>>,
}

impl MockLedger {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(MockState::default()),
            delay: RwLock::new(None),
        }
    }

    /// Delay every submission by `delay` before it is mined
    pub fn with_delay(self, delay: Duration) -> Self {
        *self.delay.write() = Some(delay);
        self
    }

    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.write() = delay;
    }

    /// Queue a failure for the next submission; queued failures apply in order
    pub fn fail_next(&self, failure: MockFailure) {
        self.state.write().failures.push(failure);
    }

    /// Roots committed so far, oldest first
    pub fn root_updates(&self) -> Vec<(RootHash, TxHash)> {
        self.state.read().roots.clone()
    }

    /// The most recently committed root
    pub fn committed_root(&self) -> Option<RootHash> {
        self.state.read().roots.last().map(|(root, _)| *root)
    }

    /// Credential submissions accepted so far
    pub fn credential_submissions(&self) -> Vec<CredentialSubmission> {
        self.state.read().submissions.clone()
    }

    async fn mine(&self) -> Result<(TxHash, bool)> {
        let delay = *self.delay.read();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.write();
        state.sequence += 1;
        let tx = keccak256(state.sequence.to_be_bytes());

        let failure = if state.failures.is_empty() {
            None
        } else {
            Some(state.failures.remove(0))
        };
        match failure {
            Some(MockFailure::Reject(message)) => Err(LedgerError::Rejected(message)),
            Some(MockFailure::Revert) => Ok((tx, false)),
            None => Ok((tx, true)),
        }
    }
}

impl Default for MockLedger {
    fn default() -> Self {
        Self::new()
    }
}

fn receipt(tx: TxHash, status: bool, block: u64) -> Receipt {
    Receipt {
        transaction_hash: tx,
        status,
        block_number: Some(block),
    }
}

#[async_trait]
impl AnchorLedger for MockLedger {
    async fn update_merkle_root(&self, root: &RootHash) -> Result<Receipt> {
        let (tx, success) = self.mine().await?;

        let mut state = self.state.write();
        if success {
            state.roots.push((*root, tx));
        }
        debug!(root = %root, tx = %tx, success, "Mock root update");
        Ok(receipt(tx, success, state.sequence))
    }

    async fn store_credential(&self, submission: &CredentialSubmission) -> Result<Receipt> {
        let (tx, mut success) = self.mine().await?;

        let mut state = self.state.write();
        // The contract rejects a credential hash it has already stored
        let duplicate = state
            .credentials
            .values()
            .flatten()
            .any(|r| r.credential_hash == submission.credential_hash);
        if duplicate {
            success = false;
        }

        if success {
            let issued_at = Utc::now().timestamp().max(0) as u64;
            state
                .credentials
                .entry(submission.holder)
                .or_default()
                .push(submission.to_record(issued_at));
            state.submissions.push(submission.clone());
        }
        debug!(
            credential = %submission.credential_hash,
            tx = %tx,
            success,
            "Mock credential submission"
        );
        Ok(receipt(tx, success, state.sequence))
    }

    async fn pull_credentials(&self, holder: &Address) -> Result<Vec<CredentialRecord>> {
        Ok(self
            .state
            .read()
            .credentials
            .get(holder)
            .cloned()
            .unwrap_or_default())
    }

    fn description(&self) -> &str {
        "mock ledger"
    }
}
