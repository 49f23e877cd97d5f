//! Credential issuance
//!
//! Anchors a credential on the ledger together with the issuer's inclusion
//! proof, so the credential contract can check the issuer against the
//! committed root. Each call sends exactly one transaction and is never
//! retried here; the contract itself rejects a credential hash it has seen.

use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, warn};

use anchor_core::{types::decode_fixed_hex, Address, CredentialRecord, Hash32};
use anchor_ledger::{AnchorLedger, CredentialSubmission, LedgerError, Receipt};

use super::coordinator::DEFAULT_LEDGER_TIMEOUT;
use super::validation::{parse_address, require_non_empty, ValidationError};
use crate::registry::{MerkleRegistry, RegistryError};

/// Errors from credential issuance and lookup
#[derive(Error, Debug, Clone)]
pub enum IssuanceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Malformed credential hash: {0}")]
    MalformedCredentialHash(String),

    /// No registered issuer matches the given address and name
    #[error("Unknown issuer {address} ('{name}')")]
    UnknownIssuer { address: Address, name: String },

    #[error("Ledger submission failed: {0}")]
    LedgerSubmissionFailed(String),

    #[error("Ledger confirmation timed out after {0:?}")]
    LedgerTimeout(Duration),

    #[error("Issuer registry unavailable: {0}")]
    RegistryUnavailable(String),

    #[error("Proof construction failed: {0}")]
    ProofConstruction(String),
}

impl From<RegistryError> for IssuanceError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::IssuerNotFound { address, name } => {
                IssuanceError::UnknownIssuer { address, name }
            }
            RegistryError::Unavailable(msg) => IssuanceError::RegistryUnavailable(msg),
            RegistryError::ProofConstruction(msg) => IssuanceError::ProofConstruction(msg),
        }
    }
}

impl From<LedgerError> for IssuanceError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Timeout(waited) => IssuanceError::LedgerTimeout(waited),
            other => IssuanceError::LedgerSubmissionFailed(other.to_string()),
        }
    }
}

/// Request to issue a credential
#[derive(Debug, Clone, Deserialize)]
pub struct IssueCredentialRequest {
    /// 32-byte hex digest of the credential document
    pub credential_hash: String,
    pub holder_address: String,
    pub issuer_address: String,
    pub issuer_name: String,
    pub metadata: String,
}

/// A credential accepted by the ledger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedCredential {
    pub credential_hash: Hash32,
    pub receipt: Receipt,
}

/// Issues credentials backed by issuer inclusion proofs
pub struct CredentialIssuer {
    registry: MerkleRegistry,
    ledger: Arc<dyn AnchorLedger>,
    ledger_timeout: Duration,
}

impl CredentialIssuer {
    pub fn new(registry: MerkleRegistry, ledger: Arc<dyn AnchorLedger>) -> Self {
        Self {
            registry,
            ledger,
            ledger_timeout: DEFAULT_LEDGER_TIMEOUT,
        }
    }

    pub fn with_ledger_timeout(mut self, timeout: Duration) -> Self {
        self.ledger_timeout = timeout;
        self
    }

    /// Prove the issuer's membership and anchor the credential
    pub async fn issue_credential(
        &self,
        request: &IssueCredentialRequest,
    ) -> Result<IssuedCredential, IssuanceError> {
        let credential_hash = decode_fixed_hex::<32>(&request.credential_hash, "credential hash")
            .map(Hash32::from_bytes)
            .map_err(|e| IssuanceError::MalformedCredentialHash(e.to_string()))?;
        let holder = parse_address("holder_address", &request.holder_address)?;
        let issuer = parse_address("issuer_address", &request.issuer_address)?;
        let issuer_name = require_non_empty("issuer_name", &request.issuer_name)?;
        let metadata = require_non_empty("metadata", &request.metadata)?;

        let proof = self.registry.proof_for(&issuer, issuer_name).await.map_err(|e| {
            if let RegistryError::IssuerNotFound { .. } = e {
                warn!(
                    issuer = %issuer,
                    name = %issuer_name,
                    "Credential requested for unknown issuer"
                );
            }
            IssuanceError::from(e)
        })?;

        let submission = CredentialSubmission {
            credential_hash,
            issuer,
            holder,
            data: format!("{} {}", issuer_name, metadata),
            proof: proof.proof,
            side_bits: proof.side_bits,
            leaf: proof.leaf,
        };

        let store = self.ledger.store_credential(&submission);
        let receipt = tokio::time::timeout(self.ledger_timeout, store)
            .await
            .map_err(|_| IssuanceError::LedgerTimeout(self.ledger_timeout))?
            .map_err(|e| {
                error!(credential = %credential_hash, error = %e, "Credential submission failed");
                IssuanceError::from(e)
            })?;

        if !receipt.is_success() {
            error!(
                credential = %credential_hash,
                tx = %receipt.transaction_hash,
                "Credential transaction reverted"
            );
            return Err(IssuanceError::LedgerSubmissionFailed(format!(
                "credential transaction {} reverted",
                receipt.transaction_hash
            )));
        }

        info!(
            credential = %credential_hash,
            issuer = %issuer,
            holder = %holder,
            tx = %receipt.transaction_hash,
            "Credential issued"
        );
        Ok(IssuedCredential {
            credential_hash,
            receipt,
        })
    }

    /// Credentials the ledger holds for `holder`
    pub async fn pull_credentials(
        &self,
        holder: &str,
    ) -> Result<Vec<CredentialRecord>, IssuanceError> {
        let holder = parse_address("holder_address", holder)?;
        let pull = self.ledger.pull_credentials(&holder);
        let records = tokio::time::timeout(self.ledger_timeout, pull)
            .await
            .map_err(|_| IssuanceError::LedgerTimeout(self.ledger_timeout))??;
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{IssuerRecord, MemoryStore};
    use anchor_core::{merkle, Issuer, ProofStep};
    use anchor_ledger::adapters::{MockFailure, MockLedger};

    const COLLEGE: [u8; 20] = [0x31; 20];
    const HOLDER: [u8; 20] = [0x99; 20];

    async fn setup() -> (CredentialIssuer, Arc<MockLedger>, MerkleRegistry) {
        let record = |address: [u8; 20], name: &str, entropy: &str| {
            IssuerRecord::new(Issuer::new(Address::from_bytes(address), name, entropy), "0x")
        };
        let issuers = vec![
            record(COLLEGE, "Example College", "a1"),
            record([0x42; 20], "Other Academy", "b2"),
            record([0x05; 20], "Third School", "c3"),
        ];
        let registry = MerkleRegistry::new(Arc::new(MemoryStore::with_issuers(issuers)));
        let ledger = Arc::new(MockLedger::new());
        (CredentialIssuer::new(registry.clone(), ledger.clone()), ledger, registry)
    }

    fn request(hash: &str, name: &str) -> IssueCredentialRequest {
        IssueCredentialRequest {
            credential_hash: hash.to_string(),
            holder_address: Address::from_bytes(HOLDER).to_string(),
            issuer_address: Address::from_bytes(COLLEGE).to_string(),
            issuer_name: name.to_string(),
            metadata: "BSc Computer Science".to_string(),
        }
    }

    #[tokio::test]
    async fn test_issue_submits_verifiable_proof() {
        let (issuer, ledger, registry) = setup().await;
        let hash = format!("0x{}", "cd".repeat(32));

        let issued = issuer.issue_credential(&request(&hash, "Example College")).await.unwrap();
        assert!(issued.receipt.is_success());

        let submissions = ledger.credential_submissions();
        assert_eq!(submissions.len(), 1);
        let sub = &submissions[0];
        assert_eq!(sub.data, "Example College BSc Computer Science");
        assert_eq!(sub.proof.len(), sub.side_bits.len());

        let steps: Vec<ProofStep> = sub
            .proof
            .iter()
            .zip(&sub.side_bits)
            .map(|(s, l)| ProofStep {
                sibling: *s,
                sibling_is_left: *l,
            })
            .collect();
        let root = registry.compute_root().await.unwrap();
        assert!(merkle::verify(&steps, &sub.leaf, &root));
    }

    #[tokio::test]
    async fn test_malformed_hash() {
        let (issuer, ledger, _) = setup().await;
        for bad in ["0x1234", "not-hex", ""] {
            let err = issuer.issue_credential(&request(bad, "Example College")).await.unwrap_err();
            assert!(matches!(err, IssuanceError::MalformedCredentialHash(_)), "{bad}");
        }
        assert!(ledger.credential_submissions().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_issuer_name() {
        let (issuer, ledger, _) = setup().await;
        let err = issuer
            .issue_credential(&request(&"ab".repeat(32), "Fake College"))
            .await
            .unwrap_err();
        assert!(matches!(err, IssuanceError::UnknownIssuer { .. }));
        assert!(ledger.credential_submissions().is_empty());
    }

    #[tokio::test]
    async fn test_missing_metadata() {
        let (issuer, _, _) = setup().await;
        let mut req = request(&"ab".repeat(32), "Example College");
        req.metadata = String::new();
        let err = issuer.issue_credential(&req).await.unwrap_err();
        assert!(matches!(err, IssuanceError::Validation(ref v) if v.field == "metadata"));
    }

    #[tokio::test]
    async fn test_reverted_transaction() {
        let (issuer, ledger, _) = setup().await;
        ledger.fail_next(MockFailure::Revert);
        let err = issuer
            .issue_credential(&request(&"ab".repeat(32), "Example College"))
            .await
            .unwrap_err();
        assert!(matches!(err, IssuanceError::LedgerSubmissionFailed(_)));
    }

    #[tokio::test]
    async fn test_timeout() {
        let (issuer, ledger, _) = setup().await;
        let issuer = issuer.with_ledger_timeout(Duration::from_millis(10));
        ledger.set_delay(Some(Duration::from_millis(300)));
        let err = issuer
            .issue_credential(&request(&"ab".repeat(32), "Example College"))
            .await
            .unwrap_err();
        assert!(matches!(err, IssuanceError::LedgerTimeout(_)));
    }

    #[tokio::test]
    async fn test_pull_credentials() {
        let (issuer, _, _) = setup().await;
        let hash = "ef".repeat(32);
        issuer.issue_credential(&request(&hash, "Example College")).await.unwrap();

        let records = issuer
            .pull_credentials(&Address::from_bytes(HOLDER).to_string())
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].credential_hash.to_string(), format!("0x{}", hash));
        assert_eq!(records[0].issuer, Address::from_bytes(COLLEGE));

        assert!(issuer.pull_credentials("0x12").await.is_err());
    }
}
