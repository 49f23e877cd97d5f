//! Merkle registry over the issuer store
//!
//! Owns no mutable state: every call snapshots the store once and rebuilds
//! the tree from that snapshot, so a root or proof always reflects one
//! consistent issuer set.

use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error};

use anchor_core::{Address, Hash32, InclusionProof, Issuer, MerkleTree, RootHash};

use crate::storage::{IssuerStore, StorageError};

/// Errors from root and proof computation
#[derive(Error, Debug, Clone)]
pub enum RegistryError {
    /// The issuer store could not be read; safe to retry
    #[error("Issuer registry unavailable: {0}")]
    Unavailable(String),

    #[error("No issuer with address {address} and name '{name}'")]
    IssuerNotFound { address: Address, name: String },

    /// The snapshot could not be turned into a consistent tree
    #[error("Proof construction failed: {0}")]
    ProofConstruction(String),
}

impl From<StorageError> for RegistryError {
    fn from(err: StorageError) -> Self {
        RegistryError::Unavailable(err.to_string())
    }
}

/// A leaf's membership evidence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuerProof {
    pub leaf: Hash32,
    pub proof: Vec<Hash32>,
    pub side_bits: Vec<bool>,
    /// Root of the snapshot the proof was built from
    pub root: RootHash,
}

/// Computes roots and inclusion proofs from the live issuer set
#[derive(Debug, Clone)]
pub struct MerkleRegistry {
    store: Arc<dyn IssuerStore>,
}

impl MerkleRegistry {
    pub fn new(store: Arc<dyn IssuerStore>) -> Self {
        Self { store }
    }

    async fn snapshot(&self) -> Result<Vec<Issuer>, RegistryError> {
        let records = self.store.list_issuers().await.map_err(|e| {
            error!(error = %e, "Failed to read issuer store");
            RegistryError::from(e)
        })?;
        Ok(records.into_iter().map(|r| r.issuer).collect())
    }

    /// Root over the full current issuer set
    pub async fn compute_root(&self) -> Result<RootHash, RegistryError> {
        let issuers = self.snapshot().await?;
        let tree = MerkleTree::from_issuers(&issuers)
            .map_err(|e| RegistryError::ProofConstruction(e.to_string()))?;
        let root = tree.root();
        debug!(root = %root, issuers = tree.len(), "Computed registry root");
        Ok(root)
    }

    /// Inclusion proof for the issuer matching both `address` and `name`
    pub async fn proof_for(
        &self,
        address: &Address,
        name: &str,
    ) -> Result<IssuerProof, RegistryError> {
        let issuers = self.snapshot().await?;

        let not_found = || RegistryError::IssuerNotFound {
            address: *address,
            name: name.to_string(),
        };
        let issuer = issuers
            .iter()
            .find(|i| i.address == *address)
            .filter(|i| i.name == name)
            .ok_or_else(not_found)?;

        let tree = MerkleTree::from_issuers(&issuers)
            .map_err(|e| RegistryError::ProofConstruction(e.to_string()))?;
        let index = tree.index_of(address).ok_or_else(|| {
            RegistryError::ProofConstruction(format!("{} missing from rebuilt tree", address))
        })?;
        let proof: InclusionProof = tree
            .proof(index)
            .map_err(|e| RegistryError::ProofConstruction(e.to_string()))?;

        let root = tree.root();
        if proof.leaf != anchor_core::leaf_hash(issuer) || !proof.verify(&root) {
            error!(address = %address, root = %root, "Produced proof does not verify");
            return Err(RegistryError::ProofConstruction(
                "proof does not verify against snapshot root".into(),
            ));
        }

        Ok(IssuerProof {
            leaf: proof.leaf,
            proof: proof.siblings(),
            side_bits: proof.side_bits(),
            root,
        })
    }
}
