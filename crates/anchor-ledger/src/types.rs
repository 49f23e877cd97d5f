//! Core types for ledger submissions

use anchor_core::{Address, CredentialRecord, Hash32};
use serde::{Deserialize, Serialize};

/// Transaction hash
pub type TxHash = Hash32;

/// Outcome of a mined transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    /// Hash of the mined transaction
    pub transaction_hash: TxHash,

    /// `true` when execution succeeded (status 1)
    pub status: bool,

    /// Block the transaction was included in
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
}

impl Receipt {
    pub fn is_success(&self) -> bool {
        self.status
    }
}

/// Everything the credential contract needs to anchor one credential
///
/// The issuance timestamp is not part of the submission: the ledger adapter
/// stamps it from the latest block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialSubmission {
    /// 32-byte credential digest
    pub credential_hash: Hash32,

    /// Issuing authority
    pub issuer: Address,

    /// Credential holder
    pub holder: Address,

    /// `"{issuer_name} {metadata}"`
    pub data: String,

    /// Sibling hashes from the issuer's leaf up to the root
    pub proof: Vec<Hash32>,

    /// Side bits matching `proof` (`true` = sibling on the left)
    pub side_bits: Vec<bool>,

    /// The issuer's leaf hash
    pub leaf: Hash32,
}

impl CredentialSubmission {
    /// The record the contract will hold once mined at `issued_at`
    pub fn to_record(&self, issued_at: u64) -> CredentialRecord {
        CredentialRecord {
            credential_hash: self.credential_hash,
            issuer: self.issuer,
            holder: self.holder,
            issued_at,
            data: self.data.clone(),
        }
    }
}
