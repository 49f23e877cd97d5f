//! Core logic for the anchor plane

pub mod coordinator;
pub mod issuance;
mod validation;

pub use coordinator::{CoordinatorError, LastUpdate, MultiSigCoordinator, SubmitOutcome};
pub use issuance::{CredentialIssuer, IssuanceError, IssueCredentialRequest, IssuedCredential};
pub use validation::{parse_address, parse_hash, require_non_empty, ValidationError};
