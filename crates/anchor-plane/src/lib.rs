//! Anchor Plane Server
//!
//! The anchor plane keeps the registry of credential issuers and anchors it
//! on a ledger:
//! - Maintains the issuer set and its Merkle root
//! - Gates every root update behind two administrator signatures
//! - Issues credentials together with the issuer's inclusion proof
//! - Streams registry events to connected clients
//!
//! ## Invariants
//!
//! 1. **QUORUM**: a root reaches the ledger only with approvals from two
//!    distinct authorized administrators
//! 2. **FRESHNESS**: an approval counts only while its root is still the
//!    live root of the issuer set
//! 3. **MEMBERSHIP**: a credential is submitted only with a proof that its
//!    issuer is in the current set
//!
//! ## API Endpoints
//!
//! ### Core Endpoints
//! - `GET /health` - Liveness check
//! - `GET /ready` - Readiness check with issuer, admin and pending counts
//! - `GET /v1/root` - Current registry root
//! - `GET /v1/proof/{address}?name=` - Inclusion proof for an issuer
//! - `GET /v1/issuers` - List registered issuers
//! - `POST /v1/issuers` - Register or rename an issuer
//!
//! ### Multi-signature Endpoints
//! - `POST /v1/multisig/signatures` - Submit an approval signature
//! - `GET /v1/multisig/pending` - Roots awaiting a second approval
//! - `GET /v1/multisig/last-update` - Last committed root
//! - `POST /v1/multisig/last-update/clear` - Forget the last committed root
//!
//! ### Credential Endpoints
//! - `POST /v1/credentials` - Issue a credential
//! - `GET /v1/credentials/{holder}` - Credentials held by an address
//! - `GET /v1/events` - Server-Sent Events stream of registry events

pub mod api;
pub mod config;
pub mod core;
pub mod keys;
pub mod notify;
pub mod registry;
pub mod storage;

pub use api::create_router;
pub use api::handlers::AppState;
pub use config::{ConfigError, PlaneConfig};
pub use keys::AdminSet;
pub use notify::{BroadcastNotifier, Notifier, RegistryEvent};
pub use registry::MerkleRegistry;
pub use storage::{IssuerRecord, IssuerStore, MemoryStore};
