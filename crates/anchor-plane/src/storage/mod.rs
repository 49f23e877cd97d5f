//! Issuer storage
//!
//! Trait-based abstraction over where registered issuers live, with an
//! in-memory backend (default) and a PostgreSQL backend behind the
//! `postgres` feature.
//!
//! Issuers are never deleted. Re-registering an address updates its name and
//! registration signature but keeps the entropy from the first registration,
//! so an issuer's leaf salt is stable for the lifetime of the address.

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use memory::MemoryStore;
#[cfg(feature = "postgres")]
pub use postgres::PostgresStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Debug;

use anchor_core::{Address, Issuer};

/// Error type for storage operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Connection error: {0}")]
    Connection(String),
}

/// A registered issuer as the store keeps it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssuerRecord {
    pub issuer: Issuer,
    /// Hex EIP-191 signature over `"{address},{name}"`
    pub signature: String,
    pub registered_at: DateTime<Utc>,
}

impl IssuerRecord {
    pub fn new(issuer: Issuer, signature: impl Into<String>) -> Self {
        Self {
            issuer,
            signature: signature.into(),
            registered_at: Utc::now(),
        }
    }

    pub fn address(&self) -> Address {
        self.issuer.address
    }
}

/// Storage backend trait for issuers
///
/// Implementations must be thread-safe and support concurrent access.
#[async_trait]
pub trait IssuerStore: Send + Sync + Debug {
    /// All registered issuers, in no particular order
    async fn list_issuers(&self) -> Result<Vec<IssuerRecord>, StorageError>;

    /// One issuer by address
    async fn get_issuer(&self, address: &Address) -> Result<Option<IssuerRecord>, StorageError>;

    /// Insert a new issuer or update an existing one's name and signature
    ///
    /// Returns the record as stored.
    async fn upsert_issuer(&self, record: IssuerRecord) -> Result<IssuerRecord, StorageError>;
}
