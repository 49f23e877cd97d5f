//! In-memory storage backend
//!
//! Default storage implementation using an in-memory hashmap.
//! Suitable for development and single-instance deployments.
//! Data is lost on restart.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::info;

use anchor_core::Address;

use super::{IssuerRecord, IssuerStore, StorageError};

/// In-memory issuer store implementation
#[derive(Debug, Default)]
pub struct MemoryStore {
    issuers: RwLock<HashMap<Address, IssuerRecord>>,
}

impl MemoryStore {
    /// Create a new in-memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `records`
    pub fn with_issuers(records: impl IntoIterator<Item = IssuerRecord>) -> Self {
        let issuers = records.into_iter().map(|r| (r.address(), r)).collect();
        Self {
            issuers: RwLock::new(issuers),
        }
    }
}

#[async_trait]
impl IssuerStore for MemoryStore {
    async fn list_issuers(&self) -> Result<Vec<IssuerRecord>, StorageError> {
        Ok(self.issuers.read().values().cloned().collect())
    }

    async fn get_issuer(&self, address: &Address) -> Result<Option<IssuerRecord>, StorageError> {
        Ok(self.issuers.read().get(address).cloned())
    }

    async fn upsert_issuer(&self, record: IssuerRecord) -> Result<IssuerRecord, StorageError> {
        let mut issuers = self.issuers.write();
        let stored = match issuers.get_mut(&record.address()) {
            Some(existing) => {
                info!(address = %record.address(), name = %record.issuer.name, "Updating issuer");
                existing.issuer.name = record.issuer.name;
                existing.signature = record.signature;
                existing.clone()
            }
            None => {
                info!(
                    address = %record.address(),
                    name = %record.issuer.name,
                    "Registering issuer"
                );
                issuers.insert(record.address(), record.clone());
                record
            }
        };
        Ok(stored)
    }
}
