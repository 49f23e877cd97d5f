//! Node access abstraction
//!
//! `LedgerClient` is the narrow set of node calls the contract layer needs.
//! The JSON-RPC implementation lives in `adapters::rpc`; tests substitute
//! in-process fakes.

use async_trait::async_trait;
use anchor_core::Address;
use std::time::Duration;
use tokio::time::Instant;
use tracing::warn;

use crate::error::{LedgerError, Result};
use crate::types::{Receipt, TxHash};

/// Calls made against a ledger node
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Next nonce for `account`, counting pending transactions
    async fn current_nonce(&self, account: &Address) -> Result<u64>;

    /// Gas price the node currently suggests, in wei
    async fn gas_price(&self) -> Result<u128>;

    /// Broadcast a signed raw transaction, returning its hash
    async fn submit(&self, raw: &[u8]) -> Result<TxHash>;

    /// Receipt for a transaction, `None` while it is still pending
    async fn receipt(&self, tx: &TxHash) -> Result<Option<Receipt>>;

    /// Poll `receipt` until the transaction is mined or `timeout` elapses
    ///
    /// The transaction is already broadcast, so a failed lookup says nothing
    /// about its outcome: lookup errors are logged and polling continues.
    /// Running out of time is `LedgerError::Timeout`, outcome unknown.
    async fn await_receipt(
        &self,
        tx: &TxHash,
        poll_interval: Duration,
        timeout: Duration,
    ) -> Result<Receipt> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.receipt(tx).await {
                Ok(Some(receipt)) => return Ok(receipt),
                Ok(None) => {}
                Err(e) => warn!(tx = %tx, error = %e, "Receipt lookup failed, still waiting"),
            }
            if Instant::now() >= deadline {
                return Err(LedgerError::Timeout(timeout));
            }
            tokio::time::sleep(poll_interval).await;
        }
    }

    /// Execute a read-only call against `to` at the latest block
    async fn call_read(&self, to: &Address, data: &[u8]) -> Result<Vec<u8>>;

    /// Timestamp (seconds) of the latest block
    async fn latest_block_timestamp(&self) -> Result<u64>;

    /// Get a description of this client (for logging)
    fn description(&self) -> &str {
        "ledger client"
    }
}
