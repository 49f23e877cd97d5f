//! Anchor Ledger
//!
//! Everything the trust anchor needs to talk to an Ethereum-compatible
//! ledger: a node-access trait, the contract entry points built on it, and
//! the codecs and signing underneath.
//!
//! ## Architecture
//!
//! - **`LedgerClient`**: primitive node calls (nonce, gas price, broadcast,
//!   receipts, read-only calls, latest block time)
//! - **`AnchorLedger`**: contract-level operations the plane uses
//!   (`update_merkle_root`, `store_credential`, `pull_credentials`)
//! - **`ContractLedger`**: `AnchorLedger` over any `LedgerClient` plus a
//!   signing key
//! - **Adapters**: `RpcClient` (JSON-RPC over HTTP) and `MockLedger`
//!   (in-memory)
//!
//! ## Usage
//!
//! ```ignore
//! use anchor_ledger::{adapters::RpcClient, ContractConfig, ContractLedger};
//!
//! let client = Arc::new(RpcClient::new("https://rpc.sepolia.org", Duration::from_secs(30))?);
//! let ledger = ContractLedger::new(
//!     client,
//!     KeyPair::from_hex(&signer_key)?,
//!     ContractConfig::new(registry, credentials),
//! );
//!
//! let receipt = ledger.update_merkle_root(&root).await?;
//! ```

pub mod abi;
pub mod adapters;
pub mod client;
pub mod contract;
pub mod error;
pub mod rlp;
pub mod tx;
pub mod types;

pub use client::LedgerClient;
pub use contract::{AnchorLedger, ContractConfig, ContractLedger};
pub use error::{LedgerError, Result};
pub use tx::{build_and_sign, SignedTransaction, TxSpec};
pub use types::{CredentialSubmission, Receipt, TxHash};
