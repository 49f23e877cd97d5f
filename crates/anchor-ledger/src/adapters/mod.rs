//! Ledger adapters
//!
//! - **RpcClient**: JSON-RPC over HTTP against a real node
//! - **MockLedger**: in-memory ledger for tests and local development

pub mod mock;
pub mod rpc;

pub use mock::{MockFailure, MockLedger};
pub use rpc::RpcClient;
