//! Ethereum JSON-RPC client over HTTP

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

use anchor_core::{Address, Hash32};

use crate::client::LedgerClient;
use crate::error::{LedgerError, Result};
use crate::types::{Receipt, TxHash};

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcReceipt {
    transaction_hash: String,
    status: Option<String>,
    block_number: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RpcBlock {
    timestamp: String,
}

/// JSON-RPC 2.0 client for an Ethereum-compatible node
pub struct RpcClient {
    url: String,
    http_client: reqwest::Client,
    next_id: AtomicU64,
}

impl RpcClient {
    /// Create a client for `url` with a per-request timeout
    pub fn new(url: impl Into<String>, request_timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()?;
        Ok(Self {
            url: url.into(),
            http_client,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Issue one call; `Ok(None)` when the node answers with a null result
    async fn request(&self, method: &str, params: Value) -> Result<Option<Value>> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = RpcRequest {
            jsonrpc: "2.0",
            id,
            method,
            params,
        };

        debug!(method, id, "JSON-RPC request");
        let response: RpcResponse = self
            .http_client
            .post(&self.url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(err) = response.error {
            return Err(LedgerError::Rpc {
                code: err.code,
                message: err.message,
            });
        }

        Ok(response.result.filter(|v| !v.is_null()))
    }

    async fn request_string(&self, method: &str, params: Value) -> Result<String> {
        match self.request(method, params).await? {
            Some(Value::String(s)) => Ok(s),
            Some(other) => Err(LedgerError::InvalidResponse(format!(
                "{} returned {}",
                method, other
            ))),
            None => Err(LedgerError::InvalidResponse(format!(
                "{} returned null",
                method
            ))),
        }
    }
}

/// Parse a hex quantity such as `"0x1a"`
pub fn parse_quantity(s: &str) -> Result<u128> {
    let digits = s
        .strip_prefix("0x")
        .ok_or_else(|| LedgerError::InvalidResponse(format!("quantity without 0x: {}", s)))?;
    if digits.is_empty() {
        return Err(LedgerError::InvalidResponse("empty quantity".into()));
    }
    u128::from_str_radix(digits, 16)
        .map_err(|e| LedgerError::InvalidResponse(format!("bad quantity {}: {}", s, e)))
}

fn parse_u64(s: &str) -> Result<u64> {
    u64::try_from(parse_quantity(s)?)
        .map_err(|_| LedgerError::InvalidResponse(format!("quantity {} exceeds 64 bits", s)))
}

/// Hex quantity for request parameters
pub fn format_quantity(value: u128) -> String {
    format!("0x{:x}", value)
}

fn parse_data(s: &str) -> Result<Vec<u8>> {
    anchor_core::types::decode_hex(s).map_err(|e| LedgerError::InvalidResponse(e.to_string()))
}

fn parse_receipt(value: Value) -> Result<Receipt> {
    let raw: RpcReceipt = serde_json::from_value(value)?;
    let transaction_hash = Hash32::from_hex(&raw.transaction_hash)
        .map_err(|e| LedgerError::InvalidResponse(e.to_string()))?;
    // Pre-Byzantium receipts carry no status; treat them as success
    let status = match raw.status.as_deref() {
        Some(s) => parse_quantity(s)? == 1,
        None => true,
    };
    let block_number = raw.block_number.as_deref().map(parse_u64).transpose()?;
    Ok(Receipt {
        transaction_hash,
        status,
        block_number,
    })
}

#[async_trait]
impl LedgerClient for RpcClient {
    async fn current_nonce(&self, account: &Address) -> Result<u64> {
        let s = self
            .request_string("eth_getTransactionCount", json!([account.to_string(), "pending"]))
            .await?;
        parse_u64(&s)
    }

    async fn gas_price(&self) -> Result<u128> {
        let s = self.request_string("eth_gasPrice", json!([])).await?;
        parse_quantity(&s)
    }

    async fn submit(&self, raw: &[u8]) -> Result<TxHash> {
        let encoded = format!("0x{}", hex::encode(raw));
        let s = self
            .request_string("eth_sendRawTransaction", json!([encoded]))
            .await
            .map_err(|e| match e {
                LedgerError::Rpc { message, .. } => LedgerError::Rejected(message),
                other => other,
            })?;
        Hash32::from_hex(&s).map_err(|e| LedgerError::InvalidResponse(e.to_string()))
    }

    async fn receipt(&self, tx: &TxHash) -> Result<Option<Receipt>> {
        self.request("eth_getTransactionReceipt", json!([tx.to_string()]))
            .await?
            .map(parse_receipt)
            .transpose()
    }

    async fn call_read(&self, to: &Address, data: &[u8]) -> Result<Vec<u8>> {
        let call = json!({
            "to": to.to_string(),
            "data": format!("0x{}", hex::encode(data)),
        });
        let s = self.request_string("eth_call", json!([call, "latest"])).await?;
        parse_data(&s)
    }

    async fn latest_block_timestamp(&self) -> Result<u64> {
        let block = self
            .request("eth_getBlockByNumber", json!(["latest", false]))
            .await?
            .ok_or_else(|| LedgerError::InvalidResponse("no latest block".into()))?;
        let block: RpcBlock = serde_json::from_value(block)?;
        parse_u64(&block.timestamp)
    }

    fn description(&self) -> &str {
        "JSON-RPC client"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity("0x0").unwrap(), 0);
        assert_eq!(parse_quantity("0x1a").unwrap(), 26);
        assert_eq!(parse_quantity("0x4a817c800").unwrap(), 20_000_000_000);
        assert!(parse_quantity("1a").is_err());
        assert!(parse_quantity("0x").is_err());
        assert!(parse_quantity("0xzz").is_err());
    }

    #[test]
    fn test_format_quantity() {
        assert_eq!(format_quantity(0), "0x0");
        assert_eq!(format_quantity(1024), "0x400");
    }

    #[test]
    fn test_parse_successful_receipt() {
        let value = json!({
            "transactionHash": format!("0x{}", "ab".repeat(32)),
            "status": "0x1",
            "blockNumber": "0x10",
            "gasUsed": "0x5208"
        });
        let receipt = parse_receipt(value).unwrap();
        assert!(receipt.is_success());
        assert_eq!(receipt.block_number, Some(16));
        assert_eq!(receipt.transaction_hash, Hash32::from_bytes([0xab; 32]));
    }

    #[test]
    fn test_parse_reverted_receipt() {
        let value = json!({
            "transactionHash": format!("0x{}", "01".repeat(32)),
            "status": "0x0",
            "blockNumber": null
        });
        let receipt = parse_receipt(value).unwrap();
        assert!(!receipt.is_success());
        assert_eq!(receipt.block_number, None);
    }

    #[test]
    fn test_rpc_error_response_shape() {
        let response: RpcResponse = serde_json::from_value(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": {"code": -32000, "message": "nonce too low"}
        }))
        .unwrap();
        assert!(response.result.is_none());
        let err = response.error.unwrap();
        assert_eq!(err.code, -32000);
        assert_eq!(err.message, "nonce too low");
    }

    #[test]
    fn test_request_serialization() {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: 7,
            method: "eth_gasPrice",
            params: json!([]),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["jsonrpc"], "2.0");
        assert_eq!(value["id"], 7);
        assert_eq!(value["method"], "eth_gasPrice");
    }
}
