//! Contract-level entry points
//!
//! The plane talks to two contracts: the issuer registry, which holds the
//! committed Merkle root, and the credential store, which accepts a
//! credential together with the issuer's inclusion proof.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use anchor_core::{Address, CredentialRecord, KeyPair, RootHash};

use crate::abi::{self, ParamType, Token};
use crate::client::LedgerClient;
use crate::error::{LedgerError, Result};
use crate::tx::{build_and_sign, TxSpec};
use crate::types::{CredentialSubmission, Receipt};

/// `updateMerkleRoot(bytes32)`
pub const UPDATE_ROOT_SIGNATURE: &str = "updateMerkleRoot(bytes32)";

/// `storeCredential(CredentialInfo, bytes32[] proof, bool[] isLeft, bytes32 leaf)`
pub const STORE_CREDENTIAL_SIGNATURE: &str =
    "storeCredential((bytes32,address,address,uint256,string),bytes32[],bool[],bytes32)";

/// `pullCredential(address) returns (CredentialInfo[])`
pub const PULL_CREDENTIAL_SIGNATURE: &str = "pullCredential(address)";

/// Sepolia
pub const DEFAULT_CHAIN_ID: u64 = 11_155_111;
pub const DEFAULT_ROOT_GAS_LIMIT: u64 = 200_000;
pub const DEFAULT_CREDENTIAL_GAS_LIMIT: u64 = 300_000;
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);
pub const DEFAULT_RECEIPT_TIMEOUT: Duration = Duration::from_secs(120);

/// Operations the plane needs from the ledger
///
/// Submissions return the mined receipt whatever its status; callers decide
/// what a reverted transaction means for them.
#[async_trait]
pub trait AnchorLedger: Send + Sync {
    /// Commit a new issuer-set root
    async fn update_merkle_root(&self, root: &RootHash) -> Result<Receipt>;

    /// Anchor one credential against the committed root
    async fn store_credential(&self, submission: &CredentialSubmission) -> Result<Receipt>;

    /// All credentials held by `holder`
    async fn pull_credentials(&self, holder: &Address) -> Result<Vec<CredentialRecord>>;

    /// Get a description of this ledger (for logging)
    fn description(&self) -> &str {
        "anchor ledger"
    }
}

/// Contract addresses and transaction parameters
#[derive(Debug, Clone)]
pub struct ContractConfig {
    pub chain_id: u64,
    pub registry_contract: Address,
    pub credential_contract: Address,
    pub root_gas_limit: u64,
    pub credential_gas_limit: u64,
    pub poll_interval: Duration,
    /// How long to wait for a broadcast transaction to be mined
    pub receipt_timeout: Duration,
}

impl ContractConfig {
    pub fn new(registry_contract: Address, credential_contract: Address) -> Self {
        Self {
            chain_id: DEFAULT_CHAIN_ID,
            registry_contract,
            credential_contract,
            root_gas_limit: DEFAULT_ROOT_GAS_LIMIT,
            credential_gas_limit: DEFAULT_CREDENTIAL_GAS_LIMIT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            receipt_timeout: DEFAULT_RECEIPT_TIMEOUT,
        }
    }

    pub fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = chain_id;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_receipt_timeout(mut self, timeout: Duration) -> Self {
        self.receipt_timeout = timeout;
        self
    }
}

/// `AnchorLedger` backed by real contracts through a `LedgerClient`
pub struct ContractLedger {
    client: Arc<dyn LedgerClient>,
    signer: KeyPair,
    config: ContractConfig,
    /// Serializes nonce lookup and broadcast so two submissions never share a nonce
    send_lock: Mutex<()>,
}

impl ContractLedger {
    pub fn new(client: Arc<dyn LedgerClient>, signer: KeyPair, config: ContractConfig) -> Self {
        info!(
            client = client.description(),
            signer = %signer.address(),
            chain_id = config.chain_id,
            registry = %config.registry_contract,
            credentials = %config.credential_contract,
            "Contract ledger configured"
        );
        Self {
            client,
            signer,
            config,
            send_lock: Mutex::new(()),
        }
    }

    /// Sign, broadcast and wait for the receipt of one contract call
    async fn transact(&self, to: Address, data: Vec<u8>, gas_limit: u64) -> Result<Receipt> {
        let tx_hash = {
            let _guard = self.send_lock.lock().await;

            let nonce = self.client.current_nonce(&self.signer.address()).await?;
            let gas_price = self.client.gas_price().await?;
            let spec = TxSpec {
                nonce,
                gas_price,
                gas_limit,
                to,
                value: 0,
                data,
                chain_id: self.config.chain_id,
            };
            let signed = build_and_sign(&spec, &self.signer)?;

            let reported = self.client.submit(&signed.raw).await?;
            if reported != signed.hash {
                warn!(
                    expected = %signed.hash,
                    reported = %reported,
                    "Node reported an unexpected transaction hash"
                );
            }
            debug!(tx = %reported, nonce, to = %to, "Transaction broadcast");
            reported
        };

        let receipt = self
            .client
            .await_receipt(&tx_hash, self.config.poll_interval, self.config.receipt_timeout)
            .await?;
        debug!(tx = %tx_hash, status = receipt.status, "Transaction mined");
        Ok(receipt)
    }
}

fn credential_tuple_type() -> ParamType {
    ParamType::Tuple(vec![
        ParamType::FixedBytes32,
        ParamType::Address,
        ParamType::Address,
        ParamType::Uint,
        ParamType::String,
    ])
}

fn record_from_token(token: Token) -> Result<CredentialRecord> {
    let invalid = || LedgerError::InvalidResponse("malformed credential tuple".into());

    let mut fields = token.into_tuple().ok_or_else(invalid)?.into_iter();
    let mut next = || fields.next().ok_or_else(invalid);

    let credential_hash = next()?.into_fixed_bytes().ok_or_else(invalid)?;
    let issuer = next()?.into_address().ok_or_else(invalid)?;
    let holder = next()?.into_address().ok_or_else(invalid)?;
    let issued_at = next()?.into_uint().ok_or_else(invalid)?;
    let data = next()?.into_string().ok_or_else(invalid)?;

    Ok(CredentialRecord {
        credential_hash,
        issuer,
        holder,
        issued_at: u64::try_from(issued_at).map_err(|_| invalid())?,
        data,
    })
}

/// Call data for `updateMerkleRoot`
pub fn encode_update_root(root: &RootHash) -> Vec<u8> {
    abi::encode_call(UPDATE_ROOT_SIGNATURE, &[Token::FixedBytes(*root)])
}

/// Call data for `storeCredential`
pub fn encode_store_credential(submission: &CredentialSubmission, issued_at: u64) -> Vec<u8> {
    let info = Token::Tuple(vec![
        Token::FixedBytes(submission.credential_hash),
        Token::Address(submission.issuer),
        Token::Address(submission.holder),
        Token::Uint(issued_at as u128),
        Token::String(submission.data.clone()),
    ]);
    let proof = Token::Array(submission.proof.iter().copied().map(Token::FixedBytes).collect());
    let side_bits = Token::Array(submission.side_bits.iter().copied().map(Token::Bool).collect());

    abi::encode_call(
        STORE_CREDENTIAL_SIGNATURE,
        &[info, proof, side_bits, Token::FixedBytes(submission.leaf)],
    )
}

/// Decode the return data of `pullCredential`
pub fn decode_credentials(data: &[u8]) -> Result<Vec<CredentialRecord>> {
    let tokens = abi::decode(&[ParamType::Array(Box::new(credential_tuple_type()))], data)?;
    let items = tokens
        .into_iter()
        .next()
        .and_then(Token::into_array)
        .ok_or_else(|| LedgerError::InvalidResponse("expected a credential array".into()))?;
    items.into_iter().map(record_from_token).collect()
}

#[async_trait]
impl AnchorLedger for ContractLedger {
    async fn update_merkle_root(&self, root: &RootHash) -> Result<Receipt> {
        info!(root = %root, "Submitting root update");
        self.transact(
            self.config.registry_contract,
            encode_update_root(root),
            self.config.root_gas_limit,
        )
        .await
    }

    async fn store_credential(&self, submission: &CredentialSubmission) -> Result<Receipt> {
        let issued_at = self.client.latest_block_timestamp().await?;
        info!(
            credential = %submission.credential_hash,
            issuer = %submission.issuer,
            holder = %submission.holder,
            issued_at,
            "Submitting credential"
        );
        self.transact(
            self.config.credential_contract,
            encode_store_credential(submission, issued_at),
            self.config.credential_gas_limit,
        )
        .await
    }

    async fn pull_credentials(&self, holder: &Address) -> Result<Vec<CredentialRecord>> {
        let data = abi::encode_call(PULL_CREDENTIAL_SIGNATURE, &[Token::Address(*holder)]);
        let output = self
            .client
            .call_read(&self.config.credential_contract, &data)
            .await?;
        decode_credentials(&output)
    }

    fn description(&self) -> &str {
        "contract ledger"
    }
}
