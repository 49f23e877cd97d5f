//! Service configuration
//!
//! Read once at startup from `ANCHOR_*` environment variables.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::Level;

use anchor_core::Address;

/// Errors reading configuration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Connection details for a real ledger
#[derive(Clone)]
pub struct RpcSettings {
    pub url: String,
    pub chain_id: u64,
    /// Hex secp256k1 key; kept as text until the ledger is built
    pub signer_key: String,
    pub registry_contract: Address,
    pub credential_contract: Address,
    pub receipt_poll: Duration,
}

impl fmt::Debug for RpcSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcSettings")
            .field("url", &self.url)
            .field("chain_id", &self.chain_id)
            .field("signer_key", &"<redacted>")
            .field("registry_contract", &self.registry_contract)
            .field("credential_contract", &self.credential_contract)
            .field("receipt_poll", &self.receipt_poll)
            .finish()
    }
}

/// Everything the binary needs to start
#[derive(Debug, Clone)]
pub struct PlaneConfig {
    pub port: u16,
    pub log_level: Level,
    pub name: Option<String>,
    pub admin_addresses: Vec<Address>,
    /// `None` runs against the in-memory ledger
    pub rpc: Option<RpcSettings>,
    pub ledger_timeout: Duration,
    pub database_url: Option<String>,
}

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_CHAIN_ID: u64 = 11_155_111;
pub const DEFAULT_LEDGER_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_RECEIPT_POLL_MS: u64 = 2000;

impl PlaneConfig {
    /// Read from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read from a fixed map, for tests
    pub fn from_map(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        Self::from_lookup(|key| vars.get(key).cloned())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let port = parse_or(&get, "ANCHOR_PORT", DEFAULT_PORT)?;

        let log_level = match get("ANCHOR_LOG_LEVEL") {
            Some(level) => level.parse().map_err(|_| ConfigError::Invalid {
                var: "ANCHOR_LOG_LEVEL",
                reason: format!("unknown level '{}'", level),
            })?,
            None => Level::INFO,
        };

        let admin_addresses = parse_admins(
            &get("ANCHOR_ADMIN_ADDRESSES").ok_or(ConfigError::Missing("ANCHOR_ADMIN_ADDRESSES"))?,
        )?;

        let ledger_timeout = Duration::from_secs(parse_or(
            &get,
            "ANCHOR_LEDGER_TIMEOUT_SECS",
            DEFAULT_LEDGER_TIMEOUT_SECS,
        )?);

        let rpc = match get("ANCHOR_RPC_URL") {
            Some(url) => Some(RpcSettings {
                url,
                chain_id: parse_or(&get, "ANCHOR_CHAIN_ID", DEFAULT_CHAIN_ID)?,
                signer_key: get("ANCHOR_SIGNER_KEY")
                    .ok_or(ConfigError::Missing("ANCHOR_SIGNER_KEY"))?,
                registry_contract: parse_address(&get, "ANCHOR_REGISTRY_CONTRACT")?,
                credential_contract: parse_address(&get, "ANCHOR_CREDENTIAL_CONTRACT")?,
                receipt_poll: Duration::from_millis(parse_or(
                    &get,
                    "ANCHOR_RECEIPT_POLL_MS",
                    DEFAULT_RECEIPT_POLL_MS,
                )?),
            }),
            None => None,
        };

        Ok(Self {
            port,
            log_level,
            name: get("ANCHOR_NAME"),
            admin_addresses,
            rpc,
            ledger_timeout,
            database_url: get("ANCHOR_DATABASE_URL"),
        })
    }
}

fn parse_or<G, T>(get: &G, var: &'static str, default: T) -> Result<T, ConfigError>
where
    G: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match get(var) {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

fn parse_address<G>(get: &G, var: &'static str) -> Result<Address, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    get(var)
        .ok_or(ConfigError::Missing(var))?
        .parse()
        .map_err(|e: anchor_core::AnchorError| ConfigError::Invalid {
            var,
            reason: e.to_string(),
        })
}

fn parse_admins(raw: &str) -> Result<Vec<Address>, ConfigError> {
    let admins = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse().map_err(|e: anchor_core::AnchorError| ConfigError::Invalid {
                var: "ANCHOR_ADMIN_ADDRESSES",
                reason: format!("'{}': {}", s, e),
            })
        })
        .collect::<Result<Vec<Address>, _>>()?;

    if admins.is_empty() {
        return Err(ConfigError::Missing("ANCHOR_ADMIN_ADDRESSES"));
    }
    Ok(admins)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADMIN1: &str = "0x31b39c6f5e83fc03b7dd5a98047a3c75fd1de487";
    const ADMIN2: &str = "0x2C7536E3605D9C16A7A3D7B1898E529396A65C23";

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_with_mock_ledger() {
        let admins = format!("{}, {}", ADMIN1, ADMIN2);
        let config = PlaneConfig::from_map(&vars(&[("ANCHOR_ADMIN_ADDRESSES", &admins)])).unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.log_level, Level::INFO);
        assert_eq!(config.admin_addresses.len(), 2);
        assert_eq!(
            config.admin_addresses[1].to_string(),
            "0x2c7536e3605d9c16a7a3d7b1898e529396a65c23"
        );
        assert!(config.rpc.is_none());
        assert_eq!(config.ledger_timeout, Duration::from_secs(120));
        assert!(config.database_url.is_none());
    }

    #[test]
    fn test_admins_required() {
        assert_eq!(
            PlaneConfig::from_map(&vars(&[])).unwrap_err(),
            ConfigError::Missing("ANCHOR_ADMIN_ADDRESSES")
        );
        assert_eq!(
            PlaneConfig::from_map(&vars(&[("ANCHOR_ADMIN_ADDRESSES", " , ")])).unwrap_err(),
            ConfigError::Missing("ANCHOR_ADMIN_ADDRESSES")
        );
    }

    #[test]
    fn test_bad_admin_address_named() {
        let err =
            PlaneConfig::from_map(&vars(&[("ANCHOR_ADMIN_ADDRESSES", "0x1234")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "ANCHOR_ADMIN_ADDRESSES", .. }));
    }

    #[test]
    fn test_bad_port() {
        let err = PlaneConfig::from_map(&vars(&[
            ("ANCHOR_ADMIN_ADDRESSES", ADMIN1),
            ("ANCHOR_PORT", "eighty"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "ANCHOR_PORT", .. }));
    }

    #[test]
    fn test_rpc_requires_signer_and_contracts() {
        let err = PlaneConfig::from_map(&vars(&[
            ("ANCHOR_ADMIN_ADDRESSES", ADMIN1),
            ("ANCHOR_RPC_URL", "http://localhost:8545"),
        ]))
        .unwrap_err();
        assert_eq!(err, ConfigError::Missing("ANCHOR_SIGNER_KEY"));

        let config = PlaneConfig::from_map(&vars(&[
            ("ANCHOR_ADMIN_ADDRESSES", ADMIN1),
            ("ANCHOR_RPC_URL", "http://localhost:8545"),
            (
                "ANCHOR_SIGNER_KEY",
                "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318",
            ),
            ("ANCHOR_REGISTRY_CONTRACT", ADMIN1),
            ("ANCHOR_CREDENTIAL_CONTRACT", ADMIN2),
            ("ANCHOR_CHAIN_ID", "31337"),
            ("ANCHOR_RECEIPT_POLL_MS", "250"),
        ]))
        .unwrap();

        let rpc = config.rpc.unwrap();
        assert_eq!(rpc.chain_id, 31337);
        assert_eq!(rpc.receipt_poll, Duration::from_millis(250));
        assert_eq!(rpc.url, "http://localhost:8545");
    }

    #[test]
    fn test_log_level_parsing() {
        let config = PlaneConfig::from_map(&vars(&[
            ("ANCHOR_ADMIN_ADDRESSES", ADMIN1),
            ("ANCHOR_LOG_LEVEL", "debug"),
        ]))
        .unwrap();
        assert_eq!(config.log_level, Level::DEBUG);

        let err = PlaneConfig::from_map(&vars(&[
            ("ANCHOR_ADMIN_ADDRESSES", ADMIN1),
            ("ANCHOR_LOG_LEVEL", "chatty"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "ANCHOR_LOG_LEVEL", .. }));
    }
}
