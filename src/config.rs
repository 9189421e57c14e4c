//! Configuration for skillforge-gate.

use crate::error::{Error, Result};
use crate::ledger::{parse_address, parse_units, units::MAX_DECIMALS};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default JSON-RPC endpoint (Base mainnet).
pub const DEFAULT_RPC_URL: &str = "https://mainnet.base.org";

/// Default marketplace token contract.
pub const DEFAULT_TOKEN_ADDRESS: &str = "0x299c30DD5974BF4D5bFE42C340CA40462816AB07";

/// Default minimum balance, in whole tokens, required to publish.
pub const DEFAULT_MIN_PUBLISH_BALANCE: &str = "100000";

/// Gate configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateConfig {
    /// Ledger-read client configuration.
    #[serde(default)]
    pub ledger: LedgerConfig,

    /// Challenge authentication configuration.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Publish gate configuration.
    #[serde(default)]
    pub publish: PublishConfig,

    /// Payment verification configuration.
    #[serde(default)]
    pub payment: PaymentConfig,

    /// Log level.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Ledger-read client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// JSON-RPC endpoint URL.
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,

    /// ERC-20 token contract address.
    #[serde(default = "default_token_address")]
    pub token_address: String,

    /// Token decimals.
    #[serde(default = "default_token_decimals")]
    pub token_decimals: u8,

    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

/// Challenge authentication configuration.
///
/// The replay window is deliberately absent: it is fixed at
/// [`crate::auth::REPLAY_WINDOW`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Namespace prefix of the signed message (`<namespace>:<timestamp>`).
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

/// Publish gate configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishConfig {
    /// Minimum token balance, in whole tokens, required to publish.
    #[serde(default = "default_min_balance")]
    pub min_balance_tokens: String,
}

/// Payment verification configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentConfig {
    /// Caller-side retry policy for payment and balance checks.
    #[serde(default)]
    pub retry: RetryConfig,
}

/// Bounded exponential backoff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the second attempt, in milliseconds.
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,

    /// Upper bound on any single delay, in milliseconds.
    #[serde(default = "default_max_backoff")]
    pub max_backoff_ms: u64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            ledger: LedgerConfig::default(),
            auth: AuthConfig::default(),
            publish: PublishConfig::default(),
            payment: PaymentConfig::default(),
            log_level: default_log_level(),
        }
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
            token_address: default_token_address(),
            token_decimals: default_token_decimals(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
        }
    }
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            min_balance_tokens: default_min_balance(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_ms: default_max_backoff(),
        }
    }
}

impl LedgerConfig {
    /// Per-request timeout.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn default_rpc_url() -> String {
    DEFAULT_RPC_URL.to_string()
}

fn default_token_address() -> String {
    DEFAULT_TOKEN_ADDRESS.to_string()
}

const fn default_token_decimals() -> u8 {
    crate::ledger::DEFAULT_DECIMALS
}

const fn default_request_timeout() -> u64 {
    15
}

fn default_namespace() -> String {
    crate::auth::DEFAULT_NAMESPACE.to_string()
}

fn default_min_balance() -> String {
    DEFAULT_MIN_PUBLISH_BALANCE.to_string()
}

const fn default_max_attempts() -> u32 {
    4
}

const fn default_initial_backoff() -> u64 {
    2_000
}

const fn default_max_backoff() -> u64 {
    15_000
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Platform config file location (`<config dir>/skillforge/gate.toml`).
#[must_use]
pub fn default_config_path() -> PathBuf {
    directories::ProjectDirs::from("", "", "skillforge")
        .map(|dirs| dirs.config_dir().join("gate.toml"))
        .unwrap_or_else(|| PathBuf::from("skillforge-gate.toml"))
}

impl GateConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| Error::Config(e.to_string()))
    }

    /// Save configuration to a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check that every field can be used to build the gate.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        let ledger = &self.ledger;
        if !(ledger.rpc_url.starts_with("http://") || ledger.rpc_url.starts_with("https://")) {
            return Err(Error::Config(format!(
                "ledger.rpc_url must be an http(s) URL, got {:?}",
                ledger.rpc_url
            )));
        }
        parse_address(&ledger.token_address)
            .map_err(|e| Error::Config(format!("ledger.token_address: {e}")))?;
        if ledger.token_decimals > MAX_DECIMALS {
            return Err(Error::Config(format!(
                "ledger.token_decimals must be at most {MAX_DECIMALS}"
            )));
        }
        if ledger.request_timeout_secs == 0 {
            return Err(Error::Config(
                "ledger.request_timeout_secs must be positive".to_string(),
            ));
        }

        if self.auth.namespace.is_empty() || self.auth.namespace.contains(':') {
            return Err(Error::Config(
                "auth.namespace must be non-empty and must not contain ':'".to_string(),
            ));
        }

        parse_units(&self.publish.min_balance_tokens, ledger.token_decimals)
            .map_err(|e| Error::Config(format!("publish.min_balance_tokens: {e}")))?;

        let retry = &self.payment.retry;
        if retry.max_attempts == 0 {
            return Err(Error::Config(
                "payment.retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if retry.initial_backoff_ms > retry.max_backoff_ms {
            return Err(Error::Config(
                "payment.retry.initial_backoff_ms exceeds max_backoff_ms".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_are_valid() {
        let config = GateConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.auth.namespace, "SkillForge");
        assert_eq!(config.publish.min_balance_tokens, "100000");
        assert_eq!(config.ledger.token_decimals, 18);
        assert_eq!(config.ledger.request_timeout(), Duration::from_secs(15));
    }

    #[test]
    fn test_default_matches_empty_file() {
        let parsed: GateConfig = toml::from_str("").expect("empty config");
        assert_eq!(GateConfig::default(), parsed);
        assert_eq!(GateConfig::default().log_level, "info");
    }

    #[test]
    fn test_written_defaults_keep_log_level() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("gate.toml");
        GateConfig::default().to_file(&path).expect("write");

        let written = std::fs::read_to_string(&path).expect("read");
        assert!(written.contains("log_level = \"info\""));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: GateConfig = toml::from_str(
            r#"
            log_level = "debug"

            [ledger]
            rpc_url = "http://127.0.0.1:8545"
            "#,
        )
        .expect("parse");

        assert_eq!(config.log_level, "debug");
        assert_eq!(config.ledger.rpc_url, "http://127.0.0.1:8545");
        assert_eq!(config.ledger.token_address, DEFAULT_TOKEN_ADDRESS);
        assert_eq!(config.payment.retry, RetryConfig::default());
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("gate.toml");

        let mut config = GateConfig::default();
        config.publish.min_balance_tokens = "250".to_string();
        config.payment.retry.max_attempts = 2;

        config.to_file(&path).expect("write");
        let loaded = GateConfig::from_file(&path).expect("read");
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_file() {
        let result = GateConfig::from_file(Path::new("/nonexistent/skillforge/gate.toml"));
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn test_validate_rejects_bad_fields() {
        let mut config = GateConfig::default();
        config.ledger.token_address = "0x1234".to_string();
        assert!(config.validate().is_err());

        let mut config = GateConfig::default();
        config.ledger.rpc_url = "ftp://example.com".to_string();
        assert!(config.validate().is_err());

        let mut config = GateConfig::default();
        config.auth.namespace = "Skill:Forge".to_string();
        assert!(config.validate().is_err());

        let mut config = GateConfig::default();
        config.publish.min_balance_tokens = "lots".to_string();
        assert!(config.validate().is_err());

        let mut config = GateConfig::default();
        config.payment.retry.max_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = GateConfig::default();
        config.payment.retry.initial_backoff_ms = 20_000;
        assert!(config.validate().is_err());
    }
}
