//! Test harness wiring an [`AccessGate`] to a ledger and test wallets.
//!
//! Two backends are supported:
//! - [`StaticLedger`] for fast, fully in-memory scenarios
//! - [`MockRpcNode`] + [`JsonRpcLedger`] to exercise the JSON-RPC client

use super::rpc::MockRpcNode;
use alloy_primitives::{Address, B256, U256};
use k256::ecdsa::SigningKey;
use skillforge_gate::auth::{address_of, sign_challenge, REPLAY_WINDOW_MS};
use skillforge_gate::gate::retry::RetryPolicy;
use skillforge_gate::ledger::{lower_hex, parse_units};
use skillforge_gate::{
    AccessGate, Challenge, GateConfig, JsonRpcLedger, LedgerRead, Listing, StaticLedger,
    TokenAmount,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Error type for test harness operations.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// Gate or ledger construction failed.
    #[error("Gate error: {0}")]
    Gate(#[from] skillforge_gate::Error),
}

/// Result type for harness operations.
pub type Result<T> = std::result::Result<T, HarnessError>;

/// Token contract used by every harness.
pub const TEST_TOKEN: Address = Address::new([0x29; 20]);

/// A wallet that signs challenges like a browser client would.
pub struct TestWallet {
    key: SigningKey,
}

impl TestWallet {
    /// Fresh random wallet.
    #[must_use]
    pub fn random() -> Self {
        Self {
            key: SigningKey::random(&mut rand::rngs::OsRng),
        }
    }

    /// Wallet address.
    #[must_use]
    pub fn address(&self) -> Address {
        address_of(self.key.verifying_key())
    }

    /// Challenge signed now.
    #[must_use]
    pub fn challenge(&self) -> Challenge {
        self.challenge_aged(0)
    }

    /// Challenge signed `age_ms` milliseconds ago.
    ///
    /// # Panics
    ///
    /// Panics if signing fails.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn challenge_aged(&self, age_ms: i64) -> Challenge {
        let issued_at = chrono::Utc::now().timestamp_millis() - age_ms;
        sign_challenge(&self.key, "SkillForge", issued_at).expect("sign challenge")
    }

    /// Challenge older than the replay window.
    #[must_use]
    pub fn stale_challenge(&self) -> Challenge {
        self.challenge_aged(REPLAY_WINDOW_MS + 60_000)
    }
}

/// Base units for a decimal token string.
///
/// # Panics
///
/// Panics if `amount` is not a valid decimal.
#[must_use]
#[allow(clippy::expect_used)]
pub fn tokens(amount: &str) -> U256 {
    parse_units(amount, 18).expect("token amount")
}

/// A listing priced in tokens.
///
/// # Panics
///
/// Panics if `price` is not a valid decimal.
#[must_use]
#[allow(clippy::expect_used)]
pub fn listing(author: Address, price: &str) -> Listing {
    Listing {
        author,
        price: TokenAmount::parse(price, 18).expect("price"),
    }
}

/// `0x`-prefixed transaction reference.
#[must_use]
pub fn tx_reference(hash: B256) -> String {
    format!("0x{}", hex::encode(hash.as_slice()))
}

fn test_config(rpc_url: &str) -> GateConfig {
    let mut config = GateConfig::default();
    config.ledger.rpc_url = rpc_url.to_string();
    config.ledger.token_address = lower_hex(&TEST_TOKEN);
    config.ledger.request_timeout_secs = 5;
    config
}

fn fast_retry() -> RetryPolicy {
    RetryPolicy::new(3, Duration::from_millis(5), Duration::from_millis(20))
}

/// Test harness owning the gate and its ledger.
pub struct TestHarness<L> {
    /// Gate under test.
    pub gate: AccessGate<L>,
    /// The ledger shared by the gate's components.
    pub ledger: Arc<L>,
}

impl TestHarness<StaticLedger> {
    /// Harness over an in-memory ledger.
    ///
    /// # Errors
    ///
    /// Returns an error if the gate cannot be built.
    pub fn in_memory(ledger: StaticLedger) -> Result<Self> {
        let ledger = Arc::new(ledger);
        let gate = AccessGate::new(Arc::clone(&ledger), &test_config("http://127.0.0.1:1"))?
            .with_retry(fast_retry());
        Ok(Self { gate, ledger })
    }
}

impl TestHarness<JsonRpcLedger> {
    /// Harness over a JSON-RPC client pointed at `node`.
    ///
    /// # Errors
    ///
    /// Returns an error if the client or gate cannot be built.
    pub fn over_rpc(node: &MockRpcNode) -> Result<Self> {
        let config = test_config(&node.url());
        let ledger = Arc::new(JsonRpcLedger::new(&config.ledger)?);
        let gate = AccessGate::new(Arc::clone(&ledger), &config)?.with_retry(fast_retry());
        info!("Harness connected to mock RPC node at {}", node.url());
        Ok(Self { gate, ledger })
    }
}

impl<L: LedgerRead> TestHarness<L> {
    /// Token contract of the harness ledger.
    #[must_use]
    pub fn token(&self) -> Address {
        self.ledger.token_address()
    }
}
