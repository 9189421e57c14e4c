//! Balance gate: minimum token holdings for privileged operations.

use crate::error::Result;
use crate::ledger::{lower_hex, LedgerRead};
use alloy_primitives::{Address, U256};
use std::sync::Arc;
use tracing::debug;

/// Outcome of a minimum-balance check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceDecision {
    /// The address holds at least the threshold.
    Allowed {
        /// Observed balance in base units.
        balance: U256,
    },
    /// The address holds less than the threshold.
    Denied {
        /// Observed balance in base units.
        current_balance: U256,
    },
}

impl BalanceDecision {
    /// Returns true if the check passed.
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed { .. })
    }

    /// The observed balance.
    #[must_use]
    pub fn balance(&self) -> U256 {
        match self {
            Self::Allowed { balance } => *balance,
            Self::Denied { current_balance } => *current_balance,
        }
    }
}

/// Compares ledger balances against a threshold.
pub struct BalanceGate<L> {
    ledger: Arc<L>,
}

impl<L> Clone for BalanceGate<L> {
    fn clone(&self) -> Self {
        Self {
            ledger: Arc::clone(&self.ledger),
        }
    }
}

impl<L: LedgerRead> BalanceGate<L> {
    /// Create a gate sharing `ledger`.
    #[must_use]
    pub fn new(ledger: Arc<L>) -> Self {
        Self { ledger }
    }

    /// Check that `address` holds at least `threshold` base units.
    ///
    /// The threshold is inclusive.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::LedgerUnavailable`] if the balance could not be
    /// read. A failed read is never reported as `Denied`.
    pub async fn check_minimum_balance(
        &self,
        address: Address,
        threshold: U256,
    ) -> Result<BalanceDecision> {
        let balance = self.ledger.token_balance(address).await?;
        debug!(
            "Balance of {} is {balance} (threshold {threshold})",
            lower_hex(&address)
        );
        if balance >= threshold {
            Ok(BalanceDecision::Allowed { balance })
        } else {
            Ok(BalanceDecision::Denied {
                current_balance: balance,
            })
        }
    }
}
