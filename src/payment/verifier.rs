//! Payment verifier: confirms a claimed transaction paid the expected amount.
//!
//! Verification never fails with an error. Anything that prevents a positive
//! answer (unknown transaction, reverted transaction, no matching transfer,
//! unreadable ledger) is an [`PaymentOutcome::Unverified`] with a reason;
//! ledger faults are additionally logged for operators.

use crate::ledger::{lower_hex, parse_tx_hash, LedgerRead};
use crate::payment::transfer::{
    decode_transfers, find_matching_transfer, ExpectedTransfer, TransferEvent,
};
use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A caller's claim that `payer` paid `payee` at least `minimum_amount` in
/// the transaction `transaction_reference`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentClaim {
    /// Transaction hash as supplied by the client.
    pub transaction_reference: String,
    /// Expected sender.
    pub payer: Address,
    /// Expected recipient.
    pub payee: Address,
    /// Minimum amount in base units.
    pub minimum_amount: U256,
}

impl PaymentClaim {
    fn expected(&self) -> ExpectedTransfer {
        ExpectedTransfer {
            from: self.payer,
            to: self.payee,
            minimum: self.minimum_amount,
        }
    }
}

/// Why a payment could not be verified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "code", content = "detail", rename_all = "snake_case")]
pub enum UnverifiedReason {
    /// The ledger has no receipt for the transaction (unknown or not yet
    /// mined).
    NotFound,
    /// The transaction was mined but did not succeed.
    TransactionFailed,
    /// The transaction succeeded but no transfer matched the claim.
    NoMatchingTransfer,
    /// The transaction reference is not a 32-byte hash.
    MalformedReference,
    /// The ledger could not be read; the diagnostic is for operators.
    LedgerFault(String),
}

impl UnverifiedReason {
    /// Stable machine-readable code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::TransactionFailed => "transaction_failed",
            Self::NoMatchingTransfer => "no_matching_transfer",
            Self::MalformedReference => "malformed_reference",
            Self::LedgerFault(_) => "ledger_fault",
        }
    }

    /// Returns true if asking again later could produce a different answer.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::NotFound | Self::LedgerFault(_))
    }
}

impl fmt::Display for UnverifiedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => f.write_str("transaction not found"),
            Self::TransactionFailed => f.write_str("transaction failed"),
            Self::NoMatchingTransfer => f.write_str("no matching transfer in transaction"),
            Self::MalformedReference => f.write_str("malformed transaction reference"),
            // The diagnostic stays in logs.
            Self::LedgerFault(_) => f.write_str("payment could not be checked"),
        }
    }
}

/// Result of a payment verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentOutcome {
    /// A transfer in the transaction satisfies the claim.
    Verified(TransferEvent),
    /// The claim could not be confirmed.
    Unverified(UnverifiedReason),
}

impl PaymentOutcome {
    /// Returns true if the payment was verified.
    #[must_use]
    pub fn is_verified(&self) -> bool {
        matches!(self, Self::Verified(_))
    }

    /// The reason, if unverified.
    #[must_use]
    pub fn reason(&self) -> Option<&UnverifiedReason> {
        match self {
            Self::Verified(_) => None,
            Self::Unverified(reason) => Some(reason),
        }
    }
}

/// Verifies payment claims against transaction receipts.
pub struct PaymentVerifier<L> {
    ledger: Arc<L>,
}

impl<L> Clone for PaymentVerifier<L> {
    fn clone(&self) -> Self {
        Self {
            ledger: Arc::clone(&self.ledger),
        }
    }
}

impl<L: LedgerRead> PaymentVerifier<L> {
    /// Create a verifier sharing `ledger`.
    #[must_use]
    pub fn new(ledger: Arc<L>) -> Self {
        Self { ledger }
    }

    /// Verify `claim` with a single receipt read.
    ///
    /// Only transfers emitted by the ledger's token contract are considered.
    /// Dropping the returned future abandons the read without side effects.
    pub async fn verify_payment(&self, claim: &PaymentClaim) -> PaymentOutcome {
        let Ok(tx_hash) = parse_tx_hash(&claim.transaction_reference) else {
            debug!(
                "Rejecting malformed transaction reference {:?}",
                claim.transaction_reference
            );
            return PaymentOutcome::Unverified(UnverifiedReason::MalformedReference);
        };

        let receipt = match self.ledger.transaction_receipt(tx_hash).await {
            Ok(Some(receipt)) => receipt,
            Ok(None) => {
                debug!("Transaction {tx_hash} not found");
                return PaymentOutcome::Unverified(UnverifiedReason::NotFound);
            }
            Err(e) => {
                warn!("Payment check for transaction {tx_hash} failed: {e}");
                return PaymentOutcome::Unverified(UnverifiedReason::LedgerFault(e.to_string()));
            }
        };

        if !receipt.succeeded() {
            debug!(
                "Transaction {tx_hash} did not succeed (status={:?})",
                receipt.status
            );
            return PaymentOutcome::Unverified(UnverifiedReason::TransactionFailed);
        }

        let events = decode_transfers(&receipt, self.ledger.token_address());
        match find_matching_transfer(&events, &claim.expected()) {
            Some(event) => {
                info!(
                    "Payment verified: {} -> {} amount={} tx={tx_hash}",
                    lower_hex(&event.from),
                    lower_hex(&event.to),
                    event.amount
                );
                PaymentOutcome::Verified(*event)
            }
            None => {
                debug!(
                    "No transfer of >= {} from {} to {} among {} transfer(s) in {tx_hash}",
                    claim.minimum_amount,
                    lower_hex(&claim.payer),
                    lower_hex(&claim.payee),
                    events.len()
                );
                PaymentOutcome::Unverified(UnverifiedReason::NoMatchingTransfer)
            }
        }
    }
}
