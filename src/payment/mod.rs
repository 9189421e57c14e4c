//! Token balance and payment verification against the ledger.
//!
//! Both components read the ledger through an injected [`LedgerRead`]
//! handle and perform exactly one read per call. Retry is the caller's
//! concern (see [`crate::gate`]).
//!
//! # Payment verification
//!
//! ```text
//! PaymentClaim received
//!        │
//!        ▼
//! ┌─────────────────────┐
//! │ Parse tx reference  │──── malformed ───▶ Unverified(MalformedReference)
//! └─────────┬───────────┘
//!           ▼
//! ┌─────────────────────┐
//! │ Fetch receipt       │──── read fault ──▶ Unverified(LedgerFault)
//! └─────────┬───────────┘
//!           │
//!    ┌──────┴──────┐
//!    │             │
//!  ABSENT      PRESENT
//!    │             │
//!    ▼             ▼
//! NotFound    status == 1? ── no ──▶ Unverified(TransactionFailed)
//!                  │
//!                 yes
//!                  ▼
//!       decode Transfer logs, match any
//!                  │
//!           ┌──────┴──────┐
//!           │             │
//!        MATCH        NO MATCH
//!           │             │
//!           ▼             ▼
//!       Verified    Unverified(NoMatchingTransfer)
//! ```
//!
//! [`LedgerRead`]: crate::ledger::LedgerRead

mod balance;
mod transfer;
mod verifier;

use alloy_primitives::{b256, B256};

/// `keccak256("Transfer(address,address,uint256)")`, topic 0 of every ERC-20
/// transfer log.
pub const TRANSFER_EVENT_TOPIC: B256 =
    b256!("ddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef");

pub use balance::{BalanceDecision, BalanceGate};
pub use transfer::{decode_transfers, find_matching_transfer, ExpectedTransfer, TransferEvent};
pub use verifier::{PaymentClaim, PaymentOutcome, PaymentVerifier, UnverifiedReason};
