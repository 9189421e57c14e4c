//! Typed rejections returned across the HTTP boundary.
//!
//! Every rejection carries a machine-checkable [`RejectionKind`], a
//! human-readable message (its `Display`) and a hint for the client. The
//! HTTP layer renders [`Rejection::body`] as the JSON response.

use crate::ledger::{lower_hex, TokenAmount};
use crate::payment::UnverifiedReason;
use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a request was refused.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// Address, signature or timestamp missing or empty.
    #[error("missing auth headers")]
    MissingCredentials,

    /// The timestamp is not an integer.
    #[error("malformed timestamp")]
    MalformedTimestamp,

    /// The challenge is older than the replay window.
    #[error("signature expired")]
    ExpiredChallenge,

    /// The signature was made by a different key than the claimed address.
    #[error("invalid signature")]
    InvalidSignature,

    /// The signature bytes could not be decoded or recovered.
    #[error("signature verification failed: {0}")]
    SignatureVerificationFailed(String),

    /// The ledger could not be read.
    #[error("ledger unavailable: {0}")]
    LedgerUnavailable(String),

    /// Token holdings below the publish threshold.
    #[error("insufficient token balance")]
    InsufficientBalance {
        /// Threshold.
        required: TokenAmount,
        /// Observed balance.
        current: TokenAmount,
    },

    /// The caller is not the listing's author.
    #[error("not the author")]
    NotAuthor,

    /// A paid item was requested without a transaction reference.
    #[error("payment required")]
    PaymentRequired {
        /// Price.
        amount: TokenAmount,
        /// Who must be paid.
        recipient: Address,
    },

    /// The referenced payment could not be confirmed.
    #[error("payment verification failed: {reason}")]
    PaymentUnverified {
        /// What went wrong.
        reason: UnverifiedReason,
    },
}

/// Machine-checkable rejection category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionKind {
    /// See [`Rejection::MissingCredentials`].
    MissingCredentials,
    /// See [`Rejection::MalformedTimestamp`].
    MalformedTimestamp,
    /// See [`Rejection::ExpiredChallenge`].
    ExpiredChallenge,
    /// See [`Rejection::InvalidSignature`].
    InvalidSignature,
    /// See [`Rejection::SignatureVerificationFailed`].
    SignatureVerificationFailed,
    /// See [`Rejection::LedgerUnavailable`].
    LedgerUnavailable,
    /// See [`Rejection::InsufficientBalance`].
    InsufficientBalance,
    /// See [`Rejection::NotAuthor`].
    NotAuthor,
    /// See [`Rejection::PaymentRequired`].
    PaymentRequired,
    /// See [`Rejection::PaymentUnverified`].
    PaymentUnverified,
}

/// JSON body of a rejection response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectionBody {
    /// Rejection category.
    pub kind: RejectionKind,
    /// Human-readable message.
    pub error: String,
    /// What the client should do next.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    /// Publish threshold, in tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_threshold: Option<String>,
    /// Caller's balance, in tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_balance: Option<String>,
    /// Price, in tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
    /// Payment recipient.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<String>,
}

impl Rejection {
    /// Category of this rejection.
    #[must_use]
    pub fn kind(&self) -> RejectionKind {
        match self {
            Self::MissingCredentials => RejectionKind::MissingCredentials,
            Self::MalformedTimestamp => RejectionKind::MalformedTimestamp,
            Self::ExpiredChallenge => RejectionKind::ExpiredChallenge,
            Self::InvalidSignature => RejectionKind::InvalidSignature,
            Self::SignatureVerificationFailed(_) => RejectionKind::SignatureVerificationFailed,
            Self::LedgerUnavailable(_) => RejectionKind::LedgerUnavailable,
            Self::InsufficientBalance { .. } => RejectionKind::InsufficientBalance,
            Self::NotAuthor => RejectionKind::NotAuthor,
            Self::PaymentRequired { .. } => RejectionKind::PaymentRequired,
            Self::PaymentUnverified { .. } => RejectionKind::PaymentUnverified,
        }
    }

    /// Client-facing hint, where one helps.
    #[must_use]
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::MissingCredentials => Some(format!(
                "Include {}, {}, {}",
                crate::auth::WALLET_ADDRESS_HEADER,
                crate::auth::SIGNATURE_HEADER,
                crate::auth::TIMESTAMP_HEADER
            )),
            Self::MalformedTimestamp => {
                Some("x-timestamp must be milliseconds since the Unix epoch".to_string())
            }
            Self::ExpiredChallenge => Some("Sign a fresh message".to_string()),
            Self::InvalidSignature | Self::SignatureVerificationFailed(_) | Self::NotAuthor => None,
            Self::LedgerUnavailable(_) => Some("Try again shortly".to_string()),
            Self::InsufficientBalance { required, current } => Some(format!(
                "Need at least {required} tokens to publish. Current: {current}"
            )),
            Self::PaymentRequired { amount, recipient } => Some(format!(
                "Send {amount} tokens to {}, then include txHash",
                lower_hex(recipient)
            )),
            Self::PaymentUnverified { .. } => {
                Some("Ensure tx is confirmed and correct amount".to_string())
            }
        }
    }

    /// Suggested HTTP status code.
    #[must_use]
    pub fn http_status(&self) -> u16 {
        match self.kind() {
            RejectionKind::MissingCredentials
            | RejectionKind::MalformedTimestamp
            | RejectionKind::ExpiredChallenge
            | RejectionKind::InvalidSignature
            | RejectionKind::SignatureVerificationFailed => 401,
            RejectionKind::InsufficientBalance | RejectionKind::NotAuthor => 403,
            RejectionKind::PaymentRequired | RejectionKind::PaymentUnverified => 400,
            RejectionKind::LedgerUnavailable => 503,
        }
    }

    /// Returns true if the caller should retry later rather than deny.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::LedgerUnavailable(_))
    }

    /// Response body for this rejection.
    #[must_use]
    pub fn body(&self) -> RejectionBody {
        let mut body = RejectionBody {
            kind: self.kind(),
            error: self.public_message(),
            hint: self.hint(),
            required_threshold: None,
            current_balance: None,
            amount: None,
            recipient: None,
        };
        match self {
            Self::InsufficientBalance { required, current } => {
                body.required_threshold = Some(required.to_string());
                body.current_balance = Some(current.to_string());
            }
            Self::PaymentRequired { amount, recipient } => {
                body.amount = Some(amount.to_string());
                body.recipient = Some(lower_hex(recipient));
            }
            _ => {}
        }
        body
    }

    // Internal diagnostics (recovery errors, RPC failures) stay in logs.
    fn public_message(&self) -> String {
        match self {
            Self::SignatureVerificationFailed(_) => "signature verification failed".to_string(),
            Self::LedgerUnavailable(_) => "ledger unavailable".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<crate::error::Error> for Rejection {
    fn from(err: crate::error::Error) -> Self {
        Self::LedgerUnavailable(err.to_string())
    }
}
