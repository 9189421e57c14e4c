//! # skillforge-gate
//!
//! Access and payment verification for the SkillForge skill marketplace.
//!
//! The marketplace's listing, search and storage layers call into this crate
//! through a narrow surface:
//! - **Identity**: stateless wallet-signature authentication with a fixed
//!   replay window ([`IdentityVerifier`])
//! - **Balance gate**: minimum token holdings before publishing
//!   ([`BalanceGate`])
//! - **Payment verification**: confirm a referenced ledger transaction paid
//!   the expected amount before unlocking content ([`PaymentVerifier`])
//! - **Content digests**: deterministic fingerprints returned to publishers
//!   for on-chain anchoring ([`content::digest`])
//!
//! ## Architecture
//!
//! Every component is stateless. The only shared resource is the ledger-read
//! client, built once at startup from configuration and injected as
//! `Arc<L: LedgerRead>`. [`AccessGate`] composes the components into the
//! per-route checks and owns caller-side retry.
//!
//! ## Example
//!
//! ```rust,no_run
//! use skillforge_gate::{AccessGate, Challenge, GateConfig, JsonRpcLedger};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = GateConfig::default();
//!     let ledger = Arc::new(JsonRpcLedger::new(&config.ledger)?);
//!     let gate = AccessGate::new(ledger, &config)?;
//!
//!     let challenge = Challenge::from_headers([
//!         ("x-wallet-address", "0x..."),
//!         ("x-signature", "0x..."),
//!         ("x-timestamp", "1700000000000"),
//!     ]);
//!     match gate.authorize_publish(&challenge, "# SKILL.md").await {
//!         Ok(grant) => println!("publish as {} ({})", grant.author, grant.content_digest),
//!         Err(rejection) => println!("{}", serde_json::to_string(&rejection.body())?),
//!     }
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod auth;
pub mod config;
pub mod content;
pub mod error;
pub mod gate;
pub mod ledger;
pub mod payment;
pub mod rejection;

pub use auth::{AuthMode, Challenge, IdentityVerifier, VerifiedIdentity};
pub use config::GateConfig;
pub use content::{digest, ContentDigest};
pub use error::{Error, Result};
pub use gate::{retry::RetryPolicy, AccessGate, InstallGrant, Listing, PublishGrant, UpdateGrant};
pub use ledger::{JsonRpcLedger, LedgerRead, StaticLedger, TokenAmount};
pub use payment::{
    BalanceDecision, BalanceGate, PaymentClaim, PaymentOutcome, PaymentVerifier, TransferEvent,
    UnverifiedReason,
};
pub use rejection::{Rejection, RejectionBody, RejectionKind};
