//! Access decisions for the marketplace's gated operations.
//!
//! [`AccessGate`] composes identity verification, the balance gate and the
//! payment verifier into the checks the HTTP layer runs per route:
//!
//! - publish: mandatory identity, minimum token balance, content digest
//! - update: mandatory identity, caller must be the author
//! - install: mandatory identity, payment unless the item is free
//! - view: optional identity
//!
//! Retry with backoff lives here, on the caller side of the verifiers.

pub mod retry;

use crate::auth::{AuthMode, Challenge, IdentityVerifier, VerifiedIdentity};
use crate::config::GateConfig;
use crate::content::{digest, ContentDigest};
use crate::error::Result;
use crate::ledger::{lower_hex, LedgerRead, TokenAmount};
use crate::payment::{
    BalanceDecision, BalanceGate, PaymentClaim, PaymentOutcome, PaymentVerifier, TransferEvent,
};
use crate::rejection::Rejection;
use alloy_primitives::Address;
use retry::RetryPolicy;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The parts of a listing the install check needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Listing {
    /// Author and payment recipient.
    pub author: Address,
    /// Price; zero for free listings.
    pub price: TokenAmount,
}

impl Listing {
    /// Returns true if installing requires no payment.
    #[must_use]
    pub fn is_free(&self) -> bool {
        self.price.is_zero()
    }
}

/// Permission to publish a new listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishGrant {
    /// Verified publisher, to be recorded as the author.
    pub author: VerifiedIdentity,
    /// Digest to persist alongside the content.
    pub content_digest: ContentDigest,
    /// Balance observed at the check.
    pub balance: TokenAmount,
}

/// Permission to update an existing listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateGrant {
    /// Verified author.
    pub author: VerifiedIdentity,
    /// New digest, when the content changed.
    pub content_digest: Option<ContentDigest>,
}

/// Permission to install (unlock) a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallGrant {
    /// Verified installer.
    pub installer: VerifiedIdentity,
    /// The matched payment; `None` for free listings.
    pub payment: Option<TransferEvent>,
}

/// Route-level access checks over one shared ledger client.
pub struct AccessGate<L> {
    identity: IdentityVerifier,
    balances: BalanceGate<L>,
    payments: PaymentVerifier<L>,
    publish_threshold: TokenAmount,
    retry: RetryPolicy,
}

impl<L> Clone for AccessGate<L> {
    fn clone(&self) -> Self {
        Self {
            identity: self.identity.clone(),
            balances: self.balances.clone(),
            payments: self.payments.clone(),
            publish_threshold: self.publish_threshold,
            retry: self.retry,
        }
    }
}

impl<L: LedgerRead> AccessGate<L> {
    /// Build a gate from configuration around an already constructed ledger
    /// client.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration does not validate.
    pub fn new(ledger: Arc<L>, config: &GateConfig) -> Result<Self> {
        config.validate()?;
        let publish_threshold = TokenAmount::parse(
            &config.publish.min_balance_tokens,
            config.ledger.token_decimals,
        )?;
        info!(
            "Access gate ready (namespace={}, publish threshold={publish_threshold}, token={})",
            config.auth.namespace,
            lower_hex(&ledger.token_address())
        );
        Ok(Self {
            identity: IdentityVerifier::new(config.auth.namespace.clone()),
            balances: BalanceGate::new(Arc::clone(&ledger)),
            payments: PaymentVerifier::new(ledger),
            publish_threshold,
            retry: RetryPolicy::from(&config.payment.retry),
        })
    }

    /// Replace the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// The identity verifier.
    #[must_use]
    pub fn identity(&self) -> &IdentityVerifier {
        &self.identity
    }

    /// Minimum balance required to publish.
    #[must_use]
    pub fn publish_threshold(&self) -> TokenAmount {
        self.publish_threshold
    }

    /// Identity for personalized reads; `None` when absent or invalid.
    #[must_use]
    pub fn viewer(&self, challenge: &Challenge) -> Option<VerifiedIdentity> {
        self.identity
            .authenticate(challenge, AuthMode::Optional)
            .ok()
            .flatten()
    }

    fn require_identity(
        &self,
        challenge: &Challenge,
    ) -> std::result::Result<VerifiedIdentity, Rejection> {
        self.identity.verify(challenge).map_err(|rejection| {
            debug!("Rejected challenge: {rejection}");
            rejection
        })
    }

    /// Check the publisher may publish `content` and digest it.
    ///
    /// # Errors
    ///
    /// Returns an identity rejection, [`Rejection::InsufficientBalance`], or
    /// [`Rejection::LedgerUnavailable`] once retries are exhausted.
    pub async fn authorize_publish(
        &self,
        challenge: &Challenge,
        content: &str,
    ) -> std::result::Result<PublishGrant, Rejection> {
        let author = self.require_identity(challenge)?;
        let threshold = self.publish_threshold;

        let decision = self
            .retry
            .retry_while(
                || {
                    self.balances
                        .check_minimum_balance(author.address(), threshold.base_units)
                },
                |result| result.as_ref().is_err_and(crate::Error::is_transient),
            )
            .await
            .map_err(|e| {
                warn!("Balance check for {author} failed: {e}");
                Rejection::from(e)
            })?;

        let balance = TokenAmount::new(decision.balance(), threshold.decimals);
        match decision {
            BalanceDecision::Allowed { .. } => {
                let content_digest = digest(content);
                info!("Publish by {author} allowed (balance {balance}, digest {content_digest})");
                Ok(PublishGrant {
                    author,
                    content_digest,
                    balance,
                })
            }
            BalanceDecision::Denied { .. } => {
                debug!("Publish by {author} denied: balance {balance} below {threshold}");
                Err(Rejection::InsufficientBalance {
                    required: threshold,
                    current: balance,
                })
            }
        }
    }

    /// Check the caller is the listing's author.
    ///
    /// A new digest is computed when `new_content` is supplied.
    ///
    /// # Errors
    ///
    /// Returns an identity rejection or [`Rejection::NotAuthor`].
    pub fn authorize_update(
        &self,
        challenge: &Challenge,
        author: Address,
        new_content: Option<&str>,
    ) -> std::result::Result<UpdateGrant, Rejection> {
        let caller = self.require_identity(challenge)?;
        if caller.address() != author {
            debug!("Update by {caller} refused: author is {}", lower_hex(&author));
            return Err(Rejection::NotAuthor);
        }
        Ok(UpdateGrant {
            author: caller,
            content_digest: new_content.map(digest),
        })
    }

    /// Check the caller may install `listing`.
    ///
    /// Free listings are granted without touching the ledger. Paid listings
    /// need `tx_reference`; its verification is retried while the outcome
    /// may still change (not yet mined, ledger unreachable).
    ///
    /// # Errors
    ///
    /// Returns an identity rejection, [`Rejection::PaymentRequired`] or
    /// [`Rejection::PaymentUnverified`].
    pub async fn authorize_install(
        &self,
        challenge: &Challenge,
        listing: &Listing,
        tx_reference: Option<&str>,
    ) -> std::result::Result<InstallGrant, Rejection> {
        let installer = self.require_identity(challenge)?;

        if listing.is_free() {
            debug!("Install by {installer}: free listing");
            return Ok(InstallGrant {
                installer,
                payment: None,
            });
        }

        let Some(tx_reference) = tx_reference.filter(|t| !t.trim().is_empty()) else {
            return Err(Rejection::PaymentRequired {
                amount: listing.price,
                recipient: listing.author,
            });
        };

        let claim = PaymentClaim {
            transaction_reference: tx_reference.trim().to_string(),
            payer: installer.address(),
            payee: listing.author,
            minimum_amount: listing.price.base_units,
        };

        let outcome = self
            .retry
            .retry_while(
                || self.payments.verify_payment(&claim),
                |outcome| outcome.reason().is_some_and(|r| r.is_retryable()),
            )
            .await;

        match outcome {
            PaymentOutcome::Verified(event) => {
                info!(
                    "Install by {installer} paid {} in {}",
                    TokenAmount::new(event.amount, listing.price.decimals),
                    claim.transaction_reference
                );
                Ok(InstallGrant {
                    installer,
                    payment: Some(event),
                })
            }
            PaymentOutcome::Unverified(reason) => {
                debug!("Install by {installer} refused: {}", reason.code());
                Err(Rejection::PaymentUnverified { reason })
            }
        }
    }
}
