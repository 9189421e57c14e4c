//! Identity verification: signer recovery plus replay-window freshness.

use crate::auth::challenge::{challenge_message, Challenge, DEFAULT_NAMESPACE};
use crate::auth::signer::address_of;
use crate::ledger::{lower_hex, parse_address};
use crate::rejection::Rejection;
use alloy_primitives::{eip191_hash_message, Address};
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use std::fmt;
use std::time::Duration;
use tracing::debug;

/// How long a signed challenge stays acceptable after issuance.
pub const REPLAY_WINDOW: Duration = Duration::from_secs(5 * 60);

/// [`REPLAY_WINDOW`] in milliseconds.
pub const REPLAY_WINDOW_MS: i64 = 300_000;

/// Length of an `r || s || v` signature.
const SIGNATURE_LEN: usize = 65;

/// Whether a request requires an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// Any rejection blocks the request.
    Mandatory,
    /// Any rejection is swallowed; the request proceeds anonymously.
    Optional,
}

/// A wallet whose control was proven for the current request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VerifiedIdentity {
    address: Address,
}

impl VerifiedIdentity {
    /// The verified address.
    #[must_use]
    pub fn address(&self) -> Address {
        self.address
    }

    /// Lowercase `0x` hex form, for comparison and storage.
    #[must_use]
    pub fn to_lower_hex(&self) -> String {
        lower_hex(&self.address)
    }

    /// Returns true if `other` names the same wallet, ignoring case.
    #[must_use]
    pub fn is(&self, other: &str) -> bool {
        parse_address(other).is_ok_and(|a| a == self.address)
    }
}

impl fmt::Display for VerifiedIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_lower_hex())
    }
}

/// Recover the address that produced an EIP-191 `personal_sign` signature
/// over `message`.
///
/// Accepts `v` as `27/28` or `0/1` and normalizes high-`s` signatures.
///
/// # Errors
///
/// Returns a description of what was malformed.
pub fn recover_signer(message: &str, signature_hex: &str) -> Result<Address, String> {
    let trimmed = signature_hex.trim();
    let raw = hex::decode(trimmed.strip_prefix("0x").unwrap_or(trimmed))
        .map_err(|e| format!("signature is not hex: {e}"))?;
    if raw.len() != SIGNATURE_LEN {
        return Err(format!(
            "signature must be {SIGNATURE_LEN} bytes, got {}",
            raw.len()
        ));
    }

    let v = raw[64];
    let parity = match v {
        0 | 1 => v,
        27 | 28 => v - 27,
        other => return Err(format!("invalid recovery byte {other}")),
    };
    let mut recovery_id =
        RecoveryId::from_byte(parity).ok_or_else(|| format!("invalid recovery byte {v}"))?;

    let mut signature =
        Signature::from_slice(&raw[..64]).map_err(|e| format!("invalid signature scalars: {e}"))?;
    if let Some(normalized) = signature.normalize_s() {
        signature = normalized;
        recovery_id = RecoveryId::new(!recovery_id.is_y_odd(), recovery_id.is_x_reduced());
    }

    let prehash = eip191_hash_message(message);
    let key = VerifyingKey::recover_from_prehash(prehash.as_slice(), &signature, recovery_id)
        .map_err(|e| format!("public key recovery failed: {e}"))?;
    Ok(address_of(&key))
}

/// Verifies signed challenges.
///
/// Holds no state beyond the namespace; one instance can serve any number of
/// concurrent requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityVerifier {
    namespace: String,
}

impl Default for IdentityVerifier {
    fn default() -> Self {
        Self::new(DEFAULT_NAMESPACE)
    }
}

impl IdentityVerifier {
    /// Create a verifier for messages of the form `<namespace>:<timestamp>`.
    #[must_use]
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    /// Namespace of the signed message.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Verify `challenge` against the current wall clock.
    ///
    /// # Errors
    ///
    /// Returns the [`Rejection`] describing the first failed check.
    pub fn verify(&self, challenge: &Challenge) -> Result<VerifiedIdentity, Rejection> {
        self.verify_at(challenge, chrono::Utc::now().timestamp_millis())
    }

    /// Verify `challenge` as if the current time were `now_ms`.
    ///
    /// Checks run in this order: presence, timestamp syntax, signature,
    /// freshness. A signature from the wrong key is therefore reported as
    /// such even when the challenge is also stale. Timestamps in the future
    /// are accepted.
    ///
    /// # Errors
    ///
    /// Returns the [`Rejection`] describing the first failed check.
    pub fn verify_at(
        &self,
        challenge: &Challenge,
        now_ms: i64,
    ) -> Result<VerifiedIdentity, Rejection> {
        let (Some(address), Some(signature), Some(issued_at)) = (
            non_empty(challenge.address.as_deref()),
            non_empty(challenge.signature.as_deref()),
            non_empty(challenge.issued_at.as_deref()),
        ) else {
            return Err(Rejection::MissingCredentials);
        };

        let issued_at_ms: i64 = issued_at
            .trim()
            .parse()
            .map_err(|_| Rejection::MalformedTimestamp)?;

        let message = challenge_message(&self.namespace, issued_at);
        let recovered =
            recover_signer(&message, signature).map_err(Rejection::SignatureVerificationFailed)?;

        // An unparseable claimed address can never equal a recovered one.
        if parse_address(address).ok() != Some(recovered) {
            debug!(
                "Signature recovered {} but challenge claims {address}",
                lower_hex(&recovered)
            );
            return Err(Rejection::InvalidSignature);
        }

        if now_ms.saturating_sub(issued_at_ms) > REPLAY_WINDOW_MS {
            debug!(
                "Challenge from {} issued at {issued_at_ms} is older than the replay window",
                lower_hex(&recovered)
            );
            return Err(Rejection::ExpiredChallenge);
        }

        Ok(VerifiedIdentity { address: recovered })
    }

    /// Verify `challenge` and apply `mode`.
    ///
    /// In [`AuthMode::Optional`] every rejection becomes `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns the rejection only in [`AuthMode::Mandatory`].
    pub fn authenticate(
        &self,
        challenge: &Challenge,
        mode: AuthMode,
    ) -> Result<Option<VerifiedIdentity>, Rejection> {
        self.authenticate_at(challenge, mode, chrono::Utc::now().timestamp_millis())
    }

    /// [`Self::authenticate`] at a fixed time.
    ///
    /// # Errors
    ///
    /// Returns the rejection only in [`AuthMode::Mandatory`].
    pub fn authenticate_at(
        &self,
        challenge: &Challenge,
        mode: AuthMode,
        now_ms: i64,
    ) -> Result<Option<VerifiedIdentity>, Rejection> {
        match (self.verify_at(challenge, now_ms), mode) {
            (Ok(identity), _) => Ok(Some(identity)),
            (Err(rejection), AuthMode::Mandatory) => Err(rejection),
            (Err(rejection), AuthMode::Optional) => {
                debug!("Proceeding anonymously: {rejection}");
                Ok(None)
            }
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
