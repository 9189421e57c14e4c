//! Client-side challenge signing.
//!
//! Used by the keygen tool and by tests; the gate itself only verifies.

use crate::auth::challenge::{challenge_message, Challenge};
use crate::error::{Error, Result};
use crate::ledger::lower_hex;
use alloy_primitives::{eip191_hash_message, keccak256, Address};
use k256::ecdsa::{SigningKey, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;

/// Ethereum address of a secp256k1 public key.
#[must_use]
pub fn address_of(key: &VerifyingKey) -> Address {
    let point = key.as_affine().to_encoded_point(false);
    Address::from_slice(&keccak256(&point.as_bytes()[1..])[12..])
}

/// Produce an EIP-191 `personal_sign` signature over `message`, as
/// `0x`-prefixed `r || s || v` with `v` in `{27, 28}`.
///
/// # Errors
///
/// Returns [`Error::Crypto`] if signing fails.
pub fn personal_sign(key: &SigningKey, message: &str) -> Result<String> {
    let prehash = eip191_hash_message(message);
    let (signature, recovery_id) = key
        .sign_prehash_recoverable(prehash.as_slice())
        .map_err(|e| Error::Crypto(format!("signing failed: {e}")))?;

    let mut bytes = signature.to_bytes().to_vec();
    bytes.push(27 + recovery_id.to_byte());
    Ok(format!("0x{}", hex::encode(bytes)))
}

/// Sign a challenge for `issued_at_ms` under `namespace`.
///
/// # Errors
///
/// Returns [`Error::Crypto`] if signing fails.
pub fn sign_challenge(key: &SigningKey, namespace: &str, issued_at_ms: i64) -> Result<Challenge> {
    let issued_at = issued_at_ms.to_string();
    let signature = personal_sign(key, &challenge_message(namespace, &issued_at))?;
    let address = lower_hex(&address_of(key.verifying_key()));
    Ok(Challenge::new(address, signature, issued_at))
}
