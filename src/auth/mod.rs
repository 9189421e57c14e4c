//! Stateless wallet-signature authentication.
//!
//! A client proves control of a wallet by signing `SkillForge:<timestamp>`
//! with EIP-191 `personal_sign` and sending the address, signature and
//! timestamp with each request. Verification recovers the signer, compares
//! it to the claimed address and enforces a fixed five-minute replay window.
//! Nothing is stored between requests.

mod challenge;
mod signer;
mod verifier;

pub use challenge::{
    challenge_message, Challenge, DEFAULT_NAMESPACE, SIGNATURE_HEADER, TIMESTAMP_HEADER,
    WALLET_ADDRESS_HEADER,
};
pub use signer::{address_of, personal_sign, sign_challenge};
pub use verifier::{
    recover_signer, AuthMode, IdentityVerifier, VerifiedIdentity, REPLAY_WINDOW, REPLAY_WINDOW_MS,
};
