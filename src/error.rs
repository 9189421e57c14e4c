//! Error types for skillforge-gate.

use thiserror::Error;

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Infrastructure and input errors.
///
/// These are distinct from [`crate::Rejection`], which is the typed answer a
/// caller returns across the HTTP boundary. An `Error` means something could
/// not be checked; a `Rejection` means a check was made and failed.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// The ledger read could not be completed (unreachable, timed out,
    /// cancelled, or returned a malformed response).
    #[error("ledger unavailable: {0}")]
    LedgerUnavailable(String),

    /// Cryptographic error.
    #[error("crypto error: {0}")]
    Crypto(String),

    /// Address failed to parse.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Token amount failed to parse or overflowed.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns true if retrying the same call later could succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::LedgerUnavailable(_))
    }
}
