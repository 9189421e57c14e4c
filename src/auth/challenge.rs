//! Signed challenges as presented by clients.

/// Header carrying the claimed wallet address.
pub const WALLET_ADDRESS_HEADER: &str = "x-wallet-address";

/// Header carrying the hex-encoded signature.
pub const SIGNATURE_HEADER: &str = "x-signature";

/// Header carrying the millisecond issue timestamp.
pub const TIMESTAMP_HEADER: &str = "x-timestamp";

/// Default namespace of the signed message.
pub const DEFAULT_NAMESPACE: &str = "SkillForge";

/// The `(address, signature, issuedAt)` triple proving wallet control for
/// one request.
///
/// Fields are kept exactly as received; absence and emptiness are checked
/// during verification. The message is rebuilt from `issued_at` verbatim, so
/// `"0170..."` and `"170..."` are different messages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Challenge {
    /// Claimed signer address.
    pub address: Option<String>,
    /// 65-byte `r || s || v` signature, hex-encoded.
    pub signature: Option<String>,
    /// Milliseconds since the Unix epoch, as a decimal string.
    pub issued_at: Option<String>,
}

impl Challenge {
    /// Build a challenge with all three fields present.
    #[must_use]
    pub fn new(
        address: impl Into<String>,
        signature: impl Into<String>,
        issued_at: impl Into<String>,
    ) -> Self {
        Self {
            address: Some(address.into()),
            signature: Some(signature.into()),
            issued_at: Some(issued_at.into()),
        }
    }

    /// Collect a challenge from request headers.
    ///
    /// Header names are matched case-insensitively; unrelated headers are
    /// ignored. Later duplicates overwrite earlier ones.
    pub fn from_headers<I, K, V>(headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut challenge = Self::default();
        for (name, value) in headers {
            let name = name.as_ref();
            let slot = if name.eq_ignore_ascii_case(WALLET_ADDRESS_HEADER) {
                &mut challenge.address
            } else if name.eq_ignore_ascii_case(SIGNATURE_HEADER) {
                &mut challenge.signature
            } else if name.eq_ignore_ascii_case(TIMESTAMP_HEADER) {
                &mut challenge.issued_at
            } else {
                continue;
            };
            *slot = Some(value.as_ref().to_string());
        }
        challenge
    }

    /// Render as `(header, value)` pairs, skipping absent fields.
    #[must_use]
    pub fn to_headers(&self) -> Vec<(&'static str, String)> {
        [
            (WALLET_ADDRESS_HEADER, &self.address),
            (SIGNATURE_HEADER, &self.signature),
            (TIMESTAMP_HEADER, &self.issued_at),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.clone().map(|v| (name, v)))
        .collect()
    }

    /// Returns true if every field is present and non-empty.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        [&self.address, &self.signature, &self.issued_at]
            .iter()
            .all(|field| field.as_deref().is_some_and(|v| !v.is_empty()))
    }
}

/// The canonical message a client signs: `<namespace>:<issued_at>`.
#[must_use]
pub fn challenge_message(namespace: &str, issued_at: &str) -> String {
    format!("{namespace}:{issued_at}")
}
