//! Content integrity digests and gated previews.
//!
//! A digest is `keccak256` of the content bytes, rendered as `0x` plus 64
//! lowercase hex characters. It is returned to publishers for on-chain
//! anchoring, so it must never change for the same bytes.

use crate::error::{Error, Result};
use alloy_primitives::{keccak256, B256};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Characters of a locked listing shown before the lock banner.
pub const PREVIEW_CHARS: usize = 500;

/// Appended to a truncated preview.
pub const LOCK_BANNER: &str = "\n\n--- 🔒 Install to view full SKILL.md ---";

/// Deterministic fingerprint of published content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentDigest(B256);

impl ContentDigest {
    /// Raw digest bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0 .0
    }

    /// Returns true if `content` hashes to this digest.
    #[must_use]
    pub fn matches(&self, content: impl AsRef<[u8]>) -> bool {
        digest(content) == *self
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0.as_slice()))
    }
}

impl FromStr for ContentDigest {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let hex_part = s
            .strip_prefix("0x")
            .ok_or_else(|| Error::Serialization(format!("digest must start with '0x': {s}")))?;
        let bytes = hex::decode(hex_part)
            .map_err(|e| Error::Serialization(format!("digest {s}: {e}")))?;
        if bytes.len() != 32 {
            return Err(Error::Serialization(format!(
                "digest must be 32 bytes, got {}",
                bytes.len()
            )));
        }
        Ok(Self(B256::from_slice(&bytes)))
    }
}

impl TryFrom<String> for ContentDigest {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<ContentDigest> for String {
    fn from(digest: ContentDigest) -> Self {
        digest.to_string()
    }
}

/// Digest `content`. Total: empty content has a digest too.
#[must_use]
pub fn digest(content: impl AsRef<[u8]>) -> ContentDigest {
    ContentDigest(keccak256(content.as_ref()))
}

/// Content as shown to a viewer.
///
/// Unlocked content (free, or installed by the viewer) is returned whole.
/// Otherwise the first [`PREVIEW_CHARS`] characters are followed by
/// [`LOCK_BANNER`], even when the content is shorter than that.
#[must_use]
pub fn preview(content: &str, unlocked: bool) -> String {
    if unlocked {
        return content.to_string();
    }
    let head: String = content.chars().take(PREVIEW_CHARS).collect();
    head + LOCK_BANNER
}
