//! Conversion between human token amounts and on-chain base units.
//!
//! ERC-20 balances are integers in base units; listing prices and the publish
//! threshold are written as decimal token strings ("100000", "2.5"). All
//! conversions here are exact integer arithmetic.

use crate::error::{Error, Result};
use alloy_primitives::utils::{self, ParseUnits};
use alloy_primitives::U256;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Decimals used by the marketplace token.
pub const DEFAULT_DECIMALS: u8 = 18;

/// Largest decimals value for which `10^decimals` fits in a `U256`.
pub const MAX_DECIMALS: u8 = 77;

/// Parse a decimal token string into base units.
///
/// Accepts an integer part with an optional fractional part of at most
/// `decimals` digits. Signs, exponents, radix prefixes and separators are
/// rejected rather than truncated or reinterpreted.
///
/// # Errors
///
/// Returns [`Error::InvalidAmount`] if the string is not a plain decimal
/// number, has too many fractional digits, or overflows 256 bits.
pub fn parse_units(amount: &str, decimals: u8) -> Result<U256> {
    let amount = amount.trim();
    let (int_part, frac_part) = amount.split_once('.').unwrap_or((amount, ""));

    if int_part.is_empty() && frac_part.is_empty() {
        return Err(Error::InvalidAmount(format!("empty amount: {amount:?}")));
    }
    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(int_part) || !all_digits(frac_part) {
        return Err(Error::InvalidAmount(format!("not a decimal number: {amount:?}")));
    }
    if frac_part.len() > usize::from(decimals) {
        return Err(Error::InvalidAmount(format!(
            "{amount:?} has more than {decimals} fractional digits"
        )));
    }

    match utils::parse_units(amount, decimals) {
        Ok(ParseUnits::U256(value)) => Ok(value),
        Ok(ParseUnits::I256(_)) => {
            Err(Error::InvalidAmount(format!("negative amount: {amount:?}")))
        }
        Err(e) => Err(Error::InvalidAmount(format!("{amount:?}: {e}"))),
    }
}

/// Render base units as a decimal token string, trimming trailing zeros.
#[must_use]
pub fn format_units(amount: U256, decimals: u8) -> String {
    match utils::format_units(amount, decimals) {
        Ok(formatted) if formatted.contains('.') => formatted
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string(),
        Ok(formatted) => formatted,
        Err(_) => amount.to_string(),
    }
}

/// An amount of the marketplace token, kept in base units alongside the
/// decimals needed to display it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenAmount {
    /// Amount in base units.
    pub base_units: U256,
    /// Token decimals.
    pub decimals: u8,
}

impl TokenAmount {
    /// Wrap a base-unit amount.
    #[must_use]
    pub fn new(base_units: U256, decimals: u8) -> Self {
        Self {
            base_units,
            decimals,
        }
    }

    /// Parse a decimal token string.
    ///
    /// # Errors
    ///
    /// See [`parse_units`].
    pub fn parse(amount: &str, decimals: u8) -> Result<Self> {
        Ok(Self::new(parse_units(amount, decimals)?, decimals))
    }

    /// Returns true if the amount is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.base_units.is_zero()
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_units(self.base_units, self.decimals))
    }
}
