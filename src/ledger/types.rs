//! Ledger value types: addresses, transaction references, receipts and logs.

use crate::error::{Error, Result};
use alloy_primitives::{Address, B256, U256};
use std::str::FromStr;

/// Parse an EVM address string (`0x` followed by 40 hex characters).
///
/// Case is ignored; mixed-case checksums are not enforced.
///
/// # Errors
///
/// Returns [`Error::InvalidAddress`] if the prefix, length or hex is wrong.
pub fn parse_address(address: &str) -> Result<Address> {
    let address = address.trim();
    let hex_part = address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
        .ok_or_else(|| Error::InvalidAddress(format!("must start with '0x', got: {address}")))?;

    if hex_part.len() != 40 {
        return Err(Error::InvalidAddress(format!(
            "expected 42 characters, got {}",
            address.len()
        )));
    }
    Address::from_str(hex_part).map_err(|e| Error::InvalidAddress(format!("{address}: {e}")))
}

/// Render an address as lowercase `0x` hex, the normalized form used for
/// identity comparison and storage.
#[must_use]
pub fn lower_hex(address: &Address) -> String {
    format!("{address:#x}")
}

/// Parse a transaction reference (`0x` followed by 64 hex characters).
///
/// # Errors
///
/// Returns [`Error::Serialization`] if the reference is not a 32-byte hash.
pub fn parse_tx_hash(reference: &str) -> Result<B256> {
    B256::from_str(reference.trim())
        .map_err(|e| Error::Serialization(format!("bad transaction reference {reference:?}: {e}")))
}

/// Decode `0x`-prefixed (or bare) hex data.
pub(crate) fn decode_hex(value: &str) -> Result<Vec<u8>> {
    let trimmed = value.trim();
    let stripped = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    hex::decode(stripped).map_err(|e| Error::Serialization(format!("bad hex {value:?}: {e}")))
}

/// A single log entry attached to a transaction receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// Contract that emitted the log.
    pub address: Address,
    /// Indexed topics; `topics[0]` is the event signature hash.
    pub topics: Vec<B256>,
    /// Non-indexed event data.
    pub data: Vec<u8>,
}

impl LogEntry {
    /// Build an ERC-20 `Transfer(from, to, value)` log as the token contract
    /// would emit it.
    #[must_use]
    pub fn erc20_transfer(token: Address, from: Address, to: Address, value: U256) -> Self {
        Self {
            address: token,
            topics: vec![
                crate::payment::TRANSFER_EVENT_TOPIC,
                from.into_word(),
                to.into_word(),
            ],
            data: value.to_be_bytes::<32>().to_vec(),
        }
    }
}

/// The parts of a transaction receipt the verifiers read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionReceipt {
    /// Hash of the transaction.
    pub transaction_hash: B256,
    /// Execution status (`1` success, `0` reverted); absent on pre-Byzantium
    /// receipts.
    pub status: Option<u64>,
    /// Logs emitted during execution, in order.
    pub logs: Vec<LogEntry>,
}

impl TransactionReceipt {
    /// Create a receipt with an explicit success flag.
    #[must_use]
    pub fn new(transaction_hash: B256, succeeded: bool, logs: Vec<LogEntry>) -> Self {
        Self {
            transaction_hash,
            status: Some(u64::from(succeeded)),
            logs,
        }
    }

    /// Returns true only for an explicit success status.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.status == Some(1)
    }
}
