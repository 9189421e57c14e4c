//! ERC-20 transfer events and the payment matching predicate.

use crate::ledger::{LogEntry, TransactionReceipt};
use crate::payment::TRANSFER_EVENT_TOPIC;
use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};

/// A decoded token transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferEvent {
    /// Sender.
    pub from: Address,
    /// Recipient.
    pub to: Address,
    /// Amount in base units.
    pub amount: U256,
}

impl TransferEvent {
    /// Decode a log as an ERC-20 `Transfer`.
    ///
    /// Returns `None` for anything that does not have the exact transfer
    /// shape: three topics with the transfer signature first, and a single
    /// 32-byte data word. Address topics must be left-padded with zeros.
    #[must_use]
    pub fn decode(log: &LogEntry) -> Option<Self> {
        let [signature, from, to] = log.topics.as_slice() else {
            return None;
        };
        if *signature != TRANSFER_EVENT_TOPIC || log.data.len() != 32 {
            return None;
        }
        let word_to_address = |word: &B256| {
            word[..12]
                .iter()
                .all(|b| *b == 0)
                .then(|| Address::from_word(*word))
        };
        Some(Self {
            from: word_to_address(from)?,
            to: word_to_address(to)?,
            amount: U256::from_be_slice(&log.data),
        })
    }
}

/// Decode every transfer emitted by `token` in `receipt`, in log order.
///
/// Logs from other contracts and logs of other events are skipped.
#[must_use]
pub fn decode_transfers(receipt: &TransactionReceipt, token: Address) -> Vec<TransferEvent> {
    receipt
        .logs
        .iter()
        .filter(|log| log.address == token)
        .filter_map(TransferEvent::decode)
        .collect()
}

/// The transfer a payment claim requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpectedTransfer {
    /// Payer.
    pub from: Address,
    /// Payee.
    pub to: Address,
    /// Minimum amount in base units; overpayment satisfies the requirement.
    pub minimum: U256,
}

impl ExpectedTransfer {
    /// Returns true if `event` pays at least `minimum` from `from` to `to`.
    ///
    /// Addresses are compared as bytes, so checksum casing in the original
    /// strings is irrelevant.
    #[must_use]
    pub fn is_satisfied_by(&self, event: &TransferEvent) -> bool {
        event.from == self.from && event.to == self.to && event.amount >= self.minimum
    }
}

/// First event in `events` that satisfies `expected`, if any.
///
/// Every event is considered; a transaction may batch several transfers and
/// the matching one need not come first.
#[must_use]
pub fn find_matching_transfer<'a>(
    events: &'a [TransferEvent],
    expected: &ExpectedTransfer,
) -> Option<&'a TransferEvent> {
    events.iter().find(|event| expected.is_satisfied_by(event))
}
