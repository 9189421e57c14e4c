//! Shared ledger-client plumbing.
//!
//! The ledger is only ever read: token balances via `balanceOf` and
//! transaction receipts. A single client is built at startup from
//! [`crate::config::LedgerConfig`] and injected (as `Arc<L>`) into every
//! component that needs it.

mod client;
mod fixture;
mod types;
pub mod units;

pub use client::{JsonRpcLedger, LedgerRead};
pub use fixture::StaticLedger;
pub use types::{lower_hex, parse_address, parse_tx_hash, LogEntry, TransactionReceipt};
pub use units::{format_units, parse_units, TokenAmount, DEFAULT_DECIMALS};
