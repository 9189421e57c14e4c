//! In-memory ledger for tests and offline tooling.

use crate::error::{Error, Result};
use crate::ledger::client::LedgerRead;
use crate::ledger::types::{LogEntry, TransactionReceipt};
use alloy_primitives::{Address, B256, U256};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// A [`LedgerRead`] backed by fixed balances and receipts.
///
/// Besides the happy path it can simulate the failure modes callers must
/// handle: permanent outages, a number of transient failures, receipts that
/// only appear after a few lookups (not yet mined), and slow reads.
#[derive(Debug)]
pub struct StaticLedger {
    token: Address,
    balances: HashMap<Address, U256>,
    receipts: HashMap<B256, TransactionReceipt>,
    outage: Option<String>,
    transient_failures: usize,
    confirmation_delay: usize,
    latency: Option<Duration>,
    reads: AtomicUsize,
    receipt_reads: AtomicUsize,
}

impl StaticLedger {
    /// Create an empty ledger for the given token contract.
    #[must_use]
    pub fn new(token: Address) -> Self {
        Self {
            token,
            balances: HashMap::new(),
            receipts: HashMap::new(),
            outage: None,
            transient_failures: 0,
            confirmation_delay: 0,
            latency: None,
            reads: AtomicUsize::new(0),
            receipt_reads: AtomicUsize::new(0),
        }
    }

    /// Set the token balance of `owner`.
    #[must_use]
    pub fn with_balance(mut self, owner: Address, balance: U256) -> Self {
        self.balances.insert(owner, balance);
        self
    }

    /// Register a receipt.
    #[must_use]
    pub fn with_receipt(mut self, receipt: TransactionReceipt) -> Self {
        self.receipts.insert(receipt.transaction_hash, receipt);
        self
    }

    /// Register a successful receipt carrying token transfers
    /// `(from, to, amount)` in the given order.
    #[must_use]
    pub fn with_transfers(self, tx_hash: B256, transfers: &[(Address, Address, U256)]) -> Self {
        let token = self.token;
        let logs = transfers
            .iter()
            .map(|&(from, to, amount)| LogEntry::erc20_transfer(token, from, to, amount))
            .collect();
        self.with_receipt(TransactionReceipt::new(tx_hash, true, logs))
    }

    /// Fail every read with [`Error::LedgerUnavailable`].
    #[must_use]
    pub fn with_outage(mut self, reason: &str) -> Self {
        self.outage = Some(reason.to_string());
        self
    }

    /// Fail the first `count` reads, then behave normally.
    #[must_use]
    pub fn with_transient_failures(mut self, count: usize) -> Self {
        self.transient_failures = count;
        self
    }

    /// Report every receipt as unknown for the first `lookups` receipt reads.
    #[must_use]
    pub fn with_confirmation_delay(mut self, lookups: usize) -> Self {
        self.confirmation_delay = lookups;
        self
    }

    /// Sleep for `latency` before answering each read.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Total reads served so far, including failed ones.
    #[must_use]
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    async fn begin_read(&self) -> Result<()> {
        let seq = self.reads.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if let Some(reason) = &self.outage {
            return Err(Error::LedgerUnavailable(reason.clone()));
        }
        if seq < self.transient_failures {
            return Err(Error::LedgerUnavailable(format!(
                "transient failure {} of {}",
                seq + 1,
                self.transient_failures
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerRead for StaticLedger {
    fn token_address(&self) -> Address {
        self.token
    }

    async fn token_balance(&self, owner: Address) -> Result<U256> {
        self.begin_read().await?;
        Ok(self.balances.get(&owner).copied().unwrap_or(U256::ZERO))
    }

    async fn transaction_receipt(&self, tx_hash: B256) -> Result<Option<TransactionReceipt>> {
        self.begin_read().await?;
        let lookup = self.receipt_reads.fetch_add(1, Ordering::SeqCst);
        if lookup < self.confirmation_delay {
            return Ok(None);
        }
        Ok(self.receipts.get(&tx_hash).cloned())
    }
}
