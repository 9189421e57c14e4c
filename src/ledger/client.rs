//! Ledger-read client: the read-only seam to the EVM chain.
//!
//! [`LedgerRead`] is what the balance gate and payment verifier depend on.
//! [`JsonRpcLedger`] implements it over Ethereum JSON-RPC with a pooled
//! `reqwest` client. It is constructed once at startup, wrapped in an `Arc`,
//! and shared by every request.

use crate::config::LedgerConfig;
use crate::error::{Error, Result};
use crate::ledger::types::{decode_hex, parse_address, LogEntry, TransactionReceipt};
use alloy_primitives::{Address, B256, U256};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

/// ERC-20 `balanceOf(address)` function selector.
const BALANCE_OF_SELECTOR: &str = "70a08231";

/// Read-only access to the ledger.
///
/// Each method performs exactly one remote read. Implementations must not
/// retry internally; callers own retry policy.
#[async_trait]
pub trait LedgerRead: Send + Sync {
    /// Token contract this client reads balances from and whose transfer
    /// events count as payments.
    fn token_address(&self) -> Address;

    /// Current token balance of `owner`, in base units.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LedgerUnavailable`] if the read fails for any reason.
    async fn token_balance(&self, owner: Address) -> Result<U256>;

    /// Receipt for `tx_hash`, or `None` if the ledger does not know it (yet).
    ///
    /// # Errors
    ///
    /// Returns [`Error::LedgerUnavailable`] if the read fails for any reason.
    async fn transaction_receipt(&self, tx_hash: B256) -> Result<Option<TransactionReceipt>>;
}

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcReceipt {
    transaction_hash: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    logs: Vec<RpcLog>,
}

#[derive(Deserialize)]
struct RpcLog {
    address: String,
    #[serde(default)]
    topics: Vec<String>,
    #[serde(default)]
    data: String,
}

fn malformed(what: &str, err: impl std::fmt::Display) -> Error {
    Error::LedgerUnavailable(format!("malformed {what}: {err}"))
}

fn parse_quantity(value: &str) -> Result<u64> {
    let stripped = value.trim().trim_start_matches("0x");
    u64::from_str_radix(stripped, 16).map_err(|e| malformed("quantity", e))
}

fn parse_word(value: &str) -> Result<B256> {
    let bytes = decode_hex(value).map_err(|e| malformed("topic", e))?;
    if bytes.len() != 32 {
        return Err(malformed("topic", format!("{} bytes", bytes.len())));
    }
    Ok(B256::from_slice(&bytes))
}

impl TryFrom<RpcLog> for LogEntry {
    type Error = Error;

    fn try_from(log: RpcLog) -> Result<Self> {
        Ok(Self {
            address: parse_address(&log.address).map_err(|e| malformed("log address", e))?,
            topics: log
                .topics
                .iter()
                .map(|t| parse_word(t))
                .collect::<Result<Vec<_>>>()?,
            data: decode_hex(&log.data).map_err(|e| malformed("log data", e))?,
        })
    }
}

impl TryFrom<RpcReceipt> for TransactionReceipt {
    type Error = Error;

    fn try_from(receipt: RpcReceipt) -> Result<Self> {
        Ok(Self {
            transaction_hash: parse_word(&receipt.transaction_hash)?,
            status: receipt.status.as_deref().map(parse_quantity).transpose()?,
            logs: receipt
                .logs
                .into_iter()
                .map(LogEntry::try_from)
                .collect::<Result<Vec<_>>>()?,
        })
    }
}

/// Extract the `result` member of a JSON-RPC response body.
///
/// A body carrying neither `result` nor `error` is malformed, not an empty
/// answer.
pub(crate) fn rpc_result(method: &str, mut body: Value) -> Result<Value> {
    if let Some(error) = body.get("error").filter(|e| !e.is_null()) {
        let error: RpcErrorObject = serde_json::from_value(error.clone())
            .map_err(|e| malformed(&format!("{method} error"), e))?;
        return Err(Error::LedgerUnavailable(format!(
            "{method} rpc error {}: {}",
            error.code, error.message
        )));
    }
    body.get_mut("result")
        .map(Value::take)
        .ok_or_else(|| malformed(&format!("{method} response"), "missing result"))
}

/// Parse the `result` of an `eth_getTransactionReceipt` call.
pub(crate) fn receipt_from_json(result: Value) -> Result<Option<TransactionReceipt>> {
    match result {
        Value::Null => Ok(None),
        value => {
            let raw: RpcReceipt =
                serde_json::from_value(value).map_err(|e| malformed("receipt", e))?;
            TransactionReceipt::try_from(raw).map(Some)
        }
    }
}

/// Parse the `result` of a `balanceOf` `eth_call`.
pub(crate) fn balance_from_json(result: Value) -> Result<U256> {
    let Value::String(data) = result else {
        return Err(malformed("balanceOf result", "expected hex string"));
    };
    let bytes = decode_hex(&data).map_err(|e| malformed("balanceOf result", e))?;
    if bytes.len() != 32 {
        return Err(malformed(
            "balanceOf result",
            format!("expected 32 bytes, got {}", bytes.len()),
        ));
    }
    Ok(U256::from_be_slice(&bytes))
}

/// Calldata for `balanceOf(owner)`.
pub(crate) fn balance_of_calldata(owner: Address) -> String {
    format!(
        "0x{BALANCE_OF_SELECTOR}{:0>64}",
        hex::encode(owner.as_slice())
    )
}

/// JSON-RPC implementation of [`LedgerRead`].
#[derive(Debug, Clone)]
pub struct JsonRpcLedger {
    client: reqwest::Client,
    rpc_url: String,
    token: Address,
}

impl JsonRpcLedger {
    /// Build a client from ledger configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the token address is invalid or the HTTP
    /// client cannot be built.
    pub fn new(config: &LedgerConfig) -> Result<Self> {
        let token = parse_address(&config.token_address)
            .map_err(|e| Error::Config(format!("ledger.token_address: {e}")))?;

        let client = reqwest::Client::builder()
            .user_agent(concat!("skillforge-gate/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            rpc_url: config.rpc_url.clone(),
            token,
        })
    }

    /// The RPC endpoint this client reads from.
    #[must_use]
    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value> {
        debug!(method, url = %self.rpc_url, "ledger rpc call");

        let request = RpcRequest {
            jsonrpc: "2.0",
            id: 1,
            method,
            params,
        };

        let response = self
            .client
            .post(&self.rpc_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::LedgerUnavailable(format!("{method} request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::LedgerUnavailable(format!(
                "{method} returned HTTP {}",
                response.status()
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| malformed(&format!("{method} response"), e))?;

        rpc_result(method, body)
    }
}

#[async_trait]
impl LedgerRead for JsonRpcLedger {
    fn token_address(&self) -> Address {
        self.token
    }

    async fn token_balance(&self, owner: Address) -> Result<U256> {
        let params = json!([
            {
                "to": format!("0x{}", hex::encode(self.token.as_slice())),
                "data": balance_of_calldata(owner),
            },
            "latest"
        ]);
        let result = self.call("eth_call", params).await?;
        balance_from_json(result)
    }

    async fn transaction_receipt(&self, tx_hash: B256) -> Result<Option<TransactionReceipt>> {
        let params = json!([format!("0x{}", hex::encode(tx_hash.as_slice()))]);
        let result = self.call("eth_getTransactionReceipt", params).await?;
        receipt_from_json(result)
    }
}
