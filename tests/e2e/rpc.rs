//! Mock JSON-RPC node for ledger-client tests.
//!
//! A `wiremock` server answers `eth_call` (`balanceOf` only) and
//! `eth_getTransactionReceipt` from in-memory tables, so the real
//! [`JsonRpcLedger`] can be exercised without a chain.
//!
//! [`JsonRpcLedger`]: skillforge_gate::JsonRpcLedger

use alloy_primitives::{Address, B256, U256};
use serde_json::{json, Value};
use skillforge_gate::payment::TRANSFER_EVENT_TOPIC;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::debug;
use wiremock::matchers::{body_partial_json, method};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

#[derive(Default)]
struct NodeState {
    balances: Mutex<HashMap<Address, U256>>,
    receipts: Mutex<HashMap<B256, Value>>,
    failing: AtomicBool,
}

/// A local JSON-RPC endpoint backed by in-memory state.
pub struct MockRpcNode {
    server: MockServer,
    state: Arc<NodeState>,
}

impl MockRpcNode {
    /// Start a mock server on an ephemeral localhost port.
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let state = Arc::new(NodeState::default());

        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": "eth_call" })))
            .respond_with(BalanceOf(Arc::clone(&state)))
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": "eth_getTransactionReceipt" })))
            .respond_with(ReceiptLookup(Arc::clone(&state)))
            .mount(&server)
            .await;

        debug!("Mock RPC node listening on {}", server.uri());
        Self { server, state }
    }

    /// Endpoint URL.
    #[must_use]
    pub fn url(&self) -> String {
        self.server.uri()
    }

    /// Set a token balance.
    pub fn set_balance(&self, owner: Address, balance: U256) {
        if let Ok(mut balances) = self.state.balances.lock() {
            balances.insert(owner, balance);
        }
    }

    /// Register a receipt with the given status and token transfers.
    pub fn add_receipt(
        &self,
        tx_hash: B256,
        succeeded: bool,
        token: Address,
        transfers: &[(Address, Address, U256)],
    ) {
        let logs: Vec<Value> = transfers
            .iter()
            .enumerate()
            .map(|(i, (from, to, amount))| {
                json!({
                    "address": format!("{token:#x}"),
                    "topics": [
                        format!("{TRANSFER_EVENT_TOPIC:#x}"),
                        format!("{:#x}", from.into_word()),
                        format!("{:#x}", to.into_word()),
                    ],
                    "data": format!("{:#x}", B256::from(*amount)),
                    "logIndex": format!("{i:#x}"),
                    "removed": false,
                })
            })
            .collect();

        let receipt = json!({
            "transactionHash": format!("{tx_hash:#x}"),
            "blockNumber": "0x1",
            "status": if succeeded { "0x1" } else { "0x0" },
            "gasUsed": "0x5208",
            "logs": logs,
        });
        if let Ok(mut receipts) = self.state.receipts.lock() {
            receipts.insert(tx_hash, receipt);
        }
    }

    /// Answer every request with HTTP 500 while `failing` is set.
    pub fn set_failing(&self, failing: bool) {
        self.state.failing.store(failing, Ordering::SeqCst);
    }

    /// Requests received so far, failed ones included.
    pub async fn request_count(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map_or(0, |requests| requests.len())
    }
}

/// Wrap `result` in a JSON-RPC envelope answering `request`, or fail with
/// HTTP 500 while the node is failing.
fn reply(
    state: &NodeState,
    request: &Request,
    result: impl FnOnce(&Value) -> Value,
) -> ResponseTemplate {
    if state.failing.load(Ordering::SeqCst) {
        return ResponseTemplate::new(500);
    }
    let body: Value = request.body_json().unwrap_or(Value::Null);
    ResponseTemplate::new(200).set_body_json(json!({
        "jsonrpc": "2.0",
        "id": body["id"].clone(),
        "result": result(&body["params"]),
    }))
}

struct BalanceOf(Arc<NodeState>);

impl Respond for BalanceOf {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        reply(&self.0, request, |params| {
            let data = params[0]["data"].as_str().unwrap_or_default();
            let owner = data
                .get(data.len().saturating_sub(40)..)
                .and_then(|h| h.parse::<Address>().ok());
            let balance = owner
                .and_then(|o| self.0.balances.lock().ok()?.get(&o).copied())
                .unwrap_or(U256::ZERO);
            json!(format!("{:#x}", B256::from(balance)))
        })
    }
}

struct ReceiptLookup(Arc<NodeState>);

impl Respond for ReceiptLookup {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        reply(&self.0, request, |params| {
            params[0]
                .as_str()
                .and_then(|h| h.parse::<B256>().ok())
                .and_then(|h| self.0.receipts.lock().ok()?.get(&h).cloned())
                .unwrap_or(Value::Null)
        })
    }
}
