//! End-to-end tests for skillforge-gate.
//!
//! These drive [`skillforge_gate::AccessGate`] the way the marketplace's HTTP
//! layer does, against an in-memory ledger and against a local JSON-RPC node.
//!
//! Run with:
//! ```bash
//! cargo test --test e2e
//! ```

#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]

mod access_flow;
mod harness;
mod rpc;
