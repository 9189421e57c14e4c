//! Access flows as the marketplace routes run them.

use super::harness::{listing, tokens, tx_reference, TestHarness, TestWallet, TEST_TOKEN};
use super::rpc::MockRpcNode;
use alloy_primitives::{Address, B256};
use futures::future::join_all;
use skillforge_gate::content::{digest, preview, LOCK_BANNER};
use skillforge_gate::ledger::lower_hex;
use skillforge_gate::{
    Challenge, LedgerRead, Rejection, RejectionKind, StaticLedger, UnverifiedReason,
};
use std::time::Duration;

/// A free listing installs with no transaction reference and no ledger read,
/// even when the ledger is down.
#[tokio::test]
async fn test_free_install_bypasses_payment_verification() {
    let harness =
        TestHarness::in_memory(StaticLedger::new(TEST_TOKEN).with_outage("rpc down")).unwrap();
    let buyer = TestWallet::random();
    let author = TestWallet::random();

    let grant = harness
        .gate
        .authorize_install(&buyer.challenge(), &listing(author.address(), "0"), None)
        .await
        .expect("free install");

    assert_eq!(grant.installer.address(), buyer.address());
    assert!(grant.payment.is_none());
    assert_eq!(harness.ledger.read_count(), 0);
}

/// Publish, then install a paid listing, over the JSON-RPC client.
#[tokio::test]
async fn test_publish_and_paid_install_over_rpc() {
    let node = MockRpcNode::start().await;
    let harness = TestHarness::over_rpc(&node).unwrap();
    let author = TestWallet::random();
    let buyer = TestWallet::random();
    let content = "# Web scraper\n\nFetches pages politely.";

    node.set_balance(author.address(), tokens("150000"));
    let publish = harness
        .gate
        .authorize_publish(&author.challenge(), content)
        .await
        .expect("publish allowed");
    assert_eq!(publish.content_digest, digest(content));
    assert_eq!(publish.balance.to_string(), "150000");

    let item = listing(author.address(), "25");

    // Without a payment the client is told what to pay and to whom.
    let rejection = harness
        .gate
        .authorize_install(&buyer.challenge(), &item, None)
        .await
        .expect_err("payment required");
    let body = rejection.body();
    assert_eq!(body.kind, RejectionKind::PaymentRequired);
    assert_eq!(body.amount.as_deref(), Some("25"));
    assert_eq!(body.recipient, Some(lower_hex(&author.address())));

    // The buyer pays in a batched transaction; the matching transfer is second.
    let tx = B256::repeat_byte(0x77);
    node.add_receipt(
        tx,
        true,
        harness.token(),
        &[
            (buyer.address(), Address::new([0x55; 20]), tokens("1")),
            (buyer.address(), author.address(), tokens("30")),
        ],
    );
    let grant = harness
        .gate
        .authorize_install(&buyer.challenge(), &item, Some(&tx_reference(tx)))
        .await
        .expect("paid install");
    let payment = grant.payment.expect("payment recorded");
    assert_eq!(payment.to, author.address());
    assert_eq!(payment.amount, tokens("30"));

    // Once installed, the viewer sees the whole listing.
    let viewer = harness.gate.viewer(&buyer.challenge());
    assert_eq!(viewer.as_ref().map(|v| v.address()), Some(buyer.address()));
    assert_eq!(preview(content, viewer.is_some()), content);
}

#[tokio::test]
async fn test_insufficient_balance_over_rpc() {
    let node = MockRpcNode::start().await;
    let harness = TestHarness::over_rpc(&node).unwrap();
    let publisher = TestWallet::random();
    node.set_balance(publisher.address(), tokens("99999.5"));

    let rejection = harness
        .gate
        .authorize_publish(&publisher.challenge(), "# Skill")
        .await
        .expect_err("below threshold");

    assert_eq!(rejection.http_status(), 403);
    let body = rejection.body();
    assert_eq!(body.kind, RejectionKind::InsufficientBalance);
    assert_eq!(body.required_threshold.as_deref(), Some("100000"));
    assert_eq!(body.current_balance.as_deref(), Some("99999.5"));
    assert_eq!(node.request_count().await, 1);
}

/// An unreachable ledger is reported as unavailable after retries, never as
/// a denial, and payment checks degrade to unverified.
#[tokio::test]
async fn test_rpc_outage() {
    let node = MockRpcNode::start().await;
    let harness = TestHarness::over_rpc(&node).unwrap();
    let wallet = TestWallet::random();
    node.set_balance(wallet.address(), tokens("1000000"));
    node.set_failing(true);

    let rejection = harness
        .gate
        .authorize_publish(&wallet.challenge(), "# Skill")
        .await
        .expect_err("ledger down");
    assert_eq!(rejection.kind(), RejectionKind::LedgerUnavailable);
    assert_eq!(rejection.http_status(), 503);
    assert_eq!(node.request_count().await, 3);

    let rejection = harness
        .gate
        .authorize_install(
            &wallet.challenge(),
            &listing(Address::new([0x01; 20]), "1"),
            Some(&tx_reference(B256::repeat_byte(1))),
        )
        .await
        .expect_err("unverifiable");
    assert!(
        matches!(
            rejection,
            Rejection::PaymentUnverified {
                reason: UnverifiedReason::LedgerFault(_)
            }
        ),
        "expected ledger fault, got {rejection:?}"
    );

    // Recovery needs no reset.
    node.set_failing(false);
    assert!(harness
        .gate
        .authorize_publish(&wallet.challenge(), "# Skill")
        .await
        .is_ok());
}

#[tokio::test]
async fn test_reverted_payment_over_rpc() {
    let node = MockRpcNode::start().await;
    let harness = TestHarness::over_rpc(&node).unwrap();
    let buyer = TestWallet::random();
    let author = TestWallet::random();
    let tx = B256::repeat_byte(0x66);
    node.add_receipt(
        tx,
        false,
        harness.token(),
        &[(buyer.address(), author.address(), tokens("10"))],
    );

    let rejection = harness
        .gate
        .authorize_install(
            &buyer.challenge(),
            &listing(author.address(), "10"),
            Some(&tx_reference(tx)),
        )
        .await
        .expect_err("reverted");
    assert_eq!(
        rejection,
        Rejection::PaymentUnverified {
            reason: UnverifiedReason::TransactionFailed
        }
    );
    assert_eq!(node.request_count().await, 1, "failed transactions are final");
}

#[tokio::test]
async fn test_balance_read_over_rpc_matches_fixture() {
    let node = MockRpcNode::start().await;
    let harness = TestHarness::over_rpc(&node).unwrap();
    let holder = Address::new([0x42; 20]);
    node.set_balance(holder, tokens("12.25"));

    assert_eq!(
        harness.ledger.token_balance(holder).await.unwrap(),
        tokens("12.25")
    );
    assert!(harness
        .ledger
        .transaction_receipt(B256::repeat_byte(0x01))
        .await
        .unwrap()
        .is_none());
}

/// Authentication rejections surface before any ledger work.
#[tokio::test]
async fn test_identity_failures_short_circuit() {
    let harness = TestHarness::in_memory(StaticLedger::new(TEST_TOKEN)).unwrap();
    let wallet = TestWallet::random();
    let impostor = TestWallet::random();

    let cases = [
        (Challenge::default(), RejectionKind::MissingCredentials),
        (wallet.stale_challenge(), RejectionKind::ExpiredChallenge),
        (
            Challenge {
                address: Some(lower_hex(&impostor.address())),
                ..wallet.challenge()
            },
            RejectionKind::InvalidSignature,
        ),
    ];

    for (challenge, expected) in cases {
        let rejection = harness
            .gate
            .authorize_publish(&challenge, "# Skill")
            .await
            .expect_err("rejected");
        assert_eq!(rejection.kind(), expected);
        assert_eq!(rejection.http_status(), 401);

        // Optional mode swallows the same rejection.
        assert!(harness.gate.viewer(&challenge).is_none());
    }
    assert_eq!(harness.ledger.read_count(), 0);
}

#[tokio::test]
async fn test_locked_preview_for_anonymous_viewer() {
    let harness = TestHarness::in_memory(StaticLedger::new(TEST_TOKEN)).unwrap();
    let content = "x".repeat(800);

    let viewer = harness.gate.viewer(&Challenge::default());
    let shown = preview(&content, viewer.is_some());
    assert!(shown.ends_with(LOCK_BANNER));
    assert_eq!(shown.len(), 500 + LOCK_BANNER.len());
}

#[tokio::test]
async fn test_update_by_author_only() {
    let harness = TestHarness::in_memory(StaticLedger::new(TEST_TOKEN)).unwrap();
    let author = TestWallet::random();
    let other = TestWallet::random();

    let grant = harness
        .gate
        .authorize_update(&author.challenge(), author.address(), Some("# v2"))
        .expect("author may update");
    assert_eq!(grant.content_digest, Some(digest("# v2")));

    let rejection = harness
        .gate
        .authorize_update(&other.challenge(), author.address(), Some("# v2"))
        .expect_err("not the author");
    assert_eq!(rejection.kind(), RejectionKind::NotAuthor);
    assert_eq!(rejection.http_status(), 403);
}

/// Many concurrent requests share one ledger client; slow reads do not
/// serialize unrelated requests.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_share_ledger() {
    const REQUESTS: usize = 32;
    let latency = Duration::from_millis(50);

    let author = TestWallet::random();
    let buyers: Vec<TestWallet> = (0..REQUESTS).map(|_| TestWallet::random()).collect();

    let mut ledger = StaticLedger::new(TEST_TOKEN).with_latency(latency);
    for (i, buyer) in buyers.iter().enumerate() {
        let tx = B256::with_last_byte(u8::try_from(i).unwrap());
        ledger = ledger
            .with_balance(buyer.address(), tokens("100000"))
            .with_transfers(tx, &[(buyer.address(), author.address(), tokens("3"))]);
    }
    let harness = TestHarness::in_memory(ledger).unwrap();
    let item = &listing(author.address(), "3");

    let started = std::time::Instant::now();
    let installs = buyers.iter().enumerate().map(|(i, buyer)| {
        let gate = harness.gate.clone();
        let challenge = buyer.challenge();
        let reference = tx_reference(B256::with_last_byte(u8::try_from(i).unwrap()));
        async move {
            gate.authorize_install(&challenge, item, Some(&reference))
                .await
        }
    });
    let publishes = buyers.iter().map(|buyer| {
        let gate = harness.gate.clone();
        let challenge = buyer.challenge();
        async move { gate.authorize_publish(&challenge, "# Skill").await }
    });

    let (installs, publishes) = futures::join!(join_all(installs), join_all(publishes));
    let elapsed = started.elapsed();

    assert!(installs.iter().all(Result::is_ok));
    assert!(publishes.iter().all(Result::is_ok));
    assert_eq!(harness.ledger.read_count(), 2 * REQUESTS);
    assert!(
        elapsed < latency * u32::try_from(REQUESTS).unwrap(),
        "reads were serialized: {elapsed:?}"
    );
}
