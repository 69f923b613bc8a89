//! Integration tests for the eight settlement boundary scenarios: the
//! single-wallet happy path, chaining-limit backpressure, round-robin
//! assignment across wallets, operator-triggered gap recovery, transient vs.
//! sustained drop, abort-is-terminal, dedup hits, and identifier conflicts.
//! All run against [`FakeChainClient`] with scripted outcomes rather than a
//! live chain.

use std::sync::Arc;

use bytes::Bytes;
use tokio_util::sync::CancellationToken;

use sponsor_relay::amount::Amount;
use sponsor_relay::apikeys::ApiKeyStore;
use sponsor_relay::chain::fake::FakeChainClient;
use sponsor_relay::chain::{
    BroadcastAccepted, ChainClient, NonceInfo, TokenKind, TransactionStatusInfo, TransferEvent,
    TxStatus,
};
use sponsor_relay::codec::{self, AuthMode, ParsedTransaction};
use sponsor_relay::config::ChainNetwork;
use sponsor_relay::dedup::DedupStore;
use sponsor_relay::error::ApiError;
use sponsor_relay::fees::FeeEstimator;
use sponsor_relay::nonce::{NonceCoordinator, NonceError};
use sponsor_relay::ratelimit::OriginRateLimiter;
use sponsor_relay::receipts::ReceiptStore;
use sponsor_relay::settlement::SettlementPipeline;
use sponsor_relay::settlement::types::{
    FacilitatorPaymentPayload, FacilitatorRequest, FacilitatorTransactionPayload, RelayRequest,
    SettleOptionsInput,
};
use sponsor_relay::stats::StatsAggregator;
use sponsor_relay::util::b64::Base64Bytes;
use sponsor_relay::wallet::{derive_wallets_from_mnemonic, SponsorWallet};

const MNEMONIC: &str =
    "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

struct Harness {
    pipeline: Arc<SettlementPipeline>,
    chain: Arc<FakeChainClient>,
    wallets: Vec<SponsorWallet>,
}

async fn build_pipeline(wallet_count: usize) -> Harness {
    let chain = Arc::new(FakeChainClient::new());
    let dyn_chain: Arc<dyn ChainClient> = chain.clone();
    let wallets = derive_wallets_from_mnemonic(MNEMONIC, wallet_count).unwrap();
    let addresses: Vec<String> = wallets.iter().map(|w| w.address.clone()).collect();
    let nonce = NonceCoordinator::spawn(addresses, dyn_chain.clone(), CancellationToken::new());
    let fees = Arc::new(FeeEstimator::new(dyn_chain.clone()));
    let receipts = Arc::new(ReceiptStore::new());
    let dedup = Arc::new(DedupStore::new());
    let stats = Arc::new(StatsAggregator::new());
    let rate_limiter = Arc::new(OriginRateLimiter::new());
    let api_keys = Arc::new(ApiKeyStore::new());
    let pipeline = Arc::new(SettlementPipeline::new(
        dyn_chain,
        nonce,
        wallets.clone(),
        ChainNetwork::Testnet,
        fees,
        receipts,
        dedup,
        stats,
        rate_limiter,
        api_keys,
    ));
    Harness { pipeline, chain, wallets }
}

fn pending_tx(origin: &str, recipient: &str, amount: u64, origin_nonce: u64) -> Bytes {
    let tx = ParsedTransaction {
        auth_mode: AuthMode::SponsorPending,
        origin_address: origin.to_string(),
        origin_signature_present: true,
        origin_nonce,
        sponsor_address: None,
        sponsor_nonce: 0,
        fee_field: 0,
        transfer_events: vec![TransferEvent {
            token_kind: TokenKind::Native,
            amount: Amount::from(amount),
            recipient: recipient.to_string(),
            sender: origin.to_string(),
        }],
        trailing_payload: Bytes::new(),
    };
    codec::serialize(&tx)
}

fn signed_tx(origin: &str, sponsor: &str, recipient: &str, amount: u64, fee: u64) -> Bytes {
    let tx = ParsedTransaction {
        auth_mode: AuthMode::SponsorSigned,
        origin_address: origin.to_string(),
        origin_signature_present: true,
        origin_nonce: 5,
        sponsor_address: Some(sponsor.to_string()),
        sponsor_nonce: 12,
        fee_field: fee,
        transfer_events: vec![TransferEvent {
            token_kind: TokenKind::Native,
            amount: Amount::from(amount),
            recipient: recipient.to_string(),
            sender: origin.to_string(),
        }],
        trailing_payload: Bytes::new(),
    };
    codec::serialize(&tx)
}

fn settle_options(expected_recipient: &str, min_amount: &str) -> SettleOptionsInput {
    SettleOptionsInput {
        expected_recipient: expected_recipient.to_string(),
        min_amount: min_amount.to_string(),
        token_type: None,
        expected_sender: None,
        resource: None,
        method: None,
    }
}

fn facilitator_request(tx_bytes: &Bytes, options: SettleOptionsInput, payment_identifier: Option<&str>) -> FacilitatorRequest {
    let extensions = payment_identifier.map(|id| {
        let mut map = serde_json::Map::new();
        map.insert("paymentIdentifier".to_string(), serde_json::Value::String(id.to_string()));
        map
    });
    FacilitatorRequest {
        payment_payload: FacilitatorPaymentPayload {
            payload: FacilitatorTransactionPayload {
                transaction: Base64Bytes::encode_string(tx_bytes),
            },
            extensions,
            accepted: true,
        },
        payment_requirements: options,
        x402_version: Some(1),
    }
}

/// Scenario 1: single sponsor wallet, origin-signed pending transaction,
/// scripted success status — relay reports success and stores a receipt.
#[tokio::test(start_paused = true)]
async fn single_wallet_happy_path() {
    let harness = build_pipeline(1).await;
    harness.chain.push_broadcast_outcome(Ok(BroadcastAccepted { txid: "0xhappy1".to_string() }));
    harness.chain.seed_tx_status_sequence(
        "0xhappy1",
        vec![TransactionStatusInfo {
            status: TxStatus::Success,
            sender_address: Some("SP_ORIGIN".to_string()),
            block_height: Some(100),
            events: vec![],
        }],
    );

    let tx = pending_tx("SP_ORIGIN", "SP_RECIPIENT", 1_000, 5);
    let request = RelayRequest {
        transaction: Base64Bytes::encode_string(&tx),
        settle: settle_options("SP_RECIPIENT", "500"),
        auth: None,
    };

    let response = harness.pipeline.relay(request).await.unwrap();
    assert!(response.success);
    assert_eq!(response.txid, "0xhappy1");
    assert!(harness.pipeline.verify_receipt(&response.receipt_id).is_ok());
}

/// Scenario 2: a wallet at the chaining limit refuses a 21st concurrent
/// reservation until one is released.
#[tokio::test]
async fn chaining_limit_backpressure() {
    let harness = build_pipeline(1).await;
    let address = harness.wallets[0].address.clone();

    for _ in 0..sponsor_relay::nonce::CHAINING_LIMIT {
        harness
            .pipeline
            .nonce()
            .assign_nonce(1, vec![address.clone()])
            .await
            .unwrap();
    }

    let result = harness.pipeline.nonce().assign_nonce(1, vec![address]).await;
    assert!(matches!(result, Err(NonceError::ChainingLimitExceeded { .. })));
}

/// Scenario 3: with three wallets, consecutive assignments round-robin
/// rather than piling onto a single wallet.
#[tokio::test]
async fn round_robin_across_three_wallets() {
    let harness = build_pipeline(3).await;
    let addresses: Vec<String> = harness.wallets.iter().map(|w| w.address.clone()).collect();

    let mut wallet_indices = Vec::new();
    for _ in 0..6 {
        let (_, wallet_index) = harness
            .pipeline
            .nonce()
            .assign_nonce(3, addresses.clone())
            .await
            .unwrap();
        wallet_indices.push(wallet_index);
    }

    assert_eq!(wallet_indices, vec![0, 1, 2, 0, 1, 2]);
}

/// Scenario 4: operator-triggered `/nonce/reset` re-seeds a wallet's pool
/// from the chain's current `possibleNextNonce`, reporting the previous and
/// new heads.
#[tokio::test]
async fn gap_recovery_via_reset() {
    let harness = build_pipeline(1).await;
    let address = harness.wallets[0].address.clone();

    // Drift the pool forward so its cached head no longer matches the chain.
    harness.pipeline.nonce().assign_nonce(1, vec![address.clone()]).await.unwrap();

    harness.chain.seed_nonce_info(
        &address,
        NonceInfo {
            last_executed_nonce: Some(49),
            possible_next_nonce: 50,
            detected_missing_nonces: vec![],
        },
    );

    let (previous_head, new_head) = harness
        .pipeline
        .nonce()
        .reset_wallet(0, address.clone())
        .await
        .unwrap();
    assert_eq!(previous_head, Some(1));
    assert_eq!(new_head, 50);

    let (available, _) = harness.pipeline.nonce().pool_snapshot(0).await.unwrap();
    assert_eq!(available.first().copied(), Some(50));
}

/// Scenario 5a: a `dropped_replace_by_fee` status is transient — polling
/// continues past it to the eventual success status.
#[tokio::test(start_paused = true)]
async fn transient_drop_then_success() {
    let harness = build_pipeline(1).await;
    harness.chain.push_broadcast_outcome(Ok(BroadcastAccepted { txid: "0xtransient".to_string() }));
    harness.chain.seed_tx_status_sequence(
        "0xtransient",
        vec![
            TransactionStatusInfo {
                status: TxStatus::DroppedReplaceByFee,
                sender_address: None,
                block_height: None,
                events: vec![],
            },
            TransactionStatusInfo {
                status: TxStatus::Success,
                sender_address: Some("SP_ORIGIN".to_string()),
                block_height: Some(200),
                events: vec![],
            },
        ],
    );

    let tx = pending_tx("SP_ORIGIN", "SP_RECIPIENT", 1_000, 5);
    let request = RelayRequest {
        transaction: Base64Bytes::encode_string(&tx),
        settle: settle_options("SP_RECIPIENT", "500"),
        auth: None,
    };

    let response = harness.pipeline.relay(request).await.unwrap();
    assert!(response.success);
    assert_eq!(response.settlement.status, "confirmed");
}

/// Scenario 5b: a transaction that's dropped for the entire poll budget and
/// never aborts or confirms is reported as a pending settlement, not a
/// failure.
#[tokio::test(start_paused = true)]
async fn sustained_drop_times_out_as_pending() {
    let harness = build_pipeline(1).await;
    harness.chain.push_broadcast_outcome(Ok(BroadcastAccepted { txid: "0xsustained".to_string() }));
    harness.chain.seed_tx_status_sequence(
        "0xsustained",
        vec![TransactionStatusInfo {
            status: TxStatus::DroppedReplaceByFee,
            sender_address: None,
            block_height: None,
            events: vec![],
        }],
    );

    let tx = pending_tx("SP_ORIGIN", "SP_RECIPIENT", 1_000, 5);
    let request = RelayRequest {
        transaction: Base64Bytes::encode_string(&tx),
        settle: settle_options("SP_RECIPIENT", "500"),
        auth: None,
    };

    let response = harness.pipeline.relay(request).await.unwrap();
    assert!(response.success);
    assert_eq!(response.settlement.status, "pending");
}

/// Scenario 6: an `abort_*` status is terminal — the poll loop stops
/// immediately instead of waiting out the budget.
#[tokio::test(start_paused = true)]
async fn abort_is_terminal() {
    let harness = build_pipeline(1).await;
    harness.chain.push_broadcast_outcome(Ok(BroadcastAccepted { txid: "0xabort".to_string() }));
    harness.chain.seed_tx_status_sequence(
        "0xabort",
        vec![TransactionStatusInfo {
            status: TxStatus::Abort("abort_by_response".to_string()),
            sender_address: None,
            block_height: None,
            events: vec![],
        }],
    );

    let tx = pending_tx("SP_ORIGIN", "SP_RECIPIENT", 1_000, 5);
    let request = RelayRequest {
        transaction: Base64Bytes::encode_string(&tx),
        settle: settle_options("SP_RECIPIENT", "500"),
        auth: None,
    };

    let result = harness.pipeline.relay(request).await;
    assert!(matches!(result, Err(ApiError::SettlementFailed(_))));
}

/// Scenario 7: an identical `settle` payload replayed by payload hash
/// returns the cached response without re-broadcasting.
#[tokio::test(start_paused = true)]
async fn dedup_hit_skips_rebroadcast() {
    let harness = build_pipeline(1).await;
    let sponsor = harness.wallets[0].address.clone();
    harness.chain.push_broadcast_outcome(Ok(BroadcastAccepted { txid: "0xdedup".to_string() }));
    harness.chain.seed_tx_status_sequence(
        "0xdedup",
        vec![TransactionStatusInfo {
            status: TxStatus::Success,
            sender_address: Some("SP_ORIGIN".to_string()),
            block_height: Some(300),
            events: vec![],
        }],
    );

    let tx = signed_tx("SP_ORIGIN", &sponsor, "SP_RECIPIENT", 1_000, 300);
    let request = facilitator_request(&tx, settle_options("SP_RECIPIENT", "500"), None);

    let first = harness.pipeline.settle(request.clone()).await.unwrap();
    assert!(first.success);
    assert_eq!(harness.chain.broadcast_count.load(std::sync::atomic::Ordering::SeqCst), 1);

    let second = harness.pipeline.settle(request).await.unwrap();
    assert_eq!(second.transaction, first.transaction);
    assert_eq!(harness.chain.broadcast_count.load(std::sync::atomic::Ordering::SeqCst), 1);
}

/// Scenario 8: reusing a `paymentIdentifier` with a materially different
/// payload is a conflict, not a cache hit.
#[tokio::test(start_paused = true)]
async fn identifier_reuse_with_different_payload_conflicts() {
    let harness = build_pipeline(1).await;
    let sponsor = harness.wallets[0].address.clone();
    harness.chain.push_broadcast_outcome(Ok(BroadcastAccepted { txid: "0xfirst".to_string() }));
    harness.chain.seed_tx_status_sequence(
        "0xfirst",
        vec![TransactionStatusInfo {
            status: TxStatus::Success,
            sender_address: Some("SP_ORIGIN".to_string()),
            block_height: Some(400),
            events: vec![],
        }],
    );

    let first_tx = signed_tx("SP_ORIGIN", &sponsor, "SP_RECIPIENT", 1_000, 300);
    let client_id = "client_identifier_1234567890ab";
    let first_request = facilitator_request(
        &first_tx,
        settle_options("SP_RECIPIENT", "500"),
        Some(client_id),
    );
    harness.pipeline.settle(first_request).await.unwrap();

    let second_tx = signed_tx("SP_ORIGIN", &sponsor, "SP_OTHER_RECIPIENT", 2_000, 300);
    let second_request = facilitator_request(
        &second_tx,
        settle_options("SP_OTHER_RECIPIENT", "500"),
        Some(client_id),
    );
    let result = harness.pipeline.settle(second_request).await;
    assert!(matches!(result, Err(ApiError::IdentifierConflict)));
}
