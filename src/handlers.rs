//! HTTP surface (§6): one thin async handler per route, each delegating to
//! [`SettlementPipeline`] and relying on [`ApiError`]'s own `IntoResponse`
//! for failure formatting — mirrors the teacher's `handlers.rs` shape
//! (generic routes fn, `#[instrument(skip_all)]` handlers, warn-then-forward
//! on error) adapted to a single concrete facilitator type rather than a
//! scheme-generic trait, since this relay has exactly one settlement path.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};

use crate::amount::Amount;
use crate::chain::FeeKind;
use crate::error::ApiError;
use crate::settlement::SettlementPipeline;
use crate::settlement::types::{
    AccessRequest, FacilitatorRequest, FacilitatorSettleResponse, RelayRequest, VerifyResponse,
};

pub fn routes() -> Router<Arc<SettlementPipeline>> {
    Router::new()
        .route("/relay", post(relay))
        .route("/sponsor", post(sponsor))
        .route("/settle", post(settle))
        .route("/verify", post(verify))
        .route("/supported", get(supported))
        .route("/verify/{receiptId}", get(verify_receipt))
        .route("/access", post(access))
        .route("/fees", get(fees))
        .route("/fees/config", post(fees_config))
        .route("/health", get(health))
        .route("/stats", get(stats))
        .route("/nonce/stats", get(nonce_stats))
        .route("/nonce/reset", post(nonce_reset))
}

fn api_key_from(headers: &HeaderMap) -> Option<String> {
    headers
        .get("X-API-Key")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

#[instrument(skip_all)]
async fn relay(
    State(pipeline): State<Arc<SettlementPipeline>>,
    Json(body): Json<RelayRequest>,
) -> axum::response::Response {
    match pipeline.relay(body).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(error) => {
            warn!(error = ?error, "relay failed");
            error.into_response()
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SponsorRequest {
    transaction: String,
}

#[instrument(skip_all)]
async fn sponsor(
    State(pipeline): State<Arc<SettlementPipeline>>,
    headers: HeaderMap,
    Json(body): Json<SponsorRequest>,
) -> axum::response::Response {
    let api_key = api_key_from(&headers);
    if let Err(error) = pipeline.api_keys().check_and_record(api_key.as_deref(), Amount::ZERO) {
        return ApiError::from(error).into_response();
    }
    match pipeline.sponsor(&body.transaction).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(error) => {
            warn!(error = ?error, "sponsor failed");
            error.into_response()
        }
    }
}

/// `/settle` is always HTTP 200 with `success: false` embedded for any
/// processing-stage failure; only schema malformation (body deserialization)
/// and identifier conflicts use their own status codes, per §6.
#[instrument(skip_all)]
async fn settle(
    State(pipeline): State<Arc<SettlementPipeline>>,
    Json(body): Json<FacilitatorRequest>,
) -> axum::response::Response {
    match pipeline.settle(body).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(error @ ApiError::IdentifierConflict) => error.into_response(),
        Err(error @ (ApiError::InvalidRequest(_) | ApiError::InvalidClientIdentifier)) => {
            error.into_response()
        }
        Err(error) => {
            warn!(error = ?error, "settle processing failed, returning success:false");
            let fallback = FacilitatorSettleResponse {
                success: false,
                payer: None,
                transaction: String::new(),
                network: pipeline.network_name().to_string(),
            };
            (StatusCode::OK, Json(fallback)).into_response()
        }
    }
}

#[instrument(skip_all)]
async fn verify(
    State(pipeline): State<Arc<SettlementPipeline>>,
    Json(body): Json<FacilitatorRequest>,
) -> axum::response::Response {
    match pipeline
        .verify(&body.payment_payload.payload.transaction, &body.payment_requirements)
        .await
    {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(error @ ApiError::InvalidRequest(_)) => error.into_response(),
        Err(error) => {
            warn!(error = ?error, "verify processing failed, returning isValid:false");
            let fallback = VerifyResponse {
                is_valid: false,
                invalid_reason: Some(error.to_string()),
                payer: None,
            };
            (StatusCode::OK, Json(fallback)).into_response()
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct SupportedKind {
    scheme: &'static str,
    network: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct SupportedResponse {
    kinds: Vec<SupportedKind>,
    extensions: Vec<&'static str>,
    signers: Vec<String>,
}

#[instrument(skip_all)]
async fn supported(State(pipeline): State<Arc<SettlementPipeline>>) -> axum::response::Response {
    let signers = (0..pipeline.wallet_count())
        .filter_map(|i| pipeline.wallet_address(i))
        .collect();
    let response = SupportedResponse {
        kinds: vec![SupportedKind { scheme: "exact", network: pipeline.network_name().to_string() }],
        extensions: vec!["paymentIdentifier"],
        signers,
    };
    (StatusCode::OK, Json(response)).into_response()
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReceiptResponse {
    receipt: crate::receipts::PaymentReceipt,
}

#[instrument(skip(pipeline))]
async fn verify_receipt(
    State(pipeline): State<Arc<SettlementPipeline>>,
    Path(receipt_id): Path<String>,
) -> axum::response::Response {
    match pipeline.verify_receipt(&receipt_id) {
        Ok(receipt) => (StatusCode::OK, Json(ReceiptResponse { receipt })).into_response(),
        Err(error) => error.into_response(),
    }
}

#[instrument(skip_all)]
async fn access(
    State(pipeline): State<Arc<SettlementPipeline>>,
    Json(body): Json<AccessRequest>,
) -> axum::response::Response {
    match pipeline.access(body).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(error) => {
            warn!(error = ?error, "access failed");
            error.into_response()
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct FeesResponse {
    fees: crate::chain::FeeEstimates,
    source: crate::fees::FeeSource,
    cached: bool,
}

#[instrument(skip_all)]
async fn fees(State(pipeline): State<Arc<SettlementPipeline>>) -> axum::response::Response {
    let response = pipeline.fees().get_fees().await;
    (
        StatusCode::OK,
        Json(FeesResponse { fees: response.fees, source: response.source, cached: response.cached }),
    )
        .into_response()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct FeesConfigRequest {
    kind: FeeKind,
    floor: u64,
    ceiling: u64,
}

#[instrument(skip_all)]
async fn fees_config(
    State(pipeline): State<Arc<SettlementPipeline>>,
    headers: HeaderMap,
    Json(body): Json<FeesConfigRequest>,
) -> axum::response::Response {
    let api_key = api_key_from(&headers);
    if let Err(error) = pipeline.api_keys().check_and_record(api_key.as_deref(), Amount::ZERO) {
        return ApiError::from(error).into_response();
    }
    match pipeline.fees().set_config(body.kind, body.floor, body.ceiling) {
        Ok(()) => (StatusCode::OK, Json(body)).into_response(),
        Err(error) => ApiError::InvalidRequest(error.to_string()).into_response(),
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    network: String,
}

#[instrument(skip_all)]
async fn health(State(pipeline): State<Arc<SettlementPipeline>>) -> axum::response::Response {
    let response = HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        network: pipeline.network_name().to_string(),
    };
    (StatusCode::OK, Json(response)).into_response()
}

#[instrument(skip_all)]
async fn stats(State(pipeline): State<Arc<SettlementPipeline>>) -> axum::response::Response {
    (StatusCode::OK, Json(pipeline.stats().overview())).into_response()
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct WalletNonceView {
    wallet_index: usize,
    address: Option<String>,
    available: Vec<u64>,
    reserved: Vec<u64>,
    fee_stats: Option<crate::nonce::PerWalletFeeStats>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct NonceStatsResponse {
    counters: crate::nonce::CoordinatorCounters,
    wallets: Vec<WalletNonceView>,
}

#[instrument(skip_all)]
async fn nonce_stats(State(pipeline): State<Arc<SettlementPipeline>>) -> axum::response::Response {
    let counters = pipeline.nonce().counters().await.unwrap_or_default();
    let mut wallets = Vec::with_capacity(pipeline.wallet_count());
    for wallet_index in 0..pipeline.wallet_count() {
        let (available, reserved) = pipeline
            .nonce()
            .pool_snapshot(wallet_index)
            .await
            .unwrap_or_default();
        let fee_stats = pipeline.nonce().fee_stats(wallet_index).await;
        wallets.push(WalletNonceView {
            wallet_index,
            address: pipeline.wallet_address(wallet_index),
            available,
            reserved,
            fee_stats,
        });
    }
    (StatusCode::OK, Json(NonceStatsResponse { counters, wallets })).into_response()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NonceResetRequest {
    wallet_index: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct NonceResetResponse {
    previous_nonce: Option<u64>,
    new_nonce: u64,
}

#[instrument(skip_all)]
async fn nonce_reset(
    State(pipeline): State<Arc<SettlementPipeline>>,
    headers: HeaderMap,
    Json(body): Json<NonceResetRequest>,
) -> axum::response::Response {
    let api_key = api_key_from(&headers);
    if let Err(error) = pipeline.api_keys().check_and_record(api_key.as_deref(), Amount::ZERO) {
        return ApiError::from(error).into_response();
    }
    let Some(address) = pipeline.wallet_address(body.wallet_index) else {
        return ApiError::InvalidRequest("walletIndex out of range".to_string()).into_response();
    };
    match pipeline.nonce().reset_wallet(body.wallet_index, address).await {
        Ok((previous_nonce, new_nonce)) => {
            (StatusCode::OK, Json(NonceResetResponse { previous_nonce, new_nonce })).into_response()
        }
        Err(error) => ApiError::from(error).into_response(),
    }
}
