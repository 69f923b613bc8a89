//! Request/response wire types and the explicit per-request state machine
//! for the Settlement Pipeline (C8).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::amount::Amount;
use crate::chain::TokenKind;

/// `Accepted → Validated → Deduped|Fresh → Reserved → Signed →
/// PaymentVerified → Broadcast → (Confirmed|Pending) → Released →
/// Recorded → Responded`. Pre-broadcast failure: `Reserved →
/// ReleasedUnused → Responded`. Broadcast rejection: `Broadcast →
/// ReleasedConsumedOrReusable → Responded`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementState {
    Accepted,
    Validated,
    Deduped,
    Fresh,
    Reserved,
    Signed,
    PaymentVerified,
    Broadcast,
    Confirmed,
    Pending,
    ReleasedUnused,
    ReleasedConsumedOrReusable,
    Released,
    Recorded,
    Responded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TokenTypeLabel {
    Native,
    WrappedBtc,
    SomeFt,
}

/// Placeholder asset identifiers for the two named fungible tokens; the
/// spec leaves the exact on-chain asset id open (§9 open questions cover
/// only `extensions`, not this, but no concrete id is given either).
pub const WRAPPED_BTC_ASSET_ID: &str = "SP000000000000000000002Q6VF78.wrapped-bitcoin::wrapped-bitcoin";
pub const SOME_FT_ASSET_ID: &str = "SP000000000000000000002Q6VF78.some-ft::some-ft";

impl TokenTypeLabel {
    pub fn matches(self, kind: &TokenKind) -> bool {
        match (self, kind) {
            (TokenTypeLabel::Native, TokenKind::Native) => true,
            (TokenTypeLabel::WrappedBtc, TokenKind::Ft(asset_id)) => asset_id == WRAPPED_BTC_ASSET_ID,
            (TokenTypeLabel::SomeFt, TokenKind::Ft(asset_id)) => asset_id == SOME_FT_ASSET_ID,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettleOptionsInput {
    pub expected_recipient: String,
    pub min_amount: String,
    #[serde(default)]
    pub token_type: Option<TokenTypeLabel>,
    #[serde(default)]
    pub expected_sender: Option<String>,
    #[serde(default)]
    pub resource: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SettleOptions {
    pub expected_recipient: String,
    pub min_amount: Amount,
    pub token_type: TokenTypeLabel,
    pub expected_sender: Option<String>,
    pub resource: Option<String>,
    pub method: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthMessage {
    pub action: String,
    pub nonce: String,
    pub expiry: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthInput {
    pub signature: String,
    pub message: AuthMessage,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayRequest {
    pub transaction: String,
    pub settle: SettleOptionsInput,
    #[serde(default)]
    pub auth: Option<AuthInput>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementView {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_height: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayResponse {
    pub success: bool,
    pub request_id: String,
    pub txid: String,
    pub explorer_url: String,
    pub settlement: SettlementView,
    pub sponsored_tx: String,
    pub receipt_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SponsorResponse {
    pub success: bool,
    pub request_id: String,
    pub txid: String,
    pub explorer_url: String,
    pub fee: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FacilitatorPaymentPayload {
    pub payload: FacilitatorTransactionPayload,
    #[serde(default)]
    pub extensions: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(default)]
    pub accepted: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FacilitatorTransactionPayload {
    pub transaction: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FacilitatorRequest {
    pub payment_payload: FacilitatorPaymentPayload,
    pub payment_requirements: SettleOptionsInput,
    #[serde(default)]
    pub x402_version: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub is_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invalid_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payer: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FacilitatorSettleResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payer: Option<String>,
    pub transaction: String,
    pub network: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessRequest {
    pub receipt_id: String,
    #[serde(default)]
    pub resource: Option<String>,
    #[serde(default)]
    pub target_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessResponse {
    pub granted: bool,
    pub receipt: crate::receipts::PaymentReceipt,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}
