//! Chain Client (C1): fetch nonce info, transaction status, broadcast
//! signed bytes, fetch fee estimates.

pub mod client;
pub mod fake;
pub mod types;

pub use client::{ChainClient, ChainClientError, HttpChainClient};
pub use types::*;

use serde::Deserialize;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTxStatusResponse {
    tx_status: String,
    sender_address: Option<String>,
    block_height: Option<u64>,
    #[serde(default)]
    events: Vec<RawEvent>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEvent {
    asset_id: Option<String>,
    amount: String,
    recipient: String,
    sender: String,
}

#[derive(Deserialize)]
struct RawBroadcastError {
    reason: Option<String>,
    error: String,
}

pub(crate) async fn decode_transaction_status(
    response: reqwest::Response,
) -> Result<TransactionStatusInfo, ChainClientError> {
    let raw: RawTxStatusResponse = response
        .json()
        .await
        .map_err(|e| ChainClientError::Unavailable(e.to_string()))?;
    let events = raw
        .events
        .into_iter()
        .filter_map(|e| {
            let amount = e.amount.parse().ok()?;
            let token_kind = match e.asset_id {
                Some(asset_id) => TokenKind::Ft(asset_id),
                None => TokenKind::Native,
            };
            Some(TransferEvent {
                token_kind,
                amount,
                recipient: e.recipient,
                sender: e.sender,
            })
        })
        .collect();
    Ok(TransactionStatusInfo {
        status: TxStatus::from(raw.tx_status.as_str()),
        sender_address: raw.sender_address,
        block_height: raw.block_height,
        events,
    })
}

pub(crate) async fn decode_broadcast_response(
    response: reqwest::Response,
) -> Result<BroadcastAccepted, ChainClientError> {
    if response.status().is_success() {
        let txid = response
            .text()
            .await
            .map_err(|e| ChainClientError::Unavailable(e.to_string()))?
            .trim_matches('"')
            .to_string();
        return Ok(BroadcastAccepted { txid });
    }
    let raw: RawBroadcastError = response
        .json()
        .await
        .map_err(|e| ChainClientError::Unavailable(e.to_string()))?;
    let reason = match raw.reason.as_deref() {
        Some("ConflictingNonceInMempool") => RejectReason::ConflictingNonceInMempool,
        _ => RejectReason::Other(raw.reason.unwrap_or_default()),
    };
    Err(ChainClientError::Rejected {
        reason,
        error: raw.error,
    })
}
