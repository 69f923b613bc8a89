//! Thin async client for the external chain API (C1).
//!
//! Grounded on the teacher's typed-provider pattern (inherent async methods,
//! `#[instrument(skip_all, err)]`, explicit timeouts) but backed by `reqwest`
//! JSON calls rather than a typed RPC SDK, since no Stacks-like SDK exists in
//! this corpus the way `alloy`/`solana-sdk` do for EVM/Solana.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::instrument;

use super::types::{
    BroadcastAccepted, FeeEstimates, NonceInfo, RejectReason, TransactionStatusInfo,
};

const READ_TIMEOUT: Duration = Duration::from_secs(5);
const BROADCAST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum ChainClientError {
    #[error("chain API timed out")]
    Timeout,
    #[error("chain API unavailable: {0}")]
    Unavailable(String),
    #[error("broadcast rejected ({reason:?}): {error}")]
    Rejected { reason: RejectReason, error: String },
}

/// Abstraction over the chain API so the settlement pipeline and nonce
/// coordinator can be exercised against a fake in tests.
#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn get_nonce_info(&self, address: &str) -> Result<NonceInfo, ChainClientError>;

    async fn get_transaction(
        &self,
        txid: &str,
    ) -> Result<TransactionStatusInfo, ChainClientError>;

    async fn broadcast(&self, bytes: &[u8]) -> Result<BroadcastAccepted, ChainClientError>;

    async fn get_fee_estimates(&self) -> Result<FeeEstimates, ChainClientError>;
}

pub struct HttpChainClient {
    base_url: String,
    api_key: Option<String>,
    http: reqwest::Client,
}

impl HttpChainClient {
    pub fn new(base_url: String, api_key: Option<String>) -> Self {
        HttpChainClient {
            base_url,
            api_key,
            http: reqwest::Client::new(),
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let mut builder = self.http.request(method, url);
        if let Some(key) = &self.api_key {
            builder = builder.header("X-API-Key", key);
        }
        builder
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawNonceInfo {
    last_executed_nonce: Option<u64>,
    possible_next_nonce: u64,
    #[serde(default)]
    detected_missing_nonces: Vec<u64>,
}

#[async_trait]
impl ChainClient for HttpChainClient {
    #[instrument(skip(self), err)]
    async fn get_nonce_info(&self, address: &str) -> Result<NonceInfo, ChainClientError> {
        let path = format!("/extended/v1/address/{address}/nonces");
        let response = tokio::time::timeout(READ_TIMEOUT, self.request(reqwest::Method::GET, &path).send())
            .await
            .map_err(|_| ChainClientError::Timeout)?
            .map_err(|e| ChainClientError::Unavailable(e.to_string()))?;
        let raw: RawNonceInfo = response
            .json()
            .await
            .map_err(|e| ChainClientError::Unavailable(e.to_string()))?;
        Ok(NonceInfo {
            last_executed_nonce: raw.last_executed_nonce,
            possible_next_nonce: raw.possible_next_nonce,
            detected_missing_nonces: raw.detected_missing_nonces,
        })
    }

    #[instrument(skip(self), err)]
    async fn get_transaction(
        &self,
        txid: &str,
    ) -> Result<TransactionStatusInfo, ChainClientError> {
        let path = format!("/extended/v1/tx/{txid}");
        let response = tokio::time::timeout(READ_TIMEOUT, self.request(reqwest::Method::GET, &path).send())
            .await
            .map_err(|_| ChainClientError::Timeout)?
            .map_err(|e| ChainClientError::Unavailable(e.to_string()))?;
        super::decode_transaction_status(response).await
    }

    #[instrument(skip(self, bytes), err)]
    async fn broadcast(&self, bytes: &[u8]) -> Result<BroadcastAccepted, ChainClientError> {
        let body = bytes.to_vec();
        let response = tokio::time::timeout(
            BROADCAST_TIMEOUT,
            self.request(reqwest::Method::POST, "/v2/transactions")
                .header("Content-Type", "application/octet-stream")
                .body(body)
                .send(),
        )
        .await
        .map_err(|_| ChainClientError::Timeout)?
        .map_err(|e| ChainClientError::Unavailable(e.to_string()))?;

        super::decode_broadcast_response(response).await
    }

    #[instrument(skip(self), err)]
    async fn get_fee_estimates(&self) -> Result<FeeEstimates, ChainClientError> {
        let response = tokio::time::timeout(
            READ_TIMEOUT,
            self.request(reqwest::Method::GET, "/extended/v1/fee_rate").send(),
        )
        .await
        .map_err(|_| ChainClientError::Timeout)?
        .map_err(|e| ChainClientError::Unavailable(e.to_string()))?;
        response
            .json()
            .await
            .map_err(|e| ChainClientError::Unavailable(e.to_string()))
    }
}
