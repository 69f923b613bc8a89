//! Unified error boundary.
//!
//! Every component exposes its own `thiserror` enum; this module converges
//! them all into [`ApiError`], the single type that implements
//! `IntoResponse`, mirroring how `FacilitatorLocalError` is the teacher's
//! sole `IntoResponse` boundary over per-scheme errors.

use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::chain::ChainClientError;
use crate::codec::CodecError;
use crate::dedup::DedupError;
use crate::fees::FeeError;
use crate::nonce::NonceError;
use crate::ratelimit::AuthError;
use crate::receipts::ReceiptError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("settlement verification failed: {0}")]
    SettlementVerificationFailed(String),

    #[error("authentication failure: {0}")]
    AuthFailure(String),

    #[error("rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimitExceeded { retry_after_secs: u64 },

    #[error("nonce conflict")]
    NonceConflict,

    #[error("identifier already used with a different payload")]
    IdentifierConflict,

    #[error("client identifier must be 16-128 chars of [A-Za-z0-9_-]")]
    InvalidClientIdentifier,

    #[error("settlement broadcast failed: {0}")]
    SettlementBroadcastFailed(String),

    #[error("settlement failed: {0}")]
    SettlementFailed(String),

    #[error("receipt not found")]
    ReceiptNotFound,

    #[error("receipt expired")]
    ReceiptExpired,

    #[error("receipt already consumed")]
    ReceiptConsumed,

    #[error("resource mismatch")]
    ResourceMismatch,

    #[error("chain unavailable: {0}")]
    ChainUnavailable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::InvalidRequest(_) => "INVALID_REQUEST",
            ApiError::SettlementVerificationFailed(_) => "SETTLEMENT_VERIFICATION_FAILED",
            ApiError::AuthFailure(_) => "AUTH_FAILURE",
            ApiError::RateLimitExceeded { .. } => "RATE_LIMIT_EXCEEDED",
            ApiError::NonceConflict => "NONCE_CONFLICT",
            ApiError::IdentifierConflict => "IDENTIFIER_CONFLICT",
            ApiError::InvalidClientIdentifier => "INVALID_CLIENT_IDENTIFIER",
            ApiError::SettlementBroadcastFailed(_) => "SETTLEMENT_BROADCAST_FAILED",
            ApiError::SettlementFailed(_) => "SETTLEMENT_FAILED",
            ApiError::ReceiptNotFound => "RECEIPT_NOT_FOUND",
            ApiError::ReceiptExpired => "RECEIPT_EXPIRED",
            ApiError::ReceiptConsumed => "RECEIPT_CONSUMED",
            ApiError::ResourceMismatch => "RESOURCE_MISMATCH",
            ApiError::ChainUnavailable(_) => "CHAIN_UNAVAILABLE",
            ApiError::Internal(_) => "INTERNAL",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::SettlementVerificationFailed(_) => StatusCode::BAD_REQUEST,
            ApiError::AuthFailure(_) => StatusCode::UNAUTHORIZED,
            ApiError::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::NonceConflict => StatusCode::CONFLICT,
            ApiError::IdentifierConflict => StatusCode::CONFLICT,
            ApiError::InvalidClientIdentifier => StatusCode::BAD_REQUEST,
            ApiError::SettlementBroadcastFailed(_) => StatusCode::BAD_GATEWAY,
            ApiError::SettlementFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::ReceiptNotFound | ApiError::ReceiptExpired => StatusCode::NOT_FOUND,
            ApiError::ReceiptConsumed => StatusCode::CONFLICT,
            ApiError::ResourceMismatch => StatusCode::BAD_REQUEST,
            ApiError::ChainUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn retryable(&self) -> bool {
        matches!(
            self,
            ApiError::RateLimitExceeded { .. }
                | ApiError::NonceConflict
                | ApiError::SettlementBroadcastFailed(_)
                | ApiError::ChainUnavailable(_)
                | ApiError::Internal(_)
        )
    }

    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            ApiError::RateLimitExceeded { retry_after_secs } => Some(*retry_after_secs),
            _ => None,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody<'a> {
    success: bool,
    request_id: String,
    error: String,
    code: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
    retryable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    retry_after: Option<u64>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let request_id = crate::util::new_request_id();
        let retry_after = self.retry_after_secs();
        let body = ErrorBody {
            success: false,
            request_id,
            error: self.to_string(),
            code: self.code(),
            details: None,
            retryable: self.retryable(),
            retry_after,
        };
        let mut response = (self.status_code(), Json(body)).into_response();
        if let Some(secs) = retry_after
            && let Ok(value) = HeaderValue::from_str(&secs.to_string())
        {
            response.headers_mut().insert(header::RETRY_AFTER, value);
        }
        response
    }
}

impl From<ChainClientError> for ApiError {
    fn from(error: ChainClientError) -> Self {
        match error {
            ChainClientError::Timeout | ChainClientError::Unavailable(_) => {
                ApiError::ChainUnavailable(error.to_string())
            }
            ChainClientError::Rejected { reason, error: msg } => {
                ApiError::SettlementBroadcastFailed(format!("{reason:?}: {msg}"))
            }
        }
    }
}

impl From<CodecError> for ApiError {
    fn from(error: CodecError) -> Self {
        ApiError::InvalidRequest(error.to_string())
    }
}

impl From<NonceError> for ApiError {
    fn from(error: NonceError) -> Self {
        match error {
            NonceError::ChainingLimitExceeded { mempool_depth } => ApiError::RateLimitExceeded {
                retry_after_secs: (mempool_depth as u64 / 2).max(1),
            },
            NonceError::ChainUnavailable(msg) => ApiError::ChainUnavailable(msg),
        }
    }
}

impl From<DedupError> for ApiError {
    fn from(_: DedupError) -> Self {
        ApiError::IdentifierConflict
    }
}

impl From<FeeError> for ApiError {
    fn from(error: FeeError) -> Self {
        ApiError::InvalidRequest(error.to_string())
    }
}

impl From<ReceiptError> for ApiError {
    fn from(error: ReceiptError) -> Self {
        match error {
            ReceiptError::NotFound => ApiError::ReceiptNotFound,
            ReceiptError::Expired => ApiError::ReceiptExpired,
            ReceiptError::Consumed => ApiError::ReceiptConsumed,
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::MissingKey | AuthError::InvalidKey | AuthError::Revoked => {
                ApiError::AuthFailure(error.to_string())
            }
            AuthError::DailyFeeCapExceeded | AuthError::QuotaExceeded => {
                ApiError::RateLimitExceeded {
                    retry_after_secs: 60,
                }
            }
        }
    }
}
