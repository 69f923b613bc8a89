//! Settlement Pipeline (C8): the request-scoped orchestration tying C1-C7
//! and C9 together behind the three public surfaces `relay`/`verify`/`settle`,
//! plus the supporting `verifyReceipt`/`access` operations.

pub mod types;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::instrument;

pub use types::SettlementState;
use types::{
    AccessRequest, AccessResponse, FacilitatorRequest, FacilitatorSettleResponse, RelayRequest,
    RelayResponse, SettleOptions, SettleOptionsInput, SettlementView, SponsorResponse,
    TokenTypeLabel, VerifyResponse,
};

use crate::amount::{Amount, AmountParseError};
use crate::apikeys::ApiKeyStore;
use crate::chain::{
    ChainClient, ChainClientError, FeeKind, RejectReason, TokenKind, TxStatus,
};
use crate::codec::{self, AuthMode, ExtractedPayment, ParsedTransaction};
use crate::config::ChainNetwork;
use crate::dedup::{self, DedupLookup, DedupStore};
use crate::error::ApiError;
use crate::fees::FeeEstimator;
use crate::nonce::{NonceCoordinator, NonceReservation};
use crate::ratelimit::OriginRateLimiter;
use crate::receipts::{PaymentReceipt, ReceiptStore, SettlementInfo, SettlementStatus};
use crate::stats::{ErrorCategory, StatsAggregator, TransactionRecord};
use crate::util::b64::Base64Bytes;
use crate::util::request_id::new_receipt_id;
use crate::wallet::SponsorWallet;

const POLL_INTERVAL: Duration = Duration::from_secs(2);
const POLL_BUDGET: Duration = Duration::from_secs(60);
const EXPLORER_BASE_URL_MAINNET: &str = "https://explorer.hiro.so";
const EXPLORER_BASE_URL_TESTNET: &str = "https://explorer.hiro.so/?chain=testnet";

pub struct SettlementPipeline {
    chain: Arc<dyn ChainClient>,
    nonce: NonceCoordinator,
    wallets: Vec<SponsorWallet>,
    network: ChainNetwork,
    fees: Arc<FeeEstimator>,
    receipts: Arc<ReceiptStore>,
    dedup: Arc<DedupStore>,
    stats: Arc<StatsAggregator>,
    rate_limiter: Arc<OriginRateLimiter>,
    api_keys: Arc<ApiKeyStore>,
}

impl SettlementPipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        chain: Arc<dyn ChainClient>,
        nonce: NonceCoordinator,
        wallets: Vec<SponsorWallet>,
        network: ChainNetwork,
        fees: Arc<FeeEstimator>,
        receipts: Arc<ReceiptStore>,
        dedup: Arc<DedupStore>,
        stats: Arc<StatsAggregator>,
        rate_limiter: Arc<OriginRateLimiter>,
        api_keys: Arc<ApiKeyStore>,
    ) -> Self {
        SettlementPipeline {
            chain,
            nonce,
            wallets,
            network,
            fees,
            receipts,
            dedup,
            stats,
            rate_limiter,
            api_keys,
        }
    }

    pub fn api_keys(&self) -> &ApiKeyStore {
        &self.api_keys
    }

    pub fn stats(&self) -> &StatsAggregator {
        &self.stats
    }

    pub fn receipts(&self) -> &ReceiptStore {
        &self.receipts
    }

    pub fn fees(&self) -> &FeeEstimator {
        &self.fees
    }

    pub fn nonce(&self) -> &NonceCoordinator {
        &self.nonce
    }

    fn addresses(&self) -> Vec<String> {
        self.wallets.iter().map(|w| w.address.clone()).collect()
    }

    pub fn wallet_count(&self) -> usize {
        self.wallets.len()
    }

    pub fn wallet_address(&self, wallet_index: usize) -> Option<String> {
        self.wallets.get(wallet_index).map(|w| w.address.clone())
    }

    pub fn network_name(&self) -> &'static str {
        self.network_label()
    }

    fn explorer_url(&self, txid: &str) -> String {
        let base = match self.network {
            ChainNetwork::Mainnet => EXPLORER_BASE_URL_MAINNET,
            ChainNetwork::Testnet => EXPLORER_BASE_URL_TESTNET,
        };
        format!("{base}/txid/{txid}")
    }

    fn network_label(&self) -> &'static str {
        match self.network {
            ChainNetwork::Mainnet => "mainnet",
            ChainNetwork::Testnet => "testnet",
        }
    }

    /// Best-effort classification of which fee schedule applies: a
    /// transaction carrying chain-specific payload bytes beyond the bare
    /// transfer framing is treated as a contract call, everything else as a
    /// plain token transfer. The chain's own mempool fee market is the
    /// authority; this only selects which of the three cached tiers to read.
    fn classify_fee_kind(parsed: &ParsedTransaction) -> FeeKind {
        if !parsed.trailing_payload.is_empty() {
            FeeKind::ContractCall
        } else {
            FeeKind::TokenTransfer
        }
    }

    fn validate_settle_options(input: &SettleOptionsInput) -> Result<SettleOptions, ApiError> {
        if input.expected_recipient.trim().is_empty() {
            return Err(ApiError::InvalidRequest(
                "expectedRecipient must be non-empty".to_string(),
            ));
        }
        let min_amount: Amount = input
            .min_amount
            .parse()
            .map_err(|e: AmountParseError| ApiError::InvalidRequest(format!("invalid minAmount: {e}")))?;
        Ok(SettleOptions {
            expected_recipient: input.expected_recipient.clone(),
            min_amount,
            token_type: input.token_type.unwrap_or(TokenTypeLabel::Native),
            expected_sender: input.expected_sender.clone(),
            resource: input.resource.clone(),
            method: input.method.clone(),
        })
    }

    fn verify_auth(auth: &types::AuthInput, expected_action: &str, now: DateTime<Utc>) -> Result<(), ApiError> {
        if auth.message.action != expected_action {
            return Err(ApiError::AuthFailure(format!(
                "auth action must be {expected_action:?}"
            )));
        }
        if auth.message.expiry <= now {
            return Err(ApiError::AuthFailure("auth signature expired".to_string()));
        }
        // Domain-bound signature verification is chain/wallet-specific and
        // out of this component's scope; we validate the envelope shape
        // (non-empty, well-formed base64) the way the codec's `sign` stands
        // in for real chain-specific signing.
        if auth.signature.trim().is_empty() || Base64Bytes::decode_str(&auth.signature).is_err() {
            return Err(ApiError::AuthFailure("malformed auth signature".to_string()));
        }
        Ok(())
    }

    fn decode_tx_bytes(transaction_b64: &str) -> Result<Vec<u8>, ApiError> {
        Base64Bytes::decode_str(transaction_b64)
            .map_err(|_| ApiError::InvalidRequest("transaction must be valid base64".to_string()))
    }

    fn verify_payment(payment: &ExtractedPayment, options: &SettleOptions) -> Result<(), ApiError> {
        if !options.token_type.matches(&payment.token_kind) {
            return Err(ApiError::SettlementVerificationFailed(
                "token type does not match requirements".to_string(),
            ));
        }
        if payment.recipient != options.expected_recipient {
            return Err(ApiError::SettlementVerificationFailed(
                "recipient does not match expectedRecipient".to_string(),
            ));
        }
        if payment.amount < options.min_amount {
            return Err(ApiError::SettlementVerificationFailed(
                "amount is below minAmount".to_string(),
            ));
        }
        if let Some(expected_sender) = &options.expected_sender
            && &payment.sender != expected_sender
        {
            return Err(ApiError::SettlementVerificationFailed(
                "sender does not match expectedSender".to_string(),
            ));
        }
        Ok(())
    }

    fn canonical_fingerprint<T: serde::Serialize>(value: &T) -> Result<String, ApiError> {
        let canonical =
            serde_json::to_value(value).map_err(|e| ApiError::Internal(e.to_string()))?;
        let bytes = serde_json::to_vec(&canonical).map_err(|e| ApiError::Internal(e.to_string()))?;
        Ok(dedup::payload_fingerprint(&bytes))
    }

    /// Polls `getTransaction` at a fixed interval until success/abort or the
    /// budget expires. `abort_*` is terminal failure; `dropped_*` (including
    /// `dropped_replace_by_fee`) is treated as transient and never stops the
    /// poll loop before the budget is spent.
    async fn poll_for_settlement(
        &self,
        txid: &str,
        payment: &ExtractedPayment,
        origin_address: &str,
    ) -> Result<SettlementInfo, ApiError> {
        let deadline = tokio::time::Instant::now() + POLL_BUDGET;
        loop {
            if let Ok(info) = self.chain.get_transaction(txid).await {
                if info.status == TxStatus::Success {
                    return Ok(SettlementInfo {
                        status: SettlementStatus::Confirmed,
                        sender: info.sender_address.or_else(|| Some(origin_address.to_string())),
                        recipient: Some(payment.recipient.clone()),
                        amount: Some(payment.amount),
                        block_height: info.block_height,
                    });
                }
                if info.status.is_abort() {
                    return Err(ApiError::SettlementFailed(format!(
                        "transaction aborted: {info:?}"
                    )));
                }
                // dropped_* (including dropped_replace_by_fee) and pending
                // both keep polling.
            }
            if tokio::time::Instant::now() >= deadline {
                return Ok(SettlementInfo {
                    status: SettlementStatus::Pending,
                    sender: Some(origin_address.to_string()),
                    recipient: Some(payment.recipient.clone()),
                    amount: Some(payment.amount),
                    block_height: None,
                });
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    fn settlement_view(settlement: &SettlementInfo) -> SettlementView {
        SettlementView {
            status: match settlement.status {
                SettlementStatus::Confirmed => "confirmed",
                SettlementStatus::Pending => "pending",
            },
            sender: settlement.sender.clone(),
            recipient: settlement.recipient.clone(),
            amount: settlement.amount.map(|a| a.to_string()),
            block_height: settlement.block_height,
        }
    }

    fn error_category(error: &ApiError) -> ErrorCategory {
        match error {
            ApiError::InvalidRequest(_) | ApiError::IdentifierConflict | ApiError::InvalidClientIdentifier => {
                ErrorCategory::Validation
            }
            ApiError::RateLimitExceeded { .. } | ApiError::NonceConflict => ErrorCategory::RateLimit,
            ApiError::AuthFailure(_) => ErrorCategory::Validation,
            ApiError::SettlementVerificationFailed(_)
            | ApiError::SettlementBroadcastFailed(_)
            | ApiError::SettlementFailed(_) => ErrorCategory::Settlement,
            ApiError::ReceiptNotFound
            | ApiError::ReceiptExpired
            | ApiError::ReceiptConsumed
            | ApiError::ResourceMismatch => ErrorCategory::Validation,
            ApiError::ChainUnavailable(_) => ErrorCategory::Sponsoring,
            ApiError::Internal(_) => ErrorCategory::Internal,
        }
    }

    /// `relay(txBytes, settleOptions, optionalAuth)` — sponsors, verifies
    /// payment intent, broadcasts, and issues a receipt.
    #[instrument(skip(self, request), fields(resource = ?request.settle.resource))]
    pub async fn relay(&self, request: RelayRequest) -> Result<RelayResponse, ApiError> {
        let options = Self::validate_settle_options(&request.settle)?;
        let now = Utc::now();
        if let Some(auth) = &request.auth {
            Self::verify_auth(auth, "relay", now)?;
        }

        let tx_bytes = Self::decode_tx_bytes(&request.transaction)?;
        let parsed = codec::parse(&tx_bytes)?;
        codec::require_sponsor_pending(&parsed)?;

        self.rate_limiter
            .check_and_record(&parsed.origin_address)
            .map_err(|e| ApiError::RateLimitExceeded {
                retry_after_secs: e.retry_after_secs,
            })?;

        let fingerprint = Self::canonical_fingerprint(&request)?;
        if let DedupLookup::Hit(cached) = self.dedup.lookup_by_hash(&fingerprint) {
            return serde_json::from_value(cached).map_err(|e| ApiError::Internal(e.to_string()));
        }

        let fee_kind = Self::classify_fee_kind(&parsed);
        let fee = self.fees.medium_fee_for(fee_kind).await;

        let (nonce, wallet_index) = self
            .nonce
            .assign_nonce(self.wallets.len(), self.addresses())
            .await?;
        let reservation = NonceReservation::new(self.nonce.clone(), nonce, wallet_index);
        let wallet = &self.wallets[wallet_index];

        let (signed_bytes, txid) = codec::sign(&parsed, &wallet.address, &wallet.private_key, nonce, fee);

        let signed_parsed = match codec::parse(&signed_bytes) {
            Ok(p) => p,
            Err(e) => {
                reservation.release(None, None).await;
                self.stats.record_error(ErrorCategory::Settlement);
                return Err(e.into());
            }
        };
        let payment = match codec::extract_payment(&signed_parsed, &options.expected_recipient) {
            Ok(p) => p,
            Err(e) => {
                reservation.release(None, None).await;
                self.stats.record_error(ErrorCategory::Settlement);
                return Err(e.into());
            }
        };
        if let Err(e) = Self::verify_payment(&payment, &options) {
            reservation.release(None, None).await;
            self.stats.record_error(ErrorCategory::Settlement);
            return Err(e);
        }

        let accepted = match self.chain.broadcast(&signed_bytes).await {
            Ok(accepted) => accepted,
            Err(ChainClientError::Rejected {
                reason: RejectReason::ConflictingNonceInMempool,
                ..
            }) => {
                reservation.release(Some(txid.clone()), None).await;
                self.stats.record_error(ErrorCategory::RateLimit);
                return Err(ApiError::NonceConflict);
            }
            Err(e) => {
                reservation.release(None, None).await;
                self.stats.record_error(ErrorCategory::Settlement);
                return Err(e.into());
            }
        };

        let settlement = match self
            .poll_for_settlement(&accepted.txid, &payment, &parsed.origin_address)
            .await
        {
            Ok(s) => s,
            Err(e) => {
                reservation
                    .release(Some(accepted.txid.clone()), Some(Amount::from(fee)))
                    .await;
                self.stats.record_error(Self::error_category(&e));
                return Err(e);
            }
        };
        reservation
            .release(Some(accepted.txid.clone()), Some(Amount::from(fee)))
            .await;

        let receipt_id = new_receipt_id();
        let receipt = PaymentReceipt::new(
            receipt_id.clone(),
            parsed.origin_address.clone(),
            signed_bytes.to_vec(),
            Amount::from(fee),
            accepted.txid.clone(),
            settlement.clone(),
            options.resource.clone(),
        );
        self.receipts.put(receipt);

        self.stats.record_transaction(TransactionRecord {
            endpoint: "relay".to_string(),
            success: true,
            client_error: false,
            token_label: token_kind_label(&payment.token_kind),
            amount: payment.amount,
            fee: Some(Amount::from(fee)),
            txid: Some(accepted.txid.clone()),
            sender: Some(parsed.origin_address.clone()),
            recipient: Some(payment.recipient.clone()),
            status: Some(match settlement.status {
                SettlementStatus::Confirmed => "confirmed".to_string(),
                SettlementStatus::Pending => "pending".to_string(),
            }),
            block_height: settlement.block_height,
        });

        let response = RelayResponse {
            success: true,
            request_id: crate::util::new_request_id(),
            txid: accepted.txid.clone(),
            explorer_url: self.explorer_url(&accepted.txid),
            settlement: Self::settlement_view(&settlement),
            sponsored_tx: Base64Bytes::encode_string(&signed_bytes),
            receipt_id,
        };

        if let Ok(value) = serde_json::to_value(&response) {
            self.dedup.record_by_hash(fingerprint, value);
        }

        Ok(response)
    }

    /// `verify(txBytes, paymentRequirements)` — local-only, no broadcast.
    #[instrument(skip(self, transaction_b64, requirements))]
    pub async fn verify(
        &self,
        transaction_b64: &str,
        requirements: &SettleOptionsInput,
    ) -> Result<VerifyResponse, ApiError> {
        let options = Self::validate_settle_options(requirements)?;
        let tx_bytes = Self::decode_tx_bytes(transaction_b64)?;
        let parsed = codec::parse(&tx_bytes)?;

        let payment = match codec::extract_payment(&parsed, &options.expected_recipient) {
            Ok(p) => p,
            Err(e) => {
                return Ok(VerifyResponse {
                    is_valid: false,
                    invalid_reason: Some(e.to_string()),
                    payer: Some(parsed.origin_address),
                });
            }
        };

        match Self::verify_payment(&payment, &options) {
            Ok(()) => Ok(VerifyResponse {
                is_valid: true,
                invalid_reason: None,
                payer: Some(parsed.origin_address),
            }),
            Err(e) => Ok(VerifyResponse {
                is_valid: false,
                invalid_reason: Some(e.to_string()),
                payer: Some(parsed.origin_address),
            }),
        }
    }

    async fn settle_inner(
        &self,
        parsed: &ParsedTransaction,
        tx_bytes: &[u8],
        options: &SettleOptions,
    ) -> Result<(String, SettlementInfo, ExtractedPayment), ApiError> {
        let payment = codec::extract_payment(parsed, &options.expected_recipient)?;
        Self::verify_payment(&payment, options)?;
        let accepted = self.chain.broadcast(tx_bytes).await?;
        let settlement = self
            .poll_for_settlement(&accepted.txid, &payment, &parsed.origin_address)
            .await?;
        Ok((accepted.txid, settlement, payment))
    }

    /// `settle(txBytes, paymentRequirements, extensions?)` — same as
    /// `relay` except the caller already provides a sponsor-signed
    /// transaction (reserve/sign are skipped). Settlement-domain outcomes
    /// (verification failure, broadcast rejection, abort) are reported as
    /// `success:false` in a 200 response; only schema malformation and a
    /// conflicting `paymentIdentifier` surface as HTTP errors.
    #[instrument(skip(self, request))]
    pub async fn settle(&self, request: FacilitatorRequest) -> Result<FacilitatorSettleResponse, ApiError> {
        let options = Self::validate_settle_options(&request.payment_requirements)?;
        let tx_bytes = Self::decode_tx_bytes(&request.payment_payload.payload.transaction)?;
        let parsed = codec::parse(&tx_bytes)?;
        if parsed.auth_mode != AuthMode::SponsorSigned {
            return Err(ApiError::InvalidRequest(
                "transaction must already be sponsor-signed".to_string(),
            ));
        }

        let payment_identifier = request
            .payment_payload
            .extensions
            .as_ref()
            .and_then(|ext| ext.get("paymentIdentifier"))
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());
        if let Some(id) = &payment_identifier
            && !dedup::is_valid_client_identifier(id)
        {
            return Err(ApiError::InvalidClientIdentifier);
        }

        let fingerprint = Self::canonical_fingerprint(&request)?;

        if let Some(id) = &payment_identifier {
            match self.dedup.lookup_by_client_id(id, &fingerprint) {
                Ok(DedupLookup::Hit(cached)) => {
                    return serde_json::from_value(cached).map_err(|e| ApiError::Internal(e.to_string()));
                }
                Ok(DedupLookup::Miss) => {}
                Err(e) => return Err(e.into()),
            }
        } else if let DedupLookup::Hit(cached) = self.dedup.lookup_by_hash(&fingerprint) {
            return serde_json::from_value(cached).map_err(|e| ApiError::Internal(e.to_string()));
        }

        let result = self.settle_inner(&parsed, &tx_bytes, &options).await;
        let response = match &result {
            Ok((txid, settlement, payment)) => {
                let receipt_id = new_receipt_id();
                let receipt = PaymentReceipt::new(
                    receipt_id,
                    parsed.origin_address.clone(),
                    tx_bytes.clone(),
                    Amount::from(parsed.fee_field),
                    txid.clone(),
                    settlement.clone(),
                    options.resource.clone(),
                );
                self.receipts.put(receipt);
                self.stats.record_transaction(TransactionRecord {
                    endpoint: "settle".to_string(),
                    success: true,
                    client_error: false,
                    token_label: token_kind_label(&payment.token_kind),
                    amount: payment.amount,
                    fee: Some(Amount::from(parsed.fee_field)),
                    txid: Some(txid.clone()),
                    sender: Some(parsed.origin_address.clone()),
                    recipient: settlement.recipient.clone(),
                    status: Some(match settlement.status {
                        SettlementStatus::Confirmed => "confirmed".to_string(),
                        SettlementStatus::Pending => "pending".to_string(),
                    }),
                    block_height: settlement.block_height,
                });
                FacilitatorSettleResponse {
                    success: true,
                    payer: Some(parsed.origin_address.clone()),
                    transaction: txid.clone(),
                    network: self.network_label().to_string(),
                }
            }
            Err(e) => {
                self.stats.record_error(Self::error_category(e));
                FacilitatorSettleResponse {
                    success: false,
                    payer: Some(parsed.origin_address.clone()),
                    transaction: String::new(),
                    network: self.network_label().to_string(),
                }
            }
        };

        if let Ok(value) = serde_json::to_value(&response) {
            if let Some(id) = payment_identifier {
                self.dedup.record_by_client_id(id, fingerprint, value);
            } else {
                self.dedup.record_by_hash(fingerprint, value);
            }
        }

        Ok(response)
    }

    /// `/sponsor` — fills and signs the fee-payer slot without verifying
    /// payment intent, per the explicit Open Question decision that this
    /// endpoint preserves the source's behavior of not checking intent.
    #[instrument(skip(self, transaction_b64))]
    pub async fn sponsor(&self, transaction_b64: &str) -> Result<SponsorResponse, ApiError> {
        let tx_bytes = Self::decode_tx_bytes(transaction_b64)?;
        let parsed = codec::parse(&tx_bytes)?;
        codec::require_sponsor_pending(&parsed)?;

        let fee_kind = Self::classify_fee_kind(&parsed);
        let fee = self.fees.medium_fee_for(fee_kind).await;

        let (nonce, wallet_index) = self
            .nonce
            .assign_nonce(self.wallets.len(), self.addresses())
            .await?;
        let reservation = NonceReservation::new(self.nonce.clone(), nonce, wallet_index);
        let wallet = &self.wallets[wallet_index];
        let (signed_bytes, txid) = codec::sign(&parsed, &wallet.address, &wallet.private_key, nonce, fee);

        let accepted = match self.chain.broadcast(&signed_bytes).await {
            Ok(accepted) => accepted,
            Err(ChainClientError::Rejected {
                reason: RejectReason::ConflictingNonceInMempool,
                ..
            }) => {
                reservation.release(Some(txid.clone()), None).await;
                return Err(ApiError::NonceConflict);
            }
            Err(e) => {
                reservation.release(None, None).await;
                return Err(e.into());
            }
        };
        reservation
            .release(Some(accepted.txid.clone()), Some(Amount::from(fee)))
            .await;

        Ok(SponsorResponse {
            success: true,
            request_id: crate::util::new_request_id(),
            txid: accepted.txid.clone(),
            explorer_url: self.explorer_url(&accepted.txid),
            fee: Amount::from(fee).to_string(),
        })
    }

    pub fn verify_receipt(&self, receipt_id: &str) -> Result<PaymentReceipt, ApiError> {
        Ok(self.receipts.get(receipt_id)?)
    }

    /// `access(receiptId, resource?, targetUrl?)` — C5 lookup, optional
    /// resource match, optional best-effort forward to `targetUrl`
    /// (HTTPS only), increments `accessCount`.
    #[instrument(skip(self))]
    pub async fn access(&self, request: AccessRequest) -> Result<AccessResponse, ApiError> {
        let receipt = self.receipts.get(&request.receipt_id)?;
        if receipt.consumed {
            return Err(ApiError::ReceiptConsumed);
        }
        if let Some(resource) = &request.resource
            && receipt.settle_options_resource.as_deref() != Some(resource.as_str())
        {
            return Err(ApiError::ResourceMismatch);
        }

        let data = match &request.target_url {
            Some(target_url) => {
                let parsed_url = url::Url::parse(target_url)
                    .map_err(|_| ApiError::InvalidRequest("invalid targetUrl".to_string()))?;
                if parsed_url.scheme() != "https" {
                    return Err(ApiError::InvalidRequest("targetUrl must be HTTPS".to_string()));
                }
                self.forward_to_target(&parsed_url).await
            }
            None => None,
        };

        let updated = self.receipts.mark_consumed(&request.receipt_id, false)?;
        Ok(AccessResponse {
            granted: true,
            receipt: updated,
            data,
        })
    }

    async fn forward_to_target(&self, url: &url::Url) -> Option<serde_json::Value> {
        let client = reqwest::Client::new();
        let response = client.get(url.clone()).send().await.ok()?;
        response.json::<serde_json::Value>().await.ok()
    }
}

fn token_kind_label(kind: &TokenKind) -> String {
    match kind {
        TokenKind::Native => "native".to_string(),
        TokenKind::Ft(asset_id) => asset_id.clone(),
    }
}
