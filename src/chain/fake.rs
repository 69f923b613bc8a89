//! In-memory [`ChainClient`] double for tests — scripted nonce info,
//! transaction status sequences, and broadcast outcomes.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use dashmap::DashMap;

use super::client::{ChainClient, ChainClientError};
use super::types::{
    BroadcastAccepted, FeeEstimates, FeeTiers, NonceInfo, RejectReason, TransactionStatusInfo,
    TxStatus,
};

pub struct FakeChainClient {
    nonce_info: DashMap<String, NonceInfo>,
    /// Queue of statuses returned for a given txid, one per call; the last
    /// entry repeats once the queue is drained.
    tx_status_sequence: DashMap<String, Mutex<VecDeque<TransactionStatusInfo>>>,
    broadcast_outcomes: Mutex<VecDeque<Result<BroadcastAccepted, ChainClientError>>>,
    default_broadcast_txid_prefix: String,
    pub broadcast_count: std::sync::atomic::AtomicU64,
}

impl FakeChainClient {
    pub fn new() -> Self {
        FakeChainClient {
            nonce_info: DashMap::new(),
            tx_status_sequence: DashMap::new(),
            broadcast_outcomes: Mutex::new(VecDeque::new()),
            default_broadcast_txid_prefix: "0xfaketx".to_string(),
            broadcast_count: std::sync::atomic::AtomicU64::new(0),
        }
    }

    pub fn seed_nonce_info(&self, address: &str, info: NonceInfo) {
        self.nonce_info.insert(address.to_string(), info);
    }

    pub fn seed_tx_status_sequence(&self, txid: &str, statuses: Vec<TransactionStatusInfo>) {
        self.tx_status_sequence
            .insert(txid.to_string(), Mutex::new(VecDeque::from(statuses)));
    }

    pub fn push_broadcast_outcome(&self, outcome: Result<BroadcastAccepted, ChainClientError>) {
        self.broadcast_outcomes.lock().unwrap().push_back(outcome);
    }
}

impl Default for FakeChainClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChainClient for FakeChainClient {
    async fn get_nonce_info(&self, address: &str) -> Result<NonceInfo, ChainClientError> {
        Ok(self
            .nonce_info
            .get(address)
            .map(|r| r.clone())
            .unwrap_or(NonceInfo {
                last_executed_nonce: None,
                possible_next_nonce: 0,
                detected_missing_nonces: vec![],
            }))
    }

    async fn get_transaction(
        &self,
        txid: &str,
    ) -> Result<TransactionStatusInfo, ChainClientError> {
        if let Some(entry) = self.tx_status_sequence.get(txid) {
            let mut queue = entry.lock().unwrap();
            if queue.len() > 1 {
                return Ok(queue.pop_front().unwrap());
            }
            if let Some(last) = queue.front() {
                return Ok(last.clone());
            }
        }
        Ok(TransactionStatusInfo {
            status: TxStatus::Unknown,
            sender_address: None,
            block_height: None,
            events: vec![],
        })
    }

    async fn broadcast(&self, _bytes: &[u8]) -> Result<BroadcastAccepted, ChainClientError> {
        self.broadcast_count
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if let Some(outcome) = self.broadcast_outcomes.lock().unwrap().pop_front() {
            return outcome;
        }
        let n = self
            .broadcast_count
            .load(std::sync::atomic::Ordering::SeqCst);
        Ok(BroadcastAccepted {
            txid: format!("{}{n}", self.default_broadcast_txid_prefix),
        })
    }

    async fn get_fee_estimates(&self) -> Result<FeeEstimates, ChainClientError> {
        let tiers = FeeTiers {
            low: 1_000,
            medium: 2_000,
            high: 5_000,
        };
        Ok(FeeEstimates {
            token_transfer: tiers,
            contract_call: tiers,
            smart_contract: tiers,
        })
    }
}
