//! The coordinator modeled as an actor: a dedicated task owning every
//! mutable nonce structure, reachable only via an mpsc request channel.
//! Per the design note "Coordinator as actor", this upholds the
//! single-logical-critical-section requirement of §4.3 without a mutex —
//! every mutating operation is a message processed one at a time by
//! [`run_actor`].

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

use crate::amount::Amount;
use crate::chain::ChainClient;

use super::pool::{CHAINING_LIMIT, POOL_SEED_SIZE, ReservationPool};

pub const STALE_THRESHOLD_SECS: i64 = 600;
pub const GAP_FILL_AMOUNT: u64 = 1;
pub const GAP_FILL_FEE: u64 = 30_000;
pub const MAX_GAP_FILLS_PER_CYCLE: usize = 5;
pub const MAX_WALLET_COUNT: usize = 10;

#[derive(Debug, thiserror::Error, Clone)]
pub enum NonceError {
    #[error("chaining limit exceeded across all wallets, mempool depth {mempool_depth}")]
    ChainingLimitExceeded { mempool_depth: usize },
    #[error("chain unavailable: {0}")]
    ChainUnavailable(String),
}

#[derive(Debug, Default, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerWalletFeeStats {
    pub total_fees_spent: Amount,
    pub tx_count: u64,
    pub fees_today: Amount,
    pub tx_count_today: u64,
    pub today: Option<chrono::NaiveDate>,
}

impl PerWalletFeeStats {
    fn roll_if_new_day(&mut self, today: chrono::NaiveDate) {
        if self.today != Some(today) {
            self.today = Some(today);
            self.fees_today = Amount::ZERO;
            self.tx_count_today = 0;
        }
    }

    fn record_fee(&mut self, fee: Amount, today: chrono::NaiveDate) {
        self.roll_if_new_day(today);
        self.total_fees_spent = self.total_fees_spent.checked_add(fee).unwrap_or(self.total_fees_spent);
        self.tx_count += 1;
        self.fees_today = self.fees_today.checked_add(fee).unwrap_or(self.fees_today);
        self.tx_count_today += 1;
    }
}

#[derive(Debug, Default, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoordinatorCounters {
    pub total_assigned: u64,
    pub conflicts_detected: u64,
    pub gaps_recovered: u64,
    pub gaps_filled: u64,
    pub last_hiro_sync: Option<DateTime<Utc>>,
    pub last_gap_detected: Option<DateTime<Utc>>,
}

struct WalletSlot {
    pool: Option<ReservationPool>,
    last_observed_address: Option<String>,
    last_assigned_at: Option<DateTime<Utc>>,
}

impl WalletSlot {
    fn empty() -> Self {
        WalletSlot {
            pool: None,
            last_observed_address: None,
            last_assigned_at: None,
        }
    }
}

struct TxidEntry {
    nonce: u64,
    wallet_index: usize,
    recorded_at: DateTime<Utc>,
}

pub struct NonceActorState {
    wallets: Vec<WalletSlot>,
    next_wallet_index: usize,
    counters: CoordinatorCounters,
    fee_stats: Vec<PerWalletFeeStats>,
    txid_to_nonce: HashMap<String, TxidEntry>,
    chain: Arc<dyn ChainClient>,
}

impl NonceActorState {
    pub fn new(wallet_count: usize, chain: Arc<dyn ChainClient>) -> Self {
        NonceActorState {
            wallets: (0..wallet_count).map(|_| WalletSlot::empty()).collect(),
            next_wallet_index: 0,
            counters: CoordinatorCounters::default(),
            fee_stats: vec![PerWalletFeeStats::default(); wallet_count],
            txid_to_nonce: HashMap::new(),
            chain,
        }
    }

    async fn ensure_pool(
        &mut self,
        wallet_index: usize,
        address: &str,
    ) -> Result<(), NonceError> {
        let address_changed = self.wallets[wallet_index]
            .last_observed_address
            .as_deref()
            .is_some_and(|a| a != address);
        if address_changed {
            warn!(wallet_index, "sponsor address changed, discarding pool");
            self.wallets[wallet_index].pool = None;
        }
        if self.wallets[wallet_index].pool.is_none() {
            let info = self
                .chain
                .get_nonce_info(address)
                .await
                .map_err(|e| NonceError::ChainUnavailable(e.to_string()))?;
            self.wallets[wallet_index].pool = Some(ReservationPool::seed(info.possible_next_nonce));
            self.wallets[wallet_index].last_observed_address = Some(address.to_string());
        }
        Ok(())
    }

    pub async fn assign_nonce(
        &mut self,
        wallet_count: usize,
        addresses: &[String],
    ) -> Result<(u64, usize), NonceError> {
        let wallet_count = wallet_count.min(self.wallets.len()).min(addresses.len());
        let mut mempool_depth = 0usize;
        let now = Utc::now();
        for step in 0..wallet_count {
            let wallet_index = (self.next_wallet_index + step) % wallet_count;
            self.ensure_pool(wallet_index, &addresses[wallet_index]).await?;
            let pool = self.wallets[wallet_index].pool.as_mut().unwrap();
            if pool.reserved_count() >= CHAINING_LIMIT {
                mempool_depth += pool.reserved_count();
                continue;
            }
            let nonce = pool.assign(now).expect("checked capacity above");
            self.wallets[wallet_index].last_assigned_at = Some(now);
            self.next_wallet_index = (wallet_index + 1) % wallet_count;
            self.counters.total_assigned += 1;
            info!(nonce, wallet_index, "assigned nonce");
            return Ok((nonce, wallet_index));
        }
        Err(NonceError::ChainingLimitExceeded { mempool_depth })
    }

    pub fn release_nonce(
        &mut self,
        nonce: u64,
        wallet_index: usize,
        txid: Option<String>,
        fee: Option<Amount>,
    ) {
        let Some(pool) = self
            .wallets
            .get_mut(wallet_index)
            .and_then(|w| w.pool.as_mut())
        else {
            return;
        };
        let consumed = txid.is_some();
        pool.release(nonce, consumed);
        if let (Some(txid), Some(fee)) = (&txid, fee) {
            let today = Utc::now().date_naive();
            self.fee_stats[wallet_index].record_fee(fee, today);
            self.record_txid(txid.clone(), nonce, wallet_index);
        } else if let Some(txid) = txid {
            self.record_txid(txid, nonce, wallet_index);
        }
    }

    fn record_txid(&mut self, txid: String, nonce: u64, wallet_index: usize) {
        if let Some(pool) = self.wallets[wallet_index].pool.as_mut() {
            pool.record_txid_for_nonce(nonce);
        }
        self.txid_to_nonce.insert(
            txid,
            TxidEntry {
                nonce,
                wallet_index,
                recorded_at: Utc::now(),
            },
        );
        self.prune_txid_table();
    }

    fn prune_txid_table(&mut self) {
        let cutoff = Utc::now() - chrono::Duration::hours(24);
        self.txid_to_nonce.retain(|_, entry| entry.recorded_at > cutoff);
    }

    pub fn lookup_nonce_for_txid(&self, txid: &str) -> Option<(u64, usize)> {
        self.txid_to_nonce.get(txid).map(|e| (e.nonce, e.wallet_index))
    }

    pub fn clean_stale_reservations(&mut self, wallet_index: usize) -> Vec<u64> {
        let now = Utc::now();
        let threshold = chrono::Duration::seconds(STALE_THRESHOLD_SECS);
        if let Some(pool) = self.wallets[wallet_index].pool.as_mut() {
            pool.clean_stale(now, threshold)
        } else {
            vec![]
        }
    }

    /// Forces a fresh seed of `wallet_index`'s pool from the chain's
    /// current `possibleNextNonce`, discarding all unreserved availability.
    /// Returns `(previous_head, new_head)` for the `/nonce/reset` response.
    pub async fn reset_wallet(
        &mut self,
        wallet_index: usize,
        address: &str,
    ) -> Result<(Option<u64>, u64), NonceError> {
        let previous_head = self.wallets[wallet_index]
            .pool
            .as_ref()
            .and_then(|p| p.head());
        let info = self
            .chain
            .get_nonce_info(address)
            .await
            .map_err(|e| NonceError::ChainUnavailable(e.to_string()))?;
        self.wallets[wallet_index].pool = Some(ReservationPool::seed(info.possible_next_nonce));
        self.wallets[wallet_index].last_observed_address = Some(address.to_string());
        Ok((previous_head, info.possible_next_nonce))
    }

    pub fn fee_stats(&self, wallet_index: usize) -> Option<PerWalletFeeStats> {
        self.fee_stats.get(wallet_index).cloned()
    }

    pub fn counters(&self) -> CoordinatorCounters {
        self.counters.clone()
    }

    pub fn pool_snapshot(&self, wallet_index: usize) -> Option<(Vec<u64>, Vec<u64>)> {
        self.wallets
            .get(wallet_index)?
            .pool
            .as_ref()
            .map(|p| (p.available_snapshot(), p.reserved_snapshot()))
    }

    /// Runs one reconciliation pass for `wallet_index`. Deliberately holds
    /// the actor loop (and therefore every other mutating op) for the
    /// duration of the chain-API round trip and any gap-fill broadcasts —
    /// §5 states reconciliation "may hold it across chain-API calls" and
    /// that `assignNonce` latency floors at the round trip during these
    /// windows, so this isn't split across messages.
    pub async fn reconcile_wallet(&mut self, wallet_index: usize, address: &str) {
        let info = match self.chain.get_nonce_info(address).await {
            Ok(info) => info,
            Err(e) => {
                warn!(wallet_index, error = %e, "reconciliation skipped: chain unavailable");
                return;
            }
        };
        self.counters.last_hiro_sync = Some(Utc::now());

        if self.wallets[wallet_index].pool.is_none() {
            self.wallets[wallet_index].pool = Some(ReservationPool::seed(info.possible_next_nonce));
            self.wallets[wallet_index].last_observed_address = Some(address.to_string());
        }
        let reserved_count = self.wallets[wallet_index]
            .pool
            .as_ref()
            .map(|p| p.reserved_count())
            .unwrap_or(0);
        let pool_head = self.wallets[wallet_index]
            .pool
            .as_ref()
            .and_then(|p| p.head());

        if let Some(&lowest_gap) = info.detected_missing_nonces.iter().min() {
            self.counters.last_gap_detected = Some(Utc::now());
            let head_exceeds_gap = pool_head.is_none_or(|h| h > lowest_gap);
            if head_exceeds_gap {
                let max_slots = (POOL_SEED_SIZE as usize).saturating_sub(reserved_count);
                if let Some(pool) = self.wallets[wallet_index].pool.as_mut() {
                    pool.rewind_available_to(lowest_gap, max_slots);
                }
                self.counters.gaps_recovered += 1;
                self.counters.conflicts_detected += 1;
            } else {
                self.gap_fill(wallet_index, &info.detected_missing_nonces).await;
            }
        } else if info.possible_next_nonce > pool_head.unwrap_or(0) {
            if let Some(pool) = self.wallets[wallet_index].pool.as_mut() {
                pool.rewind_available_to(info.possible_next_nonce, POOL_SEED_SIZE as usize);
            }
        } else if pool_head.is_some_and(|h| h > info.possible_next_nonce) {
            let stale = self.wallets[wallet_index].last_assigned_at.is_none_or(|t| {
                Utc::now() - t > chrono::Duration::seconds(STALE_THRESHOLD_SECS)
            });
            if stale {
                warn!(wallet_index, pool_head = ?pool_head, possible_next_nonce = info.possible_next_nonce, "pool ran ahead of chain with no activity, rewinding");
                if let Some(pool) = self.wallets[wallet_index].pool.as_mut() {
                    pool.rewind_available_to(info.possible_next_nonce, POOL_SEED_SIZE as usize);
                }
            }
        }

        self.clean_stale_reservations(wallet_index);
    }

    async fn gap_fill(&mut self, wallet_index: usize, gaps: &[u64]) {
        for &gap in gaps.iter().take(MAX_GAP_FILLS_PER_CYCLE) {
            let recipient = "gap-fill-sink";
            let bytes = format!("gapfill:{wallet_index}:{gap}:{recipient}").into_bytes();
            match self.chain.broadcast(&bytes).await {
                Ok(_) => {
                    self.counters.gaps_filled += 1;
                }
                Err(crate::chain::ChainClientError::Rejected {
                    reason: crate::chain::RejectReason::ConflictingNonceInMempool,
                    ..
                }) => {
                    // Already filled by a prior cycle or external actor. Not an error.
                }
                Err(e) => {
                    warn!(wallet_index, gap, error = %e, "gap-fill broadcast failed, non-fatal");
                }
            }
        }
    }
}

pub enum NonceRequest {
    AssignNonce {
        wallet_count: usize,
        addresses: Vec<String>,
        reply: oneshot::Sender<Result<(u64, usize), NonceError>>,
    },
    ReleaseNonce {
        nonce: u64,
        wallet_index: usize,
        txid: Option<String>,
        fee: Option<Amount>,
    },
    LookupNonceForTxid {
        txid: String,
        reply: oneshot::Sender<Option<(u64, usize)>>,
    },
    FeeStats {
        wallet_index: usize,
        reply: oneshot::Sender<Option<PerWalletFeeStats>>,
    },
    Counters {
        reply: oneshot::Sender<CoordinatorCounters>,
    },
    PoolSnapshot {
        wallet_index: usize,
        reply: oneshot::Sender<Option<(Vec<u64>, Vec<u64>)>>,
    },
    Reconcile {
        wallet_index: usize,
        address: String,
    },
    CleanStale {
        wallet_index: usize,
    },
    ResetWallet {
        wallet_index: usize,
        address: String,
        reply: oneshot::Sender<Result<(Option<u64>, u64), NonceError>>,
    },
}

pub async fn run_actor(mut state: NonceActorState, mut rx: mpsc::Receiver<NonceRequest>) {
    while let Some(request) = rx.recv().await {
        match request {
            NonceRequest::AssignNonce {
                wallet_count,
                addresses,
                reply,
            } => {
                let result = state.assign_nonce(wallet_count, &addresses).await;
                let _ = reply.send(result);
            }
            NonceRequest::ReleaseNonce {
                nonce,
                wallet_index,
                txid,
                fee,
            } => {
                state.release_nonce(nonce, wallet_index, txid, fee);
            }
            NonceRequest::LookupNonceForTxid { txid, reply } => {
                let _ = reply.send(state.lookup_nonce_for_txid(&txid));
            }
            NonceRequest::FeeStats { wallet_index, reply } => {
                let _ = reply.send(state.fee_stats(wallet_index));
            }
            NonceRequest::Counters { reply } => {
                let _ = reply.send(state.counters());
            }
            NonceRequest::PoolSnapshot { wallet_index, reply } => {
                let _ = reply.send(state.pool_snapshot(wallet_index));
            }
            NonceRequest::Reconcile { wallet_index, address } => {
                state.reconcile_wallet(wallet_index, &address).await;
            }
            NonceRequest::CleanStale { wallet_index } => {
                state.clean_stale_reservations(wallet_index);
            }
            NonceRequest::ResetWallet { wallet_index, address, reply } => {
                let result = state.reset_wallet(wallet_index, &address).await;
                let _ = reply.send(result);
            }
        }
    }
}
