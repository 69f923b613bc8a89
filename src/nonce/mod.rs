//! Nonce Coordinator (C3): per-wallet reservation pools, round-robin
//! assignment, chaining-limit enforcement, gap detection, gap-fill
//! broadcast, periodic reconciliation against the chain.

pub mod actor;
pub mod pool;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub use actor::{CoordinatorCounters, NonceError, PerWalletFeeStats, MAX_WALLET_COUNT};
use actor::{NonceActorState, NonceRequest, run_actor};
pub use pool::{CHAINING_LIMIT, POOL_SEED_SIZE};

use crate::amount::Amount;
use crate::chain::ChainClient;

pub const ALARM_INTERVAL: Duration = Duration::from_secs(300);

/// Cheap, clonable handle to the nonce actor. All mutating operations are
/// messages to the single actor task; this struct itself holds no mutable
/// state.
#[derive(Clone)]
pub struct NonceCoordinator {
    tx: mpsc::Sender<NonceRequest>,
}

impl NonceCoordinator {
    /// Spawns the actor task and the background reconciliation loop.
    /// `addresses` are the sponsor wallet addresses, indexed by wallet
    /// index; they're fixed at startup per spec §3 (stable for process
    /// lifetime).
    pub fn spawn(
        addresses: Vec<String>,
        chain: Arc<dyn ChainClient>,
        shutdown: CancellationToken,
    ) -> Self {
        let wallet_count = addresses.len();
        let (tx, rx) = mpsc::channel(1024);
        let state = NonceActorState::new(wallet_count, chain);
        tokio::spawn(run_actor(state, rx));

        let coordinator = NonceCoordinator { tx };
        coordinator.spawn_reconciler(addresses, shutdown);
        coordinator
    }

    fn spawn_reconciler(&self, addresses: Vec<String>, shutdown: CancellationToken) {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(ALARM_INTERVAL);
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        info!("nonce reconciler shutting down");
                        break;
                    }
                    _ = ticker.tick() => {
                        for (wallet_index, address) in addresses.iter().enumerate() {
                            let sent = tx
                                .send(NonceRequest::Reconcile {
                                    wallet_index,
                                    address: address.clone(),
                                })
                                .await;
                            if sent.is_err() {
                                warn!("nonce actor channel closed, stopping reconciler");
                                return;
                            }
                        }
                    }
                }
            }
        });
    }

    pub async fn assign_nonce(
        &self,
        wallet_count: usize,
        addresses: Vec<String>,
    ) -> Result<(u64, usize), NonceError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(NonceRequest::AssignNonce {
                wallet_count,
                addresses,
                reply,
            })
            .await
            .map_err(|_| NonceError::ChainUnavailable("nonce actor unavailable".to_string()))?;
        rx.await
            .map_err(|_| NonceError::ChainUnavailable("nonce actor dropped reply".to_string()))?
    }

    pub async fn release_nonce(
        &self,
        nonce: u64,
        wallet_index: usize,
        txid: Option<String>,
        fee: Option<Amount>,
    ) {
        let _ = self
            .tx
            .send(NonceRequest::ReleaseNonce {
                nonce,
                wallet_index,
                txid,
                fee,
            })
            .await;
    }

    pub async fn lookup_nonce_for_txid(&self, txid: &str) -> Option<(u64, usize)> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(NonceRequest::LookupNonceForTxid {
                txid: txid.to_string(),
                reply,
            })
            .await
            .ok()?;
        rx.await.ok().flatten()
    }

    pub async fn fee_stats(&self, wallet_index: usize) -> Option<PerWalletFeeStats> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(NonceRequest::FeeStats { wallet_index, reply })
            .await
            .ok()?;
        rx.await.ok().flatten()
    }

    /// Forces wallet `wallet_index` to re-seed its pool from the chain's
    /// current nonce info, for the operator-facing `/nonce/reset` endpoint.
    pub async fn reset_wallet(
        &self,
        wallet_index: usize,
        address: String,
    ) -> Result<(Option<u64>, u64), NonceError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(NonceRequest::ResetWallet { wallet_index, address, reply })
            .await
            .map_err(|_| NonceError::ChainUnavailable("nonce actor unavailable".to_string()))?;
        rx.await
            .map_err(|_| NonceError::ChainUnavailable("nonce actor dropped reply".to_string()))?
    }

    pub async fn counters(&self) -> Option<CoordinatorCounters> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(NonceRequest::Counters { reply }).await.ok()?;
        rx.await.ok()
    }

    pub async fn pool_snapshot(&self, wallet_index: usize) -> Option<(Vec<u64>, Vec<u64>)> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(NonceRequest::PoolSnapshot { wallet_index, reply })
            .await
            .ok()?;
        rx.await.ok().flatten()
    }
}

/// Guard returned by [`reserve`] helpers elsewhere, releasing the nonce as
/// unused on drop if it was never explicitly consumed — mirrors
/// `NonceReservation` in the corpus's robust nonce manager, adapted here as
/// a thin RAII wrapper over [`NonceCoordinator::release_nonce`].
pub struct NonceReservation {
    coordinator: NonceCoordinator,
    nonce: u64,
    wallet_index: usize,
    released: bool,
}

impl NonceReservation {
    pub fn new(coordinator: NonceCoordinator, nonce: u64, wallet_index: usize) -> Self {
        NonceReservation {
            coordinator,
            nonce,
            wallet_index,
            released: false,
        }
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn wallet_index(&self) -> usize {
        self.wallet_index
    }

    /// Consumes the guard, releasing the nonce with the given outcome.
    pub async fn release(mut self, txid: Option<String>, fee: Option<Amount>) {
        self.released = true;
        self.coordinator
            .release_nonce(self.nonce, self.wallet_index, txid, fee)
            .await;
    }
}

impl Drop for NonceReservation {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        warn!(
            nonce = self.nonce,
            wallet_index = self.wallet_index,
            "nonce reservation dropped without explicit release, releasing unused"
        );
        let coordinator = self.coordinator.clone();
        let nonce = self.nonce;
        let wallet_index = self.wallet_index;
        tokio::spawn(async move {
            coordinator.release_nonce(nonce, wallet_index, None, None).await;
        });
    }
}
