//! Pure, single-threaded pool logic for one sponsor wallet's nonces.
//!
//! Isolated from the actor/channel plumbing in [`super::actor`] so the
//! invariants in spec-space §8 (disjointness, chaining cap, monotonic
//! assignment) can be unit-tested without spinning up tokio.

use std::collections::{BTreeSet, HashSet, VecDeque};

use chrono::{DateTime, Utc};

pub const CHAINING_LIMIT: usize = 20;
pub const POOL_SEED_SIZE: u64 = 20;

/// One wallet's reservation pool: `available` (ascending, ready to assign)
/// and `reserved` (assigned, awaiting release) are always disjoint.
#[derive(Debug, Clone)]
pub struct ReservationPool {
    available: VecDeque<u64>,
    reserved: BTreeSet<u64>,
    reserved_at: std::collections::HashMap<u64, DateTime<Utc>>,
    txid_recorded: HashSet<u64>,
    max_nonce: u64,
}

impl ReservationPool {
    /// Seeds the pool from `start`, the chain's `possibleNextNonce`, with
    /// `POOL_SEED_SIZE` initial available slots.
    pub fn seed(start: u64) -> Self {
        let end = start + POOL_SEED_SIZE;
        let available: VecDeque<u64> = (start..end).collect();
        let max_nonce = end.saturating_sub(1);
        ReservationPool {
            available,
            reserved: BTreeSet::new(),
            reserved_at: std::collections::HashMap::new(),
            txid_recorded: HashSet::new(),
            max_nonce,
        }
    }

    pub fn reserved_count(&self) -> usize {
        self.reserved.len()
    }

    pub fn available_snapshot(&self) -> Vec<u64> {
        self.available.iter().copied().collect()
    }

    pub fn reserved_snapshot(&self) -> Vec<u64> {
        self.reserved.iter().copied().collect()
    }

    pub fn max_nonce(&self) -> u64 {
        self.max_nonce
    }

    fn extend_one(&mut self) {
        self.max_nonce += 1;
        self.available.push_back(self.max_nonce);
    }

    /// Assigns the lowest available nonce if under the chaining limit.
    pub fn assign(&mut self, now: DateTime<Utc>) -> Option<u64> {
        if self.reserved.len() >= CHAINING_LIMIT {
            return None;
        }
        if self.available.is_empty() {
            self.extend_one();
        }
        let nonce = self.available.pop_front()?;
        self.reserved.insert(nonce);
        self.reserved_at.insert(nonce, now);
        Some(nonce)
    }

    /// Releases `nonce`. No-op if not currently reserved. `consumed` means
    /// the chain now has it (broadcast succeeded) so it's never reused.
    pub fn release(&mut self, nonce: u64, consumed: bool) {
        if !self.reserved.remove(&nonce) {
            return;
        }
        self.reserved_at.remove(&nonce);
        self.txid_recorded.remove(&nonce);
        if !consumed {
            self.insert_available_sorted(nonce);
        }
    }

    fn insert_available_sorted(&mut self, nonce: u64) {
        let pos = self.available.partition_point(|&n| n < nonce);
        self.available.insert(pos, nonce);
    }

    pub fn record_txid_for_nonce(&mut self, nonce: u64) {
        self.txid_recorded.insert(nonce);
    }

    /// Moves reservations older than `stale_threshold` with no recorded
    /// txid back into `available` — recovery from a caller that reserved
    /// and crashed before releasing.
    pub fn clean_stale(&mut self, now: DateTime<Utc>, stale_threshold: chrono::Duration) -> Vec<u64> {
        let stale: Vec<u64> = self
            .reserved
            .iter()
            .copied()
            .filter(|n| {
                !self.txid_recorded.contains(n)
                    && self
                        .reserved_at
                        .get(n)
                        .is_some_and(|t| now - *t > stale_threshold)
            })
            .collect();
        for nonce in &stale {
            self.reserved.remove(nonce);
            self.reserved_at.remove(nonce);
            self.insert_available_sorted(*nonce);
        }
        stale
    }

    /// Rewinds `available` to start at `new_head`, extending up to
    /// `max_slots` entries. Never touches `reserved`. Used by gap recovery,
    /// forward bump, and stale-state reset.
    pub fn rewind_available_to(&mut self, new_head: u64, max_slots: usize) {
        self.available.clear();
        let mut n = new_head;
        while self.available.len() < max_slots {
            if self.reserved.contains(&n) {
                n += 1;
                continue;
            }
            self.available.push_back(n);
            n += 1;
        }
        self.max_nonce = self.max_nonce.max(n.saturating_sub(1));
    }

    pub fn head(&self) -> Option<u64> {
        self.available.front().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn seed_produces_disjoint_sets() {
        let pool = ReservationPool::seed(100);
        assert_eq!(pool.available_snapshot(), (100..120).collect::<Vec<_>>());
        assert!(pool.reserved_snapshot().is_empty());
    }

    #[test]
    fn assign_is_monotonic_and_disjoint() {
        let mut pool = ReservationPool::seed(100);
        let a = pool.assign(now()).unwrap();
        let b = pool.assign(now()).unwrap();
        assert!(b > a);
        assert!(
            pool.available_snapshot()
                .iter()
                .collect::<HashSet<_>>()
                .is_disjoint(&pool.reserved_snapshot().iter().collect())
        );
    }

    #[test]
    fn chaining_limit_enforced() {
        let mut pool = ReservationPool::seed(500);
        for _ in 0..CHAINING_LIMIT {
            assert!(pool.assign(now()).is_some());
        }
        assert!(pool.assign(now()).is_none());
        assert_eq!(pool.reserved_count(), CHAINING_LIMIT);
    }

    #[test]
    fn release_without_txid_returns_to_available() {
        let mut pool = ReservationPool::seed(100);
        let n = pool.assign(now()).unwrap();
        pool.release(n, false);
        assert!(pool.available_snapshot().contains(&n));
        assert!(!pool.reserved_snapshot().contains(&n));
    }

    #[test]
    fn release_with_txid_consumes_permanently() {
        let mut pool = ReservationPool::seed(100);
        let n = pool.assign(now()).unwrap();
        pool.release(n, true);
        assert!(!pool.available_snapshot().contains(&n));
        assert!(!pool.reserved_snapshot().contains(&n));
    }

    #[test]
    fn clean_stale_recovers_orphans_without_txid() {
        let mut pool = ReservationPool::seed(100);
        let n = pool.assign(now()).unwrap();
        let later = now() + chrono::Duration::minutes(11);
        let recovered = pool.clean_stale(later, chrono::Duration::minutes(10));
        assert_eq!(recovered, vec![n]);
        assert!(pool.available_snapshot().contains(&n));
    }

    #[test]
    fn clean_stale_spares_reservations_with_recorded_txid() {
        let mut pool = ReservationPool::seed(100);
        let n = pool.assign(now()).unwrap();
        pool.record_txid_for_nonce(n);
        let later = now() + chrono::Duration::minutes(11);
        let recovered = pool.clean_stale(later, chrono::Duration::minutes(10));
        assert!(recovered.is_empty());
        assert!(pool.reserved_snapshot().contains(&n));
    }

    #[test]
    fn rewind_never_touches_reserved() {
        let mut pool = ReservationPool::seed(100);
        let reserved = pool.assign(now()).unwrap();
        pool.rewind_available_to(45, 20);
        assert!(pool.reserved_snapshot().contains(&reserved));
        assert!(!pool.available_snapshot().contains(&reserved));
        assert_eq!(pool.available_snapshot().first(), Some(&45));
    }
}
