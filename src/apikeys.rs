//! API-key gate (C9, part 2): hashed key store with per-tier quotas and a
//! ledger incremented on success.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{NaiveDate, Utc};
use dashmap::DashMap;
use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::amount::Amount;
use crate::ratelimit::AuthError;

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyTier {
    pub requests_per_minute: u32,
    pub requests_per_day: u32,
    pub daily_fee_cap: u64,
}

/// One entry of the operator-configured API-key provisioning list
/// (`Config::api_keys`). Deserialized leniently via `VecSkipError` so one
/// malformed entry in the config file doesn't reject the whole list.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyProvision {
    pub key: String,
    pub tier: ApiKeyTier,
}

struct LedgerDay {
    date: NaiveDate,
    requests_today: AtomicU64,
    fee_spent_today: Mutex<Amount>,
}

struct ApiKeyRecord {
    tier: ApiKeyTier,
    revoked: bool,
    minute_window: Mutex<Vec<chrono::DateTime<Utc>>>,
    ledger: Mutex<LedgerDay>,
}

pub fn hash_key(raw_key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw_key.as_bytes());
    hex::encode(hasher.finalize())
}

pub struct ApiKeyStore {
    keys: DashMap<String, ApiKeyRecord>,
}

impl ApiKeyStore {
    pub fn new() -> Self {
        ApiKeyStore { keys: DashMap::new() }
    }

    pub fn provision_all(&self, provisions: &[ApiKeyProvision]) {
        for provision in provisions {
            self.provision(&provision.key, provision.tier);
        }
    }

    pub fn provision(&self, raw_key: &str, tier: ApiKeyTier) {
        self.keys.insert(
            hash_key(raw_key),
            ApiKeyRecord {
                tier,
                revoked: false,
                minute_window: Mutex::new(Vec::new()),
                ledger: Mutex::new(LedgerDay {
                    date: Utc::now().date_naive(),
                    requests_today: AtomicU64::new(0),
                    fee_spent_today: Mutex::new(Amount::ZERO),
                }),
            },
        );
    }

    pub fn revoke(&self, raw_key: &str) {
        if let Some(mut record) = self.keys.get_mut(&hash_key(raw_key)) {
            record.revoked = true;
        }
    }

    /// Validates the key, enforces per-minute/per-day/daily-fee-cap quotas,
    /// and — on success — increments the ledger counters for the request.
    pub fn check_and_record(&self, raw_key: Option<&str>, fee: Amount) -> Result<(), AuthError> {
        let raw_key = raw_key.ok_or(AuthError::MissingKey)?;
        let record = self
            .keys
            .get(&hash_key(raw_key))
            .ok_or(AuthError::InvalidKey)?;
        if record.revoked {
            return Err(AuthError::Revoked);
        }

        let now = Utc::now();
        {
            let mut window = record.minute_window.lock().unwrap();
            window.retain(|t| now.signed_duration_since(*t).num_seconds() < 60);
            if window.len() as u32 >= record.tier.requests_per_minute {
                return Err(AuthError::QuotaExceeded);
            }
            window.push(now);
        }

        {
            let mut ledger = record.ledger.lock().unwrap();
            if ledger.date != now.date_naive() {
                ledger.date = now.date_naive();
                ledger.requests_today.store(0, Ordering::Relaxed);
                *ledger.fee_spent_today.lock().unwrap() = Amount::ZERO;
            }
            if ledger.requests_today.load(Ordering::Relaxed) >= record.tier.requests_per_day as u64 {
                return Err(AuthError::QuotaExceeded);
            }
            let mut spent = ledger.fee_spent_today.lock().unwrap();
            let projected = spent.checked_add(fee).unwrap_or(*spent);
            if projected.to_u128_saturating() as u64 > record.tier.daily_fee_cap {
                return Err(AuthError::DailyFeeCapExceeded);
            }
            *spent = projected;
            ledger.requests_today.fetch_add(1, Ordering::Relaxed);
        }

        Ok(())
    }
}

impl Default for ApiKeyStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_tier() -> ApiKeyTier {
        ApiKeyTier {
            requests_per_minute: 2,
            requests_per_day: 100,
            daily_fee_cap: 1_000,
        }
    }

    #[test]
    fn missing_key_is_rejected() {
        let store = ApiKeyStore::new();
        assert!(matches!(
            store.check_and_record(None, Amount::ZERO),
            Err(AuthError::MissingKey)
        ));
    }

    #[test]
    fn unknown_key_is_rejected() {
        let store = ApiKeyStore::new();
        assert!(matches!(
            store.check_and_record(Some("nope"), Amount::ZERO),
            Err(AuthError::InvalidKey)
        ));
    }

    #[test]
    fn per_minute_quota_enforced() {
        let store = ApiKeyStore::new();
        store.provision("k1", small_tier());
        store.check_and_record(Some("k1"), Amount::ZERO).unwrap();
        store.check_and_record(Some("k1"), Amount::ZERO).unwrap();
        assert!(matches!(
            store.check_and_record(Some("k1"), Amount::ZERO),
            Err(AuthError::QuotaExceeded)
        ));
    }

    #[test]
    fn revoked_key_rejected() {
        let store = ApiKeyStore::new();
        store.provision("k1", small_tier());
        store.revoke("k1");
        assert!(matches!(
            store.check_and_record(Some("k1"), Amount::ZERO),
            Err(AuthError::Revoked)
        ));
    }
}
