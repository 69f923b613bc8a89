//! Dedup/Idempotency Store (C6).
//!
//! Two independent key spaces — payload-hash and client-identifier —
//! modeled as two distinct `DashMap`s rather than collapsed into one, per
//! the design note that they have different conflict semantics.

use std::sync::OnceLock;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use regex::Regex;
use serde_json::Value;
use sha2::{Digest, Sha256};

pub const DEDUP_TTL_SECS: i64 = 300;

fn client_identifier_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]{16,128}$").unwrap())
}

/// A caller-supplied client identifier must be 16-128 chars of
/// `[A-Za-z0-9_-]`.
pub fn is_valid_client_identifier(id: &str) -> bool {
    client_identifier_pattern().is_match(id)
}

#[derive(Debug, Clone)]
struct DedupEntry {
    payload_hash: String,
    response: Value,
    recorded_at: DateTime<Utc>,
}

impl DedupEntry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now - self.recorded_at > Duration::seconds(DEDUP_TTL_SECS)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("identifier already used with a different payload")]
pub struct DedupError;

pub enum DedupLookup {
    Miss,
    Hit(Value),
}

/// SHA-256 over canonical JSON (stable key ordering via `serde_json`'s
/// `BTreeMap`-backed `Value` serialization when built without
/// `preserve_order`).
pub fn payload_fingerprint(canonical_json: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical_json);
    hex::encode(hasher.finalize())
}

pub struct DedupStore {
    by_hash: DashMap<String, DedupEntry>,
    by_client_id: DashMap<String, DedupEntry>,
}

impl DedupStore {
    pub fn new() -> Self {
        DedupStore {
            by_hash: DashMap::new(),
            by_client_id: DashMap::new(),
        }
    }

    pub fn lookup_by_hash(&self, hash: &str) -> DedupLookup {
        match self.by_hash.get(hash) {
            Some(entry) if !entry.is_expired(Utc::now()) => DedupLookup::Hit(entry.response.clone()),
            _ => DedupLookup::Miss,
        }
    }

    /// Best-effort: write failures never block the success response, so
    /// this simply returns and leaves the cache unchanged if it somehow
    /// can't write (there is no fallible backend here, but the contract is
    /// preserved for callers that treat this as fire-and-forget).
    pub fn record_by_hash(&self, hash: String, response: Value) {
        self.by_hash.insert(
            hash,
            DedupEntry {
                payload_hash: String::new(),
                response,
                recorded_at: Utc::now(),
            },
        );
    }

    /// `Miss` if unseen, `Hit` if the same client id *and* the same payload
    /// fingerprint were recorded, or an error if the id was reused with a
    /// different payload — the cached entry is left untouched either way.
    pub fn lookup_by_client_id(
        &self,
        client_id: &str,
        payload_hash: &str,
    ) -> Result<DedupLookup, DedupError> {
        match self.by_client_id.get(client_id) {
            Some(entry) if !entry.is_expired(Utc::now()) => {
                if entry.payload_hash == payload_hash {
                    Ok(DedupLookup::Hit(entry.response.clone()))
                } else {
                    Err(DedupError)
                }
            }
            _ => Ok(DedupLookup::Miss),
        }
    }

    pub fn record_by_client_id(&self, client_id: String, payload_hash: String, response: Value) {
        self.by_client_id.insert(
            client_id,
            DedupEntry {
                payload_hash,
                response,
                recorded_at: Utc::now(),
            },
        );
    }
}

impl Default for DedupStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn client_identifier_format_is_enforced() {
        assert!(is_valid_client_identifier("pay_abc1234567890123"));
        assert!(!is_valid_client_identifier("too_short"));
        assert!(!is_valid_client_identifier("has a space_1234567"));
        assert!(!is_valid_client_identifier(&"x".repeat(129)));
    }

    #[test]
    fn idempotence_on_same_hash() {
        let store = DedupStore::new();
        let hash = payload_fingerprint(b"payload");
        assert!(matches!(store.lookup_by_hash(&hash), DedupLookup::Miss));
        store.record_by_hash(hash.clone(), json!({"ok": true}));
        match store.lookup_by_hash(&hash) {
            DedupLookup::Hit(v) => assert_eq!(v, json!({"ok": true})),
            DedupLookup::Miss => panic!("expected hit"),
        }
    }

    #[test]
    fn identifier_conflict_purity() {
        let store = DedupStore::new();
        let hash_p = payload_fingerprint(b"P");
        let hash_p_prime = payload_fingerprint(b"P'");
        store.record_by_client_id("pay_abc".to_string(), hash_p.clone(), json!({"r": 1}));
        let result = store.lookup_by_client_id("pay_abc", &hash_p_prime);
        assert!(result.is_err());
        // Cache must still hold P's response.
        match store.lookup_by_client_id("pay_abc", &hash_p).unwrap() {
            DedupLookup::Hit(v) => assert_eq!(v, json!({"r": 1})),
            DedupLookup::Miss => panic!("expected hit"),
        }
    }

    #[test]
    fn hash_and_client_id_spaces_never_collide() {
        let store = DedupStore::new();
        let shared_key = "same-string";
        store.record_by_hash(shared_key.to_string(), json!({"from": "hash"}));
        assert!(matches!(
            store.lookup_by_client_id(shared_key, "anything").unwrap(),
            DedupLookup::Miss
        ));
    }
}
