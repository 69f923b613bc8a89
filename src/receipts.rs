//! Receipt Store (C5): keyed read/write of payment receipts with TTL and
//! access-count mutation.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::amount::Amount;

pub const RECEIPT_TTL_SECS: i64 = 2_592_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettlementStatus {
    Confirmed,
    Pending,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementInfo {
    pub status: SettlementStatus,
    pub sender: Option<String>,
    pub recipient: Option<String>,
    pub amount: Option<Amount>,
    pub block_height: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentReceipt {
    pub receipt_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub sender_address: String,
    #[serde(with = "b64_bytes")]
    pub sponsored_tx_bytes: Vec<u8>,
    pub fee: Amount,
    pub txid: String,
    pub settlement: SettlementInfo,
    pub settle_options_resource: Option<String>,
    pub consumed: bool,
    pub access_count: u64,
}

mod b64_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::util::b64::Base64Bytes;

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&Base64Bytes::encode_string(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        Base64Bytes::decode_str(&s).map_err(serde::de::Error::custom)
    }
}

impl PaymentReceipt {
    pub fn new(
        receipt_id: String,
        sender_address: String,
        sponsored_tx_bytes: Vec<u8>,
        fee: Amount,
        txid: String,
        settlement: SettlementInfo,
        settle_options_resource: Option<String>,
    ) -> Self {
        let now = Utc::now();
        PaymentReceipt {
            receipt_id,
            created_at: now,
            expires_at: now + Duration::seconds(RECEIPT_TTL_SECS),
            sender_address,
            sponsored_tx_bytes,
            fee,
            txid,
            settlement,
            settle_options_resource,
            consumed: false,
            access_count: 0,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[derive(Debug, thiserror::Error, Clone, Copy)]
pub enum ReceiptError {
    #[error("receipt not found")]
    NotFound,
    #[error("receipt expired")]
    Expired,
    #[error("receipt already consumed")]
    Consumed,
}

pub struct ReceiptStore {
    receipts: DashMap<String, PaymentReceipt>,
}

impl ReceiptStore {
    pub fn new() -> Self {
        ReceiptStore {
            receipts: DashMap::new(),
        }
    }

    pub fn put(&self, receipt: PaymentReceipt) {
        self.receipts.insert(receipt.receipt_id.clone(), receipt);
    }

    pub fn get(&self, receipt_id: &str) -> Result<PaymentReceipt, ReceiptError> {
        let entry = self.receipts.get(receipt_id).ok_or(ReceiptError::NotFound)?;
        if entry.is_expired(Utc::now()) {
            return Err(ReceiptError::Expired);
        }
        Ok(entry.clone())
    }

    /// Reads, increments `accessCount`, optionally latches `consumed`, and
    /// writes back — the remaining TTL is preserved automatically since
    /// `expiresAt` is never touched here.
    pub fn mark_consumed(
        &self,
        receipt_id: &str,
        set_consumed: bool,
    ) -> Result<PaymentReceipt, ReceiptError> {
        let mut entry = self
            .receipts
            .get_mut(receipt_id)
            .ok_or(ReceiptError::NotFound)?;
        if entry.is_expired(Utc::now()) {
            return Err(ReceiptError::Expired);
        }
        entry.access_count += 1;
        if set_consumed {
            entry.consumed = true;
        }
        Ok(entry.clone())
    }
}

impl Default for ReceiptStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PaymentReceipt {
        PaymentReceipt::new(
            "r1".to_string(),
            "SP_SENDER".to_string(),
            vec![1, 2, 3],
            Amount::from(300u64),
            "0xtx".to_string(),
            SettlementInfo {
                status: SettlementStatus::Confirmed,
                sender: Some("SP_SENDER".to_string()),
                recipient: Some("SP_RECIPIENT".to_string()),
                amount: Some(Amount::from(1000u64)),
                block_height: Some(42),
            },
            None,
        )
    }

    #[test]
    fn put_then_get_round_trips() {
        let store = ReceiptStore::new();
        store.put(sample());
        let fetched = store.get("r1").unwrap();
        assert_eq!(fetched.txid, "0xtx");
    }

    #[test]
    fn mark_consumed_increments_access_count_and_preserves_ttl() {
        let store = ReceiptStore::new();
        let receipt = sample();
        let expires_at = receipt.expires_at;
        store.put(receipt);
        let updated = store.mark_consumed("r1", true).unwrap();
        assert_eq!(updated.access_count, 1);
        assert!(updated.consumed);
        assert_eq!(updated.expires_at, expires_at);
    }

    #[test]
    fn missing_receipt_is_not_found() {
        let store = ReceiptStore::new();
        assert!(matches!(store.get("missing"), Err(ReceiptError::NotFound)));
    }
}
