//! Wire/internal types for the stats aggregator (C4).

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;

use crate::amount::Amount;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorCategory {
    Validation,
    RateLimit,
    Sponsoring,
    Settlement,
    Internal,
}

impl ErrorCategory {
    pub const ALL: [ErrorCategory; 5] = [
        ErrorCategory::Validation,
        ErrorCategory::RateLimit,
        ErrorCategory::Sponsoring,
        ErrorCategory::Settlement,
        ErrorCategory::Internal,
    ];

    fn label(self) -> &'static str {
        match self {
            ErrorCategory::Validation => "validation",
            ErrorCategory::RateLimit => "rateLimit",
            ErrorCategory::Sponsoring => "sponsoring",
            ErrorCategory::Settlement => "settlement",
            ErrorCategory::Internal => "internal",
        }
    }
}

#[derive(Debug, Default)]
pub struct TokenAggregate {
    pub count: AtomicU64,
    volume: Mutex<Amount>,
}

impl TokenAggregate {
    fn add(&self, amount: Amount) {
        self.count.fetch_add(1, Ordering::Relaxed);
        let mut volume = self.volume.lock().unwrap();
        *volume = volume.checked_add(amount).unwrap_or(*volume);
    }

    pub fn volume(&self) -> Amount {
        *self.volume.lock().unwrap()
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Default)]
pub struct FeeAggregate {
    sum: Mutex<Amount>,
    count: AtomicU64,
    min: Mutex<Option<Amount>>,
    max: Mutex<Option<Amount>>,
}

impl FeeAggregate {
    fn add(&self, fee: Amount) {
        let mut sum = self.sum.lock().unwrap();
        *sum = sum.checked_add(fee).unwrap_or(*sum);
        self.count.fetch_add(1, Ordering::Relaxed);
        let mut min = self.min.lock().unwrap();
        if min.is_none_or(|m| fee < m) {
            *min = Some(fee);
        }
        let mut max = self.max.lock().unwrap();
        if max.is_none_or(|m| fee > m) {
            *max = Some(fee);
        }
    }

    pub fn sum(&self) -> Amount {
        *self.sum.lock().unwrap()
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn min(&self) -> Option<Amount> {
        *self.min.lock().unwrap()
    }

    pub fn max(&self) -> Option<Amount> {
        *self.max.lock().unwrap()
    }
}

#[derive(Debug, Default)]
pub struct EndpointAggregate {
    pub success: AtomicU64,
    pub failed: AtomicU64,
    pub client_error: AtomicU64,
}

/// Shape shared by daily and hourly rows.
#[derive(Debug, Default)]
pub struct StatsRow {
    pub total: AtomicU64,
    pub success: AtomicU64,
    pub failed: AtomicU64,
    pub tokens: DashMap<String, TokenAggregate>,
    pub fees: FeeAggregate,
    pub errors: DashMap<&'static str, AtomicI64>,
    pub endpoints: DashMap<String, EndpointAggregate>,
}

impl StatsRow {
    pub fn record_transaction(&self, record: &TransactionRecord) {
        self.total.fetch_add(1, Ordering::Relaxed);
        if record.success {
            self.success.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
        self.tokens
            .entry(record.token_label.clone())
            .or_default()
            .add(record.amount);
        if let Some(fee) = record.fee {
            self.fees.add(fee);
        }
        if record.client_error {
            self.errors
                .entry("clientError")
                .or_insert_with(|| AtomicI64::new(0))
                .fetch_add(1, Ordering::Relaxed);
        }
        let endpoint = self.endpoints.entry(record.endpoint.clone()).or_default();
        if record.success {
            endpoint.success.fetch_add(1, Ordering::Relaxed);
        } else {
            endpoint.failed.fetch_add(1, Ordering::Relaxed);
        }
        if record.client_error {
            endpoint.client_error.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_error(&self, category: ErrorCategory) {
        self.errors
            .entry(category.label())
            .or_insert_with(|| AtomicI64::new(0))
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone)]
pub struct TransactionRecord {
    pub endpoint: String,
    pub success: bool,
    pub client_error: bool,
    pub token_label: String,
    pub amount: Amount,
    pub fee: Option<Amount>,
    pub txid: Option<String>,
    pub sender: Option<String>,
    pub recipient: Option<String>,
    pub status: Option<String>,
    pub block_height: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct TxLogEntry {
    pub timestamp: DateTime<Utc>,
    pub record: TransactionRecord,
}
