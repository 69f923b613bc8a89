//! Stats Aggregator (C4): single-owner atomic counters and rolling
//! transaction log backing the dashboard JSON. All writes are
//! fire-and-forget — callers never await persistence.

pub mod types;

use std::collections::VecDeque;
use std::sync::Mutex;

use chrono::{NaiveDate, TimeZone, Timelike, Utc};
use dashmap::DashMap;
use serde::Serialize;

pub use types::{ErrorCategory, TransactionRecord};
use types::{StatsRow, TxLogEntry};

use crate::amount::Amount;

const TX_LOG_RETENTION_DAYS: i64 = 7;
const HOURLY_RETENTION_HOURS: i64 = 48;
const DAILY_RETENTION_DAYS: i64 = 90;

fn hour_key(date: NaiveDate, hour: u32) -> String {
    format!("{date}:{hour:02}")
}

pub struct StatsAggregator {
    daily: DashMap<NaiveDate, StatsRow>,
    hourly: DashMap<String, StatsRow>,
    tx_log: Mutex<VecDeque<TxLogEntry>>,
}

impl StatsAggregator {
    pub fn new() -> Self {
        StatsAggregator {
            daily: DashMap::new(),
            hourly: DashMap::new(),
            tx_log: Mutex::new(VecDeque::new()),
        }
    }

    /// Appends a [`TxLogEntry`] and atomically increments the matching
    /// daily and hourly rows. Fire-and-forget: never awaited by the caller.
    pub fn record_transaction(&self, record: TransactionRecord) {
        let now = Utc::now();
        let date = now.date_naive();
        self.daily.entry(date).or_default().record_transaction(&record);
        self.hourly
            .entry(hour_key(date, now.hour()))
            .or_default()
            .record_transaction(&record);
        self.tx_log.lock().unwrap().push_back(TxLogEntry {
            timestamp: now,
            record,
        });
        self.prune();
    }

    /// Increments only today's category counter. Transaction totals are
    /// never touched here — only `record_transaction` maintains those, to
    /// prevent double counting.
    pub fn record_error(&self, category: ErrorCategory) {
        let now = Utc::now();
        let date = now.date_naive();
        self.daily.entry(date).or_default().record_error(category);
        self.hourly
            .entry(hour_key(date, now.hour()))
            .or_default()
            .record_error(category);
    }

    fn prune(&self) {
        let now = Utc::now();
        {
            let cutoff = now - chrono::Duration::days(TX_LOG_RETENTION_DAYS);
            let mut log = self.tx_log.lock().unwrap();
            while log.front().is_some_and(|e| e.timestamp < cutoff) {
                log.pop_front();
            }
        }
        let hourly_cutoff = now - chrono::Duration::hours(HOURLY_RETENTION_HOURS);
        self.hourly.retain(|key, _| {
            parse_hour_key(key).is_some_and(|dt| dt >= hourly_cutoff)
        });
        let daily_cutoff = now.date_naive() - chrono::Duration::days(DAILY_RETENTION_DAYS);
        self.daily.retain(|date, _| *date >= daily_cutoff);
    }

    pub fn daily_stats(&self, days: u32) -> Vec<DailyStatsView> {
        let today = Utc::now().date_naive();
        let mut rows: Vec<DailyStatsView> = (0..days)
            .filter_map(|offset| {
                let date = today - chrono::Duration::days(offset as i64);
                self.daily.get(&date).map(|row| row_view(date.to_string(), &row))
            })
            .collect();
        rows.sort_by(|a, b| a.key.cmp(&b.key));
        rows
    }

    pub fn hourly_stats(&self) -> Vec<DailyStatsView> {
        let now = Utc::now();
        let mut rows: Vec<DailyStatsView> = (0..24)
            .filter_map(|offset| {
                let ts = now - chrono::Duration::hours(offset);
                let key = hour_key(ts.date_naive(), ts.hour());
                self.hourly.get(&key).map(|row| row_view(key, &row))
            })
            .collect();
        rows.sort_by(|a, b| a.key.cmp(&b.key));
        rows
    }

    pub fn recent_tx_log(&self, days: u32, limit: usize, endpoint: Option<&str>) -> Vec<TxLogView> {
        let days = days.min(7);
        let limit = limit.min(200);
        let cutoff = Utc::now() - chrono::Duration::days(days as i64);
        let log = self.tx_log.lock().unwrap();
        log.iter()
            .rev()
            .filter(|e| e.timestamp >= cutoff)
            .filter(|e| endpoint.is_none_or(|ep| e.record.endpoint == ep))
            .take(limit)
            .map(|e| TxLogView {
                timestamp: e.timestamp.to_rfc3339(),
                endpoint: e.record.endpoint.clone(),
                success: e.record.success,
                txid: e.record.txid.clone(),
                amount: e.record.amount.to_string(),
            })
            .collect()
    }

    pub fn overview(&self) -> Overview {
        let now = Utc::now();
        let hourly_rows = self.hourly_stats();
        let transactions_total: u64 = hourly_rows.iter().map(|r| r.total).sum();
        let transactions_success: u64 = hourly_rows.iter().map(|r| r.success).sum();
        let transactions_failed: u64 = hourly_rows.iter().map(|r| r.failed).sum();

        let today = now.date_naive();
        let yesterday = today - chrono::Duration::days(1);
        let today_row = self.daily.get(&today);
        let yesterday_row = self.daily.get(&yesterday);

        let today_fee_sum = today_row.as_ref().map(|r| r.fees.sum()).unwrap_or(Amount::ZERO);
        let yesterday_fee_sum = yesterday_row
            .as_ref()
            .map(|r| r.fees.sum())
            .unwrap_or(Amount::ZERO);
        let trend = trend_rule(
            today_fee_sum.to_u128_saturating() as f64,
            yesterday_fee_sum.to_u128_saturating() as f64,
        );

        let tokens = today_row
            .as_ref()
            .map(|row| token_breakdown(&row.tokens))
            .unwrap_or_default();

        let endpoints = today_row
            .as_ref()
            .map(|row| {
                row.endpoints
                    .iter()
                    .map(|e| {
                        (
                            e.key().clone(),
                            EndpointView {
                                success: e.success.load(std::sync::atomic::Ordering::Relaxed),
                                failed: e.failed.load(std::sync::atomic::Ordering::Relaxed),
                                client_error: e.client_error.load(std::sync::atomic::Ordering::Relaxed),
                            },
                        )
                    })
                    .collect()
            })
            .unwrap_or_default();

        Overview {
            transactions: TotalsView {
                total: transactions_total,
                success: transactions_success,
                failed: transactions_failed,
            },
            tokens,
            endpoints,
            fees: FeesView {
                sum: today_fee_sum.to_string(),
                count: today_row.as_ref().map(|r| r.fees.count()).unwrap_or(0),
                trend,
            },
            hourly_data: hourly_rows,
        }
    }
}

impl Default for StatsAggregator {
    fn default() -> Self {
        Self::new()
    }
}

fn token_breakdown(tokens: &DashMap<String, types::TokenAggregate>) -> std::collections::HashMap<String, TokenView> {
    let total_count: u64 = tokens.iter().map(|t| t.count()).sum();
    tokens
        .iter()
        .map(|t| {
            let count = t.count();
            let percentage = if total_count == 0 {
                0.0
            } else {
                (count as f64 / total_count as f64) * 100.0
            };
            (
                t.key().clone(),
                TokenView {
                    count,
                    volume: t.volume().to_string(),
                    percentage,
                },
            )
        })
        .collect()
}

fn parse_hour_key(key: &str) -> Option<chrono::DateTime<Utc>> {
    let (date_part, hour_part) = key.split_once(':')?;
    let date = NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()?;
    let hour: u32 = hour_part.parse().ok()?;
    let naive = date.and_hms_opt(hour, 0, 0)?;
    Some(Utc.from_utc_datetime(&naive))
}

fn row_view(key: String, row: &StatsRow) -> DailyStatsView {
    DailyStatsView {
        key,
        total: row.total(),
        success: row.success.load(std::sync::atomic::Ordering::Relaxed),
        failed: row.failed.load(std::sync::atomic::Ordering::Relaxed),
    }
}

/// `"up"` if the relative change exceeds +5%, `"down"` below -5%, else
/// `"stable"`. If `previous == 0` and `current > 0`, always `"up"`.
pub fn trend_rule(current: f64, previous: f64) -> &'static str {
    if previous == 0.0 {
        return if current > 0.0 { "up" } else { "stable" };
    }
    let change = (current - previous) / previous;
    if change > 0.05 {
        "up"
    } else if change < -0.05 {
        "down"
    } else {
        "stable"
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DailyStatsView {
    pub key: String,
    pub total: u64,
    pub success: u64,
    pub failed: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TxLogView {
    pub timestamp: String,
    pub endpoint: String,
    pub success: bool,
    pub txid: Option<String>,
    pub amount: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenView {
    pub count: u64,
    pub volume: String,
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct EndpointView {
    pub success: u64,
    pub failed: u64,
    pub client_error: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TotalsView {
    pub total: u64,
    pub success: u64,
    pub failed: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeesView {
    pub sum: String,
    pub count: u64,
    pub trend: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct Overview {
    pub transactions: TotalsView,
    pub tokens: std::collections::HashMap<String, TokenView>,
    pub endpoints: std::collections::HashMap<String, EndpointView>,
    pub fees: FeesView,
    pub hourly_data: Vec<DailyStatsView>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record(endpoint: &str, success: bool, amount: u64) -> TransactionRecord {
        TransactionRecord {
            endpoint: endpoint.to_string(),
            success,
            client_error: false,
            token_label: "native".to_string(),
            amount: Amount::from(amount),
            fee: Some(Amount::from(300u64)),
            txid: Some("0xabc".to_string()),
            sender: None,
            recipient: None,
            status: None,
            block_height: None,
        }
    }

    #[test]
    fn trend_rule_covers_thresholds() {
        assert_eq!(trend_rule(0.0, 0.0), "stable");
        assert_eq!(trend_rule(10.0, 0.0), "up");
        assert_eq!(trend_rule(106.0, 100.0), "up");
        assert_eq!(trend_rule(94.0, 100.0), "down");
        assert_eq!(trend_rule(100.0, 100.0), "stable");
        assert_eq!(trend_rule(104.9, 100.0), "stable");
        assert_eq!(trend_rule(95.1, 100.0), "stable");
    }

    #[test]
    fn overview_total_equals_sum_of_hourly() {
        let agg = StatsAggregator::new();
        agg.record_transaction(sample_record("relay", true, 100));
        agg.record_transaction(sample_record("relay", false, 50));
        let overview = agg.overview();
        let hourly_sum: u64 = overview.hourly_data.iter().map(|r| r.total).sum();
        assert_eq!(overview.transactions.total, hourly_sum);
    }

    #[test]
    fn token_percentage_closure() {
        let agg = StatsAggregator::new();
        agg.record_transaction(sample_record("relay", true, 100));
        agg.record_transaction(sample_record("relay", true, 200));
        let overview = agg.overview();
        let total_pct: f64 = overview.tokens.values().map(|t| t.percentage).sum();
        assert!((total_pct - 100.0).abs() < 1e-9);
    }

    #[test]
    fn error_recording_does_not_touch_transaction_totals() {
        let agg = StatsAggregator::new();
        agg.record_error(ErrorCategory::Validation);
        let overview = agg.overview();
        assert_eq!(overview.transactions.total, 0);
    }
}
