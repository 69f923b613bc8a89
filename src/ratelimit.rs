//! Rate Limiter (C9, part 1): per-origin sliding window for `relay`.

use std::collections::VecDeque;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

pub const RELAY_WINDOW_SECS: i64 = 60;
pub const RELAY_WINDOW_LIMIT: usize = 10;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("missing API key")]
    MissingKey,
    #[error("invalid API key")]
    InvalidKey,
    #[error("API key revoked")]
    Revoked,
    #[error("daily fee cap exceeded")]
    DailyFeeCapExceeded,
    #[error("request quota exceeded")]
    QuotaExceeded,
}

#[derive(Debug, Clone, Copy)]
pub struct RateLimitExceeded {
    pub retry_after_secs: u64,
}

pub struct OriginRateLimiter {
    windows: DashMap<String, Mutex<VecDeque<DateTime<Utc>>>>,
}

impl OriginRateLimiter {
    pub fn new() -> Self {
        OriginRateLimiter {
            windows: DashMap::new(),
        }
    }

    /// Records one request for `origin` under a sliding window; rejects
    /// once the window holds `RELAY_WINDOW_LIMIT` entries, with
    /// `Retry-After` set to the number of seconds until the window's
    /// oldest entry ages out.
    pub fn check_and_record(&self, origin: &str) -> Result<(), RateLimitExceeded> {
        let now = Utc::now();
        let window_start = now - Duration::seconds(RELAY_WINDOW_SECS);
        let entry = self
            .windows
            .entry(origin.to_string())
            .or_insert_with(|| Mutex::new(VecDeque::new()));
        let mut timestamps = entry.lock().unwrap();
        while timestamps.front().is_some_and(|t| *t < window_start) {
            timestamps.pop_front();
        }
        if timestamps.len() >= RELAY_WINDOW_LIMIT {
            let oldest = *timestamps.front().unwrap();
            let retry_after = (oldest + Duration::seconds(RELAY_WINDOW_SECS) - now)
                .num_seconds()
                .max(1) as u64;
            return Err(RateLimitExceeded {
                retry_after_secs: retry_after,
            });
        }
        timestamps.push_back(now);
        Ok(())
    }
}

impl Default for OriginRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_the_limit_then_rejects() {
        let limiter = OriginRateLimiter::new();
        for _ in 0..RELAY_WINDOW_LIMIT {
            assert!(limiter.check_and_record("SP_ORIGIN").is_ok());
        }
        let result = limiter.check_and_record("SP_ORIGIN");
        assert!(result.is_err());
    }

    #[test]
    fn different_origins_have_independent_windows() {
        let limiter = OriginRateLimiter::new();
        for _ in 0..RELAY_WINDOW_LIMIT {
            limiter.check_and_record("SP_A").unwrap();
        }
        assert!(limiter.check_and_record("SP_B").is_ok());
    }
}
