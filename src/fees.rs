//! Fee Estimator (C7): caches upstream fee estimates, applies
//! operator-configured floor/ceiling clamps per transaction kind.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use serde::Serialize;

use crate::chain::{ChainClient, FeeEstimates, FeeKind, FeeTiers};

const CACHE_TTL: Duration = Duration::from_secs(60);

#[derive(Debug, thiserror::Error)]
pub enum FeeError {
    #[error("floor must be <= ceiling for {0:?}")]
    FloorAboveCeiling(FeeKind),
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FeeSource {
    Chain,
    Cache,
    Default,
}

#[derive(Debug, Clone, Copy)]
struct Clamp {
    floor: u64,
    ceiling: u64,
}

impl Default for Clamp {
    fn default() -> Self {
        Clamp {
            floor: 0,
            ceiling: u64::MAX,
        }
    }
}

pub struct FeeResponse {
    pub fees: FeeEstimates,
    pub source: FeeSource,
    pub cached: bool,
}

pub struct FeeEstimator {
    chain: Arc<dyn ChainClient>,
    cache: Mutex<Option<(FeeEstimates, chrono::DateTime<Utc>)>>,
    clamps: DashMap<FeeKind, Clamp>,
}

impl FeeEstimator {
    pub fn new(chain: Arc<dyn ChainClient>) -> Self {
        FeeEstimator {
            chain,
            cache: Mutex::new(None),
            clamps: DashMap::new(),
        }
    }

    fn clamp_tiers(&self, kind: FeeKind, tiers: FeeTiers) -> FeeTiers {
        let clamp = self.clamps.get(&kind).map(|c| *c).unwrap_or_default();
        FeeTiers {
            low: tiers.low.clamp(clamp.floor, clamp.ceiling),
            medium: tiers.medium.clamp(clamp.floor, clamp.ceiling),
            high: tiers.high.clamp(clamp.floor, clamp.ceiling),
        }
    }

    fn clamp_all(&self, fees: FeeEstimates) -> FeeEstimates {
        FeeEstimates {
            token_transfer: self.clamp_tiers(FeeKind::TokenTransfer, fees.token_transfer),
            contract_call: self.clamp_tiers(FeeKind::ContractCall, fees.contract_call),
            smart_contract: self.clamp_tiers(FeeKind::SmartContract, fees.smart_contract),
        }
    }

    pub async fn get_fees(&self) -> FeeResponse {
        {
            let cache = self.cache.lock().unwrap();
            if let Some((fees, fetched_at)) = cache.as_ref()
                && Utc::now().signed_duration_since(*fetched_at).to_std().unwrap_or(CACHE_TTL) < CACHE_TTL
            {
                return FeeResponse {
                    fees: self.clamp_all(*fees),
                    source: FeeSource::Cache,
                    cached: true,
                };
            }
        }

        match self.chain.get_fee_estimates().await {
            Ok(fees) => {
                *self.cache.lock().unwrap() = Some((fees, Utc::now()));
                FeeResponse {
                    fees: self.clamp_all(fees),
                    source: FeeSource::Chain,
                    cached: false,
                }
            }
            Err(_) => {
                let default_tiers = FeeTiers {
                    low: 180,
                    medium: 220,
                    high: 400,
                };
                let defaults = FeeEstimates {
                    token_transfer: default_tiers,
                    contract_call: default_tiers,
                    smart_contract: default_tiers,
                };
                FeeResponse {
                    fees: self.clamp_all(defaults),
                    source: FeeSource::Default,
                    cached: false,
                }
            }
        }
    }

    /// Selects the medium-priority fee for `kind`, the priority the
    /// settlement pipeline uses when sponsoring a transaction.
    pub async fn medium_fee_for(&self, kind: FeeKind) -> u64 {
        self.get_fees().await.fees.tiers(kind).medium
    }

    pub fn set_config(&self, kind: FeeKind, floor: u64, ceiling: u64) -> Result<(), FeeError> {
        if floor > ceiling {
            return Err(FeeError::FloorAboveCeiling(kind));
        }
        self.clamps.insert(kind, Clamp { floor, ceiling });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::fake::FakeChainClient;

    #[tokio::test]
    async fn clamps_apply_to_fetched_fees() {
        let chain = Arc::new(FakeChainClient::new());
        let estimator = FeeEstimator::new(chain);
        estimator.set_config(FeeKind::TokenTransfer, 1_500, 1_800).unwrap();
        let response = estimator.get_fees().await;
        assert_eq!(response.fees.token_transfer.low, 1_500);
        assert_eq!(response.fees.token_transfer.medium, 1_800);
    }

    #[test]
    fn rejects_floor_above_ceiling() {
        let chain = Arc::new(FakeChainClient::new());
        let estimator = FeeEstimator::new(chain);
        assert!(estimator.set_config(FeeKind::ContractCall, 10, 5).is_err());
    }
}
