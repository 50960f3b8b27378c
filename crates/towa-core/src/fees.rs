//! Fixed-rate fee estimation.
//!
//! Real network pricing is out of scope; this estimator applies constant
//! exchange rates so the rest of the pipeline has a number to record.

use chrono::Utc;

use crate::defaults::{
    FEE_AR_PER_BYTE, FEE_AR_TO_USD, FEE_BUFFER_MULTIPLIER, FEE_NETWORK, FEE_USD_TO_JPY,
};
use crate::models::{round_to, FeeCost, FeeEstimate, FeeRates, LetterCost};
use crate::traits::FeeEstimator;

/// Fee estimator with constant rates and a safety buffer.
#[derive(Debug, Clone)]
pub struct FixedRateFeeEstimator {
    pub rates: FeeRates,
    pub buffer_multiplier: f64,
    pub network: String,
}

impl Default for FixedRateFeeEstimator {
    fn default() -> Self {
        Self {
            rates: FeeRates {
                ar_per_byte: FEE_AR_PER_BYTE,
                ar_to_usd: FEE_AR_TO_USD,
                usd_to_jpy: FEE_USD_TO_JPY,
            },
            buffer_multiplier: FEE_BUFFER_MULTIPLIER,
            network: FEE_NETWORK.to_string(),
        }
    }
}

impl FeeEstimator for FixedRateFeeEstimator {
    fn estimate(&self, bytes: u64) -> FeeEstimate {
        let ar = bytes as f64 * self.rates.ar_per_byte;
        let usd = ar * self.rates.ar_to_usd;
        let jpy = usd * self.rates.usd_to_jpy;

        FeeEstimate {
            bytes,
            cost: FeeCost {
                ar: round_to(ar * self.buffer_multiplier, 6),
                usd: round_to(usd * self.buffer_multiplier, 2),
                jpy: round_to(jpy * self.buffer_multiplier, 0),
            },
            rates: self.rates,
            network: self.network.clone(),
            timestamp: Utc::now(),
        }
    }
}

impl From<&FeeEstimate> for LetterCost {
    fn from(estimate: &FeeEstimate) -> Self {
        LetterCost {
            ar: estimate.cost.ar,
            fiat: estimate.cost.usd,
        }
    }
}
