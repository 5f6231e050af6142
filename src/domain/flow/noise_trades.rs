//! Log-normal noise trade sizes with random direction

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use statrs::distribution::LogNormal;

use crate::shared::errors::SimError;
use crate::shared::types::Trade;

/// Shape of the noise trade size distribution and the daily flow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseTradeParams {
    /// Median trade size, numeraire
    pub median_size: f64,
    /// Sizes between these bounds span two standard deviations of log-size
    pub lower_bound: f64,
    pub upper_bound: f64,
    /// Empirical mean of the distribution above, used to hit the daily volume
    pub approximate_mean: f64,
    /// Upper bound of the expected noise volume per day
    pub expected_volume_per_day: f64,
}

impl Default for NoiseTradeParams {
    fn default() -> Self {
        Self {
            median_size: 50.0,
            lower_bound: 10.0,
            upper_bound: 1000.0,
            approximate_mean: 710.0,
            expected_volume_per_day: 1e6,
        }
    }
}

impl NoiseTradeParams {
    pub fn validate(&self) -> Result<(), SimError> {
        let positive = [
            ("median_size", self.median_size),
            ("lower_bound", self.lower_bound),
            ("upper_bound", self.upper_bound),
            ("approximate_mean", self.approximate_mean),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(SimError::configuration(format!("noise.{} must be positive, got {}", name, value)));
            }
        }
        if self.upper_bound <= self.lower_bound {
            return Err(SimError::configuration("noise.upper_bound must exceed noise.lower_bound"));
        }
        if !self.expected_volume_per_day.is_finite() || self.expected_volume_per_day < 0.0 {
            return Err(SimError::configuration("noise.expected_volume_per_day must be >= 0"));
        }
        Ok(())
    }

    /// Number of trades over `days` that yields about the expected volume
    pub fn trade_count(&self, days: f64) -> usize {
        (self.expected_volume_per_day * days / self.approximate_mean) as usize
    }

    fn log_sigma(&self) -> f64 {
        (self.upper_bound.ln() - self.lower_bound.ln()) / 2.0
    }
}

/// Seeded generator of signed noise trades
pub struct NoiseTradeGenerator {
    params: NoiseTradeParams,
    distribution: LogNormal,
    rng: ChaCha8Rng,
}

impl NoiseTradeGenerator {
    pub fn new(params: NoiseTradeParams, seed: u64) -> Result<Self, SimError> {
        params.validate()?;
        let distribution = LogNormal::new(params.median_size.ln(), params.log_sigma())
            .map_err(|e| SimError::configuration(e.to_string()))?;
        Ok(Self {
            params,
            distribution,
            rng: ChaCha8Rng::seed_from_u64(seed),
        })
    }

    pub fn params(&self) -> &NoiseTradeParams {
        &self.params
    }

    /// `count` unsigned trade sizes
    pub fn sizes(&mut self, count: usize) -> Vec<f64> {
        (0..count).map(|_| self.rng.sample(&self.distribution)).collect()
    }

    /// Trades for `days` of flow; exactly half (rounded down) are sells
    pub fn trades_for_days(&mut self, days: f64) -> Vec<Trade> {
        let count = self.params.trade_count(days);
        let mut sizes = self.sizes(count);

        let mut indices: Vec<usize> = (0..count).collect();
        indices.shuffle(&mut self.rng);
        for &i in &indices[..count / 2] {
            sizes[i] = -sizes[i];
        }
        sizes.into_iter().map(Trade).collect()
    }
}
