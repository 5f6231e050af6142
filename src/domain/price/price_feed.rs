//! Price feed implementations

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use statrs::distribution::Normal;

use super::PricePath;
use crate::math;
use crate::shared::errors::SimError;

/// Price feed interface
pub trait PriceFeed {
    fn next_path(&mut self) -> Result<PricePath, SimError>;
}

/// Geometric Brownian motion parameters, per block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GbmParams {
    pub blocks: usize,
    pub sigma_per_block: f64,
    pub mu: f64,
    pub reference_price: f64,
    /// Fee of the pool the path is generated for. The first price is drawn
    /// uniformly from that pool's initial no-arbitrage band.
    pub fee_rate: f64,
}

impl GbmParams {
    pub fn validate(&self) -> Result<(), SimError> {
        if self.blocks == 0 {
            return Err(SimError::configuration("price path needs at least one block"));
        }
        if !self.sigma_per_block.is_finite() || self.sigma_per_block < 0.0 {
            return Err(SimError::configuration(format!(
                "volatility must be >= 0, got {}",
                self.sigma_per_block
            )));
        }
        if !(self.reference_price.is_finite() && self.reference_price > 0.0) {
            return Err(SimError::configuration(format!(
                "reference price must be positive, got {}",
                self.reference_price
            )));
        }
        if !(0.0..1.0).contains(&self.fee_rate) {
            return Err(SimError::configuration(format!("fee rate must be in [0, 1), got {}", self.fee_rate)));
        }
        Ok(())
    }
}

/// Seeded GBM path generator
pub struct GbmPriceFeed {
    params: GbmParams,
    rng: ChaCha8Rng,
    normal: Normal,
}

impl GbmPriceFeed {
    pub fn new(params: GbmParams, seed: u64) -> Result<Self, SimError> {
        params.validate()?;
        let normal = Normal::new(0.0, 1.0).map_err(|e| SimError::configuration(e.to_string()))?;
        Ok(Self {
            params,
            rng: ChaCha8Rng::seed_from_u64(seed),
            normal,
        })
    }

    pub fn params(&self) -> &GbmParams {
        &self.params
    }
}

impl PriceFeed for GbmPriceFeed {
    fn next_path(&mut self) -> Result<PricePath, SimError> {
        let p = &self.params;
        let fee_factor = math::fee_factor(p.fee_rate);
        let drift = p.mu - p.sigma_per_block.powi(2) / 2.0;

        let mut prices = Vec::with_capacity(p.blocks);
        let mut level = if fee_factor > 1.0 {
            self.rng.gen_range(1.0 / fee_factor..fee_factor)
        } else {
            1.0
        };
        prices.push(p.reference_price * level);
        for _ in 1..p.blocks {
            let z: f64 = self.rng.sample(&self.normal);
            level *= (drift + p.sigma_per_block * z).exp();
            prices.push(p.reference_price * level);
        }
        PricePath::new(prices)
    }
}

/// Replays fixed paths in order, wrapping around
pub struct ReplayPriceFeed {
    paths: Vec<PricePath>,
    next: usize,
}

impl ReplayPriceFeed {
    pub fn new(paths: Vec<PricePath>) -> Result<Self, SimError> {
        if paths.is_empty() {
            return Err(SimError::configuration("replay feed needs at least one path"));
        }
        Ok(Self { paths, next: 0 })
    }
}

impl PriceFeed for ReplayPriceFeed {
    fn next_path(&mut self) -> Result<PricePath, SimError> {
        let path = self.paths[self.next % self.paths.len()].clone();
        self.next += 1;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(blocks: usize) -> GbmParams {
        GbmParams {
            blocks,
            sigma_per_block: math::volatility_per_block(0.9, 2.0),
            mu: 0.0,
            reference_price: 3000.0,
            fee_rate: 0.0005,
        }
    }

    #[test]
    fn test_gbm_path_shape() {
        let mut feed = GbmPriceFeed::new(params(1_000), 7).unwrap();
        let path = feed.next_path().unwrap();
        assert_eq!(path.len(), 1_000);
        assert!(path.prices().iter().all(|p| *p > 0.0));
        // first price inside the initial no-arbitrage band
        let ff = math::fee_factor(0.0005);
        assert!(path.first() >= 3000.0 / ff && path.first() <= 3000.0 * ff);
    }

    #[test]
    fn test_gbm_seed_determinism() {
        let a = GbmPriceFeed::new(params(200), 42).unwrap().next_path().unwrap();
        let b = GbmPriceFeed::new(params(200), 42).unwrap().next_path().unwrap();
        let c = GbmPriceFeed::new(params(200), 43).unwrap().next_path().unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_zero_volatility_is_flat() {
        let mut p = params(50);
        p.sigma_per_block = 0.0;
        let path = GbmPriceFeed::new(p, 1).unwrap().next_path().unwrap();
        assert!(path.prices().iter().all(|x| *x == path.first()));
    }

    #[test]
    fn test_invalid_params() {
        assert!(GbmPriceFeed::new(params(0), 1).is_err());
        let mut p = params(10);
        p.sigma_per_block = -0.1;
        assert!(GbmPriceFeed::new(p, 1).is_err());
    }

    #[test]
    fn test_replay_feed_wraps() {
        let a = PricePath::constant(3000.0, 3).unwrap();
        let b = PricePath::constant(3100.0, 3).unwrap();
        let mut feed = ReplayPriceFeed::new(vec![a.clone(), b.clone()]).unwrap();
        assert_eq!(feed.next_path().unwrap(), a);
        assert_eq!(feed.next_path().unwrap(), b);
        assert_eq!(feed.next_path().unwrap(), a);
        assert!(ReplayPriceFeed::new(vec![]).is_err());
    }
}
