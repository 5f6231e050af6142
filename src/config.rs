use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

use crate::application::monte_carlo::{MonteCarloParams, DEFAULT_SEED};
use crate::application::simulation::{DriverParams, DEFAULT_COMPETITOR_LIQUIDITY};
use crate::domain::flow::NoiseTradeParams;
use crate::domain::pool::{PoolParams, DEFAULT_BASE_FEE, DEFAULT_FEE_PIPS, DEFAULT_LIQUIDITY};
use crate::domain::routing::SMALL_SWAP_SIZE;
use crate::math;
use crate::shared::errors::SimError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolCfg {
    pub fee_pips: u32,
    pub base_fee: f64,
    pub reference_price: f64,
    pub liquidity: f64,
}

impl Default for PoolCfg {
    fn default() -> Self {
        Self {
            fee_pips: DEFAULT_FEE_PIPS,
            base_fee: DEFAULT_BASE_FEE,
            reference_price: math::REFERENCE_PRICE,
            liquidity: DEFAULT_LIQUIDITY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketCfg {
    pub block_time_sec: f64,
    pub annual_volatility: f64,
    pub mu: f64,
}

impl Default for MarketCfg {
    fn default() -> Self {
        Self {
            block_time_sec: 2.0,
            annual_volatility: 0.9,
            mu: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationCfg {
    pub duration_days: f64,
    pub trials: usize,
    pub seed: u64,
    pub max_price_impact_pct: f64,
    pub competitor_liquidity: f64,
    pub small_swap_size: f64,
}

impl Default for SimulationCfg {
    fn default() -> Self {
        Self {
            duration_days: 10.0,
            trials: 40,
            seed: DEFAULT_SEED,
            max_price_impact_pct: 0.01,
            competitor_liquidity: DEFAULT_COMPETITOR_LIQUIDITY,
            small_swap_size: SMALL_SWAP_SIZE,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub pool: PoolCfg,
    pub market: MarketCfg,
    pub simulation: SimulationCfg,
    pub noise: NoiseTradeParams,
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let s = fs::read_to_string(path.as_ref())
            .with_context(|| format!("read {}", path.as_ref().display()))?;
        let cfg: Self = toml::from_str(&s).context("parse Config.toml")?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), SimError> {
        if self.pool.fee_pips >= 1_000_000 {
            return Err(SimError::configuration(format!(
                "pool.fee_pips must be below 1000000, got {}",
                self.pool.fee_pips
            )));
        }
        if !(self.simulation.duration_days.is_finite() && self.simulation.duration_days > 0.0) {
            return Err(SimError::configuration(format!(
                "simulation.duration_days must be positive, got {}",
                self.simulation.duration_days
            )));
        }
        self.driver_params().validate()?;
        self.monte_carlo_params().validate()?;
        // build a throwaway pool to check fees, liquidity and price together
        crate::domain::pool::Pool::new(&self.driver_params().pool)?;
        Ok(())
    }

    /// CLI flags take priority over the file
    pub fn apply_overrides(&mut self, seed: Option<u64>, trials: Option<usize>, liquidity: Option<f64>) {
        if let Some(seed) = seed {
            self.simulation.seed = seed;
        }
        if let Some(trials) = trials {
            self.simulation.trials = trials;
        }
        if let Some(liquidity) = liquidity {
            self.pool.liquidity = liquidity;
        }
    }

    pub fn pool_params(&self) -> PoolParams {
        PoolParams {
            fee_rate: math::pips_to_rate(self.pool.fee_pips),
            base_fee: self.pool.base_fee,
            liquidity: self.pool.liquidity,
            reference_price: self.pool.reference_price,
        }
    }

    pub fn driver_params(&self) -> DriverParams {
        DriverParams {
            pool: self.pool_params(),
            competitor_liquidity: self.simulation.competitor_liquidity,
            max_price_impact: self.simulation.max_price_impact_pct / 100.0,
            small_swap_size: self.simulation.small_swap_size,
        }
    }

    pub fn monte_carlo_params(&self) -> MonteCarloParams {
        MonteCarloParams {
            trials: self.simulation.trials,
            seed: self.simulation.seed,
            blocks: math::seconds_to_blocks(
                self.simulation.duration_days * math::SECONDS_PER_DAY,
                self.market.block_time_sec,
            ),
            block_time_sec: self.market.block_time_sec,
            annual_volatility: self.market.annual_volatility,
            mu: self.market.mu,
            noise: self.noise.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_setup() {
        let cfg = Config::default();
        assert!(cfg.validate().is_ok());

        let driver = cfg.driver_params();
        assert_eq!(driver.pool.fee_rate, 0.0005);
        assert_eq!(driver.pool.base_fee, 0.1);
        assert!((driver.max_price_impact - 0.0001).abs() < 1e-15);
        assert_eq!(driver.competitor_liquidity, 2e6);

        let mc = cfg.monte_carlo_params();
        assert_eq!(mc.blocks, 432_000);
        assert_eq!(mc.trials, 40);
        assert_eq!(mc.days(), 10.0);
        assert_eq!(mc.seed, MonteCarloParams::default().seed);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let cfg: Config = toml::from_str(
            r#"
            [pool]
            liquidity = 5e6

            [simulation]
            trials = 8
            "#,
        )
        .unwrap();
        assert_eq!(cfg.pool.liquidity, 5e6);
        assert_eq!(cfg.pool.fee_pips, 500);
        assert_eq!(cfg.simulation.trials, 8);
        assert_eq!(cfg.market.block_time_sec, 2.0);
        assert_eq!(cfg.noise.median_size, 50.0);
    }

    #[test]
    fn test_cli_overrides() {
        let mut cfg = Config::default();
        cfg.apply_overrides(Some(7), None, Some(1e6));
        assert_eq!(cfg.simulation.seed, 7);
        assert_eq!(cfg.simulation.trials, 40);
        assert_eq!(cfg.pool.liquidity, 1e6);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut cfg = Config::default();
        cfg.pool.liquidity = 0.0;
        assert!(cfg.validate().is_err());

        let mut cfg = Config::default();
        cfg.pool.base_fee = -1.0;
        assert!(matches!(cfg.validate(), Err(SimError::Configuration(_))));

        let mut cfg = Config::default();
        cfg.simulation.trials = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = Config::default();
        cfg.pool.fee_pips = 1_000_000;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_from_file_reports_missing_path() {
        let err = Config::from_file("/nonexistent/lvrsim.toml").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/lvrsim.toml"));
    }

    #[test]
    fn test_cli_override_repairs_file_values() {
        let path = std::env::temp_dir().join(format!("lvrsim-{}.toml", std::process::id()));
        fs::write(&path, "[simulation]\ntrials = 0\n").unwrap();
        let mut cfg = Config::from_file(&path).unwrap();
        fs::remove_file(&path).unwrap();

        assert!(cfg.validate().is_err());
        cfg.apply_overrides(None, Some(5), None);
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.simulation.trials, 5);
    }
}
