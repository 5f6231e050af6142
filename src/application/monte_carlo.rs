//! Monte-Carlo batches of independent trials, run in parallel

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::simulation::{SimulationDriver, TrialRun};
use crate::domain::flow::{NoiseTradeGenerator, NoiseTradeParams};
use crate::domain::price::{GbmParams, GbmPriceFeed, PriceFeed};
use crate::math;
use crate::shared::errors::SimError;
use crate::shared::types::SimulationResult;

/// Base seed used when none is configured
pub const DEFAULT_SEED: u64 = 123_456;

/// What each trial simulates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrialMode {
    /// One pool, arbitrageur only
    ArbitrageOnly,
    /// One pool with noise flow
    SinglePool,
    /// My pool and a competitor sharing the noise flow
    TwoPools,
}

/// Market and batch settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonteCarloParams {
    pub trials: usize,
    pub seed: u64,
    pub blocks: usize,
    pub block_time_sec: f64,
    pub annual_volatility: f64,
    /// Per-block drift of the log price
    pub mu: f64,
    pub noise: NoiseTradeParams,
}

impl Default for MonteCarloParams {
    fn default() -> Self {
        Self {
            trials: 40,
            seed: DEFAULT_SEED,
            blocks: math::seconds_to_blocks(10.0 * math::SECONDS_PER_DAY, 2.0),
            block_time_sec: 2.0,
            annual_volatility: 0.9,
            mu: 0.0,
            noise: NoiseTradeParams::default(),
        }
    }
}

impl MonteCarloParams {
    pub fn validate(&self) -> Result<(), SimError> {
        if self.trials == 0 {
            return Err(SimError::configuration("at least one trial is required"));
        }
        if self.blocks == 0 {
            return Err(SimError::configuration("at least one block is required"));
        }
        if !(self.block_time_sec.is_finite() && self.block_time_sec > 0.0) {
            return Err(SimError::configuration(format!(
                "block time must be positive, got {}",
                self.block_time_sec
            )));
        }
        if !self.annual_volatility.is_finite() || self.annual_volatility < 0.0 {
            return Err(SimError::configuration(format!(
                "volatility must be >= 0, got {}",
                self.annual_volatility
            )));
        }
        self.noise.validate()
    }

    pub fn days(&self) -> f64 {
        self.blocks as f64 * self.block_time_sec / math::SECONDS_PER_DAY
    }

    pub fn sigma_per_block(&self) -> f64 {
        math::volatility_per_block(self.annual_volatility, self.block_time_sec)
    }
}

/// Averages over a batch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrialSummary {
    pub trials: usize,
    pub days: f64,
    pub mean: SimulationResult,
    pub lp_pnl: f64,
    pub lp_pnl_std: f64,
    pub accepted_trades: f64,
    pub rejected_trades: f64,
}

impl TrialSummary {
    pub fn from_runs(runs: &[TrialRun], days: f64) -> Self {
        let n = runs.len().max(1) as f64;
        let mean_of = |f: fn(&TrialRun) -> f64| runs.iter().map(f).sum::<f64>() / n;

        let competitor_volumes: Vec<f64> = runs.iter().filter_map(|r| r.result.competitor_volume).collect();
        let competitor_volume = if competitor_volumes.is_empty() {
            None
        } else {
            Some(competitor_volumes.iter().sum::<f64>() / competitor_volumes.len() as f64)
        };

        let pnls: Vec<f64> = runs.iter().map(|r| r.result.lp_pnl()).collect();
        let (lp_pnl, lp_pnl_std) = math::mean_and_std(&pnls);

        Self {
            trials: runs.len(),
            days,
            mean: SimulationResult {
                lvr: mean_of(|r| r.result.lvr),
                lp_fees: mean_of(|r| r.result.lp_fees),
                lp_fees_from_arbitrage: mean_of(|r| r.result.lp_fees_from_arbitrage),
                volume: mean_of(|r| r.result.volume),
                volume_from_arbitrage: mean_of(|r| r.result.volume_from_arbitrage),
                competitor_volume,
            },
            lp_pnl,
            lp_pnl_std,
            accepted_trades: mean_of(|r| r.accepted_trades as f64),
            rejected_trades: mean_of(|r| r.rejected_trades as f64),
        }
    }

    pub fn per_day(&self, value: f64) -> f64 {
        if self.days > 0.0 {
            value / self.days
        } else {
            0.0
        }
    }

    pub fn lp_pnl_per_day(&self) -> f64 {
        self.per_day(self.lp_pnl)
    }

    pub fn lvr_per_day(&self) -> f64 {
        self.per_day(self.mean.lvr)
    }

    pub fn fees_per_day(&self) -> f64 {
        self.per_day(self.mean.lp_fees)
    }

    pub fn arbitrage_fees_per_day(&self) -> f64 {
        self.per_day(self.mean.lp_fees_from_arbitrage)
    }

    pub fn other_fees_per_day(&self) -> f64 {
        self.per_day(self.mean.lp_fees_other())
    }

    /// Share of noise trades dropped by the price impact filter, percent
    pub fn rejected_pct(&self) -> f64 {
        let total = self.accepted_trades + self.rejected_trades;
        if total > 0.0 {
            100.0 * self.rejected_trades / total
        } else {
            0.0
        }
    }
}

/// Per-trial results and their summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonteCarloOutcome {
    pub mode: TrialMode,
    pub results: Vec<SimulationResult>,
    pub summary: TrialSummary,
}

/// Runs batches of trials for one driver configuration.
///
/// Trial `i` draws its price path and noise flow from stream `i` of a
/// generator seeded with the batch seed, so batches are reproducible no matter
/// how rayon schedules them and different modes see the same markets.
pub struct MonteCarloRunner {
    driver: SimulationDriver,
    params: MonteCarloParams,
}

impl MonteCarloRunner {
    pub fn new(driver: SimulationDriver, params: MonteCarloParams) -> Result<Self, SimError> {
        params.validate()?;
        Ok(Self { driver, params })
    }

    pub fn params(&self) -> &MonteCarloParams {
        &self.params
    }

    pub fn driver(&self) -> &SimulationDriver {
        &self.driver
    }

    pub fn run(&self, mode: TrialMode) -> Result<MonteCarloOutcome, SimError> {
        info!(
            "running {} trials of {} blocks ({:.1} days), mode {:?}, liquidity {:.0}",
            self.params.trials,
            self.params.blocks,
            self.params.days(),
            mode,
            self.driver.params().pool.liquidity
        );

        let runs = (0..self.params.trials)
            .into_par_iter()
            .map(|trial| self.run_trial(trial, mode))
            .collect::<Result<Vec<_>, SimError>>()?;

        let summary = TrialSummary::from_runs(&runs, self.params.days());
        info!(
            "mode {:?}: lvr/day={:.2} fees/day={:.2} pnl/day={:.2} (std {:.2})",
            mode,
            summary.lvr_per_day(),
            summary.fees_per_day(),
            summary.lp_pnl_per_day(),
            summary.per_day(summary.lp_pnl_std)
        );
        Ok(MonteCarloOutcome {
            mode,
            results: runs.into_iter().map(|r| r.result).collect(),
            summary,
        })
    }

    /// One trial, reproducible from the batch seed and its index
    pub fn run_trial(&self, trial: usize, mode: TrialMode) -> Result<TrialRun, SimError> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.params.seed);
        rng.set_stream(trial as u64);
        let price_seed: u64 = rng.gen();
        let noise_seed: u64 = rng.gen();

        let pool = &self.driver.params().pool;
        let mut feed = GbmPriceFeed::new(
            GbmParams {
                blocks: self.params.blocks,
                sigma_per_block: self.params.sigma_per_block(),
                mu: self.params.mu,
                reference_price: pool.reference_price,
                fee_rate: pool.fee_rate,
            },
            price_seed,
        )?;
        let prices = feed.next_path()?;

        let run = match mode {
            TrialMode::ArbitrageOnly => self.driver.run_single(&prices, None)?,
            TrialMode::SinglePool | TrialMode::TwoPools => {
                let trades = NoiseTradeGenerator::new(self.params.noise.clone(), noise_seed)?
                    .trades_for_days(self.params.days());
                if mode == TrialMode::TwoPools {
                    self.driver.run_dual(&prices, &trades)?
                } else {
                    self.driver.run_single(&prices, Some(&trades))?
                }
            }
        };
        debug!("trial {} done: pnl={:.2}", trial, run.result.lp_pnl());
        Ok(run)
    }
}
