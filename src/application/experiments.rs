//! Parameter sweeps behind the volume, revenue and competition reports

use serde::{Deserialize, Serialize};
use tracing::info;

use super::monte_carlo::{MonteCarloParams, MonteCarloRunner, TrialMode, TrialSummary};
use super::simulation::{DriverParams, SimulationDriver};
use crate::domain::flow::NoiseTradeGenerator;
use crate::math;
use crate::shared::errors::SimError;
use crate::shared::utils::log_space;

/// Price impacts, in percent, compared in the volume report
pub const TESTED_PRICE_IMPACTS_PCT: [f64; 2] = [0.01, 0.1];
/// Noise trade sizes drawn for the volume report
pub const VOLUME_SAMPLE_SIZE: usize = 1_000_000;
/// Liquidities of the arbitrage-only runs
pub const ARBITRAGE_ONLY_LIQUIDITIES: [f64; 2] = [5e6, 1e7];
/// Liquidities of the revenue breakdowns
pub const REVENUE_LIQUIDITIES: [f64; 2] = [1e6, 1e7];

/// Log-spaced liquidity grid, `10^min_exp ..= 10^max_exp`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LiquidityGrid {
    pub min_exp: f64,
    pub max_exp: f64,
    pub points: usize,
}

impl LiquidityGrid {
    /// Grid of the volume report
    pub fn volume() -> Self {
        Self {
            min_exp: 4.0,
            max_exp: 8.0,
            points: 100,
        }
    }

    /// Grid of the Monte-Carlo sweeps
    pub fn sweep() -> Self {
        Self {
            min_exp: 4.0,
            max_exp: 7.5,
            points: 40,
        }
    }

    pub fn with_points(mut self, points: usize) -> Self {
        self.points = points;
        self
    }

    pub fn values(&self) -> Vec<f64> {
        log_space(self.min_exp, self.max_exp, self.points)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeRow {
    pub liquidity: f64,
    pub max_price_impact_pct: f64,
    pub max_swap_size: f64,
    pub accepted_volume: f64,
    pub rejected_pct: f64,
}

/// How much of a fixed noise sample a pool of each size accepts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeReport {
    pub sample_size: usize,
    pub total_volume: f64,
    pub rows: Vec<VolumeRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PnlRow {
    pub liquidity: f64,
    pub lvr_per_day: f64,
    pub fees_per_day: f64,
    pub pnl_per_day: f64,
    pub pnl_std_per_day: f64,
    /// Closed-form LVR-net-of-fees estimate, arbitrage-only rows
    pub analytic_pnl_per_day: Option<f64>,
}

impl PnlRow {
    fn from_summary(liquidity: f64, summary: &TrialSummary) -> Self {
        Self {
            liquidity,
            lvr_per_day: summary.lvr_per_day(),
            fees_per_day: summary.fees_per_day(),
            pnl_per_day: summary.lp_pnl_per_day(),
            pnl_std_per_day: summary.per_day(summary.lp_pnl_std),
            analytic_pnl_per_day: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenueRow {
    pub liquidity: f64,
    pub total_per_day: f64,
    pub arbitrage_per_day: f64,
    pub other_per_day: f64,
}

impl RevenueRow {
    fn from_summary(liquidity: f64, summary: &TrialSummary) -> Self {
        Self {
            liquidity,
            total_per_day: summary.fees_per_day(),
            arbitrage_per_day: summary.arbitrage_fees_per_day(),
            other_per_day: summary.other_fees_per_day(),
        }
    }
}

/// LP revenue against LVR for a pool alone in the market
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenueReport {
    pub days: f64,
    pub arbitrage_only: Vec<PnlRow>,
    pub revenue: Vec<RevenueRow>,
    pub pnl_sweep: Vec<PnlRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetitionRow {
    pub liquidity: f64,
    pub pnl_per_day_single: f64,
    pub pnl_per_day_two_pools: f64,
    pub market_share_pct: f64,
    pub apr_mine_pct: f64,
    pub apr_other_pct: f64,
    pub apr_single_pct: f64,
}

/// My pool against a fixed-size competitor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetitionReport {
    pub days: f64,
    pub competitor_liquidity: f64,
    pub revenue: Vec<RevenueRow>,
    pub rows: Vec<CompetitionRow>,
}

/// Fee APR in percent of `volume` traded over `days` against `liquidity`
pub fn fee_apr_pct(volume: f64, fee_rate: f64, liquidity: f64, days: f64) -> f64 {
    if liquidity <= 0.0 || days <= 0.0 {
        return 0.0;
    }
    100.0 * 365.0 / days * volume * fee_rate / liquidity
}

/// Runs the sweeps with shared driver and batch settings
pub struct ExperimentRunner {
    driver: DriverParams,
    batch: MonteCarloParams,
}

impl ExperimentRunner {
    pub fn new(driver: DriverParams, batch: MonteCarloParams) -> Result<Self, SimError> {
        driver.validate()?;
        batch.validate()?;
        Ok(Self { driver, batch })
    }

    fn runner(&self, liquidity: f64) -> Result<MonteCarloRunner, SimError> {
        let driver = SimulationDriver::new(self.driver.clone().with_liquidity(liquidity))?;
        MonteCarloRunner::new(driver, self.batch.clone())
    }

    fn summary(&self, liquidity: f64, mode: TrialMode) -> Result<TrialSummary, SimError> {
        Ok(self.runner(liquidity)?.run(mode)?.summary)
    }

    /// Max accepted swap, accepted volume and rejected share against liquidity
    pub fn liquidity_vs_volume(&self, grid: LiquidityGrid, sample_size: usize) -> Result<VolumeReport, SimError> {
        let mut sizes = NoiseTradeGenerator::new(self.batch.noise.clone(), self.batch.seed)?.sizes(sample_size);
        sizes.sort_by(f64::total_cmp);
        let total_volume: f64 = sizes.iter().sum();
        info!("noise sample: {} trades, {:.1}M total volume", sample_size, total_volume / 1e6);

        let mut rows = Vec::new();
        for impact_pct in TESTED_PRICE_IMPACTS_PCT {
            for liquidity in grid.values() {
                let max_swap_size =
                    math::swap_size_from_liquidity(liquidity, impact_pct / 100.0, self.driver.pool.reference_price);
                // sizes are sorted: everything before the cut is accepted
                let cut = sizes.partition_point(|s| *s < max_swap_size);
                let rejected_pct = if sizes.is_empty() {
                    0.0
                } else {
                    100.0 * (1.0 - cut as f64 / sizes.len() as f64)
                };
                rows.push(VolumeRow {
                    liquidity,
                    max_price_impact_pct: impact_pct,
                    max_swap_size,
                    accepted_volume: sizes[..cut].iter().sum(),
                    rejected_pct,
                });
            }
        }
        Ok(VolumeReport {
            sample_size,
            total_volume,
            rows,
        })
    }

    /// Arbitrage-only PnL, revenue breakdowns and PnL across a liquidity sweep
    pub fn revenue_and_costs(&self, grid: LiquidityGrid) -> Result<RevenueReport, SimError> {
        let analytic_loss_rate = math::lvr_with_fees_per_day(
            self.batch.sigma_per_block(),
            self.batch.block_time_sec,
            self.driver.pool.fee_rate,
        );

        let mut arbitrage_only = Vec::new();
        for liquidity in ARBITRAGE_ONLY_LIQUIDITIES {
            let summary = self.summary(liquidity, TrialMode::ArbitrageOnly)?;
            let mut row = PnlRow::from_summary(liquidity, &summary);
            row.analytic_pnl_per_day = Some(-analytic_loss_rate * liquidity);
            arbitrage_only.push(row);
        }

        let mut revenue = Vec::new();
        for liquidity in REVENUE_LIQUIDITIES {
            let summary = self.summary(liquidity, TrialMode::SinglePool)?;
            revenue.push(RevenueRow::from_summary(liquidity, &summary));
        }

        let mut pnl_sweep = Vec::new();
        for liquidity in grid.values() {
            let summary = self.summary(liquidity, TrialMode::SinglePool)?;
            pnl_sweep.push(PnlRow::from_summary(liquidity, &summary));
        }

        Ok(RevenueReport {
            days: self.batch.days(),
            arbitrage_only,
            revenue,
            pnl_sweep,
        })
    }

    /// Revenue with a competitor, then single against two-pool PnL, market
    /// share and APR across a liquidity sweep
    pub fn competing_pools(&self, grid: LiquidityGrid) -> Result<CompetitionReport, SimError> {
        let days = self.batch.days();
        let fee_rate = self.driver.pool.fee_rate;
        let competitor_liquidity = self.driver.competitor_liquidity;

        let mut revenue = Vec::new();
        for liquidity in REVENUE_LIQUIDITIES {
            let summary = self.summary(liquidity, TrialMode::TwoPools)?;
            revenue.push(RevenueRow::from_summary(liquidity, &summary));
        }

        let mut rows = Vec::new();
        for liquidity in grid.values() {
            let runner = self.runner(liquidity)?;
            let two_pools = runner.run(TrialMode::TwoPools)?.summary;
            let single = runner.run(TrialMode::SinglePool)?.summary;

            let volume_mine = two_pools.mean.volume;
            let volume_other = two_pools.mean.competitor_volume.unwrap_or(0.0);
            let market_share_pct = if volume_mine + volume_other > 0.0 {
                100.0 * volume_mine / (volume_mine + volume_other)
            } else {
                0.0
            };
            let row = CompetitionRow {
                liquidity,
                pnl_per_day_single: single.lp_pnl_per_day(),
                pnl_per_day_two_pools: two_pools.lp_pnl_per_day(),
                market_share_pct,
                apr_mine_pct: fee_apr_pct(volume_mine, fee_rate, liquidity, days),
                apr_other_pct: fee_apr_pct(volume_other, fee_rate, competitor_liquidity, days),
                apr_single_pct: fee_apr_pct(single.mean.volume, fee_rate, liquidity, days),
            };
            info!(
                "liquidity {:.0}: share {:.1}% APR mine {:.2}% other {:.2}%",
                liquidity, row.market_share_pct, row.apr_mine_pct, row.apr_other_pct
            );
            rows.push(row);
        }

        Ok(CompetitionReport {
            days,
            competitor_liquidity,
            revenue,
            rows,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn experiments() -> ExperimentRunner {
        let batch = MonteCarloParams {
            trials: 2,
            blocks: 1_500,
            ..MonteCarloParams::default()
        };
        ExperimentRunner::new(DriverParams::default(), batch).unwrap()
    }

    fn tiny_grid() -> LiquidityGrid {
        LiquidityGrid {
            min_exp: 5.0,
            max_exp: 6.0,
            points: 2,
        }
    }

    #[test]
    fn test_fee_apr() {
        // 1M volume a day at 5 bps on 1M liquidity: 0.05 % a day
        assert_approx_eq!(fee_apr_pct(10e6, 0.0005, 1e6, 10.0), 18.25, 1e-9);
        assert_eq!(fee_apr_pct(1.0, 0.0005, 0.0, 10.0), 0.0);
    }

    #[test]
    fn test_grids() {
        let values = LiquidityGrid::sweep().values();
        assert_eq!(values.len(), 40);
        assert_approx_eq!(values[0], 1e4, 1e-6);
        assert_approx_eq!(values[39] / 10f64.powf(7.5), 1.0, 1e-9);
        assert_eq!(LiquidityGrid::volume().with_points(5).values().len(), 5);
    }

    #[test]
    fn test_volume_report_monotone() {
        let report = experiments().liquidity_vs_volume(LiquidityGrid::volume().with_points(10), 20_000).unwrap();
        assert_eq!(report.rows.len(), 20);
        for pair in report.rows.windows(2) {
            if pair[0].max_price_impact_pct == pair[1].max_price_impact_pct {
                assert!(pair[1].accepted_volume >= pair[0].accepted_volume);
                assert!(pair[1].rejected_pct <= pair[0].rejected_pct);
            }
        }
        assert!(report.rows.iter().all(|r| r.accepted_volume <= report.total_volume));
    }

    #[test]
    fn test_revenue_report_shape() {
        let report = experiments().revenue_and_costs(tiny_grid()).unwrap();
        assert_eq!(report.arbitrage_only.len(), 2);
        assert!(report.arbitrage_only.iter().all(|r| r.analytic_pnl_per_day.unwrap() < 0.0));
        assert_eq!(report.revenue.len(), 2);
        for row in &report.revenue {
            assert_approx_eq!(row.total_per_day, row.arbitrage_per_day + row.other_per_day, 1e-9);
        }
        assert_eq!(report.pnl_sweep.len(), 2);
    }

    #[test]
    fn test_competition_report_shape() {
        let report = experiments().competing_pools(tiny_grid()).unwrap();
        assert_eq!(report.competitor_liquidity, 2e6);
        assert_eq!(report.rows.len(), 2);
        for row in &report.rows {
            assert!(row.market_share_pct >= 0.0 && row.market_share_pct <= 100.0);
            assert!(row.apr_mine_pct >= 0.0 && row.apr_other_pct >= 0.0);
        }
    }
}
