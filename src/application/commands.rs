//! CLI commands and handlers
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

use crate::application::experiments::{ExperimentRunner, LiquidityGrid, VOLUME_SAMPLE_SIZE};
use crate::application::monte_carlo::{MonteCarloRunner, TrialMode};
use crate::application::simulation::SimulationDriver;
use crate::config::Config;
use crate::report::{BatchReport, ReportBody, SimulationReport};
use crate::shared::errors::AppError;

#[derive(Parser, Debug)]
#[command(name = "lvrsim")]
#[command(version, about = "Constant-product AMM simulator: LP fees against loss-versus-rebalancing")]
pub struct Cli {
    /// Path to config file (optional)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Base RNG seed (overrides config)
    #[arg(long, global = true)]
    pub seed: Option<u64>,

    /// Monte-Carlo trials per point (overrides config)
    #[arg(long, global = true)]
    pub trials: Option<usize>,

    /// Write the report as JSON to this file
    #[arg(long, global = true)]
    pub output: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Max swap size, accepted noise volume and rejected share against liquidity
    Volume {
        /// Points on the liquidity grid
        #[arg(short, long, default_value_t = 100)]
        points: usize,

        /// Noise trades in the sample
        #[arg(short, long, default_value_t = VOLUME_SAMPLE_SIZE)]
        sample: usize,
    },

    /// LP revenue and costs for a pool alone in the market
    Revenue {
        /// Points on the liquidity sweep
        #[arg(short, long, default_value_t = 40)]
        points: usize,
    },

    /// My pool against a competing pool
    Compete {
        /// Points on the liquidity sweep
        #[arg(short, long, default_value_t = 40)]
        points: usize,
    },

    /// One Monte-Carlo batch
    Run {
        /// Pool liquidity (overrides config)
        #[arg(short, long)]
        liquidity: Option<f64>,

        /// Share the noise flow with a competing pool
        #[arg(long)]
        two_pools: bool,

        /// Arbitrageur only, no noise flow
        #[arg(long, conflicts_with = "two_pools")]
        arb_only: bool,
    },
}

pub struct CommandExecutor;

impl CommandExecutor {
    /// Execute the selected command
    pub fn execute(cli: Cli) -> Result<SimulationReport, AppError> {
        let mut config = match &cli.config {
            Some(path) => Config::from_file(path).map_err(|e| AppError::ConfigError(format!("{:#}", e)))?,
            None => Config::default(),
        };
        let liquidity = match &cli.command {
            Commands::Run { liquidity, .. } => *liquidity,
            _ => None,
        };
        config.apply_overrides(cli.seed, cli.trials, liquidity);
        config.validate()?;

        let body = match cli.command {
            Commands::Volume { points, sample } => Self::execute_volume_command(&config, points, sample)?,
            Commands::Revenue { points } => Self::execute_revenue_command(&config, points)?,
            Commands::Compete { points } => Self::execute_compete_command(&config, points)?,
            Commands::Run { two_pools, arb_only, .. } => Self::execute_run_command(&config, two_pools, arb_only)?,
        };

        let report = SimulationReport::new(config.simulation.seed, config.simulation.trials, body);
        report.log_tables();
        if let Some(path) = &cli.output {
            report.write_to_file(path)?;
        }
        Ok(report)
    }

    fn experiments(config: &Config) -> Result<ExperimentRunner, AppError> {
        Ok(ExperimentRunner::new(config.driver_params(), config.monte_carlo_params())?)
    }

    fn execute_volume_command(config: &Config, points: usize, sample: usize) -> Result<ReportBody, AppError> {
        info!("🔍 Liquidity against accepted noise volume ({} points)", points);
        let report = Self::experiments(config)?.liquidity_vs_volume(LiquidityGrid::volume().with_points(points), sample)?;
        Ok(ReportBody::Volume(report))
    }

    fn execute_revenue_command(config: &Config, points: usize) -> Result<ReportBody, AppError> {
        info!("📊 Revenue and costs, {} trials per point", config.simulation.trials);
        let report = Self::experiments(config)?.revenue_and_costs(LiquidityGrid::sweep().with_points(points))?;
        Ok(ReportBody::Revenue(report))
    }

    fn execute_compete_command(config: &Config, points: usize) -> Result<ReportBody, AppError> {
        info!(
            "🎯 Competing pools, competitor liquidity {:.0}, {} trials per point",
            config.simulation.competitor_liquidity, config.simulation.trials
        );
        let report = Self::experiments(config)?.competing_pools(LiquidityGrid::sweep().with_points(points))?;
        Ok(ReportBody::Competition(report))
    }

    fn execute_run_command(config: &Config, two_pools: bool, arb_only: bool) -> Result<ReportBody, AppError> {
        let mode = if two_pools {
            TrialMode::TwoPools
        } else if arb_only {
            TrialMode::ArbitrageOnly
        } else {
            TrialMode::SinglePool
        };
        let driver = SimulationDriver::new(config.driver_params())?;
        let outcome = MonteCarloRunner::new(driver, config.monte_carlo_params())?.run(mode)?;
        Ok(ReportBody::Batch(BatchReport {
            liquidity: config.pool.liquidity,
            mode,
            competitor_liquidity: two_pools.then_some(config.simulation.competitor_liquidity),
            summary: outcome.summary,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_global_flags() {
        let cli = Cli::try_parse_from(["lvrsim", "run", "--two-pools", "--seed", "5", "-l", "1e6"]).unwrap();
        assert_eq!(cli.seed, Some(5));
        match cli.command {
            Commands::Run { liquidity, two_pools, arb_only } => {
                assert_eq!(liquidity, Some(1e6));
                assert!(two_pools);
                assert!(!arb_only);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_cli_rejects_conflicting_modes() {
        assert!(Cli::try_parse_from(["lvrsim", "run", "--two-pools", "--arb-only"]).is_err());
    }

    #[test]
    fn test_volume_command_runs() {
        let cli = Cli::try_parse_from(["lvrsim", "volume", "--points", "4", "--sample", "1000"]).unwrap();
        let report = CommandExecutor::execute(cli).unwrap();
        match report.body {
            ReportBody::Volume(volume) => assert_eq!(volume.rows.len(), 8),
            other => panic!("unexpected body {:?}", other),
        }
    }

    #[test]
    fn test_invalid_override_is_rejected() {
        let cli = Cli::try_parse_from(["lvrsim", "--trials", "0", "run"]).unwrap();
        assert!(matches!(
            CommandExecutor::execute(cli),
            Err(AppError::SimulationError(_))
        ));
    }
}
