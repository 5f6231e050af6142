// src/report.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};
use tracing::info;

use crate::application::experiments::{CompetitionReport, RevenueReport, VolumeReport};
use crate::application::monte_carlo::{TrialMode, TrialSummary};
use crate::shared::errors::AppError;
use crate::shared::utils::{format_usd, generate_id};

/// One Monte-Carlo batch at a fixed liquidity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub liquidity: f64,
    pub mode: TrialMode,
    pub competitor_liquidity: Option<f64>,
    pub summary: TrialSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReportBody {
    Volume(VolumeReport),
    Revenue(RevenueReport),
    Competition(CompetitionReport),
    Batch(BatchReport),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationReport {
    pub run_id: String,
    pub seed: u64,
    pub trials: usize,
    pub body: ReportBody,

    // Метаданные
    pub timestamp: DateTime<Utc>,
}

impl SimulationReport {
    pub fn new(seed: u64, trials: usize, body: ReportBody) -> Self {
        Self {
            run_id: generate_id(),
            seed,
            trials,
            body,
            timestamp: Utc::now(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), AppError> {
        fs::write(path.as_ref(), self.to_json()?)?;
        info!("report {} written to {}", self.run_id, path.as_ref().display());
        Ok(())
    }

    /// Print the report body as tables through the log
    pub fn log_tables(&self) {
        info!("run {} (seed {}, {} trials)", self.run_id, self.seed, self.trials);
        match &self.body {
            ReportBody::Volume(report) => {
                info!(
                    "noise sample: {} trades, total volume {}",
                    report.sample_size,
                    format_usd(report.total_volume)
                );
                info!("{:>14} {:>8} {:>14} {:>18} {:>10}", "liquidity", "impact%", "max swap", "accepted volume", "rejected%");
                for row in &report.rows {
                    info!(
                        "{:>14} {:>8.2} {:>14} {:>18} {:>10.2}",
                        format_usd(row.liquidity),
                        row.max_price_impact_pct,
                        format_usd(row.max_swap_size),
                        format_usd(row.accepted_volume),
                        row.rejected_pct
                    );
                }
            }
            ReportBody::Revenue(report) => {
                info!("arbitrage only, {:.1} days:", report.days);
                for row in &report.arbitrage_only {
                    info!(
                        "  liquidity {}: pnl/day {} (analytic {}), lvr/day {}, fees/day {}",
                        format_usd(row.liquidity),
                        format_usd(row.pnl_per_day),
                        format_usd(row.analytic_pnl_per_day.unwrap_or(0.0)),
                        format_usd(row.lvr_per_day),
                        format_usd(row.fees_per_day)
                    );
                }
                log_revenue("revenue per day, single pool:", &report.revenue);
                info!("{:>14} {:>14} {:>14} {:>14}", "liquidity", "pnl/day", "std/day", "lvr/day");
                for row in &report.pnl_sweep {
                    info!(
                        "{:>14} {:>14} {:>14} {:>14}",
                        format_usd(row.liquidity),
                        format_usd(row.pnl_per_day),
                        format_usd(row.pnl_std_per_day),
                        format_usd(row.lvr_per_day)
                    );
                }
            }
            ReportBody::Competition(report) => {
                info!(
                    "competitor liquidity {}, {:.1} days",
                    format_usd(report.competitor_liquidity),
                    report.days
                );
                log_revenue("revenue per day, two pools:", &report.revenue);
                info!(
                    "{:>14} {:>12} {:>12} {:>8} {:>8} {:>8} {:>8}",
                    "liquidity", "pnl single", "pnl shared", "share%", "apr%", "other%", "alone%"
                );
                for row in &report.rows {
                    info!(
                        "{:>14} {:>12} {:>12} {:>8.1} {:>8.2} {:>8.2} {:>8.2}",
                        format_usd(row.liquidity),
                        format_usd(row.pnl_per_day_single),
                        format_usd(row.pnl_per_day_two_pools),
                        row.market_share_pct,
                        row.apr_mine_pct,
                        row.apr_other_pct,
                        row.apr_single_pct
                    );
                }
            }
            ReportBody::Batch(report) => {
                let s = &report.summary;
                info!("mode {:?}, liquidity {}", report.mode, format_usd(report.liquidity));
                if let Some(competitor) = report.competitor_liquidity {
                    info!("  competitor liquidity: {}", format_usd(competitor));
                }
                info!("  lvr/day:            {}", format_usd(s.lvr_per_day()));
                info!("  fees/day:           {}", format_usd(s.fees_per_day()));
                info!("    from arbitrage:   {}", format_usd(s.arbitrage_fees_per_day()));
                info!("    other:            {}", format_usd(s.other_fees_per_day()));
                info!("  lp pnl/day:         {} (std {})", format_usd(s.lp_pnl_per_day()), format_usd(s.per_day(s.lp_pnl_std)));
                info!("  volume/day:         {}", format_usd(s.per_day(s.mean.volume)));
                if let Some(volume) = s.mean.competitor_volume {
                    info!("  competitor vol/day: {}", format_usd(s.per_day(volume)));
                }
                info!("  rejected trades:    {:.2}%", s.rejected_pct());
            }
        }
    }
}

fn log_revenue(title: &str, rows: &[crate::application::experiments::RevenueRow]) {
    info!("{}", title);
    for row in rows {
        info!(
            "  liquidity {}: total {}, toxic arbitrage {}, other {}",
            format_usd(row.liquidity),
            format_usd(row.total_per_day),
            format_usd(row.arbitrage_per_day),
            format_usd(row.other_per_day)
        );
    }
}
