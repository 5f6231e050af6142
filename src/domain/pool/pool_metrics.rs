//! Cumulative per-pool accounting

use serde::{Deserialize, Serialize};
use crate::shared::types::SimulationResult;

/// Running totals for one pool over one trial. All amounts are in numeraire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoolMetrics {
    pub total_volume: f64,
    pub total_volume_from_arbitrage: f64,
    pub total_lp_fees: f64,
    pub total_lp_fees_from_arbitrage: f64,
    pub total_lvr: f64,
    pub total_arbitrageur_profit: f64,
    pub total_base_fees_paid: f64,
    pub transaction_count: u64,
}

impl PoolMetrics {
    /// Account an executed noise swap
    pub(crate) fn record_swap(&mut self, volume: f64, lp_fee: f64, base_fee: f64) {
        self.total_volume += volume;
        self.total_lp_fees += lp_fee;
        self.total_base_fees_paid += base_fee;
        self.transaction_count += 1;
    }

    /// Account an executed arbitrage. Backruns (`account_lvr == false`) count
    /// towards volume and fees only.
    pub(crate) fn record_arbitrage(
        &mut self,
        volume: f64,
        lp_fee: f64,
        base_fee: f64,
        lvr: f64,
        arbitrageur_profit: f64,
        account_lvr: bool,
    ) {
        self.record_swap(volume, lp_fee, base_fee);
        if account_lvr {
            self.total_volume_from_arbitrage += volume;
            self.total_lp_fees_from_arbitrage += lp_fee;
            self.total_lvr += lvr;
            self.total_arbitrageur_profit += arbitrageur_profit;
        }
    }

    pub fn lp_pnl(&self) -> f64 {
        self.total_lp_fees - self.total_lvr
    }

    pub fn to_result(&self) -> SimulationResult {
        SimulationResult {
            lvr: self.total_lvr,
            lp_fees: self.total_lp_fees,
            lp_fees_from_arbitrage: self.total_lp_fees_from_arbitrage,
            volume: self.total_volume,
            volume_from_arbitrage: self.total_volume_from_arbitrage,
            competitor_volume: None,
        }
    }
}
