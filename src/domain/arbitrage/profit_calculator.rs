//! Profit calculation for a single CEX/DEX arbitrage

use crate::domain::pool::Pool;
use crate::shared::errors::SimError;

/// Everything an arbitrageur needs to decide on one trade, valued at the
/// external price
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArbitrageQuote {
    pub external_price: f64,
    pub target_price: f64,
    /// Fee-free reserve deltas that move the pool to `target_price`
    pub delta_x: f64,
    pub delta_y: f64,
    /// Fee on the supplied side, valued at the external price
    pub lp_fee: f64,
    /// Mark-to-market loss of the pool at the external price, fees ignored
    pub lvr: f64,
    pub base_fee: f64,
    /// `lvr - lp_fee - base_fee`
    pub profit: f64,
}

impl ArbitrageQuote {
    pub fn is_profitable(&self) -> bool {
        self.profit > 0.0
    }

    /// Volume credited to the pool: numeraire leg plus the LP fee
    pub fn volume(&self) -> f64 {
        self.delta_y.abs() + self.lp_fee
    }

    /// Share of LVR that fees fail to recover
    pub fn lp_loss_share(&self) -> f64 {
        if self.lvr == 0.0 {
            0.0
        } else {
            (self.lvr - self.lp_fee) / self.lvr
        }
    }
}

/// Prices an arbitrage against one pool
pub struct ProfitCalculator;

impl ProfitCalculator {
    /// Closest price to `external_price` the pool can be pushed to without a
    /// guaranteed loss to the fee. `None` when the gap is inside the fee.
    pub fn target_price(pool: &Pool, external_price: f64) -> Option<f64> {
        let dex_price = pool.price();
        let fee_factor = pool.fee_factor();
        if external_price > dex_price {
            let target = external_price / fee_factor;
            (target >= dex_price).then_some(target)
        } else {
            let target = external_price * fee_factor;
            (target <= dex_price).then_some(target)
        }
    }

    /// Quote the trade that moves `pool` to `target_price`
    pub fn quote(
        pool: &Pool,
        external_price: f64,
        target_price: f64,
    ) -> Result<ArbitrageQuote, SimError> {
        let (delta_x, delta_y) = pool.amounts_to_reach_price(target_price)?;
        let fee_factor = pool.fee_factor();

        // LP fees are valued at the CEX price: LPs are assumed to withdraw and
        // convert fees right away instead of compounding them
        let lp_fee = if delta_x > 0.0 {
            delta_x * (fee_factor - 1.0) * external_price
        } else {
            delta_y * (fee_factor - 1.0)
        };

        let lvr = -(delta_x * external_price + delta_y);
        let base_fee = pool.base_fee();
        Ok(ArbitrageQuote {
            external_price,
            target_price,
            delta_x,
            delta_y,
            lp_fee,
            lvr,
            base_fee,
            profit: lvr - lp_fee - base_fee,
        })
    }
}
