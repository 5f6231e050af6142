//! Best-execution approximation for one order split across two pools

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::domain::pool::Pool;
use crate::shared::errors::SimError;
use crate::shared::types::SwapDirection;

/// Orders at or below this numeraire size go to a single pool
pub const SMALL_SWAP_SIZE: f64 = 10.0;
/// sqrt-price gap below which two pools count as equally priced
pub const SQRT_PRICE_TOLERANCE: f64 = 1e-8;

/// Which pool a leg of a routed order went to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PoolSide {
    Mine,
    Other,
}

/// How an order was split. Amounts are in the input asset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteOutcome {
    pub amount_mine: f64,
    pub amount_other: f64,
    /// Part of the order spent equalizing the two prices
    pub equalizing_amount: f64,
    pub output_mine: f64,
    pub output_other: f64,
}

impl RouteOutcome {
    pub fn total_in(&self) -> f64 {
        self.amount_mine + self.amount_other
    }

    pub fn total_out(&self) -> f64 {
        self.output_mine + self.output_other
    }
}

/// Splits orders between "my" pool and a competing one.
///
/// Not an exact gas-aware optimal router: small orders take the best single
/// quote, larger ones first close the price gap between the pools and then
/// split the remainder pro rata to liquidity.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRouter {
    small_swap_size: f64,
    sqrt_price_tolerance: f64,
}

impl Default for OrderRouter {
    fn default() -> Self {
        Self {
            small_swap_size: SMALL_SWAP_SIZE,
            sqrt_price_tolerance: SQRT_PRICE_TOLERANCE,
        }
    }
}

impl OrderRouter {
    pub fn new(small_swap_size: f64) -> Result<Self, SimError> {
        if !small_swap_size.is_finite() || small_swap_size < 0.0 {
            return Err(SimError::configuration(format!(
                "small swap size must be >= 0, got {}",
                small_swap_size
            )));
        }
        Ok(Self {
            small_swap_size,
            ..Self::default()
        })
    }

    pub fn small_swap_size(&self) -> f64 {
        self.small_swap_size
    }

    /// Route `amount_in` (in the input asset of `direction`) across both pools
    pub fn route(
        &self,
        direction: SwapDirection,
        amount_in: f64,
        mine: &mut Pool,
        other: &mut Pool,
    ) -> Result<RouteOutcome, SimError> {
        let notional = match direction {
            SwapDirection::XToY => amount_in * mine.price(),
            SwapDirection::YToX => amount_in,
        };
        if notional <= self.small_swap_size {
            return self.route_single(direction, amount_in, mine, other);
        }

        let mut outcome = RouteOutcome::default();
        let mut remaining = amount_in;

        if let Some((side, equalizing)) = self.equalizing_leg(direction, mine, other) {
            let step = equalizing.clamp(0.0, remaining);
            outcome.equalizing_amount = step;
            if step > 0.0 {
                execute_leg(&mut outcome, side, direction, step, mine, other)?;
            }
            remaining -= step;
        }

        if remaining > 0.0 {
            let liq_mine = mine.liquidity();
            let liq_other = other.liquidity();
            let amount_mine = remaining * liq_mine / (liq_mine + liq_other);
            let amount_other = remaining - amount_mine;
            execute_leg(&mut outcome, PoolSide::Mine, direction, amount_mine, mine, other)?;
            execute_leg(&mut outcome, PoolSide::Other, direction, amount_other, mine, other)?;
        }

        trace!(
            "routed {} {:.6}: mine={:.6} other={:.6} equalizing={:.6}",
            direction.as_str(),
            amount_in,
            outcome.amount_mine,
            outcome.amount_other,
            outcome.equalizing_amount
        );
        Ok(outcome)
    }

    /// Whole order to whichever pool quotes more; ties go to `mine`
    fn route_single(
        &self,
        direction: SwapDirection,
        amount_in: f64,
        mine: &mut Pool,
        other: &mut Pool,
    ) -> Result<RouteOutcome, SimError> {
        let quote_mine = mine.quote_output(direction, amount_in)?;
        let quote_other = other.quote_output(direction, amount_in)?;
        let side = if quote_mine >= quote_other { PoolSide::Mine } else { PoolSide::Other };

        let mut outcome = RouteOutcome::default();
        execute_leg(&mut outcome, side, direction, amount_in, mine, other)?;
        Ok(outcome)
    }

    /// The pool that is cheaper for this order and the fee-free input that
    /// brings its sqrt-price level with the other pool
    fn equalizing_leg(&self, direction: SwapDirection, mine: &Pool, other: &Pool) -> Option<(PoolSide, f64)> {
        let sp_mine = mine.price().sqrt();
        let sp_other = other.price().sqrt();
        if (sp_mine - sp_other).abs() < self.sqrt_price_tolerance {
            return None;
        }

        let leg = match direction {
            // sellers of X go where X is dearer
            SwapDirection::XToY if sp_mine < sp_other => (PoolSide::Other, other.x_amount_to_sqrt_price(sp_mine)),
            SwapDirection::XToY => (PoolSide::Mine, mine.x_amount_to_sqrt_price(sp_other)),
            // buyers of X go where X is cheaper
            SwapDirection::YToX if sp_mine < sp_other => (PoolSide::Mine, mine.y_amount_to_sqrt_price(sp_other)),
            SwapDirection::YToX => (PoolSide::Other, other.y_amount_to_sqrt_price(sp_mine)),
        };
        Some(leg)
    }
}

fn execute_leg(
    outcome: &mut RouteOutcome,
    side: PoolSide,
    direction: SwapDirection,
    amount: f64,
    mine: &mut Pool,
    other: &mut Pool,
) -> Result<(), SimError> {
    match side {
        PoolSide::Mine => {
            outcome.output_mine += mine.execute_swap(direction, amount)?;
            outcome.amount_mine += amount;
        }
        PoolSide::Other => {
            outcome.output_other += other.execute_swap(direction, amount)?;
            outcome.amount_other += amount;
        }
    }
    Ok(())
}
