//! Constant-product pool state machine

use serde::{Deserialize, Serialize};
use tracing::trace;

use super::PoolMetrics;
use crate::math::{self, REFERENCE_PRICE};
use crate::shared::errors::SimError;
use crate::shared::types::SwapDirection;

/// LP fee, in parts per million. 500 pips = 0.05%.
pub const DEFAULT_FEE_PIPS: u32 = 500;
/// Fixed per-transaction cost in numeraire, burned rather than paid to LPs.
pub const DEFAULT_BASE_FEE: f64 = 0.1;
pub const DEFAULT_LIQUIDITY: f64 = 100_000_000.0;

/// Construction parameters for a [`Pool`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolParams {
    /// Proportional LP fee as a fraction, e.g. 0.0005
    pub fee_rate: f64,
    /// Fixed cost per executed transaction, in numeraire
    pub base_fee: f64,
    /// Target pool value in numeraire
    pub liquidity: f64,
    /// Price used to turn `liquidity` into reserves. Sizing only.
    pub reference_price: f64,
}

impl Default for PoolParams {
    fn default() -> Self {
        Self {
            fee_rate: math::pips_to_rate(DEFAULT_FEE_PIPS),
            base_fee: DEFAULT_BASE_FEE,
            liquidity: DEFAULT_LIQUIDITY,
            reference_price: REFERENCE_PRICE,
        }
    }
}

impl PoolParams {
    pub fn with_liquidity(mut self, liquidity: f64) -> Self {
        self.liquidity = liquidity;
        self
    }

    pub fn with_fee_rate(mut self, fee_rate: f64) -> Self {
        self.fee_rate = fee_rate;
        self
    }

    pub fn with_base_fee(mut self, base_fee: f64) -> Self {
        self.base_fee = base_fee;
        self
    }
}

/// Amounts of one swap, before any state change
#[derive(Debug, Clone, Copy, PartialEq)]
struct SwapBreakdown {
    /// Net input credited to the reserve
    net_in: f64,
    amount_out: f64,
    /// Proportional fee, in numeraire
    lp_fee: f64,
    /// Gross input, in numeraire
    volume: f64,
}

/// One constant-product pool for X (volatile) against Y (numeraire).
///
/// The price is always `reserve_y / reserve_x` and is never stored.
#[derive(Debug, Clone, PartialEq)]
pub struct Pool {
    reserve_x: f64,
    reserve_y: f64,
    fee_rate: f64,
    fee_factor: f64,
    base_fee: f64,
    reference_price: f64,
    metrics: PoolMetrics,
}

impl Pool {
    /// Build a pool sized to `params.liquidity` at `params.reference_price`
    pub fn new(params: &PoolParams) -> Result<Self, SimError> {
        if !(params.reference_price.is_finite() && params.reference_price > 0.0) {
            return Err(SimError::configuration(format!(
                "reference price must be positive, got {}",
                params.reference_price
            )));
        }
        let mut pool = Self {
            reserve_x: 1.0,
            reserve_y: 1.0,
            fee_rate: 0.0,
            fee_factor: 1.0,
            base_fee: 0.0,
            reference_price: params.reference_price,
            metrics: PoolMetrics::default(),
        };
        pool.set_fee_rate(params.fee_rate)?;
        pool.set_base_fee(params.base_fee)?;
        pool.set_liquidity(params.liquidity)?;
        Ok(pool)
    }

    /// Build a pool directly from reserves
    pub fn from_reserves(
        reserve_x: f64,
        reserve_y: f64,
        fee_rate: f64,
        base_fee: f64,
    ) -> Result<Self, SimError> {
        check_reserves(reserve_x, reserve_y)?;
        let mut pool = Self::new(&PoolParams::default().with_fee_rate(fee_rate).with_base_fee(base_fee))?;
        pool.reserve_x = reserve_x;
        pool.reserve_y = reserve_y;
        Ok(pool)
    }

    pub fn set_fee_rate(&mut self, fee_rate: f64) -> Result<(), SimError> {
        if !fee_rate.is_finite() || fee_rate < 0.0 {
            return Err(SimError::configuration(format!("fee rate must be >= 0, got {}", fee_rate)));
        }
        if fee_rate >= 1.0 {
            return Err(SimError::domain(format!("fee rate {} leaves the fee factor undefined", fee_rate)));
        }
        self.fee_rate = fee_rate;
        self.fee_factor = math::fee_factor(fee_rate);
        Ok(())
    }

    pub fn set_fee_bps(&mut self, fee_bps: u32) -> Result<(), SimError> {
        self.set_fee_rate(fee_bps as f64 / 10_000.0)
    }

    pub fn set_base_fee(&mut self, base_fee: f64) -> Result<(), SimError> {
        if !base_fee.is_finite() || base_fee < 0.0 {
            return Err(SimError::configuration(format!("base fee must be >= 0, got {}", base_fee)));
        }
        self.base_fee = base_fee;
        Ok(())
    }

    /// Reset reserves to hold `value` numeraire, split evenly, at the
    /// reference price. Fee settings and counters are left alone.
    pub fn set_liquidity(&mut self, value: f64) -> Result<(), SimError> {
        if !value.is_finite() || value <= 0.0 {
            return Err(SimError::configuration(format!("liquidity must be positive, got {}", value)));
        }
        self.reserve_y = value / 2.0;
        self.reserve_x = self.reserve_y / self.reference_price;
        Ok(())
    }

    pub fn reserve_x(&self) -> f64 {
        self.reserve_x
    }

    pub fn reserve_y(&self) -> f64 {
        self.reserve_y
    }

    pub fn fee_rate(&self) -> f64 {
        self.fee_rate
    }

    pub fn fee_factor(&self) -> f64 {
        self.fee_factor
    }

    pub fn base_fee(&self) -> f64 {
        self.base_fee
    }

    pub fn reference_price(&self) -> f64 {
        self.reference_price
    }

    pub fn metrics(&self) -> &PoolMetrics {
        &self.metrics
    }

    pub(crate) fn metrics_mut(&mut self) -> &mut PoolMetrics {
        &mut self.metrics
    }

    pub fn price(&self) -> f64 {
        self.reserve_y / self.reserve_x
    }

    /// `L = sqrt(x * y)`. Constant across swaps up to rounding; fees are withdrawn.
    pub fn liquidity(&self) -> f64 {
        (self.reserve_x * self.reserve_y).sqrt()
    }

    /// Pool value implied by `L` at the reference price
    pub fn liquidity_value(&self) -> f64 {
        math::liquidity_to_value(self.liquidity(), self.reference_price)
    }

    /// Largest noise trade (numeraire) with price impact at most `max_price_impact`
    pub fn max_swap_size(&self, max_price_impact: f64) -> f64 {
        math::swap_size_from_liquidity(self.liquidity_value(), max_price_impact, self.reference_price)
    }

    /// Fee-free reserve deltas `(dx, dy)` that move the pool to `target_price`
    pub fn amounts_to_reach_price(&self, target_price: f64) -> Result<(f64, f64), SimError> {
        if !(target_price.is_finite() && target_price > 0.0) {
            return Err(SimError::domain(format!("target price must be positive, got {}", target_price)));
        }
        let sqrt_target = target_price.sqrt();
        Ok((
            self.x_amount_to_sqrt_price(sqrt_target),
            self.y_amount_to_sqrt_price(sqrt_target),
        ))
    }

    /// `dx = L / sqrt(P') - x`
    pub fn x_amount_to_sqrt_price(&self, sqrt_target_price: f64) -> f64 {
        self.liquidity() / sqrt_target_price - self.reserve_x
    }

    /// `dy = L * sqrt(P') - y`
    pub fn y_amount_to_sqrt_price(&self, sqrt_target_price: f64) -> f64 {
        self.liquidity() * sqrt_target_price - self.reserve_y
    }

    /// Price interval in which a fee-paying arbitrageur cannot profit.
    /// Exact only while the base fee is zero.
    pub fn no_arbitrage_band(&self) -> (f64, f64) {
        let p = self.price();
        (p / self.fee_factor, p * self.fee_factor)
    }

    /// Output of a swap of `amount_in` (in the input asset), without mutating
    pub fn quote_output(&self, direction: SwapDirection, amount_in: f64) -> Result<f64, SimError> {
        Ok(self.compute_swap(direction, amount_in)?.map_or(0.0, |swap| swap.amount_out))
    }

    /// Execute a swap and return the output amount. Returns 0 without touching
    /// state when the base fee eats the whole input.
    pub fn execute_swap(&mut self, direction: SwapDirection, amount_in: f64) -> Result<f64, SimError> {
        let Some(swap) = self.compute_swap(direction, amount_in)? else {
            return Ok(0.0);
        };

        let (new_x, new_y) = match direction {
            SwapDirection::XToY => (self.reserve_x + swap.net_in, self.reserve_y - swap.amount_out),
            SwapDirection::YToX => (self.reserve_x - swap.amount_out, self.reserve_y + swap.net_in),
        };
        check_reserves(new_x, new_y)?;
        self.reserve_x = new_x;
        self.reserve_y = new_y;

        let base_fee = self.base_fee;
        self.metrics.record_swap(swap.volume, swap.lp_fee, base_fee);
        trace!(
            "swap {} in={:.6} out={:.6} price={:.4}",
            direction.as_str(),
            amount_in,
            swap.amount_out,
            self.price()
        );
        Ok(swap.amount_out)
    }

    /// Move reserves by fee-free deltas computed by the arbitrage evaluator
    pub(crate) fn apply_reserve_deltas(&mut self, delta_x: f64, delta_y: f64) -> Result<(), SimError> {
        let new_x = self.reserve_x + delta_x;
        let new_y = self.reserve_y + delta_y;
        check_reserves(new_x, new_y)?;
        self.reserve_x = new_x;
        self.reserve_y = new_y;
        Ok(())
    }

    fn compute_swap(&self, direction: SwapDirection, amount_in: f64) -> Result<Option<SwapBreakdown>, SimError> {
        if amount_in.is_nan() || amount_in.is_infinite() {
            return Err(SimError::domain(format!("swap input must be finite, got {}", amount_in)));
        }
        let price = self.price();
        let (base_fee_in, reserve_in, reserve_out, to_numeraire) = match direction {
            SwapDirection::XToY => (self.base_fee / price, self.reserve_x, self.reserve_y, price),
            SwapDirection::YToX => (self.base_fee, self.reserve_y, self.reserve_x, 1.0),
        };

        // the base fee comes off first, in units of the input asset
        let after_base_fee = amount_in - base_fee_in;
        if after_base_fee <= 0.0 {
            return Ok(None);
        }

        let net_in = after_base_fee / self.fee_factor;
        let amount_out = net_in * reserve_out / (reserve_in + net_in);
        Ok(Some(SwapBreakdown {
            net_in,
            amount_out,
            lp_fee: (after_base_fee - net_in) * to_numeraire,
            volume: amount_in * to_numeraire,
        }))
    }
}

fn check_reserves(reserve_x: f64, reserve_y: f64) -> Result<(), SimError> {
    if reserve_x.is_finite() && reserve_y.is_finite() && reserve_x > 0.0 && reserve_y > 0.0 {
        Ok(())
    } else {
        Err(SimError::domain(format!(
            "reserves must stay positive, got x={} y={}",
            reserve_x, reserve_y
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn pool_at_3000(fee_rate: f64, base_fee: f64) -> Pool {
        Pool::from_reserves(1_000.0, 3_000_000.0, fee_rate, base_fee).unwrap()
    }

    #[test]
    fn test_set_liquidity_sizes_reserves() {
        let pool = Pool::new(&PoolParams::default().with_liquidity(1e7)).unwrap();
        assert_eq!(pool.reserve_y(), 5e6);
        assert_eq!(pool.reserve_x(), 5e6 / 3000.0);
        assert_approx_eq!(pool.price(), 3000.0, 1e-9);
        assert_approx_eq!(pool.liquidity_value(), 1e7, 1e-6);
    }

    #[test]
    fn test_set_liquidity_keeps_fee_state() {
        let mut pool = Pool::new(&PoolParams::default()).unwrap();
        pool.set_fee_bps(30).unwrap();
        pool.execute_swap(SwapDirection::YToX, 1_000.0).unwrap();
        pool.set_liquidity(2e6).unwrap();
        assert_eq!(pool.fee_rate(), 0.003);
        assert_eq!(pool.metrics().transaction_count, 1);
        assert_eq!(pool.reserve_y(), 1e6);
    }

    #[test]
    fn test_invalid_parameters_rejected() {
        let err = Pool::new(&PoolParams::default().with_liquidity(0.0)).unwrap_err();
        assert!(matches!(err, SimError::Configuration(_)));

        let err = Pool::new(&PoolParams::default().with_fee_rate(-0.01)).unwrap_err();
        assert!(matches!(err, SimError::Configuration(_)));

        let err = Pool::new(&PoolParams::default().with_fee_rate(1.0)).unwrap_err();
        assert!(matches!(err, SimError::Domain(_)));

        let err = Pool::new(&PoolParams::default().with_base_fee(-1.0)).unwrap_err();
        assert!(matches!(err, SimError::Configuration(_)));

        assert!(Pool::from_reserves(0.0, 1.0, 0.0005, 0.0).is_err());
    }

    #[test]
    fn test_quote_matches_execute() {
        let mut pool = pool_at_3000(0.0005, 0.1);
        for (direction, amount) in [(SwapDirection::YToX, 5_000.0), (SwapDirection::XToY, 2.5)] {
            let quoted = pool.quote_output(direction, amount).unwrap();
            let again = pool.quote_output(direction, amount).unwrap();
            assert_eq!(quoted, again);
            let executed = pool.execute_swap(direction, amount).unwrap();
            assert_eq!(quoted, executed);
        }
    }

    #[test]
    fn test_invariant_never_decreases() {
        let mut pool = pool_at_3000(0.003, 0.1);
        let trades = [
            (SwapDirection::YToX, 10_000.0),
            (SwapDirection::XToY, 7.0),
            (SwapDirection::YToX, 0.05),
            (SwapDirection::XToY, 0.5),
            (SwapDirection::YToX, 250_000.0),
        ];
        for (direction, amount) in trades {
            let k_before = pool.reserve_x() * pool.reserve_y();
            pool.execute_swap(direction, amount).unwrap();
            let k_after = pool.reserve_x() * pool.reserve_y();
            // fees leave the pool, so k only moves by rounding
            assert!(k_after >= k_before * (1.0 - 1e-12), "{} -> {}", k_before, k_after);
        }
    }

    #[test]
    fn test_zero_fee_swap_preserves_invariant() {
        let mut pool = pool_at_3000(0.0, 0.0);
        let k_before = pool.reserve_x() * pool.reserve_y();
        pool.execute_swap(SwapDirection::YToX, 30_000.0).unwrap();
        let k_after = pool.reserve_x() * pool.reserve_y();
        assert_approx_eq!(k_after / k_before, 1.0, 1e-12);
    }

    #[test]
    fn test_round_trip_loses_to_fees() {
        let mut pool = pool_at_3000(0.0005, 0.1);
        let x_out = pool.execute_swap(SwapDirection::YToX, 1_000.0).unwrap();
        let y_back = pool.execute_swap(SwapDirection::XToY, x_out).unwrap();
        assert!(y_back < 1_000.0);

        let mut free = pool_at_3000(0.0, 0.0);
        let x_out = free.execute_swap(SwapDirection::YToX, 1_000.0).unwrap();
        let y_back = free.execute_swap(SwapDirection::XToY, x_out).unwrap();
        assert_approx_eq!(y_back, 1_000.0, 1e-6);
    }

    #[test]
    fn test_buy_with_base_fee() {
        let mut pool = pool_at_3000(0.0005, 0.1);
        let mut free = pool_at_3000(0.0005, 0.0);
        free.set_fee_rate(0.0).unwrap();
        let theoretical = free.quote_output(SwapDirection::YToX, 50.0).unwrap();

        let out = pool.execute_swap(SwapDirection::YToX, 50.0).unwrap();
        assert!(out < theoretical);

        let ff = pool.fee_factor();
        assert_approx_eq!(pool.metrics().total_lp_fees, (50.0 - 0.1) * (1.0 - 1.0 / ff), 1e-12);
        assert_eq!(pool.metrics().total_base_fees_paid, 0.1);
        assert_eq!(pool.metrics().total_volume, 50.0);
        assert_eq!(pool.metrics().transaction_count, 1);
    }

    #[test]
    fn test_base_fee_consumes_input() {
        let mut pool = pool_at_3000(0.0005, 0.1);
        let before = pool.clone();
        assert_eq!(pool.quote_output(SwapDirection::YToX, 0.1).unwrap(), 0.0);
        assert_eq!(pool.execute_swap(SwapDirection::YToX, 0.05).unwrap(), 0.0);
        // 0.1 numeraire is 1/30000 X at price 3000
        assert_eq!(pool.execute_swap(SwapDirection::XToY, 0.00002).unwrap(), 0.0);
        assert_eq!(pool.execute_swap(SwapDirection::XToY, -1.0).unwrap(), 0.0);
        assert_eq!(pool, before);
    }

    #[test]
    fn test_non_finite_input_is_domain_error() {
        let mut pool = pool_at_3000(0.0005, 0.0);
        let err = pool.execute_swap(SwapDirection::XToY, f64::NAN).unwrap_err();
        assert!(matches!(err, SimError::Domain(_)));
        assert!(pool.quote_output(SwapDirection::YToX, f64::INFINITY).is_err());
    }

    #[test]
    fn test_amounts_to_reach_price() {
        let pool = pool_at_3000(0.0005, 0.0);
        let (dx, dy) = pool.amounts_to_reach_price(3300.0).unwrap();
        assert!(dx < 0.0 && dy > 0.0);
        let moved = Pool::from_reserves(pool.reserve_x() + dx, pool.reserve_y() + dy, 0.0, 0.0).unwrap();
        assert_approx_eq!(moved.price(), 3300.0, 1e-6);
        assert_approx_eq!(moved.liquidity(), pool.liquidity(), 1e-6);

        let (dx, dy) = pool.amounts_to_reach_price(3000.0).unwrap();
        assert_approx_eq!(dx, 0.0, 1e-9);
        assert_approx_eq!(dy, 0.0, 1e-6);

        assert!(pool.amounts_to_reach_price(0.0).is_err());
    }

    #[test]
    fn test_no_arbitrage_band() {
        let pool = pool_at_3000(0.0005, 0.0);
        let (low, high) = pool.no_arbitrage_band();
        assert_approx_eq!(low, 3000.0 * 0.9995, 1e-9);
        assert_approx_eq!(high, 3000.0 / 0.9995, 1e-9);
    }

    #[test]
    fn test_apply_reserve_deltas_rejects_negative_reserves() {
        let mut pool = pool_at_3000(0.0005, 0.0);
        let err = pool.apply_reserve_deltas(-1_000.0, 10.0).unwrap_err();
        assert!(matches!(err, SimError::Domain(_)));
        assert_eq!(pool.reserve_x(), 1_000.0);
    }
}
