//! Arbitrage engine - decides whether the arbitrageur trades and applies the trade

use tracing::debug;

use super::profit_calculator::{ArbitrageQuote, ProfitCalculator};
use crate::domain::pool::Pool;
use crate::shared::errors::SimError;

/// A single fee- and gas-aware arbitrageur keeping a pool near the CEX price.
///
/// Stateless apart from the optional preset target, so one engine can serve
/// any number of pools and trials.
#[derive(Debug, Clone, Default)]
pub struct ArbitrageEngine {
    preset_target_price: Option<f64>,
}

impl ArbitrageEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Force every profitable-direction trade to move the pool to `price`
    /// instead of the fee-adjusted external price. Used to pin trades in tests.
    pub fn with_preset_target_price(price: f64) -> Self {
        Self {
            preset_target_price: Some(price),
        }
    }

    /// Quote the trade the arbitrageur would make, or `None` when the price
    /// gap sits inside the fee or the base fee eats the profit
    pub fn evaluate(&self, pool: &Pool, external_price: f64) -> Result<Option<ArbitrageQuote>, SimError> {
        let Some(target_price) = ProfitCalculator::target_price(pool, external_price) else {
            return Ok(None);
        };
        let target_price = self.preset_target_price.unwrap_or(target_price);

        let quote = ProfitCalculator::quote(pool, external_price, target_price)?;
        if !quote.is_profitable() {
            debug!(
                "arbitrage skipped: lvr={:.4} lp_fee={:.4} profit={:.4}",
                quote.lvr, quote.lp_fee, quote.profit
            );
            return Ok(None);
        }
        Ok(Some(quote))
    }

    /// Run the arbitrageur against `pool` at `external_price`.
    ///
    /// With `account_lvr == false` the trade is treated as a same-block backrun
    /// of noise flow: it still counts towards volume and fees, but not towards
    /// LVR, arbitrageur profit or the `_from_arbitrage` totals.
    pub fn try_arbitrage(&self, pool: &mut Pool, external_price: f64, account_lvr: bool) -> Result<bool, SimError> {
        let Some(quote) = self.evaluate(pool, external_price)? else {
            return Ok(false);
        };

        let dex_price = pool.price();
        // fees leave the pool at once, so only the fee-free deltas hit reserves
        pool.apply_reserve_deltas(quote.delta_x, quote.delta_y)?;
        pool.metrics_mut().record_arbitrage(
            quote.volume(),
            quote.lp_fee,
            quote.base_fee,
            quote.lvr,
            quote.profit,
            account_lvr,
        );

        debug!(
            "DEX price: {:.4}->{:.4} CEX price: {:.4} LP fee={:.2} LVR={:.2} loss: {:.1}%",
            dex_price,
            pool.price(),
            external_price,
            quote.lp_fee,
            quote.lvr,
            100.0 * quote.lp_loss_share()
        );
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn pool(fee_rate: f64, base_fee: f64) -> Pool {
        Pool::from_reserves(1_000.0, 3_000_000.0, fee_rate, base_fee).unwrap()
    }

    #[test]
    fn test_constant_price_never_trades() {
        let engine = ArbitrageEngine::new();
        let mut pool = pool(0.0005, 0.0);
        for _ in 0..1_000 {
            assert!(!engine.try_arbitrage(&mut pool, 3000.0, true).unwrap());
        }
        assert_eq!(pool.price(), 3000.0);
        assert_eq!(pool.metrics().total_lvr, 0.0);
        assert_eq!(pool.metrics().transaction_count, 0);
    }

    #[test]
    fn test_no_trade_inside_band() {
        let engine = ArbitrageEngine::new();
        let mut pool = pool(0.0005, 0.0);
        let (low, high) = pool.no_arbitrage_band();
        // endpoints excluded: on the edge the profit is zero up to rounding
        for i in 1..20 {
            let external = low + (high - low) * i as f64 / 20.0;
            assert!(!engine.try_arbitrage(&mut pool, external, true).unwrap(), "traded at {}", external);
        }
        assert_eq!(pool.metrics().transaction_count, 0);
    }

    #[test]
    fn test_trade_lands_on_band_edge() {
        let engine = ArbitrageEngine::new();
        for external in [3300.0, 2700.0, 3010.0, 2990.0] {
            let mut pool = pool(0.0005, 0.1);
            assert!(engine.try_arbitrage(&mut pool, external, true).unwrap());
            let (low, high) = pool.no_arbitrage_band();
            assert!(external >= low * (1.0 - 1e-12) && external <= high * (1.0 + 1e-12));
            // a second pass finds nothing left to take
            assert!(!engine.try_arbitrage(&mut pool, external, true).unwrap());
        }
    }

    #[test]
    fn test_arbitrage_accounting() {
        let engine = ArbitrageEngine::new();
        let mut pool = pool(0.0005, 0.1);
        let quote = engine.evaluate(&pool, 3300.0).unwrap().unwrap();
        let k_before = pool.reserve_x() * pool.reserve_y();

        assert!(engine.try_arbitrage(&mut pool, 3300.0, true).unwrap());
        let m = pool.metrics();
        assert_approx_eq!(m.total_lvr, quote.lvr, 1e-9);
        assert_approx_eq!(m.total_lp_fees, quote.lp_fee, 1e-9);
        assert_approx_eq!(m.total_lp_fees_from_arbitrage, quote.lp_fee, 1e-9);
        assert_approx_eq!(m.total_volume, quote.delta_y.abs() + quote.lp_fee, 1e-9);
        assert_approx_eq!(m.total_volume_from_arbitrage, m.total_volume, 1e-9);
        assert_approx_eq!(m.total_arbitrageur_profit, quote.lvr - quote.lp_fee - 0.1, 1e-9);
        assert_eq!(m.total_base_fees_paid, 0.1);
        assert_eq!(m.transaction_count, 1);
        assert_approx_eq!(pool.reserve_x() * pool.reserve_y() / k_before, 1.0, 1e-9);
    }

    #[test]
    fn test_backrun_excluded_from_lvr() {
        let engine = ArbitrageEngine::new();
        let mut pool = pool(0.0005, 0.0);
        assert!(engine.try_arbitrage(&mut pool, 2700.0, false).unwrap());
        let m = pool.metrics();
        assert!(m.total_volume > 0.0);
        assert!(m.total_lp_fees > 0.0);
        assert_eq!(m.total_lvr, 0.0);
        assert_eq!(m.total_volume_from_arbitrage, 0.0);
        assert_eq!(m.total_lp_fees_from_arbitrage, 0.0);
        assert_eq!(m.total_arbitrageur_profit, 0.0);
    }

    #[test]
    fn test_base_fee_dead_zone() {
        let engine = ArbitrageEngine::new();
        // just outside the fee band, the profit is far below a 100 base fee
        let mut pool = pool(0.0005, 100.0);
        let (_, high) = pool.no_arbitrage_band();
        assert!(!engine.try_arbitrage(&mut pool, high * 1.0001, true).unwrap());

        let mut free = Pool::from_reserves(1_000.0, 3_000_000.0, 0.0005, 0.0).unwrap();
        assert!(engine.try_arbitrage(&mut free, high * 1.0001, true).unwrap());
    }

    #[test]
    fn test_preset_target_price() {
        let engine = ArbitrageEngine::with_preset_target_price(3100.0);
        let mut pool = pool(0.0005, 0.0);
        assert!(engine.try_arbitrage(&mut pool, 3300.0, true).unwrap());
        assert_approx_eq!(pool.price(), 3100.0, 1e-6);
        // still no trade when the gap is inside the fee
        let mut other = Pool::from_reserves(1_000.0, 3_000_000.0, 0.0005, 0.0).unwrap();
        assert!(!engine.try_arbitrage(&mut other, 3000.5, true).unwrap());
    }
}
