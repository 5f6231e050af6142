//! Block-by-block drivers for one pool, or my pool next to a competitor

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::arbitrage::ArbitrageEngine;
use crate::domain::pool::{Pool, PoolParams};
use crate::domain::price::PricePath;
use crate::domain::routing::OrderRouter;
use crate::math;
use crate::shared::errors::SimError;
use crate::shared::types::{SimulationResult, Trade};

/// Largest accepted noise trade as price impact, 0.01 %
pub const DEFAULT_MAX_PRICE_IMPACT: f64 = 0.0001;
/// Liquidity value of the competing pool
pub const DEFAULT_COMPETITOR_LIQUIDITY: f64 = 2_000_000.0;

/// Driver settings shared by every trial of a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverParams {
    pub pool: PoolParams,
    /// Liquidity value of the competing pool, dual-pool runs only
    pub competitor_liquidity: f64,
    /// Noise trades moving the price more than this fraction are dropped
    pub max_price_impact: f64,
    pub small_swap_size: f64,
}

impl Default for DriverParams {
    fn default() -> Self {
        Self {
            pool: PoolParams::default(),
            competitor_liquidity: DEFAULT_COMPETITOR_LIQUIDITY,
            max_price_impact: DEFAULT_MAX_PRICE_IMPACT,
            small_swap_size: crate::domain::routing::SMALL_SWAP_SIZE,
        }
    }
}

impl DriverParams {
    pub fn with_liquidity(mut self, liquidity: f64) -> Self {
        self.pool.liquidity = liquidity;
        self
    }

    pub fn validate(&self) -> Result<(), SimError> {
        if !(self.max_price_impact.is_finite() && self.max_price_impact > 0.0) {
            return Err(SimError::configuration(format!(
                "max price impact must be positive, got {}",
                self.max_price_impact
            )));
        }
        if !(self.competitor_liquidity.is_finite() && self.competitor_liquidity > 0.0) {
            return Err(SimError::configuration(format!(
                "competitor liquidity must be positive, got {}",
                self.competitor_liquidity
            )));
        }
        Ok(())
    }
}

/// Final state of one trial
#[derive(Debug, Clone)]
pub struct TrialRun {
    pub result: SimulationResult,
    pub pool: Pool,
    pub competitor: Option<Pool>,
    /// Noise trades that reached the pools
    pub accepted_trades: usize,
    /// Noise trades dropped by the price impact filter
    pub rejected_trades: usize,
}

/// Hands out the slice of noise trades due at each block.
///
/// Trades are spread evenly: block `i` releases every trade with index up to
/// `floor(i * trades / blocks)` that an earlier block has not released.
struct TradeSchedule<'a> {
    trades: &'a [Trade],
    per_block: f64,
    cursor: usize,
}

impl<'a> TradeSchedule<'a> {
    fn new(trades: &'a [Trade], blocks: usize) -> Self {
        Self {
            trades,
            per_block: trades.len() as f64 / blocks as f64,
            cursor: 0,
        }
    }

    fn due(&mut self, block: usize) -> &'a [Trade] {
        if self.trades.is_empty() {
            return &[];
        }
        let last = ((block as f64 * self.per_block) as usize).min(self.trades.len() - 1);
        let start = self.cursor;
        self.cursor = self.cursor.max(last + 1);
        &self.trades[start..self.cursor]
    }
}

/// Runs trials against the arbitrageur and the noise flow
#[derive(Debug, Clone)]
pub struct SimulationDriver {
    params: DriverParams,
    engine: ArbitrageEngine,
    router: OrderRouter,
}

impl SimulationDriver {
    pub fn new(params: DriverParams) -> Result<Self, SimError> {
        params.validate()?;
        let router = OrderRouter::new(params.small_swap_size)?;
        Ok(Self {
            params,
            engine: ArbitrageEngine::new(),
            router,
        })
    }

    pub fn with_engine(mut self, engine: ArbitrageEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn params(&self) -> &DriverParams {
        &self.params
    }

    /// One pool. Without noise trades only the arbitrageur runs.
    pub fn run_single(&self, prices: &PricePath, trades: Option<&[Trade]>) -> Result<TrialRun, SimError> {
        self.run_single_observed(prices, trades, |_, _| {})
    }

    /// Like `run_single`, calling `observe(block, &pool)` at the end of every block
    pub fn run_single_observed<F>(
        &self,
        prices: &PricePath,
        trades: Option<&[Trade]>,
        mut observe: F,
    ) -> Result<TrialRun, SimError>
    where
        F: FnMut(usize, &Pool),
    {
        let mut pool = Pool::new(&self.params.pool)?;
        let mut accepted = 0;
        let mut rejected = 0;

        match trades {
            None => {
                for (block, &cex_price) in prices.prices().iter().enumerate() {
                    self.engine.try_arbitrage(&mut pool, cex_price, true)?;
                    observe(block, &pool);
                }
            }
            Some(trades) => {
                let mut schedule = TradeSchedule::new(trades, prices.len());
                for (block, &cex_price) in prices.prices().iter().enumerate() {
                    self.engine.try_arbitrage(&mut pool, cex_price, true)?;

                    let max_swap = pool.max_swap_size(self.params.max_price_impact);
                    for trade in schedule.due(block) {
                        if trade.is_noop() {
                            continue;
                        }
                        if trade.notional() > max_swap {
                            rejected += 1;
                            continue;
                        }
                        if let Some((direction, amount)) = trade.to_swap(cex_price) {
                            pool.execute_swap(direction, amount)?;
                            accepted += 1;
                        }
                    }

                    // same-block backrun of the noise flow
                    self.engine.try_arbitrage(&mut pool, cex_price, false)?;
                    observe(block, &pool);
                }
            }
        }

        let result = pool.metrics().to_result();
        debug!(
            "single pool trial: blocks={} lvr={:.2} fees={:.2} volume={:.0} accepted={} rejected={}",
            prices.len(),
            result.lvr,
            result.lp_fees,
            result.volume,
            accepted,
            rejected
        );
        Ok(TrialRun {
            result,
            pool,
            competitor: None,
            accepted_trades: accepted,
            rejected_trades: rejected,
        })
    }

    /// My pool next to a competitor sized to `competitor_liquidity`, noise
    /// flow split by the router
    pub fn run_dual(&self, prices: &PricePath, trades: &[Trade]) -> Result<TrialRun, SimError> {
        self.run_dual_observed(prices, trades, |_, _, _| {})
    }

    /// Like `run_dual`, calling `observe(block, &mine, &other)` at the end of every block
    pub fn run_dual_observed<F>(&self, prices: &PricePath, trades: &[Trade], mut observe: F) -> Result<TrialRun, SimError>
    where
        F: FnMut(usize, &Pool, &Pool),
    {
        let mut mine = Pool::new(&self.params.pool)?;
        let mut other = Pool::new(&self.params.pool.clone().with_liquidity(self.params.competitor_liquidity))?;
        let mut schedule = TradeSchedule::new(trades, prices.len());
        let mut accepted = 0;
        let mut rejected = 0;

        for (block, &cex_price) in prices.prices().iter().enumerate() {
            self.engine.try_arbitrage(&mut mine, cex_price, true)?;
            self.engine.try_arbitrage(&mut other, cex_price, true)?;

            // price impact against the summed liquidity of both pools; not exact,
            // since small trades are not split between them
            let max_swap = math::swap_size_from_liquidity(
                mine.liquidity_value() + other.liquidity_value(),
                self.params.max_price_impact,
                mine.reference_price(),
            );
            for trade in schedule.due(block) {
                if trade.is_noop() {
                    continue;
                }
                if trade.notional() > max_swap {
                    rejected += 1;
                    continue;
                }
                if let Some((direction, amount)) = trade.to_swap(cex_price) {
                    self.router.route(direction, amount, &mut mine, &mut other)?;
                    accepted += 1;
                }
            }

            self.engine.try_arbitrage(&mut mine, cex_price, false)?;
            self.engine.try_arbitrage(&mut other, cex_price, false)?;
            observe(block, &mine, &other);
        }

        let mut result = mine.metrics().to_result();
        result.competitor_volume = Some(other.metrics().total_volume);
        debug!(
            "two pool trial: blocks={} lvr={:.2} fees={:.2} volume={:.0} competitor volume={:.0}",
            prices.len(),
            result.lvr,
            result.lp_fees,
            result.volume,
            other.metrics().total_volume
        );
        Ok(TrialRun {
            result,
            pool: mine,
            competitor: Some(other),
            accepted_trades: accepted,
            rejected_trades: rejected,
        })
    }
}
