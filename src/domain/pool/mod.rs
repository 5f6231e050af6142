//! Pool domain - constant-product reserves, fees and cumulative accounting

mod constant_product;
mod pool_metrics;

pub use constant_product::{Pool, PoolParams, DEFAULT_BASE_FEE, DEFAULT_FEE_PIPS, DEFAULT_LIQUIDITY};
pub use pool_metrics::PoolMetrics;
