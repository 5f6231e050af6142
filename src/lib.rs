//! lvrsim - constant-product AMM simulator
//! LP fee revenue against loss-versus-rebalancing, alone or next to a competing pool

pub mod application;
pub mod config;
pub mod domain;
pub mod math;
pub mod report;
pub mod shared;

// Re-export main types for convenience
pub use application::{MonteCarloRunner, SimulationDriver, TrialMode};
pub use domain::arbitrage::ArbitrageEngine;
pub use domain::pool::{Pool, PoolParams};
pub use domain::price::PricePath;
pub use domain::routing::OrderRouter;
pub use shared::errors::{AppError, SimError};
pub use shared::types::{SimulationResult, SwapDirection, Trade};
