//! Domain layer - pools, the arbitrageur, routing and market inputs

pub mod arbitrage;
pub mod flow;
pub mod pool;
pub mod price;
pub mod routing;
