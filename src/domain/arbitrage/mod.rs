//! Arbitrage domain - the CEX/DEX arbitrageur and its trade pricing

pub mod arbitrage_engine;
pub mod profit_calculator;

pub use arbitrage_engine::ArbitrageEngine;
pub use profit_calculator::{ArbitrageQuote, ProfitCalculator};
