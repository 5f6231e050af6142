//! Flow domain - uninformed (noise) order flow

mod noise_trades;

pub use noise_trades::{NoiseTradeGenerator, NoiseTradeParams};
