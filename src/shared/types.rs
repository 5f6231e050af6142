//! Common types used across the simulator

use serde::{Deserialize, Serialize};

/// Side of a swap from the trader's point of view.
/// X is the volatile asset, Y the numeraire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SwapDirection {
    /// Sell X, receive Y
    XToY,
    /// Pay Y, receive X
    YToX,
}

impl SwapDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SwapDirection::XToY => "x->y",
            SwapDirection::YToX => "y->x",
        }
    }
}

/// A noise trade, signed in numeraire units.
///
/// Negative amounts sell the volatile asset: the size is numeraire-equivalent
/// and gets converted to X at the block's external price. Positive amounts buy
/// X and are paid in numeraire directly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Trade(pub f64);

impl Trade {
    /// Size in numeraire, ignoring the sign
    pub fn notional(&self) -> f64 {
        self.0.abs()
    }

    pub fn is_noop(&self) -> bool {
        self.0 == 0.0
    }

    /// Direction and gross input amount (in the input asset) at `external_price`.
    pub fn to_swap(&self, external_price: f64) -> Option<(SwapDirection, f64)> {
        if self.0 < 0.0 {
            Some((SwapDirection::XToY, -self.0 / external_price))
        } else if self.0 > 0.0 {
            Some((SwapDirection::YToX, self.0))
        } else {
            None
        }
    }
}

impl From<f64> for Trade {
    fn from(value: f64) -> Self {
        Trade(value)
    }
}

/// Per-trial output of a simulation driver
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub lvr: f64,
    pub lp_fees: f64,
    pub lp_fees_from_arbitrage: f64,
    pub volume: f64,
    pub volume_from_arbitrage: f64,
    /// Volume captured by the competing pool, dual-pool runs only
    pub competitor_volume: Option<f64>,
}

impl SimulationResult {
    /// LP profit and loss: fee revenue minus loss-versus-rebalancing
    pub fn lp_pnl(&self) -> f64 {
        self.lp_fees - self.lvr
    }

    /// Fee revenue that did not come from toxic arbitrage
    pub fn lp_fees_other(&self) -> f64 {
        self.lp_fees - self.lp_fees_from_arbitrage
    }
}
