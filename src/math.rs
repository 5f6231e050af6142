// src/math.rs
//! Closed-form constant-product formulas shared by the pool, the drivers and
//! the experiment reports.
//!
//! Liquidity `L = sqrt(x * y)`, pool value `V = x * P + y = 2 * L * sqrt(P)`.

/// Price of the volatile asset used to size pools and price-impact caps.
pub const REFERENCE_PRICE: f64 = 3000.0;

pub const SECONDS_PER_DAY: f64 = 86_400.0;
pub const SECONDS_PER_YEAR: f64 = 365.0 * SECONDS_PER_DAY;

/// Pool value in numeraire for liquidity `L` at `reference_price`
pub fn liquidity_to_value(liquidity: f64, reference_price: f64) -> f64 {
    2.0 * liquidity * reference_price.sqrt()
}

/// Liquidity `L` of a pool worth `value` numeraire at `reference_price`
pub fn value_to_liquidity(value: f64, reference_price: f64) -> f64 {
    value / (2.0 * reference_price.sqrt())
}

/// Price impact of a swap: `I = size / (L * sqrt(P))`
pub fn price_impact(swap_size: f64, liquidity: f64, reference_price: f64) -> f64 {
    swap_size / (liquidity * reference_price.sqrt())
}

/// Largest swap with price impact at most `max_price_impact` (a fraction):
/// `size = I * L * sqrt(P)`.
///
/// The drivers and the volume report pass the pool's liquidity *value* here,
/// not `L`, which makes the cap `sqrt(P)` times looser than the inverse of
/// [`price_impact`]. All calibrated outputs depend on that convention.
pub fn swap_size_from_liquidity(liquidity: f64, max_price_impact: f64, reference_price: f64) -> f64 {
    max_price_impact * liquidity * reference_price.sqrt()
}

/// Per-block volatility from an annualised one
pub fn volatility_per_block(annual_volatility: f64, block_time_sec: f64) -> f64 {
    let per_second = annual_volatility / SECONDS_PER_YEAR.sqrt();
    per_second * block_time_sec.sqrt()
}

/// Number of whole blocks in `seconds`
pub fn seconds_to_blocks(seconds: f64, block_time_sec: f64) -> usize {
    (seconds / block_time_sec).floor() as usize
}

pub fn minutes_to_blocks(minutes: f64, block_time_sec: f64) -> usize {
    seconds_to_blocks(60.0 * minutes, block_time_sec)
}

/// Fee multiplier `1 / (1 - fee_rate)`
pub fn fee_factor(fee_rate: f64) -> f64 {
    1.0 / (1.0 - fee_rate)
}

/// Fee rate from parts-per-million
pub fn pips_to_rate(fee_pips: u32) -> f64 {
    fee_pips as f64 / 1_000_000.0
}

/// Analytic LVR net of fees per day, as a fraction of pool value.
///
/// Reference formula for fast blocks: `sigma^3 * sqrt(dt / 2) / (8 * gamma)` per
/// block. It overestimates the simulated loss, so reports show it alongside
/// the Monte-Carlo estimate rather than instead of it.
pub fn lvr_with_fees_per_day(sigma_per_block: f64, block_time_sec: f64, fee_rate: f64) -> f64 {
    let blocks_per_day = SECONDS_PER_DAY / block_time_sec;
    let per_block = sigma_per_block.powi(3) * (block_time_sec / 2.0).sqrt() / (8.0 * fee_rate);
    per_block * blocks_per_day
}

/// Mean and population standard deviation
pub fn mean_and_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}
