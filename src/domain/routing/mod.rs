//! Routing domain - splitting noise flow between competing pools

mod order_router;

pub use order_router::{OrderRouter, PoolSide, RouteOutcome, SMALL_SWAP_SIZE, SQRT_PRICE_TOLERANCE};
