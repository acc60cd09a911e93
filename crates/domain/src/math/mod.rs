//! Fixed-point math kernel.

pub mod full_math;
pub mod liquidity_amounts;
pub mod price;
pub mod price_tick;
pub mod tick_math;

pub use full_math::{div_rounding_up, mul_div, mul_div_rounding_up};
pub use price::{PRECISION, price_from_sqrt_price, quote_in_token0, quote_in_token1};
pub use tick_math::{
    MAX_SQRT_PRICE, MAX_TICK, MIN_SQRT_PRICE, MIN_TICK, Q96, sqrt_price_at_tick,
    tick_at_sqrt_price, tick_floor,
};
