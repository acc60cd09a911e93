//! Fair price of asset0 quoted in asset1.
//!
//! Prices are carried at [`PRECISION`] (1e36) so that tokens with different
//! decimals keep full resolution on both sides.

use crate::error::MathError;
use crate::math::full_math::mul_div;
use primitive_types::{U256, U512};

/// Scale of a fair price: `1e36` means one unit of asset0 is worth one unit
/// of asset1.
pub const PRECISION: U256 = U256([12_919_594_847_110_692_864, 54_210_108_624_275_221, 0, 0]);

/// `floor(sqrt_price^2 * 1e36 / 2^192)`.
///
/// The square and the scale are carried in 512 bits and truncated once; the
/// intermediate stays below `2^440` across the whole tick range.
pub fn price_from_sqrt_price(sqrt_price_x96: U256) -> Result<U256, MathError> {
    let scaled = sqrt_price_x96
        .full_mul(sqrt_price_x96)
        .checked_mul(U512::from(PRECISION))
        .ok_or(MathError::Overflow)?;
    U256::try_from(scaled >> 192usize).map_err(|_| MathError::Overflow)
}

/// Value of `amount0` expressed in asset1 at `price`.
pub fn quote_in_token1(amount0: U256, price: U256) -> Result<U256, MathError> {
    mul_div(amount0, price, PRECISION)
}

/// Amount of asset0 worth `amount1` at `price`.
pub fn quote_in_token0(amount1: U256, price: U256) -> Result<U256, MathError> {
    mul_div(amount1, PRECISION, price)
}
