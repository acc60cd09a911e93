//! Conversions between token amounts and concentrated liquidity.
//!
//! All prices are Q64.96 sqrt prices. Liquidity computed from amounts rounds
//! down; amounts computed from liquidity round down for withdrawals and up
//! for what a pool charges on mint.

use crate::error::MathError;
use crate::math::full_math::{div_rounding_up, mul_div, mul_div_rounding_up};
use crate::math::tick_math::Q96;
use crate::value_objects::pair::AmountPair;
use primitive_types::U256;

fn ordered(sqrt_a: U256, sqrt_b: U256) -> Result<(U256, U256), MathError> {
    let (lower, upper) = if sqrt_a < sqrt_b {
        (sqrt_a, sqrt_b)
    } else {
        (sqrt_b, sqrt_a)
    };
    if lower.is_zero() || lower == upper {
        return Err(MathError::DivisionByZero);
    }
    Ok((lower, upper))
}

fn to_liquidity(value: U256) -> Result<u128, MathError> {
    if value > U256::from(u128::MAX) {
        return Err(MathError::Overflow);
    }
    Ok(value.low_u128())
}

/// L = amount0 * (sqrt_a * sqrt_b) / (sqrt_b - sqrt_a)
pub fn liquidity_for_amount0(
    sqrt_a: U256,
    sqrt_b: U256,
    amount0: U256,
) -> Result<u128, MathError> {
    let (lower, upper) = ordered(sqrt_a, sqrt_b)?;
    let intermediate = mul_div(lower, upper, Q96)?;
    to_liquidity(mul_div(amount0, intermediate, upper - lower)?)
}

/// L = amount1 / (sqrt_b - sqrt_a)
pub fn liquidity_for_amount1(
    sqrt_a: U256,
    sqrt_b: U256,
    amount1: U256,
) -> Result<u128, MathError> {
    let (lower, upper) = ordered(sqrt_a, sqrt_b)?;
    to_liquidity(mul_div(amount1, Q96, upper - lower)?)
}

/// Maximum liquidity that `amount0`/`amount1` can fund in `[sqrt_a, sqrt_b]`
/// at the current price. Inside the range the scarcer asset caps it.
pub fn liquidity_for_amounts(
    sqrt_price: U256,
    sqrt_a: U256,
    sqrt_b: U256,
    amount0: U256,
    amount1: U256,
) -> Result<u128, MathError> {
    let (lower, upper) = ordered(sqrt_a, sqrt_b)?;

    if sqrt_price <= lower {
        liquidity_for_amount0(lower, upper, amount0)
    } else if sqrt_price < upper {
        let liquidity0 = liquidity_for_amount0(sqrt_price, upper, amount0)?;
        let liquidity1 = liquidity_for_amount1(lower, sqrt_price, amount1)?;
        Ok(liquidity0.min(liquidity1))
    } else {
        liquidity_for_amount1(lower, upper, amount1)
    }
}

/// amount0 = L * (sqrt_b - sqrt_a) / (sqrt_a * sqrt_b)
pub fn amount0_for_liquidity(
    sqrt_a: U256,
    sqrt_b: U256,
    liquidity: u128,
) -> Result<U256, MathError> {
    let (lower, upper) = ordered(sqrt_a, sqrt_b)?;
    let numerator = U256::from(liquidity) << 96usize;
    Ok(mul_div(numerator, upper - lower, upper)? / lower)
}

/// amount1 = L * (sqrt_b - sqrt_a)
pub fn amount1_for_liquidity(
    sqrt_a: U256,
    sqrt_b: U256,
    liquidity: u128,
) -> Result<U256, MathError> {
    let (lower, upper) = ordered(sqrt_a, sqrt_b)?;
    mul_div(U256::from(liquidity), upper - lower, Q96)
}

/// Token amounts represented by `liquidity` at the current price, rounded down.
pub fn amounts_for_liquidity(
    sqrt_price: U256,
    sqrt_a: U256,
    sqrt_b: U256,
    liquidity: u128,
) -> Result<AmountPair, MathError> {
    let (lower, upper) = ordered(sqrt_a, sqrt_b)?;

    if sqrt_price <= lower {
        Ok(AmountPair::new(
            amount0_for_liquidity(lower, upper, liquidity)?,
            U256::zero(),
        ))
    } else if sqrt_price < upper {
        Ok(AmountPair::new(
            amount0_for_liquidity(sqrt_price, upper, liquidity)?,
            amount1_for_liquidity(lower, sqrt_price, liquidity)?,
        ))
    } else {
        Ok(AmountPair::new(
            U256::zero(),
            amount1_for_liquidity(lower, upper, liquidity)?,
        ))
    }
}

fn amount0_rounding_up(lower: U256, upper: U256, liquidity: u128) -> Result<U256, MathError> {
    let numerator = U256::from(liquidity) << 96usize;
    div_rounding_up(mul_div_rounding_up(numerator, upper - lower, upper)?, lower)
}

fn amount1_rounding_up(lower: U256, upper: U256, liquidity: u128) -> Result<U256, MathError> {
    mul_div_rounding_up(U256::from(liquidity), upper - lower, Q96)
}

/// Token amounts a pool requires to mint `liquidity`, rounded up.
pub fn amounts_for_liquidity_rounding_up(
    sqrt_price: U256,
    sqrt_a: U256,
    sqrt_b: U256,
    liquidity: u128,
) -> Result<AmountPair, MathError> {
    let (lower, upper) = ordered(sqrt_a, sqrt_b)?;

    if sqrt_price <= lower {
        Ok(AmountPair::new(
            amount0_rounding_up(lower, upper, liquidity)?,
            U256::zero(),
        ))
    } else if sqrt_price < upper {
        Ok(AmountPair::new(
            amount0_rounding_up(sqrt_price, upper, liquidity)?,
            amount1_rounding_up(lower, sqrt_price, liquidity)?,
        ))
    } else {
        Ok(AmountPair::new(
            U256::zero(),
            amount1_rounding_up(lower, upper, liquidity)?,
        ))
    }
}
