//! Human-readable price helpers used by reports and the CLI.
//!
//! These go through `f64`/[`Decimal`] and are never used for ledger math.

use crate::error::MathError;
use crate::math::price::PRECISION;
use primitive_types::U256;
use rust_decimal::Decimal;
use rust_decimal::prelude::*;

const DISPLAY_SCALE: u32 = 10;

/// Returns the price corresponding to a given tick.
/// P = 1.0001 ^ tick
pub fn tick_to_price(tick: i32) -> Result<Decimal, MathError> {
    let price_f64 = 1.0001f64.powi(tick);
    Decimal::from_f64(price_f64).ok_or(MathError::Overflow)
}

/// Returns the nearest tick for a given price.
/// tick = log_1.0001(P)
pub fn price_to_tick(price: Decimal) -> Result<i32, MathError> {
    if price <= Decimal::ZERO {
        return Err(MathError::DivisionByZero);
    }
    let price_f64 = price.to_f64().ok_or(MathError::Overflow)?;
    Ok(price_f64.log(1.0001f64).round() as i32)
}

/// Converts a `1e36`-scaled fair price to a [`Decimal`] with ten decimals.
pub fn fair_price_to_decimal(price: U256) -> Result<Decimal, MathError> {
    let divisor = PRECISION / U256::from(10u64).pow(U256::from(DISPLAY_SCALE));
    let scaled = price / divisor;
    if scaled > U256::from(i128::MAX as u128) {
        return Err(MathError::Overflow);
    }
    Decimal::try_from_i128_with_scale(scaled.low_u128() as i128, DISPLAY_SCALE)
        .map_err(|_| MathError::Overflow)
}

/// Formats a raw token amount with `decimals` places.
pub fn amount_to_decimal(amount: U256, decimals: u8) -> Result<Decimal, MathError> {
    if amount > U256::from(i128::MAX as u128) {
        return Err(MathError::Overflow);
    }
    Decimal::try_from_i128_with_scale(amount.low_u128() as i128, u32::from(decimals))
        .map_err(|_| MathError::Overflow)
}

/// Converts a human-readable amount to raw units with `decimals` places,
/// truncating anything finer.
pub fn amount_from_decimal(amount: Decimal, decimals: u8) -> Result<U256, MathError> {
    if amount.is_sign_negative() {
        return Err(MathError::Overflow);
    }
    let normalized = amount.normalize();
    let ten = U256::from(10u8);
    let unit = ten
        .checked_pow(U256::from(decimals))
        .ok_or(MathError::Overflow)?;
    let divisor = ten.pow(U256::from(normalized.scale()));
    let mantissa = U256::from(normalized.mantissa().unsigned_abs());
    Ok(mantissa.checked_mul(unit).ok_or(MathError::Overflow)? / divisor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_tick_to_price() {
        // Tick 0 -> Price 1
        let p = tick_to_price(0).unwrap();
        assert_eq!(p, Decimal::from(1));

        // Tick 100 -> 1.0001^100 ~= 1.010049
        let p100 = tick_to_price(100).unwrap();
        let diff = (p100.to_f64().unwrap() - 1.01004966).abs();
        assert!(diff < 0.000001);
    }

    #[test]
    fn test_price_to_tick() {
        assert_eq!(price_to_tick(Decimal::from(1)).unwrap(), 0);
        assert_eq!(price_to_tick(dec!(1.01004966)).unwrap(), 100);
        assert!(price_to_tick(Decimal::ZERO).is_err());
    }

    #[test]
    fn test_fair_price_to_decimal() {
        assert_eq!(fair_price_to_decimal(PRECISION).unwrap(), dec!(1));
        let half = PRECISION / U256::from(2u8);
        assert_eq!(fair_price_to_decimal(half).unwrap(), dec!(0.5));
    }

    #[test]
    fn test_amount_to_decimal() {
        let amount = U256::from(1_500_000u64);
        assert_eq!(amount_to_decimal(amount, 6).unwrap(), dec!(1.5));
    }

    #[test]
    fn test_amount_from_decimal() {
        let expected = U256::from(1_500_000_000_000_000_000u64);
        assert_eq!(amount_from_decimal(dec!(1.5), 18).unwrap(), expected);
        assert_eq!(amount_from_decimal(dec!(0.1234567), 6).unwrap(), U256::from(123_456u64));
        assert!(amount_from_decimal(dec!(-1), 18).is_err());
    }
}
