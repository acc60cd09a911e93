//! Sliding deposit fee.
//!
//! A deposit that matches the reserve ratio costs nothing. Whatever part of
//! it exceeds its proportional share (the fill) is charged the pool swap fee
//! scaled by how large the fill is relative to the reserves on its side, so a
//! fill that is tiny against the reserves is nearly free and one that dwarfs
//! them pays close to the full swap fee.

use clm_vault_domain::error::Result;
use clm_vault_domain::math::{mul_div, mul_div_rounding_up, quote_in_token0, quote_in_token1};
use clm_vault_domain::value_objects::AmountPair;
use clm_vault_domain::MathError;
use primitive_types::U256;
use serde::{Deserialize, Serialize};

/// Denominator of pool fees expressed in pips.
pub const PIPS_SCALE: u64 = 1_000_000;

/// A deposit split into the amounts credited and the fee withheld.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositFees {
    /// Amounts credited to the depositor.
    pub credited: AmountPair,
    pub fees: AmountPair,
}

impl DepositFees {
    fn free(offered: AmountPair) -> Self {
        Self {
            credited: offered,
            fees: AmountPair::zero(),
        }
    }
}

/// `ceil(fill × fee_pips × fill_value / (1e6 × (fill_value + side_reserve)))`,
/// never more than `offered`.
fn fill_fee(
    fill: U256,
    fill_value: U256,
    side_reserve: U256,
    fee_pips: u32,
    offered: U256,
) -> Result<U256> {
    if fill.is_zero() {
        return Ok(U256::zero());
    }
    let numerator = fill_value
        .checked_mul(U256::from(fee_pips))
        .ok_or(MathError::Overflow)?;
    let denominator = fill_value
        .checked_add(side_reserve)
        .and_then(|sum| sum.checked_mul(U256::from(PIPS_SCALE)))
        .ok_or(MathError::Overflow)?;
    let fee = mul_div_rounding_up(fill, numerator, denominator)?;
    Ok(fee.min(offered))
}

/// Splits `offered` into credited amounts and the sliding fee, given the
/// vault `reserves`, the fair `price` (1e36) and the pool fee in pips.
pub fn deposit_amounts(
    offered: AmountPair,
    reserves: AmountPair,
    price: U256,
    fee_pips: u32,
) -> Result<DepositFees> {
    if fee_pips == 0 || offered.is_zero() {
        return Ok(DepositFees::free(offered));
    }
    let reserve0_value = quote_in_token1(reserves.amount0, price)?;
    let reserve1_value = reserves.amount1;
    let reserve_value = reserve0_value
        .checked_add(reserve1_value)
        .ok_or(MathError::Overflow)?;
    if reserve_value.is_zero() {
        return Ok(DepositFees::free(offered));
    }

    let offered0_value = quote_in_token1(offered.amount0, price)?;
    let offered1_value = offered.amount1;
    let offered_value = offered0_value
        .checked_add(offered1_value)
        .ok_or(MathError::Overflow)?;

    let proportional1 = mul_div(offered_value, reserve1_value, reserve_value)?;
    let proportional0 = offered_value - proportional1;

    let mut fees = AmountPair::zero();
    if offered1_value > proportional1 {
        let fill_value = offered1_value - proportional1;
        fees.amount1 = fill_fee(
            fill_value,
            fill_value,
            reserve1_value,
            fee_pips,
            offered.amount1,
        )?;
    } else if offered0_value > proportional0 {
        let fill_value = offered0_value - proportional0;
        let fill = quote_in_token0(fill_value, price)?.min(offered.amount0);
        fees.amount0 = fill_fee(fill, fill_value, reserve0_value, fee_pips, offered.amount0)?;
    }

    Ok(DepositFees {
        credited: offered.saturating_sub(&fees),
        fees,
    })
}
