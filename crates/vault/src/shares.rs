//! Share issuance and redemption math.

use clm_vault_domain::error::{Error, Result};
use clm_vault_domain::math::{mul_div, quote_in_token1};
use clm_vault_domain::value_objects::AmountPair;
use clm_vault_domain::MathError;
use primitive_types::U256;

/// Shares burned to the dead address on the first deposit.
pub const MINIMUM_SHARES: u64 = 1_000;

/// Value of `amounts` in asset1 at `price` (1e36).
pub fn value_in_token1(amounts: AmountPair, price: U256) -> Result<U256> {
    quote_in_token1(amounts.amount0, price)?
        .checked_add(amounts.amount1)
        .ok_or_else(|| MathError::Overflow.into())
}

/// Shares for depositing `credited` into a vault holding `reserves` with
/// `supply` shares outstanding.
///
/// The second element is the amount to lock at the dead address, non-zero
/// only for the first deposit.
pub fn shares_for_deposit(
    credited: AmountPair,
    reserves: AmountPair,
    supply: U256,
    price: U256,
) -> Result<(U256, U256)> {
    let value = value_in_token1(credited, price)?;
    if supply.is_zero() {
        let minimum = U256::from(MINIMUM_SHARES);
        if value <= minimum {
            return Err(Error::ZeroShares);
        }
        return Ok((value - minimum, minimum));
    }
    let reserve_value = value_in_token1(reserves, price)?;
    Ok((mul_div(value, supply, reserve_value)?, U256::zero()))
}

/// Pro-rata claim of `shares` on `reserves`.
pub fn amounts_for_shares(shares: U256, reserves: AmountPair, supply: U256) -> Result<AmountPair> {
    if supply.is_zero() {
        return Ok(AmountPair::zero());
    }
    Ok(AmountPair::new(
        mul_div(reserves.amount0, shares, supply)?,
        mul_div(reserves.amount1, shares, supply)?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clm_vault_domain::math::PRECISION;

    #[test]
    fn test_first_deposit_locks_minimum() {
        let (shares, locked) = shares_for_deposit(
            AmountPair::new(1000u64, 1000u64),
            AmountPair::zero(),
            U256::zero(),
            PRECISION,
        )
        .unwrap();
        assert_eq!(shares, U256::from(1000u64));
        assert_eq!(locked, U256::from(MINIMUM_SHARES));
    }

    #[test]
    fn test_dust_first_deposit_rejected() {
        let result = shares_for_deposit(
            AmountPair::new(400u64, 600u64),
            AmountPair::zero(),
            U256::zero(),
            PRECISION,
        );
        assert_eq!(result, Err(Error::ZeroShares));
    }

    #[test]
    fn test_second_deposit_is_pro_rata() {
        // (1000, 1000) reserves backing 2000 shares; 999 credited after fee.
        let (shares, locked) = shares_for_deposit(
            AmountPair::new(0u64, 999u64),
            AmountPair::new(1000u64, 1000u64),
            U256::from(2000u64),
            PRECISION,
        )
        .unwrap();
        assert_eq!(shares, U256::from(999u64));
        assert!(locked.is_zero());
    }

    #[test]
    fn test_redemption_rounds_down() {
        let amounts = amounts_for_shares(
            U256::from(333u64),
            AmountPair::new(1000u64, 10u64),
            U256::from(1000u64),
        )
        .unwrap();
        assert_eq!(amounts, AmountPair::new(333u64, 3u64));
        assert!(amounts_for_shares(U256::one(), AmountPair::new(5u64, 5u64), U256::zero())
            .unwrap()
            .is_zero());
    }
}
