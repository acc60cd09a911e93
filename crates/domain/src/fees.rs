//! Performance-fee configuration.
//!
//! Rates are fractions scaled by [`FEE_SCALE`] (1e18 = 100%). `total` is
//! taken from harvested earnings; `call` and `strategist` are shares of that
//! cut and the treasury receives whatever is left.

use crate::error::{Error, Result};
use crate::value_objects::Address;
use primitive_types::U256;
use serde::{Deserialize, Serialize};

/// `1e18`, the denominator of every fee rate.
pub const FEE_SCALE: u64 = 1_000_000_000_000_000_000;

/// Upper bound on the performance fee taken from earnings (25%).
pub const MAX_TOTAL_FEE: u64 = 250_000_000_000_000_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeConfig {
    /// Fraction of harvested earnings taken as fees.
    pub total: U256,
    /// Fraction of the fee paid to whoever triggered the harvest.
    pub call: U256,
    /// Fraction of the fee paid to the strategist.
    pub strategist: U256,
    pub strategist_recipient: Address,
    pub treasury: Address,
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            total: U256::from(95_000_000_000_000_000u64),
            call: U256::from(10_000_000_000_000_000u64),
            strategist: U256::from(50_000_000_000_000_000u64),
            strategist_recipient: Address::new("strategist"),
            treasury: Address::new("treasury"),
        }
    }
}

/// How one harvest's native-asset fee is divided.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSplit {
    pub call: U256,
    pub strategist: U256,
    pub treasury: U256,
}

impl FeeConfig {
    #[must_use]
    pub fn with_total(mut self, total: impl Into<U256>) -> Self {
        self.total = total.into();
        self
    }

    #[must_use]
    pub fn with_call(mut self, call: impl Into<U256>) -> Self {
        self.call = call.into();
        self
    }

    #[must_use]
    pub fn with_strategist(mut self, strategist: impl Into<U256>) -> Self {
        self.strategist = strategist.into();
        self
    }

    #[must_use]
    pub fn with_recipients(mut self, strategist: Address, treasury: Address) -> Self {
        self.strategist_recipient = strategist;
        self.treasury = treasury;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.total > U256::from(MAX_TOTAL_FEE) {
            return Err(Error::invalid_config(format!(
                "total fee {} exceeds maximum {MAX_TOTAL_FEE}",
                self.total
            )));
        }
        let shares = self
            .call
            .checked_add(self.strategist)
            .ok_or_else(|| Error::invalid_config("fee shares overflow"))?;
        if shares > U256::from(FEE_SCALE) {
            return Err(Error::invalid_config(
                "call and strategist shares exceed the whole fee",
            ));
        }
        Ok(())
    }

    /// Part of `earned` taken as fees.
    pub fn fee_on(&self, earned: U256) -> Result<U256> {
        Ok(crate::math::mul_div(earned, self.total, U256::from(FEE_SCALE))?)
    }

    /// Splits a native-asset fee between caller, strategist and treasury.
    pub fn split(&self, native_fee: U256) -> Result<FeeSplit> {
        let scale = U256::from(FEE_SCALE);
        let call = crate::math::mul_div(native_fee, self.call, scale)?;
        let strategist = crate::math::mul_div(native_fee, self.strategist, scale)?;
        Ok(FeeSplit {
            call,
            strategist,
            treasury: native_fee - call - strategist,
        })
    }
}
