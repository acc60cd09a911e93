use crate::error::MathError;
use primitive_types::U256;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Amounts of the two pool assets, always in `(asset0, asset1)` order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmountPair {
    pub amount0: U256,
    pub amount1: U256,
}

impl AmountPair {
    pub fn new(amount0: impl Into<U256>, amount1: impl Into<U256>) -> Self {
        Self {
            amount0: amount0.into(),
            amount1: amount1.into(),
        }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    pub fn is_zero(&self) -> bool {
        self.amount0.is_zero() && self.amount1.is_zero()
    }

    /// True when either side is zero.
    pub fn any_zero(&self) -> bool {
        self.amount0.is_zero() || self.amount1.is_zero()
    }

    pub fn checked_add(&self, other: &Self) -> Result<Self, MathError> {
        Ok(Self {
            amount0: self
                .amount0
                .checked_add(other.amount0)
                .ok_or(MathError::Overflow)?,
            amount1: self
                .amount1
                .checked_add(other.amount1)
                .ok_or(MathError::Overflow)?,
        })
    }

    pub fn checked_sub(&self, other: &Self) -> Result<Self, MathError> {
        Ok(Self {
            amount0: self
                .amount0
                .checked_sub(other.amount0)
                .ok_or(MathError::Overflow)?,
            amount1: self
                .amount1
                .checked_sub(other.amount1)
                .ok_or(MathError::Overflow)?,
        })
    }

    pub fn saturating_sub(&self, other: &Self) -> Self {
        Self {
            amount0: self.amount0.saturating_sub(other.amount0),
            amount1: self.amount1.saturating_sub(other.amount1),
        }
    }

    /// Component-wise minimum.
    pub fn min(&self, other: &Self) -> Self {
        Self {
            amount0: self.amount0.min(other.amount0),
            amount1: self.amount1.min(other.amount1),
        }
    }
}

impl fmt::Display for AmountPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.amount0, self.amount1)
    }
}
