use crate::error::MathError;
use crate::math::price_tick::{amount_from_decimal, amount_to_decimal};
use crate::value_objects::Address;
use primitive_types::U256;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Static metadata of an ERC20-like asset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Token {
    pub address: Address,
    pub symbol: String,
    pub decimals: u8,
    pub name: String,
}

impl Token {
    pub fn new(
        address: impl Into<Address>,
        symbol: impl Into<String>,
        decimals: u8,
        name: impl Into<String>,
    ) -> Self {
        Self {
            address: address.into(),
            symbol: symbol.into(),
            decimals,
            name: name.into(),
        }
    }

    /// Raw units of a human-readable amount, truncated to `decimals`.
    pub fn to_raw(&self, amount: Decimal) -> Result<U256, MathError> {
        amount_from_decimal(amount, self.decimals)
    }

    pub fn to_human(&self, raw: U256) -> Result<Decimal, MathError> {
        amount_to_decimal(raw, self.decimals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_unit_conversions() {
        let usdc = Token::new("usdc", "USDC", 6, "USD Coin");
        assert_eq!(usdc.to_raw(dec!(12.5)).unwrap(), U256::from(12_500_000u64));
        assert_eq!(usdc.to_human(U256::from(1_000_001u64)).unwrap(), dec!(1.000001));
        assert_eq!(usdc.address, Address::new("usdc"));
    }
}
