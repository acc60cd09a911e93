//! Swap routing used to convert harvested tokens.

use crate::tokens::TokenLedger;
use clm_vault_domain::error::{Error, Result};
use clm_vault_domain::math::mul_div;
use clm_vault_domain::value_objects::Address;
use primitive_types::U256;
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// `1e18`, the scale of router exchange rates.
pub const RATE_SCALE: u64 = 1_000_000_000_000_000_000;

pub trait SwapRouter: Clone + fmt::Debug {
    fn address(&self) -> &Address;

    /// Output of swapping `amount_in` along `path` without executing it.
    fn quote(&self, path: &[Address], amount_in: U256) -> Result<U256>;

    /// Swaps `amount_in` of `path[0]` from `sender` into the last token of
    /// `path`, paid back to `sender`.
    fn swap(
        &mut self,
        tokens: &mut TokenLedger,
        sender: &Address,
        path: &[Address],
        amount_in: U256,
    ) -> Result<U256>;
}

/// Router quoting fixed exchange rates and paying out of its own inventory.
#[derive(Debug, Clone)]
pub struct OracleRouter {
    address: Address,
    /// Units of `to` per 1e18 units of `from`.
    rates: BTreeMap<(Address, Address), U256>,
    fee_bps: u32,
}

impl OracleRouter {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            rates: BTreeMap::new(),
            fee_bps: 0,
        }
    }

    #[must_use]
    pub fn with_fee_bps(mut self, fee_bps: u32) -> Self {
        self.fee_bps = fee_bps.min(10_000);
        self
    }

    /// Sets the rate for `from -> to` and its inverse.
    #[must_use]
    pub fn with_rate(mut self, from: &Address, to: &Address, rate: U256) -> Self {
        self.set_rate(from, to, rate);
        self
    }

    pub fn set_rate(&mut self, from: &Address, to: &Address, rate: U256) {
        self.rates.insert((from.clone(), to.clone()), rate);
        if !rate.is_zero() {
            let scale = U256::from(RATE_SCALE);
            let inverse = scale * scale / rate;
            self.rates.insert((to.clone(), from.clone()), inverse);
        }
    }

    fn hop(&self, from: &Address, to: &Address, amount: U256) -> Result<U256> {
        let rate = self
            .rates
            .get(&(from.clone(), to.clone()))
            .ok_or_else(|| Error::external(format!("no route from {from} to {to}")))?;
        let gross = mul_div(amount, *rate, U256::from(RATE_SCALE))?;
        Ok(mul_div(
            gross,
            U256::from(10_000 - self.fee_bps),
            U256::from(10_000u32),
        )?)
    }
}

impl SwapRouter for OracleRouter {
    fn address(&self) -> &Address {
        &self.address
    }

    fn quote(&self, path: &[Address], amount_in: U256) -> Result<U256> {
        if path.len() < 2 {
            return Err(Error::external("swap path needs at least two tokens"));
        }
        path.windows(2)
            .try_fold(amount_in, |amount, hop| self.hop(&hop[0], &hop[1], amount))
    }

    fn swap(
        &mut self,
        tokens: &mut TokenLedger,
        sender: &Address,
        path: &[Address],
        amount_in: U256,
    ) -> Result<U256> {
        let amount_out = self.quote(path, amount_in)?;
        let (Some(token_in), Some(token_out)) = (path.first(), path.last()) else {
            return Err(Error::external("swap path needs at least two tokens"));
        };
        if amount_in.is_zero() {
            return Ok(U256::zero());
        }
        let received = tokens.transfer(token_in, sender, &self.address, amount_in)?;
        if received < amount_in {
            return Err(Error::external("router received less than the swap input"));
        }
        let paid = tokens.transfer(token_out, &self.address, sender, amount_out)?;
        debug!(
            router = %self.address,
            token_in = %token_in,
            token_out = %token_out,
            amount_in = %amount_in,
            amount_out = %paid,
            "swapped"
        );
        Ok(paid)
    }
}
