//! Fungible token balances of every account on the ledger.

use clm_vault_domain::error::{Error, MathError, Result};
use clm_vault_domain::value_objects::Address;
use primitive_types::U256;
use std::collections::{BTreeMap, BTreeSet};
use tracing::trace;

const BPS: u32 = 10_000;

/// Balances keyed by token then holder.
///
/// Tokens may charge a transfer fee (burned on transfer) unless either side
/// of the transfer is fee-exempt.
#[derive(Debug, Clone, Default)]
pub struct TokenLedger {
    balances: BTreeMap<Address, BTreeMap<Address, U256>>,
    supplies: BTreeMap<Address, U256>,
    transfer_fee_bps: BTreeMap<Address, u32>,
    fee_exempt: BTreeSet<Address>,
}

impl TokenLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance_of(&self, token: &Address, holder: &Address) -> U256 {
        self.balances
            .get(token)
            .and_then(|holders| holders.get(holder))
            .copied()
            .unwrap_or_default()
    }

    pub fn total_supply(&self, token: &Address) -> U256 {
        self.supplies.get(token).copied().unwrap_or_default()
    }

    /// Charges `bps` basis points on every non-exempt transfer of `token`.
    pub fn set_transfer_fee(&mut self, token: &Address, bps: u32) -> Result<()> {
        if bps >= BPS {
            return Err(Error::invalid_config(format!(
                "transfer fee {bps} bps must be below {BPS}"
            )));
        }
        self.transfer_fee_bps.insert(token.clone(), bps);
        Ok(())
    }

    pub fn exempt_from_fees(&mut self, account: &Address) {
        self.fee_exempt.insert(account.clone());
    }

    pub fn mint(&mut self, token: &Address, to: &Address, amount: U256) -> Result<()> {
        let supply = self.supplies.entry(token.clone()).or_default();
        *supply = supply.checked_add(amount).ok_or(MathError::Overflow)?;
        let balance = self
            .balances
            .entry(token.clone())
            .or_default()
            .entry(to.clone())
            .or_default();
        *balance = balance.checked_add(amount).ok_or(MathError::Overflow)?;
        trace!(token = %token, to = %to, amount = %amount, "mint");
        Ok(())
    }

    pub fn burn(&mut self, token: &Address, from: &Address, amount: U256) -> Result<()> {
        self.debit(token, from, amount)?;
        let supply = self.supplies.entry(token.clone()).or_default();
        *supply = supply.saturating_sub(amount);
        trace!(token = %token, from = %from, amount = %amount, "burn");
        Ok(())
    }

    /// Moves `amount` and returns what `to` actually received.
    pub fn transfer(
        &mut self,
        token: &Address,
        from: &Address,
        to: &Address,
        amount: U256,
    ) -> Result<U256> {
        if amount.is_zero() {
            return Ok(U256::zero());
        }
        let fee = self.transfer_fee(token, from, to, amount);
        self.debit(token, from, amount)?;
        let received = amount - fee;
        let balance = self
            .balances
            .entry(token.clone())
            .or_default()
            .entry(to.clone())
            .or_default();
        *balance = balance.checked_add(received).ok_or(MathError::Overflow)?;
        if !fee.is_zero() {
            let supply = self.supplies.entry(token.clone()).or_default();
            *supply = supply.saturating_sub(fee);
        }
        trace!(token = %token, from = %from, to = %to, amount = %amount, fee = %fee, "transfer");
        Ok(received)
    }

    fn transfer_fee(&self, token: &Address, from: &Address, to: &Address, amount: U256) -> U256 {
        if self.fee_exempt.contains(from) || self.fee_exempt.contains(to) {
            return U256::zero();
        }
        match self.transfer_fee_bps.get(token) {
            // bps < 10_000 so the product never exceeds amount * 2^14.
            Some(bps) if *bps > 0 => {
                amount / U256::from(BPS) * U256::from(*bps)
                    + amount % U256::from(BPS) * U256::from(*bps) / U256::from(BPS)
            }
            _ => U256::zero(),
        }
    }

    fn debit(&mut self, token: &Address, from: &Address, amount: U256) -> Result<()> {
        let balance = self
            .balances
            .get_mut(token)
            .and_then(|holders| holders.get_mut(from));
        match balance {
            Some(balance) if *balance >= amount => {
                *balance -= amount;
                Ok(())
            }
            other => Err(Error::external(format!(
                "insufficient {token} balance of {from}: has {}, needs {amount}",
                other.map(|b| *b).unwrap_or_default()
            ))),
        }
    }
}
