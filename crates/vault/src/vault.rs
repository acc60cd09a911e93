//! Share-accounting vault in front of a [`VaultStrategy`].
//!
//! The vault never holds assets between calls. Deposits go straight to the
//! strategy and withdrawals pass through the vault only to measure what
//! actually arrived, so fee-on-transfer tokens are credited correctly.

use crate::config::VaultConfig;
use crate::reentrancy::ReentrancyGuard;
use crate::shares::{amounts_for_shares, shares_for_deposit, value_in_token1};
use crate::sliding_fee::deposit_amounts;
use clm_vault_domain::error::{Error, Result};
use clm_vault_domain::events::{DepositData, EventData, WithdrawData};
use clm_vault_domain::math::mul_div;
use clm_vault_domain::value_objects::{Address, AmountPair};
use clm_vault_protocols::ledger::Ledger;
use clm_vault_strategy::vault_strategy::{LedgerOf, VaultStrategy};
use primitive_types::U256;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Unit of [`ConcentratedLiquidityVault::price_per_full_share`].
pub const SHARE_PRICE_SCALE: u64 = 1_000_000_000_000_000_000;

/// What a deposit would mint right now.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositPreview {
    /// Shares minted to the depositor.
    pub shares: U256,
    /// Asset0 credited after the sliding fee.
    pub amount0: U256,
    /// Asset1 credited after the sliding fee.
    pub amount1: U256,
    /// Sliding fee kept from asset0.
    pub fee0: U256,
    /// Sliding fee kept from asset1.
    pub fee1: U256,
}

/// Share token over a [`VaultStrategy`]: mints on deposit, burns on
/// withdrawal and prices shares from the strategy's reported balances.
#[derive(Debug, Clone)]
pub struct ConcentratedLiquidityVault<S> {
    config: VaultConfig,
    strategy: S,
    guard: ReentrancyGuard,
}

impl<S: VaultStrategy> ConcentratedLiquidityVault<S> {
    pub fn new(config: VaultConfig, strategy: S) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            strategy,
            guard: ReentrancyGuard::default(),
        })
    }

    pub fn address(&self) -> &Address {
        &self.config.address
    }

    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    pub fn strategy_mut(&mut self) -> &mut S {
        &mut self.strategy
    }

    pub fn wants(&self) -> (Address, Address) {
        self.strategy.wants()
    }

    pub fn total_supply(&self, ledger: &LedgerOf<S>) -> U256 {
        ledger.tokens.total_supply(&self.config.address)
    }

    pub fn balance_of(&self, ledger: &LedgerOf<S>, holder: &Address) -> U256 {
        ledger.tokens.balance_of(&self.config.address, holder)
    }

    /// Shares not locked at the dead address.
    pub fn user_shares(&self, ledger: &LedgerOf<S>) -> U256 {
        self.total_supply(ledger)
            .saturating_sub(self.balance_of(ledger, &Address::dead()))
    }

    /// Reported balances of the strategy.
    pub fn balances(&self, ledger: &LedgerOf<S>) -> Result<AmountPair> {
        self.strategy.reported_balances(ledger)
    }

    /// Value of one whole share (1e18) in asset1, scaled by 1e18.
    pub fn price_per_full_share(&self, ledger: &LedgerOf<S>) -> Result<U256> {
        let supply = self.total_supply(ledger);
        let scale = U256::from(SHARE_PRICE_SCALE);
        if supply.is_zero() {
            return Ok(scale);
        }
        let price = self.strategy.current_fair_price(ledger)?;
        let value = value_in_token1(self.balances(ledger)?, price)?;
        Ok(mul_div(value, scale, supply)?)
    }

    pub fn preview_deposit(
        &self,
        ledger: &LedgerOf<S>,
        amount0: U256,
        amount1: U256,
    ) -> Result<DepositPreview> {
        let reserves = self.balances(ledger)?;
        let price = self.strategy.current_fair_price(ledger)?;
        let split = deposit_amounts(
            AmountPair::new(amount0, amount1),
            reserves,
            price,
            self.strategy.swap_fee_pips(ledger),
        )?;
        let (shares, _) =
            shares_for_deposit(split.credited, reserves, self.total_supply(ledger), price)?;
        Ok(DepositPreview {
            shares,
            amount0: split.credited.amount0,
            amount1: split.credited.amount1,
            fee0: split.fees.amount0,
            fee1: split.fees.amount1,
        })
    }

    pub fn preview_withdraw(&self, ledger: &LedgerOf<S>, shares: U256) -> Result<AmountPair> {
        amounts_for_shares(shares, self.balances(ledger)?, self.total_supply(ledger))
    }

    /// Deposits `amount0`/`amount1` from `user` and returns the shares minted.
    pub fn deposit(
        &mut self,
        ledger: &mut LedgerOf<S>,
        user: &Address,
        amount0: U256,
        amount1: U256,
        min_shares: U256,
    ) -> Result<U256> {
        self.guard.enter()?;
        let result = self.deposit_locked(ledger, user, amount0, amount1, min_shares);
        self.guard.exit();
        result
    }

    fn deposit_locked(
        &mut self,
        ledger: &mut LedgerOf<S>,
        user: &Address,
        amount0: U256,
        amount1: U256,
        min_shares: U256,
    ) -> Result<U256> {
        if amount0.is_zero() && amount1.is_zero() {
            return Err(Error::ZeroAmounts);
        }
        self.strategy.ensure_price_calm(ledger)?;

        let vault = self.config.address.clone();
        self.strategy.before_action(ledger, &vault)?;
        let reserves = self.strategy.reported_balances(ledger)?;
        let price = self.strategy.current_fair_price(ledger)?;
        let supply = self.total_supply(ledger);

        let (token0, token1) = self.strategy.wants();
        let strategy = self.strategy.address().clone();
        let received = AmountPair::new(
            transfer_measured(ledger, &token0, user, &strategy, amount0)?,
            transfer_measured(ledger, &token1, user, &strategy, amount1)?,
        );

        let split = deposit_amounts(received, reserves, price, self.strategy.swap_fee_pips(ledger))?;
        let (shares, locked) = shares_for_deposit(split.credited, reserves, supply, price)?;
        if shares.is_zero() {
            return Err(Error::ZeroShares);
        }
        if shares < min_shares {
            return Err(Error::SlippageExceeded(format!(
                "deposit would mint {shares} shares, wanted at least {min_shares}"
            )));
        }

        if !locked.is_zero() {
            ledger.tokens.mint(&vault, &Address::dead(), locked)?;
        }
        ledger.tokens.mint(&vault, user, shares)?;
        self.strategy.deposit(ledger, &vault)?;

        ledger.emit(
            &vault,
            EventData::Deposit(DepositData {
                user: user.clone(),
                shares,
                amounts: split.credited,
                fees: split.fees,
            }),
        );
        info!(
            user = %user,
            shares = %shares,
            amount0 = %split.credited.amount0,
            amount1 = %split.credited.amount1,
            fee0 = %split.fees.amount0,
            fee1 = %split.fees.amount1,
            "deposit"
        );
        Ok(shares)
    }

    /// Burns `shares` of `user` and returns the amounts the user received.
    pub fn withdraw(
        &mut self,
        ledger: &mut LedgerOf<S>,
        user: &Address,
        shares: U256,
        min0: U256,
        min1: U256,
    ) -> Result<AmountPair> {
        self.guard.enter()?;
        let result = self.withdraw_locked(ledger, user, shares, min0, min1);
        self.guard.exit();
        result
    }

    pub fn withdraw_all(
        &mut self,
        ledger: &mut LedgerOf<S>,
        user: &Address,
        min0: U256,
        min1: U256,
    ) -> Result<AmountPair> {
        let shares = self.balance_of(ledger, user);
        self.withdraw(ledger, user, shares, min0, min1)
    }

    fn withdraw_locked(
        &mut self,
        ledger: &mut LedgerOf<S>,
        user: &Address,
        shares: U256,
        min0: U256,
        min1: U256,
    ) -> Result<AmountPair> {
        if shares.is_zero() {
            return Err(Error::ZeroShares);
        }
        let vault = self.config.address.clone();
        self.strategy.before_action(ledger, &vault)?;
        let reserves = self.strategy.reported_balances(ledger)?;
        let supply = self.total_supply(ledger);

        ledger.tokens.burn(&vault, user, shares)?;
        let owed = amounts_for_shares(shares, reserves, supply)?;
        if owed.is_zero() {
            return Err(Error::ZeroAmounts);
        }

        let (token0, token1) = self.strategy.wants();
        let before = AmountPair::new(
            ledger.tokens.balance_of(&token0, &vault),
            ledger.tokens.balance_of(&token1, &vault),
        );
        self.strategy
            .withdraw(ledger, &vault, owed.amount0, owed.amount1)?;
        let arrived = AmountPair::new(
            ledger.tokens.balance_of(&token0, &vault),
            ledger.tokens.balance_of(&token1, &vault),
        )
        .saturating_sub(&before);
        debug!(owed = %owed, arrived = %arrived, "strategy paid out");

        let paid = AmountPair::new(
            transfer_measured(ledger, &token0, &vault, user, arrived.amount0)?,
            transfer_measured(ledger, &token1, &vault, user, arrived.amount1)?,
        );
        if paid.amount0 < min0 || paid.amount1 < min1 {
            return Err(Error::SlippageExceeded(format!(
                "withdraw paid {paid}, wanted at least ({min0}, {min1})"
            )));
        }

        ledger.emit(
            &vault,
            EventData::Withdraw(WithdrawData {
                user: user.clone(),
                shares,
                amounts: paid,
            }),
        );
        info!(user = %user, shares = %shares, amount0 = %paid.amount0, amount1 = %paid.amount1, "withdraw");
        Ok(paid)
    }
}

/// Transfers and returns the balance change observed at `to`.
fn transfer_measured<P, R, D>(
    ledger: &mut Ledger<P, R, D>,
    token: &Address,
    from: &Address,
    to: &Address,
    amount: U256,
) -> Result<U256> {
    let before = ledger.tokens.balance_of(token, to);
    ledger.tokens.transfer(token, from, to, amount)?;
    Ok(ledger.tokens.balance_of(token, to).saturating_sub(before))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{addr, system, units};

    #[test]
    fn test_empty_vault_share_price() {
        let system = system();
        assert_eq!(
            system.vault.price_per_full_share(&system.ledger).unwrap(),
            U256::from(SHARE_PRICE_SCALE)
        );
    }

    #[test]
    fn test_nested_deposit_rejected() {
        let mut system = system();
        system.vault.guard.enter().unwrap();
        let crate::system::VaultSystem { ledger, vault } = &mut system;
        let err = vault
            .deposit(ledger, &addr("alice"), units(1), units(1), U256::zero())
            .unwrap_err();
        assert_eq!(err, Error::Reentrancy);
        // The rejected call leaves the outer lock in place.
        assert!(vault.guard.is_entered());
    }

    #[test]
    fn test_zero_inputs_rejected() {
        let mut system = system();
        let crate::system::VaultSystem { ledger, vault } = &mut system;
        let alice = addr("alice");
        assert_eq!(
            vault.deposit(ledger, &alice, U256::zero(), U256::zero(), U256::zero()),
            Err(Error::ZeroAmounts)
        );
        assert_eq!(
            vault.withdraw(ledger, &alice, U256::zero(), U256::zero(), U256::zero()),
            Err(Error::ZeroShares)
        );
        assert!(!vault.guard.is_entered());
    }

    #[test]
    fn test_preview_matches_deposit() {
        let mut system = system();
        let alice = addr("alice");
        let preview = system
            .vault
            .preview_deposit(&system.ledger, units(10), units(10))
            .unwrap();
        let crate::system::VaultSystem { ledger, vault } = &mut system;
        let shares = vault
            .deposit(ledger, &alice, units(10), units(10), U256::zero())
            .unwrap();
        assert_eq!(shares, preview.shares);
        assert_eq!(vault.balance_of(ledger, &alice), shares);
        assert_eq!(vault.user_shares(ledger), shares);
    }
}
