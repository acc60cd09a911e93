//! The surface a vault uses to drive its strategy.

use clm_vault_domain::error::Result;
use clm_vault_domain::value_objects::{Address, AmountPair};
use clm_vault_protocols::ledger::Ledger;
use clm_vault_protocols::pool::ConcentratedPool;
use clm_vault_protocols::rewards::RewardDistributor;
use clm_vault_protocols::router::SwapRouter;
use primitive_types::U256;
use std::fmt;

/// Ledger type a strategy operates on.
pub type LedgerOf<S> = Ledger<
    <S as VaultStrategy>::Pool,
    <S as VaultStrategy>::Router,
    <S as VaultStrategy>::Rewards,
>;

pub trait VaultStrategy: Clone + fmt::Debug {
    type Pool: ConcentratedPool;
    type Router: SwapRouter;
    type Rewards: RewardDistributor;

    fn address(&self) -> &Address;

    /// The two assets the vault takes, in pool order.
    fn wants(&self) -> (Address, Address);

    /// Idle plus deployed balances, net of locked profit and unharvested fees.
    fn reported_balances(&self, ledger: &LedgerOf<Self>) -> Result<AmountPair>;

    /// Claims fees and pulls all liquidity so balances can be read exactly.
    fn before_action(&mut self, ledger: &mut LedgerOf<Self>, caller: &Address) -> Result<()>;

    /// Redeploys idle balances after the vault transferred a deposit in.
    fn deposit(&mut self, ledger: &mut LedgerOf<Self>, caller: &Address) -> Result<()>;

    /// Sends `amount0`/`amount1` to the vault and redeploys the rest.
    fn withdraw(
        &mut self,
        ledger: &mut LedgerOf<Self>,
        caller: &Address,
        amount0: U256,
        amount1: U256,
    ) -> Result<()>;

    /// Price of asset0 in asset1 at `1e36` precision.
    fn current_fair_price(&self, ledger: &LedgerOf<Self>) -> Result<U256>;

    fn is_price_calm(&self, ledger: &LedgerOf<Self>) -> Result<bool>;

    /// Fails with `PriceNotCalm` outside the calm band.
    fn ensure_price_calm(&self, ledger: &LedgerOf<Self>) -> Result<()>;

    /// Pool swap fee in hundredths of a basis point.
    fn swap_fee_pips(&self, ledger: &LedgerOf<Self>) -> u32;
}
