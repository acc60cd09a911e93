//! Atomic orchestration of ledger, strategy and vault.
//!
//! Every state-changing call runs against a draft of the whole system and
//! is committed only when it succeeds, so a failed step leaves balances,
//! positions, shares and the event journal exactly as they were.

use crate::vault::{ConcentratedLiquidityVault, DepositPreview};
use clm_vault_domain::error::Result;
use clm_vault_domain::events::LifecycleEvent;
use clm_vault_domain::fees::FeeConfig;
use clm_vault_domain::value_objects::{Address, AmountPair};
use clm_vault_protocols::ledger::atomic;
use clm_vault_protocols::pool::MarketSimulation;
use clm_vault_protocols::pool::ConcentratedPool;
use clm_vault_protocols::rewards::RewardDistributor;
use clm_vault_protocols::router::SwapRouter;
use clm_vault_strategy::strategy::{ConcentratedLiquidityStrategy, HarvestReport, StrategySnapshot};
use clm_vault_strategy::vault_strategy::{LedgerOf, VaultStrategy};
use primitive_types::U256;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct VaultSystem<S: VaultStrategy> {
    pub ledger: LedgerOf<S>,
    pub vault: ConcentratedLiquidityVault<S>,
}

impl<S: VaultStrategy> VaultSystem<S> {
    pub fn new(ledger: LedgerOf<S>, vault: ConcentratedLiquidityVault<S>) -> Self {
        Self { ledger, vault }
    }

    pub fn timestamp(&self) -> u64 {
        self.ledger.timestamp
    }

    pub fn warp(&mut self, seconds: u64) {
        self.ledger.warp(seconds);
    }

    pub fn events(&self) -> &[LifecycleEvent] {
        self.ledger.journal.events()
    }

    pub fn strategy(&self) -> &S {
        self.vault.strategy()
    }

    /// Mints pool assets to `holder`.
    pub fn fund(&mut self, holder: &Address, amount0: U256, amount1: U256) -> Result<()> {
        let (token0, token1) = self.vault.wants();
        atomic(self, |system| {
            system.ledger.tokens.mint(&token0, holder, amount0)?;
            system.ledger.tokens.mint(&token1, holder, amount1)
        })
    }

    /// Runs `op` on the strategy inside one atomic step.
    pub fn with_strategy<T, F>(&mut self, op: F) -> Result<T>
    where
        F: FnOnce(&mut S, &mut LedgerOf<S>) -> Result<T>,
    {
        atomic(self, |system| {
            let Self { ledger, vault } = system;
            op(vault.strategy_mut(), ledger)
        })
    }

    pub fn deposit(
        &mut self,
        user: &Address,
        amount0: U256,
        amount1: U256,
        min_shares: U256,
    ) -> Result<U256> {
        atomic(self, |system| {
            let Self { ledger, vault } = system;
            vault.deposit(ledger, user, amount0, amount1, min_shares)
        })
    }

    pub fn withdraw(
        &mut self,
        user: &Address,
        shares: U256,
        min0: U256,
        min1: U256,
    ) -> Result<AmountPair> {
        atomic(self, |system| {
            let Self { ledger, vault } = system;
            vault.withdraw(ledger, user, shares, min0, min1)
        })
    }

    pub fn withdraw_all(&mut self, user: &Address, min0: U256, min1: U256) -> Result<AmountPair> {
        atomic(self, |system| {
            let Self { ledger, vault } = system;
            vault.withdraw_all(ledger, user, min0, min1)
        })
    }

    pub fn preview_deposit(&self, amount0: U256, amount1: U256) -> Result<DepositPreview> {
        self.vault.preview_deposit(&self.ledger, amount0, amount1)
    }

    pub fn preview_withdraw(&self, shares: U256) -> Result<AmountPair> {
        self.vault.preview_withdraw(&self.ledger, shares)
    }

    pub fn balances(&self) -> Result<AmountPair> {
        self.vault.balances(&self.ledger)
    }

    pub fn total_supply(&self) -> U256 {
        self.vault.total_supply(&self.ledger)
    }

    pub fn balance_of(&self, holder: &Address) -> U256 {
        self.vault.balance_of(&self.ledger, holder)
    }

    pub fn token_balance(&self, token: &Address, holder: &Address) -> U256 {
        self.ledger.tokens.balance_of(token, holder)
    }

    pub fn price_per_full_share(&self) -> Result<U256> {
        self.vault.price_per_full_share(&self.ledger)
    }

    pub fn is_price_calm(&self) -> Result<bool> {
        self.vault.strategy().is_price_calm(&self.ledger)
    }
}

impl<S> VaultSystem<S>
where
    S: VaultStrategy,
    S::Pool: MarketSimulation,
{
    /// Trades the pool to `tick`.
    pub fn move_price(&mut self, tick: i32) -> Result<()> {
        atomic(self, |system| {
            let ledger = &mut system.ledger;
            let now = ledger.timestamp;
            ledger.pool.move_to_tick(&mut ledger.tokens, now, tick)?;
            debug!(tick, "price moved");
            Ok(())
        })
    }

    /// Credits swap fees to in-range liquidity.
    pub fn accrue_fees(&mut self, fees: AmountPair) -> Result<AmountPair> {
        atomic(self, |system| {
            let ledger = &mut system.ledger;
            ledger.pool.accrue_fees(&mut ledger.tokens, fees)
        })
    }
}

impl<P, R, D> VaultSystem<ConcentratedLiquidityStrategy<P, R, D>>
where
    P: ConcentratedPool,
    R: SwapRouter,
    D: RewardDistributor,
{
    pub fn harvest(&mut self, caller: &Address) -> Result<HarvestReport> {
        self.with_strategy(|strategy, ledger| strategy.harvest(ledger, caller))
    }

    pub fn move_ticks(&mut self, caller: &Address) -> Result<()> {
        self.with_strategy(|strategy, ledger| strategy.move_ticks(ledger, caller))
    }

    pub fn panic(&mut self, caller: &Address, min0: U256, min1: U256) -> Result<()> {
        self.with_strategy(|strategy, ledger| strategy.panic(ledger, caller, min0, min1))
    }

    pub fn pause(&mut self, caller: &Address) -> Result<()> {
        self.with_strategy(|strategy, ledger| strategy.pause(ledger, caller))
    }

    pub fn unpause(&mut self, caller: &Address) -> Result<()> {
        self.with_strategy(|strategy, ledger| strategy.unpause(ledger, caller))
    }

    pub fn set_position_width(&mut self, caller: &Address, width: i32) -> Result<()> {
        self.with_strategy(|strategy, ledger| strategy.set_position_width(ledger, caller, width))
    }

    pub fn set_max_tick_deviation(&mut self, caller: &Address, deviation: i32) -> Result<()> {
        self.with_strategy(|strategy, ledger| {
            strategy.set_max_tick_deviation(ledger, caller, deviation)
        })
    }

    pub fn set_twap_interval(&mut self, caller: &Address, seconds: u32) -> Result<()> {
        self.with_strategy(|strategy, ledger| strategy.set_twap_interval(ledger, caller, seconds))
    }

    pub fn set_fee_config(&mut self, caller: &Address, fees: FeeConfig) -> Result<()> {
        self.with_strategy(|strategy, ledger| strategy.set_fee_config(ledger, caller, fees))
    }

    /// Retires the strategy once only the dead-address shares remain.
    pub fn retire(&mut self, caller: &Address) -> Result<()> {
        atomic(self, |system| {
            let Self { ledger, vault } = system;
            let outstanding = vault.user_shares(ledger);
            vault
                .strategy_mut()
                .retire_vault(ledger, caller, outstanding)
        })
    }

    pub fn snapshot(&self) -> Result<StrategySnapshot> {
        self.vault.strategy().snapshot(&self.ledger)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shares::MINIMUM_SHARES;
    use crate::testing::{addr, system, units, START};
    use clm_vault_domain::error::Error;
    use clm_vault_domain::events::{EventData, LifecycleEventType};
    use clm_vault_domain::math::{PRECISION, quote_in_token1};

    fn close(a: U256, b: U256, tolerance: u64) -> bool {
        let diff = if a > b { a - b } else { b - a };
        diff <= U256::from(tolerance)
    }

    fn value(amounts: AmountPair) -> U256 {
        quote_in_token1(amounts.amount0, PRECISION).unwrap() + amounts.amount1
    }

    #[test]
    fn test_first_and_second_deposit_round_trip() {
        let mut system = system();
        let (alice, bob) = (addr("alice"), addr("bob"));

        let shares = system
            .deposit(&alice, units(1000), units(1000), U256::zero())
            .unwrap();
        assert_eq!(shares, units(2000) - U256::from(MINIMUM_SHARES));
        assert_eq!(system.total_supply(), units(2000));
        assert_eq!(
            system.balance_of(&Address::dead()),
            U256::from(MINIMUM_SHARES)
        );

        let preview = system.preview_deposit(U256::zero(), units(1000)).unwrap();
        assert!(preview.fee1 > U256::zero());
        assert!(preview.fee0.is_zero());

        let minted = system
            .deposit(&bob, U256::zero(), units(1000), U256::zero())
            .unwrap();
        assert!(minted < units(1000));
        assert!(minted > units(990));

        let last_deposit = system
            .ledger
            .journal
            .of_type(LifecycleEventType::Deposit)
            .last()
            .map(|event| event.data.clone());
        match last_deposit {
            Some(EventData::Deposit(data)) => {
                assert_eq!(data.user, bob);
                assert!(data.fees.amount1 > U256::zero());
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_withdraw_returns_pro_rata_claim() {
        let mut system = system();
        let alice = addr("alice");
        let token0 = addr("token0");
        let start = system.token_balance(&token0, &alice);

        system
            .deposit(&alice, units(100), units(100), U256::zero())
            .unwrap();
        let paid = system
            .withdraw_all(&alice, U256::zero(), U256::zero())
            .unwrap();

        // Only the dead-address minimum and rounding stay behind.
        assert!(close(paid.amount0, units(100), 2_000));
        assert!(close(paid.amount1, units(100), 2_000));
        assert_eq!(system.balance_of(&alice), U256::zero());
        assert_eq!(system.total_supply(), U256::from(MINIMUM_SHARES));
        assert!(close(system.token_balance(&token0, &alice), start, 2_000));
    }

    #[test]
    fn test_failed_deposit_rolls_back_everything() {
        let mut system = system();
        let alice = addr("alice");
        let before = system.clone();

        let err = system
            .deposit(&alice, units(10), units(10), units(100))
            .unwrap_err();
        assert!(matches!(err, Error::SlippageExceeded(_)));
        assert_eq!(system.total_supply(), U256::zero());
        assert_eq!(
            system.token_balance(&addr("token0"), &alice),
            before.token_balance(&addr("token0"), &alice)
        );
        assert_eq!(system.events().len(), before.events().len());
        assert!(system.strategy().main_range().is_none());
    }

    #[test]
    fn test_deposit_rejected_while_price_moves() {
        let mut system = system();
        system.move_price(300).unwrap();
        let err = system
            .deposit(&addr("alice"), units(1), units(1), U256::zero())
            .unwrap_err();
        assert!(matches!(err, Error::PriceNotCalm { .. }));
        assert_eq!(system.total_supply(), U256::zero());
        assert!(!system.is_price_calm().unwrap());
    }

    #[test]
    fn test_conservation_across_harvest() {
        let mut system = system();
        let (alice, bob) = (addr("alice"), addr("bob"));
        system
            .deposit(&alice, units(100), units(100), U256::zero())
            .unwrap();
        system
            .deposit(&bob, units(50), units(50), U256::zero())
            .unwrap();

        system.warp(60);
        let earned = AmountPair::new(units(3), units(3));
        system.accrue_fees(earned).unwrap();
        let report = system.harvest(&addr("keeper")).unwrap();
        system.warp(3600);

        let half = system.balance_of(&alice) / U256::from(2u8);
        let withdrawn = system
            .withdraw(&alice, half, U256::zero(), U256::zero())
            .unwrap();

        let charged = earned.checked_sub(&report.charged.remainder).unwrap();
        let reported = system.balances().unwrap();
        for (reported, withdrawn, charged) in [
            (reported.amount0, withdrawn.amount0, charged.amount0),
            (reported.amount1, withdrawn.amount1, charged.amount1),
        ] {
            let expected = units(150) + units(3) - charged;
            assert!(close(reported + withdrawn, expected, 100));
        }
    }

    #[test]
    fn test_deposit_never_dilutes_existing_holders() {
        let mut system = system();
        let (alice, bob) = (addr("alice"), addr("bob"));
        system
            .deposit(&alice, units(100), units(100), U256::zero())
            .unwrap();
        let shares = system.balance_of(&alice);
        let claim = value(system.preview_withdraw(shares).unwrap());

        system
            .deposit(&bob, U256::zero(), units(50), U256::zero())
            .unwrap();
        let after = value(system.preview_withdraw(shares).unwrap());
        assert!(after > claim);
    }

    #[test]
    fn test_fee_on_transfer_tokens_credit_received_amounts() {
        let mut system = system();
        let alice = addr("alice");
        let token1 = addr("token1");
        system.ledger.tokens.set_transfer_fee(&token1, 100).unwrap();

        let shares = system
            .deposit(&alice, units(100), units(100), U256::zero())
            .unwrap();
        // 1% of asset1 is lost in transit.
        assert_eq!(shares, units(199) - U256::from(MINIMUM_SHARES));

        let owed = system.preview_withdraw(shares).unwrap();
        let err = system
            .withdraw(&alice, shares, U256::zero(), owed.amount1)
            .unwrap_err();
        assert!(matches!(err, Error::SlippageExceeded(_)));
        assert_eq!(system.balance_of(&alice), shares);

        let paid = system
            .withdraw(&alice, shares, U256::zero(), U256::zero())
            .unwrap();
        // Two more hops: strategy to vault and vault to user.
        assert!(paid.amount1 < owed.amount1);
        assert!(paid.amount1 > owed.amount1 * U256::from(97u8) / U256::from(100u8));
    }

    #[test]
    fn test_retire_after_users_leave() {
        let mut system = system();
        let (alice, owner) = (addr("alice"), addr("owner"));
        system
            .deposit(&alice, units(10), units(10), U256::zero())
            .unwrap();
        assert!(system.retire(&owner).is_err());

        system
            .withdraw_all(&alice, U256::zero(), U256::zero())
            .unwrap();
        system.retire(&owner).unwrap();
        let snapshot = system.snapshot().unwrap();
        assert!(snapshot.paused);
        assert!(snapshot.balances_of_pool.is_zero());
        assert_eq!(
            system.deposit(&alice, units(1), units(1), U256::zero()),
            Err(Error::Paused)
        );
    }

    #[test]
    fn test_manager_calls_are_atomic() {
        let mut system = system();
        system
            .deposit(&addr("alice"), units(10), units(10), U256::zero())
            .unwrap();
        let events = system.events().len();
        assert!(system.set_position_width(&addr("keeper"), 5).is_err());
        assert!(system.set_max_tick_deviation(&addr("manager"), 1_000).is_err());
        assert_eq!(system.events().len(), events);

        system.set_twap_interval(&addr("manager"), 120).unwrap();
        system.pause(&addr("manager")).unwrap();
        assert!(system.strategy().is_paused());
        system.unpause(&addr("manager")).unwrap();
        assert_eq!(system.timestamp(), START);
    }
}
