//! The rebalancing concentrated-liquidity strategy.
//!
//! Holds a main range centred on the current tick plus an alternative range
//! that absorbs whatever the main mint leaves idle. Every state-changing
//! entry point checks its role first, then pause and calm conditions, and
//! only then touches the pool.

use crate::access::AccessControl;
use crate::calm::{CalmPeriodGuard, CalmReading};
use crate::config::{validate_position_width, Routes, StrategyConfig};
use crate::context::StrategyContext;
use crate::harvest::{charge_fees, claim_rewards, ChargedFees};
use crate::locked_profit::LockedProfit;
use crate::position::{ClaimedFees, PositionManager};
use crate::vault_strategy::{LedgerOf, VaultStrategy};
use clm_vault_domain::error::{Error, Result};
use clm_vault_domain::events::{EventData, HarvestData};
use clm_vault_domain::fees::FeeConfig;
use clm_vault_domain::math::price_from_sqrt_price;
use clm_vault_domain::value_objects::{Address, AmountPair, TickRange};
use clm_vault_protocols::ledger::Ledger;
use clm_vault_protocols::pool::ConcentratedPool;
use clm_vault_protocols::rewards::RewardDistributor;
use clm_vault_protocols::router::SwapRouter;
use primitive_types::U256;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::marker::PhantomData;
use tracing::{info, warn};

/// What a harvest produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarvestReport {
    /// Trading fees collected from the ranges.
    pub claimed_fees: ClaimedFees,
    /// Reward emissions credited in pool assets.
    pub rewards: AmountPair,
    pub charged: ChargedFees,
    /// Profit locked after this harvest, including what was still unvested.
    pub total_locked: AmountPair,
}

/// Read-only view of a strategy, suitable for reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategySnapshot {
    pub address: Address,
    /// Ledger time the snapshot was taken at.
    pub timestamp: u64,
    pub paused: bool,
    /// Live main range, if any.
    pub main: Option<TickRange>,
    /// Live alt range, if any.
    pub alt: Option<TickRange>,
    /// Half-width of the main range in tick spacings.
    pub position_width: i32,
    /// TWAP window of the calm guard, in seconds.
    pub twap_interval: u32,
    /// Calm band half-width in ticks.
    pub max_tick_deviation: i32,
    /// Asset0 priced in asset1, scaled by `1e36`.
    pub fair_price: U256,
    pub calm: CalmReading,
    /// Earnings observed since the last harvest.
    pub accrued_fees: AmountPair,
    /// Harvested profit still vesting.
    pub locked_profit: AmountPair,
    /// Idle tokens held by the strategy.
    pub balances_of_this: AmountPair,
    /// Tokens represented by live liquidity at the current price.
    pub balances_of_pool: AmountPair,
    /// Idle plus pool, less locked profit and accrued fees.
    pub reported_balances: AmountPair,
    /// Ledger time of the last harvest.
    pub last_harvest: u64,
    /// Ledger time the ranges were last recomputed.
    pub last_position_adjustment: u64,
}

/// Manages a vault's liquidity in one concentrated pool.
///
/// Holds no collaborators itself: every operation takes the [`Ledger`] that
/// owns the pool, router and reward distributor it is generic over.
#[derive(Debug, Clone)]
pub struct ConcentratedLiquidityStrategy<P, R, D> {
    address: Address,
    token0: Address,
    token1: Address,
    routes: Routes,
    context: StrategyContext,
    positions: PositionManager,
    /// Fees and rewards not yet charged.
    accrued: AmountPair,
    locked: LockedProfit,
    last_position_adjustment: u64,
    /// Timestamp of the most recent deposit.
    last_deposit: Option<u64>,
    _collaborators: PhantomData<fn() -> (P, R, D)>,
}

impl<P, R, D> ConcentratedLiquidityStrategy<P, R, D>
where
    P: ConcentratedPool,
    R: SwapRouter,
    D: RewardDistributor,
{
    pub fn new(
        address: Address,
        config: StrategyConfig,
        access: AccessControl,
        pool: &P,
    ) -> Result<Self> {
        let spacing = pool.tick_spacing();
        config.validate(spacing)?;
        let guard =
            CalmPeriodGuard::new(config.twap_interval, config.max_tick_deviation, spacing)?;
        let routes = config.routes();
        Ok(Self {
            address,
            token0: pool.token0().clone(),
            token1: pool.token1().clone(),
            routes,
            context: StrategyContext {
                guard,
                fees: config.fees,
                access,
                paused: false,
            },
            positions: PositionManager::new(config.position_width)?,
            accrued: AmountPair::zero(),
            locked: LockedProfit::new(config.locked_profit_duration),
            last_position_adjustment: 0,
            last_deposit: None,
            _collaborators: PhantomData,
        })
    }

    pub fn context(&self) -> &StrategyContext {
        &self.context
    }

    pub fn main_range(&self) -> Option<&TickRange> {
        self.positions.main()
    }

    pub fn alt_range(&self) -> Option<&TickRange> {
        self.positions.alt()
    }

    pub fn position_width(&self) -> i32 {
        self.positions.position_width()
    }

    /// Fees claimed since the last harvest, not yet charged.
    pub fn accrued_fees(&self) -> AmountPair {
        self.accrued
    }

    pub fn locked_profit_schedule(&self) -> &LockedProfit {
        &self.locked
    }

    pub fn last_harvest(&self) -> u64 {
        self.locked.last_harvest
    }

    pub fn last_position_adjustment(&self) -> u64 {
        self.last_position_adjustment
    }

    pub fn is_paused(&self) -> bool {
        self.context.paused
    }

    pub fn balances_of_this(&self, ledger: &Ledger<P, R, D>) -> AmountPair {
        AmountPair::new(
            ledger.tokens.balance_of(&self.token0, &self.address),
            ledger.tokens.balance_of(&self.token1, &self.address),
        )
    }

    /// Principal of the live ranges at the current price.
    pub fn balances_of_pool(&self, ledger: &Ledger<P, R, D>) -> Result<AmountPair> {
        self.positions.pool_balances(&ledger.pool, &self.address)
    }

    fn total_balances(&self, ledger: &Ledger<P, R, D>) -> Result<AmountPair> {
        Ok(self
            .balances_of_this(ledger)
            .checked_add(&self.balances_of_pool(ledger)?)?)
    }

    /// Profit from the last harvest that has not been released yet.
    pub fn locked_profit(&self, ledger: &Ledger<P, R, D>) -> Result<AmountPair> {
        self.locked
            .locked(ledger.timestamp, self.total_balances(ledger)?)
    }

    /// Balances attributable to shareholders right now.
    pub fn balances(&self, ledger: &Ledger<P, R, D>) -> Result<AmountPair> {
        let total = self.total_balances(ledger)?;
        let locked = self.locked.locked(ledger.timestamp, total)?;
        let unlocked = total.saturating_sub(&locked);
        Ok(unlocked.saturating_sub(&self.accrued.min(&unlocked)))
    }

    pub fn fair_price(&self, ledger: &Ledger<P, R, D>) -> Result<U256> {
        Ok(price_from_sqrt_price(ledger.pool.slot().sqrt_price)?)
    }

    pub fn calm_reading(&self, ledger: &Ledger<P, R, D>) -> Result<CalmReading> {
        self.context.guard.reading(&ledger.pool, ledger.timestamp)
    }

    pub fn snapshot(&self, ledger: &Ledger<P, R, D>) -> Result<StrategySnapshot> {
        Ok(StrategySnapshot {
            address: self.address.clone(),
            timestamp: ledger.timestamp,
            paused: self.context.paused,
            main: self.positions.main().copied(),
            alt: self.positions.alt().copied(),
            position_width: self.positions.position_width(),
            twap_interval: self.context.guard.twap_interval,
            max_tick_deviation: self.context.guard.max_tick_deviation,
            fair_price: self.fair_price(ledger)?,
            calm: self.calm_reading(ledger)?,
            accrued_fees: self.accrued,
            locked_profit: self.locked_profit(ledger)?,
            balances_of_this: self.balances_of_this(ledger),
            balances_of_pool: self.balances_of_pool(ledger)?,
            reported_balances: self.balances(ledger)?,
            last_harvest: self.locked.last_harvest,
            last_position_adjustment: self.last_position_adjustment,
        })
    }

    fn ensure_calm(&self, ledger: &Ledger<P, R, D>) -> Result<()> {
        self.context
            .guard
            .ensure_calm(&ledger.pool, ledger.timestamp)
            .map(|_| ())
    }

    fn emit_tvl(&self, ledger: &mut Ledger<P, R, D>) -> Result<()> {
        let balances = self.balances(ledger)?;
        ledger.emit(&self.address, EventData::Tvl { balances });
        Ok(())
    }

    fn emit_config(&self, ledger: &mut Ledger<P, R, D>, parameter: &str, value: impl Display) {
        ledger.emit(
            &self.address,
            EventData::ConfigChanged {
                parameter: parameter.to_string(),
                value: value.to_string(),
            },
        );
        info!(parameter, value = %value, "strategy parameter changed");
    }

    fn claim_earnings(&mut self, ledger: &mut Ledger<P, R, D>) -> Result<ClaimedFees> {
        let claimed = self.positions.claim_earnings(ledger, &self.address)?;
        let total = claimed.total()?;
        if !total.is_zero() {
            self.accrued = self.accrued.checked_add(&total)?;
            ledger.emit(
                &self.address,
                EventData::ClaimedFees {
                    main: claimed.main,
                    alt: claimed.alt,
                },
            );
        }
        Ok(claimed)
    }

    fn remove_liquidity(&mut self, ledger: &mut Ledger<P, R, D>) -> Result<AmountPair> {
        self.positions.close_all(ledger, &self.address)
    }

    fn set_ticks(&mut self, ledger: &mut Ledger<P, R, D>) -> Result<()> {
        let idle = self.balances_of_this(ledger);
        let price = self.fair_price(ledger)?;
        let tick = ledger.pool.spot_tick();
        let (main, alt) =
            self.positions
                .recompute(tick, ledger.pool.tick_spacing(), idle, price)?;
        self.last_position_adjustment = ledger.timestamp;
        ledger.emit(&self.address, EventData::TicksSet { main, alt });
        Ok(())
    }

    fn add_liquidity(&mut self, ledger: &mut Ledger<P, R, D>) -> Result<AmountPair> {
        self.positions.open_all(ledger, &self.address)
    }

    /// Pulls everything out and redeploys around the current tick.
    fn rebalance(&mut self, ledger: &mut Ledger<P, R, D>) -> Result<()> {
        self.claim_earnings(ledger)?;
        self.remove_liquidity(ledger)?;
        self.set_ticks(ledger)?;
        self.add_liquidity(ledger)?;
        Ok(())
    }

    /// Claims fees and rewards, charges the performance fee, locks the rest
    /// as profit and redeploys around the current tick.
    pub fn harvest(
        &mut self,
        ledger: &mut Ledger<P, R, D>,
        call_fee_recipient: &Address,
    ) -> Result<HarvestReport> {
        self.context.ensure_not_paused()?;
        self.ensure_calm(ledger)?;

        let claimed_fees = self.claim_earnings(ledger)?;
        self.remove_liquidity(ledger)?;
        let rewards = claim_rewards(ledger, &self.address, &self.routes)?;
        self.accrued = self.accrued.checked_add(&rewards)?;

        // Price moves can leave less of an asset than was earned in it.
        let chargeable = self.accrued.min(&self.balances_of_this(ledger));
        let charged = charge_fees(
            ledger,
            &self.context,
            &self.routes,
            &self.address,
            chargeable,
            call_fee_recipient,
        )?;

        let balances = self.total_balances(ledger)?;
        let total_locked = self
            .locked
            .relock(charged.remainder, ledger.timestamp, balances)?;
        self.accrued = AmountPair::zero();

        self.set_ticks(ledger)?;
        self.add_liquidity(ledger)?;

        ledger.emit(
            &self.address,
            EventData::Harvest(HarvestData {
                compounded: charged.remainder,
                native_fee: charged.native_fee,
                total_locked,
            }),
        );
        self.emit_tvl(ledger)?;
        info!(
            strategy = %self.address,
            compounded0 = %charged.remainder.amount0,
            compounded1 = %charged.remainder.amount1,
            native_fee = %charged.native_fee,
            "harvested"
        );
        Ok(HarvestReport {
            claimed_fees,
            rewards,
            charged,
            total_locked,
        })
    }

    /// Recentres both ranges on the current tick.
    pub fn move_ticks(&mut self, ledger: &mut Ledger<P, R, D>, caller: &Address) -> Result<()> {
        self.context.access.only_rebalancer(caller)?;
        self.context.ensure_not_paused()?;
        self.ensure_calm(ledger)?;
        self.rebalance(ledger)?;
        self.emit_tvl(ledger)?;
        info!(strategy = %self.address, tick = ledger.pool.spot_tick(), "ticks moved");
        Ok(())
    }

    pub fn set_position_width(
        &mut self,
        ledger: &mut Ledger<P, R, D>,
        caller: &Address,
        width: i32,
    ) -> Result<()> {
        self.context.access.only_manager(caller)?;
        validate_position_width(width)?;
        if self.context.paused {
            self.positions.set_position_width(width)?;
        } else {
            self.ensure_calm(ledger)?;
            self.claim_earnings(ledger)?;
            self.remove_liquidity(ledger)?;
            self.positions.set_position_width(width)?;
            self.set_ticks(ledger)?;
            self.add_liquidity(ledger)?;
        }
        self.emit_config(ledger, "position_width", width);
        Ok(())
    }

    pub fn set_max_tick_deviation(
        &mut self,
        ledger: &mut Ledger<P, R, D>,
        caller: &Address,
        deviation: i32,
    ) -> Result<()> {
        self.context.access.only_manager(caller)?;
        let spacing = ledger.pool.tick_spacing();
        self.context.guard.set_max_tick_deviation(deviation, spacing)?;
        self.emit_config(ledger, "max_tick_deviation", deviation);
        Ok(())
    }

    pub fn set_twap_interval(
        &mut self,
        ledger: &mut Ledger<P, R, D>,
        caller: &Address,
        seconds: u32,
    ) -> Result<()> {
        self.context.access.only_manager(caller)?;
        self.context.guard.set_twap_interval(seconds)?;
        self.emit_config(ledger, "twap_interval", seconds);
        Ok(())
    }

    pub fn set_fee_config(
        &mut self,
        ledger: &mut Ledger<P, R, D>,
        caller: &Address,
        fees: FeeConfig,
    ) -> Result<()> {
        self.context.access.only_manager(caller)?;
        fees.validate()?;
        let total = fees.total;
        self.context.fees = fees;
        self.emit_config(ledger, "total_fee", total);
        Ok(())
    }

    /// Pulls all liquidity and pauses. Fails if what is left for
    /// shareholders is below `min0`/`min1`.
    pub fn panic(
        &mut self,
        ledger: &mut Ledger<P, R, D>,
        caller: &Address,
        min0: U256,
        min1: U256,
    ) -> Result<()> {
        self.context.access.only_manager(caller)?;
        self.claim_earnings(ledger)?;
        self.remove_liquidity(ledger)?;
        self.context.paused = true;

        let balances = self.balances(ledger)?;
        if balances.amount0 < min0 || balances.amount1 < min1 {
            return Err(Error::SlippageExceeded(format!(
                "panic left {balances}, wanted at least ({min0}, {min1})"
            )));
        }
        ledger.emit(&self.address, EventData::Paused);
        warn!(strategy = %self.address, caller = %caller, "strategy panicked");
        Ok(())
    }

    /// Pauses without withdrawing liquidity.
    pub fn pause(&mut self, ledger: &mut Ledger<P, R, D>, caller: &Address) -> Result<()> {
        self.context.access.only_manager(caller)?;
        self.context.paused = true;
        ledger.emit(&self.address, EventData::Paused);
        info!(strategy = %self.address, "strategy paused");
        Ok(())
    }

    /// Reopens the ranges. A retired strategy stays paused.
    pub fn unpause(&mut self, ledger: &mut Ledger<P, R, D>, caller: &Address) -> Result<()> {
        self.context.access.only_manager(caller)?;
        if self.context.access.is_retired() {
            return Err(Error::Paused);
        }
        self.context.paused = false;
        self.ensure_calm(ledger)?;
        self.rebalance(ledger)?;
        ledger.emit(&self.address, EventData::Unpaused);
        self.emit_tvl(ledger)?;
        info!(strategy = %self.address, "strategy unpaused");
        Ok(())
    }

    /// Winds the strategy down for good once no user shares remain.
    pub fn retire_vault(
        &mut self,
        ledger: &mut Ledger<P, R, D>,
        caller: &Address,
        outstanding_shares: U256,
    ) -> Result<()> {
        self.context.access.only_owner(caller)?;
        if !outstanding_shares.is_zero() {
            return Err(Error::invalid_config(format!(
                "cannot retire with {outstanding_shares} user shares outstanding"
            )));
        }
        self.panic(ledger, caller, U256::zero(), U256::zero())?;
        self.context.access.mark_retired(caller)?;
        let previous = self.context.access.renounce_ownership(caller)?;
        ledger.emit(&self.address, EventData::Retired);
        ledger.emit(
            &self.address,
            EventData::OwnershipTransferred {
                previous,
                new: None,
            },
        );
        info!(strategy = %self.address, "strategy retired");
        Ok(())
    }

    pub fn transfer_ownership(&mut self, caller: &Address, new_owner: Address) -> Result<()> {
        self.context.access.transfer_ownership(caller, new_owner)
    }

    pub fn accept_ownership(&mut self, ledger: &mut Ledger<P, R, D>, caller: &Address) -> Result<()> {
        let previous = self.context.access.accept_ownership(caller)?;
        ledger.emit(
            &self.address,
            EventData::OwnershipTransferred {
                previous,
                new: Some(caller.clone()),
            },
        );
        Ok(())
    }

    pub fn set_manager(&mut self, caller: &Address, manager: Address, enabled: bool) -> Result<()> {
        self.context.access.set_manager(caller, manager, enabled)
    }

    pub fn set_rebalancer(
        &mut self,
        caller: &Address,
        rebalancer: Address,
        enabled: bool,
    ) -> Result<()> {
        self.context.access.set_rebalancer(caller, rebalancer, enabled)
    }
}

impl<P, R, D> VaultStrategy for ConcentratedLiquidityStrategy<P, R, D>
where
    P: ConcentratedPool,
    R: SwapRouter,
    D: RewardDistributor,
{
    type Pool = P;
    type Router = R;
    type Rewards = D;

    fn address(&self) -> &Address {
        &self.address
    }

    fn wants(&self) -> (Address, Address) {
        (self.token0.clone(), self.token1.clone())
    }

    fn reported_balances(&self, ledger: &LedgerOf<Self>) -> Result<AmountPair> {
        self.balances(ledger)
    }

    fn before_action(&mut self, ledger: &mut LedgerOf<Self>, caller: &Address) -> Result<()> {
        self.context.access.only_vault(caller)?;
        self.claim_earnings(ledger)?;
        self.remove_liquidity(ledger)?;
        Ok(())
    }

    fn deposit(&mut self, ledger: &mut LedgerOf<Self>, caller: &Address) -> Result<()> {
        self.context.access.only_vault(caller)?;
        self.context.ensure_not_paused()?;
        self.ensure_calm(ledger)?;
        self.set_ticks(ledger)?;
        self.add_liquidity(ledger)?;
        self.last_deposit = Some(ledger.timestamp);
        self.emit_tvl(ledger)
    }

    fn withdraw(
        &mut self,
        ledger: &mut LedgerOf<Self>,
        caller: &Address,
        amount0: U256,
        amount1: U256,
    ) -> Result<()> {
        self.context.access.only_vault(caller)?;
        let now = ledger.timestamp;
        // Same-block deposit and withdraw must not profit from a skewed price.
        if self.last_deposit == Some(now) {
            self.ensure_calm(ledger)?;
        }
        ledger
            .tokens
            .transfer(&self.token0, &self.address, caller, amount0)?;
        ledger
            .tokens
            .transfer(&self.token1, &self.address, caller, amount1)?;

        if !self.context.paused {
            if self.context.guard.is_calm(&ledger.pool, now)? {
                self.add_liquidity(ledger)?;
            } else {
                warn!(strategy = %self.address, "price not calm, remaining balances left idle");
            }
        }
        self.emit_tvl(ledger)
    }

    fn current_fair_price(&self, ledger: &LedgerOf<Self>) -> Result<U256> {
        self.fair_price(ledger)
    }

    fn is_price_calm(&self, ledger: &LedgerOf<Self>) -> Result<bool> {
        self.context.guard.is_calm(&ledger.pool, ledger.timestamp)
    }

    fn ensure_price_calm(&self, ledger: &LedgerOf<Self>) -> Result<()> {
        self.ensure_calm(ledger)
    }

    fn swap_fee_pips(&self, ledger: &LedgerOf<Self>) -> u32 {
        ledger.pool.fee_pips()
    }
}
