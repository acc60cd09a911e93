//! Scenario runner.
//!
//! Builds a vault over an in-memory pool and replays a price path against
//! it. Each step the price moves, traders pay fees, and after the keeper
//! delay the keeper acts and scheduled user flows execute. Every call goes
//! through [`VaultSystem`], so a rejected action leaves no trace.

use crate::config::{SECONDS_PER_DAY, ScenarioConfig, ScheduledFlow};
use crate::keepers::{Keeper, KeeperAction, KeeperContext};
use crate::state::{ScenarioResult, ScenarioSummary, StepOutcome, StepRecord};
use crate::volume::VolumeModel;
use clm_vault::config::VaultConfig;
use clm_vault::system::VaultSystem;
use clm_vault::vault::ConcentratedLiquidityVault;
use clm_vault_domain::enums::PoolFamily;
use clm_vault_domain::error::{Error, MathError, Result};
use clm_vault_domain::math::mul_div;
use clm_vault_domain::math::price_tick::{amount_from_decimal, amount_to_decimal, price_to_tick};
use clm_vault_domain::math::{MAX_TICK, MIN_TICK};
use clm_vault_domain::value_objects::{Address, AmountPair};
use clm_vault_protocols::ledger::Ledger;
use clm_vault_protocols::pool::{
    ConcentratedPool, MarketSimulation, PoolParams, UniswapV3Pool, VelodromePool,
};
use clm_vault_protocols::rewards::StreamingRewards;
use clm_vault_protocols::router::{OracleRouter, RATE_SCALE};
use clm_vault_protocols::tokens::TokenLedger;
use clm_vault_strategy::access::AccessControl;
use clm_vault_strategy::strategy::ConcentratedLiquidityStrategy;
use primitive_types::U256;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

pub type SimStrategy<P> = ConcentratedLiquidityStrategy<P, OracleRouter, StreamingRewards>;
pub type SimSystem<P> = VaultSystem<SimStrategy<P>>;

/// Ledger time of the first step; the pool has existed since zero.
pub const GENESIS: u64 = SECONDS_PER_DAY;

/// Decimals of the native fee asset, the reward token and router rates.
const DECIMALS: u8 = 18;

fn address(name: &str) -> Address {
    Address::new(name)
}

fn raw(amount: Decimal) -> Result<U256> {
    Ok(amount_from_decimal(amount, DECIMALS)?)
}

fn human(amount: U256) -> Result<Decimal> {
    Ok(amount_to_decimal(amount, DECIMALS)?)
}

/// Raw-unit price of a token1-per-token0 price.
fn raw_price(config: &ScenarioConfig, price: Decimal) -> Result<Decimal> {
    let gap = i32::from(config.token1.decimals) - i32::from(config.token0.decimals);
    let shift = Decimal::from(10u64.pow(gap.unsigned_abs()));
    let shifted = if gap >= 0 {
        price.checked_mul(shift)
    } else {
        price.checked_div(shift)
    };
    Ok(shifted.ok_or(MathError::Overflow)?)
}

fn tick_for(config: &ScenarioConfig, price: Decimal) -> Result<i32> {
    let tick = price_to_tick(raw_price(config, price)?)?;
    Ok(tick.clamp(MIN_TICK + 1, MAX_TICK - 1))
}

/// Runs `config` over `prices`, where `prices[0]` is the opening price.
pub fn run_scenario<V: VolumeModel>(
    config: &ScenarioConfig,
    prices: &[Decimal],
    volume: &mut V,
) -> Result<ScenarioResult> {
    config.validate()?;
    let opening = prices
        .first()
        .copied()
        .ok_or_else(|| Error::invalid_config("price path is empty"))?;
    let params = PoolParams::default()
        .with_tokens(config.token0.address.clone(), config.token1.address.clone())
        .with_tick_spacing(config.tick_spacing)
        .with_fee_pips(config.fee_pips)
        .with_initial_tick(tick_for(config, opening)?)
        .with_external_liquidity(config.external_liquidity);

    match config.pool_family {
        PoolFamily::UniswapV3 => {
            ScenarioRunner::new(config, UniswapV3Pool::new(params, 0)?, opening)?.run(prices, volume)
        }
        PoolFamily::Velodrome => {
            ScenarioRunner::new(config, VelodromePool::new(params, 0)?, opening)?.run(prices, volume)
        }
    }
}

#[derive(Debug, Default)]
struct Tally {
    steps_in_range: u64,
    harvests: u32,
    rebalances: u32,
    skipped_not_calm: u32,
    rejected_flows: u32,
    native_fees: U256,
    fees_earned: AmountPair,
    last_harvest_step: u64,
    last_rebalance_step: u64,
}

pub struct ScenarioRunner<'a, P>
where
    P: ConcentratedPool + MarketSimulation,
{
    config: &'a ScenarioConfig,
    system: SimSystem<P>,
    keeper: Box<dyn Keeper>,
    keeper_address: Address,
    depositors: Vec<Address>,
    tally: Tally,
}

impl<'a, P> ScenarioRunner<'a, P>
where
    P: ConcentratedPool + MarketSimulation,
{
    pub fn new(config: &'a ScenarioConfig, pool: P, opening_price: Decimal) -> Result<Self> {
        let (token0, token1) = (pool.token0().clone(), pool.token1().clone());
        let native = config.strategy.native.clone();
        let router_address = address("router");
        let gauge = address("gauge");
        let reward = address("reward");

        let router = OracleRouter::new(router_address.clone())
            .with_rate(&token0, &native, raw(raw_price(config, opening_price)?)?)
            .with_rate(&token1, &native, U256::from(RATE_SCALE))
            .with_rate(&reward, &token0, U256::from(RATE_SCALE));

        let mut tokens = TokenLedger::new();
        tokens.exempt_from_fees(pool.address());
        tokens.exempt_from_fees(&router_address);
        tokens.exempt_from_fees(&gauge);
        let inventory = U256::from(10u64).pow(U256::from(30u8));
        for token in [&token0, &token1, &native, &reward] {
            tokens.mint(token, &router_address, inventory)?;
        }

        let mut ledger = Ledger::new(
            GENESIS,
            tokens,
            pool,
            router,
            StreamingRewards::new(gauge, reward),
        );
        if !config.reward_per_day.is_zero() {
            let total = raw(config.reward_per_day * config.duration_days())?;
            let duration = config.steps as u64 * config.step_seconds;
            let Ledger {
                tokens, rewards, ..
            } = &mut ledger;
            rewards.notify_reward(tokens, &router_address, total, duration, GENESIS)?;
        }

        let keeper_address = address("keeper");
        let access = AccessControl::new(address("owner"), address("vault"))
            .with_manager(address("manager"))
            .with_rebalancer(keeper_address.clone());
        let strategy = ConcentratedLiquidityStrategy::new(
            address("strategy"),
            config.strategy.clone(),
            access,
            &ledger.pool,
        )?;
        let vault = ConcentratedLiquidityVault::new(VaultConfig::default(), strategy)?;
        let keeper = config.keeper.build();
        info!(
            keeper = keeper.name(),
            family = ?config.pool_family,
            steps = config.steps,
            "scenario prepared"
        );

        Ok(Self {
            config,
            system: VaultSystem::new(ledger, vault),
            keeper,
            keeper_address,
            depositors: Vec::new(),
            tally: Tally::default(),
        })
    }

    pub fn system(&self) -> &SimSystem<P> {
        &self.system
    }

    pub fn run<V: VolumeModel>(mut self, prices: &[Decimal], volume: &mut V) -> Result<ScenarioResult> {
        let opening = prices
            .first()
            .copied()
            .ok_or_else(|| Error::invalid_config("price path is empty"))?;
        self.execute_flows(0)?;
        let initial_share_price = self.share_price()?;

        let steps = self.config.steps.min(prices.len().saturating_sub(1));
        let mut records = Vec::with_capacity(steps);
        for (step, price) in prices.iter().copied().enumerate().skip(1).take(steps) {
            records.push(self.step(step, price, volume)?);
        }

        let final_price = records.last().map_or(opening, |r| r.price);
        let final_share_price = self.share_price()?;
        let snapshot = self.system.snapshot()?;
        let withdrawn = if self.config.withdraw_at_end {
            self.withdraw_everyone()?
        } else {
            AmountPair::zero()
        };

        let tally = &self.tally;
        let summary = ScenarioSummary {
            config: self.config.clone(),
            keeper: self.keeper.name().to_string(),
            initial_price: opening,
            final_price,
            total_steps: records.len() as u64,
            steps_in_range: tally.steps_in_range,
            harvests: tally.harvests,
            rebalances: tally.rebalances,
            skipped_not_calm: tally.skipped_not_calm,
            rejected_flows: tally.rejected_flows,
            native_fees: human(tally.native_fees)?,
            fees_earned0: self.config.token0.to_human(tally.fees_earned.amount0)?,
            fees_earned1: self.config.token1.to_human(tally.fees_earned.amount1)?,
            initial_share_price,
            final_share_price,
            withdrawn0: self.config.token0.to_human(withdrawn.amount0)?,
            withdrawn1: self.config.token1.to_human(withdrawn.amount1)?,
            events: self.system.events().len(),
        };
        info!(
            harvests = summary.harvests,
            rebalances = summary.rebalances,
            skipped = summary.skipped_not_calm,
            share_price = %summary.final_share_price,
            "scenario finished"
        );
        Ok(ScenarioResult {
            summary,
            records,
            snapshot,
        })
    }

    fn step<V: VolumeModel>(&mut self, step: usize, price: Decimal, volume: &mut V) -> Result<StepRecord> {
        let config = self.config;
        self.system
            .warp(config.step_seconds - config.keeper_delay_seconds);

        let tick = tick_for(config, price)?;
        self.system.move_price(tick)?;
        let (token0, token1) = self.system.vault.wants();
        let native = config.strategy.native.clone();
        self.system
            .ledger
            .router
            .set_rate(&token0, &native, raw(raw_price(config, price)?)?);
        let fees_earned = self.system.accrue_fees(self.trading_fees(step, price, volume)?)?;
        self.tally.fees_earned = self.tally.fees_earned.checked_add(&fees_earned)?;

        self.system.warp(config.keeper_delay_seconds);
        let calm = self.system.is_price_calm()?;
        let step_number = step as u64;
        let context = KeeperContext {
            step: step_number,
            spot_tick: self.system.ledger.pool.spot_tick(),
            main_range: self.system.strategy().main_range().copied(),
            steps_since_harvest: step_number - self.tally.last_harvest_step,
            steps_since_rebalance: step_number - self.tally.last_rebalance_step,
        };
        let action = self.keeper.evaluate(&context);
        let outcome = self.act(step_number, action)?;
        self.execute_flows(step)?;

        let spot = self.system.ledger.pool.spot_tick();
        let in_range = self
            .system
            .strategy()
            .main_range()
            .is_some_and(|range| range.contains(spot));
        if in_range {
            self.tally.steps_in_range += 1;
        }

        Ok(StepRecord {
            step: step_number,
            timestamp: self.system.timestamp(),
            price,
            tick,
            calm,
            action,
            outcome,
            in_range,
            fees_earned,
            reported_balances: self.system.balances()?,
            share_price: self.share_price()?,
        })
    }

    /// Swap fees paid by one step of volume, half in each asset.
    fn trading_fees<V: VolumeModel>(&self, step: usize, price: Decimal, volume: &mut V) -> Result<AmountPair> {
        let config = self.config;
        let traded = volume.daily_volume(step) * Decimal::from(config.step_seconds)
            / Decimal::from(SECONDS_PER_DAY);
        let fee = traded * Decimal::from(config.fee_pips) / Decimal::from(1_000_000);
        let half = fee / Decimal::TWO;
        Ok(AmountPair::new(
            config.token0.to_raw(half / price)?,
            config.token1.to_raw(half)?,
        ))
    }

    fn act(&mut self, step: u64, action: KeeperAction) -> Result<StepOutcome> {
        let keeper = self.keeper_address.clone();
        let result = match action {
            KeeperAction::Hold => return Ok(StepOutcome::Held),
            KeeperAction::Harvest => self
                .system
                .harvest(&keeper)
                .map(|report| StepOutcome::Harvested {
                    native_fee: report.charged.native_fee,
                }),
            KeeperAction::MoveTicks => self
                .system
                .move_ticks(&keeper)
                .map(|()| StepOutcome::Rebalanced),
        };

        match result {
            Ok(outcome) => {
                if let StepOutcome::Harvested { native_fee } = outcome {
                    self.tally.harvests += 1;
                    self.tally.native_fees += native_fee;
                    self.tally.last_harvest_step = step;
                }
                // Harvesting re-centers too.
                self.tally.rebalances += u32::from(outcome == StepOutcome::Rebalanced);
                self.tally.last_rebalance_step = step;
                Ok(outcome)
            }
            Err(Error::PriceNotCalm { spot, twap, .. }) => {
                warn!(step, ?action, spot, twap, "keeper action skipped, price not calm");
                self.tally.skipped_not_calm += 1;
                Ok(StepOutcome::SkippedNotCalm)
            }
            Err(err) => Err(err),
        }
    }

    fn execute_flows(&mut self, step: usize) -> Result<()> {
        let config = self.config;
        for flow in config.flows.iter().filter(|flow| flow.step() == step) {
            let result = match flow {
                ScheduledFlow::Deposit {
                    user,
                    amount0,
                    amount1,
                    ..
                } => self.deposit(user, *amount0, *amount1),
                ScheduledFlow::Withdraw { user, fraction, .. } => self.withdraw(user, *fraction),
            };
            match result {
                Ok(()) => {}
                Err(err @ (Error::PriceNotCalm { .. } | Error::ZeroShares | Error::ZeroAmounts)) => {
                    warn!(step, user = %flow.user(), error = %err, "flow rejected");
                    self.tally.rejected_flows += 1;
                }
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    fn deposit(&mut self, user: &Address, amount0: Decimal, amount1: Decimal) -> Result<()> {
        let (amount0, amount1) = (
            self.config.token0.to_raw(amount0)?,
            self.config.token1.to_raw(amount1)?,
        );
        self.system.fund(user, amount0, amount1)?;
        let shares = self
            .system
            .deposit(user, amount0, amount1, U256::zero())?;
        if !self.depositors.contains(user) {
            self.depositors.push(user.clone());
        }
        debug!(user = %user, shares = %shares, "scenario deposit");
        Ok(())
    }

    fn withdraw(&mut self, user: &Address, fraction: Decimal) -> Result<()> {
        let balance = self.system.balance_of(user);
        let shares = mul_div(balance, raw(fraction)?, U256::from(RATE_SCALE))?;
        let paid = self
            .system
            .withdraw(user, shares, U256::zero(), U256::zero())?;
        debug!(user = %user, shares = %shares, paid = %paid, "scenario withdraw");
        Ok(())
    }

    fn withdraw_everyone(&mut self) -> Result<AmountPair> {
        let mut total = AmountPair::zero();
        for user in self.depositors.clone() {
            if self.system.balance_of(&user).is_zero() {
                continue;
            }
            let paid = self
                .system
                .withdraw_all(&user, U256::zero(), U256::zero())?;
            total = total.checked_add(&paid)?;
        }
        Ok(total)
    }

    fn share_price(&self) -> Result<Decimal> {
        let price = self.system.price_per_full_share()?;
        Ok(self.config.token1.to_human(price)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keepers::KeeperPolicy;
    use crate::price_path::{DeterministicPricePath, PricePathGenerator};
    use crate::volume::ConstantVolume;
    use clm_vault_domain::token::Token;
    use rust_decimal_macros::dec;

    fn flat(steps: usize) -> Vec<Decimal> {
        vec![dec!(1); steps + 1]
    }

    fn volume() -> ConstantVolume {
        ConstantVolume::new(dec!(100000))
    }

    #[test]
    fn test_flat_market_compounds_fees() {
        let config = ScenarioConfig::default().with_steps(48).with_keeper(KeeperPolicy::Periodic {
            harvest_interval: 24,
            rebalance_interval: None,
        });
        let result = run_scenario(&config, &flat(48), &mut volume()).unwrap();
        let summary = &result.summary;

        assert_eq!(result.records.len(), 48);
        assert_eq!(summary.harvests, 2);
        assert_eq!(summary.skipped_not_calm, 0);
        assert_eq!(summary.steps_in_range, 48);
        assert!(summary.fees_earned0 > Decimal::ZERO);
        assert!(summary.native_fees > Decimal::ZERO);
        assert!(summary.final_share_price > summary.initial_share_price);
        assert!(summary.withdrawn0 > Decimal::ZERO && summary.withdrawn1 > Decimal::ZERO);
        assert!(matches!(
            result.records[23].outcome,
            StepOutcome::Harvested { .. }
        ));
    }

    #[test]
    fn test_jump_is_skipped_until_calm() {
        let config = ScenarioConfig::default()
            .with_steps(4)
            .with_keeper_delay(30)
            .with_keeper(KeeperPolicy::Threshold {
                threshold_ticks: 300,
                harvest_interval: 0,
            });
        let prices = vec![dec!(1), dec!(1), dec!(1.2), dec!(1.2), dec!(1.2)];
        let result = run_scenario(&config, &prices, &mut volume()).unwrap();
        let records = &result.records;

        assert_eq!(records[1].outcome, StepOutcome::SkippedNotCalm);
        assert!(!records[1].calm);
        assert_eq!(records[2].outcome, StepOutcome::Rebalanced);
        assert_eq!(result.summary.skipped_not_calm, 1);
        assert_eq!(result.summary.rebalances, 1);
        assert!(records[3].in_range);
        let main = result.snapshot.main.unwrap();
        assert!(main.contains(records[3].tick));
    }

    #[test]
    fn test_deposit_rejected_while_price_moves() {
        let config = ScenarioConfig::default()
            .with_steps(3)
            .with_keeper_delay(30)
            .with_flow(ScheduledFlow::Deposit {
                step: 2,
                user: Address::new("bob"),
                amount0: dec!(10),
                amount1: dec!(10),
            })
            .with_flow(ScheduledFlow::Deposit {
                step: 3,
                user: Address::new("carol"),
                amount0: dec!(10),
                amount1: dec!(10),
            });
        let prices = vec![dec!(1), dec!(1), dec!(1.1), dec!(1.1)];
        let result = run_scenario(&config, &prices, &mut volume()).unwrap();
        assert_eq!(result.summary.rejected_flows, 1);
    }

    #[test]
    fn test_partial_withdraw_flow() {
        let config = ScenarioConfig::default()
            .with_steps(4)
            .with_flow(ScheduledFlow::Withdraw {
                step: 2,
                user: Address::new("alice"),
                fraction: dec!(0.5),
            });
        let prices = DeterministicPricePath::linear(dec!(1), dec!(1.01), 4).generate(4);
        let result = run_scenario(&config, &prices, &mut volume()).unwrap();
        let before = result.records[0].reported_balances;
        let after = result.records[1].reported_balances;
        assert!(after.amount0 < before.amount0 && after.amount1 < before.amount1);
        assert_eq!(result.summary.rejected_flows, 0);
    }

    #[test]
    fn test_velodrome_with_rewards() {
        let config = ScenarioConfig::default()
            .with_steps(24)
            .with_pool_family(PoolFamily::Velodrome)
            .with_reward_per_day(dec!(10))
            .with_keeper(KeeperPolicy::Periodic {
                harvest_interval: 12,
                rebalance_interval: None,
            });
        let result = run_scenario(&config, &flat(24), &mut volume()).unwrap();
        assert_eq!(result.summary.harvests, 2);
        assert!(result.summary.final_share_price > result.summary.initial_share_price);
    }

    #[test]
    fn test_mixed_decimals() {
        let mut config = ScenarioConfig::default()
            .with_steps(12)
            .with_initial_price(dec!(2000))
            .with_tokens(
                Token::new("weth", "WETH", 18, "Wrapped Ether"),
                Token::new("usdc", "USDC", 6, "USD Coin"),
            )
            .with_keeper(KeeperPolicy::Periodic {
                harvest_interval: 6,
                rebalance_interval: None,
            });
        config.external_liquidity = 0;
        config.flows = vec![ScheduledFlow::Deposit {
            step: 0,
            user: Address::new("alice"),
            amount0: dec!(1),
            amount1: dec!(2000),
        }];

        let result = run_scenario(&config, &vec![dec!(2000); 13], &mut volume()).unwrap();
        let summary = &result.summary;
        // 2000 USDC per WETH is about tick -200311 in raw units.
        assert!((-200_400..-200_200).contains(&result.records[0].tick));
        assert_eq!(summary.harvests, 2);
        assert!(summary.fees_earned1 > Decimal::ZERO);
        assert!(summary.final_share_price > summary.initial_share_price);
        assert!(summary.withdrawn0 > dec!(0.9) && summary.withdrawn1 > dec!(1800));
    }

    #[test]
    fn test_empty_path_rejected() {
        let config = ScenarioConfig::default();
        assert!(run_scenario(&config, &[], &mut volume()).is_err());
    }
}
