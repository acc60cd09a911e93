//! Fixtures shared by the strategy tests.

use crate::access::AccessControl;
use crate::calm::CalmPeriodGuard;
use crate::config::{Routes, StrategyConfig};
use crate::context::StrategyContext;
use crate::strategy::ConcentratedLiquidityStrategy;
use clm_vault_domain::fees::FeeConfig;
use clm_vault_domain::value_objects::Address;
use clm_vault_protocols::ledger::Ledger;
use clm_vault_protocols::pool::{ConcentratedPool, PoolParams, UniswapV3Pool};
use clm_vault_protocols::rewards::StreamingRewards;
use clm_vault_protocols::router::{OracleRouter, RATE_SCALE};
use clm_vault_protocols::tokens::TokenLedger;
use primitive_types::U256;

pub type LedgerWith<P> = Ledger<P, OracleRouter, StreamingRewards>;
pub type TestLedger = LedgerWith<UniswapV3Pool>;
pub type StrategyWith<P> = ConcentratedLiquidityStrategy<P, OracleRouter, StreamingRewards>;
pub type TestStrategy = StrategyWith<UniswapV3Pool>;

/// Ledger time the fixtures start at.
pub const START: u64 = 10_000;

pub fn addr(s: &str) -> Address {
    Address::new(s)
}

/// Uniswap-style pool at `tick` since time zero.
pub fn ledger_at_tick(tick: i32) -> TestLedger {
    let params = PoolParams::default().with_initial_tick(tick);
    ledger_with(UniswapV3Pool::new(params, 0).expect("pool"))
}

/// Ledger around `pool` with a router funded with every token.
pub fn ledger_with<P>(pool: P) -> LedgerWith<P> {
    let router = OracleRouter::new(addr("router"))
        .with_rate(&addr("token0"), &addr("native"), U256::from(RATE_SCALE))
        .with_rate(&addr("token1"), &addr("native"), U256::from(RATE_SCALE))
        .with_rate(&addr("reward"), &addr("token0"), U256::from(2 * RATE_SCALE));
    let rewards = StreamingRewards::new(addr("gauge"), addr("reward"));

    let mut tokens = TokenLedger::new();
    tokens.exempt_from_fees(&addr("pool"));
    tokens.exempt_from_fees(&addr("router"));
    let inventory = U256::from(10u64).pow(U256::from(30u8));
    for token in ["token0", "token1", "native", "reward"] {
        tokens
            .mint(&addr(token), &addr("router"), inventory)
            .expect("mint");
    }
    Ledger::new(START, tokens, pool, router, rewards)
}

pub fn fund<P>(ledger: &mut LedgerWith<P>, holder: &Address, amount0: U256, amount1: U256) {
    ledger
        .tokens
        .mint(&addr("token0"), holder, amount0)
        .expect("mint token0");
    ledger
        .tokens
        .mint(&addr("token1"), holder, amount1)
        .expect("mint token1");
}

pub fn routes() -> Routes {
    StrategyConfig::default().with_native(addr("native")).routes()
}

pub fn context() -> StrategyContext {
    StrategyContext {
        guard: CalmPeriodGuard::new(60, 60, 60).expect("guard"),
        fees: FeeConfig::default(),
        access: AccessControl::new(addr("owner"), addr("vault")),
        paused: false,
    }
}

pub fn config() -> StrategyConfig {
    StrategyConfig::default()
        .with_position_width(10)
        .with_max_tick_deviation(60)
        .with_twap_interval(60)
        .with_locked_profit_duration(3_600)
        .with_native(addr("native"))
}

pub fn strategy(ledger: &TestLedger) -> TestStrategy {
    strategy_for(&ledger.pool)
}

pub fn strategy_for<P: ConcentratedPool>(pool: &P) -> StrategyWith<P> {
    let access = AccessControl::new(addr("owner"), addr("vault"))
        .with_manager(addr("manager"))
        .with_rebalancer(addr("keeper"));
    ConcentratedLiquidityStrategy::new(addr("strategy"), config(), access, pool)
        .expect("strategy")
}
