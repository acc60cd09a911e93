//! Fixtures shared by the vault tests.

use crate::config::VaultConfig;
use crate::system::VaultSystem;
use crate::vault::ConcentratedLiquidityVault;
use clm_vault_domain::value_objects::Address;
use clm_vault_protocols::ledger::Ledger;
use clm_vault_protocols::pool::{PoolParams, UniswapV3Pool};
use clm_vault_protocols::rewards::StreamingRewards;
use clm_vault_protocols::router::{OracleRouter, RATE_SCALE};
use clm_vault_protocols::tokens::TokenLedger;
use clm_vault_strategy::access::AccessControl;
use clm_vault_strategy::config::StrategyConfig;
use clm_vault_strategy::strategy::ConcentratedLiquidityStrategy;
use primitive_types::U256;

pub type TestStrategy = ConcentratedLiquidityStrategy<UniswapV3Pool, OracleRouter, StreamingRewards>;
pub type TestSystem = VaultSystem<TestStrategy>;

pub const START: u64 = 10_000;

pub fn addr(s: &str) -> Address {
    Address::new(s)
}

pub fn units(n: u64) -> U256 {
    U256::from(n) * U256::from(10u64).pow(U256::from(18u8))
}

/// Vault over a tick-0 pool; alice and bob hold a million of each asset.
pub fn system() -> TestSystem {
    let pool = UniswapV3Pool::new(PoolParams::default(), 0).expect("pool");
    let router = OracleRouter::new(addr("router"))
        .with_rate(&addr("token0"), &addr("native"), U256::from(RATE_SCALE))
        .with_rate(&addr("token1"), &addr("native"), U256::from(RATE_SCALE));
    let rewards = StreamingRewards::new(addr("gauge"), addr("reward"));

    let mut tokens = TokenLedger::new();
    tokens.exempt_from_fees(&addr("pool"));
    tokens.exempt_from_fees(&addr("router"));
    let inventory = U256::from(10u64).pow(U256::from(30u8));
    for token in ["token0", "token1", "native"] {
        tokens
            .mint(&addr(token), &addr("router"), inventory)
            .expect("mint");
    }
    let ledger = Ledger::new(START, tokens, pool, router, rewards);

    let access = AccessControl::new(addr("owner"), addr("vault"))
        .with_manager(addr("manager"))
        .with_rebalancer(addr("keeper"));
    let config = StrategyConfig::default()
        .with_twap_interval(60)
        .with_locked_profit_duration(3600);
    let strategy = ConcentratedLiquidityStrategy::new(addr("strategy"), config, access, &ledger.pool)
        .expect("strategy");
    let vault = ConcentratedLiquidityVault::new(VaultConfig::default(), strategy).expect("vault");

    let mut system = VaultSystem::new(ledger, vault);
    for user in ["alice", "bob"] {
        system
            .fund(&addr(user), units(1_000_000), units(1_000_000))
            .expect("fund");
    }
    system
}
