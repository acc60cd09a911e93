//! Pool family whose positions are keyed by `(owner, lower, upper)`.

use super::shared::{PoolCore, PoolParams, PositionKey};
use super::{ConcentratedPool, MarketSimulation, OpenedRange, PositionInfo, Slot};
use crate::tokens::TokenLedger;
use clm_vault_domain::enums::PoolFamily;
use clm_vault_domain::error::Result;
use clm_vault_domain::value_objects::{Address, AmountPair, TickRange};

#[derive(Debug, Clone)]
pub struct UniswapV3Pool {
    core: PoolCore,
}

impl UniswapV3Pool {
    pub fn new(params: PoolParams, timestamp: u64) -> Result<Self> {
        Ok(Self {
            core: PoolCore::new(params, timestamp)?,
        })
    }

    pub fn core(&self) -> &PoolCore {
        &self.core
    }

    fn key(owner: &Address, range: &TickRange) -> PositionKey {
        PositionKey::Ticks {
            owner: owner.clone(),
            lower: range.lower,
            upper: range.upper,
        }
    }
}

impl ConcentratedPool for UniswapV3Pool {
    fn address(&self) -> &Address {
        &self.core.params().address
    }

    fn token0(&self) -> &Address {
        &self.core.params().token0
    }

    fn token1(&self) -> &Address {
        &self.core.params().token1
    }

    fn family(&self) -> PoolFamily {
        PoolFamily::UniswapV3
    }

    fn tick_spacing(&self) -> i32 {
        self.core.params().tick_spacing
    }

    fn fee_pips(&self) -> u32 {
        self.core.params().fee_pips
    }

    fn slot(&self) -> Slot {
        self.core.slot()
    }

    fn observe(&self, now: u64, seconds_agos: &[u32]) -> Result<Vec<i64>> {
        self.core.observe(now, seconds_agos)
    }

    fn position(&self, owner: &Address, range: &TickRange) -> Option<PositionInfo> {
        self.core
            .position(&Self::key(owner, range))
            .map(|position| position.info())
    }

    fn open_range(
        &mut self,
        tokens: &mut TokenLedger,
        owner: &Address,
        range: &TickRange,
        liquidity: u128,
    ) -> Result<OpenedRange> {
        let amounts = self
            .core
            .mint(tokens, Self::key(owner, range), owner, range, liquidity)?;
        Ok(OpenedRange {
            position_id: None,
            amounts,
        })
    }

    fn close_range(
        &mut self,
        tokens: &mut TokenLedger,
        owner: &Address,
        range: &TickRange,
    ) -> Result<AmountPair> {
        self.core.burn_all(tokens, &Self::key(owner, range), owner)
    }

    fn collect_owed(
        &mut self,
        tokens: &mut TokenLedger,
        owner: &Address,
        range: &TickRange,
    ) -> Result<AmountPair> {
        self.core.collect(tokens, &Self::key(owner, range), owner)
    }
}

impl MarketSimulation for UniswapV3Pool {
    fn move_to_tick(&mut self, tokens: &mut TokenLedger, now: u64, tick: i32) -> Result<()> {
        self.core.move_to_tick(tokens, now, tick)
    }

    fn accrue_fees(&mut self, tokens: &mut TokenLedger, fees: AmountPair) -> Result<AmountPair> {
        self.core.accrue_fees(tokens, fees)
    }
}
