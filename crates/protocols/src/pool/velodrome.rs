//! Pool family that mints a non-fungible token per position.

use super::shared::{PoolCore, PoolParams, PositionKey};
use super::{ConcentratedPool, MarketSimulation, OpenedRange, PositionInfo, Slot};
use crate::tokens::TokenLedger;
use clm_vault_domain::enums::PoolFamily;
use clm_vault_domain::error::{Error, Result};
use clm_vault_domain::value_objects::{Address, AmountPair, PositionId, TickRange};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct VelodromePool {
    core: PoolCore,
    next_position_id: u64,
}

impl VelodromePool {
    pub fn new(params: PoolParams, timestamp: u64) -> Result<Self> {
        Ok(Self {
            core: PoolCore::new(params, timestamp)?,
            next_position_id: 1,
        })
    }

    pub fn core(&self) -> &PoolCore {
        &self.core
    }

    fn key(range: &TickRange) -> Result<PositionKey> {
        range
            .position_id
            .map(PositionKey::Token)
            .ok_or_else(|| Error::external("range has no position token"))
    }
}

impl ConcentratedPool for VelodromePool {
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
        PoolFamily::Velodrome
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
        let key = Self::key(range).ok()?;
        self.core
            .position(&key)
            .filter(|position| &position.owner == owner)
            .map(|position| position.info())
    }

    /// Mints a fresh position token, or tops up the one the range carries.
    fn open_range(
        &mut self,
        tokens: &mut TokenLedger,
        owner: &Address,
        range: &TickRange,
        liquidity: u128,
    ) -> Result<OpenedRange> {
        let id = match range.position_id {
            Some(id) => id,
            None => {
                let id = PositionId(self.next_position_id);
                self.next_position_id += 1;
                id
            }
        };
        let amounts = self
            .core
            .mint(tokens, PositionKey::Token(id), owner, range, liquidity)?;
        debug!(position_id = %id, owner = %owner, "position token minted");
        Ok(OpenedRange {
            position_id: Some(id),
            amounts,
        })
    }

    /// Burns liquidity and the position token itself.
    fn close_range(
        &mut self,
        tokens: &mut TokenLedger,
        owner: &Address,
        range: &TickRange,
    ) -> Result<AmountPair> {
        let key = Self::key(range)?;
        let payout = self.core.burn_all(tokens, &key, owner)?;
        self.core.remove(&key, owner)?;
        Ok(payout)
    }

    fn collect_owed(
        &mut self,
        tokens: &mut TokenLedger,
        owner: &Address,
        range: &TickRange,
    ) -> Result<AmountPair> {
        let key = Self::key(range)?;
        self.core.collect(tokens, &key, owner)
    }
}

impl MarketSimulation for VelodromePool {
    fn move_to_tick(&mut self, tokens: &mut TokenLedger, now: u64, tick: i32) -> Result<()> {
        self.core.move_to_tick(tokens, now, tick)
    }

    fn accrue_fees(&mut self, tokens: &mut TokenLedger, fees: AmountPair) -> Result<AmountPair> {
        self.core.accrue_fees(tokens, fees)
    }
}
