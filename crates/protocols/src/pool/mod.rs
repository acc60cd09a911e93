//! Concentrated-liquidity pool capability and its in-memory families.
//!
//! The strategy only ever talks to a pool through [`ConcentratedPool`]. The
//! [`MarketSimulation`] trait is the outside world's handle for moving the
//! price and generating trading fees.

pub mod shared;
pub mod oracle;
pub mod uniswap_v3;
pub mod velodrome;

pub use shared::{PoolCore, PoolParams, PositionKey, PositionState};
pub use oracle::{OBSERVATION_CAPACITY, Observation, ObservationBuffer};
pub use uniswap_v3::UniswapV3Pool;
pub use velodrome::VelodromePool;

use crate::tokens::TokenLedger;
use clm_vault_domain::enums::PoolFamily;
use clm_vault_domain::error::{Error, Result};
use clm_vault_domain::value_objects::{Address, AmountPair, PositionId, TickRange};
use primitive_types::U256;
use std::fmt;

/// Current price state of a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub sqrt_price: U256,
    pub tick: i32,
}

/// Result of adding liquidity to a range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenedRange {
    /// Minted position id for families that track positions as tokens.
    pub position_id: Option<PositionId>,
    /// Tokens the pool pulled from the owner.
    pub amounts: AmountPair,
}

/// Liquidity and uncollected fees of one position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionInfo {
    pub liquidity: u128,
    pub tokens_owed: AmountPair,
}

pub trait ConcentratedPool: Clone + fmt::Debug {
    fn address(&self) -> &Address;
    fn token0(&self) -> &Address;
    fn token1(&self) -> &Address;
    fn family(&self) -> PoolFamily;
    fn tick_spacing(&self) -> i32;
    /// Swap fee in hundredths of a basis point.
    fn fee_pips(&self) -> u32;
    fn slot(&self) -> Slot;

    fn spot_tick(&self) -> i32 {
        self.slot().tick
    }

    /// Tick cumulatives at each `now - seconds_ago`.
    fn observe(&self, now: u64, seconds_agos: &[u32]) -> Result<Vec<i64>>;

    /// Arithmetic mean tick over the last `window` seconds, truncated.
    fn twap_tick(&self, now: u64, window: u32) -> Result<i32> {
        if window == 0 {
            return Err(Error::external("twap window must be positive"));
        }
        match self.observe(now, &[window, 0])?.as_slice() {
            [then, current] => {
                let mean = (current - then) / i64::from(window);
                i32::try_from(mean).map_err(|_| Error::external("twap tick out of range"))
            }
            _ => Err(Error::external("oracle returned malformed observations")),
        }
    }

    fn position(&self, owner: &Address, range: &TickRange) -> Option<PositionInfo>;

    /// Adds `liquidity` to `range`, pulling the required tokens from `owner`.
    fn open_range(
        &mut self,
        tokens: &mut TokenLedger,
        owner: &Address,
        range: &TickRange,
        liquidity: u128,
    ) -> Result<OpenedRange>;

    /// Removes all liquidity of `range` and pays principal plus any
    /// uncollected fees to `owner`.
    fn close_range(
        &mut self,
        tokens: &mut TokenLedger,
        owner: &Address,
        range: &TickRange,
    ) -> Result<AmountPair>;

    /// Pays uncollected fees of `range` to `owner`.
    fn collect_owed(
        &mut self,
        tokens: &mut TokenLedger,
        owner: &Address,
        range: &TickRange,
    ) -> Result<AmountPair>;
}

/// Market activity driven from outside the vault.
pub trait MarketSimulation {
    /// Moves the price to `tick` as if traders swapped through the pool.
    fn move_to_tick(&mut self, tokens: &mut TokenLedger, now: u64, tick: i32) -> Result<()>;

    /// Credits swap fees to in-range liquidity; returns what positions earned.
    fn accrue_fees(&mut self, tokens: &mut TokenLedger, fees: AmountPair) -> Result<AmountPair>;
}
