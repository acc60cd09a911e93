//! State shared by the in-memory pool families.

use super::oracle::ObservationBuffer;
use super::{PositionInfo, Slot};
use crate::tokens::TokenLedger;
use clm_vault_domain::error::{Error, MathError, Result};
use clm_vault_domain::math::liquidity_amounts::{
    amounts_for_liquidity, amounts_for_liquidity_rounding_up,
};
use clm_vault_domain::math::{mul_div, sqrt_price_at_tick};
use clm_vault_domain::value_objects::{Address, AmountPair, PositionId, TickRange};
use primitive_types::U256;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Static configuration of a simulated pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolParams {
    pub address: Address,
    pub token0: Address,
    pub token1: Address,
    pub tick_spacing: i32,
    /// Swap fee in hundredths of a basis point (3000 = 0.3%).
    pub fee_pips: u32,
    pub initial_tick: i32,
    /// Liquidity provided by other LPs; dilutes the fee share of positions.
    pub external_liquidity: u128,
}

impl Default for PoolParams {
    fn default() -> Self {
        Self {
            address: Address::new("pool"),
            token0: Address::new("token0"),
            token1: Address::new("token1"),
            tick_spacing: 60,
            fee_pips: 3_000,
            initial_tick: 0,
            external_liquidity: 0,
        }
    }
}

impl PoolParams {
    #[must_use]
    pub fn with_tokens(mut self, token0: Address, token1: Address) -> Self {
        self.token0 = token0;
        self.token1 = token1;
        self
    }

    #[must_use]
    pub fn with_address(mut self, address: Address) -> Self {
        self.address = address;
        self
    }

    #[must_use]
    pub fn with_tick_spacing(mut self, spacing: i32) -> Self {
        self.tick_spacing = spacing;
        self
    }

    #[must_use]
    pub fn with_fee_pips(mut self, fee_pips: u32) -> Self {
        self.fee_pips = fee_pips;
        self
    }

    #[must_use]
    pub fn with_initial_tick(mut self, tick: i32) -> Self {
        self.initial_tick = tick;
        self
    }

    #[must_use]
    pub fn with_external_liquidity(mut self, liquidity: u128) -> Self {
        self.external_liquidity = liquidity;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum PositionKey {
    Ticks { owner: Address, lower: i32, upper: i32 },
    Token(PositionId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionState {
    pub owner: Address,
    pub lower: i32,
    pub upper: i32,
    pub liquidity: u128,
    pub tokens_owed: AmountPair,
}

impl PositionState {
    pub fn info(&self) -> PositionInfo {
        PositionInfo {
            liquidity: self.liquidity,
            tokens_owed: self.tokens_owed,
        }
    }

    fn principal(&self, sqrt_price: U256) -> Result<AmountPair> {
        if self.liquidity == 0 {
            return Ok(AmountPair::zero());
        }
        Ok(amounts_for_liquidity(
            sqrt_price,
            sqrt_price_at_tick(self.lower)?,
            sqrt_price_at_tick(self.upper)?,
            self.liquidity,
        )?)
    }
}

#[derive(Debug, Clone)]
pub struct PoolCore {
    params: PoolParams,
    sqrt_price: U256,
    tick: i32,
    observations: ObservationBuffer,
    positions: BTreeMap<PositionKey, PositionState>,
}

impl PoolCore {
    pub fn new(params: PoolParams, timestamp: u64) -> Result<Self> {
        if params.tick_spacing <= 0 {
            return Err(MathError::InvalidTickSpacing(params.tick_spacing).into());
        }
        if params.fee_pips >= 1_000_000 {
            return Err(Error::invalid_config(format!(
                "pool fee {} pips must be below 100%",
                params.fee_pips
            )));
        }
        let sqrt_price = sqrt_price_at_tick(params.initial_tick)?;
        Ok(Self {
            tick: params.initial_tick,
            observations: ObservationBuffer::new(timestamp, params.initial_tick),
            sqrt_price,
            params,
            positions: BTreeMap::new(),
        })
    }

    pub fn params(&self) -> &PoolParams {
        &self.params
    }

    pub fn slot(&self) -> Slot {
        Slot {
            sqrt_price: self.sqrt_price,
            tick: self.tick,
        }
    }

    pub fn observe(&self, now: u64, seconds_agos: &[u32]) -> Result<Vec<i64>> {
        seconds_agos
            .iter()
            .map(|ago| self.observations.observe_single(now, *ago))
            .collect()
    }

    pub fn position(&self, key: &PositionKey) -> Option<&PositionState> {
        self.positions.get(key)
    }

    pub fn positions(&self) -> impl Iterator<Item = (&PositionKey, &PositionState)> {
        self.positions.iter()
    }

    fn validate_range(&self, range: &TickRange) -> Result<()> {
        TickRange::new(range.lower, range.upper, self.params.tick_spacing)
            .map(|_| ())
            .map_err(|err| Error::external(format!("pool rejected range: {err}")))
    }

    /// Adds liquidity under `key`, pulling the rounded-up amounts from `owner`.
    pub fn mint(
        &mut self,
        tokens: &mut TokenLedger,
        key: PositionKey,
        owner: &Address,
        range: &TickRange,
        liquidity: u128,
    ) -> Result<AmountPair> {
        self.validate_range(range)?;
        if liquidity == 0 {
            return Err(Error::external("cannot mint zero liquidity"));
        }
        let required = amounts_for_liquidity_rounding_up(
            self.sqrt_price,
            sqrt_price_at_tick(range.lower)?,
            sqrt_price_at_tick(range.upper)?,
            liquidity,
        )?;

        let pool = self.params.address.clone();
        let received0 = tokens.transfer(&self.params.token0, owner, &pool, required.amount0)?;
        let received1 = tokens.transfer(&self.params.token1, owner, &pool, required.amount1)?;
        if received0 < required.amount0 || received1 < required.amount1 {
            return Err(Error::external("pool received less than required for mint"));
        }

        let position = self.positions.entry(key).or_insert_with(|| PositionState {
            owner: owner.clone(),
            lower: range.lower,
            upper: range.upper,
            liquidity: 0,
            tokens_owed: AmountPair::zero(),
        });
        position.liquidity = position
            .liquidity
            .checked_add(liquidity)
            .ok_or(MathError::Overflow)?;

        debug!(
            pool = %pool,
            owner = %owner,
            range = %range,
            liquidity,
            amount0 = %required.amount0,
            amount1 = %required.amount1,
            "minted liquidity"
        );
        Ok(required)
    }

    fn owned_mut(&mut self, key: &PositionKey, owner: &Address) -> Result<&mut PositionState> {
        match self.positions.get_mut(key) {
            Some(position) if &position.owner == owner => Ok(position),
            Some(_) => Err(Error::external("position not owned by caller")),
            None => Err(Error::external("position does not exist")),
        }
    }

    /// Burns all liquidity under `key` and pays principal plus owed fees.
    pub fn burn_all(
        &mut self,
        tokens: &mut TokenLedger,
        key: &PositionKey,
        owner: &Address,
    ) -> Result<AmountPair> {
        let sqrt_price = self.sqrt_price;
        let position = self.owned_mut(key, owner)?;
        let principal = position.principal(sqrt_price)?;
        let payout = principal.checked_add(&position.tokens_owed)?;
        position.liquidity = 0;
        position.tokens_owed = AmountPair::zero();
        self.pay(tokens, owner, payout)?;
        debug!(
            pool = %self.params.address,
            owner = %owner,
            amount0 = %payout.amount0,
            amount1 = %payout.amount1,
            "burned liquidity"
        );
        Ok(payout)
    }

    /// Pays owed fees under `key`.
    pub fn collect(
        &mut self,
        tokens: &mut TokenLedger,
        key: &PositionKey,
        owner: &Address,
    ) -> Result<AmountPair> {
        let position = self.owned_mut(key, owner)?;
        let owed = position.tokens_owed;
        position.tokens_owed = AmountPair::zero();
        self.pay(tokens, owner, owed)?;
        Ok(owed)
    }

    /// Drops an empty position entry.
    pub fn remove(&mut self, key: &PositionKey, owner: &Address) -> Result<()> {
        let position = self.owned_mut(key, owner)?;
        if position.liquidity != 0 || !position.tokens_owed.is_zero() {
            return Err(Error::external("cannot remove a non-empty position"));
        }
        self.positions.remove(key);
        Ok(())
    }

    fn pay(&self, tokens: &mut TokenLedger, to: &Address, amounts: AmountPair) -> Result<()> {
        let pool = &self.params.address;
        tokens.transfer(&self.params.token0, pool, to, amounts.amount0)?;
        tokens.transfer(&self.params.token1, pool, to, amounts.amount1)?;
        Ok(())
    }

    fn total_principal(&self, sqrt_price: U256) -> Result<AmountPair> {
        self.positions
            .values()
            .try_fold(AmountPair::zero(), |total, position| {
                Ok(total.checked_add(&position.principal(sqrt_price)?)?)
            })
    }

    /// Moves the price and rebalances pool reserves so every position stays
    /// fully backed at the new price.
    pub fn move_to_tick(&mut self, tokens: &mut TokenLedger, now: u64, tick: i32) -> Result<()> {
        let target = sqrt_price_at_tick(tick)?;
        let before = self.total_principal(self.sqrt_price)?;
        let after = self.total_principal(target)?;
        self.observations.write(now, tick)?;
        self.sqrt_price = target;
        self.tick = tick;

        let pool = self.params.address.clone();
        for (token, old, new) in [
            (self.params.token0.clone(), before.amount0, after.amount0),
            (self.params.token1.clone(), before.amount1, after.amount1),
        ] {
            if new > old {
                tokens.mint(&token, &pool, new - old)?;
            } else if old > new {
                tokens.burn(&token, &pool, old - new)?;
            }
        }
        debug!(pool = %pool, tick, "price moved");
        Ok(())
    }

    /// Distributes `fees` pro rata over liquidity active at the current tick.
    pub fn accrue_fees(&mut self, tokens: &mut TokenLedger, fees: AmountPair) -> Result<AmountPair> {
        let tick = self.tick;
        let active: u128 = self
            .positions
            .values()
            .filter(|p| p.lower <= tick && tick < p.upper)
            .try_fold(0u128, |sum, p| sum.checked_add(p.liquidity))
            .ok_or(MathError::Overflow)?;
        let total = U256::from(active) + U256::from(self.params.external_liquidity);
        if active == 0 || total.is_zero() {
            return Ok(AmountPair::zero());
        }

        let mut credited = AmountPair::zero();
        for position in self.positions.values_mut() {
            if !(position.lower <= tick && tick < position.upper) || position.liquidity == 0 {
                continue;
            }
            let share = AmountPair::new(
                mul_div(fees.amount0, U256::from(position.liquidity), total)?,
                mul_div(fees.amount1, U256::from(position.liquidity), total)?,
            );
            position.tokens_owed = position.tokens_owed.checked_add(&share)?;
            credited = credited.checked_add(&share)?;
        }

        let pool = self.params.address.clone();
        tokens.mint(&self.params.token0, &pool, credited.amount0)?;
        tokens.mint(&self.params.token1, &pool, credited.amount1)?;
        debug!(
            pool = %pool,
            fee0 = %credited.amount0,
            fee1 = %credited.amount1,
            "fees accrued"
        );
        Ok(credited)
    }
}
