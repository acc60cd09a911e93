//! Main and alternative range management.
//!
//! The main range is symmetric around the floored current tick. The
//! alternative range is one spacing wide and sits just beside the price on
//! the side that makes it single-sided in whichever asset has more idle
//! value, so the leftover of the main mint stays deployed.

use clm_vault_domain::enums::RangeKind;
use clm_vault_domain::error::{Error, Result};
use clm_vault_domain::events::{EventData, RangeOpenedData};
use clm_vault_domain::math::liquidity_amounts::{amounts_for_liquidity, liquidity_for_amounts};
use clm_vault_domain::math::{quote_in_token1, sqrt_price_at_tick, tick_floor};
use clm_vault_domain::value_objects::{Address, AmountPair, TickRange};
use clm_vault_protocols::ledger::Ledger;
use clm_vault_protocols::pool::ConcentratedPool;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::{debug, info};

/// Fees collected from each range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimedFees {
    /// Collected from the main range.
    pub main: AmountPair,
    /// Collected from the alt range.
    pub alt: AmountPair,
}

impl ClaimedFees {
    pub fn total(&self) -> Result<AmountPair> {
        Ok(self.main.checked_add(&self.alt)?)
    }
}

/// Tracks the strategy's two live ranges and opens, closes and re-plans them.
///
/// The main range is centred on the floored spot tick. The alt range holds
/// whichever asset the main range could not absorb.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionManager {
    main: Option<TickRange>,
    alt: Option<TickRange>,
    /// Half-width of the main range in tick spacings.
    position_width: i32,
}

impl PositionManager {
    pub fn new(position_width: i32) -> Result<Self> {
        crate::config::validate_position_width(position_width)?;
        Ok(Self {
            main: None,
            alt: None,
            position_width,
        })
    }

    pub fn main(&self) -> Option<&TickRange> {
        self.main.as_ref()
    }

    pub fn alt(&self) -> Option<&TickRange> {
        self.alt.as_ref()
    }

    pub fn position_width(&self) -> i32 {
        self.position_width
    }

    pub fn set_position_width(&mut self, width: i32) -> Result<()> {
        crate::config::validate_position_width(width)?;
        self.position_width = width;
        Ok(())
    }

    /// Computes the range pair for `tick` without touching any state.
    pub fn plan(
        tick: i32,
        spacing: i32,
        position_width: i32,
        idle: AmountPair,
        price: primitive_types::U256,
    ) -> Result<(TickRange, Option<TickRange>)> {
        let floor = tick_floor(tick, spacing)?;
        let overflow = || Error::invalid_config("range ticks overflow");
        let width = position_width.checked_mul(spacing).ok_or_else(overflow)?;
        let main = TickRange::new(
            floor.checked_sub(width).ok_or_else(overflow)?,
            floor.checked_add(width).ok_or_else(overflow)?,
            spacing,
        )?;

        let value0 = quote_in_token1(idle.amount0, price)?;
        let alt = match value0.cmp(&idle.amount1) {
            // Excess asset0 goes just above the price.
            Ordering::Greater => Some(TickRange::new(
                floor.checked_add(spacing).ok_or_else(overflow)?,
                floor.checked_add(spacing * 2).ok_or_else(overflow)?,
                spacing,
            )?),
            // Excess asset1 goes just below it.
            Ordering::Less => Some(TickRange::new(
                floor.checked_sub(spacing).ok_or_else(overflow)?,
                floor,
                spacing,
            )?),
            Ordering::Equal => None,
        };

        if alt.is_some_and(|alt| alt.same_ticks(&main)) {
            return Err(Error::invalid_config("alternative range equals main range"));
        }
        Ok((main, alt))
    }

    /// Replaces both ranges. Live liquidity must have been closed first.
    pub fn recompute(
        &mut self,
        tick: i32,
        spacing: i32,
        idle: AmountPair,
        price: primitive_types::U256,
    ) -> Result<(TickRange, Option<TickRange>)> {
        let (main, alt) = Self::plan(tick, spacing, self.position_width, idle, price)?;
        self.main = Some(main);
        self.alt = alt;
        debug!(tick, main = %main, alt = ?alt, "ranges recomputed");
        Ok((main, alt))
    }

    /// Deploys idle balances: main first, then alt with what is left.
    pub fn open_all<P, R, D>(
        &mut self,
        ledger: &mut Ledger<P, R, D>,
        owner: &Address,
    ) -> Result<AmountPair>
    where
        P: ConcentratedPool,
    {
        let mut deployed = AmountPair::zero();
        if let Some(range) = self.main.as_mut() {
            let used = open_range(ledger, owner, RangeKind::Main, range, true)?;
            deployed = deployed.checked_add(&used)?;
        }
        if let Some(range) = self.alt.as_mut() {
            let used = open_range(ledger, owner, RangeKind::Alt, range, false)?;
            deployed = deployed.checked_add(&used)?;
        }
        Ok(deployed)
    }

    /// Removes all liquidity and returns the principal and fees paid out.
    pub fn close_all<P, R, D>(
        &mut self,
        ledger: &mut Ledger<P, R, D>,
        owner: &Address,
    ) -> Result<AmountPair>
    where
        P: ConcentratedPool,
    {
        let mut withdrawn = AmountPair::zero();
        for (kind, slot) in [
            (RangeKind::Main, &mut self.main),
            (RangeKind::Alt, &mut self.alt),
        ] {
            let Some(range) = slot.as_mut() else {
                continue;
            };
            let live = ledger.pool.position(owner, range).is_some_and(|info| {
                info.liquidity > 0 || !info.tokens_owed.is_zero() || range.position_id.is_some()
            });
            if live {
                let amounts = ledger.pool.close_range(&mut ledger.tokens, owner, range)?;
                withdrawn = withdrawn.checked_add(&amounts)?;
                ledger.emit(
                    owner,
                    EventData::RangeClosed {
                        kind,
                        range: *range,
                        amounts,
                    },
                );
                debug!(kind = ?kind, range = %range, amount0 = %amounts.amount0, amount1 = %amounts.amount1, "range closed");
            }
            range.position_id = None;
        }
        Ok(withdrawn)
    }

    /// Collects uncollected fees of every live range.
    pub fn claim_earnings<P, R, D>(
        &mut self,
        ledger: &mut Ledger<P, R, D>,
        owner: &Address,
    ) -> Result<ClaimedFees>
    where
        P: ConcentratedPool,
    {
        let mut claimed = ClaimedFees::default();
        for (kind, slot) in [(RangeKind::Main, &self.main), (RangeKind::Alt, &self.alt)] {
            let Some(range) = slot else {
                continue;
            };
            let owed = ledger
                .pool
                .position(owner, range)
                .map(|info| info.tokens_owed)
                .unwrap_or_default();
            if owed.is_zero() {
                continue;
            }
            let fees = ledger.pool.collect_owed(&mut ledger.tokens, owner, range)?;
            match kind {
                RangeKind::Main => claimed.main = fees,
                RangeKind::Alt => claimed.alt = fees,
            }
        }
        Ok(claimed)
    }

    /// Token amounts represented by live liquidity at the current price.
    pub fn pool_balances<P: ConcentratedPool>(&self, pool: &P, owner: &Address) -> Result<AmountPair> {
        let sqrt_price = pool.slot().sqrt_price;
        let mut total = AmountPair::zero();
        for range in [self.main.as_ref(), self.alt.as_ref()].into_iter().flatten() {
            let liquidity = pool.position(owner, range).map_or(0, |info| info.liquidity);
            if liquidity == 0 {
                continue;
            }
            let amounts = amounts_for_liquidity(
                sqrt_price,
                sqrt_price_at_tick(range.lower)?,
                sqrt_price_at_tick(range.upper)?,
                liquidity,
            )?;
            total = total.checked_add(&amounts)?;
        }
        Ok(total)
    }
}

fn idle_balances<P: ConcentratedPool, R, D>(ledger: &Ledger<P, R, D>, owner: &Address) -> AmountPair {
    AmountPair::new(
        ledger.tokens.balance_of(ledger.pool.token0(), owner),
        ledger.tokens.balance_of(ledger.pool.token1(), owner),
    )
}

fn open_range<P, R, D>(
    ledger: &mut Ledger<P, R, D>,
    owner: &Address,
    kind: RangeKind,
    range: &mut TickRange,
    require_both_assets: bool,
) -> Result<AmountPair>
where
    P: ConcentratedPool,
{
    let idle = idle_balances(ledger, owner);
    let sqrt_price = ledger.pool.slot().sqrt_price;
    let (sqrt_lower, sqrt_upper) = (
        sqrt_price_at_tick(range.lower)?,
        sqrt_price_at_tick(range.upper)?,
    );
    let liquidity =
        liquidity_for_amounts(sqrt_price, sqrt_lower, sqrt_upper, idle.amount0, idle.amount1)?;
    if liquidity == 0 {
        return Ok(AmountPair::zero());
    }
    if require_both_assets
        && amounts_for_liquidity(sqrt_price, sqrt_lower, sqrt_upper, liquidity)?.any_zero()
    {
        return Ok(AmountPair::zero());
    }

    let opened = ledger
        .pool
        .open_range(&mut ledger.tokens, owner, range, liquidity)?;
    if opened.position_id.is_some() {
        range.position_id = opened.position_id;
    }
    ledger.emit(
        owner,
        EventData::RangeOpened(RangeOpenedData {
            kind,
            range: *range,
            liquidity,
            amounts: opened.amounts,
        }),
    );
    info!(
        kind = ?kind,
        range = %range,
        liquidity,
        amount0 = %opened.amounts.amount0,
        amount1 = %opened.amounts.amount1,
        "range opened"
    );
    Ok(opened.amounts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{addr, fund, ledger_at_tick};
    use clm_vault_domain::math::PRECISION;
    use clm_vault_protocols::pool::MarketSimulation;
    use primitive_types::U256;

    fn units(n: u64) -> U256 {
        U256::from(n) * U256::from(10u64).pow(U256::from(18u8))
    }

    #[test]
    fn test_plan_main_is_symmetric_around_floor() {
        let (main, _) = PositionManager::plan(-1, 60, 10, AmountPair::zero(), PRECISION).unwrap();
        assert_eq!((main.lower, main.upper), (-660, 540));
    }

    #[test]
    fn test_plan_alt_follows_excess_asset() {
        let (_, alt) =
            PositionManager::plan(75, 60, 2, AmountPair::new(500u64, 100u64), PRECISION).unwrap();
        let alt = alt.unwrap();
        assert_eq!((alt.lower, alt.upper), (120, 180));

        let (_, alt) =
            PositionManager::plan(75, 60, 2, AmountPair::new(100u64, 500u64), PRECISION).unwrap();
        let alt = alt.unwrap();
        assert_eq!((alt.lower, alt.upper), (0, 60));

        let (_, alt) =
            PositionManager::plan(75, 60, 2, AmountPair::new(100u64, 100u64), PRECISION).unwrap();
        assert!(alt.is_none());
    }

    #[test]
    fn test_plan_alt_never_equals_main() {
        for tick in [-10_001, -61, -60, -1, 0, 1, 59, 60, 12_345] {
            for idle in [AmountPair::new(1u64, 0u64), AmountPair::new(0u64, 1u64)] {
                let (main, alt) = PositionManager::plan(tick, 60, 1, idle, PRECISION).unwrap();
                let alt = alt.unwrap();
                assert!(main.lower < main.upper && alt.lower < alt.upper);
                assert_eq!(main.lower % 60, 0);
                assert_eq!(alt.upper % 60, 0);
                assert!(!alt.same_ticks(&main));
                assert!(!alt.contains(tick), "alt must be single-sided at tick {tick}");
            }
        }
    }

    #[test]
    fn test_plan_rejects_out_of_bounds() {
        let err = PositionManager::plan(887_000, 60, 100, AmountPair::zero(), PRECISION).unwrap_err();
        assert!(matches!(err, Error::InvalidRangeConfiguration(_)));
        assert!(PositionManager::new(0).is_err());
    }

    #[test]
    fn test_open_and_close_cycle() {
        let mut ledger = ledger_at_tick(0);
        let owner = addr("strategy");
        fund(&mut ledger, &owner, units(100), units(130));

        let mut manager = PositionManager::new(10).unwrap();
        let idle = idle_balances(&ledger, &owner);
        manager.recompute(0, 60, idle, PRECISION).unwrap();
        // More asset1 idle, so alt sits below the price.
        assert_eq!(manager.alt().map(|r| (r.lower, r.upper)), Some((-60, 0)));

        let deployed = manager.open_all(&mut ledger, &owner).unwrap();
        assert!(!deployed.any_zero());
        let pool_side = manager.pool_balances(&ledger.pool, &owner).unwrap();
        assert!(pool_side.amount1 > pool_side.amount0);

        // Nearly everything is deployed.
        let left = idle_balances(&ledger, &owner);
        assert!(left.amount0 < units(1) / U256::from(1000u64));
        assert!(left.amount1 < units(1) / U256::from(1000u64));

        let withdrawn = manager.close_all(&mut ledger, &owner).unwrap();
        let after = idle_balances(&ledger, &owner);
        assert_eq!(after, left.checked_add(&withdrawn).unwrap());
        assert!(manager.pool_balances(&ledger.pool, &owner).unwrap().is_zero());
        // Conservation up to rounding.
        assert!(units(100) - after.amount0 <= U256::from(2u8));
        assert!(units(130) - after.amount1 <= U256::from(2u8));
    }

    #[test]
    fn test_zero_liquidity_is_noop() {
        let mut ledger = ledger_at_tick(0);
        let owner = addr("strategy");
        let mut manager = PositionManager::new(10).unwrap();
        manager.recompute(0, 60, AmountPair::zero(), PRECISION).unwrap();
        assert!(manager.open_all(&mut ledger, &owner).unwrap().is_zero());
        assert!(ledger.journal.is_empty());
    }

    #[test]
    fn test_claim_earnings_collects_fees() {
        let mut ledger = ledger_at_tick(0);
        let owner = addr("strategy");
        fund(&mut ledger, &owner, units(100), units(100));
        let mut manager = PositionManager::new(10).unwrap();
        manager.recompute(0, 60, AmountPair::zero(), PRECISION).unwrap();
        manager.open_all(&mut ledger, &owner).unwrap();

        ledger
            .pool
            .accrue_fees(&mut ledger.tokens, AmountPair::new(1_000u64, 2_000u64))
            .unwrap();
        let claimed = manager.claim_earnings(&mut ledger, &owner).unwrap();
        assert_eq!(claimed.main, AmountPair::new(1_000u64, 2_000u64));
        assert!(claimed.alt.is_zero());

        let again = manager.claim_earnings(&mut ledger, &owner).unwrap();
        assert!(again.total().unwrap().is_zero());
    }
}
