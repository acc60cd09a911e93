//! Linear release of harvested profit.
//!
//! Compounded earnings are locked at harvest and unlock linearly over
//! `duration`, so a deposit right before a harvest cannot capture it.

use clm_vault_domain::error::Result;
use clm_vault_domain::math::mul_div;
use clm_vault_domain::value_objects::AmountPair;
use primitive_types::U256;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockedProfit {
    pub total_locked: AmountPair,
    pub last_harvest: u64,
    pub duration: u64,
}

impl LockedProfit {
    pub fn new(duration: u64) -> Self {
        Self {
            total_locked: AmountPair::zero(),
            last_harvest: 0,
            duration,
        }
    }

    /// Seconds left until everything is released.
    pub fn remaining(&self, now: u64) -> u64 {
        self.duration
            .saturating_sub(now.saturating_sub(self.last_harvest))
    }

    /// Still-locked amounts, never more than `balances`.
    pub fn locked(&self, now: u64, balances: AmountPair) -> Result<AmountPair> {
        let remaining = self.remaining(now);
        if remaining == 0 {
            return Ok(AmountPair::zero());
        }
        let capped = self.total_locked.min(&balances);
        let (remaining, duration) = (U256::from(remaining), U256::from(self.duration));
        Ok(AmountPair::new(
            mul_div(capped.amount0, remaining, duration)?,
            mul_div(capped.amount1, remaining, duration)?,
        ))
    }

    /// Starts a new schedule locking `profit` plus whatever is still locked.
    pub fn relock(&mut self, profit: AmountPair, now: u64, balances: AmountPair) -> Result<AmountPair> {
        let still_locked = self.locked(now, balances)?;
        self.total_locked = profit.checked_add(&still_locked)?;
        self.last_harvest = now;
        Ok(self.total_locked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plenty() -> AmountPair {
        AmountPair::new(1_000_000u64, 1_000_000u64)
    }

    #[test]
    fn test_linear_decay() {
        let mut schedule = LockedProfit::new(100);
        schedule
            .relock(AmountPair::new(1_000u64, 500u64), 1_000, plenty())
            .unwrap();

        assert_eq!(schedule.locked(1_000, plenty()).unwrap(), AmountPair::new(1_000u64, 500u64));
        assert_eq!(schedule.locked(1_025, plenty()).unwrap(), AmountPair::new(750u64, 375u64));
        assert_eq!(schedule.locked(1_100, plenty()).unwrap(), AmountPair::zero());
        assert_eq!(schedule.locked(5_000, plenty()).unwrap(), AmountPair::zero());
    }

    #[test]
    fn test_locked_is_non_increasing() {
        let mut schedule = LockedProfit::new(21_600);
        schedule
            .relock(AmountPair::new(123_457u64, 987_653u64), 0, plenty())
            .unwrap();
        let mut previous = schedule.locked(0, plenty()).unwrap();
        for t in (0..=21_600).step_by(777) {
            let current = schedule.locked(t, plenty()).unwrap();
            assert!(current.amount0 <= previous.amount0);
            assert!(current.amount1 <= previous.amount1);
            previous = current;
        }
    }

    #[test]
    fn test_capped_by_balances() {
        let mut schedule = LockedProfit::new(100);
        schedule
            .relock(AmountPair::new(1_000u64, 1_000u64), 0, plenty())
            .unwrap();
        let locked = schedule.locked(0, AmountPair::new(400u64, 2_000u64)).unwrap();
        assert_eq!(locked, AmountPair::new(400u64, 1_000u64));
    }

    #[test]
    fn test_relock_carries_undecayed_profit() {
        let mut schedule = LockedProfit::new(100);
        schedule.relock(AmountPair::new(1_000u64, 0u64), 0, plenty()).unwrap();
        let total = schedule
            .relock(AmountPair::new(100u64, 100u64), 50, plenty())
            .unwrap();
        assert_eq!(total, AmountPair::new(600u64, 100u64));
        assert_eq!(schedule.last_harvest, 50);
    }

    #[test]
    fn test_zero_duration_never_locks() {
        let mut schedule = LockedProfit::new(0);
        schedule.relock(AmountPair::new(10u64, 10u64), 5, plenty()).unwrap();
        assert!(schedule.locked(5, plenty()).unwrap().is_zero());
    }
}
