//! Price-manipulation guard comparing spot tick against the pool TWAP.

use crate::config::{validate_max_tick_deviation, validate_twap_interval};
use clm_vault_domain::error::{Error, Result};
use clm_vault_domain::math::{MAX_TICK, MIN_TICK};
use clm_vault_protocols::pool::ConcentratedPool;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Rejects range changes and deposits while the spot tick strays too far
/// from the pool TWAP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalmPeriodGuard {
    /// TWAP window in seconds.
    pub twap_interval: u32,
    /// Maximum allowed `|spot - twap|` in ticks.
    pub max_tick_deviation: i32,
}

/// Spot, TWAP and the calm band at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalmReading {
    /// Current pool tick.
    pub spot: i32,
    /// Mean tick over the TWAP window.
    pub twap: i32,
    /// Lowest calm tick, clamped to `MIN_TICK`.
    pub min_calm: i32,
    /// Highest calm tick, clamped to `MAX_TICK`.
    pub max_calm: i32,
    /// Whether `spot` lies inside `[min_calm, max_calm]`.
    pub calm: bool,
}

impl CalmPeriodGuard {
    pub fn new(twap_interval: u32, max_tick_deviation: i32, tick_spacing: i32) -> Result<Self> {
        validate_twap_interval(twap_interval)?;
        validate_max_tick_deviation(max_tick_deviation, tick_spacing)?;
        Ok(Self {
            twap_interval,
            max_tick_deviation,
        })
    }

    pub fn twap_tick<P: ConcentratedPool>(&self, pool: &P, now: u64) -> Result<i32> {
        pool.twap_tick(now, self.twap_interval)
    }

    pub fn reading<P: ConcentratedPool>(&self, pool: &P, now: u64) -> Result<CalmReading> {
        let spot = pool.spot_tick();
        let twap = self.twap_tick(pool, now)?;
        let min_calm = twap.saturating_sub(self.max_tick_deviation).max(MIN_TICK);
        let max_calm = twap.saturating_add(self.max_tick_deviation).min(MAX_TICK);
        Ok(CalmReading {
            spot,
            twap,
            min_calm,
            max_calm,
            calm: min_calm <= spot && spot <= max_calm,
        })
    }

    pub fn is_calm<P: ConcentratedPool>(&self, pool: &P, now: u64) -> Result<bool> {
        Ok(self.reading(pool, now)?.calm)
    }

    /// Fails with [`Error::PriceNotCalm`] outside the calm band.
    pub fn ensure_calm<P: ConcentratedPool>(&self, pool: &P, now: u64) -> Result<CalmReading> {
        let reading = self.reading(pool, now)?;
        if !reading.calm {
            warn!(
                spot = reading.spot,
                twap = reading.twap,
                max_deviation = self.max_tick_deviation,
                "price not calm"
            );
            return Err(Error::PriceNotCalm {
                spot: reading.spot,
                twap: reading.twap,
                max_deviation: self.max_tick_deviation,
            });
        }
        Ok(reading)
    }

    pub fn set_twap_interval(&mut self, seconds: u32) -> Result<()> {
        validate_twap_interval(seconds)?;
        self.twap_interval = seconds;
        Ok(())
    }

    pub fn set_max_tick_deviation(&mut self, deviation: i32, tick_spacing: i32) -> Result<()> {
        validate_max_tick_deviation(deviation, tick_spacing)?;
        self.max_tick_deviation = deviation;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clm_vault_protocols::pool::{MarketSimulation, PoolParams, UniswapV3Pool};
    use clm_vault_protocols::tokens::TokenLedger;

    fn pool_at(tick: i32) -> (UniswapV3Pool, TokenLedger) {
        let mut tokens = TokenLedger::new();
        let mut pool = UniswapV3Pool::new(PoolParams::default(), 0).unwrap();
        // Price sat at 0 for the first 1000s, then jumped.
        pool.move_to_tick(&mut tokens, 1_000, tick).unwrap();
        (pool, tokens)
    }

    #[test]
    fn test_boundary_is_inclusive() {
        let guard = CalmPeriodGuard::new(60, 60, 60).unwrap();
        let (pool, _) = pool_at(60);
        // Right after the jump the TWAP is still 0.
        let reading = guard.reading(&pool, 1_000).unwrap();
        assert_eq!(reading.twap, 0);
        assert!(reading.calm);
        assert_eq!((reading.min_calm, reading.max_calm), (-60, 60));
    }

    #[test]
    fn test_rejects_beyond_deviation() {
        let guard = CalmPeriodGuard::new(60, 60, 60).unwrap();
        let (pool, _) = pool_at(61);
        let err = guard.ensure_calm(&pool, 1_000).unwrap_err();
        assert_eq!(
            err,
            Error::PriceNotCalm {
                spot: 61,
                twap: 0,
                max_deviation: 60
            }
        );
    }

    #[test]
    fn test_twap_catches_up() {
        let guard = CalmPeriodGuard::new(60, 60, 60).unwrap();
        let (pool, _) = pool_at(180);
        assert!(!guard.is_calm(&pool, 1_000).unwrap());
        // Half the window at 180 puts the TWAP at 90.
        assert_eq!(guard.twap_tick(&pool, 1_030).unwrap(), 90);
        assert!(!guard.is_calm(&pool, 1_030).unwrap());
        assert!(guard.is_calm(&pool, 1_040).unwrap());
    }

    #[test]
    fn test_band_clamped_to_tick_bounds() {
        let guard = CalmPeriodGuard::new(60, 240, 60).unwrap();
        let (pool, _) = pool_at(MIN_TICK + 100);
        let reading = guard.reading(&pool, 10_000).unwrap();
        assert_eq!(reading.min_calm, MIN_TICK);
    }

    #[test]
    fn test_setters_validate() {
        let mut guard = CalmPeriodGuard::new(60, 60, 60).unwrap();
        assert!(guard.set_twap_interval(30).is_err());
        assert_eq!(guard.twap_interval, 60);
        assert!(guard.set_max_tick_deviation(300, 60).is_err());
        guard.set_max_tick_deviation(0, 60).unwrap();
        assert_eq!(guard.max_tick_deviation, 0);
    }
}
