//! Tick-cumulative observations backing TWAP queries.

use clm_vault_domain::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Observations retained before the oldest is dropped.
pub const OBSERVATION_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub timestamp: u64,
    /// Tick in effect from `timestamp` until the next observation.
    pub tick: i32,
    /// Sum of `tick * seconds` up to `timestamp`.
    pub tick_cumulative: i64,
}

impl Observation {
    fn cumulative_at(&self, timestamp: i64) -> i64 {
        let elapsed = timestamp - self.timestamp as i64;
        self.tick_cumulative
            .saturating_add(i64::from(self.tick).saturating_mul(elapsed))
    }
}

#[derive(Debug, Clone)]
pub struct ObservationBuffer {
    observations: VecDeque<Observation>,
    /// Whether the genesis observation has been overwritten.
    truncated: bool,
}

impl ObservationBuffer {
    pub fn new(timestamp: u64, tick: i32) -> Self {
        let mut observations = VecDeque::with_capacity(OBSERVATION_CAPACITY);
        observations.push_back(Observation {
            timestamp,
            tick,
            tick_cumulative: 0,
        });
        Self {
            observations,
            truncated: false,
        }
    }

    fn newest(&self) -> Result<&Observation> {
        self.observations
            .back()
            .ok_or_else(|| Error::external("oracle has no observations"))
    }

    /// Records that `tick` takes effect at `timestamp`.
    pub fn write(&mut self, timestamp: u64, tick: i32) -> Result<()> {
        let newest = *self.newest()?;
        if timestamp < newest.timestamp {
            return Err(Error::external("observation timestamp moved backwards"));
        }
        if timestamp == newest.timestamp {
            if let Some(last) = self.observations.back_mut() {
                last.tick = tick;
            }
            return Ok(());
        }
        let observation = Observation {
            timestamp,
            tick,
            tick_cumulative: newest.cumulative_at(timestamp as i64),
        };
        if self.observations.len() == OBSERVATION_CAPACITY {
            self.observations.pop_front();
            self.truncated = true;
        }
        self.observations.push_back(observation);
        Ok(())
    }

    /// Tick cumulative at `now - seconds_ago`.
    ///
    /// Before the genesis observation the genesis tick is assumed to have
    /// held; once history has been dropped, older targets fail.
    pub fn observe_single(&self, now: u64, seconds_ago: u32) -> Result<i64> {
        let newest = self.newest()?;
        if now < newest.timestamp {
            return Err(Error::external("observation requested before latest write"));
        }
        let target = now as i64 - i64::from(seconds_ago);

        if let Some(observation) = self
            .observations
            .iter()
            .rev()
            .find(|o| o.timestamp as i64 <= target)
        {
            return Ok(observation.cumulative_at(target));
        }

        match self.observations.front() {
            Some(oldest) if !self.truncated => Ok(oldest.cumulative_at(target)),
            _ => Err(Error::external(format!(
                "oracle history too short for {seconds_ago}s lookback"
            ))),
        }
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}
