//! Keeper policies deciding when to harvest or re-center the vault.
//!
//! A keeper only decides. The runner executes the action and records it as
//! skipped when the strategy's calm guard rejects it.

pub mod periodic;
pub mod threshold;

pub use periodic::PeriodicKeeper;
pub use threshold::ThresholdKeeper;

use clm_vault_domain::value_objects::TickRange;
use serde::{Deserialize, Serialize};

/// What the keeper sees at the end of a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeeperContext {
    pub step: u64,
    pub spot_tick: i32,
    pub main_range: Option<TickRange>,
    pub steps_since_harvest: u64,
    pub steps_since_rebalance: u64,
}

impl KeeperContext {
    pub fn is_in_range(&self) -> bool {
        self.main_range
            .is_some_and(|range| range.contains(self.spot_tick))
    }

    /// Distance in ticks between spot and the middle of the main range.
    pub fn ticks_from_center(&self) -> Option<i32> {
        self.main_range
            .map(|range| (self.spot_tick - (range.lower + range.upper) / 2).abs())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeeperAction {
    Hold,
    /// Harvest; the strategy re-centers as part of it.
    Harvest,
    /// Re-center without harvesting.
    MoveTicks,
}

pub trait Keeper {
    fn evaluate(&self, context: &KeeperContext) -> KeeperAction;

    fn name(&self) -> &'static str;
}

/// Serializable choice of keeper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum KeeperPolicy {
    Periodic {
        harvest_interval: u64,
        #[serde(default)]
        rebalance_interval: Option<u64>,
    },
    Threshold {
        threshold_ticks: i32,
        harvest_interval: u64,
    },
}

impl Default for KeeperPolicy {
    fn default() -> Self {
        Self::Periodic {
            harvest_interval: 24,
            rebalance_interval: None,
        }
    }
}

impl KeeperPolicy {
    pub fn build(&self) -> Box<dyn Keeper> {
        match *self {
            Self::Periodic {
                harvest_interval,
                rebalance_interval,
            } => {
                let keeper = PeriodicKeeper::new(harvest_interval);
                match rebalance_interval {
                    Some(interval) => Box::new(keeper.with_rebalance_interval(interval)),
                    None => Box::new(keeper),
                }
            }
            Self::Threshold {
                threshold_ticks,
                harvest_interval,
            } => Box::new(ThresholdKeeper::new(threshold_ticks, harvest_interval)),
        }
    }
}

#[cfg(test)]
pub(crate) fn context(
    spot_tick: i32,
    steps_since_harvest: u64,
    steps_since_rebalance: u64,
) -> KeeperContext {
    KeeperContext {
        step: 100,
        spot_tick,
        main_range: TickRange::new(-600, 600, 60).ok(),
        steps_since_harvest,
        steps_since_rebalance,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_checks() {
        let ctx = context(300, 0, 0);
        assert!(ctx.is_in_range());
        assert_eq!(ctx.ticks_from_center(), Some(300));
        assert!(!context(600, 0, 0).is_in_range());

        let idle = KeeperContext {
            main_range: None,
            ..ctx
        };
        assert!(!idle.is_in_range());
        assert_eq!(idle.ticks_from_center(), None);
    }

    #[test]
    fn test_policy_from_json() {
        let policy: KeeperPolicy =
            serde_json::from_str(r#"{"kind":"threshold","threshold_ticks":300,"harvest_interval":12}"#)
                .unwrap();
        assert_eq!(policy.build().name(), "Threshold Keeper");
        assert_eq!(KeeperPolicy::default().build().name(), "Periodic Keeper");
    }
}
