//! Threshold keeper.
//!
//! Re-centers when the price drifts a number of ticks away from the middle
//! of the main range or leaves it, and otherwise harvests on a schedule.

use super::{Keeper, KeeperAction, KeeperContext};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThresholdKeeper {
    /// Ticks from the range center that trigger a re-center.
    pub threshold_ticks: i32,
    /// Steps between harvests.
    pub harvest_interval: u64,
    /// Whether leaving the range re-centers regardless of the threshold.
    pub rebalance_on_out_of_range: bool,
}

impl ThresholdKeeper {
    #[must_use]
    pub fn new(threshold_ticks: i32, harvest_interval: u64) -> Self {
        Self {
            threshold_ticks,
            harvest_interval,
            rebalance_on_out_of_range: true,
        }
    }

    #[must_use]
    pub fn rebalance_on_out_of_range(mut self, value: bool) -> Self {
        self.rebalance_on_out_of_range = value;
        self
    }
}

impl Keeper for ThresholdKeeper {
    fn evaluate(&self, context: &KeeperContext) -> KeeperAction {
        if self.rebalance_on_out_of_range
            && context.main_range.is_some()
            && !context.is_in_range()
        {
            return KeeperAction::MoveTicks;
        }

        if context
            .ticks_from_center()
            .is_some_and(|distance| distance >= self.threshold_ticks)
        {
            return KeeperAction::MoveTicks;
        }

        if self.harvest_interval > 0 && context.steps_since_harvest >= self.harvest_interval {
            return KeeperAction::Harvest;
        }

        KeeperAction::Hold
    }

    fn name(&self) -> &'static str {
        "Threshold Keeper"
    }
}
