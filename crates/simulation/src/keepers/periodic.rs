//! Periodic keeper.
//!
//! Harvests every N steps regardless of price. Optionally re-centers on a
//! separate schedule, but only once the price has left the main range.

use super::{Keeper, KeeperAction, KeeperContext};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodicKeeper {
    /// Steps between harvests.
    pub harvest_interval: u64,
    /// Steps between out-of-range re-centers; `None` never re-centers.
    pub rebalance_interval: Option<u64>,
}

impl PeriodicKeeper {
    #[must_use]
    pub fn new(harvest_interval: u64) -> Self {
        Self {
            harvest_interval,
            rebalance_interval: None,
        }
    }

    #[must_use]
    pub fn with_rebalance_interval(mut self, interval: u64) -> Self {
        self.rebalance_interval = Some(interval);
        self
    }
}

impl Keeper for PeriodicKeeper {
    fn evaluate(&self, context: &KeeperContext) -> KeeperAction {
        if self.harvest_interval > 0 && context.steps_since_harvest >= self.harvest_interval {
            return KeeperAction::Harvest;
        }

        match self.rebalance_interval {
            Some(interval)
                if context.steps_since_rebalance >= interval && !context.is_in_range() =>
            {
                KeeperAction::MoveTicks
            }
            _ => KeeperAction::Hold,
        }
    }

    fn name(&self) -> &'static str {
        "Periodic Keeper"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keepers::context;

    #[test]
    fn test_holds_before_interval() {
        let keeper = PeriodicKeeper::new(10);
        assert_eq!(keeper.evaluate(&context(0, 5, 5)), KeeperAction::Hold);
    }

    #[test]
    fn test_harvests_at_interval() {
        let keeper = PeriodicKeeper::new(10);
        assert_eq!(keeper.evaluate(&context(0, 10, 0)), KeeperAction::Harvest);
        // Zero disables harvesting.
        assert_eq!(PeriodicKeeper::new(0).evaluate(&context(0, 50, 0)), KeeperAction::Hold);
    }

    #[test]
    fn test_rebalances_only_out_of_range() {
        let keeper = PeriodicKeeper::new(100).with_rebalance_interval(4);

        // In range - holds even past the interval.
        assert_eq!(keeper.evaluate(&context(120, 5, 8)), KeeperAction::Hold);
        // Out of range but too soon.
        assert_eq!(keeper.evaluate(&context(900, 5, 2)), KeeperAction::Hold);
        assert_eq!(keeper.evaluate(&context(900, 5, 4)), KeeperAction::MoveTicks);
    }
}
