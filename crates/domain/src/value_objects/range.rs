use crate::error::{Error, Result};
use crate::math::tick_math::{MAX_TICK, MIN_TICK};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a non-fungible pool position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PositionId(pub u64);

impl fmt::Display for PositionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A half-open tick interval `[lower, upper)` the strategy provides
/// liquidity in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TickRange {
    pub lower: i32,
    pub upper: i32,
    /// Set by pool families that mint a token per position.
    pub position_id: Option<PositionId>,
}

impl TickRange {
    /// Builds a range, rejecting misaligned, inverted or out-of-bounds ticks.
    pub fn new(lower: i32, upper: i32, spacing: i32) -> Result<Self> {
        if spacing <= 0 {
            return Err(Error::invalid_config(format!(
                "tick spacing must be positive, got {spacing}"
            )));
        }
        if lower >= upper {
            return Err(Error::invalid_config(format!(
                "lower tick {lower} must be below upper tick {upper}"
            )));
        }
        if lower < MIN_TICK || upper > MAX_TICK {
            return Err(Error::invalid_config(format!(
                "range [{lower}, {upper}] exceeds tick bounds"
            )));
        }
        if lower % spacing != 0 || upper % spacing != 0 {
            return Err(Error::invalid_config(format!(
                "range [{lower}, {upper}] not aligned to spacing {spacing}"
            )));
        }
        Ok(Self {
            lower,
            upper,
            position_id: None,
        })
    }

    #[must_use]
    pub fn with_position_id(mut self, id: PositionId) -> Self {
        self.position_id = Some(id);
        self
    }

    /// Same tick bounds, ignoring the position id.
    pub fn same_ticks(&self, other: &Self) -> bool {
        self.lower == other.lower && self.upper == other.upper
    }

    /// Whether `tick` is inside the range, i.e. liquidity is active there.
    pub fn contains(&self, tick: i32) -> bool {
        self.lower <= tick && tick < self.upper
    }

    pub fn width(&self) -> i32 {
        self.upper - self.lower
    }
}

impl fmt::Display for TickRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.lower, self.upper)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_range() {
        let range = TickRange::new(-120, 120, 60).unwrap();
        assert_eq!(range.width(), 240);
        assert!(range.contains(-120));
        assert!(range.contains(119));
        assert!(!range.contains(120));
        assert_eq!(range.to_string(), "[-120, 120]");
    }

    #[test]
    fn test_rejects_inverted_and_empty() {
        assert!(TickRange::new(60, 60, 60).is_err());
        assert!(TickRange::new(120, 60, 60).is_err());
    }

    #[test]
    fn test_rejects_misaligned() {
        let err = TickRange::new(-100, 120, 60).unwrap_err();
        assert!(matches!(err, Error::InvalidRangeConfiguration(_)));
    }

    #[test]
    fn test_rejects_out_of_bounds() {
        assert!(TickRange::new(-887_280, 0, 60).is_err());
        assert!(TickRange::new(0, 887_280, 60).is_err());
    }

    #[test]
    fn test_position_id_ignored_by_same_ticks() {
        let a = TickRange::new(0, 60, 60).unwrap();
        let b = a.with_position_id(PositionId(7));
        assert!(a.same_ticks(&b));
        assert_ne!(a, b);
    }
}
