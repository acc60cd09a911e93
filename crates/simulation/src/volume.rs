//! Trading volume models feeding pool fee accrual.

use rust_decimal::Decimal;

/// Daily swap volume, in token1 terms, seen at a given step.
pub trait VolumeModel {
    fn daily_volume(&mut self, step: usize) -> Decimal;
}

/// The same daily volume at every step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstantVolume {
    pub daily: Decimal,
}

impl ConstantVolume {
    #[must_use]
    pub fn new(daily: Decimal) -> Self {
        Self { daily }
    }
}

impl VolumeModel for ConstantVolume {
    fn daily_volume(&mut self, _step: usize) -> Decimal {
        self.daily
    }
}

/// Replays recorded daily volumes, holding the last one once exhausted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeSeries {
    volumes: Vec<Decimal>,
}

impl VolumeSeries {
    #[must_use]
    pub fn new(volumes: Vec<Decimal>) -> Self {
        Self { volumes }
    }
}

impl VolumeModel for VolumeSeries {
    fn daily_volume(&mut self, step: usize) -> Decimal {
        self.volumes
            .get(step)
            .or_else(|| self.volumes.last())
            .copied()
            .unwrap_or(Decimal::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_constant_volume() {
        let mut volume = ConstantVolume::new(dec!(1000000));
        assert_eq!(volume.daily_volume(0), dec!(1000000));
        assert_eq!(volume.daily_volume(99), dec!(1000000));
    }

    #[test]
    fn test_series_holds_last_value() {
        let mut volume = VolumeSeries::new(vec![dec!(10), dec!(20)]);
        assert_eq!(volume.daily_volume(1), dec!(20));
        assert_eq!(volume.daily_volume(5), dec!(20));
        assert_eq!(VolumeSeries::new(Vec::new()).daily_volume(0), Decimal::ZERO);
    }
}
