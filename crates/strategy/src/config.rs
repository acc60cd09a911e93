//! Strategy configuration.

use clm_vault_domain::error::{Error, Result};
use clm_vault_domain::fees::FeeConfig;
use clm_vault_domain::value_objects::Address;
use serde::{Deserialize, Serialize};

/// Shortest TWAP window the calm guard accepts, in seconds.
pub const MIN_TWAP_INTERVAL: u32 = 60;

/// Largest allowed deviation expressed in tick spacings.
pub const MAX_DEVIATION_SPACINGS: i32 = 4;

/// Configuration for a concentrated-liquidity strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// Half-width of the main range in tick spacings.
    pub position_width: i32,
    /// Maximum distance in ticks between spot and TWAP for a calm price.
    pub max_tick_deviation: i32,
    /// TWAP window in seconds.
    pub twap_interval: u32,
    /// Seconds over which harvested profit is released.
    pub locked_profit_duration: u64,
    /// Asset performance fees are paid in.
    pub native: Address,
    /// Multi-hop swap paths; a direct hop is used when none matches.
    #[serde(default)]
    pub swap_paths: Vec<Vec<Address>>,
    /// Performance fee configuration.
    #[serde(default)]
    pub fees: FeeConfig,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            position_width: 10,
            max_tick_deviation: 60,
            twap_interval: 120,
            locked_profit_duration: 6 * 60 * 60, // 6 hours
            native: Address::new("native"),
            swap_paths: Vec::new(),
            fees: FeeConfig::default(),
        }
    }
}

impl StrategyConfig {
    #[must_use]
    pub fn with_position_width(mut self, width: i32) -> Self {
        self.position_width = width;
        self
    }

    #[must_use]
    pub fn with_max_tick_deviation(mut self, deviation: i32) -> Self {
        self.max_tick_deviation = deviation;
        self
    }

    #[must_use]
    pub fn with_twap_interval(mut self, seconds: u32) -> Self {
        self.twap_interval = seconds;
        self
    }

    #[must_use]
    pub fn with_locked_profit_duration(mut self, seconds: u64) -> Self {
        self.locked_profit_duration = seconds;
        self
    }

    #[must_use]
    pub fn with_native(mut self, native: Address) -> Self {
        self.native = native;
        self
    }

    #[must_use]
    pub fn with_swap_path(mut self, path: Vec<Address>) -> Self {
        self.swap_paths.push(path);
        self
    }

    #[must_use]
    pub fn with_fees(mut self, fees: FeeConfig) -> Self {
        self.fees = fees;
        self
    }

    /// Checks every bound against the pool's tick spacing.
    pub fn validate(&self, tick_spacing: i32) -> Result<()> {
        validate_position_width(self.position_width)?;
        validate_twap_interval(self.twap_interval)?;
        validate_max_tick_deviation(self.max_tick_deviation, tick_spacing)?;
        self.fees.validate()
    }

    pub fn routes(&self) -> Routes {
        Routes {
            native: self.native.clone(),
            swap_paths: self.swap_paths.clone(),
        }
    }
}

/// Swap paths used when converting harvested tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Routes {
    pub native: Address,
    pub swap_paths: Vec<Vec<Address>>,
}

impl Routes {
    /// Configured path from `from` to `to`, or the direct hop.
    pub fn route(&self, from: &Address, to: &Address) -> Vec<Address> {
        self.swap_paths
            .iter()
            .find(|path| path.len() >= 2 && path.first() == Some(from) && path.last() == Some(to))
            .cloned()
            .unwrap_or_else(|| vec![from.clone(), to.clone()])
    }
}

pub fn validate_position_width(width: i32) -> Result<()> {
    if width < 1 {
        return Err(Error::invalid_config(format!(
            "position width must be at least 1, got {width}"
        )));
    }
    Ok(())
}

pub fn validate_twap_interval(seconds: u32) -> Result<()> {
    if seconds < MIN_TWAP_INTERVAL {
        return Err(Error::invalid_config(format!(
            "twap interval {seconds}s is below the {MIN_TWAP_INTERVAL}s minimum"
        )));
    }
    Ok(())
}

pub fn validate_max_tick_deviation(deviation: i32, tick_spacing: i32) -> Result<()> {
    let limit = tick_spacing.saturating_mul(MAX_DEVIATION_SPACINGS);
    if deviation < 0 || deviation > limit {
        return Err(Error::invalid_config(format!(
            "max tick deviation {deviation} outside [0, {limit}]"
        )));
    }
    Ok(())
}
