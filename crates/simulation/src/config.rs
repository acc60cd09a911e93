//! Scenario configuration.

use crate::keepers::KeeperPolicy;
use clm_vault_domain::enums::PoolFamily;
use clm_vault_domain::error::{Error, Result};
use clm_vault_domain::token::Token;
use clm_vault_domain::value_objects::Address;
use clm_vault_strategy::config::StrategyConfig;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub const SECONDS_PER_DAY: u64 = 86_400;

/// A user deposit or withdrawal executed at a given step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScheduledFlow {
    Deposit {
        step: usize,
        user: Address,
        amount0: Decimal,
        amount1: Decimal,
    },
    /// Burns `fraction` of the user's shares.
    Withdraw {
        step: usize,
        user: Address,
        fraction: Decimal,
    },
}

impl ScheduledFlow {
    pub fn step(&self) -> usize {
        match self {
            Self::Deposit { step, .. } | Self::Withdraw { step, .. } => *step,
        }
    }

    pub fn user(&self) -> &Address {
        match self {
            Self::Deposit { user, .. } | Self::Withdraw { user, .. } => user,
        }
    }
}

/// Everything needed to replay a market against one vault.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    /// Number of price steps.
    pub steps: usize,
    pub step_seconds: u64,
    /// Seconds after each price move before the keeper and users act.
    pub keeper_delay_seconds: u64,
    /// Token1 per token0.
    pub initial_price: Decimal,
    pub token0: Token,
    pub token1: Token,
    pub pool_family: PoolFamily,
    pub tick_spacing: i32,
    /// Swap fee in hundredths of a basis point.
    pub fee_pips: u32,
    /// Liquidity of other LPs sharing the fees.
    pub external_liquidity: u128,
    /// Daily swap volume in token1.
    pub daily_volume: Decimal,
    /// Reward tokens streamed to the strategy per day.
    pub reward_per_day: Decimal,
    /// Annualized drift for generated paths.
    pub drift: f64,
    /// Annualized volatility for generated paths.
    pub volatility: f64,
    pub seed: Option<u64>,
    pub flows: Vec<ScheduledFlow>,
    /// Whether every depositor exits after the last step.
    pub withdraw_at_end: bool,
    pub keeper: KeeperPolicy,
    pub strategy: StrategyConfig,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            steps: 168, // one week of hourly steps
            step_seconds: 3_600,
            keeper_delay_seconds: 600,
            initial_price: Decimal::ONE,
            token0: Token::new("token0", "TK0", 18, "Token 0"),
            token1: Token::new("token1", "TK1", 18, "Token 1"),
            pool_family: PoolFamily::UniswapV3,
            tick_spacing: 60,
            fee_pips: 3_000,
            external_liquidity: 1_000_000_000_000_000_000_000_000,
            daily_volume: Decimal::from(100_000),
            reward_per_day: Decimal::ZERO,
            drift: 0.0,
            volatility: 0.5,
            seed: None,
            flows: vec![ScheduledFlow::Deposit {
                step: 0,
                user: Address::new("alice"),
                amount0: Decimal::from(1_000),
                amount1: Decimal::from(1_000),
            }],
            withdraw_at_end: true,
            keeper: KeeperPolicy::default(),
            strategy: StrategyConfig::default(),
        }
    }
}

impl ScenarioConfig {
    #[must_use]
    pub fn with_steps(mut self, steps: usize) -> Self {
        self.steps = steps;
        self
    }

    #[must_use]
    pub fn with_step_seconds(mut self, seconds: u64) -> Self {
        self.step_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_keeper_delay(mut self, seconds: u64) -> Self {
        self.keeper_delay_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_initial_price(mut self, price: Decimal) -> Self {
        self.initial_price = price;
        self
    }

    #[must_use]
    pub fn with_tokens(mut self, token0: Token, token1: Token) -> Self {
        self.token0 = token0;
        self.token1 = token1;
        self
    }

    #[must_use]
    pub fn with_pool_family(mut self, family: PoolFamily) -> Self {
        self.pool_family = family;
        self
    }

    #[must_use]
    pub fn with_daily_volume(mut self, volume: Decimal) -> Self {
        self.daily_volume = volume;
        self
    }

    #[must_use]
    pub fn with_reward_per_day(mut self, amount: Decimal) -> Self {
        self.reward_per_day = amount;
        self
    }

    #[must_use]
    pub fn with_volatility(mut self, drift: f64, volatility: f64) -> Self {
        self.drift = drift;
        self.volatility = volatility;
        self
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Appends a flow to the schedule.
    #[must_use]
    pub fn with_flow(mut self, flow: ScheduledFlow) -> Self {
        self.flows.push(flow);
        self
    }

    #[must_use]
    pub fn with_keeper(mut self, keeper: KeeperPolicy) -> Self {
        self.keeper = keeper;
        self
    }

    #[must_use]
    pub fn with_strategy(mut self, strategy: StrategyConfig) -> Self {
        self.strategy = strategy;
        self
    }

    /// Scenario length in days.
    pub fn duration_days(&self) -> Decimal {
        Decimal::from(self.steps as u64) * Decimal::from(self.step_seconds)
            / Decimal::from(SECONDS_PER_DAY)
    }

    /// Step length in years, for price path generators.
    pub fn time_step_years(&self) -> f64 {
        self.step_seconds as f64 / (365.0 * SECONDS_PER_DAY as f64)
    }

    pub fn validate(&self) -> Result<()> {
        if self.steps == 0 {
            return Err(Error::invalid_config("scenario needs at least one step"));
        }
        if self.keeper_delay_seconds == 0 || self.keeper_delay_seconds >= self.step_seconds {
            return Err(Error::invalid_config(format!(
                "keeper delay {}s must be positive and shorter than the {}s step",
                self.keeper_delay_seconds, self.step_seconds
            )));
        }
        if self.token0.address == self.token1.address {
            return Err(Error::invalid_config("pool assets must differ"));
        }
        if self.token0.decimals.abs_diff(self.token1.decimals) > 18 {
            return Err(Error::invalid_config("asset decimals differ by more than 18"));
        }
        if self.initial_price <= Decimal::ZERO {
            return Err(Error::invalid_config("initial price must be positive"));
        }
        if self.daily_volume.is_sign_negative() || self.reward_per_day.is_sign_negative() {
            return Err(Error::invalid_config("volume and rewards cannot be negative"));
        }
        if !(self.volatility >= 0.0 && self.volatility.is_finite() && self.drift.is_finite()) {
            return Err(Error::invalid_config("drift and volatility must be finite, volatility non-negative"));
        }
        for flow in &self.flows {
            if flow.step() > self.steps {
                return Err(Error::invalid_config(format!(
                    "flow for {} scheduled at step {} after the last step {}",
                    flow.user(),
                    flow.step(),
                    self.steps
                )));
            }
            if let ScheduledFlow::Withdraw { fraction, .. } = flow {
                if *fraction <= Decimal::ZERO || *fraction > Decimal::ONE {
                    return Err(Error::invalid_config(format!(
                        "withdraw fraction {fraction} outside (0, 1]"
                    )));
                }
            }
        }
        self.strategy.validate(self.tick_spacing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_is_valid() {
        let config = ScenarioConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.duration_days(), dec!(7));
    }

    #[test]
    fn test_rejects_bad_timing() {
        let config = ScenarioConfig::default().with_keeper_delay(3_600);
        assert!(matches!(config.validate(), Err(Error::InvalidRangeConfiguration(_))));
        assert!(ScenarioConfig::default().with_steps(0).validate().is_err());
    }

    #[test]
    fn test_rejects_bad_flows() {
        let late = ScenarioConfig::default().with_steps(10).with_flow(ScheduledFlow::Deposit {
            step: 11,
            user: Address::new("bob"),
            amount0: dec!(1),
            amount1: dec!(1),
        });
        assert!(late.validate().is_err());

        let greedy = ScenarioConfig::default().with_flow(ScheduledFlow::Withdraw {
            step: 5,
            user: Address::new("alice"),
            fraction: dec!(1.5),
        });
        assert!(greedy.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: ScenarioConfig = serde_json::from_str(
            r#"{"steps": 24, "keeper": {"kind": "periodic", "harvest_interval": 6}}"#,
        )
        .unwrap();
        assert_eq!(config.steps, 24);
        assert_eq!(config.step_seconds, 3_600);
        assert_eq!(config.flows.len(), 1);
        assert!(config.validate().is_ok());
    }
}
