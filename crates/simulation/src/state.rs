//! Per-step records and the summary of a scenario run.

use crate::config::ScenarioConfig;
use crate::keepers::KeeperAction;
use clm_vault_domain::value_objects::AmountPair;
use clm_vault_strategy::strategy::StrategySnapshot;
use primitive_types::U256;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// What happened to the keeper's action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepOutcome {
    Held,
    Harvested { native_fee: U256 },
    Rebalanced,
    /// The calm guard rejected the action.
    SkippedNotCalm,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    pub step: u64,
    pub timestamp: u64,
    pub price: Decimal,
    pub tick: i32,
    pub calm: bool,
    pub action: KeeperAction,
    pub outcome: StepOutcome,
    pub in_range: bool,
    /// Fees the vault's positions earned during the step.
    pub fees_earned: AmountPair,
    pub reported_balances: AmountPair,
    /// Share price in token1 per whole share.
    pub share_price: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioSummary {
    pub config: ScenarioConfig,
    pub keeper: String,
    pub initial_price: Decimal,
    pub final_price: Decimal,
    pub total_steps: u64,
    pub steps_in_range: u64,
    pub harvests: u32,
    pub rebalances: u32,
    pub skipped_not_calm: u32,
    /// Deposits and withdrawals the vault rejected.
    pub rejected_flows: u32,
    /// Performance fees paid out, in the native asset.
    pub native_fees: Decimal,
    pub fees_earned0: Decimal,
    pub fees_earned1: Decimal,
    pub initial_share_price: Decimal,
    pub final_share_price: Decimal,
    /// Paid to depositors by the closing withdrawals.
    pub withdrawn0: Decimal,
    pub withdrawn1: Decimal,
    pub events: usize,
}

impl ScenarioSummary {
    /// Returns the fraction of steps the price spent inside the main range.
    #[must_use]
    pub fn time_in_range_pct(&self) -> Decimal {
        if self.total_steps == 0 {
            return Decimal::ZERO;
        }
        Decimal::from(self.steps_in_range) / Decimal::from(self.total_steps)
    }

    /// Relative change of the share price over the run.
    #[must_use]
    pub fn share_price_return(&self) -> Decimal {
        if self.initial_share_price.is_zero() {
            return Decimal::ZERO;
        }
        (self.final_share_price - self.initial_share_price) / self.initial_share_price
    }

    #[must_use]
    pub fn annualized_return(&self) -> Decimal {
        let days = self.config.duration_days();
        if days.is_zero() {
            return Decimal::ZERO;
        }
        self.share_price_return() * Decimal::from(365) / days
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub summary: ScenarioSummary,
    pub records: Vec<StepRecord>,
    /// Strategy state after the last step, before the closing withdrawals.
    pub snapshot: StrategySnapshot,
}
