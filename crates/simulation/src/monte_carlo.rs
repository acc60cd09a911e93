//! Monte Carlo runs of one scenario over many GBM price paths.

use crate::config::ScenarioConfig;
use crate::price_path::{GeometricBrownianMotion, PricePathGenerator};
use crate::runner::run_scenario;
use crate::state::ScenarioSummary;
use crate::volume::VolumeModel;
use clm_vault_domain::error::{Error, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub struct MonteCarloRunner<V: VolumeModel + Clone> {
    pub config: ScenarioConfig,
    pub volume_model: V,
    pub iterations: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateResult {
    pub mean_return: Decimal,
    pub median_return: Decimal,
    /// Share price return at the 5th percentile.
    pub var_95_return: Decimal,
    pub mean_time_in_range: Decimal,
    pub mean_harvests: Decimal,
    pub mean_skipped_not_calm: Decimal,
    pub iterations: usize,
}

impl<V: VolumeModel + Clone> MonteCarloRunner<V> {
    #[must_use]
    pub fn new(config: ScenarioConfig, volume_model: V, iterations: usize) -> Self {
        Self {
            config,
            volume_model,
            iterations,
        }
    }

    pub fn run(&self) -> Result<AggregateResult> {
        if self.iterations == 0 {
            return Err(Error::invalid_config("monte carlo needs at least one iteration"));
        }
        let mut summaries = Vec::with_capacity(self.iterations);
        for iteration in 0..self.iterations {
            let mut gbm = GeometricBrownianMotion::new(
                self.config.initial_price,
                self.config.drift,
                self.config.volatility,
                self.config.time_step_years(),
            );
            if let Some(seed) = self.config.seed {
                gbm = gbm.with_seed(seed.wrapping_add(iteration as u64));
            }
            let prices = gbm.generate(self.config.steps);
            // Fresh volume state per path.
            let mut volume = self.volume_model.clone();
            let result = run_scenario(&self.config, &prices, &mut volume)?;
            debug!(
                iteration,
                share_price_return = %result.summary.share_price_return(),
                "monte carlo path done"
            );
            summaries.push(result.summary);
        }
        Ok(aggregate(&summaries))
    }
}

fn mean(values: impl Iterator<Item = Decimal>, count: Decimal) -> Decimal {
    values.sum::<Decimal>() / count
}

fn aggregate(summaries: &[ScenarioSummary]) -> AggregateResult {
    let count = Decimal::from(summaries.len());

    let mut returns: Vec<Decimal> = summaries
        .iter()
        .map(ScenarioSummary::share_price_return)
        .collect();
    let mean_return = mean(returns.iter().copied(), count);
    returns.sort();

    let median_return = returns[returns.len() / 2];
    // VaR 95% is the value at the 5th percentile
    let var_idx = (returns.len() as f64 * 0.05).floor() as usize;
    let var_95_return = returns[var_idx.min(returns.len() - 1)];

    AggregateResult {
        mean_return,
        median_return,
        var_95_return,
        mean_time_in_range: mean(summaries.iter().map(ScenarioSummary::time_in_range_pct), count),
        mean_harvests: mean(summaries.iter().map(|s| Decimal::from(s.harvests)), count),
        mean_skipped_not_calm: mean(
            summaries.iter().map(|s| Decimal::from(s.skipped_not_calm)),
            count,
        ),
        iterations: summaries.len(),
    }
}
