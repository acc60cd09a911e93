//! Prelude module for convenient imports.
//!
//! ```rust
//! use clm_vault_simulation::prelude::*;
//! ```

// Configuration
pub use crate::config::{ScenarioConfig, ScheduledFlow};

// Keepers
pub use crate::keepers::{
    Keeper, KeeperAction, KeeperContext, KeeperPolicy, PeriodicKeeper, ThresholdKeeper,
};

// Monte Carlo
pub use crate::monte_carlo::{AggregateResult, MonteCarloRunner};

// Price path generators
pub use crate::price_path::{DeterministicPricePath, GeometricBrownianMotion, PricePathGenerator};

// Scenario runner
pub use crate::runner::{ScenarioRunner, SimStrategy, SimSystem, run_scenario};

// Results
pub use crate::state::{ScenarioResult, ScenarioSummary, StepOutcome, StepRecord};

// Volume models
pub use crate::volume::{ConstantVolume, VolumeModel, VolumeSeries};
