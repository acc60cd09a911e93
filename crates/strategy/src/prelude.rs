//! Prelude module for convenient imports.
//!
//! ```rust
//! use clm_vault_strategy::prelude::*;
//! ```

// Roles
pub use crate::access::AccessControl;

// Calm guard
pub use crate::calm::{CalmPeriodGuard, CalmReading};

// Configuration
pub use crate::config::{MAX_DEVIATION_SPACINGS, MIN_TWAP_INTERVAL, Routes, StrategyConfig};

// Harvest
pub use crate::harvest::ChargedFees;
pub use crate::locked_profit::LockedProfit;

// Ranges
pub use crate::position::{ClaimedFees, PositionManager};

// Strategy
pub use crate::context::StrategyContext;
pub use crate::strategy::{ConcentratedLiquidityStrategy, HarvestReport, StrategySnapshot};
pub use crate::vault_strategy::{LedgerOf, VaultStrategy};
