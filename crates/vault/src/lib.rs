//! Share-accounting vault over a concentrated-liquidity strategy.
//!
//! Users deposit both pool assets and receive shares; a sliding fee charges
//! deposits that would rebalance the vault for free. [`system::VaultSystem`]
//! runs every operation as one atomic step over the shared ledger.

pub mod config;
pub mod reentrancy;
pub mod shares;
pub mod sliding_fee;
pub mod system;
pub mod vault;

#[cfg(test)]
mod testing;

pub use config::VaultConfig;
pub use system::VaultSystem;
pub use vault::{ConcentratedLiquidityVault, DepositPreview};
