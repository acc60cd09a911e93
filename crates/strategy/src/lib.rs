//! Rebalancing concentrated-liquidity strategy.
//!
//! Keeps a main range centred on the current tick and an alternative range
//! for the leftover asset, guarded by a TWAP calm check. Harvests pool fees
//! and reward emissions, charges the performance fee and releases compounded
//! profit linearly.

pub mod access;
pub mod calm;
pub mod config;
pub mod context;
pub mod harvest;
pub mod locked_profit;
pub mod position;
pub mod prelude;
pub mod strategy;
pub mod vault_strategy;

#[cfg(test)]
mod testing;

pub use strategy::ConcentratedLiquidityStrategy;
pub use vault_strategy::{LedgerOf, VaultStrategy};
