//! Scenario simulation for the concentrated-liquidity vault.
//!
//! Generates price paths, replays them against a [`clm_vault::VaultSystem`]
//! over an in-memory pool, and lets a keeper policy decide when to harvest
//! or re-center.

pub mod config;
pub mod keepers;
pub mod monte_carlo;
pub mod prelude;
pub mod price_path;
pub mod runner;
pub mod state;
pub mod volume;
