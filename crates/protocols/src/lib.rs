//! Collaborators of the vault strategy.
//!
//! Capability traits for concentrated-liquidity pools, swap routers and
//! reward distributors, plus in-memory implementations and the atomic
//! [`ledger::Ledger`] world state they operate on.

pub mod ledger;
pub mod pool;
pub mod rewards;
pub mod router;
pub mod tokens;

pub use ledger::{EventJournal, Ledger, atomic};
pub use pool::{ConcentratedPool, MarketSimulation, UniswapV3Pool, VelodromePool};
pub use rewards::{NoRewards, RewardDistributor, StreamingRewards};
pub use router::{OracleRouter, SwapRouter};
pub use tokens::TokenLedger;
