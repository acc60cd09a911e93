use serde::{Deserialize, Serialize};

/// Concentrated-liquidity pool families the strategy can manage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PoolFamily {
    /// Positions keyed by `(owner, lower, upper)`.
    UniswapV3,
    /// Positions minted as non-fungible ids.
    Velodrome,
}

/// Which of the two strategy ranges a value refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RangeKind {
    Main,
    Alt,
}

/// Roles checked by the access-control layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Owner,
    Manager,
    Rebalancer,
    Vault,
}
