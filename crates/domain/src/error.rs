//! Error taxonomy shared by every layer of the vault engine.
//!
//! Any error aborts the whole atomic step it was raised in; callers retry by
//! submitting a fresh operation.

use crate::enums::Role;
use thiserror::Error;

/// Failures of the fixed-point math kernel.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MathError {
    #[error("Math error - overflow")]
    Overflow,
    #[error("Math error - division by zero")]
    DivisionByZero,
    #[error("Math error - tick {0} out of bounds")]
    TickOutOfBounds(i32),
    #[error("Math error - sqrt price out of bounds")]
    SqrtPriceOutOfBounds,
    #[error("Math error - tick spacing must be positive, got {0}")]
    InvalidTickSpacing(i32),
}

/// Errors surfaced by strategy, vault and collaborator operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Spot tick deviates from the TWAP beyond the configured threshold.
    #[error("price not calm: spot tick {spot}, twap tick {twap}, max deviation {max_deviation}")]
    PriceNotCalm {
        spot: i32,
        twap: i32,
        max_deviation: i32,
    },

    /// A range or guard parameter violates its configured bounds.
    #[error("invalid range configuration: {0}")]
    InvalidRangeConfiguration(String),

    /// Realized shares or amounts fell below the caller's minimums.
    #[error("slippage exceeded: {0}")]
    SlippageExceeded(String),

    #[error("unauthorized: caller {caller} lacks role {role:?}")]
    Unauthorized { caller: String, role: Role },

    /// A pool, router, reward distributor or token transfer failed.
    #[error("external call failed: {0}")]
    ExternalCallFailure(String),

    #[error("strategy is paused")]
    Paused,

    #[error("re-entrant call rejected")]
    Reentrancy,

    #[error("operation would mint zero shares")]
    ZeroShares,

    #[error("operation would move zero amounts")]
    ZeroAmounts,

    #[error(transparent)]
    Math(#[from] MathError),
}

impl Error {
    /// Shorthand for [`Error::ExternalCallFailure`].
    pub fn external(message: impl Into<String>) -> Self {
        Self::ExternalCallFailure(message.into())
    }

    /// Shorthand for [`Error::InvalidRangeConfiguration`].
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidRangeConfiguration(message.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
