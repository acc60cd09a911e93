//! Core domain types for the concentrated-liquidity vault engine.
//!
//! Holds the fixed-point math kernel, value objects shared by every crate,
//! the fee configuration, lifecycle events and the error taxonomy.

pub mod enums;
pub mod error;
pub mod events;
pub mod fees;
pub mod math;
pub mod token;
pub mod value_objects;

pub use error::{Error, MathError, Result};
