use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque account identifier on the simulated ledger.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Address(String);

impl Address {
    /// Sink for the permanently locked minimum share supply.
    pub const DEAD: &'static str = "0x000000000000000000000000000000000000dEaD";

    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn dead() -> Self {
        Self::new(Self::DEAD)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Address {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Address {
    fn from(value: String) -> Self {
        Self(value)
    }
}
