pub mod address;
pub mod pair;
pub mod range;

pub use address::Address;
pub use pair::AmountPair;
pub use range::{PositionId, TickRange};
