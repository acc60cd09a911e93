//! Lifecycle events emitted by the strategy and vault.
//!
//! Events are journaled on the ledger and discarded together with every
//! other effect when the surrounding step fails.

use crate::enums::RangeKind;
use crate::fees::FeeSplit;
use crate::value_objects::{Address, AmountPair, TickRange};
use primitive_types::U256;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Type of lifecycle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LifecycleEventType {
    /// Reported balances after a state change.
    Tvl,
    /// Pool fees collected from live ranges.
    ClaimedFees,
    /// External reward emissions claimed.
    ClaimedRewards,
    /// A harvest completed.
    Harvest,
    /// Performance fee distributed.
    ChargedFees,
    /// Ranges recomputed.
    TicksSet,
    /// Liquidity added to a range.
    RangeOpened,
    /// Liquidity removed from a range.
    RangeClosed,
    Deposit,
    Withdraw,
    Paused,
    Unpaused,
    /// A managed parameter changed.
    ConfigChanged,
    OwnershipTransferred,
    Retired,
}

/// A journaled event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleEvent {
    /// Event ID.
    pub id: Uuid,
    /// Event type.
    pub event_type: LifecycleEventType,
    /// Component that emitted the event.
    pub emitter: Address,
    /// Ledger time in seconds.
    pub timestamp: u64,
    /// Event-specific data.
    pub data: EventData,
}

impl LifecycleEvent {
    /// Creates a new lifecycle event.
    pub fn new(emitter: Address, timestamp: u64, data: EventData) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_type: data.event_type(),
            emitter,
            timestamp,
            data,
        }
    }
}

/// Event-specific data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventData {
    Tvl { balances: AmountPair },
    ClaimedFees { main: AmountPair, alt: AmountPair },
    ClaimedRewards { token: Address, amount: U256 },
    Harvest(HarvestData),
    ChargedFees(FeeSplit),
    TicksSet { main: TickRange, alt: Option<TickRange> },
    RangeOpened(RangeOpenedData),
    RangeClosed { kind: RangeKind, range: TickRange, amounts: AmountPair },
    Deposit(DepositData),
    Withdraw(WithdrawData),
    Paused,
    Unpaused,
    ConfigChanged { parameter: String, value: String },
    OwnershipTransferred {
        previous: Option<Address>,
        new: Option<Address>,
    },
    Retired,
}

impl EventData {
    pub fn event_type(&self) -> LifecycleEventType {
        match self {
            Self::Tvl { .. } => LifecycleEventType::Tvl,
            Self::ClaimedFees { .. } => LifecycleEventType::ClaimedFees,
            Self::ClaimedRewards { .. } => LifecycleEventType::ClaimedRewards,
            Self::Harvest(_) => LifecycleEventType::Harvest,
            Self::ChargedFees(_) => LifecycleEventType::ChargedFees,
            Self::TicksSet { .. } => LifecycleEventType::TicksSet,
            Self::RangeOpened(_) => LifecycleEventType::RangeOpened,
            Self::RangeClosed { .. } => LifecycleEventType::RangeClosed,
            Self::Deposit(_) => LifecycleEventType::Deposit,
            Self::Withdraw(_) => LifecycleEventType::Withdraw,
            Self::Paused => LifecycleEventType::Paused,
            Self::Unpaused => LifecycleEventType::Unpaused,
            Self::ConfigChanged { .. } => LifecycleEventType::ConfigChanged,
            Self::OwnershipTransferred { .. } => LifecycleEventType::OwnershipTransferred,
            Self::Retired => LifecycleEventType::Retired,
        }
    }
}

/// Data for a completed harvest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarvestData {
    /// Earnings compounded after fees.
    pub compounded: AmountPair,
    /// Native asset taken as performance fee.
    pub native_fee: U256,
    /// Locked profit after the harvest.
    pub total_locked: AmountPair,
}

/// Data for a range opened event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeOpenedData {
    pub kind: RangeKind,
    pub range: TickRange,
    pub liquidity: u128,
    /// Tokens pulled by the pool.
    pub amounts: AmountPair,
}

/// Data for a vault deposit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositData {
    pub user: Address,
    pub shares: U256,
    /// Amounts credited after transfer and sliding fees.
    pub amounts: AmountPair,
    /// Sliding fee withheld from the deposit.
    pub fees: AmountPair,
}

/// Data for a vault withdrawal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawData {
    pub user: Address,
    pub shares: U256,
    /// Amounts the user received.
    pub amounts: AmountPair,
}
