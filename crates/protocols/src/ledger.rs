//! The shared world state every operation runs against.
//!
//! A [`Ledger`] bundles token balances, the pool, the swap router, the reward
//! distributor, the clock and the event journal. Operations mutate it only
//! through [`atomic`], so a failed step leaves no trace.

use crate::tokens::TokenLedger;
use clm_vault_domain::error::Result;
use clm_vault_domain::events::{EventData, LifecycleEvent, LifecycleEventType};
use clm_vault_domain::value_objects::Address;
use tracing::warn;

/// Append-only record of emitted events.
#[derive(Debug, Clone, Default)]
pub struct EventJournal {
    events: Vec<LifecycleEvent>,
}

impl EventJournal {
    pub fn push(&mut self, event: LifecycleEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[LifecycleEvent] {
        &self.events
    }

    pub fn of_type(&self, event_type: LifecycleEventType) -> impl Iterator<Item = &LifecycleEvent> {
        self.events
            .iter()
            .filter(move |event| event.event_type == event_type)
    }

    pub fn last(&self) -> Option<&LifecycleEvent> {
        self.events.last()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Ledger<P, R, D> {
    /// Seconds since the simulation epoch.
    pub timestamp: u64,
    pub tokens: TokenLedger,
    pub pool: P,
    pub router: R,
    pub rewards: D,
    pub journal: EventJournal,
}

impl<P, R, D> Ledger<P, R, D> {
    pub fn new(timestamp: u64, tokens: TokenLedger, pool: P, router: R, rewards: D) -> Self {
        Self {
            timestamp,
            tokens,
            pool,
            router,
            rewards,
            journal: EventJournal::default(),
        }
    }

    /// Advances the clock.
    pub fn warp(&mut self, seconds: u64) {
        self.timestamp = self.timestamp.saturating_add(seconds);
    }

    pub fn emit(&mut self, emitter: &Address, data: EventData) {
        self.journal
            .push(LifecycleEvent::new(emitter.clone(), self.timestamp, data));
    }
}

/// Runs `op` against a draft copy of `state` and commits it only on success.
pub fn atomic<S, T, F>(state: &mut S, op: F) -> Result<T>
where
    S: Clone,
    F: FnOnce(&mut S) -> Result<T>,
{
    let mut draft = state.clone();
    match op(&mut draft) {
        Ok(value) => {
            *state = draft;
            Ok(value)
        }
        Err(err) => {
            warn!(error = %err, "atomic step rolled back");
            Err(err)
        }
    }
}
