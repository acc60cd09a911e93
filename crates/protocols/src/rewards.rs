//! External reward emissions claimable by the strategy.

use crate::tokens::TokenLedger;
use clm_vault_domain::error::{Error, Result};
use clm_vault_domain::value_objects::Address;
use primitive_types::U256;
use std::fmt;
use tracing::debug;

pub trait RewardDistributor: Clone + fmt::Debug {
    /// Token paid out, if this distributor emits anything.
    fn reward_token(&self) -> Option<&Address>;

    /// Pays everything accrued up to `now` to `recipient`.
    fn claim(&mut self, tokens: &mut TokenLedger, now: u64, recipient: &Address) -> Result<U256>;
}

/// Distributor for pools without emissions.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRewards;

impl RewardDistributor for NoRewards {
    fn reward_token(&self) -> Option<&Address> {
        None
    }

    fn claim(&mut self, _tokens: &mut TokenLedger, _now: u64, _recipient: &Address) -> Result<U256> {
        Ok(U256::zero())
    }
}

/// Streams a funded amount linearly over a period to a single beneficiary.
#[derive(Debug, Clone)]
pub struct StreamingRewards {
    address: Address,
    token: Address,
    rate_per_second: U256,
    last_claim: u64,
    period_finish: u64,
}

impl StreamingRewards {
    pub fn new(address: Address, token: Address) -> Self {
        Self {
            address,
            token,
            rate_per_second: U256::zero(),
            last_claim: 0,
            period_finish: 0,
        }
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Pulls `amount` from `funder` and streams it over `duration` seconds
    /// from `now`, on top of anything not yet streamed.
    pub fn notify_reward(
        &mut self,
        tokens: &mut TokenLedger,
        funder: &Address,
        amount: U256,
        duration: u64,
        now: u64,
    ) -> Result<()> {
        if duration == 0 {
            return Err(Error::invalid_config("reward duration must be positive"));
        }
        let received = tokens.transfer(&self.token, funder, &self.address, amount)?;
        let leftover = if now < self.period_finish {
            self.rate_per_second * U256::from(self.period_finish - now)
        } else {
            U256::zero()
        };
        if self.period_finish <= now {
            self.last_claim = now;
        }
        self.rate_per_second = (received + leftover) / U256::from(duration);
        self.period_finish = now + duration;
        debug!(
            distributor = %self.address,
            amount = %received,
            duration,
            "reward period started"
        );
        Ok(())
    }

    pub fn pending(&self, now: u64) -> U256 {
        let until = now.min(self.period_finish);
        if until <= self.last_claim {
            return U256::zero();
        }
        self.rate_per_second * U256::from(until - self.last_claim)
    }
}

impl RewardDistributor for StreamingRewards {
    fn reward_token(&self) -> Option<&Address> {
        Some(&self.token)
    }

    fn claim(&mut self, tokens: &mut TokenLedger, now: u64, recipient: &Address) -> Result<U256> {
        let amount = self.pending(now);
        self.last_claim = self.last_claim.max(now.min(self.period_finish));
        if amount.is_zero() {
            return Ok(U256::zero());
        }
        tokens.transfer(&self.token, &self.address, recipient, amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(s: &str) -> Address {
        Address::new(s)
    }

    #[test]
    fn test_streams_linearly() {
        let mut tokens = TokenLedger::new();
        tokens.mint(&addr("rwd"), &addr("gov"), U256::from(1_000u64)).unwrap();
        let mut rewards = StreamingRewards::new(addr("gauge"), addr("rwd"));
        rewards
            .notify_reward(&mut tokens, &addr("gov"), U256::from(1_000u64), 100, 0)
            .unwrap();

        assert_eq!(rewards.pending(25), U256::from(250u64));
        let claimed = rewards.claim(&mut tokens, 25, &addr("strategy")).unwrap();
        assert_eq!(claimed, U256::from(250u64));
        assert!(rewards.claim(&mut tokens, 25, &addr("strategy")).unwrap().is_zero());

        let rest = rewards.claim(&mut tokens, 500, &addr("strategy")).unwrap();
        assert_eq!(rest, U256::from(750u64));
        assert_eq!(
            tokens.balance_of(&addr("rwd"), &addr("strategy")),
            U256::from(1_000u64)
        );
    }

    #[test]
    fn test_no_rewards() {
        let mut tokens = TokenLedger::new();
        let mut rewards = NoRewards;
        assert!(rewards.reward_token().is_none());
        assert!(rewards.claim(&mut tokens, 10, &addr("s")).unwrap().is_zero());
    }
}
