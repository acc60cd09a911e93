//! Reward claiming and performance-fee charging.

use crate::config::Routes;
use crate::context::StrategyContext;
use clm_vault_domain::error::{Error, Result};
use clm_vault_domain::events::EventData;
use clm_vault_domain::fees::FeeSplit;
use clm_vault_domain::value_objects::{Address, AmountPair};
use clm_vault_protocols::ledger::Ledger;
use clm_vault_protocols::pool::ConcentratedPool;
use clm_vault_protocols::rewards::RewardDistributor;
use clm_vault_protocols::router::SwapRouter;
use primitive_types::U256;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Outcome of charging performance fees on accrued earnings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargedFees {
    /// Earnings left to compound.
    pub remainder: AmountPair,
    /// Fee converted to the native asset.
    pub native_fee: U256,
    pub split: FeeSplit,
}

/// Swaps along `path` and returns what `owner` actually received.
fn swap_measured<P, R, D>(
    ledger: &mut Ledger<P, R, D>,
    owner: &Address,
    path: &[Address],
    amount: U256,
) -> Result<U256>
where
    R: SwapRouter,
{
    let Some(token_out) = path.last() else {
        return Err(Error::external("empty swap path"));
    };
    let before = ledger.tokens.balance_of(token_out, owner);
    ledger.router.swap(&mut ledger.tokens, owner, path, amount)?;
    Ok(ledger.tokens.balance_of(token_out, owner).saturating_sub(before))
}

/// Claims reward emissions and converts them into pool assets.
///
/// A reward paid in one of the pool assets is credited to that asset; any
/// other reward token is swapped into asset0.
pub fn claim_rewards<P, R, D>(
    ledger: &mut Ledger<P, R, D>,
    owner: &Address,
    routes: &Routes,
) -> Result<AmountPair>
where
    P: ConcentratedPool,
    R: SwapRouter,
    D: RewardDistributor,
{
    let Some(token) = ledger.rewards.reward_token().cloned() else {
        return Ok(AmountPair::zero());
    };
    let before = ledger.tokens.balance_of(&token, owner);
    let now = ledger.timestamp;
    ledger.rewards.claim(&mut ledger.tokens, now, owner)?;
    let received = ledger.tokens.balance_of(&token, owner).saturating_sub(before);
    if received.is_zero() {
        return Ok(AmountPair::zero());
    }
    ledger.emit(
        owner,
        EventData::ClaimedRewards {
            token: token.clone(),
            amount: received,
        },
    );

    let (token0, token1) = (ledger.pool.token0().clone(), ledger.pool.token1().clone());
    let credited = if token == token0 {
        AmountPair::new(received, U256::zero())
    } else if token == token1 {
        AmountPair::new(U256::zero(), received)
    } else {
        let path = routes.route(&token, &token0);
        AmountPair::new(swap_measured(ledger, owner, &path, received)?, U256::zero())
    };
    debug!(reward = %token, amount = %received, "rewards claimed");
    Ok(credited)
}

/// Takes the performance fee out of `accrued`, converts it to the native
/// asset and pays caller, strategist and treasury.
pub fn charge_fees<P, R, D>(
    ledger: &mut Ledger<P, R, D>,
    context: &StrategyContext,
    routes: &Routes,
    owner: &Address,
    accrued: AmountPair,
    call_fee_recipient: &Address,
) -> Result<ChargedFees>
where
    P: ConcentratedPool,
    R: SwapRouter,
{
    let (token0, token1) = (ledger.pool.token0().clone(), ledger.pool.token1().clone());
    let native = &routes.native;
    let mut native_fee = U256::zero();
    let mut remainder = accrued;

    for (token, earned, left) in [
        (&token0, accrued.amount0, &mut remainder.amount0),
        (&token1, accrued.amount1, &mut remainder.amount1),
    ] {
        if earned.is_zero() {
            continue;
        }
        let fee = context.fees.fee_on(earned)?;
        *left = earned - fee;
        if fee.is_zero() {
            continue;
        }
        let converted = if token == native {
            fee
        } else {
            swap_measured(ledger, owner, &routes.route(token, native), fee)?
        };
        native_fee = native_fee
            .checked_add(converted)
            .ok_or_else(|| Error::external("native fee overflow"))?;
    }

    let split = context.fees.split(native_fee)?;
    for (recipient, amount) in [
        (call_fee_recipient, split.call),
        (&context.fees.strategist_recipient, split.strategist),
        (&context.fees.treasury, split.treasury),
    ] {
        ledger.tokens.transfer(native, owner, recipient, amount)?;
    }
    ledger.emit(owner, EventData::ChargedFees(split));
    info!(
        native_fee = %native_fee,
        call = %split.call,
        strategist = %split.strategist,
        treasury = %split.treasury,
        "charged fees"
    );

    Ok(ChargedFees {
        remainder,
        native_fee,
        split,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{addr, context, fund, ledger_at_tick, routes};

    #[test]
    fn test_charge_fees_splits_native() {
        let mut ledger = ledger_at_tick(0);
        let owner = addr("strategy");
        fund(&mut ledger, &owner, U256::from(1_000_000u64), U256::from(1_000_000u64));

        let charged = charge_fees(
            &mut ledger,
            &context(),
            &routes(),
            &owner,
            AmountPair::new(100_000u64, 200_000u64),
            &addr("keeper"),
        )
        .unwrap();

        // 9.5% of each side; token0 and token1 both trade 1:1 for native.
        assert_eq!(charged.remainder, AmountPair::new(90_500u64, 181_000u64));
        assert_eq!(charged.native_fee, U256::from(28_500u64));
        assert_eq!(charged.split.call, U256::from(285u64));
        assert_eq!(charged.split.strategist, U256::from(1_425u64));
        assert_eq!(charged.split.treasury, U256::from(26_790u64));

        let native = addr("native");
        assert_eq!(ledger.tokens.balance_of(&native, &addr("keeper")), U256::from(285u64));
        assert_eq!(ledger.tokens.balance_of(&native, &addr("treasury")), U256::from(26_790u64));
        assert!(ledger.tokens.balance_of(&native, &owner).is_zero());
    }

    #[test]
    fn test_charge_fees_with_nothing_accrued() {
        let mut ledger = ledger_at_tick(0);
        let charged = charge_fees(
            &mut ledger,
            &context(),
            &routes(),
            &addr("strategy"),
            AmountPair::zero(),
            &addr("keeper"),
        )
        .unwrap();
        assert_eq!(charged, ChargedFees::default());
    }

    #[test]
    fn test_missing_route_aborts() {
        let mut ledger = ledger_at_tick(0);
        let owner = addr("strategy");
        fund(&mut ledger, &owner, U256::from(1_000u64), U256::zero());
        let mut routes = routes();
        routes.native = addr("unlisted");
        let err = charge_fees(
            &mut ledger,
            &context(),
            &routes,
            &owner,
            AmountPair::new(1_000u64, 0u64),
            &addr("keeper"),
        )
        .unwrap_err();
        assert!(matches!(err, Error::ExternalCallFailure(_)));
    }

    #[test]
    fn test_foreign_rewards_swapped_to_asset0() {
        let mut ledger = ledger_at_tick(0);
        let owner = addr("strategy");
        ledger
            .tokens
            .mint(&addr("reward"), &addr("gov"), U256::from(10_000u64))
            .unwrap();
        ledger
            .rewards
            .notify_reward(&mut ledger.tokens, &addr("gov"), U256::from(10_000u64), 100, 10_000)
            .unwrap();
        ledger.warp(50);

        let credited = claim_rewards(&mut ledger, &owner, &routes()).unwrap();
        // reward trades 2:1 into token0.
        assert_eq!(credited, AmountPair::new(10_000u64, 0u64));
        assert_eq!(ledger.tokens.balance_of(&addr("token0"), &owner), U256::from(10_000u64));
    }

    #[test]
    fn test_native_asset_fee_skips_the_router() {
        use clm_vault_protocols::router::RATE_SCALE;
        use crate::config::StrategyConfig;

        let mut ledger = ledger_at_tick(0);
        ledger
            .router
            .set_rate(&addr("token1"), &addr("token0"), U256::from(2 * RATE_SCALE));
        let owner = addr("strategy");
        fund(&mut ledger, &owner, U256::from(1_000_000u64), U256::from(1_000_000u64));
        let routes = StrategyConfig::default().with_native(addr("token0")).routes();
        let router_token0 = ledger.tokens.balance_of(&addr("token0"), &addr("router"));
        let router_token1 = ledger.tokens.balance_of(&addr("token1"), &addr("router"));

        let charged = charge_fees(
            &mut ledger,
            &context(),
            &routes,
            &owner,
            AmountPair::new(100_000u64, 200_000u64),
            &addr("keeper"),
        )
        .unwrap();

        // 9_500 token0 is kept as is; 19_000 token1 trades 1:2 into 38_000 token0.
        assert_eq!(charged.remainder, AmountPair::new(90_500u64, 181_000u64));
        assert_eq!(charged.native_fee, U256::from(47_500u64));
        assert_eq!(charged.split.call, U256::from(475u64));
        assert_eq!(charged.split.strategist, U256::from(2_375u64));
        assert_eq!(charged.split.treasury, U256::from(44_650u64));

        // Only the token1 leg went through the router.
        assert_eq!(
            ledger.tokens.balance_of(&addr("token0"), &addr("router")),
            router_token0 - U256::from(38_000u64)
        );
        assert_eq!(
            ledger.tokens.balance_of(&addr("token1"), &addr("router")),
            router_token1 + U256::from(19_000u64)
        );
        assert_eq!(
            ledger.tokens.balance_of(&addr("token0"), &owner),
            U256::from(990_500u64)
        );
        assert_eq!(
            ledger.tokens.balance_of(&addr("token0"), &addr("treasury")),
            U256::from(44_650u64)
        );
    }
}
