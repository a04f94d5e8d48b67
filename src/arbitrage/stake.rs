//! Stake distribution across the outcomes of an arbitrage.

use rust_decimal::Decimal;
use serde::Serialize;

use super::calculator::{price_to_odd, OddsLeg};
use crate::error::OddsError;

/// Stake allocated to one outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StakeLeg {
    /// Outcome name.
    pub name: String,
    /// Yes price (0-100).
    pub price: Decimal,
    /// Decimal odd.
    pub odd: Decimal,
    /// Amount to stake on this outcome.
    pub stake: Decimal,
    /// Payout if this outcome resolves true (stake x odd).
    pub payout: Decimal,
}

/// Stake allocation yielding the same payout whichever outcome wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StakePlan {
    /// Total amount staked across all outcomes.
    pub total_stake: Decimal,
    /// Per-outcome allocation in leg order.
    pub legs: Vec<StakeLeg>,
    /// Guaranteed payout (total stake / arbitrage constant).
    pub payout: Decimal,
    /// Payout minus total stake.
    pub total_profit: Decimal,
}

/// Distribute `total_stake` proportionally to each outcome's inverse odd.
///
/// `stake_i = total * (1 / odd_i) / C` where `C` is the arbitrage constant,
/// so every leg pays `total / C`. Profit is positive exactly when the
/// market's margin is positive. A stake too large to distribute fails with
/// [`OddsError::Overflow`].
pub fn compute_stake_plan(legs: &[OddsLeg], total_stake: Decimal) -> Result<StakePlan, OddsError> {
    if total_stake <= Decimal::ZERO {
        return Err(OddsError::InvalidStake { stake: total_stake });
    }
    if legs.is_empty() {
        return Err(OddsError::EmptyMarket);
    }

    for leg in legs {
        price_to_odd(leg.price)?;
    }

    let arbitrage_constant: Decimal = legs.iter().map(OddsLeg::inverse_odd).sum();
    let payout = total_stake
        .checked_div(arbitrage_constant)
        .ok_or(OddsError::Overflow("payout"))?;

    let stake_legs = legs
        .iter()
        .map(|leg| {
            let stake = total_stake
                .checked_mul(leg.inverse_odd())
                .and_then(|share| share.checked_div(arbitrage_constant))
                .ok_or(OddsError::Overflow("stake"))?;
            let payout = stake
                .checked_mul(leg.odd)
                .ok_or(OddsError::Overflow("payout"))?;
            Ok(StakeLeg {
                name: leg.name.clone(),
                price: leg.price,
                odd: leg.odd,
                stake,
                payout,
            })
        })
        .collect::<Result<Vec<_>, OddsError>>()?;

    Ok(StakePlan {
        total_stake,
        legs: stake_legs,
        payout,
        total_profit: payout - total_stake,
    })
}
