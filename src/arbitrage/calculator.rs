//! Odds and margin calculations for arbitrage detection.
//!
//! Prices are on a 0-100 scale. The decimal odd of an outcome is
//! `100 / price`; a market is an arbitrage when the sum of inverse odds
//! (the arbitrage constant) is below one.

use rust_decimal::Decimal;
use serde::Serialize;
use time::OffsetDateTime;

use super::stake::{compute_stake_plan, StakePlan};
use crate::error::OddsError;
use crate::market::Outcome;

/// One outcome with its derived odd.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OddsLeg {
    /// Outcome name.
    pub name: String,
    /// Yes price (0-100).
    pub price: Decimal,
    /// Decimal odd (100 / price).
    pub odd: Decimal,
}

impl OddsLeg {
    /// Inverse odd, taken directly as `price / 100` so it carries no
    /// division error.
    pub fn inverse_odd(&self) -> Decimal {
        self.price / Decimal::ONE_HUNDRED
    }
}

/// Result of one market's arbitrage computation.
#[derive(Debug, Clone)]
pub struct ArbitrageResult {
    /// Market the prices came from.
    pub market_id: String,
    /// Outcomes in extraction order.
    pub legs: Vec<OddsLeg>,
    /// Sum of inverse odds.
    pub arbitrage_constant: Decimal,
    /// Guaranteed return in percent ((100 / constant) - 100).
    pub margin_pct: Decimal,
    /// When the result was computed.
    pub computed_at: OffsetDateTime,
}

impl ArbitrageResult {
    /// Whether this result beats the given margin threshold.
    pub fn is_opportunity(&self, threshold: Decimal) -> bool {
        is_opportunity(self.margin_pct, threshold)
    }

    /// Yes prices in leg order.
    pub fn prices(&self) -> Vec<Decimal> {
        self.legs.iter().map(|leg| leg.price).collect()
    }

    /// Odds in leg order.
    pub fn odds(&self) -> Vec<Decimal> {
        self.legs.iter().map(|leg| leg.odd).collect()
    }

    /// Sum of Yes prices (equals 100 x the arbitrage constant).
    pub fn price_sum(&self) -> Decimal {
        self.legs.iter().map(|leg| leg.price).sum()
    }

    /// Distribute a total stake across this result's outcomes.
    pub fn stake_plan(&self, total_stake: Decimal) -> Result<StakePlan, OddsError> {
        compute_stake_plan(&self.legs, total_stake)
    }
}

/// Convert a Yes price (0-100) to a decimal odd.
pub fn price_to_odd(price: Decimal) -> Result<Decimal, OddsError> {
    if price <= Decimal::ZERO || price > Decimal::ONE_HUNDRED {
        return Err(OddsError::InvalidPrice { price });
    }
    Decimal::ONE_HUNDRED
        .checked_div(price)
        .ok_or(OddsError::InvalidPrice { price })
}

/// Convert a decimal odd back to its implied Yes price.
///
/// Zero and odds too small to invert yield zero.
pub fn implied_price(odd: Decimal) -> Decimal {
    Decimal::ONE_HUNDRED.checked_div(odd).unwrap_or_default()
}

/// Compute odds, arbitrage constant and margin for a market's outcomes.
///
/// Any invalid price fails the whole market.
pub fn compute_arbitrage(
    market_id: &str,
    outcomes: &[Outcome],
) -> Result<ArbitrageResult, OddsError> {
    if outcomes.is_empty() {
        return Err(OddsError::EmptyMarket);
    }

    let legs = outcomes
        .iter()
        .map(|outcome| {
            Ok(OddsLeg {
                name: outcome.name.clone(),
                price: outcome.price,
                odd: price_to_odd(outcome.price)?,
            })
        })
        .collect::<Result<Vec<_>, OddsError>>()?;

    let arbitrage_constant: Decimal = legs.iter().map(OddsLeg::inverse_odd).sum();
    let margin_pct = margin_from_constant(arbitrage_constant)?;

    Ok(ArbitrageResult {
        market_id: market_id.to_string(),
        legs,
        arbitrage_constant,
        margin_pct,
        computed_at: OffsetDateTime::now_utc(),
    })
}

/// Margin in percent for an arbitrage constant.
pub fn margin_from_constant(arbitrage_constant: Decimal) -> Result<Decimal, OddsError> {
    Decimal::ONE_HUNDRED
        .checked_div(arbitrage_constant)
        .map(|ratio| ratio - Decimal::ONE_HUNDRED)
        .ok_or(OddsError::Overflow("margin"))
}

/// Whether a margin is a guaranteed-profit opportunity.
///
/// A margin equal to the threshold is not an opportunity.
pub fn is_opportunity(margin_pct: Decimal, threshold: Decimal) -> bool {
    margin_pct > threshold
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn outcomes(prices: &[Decimal]) -> Vec<Outcome> {
        prices
            .iter()
            .enumerate()
            .map(|(i, p)| Outcome::new(format!("Outcome {}", i + 1), *p))
            .collect()
    }

    #[test]
    fn price_to_odd_boundaries() {
        assert_eq!(price_to_odd(dec!(100)).unwrap(), dec!(1));
        assert_eq!(price_to_odd(dec!(50)).unwrap(), dec!(2));
        assert_eq!(
            price_to_odd(dec!(0)),
            Err(OddsError::InvalidPrice { price: dec!(0) })
        );
        assert!(price_to_odd(dec!(-1)).is_err());
        assert!(price_to_odd(dec!(100.01)).is_err());
    }

    #[test]
    fn odd_round_trips_to_price() {
        for price in [dec!(0.1), dec!(3.3), dec!(45.2), dec!(66.7), dec!(99.9)] {
            let odd = price_to_odd(price).unwrap();
            let back = implied_price(odd);
            assert!((back - price).abs() < dec!(0.0000000001), "{price} -> {back}");
        }
    }

    #[test]
    fn detects_opportunity_when_prices_sum_below_100() {
        let result = compute_arbitrage("m", &outcomes(&[dec!(45.2), dec!(50.0)])).unwrap();

        assert_eq!(result.arbitrage_constant, dec!(0.952));
        assert!(result.margin_pct > dec!(5.04) && result.margin_pct < dec!(5.05));
        assert!(result.is_opportunity(Decimal::ZERO));
    }

    #[test]
    fn no_opportunity_when_prices_sum_above_100() {
        let result = compute_arbitrage("m", &outcomes(&[dec!(45.2), dec!(56.8)])).unwrap();

        assert_eq!(result.arbitrage_constant, dec!(1.02));
        assert!(result.margin_pct < dec!(-1.96) && result.margin_pct > dec!(-1.97));
        assert!(!result.is_opportunity(Decimal::ZERO));

        let odds = result.odds();
        assert_eq!(odds[0].round_dp(4), dec!(2.2124));
        assert_eq!(odds[1].round_dp(4), dec!(1.7606));
    }

    #[test]
    fn exact_break_even_is_not_an_opportunity() {
        let result = compute_arbitrage("m", &outcomes(&[dec!(50), dec!(50)])).unwrap();
        assert_eq!(result.margin_pct, Decimal::ZERO);
        assert!(!is_opportunity(result.margin_pct, Decimal::ZERO));

        let thirds = compute_arbitrage("m", &outcomes(&[dec!(33.3), dec!(33.3), dec!(33.4)])).unwrap();
        assert_eq!(thirds.margin_pct, Decimal::ZERO);
    }

    #[test]
    fn sign_of_margin_follows_constant() {
        let cases = [
            (vec![dec!(10), dec!(20), dec!(30)], true),
            (vec![dec!(99.99)], true),
            (vec![dec!(100)], false),
            (vec![dec!(60), dec!(40.01)], false),
            (vec![dec!(1), dec!(1), dec!(1), dec!(1), dec!(95.99)], true),
        ];

        for (prices, expect_opportunity) in cases {
            let result = compute_arbitrage("m", &outcomes(&prices)).unwrap();
            assert_eq!(result.arbitrage_constant < Decimal::ONE, expect_opportunity);
            assert_eq!(result.margin_pct > Decimal::ZERO, expect_opportunity);
            assert_eq!(result.is_opportunity(Decimal::ZERO), expect_opportunity);
        }
    }

    #[test]
    fn one_bad_price_fails_the_market() {
        let result = compute_arbitrage("m", &outcomes(&[dec!(45), dec!(0), dec!(20)]));
        assert_eq!(result.unwrap_err(), OddsError::InvalidPrice { price: dec!(0) });
    }

    #[test]
    fn tiny_prices_are_rejected_instead_of_overflowing() {
        let tiny = Decimal::new(1, 28);
        assert_eq!(price_to_odd(tiny), Err(OddsError::InvalidPrice { price: tiny }));

        // 100 / 1e-26 still fits, but the margin over its 1e-28 constant does not.
        let result = compute_arbitrage("m", &outcomes(&[Decimal::new(1, 26)]));
        assert_eq!(result.unwrap_err(), OddsError::Overflow("margin"));

        assert_eq!(implied_price(Decimal::new(1, 28)), Decimal::ZERO);
        assert_eq!(implied_price(Decimal::ZERO), Decimal::ZERO);
    }

    #[test]
    fn empty_market_is_rejected() {
        assert_eq!(
            compute_arbitrage("m", &[]).unwrap_err(),
            OddsError::EmptyMarket
        );
    }

    #[test]
    fn threshold_is_exclusive() {
        assert!(is_opportunity(dec!(0.5), dec!(0.25)));
        assert!(!is_opportunity(dec!(0.25), dec!(0.25)));
        assert!(!is_opportunity(dec!(-1), Decimal::ZERO));
    }
}
