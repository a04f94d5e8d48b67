//! Per-market arbitrage check.

use std::collections::HashSet;

use rust_decimal::Decimal;
use tracing::{debug, info, instrument, warn};

use super::calculator::{compute_arbitrage, ArbitrageResult};
use crate::config::Config;
use crate::error::OddsError;
use crate::market::{Market, Outcome};
use crate::notify::format::{format_decimals, format_timestamp};

/// Run the odds engine over one market's extracted outcomes.
///
/// Precondition problems are logged, never acted on: the outcome set being
/// complete and mutually exclusive is the operator's responsibility.
#[instrument(skip(outcomes, config), fields(market = %market.id))]
pub fn check_market(
    market: &Market,
    outcomes: &[Outcome],
    config: &Config,
) -> Result<ArbitrageResult, OddsError> {
    for warning in precondition_warnings(outcomes, config.binary_sum_floor) {
        warn!(market = %market.id, "{}", warning);
    }

    let result = compute_arbitrage(&market.id, outcomes)?;

    info!(
        "[{}] margin={:.2}% prices={} odds={} at {}",
        market.label,
        result.margin_pct,
        format_decimals(&result.prices(), None),
        format_decimals(&result.odds(), Some(2)),
        format_timestamp(result.computed_at),
    );

    if result.is_opportunity(config.opportunity_threshold) {
        info!(
            margin_pct = %result.margin_pct.round_dp(4),
            arbitrage_constant = %result.arbitrage_constant,
            outcomes = result.legs.len(),
            "Arbitrage opportunity detected"
        );
    } else {
        debug!(
            margin_pct = %result.margin_pct.round_dp(4),
            threshold = %config.opportunity_threshold,
            "No arbitrage opportunity"
        );
    }

    Ok(result)
}

/// Warnings about the completeness/exclusivity precondition.
///
/// Flags two-outcome markets whose prices sum below `binary_sum_floor`
/// (often a missing or mis-scraped leg) and duplicate outcome names.
pub fn precondition_warnings(outcomes: &[Outcome], binary_sum_floor: Decimal) -> Vec<String> {
    let mut warnings = Vec::new();

    if outcomes.len() == 2 {
        let sum: Decimal = outcomes.iter().map(|o| o.price).sum();
        if sum < binary_sum_floor {
            warnings.push(format!(
                "binary market prices sum to {} (below {}); check that the outcomes are complete",
                sum, binary_sum_floor
            ));
        }
    }

    let mut seen = HashSet::new();
    for outcome in outcomes {
        if !seen.insert(outcome.name.as_str()) {
            warnings.push(format!("duplicate outcome name '{}'", outcome.name));
        }
    }

    warnings
}
