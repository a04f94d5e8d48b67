//! Message formatting for console output and Discord.
//!
//! Values are rounded to two decimals here and nowhere else.

use rust_decimal::Decimal;
use time::macros::format_description;
use time::OffsetDateTime;

use crate::arbitrage::{ArbitrageResult, StakePlan};
use crate::scanner::CycleSummary;

/// Discord rejects messages over 2000 characters; keep a buffer.
pub const DISCORD_MAX_LEN: usize = 1900;

/// Render a list of decimals as `[a, b, c]`.
///
/// With `dp` the values are rounded for display, otherwise trailing zeros
/// are dropped.
pub fn format_decimals(values: &[Decimal], dp: Option<u32>) -> String {
    let items: Vec<String> = values
        .iter()
        .map(|v| match dp {
            Some(dp) => format!("{:.*}", dp as usize, v.round_dp(dp)),
            None => v.normalize().to_string(),
        })
        .collect();
    format!("[{}]", items.join(", "))
}

/// UTC timestamp as `YYYY-MM-DD HH:MM:SS`.
pub fn format_timestamp(ts: OffsetDateTime) -> String {
    ts.format(format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second]"
    ))
    .unwrap_or_else(|_| ts.unix_timestamp().to_string())
}

/// Local wall-clock time for operator-facing messages.
pub fn local_clock() -> String {
    chrono::Local::now().format("%H:%M:%S").to_string()
}

/// Alert for a market entering the opportunity state.
pub fn opportunity_alert(label: &str, result: &ArbitrageResult, mention_margin: Decimal) -> String {
    let mut msg = String::new();
    msg.push_str("**ARBITRAGE OPPORTUNITY!**\n");
    push_result_lines(&mut msg, label, result);
    with_mention(msg, result.margin_pct, mention_margin)
}

/// Alert for an open opportunity whose margin moved.
pub fn updated_alert(
    label: &str,
    previous_margin: Decimal,
    result: &ArbitrageResult,
    mention_margin: Decimal,
) -> String {
    let mut msg = String::new();
    msg.push_str("**ARBITRAGE UPDATED**\n");
    msg.push_str(&format!(
        "Margin moved: {:.2}% -> {:.2}%\n",
        previous_margin, result.margin_pct
    ));
    push_result_lines(&mut msg, label, result);
    with_mention(msg, result.margin_pct, mention_margin)
}

/// Alert for an opportunity that disappeared.
pub fn resolved_alert(label: &str, previous_margin: Decimal, result: &ArbitrageResult) -> String {
    format!(
        "**ARBITRAGE CLOSED**\nMarket: {}\nMargin: {:.2}% -> {:.2}%\nPrices: {}\nTime: {}",
        label,
        previous_margin,
        result.margin_pct,
        format_decimals(&result.prices(), None),
        local_clock(),
    )
}

fn push_result_lines(msg: &mut String, label: &str, result: &ArbitrageResult) {
    msg.push_str(&format!("Market: {}\n", label));
    msg.push_str(&format!("Margin: {:.2}%\n", result.margin_pct));
    msg.push_str(&format!("Prices: {}\n", format_decimals(&result.prices(), None)));
    msg.push_str(&format!("Odds: {}\n", format_decimals(&result.odds(), Some(2))));
    msg.push_str(&format!("Time: {}", local_clock()));
}

fn with_mention(msg: String, margin: Decimal, mention_margin: Decimal) -> String {
    if margin > mention_margin {
        format!("@everyone\n\n{}", msg)
    } else {
        msg
    }
}

/// One-message summary of a scan cycle.
pub fn cycle_summary(summary: &CycleSummary) -> String {
    let mut msg = format!("**SCAN SUMMARY** - {}\n", local_clock());
    msg.push_str(&format!(
        "Checked {} markets ({} ok, {} errors)\n",
        summary.scanned, summary.succeeded, summary.errors
    ));

    if summary.opportunities.is_empty() {
        msg.push_str("No arbitrage opportunities found");
    } else {
        msg.push_str(&format!(
            "Found {} opportunities:\n",
            summary.opportunities.len()
        ));
        for line in &summary.opportunities {
            msg.push_str(&format!("  - {}: {:.2}%\n", line.label, line.margin_pct));
        }
    }

    if summary.interrupted {
        msg.push_str("\n(cycle interrupted by shutdown)");
    }

    msg.trim_end().to_string()
}

/// Log-channel line for a failed market scan.
pub fn scan_error(label: &str, error: &str) -> String {
    format!("[{}] scan failed: {}", label, error)
}

/// Stake table for the console.
pub fn trade_table(label: &str, plan: &StakePlan) -> String {
    let mut out = String::new();
    out.push_str(&format!("\nTrading table for: {}\n", label));
    out.push_str("Distribution of the stake among the odds should be as follows:\n\n");
    out.push_str(&format!(
        "{:<15} | {:<12} | {:<8} | {:<10} | {:<10}\n",
        "Outcome Name", "Yes Price", "Odd", "Stake", "Payout"
    ));
    out.push_str(&"-".repeat(70));
    out.push('\n');

    for leg in &plan.legs {
        out.push_str(&format!(
            "{:<15} | {:<12} | {:<8} | {:<10} | {:<10}\n",
            leg.name,
            leg.price.normalize().to_string(),
            format!("{:.2}", leg.odd.round_dp(2)),
            format!("{:.2}", leg.stake.round_dp(2)),
            format!("{:.2}", leg.payout.round_dp(2)),
        ));
    }

    out.push_str(&format!(
        "\nTotal stake: {:.2}\nTotal profit would be: {:.2}\n",
        plan.total_stake.round_dp(2),
        plan.total_profit.round_dp(2)
    ));
    out
}

/// Stake table for Discord (fixed-width code block).
pub fn trade_table_discord(label: &str, plan: &StakePlan) -> String {
    let mut msg = String::new();
    msg.push_str("**TRADING TABLE**\n");
    msg.push_str(&format!("Market: {}\n", label));
    msg.push_str(&format!("Total Stake: {:.2}\n\n", plan.total_stake.round_dp(2)));
    msg.push_str("```\n");
    msg.push_str(&format!(
        "{:<12} | {:<8} | {:<8} | {:<8}\n",
        "Outcome", "Price", "Stake", "Payout"
    ));
    msg.push_str(&"-".repeat(45));
    msg.push('\n');

    for leg in &plan.legs {
        let short_name = if leg.name.chars().count() > 10 {
            format!("{}...", leg.name.chars().take(10).collect::<String>())
        } else {
            leg.name.clone()
        };
        msg.push_str(&format!(
            "{:<12} | {:<8} | {:<8} | {:<8}\n",
            short_name,
            leg.price.normalize().to_string(),
            format!("{:.2}", leg.stake.round_dp(2)),
            format!("{:.2}", leg.payout.round_dp(2)),
        ));
    }

    msg.push_str("```\n");
    msg.push_str(&format!(
        "**Total Profit: {:.2}**",
        plan.total_profit.round_dp(2)
    ));
    msg
}

/// Start-up announcement.
pub fn startup_message(markets: usize, interval_minutes: Decimal) -> String {
    format!(
        "**ARBITRAGE MONITOR STARTED**\nCheck interval: {} minutes\nMonitoring {} markets",
        interval_minutes.normalize(),
        markets
    )
}

/// Shutdown announcement.
pub fn stopped_message(reason: &str) -> String {
    format!("**ARBITRAGE MONITOR STOPPED** ({})", reason)
}

/// Escape Discord markdown and cap the length.
pub fn for_discord_log(message: &str) -> String {
    let escaped = message
        .replace('`', "\\`")
        .replace('*', "\\*")
        .replace('_', "\\_");
    truncate_for_discord(&escaped)
}

/// Cap a message at [`DISCORD_MAX_LEN`] characters.
pub fn truncate_for_discord(message: &str) -> String {
    if message.chars().count() > DISCORD_MAX_LEN {
        let head: String = message.chars().take(DISCORD_MAX_LEN).collect();
        format!("{}... (truncated)", head)
    } else {
        message.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arbitrage::compute_arbitrage;
    use crate::market::Outcome;
    use rust_decimal_macros::dec;

    fn result(prices: &[Decimal]) -> ArbitrageResult {
        let outcomes: Vec<Outcome> = prices
            .iter()
            .enumerate()
            .map(|(i, p)| Outcome::new(format!("Outcome {}", i + 1), *p))
            .collect();
        compute_arbitrage("m", &outcomes).unwrap()
    }

    #[test]
    fn decimals_render_rounded_or_normalized() {
        let values = [dec!(45.200), dec!(50.0), dec!(2.21238938)];
        assert_eq!(format_decimals(&values, None), "[45.2, 50, 2.21238938]");
        assert_eq!(format_decimals(&values, Some(2)), "[45.20, 50.00, 2.21]");
    }

    #[test]
    fn big_margin_alert_mentions_everyone() {
        let big = opportunity_alert("m", &result(&[dec!(40), dec!(50)]), dec!(5));
        assert!(big.starts_with("@everyone"));
        assert!(big.contains("Margin: 11.11%"));

        let small = opportunity_alert("m", &result(&[dec!(45.2), dec!(54)]), dec!(5));
        assert!(small.starts_with("**ARBITRAGE OPPORTUNITY!**"));
    }

    #[test]
    fn trade_table_lists_every_leg_and_profit() {
        let plan = result(&[dec!(45.2), dec!(50)]).stake_plan(dec!(1000)).unwrap();

        let table = trade_table("fed decision", &plan);

        assert!(table.contains("Outcome 1"));
        assert!(table.contains("474.79"));
        assert!(table.contains("525.21"));
        assert!(table.contains("Total profit would be: 50.42"));
    }

    #[test]
    fn discord_table_shortens_long_names() {
        let outcomes = vec![
            Outcome::new("A very long outcome name", dec!(45)),
            Outcome::new("No", dec!(50)),
        ];
        let plan = compute_arbitrage("m", &outcomes)
            .unwrap()
            .stake_plan(dec!(100))
            .unwrap();

        let msg = trade_table_discord("m", &plan);

        assert!(msg.contains("A very lon..."));
        assert!(msg.contains("**Total Profit: 5.26**"));
    }

    #[test]
    fn log_messages_are_escaped_and_truncated() {
        assert_eq!(for_discord_log("a_b*c`d"), "a\\_b\\*c\\`d");

        let long = "x".repeat(DISCORD_MAX_LEN + 50);
        let truncated = for_discord_log(&long);
        assert!(truncated.ends_with("... (truncated)"));
        assert_eq!(truncated.chars().count(), DISCORD_MAX_LEN + "... (truncated)".len());
    }
}
