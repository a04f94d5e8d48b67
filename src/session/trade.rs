//! Stake-distribution dialogue.
//!
//! Reads from the tracker snapshot only; a session never changes tracked
//! state.

use std::io;
use std::str::FromStr;

use rust_decimal::Decimal;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::info;

use crate::arbitrage::{SharedTracker, StakePlan};
use crate::error::OddsError;
use crate::notify::{format, Channel, Notifier};

/// How a trade session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TradeOutcome {
    /// Nothing to trade.
    NoOpportunities,
    /// Operator cancelled or input closed.
    Cancelled,
    /// A stake table was produced.
    Planned {
        /// Selected market.
        market_id: String,
        /// The computed plan.
        plan: StakePlan,
    },
}

/// Run one trade session over the given input and output.
pub async fn run_trade<R, W>(
    tracker: &SharedTracker,
    notifier: &dyn Notifier,
    input: &mut R,
    output: &mut W,
) -> io::Result<TradeOutcome>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let opportunities = tracker.read().await.opportunities();
    let candidates: Vec<_> = opportunities
        .into_iter()
        .filter_map(|state| state.latest.map(|result| (state.market_id, result)))
        .collect();

    if candidates.is_empty() {
        write_out(output, "No arbitrage opportunities available right now.\n").await?;
        return Ok(TradeOutcome::NoOpportunities);
    }

    let mut listing = String::from("\nAvailable arbitrage opportunities:\n");
    for (i, (market_id, result)) in candidates.iter().enumerate() {
        listing.push_str(&format!(
            "  {}. {} | margin {:.2}% | prices {}\n",
            i + 1,
            market_id,
            result.margin_pct,
            format::format_decimals(&result.prices(), None)
        ));
    }
    write_out(output, &listing).await?;

    let selection = format!("Select a market (1-{}, or 'cancel'): ", candidates.len());
    let (market_id, result) = loop {
        let Some(answer) = prompt(input, output, &selection).await? else {
            return Ok(TradeOutcome::Cancelled);
        };
        if is_cancel(&answer) {
            write_out(output, "Trade cancelled.\n").await?;
            return Ok(TradeOutcome::Cancelled);
        }
        match answer.parse::<usize>() {
            Ok(n) if (1..=candidates.len()).contains(&n) => break &candidates[n - 1],
            _ => write_out(output, "Invalid selection, try again.\n").await?,
        }
    };

    let plan = loop {
        let Some(answer) = prompt(input, output, "Enter total stake: ").await? else {
            return Ok(TradeOutcome::Cancelled);
        };
        if is_cancel(&answer) {
            write_out(output, "Trade cancelled.\n").await?;
            return Ok(TradeOutcome::Cancelled);
        }
        let Ok(stake) = Decimal::from_str(&answer) else {
            write_out(output, "Please enter a number.\n").await?;
            continue;
        };
        match result.stake_plan(stake) {
            Ok(plan) => break plan,
            Err(OddsError::InvalidStake { .. }) => {
                write_out(output, "Stake must be greater than zero.\n").await?;
            }
            Err(OddsError::Overflow(_)) => {
                write_out(output, "Stake is too large, try a smaller amount.\n").await?;
            }
            Err(e) => {
                write_out(output, &format!("Cannot compute stake plan: {}\n", e)).await?;
                return Ok(TradeOutcome::Cancelled);
            }
        }
    };

    write_out(output, &format::trade_table(market_id, &plan)).await?;
    notifier.notify(Channel::Primary, format::trade_table_discord(market_id, &plan));
    info!(
        market = %market_id,
        stake = %plan.total_stake,
        profit = %plan.total_profit.round_dp(2),
        "Trade table produced"
    );

    Ok(TradeOutcome::Planned {
        market_id: market_id.clone(),
        plan,
    })
}

fn is_cancel(answer: &str) -> bool {
    answer.eq_ignore_ascii_case("cancel") || answer.eq_ignore_ascii_case("q")
}

/// Print a prompt and read one trimmed line. `None` on end of input.
pub(crate) async fn prompt<R, W>(input: &mut R, output: &mut W, text: &str) -> io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    write_out(output, text).await?;
    let mut line = String::new();
    if input.read_line(&mut line).await? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

pub(crate) async fn write_out<W>(output: &mut W, text: &str) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    output.write_all(text.as_bytes()).await?;
    output.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arbitrage::{compute_arbitrage, OpportunityTracker, TrackerPolicy};
    use crate::market::Outcome;
    use crate::notify::RecordingNotifier;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    async fn tracker_with(markets: &[(&str, Decimal, Decimal)]) -> SharedTracker {
        let tracker = OpportunityTracker::shared(TrackerPolicy::default());
        {
            let mut guard = tracker.write().await;
            for (id, yes, no) in markets {
                let outcomes = vec![Outcome::new("Yes", *yes), Outcome::new("No", *no)];
                guard.record_scan(id, Ok(compute_arbitrage(id, &outcomes).unwrap()));
            }
        }
        tracker
    }

    async fn session(tracker: &SharedTracker, notifier: &RecordingNotifier, input: &str) -> (TradeOutcome, String) {
        let mut reader = input.as_bytes();
        let mut output = Vec::new();
        let outcome = run_trade(tracker, notifier, &mut reader, &mut output)
            .await
            .unwrap();
        (outcome, String::from_utf8(output).unwrap())
    }

    #[tokio::test]
    async fn plans_selected_market() {
        let tracker = tracker_with(&[("fed", dec!(45.2), dec!(50)), ("flat", dec!(50), dec!(52))]).await;
        let notifier = RecordingNotifier::new();

        let (outcome, output) = session(&tracker, &notifier, "1\n1000\n").await;

        let TradeOutcome::Planned { market_id, plan } = outcome else {
            panic!("expected a plan");
        };
        assert_eq!(market_id, "fed");
        assert_eq!(plan.total_profit.round_dp(2), dec!(50.42));
        assert!(output.contains("1. fed | margin 5.04%"));
        assert!(!output.contains("flat"));
        assert!(output.contains("Total profit would be: 50.42"));
        assert_eq!(notifier.on(Channel::Primary).len(), 1);
    }

    #[tokio::test]
    async fn reprompts_on_bad_selection_and_stake() {
        let tracker = tracker_with(&[("fed", dec!(45.2), dec!(50))]).await;
        let notifier = RecordingNotifier::new();

        let (outcome, output) = session(&tracker, &notifier, "7\nabc\n1\nlots\n0\n-5\n100\n").await;

        assert!(matches!(outcome, TradeOutcome::Planned { .. }));
        assert_eq!(output.matches("Invalid selection").count(), 2);
        assert_eq!(output.matches("Please enter a number").count(), 1);
        assert_eq!(output.matches("Stake must be greater than zero").count(), 2);
    }

    #[tokio::test]
    async fn oversized_stake_reprompts() {
        let tracker = tracker_with(&[("fed", dec!(45.2), dec!(50))]).await;
        let notifier = RecordingNotifier::new();
        let input = format!("1\n{}\n1000\n", Decimal::MAX);

        let (outcome, output) = session(&tracker, &notifier, &input).await;

        let TradeOutcome::Planned { plan, .. } = outcome else {
            panic!("expected a plan after the retry");
        };
        assert_eq!(plan.total_stake, dec!(1000));
        assert_eq!(output.matches("Stake is too large").count(), 1);
        assert_eq!(notifier.on(Channel::Primary).len(), 1);
    }

    #[tokio::test]
    async fn cancel_and_eof_abandon_without_notifying() {
        let tracker = tracker_with(&[("fed", dec!(45.2), dec!(50))]).await;
        let notifier = RecordingNotifier::new();

        let (outcome, _) = session(&tracker, &notifier, "cancel\n").await;
        assert_eq!(outcome, TradeOutcome::Cancelled);

        let (outcome, _) = session(&tracker, &notifier, "1\nq\n").await;
        assert_eq!(outcome, TradeOutcome::Cancelled);

        let (outcome, _) = session(&tracker, &notifier, "1\n").await;
        assert_eq!(outcome, TradeOutcome::Cancelled);

        assert!(notifier.messages().is_empty());
    }

    #[tokio::test]
    async fn nothing_to_trade() {
        let tracker = tracker_with(&[("flat", dec!(50), dec!(52))]).await;
        let notifier = RecordingNotifier::new();

        let (outcome, output) = session(&tracker, &notifier, "").await;

        assert_eq!(outcome, TradeOutcome::NoOpportunities);
        assert!(output.contains("No arbitrage opportunities"));
    }

    #[tokio::test]
    async fn session_leaves_tracker_untouched() {
        let tracker = tracker_with(&[("fed", dec!(45.2), dec!(50))]).await;
        let before = tracker.read().await.get("fed").unwrap().margin();

        session(&tracker, &RecordingNotifier::new(), "1\n250\n").await;

        let guard = tracker.read().await;
        assert_eq!(guard.get("fed").unwrap().margin(), before);
        assert_eq!(guard.len(), 1);
    }
}
