//! Operator console loop.

use std::io;

use tokio::io::{AsyncBufRead, AsyncWrite};
use tokio::sync::watch;
use tracing::{info, warn};

use super::trade::{prompt, run_trade, write_out, TradeOutcome};
use crate::arbitrage::SharedTracker;
use crate::notify::{format, Notifier};

const HELP: &str = "\
Commands:
  trade, t          calculate a stake distribution for an open opportunity
  markets, status   show every monitored market
  help              show this help
  quit, exit, stop  stop monitoring
";

/// A parsed console command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Start a trade session.
    Trade,
    /// List tracked markets.
    Markets,
    /// Print help.
    Help,
    /// Stop the monitor.
    Quit,
    /// Blank line.
    Empty,
    /// Anything else.
    Unknown(String),
}

impl Command {
    /// Parse one input line.
    pub fn parse(line: &str) -> Self {
        match line.trim().to_lowercase().as_str() {
            "" => Command::Empty,
            "trade" | "t" => Command::Trade,
            "markets" | "status" => Command::Markets,
            "help" | "h" | "?" => Command::Help,
            "quit" | "exit" | "stop" => Command::Quit,
            other => Command::Unknown(other.to_string()),
        }
    }
}

/// Run the console until `quit` or end of input.
///
/// `quit` triggers shutdown; end of input only stops the console so a
/// detached monitor keeps scanning.
pub async fn run_console<R, W>(
    tracker: SharedTracker,
    notifier: &dyn Notifier,
    shutdown: &watch::Sender<bool>,
    input: &mut R,
    output: &mut W,
) -> io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    write_out(output, "Type 'help' for commands.\n").await?;

    loop {
        let Some(line) = prompt(input, output, "> ").await? else {
            info!("Console input closed");
            return Ok(());
        };

        match Command::parse(&line) {
            Command::Empty => {}
            Command::Trade => match run_trade(&tracker, notifier, input, output).await? {
                TradeOutcome::Planned { market_id, .. } => {
                    info!(market = %market_id, "Trade session complete");
                }
                TradeOutcome::Cancelled | TradeOutcome::NoOpportunities => {}
            },
            Command::Markets => {
                let listing = markets_listing(&tracker).await;
                write_out(output, &listing).await?;
            }
            Command::Help => write_out(output, HELP).await?,
            Command::Quit => {
                warn!("Shutdown requested from console");
                shutdown.send_replace(true);
                write_out(output, "Stopping monitor...\n").await?;
                return Ok(());
            }
            Command::Unknown(other) => {
                write_out(
                    output,
                    &format!("Unknown command '{}'. Type 'help' for commands.\n", other),
                )
                .await?;
            }
        }
    }
}

/// Render every tracked market with status and margin.
pub async fn markets_listing(tracker: &SharedTracker) -> String {
    let states = tracker.read().await.snapshot();
    if states.is_empty() {
        return "No markets scanned yet.\n".to_string();
    }

    let mut out = format!(
        "\n{:<40} | {:<15} | {:<9} | {}\n",
        "Market", "Status", "Margin", "Prices"
    );
    out.push_str(&"-".repeat(80));
    out.push('\n');

    for state in states {
        let margin = state
            .margin()
            .map(|m| format!("{:.2}%", m))
            .unwrap_or_else(|| "-".to_string());
        let prices = state
            .latest
            .as_ref()
            .map(|r| format::format_decimals(&r.prices(), None))
            .unwrap_or_else(|| "-".to_string());
        out.push_str(&format!(
            "{:<40} | {:<15} | {:<9} | {}",
            state.market_id,
            state.status.to_string(),
            margin,
            prices
        ));
        if let Some(err) = &state.last_error {
            out.push_str(&format!(
                "  (last error: {}, {} failed)",
                err, state.consecutive_failures
            ));
        }
        out.push('\n');
    }

    out
}
