//! Prediction-market arbitrage monitor entry point.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use tokio::io::BufReader;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info, warn};

use arb_monitor::api::{create_router, AppState};
use arb_monitor::arbitrage::{compute_arbitrage, precondition_warnings, OpportunityTracker};
use arb_monitor::config::Config;
use arb_monitor::error::MonitorError;
use arb_monitor::logging;
use arb_monitor::market::{HtmlPageExtractor, Market, Outcome, PageExtractor};
use arb_monitor::metrics;
use arb_monitor::notify::{self, format, Channel, NoopNotifier, Notifier};
use arb_monitor::scanner::ScanController;
use arb_monitor::session::run_console;
use arb_monitor::utils::{shutdown_signal, wait_for_shutdown};

const RULE: &str = "======================================================================";
const THIN_RULE: &str = "----------------------------------------------------------------------";

/// Prediction-market arbitrage monitor.
#[derive(Parser, Debug)]
#[command(name = "arb-monitor")]
#[command(about = "Monitors prediction-market pages for arbitrage and alerts on Discord")]
#[command(version)]
struct Args {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the monitor loop with console and status API (default).
    Run {
        /// Minutes between scan cycles (overrides CHECK_INTERVAL_MINUTES).
        #[arg(short, long)]
        interval: Option<Decimal>,

        /// HTTP server port for health/status/metrics (overrides PORT).
        #[arg(short, long)]
        port: Option<u16>,

        /// Do not read commands from stdin.
        #[arg(long)]
        no_console: bool,
    },

    /// Run a single scan cycle and print the results.
    Scan {
        /// Send alerts and the summary to the configured webhooks.
        #[arg(long)]
        notify: bool,
    },

    /// Compute margin and stake distribution for prices given by hand.
    Calc {
        /// Yes prices on a 0-100 scale, one per outcome.
        #[arg(required = true, num_args = 1..)]
        prices: Vec<Decimal>,

        /// Total stake to distribute.
        #[arg(short, long)]
        stake: Option<Decimal>,
    },

    /// Extract outcomes from one page (diagnostic).
    Extract {
        /// Event page URL.
        url: String,
    },

    /// Check configuration validity.
    CheckConfig,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(async_main(args));

    // A pending stdin read holds a blocking thread until the next newline.
    runtime.shutdown_timeout(Duration::from_millis(500));
    result
}

async fn async_main(args: Args) -> anyhow::Result<()> {
    let loaded = Config::load();
    let log_config = loaded.as_ref().map(Config::clone).unwrap_or_default();
    logging::init_tracing(&log_config, args.verbose);

    match args.command {
        Some(Command::CheckConfig) => cmd_check_config(loaded),
        Some(Command::Calc { prices, stake }) => cmd_calc(&prices, stake),
        Some(Command::Extract { url }) => cmd_extract(loaded?, &url).await,
        Some(Command::Scan { notify }) => cmd_scan(validated(loaded)?, notify).await,
        Some(Command::Run {
            interval,
            port,
            no_console,
        }) => {
            let mut config = loaded?;
            if let Some(interval) = interval {
                config.check_interval_minutes = interval;
            }
            if let Some(port) = port {
                config.port = port;
            }
            cmd_run(validated(Ok(config))?, !no_console).await
        }
        None => cmd_run(validated(loaded)?, true).await,
    }
}

fn validated(loaded: Result<Config, envy::Error>) -> anyhow::Result<Config> {
    let config = loaded
        .map_err(MonitorError::from)
        .and_then(Config::validated)
        .map_err(|e| {
            error!("{}", e);
            e
        })?;
    Ok(config)
}

/// Check configuration validity.
fn cmd_check_config(loaded: Result<Config, envy::Error>) -> anyhow::Result<()> {
    println!("{}", RULE);
    println!("ARBITRAGE MONITOR - CONFIGURATION CHECK");
    println!("{}", RULE);

    print!("Loading configuration... ");
    let config = match loaded {
        Ok(c) => {
            println!("OK");
            c
        }
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration load failed"));
        }
    };

    print!("Validating configuration... ");
    match config.validate() {
        Ok(()) => println!("OK"),
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration validation failed"));
        }
    }

    println!("{}", THIN_RULE);
    println!("Configuration Summary:");
    println!("  Markets: {}", config.market_urls.len());
    for market in ScanController::markets_from_config(&config) {
        println!("    - {} ({})", market.id, market.url);
    }
    println!(
        "  Check Interval: {} minutes",
        config.check_interval_minutes.normalize()
    );
    println!("  Opportunity Threshold: {}%", config.opportunity_threshold);
    println!("  Margin Epsilon: {} pp", config.margin_epsilon);
    println!("  Mention Above: {}%", config.alert_mention_margin);
    println!(
        "  Discord Alerts: {}",
        if config.discord_webhook_url.is_some() { "Enabled" } else { "Disabled" }
    );
    println!(
        "  Discord Log Channel: {}",
        if config.discord_log_webhook_url.is_some() { "Enabled" } else { "Disabled" }
    );
    println!("  Extraction Timeout: {}s", config.extraction_timeout_secs);
    println!("  Status API Port: {}", config.port);
    println!("{}", RULE);
    println!("CONFIGURATION CHECK PASSED");
    println!("{}", RULE);

    Ok(())
}

/// Offline stake calculator.
fn cmd_calc(prices: &[Decimal], stake: Option<Decimal>) -> anyhow::Result<()> {
    let outcomes: Vec<Outcome> = prices
        .iter()
        .enumerate()
        .map(|(i, price)| Outcome::new(format!("Outcome {}", i + 1), *price))
        .collect();

    for warning in precondition_warnings(&outcomes, Config::default().binary_sum_floor) {
        warn!("{}", warning);
    }

    let result = compute_arbitrage("manual", &outcomes)?;

    println!("{}", RULE);
    println!("ARBITRAGE MONITOR - CALCULATOR");
    println!("{}", RULE);
    println!("  Prices: {}", format::format_decimals(&result.prices(), None));
    println!("  Odds: {}", format::format_decimals(&result.odds(), Some(2)));
    println!("  Arbitrage Constant: {:.4}", result.arbitrage_constant);
    println!("  Margin: {:.2}%", result.margin_pct);
    println!(
        "  Opportunity: {}",
        if result.is_opportunity(Decimal::ZERO) { "YES" } else { "NO" }
    );

    if let Some(stake) = stake {
        let plan = result.stake_plan(stake)?;
        println!("{}", format::trade_table("manual", &plan));
    }

    println!("{}", RULE);
    Ok(())
}

/// Extract one page and print what was found.
async fn cmd_extract(config: Config, url: &str) -> anyhow::Result<()> {
    println!("{}", RULE);
    println!("ARBITRAGE MONITOR - PAGE EXTRACTION");
    println!("{}", RULE);

    let market = Market::from_url(url);
    println!("  Market: {} ({})", market.id, market.label);

    let extractor = HtmlPageExtractor::new(&config)?;
    let outcomes = match tokio::time::timeout(config.extraction_timeout(), extractor.extract(&market))
        .await
    {
        Ok(Ok(outcomes)) => outcomes,
        Ok(Err(e)) => {
            println!("EXTRACTION FAILED");
            println!("  Error: {}", e);
            println!("{}", RULE);
            return Err(e.into());
        }
        Err(_) => {
            println!("EXTRACTION TIMED OUT after {}s", config.extraction_timeout_secs);
            println!("{}", RULE);
            return Err(anyhow::anyhow!("extraction timed out"));
        }
    };

    println!("{}", THIN_RULE);
    for outcome in &outcomes {
        println!("  {:<40} {}", outcome.name, outcome.price.normalize());
    }
    println!("{}", THIN_RULE);

    match compute_arbitrage(&market.id, &outcomes) {
        Ok(result) => println!("  Margin: {:.2}%", result.margin_pct),
        Err(e) => println!("  Margin: unavailable ({})", e),
    }
    println!("{}", RULE);

    Ok(())
}

/// Run one cycle and print the report.
async fn cmd_scan(config: Config, send_notifications: bool) -> anyhow::Result<()> {
    let config = Arc::new(config);
    let (notifier, worker) = if send_notifications {
        notify::notifier_from_config(&config)?
    } else {
        let noop: Arc<dyn Notifier> = Arc::new(NoopNotifier);
        (noop, None)
    };

    let tracker = OpportunityTracker::shared(config.tracker_policy());
    let mut controller = ScanController::new(
        config.clone(),
        ScanController::markets_from_config(&config),
        Arc::new(HtmlPageExtractor::new(&config)?),
        notifier,
        tracker,
    );

    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    let report = controller.run_cycle(&shutdown_rx).await;

    println!("{}", RULE);
    println!("ARBITRAGE MONITOR - SCAN");
    println!("{}", RULE);
    for market in controller.markets() {
        let margin = compute_arbitrage(&market.id, &market.outcomes)
            .map(|r| format!("{:.2}%", r.margin_pct))
            .unwrap_or_else(|_| "-".to_string());
        println!("  {:<40} {}", market.label, margin);
    }
    for failure in &report.failures {
        println!("  FAILED {}: {}", failure.market_id, failure.error);
    }
    println!("{}", THIN_RULE);
    println!("{}", format::cycle_summary(&report.summary));
    println!("{}", RULE);

    drop(controller);
    if let Some(worker) = worker {
        notify::drain(worker, config.notify_timeout() + Duration::from_secs(1)).await;
    }

    Ok(())
}

/// Run the monitor until shutdown.
async fn cmd_run(config: Config, console: bool) -> anyhow::Result<()> {
    let prometheus = match metrics::install_prometheus() {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!(error = %e, "Failed to install metrics recorder");
            None
        }
    };

    let config = Arc::new(config);
    info!("Configuration loaded successfully");
    info!("Monitoring {} markets", config.market_urls.len());
    info!(
        "Check interval: {} minutes",
        config.check_interval_minutes.normalize()
    );
    if !config.notifications_enabled() {
        warn!("DISCORD_WEBHOOK_URL not set, alerts will only be logged");
    }

    let tracker = OpportunityTracker::shared(config.tracker_policy());
    let extractor: Arc<dyn PageExtractor> = Arc::new(HtmlPageExtractor::new(&config)?);
    let (notifier, notify_worker) = notify::notifier_from_config(&config)?;
    let markets = ScanController::markets_from_config(&config);

    let mut controller = ScanController::new(
        config.clone(),
        markets,
        extractor,
        notifier.clone(),
        tracker.clone(),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let shutdown_tx = Arc::new(shutdown_tx);

    // Status API
    let mut app_state = AppState::new(tracker.clone(), controller.last_cycle());
    if let Some(handle) = prometheus {
        app_state = app_state.with_prometheus(handle);
    }
    let app = create_router(app_state);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", addr);

    let api_shutdown = shutdown_rx.clone();
    let api_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(wait_for_shutdown(api_shutdown))
            .await
        {
            error!("HTTP server error: {}", e);
        }
    });

    // Ctrl-C / SIGTERM
    let signal_tx = shutdown_tx.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        signal_tx.send_replace(true);
    });

    // Operator console
    let console_handle = console.then(|| {
        let console_tx = shutdown_tx.clone();
        let console_tracker = tracker.clone();
        let console_notifier = notifier.clone();
        tokio::spawn(async move {
            let mut stdin = BufReader::new(tokio::io::stdin());
            let mut stdout = tokio::io::stdout();
            if let Err(e) = run_console(
                console_tracker,
                console_notifier.as_ref(),
                &console_tx,
                &mut stdin,
                &mut stdout,
            )
            .await
            {
                warn!(error = %e, "Console stopped");
            }
        })
    });

    notifier.notify(
        Channel::Primary,
        format::startup_message(config.market_urls.len(), config.check_interval_minutes),
    );

    controller.run(shutdown_rx).await;

    info!("Shutting down...");
    shutdown_tx.send_replace(true);
    notifier.notify(Channel::Primary, format::stopped_message("shutdown requested"));

    if let Some(handle) = console_handle {
        handle.abort();
    }
    if tokio::time::timeout(Duration::from_secs(5), api_handle).await.is_err() {
        warn!("HTTP server did not stop in time");
    }

    drop(controller);
    drop(notifier);
    if let Some(worker) = notify_worker {
        notify::drain(worker, config.notify_timeout() + Duration::from_secs(1)).await;
    }

    info!("Monitor stopped");
    Ok(())
}
