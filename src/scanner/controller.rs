//! Scan cycle controller.
//!
//! One cycle extracts every configured market in order, runs the odds engine,
//! records the result in the tracker and notifies on transitions. A failing
//! market is logged and skipped; it never aborts the cycle.

use std::sync::Arc;
use std::time::Instant;

use time::OffsetDateTime;
use tokio::sync::{watch, RwLock};
use tracing::{debug, info, instrument, warn};

use super::summary::{CycleReport, CycleSummary, LastCycle, OpportunityLine, ScanFailure};
use crate::arbitrage::{check_market, ArbitrageResult, SharedTracker, TrackerEvent};
use crate::config::Config;
use crate::error::{ExtractionError, ScanError};
use crate::market::{Market, PageExtractor};
use crate::metrics;
use crate::notify::{format, Channel, Notifier};

/// Drives scan cycles over a fixed market list.
pub struct ScanController {
    config: Arc<Config>,
    markets: Vec<Market>,
    extractor: Arc<dyn PageExtractor>,
    notifier: Arc<dyn Notifier>,
    tracker: SharedTracker,
    last_cycle: LastCycle,
}

impl ScanController {
    /// Create a controller. The market list is fixed for its lifetime.
    pub fn new(
        config: Arc<Config>,
        markets: Vec<Market>,
        extractor: Arc<dyn PageExtractor>,
        notifier: Arc<dyn Notifier>,
        tracker: SharedTracker,
    ) -> Self {
        Self {
            config,
            markets,
            extractor,
            notifier,
            tracker,
            last_cycle: Arc::new(RwLock::new(None)),
        }
    }

    /// Build the market list from the configured URLs.
    pub fn markets_from_config(config: &Config) -> Vec<Market> {
        config.market_urls.iter().map(Market::from_url).collect()
    }

    /// Monitored markets with their latest extracted outcomes.
    pub fn markets(&self) -> &[Market] {
        &self.markets
    }

    /// Shared handle to the most recent cycle summary.
    pub fn last_cycle(&self) -> LastCycle {
        self.last_cycle.clone()
    }

    /// Shared handle to the tracker.
    pub fn tracker(&self) -> SharedTracker {
        self.tracker.clone()
    }

    /// Run one pass over every market.
    ///
    /// Shutdown is checked before each market; an in-flight extraction is
    /// bounded by the extraction timeout.
    pub async fn run_cycle(&mut self, shutdown: &watch::Receiver<bool>) -> CycleReport {
        let _timer = metrics::timer_cycle();
        let started = Instant::now();
        let threshold = self.config.opportunity_threshold;

        let mut succeeded = 0;
        let mut interrupted = false;
        let mut opportunities = Vec::new();
        let mut events = Vec::new();
        let mut failures = Vec::new();

        info!(markets = self.markets.len(), "Starting scan cycle");

        for market in self.markets.iter_mut() {
            if *shutdown.borrow() {
                info!("Shutdown requested, stopping cycle early");
                interrupted = true;
                break;
            }

            let scan = scan_market(self.extractor.as_ref(), &self.config, market).await;
            metrics::inc_markets_scanned();

            let event = {
                let mut tracker = self.tracker.write().await;
                match &scan {
                    Ok(result) => tracker.record_scan(&market.id, Ok(result.clone())),
                    Err(err) => tracker.record_scan(&market.id, Err(err)),
                }
            };

            match scan {
                Ok(result) => {
                    succeeded += 1;
                    if result.is_opportunity(threshold) {
                        opportunities.push(OpportunityLine {
                            market_id: market.id.clone(),
                            label: market.label.clone(),
                            margin_pct: result.margin_pct,
                        });
                    }
                }
                Err(err) => {
                    warn!(market = %market.id, error = %err, "Market scan failed");
                    metrics::inc_scan_failures(failure_kind(&err));
                    self.notifier
                        .notify(Channel::Log, format::scan_error(&market.label, &err.to_string()));
                    failures.push(ScanFailure {
                        market_id: market.id.clone(),
                        error: err.to_string(),
                    });
                }
            }

            if let Some(event) = event {
                events.push(event);
            }
        }

        let summary = CycleSummary {
            scanned: succeeded + failures.len(),
            succeeded,
            opportunities,
            errors: failures.len(),
            interrupted,
            duration_ms: started.elapsed().as_millis() as u64,
            finished_at: OffsetDateTime::now_utc(),
        };

        info!(
            scanned = summary.scanned,
            succeeded = summary.succeeded,
            errors = summary.errors,
            opportunities = summary.opportunities.len(),
            duration_ms = summary.duration_ms,
            interrupted = summary.interrupted,
            "Scan cycle complete"
        );
        self.notifier
            .notify(Channel::Log, format::cycle_summary(&summary));

        for event in &events {
            self.dispatch(event);
        }

        metrics::inc_scan_cycles();
        metrics::set_open_opportunities(self.tracker.read().await.opportunities().len());
        *self.last_cycle.write().await = Some(summary.clone());

        CycleReport {
            summary,
            events,
            failures,
        }
    }

    /// Run cycles until shutdown.
    ///
    /// The interval is measured from the end of one cycle to the start of the
    /// next, so cycles never overlap.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) {
        let interval = self.config.check_interval();
        info!(
            markets = self.markets.len(),
            interval_secs = interval.as_secs(),
            "Scan loop started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            let report = self.run_cycle(&shutdown).await;
            if report.summary.interrupted {
                break;
            }

            info!(
                "Next check in {} minutes",
                self.config.check_interval_minutes.normalize()
            );

            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        debug!("Shutdown sender dropped");
                        break;
                    }
                }
            }
        }

        info!("Scan loop stopped");
    }

    fn dispatch(&self, event: &TrackerEvent) {
        let label = self
            .markets
            .iter()
            .find(|m| m.id == event.market_id())
            .map(|m| m.label.as_str())
            .unwrap_or_else(|| event.market_id());
        let mention_margin = self.config.alert_mention_margin;

        let message = match event {
            TrackerEvent::NewOpportunity { result } => {
                metrics::inc_opportunities_detected();
                format::opportunity_alert(label, result, mention_margin)
            }
            TrackerEvent::UpdatedOpportunity {
                previous_margin,
                result,
            } => format::updated_alert(label, *previous_margin, result, mention_margin),
            TrackerEvent::Resolved {
                previous_margin,
                result,
            } => {
                metrics::inc_opportunities_resolved();
                format::resolved_alert(label, *previous_margin, result)
            }
        };

        self.notifier.notify(Channel::Primary, message);
    }
}

/// Extract one market and run the odds engine over it.
#[instrument(skip(extractor, config, market), fields(market = %market.id))]
async fn scan_market(
    extractor: &dyn PageExtractor,
    config: &Config,
    market: &mut Market,
) -> Result<ArbitrageResult, ScanError> {
    let start = Instant::now();
    let extracted = match tokio::time::timeout(config.extraction_timeout(), extractor.extract(market))
        .await
    {
        Ok(extracted) => extracted,
        Err(_) => Err(ExtractionError::Timeout {
            seconds: config.extraction_timeout_secs,
        }),
    };
    metrics::record_extraction_latency(start, &market.id);

    let outcomes = extracted?;
    market.update_outcomes(outcomes);

    Ok(check_market(market, &market.outcomes, config)?)
}

fn failure_kind(err: &ScanError) -> &'static str {
    match err {
        ScanError::Extraction(ExtractionError::Timeout { .. }) => "timeout",
        ScanError::Extraction(ExtractionError::Http(_)) => "http",
        ScanError::Extraction(ExtractionError::Status { .. }) => "status",
        ScanError::Extraction(ExtractionError::NoPrices { .. }) => "no_prices",
        ScanError::Extraction(ExtractionError::Parse(_)) => "parse",
        ScanError::Odds(_) => "odds",
    }
}
