//! Application configuration loaded from environment variables.

use std::time::Duration;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use url::Url;

use crate::arbitrage::TrackerPolicy;
use crate::error::MonitorError;

/// Longest accepted scan interval, in minutes.
pub const MAX_CHECK_INTERVAL_MINUTES: u64 = 7 * 24 * 60;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // === Markets ===
    /// Event page URLs to monitor (comma-separated in `MARKET_URLS`).
    #[serde(default)]
    pub market_urls: Vec<String>,

    /// Minutes between the end of one scan cycle and the start of the next.
    #[serde(default = "default_check_interval")]
    pub check_interval_minutes: Decimal,

    // === Detection Parameters ===
    /// Margin (percent) a market must exceed to count as an opportunity.
    #[serde(default)]
    pub opportunity_threshold: Decimal,

    /// Minimum margin change (percentage points) that re-alerts an open opportunity.
    #[serde(default = "default_margin_epsilon")]
    pub margin_epsilon: Decimal,

    /// Two-outcome markets whose prices sum below this get a precondition warning.
    #[serde(default = "default_binary_sum_floor")]
    pub binary_sum_floor: Decimal,

    // === Notifications ===
    /// Discord webhook for opportunity alerts.
    #[serde(default)]
    pub discord_webhook_url: Option<String>,

    /// Discord webhook for log-channel messages.
    #[serde(default)]
    pub discord_log_webhook_url: Option<String>,

    /// Username shown on webhook posts.
    #[serde(default = "default_discord_username")]
    pub discord_username: String,

    /// Alerts above this margin (percent) mention @everyone.
    #[serde(default = "default_alert_mention_margin")]
    pub alert_mention_margin: Decimal,

    // === Timeouts ===
    /// Upper bound for one market's page extraction.
    #[serde(default = "default_extraction_timeout")]
    pub extraction_timeout_secs: u64,

    /// Upper bound for one webhook delivery.
    #[serde(default = "default_notify_timeout")]
    pub notify_timeout_secs: u64,

    /// User agent sent with page requests.
    #[serde(default = "default_user_agent")]
    pub http_user_agent: String,

    // === Server / Logging ===
    /// HTTP server port for health/status/metrics endpoints.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Preferred log file path (fallbacks are tried if it is not writable).
    #[serde(default = "default_log_file")]
    pub log_file: String,

    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub rust_log: String,

    /// Enable verbose logging.
    #[serde(default)]
    pub verbose: bool,
}

fn default_check_interval() -> Decimal {
    Decimal::new(5, 0)
}

fn default_margin_epsilon() -> Decimal {
    Decimal::new(1, 2) // 0.01 percentage points
}

fn default_binary_sum_floor() -> Decimal {
    Decimal::new(90, 0)
}

fn default_discord_username() -> String {
    "Arbitrage Monitor".to_string()
}

fn default_alert_mention_margin() -> Decimal {
    Decimal::new(5, 0)
}

fn default_extraction_timeout() -> u64 {
    30
}

fn default_notify_timeout() -> u64 {
    10
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_log_file() -> String {
    "log.txt".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            market_urls: Vec::new(),
            check_interval_minutes: default_check_interval(),
            opportunity_threshold: Decimal::ZERO,
            margin_epsilon: default_margin_epsilon(),
            binary_sum_floor: default_binary_sum_floor(),
            discord_webhook_url: None,
            discord_log_webhook_url: None,
            discord_username: default_discord_username(),
            alert_mention_margin: default_alert_mention_margin(),
            extraction_timeout_secs: default_extraction_timeout(),
            notify_timeout_secs: default_notify_timeout(),
            http_user_agent: default_user_agent(),
            port: default_port(),
            log_file: default_log_file(),
            rust_log: default_log_level(),
            verbose: false,
        }
    }
}

impl Config {
    /// Load configuration from environment, reading .env file first.
    pub fn load() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    /// Check if the configuration is valid.
    pub fn validate(&self) -> Result<(), String> {
        if self.market_urls.is_empty() {
            return Err("MARKET_URLS must list at least one market".to_string());
        }

        for raw in &self.market_urls {
            let url = Url::parse(raw).map_err(|e| format!("invalid market URL {raw}: {e}"))?;
            if url.scheme() != "http" && url.scheme() != "https" {
                return Err(format!("market URL {raw} must use http or https"));
            }
        }

        if self.check_interval_minutes <= Decimal::ZERO {
            return Err("CHECK_INTERVAL_MINUTES must be greater than 0".to_string());
        }

        if self.check_interval_minutes > Decimal::from(MAX_CHECK_INTERVAL_MINUTES) {
            return Err(format!(
                "CHECK_INTERVAL_MINUTES must be at most {MAX_CHECK_INTERVAL_MINUTES} (one week)"
            ));
        }

        if self.opportunity_threshold < Decimal::ZERO {
            return Err("OPPORTUNITY_THRESHOLD must not be negative".to_string());
        }

        if self.margin_epsilon < Decimal::ZERO {
            return Err("MARGIN_EPSILON must not be negative".to_string());
        }

        if self.extraction_timeout_secs == 0 || self.notify_timeout_secs == 0 {
            return Err("timeouts must be at least 1 second".to_string());
        }

        for webhook in [&self.discord_webhook_url, &self.discord_log_webhook_url]
            .into_iter()
            .flatten()
        {
            Url::parse(webhook).map_err(|e| format!("invalid webhook URL: {e}"))?;
        }

        Ok(())
    }

    /// Validate, converting a failure into [`MonitorError::InvalidConfig`].
    pub fn validated(self) -> crate::error::Result<Self> {
        self.validate().map_err(MonitorError::InvalidConfig)?;
        Ok(self)
    }

    /// Scan interval as a duration.
    ///
    /// Clamped to `MAX_CHECK_INTERVAL_MINUTES`.
    pub fn check_interval(&self) -> Duration {
        let minutes = self
            .check_interval_minutes
            .clamp(Decimal::ZERO, Decimal::from(MAX_CHECK_INTERVAL_MINUTES));
        let seconds = (minutes * Decimal::from(60)).to_f64().unwrap_or(0.0);
        Duration::from_secs_f64(seconds)
    }

    /// Per-market extraction timeout.
    pub fn extraction_timeout(&self) -> Duration {
        Duration::from_secs(self.extraction_timeout_secs)
    }

    /// Per-delivery webhook timeout.
    pub fn notify_timeout(&self) -> Duration {
        Duration::from_secs(self.notify_timeout_secs)
    }

    /// Detection policy for the opportunity tracker.
    pub fn tracker_policy(&self) -> TrackerPolicy {
        TrackerPolicy {
            threshold: self.opportunity_threshold,
            epsilon: self.margin_epsilon,
        }
    }

    /// Whether the primary Discord webhook is configured.
    pub fn notifications_enabled(&self) -> bool {
        self.discord_webhook_url.is_some()
    }
}
