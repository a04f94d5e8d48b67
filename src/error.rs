//! Unified error types for the arbitrage monitor.

use rust_decimal::Decimal;
use thiserror::Error;

/// Unified error type for the arbitrage monitor.
#[derive(Error, Debug)]
pub enum MonitorError {
    /// Configuration loading error.
    #[error("configuration error: {0}")]
    Config(#[from] envy::Error),

    /// Configuration loaded but failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Odds or stake calculation error.
    #[error("odds error: {0}")]
    Odds(#[from] OddsError),

    /// Page extraction error.
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// HTTP request error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Odds engine errors.
///
/// Raised by the pure calculation functions and never swallowed there: one
/// bad price invalidates the whole market for the cycle.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OddsError {
    /// Price outside the (0, 100] implied-percentage range.
    #[error("invalid price {price}: must be in (0, 100]")]
    InvalidPrice {
        /// The rejected price.
        price: Decimal,
    },

    /// No outcomes to compute over.
    #[error("market has no outcomes")]
    EmptyMarket,

    /// Total stake must be positive.
    #[error("invalid stake {stake}: must be greater than zero")]
    InvalidStake {
        /// The rejected stake.
        stake: Decimal,
    },

    /// A result does not fit in a `Decimal`.
    #[error("arithmetic overflow computing {0}")]
    Overflow(&'static str),
}

/// Failures from the page extractor.
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// HTTP request failed.
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Page responded with a non-success status.
    #[error("failed to fetch {url}: HTTP {status}")]
    Status {
        /// The page URL.
        url: String,
        /// HTTP status code.
        status: u16,
    },

    /// Extraction did not finish within the configured timeout.
    #[error("extraction timed out after {seconds}s")]
    Timeout {
        /// Timeout that elapsed.
        seconds: u64,
    },

    /// Page was fetched but contained no Yes prices.
    #[error("no prices found on {url}")]
    NoPrices {
        /// The page URL.
        url: String,
    },

    /// Page payload could not be parsed.
    #[error("failed to parse page: {0}")]
    Parse(String),
}

/// Per-market scan failure, caught by the scan cycle controller.
#[derive(Error, Debug)]
pub enum ScanError {
    /// The page extractor failed.
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    /// The extracted prices could not be turned into a result.
    #[error(transparent)]
    Odds(#[from] OddsError),
}

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, MonitorError>;
