//! Prediction-market arbitrage monitor.
//!
//! Periodically scrapes event pages, converts each outcome's Yes price to a
//! decimal odd and flags markets whose inverse odds sum below one: buying
//! every outcome in the right proportions then pays the same amount whatever
//! happens, for less than that amount.
//!
//! # Arithmetic
//!
//! Prices are on a 0-100 scale and the odd of an outcome is `100 / price`:
//!
//! ```text
//! Yes prices:        45.2, 50.0
//! Inverse odds:      0.452 + 0.500 = 0.952   (arbitrage constant)
//! Margin:            100 / 0.952 - 100 = 5.04%
//! Stake 1000:        474.79 + 525.21, each leg pays 1050.42
//! ```
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from environment
//! - [`error`]: Unified error types
//! - [`market`]: Market types and page extraction
//! - [`arbitrage`]: Odds engine, market checks and opportunity tracking
//! - [`scanner`]: Scan cycle scheduling
//! - [`notify`]: Discord notifications and message formatting
//! - [`session`]: Interactive console and stake calculator
//! - [`api`]: HTTP API for health, status and metrics
//! - [`metrics`]: Prometheus metrics
//! - [`logging`]: Tracing subscriber setup
//! - [`utils`]: Signal handling

pub mod api;
pub mod arbitrage;
pub mod config;
pub mod error;
pub mod logging;
pub mod market;
pub mod metrics;
pub mod notify;
pub mod scanner;
pub mod session;
pub mod utils;

pub use config::Config;
pub use error::{MonitorError, Result};
