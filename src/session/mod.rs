//! Interactive operator session.
//!
//! This module handles:
//! - The console command loop
//! - The stake-distribution dialogue for open opportunities
//!
//! Both are generic over async readers and writers so they run against
//! stdin/stdout in production and byte buffers in tests.

pub mod console;
pub mod trade;

pub use console::{markets_listing, run_console, Command};
pub use trade::{run_trade, TradeOutcome};
