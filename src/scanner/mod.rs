//! Scan scheduling module.
//!
//! This module handles:
//! - Periodic scan cycles over the configured markets
//! - Per-market failure isolation
//! - Cycle summaries for the log channel and status API
//! - Cooperative shutdown between markets and between cycles

pub mod controller;
pub mod summary;

pub use controller::ScanController;
pub use summary::{CycleReport, CycleSummary, LastCycle, OpportunityLine, ScanFailure};
