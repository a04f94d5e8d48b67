//! Arbitrage module for detecting and tracking opportunities.
//!
//! This module handles:
//! - Price to odds conversion and margin calculation
//! - Stake distribution across outcomes
//! - Per-market checks with precondition warnings
//! - Opportunity lifecycle across scan cycles

pub mod calculator;
pub mod detector;
pub mod stake;
pub mod tracker;

pub use calculator::{
    compute_arbitrage, implied_price, is_opportunity, price_to_odd, ArbitrageResult, OddsLeg,
};
pub use detector::{check_market, precondition_warnings};
pub use stake::{compute_stake_plan, StakeLeg, StakePlan};
pub use tracker::{
    OpportunityState, OpportunityStatus, OpportunityTracker, SharedTracker, TrackerEvent,
    TrackerPolicy,
};
