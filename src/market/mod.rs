//! Market module for monitored prediction-market pages.
//!
//! This module handles:
//! - Market and outcome types
//! - The page extractor seam
//! - HTTP extraction from event pages
//! - Mock extractor for testing

pub mod extractor;
pub mod html;
pub mod mock;
pub mod types;

pub use extractor::PageExtractor;
pub use html::HtmlPageExtractor;
pub use mock::{MockPageExtractor, MockResponse};
pub use types::{label_from_url, market_id_from_url, Market, Outcome};
