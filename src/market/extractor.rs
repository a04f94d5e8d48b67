//! Page extractor seam.

use async_trait::async_trait;

use super::types::{Market, Outcome};
use crate::error::ExtractionError;

/// Source of per-outcome Yes prices for a market page.
///
/// Implementations own every markup-level detail; callers only see the
/// ordered `(name, price)` list.
#[async_trait]
pub trait PageExtractor: Send + Sync {
    /// Extract the ordered outcomes for a market.
    async fn extract(&self, market: &Market) -> Result<Vec<Outcome>, ExtractionError>;
}
