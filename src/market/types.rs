//! Market-related types for monitored prediction-market event pages.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use url::Url;

/// Maximum characters of a slug-derived label.
const SLUG_LABEL_LEN: usize = 30;

/// Maximum characters of a domain/path label.
const FALLBACK_LABEL_LEN: usize = 40;

/// One possible resolution of a market with its "Yes" price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    /// Outcome name, unique within its market.
    pub name: String,
    /// Yes price on a 0-100 scale (implied probability x 100).
    pub price: Decimal,
}

impl Outcome {
    /// Create an outcome.
    pub fn new(name: impl Into<String>, price: Decimal) -> Self {
        Self {
            name: name.into(),
            price,
        }
    }
}

/// A monitored market page.
#[derive(Debug, Clone)]
pub struct Market {
    /// Identifier derived from the URL slug (e.g., "bitcoin-price-on-september-5").
    pub id: String,
    /// Page URL.
    pub url: String,
    /// Short human-readable label for console and alerts.
    pub label: String,
    /// Outcomes from the most recent successful extraction.
    pub outcomes: Vec<Outcome>,
    /// When the market was last scanned successfully.
    pub last_checked: Option<OffsetDateTime>,
}

impl Market {
    /// Build a market from its page URL.
    pub fn from_url(url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            id: market_id_from_url(&url),
            label: label_from_url(&url),
            url,
            outcomes: Vec::new(),
            last_checked: None,
        }
    }

    /// Record a successful extraction.
    pub fn update_outcomes(&mut self, outcomes: Vec<Outcome>) {
        self.outcomes = outcomes;
        self.last_checked = Some(OffsetDateTime::now_utc());
    }
}

/// Derive a stable market identifier from an event URL.
///
/// Polymarket-style `/event/<slug>` URLs yield the slug with the query string
/// dropped; anything else yields `domain/last-path-segment`.
pub fn market_id_from_url(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(url) => {
            let segments: Vec<&str> = url
                .path_segments()
                .map(|s| s.filter(|seg| !seg.is_empty()).collect())
                .unwrap_or_default();

            if let Some(pos) = segments.iter().position(|seg| *seg == "event") {
                if let Some(slug) = segments.get(pos + 1) {
                    return (*slug).to_string();
                }
            }

            let domain = url.host_str().unwrap_or_default().trim_start_matches("www.");
            match segments.last() {
                Some(last) => format!("{}/{}", domain, last),
                None => domain.to_string(),
            }
        }
        Err(_) => raw.split('?').next().unwrap_or(raw).to_string(),
    }
}

/// Short display label for a market URL.
pub fn label_from_url(raw: &str) -> String {
    if let Ok(url) = Url::parse(raw) {
        let segments: Vec<&str> = url
            .path_segments()
            .map(|s| s.filter(|seg| !seg.is_empty()).collect())
            .unwrap_or_default();

        if let Some(pos) = segments.iter().position(|seg| *seg == "event") {
            if let Some(slug) = segments.get(pos + 1) {
                return truncate_with_ellipsis(&slug.replace('-', " "), SLUG_LABEL_LEN);
            }
        }

        let domain = url.host_str().unwrap_or_default().trim_start_matches("www.");
        let path = segments.last().copied().unwrap_or_default();
        return format!("{}/{}", domain, path)
            .chars()
            .take(FALLBACK_LABEL_LEN)
            .collect();
    }

    truncate_with_ellipsis(raw, FALLBACK_LABEL_LEN)
}

fn truncate_with_ellipsis(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let head: String = text.chars().take(max).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}
