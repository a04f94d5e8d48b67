//! HTTP page extractor for Polymarket-style event pages.
//!
//! Prices are read from the page's embedded `__NEXT_DATA__` payload, which
//! carries every sub-market of the event with its `outcomePrices`. Pages
//! without that payload fall back to scanning the visible text for
//! "Yes NN¢" labels.

use std::collections::HashSet;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::{debug, instrument};

use super::extractor::PageExtractor;
use super::types::{Market, Outcome};
use crate::config::Config;
use crate::error::ExtractionError;

static NEXT_DATA: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)<script id="__NEXT_DATA__"[^>]*>(.*?)</script>"#).expect("valid regex")
});

static SCRIPT_OR_STYLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<(script|style)[^>]*>.*?</(script|style)>").expect("valid regex"));

static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));

static YES_CENTS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"yes[^¢]*?(\d+(?:\.\d+)?)¢").expect("valid regex"));

static YES_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"yes[^\d]*?(\d+(?:\.\d+)?)").expect("valid regex"));

/// Extractor that fetches event pages over HTTP.
#[derive(Debug, Clone)]
pub struct HtmlPageExtractor {
    http: reqwest::Client,
    user_agent: String,
}

impl HtmlPageExtractor {
    /// Create an extractor from config.
    pub fn new(config: &Config) -> Result<Self, ExtractionError> {
        let http = reqwest::Client::builder()
            .timeout(config.extraction_timeout())
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            http,
            user_agent: config.http_user_agent.clone(),
        })
    }

    async fn fetch(&self, url: &str) -> Result<String, ExtractionError> {
        let response = self
            .http
            .get(url)
            .header("User-Agent", &self.user_agent)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ExtractionError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        Ok(response.text().await?)
    }
}

#[async_trait]
impl PageExtractor for HtmlPageExtractor {
    #[instrument(skip(self, market), fields(market = %market.id))]
    async fn extract(&self, market: &Market) -> Result<Vec<Outcome>, ExtractionError> {
        let html = self.fetch(&market.url).await?;
        let outcomes = parse_outcomes(&html)?;

        if outcomes.is_empty() {
            return Err(ExtractionError::NoPrices {
                url: market.url.clone(),
            });
        }

        debug!(count = outcomes.len(), "Extracted outcomes");
        Ok(outcomes)
    }
}

/// Parse outcomes from a page, preferring the embedded JSON payload.
pub fn parse_outcomes(html: &str) -> Result<Vec<Outcome>, ExtractionError> {
    if let Some(captures) = NEXT_DATA.captures(html) {
        let json_str = captures.get(1).map(|m| m.as_str()).unwrap_or_default();
        let payload: Value = serde_json::from_str(json_str)
            .map_err(|e| ExtractionError::Parse(format!("__NEXT_DATA__ is not JSON: {}", e)))?;

        let outcomes = outcomes_from_payload(&payload);
        if !outcomes.is_empty() {
            return Ok(outcomes);
        }
        debug!("__NEXT_DATA__ had no outcome prices, scanning page text");
    }

    Ok(outcomes_from_text(html))
}

/// Collect open sub-markets carrying `outcomePrices` from a page payload.
pub fn outcomes_from_payload(payload: &Value) -> Vec<Outcome> {
    let mut outcomes = Vec::new();
    let mut seen = HashSet::new();

    fn recurse(value: &Value, outcomes: &mut Vec<Outcome>, seen: &mut HashSet<String>) {
        match value {
            Value::Object(map) => {
                if let Some(prices) = map.get("outcomePrices") {
                    let closed = map.get("closed").and_then(Value::as_bool).unwrap_or(false);
                    let key = map
                        .get("conditionId")
                        .or_else(|| map.get("id"))
                        .map(|v| v.to_string())
                        .unwrap_or_else(|| format!("#{}", outcomes.len()));

                    if !closed && seen.insert(key) {
                        if let Some(price) = first_price(prices) {
                            let name = map
                                .get("groupItemTitle")
                                .and_then(Value::as_str)
                                .filter(|s| !s.trim().is_empty())
                                .or_else(|| map.get("question").and_then(Value::as_str))
                                .map(|s| s.trim().to_string())
                                .unwrap_or_else(|| format!("Option {}", outcomes.len() + 1));
                            outcomes.push(Outcome::new(name, price * Decimal::ONE_HUNDRED));
                        }
                    }
                    return;
                }
                for v in map.values() {
                    recurse(v, outcomes, seen);
                }
            }
            Value::Array(arr) => {
                for v in arr {
                    recurse(v, outcomes, seen);
                }
            }
            _ => {}
        }
    }

    recurse(payload, &mut outcomes, &mut seen);
    outcomes
}

/// First entry of an `outcomePrices` field (the Yes price on a 0-1 scale).
///
/// The field is either a JSON array or a string holding a JSON array.
fn first_price(value: &Value) -> Option<Decimal> {
    let parsed;
    let array = match value {
        Value::Array(arr) => arr,
        Value::String(s) => {
            parsed = serde_json::from_str::<Value>(s).ok()?;
            parsed.as_array()?
        }
        _ => return None,
    };

    match array.first()? {
        Value::String(s) => parse_decimal(s),
        Value::Number(n) => parse_decimal(&n.to_string()),
        _ => None,
    }
}

fn parse_decimal(s: &str) -> Option<Decimal> {
    Decimal::from_str(s.trim())
        .or_else(|_| Decimal::from_scientific(s.trim()))
        .ok()
}

/// Scan visible page text for Yes prices, naming outcomes by position.
pub fn outcomes_from_text(html: &str) -> Vec<Outcome> {
    let without_scripts = SCRIPT_OR_STYLE.replace_all(html, " ");
    let text = TAG.replace_all(&without_scripts, " ").to_lowercase();

    let mut prices: Vec<Decimal> = YES_CENTS
        .captures_iter(&text)
        .filter_map(|cap| cap.get(1))
        .filter_map(|m| parse_decimal(m.as_str()))
        .collect();

    if prices.is_empty() {
        prices = YES_NUMBER
            .captures_iter(&text)
            .filter_map(|cap| cap.get(1))
            .filter_map(|m| parse_decimal(m.as_str()))
            .filter(|p| *p > Decimal::ZERO && *p <= Decimal::ONE_HUNDRED)
            .collect();
    }

    prices
        .into_iter()
        .enumerate()
        .map(|(i, price)| Outcome::new(format!("Option {}", i + 1), price))
        .collect()
}
