//! Mock page extractor for unit and integration testing.
//!
//! Responses are scripted per market id. Each call pops the next scripted
//! response; the last one repeats once the script runs out.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;

use super::extractor::PageExtractor;
use super::types::{Market, Outcome};
use crate::error::ExtractionError;

/// Scripted response for one extraction call.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Return these outcomes.
    Outcomes(Vec<Outcome>),
    /// Fail with an HTTP status error.
    Fail(u16),
    /// Never answer within any reasonable timeout.
    Hang,
}

/// Mock page extractor for testing.
#[derive(Debug, Clone, Default)]
pub struct MockPageExtractor {
    scripts: Arc<Mutex<HashMap<String, VecDeque<MockResponse>>>>,
    calls: Arc<Mutex<Vec<String>>>,
    latency: Duration,
}

impl MockPageExtractor {
    /// Create an extractor with no scripted markets.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an extractor that sleeps before every answer.
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            ..Self::default()
        }
    }

    /// Queue a response for a market.
    pub fn push(&self, market_id: &str, response: MockResponse) {
        let mut scripts = self.scripts.lock().unwrap();
        scripts
            .entry(market_id.to_string())
            .or_default()
            .push_back(response);
    }

    /// Queue outcome prices for a market, naming them in order.
    pub fn push_prices(&self, market_id: &str, prices: &[(&str, Decimal)]) {
        let outcomes = prices
            .iter()
            .map(|(name, price)| Outcome::new(*name, *price))
            .collect();
        self.push(market_id, MockResponse::Outcomes(outcomes));
    }

    /// Market ids extracted so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn next_response(&self, market_id: &str) -> Option<MockResponse> {
        let mut scripts = self.scripts.lock().unwrap();
        let queue = scripts.get_mut(market_id)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

#[async_trait]
impl PageExtractor for MockPageExtractor {
    async fn extract(&self, market: &Market) -> Result<Vec<Outcome>, ExtractionError> {
        self.calls.lock().unwrap().push(market.id.clone());

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        match self.next_response(&market.id) {
            Some(MockResponse::Outcomes(outcomes)) if outcomes.is_empty() => {
                Err(ExtractionError::NoPrices {
                    url: market.url.clone(),
                })
            }
            Some(MockResponse::Outcomes(outcomes)) => Ok(outcomes),
            Some(MockResponse::Fail(status)) => Err(ExtractionError::Status {
                url: market.url.clone(),
                status,
            }),
            Some(MockResponse::Hang) => {
                std::future::pending::<()>().await;
                unreachable!("pending never resolves")
            }
            None => Err(ExtractionError::NoPrices {
                url: market.url.clone(),
            }),
        }
    }
}
