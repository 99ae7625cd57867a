//! Alternative.me Fear & Greed index.
//!
//! The index updates once a day, is free and unmetered, so it bypasses the
//! shared cache and retry loop: one request, one answer.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::client::{HttpRequest, HttpTransport};
use crate::errors::MarketDataError;
use crate::models::SentimentIndex;

pub const PROVIDER_ID: &str = "ALTERNATIVE_ME";
pub const FEAR_GREED_URL: &str = "https://api.alternative.me/fng/";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct FearGreedResponse {
    data: Vec<FearGreedEntry>,
    #[serde(default)]
    metadata: Option<FearGreedMetadata>,
}

#[derive(Debug, Deserialize)]
struct FearGreedEntry {
    value: String,
    value_classification: String,
    timestamp: String,
    #[serde(default)]
    time_until_update: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FearGreedMetadata {
    #[serde(default)]
    time_until_update: Option<String>,
}

pub struct SentimentClient {
    url: String,
    transport: Arc<dyn HttpTransport>,
}

impl SentimentClient {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self::with_url(FEAR_GREED_URL, transport)
    }

    pub fn with_url(url: impl Into<String>, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            url: url.into(),
            transport,
        }
    }

    /// Latest index reading.
    pub async fn fear_greed(&self) -> Result<SentimentIndex, MarketDataError> {
        let request = HttpRequest::get(self.url.clone(), REQUEST_TIMEOUT);
        let response = self.transport.get(&request).await.map_err(|e| {
            warn!("Fear & Greed request failed: {}", e.message);
            MarketDataError::Transport {
                provider: PROVIDER_ID.to_string(),
                message: e.message,
                timed_out: e.timed_out,
            }
        })?;

        match response.status {
            200 => {}
            429 => {
                return Err(MarketDataError::RateLimited {
                    provider: PROVIDER_ID.to_string(),
                })
            }
            status => {
                return Err(MarketDataError::HttpStatus {
                    provider: PROVIDER_ID.to_string(),
                    status,
                })
            }
        }

        let parsed: FearGreedResponse = serde_json::from_str(&response.body)
            .map_err(|e| MarketDataError::decode(PROVIDER_ID, e.to_string()))?;
        let index = into_index(parsed)?;
        debug!("Fear & Greed index: {} ({})", index.value, index.classification);
        Ok(index)
    }
}

fn into_index(response: FearGreedResponse) -> Result<SentimentIndex, MarketDataError> {
    let metadata_update = response.metadata.and_then(|m| m.time_until_update);
    let entry = response
        .data
        .into_iter()
        .next()
        .ok_or_else(|| MarketDataError::decode(PROVIDER_ID, "empty data array"))?;

    let value = entry
        .value
        .trim()
        .parse::<u8>()
        .ok()
        .filter(|v| *v <= 100)
        .ok_or_else(|| {
            MarketDataError::decode(PROVIDER_ID, format!("invalid index value '{}'", entry.value))
        })?;

    Ok(SentimentIndex {
        value,
        classification: entry.value_classification,
        timestamp: entry.timestamp,
        time_until_update: entry.time_until_update.or(metadata_update),
    })
}
