//! CoinMarketCap metrics provider.
//!
//! Requires an API key (`X-CMC_PRO_API_KEY`). The free plan meters a small
//! monthly credit budget, so responses are cached for five minutes and a
//! persistent 429 is abandoned quickly instead of burning credits.
//!
//! Endpoints:
//! - `cryptocurrency/quotes/latest?symbol=BTC,ETH&convert=USD`
//! - `global-metrics/quotes/latest`

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use serde_json::Value;
use tracing::debug;

use crate::client::{
    Backoff, HttpTransport, ProviderClient, ProviderConfig, ProviderPolicy,
};
use crate::errors::MarketDataError;
use crate::models::MarketOverview;
use crate::provider::{json_decimal, MetricsSnapshot};

pub const PROVIDER_ID: &str = "COINMARKETCAP";
pub const BASE_URL: &str = "https://pro-api.coinmarketcap.com/v1";

const API_KEY_HEADER: &str = "X-CMC_PRO_API_KEY";

struct CoinMarketCapPolicy {
    backoff: Backoff,
}

impl ProviderPolicy for CoinMarketCapPolicy {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn prepare_headers(&self, config: &ProviderConfig) -> Vec<(&'static str, String)> {
        let mut headers = vec![("Accept", "application/json".to_string())];
        if let Some(key) = &config.credential {
            headers.push((API_KEY_HEADER, key.clone()));
        }
        headers
    }

    fn on_rate_limited(&self, attempt: u32) -> Option<Duration> {
        self.backoff.delay(attempt)
    }
}

pub struct CoinMarketCapClient {
    client: ProviderClient,
}

impl CoinMarketCapClient {
    /// 300s cache, 2s spacing, 3s linear retry delay.
    pub fn default_config() -> ProviderConfig {
        ProviderConfig::new(BASE_URL)
            .with_retry(3, Duration::from_secs(3))
            .with_cache_ttl(Duration::from_secs(300))
            .with_min_request_interval(Duration::from_secs(2))
    }

    /// Fails with [`MarketDataError::MissingCredential`] when the config
    /// carries no API key.
    pub fn new(
        config: ProviderConfig,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self, MarketDataError> {
        if config.credential.is_none() {
            return Err(MarketDataError::MissingCredential {
                provider: PROVIDER_ID.to_string(),
            });
        }

        let policy = CoinMarketCapPolicy {
            backoff: Backoff::Exponential {
                base: Duration::from_secs(10),
                max: Duration::from_secs(40),
            },
        };
        Ok(Self {
            client: ProviderClient::new(config, Box::new(policy), transport),
        })
    }

    pub fn client(&self) -> &ProviderClient {
        &self.client
    }

    /// USD metrics keyed by upper-case ticker, in a single request.
    pub async fn quotes_latest(
        &self,
        symbols: &[&str],
    ) -> Result<HashMap<String, MetricsSnapshot>, MarketDataError> {
        if symbols.is_empty() {
            return Ok(HashMap::new());
        }

        let joined = symbols
            .iter()
            .map(|s| s.to_uppercase())
            .collect::<Vec<_>>()
            .join(",");

        let payload = self
            .client
            .make_request(
                "cryptocurrency/quotes/latest",
                &[("symbol", joined.as_str()), ("convert", "USD")],
            )
            .await?;

        let data = payload
            .get("data")
            .and_then(Value::as_object)
            .ok_or_else(|| MarketDataError::decode(PROVIDER_ID, "missing data in quotes payload"))?;

        let mut snapshots = HashMap::new();
        for (symbol, entry) in data {
            // Ambiguous tickers come back as an array, most relevant first
            let entry = match entry {
                Value::Array(items) => items.first(),
                other => Some(other),
            };
            if let Some(snapshot) = entry.and_then(snapshot_from_entry) {
                snapshots.insert(symbol.to_uppercase(), snapshot);
            }
        }

        debug!(
            "CoinMarketCap returned metrics for {}/{} symbol(s)",
            snapshots.len(),
            symbols.len()
        );
        Ok(snapshots)
    }

    /// Global market totals from `global-metrics/quotes/latest`.
    pub async fn global_metrics(&self) -> Result<MarketOverview, MarketDataError> {
        let payload = self
            .client
            .make_request("global-metrics/quotes/latest", &[])
            .await?;

        let data = payload
            .get("data")
            .ok_or_else(|| MarketDataError::decode(PROVIDER_ID, "missing data in global payload"))?;

        let total_market_cap = data
            .pointer("/quote/USD/total_market_cap")
            .and_then(json_decimal)
            .ok_or_else(|| {
                MarketDataError::decode(PROVIDER_ID, "missing data.quote.USD.total_market_cap")
            })?;

        let cap_of = |field: &str| {
            data.get(field)
                .and_then(json_decimal)
                .map(|pct| (total_market_cap * pct / Decimal::ONE_HUNDRED).round_dp(2))
        };

        Ok(MarketOverview {
            btc_dominance: data.get("btc_dominance").and_then(json_decimal),
            btc_market_cap: cap_of("btc_dominance"),
            eth_market_cap: cap_of("eth_dominance"),
            total_market_cap,
        })
    }

    /// Bitcoin's share of total market cap, in percent.
    pub async fn btc_dominance(&self) -> Result<Decimal, MarketDataError> {
        let payload = self
            .client
            .make_request("global-metrics/quotes/latest", &[])
            .await?;
        payload
            .pointer("/data/btc_dominance")
            .and_then(json_decimal)
            .ok_or_else(|| MarketDataError::decode(PROVIDER_ID, "missing data.btc_dominance"))
    }
}

fn snapshot_from_entry(entry: &Value) -> Option<MetricsSnapshot> {
    let usd = entry.pointer("/quote/USD")?;
    let field = |name: &str| usd.get(name).and_then(json_decimal);
    Some(MetricsSnapshot {
        price_usd: field("price"),
        change_24h_pct: field("percent_change_24h"),
        volume_24h_usd: field("volume_24h"),
        market_cap_usd: field("market_cap"),
    })
}
