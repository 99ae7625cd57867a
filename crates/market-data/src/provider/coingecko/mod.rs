//! CoinGecko market metrics provider.
//!
//! Free, unauthenticated, and strict about request rate (roughly 50 calls
//! per minute). Used as the secondary metrics source for market-cap
//! enrichment and as the primary dominance source.
//!
//! Endpoints:
//! - `simple/price?ids=a,b&vs_currencies=usd&include_market_cap=true...`
//! - `global`

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use serde_json::Value;
use tracing::{debug, warn};

use crate::client::{
    Backoff, HttpTransport, ProviderClient, ProviderConfig, ProviderPolicy,
};
use crate::errors::MarketDataError;
use crate::models::MarketOverview;
use crate::provider::{json_decimal, MetricsSnapshot};

pub const PROVIDER_ID: &str = "COINGECKO";
pub const BASE_URL: &str = "https://api.coingecko.com/api/v3";

struct CoinGeckoPolicy {
    backoff: Backoff,
}

impl ProviderPolicy for CoinGeckoPolicy {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn on_rate_limited(&self, attempt: u32) -> Option<Duration> {
        self.backoff.delay(attempt)
    }
}

pub struct CoinGeckoClient {
    client: ProviderClient,
}

impl CoinGeckoClient {
    /// 60s cache, 1.2s spacing, 2s linear retry delay.
    pub fn default_config() -> ProviderConfig {
        ProviderConfig::new(BASE_URL)
            .with_retry(3, Duration::from_secs(2))
            .with_cache_ttl(Duration::from_secs(60))
            .with_min_request_interval(Duration::from_millis(1200))
    }

    pub fn new(config: ProviderConfig, transport: Arc<dyn HttpTransport>) -> Self {
        let policy = CoinGeckoPolicy {
            backoff: Backoff::Exponential {
                base: Duration::from_secs(5),
                max: Duration::from_secs(60),
            },
        };
        Self {
            client: ProviderClient::new(config, Box::new(policy), transport),
        }
    }

    pub fn client(&self) -> &ProviderClient {
        &self.client
    }

    /// USD metrics for each requested asset ID, in a single request.
    ///
    /// IDs missing from the response are missing from the map. With
    /// `include_extras` false only price and market cap are requested.
    pub async fn simple_prices(
        &self,
        ids: &[&str],
        include_extras: bool,
    ) -> Result<HashMap<String, MetricsSnapshot>, MarketDataError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let joined = ids.join(",");
        let mut params = vec![
            ("ids", joined.as_str()),
            ("vs_currencies", "usd"),
            ("include_market_cap", "true"),
        ];
        if include_extras {
            params.push(("include_24h_vol", "true"));
            params.push(("include_24h_change", "true"));
        }

        let payload = self.client.make_request("simple/price", &params).await?;
        let entries = payload.as_object().ok_or_else(|| {
            MarketDataError::decode(PROVIDER_ID, "simple/price payload is not an object")
        })?;

        let snapshots: HashMap<String, MetricsSnapshot> = entries
            .iter()
            .map(|(id, entry)| (id.clone(), snapshot_from_entry(entry)))
            .collect();

        debug!(
            "CoinGecko returned metrics for {}/{} asset(s)",
            snapshots.len(),
            ids.len()
        );
        Ok(snapshots)
    }

    /// Global market totals from `global`.
    pub async fn global(&self) -> Result<MarketOverview, MarketDataError> {
        let payload = self.client.make_request("global", &[]).await?;
        overview_from_global(&payload)
    }

    /// Bitcoin's share of total market cap, in percent.
    pub async fn btc_dominance(&self) -> Result<Decimal, MarketDataError> {
        let payload = self.client.make_request("global", &[]).await?;
        payload
            .pointer("/data/market_cap_percentage/btc")
            .and_then(json_decimal)
            .ok_or_else(|| {
                MarketDataError::decode(PROVIDER_ID, "missing data.market_cap_percentage.btc")
            })
    }
}

fn snapshot_from_entry(entry: &Value) -> MetricsSnapshot {
    let field = |name: &str| entry.get(name).and_then(json_decimal);
    MetricsSnapshot {
        price_usd: field("usd"),
        change_24h_pct: field("usd_24h_change"),
        volume_24h_usd: field("usd_24h_vol"),
        market_cap_usd: field("usd_market_cap"),
    }
}

fn overview_from_global(payload: &Value) -> Result<MarketOverview, MarketDataError> {
    let data = payload
        .get("data")
        .ok_or_else(|| MarketDataError::decode(PROVIDER_ID, "missing data in global payload"))?;

    let total_market_cap = data
        .pointer("/total_market_cap/usd")
        .and_then(json_decimal)
        .ok_or_else(|| MarketDataError::decode(PROVIDER_ID, "missing data.total_market_cap.usd"))?;

    let share = |coin: &str| {
        data.get("market_cap_percentage")
            .and_then(|p| p.get(coin))
            .and_then(json_decimal)
    };
    let cap_of = |pct: Option<Decimal>| pct.map(|p| (total_market_cap * p / Decimal::ONE_HUNDRED).round_dp(2));

    let btc_dominance = share("btc");
    if btc_dominance.is_none() {
        warn!("CoinGecko global payload has no BTC dominance");
    }

    Ok(MarketOverview {
        btc_dominance,
        btc_market_cap: cap_of(btc_dominance),
        eth_market_cap: cap_of(share("eth")),
        total_market_cap,
    })
}
