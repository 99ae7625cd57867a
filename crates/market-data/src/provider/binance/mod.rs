//! Binance spot market provider.
//!
//! Primary source for prices, 24h statistics and daily klines:
//! - `ticker/price?symbol=X`
//! - `ticker/24hr?symbol=X`
//! - `klines?symbol=X&interval=1d&limit=N`
//!
//! The public API has a generous weight budget, so requests are barely
//! spaced and cached only briefly. A 429 is unexpected and gets a short
//! linear backoff.

mod models;

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use serde_json::Value;
use tracing::debug;

use crate::client::{
    Backoff, HttpTransport, ProviderClient, ProviderConfig, ProviderPolicy,
};
use crate::errors::MarketDataError;
use crate::models::{AssetQuote, QuoteSource};
use crate::provider::parse_decimal;

use models::{Ticker24hrResponse, TickerPriceResponse};

pub const PROVIDER_ID: &str = "BINANCE";
pub const BASE_URL: &str = "https://api.binance.com/api/v3";

/// Server-side cap on `klines` `limit`.
pub const MAX_KLINES: usize = 1000;

struct BinancePolicy {
    backoff: Backoff,
}

impl ProviderPolicy for BinancePolicy {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn on_rate_limited(&self, attempt: u32) -> Option<Duration> {
        self.backoff.delay(attempt)
    }
}

/// Spot exchange client (ticker + kline provider).
pub struct BinanceClient {
    client: ProviderClient,
}

impl BinanceClient {
    /// 30s cache, 100ms spacing, 1s linear retry delay, 10s timeout.
    pub fn default_config() -> ProviderConfig {
        ProviderConfig::new(BASE_URL)
            .with_retry(3, Duration::from_secs(1))
            .with_cache_ttl(Duration::from_secs(30))
            .with_min_request_interval(Duration::from_millis(100))
            .with_request_timeout(Duration::from_secs(10))
    }

    pub fn new(config: ProviderConfig, transport: Arc<dyn HttpTransport>) -> Self {
        let policy = BinancePolicy {
            backoff: Backoff::Linear {
                base: Duration::from_secs(2),
            },
        };
        Self {
            client: ProviderClient::new(config, Box::new(policy), transport),
        }
    }

    pub fn client(&self) -> &ProviderClient {
        &self.client
    }

    /// Last traded price from `ticker/price`.
    pub async fn ticker_price(&self, symbol: &str) -> Result<Decimal, MarketDataError> {
        let payload = self
            .client
            .make_request("ticker/price", &[("symbol", symbol)])
            .await?;
        let ticker: TickerPriceResponse = decode(payload)?;
        debug!("Binance price for {}: {}", ticker.symbol, ticker.price);
        parse_decimal(&ticker.price).ok_or_else(|| invalid_field("price", &ticker.price))
    }

    /// Price plus 24h change, volume and range from `ticker/24hr`.
    pub async fn ticker_24hr(&self, symbol: &str) -> Result<AssetQuote, MarketDataError> {
        let payload = self
            .client
            .make_request("ticker/24hr", &[("symbol", symbol)])
            .await?;
        let ticker: Ticker24hrResponse = decode(payload)?;
        quote_from_24hr(ticker)
    }

    /// Best available spot quote: full 24h stats, or a price-only quote
    /// from `ticker/price` when the 24h endpoint fails.
    pub async fn spot_quote(&self, symbol: &str) -> Result<AssetQuote, MarketDataError> {
        match self.ticker_24hr(symbol).await {
            Ok(quote) => Ok(quote),
            Err(e) => {
                debug!(
                    "Binance 24h ticker failed for {}: {}, trying price ticker",
                    symbol, e
                );
                let price = self.ticker_price(symbol).await?;
                AssetQuote::new(symbol, price, QuoteSource::Spot)
                    .ok_or_else(|| MarketDataError::SymbolNotFound(symbol.to_string()))
            }
        }
    }

    /// Raw kline rows (array of arrays). `limit` is clamped to [`MAX_KLINES`].
    pub async fn klines(
        &self,
        symbol: &str,
        interval: &str,
        limit: usize,
    ) -> Result<Value, MarketDataError> {
        let limit = limit.clamp(1, MAX_KLINES).to_string();
        self.client
            .make_request(
                "klines",
                &[("symbol", symbol), ("interval", interval), ("limit", &limit)],
            )
            .await
    }
}

fn decode<T: serde::de::DeserializeOwned>(payload: Value) -> Result<T, MarketDataError> {
    serde_json::from_value(payload).map_err(|e| MarketDataError::decode(PROVIDER_ID, e.to_string()))
}

fn invalid_field(field: &str, value: &str) -> MarketDataError {
    MarketDataError::decode(PROVIDER_ID, format!("invalid {} '{}'", field, value))
}

fn quote_from_24hr(ticker: Ticker24hrResponse) -> Result<AssetQuote, MarketDataError> {
    let price = parse_decimal(&ticker.last_price)
        .ok_or_else(|| invalid_field("lastPrice", &ticker.last_price))?;

    let mut quote = AssetQuote::new(ticker.symbol.clone(), price, QuoteSource::Spot)
        .ok_or_else(|| MarketDataError::SymbolNotFound(ticker.symbol.clone()))?;

    quote.change_24h_pct = parse_decimal(&ticker.price_change_percent);
    quote.volume_24h_usd = ticker
        .quote_volume
        .as_deref()
        .and_then(parse_decimal)
        .or_else(|| parse_decimal(&ticker.volume).map(|v| v * price));
    quote.high_24h = parse_decimal(&ticker.high_price);
    quote.low_24h = parse_decimal(&ticker.low_price);

    Ok(quote)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ok, status, ScriptedTransport};
    use rust_decimal_macros::dec;

    const TICKER_24HR: &str = r#"{
        "symbol": "BTCUSDT",
        "priceChange": "-512.10000000",
        "priceChangePercent": "-0.791",
        "lastPrice": "64210.55000000",
        "volume": "20431.55",
        "quoteVolume": "1312345678.90",
        "highPrice": "65400.00000000",
        "lowPrice": "63800.10000000"
    }"#;

    fn client(transport: Arc<ScriptedTransport>) -> BinanceClient {
        BinanceClient::new(BinanceClient::default_config(), transport)
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticker_24hr_parses_stats() {
        let transport = Arc::new(ScriptedTransport::new().on("/ticker/24hr", vec![ok(TICKER_24HR)]));
        let quote = client(transport.clone()).ticker_24hr("BTCUSDT").await.unwrap();

        assert_eq!(quote.symbol, "BTCUSDT");
        assert_eq!(quote.price_usd, dec!(64210.55));
        assert_eq!(quote.change_24h_pct, Some(dec!(-0.791)));
        assert_eq!(quote.volume_24h_usd, Some(dec!(1312345678.90)));
        assert_eq!(quote.high_24h, Some(dec!(65400)));
        assert_eq!(quote.low_24h, Some(dec!(63800.1)));
        assert!(quote.market_cap_usd.is_none());

        let calls = transport.calls();
        assert_eq!(calls[0].url, "https://api.binance.com/api/v3/ticker/24hr");
        assert_eq!(calls[0].query_param("symbol"), Some("BTCUSDT"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_spot_quote_falls_back_to_price_ticker() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .on("/ticker/24hr", vec![status(500)])
                .on("/ticker/price", vec![ok(r#"{"symbol":"ETHUSDT","price":"3120.40"}"#)]),
        );
        let quote = client(transport).spot_quote("ETHUSDT").await.unwrap();

        assert_eq!(quote.price_usd, dec!(3120.40));
        assert!(quote.change_24h_pct.is_none());
        assert_eq!(quote.source, QuoteSource::Spot);
    }

    #[tokio::test(start_paused = true)]
    async fn test_klines_limit_is_clamped() {
        let transport = Arc::new(ScriptedTransport::new().on("/klines", vec![ok("[]")]));
        client(transport.clone())
            .klines("BTCUSDT", "1d", 5000)
            .await
            .unwrap();

        let calls = transport.calls();
        assert_eq!(calls[0].query_param("limit"), Some("1000"));
        assert_eq!(calls[0].query_param("interval"), Some("1d"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_price_is_not_a_quote() {
        let body = TICKER_24HR.replace("64210.55000000", "0.00000000");
        let transport = Arc::new(ScriptedTransport::new().on("/ticker/24hr", vec![ok(&body)]));

        let err = client(transport).ticker_24hr("BTCUSDT").await.unwrap_err();
        assert!(matches!(err, MarketDataError::SymbolNotFound(_)));
    }
}
