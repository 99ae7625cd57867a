//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use coinwatch_market_data::client::{HttpRequest, HttpResponse, HttpTransport, TransportError};
use serde_json::{json, Value};

pub const BINANCE: &str = "https://api.binance.com/api/v3";
pub const COINGECKO: &str = "https://api.coingecko.com/api/v3";
pub const COINMARKETCAP: &str = "https://pro-api.coinmarketcap.com/v1";

type Handler = Box<dyn Fn(&HttpRequest) -> Result<HttpResponse, TransportError> + Send + Sync>;

/// Transport answering every request through one handler closure and
/// recording what was asked.
pub struct MockTransport {
    handler: Handler,
    calls: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    pub fn new<F>(handler: F) -> Arc<Self>
    where
        F: Fn(&HttpRequest) -> Result<HttpResponse, TransportError> + Send + Sync + 'static,
    {
        Arc::new(Self {
            handler: Box::new(handler),
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Transport that fails the test if anything is requested.
    pub fn unreachable() -> Arc<Self> {
        Self::new(|req| panic!("unexpected request to {}", req.url))
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Requests whose URL starts with `prefix`, in order.
    pub fn calls_to(&self, prefix: &str) -> Vec<HttpRequest> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|req| req.url.starts_with(prefix))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn get(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self.calls.lock().unwrap().push(request.clone());
        (self.handler)(request)
    }
}

pub fn ok(body: Value) -> Result<HttpResponse, TransportError> {
    Ok(HttpResponse::ok(body.to_string()))
}

pub fn status(code: u16) -> Result<HttpResponse, TransportError> {
    Ok(HttpResponse::new(code, ""))
}

pub fn not_found() -> Result<HttpResponse, TransportError> {
    status(404)
}

pub fn endpoint(req: &HttpRequest, base: &str, path: &str) -> bool {
    req.url == format!("{}/{}", base, path)
}

pub fn ticker_24hr(symbol: &str, price: &str) -> Value {
    json!({
        "symbol": symbol,
        "priceChangePercent": "1.250",
        "lastPrice": price,
        "volume": "1000.0",
        "quoteVolume": "50000000.0",
        "highPrice": price,
        "lowPrice": price
    })
}

/// `rows` daily klines starting 2024-01-01, all closing at `close`.
pub fn klines(rows: usize, close: &str) -> Value {
    const START_MS: i64 = 1_704_067_200_000;
    const DAY_MS: i64 = 86_400_000;
    Value::Array(
        (0..rows as i64)
            .map(|day| {
                let open_time = START_MS + day * DAY_MS;
                json!([
                    open_time,
                    close,
                    close,
                    close,
                    close,
                    "10.0",
                    open_time + DAY_MS - 1,
                    "0",
                    1,
                    "0",
                    "0",
                    "0"
                ])
            })
            .collect(),
    )
}

/// CoinMarketCap `quotes/latest` body for `(ticker, price, market_cap)`.
pub fn cmc_quotes(entries: &[(&str, f64, f64)]) -> Value {
    let data: serde_json::Map<String, Value> = entries
        .iter()
        .map(|(ticker, price, cap)| {
            (
                ticker.to_string(),
                json!({
                    "symbol": ticker,
                    "quote": {"USD": {
                        "price": price,
                        "percent_change_24h": -2.5,
                        "volume_24h": 1000000.0,
                        "market_cap": cap
                    }}
                }),
            )
        })
        .collect();
    json!({"status": {"error_code": 0}, "data": data})
}

/// CoinGecko `simple/price` body for `(id, price, market_cap)`.
pub fn gecko_prices(entries: &[(&str, f64, f64)]) -> Value {
    let data: serde_json::Map<String, Value> = entries
        .iter()
        .map(|(id, price, cap)| {
            (
                id.to_string(),
                json!({"usd": price, "usd_market_cap": cap}),
            )
        })
        .collect();
    Value::Object(data)
}
