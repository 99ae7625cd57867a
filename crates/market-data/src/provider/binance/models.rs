//! Binance REST response structures.
//!
//! Binance encodes every price and quantity as a decimal string.

use serde::Deserialize;

/// Response from `ticker/price`.
#[derive(Debug, Deserialize)]
pub struct TickerPriceResponse {
    pub symbol: String,
    pub price: String,
}

/// Response from `ticker/24hr`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticker24hrResponse {
    pub symbol: String,
    pub last_price: String,
    pub price_change_percent: String,
    /// Base asset volume
    pub volume: String,
    /// Quote asset (USDT) volume
    #[serde(default)]
    pub quote_volume: Option<String>,
    pub high_price: String,
    pub low_price: String,
}
