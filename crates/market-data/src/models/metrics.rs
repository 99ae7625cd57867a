use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Market sentiment index (0 = extreme fear, 100 = extreme greed).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentimentIndex {
    pub value: u8,
    /// Label such as "Extreme Fear" or "Greed"
    pub classification: String,
    /// Unix timestamp (seconds) as reported by the index provider
    pub timestamp: String,
    /// Seconds until the next index update, when reported
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_until_update: Option<String>,
}

/// Market-wide dominance and capitalization snapshot.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketOverview {
    /// BTC share of total market cap, in percent
    pub btc_dominance: Option<Decimal>,
    pub btc_market_cap: Option<Decimal>,
    pub eth_market_cap: Option<Decimal>,
    /// Total crypto market capitalization in USD
    pub total_market_cap: Decimal,
}
