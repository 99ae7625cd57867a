//! Market data provider implementations.
//!
//! This module contains:
//! - [`binance`]: spot exchange tickers and klines (primary source)
//! - [`coinmarketcap`]: credentialed, quota-metered metrics (fallback)
//! - [`coingecko`]: free market metrics (secondary source, dominance)
//! - [`alternative_me`]: sentiment index, uncached
//!
//! Every cached provider wraps a [`ProviderClient`](crate::client::ProviderClient)
//! with its own [`ProviderPolicy`](crate::client::ProviderPolicy), so each one
//! has private cache and spacing state.

pub mod alternative_me;
pub mod binance;
pub mod coingecko;
pub mod coinmarketcap;

use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::Value;

use crate::models::{AssetQuote, QuoteSource};

/// Quote fields reported by the metrics providers.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MetricsSnapshot {
    pub price_usd: Option<Decimal>,
    pub change_24h_pct: Option<Decimal>,
    pub volume_24h_usd: Option<Decimal>,
    pub market_cap_usd: Option<Decimal>,
}

impl MetricsSnapshot {
    /// `None` when the provider reported no usable price.
    pub fn into_quote(self, symbol: impl Into<String>, source: QuoteSource) -> Option<AssetQuote> {
        let mut quote = AssetQuote::new(symbol, self.price_usd?, source)?;
        quote.change_24h_pct = self.change_24h_pct;
        quote.volume_24h_usd = self.volume_24h_usd;
        quote.market_cap_usd = self.market_cap_usd.filter(|cap| *cap > Decimal::ZERO);
        Some(quote)
    }
}

/// Coerce a JSON number or numeric string into a decimal.
pub(crate) fn json_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::String(s) => parse_decimal(s),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(Decimal::from(i))
            } else {
                n.as_f64().and_then(|f| Decimal::try_from(f).ok())
            }
        }
        _ => None,
    }
}

pub(crate) fn parse_decimal(s: &str) -> Option<Decimal> {
    let s = s.trim();
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .ok()
}
