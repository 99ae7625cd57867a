use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Which cascade step produced a quote.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum QuoteSource {
    /// Spot exchange ticker (comes with a historical series).
    Spot,
    /// Credentialed fallback metrics provider (quote only).
    FallbackMetrics,
    /// Free secondary metrics provider (quote only).
    SecondaryMetrics,
    /// Synthesized constant price for a pegged stable asset.
    Pegged,
}

impl std::fmt::Display for QuoteSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Spot => write!(f, "spot"),
            Self::FallbackMetrics => write!(f, "fallbackMetrics"),
            Self::SecondaryMetrics => write!(f, "secondaryMetrics"),
            Self::Pegged => write!(f, "pegged"),
        }
    }
}

/// Point-in-time market snapshot for one asset.
///
/// `price_usd` is always positive; providers that report zero or negative
/// prices are treated as having no data.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetQuote {
    /// Provider symbol the quote was fetched under
    pub symbol: String,

    /// Current price in USD
    pub price_usd: Decimal,

    /// 24h price change in percent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_24h_pct: Option<Decimal>,

    /// 24h traded volume
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume_24h_usd: Option<Decimal>,

    /// 24h high
    #[serde(skip_serializing_if = "Option::is_none")]
    pub high_24h: Option<Decimal>,

    /// 24h low
    #[serde(skip_serializing_if = "Option::is_none")]
    pub low_24h: Option<Decimal>,

    /// Market capitalization, usually backfilled by the enrichment pass
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_cap_usd: Option<Decimal>,

    /// Cascade step that produced this quote
    pub source: QuoteSource,

    /// When the quote was assembled
    pub fetched_at: DateTime<Utc>,
}

impl AssetQuote {
    /// Create a price-only quote.
    ///
    /// Returns `None` for non-positive prices.
    pub fn new(symbol: impl Into<String>, price_usd: Decimal, source: QuoteSource) -> Option<Self> {
        if price_usd <= Decimal::ZERO {
            return None;
        }
        Some(Self {
            symbol: symbol.into(),
            price_usd,
            change_24h_pct: None,
            volume_24h_usd: None,
            high_24h: None,
            low_24h: None,
            market_cap_usd: None,
            source,
            fetched_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_quote_new() {
        let quote = AssetQuote::new("BTCUSDT", dec!(64250.10), QuoteSource::Spot).unwrap();
        assert_eq!(quote.price_usd, dec!(64250.10));
        assert_eq!(quote.source, QuoteSource::Spot);
        assert!(quote.market_cap_usd.is_none());
    }

    #[test]
    fn test_quote_rejects_non_positive_price() {
        assert!(AssetQuote::new("X", Decimal::ZERO, QuoteSource::SecondaryMetrics).is_none());
        assert!(AssetQuote::new("X", dec!(-1), QuoteSource::SecondaryMetrics).is_none());
    }

    #[test]
    fn test_source_display() {
        assert_eq!(QuoteSource::FallbackMetrics.to_string(), "fallbackMetrics");
        assert_eq!(QuoteSource::SecondaryMetrics.to_string(), "secondaryMetrics");
    }
}
