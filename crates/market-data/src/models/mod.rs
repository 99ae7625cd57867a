//! Market data models
//!
//! This module contains the core data types for market data operations:
//! - `types` - Type aliases for common identifiers (ProviderId, AssetId, ProviderSymbol)
//! - `quote` - Point-in-time quote snapshot (AssetQuote, QuoteSource)
//! - `ohlcv` - Historical candles (OhlcvRow, OhlcvSeries)
//! - `metrics` - Single market-wide metrics (SentimentIndex, MarketOverview)

mod metrics;
mod ohlcv;
mod quote;
mod types;

pub use metrics::{MarketOverview, SentimentIndex};
pub use ohlcv::{OhlcvRow, OhlcvSeries};
pub use quote::{AssetQuote, QuoteSource};
pub use types::{AssetId, ProviderId, ProviderSymbol};
