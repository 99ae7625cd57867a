//! Coinwatch Market Data Crate
//!
//! This crate acquires near-real-time and historical crypto price data from
//! several independent, rate-limited providers and normalizes it into one
//! shape.
//!
//! # Overview
//!
//! The market data crate supports:
//! - A spot exchange (tickers + daily klines), a free metrics provider and a
//!   credentialed fallback metrics provider
//! - Per-provider TTL caching, request spacing and bounded retries
//! - Minimum-period gating of historical series
//! - A priority cascade per asset with market cap enrichment
//!
//! # Architecture
//!
//! ```text
//! +------------------+     +------------------+
//! |     Caller       | --> |  Orchestrator    |  (cascade, enrichment, deadline)
//! +------------------+     +------------------+
//!                                  |
//!                                  v
//!                          +------------------+
//!                          |    Resolver      |  (asset id -> provider symbol)
//!                          +------------------+
//!                                  |
//!                                  v
//!                          +------------------+
//!                          |    Provider      |  (Binance, CMC, CoinGecko)
//!                          +------------------+
//!                                  |
//!                                  v
//!                         +-------------------+
//!                         |  ProviderClient   |  (cache, spacing, retries)
//!                         +-------------------+
//!                                  |
//!                                  v
//!                          +------------------+
//!                          |  HttpTransport   |  (reqwest)
//!                          +------------------+
//! ```
//!
//! # Core Types
//!
//! - [`MarketDataOrchestrator`] - Batch fetching across providers
//! - [`AssetQuote`] - Point-in-time quote tagged with its [`QuoteSource`]
//! - [`OhlcvSeries`] - Gated, strictly ordered candle history
//! - [`BatchResult`] - Per-asset data plus [`FetchDiagnostics`]
//! - [`SymbolMap`] - Caller overrides for spot pairs

pub mod client;
pub mod errors;
pub mod history;
pub mod models;
pub mod orchestrator;
pub mod provider;
pub mod resolver;

#[cfg(test)]
mod test_support;

pub use errors::{MarketDataError, RetryClass};

pub use models::{
    AssetId, AssetQuote, MarketOverview, OhlcvRow, OhlcvSeries, ProviderId, ProviderSymbol,
    QuoteSource, SentimentIndex,
};

pub use client::{HttpTransport, ProviderConfig, ReqwestTransport};

pub use orchestrator::{
    AssetData, BatchResult, ConnectionReport, FetchDiagnostics, MarketDataOrchestrator,
    OrchestratorConfig, ProviderAttempt, ProviderClients, SkipReason,
};

pub use provider::alternative_me::SentimentClient;
pub use provider::binance::BinanceClient;
pub use provider::coingecko::CoinGeckoClient;
pub use provider::coinmarketcap::CoinMarketCapClient;

pub use resolver::{ResolutionSource, ResolvedSymbol, SymbolMap, SymbolResolver};
