//! Multi-provider batch fetching.
//!
//! # Per-asset cascade
//!
//! ```text
//! asset id
//!   │
//!   ├─ pegged stable ───────────────────────────► quote 1.0 + flat series
//!   │
//!   ├─ spot pair? ─► quote + klines + gate ─ ok ─► source = spot
//!   │                    │ fail / too short
//!   ├─ fallback enabled + ticker? ─► quote ─ ok ─► source = fallbackMetrics
//!   │                    │ fail
//!   ├─ secondary metrics by id ─► quote ──── ok ─► source = secondaryMetrics
//!   │                    │ fail
//!   └─ omitted (diagnostics record each step)
//! ```
//!
//! After the loop, quotes without a market cap are backfilled with one
//! batched request per metrics provider. A batch deadline cancels the
//! in-flight cascade, skips the remaining assets and the enrichment pass.

mod batch;
mod config;
mod diagnostics;

pub use batch::{AssetData, BatchResult};
pub use config::OrchestratorConfig;
pub use diagnostics::{FetchDiagnostics, ProviderAttempt, SkipReason};

use std::collections::HashSet;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};

use crate::client::{HttpTransport, ReqwestTransport};
use crate::errors::MarketDataError;
use crate::history::{normalize_klines, pegged_series};
use crate::models::{AssetId, AssetQuote, MarketOverview, QuoteSource, SentimentIndex};
use crate::provider::alternative_me::{self, SentimentClient};
use crate::provider::binance::{self, BinanceClient};
use crate::provider::coingecko::{self, CoinGeckoClient};
use crate::provider::coinmarketcap::{self, CoinMarketCapClient};
use crate::resolver::{self, SymbolMap, SymbolResolver};

const PEGGED_ID: &str = "PEGGED";
const BATCH_ID: &str = "BATCH";

/// Pair used to probe the spot provider.
const PROBE_SPOT_SYMBOL: &str = "BTCUSDT";

/// The provider clients an orchestrator drives.
pub struct ProviderClients {
    pub spot: BinanceClient,
    pub metrics: CoinGeckoClient,
    /// `None` disables the fallback step and its enrichment
    pub fallback: Option<CoinMarketCapClient>,
    pub sentiment: SentimentClient,
}

/// Which providers answered a probe request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionReport {
    pub spot: bool,
    pub metrics: bool,
    /// `None` when the fallback provider is disabled
    pub fallback: Option<bool>,
    pub sentiment: bool,
}

pub struct MarketDataOrchestrator {
    config: OrchestratorConfig,
    spot: BinanceClient,
    metrics: CoinGeckoClient,
    fallback: Option<CoinMarketCapClient>,
    sentiment: SentimentClient,
}

impl MarketDataOrchestrator {
    /// Orchestrator over the live provider APIs.
    pub fn new(config: OrchestratorConfig) -> Result<Self, MarketDataError> {
        Self::with_transport(config, Arc::new(ReqwestTransport::new()))
    }

    /// Orchestrator with default provider clients over `transport`.
    ///
    /// Without a credential the fallback provider stays disabled for the
    /// orchestrator's lifetime.
    pub fn with_transport(
        config: OrchestratorConfig,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self, MarketDataError> {
        config.validate()?;

        let fallback = match CoinMarketCapClient::new(config.fallback_config(), transport.clone()) {
            Ok(client) => Some(client),
            Err(MarketDataError::MissingCredential { provider }) => {
                info!(
                    "No credential for {}, fallback metrics disabled",
                    provider
                );
                None
            }
            Err(e) => return Err(e),
        };

        let clients = ProviderClients {
            spot: BinanceClient::new(config.spot_config(), transport.clone()),
            metrics: CoinGeckoClient::new(config.metrics_config(), transport.clone()),
            fallback,
            sentiment: SentimentClient::new(transport),
        };
        Self::with_clients(config, clients)
    }

    pub fn with_clients(
        config: OrchestratorConfig,
        clients: ProviderClients,
    ) -> Result<Self, MarketDataError> {
        config.validate()?;
        Ok(Self {
            config,
            spot: clients.spot,
            metrics: clients.metrics,
            fallback: clients.fallback,
            sentiment: clients.sentiment,
        })
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn has_fallback(&self) -> bool {
        self.fallback.is_some()
    }

    /// Fetch every asset, bounded by the configured batch deadline if any.
    pub async fn fetch_batch<S: AsRef<str>>(
        &self,
        asset_ids: &[S],
        symbol_map: Option<&SymbolMap>,
    ) -> BatchResult {
        let deadline = self.config.batch_deadline().map(|d| Instant::now() + d);
        self.run_batch(asset_ids, symbol_map, deadline).await
    }

    /// Fetch every asset, giving up on whatever is unfinished at `deadline`.
    pub async fn fetch_batch_until<S: AsRef<str>>(
        &self,
        asset_ids: &[S],
        symbol_map: Option<&SymbolMap>,
        deadline: Instant,
    ) -> BatchResult {
        self.run_batch(asset_ids, symbol_map, Some(deadline)).await
    }

    async fn run_batch<S: AsRef<str>>(
        &self,
        asset_ids: &[S],
        symbol_map: Option<&SymbolMap>,
        deadline: Option<Instant>,
    ) -> BatchResult {
        let mut seen = HashSet::new();
        let unique: Vec<AssetId> = asset_ids
            .iter()
            .map(|id| id.as_ref().trim().to_string())
            .filter(|id| !id.is_empty() && seen.insert(id.clone()))
            .collect();

        let resolver = SymbolResolver::new(symbol_map);
        let mut result = BatchResult::new(unique.clone());

        let outcomes: Vec<_> = stream::iter(
            unique
                .iter()
                .map(|id| self.fetch_asset_bounded(id, &resolver, deadline)),
        )
        .buffered(self.config.max_concurrency.max(1))
        .collect()
        .await;

        for (asset_id, (data, diagnostics)) in unique.into_iter().zip(outcomes) {
            if data.is_none() {
                warn!("No data for {}: {}", asset_id, diagnostics.summary());
            }
            result.record(asset_id, data, diagnostics);
        }

        match deadline {
            Some(deadline) if Instant::now() >= deadline => {
                warn!("Batch deadline reached, skipping market cap enrichment");
            }
            Some(deadline) => {
                if timeout_at(deadline, self.enrich_market_caps(&mut result, &resolver))
                    .await
                    .is_err()
                {
                    warn!("Batch deadline reached during market cap enrichment");
                }
            }
            None => self.enrich_market_caps(&mut result, &resolver).await,
        }

        let rate = result.success_rate();
        info!(
            "Fetched {}/{} asset(s), success rate {:.1}%",
            result.len(),
            result.requested(),
            rate * 100.0
        );
        if rate < 0.5 {
            warn!("Low batch success rate: {:.1}%", rate * 100.0);
        }

        result
    }

    async fn fetch_asset_bounded(
        &self,
        asset_id: &str,
        resolver: &SymbolResolver<'_>,
        deadline: Option<Instant>,
    ) -> (Option<AssetData>, FetchDiagnostics) {
        let mut diagnostics = FetchDiagnostics::new();

        // Pegged assets need no network and are served even past the deadline
        if resolver.is_pegged(asset_id) {
            let data = self.pegged_asset(asset_id, resolver);
            diagnostics.record_success(PEGGED_ID);
            return (data, diagnostics);
        }

        let Some(deadline) = deadline else {
            let data = self.fetch_asset(asset_id, resolver, &mut diagnostics).await;
            return (data, diagnostics);
        };

        if Instant::now() >= deadline {
            diagnostics.record_skip(BATCH_ID, SkipReason::DeadlineExceeded);
            return (None, diagnostics);
        }

        let outcome = timeout_at(
            deadline,
            self.fetch_asset(asset_id, resolver, &mut diagnostics),
        )
        .await;

        match outcome {
            Ok(data) => (data, diagnostics),
            Err(_) => {
                warn!("Batch deadline reached while fetching {}", asset_id);
                diagnostics.record_skip(BATCH_ID, SkipReason::DeadlineExceeded);
                (None, diagnostics)
            }
        }
    }

    fn pegged_asset(&self, asset_id: &str, resolver: &SymbolResolver<'_>) -> Option<AssetData> {
        let symbol = resolver
            .fallback_symbol(asset_id)
            .map(|r| r.symbol)
            .unwrap_or_else(|| asset_id.to_uppercase());
        let mut quote = AssetQuote::new(symbol, Decimal::ONE, QuoteSource::Pegged)?;
        quote.change_24h_pct = Some(Decimal::ZERO);

        debug!("Serving {} as a pegged stable", asset_id);
        Some(AssetData {
            history: Some(pegged_series(
                Decimal::ONE,
                self.config.min_data_periods,
                quote.fetched_at,
            )),
            quote,
        })
    }

    /// Run the provider cascade for one non-pegged asset.
    async fn fetch_asset(
        &self,
        asset_id: &str,
        resolver: &SymbolResolver<'_>,
        diagnostics: &mut FetchDiagnostics,
    ) -> Option<AssetData> {
        match resolver.spot_symbol(asset_id) {
            Some(resolved) => match self.fetch_spot(&resolved.symbol).await {
                Ok(data) => {
                    info!("{}: spot data from {}", asset_id, binance::PROVIDER_ID);
                    diagnostics.record_success(binance::PROVIDER_ID);
                    return Some(data);
                }
                Err(MarketDataError::InsufficientHistory { required, found }) => {
                    diagnostics.record_skip(
                        binance::PROVIDER_ID,
                        SkipReason::InsufficientHistory { required, found },
                    );
                }
                Err(e) => {
                    debug!("{}: spot failed: {}", asset_id, e);
                    diagnostics.record_error(binance::PROVIDER_ID, e);
                }
            },
            None => diagnostics.record_skip(binance::PROVIDER_ID, SkipReason::NoSymbolMapping),
        }

        match (&self.fallback, resolver.fallback_symbol(asset_id)) {
            (None, _) => {
                diagnostics.record_skip(coinmarketcap::PROVIDER_ID, SkipReason::ProviderDisabled)
            }
            (Some(_), None) => {
                diagnostics.record_skip(coinmarketcap::PROVIDER_ID, SkipReason::NoSymbolMapping)
            }
            (Some(cmc), Some(resolved)) => {
                let ticker = resolved.symbol.to_uppercase();
                match cmc.quotes_latest(&[ticker.as_str()]).await {
                    Ok(mut quotes) => {
                        let quote = quotes
                            .remove(&ticker)
                            .and_then(|s| s.into_quote(ticker.as_str(), QuoteSource::FallbackMetrics));
                        match quote {
                            Some(quote) => {
                                info!("{}: quote from {}", asset_id, coinmarketcap::PROVIDER_ID);
                                diagnostics.record_success(coinmarketcap::PROVIDER_ID);
                                return Some(AssetData {
                                    quote,
                                    history: None,
                                });
                            }
                            None => diagnostics
                                .record_skip(coinmarketcap::PROVIDER_ID, SkipReason::NoData),
                        }
                    }
                    Err(e) => diagnostics.record_error(coinmarketcap::PROVIDER_ID, e),
                }
            }
        }

        let metrics_id = resolver.metrics_id(asset_id);
        match self.metrics.simple_prices(&[metrics_id], true).await {
            Ok(mut prices) => {
                let quote = prices
                    .remove(metrics_id)
                    .and_then(|s| s.into_quote(metrics_id, QuoteSource::SecondaryMetrics));
                match quote {
                    Some(quote) => {
                        info!("{}: quote from {}", asset_id, coingecko::PROVIDER_ID);
                        diagnostics.record_success(coingecko::PROVIDER_ID);
                        return Some(AssetData {
                            quote,
                            history: None,
                        });
                    }
                    None => diagnostics.record_skip(coingecko::PROVIDER_ID, SkipReason::NoData),
                }
            }
            Err(e) => diagnostics.record_error(coingecko::PROVIDER_ID, e),
        }

        None
    }

    /// Spot quote plus a gated history; both must succeed.
    async fn fetch_spot(&self, symbol: &str) -> Result<AssetData, MarketDataError> {
        let quote = self.spot.spot_quote(symbol).await?;
        let raw = self
            .spot
            .klines(
                symbol,
                &self.config.kline_interval,
                self.config.historical_periods,
            )
            .await?;
        let history = normalize_klines(&raw, self.config.min_data_periods)?;
        Ok(AssetData {
            quote,
            history: Some(history),
        })
    }

    /// Backfill missing market caps: one fallback request, then one
    /// secondary request for whatever is still missing. Failures are logged.
    async fn enrich_market_caps(&self, result: &mut BatchResult, resolver: &SymbolResolver<'_>) {
        let mut missing: Vec<AssetId> = result
            .iter()
            .filter(|(_, data)| {
                data.quote.market_cap_usd.is_none() && data.quote.source != QuoteSource::Pegged
            })
            .map(|(id, _)| id.to_string())
            .collect();

        if missing.is_empty() {
            return;
        }
        debug!("Enriching market cap for {} asset(s)", missing.len());

        if let Some(cmc) = &self.fallback {
            let tickers: Vec<(AssetId, String)> = missing
                .iter()
                .filter_map(|id| {
                    resolver
                        .fallback_symbol(id)
                        .map(|r| (id.clone(), r.symbol.to_uppercase()))
                })
                .collect();

            if !tickers.is_empty() {
                let symbols: Vec<&str> = tickers.iter().map(|(_, t)| t.as_str()).collect();
                match cmc.quotes_latest(&symbols).await {
                    Ok(snapshots) => {
                        for (id, ticker) in &tickers {
                            if let Some(cap) = snapshots
                                .get(ticker)
                                .and_then(|s| s.market_cap_usd)
                                .filter(|cap| *cap > Decimal::ZERO)
                            {
                                result.set_market_cap(id, cap);
                            }
                        }
                    }
                    Err(e) => warn!("Market cap enrichment via {} failed: {}", cmc.client().id(), e),
                }
            }

            missing.retain(|id| {
                result
                    .get(id)
                    .is_some_and(|data| data.quote.market_cap_usd.is_none())
            });
        }

        if missing.is_empty() {
            return;
        }

        let ids: Vec<&str> = missing.iter().map(|id| resolver.metrics_id(id)).collect();
        match self.metrics.simple_prices(&ids, false).await {
            Ok(snapshots) => {
                for id in &missing {
                    if let Some(cap) = snapshots
                        .get(resolver.metrics_id(id))
                        .and_then(|s| s.market_cap_usd)
                        .filter(|cap| *cap > Decimal::ZERO)
                    {
                        result.set_market_cap(id, cap);
                    }
                }
            }
            Err(e) => warn!(
                "Market cap enrichment via {} failed: {}",
                coingecko::PROVIDER_ID,
                e
            ),
        }
    }

    /// BTC dominance in percent: secondary metrics first, then fallback.
    pub async fn get_dominance(&self) -> Result<Decimal, MarketDataError> {
        match self.metrics.btc_dominance().await {
            Ok(dominance) => Ok(dominance),
            Err(e) => match &self.fallback {
                Some(cmc) => {
                    warn!("{} dominance failed ({}), trying fallback", coingecko::PROVIDER_ID, e);
                    cmc.btc_dominance().await
                }
                None => Err(e),
            },
        }
    }

    /// Price of `base` in units of `quote`, e.g. ETH/BTC.
    pub async fn get_ratio(&self, base: &str, quote: &str) -> Result<Decimal, MarketDataError> {
        let batch = self.fetch_batch(&[base, quote], None).await;
        let price = |id: &str| match batch.get(id) {
            Some(data) => Ok(data.quote.price_usd),
            None if batch.diagnostics(id).is_some_and(|d| d.hit_deadline()) => {
                Err(MarketDataError::DeadlineExceeded)
            }
            None => Err(MarketDataError::SymbolNotFound(id.to_string())),
        };
        let base_price = price(base)?;
        let quote_price = price(quote)?;
        base_price
            .checked_div(quote_price)
            .ok_or_else(|| MarketDataError::SymbolNotFound(quote.to_string()))
    }

    pub async fn get_sentiment_index(&self) -> Result<SentimentIndex, MarketDataError> {
        self.sentiment.fear_greed().await
    }

    /// Dominance and market caps: secondary metrics first, then fallback.
    pub async fn get_market_overview(&self) -> Result<MarketOverview, MarketDataError> {
        match self.metrics.global().await {
            Ok(overview) => Ok(overview),
            Err(e) => match &self.fallback {
                Some(cmc) => {
                    warn!("{} global data failed ({}), trying fallback", coingecko::PROVIDER_ID, e);
                    cmc.global_metrics().await
                }
                None => Err(e),
            },
        }
    }

    /// Probe each provider with one cheap request.
    pub async fn test_connection(&self) -> ConnectionReport {
        let spot = self.spot.ticker_price(PROBE_SPOT_SYMBOL).await.is_ok();
        let metrics = self.metrics.btc_dominance().await.is_ok();
        let fallback = match &self.fallback {
            Some(cmc) => Some(cmc.btc_dominance().await.is_ok()),
            None => None,
        };
        let sentiment = self.sentiment.fear_greed().await.is_ok();

        let report = ConnectionReport {
            spot,
            metrics,
            fallback,
            sentiment,
        };
        info!(
            "Connection test: {}={} {}={} {}={:?} {}={}",
            binance::PROVIDER_ID,
            report.spot,
            coingecko::PROVIDER_ID,
            report.metrics,
            coinmarketcap::PROVIDER_ID,
            report.fallback,
            alternative_me::PROVIDER_ID,
            report.sentiment
        );
        report
    }

    /// IDs of the built-in asset table.
    pub fn supported_assets(&self) -> Vec<&'static str> {
        resolver::supported_assets()
    }

    pub fn is_supported(&self, asset_id: &str) -> bool {
        resolver::is_supported(asset_id)
    }
}
