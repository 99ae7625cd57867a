//! Periodic polling loop.
//!
//! Each cycle fetches the configured batch plus the market-wide metrics and
//! logs the outcome. Cycles never overlap; a slow cycle delays the next one.

use std::sync::Arc;

use coinwatch_market_data::{BatchResult, MarketDataOrchestrator};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::Config;

/// Runs forever; the caller stops it by dropping the future.
pub async fn run_scheduler(orchestrator: Arc<MarketDataOrchestrator>, config: Arc<Config>) {
    info!(
        "Poller started ({}s interval, {} asset(s))",
        config.poll_interval.as_secs(),
        config.assets.len()
    );

    // First tick is immediate
    let mut ticker = interval(config.poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        run_cycle(&orchestrator, &config).await;
    }
}

/// Runs a single polling cycle.
async fn run_cycle(orchestrator: &MarketDataOrchestrator, config: &Config) {
    info!("Running polling cycle...");

    let batch = orchestrator
        .fetch_batch(&config.assets, config.symbol_map.as_ref())
        .await;
    log_batch(&batch);

    match orchestrator.get_dominance().await {
        Ok(dominance) => info!("BTC dominance: {}%", dominance.round_dp(2)),
        Err(e) => warn!("BTC dominance unavailable: {}", e),
    }

    match orchestrator.get_sentiment_index().await {
        Ok(index) => info!(
            "Fear & Greed index: {} ({})",
            index.value, index.classification
        ),
        Err(e) => warn!("Fear & Greed index unavailable: {}", e),
    }
}

fn log_batch(batch: &BatchResult) {
    for (asset_id, data) in batch.iter() {
        let quote = &data.quote;
        info!(
            "{}: ${} ({}) 24h {} mcap {} history {}",
            asset_id,
            quote.price_usd,
            quote.source,
            quote
                .change_24h_pct
                .map(|c| format!("{}%", c.round_dp(2)))
                .unwrap_or_else(|| "n/a".to_string()),
            quote
                .market_cap_usd
                .map(|c| c.round_dp(0).to_string())
                .unwrap_or_else(|| "n/a".to_string()),
            data.history
                .as_ref()
                .map(|h| h.len().to_string())
                .unwrap_or_else(|| "none".to_string()),
        );
    }

    for asset_id in batch.missing() {
        let trail = batch
            .diagnostics(asset_id)
            .map(|d| d.summary())
            .unwrap_or_default();
        warn!("{}: no data ({})", asset_id, trail);
    }

    let rate = batch.success_rate();
    if rate < 1.0 {
        warn!(
            "Polling cycle finished: {}/{} asset(s) ({:.0}%)",
            batch.len(),
            batch.requested(),
            rate * 100.0
        );
    } else {
        debug!("Polling cycle finished: all {} asset(s) fetched", batch.len());
    }
}
