use coinwatch_market_data::MarketDataOrchestrator;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::Config;

pub fn init_tracing() {
    let log_format = std::env::var("COINWATCH_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init();
    }
}

pub fn build_orchestrator(config: &Config) -> anyhow::Result<MarketDataOrchestrator> {
    let orchestrator = MarketDataOrchestrator::new(config.orchestrator.clone())?;
    tracing::info!(
        "Tracking {} asset(s), fallback metrics {}",
        config.assets.len(),
        if orchestrator.has_fallback() {
            "enabled"
        } else {
            "disabled"
        }
    );

    for asset in &config.assets {
        let overridden = config
            .symbol_map
            .as_ref()
            .is_some_and(|map| map.get(asset).is_some());
        if !overridden && !orchestrator.is_supported(asset) {
            tracing::warn!(
                "{} has no built-in symbol mapping, only the secondary metrics provider will be tried",
                asset
            );
        }
    }

    Ok(orchestrator)
}
