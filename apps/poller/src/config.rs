use std::time::Duration;

use anyhow::{bail, Context};
use coinwatch_market_data::{OrchestratorConfig, SymbolMap};

const DEFAULT_ASSETS: &str = "bitcoin,ethereum,tether";
const DEFAULT_POLL_INTERVAL_SECS: u64 = 300;
const MIN_POLL_INTERVAL_SECS: u64 = 10;

pub struct Config {
    pub assets: Vec<String>,
    pub poll_interval: Duration,
    pub symbol_map: Option<SymbolMap>,
    pub orchestrator: OrchestratorConfig,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let assets: Vec<String> = get("COINWATCH_ASSETS")
            .unwrap_or_else(|| DEFAULT_ASSETS.to_string())
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();
        if assets.is_empty() {
            bail!("COINWATCH_ASSETS must list at least one asset id");
        }

        let poll_secs = parse_or(&get, "COINWATCH_POLL_INTERVAL_SECS", DEFAULT_POLL_INTERVAL_SECS)?;
        if poll_secs < MIN_POLL_INTERVAL_SECS {
            bail!(
                "COINWATCH_POLL_INTERVAL_SECS must be at least {}",
                MIN_POLL_INTERVAL_SECS
            );
        }

        let defaults = OrchestratorConfig::default();
        let orchestrator = OrchestratorConfig {
            retry_attempts: parse_or(&get, "COINWATCH_RETRY_ATTEMPTS", defaults.retry_attempts)?,
            retry_delay_seconds: parse_or(
                &get,
                "COINWATCH_RETRY_DELAY_SECS",
                defaults.retry_delay_seconds,
            )?,
            historical_periods: parse_or(
                &get,
                "COINWATCH_HISTORICAL_PERIODS",
                defaults.historical_periods,
            )?,
            min_data_periods: parse_or(
                &get,
                "COINWATCH_MIN_DATA_PERIODS",
                defaults.min_data_periods,
            )?,
            batch_deadline_seconds: get("COINWATCH_BATCH_DEADLINE_SECS")
                .map(|v| {
                    v.parse::<u64>()
                        .with_context(|| format!("Invalid COINWATCH_BATCH_DEADLINE_SECS: {}", v))
                })
                .transpose()?,
            credential: get("COINMARKETCAP_API_KEY"),
            ..defaults
        };
        orchestrator.validate()?;

        let symbol_map = get("COINWATCH_SYMBOL_MAP")
            .map(|raw| SymbolMap::parse(&raw))
            .transpose()?;

        Ok(Self {
            assets,
            poll_interval: Duration::from_secs(poll_secs),
            symbol_map,
            orchestrator,
        })
    }
}

fn parse_or<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match get(key) {
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("Invalid {}: {}", key, raw)),
        None => Ok(default),
    }
}
