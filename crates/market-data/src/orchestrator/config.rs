use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::client::ProviderConfig;
use crate::errors::MarketDataError;
use crate::provider::binance::{BinanceClient, MAX_KLINES};
use crate::provider::coingecko::CoinGeckoClient;
use crate::provider::coinmarketcap::CoinMarketCapClient;

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_delay_seconds() -> u64 {
    2
}

fn default_historical_periods() -> usize {
    500
}

fn default_min_data_periods() -> usize {
    50
}

fn default_kline_interval() -> String {
    "1d".to_string()
}

fn default_max_concurrency() -> usize {
    1
}

/// Orchestrator settings, fixed for the orchestrator's lifetime.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestratorConfig {
    /// Attempts per provider request (applies to every cached provider)
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Base of the linear delay between failed attempts
    #[serde(default = "default_retry_delay_seconds")]
    pub retry_delay_seconds: u64,

    /// Klines requested per spot asset
    #[serde(default = "default_historical_periods")]
    pub historical_periods: usize,

    /// Minimum klines for a series to be accepted
    #[serde(default = "default_min_data_periods")]
    pub min_data_periods: usize,

    /// Fallback metrics API key; `None` disables the fallback provider
    #[serde(default, skip_serializing)]
    pub credential: Option<String>,

    #[serde(default = "default_kline_interval")]
    pub kline_interval: String,

    /// Upper bound on one `fetch_batch` call
    #[serde(default)]
    pub batch_deadline_seconds: Option<u64>,

    /// Assets fetched concurrently; 1 keeps the batch sequential
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            retry_attempts: default_retry_attempts(),
            retry_delay_seconds: default_retry_delay_seconds(),
            historical_periods: default_historical_periods(),
            min_data_periods: default_min_data_periods(),
            credential: None,
            kline_interval: default_kline_interval(),
            batch_deadline_seconds: None,
            max_concurrency: default_max_concurrency(),
        }
    }
}

impl OrchestratorConfig {
    pub fn validate(&self) -> Result<(), MarketDataError> {
        if self.retry_attempts == 0 {
            return Err(MarketDataError::InvalidConfig(
                "retry_attempts must be at least 1".to_string(),
            ));
        }
        if self.min_data_periods == 0 {
            return Err(MarketDataError::InvalidConfig(
                "min_data_periods must be at least 1".to_string(),
            ));
        }
        if self.historical_periods < self.min_data_periods {
            return Err(MarketDataError::InvalidConfig(format!(
                "historical_periods ({}) is below min_data_periods ({})",
                self.historical_periods, self.min_data_periods
            )));
        }
        if self.historical_periods > MAX_KLINES {
            return Err(MarketDataError::InvalidConfig(format!(
                "historical_periods ({}) exceeds the spot provider limit of {}",
                self.historical_periods, MAX_KLINES
            )));
        }
        if self.kline_interval.trim().is_empty() {
            return Err(MarketDataError::InvalidConfig(
                "kline_interval must not be empty".to_string(),
            ));
        }
        if self.max_concurrency == 0 {
            return Err(MarketDataError::InvalidConfig(
                "max_concurrency must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_seconds)
    }

    pub fn batch_deadline(&self) -> Option<Duration> {
        self.batch_deadline_seconds.map(Duration::from_secs)
    }

    pub(crate) fn spot_config(&self) -> ProviderConfig {
        BinanceClient::default_config().with_retry(self.retry_attempts, self.retry_delay())
    }

    pub(crate) fn metrics_config(&self) -> ProviderConfig {
        CoinGeckoClient::default_config().with_retry(self.retry_attempts, self.retry_delay())
    }

    pub(crate) fn fallback_config(&self) -> ProviderConfig {
        CoinMarketCapClient::default_config()
            .with_retry(self.retry_attempts, self.retry_delay())
            .with_credential(self.credential.clone())
    }
}
