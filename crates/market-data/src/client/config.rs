//! Per-provider client configuration.

use std::time::Duration;

/// Default per-request HTTP timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Connection, retry, cache and spacing settings for one provider client.
///
/// Built once when the orchestrator starts and never mutated afterwards;
/// the `with_*` helpers consume and return the config so it can be tuned
/// before it is handed to a client.
#[derive(Clone, Debug)]
pub struct ProviderConfig {
    /// Base URL without a trailing slash (e.g. "https://api.binance.com/api/v3").
    pub base_url: String,

    /// Total attempts per request, including the first one.
    pub retry_attempts: u32,

    /// Linear retry delay unit: attempt `n` waits `retry_delay_base * n`.
    pub retry_delay_base: Duration,

    /// How long a cached payload stays usable.
    pub cache_ttl: Duration,

    /// Minimum spacing between two outbound requests.
    pub min_request_interval: Duration,

    /// Timeout applied to each individual HTTP call.
    pub request_timeout: Duration,

    /// API key for credentialed providers.
    pub credential: Option<String>,
}

impl ProviderConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            retry_attempts: 3,
            retry_delay_base: Duration::from_secs(2),
            cache_ttl: Duration::from_secs(60),
            min_request_interval: Duration::from_secs(1),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            credential: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_retry(mut self, attempts: u32, delay_base: Duration) -> Self {
        self.retry_attempts = attempts;
        self.retry_delay_base = delay_base;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_min_request_interval(mut self, interval: Duration) -> Self {
        self.min_request_interval = interval;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Empty or whitespace-only keys count as no credential.
    pub fn with_credential(mut self, credential: Option<String>) -> Self {
        self.credential = credential
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());
        self
    }
}
