//! Shared HTTP client for rate-limited JSON providers.
//!
//! This module contains:
//! - [`ProviderClient`]: cache check, request spacing, bounded retries,
//!   provider-specific 429 handling and JSON decoding in one loop
//! - [`ProviderPolicy`]: the per-provider hooks (headers, 429 backoff)
//! - [`RateLimitedCache`]: per-client TTL cache and spacing state
//! - [`HttpTransport`]: the network seam
//!
//! # Request Flow
//!
//! ```text
//! make_request(endpoint, params)
//!     │
//!     ├─ cache hit ──────────────────────────────► payload
//!     │
//!     ├─ wait_for_slot()
//!     │
//!     └─ attempt 1..=retry_attempts
//!           ├─ 200 + valid JSON ─► cache.put ────► payload
//!           ├─ 429 ─► policy.on_rate_limited ─► sleep | give up
//!           └─ other / bad JSON / transport error ─► sleep delay * attempt
//! ```

mod cache;
mod config;
mod policy;
mod transport;

pub use cache::{CacheEntry, RateLimitedCache};
pub use config::{ProviderConfig, DEFAULT_REQUEST_TIMEOUT};
pub use policy::{Backoff, ProviderPolicy};
pub use transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport, TransportError};

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error, warn};

use crate::errors::{MarketDataError, RetryClass};

/// Build the canonical cache key: full URL plus params sorted by name,
/// then value, percent-encoded.
pub fn cache_key(base_url: &str, endpoint: &str, params: &[(&str, &str)]) -> String {
    let url = endpoint_url(base_url, endpoint);
    if params.is_empty() {
        return url;
    }

    let mut sorted: Vec<&(&str, &str)> = params.iter().collect();
    sorted.sort();

    let query = sorted
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");

    format!("{}?{}", url, query)
}

fn endpoint_url(base_url: &str, endpoint: &str) -> String {
    format!("{}/{}", base_url, endpoint.trim_start_matches('/'))
}

/// Generic provider client. Concrete providers wrap one of these and add
/// typed endpoint methods on top of [`make_request`](Self::make_request).
pub struct ProviderClient {
    config: ProviderConfig,
    policy: Box<dyn ProviderPolicy>,
    cache: RateLimitedCache,
    transport: Arc<dyn HttpTransport>,
}

impl ProviderClient {
    pub fn new(
        config: ProviderConfig,
        policy: Box<dyn ProviderPolicy>,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        let cache = RateLimitedCache::new(config.cache_ttl, config.min_request_interval);
        Self {
            config,
            policy,
            cache,
            transport,
        }
    }

    pub fn id(&self) -> &'static str {
        self.policy.id()
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    pub fn cache(&self) -> &RateLimitedCache {
        &self.cache
    }

    /// GET `endpoint` with `params` and return the decoded JSON payload.
    ///
    /// Cache hits skip both the network and the rate limiter. Otherwise the
    /// caller waits for a request slot once, then up to `retry_attempts`
    /// attempts are made. Only successful payloads are cached.
    pub async fn make_request(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<Value, MarketDataError> {
        let key = cache_key(&self.config.base_url, endpoint, params);

        if let Some(payload) = self.cache.get(&key) {
            debug!("Using cached {} data for {}", self.id(), key);
            return Ok(payload);
        }

        self.cache.wait_for_slot().await;

        let request = HttpRequest {
            url: endpoint_url(&self.config.base_url, endpoint),
            query: params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            headers: self.policy.prepare_headers(&self.config),
            timeout: self.config.request_timeout,
        };

        let max_attempts = self.config.retry_attempts.max(1);
        let mut attempts = 0;
        let mut last_error: Option<MarketDataError> = None;

        while attempts < max_attempts {
            attempts += 1;
            let is_last = attempts == max_attempts;

            let err = match self.attempt(&request).await {
                Ok(payload) => {
                    self.cache.put(key, payload.clone());
                    return Ok(payload);
                }
                Err(e) => e,
            };

            match err.retry_class() {
                RetryClass::Terminal => return Err(err),
                RetryClass::RateLimited => {
                    if is_last {
                        last_error = Some(err);
                        break;
                    }
                    match self.policy.on_rate_limited(attempts) {
                        Some(backoff) => {
                            warn!(
                                "{} rate limit (attempt {}/{}), backing off for {:?}",
                                self.id(),
                                attempts,
                                max_attempts,
                                backoff
                            );
                            tokio::time::sleep(backoff).await;
                        }
                        None => {
                            error!(
                                "{} rate limit exceeded, giving up after {} attempt(s)",
                                self.id(),
                                attempts
                            );
                            last_error = Some(err);
                            break;
                        }
                    }
                }
                RetryClass::Transient => {
                    warn!(
                        "{} request to {} failed (attempt {}/{}): {}",
                        self.id(),
                        request.url,
                        attempts,
                        max_attempts,
                        err
                    );
                    if !is_last {
                        tokio::time::sleep(self.config.retry_delay_base * attempts).await;
                    }
                }
            }

            last_error = Some(err);
        }

        let last_error = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no attempt made".to_string());
        error!(
            "All {} attempt(s) failed for {}: {}",
            attempts, request.url, last_error
        );

        Err(MarketDataError::RetriesExhausted {
            provider: self.id().to_string(),
            attempts,
            last_error,
        })
    }

    async fn attempt(&self, request: &HttpRequest) -> Result<Value, MarketDataError> {
        let response = self.transport.get(request).await.map_err(|e| {
            MarketDataError::Transport {
                provider: self.id().to_string(),
                message: e.message,
                timed_out: e.timed_out,
            }
        })?;

        match response.status {
            200 => serde_json::from_str(&response.body)
                .map_err(|e| MarketDataError::decode(self.id(), e.to_string())),
            429 => Err(MarketDataError::RateLimited {
                provider: self.id().to_string(),
            }),
            status => Err(MarketDataError::HttpStatus {
                provider: self.id().to_string(),
                status,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use tokio::time::Instant;

    use super::*;
    use crate::test_support::{ok, refused, status, ScriptedTransport};

    struct TestPolicy {
        backoff: Backoff,
    }

    impl ProviderPolicy for TestPolicy {
        fn id(&self) -> &'static str {
            "TEST"
        }

        fn prepare_headers(&self, config: &ProviderConfig) -> Vec<(&'static str, String)> {
            config
                .credential
                .iter()
                .map(|key| ("X-Test-Key", key.clone()))
                .collect()
        }

        fn on_rate_limited(&self, attempt: u32) -> Option<Duration> {
            self.backoff.delay(attempt)
        }
    }

    fn config() -> ProviderConfig {
        ProviderConfig::new("https://api.test/v1")
            .with_retry(3, Duration::from_secs(1))
            .with_cache_ttl(Duration::from_secs(60))
            .with_min_request_interval(Duration::from_millis(500))
    }

    fn client(config: ProviderConfig, transport: Arc<ScriptedTransport>) -> ProviderClient {
        let policy = TestPolicy {
            backoff: Backoff::Exponential {
                base: Duration::from_secs(5),
                max: Duration::from_secs(10),
            },
        };
        ProviderClient::new(config, Box::new(policy), transport)
    }

    #[test]
    fn test_cache_key_sorts_and_encodes_params() {
        let a = cache_key("https://h/v1", "simple/price", &[("ids", "a,b"), ("vs", "usd")]);
        let b = cache_key("https://h/v1", "/simple/price", &[("vs", "usd"), ("ids", "a,b")]);
        assert_eq!(a, b);
        assert_eq!(a, "https://h/v1/simple/price?ids=a%2Cb&vs=usd");
        assert_eq!(cache_key("https://h/v1", "global", &[]), "https://h/v1/global");
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_hit_skips_network() {
        let transport = Arc::new(ScriptedTransport::new().on("/ping", vec![ok(r#"{"ok":1}"#)]));
        let client = client(config(), transport.clone());

        let first = client.make_request("ping", &[("a", "1")]).await.unwrap();
        let second = client.make_request("ping", &[("a", "1")]).await.unwrap();

        assert_eq!(first, json!({"ok": 1}));
        assert_eq!(first, second);
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_cache_refetches_once() {
        let transport = Arc::new(ScriptedTransport::new().on("/ping", vec![ok("1")]));
        let client = client(config(), transport.clone());

        client.make_request("ping", &[]).await.unwrap();
        tokio::time::advance(Duration::from_secs(61)).await;
        client.make_request("ping", &[]).await.unwrap();
        client.make_request("ping", &[]).await.unwrap();

        assert_eq!(transport.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_requests_are_spaced() {
        let transport = Arc::new(ScriptedTransport::new().on("/ping", vec![ok("1")]));
        let client = client(config(), transport.clone());

        let start = Instant::now();
        for n in 0..4 {
            let n = n.to_string();
            client.make_request("ping", &[("n", &n)]).await.unwrap();
        }

        assert_eq!(transport.call_count(), 4);
        assert!(start.elapsed() >= Duration::from_millis(1500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_bound_is_exact() {
        let transport = Arc::new(ScriptedTransport::new().on("/ping", vec![refused()]));
        let client = client(config().with_retry(4, Duration::from_secs(1)), transport.clone());

        let err = client.make_request("ping", &[]).await.unwrap_err();

        assert_eq!(transport.call_count(), 4);
        assert!(matches!(
            err,
            MarketDataError::RetriesExhausted { attempts: 4, .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_linear_delay_between_failed_attempts() {
        let transport = Arc::new(ScriptedTransport::new().on("/ping", vec![status(500)]));
        let client = client(config(), transport.clone());

        let start = Instant::now();
        client.make_request("ping", &[]).await.unwrap_err();

        // 1s after attempt 1, 2s after attempt 2, nothing after the last
        assert_eq!(start.elapsed(), Duration::from_secs(3));
        assert_eq!(transport.call_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_transient_failures() {
        let transport = Arc::new(
            ScriptedTransport::new().on("/ping", vec![status(502), ok("not json"), ok("[1,2]")]),
        );
        let client = client(config(), transport.clone());

        let payload = client.make_request("ping", &[]).await.unwrap();

        assert_eq!(payload, json!([1, 2]));
        assert_eq!(transport.call_count(), 3);
        assert_eq!(client.cache().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_uses_policy_backoff() {
        let transport =
            Arc::new(ScriptedTransport::new().on("/ping", vec![status(429), ok("true")]));
        let client = client(config(), transport.clone());

        let start = Instant::now();
        let payload = client.make_request("ping", &[]).await.unwrap();

        assert_eq!(payload, json!(true));
        assert_eq!(start.elapsed(), Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_gives_up_when_policy_declines() {
        let transport = Arc::new(ScriptedTransport::new().on("/ping", vec![status(429)]));
        // Backoff 5s then 10s, then the policy declines on attempt 3
        let client = client(config().with_retry(5, Duration::from_secs(1)), transport.clone());

        let err = client.make_request("ping", &[]).await.unwrap_err();

        assert_eq!(transport.call_count(), 3);
        assert!(matches!(
            err,
            MarketDataError::RetriesExhausted { attempts: 3, .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_are_not_cached() {
        let transport = Arc::new(ScriptedTransport::new().on("/ping", vec![status(503)]));
        let client = client(config().with_retry(1, Duration::ZERO), transport.clone());

        client.make_request("ping", &[]).await.unwrap_err();
        client.make_request("ping", &[]).await.unwrap_err();

        assert_eq!(transport.call_count(), 2);
        assert!(client.cache().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_headers_come_from_policy() {
        let transport = Arc::new(ScriptedTransport::new().on("/ping", vec![ok("1")]));
        let config = config().with_credential(Some("secret".to_string()));
        let client = client(config, transport.clone());

        client.make_request("ping", &[]).await.unwrap();

        let calls = transport.calls();
        assert_eq!(calls[0].headers, vec![("X-Test-Key", "secret".to_string())]);
        assert_eq!(calls[0].url, "https://api.test/v1/ping");
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_leave_consistent_cache() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .on_query("/item", "id", "0", vec![ok(r#"{"id":0,"v":"a"}"#)])
                .on_query("/item", "id", "1", vec![ok(r#"{"id":1,"v":"b"}"#)])
                .on_query("/item", "id", "2", vec![ok(r#"{"id":2,"v":"c"}"#)]),
        );
        let client = Arc::new(client(
            config().with_min_request_interval(Duration::from_millis(10)),
            transport.clone(),
        ));

        let tasks = (0..24).map(|n| {
            let client = client.clone();
            tokio::spawn(async move {
                let id = (n % 3).to_string();
                client.make_request("item", &[("id", &id)]).await
            })
        });
        let results = futures::future::join_all(tasks).await;

        for result in results {
            let payload = result.unwrap().unwrap();
            assert!(payload["v"].is_string());
        }

        assert_eq!(client.cache().len(), 3);
        for id in 0..3 {
            let id_str = id.to_string();
            let key = cache_key("https://api.test/v1", "item", &[("id", &id_str)]);
            let entry = client.cache().entry(&key).unwrap();
            assert_eq!(entry.payload["id"], json!(id));
        }
        // Some callers may race past an empty cache, but never more than one
        // network call per caller.
        assert!(transport.call_count() >= 3 && transport.call_count() <= 24);
    }
}
