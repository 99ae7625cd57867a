//! Provider-specific hooks for the shared request loop.

use std::time::Duration;

use super::config::ProviderConfig;

/// What differs between providers once caching, spacing and retries are
/// shared: the headers sent with each request and how a 429 is handled.
pub trait ProviderPolicy: Send + Sync {
    /// Constant identifier used in logs and errors, e.g. "BINANCE".
    fn id(&self) -> &'static str;

    /// Headers to attach to every request.
    fn prepare_headers(&self, config: &ProviderConfig) -> Vec<(&'static str, String)> {
        let _ = config;
        Vec::new()
    }

    /// Backoff to sleep after the `attempt`-th request (1-based) was rate
    /// limited, or `None` to stop retrying.
    fn on_rate_limited(&self, attempt: u32) -> Option<Duration>;
}

/// Backoff schedule applied to HTTP 429 responses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backoff {
    /// `base * attempt`.
    Linear { base: Duration },
    /// `base * 2^(attempt - 1)`; gives up once the delay would exceed `max`.
    Exponential { base: Duration, max: Duration },
}

impl Backoff {
    pub fn delay(&self, attempt: u32) -> Option<Duration> {
        let attempt = attempt.max(1);
        match *self {
            Self::Linear { base } => Some(base * attempt),
            Self::Exponential { base, max } => {
                let factor = 2u32.checked_pow(attempt - 1)?;
                let delay = base.checked_mul(factor)?;
                (delay <= max).then_some(delay)
            }
        }
    }
}
