//! Error types and retry classification for the market data crate.
//!
//! This module provides:
//! - [`MarketDataError`]: The main error enum for all market data operations
//! - [`RetryClass`]: Classification for determining retry behavior

mod retry;

pub use retry::RetryClass;

use thiserror::Error;

/// Errors that can occur during market data operations.
///
/// Each variant is classified into a [`RetryClass`] via the [`retry_class`](Self::retry_class)
/// method, which determines how the provider client handles the error.
#[derive(Error, Debug)]
pub enum MarketDataError {
    /// The request never produced an HTTP response (connect failure, timeout).
    #[error("Transport error: {provider} - {message}")]
    Transport {
        /// The provider being called
        provider: String,
        /// Underlying error description
        message: String,
        /// Whether the per-request timeout fired
        timed_out: bool,
    },

    /// The provider answered with a status other than 200 or 429.
    #[error("HTTP {status} from {provider}")]
    HttpStatus {
        /// The provider that returned the status
        provider: String,
        /// The HTTP status code
        status: u16,
    },

    /// The provider rate limited the request (HTTP 429).
    #[error("Rate limited: {provider}")]
    RateLimited {
        /// The provider that rate limited the request
        provider: String,
    },

    /// The response body was not the JSON shape we expected.
    #[error("Decode error: {provider} - {message}")]
    Decode {
        /// The provider whose payload failed to decode
        provider: String,
        /// The decoder error message
        message: String,
    },

    /// Every attempt for one request failed.
    #[error("Request to {provider} failed after {attempts} attempt(s): {last_error}")]
    RetriesExhausted {
        /// The provider being called
        provider: String,
        /// Number of attempts performed
        attempts: u32,
        /// Display form of the last attempt's error
        last_error: String,
    },

    /// The provider does not know the requested symbol.
    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    /// The historical series was shorter than the configured minimum.
    #[error("Insufficient history: need {required} periods, got {found}")]
    InsufficientHistory {
        /// Minimum periods required
        required: usize,
        /// Usable periods returned by the provider
        found: usize,
    },

    /// The provider needs a credential that wasn't configured.
    #[error("Missing credential for provider: {provider}")]
    MissingCredential {
        /// The credentialed provider
        provider: String,
    },

    /// The batch deadline passed before the work finished.
    #[error("Deadline exceeded")]
    DeadlineExceeded,

    /// The supplied configuration is unusable.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl MarketDataError {
    /// Returns the retry classification for this error.
    ///
    /// # Examples
    ///
    /// ```
    /// use coinwatch_market_data::errors::{MarketDataError, RetryClass};
    ///
    /// let error = MarketDataError::RateLimited { provider: "COINGECKO".to_string() };
    /// assert_eq!(error.retry_class(), RetryClass::RateLimited);
    ///
    /// let error = MarketDataError::SymbolNotFound("NOPE".to_string());
    /// assert_eq!(error.retry_class(), RetryClass::Terminal);
    /// ```
    pub fn retry_class(&self) -> RetryClass {
        match self {
            Self::Transport { .. } | Self::HttpStatus { .. } | Self::Decode { .. } => {
                RetryClass::Transient
            }

            Self::RateLimited { .. } => RetryClass::RateLimited,

            Self::RetriesExhausted { .. }
            | Self::SymbolNotFound(_)
            | Self::InsufficientHistory { .. }
            | Self::MissingCredential { .. }
            | Self::DeadlineExceeded
            | Self::InvalidConfig(_) => RetryClass::Terminal,
        }
    }

    pub(crate) fn decode(provider: &str, message: impl Into<String>) -> Self {
        Self::Decode {
            provider: provider.to_string(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_errors_are_transient() {
        let error = MarketDataError::Transport {
            provider: "BINANCE".to_string(),
            message: "connection refused".to_string(),
            timed_out: false,
        };
        assert_eq!(error.retry_class(), RetryClass::Transient);
    }

    #[test]
    fn test_bad_status_and_decode_are_transient() {
        let error = MarketDataError::HttpStatus {
            provider: "BINANCE".to_string(),
            status: 502,
        };
        assert_eq!(error.retry_class(), RetryClass::Transient);

        let error = MarketDataError::decode("COINGECKO", "expected value at line 1");
        assert_eq!(error.retry_class(), RetryClass::Transient);
    }

    #[test]
    fn test_rate_limited_goes_through_backoff() {
        let error = MarketDataError::RateLimited {
            provider: "COINMARKETCAP".to_string(),
        };
        assert_eq!(error.retry_class(), RetryClass::RateLimited);
    }

    #[test]
    fn test_terminal_errors() {
        let terminal = [
            MarketDataError::SymbolNotFound("X".to_string()),
            MarketDataError::MissingCredential {
                provider: "COINMARKETCAP".to_string(),
            },
            MarketDataError::InsufficientHistory {
                required: 50,
                found: 49,
            },
            MarketDataError::DeadlineExceeded,
            MarketDataError::InvalidConfig("retry_attempts must be > 0".to_string()),
        ];
        for error in terminal {
            assert_eq!(error.retry_class(), RetryClass::Terminal, "{}", error);
        }
    }

    #[test]
    fn test_error_display() {
        let error = MarketDataError::HttpStatus {
            provider: "BINANCE".to_string(),
            status: 404,
        };
        assert_eq!(format!("{}", error), "HTTP 404 from BINANCE");

        let error = MarketDataError::RetriesExhausted {
            provider: "COINGECKO".to_string(),
            attempts: 3,
            last_error: "Rate limited: COINGECKO".to_string(),
        };
        assert_eq!(
            format!("{}", error),
            "Request to COINGECKO failed after 3 attempt(s): Rate limited: COINGECKO"
        );
    }
}
