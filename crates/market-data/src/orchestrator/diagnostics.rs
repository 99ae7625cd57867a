//! Per-asset cascade diagnostics.

use std::borrow::Cow;

use crate::models::ProviderId;

/// Why a cascade step was skipped without producing a quote.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// No provider symbol for this asset.
    NoSymbolMapping,

    /// Provider disabled for the orchestrator's lifetime (missing credential).
    ProviderDisabled,

    /// Spot klines were shorter than the minimum period gate.
    InsufficientHistory { required: usize, found: usize },

    /// Provider answered but had no usable data for this asset.
    NoData,

    /// Batch deadline reached before or during this step.
    DeadlineExceeded,
}

/// Record of a single provider step for one asset.
#[derive(Clone, Debug)]
pub struct ProviderAttempt {
    pub provider_id: ProviderId,
    pub skipped: Option<SkipReason>,
    pub error: Option<String>,
    pub success: bool,
}

/// Ordered trail of the cascade steps taken for one asset.
#[derive(Clone, Debug, Default)]
pub struct FetchDiagnostics {
    pub attempts: Vec<ProviderAttempt>,
}

impl FetchDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_skip(&mut self, provider_id: &'static str, reason: SkipReason) {
        self.attempts.push(ProviderAttempt {
            provider_id: Cow::Borrowed(provider_id),
            skipped: Some(reason),
            error: None,
            success: false,
        });
    }

    pub fn record_error(&mut self, provider_id: &'static str, error: impl ToString) {
        self.attempts.push(ProviderAttempt {
            provider_id: Cow::Borrowed(provider_id),
            skipped: None,
            error: Some(error.to_string()),
            success: false,
        });
    }

    pub fn record_success(&mut self, provider_id: &'static str) {
        self.attempts.push(ProviderAttempt {
            provider_id: Cow::Borrowed(provider_id),
            skipped: None,
            error: None,
            success: true,
        });
    }

    /// Summary for logging, e.g. `BINANCE: ERROR (...) -> COINGECKO: SUCCESS`.
    pub fn summary(&self) -> String {
        self.attempts
            .iter()
            .map(|a| {
                if a.success {
                    format!("{}: SUCCESS", a.provider_id)
                } else if let Some(skip) = &a.skipped {
                    format!("{}: SKIPPED ({:?})", a.provider_id, skip)
                } else if let Some(err) = &a.error {
                    format!("{}: ERROR ({})", a.provider_id, err)
                } else {
                    format!("{}: UNKNOWN", a.provider_id)
                }
            })
            .collect::<Vec<_>>()
            .join(" -> ")
    }

    pub fn has_success(&self) -> bool {
        self.attempts.iter().any(|a| a.success)
    }

    pub fn skip_reasons(&self) -> Vec<(&ProviderId, &SkipReason)> {
        self.attempts
            .iter()
            .filter_map(|a| a.skipped.as_ref().map(|s| (&a.provider_id, s)))
            .collect()
    }

    pub fn errors(&self) -> Vec<(&ProviderId, &str)> {
        self.attempts
            .iter()
            .filter_map(|a| a.error.as_ref().map(|e| (&a.provider_id, e.as_str())))
            .collect()
    }

    pub fn hit_deadline(&self) -> bool {
        self.attempts
            .iter()
            .any(|a| a.skipped == Some(SkipReason::DeadlineExceeded))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostics_summary() {
        let mut diag = FetchDiagnostics::new();
        diag.record_error("BINANCE", "HTTP 502 from BINANCE");
        diag.record_skip("COINMARKETCAP", SkipReason::ProviderDisabled);
        diag.record_success("COINGECKO");

        let summary = diag.summary();
        assert_eq!(
            summary,
            "BINANCE: ERROR (HTTP 502 from BINANCE) -> COINMARKETCAP: SKIPPED (ProviderDisabled) -> COINGECKO: SUCCESS"
        );
        assert!(diag.has_success());
    }

    #[test]
    fn test_skip_and_error_accessors() {
        let mut diag = FetchDiagnostics::new();
        diag.record_skip(
            "BINANCE",
            SkipReason::InsufficientHistory {
                required: 50,
                found: 12,
            },
        );
        diag.record_error("COINMARKETCAP", "Rate limited: COINMARKETCAP");
        diag.record_skip("COINGECKO", SkipReason::DeadlineExceeded);

        assert!(!diag.has_success());
        assert!(diag.hit_deadline());
        assert_eq!(diag.skip_reasons().len(), 2);
        assert_eq!(diag.errors()[0].1, "Rate limited: COINMARKETCAP");
    }
}
