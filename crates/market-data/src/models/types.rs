use std::borrow::Cow;

/// Provider identifier - static constants like "BINANCE"
pub type ProviderId = Cow<'static, str>;

/// Canonical asset identifier (metrics-provider id, e.g. "bitcoin")
pub type AssetId = String;

/// Provider-specific symbol (e.g. "BTCUSDT" on the spot provider)
pub type ProviderSymbol = String;
