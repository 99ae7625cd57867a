//! Asset ID to provider symbol resolution.
//!
//! Each provider speaks its own identifier space:
//!
//! | Provider          | Identifier                 | Example   |
//! |-------------------|----------------------------|-----------|
//! | spot exchange     | USDT trading pair          | `BTCUSDT` |
//! | fallback metrics  | ticker                     | `BTC`     |
//! | secondary metrics | asset ID itself            | `bitcoin` |
//!
//! # Resolution Precedence
//!
//! 1. **Override** from a caller-supplied [`SymbolMap`]. The fallback ticker
//!    is derived by stripping the pair's `USDT` suffix.
//! 2. **Well-known** built-in table.
//! 3. Otherwise there is no spot or fallback symbol. Unknown IDs still get
//!    one lookup on the secondary metrics provider.

mod symbol_map;
mod well_known;

pub use symbol_map::SymbolMap;

use crate::models::ProviderSymbol;

const SPOT_QUOTE_ASSET: &str = "USDT";

/// Where a provider symbol came from.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ResolutionSource {
    /// From the caller's [`SymbolMap`]
    Override,
    /// From the built-in asset table
    WellKnown,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ResolvedSymbol {
    pub symbol: ProviderSymbol,
    pub source: ResolutionSource,
}

impl ResolvedSymbol {
    fn new(symbol: impl Into<ProviderSymbol>, source: ResolutionSource) -> Self {
        Self {
            symbol: symbol.into(),
            source,
        }
    }
}

/// Resolves asset IDs for one batch, optionally with caller overrides.
#[derive(Clone, Copy, Debug, Default)]
pub struct SymbolResolver<'a> {
    overrides: Option<&'a SymbolMap>,
}

impl<'a> SymbolResolver<'a> {
    pub fn new(overrides: Option<&'a SymbolMap>) -> Self {
        Self { overrides }
    }

    fn override_for(&self, asset_id: &str) -> Option<&'a str> {
        self.overrides.and_then(|map| map.get(asset_id))
    }

    /// Spot trading pair for `asset_id`.
    pub fn spot_symbol(&self, asset_id: &str) -> Option<ResolvedSymbol> {
        if let Some(symbol) = self.override_for(asset_id) {
            return Some(ResolvedSymbol::new(symbol, ResolutionSource::Override));
        }
        well_known::lookup(asset_id)
            .and_then(|asset| asset.spot)
            .map(|symbol| ResolvedSymbol::new(symbol, ResolutionSource::WellKnown))
    }

    /// Fallback metrics ticker for `asset_id`.
    pub fn fallback_symbol(&self, asset_id: &str) -> Option<ResolvedSymbol> {
        if let Some(symbol) = self.override_for(asset_id) {
            let ticker = symbol.strip_suffix(SPOT_QUOTE_ASSET).unwrap_or(symbol);
            if !ticker.is_empty() {
                return Some(ResolvedSymbol::new(ticker, ResolutionSource::Override));
            }
        }
        well_known::lookup(asset_id)
            .map(|asset| ResolvedSymbol::new(asset.ticker, ResolutionSource::WellKnown))
    }

    /// Secondary metrics providers are keyed by the asset ID itself.
    pub fn metrics_id<'s>(&self, asset_id: &'s str) -> &'s str {
        asset_id
    }

    /// Known USD-pegged stable (served without network calls).
    pub fn is_pegged(&self, asset_id: &str) -> bool {
        well_known::lookup(asset_id).is_some_and(|asset| asset.pegged)
    }
}

/// Asset IDs of the built-in table, sorted.
pub fn supported_assets() -> Vec<&'static str> {
    let mut ids: Vec<&'static str> = well_known::WELL_KNOWN.keys().copied().collect();
    ids.sort_unstable();
    ids
}

/// Whether `asset_id` is in the built-in table.
pub fn is_supported(asset_id: &str) -> bool {
    well_known::lookup(asset_id).is_some()
}
