use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::errors::MarketDataError;
use crate::models::{AssetId, ProviderSymbol};

/// User-supplied asset ID → spot pair overrides.
///
/// Parsed from `id=SYMBOL` pairs separated by commas, e.g.
/// `"bitcoin=BTCUSDT,sui=SUIUSDT"`. Symbols are stored upper-case.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SymbolMap {
    entries: HashMap<AssetId, ProviderSymbol>,
}

impl SymbolMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(input: &str) -> Result<Self, MarketDataError> {
        let mut map = Self::new();
        for pair in input.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (id, symbol) = pair
                .split_once('=')
                .map(|(id, symbol)| (id.trim(), symbol.trim()))
                .filter(|(id, symbol)| !id.is_empty() && !symbol.is_empty())
                .ok_or_else(|| {
                    MarketDataError::InvalidConfig(format!(
                        "symbol map entry '{}' is not of the form id=SYMBOL",
                        pair
                    ))
                })?;
            map.insert(id, symbol);
        }
        Ok(map)
    }

    pub fn insert(&mut self, asset_id: impl Into<AssetId>, symbol: impl AsRef<str>) {
        self.entries
            .insert(asset_id.into(), symbol.as_ref().to_uppercase());
    }

    pub fn get(&self, asset_id: &str) -> Option<&str> {
        self.entries.get(asset_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<AssetId>, V: AsRef<str>> FromIterator<(K, V)> for SymbolMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (id, symbol) in iter {
            map.insert(id, symbol);
        }
        map
    }
}
