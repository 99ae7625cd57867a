use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Serialize;

use super::diagnostics::FetchDiagnostics;
use crate::models::{AssetId, AssetQuote, OhlcvSeries};

/// Quote plus history (history only for spot and pegged assets).
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetData {
    pub quote: AssetQuote,
    pub history: Option<OhlcvSeries>,
}

/// Outcome of one batch fetch.
///
/// An asset missing from the result means every provider failed for it;
/// its diagnostics say why. Absence never stands for a zero value.
#[derive(Clone, Debug, Default)]
pub struct BatchResult {
    assets: HashMap<AssetId, AssetData>,
    order: Vec<AssetId>,
    diagnostics: HashMap<AssetId, FetchDiagnostics>,
}

impl BatchResult {
    /// `order` holds the unique requested IDs.
    pub(crate) fn new(order: Vec<AssetId>) -> Self {
        Self {
            assets: HashMap::new(),
            order,
            diagnostics: HashMap::new(),
        }
    }

    pub(crate) fn record(
        &mut self,
        asset_id: AssetId,
        data: Option<AssetData>,
        diagnostics: FetchDiagnostics,
    ) {
        if let Some(data) = data {
            self.assets.insert(asset_id.clone(), data);
        }
        self.diagnostics.insert(asset_id, diagnostics);
    }

    pub(crate) fn set_market_cap(&mut self, asset_id: &str, market_cap: Decimal) -> bool {
        match self.assets.get_mut(asset_id) {
            Some(data) if data.quote.market_cap_usd.is_none() => {
                data.quote.market_cap_usd = Some(market_cap);
                true
            }
            _ => false,
        }
    }

    /// Unique asset IDs requested.
    pub fn requested(&self) -> usize {
        self.order.len()
    }

    /// Assets that produced data.
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    pub fn get(&self, asset_id: &str) -> Option<&AssetData> {
        self.assets.get(asset_id)
    }

    pub fn contains(&self, asset_id: &str) -> bool {
        self.assets.contains_key(asset_id)
    }

    /// Fetched assets in request order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AssetData)> {
        self.order
            .iter()
            .filter_map(|id| self.assets.get(id).map(|data| (id.as_str(), data)))
    }

    /// Requested IDs with no data, in request order.
    pub fn missing(&self) -> Vec<&str> {
        self.order
            .iter()
            .filter(|id| !self.assets.contains_key(id.as_str()))
            .map(String::as_str)
            .collect()
    }

    pub fn diagnostics(&self, asset_id: &str) -> Option<&FetchDiagnostics> {
        self.diagnostics.get(asset_id)
    }

    /// Share of requested assets that produced data, 1.0 for an empty request.
    pub fn success_rate(&self) -> f64 {
        if self.order.is_empty() {
            return 1.0;
        }
        self.assets.len() as f64 / self.order.len() as f64
    }

    pub fn into_assets(self) -> HashMap<AssetId, AssetData> {
        self.assets
    }
}
