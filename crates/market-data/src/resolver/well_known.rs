//! Built-in asset table.
//!
//! Maps asset IDs (the metrics provider's slugs, e.g. "bitcoin") to the
//! spot trading pair and the fallback provider's ticker. Loaded once via
//! `lazy_static`.

use std::collections::HashMap;

use lazy_static::lazy_static;

/// One row of the built-in table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct WellKnownAsset {
    /// Spot pair, `None` for pegged stables that are never traded against themselves
    pub spot: Option<&'static str>,
    /// Fallback metrics ticker
    pub ticker: &'static str,
    /// Pegged 1:1 to USD
    pub pegged: bool,
}

const fn traded(spot: &'static str, ticker: &'static str) -> WellKnownAsset {
    WellKnownAsset {
        spot: Some(spot),
        ticker,
        pegged: false,
    }
}

const fn pegged(ticker: &'static str) -> WellKnownAsset {
    WellKnownAsset {
        spot: None,
        ticker,
        pegged: true,
    }
}

const ENTRIES: &[(&str, WellKnownAsset)] = &[
    ("bitcoin", traded("BTCUSDT", "BTC")),
    ("ethereum", traded("ETHUSDT", "ETH")),
    ("binancecoin", traded("BNBUSDT", "BNB")),
    ("chainlink", traded("LINKUSDT", "LINK")),
    ("ondo-finance", traded("ONDOUSDT", "ONDO")),
    ("matic-network", traded("MATICUSDT", "MATIC")),
    ("polygon", traded("MATICUSDT", "MATIC")),
    ("cardano", traded("ADAUSDT", "ADA")),
    ("tron", traded("TRXUSDT", "TRX")),
    ("cosmos", traded("ATOMUSDT", "ATOM")),
    ("lido-dao", traded("LDOUSDT", "LDO")),
    ("blockstack", traded("STXUSDT", "STX")),
    ("render-token", traded("RNDRUSDT", "RNDR")),
    ("pancakeswap-token", traded("CAKEUSDT", "CAKE")),
    ("fetch-ai", traded("FETUSDT", "FET")),
    ("pyth-network", traded("PYTHUSDT", "PYTH")),
    ("tether", pegged("USDT")),
    ("usd-coin", pegged("USDC")),
];

lazy_static! {
    pub(crate) static ref WELL_KNOWN: HashMap<&'static str, WellKnownAsset> =
        ENTRIES.iter().copied().collect();
}

pub(crate) fn lookup(asset_id: &str) -> Option<&'static WellKnownAsset> {
    WELL_KNOWN.get(asset_id)
}
