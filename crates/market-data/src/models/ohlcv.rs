use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

/// One historical candle.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OhlcvRow {
    /// Candle open time
    pub timestamp: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

/// Ordered candle series with strictly increasing timestamps.
///
/// Only the normalizer and the pegged-series builder in
/// [`history`](crate::history) create series, and both enforce the
/// minimum-period gate, so holding an `OhlcvSeries` means the data is long
/// enough for downstream indicator math.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(transparent)]
pub struct OhlcvSeries {
    rows: Vec<OhlcvRow>,
}

impl OhlcvSeries {
    /// Callers must hand over rows already sorted with unique timestamps.
    pub(crate) fn from_sorted(rows: Vec<OhlcvRow>) -> Self {
        debug_assert!(rows.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
        Self { rows }
    }

    pub fn rows(&self) -> &[OhlcvRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Most recent candle.
    pub fn last(&self) -> Option<&OhlcvRow> {
        self.rows.last()
    }

    /// Close prices, oldest first.
    pub fn closes(&self) -> Vec<Decimal> {
        self.rows.iter().map(|r| r.close).collect()
    }

    pub fn into_rows(self) -> Vec<OhlcvRow> {
        self.rows
    }
}
