//! Historical series normalization.
//!
//! Turns a raw kline payload (array of arrays) into an [`OhlcvSeries`] and
//! enforces the minimum-period gate. A series shorter than the gate is
//! reported as [`MarketDataError::InsufficientHistory`] rather than handed
//! out partially.
//!
//! Expected row layout (trailing columns are ignored):
//!
//! ```text
//! [open_time_ms, open, high, low, close, volume, close_time_ms, ...]
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::MarketDataError;
use crate::models::{OhlcvRow, OhlcvSeries};
use crate::provider::json_decimal;

/// Volume assigned to every synthetic pegged candle.
pub const PEGGED_VOLUME: u32 = 1_000_000;

const KLINE_COLUMNS: usize = 6;

/// Normalize raw klines and apply the minimum-period gate.
///
/// Rows are sorted by open time and duplicate timestamps collapse to the
/// last occurrence. Rows that cannot be coerced are skipped with a warning.
pub fn normalize_klines(raw: &Value, min_periods: usize) -> Result<OhlcvSeries, MarketDataError> {
    let rows = raw
        .as_array()
        .ok_or_else(|| MarketDataError::decode("KLINES", "kline payload is not an array"))?;

    let mut by_time: BTreeMap<DateTime<Utc>, OhlcvRow> = BTreeMap::new();
    let mut skipped = 0usize;

    for (index, row) in rows.iter().enumerate() {
        match parse_row(row) {
            Some(parsed) => {
                by_time.insert(parsed.timestamp, parsed);
            }
            None => {
                skipped += 1;
                warn!("Skipping malformed kline row {}: {}", index, row);
            }
        }
    }

    let found = by_time.len();
    if found < min_periods {
        warn!(
            "Insufficient history: {} usable row(s), {} required",
            found, min_periods
        );
        return Err(MarketDataError::InsufficientHistory {
            required: min_periods,
            found,
        });
    }

    debug!(
        "Normalized {} kline row(s) ({} skipped, {} duplicate)",
        found,
        skipped,
        rows.len() - skipped - found
    );
    Ok(OhlcvSeries::from_sorted(by_time.into_values().collect()))
}

fn parse_row(row: &Value) -> Option<OhlcvRow> {
    let fields = row.as_array().filter(|f| f.len() >= KLINE_COLUMNS)?;

    let millis = match &fields[0] {
        Value::Number(n) if n.is_i64() => n.as_i64()?,
        other => i64::try_from(json_decimal(other)?.trunc()).ok()?,
    };
    let timestamp = Utc.timestamp_millis_opt(millis).single()?;

    Some(OhlcvRow {
        timestamp,
        open: json_decimal(&fields[1])?,
        high: json_decimal(&fields[2])?,
        low: json_decimal(&fields[3])?,
        close: json_decimal(&fields[4])?,
        volume: json_decimal(&fields[5])?,
    })
}

/// Flat daily series at `price`, `periods` candles long, the last one
/// opening at `end` truncated to midnight UTC.
pub fn pegged_series(price: Decimal, periods: usize, end: DateTime<Utc>) -> OhlcvSeries {
    let last_open = end
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|midnight| midnight.and_utc())
        .unwrap_or(end);

    let rows = (0..periods)
        .rev()
        .map(|days_back| OhlcvRow {
            timestamp: last_open - ChronoDuration::days(days_back as i64),
            open: price,
            high: price,
            low: price,
            close: price,
            volume: Decimal::from(PEGGED_VOLUME),
        })
        .collect();

    OhlcvSeries::from_sorted(rows)
}
