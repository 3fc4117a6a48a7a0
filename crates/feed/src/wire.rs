//! Wire format of the order book feed.
//!
//! Each text frame carries one full snapshot:
//!
//! ```json
//! {
//!   "timestamp": "2025-05-04T10:39:13Z",
//!   "exchange": "okx",
//!   "symbol": "BTC-USDT-SWAP",
//!   "asks": [["95445.5", "9.06"], ["95448", "2.05"]],
//!   "bids": [["95445.4", "1104.23"], ["95445.3", "0.02"]]
//! }
//! ```
//!
//! Prices and quantities arrive as strings; plain JSON numbers are accepted
//! too. Parsing either yields a validated [`Snapshot`] or a
//! [`SnapshotError`] describing why the single frame was rejected.

use algo_cost_core::{BookSide, PriceLevel, Snapshot, SnapshotError};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::{Map, Value};

/// Fields every frame must carry, checked in this order.
pub const REQUIRED_FIELDS: [&str; 5] = ["timestamp", "exchange", "symbol", "asks", "bids"];

/// Naive ISO-8601 layouts accepted when the timestamp carries no offset.
const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parses one text frame into a validated snapshot.
///
/// # Errors
/// Returns [`SnapshotError`] if the frame is not a JSON object, misses a
/// required field, or violates a book invariant.
pub fn parse_snapshot(text: &str) -> Result<Snapshot, SnapshotError> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| SnapshotError::Malformed(e.to_string()))?;

    let Value::Object(fields) = value else {
        return Err(SnapshotError::Malformed("expected a JSON object".to_string()));
    };

    for field in REQUIRED_FIELDS {
        if fields.get(field).map_or(true, Value::is_null) {
            return Err(SnapshotError::MissingField(field));
        }
    }

    let timestamp = parse_timestamp(string_field(&fields, "timestamp")?)?;
    let exchange = string_field(&fields, "exchange")?;
    let symbol = string_field(&fields, "symbol")?;
    let asks = parse_levels(&fields["asks"], BookSide::Ask)?;
    let bids = parse_levels(&fields["bids"], BookSide::Bid)?;

    Snapshot::new(timestamp, exchange, symbol, asks, bids)
}

/// Parses an ISO-8601 timestamp into UTC.
///
/// Accepts RFC 3339 (`Z` suffix or numeric offset) and naive timestamps,
/// which are taken to be UTC.
///
/// # Errors
/// Returns [`SnapshotError::InvalidTimestamp`] if no layout matches.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, SnapshotError> {
    let trimmed = raw.trim();

    if let Ok(ts) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(ts.with_timezone(&Utc));
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| SnapshotError::InvalidTimestamp(raw.to_string()))
}

fn string_field<'a>(
    fields: &'a Map<String, Value>,
    name: &'static str,
) -> Result<&'a str, SnapshotError> {
    fields[name].as_str().ok_or_else(|| SnapshotError::InvalidField {
        field: name,
        reason: "expected a string".to_string(),
    })
}

fn side_field(side: BookSide) -> &'static str {
    match side {
        BookSide::Ask => "asks",
        BookSide::Bid => "bids",
    }
}

fn parse_levels(value: &Value, side: BookSide) -> Result<Vec<PriceLevel>, SnapshotError> {
    let field = side_field(side);
    let rows = value.as_array().ok_or_else(|| SnapshotError::InvalidField {
        field,
        reason: "expected an array of [price, quantity] pairs".to_string(),
    })?;

    rows.iter()
        .enumerate()
        .map(|(index, row)| match row.as_array().map(Vec::as_slice) {
            Some([price, quantity]) => Ok(PriceLevel::new(
                parse_number(price, side)?,
                parse_number(quantity, side)?,
            )),
            _ => Err(SnapshotError::InvalidField {
                field,
                reason: format!("level {index} is not a [price, quantity] pair"),
            }),
        })
        .collect()
}

fn parse_number(value: &Value, side: BookSide) -> Result<f64, SnapshotError> {
    let parsed = match value {
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    };

    parsed.ok_or_else(|| SnapshotError::InvalidNumber {
        side,
        value: value.to_string(),
    })
}
