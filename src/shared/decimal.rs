//! Decimal and timestamp helpers for loosely-typed venue responses.
//!
//! Venues mix JSON strings (`"0.5120"`) and numbers (`0.512`) for prices, and
//! seconds, milliseconds, nanoseconds or RFC 3339 strings for times.

use std::str::FromStr;

use chrono::DateTime;
use rust_decimal::Decimal;
use serde_json::Value;

/// Parse a decimal from a string, accepting scientific notation.
pub fn parse_decimal(s: &str) -> Option<Decimal> {
    let s = s.trim();
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .ok()
}

/// Read a decimal from a JSON string or number.
pub fn decimal_from_value(value: &Value) -> Option<Decimal> {
    match value {
        Value::String(s) => parse_decimal(s),
        Value::Number(n) => parse_decimal(&n.to_string()),
        _ => None,
    }
}

/// Read a float from a JSON string or number.
pub fn f64_from_value(value: &Value) -> Option<f64> {
    match value {
        Value::String(s) => s.trim().parse().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

/// Parse an RFC 3339 timestamp into fractional Unix seconds.
pub fn rfc3339_to_secs(s: &str) -> Option<f64> {
    let dt = DateTime::parse_from_rfc3339(s).ok()?;
    Some(dt.timestamp_millis() as f64 / 1000.0)
}

/// Format fractional Unix seconds as an RFC 3339 UTC string with a `Z` suffix.
pub fn secs_to_rfc3339(secs: f64) -> Option<String> {
    let dt = DateTime::from_timestamp_millis((secs * 1000.0) as i64)?;
    Some(dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string())
}
