//! Lenient coercion of numbers and dates
//!
//! Stored amounts may be missing or garbage. Every place that turns a raw
//! value into arithmetic goes through here, so bad data contributes zero
//! instead of poisoning a sum with NaN.

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

/// Finite value or zero.
pub fn to_finite_or_zero(value: Option<f64>) -> f64 {
    match value {
        Some(v) if v.is_finite() => v,
        _ => 0.0,
    }
}

/// Sum of coerced amounts. An empty input sums to `0.0`, never `-0.0`.
pub fn sum_finite<I>(values: I) -> f64
where
    I: IntoIterator<Item = Option<f64>>,
{
    values
        .into_iter()
        .map(to_finite_or_zero)
        .fold(0.0, |acc, v| acc + v)
}

/// Interpret a JSON value as a finite number.
///
/// Numbers and numeric strings are accepted. Anything else is `None`.
pub fn number_from_value(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };

    n.is_finite().then_some(n)
}

/// Strict `YYYY-MM-DD` parsing. Rejects unpadded months/days and trailing text.
pub fn parse_iso_date(input: &str) -> Option<NaiveDate> {
    let bytes = input.as_bytes();
    if bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
        return None;
    }

    let digits_ok = bytes
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != 4 && *i != 7)
        .all(|(_, b)| b.is_ascii_digit());
    if !digits_ok {
        return None;
    }

    NaiveDate::parse_from_str(input, ISO_DATE_FORMAT).ok()
}

/// Interpret a JSON value as a calendar date.
///
/// Accepts `YYYY-MM-DD` or an RFC 3339 timestamp (truncated to its date).
pub fn date_from_value(value: &Value) -> Option<NaiveDate> {
    let s = value.as_str()?.trim();

    parse_iso_date(s).or_else(|| {
        DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.date_naive())
    })
}

pub fn format_iso_date(date: NaiveDate) -> String {
    date.format(ISO_DATE_FORMAT).to_string()
}

// =============================
// Serde adapters
// =============================

/// `#[serde(default, deserialize_with = "lenient_f64")]` on `Option<f64>`.
pub fn lenient_f64<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(number_from_value))
}

/// Like [`lenient_f64`], but keeps "field was present" apart from "field was absent".
///
/// Use with `#[serde(default)]`: absent → `None`, present → `Some(coerced)`.
pub fn lenient_present_f64<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<Option<f64>>, D::Error>
where
    D: Deserializer<'de>,
{
    lenient_f64(deserializer).map(Some)
}

/// `#[serde(default, deserialize_with = "lenient_date")]` on `Option<NaiveDate>`.
pub fn lenient_date<'de, D>(deserializer: D) -> std::result::Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(date_from_value))
}
