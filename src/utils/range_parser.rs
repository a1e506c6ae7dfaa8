//! Range Parsing Utilities
//!
//! Converts heterogeneous "min–max" measurement strings (as found in the crop
//! dataset and in upstream climate summaries) into single numeric values.
//!
//! Malformed input never fails: it degrades to `f64::NAN`, which callers must
//! filter before anything reaches the scaling transform.

use regex::Regex;
use serde_json::Value;
use smallvec::SmallVec;
use std::sync::OnceLock;

/// Signed decimal numbers. A hyphen directly after a digit is a range
/// separator ("20-35" is 20 and 35), so the sign is only taken when the
/// number starts the string or follows a non-numeric character.
fn number_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?:^|[^\d.])(-?\d+\.?\d*)").expect("number pattern compiles")
    })
}

/// Replace en/em dashes with an ASCII hyphen
fn normalize_dashes(raw: &str) -> String {
    raw.replace(['\u{2013}', '\u{2014}'], "-")
}

/// Extract every number present in a measurement string, in order of appearance
pub fn extract_numbers(raw: &str) -> SmallVec<[f64; 4]> {
    let normalized = normalize_dashes(raw);

    number_pattern()
        .captures_iter(&normalized)
        .filter_map(|cap| cap.get(1))
        .filter_map(|m| m.as_str().parse::<f64>().ok())
        .collect()
}

/// Parse a measurement string into a single value
///
/// - one number: returned as-is ("150 cm" -> 150)
/// - two numbers: their mean ("60–80 %" -> 70)
/// - anything else: `f64::NAN`
pub fn parse_range(raw: &str) -> f64 {
    let numbers = extract_numbers(raw);
    match numbers.as_slice() {
        [single] => *single,
        [low, high] => (low + high) / 2.0,
        _ => f64::NAN,
    }
}

/// Parse a loosely typed measurement
///
/// Numbers pass through unchanged, strings go through [`parse_range`],
/// every other JSON shape is unparseable.
pub fn parse_range_value(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => parse_range(s),
        _ => f64::NAN,
    }
}

/// Split an interval string ("20–35 °C") into (min, max)
///
/// Uses the first two numbers found. A single number is treated as a
/// zero-width interval. Returns `None` when no number is present.
pub fn parse_interval(raw: &str) -> Option<(f64, f64)> {
    let numbers = extract_numbers(raw);
    match numbers.as_slice() {
        [] => None,
        [single] => Some((*single, *single)),
        [low, high, ..] => Some((*low, *high)),
    }
}
