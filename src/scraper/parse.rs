//! Tolerant parsing of `key=value;key=value` info responses.
//!
//! Malformed pairs are skipped with a warning; parsing never aborts.

use std::borrow::Cow;
use std::collections::HashMap;
use std::num::{ParseFloatError, ParseIntError};

use thiserror::Error;

use crate::pdata::{NumberValue, ValueType};

/// Separator between fields in a stats blob.
pub const FIELD_DELIMITER: char = ';';

/// Separator between a key and its value.
pub const PAIR_DELIMITER: char = '=';

/// Field name to raw string value, parsed from one response entry.
pub type StatMap = HashMap<String, String>;

/// A value that is not a valid number for its metric.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConversionError {
    #[error("invalid integer: {0}")]
    Int(#[from] ParseIntError),

    #[error("invalid float: {0}")]
    Float(#[from] ParseFloatError),
}

/// Split a blob into pair strings on `delimiter`, usually [`FIELD_DELIMITER`].
pub fn split_fields(blob: &str, delimiter: char) -> impl Iterator<Item = &str> {
    blob.split(delimiter)
}

/// Split `key=value` into its parts; `None` unless there are exactly two.
pub fn split_pair(pair: &str) -> Option<(&str, &str)> {
    let mut parts = pair.split(PAIR_DELIMITER);
    match (parts.next(), parts.next(), parts.next()) {
        (Some(key), Some(value), None) => Some((key, value)),
        _ => None,
    }
}

/// Parse a delimited blob into a [`StatMap`].
///
/// Empty segments (e.g. a trailing delimiter) are ignored. Any other segment
/// that is not exactly `key=value` is logged and skipped.
pub fn parse_stats(blob: &str, delimiter: char) -> StatMap {
    let mut stats = StatMap::new();
    for pair in split_fields(blob, delimiter) {
        if pair.trim().is_empty() {
            continue;
        }
        match split_pair(pair) {
            Some((key, value)) => {
                stats.insert(key.to_owned(), value.to_owned());
            }
            None => {
                tracing::warn!(pair = %pair, "metric pair not in key=value format");
            }
        }
    }
    stats
}

/// Parse a `;`-separated list (e.g. namespace names), dropping empty entries.
pub fn parse_list(blob: &str) -> Vec<String> {
    split_fields(blob, FIELD_DELIMITER)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Decode raw bytes as text, replacing invalid sequences with U+FFFD.
pub fn sanitize_utf8(bytes: &[u8]) -> Cow<'_, str> {
    String::from_utf8_lossy(bytes)
}

/// Convert a decimal string into the representation `value_type` requires.
pub fn try_convert(value: &str, value_type: ValueType) -> Result<NumberValue, ConversionError> {
    let value = value.trim();
    match value_type {
        ValueType::Int => Ok(NumberValue::Int(value.parse::<i64>()?)),
        ValueType::Double => Ok(NumberValue::Double(value.parse::<f64>()?)),
    }
}
