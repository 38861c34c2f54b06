//! Cell values and per-column type inference.

use serde::Serialize;
use std::fmt;

/// Markers decoded as a missing cell, compared case-insensitively.
const MISSING_MARKERS: &[&str] = &["", "na", "n/a", "nan", "-nan", "+nan", "null", "none", "#n/a"];

/// One cell of a [`FeatureTable`](super::FeatureTable).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Integer(i64),
    Float(f64),
    Text(String),
    Missing,
}

impl Value {
    /// Numeric view of the cell; `None` for text and missing cells.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::Text(_) | Value::Missing => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(i) => write!(f, "{}", i),
            // Debug keeps the trailing ".0" on whole floats and switches to
            // exponent notation for very large or small magnitudes.
            Value::Float(x) => write!(f, "{:?}", x),
            Value::Text(s) => f.write_str(s),
            Value::Missing => Ok(()),
        }
    }
}

fn is_missing_marker(raw: &str) -> bool {
    let raw = raw.trim();
    MISSING_MARKERS.iter().any(|m| m.eq_ignore_ascii_case(raw))
}

/// A parsed NaN is a missing cell; infinities are kept.
fn float_cell(raw: &str) -> Value {
    match raw.trim().parse::<f64>() {
        Ok(x) if !x.is_nan() => Value::Float(x),
        _ => Value::Missing,
    }
}

/// Infer one column's type from its raw cells and convert them.
///
/// Integer when every cell is an integer and none is missing, float when every
/// present cell is numeric, text otherwise.
pub(crate) fn infer_column(raw: &[Option<&str>]) -> Vec<Value> {
    let present = || raw.iter().filter_map(|c| c.filter(|s| !is_missing_marker(s)));
    let any_missing = raw.iter().any(|c| c.map_or(true, is_missing_marker));

    if !any_missing && present().all(|s| s.trim().parse::<i64>().is_ok()) {
        return raw
            .iter()
            .map(|c| match c.map(|s| s.trim().parse::<i64>()) {
                Some(Ok(i)) => Value::Integer(i),
                _ => Value::Missing,
            })
            .collect();
    }

    if present().all(|s| s.trim().parse::<f64>().is_ok()) {
        return raw
            .iter()
            .map(|c| match c {
                Some(s) if !is_missing_marker(s) => float_cell(s),
                _ => Value::Missing,
            })
            .collect();
    }

    raw.iter()
        .map(|c| match c {
            Some(s) if !is_missing_marker(s) => Value::Text((*s).to_string()),
            _ => Value::Missing,
        })
        .collect()
}
