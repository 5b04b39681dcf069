//! First-match field lookup over loosely-structured records.
//!
//! Source records spell the same field many ways (`price` vs `unitPrice`,
//! `customer.name` vs `user.name`). Rather than branching per call site,
//! each caller lists candidate dotted paths in priority order and takes
//! the first one that yields a usable value.

use rust_decimal::Decimal;
use serde_json::Value;

/// Resolve a dotted path (e.g. `"customer.name"`) against a record.
///
/// Returns `None` for missing segments and explicit nulls.
#[must_use]
pub fn lookup<'a>(raw: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = raw;
    for segment in path.split('.') {
        current = current.get(segment)?;
    }
    if current.is_null() { None } else { Some(current) }
}

/// First non-empty string among the candidate paths.
///
/// Numeric values are accepted and rendered as strings, since sources
/// disagree about whether identifiers are strings or numbers. Whitespace
/// is trimmed; a blank string counts as absent.
#[must_use]
pub fn first_str(raw: &Value, paths: &[&str]) -> Option<String> {
    paths.iter().find_map(|path| {
        let value = lookup(raw, path)?;
        let text = match value {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        if text.is_empty() { None } else { Some(text) }
    })
}

/// First parseable decimal among the candidate paths.
///
/// Accepts JSON numbers and numeric strings ("1500", "1,499.00").
#[must_use]
pub fn first_decimal(raw: &Value, paths: &[&str]) -> Option<Decimal> {
    paths
        .iter()
        .find_map(|path| as_decimal(lookup(raw, path)?))
}

/// First parseable unsigned integer among the candidate paths.
#[must_use]
pub fn first_u32(raw: &Value, paths: &[&str]) -> Option<u32> {
    paths.iter().find_map(|path| match lookup(raw, path)? {
        Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
        Value::String(s) => s.trim().parse::<u32>().ok(),
        _ => None,
    })
}

/// Coerce a single JSON value to a decimal, if possible.
#[must_use]
pub fn as_decimal(value: &Value) -> Option<Decimal> {
    match value {
        // Round-trip through the JSON text to avoid f64 artifacts.
        Value::Number(n) => n.to_string().parse::<Decimal>().ok(),
        Value::String(s) => s.trim().replace(',', "").parse::<Decimal>().ok(),
        _ => None,
    }
}
