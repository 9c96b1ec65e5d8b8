//! Tolerant readers for backend wire values.
//!
//! The backend sends some structured fields either natively or as
//! JSON-encoded strings, and scalars with whatever JSON type was at hand.

use agrosheet_core::error::{AgroError, Result};
use serde_json::Value;

/// Decode a field that may arrive as a JSON-encoded string.
///
/// Absent, `null` and blank strings yield `None`.
pub fn embedded(value: Option<&Value>, field: &str) -> Result<Option<Value>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) if text.trim().is_empty() => Ok(None),
        Some(Value::String(text)) => serde_json::from_str(text).map(Some).map_err(|e| {
            AgroError::malformed(format!("{} is not valid JSON: {}", field, e))
        }),
        Some(other) => Ok(Some(other.clone())),
    }
}

/// Canonical text of a scalar; `null` and absent values are empty
pub fn scalar_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(Value::Number(number)) => number.to_string(),
        Some(Value::Bool(flag)) => flag.to_string(),
        Some(other) => other.to_string(),
    }
}

/// Area in hectares from a number or numeric string, zero otherwise
pub fn area(value: Option<&Value>) -> f64 {
    let parsed = match value {
        Some(Value::Number(number)) => number.as_f64(),
        Some(Value::String(text)) => text.trim().replace(',', ".").parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|a| a.is_finite()).unwrap_or(0.0)
}

/// First present member among `names`
pub fn first_of<'a>(object: &'a Value, names: &[&str]) -> Option<&'a Value> {
    names.iter().find_map(|name| object.get(*name).filter(|v| !v.is_null()))
}
