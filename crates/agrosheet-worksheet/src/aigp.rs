//! AIGP label lists as sent by the backend.
//!
//! The `aigp` field arrives as a count mapping, an array, a JSON-encoded
//! array string or a comma-separated string. All shapes reduce to the list
//! of declared labels; counts are recomputed from the features.

use agrosheet_core::error::{AgroError, Result};
use serde_json::Value;

/// Declared AIGP labels in first-seen order, without duplicates or blanks
pub fn parse_labels(value: Option<&Value>) -> Result<Vec<String>> {
    let raw = match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Object(counts)) => counts.keys().cloned().collect(),
        Some(Value::Array(items)) => items.iter().filter_map(label_text).collect(),
        Some(Value::String(text)) => labels_from_text(text)?,
        Some(other) => {
            return Err(AgroError::malformed(format!("aigp has unexpected shape: {}", other)))
        }
    };

    let mut labels: Vec<String> = Vec::with_capacity(raw.len());
    for label in raw {
        let label = label.trim().to_string();
        if !label.is_empty() && !labels.contains(&label) {
            labels.push(label);
        }
    }
    Ok(labels)
}

fn labels_from_text(text: &str) -> Result<Vec<String>> {
    let text = text.trim();
    if text.starts_with('[') || text.starts_with('{') {
        let decoded: Value = serde_json::from_str(text)
            .map_err(|e| AgroError::malformed(format!("aigp is not valid JSON: {}", e)))?;
        return parse_labels(Some(&decoded));
    }
    Ok(text.split(',').map(str::to_string).collect())
}

fn label_text(item: &Value) -> Option<String> {
    match item {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}
