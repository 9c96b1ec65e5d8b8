//! Backend worksheet JSON to editable worksheet and back.
//!
//! Inbound, every scalar metadata field defaults to an empty string,
//! `operations` and `features` may be JSON-encoded strings, and features are
//! indexed by a key resolved once (see [`crate::keys`]). Outbound, metadata
//! is flat, AIGP labels are a plain array and each feature carries its key as
//! `id`, so `normalize(denormalize(w)) == w` for every normalized `w`.

use crate::aigp::parse_labels;
use crate::keys::{existing_key, generate_key};
use crate::wire::{area, embedded, first_of, scalar_text};
use agrosheet_core::error::{AgroError, Result};
use agrosheet_core::models::{Feature, JsonObject, Operation, Worksheet, WorksheetMetadata};
use agrosheet_geo::validation::parse_geometry;
use serde_json::{json, Value};

/// Build an editable worksheet from backend JSON
pub fn normalize(raw: &Value) -> Result<Worksheet> {
    if !raw.is_object() {
        return Err(AgroError::malformed("worksheet is not a JSON object"));
    }

    let mut metadata = WorksheetMetadata::default();
    for field in WorksheetMetadata::FIELDS {
        metadata.set(field, scalar_text(raw.get(*field)));
    }

    let operations = parse_operations(raw.get("operations"))?;
    let labels = parse_labels(raw.get("aigp"))?;
    let features = parse_features(raw.get("features"))?;

    let worksheet = Worksheet::new(metadata, operations, labels, features)?;
    tracing::debug!(
        id = %worksheet.metadata.id,
        features = worksheet.features().len(),
        operations = worksheet.operations.len(),
        "Normalized worksheet"
    );
    Ok(worksheet)
}

/// Backend form of a worksheet, as sent on submission
pub fn denormalize(worksheet: &Worksheet) -> Value {
    let mut object = metadata_object(worksheet);
    object.insert(
        "features".to_string(),
        Value::Array(worksheet.features().values().map(feature_json).collect()),
    );
    Value::Object(object)
}

/// Flat metadata plus operations and AIGP labels
pub(crate) fn metadata_object(worksheet: &Worksheet) -> JsonObject {
    let mut object = JsonObject::new();
    for (field, value) in worksheet.metadata.fields() {
        object.insert(field.to_string(), Value::String(value.to_string()));
    }
    object.insert(
        "operations".to_string(),
        Value::Array(worksheet.operations.iter().map(operation_json).collect()),
    );
    object.insert("aigp".to_string(), json!(worksheet.aigp_labels()));
    object
}

fn operation_json(operation: &Operation) -> Value {
    json!({
        "code": operation.code,
        "description": operation.description,
        "area": operation.area,
    })
}

/// GeoJSON feature carrying its key as `id`
pub(crate) fn feature_json(feature: &Feature) -> Value {
    geojson_feature(feature, Value::Object(JsonObject::from(&feature.geometry)))
}

pub(crate) fn geojson_feature(feature: &Feature, geometry: Value) -> Value {
    json!({
        "type": "Feature",
        "id": feature.key.as_str(),
        "geometry": geometry,
        "properties": feature.properties,
    })
}

fn parse_operations(value: Option<&Value>) -> Result<Vec<Operation>> {
    let items = match embedded(value, "operations")? {
        None => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(other) => {
            return Err(AgroError::malformed(format!("operations is not an array: {}", other)))
        }
    };

    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            if !item.is_object() {
                return Err(AgroError::malformed(format!("operation {} is not an object", index)));
            }
            Ok(Operation {
                code: scalar_text(first_of(item, &["code", "operation_code"])),
                description: scalar_text(first_of(item, &["description", "operation_description"])),
                area: area(first_of(item, &["area", "area_ha"])),
            })
        })
        .collect()
}

fn parse_features(value: Option<&Value>) -> Result<Vec<Feature>> {
    let items: Vec<Value> = match embedded(value, "features")? {
        None => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(Value::Object(mut object)) => {
            if object.get("type").and_then(Value::as_str) == Some("FeatureCollection") {
                match object.remove("features") {
                    Some(Value::Array(items)) => items,
                    _ => return Err(AgroError::malformed("FeatureCollection has no features array")),
                }
            } else {
                // Keyed form: the map key stands in for a missing key member
                object
                    .into_iter()
                    .map(|(key, mut item)| {
                        if let Value::Object(members) = &mut item {
                            members.entry("key").or_insert(Value::String(key));
                        }
                        item
                    })
                    .collect()
            }
        }
        Some(other) => {
            return Err(AgroError::malformed(format!("features has unexpected shape: {}", other)))
        }
    };

    items.iter().enumerate().map(|(index, item)| parse_feature(item, index)).collect()
}

fn parse_feature(item: &Value, index: usize) -> Result<Feature> {
    if !item.is_object() {
        return Err(AgroError::malformed(format!("feature {} is not an object", index)));
    }

    let key = existing_key(item).unwrap_or_else(|| {
        let key = generate_key();
        tracing::debug!(index, key = %key, "Generated feature key");
        key
    });

    let geometry = match item.get("geometry") {
        Some(geometry) if !geometry.is_null() => parse_geometry(geometry, key.as_str())?,
        _ => {
            return Err(AgroError::MalformedGeometry {
                feature: key.to_string(),
                reason: "feature has no geometry".to_string(),
            })
        }
    };

    let properties = match item.get("properties") {
        None | Some(Value::Null) => JsonObject::new(),
        Some(Value::Object(properties)) => properties.clone(),
        Some(_) => {
            return Err(AgroError::malformed(format!(
                "properties of feature {} is not an object",
                key
            )))
        }
    };

    Ok(Feature { key, geometry, properties })
}
