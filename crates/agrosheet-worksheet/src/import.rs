//! Uploaded GeoJSON to worksheet.
//!
//! An upload must be a FeatureCollection with a `features` array. Metadata
//! is merged from `metadata`, then `properties`, then the first feature's
//! `properties.metadata`, later sources winning. Coordinates are converted
//! from the detected CRS to WGS 84, the worksheet CRS, before normalization.

use crate::normalize::normalize;
use agrosheet_core::error::{AgroError, Result};
use agrosheet_core::models::crs::{CrsDescriptor, ReprojectionPolicy, WGS84};
use agrosheet_core::models::{JsonObject, Worksheet};
use agrosheet_geo::detect::detect;
use agrosheet_geo::reproject::{Reprojector, Transformer};
use agrosheet_geo::transform::{position_count, reproject_geometry, reproject_geometry_lenient};
use agrosheet_geo::validation::{parse_geometry, validate_geometry};
use serde_json::Value;
use std::path::Path;

/// Options for importing a FeatureCollection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportOptions {
    pub policy: ReprojectionPolicy,
}

/// Result of an import
#[derive(Debug, Clone)]
pub struct ImportedWorksheet {
    pub worksheet: Worksheet,
    /// CRS the upload was detected to be in
    pub source_crs: CrsDescriptor,
    /// Positions left in the source CRS by a lenient import, all of them
    /// when no definition for the source CRS could be obtained
    pub unconverted: usize,
    /// Geometry problems that did not stop the import
    pub warnings: Vec<String>,
}

/// Parse upload text as JSON
pub fn parse_upload(text: &str) -> Result<Value> {
    serde_json::from_str(text).map_err(|e| AgroError::malformed(format!("Upload is not valid JSON: {}", e)))
}

/// Read and parse an upload file
pub fn read_upload(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)?;
    parse_upload(&content)
}

/// Features array of a FeatureCollection
pub fn collection_features(doc: &Value) -> Result<&Vec<Value>> {
    match doc.get("type").and_then(Value::as_str) {
        Some("FeatureCollection") => {}
        Some(other) => {
            return Err(AgroError::malformed(format!("expected a FeatureCollection, found {}", other)))
        }
        None => return Err(AgroError::malformed("expected a FeatureCollection, found no type")),
    }
    doc.get("features")
        .and_then(Value::as_array)
        .ok_or_else(|| AgroError::malformed("FeatureCollection has no features array"))
}

/// Worksheet metadata found in the document, later sources winning
pub fn merged_metadata(doc: &Value) -> JsonObject {
    let sources = [
        doc.get("metadata"),
        doc.get("properties"),
        doc.pointer("/features/0/properties/metadata"),
    ];

    let mut merged = JsonObject::new();
    for source in sources.into_iter().flatten() {
        if let Value::Object(members) = source {
            for (name, value) in members {
                merged.insert(name.clone(), value.clone());
            }
        }
    }
    merged
}

/// Import an uploaded FeatureCollection
pub async fn import_feature_collection(
    doc: &Value,
    reprojector: &Reprojector,
    options: &ImportOptions,
) -> Result<ImportedWorksheet> {
    let features = collection_features(doc)?;
    let source_crs = detect(doc);
    tracing::info!(
        source = %source_crs,
        target = WGS84,
        features = features.len(),
        "Importing FeatureCollection"
    );

    let transformer = match reprojector.prepare(source_crs.epsg, WGS84).await {
        Ok(transformer) => Some(transformer),
        Err(e) if options.policy == ReprojectionPolicy::Lenient && e.is_projection() => {
            tracing::warn!(source = %source_crs, "Keeping source coordinates: {}", e);
            None
        }
        Err(e) => return Err(e),
    };

    let mut unconverted = 0;
    let mut warnings = Vec::new();
    let mut converted = Vec::with_capacity(features.len());
    for (index, feature) in features.iter().enumerate() {
        let mut feature = feature.clone();
        if index == 0 {
            if let Some(Value::Object(properties)) = feature.get_mut("properties") {
                properties.remove("metadata");
            }
        }

        let label = feature_label(&feature, index);
        let Some(geometry) = feature.get("geometry").filter(|g| !g.is_null()) else {
            tracing::warn!(feature = %label, "Skipping feature without geometry");
            warnings.push(format!("{}: skipped, no geometry", label));
            continue;
        };

        let geometry = parse_geometry(geometry, &label)?;
        let validation = validate_geometry(&geometry);
        for error in validation.errors {
            warnings.push(format!("{}: {} ({})", label, error.reason, error.location));
        }

        let geometry = match &transformer {
            Some(transformer) => {
                let (geometry, fallbacks) = convert(&geometry, transformer, options.policy)?;
                unconverted += fallbacks;
                geometry
            }
            None => {
                unconverted += position_count(&geometry.value);
                geometry
            }
        };

        feature["geometry"] = Value::Object(JsonObject::from(&geometry));
        converted.push(feature);
    }

    let mut raw = merged_metadata(doc);
    raw.insert("features".to_string(), Value::Array(converted));
    let worksheet = normalize(&Value::Object(raw))?;

    if unconverted > 0 {
        tracing::warn!(unconverted, source = %source_crs, "Some coordinates were left unconverted");
    }

    Ok(ImportedWorksheet { worksheet, source_crs, unconverted, warnings })
}

fn convert(
    geometry: &geojson::Geometry,
    transformer: &Transformer,
    policy: ReprojectionPolicy,
) -> Result<(geojson::Geometry, usize)> {
    match policy {
        ReprojectionPolicy::Strict => Ok((reproject_geometry(geometry, transformer)?, 0)),
        ReprojectionPolicy::Lenient => {
            let (geometry, fallbacks) = reproject_geometry_lenient(geometry, transformer);
            Ok((geometry, fallbacks.len()))
        }
    }
}

fn feature_label(feature: &Value, index: usize) -> String {
    crate::keys::existing_key(feature)
        .map(|key| key.to_string())
        .unwrap_or_else(|| format!("#{}", index))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_requires_feature_collection() {
        assert!(collection_features(&json!({"type": "Feature"})).is_err());
        assert!(collection_features(&json!({"features": []})).is_err());
        assert!(collection_features(&json!({"type": "FeatureCollection"})).is_err());
        assert!(collection_features(&json!({"type": "FeatureCollection", "features": {}})).is_err());
        assert!(collection_features(&json!({"type": "FeatureCollection", "features": []})).is_ok());
    }

    #[test]
    fn test_metadata_precedence() {
        let doc = json!({
            "type": "FeatureCollection",
            "metadata": {"title": "from metadata", "status": "open", "id": "1"},
            "properties": {"title": "from properties", "status": "closed"},
            "features": [{"type": "Feature", "geometry": null, "properties": {"metadata": {"title": "from feature"}}}]
        });
        let merged = merged_metadata(&doc);
        assert_eq!(merged["title"], "from feature");
        assert_eq!(merged["status"], "closed");
        assert_eq!(merged["id"], "1");
    }

    #[test]
    fn test_parse_upload_rejects_garbage() {
        assert!(matches!(parse_upload("{not json"), Err(AgroError::MalformedDocument { .. })));
    }

    #[tokio::test]
    async fn test_lenient_import_counts_fallbacks() {
        let doc = json!({
            "type": "FeatureCollection",
            "crs": {"type": "name", "properties": {"name": "EPSG:3763"}},
            "features": [{
                "type": "Feature",
                "properties": {"polygon_id": "p1"},
                "geometry": {"type": "LineString", "coordinates": [[-84000.0, 160000.0], [-84000.0, 9.0e7]]}
            }]
        });
        let reprojector = Reprojector::offline();

        let imported = import_feature_collection(&doc, &reprojector, &ImportOptions::default()).await.unwrap();
        assert_eq!(imported.unconverted, 1);
        assert_eq!(imported.source_crs.epsg, 3763);

        let strict = ImportOptions { policy: ReprojectionPolicy::Strict };
        let err = import_feature_collection(&doc, &reprojector, &strict).await.unwrap_err();
        assert!(err.is_projection());
    }

    #[tokio::test]
    async fn test_unavailable_definition_keeps_source_coordinates() {
        let doc = json!({
            "type": "FeatureCollection",
            "crs": {"type": "name", "properties": {"name": "EPSG:27493"}},
            "features": [{
                "type": "Feature",
                "properties": {"polygon_id": "p1"},
                "geometry": {"type": "LineString", "coordinates": [[100.0, 200.0], [110.0, 210.0]]}
            }]
        });
        let reprojector = Reprojector::offline();

        let imported = import_feature_collection(&doc, &reprojector, &ImportOptions::default()).await.unwrap();
        assert_eq!(imported.unconverted, 2);
        let feature = imported.worksheet.feature(&"p1".into()).unwrap();
        assert_eq!(feature.geometry.value, geojson::Value::LineString(vec![vec![100.0, 200.0], vec![110.0, 210.0]]));

        let strict = ImportOptions { policy: ReprojectionPolicy::Strict };
        let err = import_feature_collection(&doc, &reprojector, &strict).await.unwrap_err();
        assert!(matches!(err, AgroError::DefinitionUnavailable { epsg: 27493, .. }));
    }

    #[tokio::test]
    async fn test_features_without_geometry_are_skipped() {
        let doc = json!({
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "geometry": null, "properties": {"polygon_id": "empty"}},
                {"type": "Feature", "geometry": {"type": "Point", "coordinates": [-9.2, 38.6]}, "properties": {"polygon_id": "p"}}
            ]
        });
        let imported = import_feature_collection(&doc, &Reprojector::offline(), &ImportOptions::default())
            .await
            .unwrap();
        assert_eq!(imported.worksheet.features().len(), 1);
        assert_eq!(imported.warnings.len(), 1);
    }
}
