//! Worksheet to GeoJSON FeatureCollection.

use crate::normalize::{geojson_feature, metadata_object};
use agrosheet_core::error::{AgroError, Result};
use agrosheet_core::models::crs::{CrsDescriptor, WGS84};
use agrosheet_core::models::{JsonObject, Worksheet};
use agrosheet_geo::reproject::Reprojector;
use agrosheet_geo::transform::reproject_geometry;
use serde_json::{json, Value};
use std::path::Path;

/// Export a worksheet as a FeatureCollection in `target_epsg`.
///
/// Worksheet coordinates are WGS 84. Every position must convert; an export
/// never mixes CRSs.
pub async fn export_feature_collection(
    worksheet: &Worksheet,
    target_epsg: u32,
    reprojector: &Reprojector,
) -> Result<Value> {
    let transformer = reprojector.prepare(WGS84, target_epsg).await?;
    let target = CrsDescriptor::from_epsg(target_epsg);

    let features = worksheet
        .features()
        .values()
        .map(|feature| {
            let geometry = reproject_geometry(&feature.geometry, &transformer)?;
            Ok(geojson_feature(feature, Value::Object(JsonObject::from(&geometry))))
        })
        .collect::<Result<Vec<_>>>()?;

    tracing::info!(target = %target, features = features.len(), "Exported worksheet");

    Ok(json!({
        "type": "FeatureCollection",
        "crs": {"type": "name", "properties": {"name": target.code()}},
        "metadata": Value::Object(metadata_object(worksheet)),
        "features": features,
    }))
}

/// Write an exported collection as pretty-printed JSON
pub fn write_export(path: &Path, collection: &Value) -> Result<()> {
    let content = serde_json::to_string_pretty(collection)
        .map_err(|e| AgroError::Serialization(e.to_string()))?;
    std::fs::write(path, content)?;
    Ok(())
}
