//! CRS detection for GeoJSON-like documents.
//!
//! An explicit `crs` member wins, then a legacy top-level `name`, then a
//! range test on one sampled coordinate. Detection never fails; a document
//! without any signal is taken to be WGS 84. The result is advisory.

use agrosheet_core::models::crs::CrsDescriptor;
use serde_json::Value;

const CRS84_URN: &str = "urn:ogc:def:crs:OGC:1.3:CRS84";

/// Detect the CRS of a document
pub fn detect(doc: &Value) -> CrsDescriptor {
    if let Some(descriptor) = detect_explicit(doc) {
        tracing::debug!(crs = %descriptor, "CRS from document metadata");
        return descriptor;
    }

    match sample_coordinate(doc) {
        Some((x, y)) => {
            let descriptor = detect_from_coordinates(x, y);
            tracing::debug!(x, y, crs = %descriptor, "CRS from coordinate ranges");
            descriptor
        }
        None => {
            tracing::debug!("No CRS signal, assuming WGS 84");
            CrsDescriptor::wgs84()
        }
    }
}

/// CRS named by the document itself, if any
pub fn detect_explicit(doc: &Value) -> Option<CrsDescriptor> {
    if let Some(properties) = doc.pointer("/crs/properties") {
        for member in ["name", "code"] {
            let descriptor = match properties.get(member) {
                Some(Value::String(raw)) => descriptor_from_name(raw),
                Some(Value::Number(number)) => number
                    .as_u64()
                    .and_then(|code| u32::try_from(code).ok())
                    .map(CrsDescriptor::from_epsg),
                _ => None,
            };
            if descriptor.is_some() {
                return descriptor;
            }
        }
    }

    doc.get("name").and_then(Value::as_str).and_then(descriptor_from_name)
}

fn descriptor_from_name(raw: &str) -> Option<CrsDescriptor> {
    if raw.trim().eq_ignore_ascii_case(CRS84_URN) {
        return Some(CrsDescriptor::wgs84());
    }
    parse_epsg_token(raw).map(|epsg| CrsDescriptor::from_epsg_named(epsg, raw))
}

/// Numeric code following an "EPSG" token, case-insensitive
///
/// Accepts `EPSG:3763`, `epsg 3763` and `urn:ogc:def:crs:EPSG::3763`.
pub fn parse_epsg_token(raw: &str) -> Option<u32> {
    let start = raw.to_ascii_lowercase().find("epsg")? + "epsg".len();
    let digits: String = raw[start..]
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}

/// Guess a CRS from the range of one coordinate pair
pub fn detect_from_coordinates(x: f64, y: f64) -> CrsDescriptor {
    let outside_geographic = x.abs() > 180.0 || y.abs() > 90.0;

    if outside_geographic && x > -200000.0 && x < 500000.0 && y > -400000.0 && y < 400000.0 {
        CrsDescriptor::pt_tm06()
    } else if x > 100000.0 && x < 900000.0 && y > 4000000.0 && y < 5000000.0 {
        CrsDescriptor::utm_29n()
    } else {
        // In geographic range, or nothing matched
        CrsDescriptor::wgs84()
    }
}

/// First coordinate pair of the document's first geometry.
///
/// Works on a FeatureCollection, a single Feature or a bare geometry.
pub fn sample_coordinate(doc: &Value) -> Option<(f64, f64)> {
    let geometry = match doc.get("type").and_then(Value::as_str) {
        Some("FeatureCollection") => doc
            .get("features")
            .and_then(Value::as_array)?
            .iter()
            .find_map(|feature| feature.get("geometry").filter(|g| !g.is_null()))?,
        Some("Feature") => doc.get("geometry")?,
        _ => doc,
    };
    first_pair(geometry)
}

fn first_pair(geometry: &Value) -> Option<(f64, f64)> {
    if let Some(members) = geometry.get("geometries").and_then(Value::as_array) {
        return members.iter().find_map(first_pair);
    }
    leaf(geometry.get("coordinates")?)
}

fn leaf(value: &Value) -> Option<(f64, f64)> {
    let items = value.as_array()?;
    match items.as_slice() {
        [Value::Number(x), Value::Number(y), ..] => Some((x.as_f64()?, y.as_f64()?)),
        _ => items.iter().find_map(leaf),
    }
}
