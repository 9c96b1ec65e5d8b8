use agrosheet_core::error::{AgroError, Result};
use geojson::{Geometry, Position, Value};
use serde_json::Value as JsonValue;

/// Geometry kinds accepted at the boundary, with the nesting depth of their
/// `coordinates` array above a single position
const KINDS: &[(&str, usize)] = &[
    ("Point", 0),
    ("MultiPoint", 1),
    ("LineString", 1),
    ("MultiLineString", 2),
    ("Polygon", 2),
    ("MultiPolygon", 3),
];

/// Parse a JSON geometry into a typed geometry.
///
/// Rejects unknown kinds with `UnsupportedGeometryKind`, and nesting that
/// does not match the declared kind, short positions or non-numeric values
/// with `MalformedGeometry`. `feature` names the owning feature in errors.
pub fn parse_geometry(value: &JsonValue, feature: &str) -> Result<Geometry> {
    check_geometry(value, feature)?;
    serde_json::from_value::<Geometry>(value.clone()).map_err(|e| AgroError::MalformedGeometry {
        feature: feature.to_string(),
        reason: e.to_string(),
    })
}

fn check_geometry(value: &JsonValue, feature: &str) -> Result<()> {
    let malformed = |reason: String| AgroError::MalformedGeometry {
        feature: feature.to_string(),
        reason,
    };

    let object = value.as_object().ok_or_else(|| malformed("geometry is not an object".into()))?;
    let kind = object
        .get("type")
        .and_then(JsonValue::as_str)
        .ok_or_else(|| malformed("geometry has no type".into()))?;

    if kind == "GeometryCollection" {
        let members = object
            .get("geometries")
            .and_then(JsonValue::as_array)
            .ok_or_else(|| malformed("GeometryCollection without geometries array".into()))?;
        for member in members {
            check_geometry(member, feature)?;
        }
        return Ok(());
    }

    let depth = KINDS
        .iter()
        .find(|(name, _)| *name == kind)
        .map(|(_, depth)| *depth)
        .ok_or_else(|| AgroError::UnsupportedGeometryKind { kind: kind.to_string() })?;

    let coordinates = object
        .get("coordinates")
        .ok_or_else(|| malformed(format!("{} without coordinates", kind)))?;

    check_nesting(coordinates, depth, "coordinates").map_err(|path| {
        malformed(format!("{} nesting mismatch at {}", kind, path))
    })
}

/// Walk `value` expecting `depth` array levels above positions.
/// Returns the path of the first offending element.
fn check_nesting(value: &JsonValue, depth: usize, path: &str) -> std::result::Result<(), String> {
    let items = value.as_array().ok_or_else(|| path.to_string())?;

    if depth == 0 {
        let is_position = items.len() >= 2 && items.iter().all(JsonValue::is_number);
        return if is_position { Ok(()) } else { Err(path.to_string()) };
    }

    for (i, item) in items.iter().enumerate() {
        check_nesting(item, depth - 1, &format!("{}[{}]", path, i))?;
    }
    Ok(())
}

/// Validation result with details
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<ValidationError>,
}

/// Validation error with location details
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub location: String,
    pub reason: String,
}

impl ValidationResult {
    /// Create a valid result
    pub fn valid() -> Self {
        Self { is_valid: true, errors: Vec::new() }
    }

    /// Add an error to the result
    pub fn add_error(&mut self, location: String, reason: String) {
        self.is_valid = false;
        self.errors.push(ValidationError { location, reason });
    }

    fn absorb(&mut self, prefix: &str, other: ValidationResult) {
        for error in other.errors {
            self.add_error(format!("{}.{}", prefix, error.location), error.reason);
        }
    }
}

/// Check a parsed geometry for finite coordinates, line lengths and closed rings
pub fn validate_geometry(geometry: &Geometry) -> ValidationResult {
    validate_value(&geometry.value)
}

fn validate_value(value: &Value) -> ValidationResult {
    match value {
        Value::Point(position) => validate_positions("Point", std::slice::from_ref(position)),
        Value::MultiPoint(points) => validate_positions("MultiPoint", points),
        Value::LineString(line) => validate_line("LineString", line),
        Value::MultiLineString(lines) => {
            let mut result = ValidationResult::valid();
            for (i, line) in lines.iter().enumerate() {
                result.absorb(&format!("MultiLineString[{}]", i), validate_line("LineString", line));
            }
            result
        }
        Value::Polygon(rings) => validate_polygon(rings),
        Value::MultiPolygon(polygons) => {
            let mut result = ValidationResult::valid();
            for (i, rings) in polygons.iter().enumerate() {
                result.absorb(&format!("MultiPolygon[{}]", i), validate_polygon(rings));
            }
            result
        }
        Value::GeometryCollection(geometries) => {
            let mut result = ValidationResult::valid();
            for (i, geometry) in geometries.iter().enumerate() {
                result.absorb(&format!("GeometryCollection[{}]", i), validate_value(&geometry.value));
            }
            result
        }
    }
}

fn validate_positions(location: &str, positions: &[Position]) -> ValidationResult {
    let mut result = ValidationResult::valid();
    for (i, position) in positions.iter().enumerate() {
        if !position.iter().all(|v| v.is_finite()) {
            result.add_error(format!("{}[{}]", location, i), "Coordinates must be finite".to_string());
        }
    }
    result
}

fn validate_line(location: &str, line: &[Position]) -> ValidationResult {
    let mut result = validate_positions(location, line);
    if line.len() < 2 {
        result.add_error(
            location.to_string(),
            format!("LineString must have at least 2 points, found {}", line.len()),
        );
    }
    result
}

fn validate_polygon(rings: &[Vec<Position>]) -> ValidationResult {
    let mut result = ValidationResult::valid();
    for (i, ring) in rings.iter().enumerate() {
        let location = if i == 0 { "Polygon exterior".to_string() } else { format!("Polygon interior[{}]", i - 1) };
        result.absorb(&location, validate_positions("ring", ring));

        if ring.len() < 4 {
            result.add_error(
                location.clone(),
                format!("Ring must have at least 4 points, found {}", ring.len()),
            );
        }
        if let (Some(first), Some(last)) = (ring.first(), ring.last()) {
            if first != last {
                result.add_error(location, "Ring must be closed (first point == last point)".to_string());
            }
        }
    }
    result
}
