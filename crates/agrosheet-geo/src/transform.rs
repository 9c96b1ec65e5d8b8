//! Geometry reprojection.
//!
//! Walks the nested coordinate arrays of every GeoJSON geometry kind and
//! passes each position through a [`Transformer`]. Ring, polygon and point
//! order and multiplicity are preserved exactly.

use crate::reproject::{Reprojector, Transformer};
use agrosheet_core::error::Result;
use geojson::{Geometry, PolygonType, Position, Value};

/// A position left in its source CRS by a lenient reprojection
#[derive(Debug, Clone, PartialEq)]
pub struct Fallback {
    pub position: Position,
    pub reason: String,
}

/// Apply `f` to every position, rebuilding the same nesting
pub fn map_positions<F>(value: &Value, f: &mut F) -> Result<Value>
where
    F: FnMut(&Position) -> Result<Position>,
{
    let mapped = match value {
        Value::Point(position) => Value::Point(f(position)?),
        Value::MultiPoint(points) => Value::MultiPoint(map_line(points, f)?),
        Value::LineString(line) => Value::LineString(map_line(line, f)?),
        Value::MultiLineString(lines) => Value::MultiLineString(map_rings(lines, f)?),
        Value::Polygon(rings) => Value::Polygon(map_rings(rings, f)?),
        Value::MultiPolygon(polygons) => Value::MultiPolygon(
            polygons.iter().map(|rings| map_rings(rings, f)).collect::<Result<Vec<PolygonType>>>()?,
        ),
        Value::GeometryCollection(geometries) => Value::GeometryCollection(
            geometries
                .iter()
                .map(|geometry| {
                    Ok(Geometry {
                        bbox: None,
                        value: map_positions(&geometry.value, f)?,
                        foreign_members: geometry.foreign_members.clone(),
                    })
                })
                .collect::<Result<Vec<_>>>()?,
        ),
    };
    Ok(mapped)
}

fn map_line<F>(line: &[Position], f: &mut F) -> Result<Vec<Position>>
where
    F: FnMut(&Position) -> Result<Position>,
{
    line.iter().map(|position| f(position)).collect()
}

fn map_rings<F>(rings: &[Vec<Position>], f: &mut F) -> Result<Vec<Vec<Position>>>
where
    F: FnMut(&Position) -> Result<Position>,
{
    rings.iter().map(|ring| map_line(ring, f)).collect()
}

/// Reproject a geometry, failing on the first position that cannot be converted
pub fn reproject_geometry(geometry: &Geometry, transformer: &Transformer) -> Result<Geometry> {
    if transformer.is_identity() {
        return Ok(geometry.clone());
    }

    let value = map_positions(&geometry.value, &mut |position| transformer.apply_position(position))?;

    // The bbox is in the source CRS, so it is dropped
    Ok(Geometry { bbox: None, value, foreign_members: geometry.foreign_members.clone() })
}

/// Reproject a geometry, keeping positions that fail in their source CRS.
///
/// Every kept position is returned as a [`Fallback`] so callers can decide
/// whether the partially converted geometry is acceptable.
pub fn reproject_geometry_lenient(
    geometry: &Geometry,
    transformer: &Transformer,
) -> (Geometry, Vec<Fallback>) {
    if transformer.is_identity() {
        return (geometry.clone(), Vec::new());
    }

    let mut fallbacks = Vec::new();
    let mut convert = |position: &Position| -> Result<Position> {
        match transformer.apply_position(position) {
            Ok(converted) => Ok(converted),
            Err(e) => {
                tracing::warn!(
                    from = transformer.source(),
                    to = transformer.target(),
                    "Keeping unconverted position {:?}: {}",
                    position,
                    e
                );
                fallbacks.push(Fallback { position: position.clone(), reason: e.to_string() });
                Ok(position.clone())
            }
        }
    };

    match map_positions(&geometry.value, &mut convert) {
        Ok(value) => (
            Geometry { bbox: None, value, foreign_members: geometry.foreign_members.clone() },
            fallbacks,
        ),
        // The closure never fails
        Err(_) => (geometry.clone(), fallbacks),
    }
}

/// Reproject a geometry between two EPSG codes
pub fn reproject_coordinates(
    geometry: &Geometry,
    from: u32,
    to: u32,
    reprojector: &Reprojector,
) -> Result<Geometry> {
    let transformer = reprojector.transformer(from, to)?;
    reproject_geometry(geometry, &transformer)
}

/// Number of positions in a geometry
pub fn position_count(value: &Value) -> usize {
    match value {
        Value::Point(_) => 1,
        Value::MultiPoint(line) | Value::LineString(line) => line.len(),
        Value::MultiLineString(rings) | Value::Polygon(rings) => rings.iter().map(Vec::len).sum(),
        Value::MultiPolygon(polygons) => {
            polygons.iter().flat_map(|rings| rings.iter().map(Vec::len)).sum()
        }
        Value::GeometryCollection(geometries) => {
            geometries.iter().map(|geometry| position_count(&geometry.value)).sum()
        }
    }
}

/// First position of a geometry, in document order
pub fn first_position(value: &Value) -> Option<&Position> {
    match value {
        Value::Point(position) => Some(position),
        Value::MultiPoint(line) | Value::LineString(line) => line.first(),
        Value::MultiLineString(rings) | Value::Polygon(rings) => rings.iter().flatten().next(),
        Value::MultiPolygon(polygons) => polygons.iter().flatten().flatten().next(),
        Value::GeometryCollection(geometries) => {
            geometries.iter().find_map(|geometry| first_position(&geometry.value))
        }
    }
}

/// Name of the geometry kind as written in GeoJSON
pub fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Point(_) => "Point",
        Value::MultiPoint(_) => "MultiPoint",
        Value::LineString(_) => "LineString",
        Value::MultiLineString(_) => "MultiLineString",
        Value::Polygon(_) => "Polygon",
        Value::MultiPolygon(_) => "MultiPolygon",
        Value::GeometryCollection(_) => "GeometryCollection",
    }
}
