//! Integration tests for CRS detection and reprojection
//!
//! This test suite verifies that:
//! - Detection follows explicit metadata first, then coordinate ranges
//! - Identity and closed-form conversions round trip
//! - Fetched definitions are cached and shared across reprojectors
//! - The walker never changes geometry shape

use agrosheet_core::error::AgroError;
use agrosheet_core::models::crs::{LAEA_EUROPE, PT_TM06, WGS84};
use agrosheet_geo::definitions::{DefinitionCache, DefinitionSource};
use agrosheet_geo::detect::detect;
use agrosheet_geo::reproject::Reprojector;
use agrosheet_geo::transform::{position_count, reproject_geometry};
use async_trait::async_trait;
use geojson::{Geometry, Value};
use proptest::prelude::*;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const DATUM73_HAYFORD_GAUSS: &str = "+proj=tmerc +lat_0=39.66666666666666 +lon_0=-8.131906111111112 +k=1 +x_0=180.598 +y_0=-86.99 +ellps=intl +towgs84=-223.237,110.193,36.649,0,0,0,0 +units=m +no_defs";

/// Definition source that counts lookups
struct CountingSource {
    calls: AtomicUsize,
    definition: Option<&'static str>,
}

impl CountingSource {
    fn serving(definition: &'static str) -> Self {
        Self { calls: AtomicUsize::new(0), definition: Some(definition) }
    }

    fn failing() -> Self {
        Self { calls: AtomicUsize::new(0), definition: None }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DefinitionSource for CountingSource {
    async fn fetch(&self, epsg: u32) -> agrosheet_core::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.definition {
            Some(definition) => Ok(definition.to_string()),
            None => Err(AgroError::DefinitionUnavailable {
                epsg,
                reason: "service unreachable".to_string(),
            }),
        }
    }
}

#[test]
fn test_lisbon_lnglat_detected_as_wgs84() {
    let doc = json!({
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature", "properties": {}, "geometry": {"type": "Point", "coordinates": [-9.2, 38.6]}}
        ]
    });
    assert_eq!(detect(&doc).epsg, WGS84);
}

#[test]
fn test_national_grid_range_detected_as_tm06() {
    let doc = json!({
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature", "properties": {}, "geometry": {"type": "Point", "coordinates": [-84000, 160000]}}
        ]
    });
    let descriptor = detect(&doc);
    assert_eq!(descriptor.epsg, PT_TM06);
    assert_eq!(descriptor.name, "ETRS89 / Portugal TM06");
}

#[tokio::test]
async fn test_definition_fetched_once_per_process_cache() {
    let source = Arc::new(CountingSource::serving(DATUM73_HAYFORD_GAUSS));
    let cache = Arc::new(DefinitionCache::new());
    let reprojector = Reprojector::new(cache.clone()).with_source(source.clone());

    let first = reprojector.prepare(27493, WGS84).await.unwrap();
    let second = reprojector.prepare(27493, WGS84).await.unwrap();
    assert_eq!(source.calls(), 1, "Second prepare should hit the cache");
    assert!(cache.contains(27493));

    let (lon, lat) = first.apply(0.0, 0.0).unwrap();
    assert!((lon - -8.13).abs() < 0.01, "lon = {}", lon);
    assert!((lat - 39.67).abs() < 0.01, "lat = {}", lat);
    assert_eq!(second.apply(0.0, 0.0).unwrap(), (lon, lat));
}

#[tokio::test]
async fn test_shared_cache_serves_other_reprojectors() {
    let cache = Arc::new(DefinitionCache::new());
    let serving = Arc::new(CountingSource::serving(DATUM73_HAYFORD_GAUSS));
    Reprojector::new(cache.clone()).with_source(serving).ensure_definition(27493).await.unwrap();

    let failing = Arc::new(CountingSource::failing());
    let other = Reprojector::new(cache).with_source(failing.clone());
    other.prepare(27493, WGS84).await.unwrap();
    assert_eq!(failing.calls(), 0);
}

#[tokio::test]
async fn test_unavailable_definition_names_the_crs() {
    let source = Arc::new(CountingSource::failing());
    let reprojector = Reprojector::offline().with_source(source);

    let err = reprojector.prepare(27493, WGS84).await.unwrap_err();
    assert!(matches!(err, AgroError::DefinitionUnavailable { epsg: 27493, .. }));
    assert!(err.to_string().contains("EPSG:27493"));
}

#[tokio::test]
async fn test_closed_form_pairs_never_fetch() {
    let source = Arc::new(CountingSource::failing());
    let reprojector = Reprojector::offline().with_source(source.clone());
    reprojector.prepare(PT_TM06, WGS84).await.unwrap();
    assert_eq!(source.calls(), 0);
}

#[test]
fn test_lambert_through_engine() {
    let reprojector = Reprojector::offline();
    let (x, y) = reprojector.convert(10.0, 52.0, WGS84, LAEA_EUROPE).unwrap();
    assert!((x - 4321000.0).abs() < 1e-3, "x = {}", x);
    assert!((y - 3210000.0).abs() < 1e-3, "y = {}", y);
}

#[test]
fn test_walker_preserves_multipolygon_shape() {
    let geometry = Geometry::new(Value::MultiPolygon(vec![
        vec![vec![
            vec![-84000.0, 160000.0],
            vec![-83000.0, 160000.0],
            vec![-83000.0, 161000.0],
            vec![-84000.0, 160000.0],
        ]],
        vec![
            vec![vec![-90000.0, -100000.0], vec![-89000.0, -100000.0], vec![-90000.0, -100000.0]],
            vec![vec![-89900.0, -99900.0], vec![-89800.0, -99900.0], vec![-89900.0, -99900.0]],
        ],
    ]));
    let transformer = Reprojector::offline().transformer(PT_TM06, WGS84).unwrap();
    let reprojected = reproject_geometry(&geometry, &transformer).unwrap();

    assert_eq!(position_count(&reprojected.value), position_count(&geometry.value));
    match (&geometry.value, &reprojected.value) {
        (Value::MultiPolygon(before), Value::MultiPolygon(after)) => {
            assert_eq!(before.len(), after.len());
            for (rings_before, rings_after) in before.iter().zip(after) {
                assert_eq!(rings_before.len(), rings_after.len());
                for (ring_before, ring_after) in rings_before.iter().zip(rings_after) {
                    assert_eq!(ring_before.len(), ring_after.len());
                }
            }
        }
        _ => panic!("Expected MultiPolygon"),
    }
}

/// Lengths of every coordinate array, outermost first, then positions
fn shape(value: &Value) -> Vec<usize> {
    fn rings(rings: &[Vec<Vec<f64>>], out: &mut Vec<usize>) {
        out.push(rings.len());
        for ring in rings {
            out.push(ring.len());
            out.extend(ring.iter().map(Vec::len));
        }
    }

    let mut out = Vec::new();
    match value {
        Value::Point(position) => out.push(position.len()),
        Value::MultiPoint(line) | Value::LineString(line) => {
            out.push(line.len());
            out.extend(line.iter().map(Vec::len));
        }
        Value::MultiLineString(lines) | Value::Polygon(lines) => rings(lines, &mut out),
        Value::MultiPolygon(polygons) => {
            out.push(polygons.len());
            for polygon in polygons {
                rings(polygon, &mut out);
            }
        }
        Value::GeometryCollection(geometries) => {
            out.push(geometries.len());
            for geometry in geometries {
                out.extend(shape(&geometry.value));
            }
        }
    }
    out
}

fn every_kind() -> Vec<Value> {
    let ring = vec![
        vec![-84000.0, 160000.0, 35.0],
        vec![-83000.0, 160000.0, 36.0],
        vec![-83000.0, 161000.0, 37.0],
        vec![-84000.0, 160000.0, 35.0],
    ];
    let line = vec![vec![-50000.0, 10000.0], vec![-49000.0, 11000.0], vec![-48000.0, 12500.0]];
    vec![
        Value::Point(vec![-84000.0, 160000.0]),
        Value::MultiPoint(vec![vec![-84000.0, 160000.0], vec![10000.0, -200000.0, 12.0]]),
        Value::LineString(line.clone()),
        Value::MultiLineString(vec![line.clone(), line[..2].to_vec()]),
        Value::Polygon(vec![ring.clone(), ring[..3].to_vec()]),
        Value::MultiPolygon(vec![vec![ring.clone()], vec![ring.clone(), ring.clone()]]),
        Value::GeometryCollection(vec![
            Geometry::new(Value::Point(vec![1000.0, 2000.0])),
            Geometry::new(Value::LineString(line)),
            Geometry::new(Value::Polygon(vec![ring])),
        ]),
    ]
}

#[test]
fn test_walker_preserves_shape_for_every_kind() {
    let reprojector = Reprojector::offline();
    let transformer = reprojector.transformer(PT_TM06, WGS84).unwrap();
    let back = reprojector.transformer(WGS84, PT_TM06).unwrap();

    for value in every_kind() {
        let geometry = Geometry::new(value);
        let reprojected = reproject_geometry(&geometry, &transformer).unwrap();
        assert_eq!(shape(&reprojected.value), shape(&geometry.value), "{:?}", geometry.value);
        assert_eq!(position_count(&reprojected.value), position_count(&geometry.value));
        assert_ne!(reprojected.value, geometry.value);

        let restored = reproject_geometry(&reprojected, &back).unwrap();
        assert_eq!(shape(&restored.value), shape(&geometry.value));
    }
}

proptest! {
    #[test]
    fn prop_identity_is_exact(x in -1.0e7f64..1.0e7, y in -1.0e7f64..1.0e7, code in 1000u32..100000) {
        let reprojector = Reprojector::offline();
        prop_assert_eq!(reprojector.convert(x, y, code, code).unwrap(), (x, y));
    }

    #[test]
    fn prop_tm06_round_trip(x in -150000.0f64..150000.0, y in -300000.0f64..280000.0) {
        let reprojector = Reprojector::offline();
        let (lon, lat) = reprojector.convert(x, y, PT_TM06, WGS84).unwrap();
        let (x2, y2) = reprojector.convert(lon, lat, WGS84, PT_TM06).unwrap();
        prop_assert!((x - x2).abs() < 1e-3, "x {} -> {}", x, x2);
        prop_assert!((y - y2).abs() < 1e-3, "y {} -> {}", y, y2);
    }

    #[test]
    fn prop_walker_keeps_line_length(points in prop::collection::vec((-150000.0f64..150000.0, -300000.0f64..280000.0), 2..20)) {
        let line: Vec<Vec<f64>> = points.iter().map(|(x, y)| vec![*x, *y]).collect();
        let geometry = Geometry::new(Value::LineString(line.clone()));
        let transformer = Reprojector::offline().transformer(PT_TM06, WGS84).unwrap();

        let reprojected = reproject_geometry(&geometry, &transformer).unwrap();
        match reprojected.value {
            Value::LineString(converted) => {
                prop_assert_eq!(converted.len(), line.len());
                for (before, after) in line.iter().zip(&converted) {
                    let expected = transformer.apply(before[0], before[1]).unwrap();
                    prop_assert_eq!((after[0], after[1]), expected);
                }
            }
            _ => prop_assert!(false, "Expected LineString"),
        }
    }
}
