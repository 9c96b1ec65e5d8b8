//! Coordinate reprojection between EPSG-coded systems.
//!
//! Pairs where both sides have a closed form go through geographic
//! coordinates without PROJ. Every other pair needs a PROJ definition for
//! both sides, either built in or fetched into the shared
//! [`DefinitionCache`] by [`Reprojector::ensure_definition`].

use crate::definitions::{DefinitionCache, DefinitionSource};
use crate::projection::Planar;
use agrosheet_core::error::{AgroError, Result};
use agrosheet_core::models::crs::{known_crs, CrsKind};
use proj::Proj;
use std::fmt;
use std::sync::Arc;

/// Outcome of a best-effort conversion
#[derive(Debug, Clone, PartialEq)]
pub enum Conversion {
    Converted { x: f64, y: f64 },
    /// The original coordinate, returned because the conversion failed
    Unconverted { x: f64, y: f64, reason: String },
}

impl Conversion {
    pub fn coordinates(&self) -> (f64, f64) {
        match self {
            Conversion::Converted { x, y } | Conversion::Unconverted { x, y, .. } => (*x, *y),
        }
    }

    pub fn is_converted(&self) -> bool {
        matches!(self, Conversion::Converted { .. })
    }
}

enum Pipeline {
    Identity,
    ClosedForm { from: Planar, to: Planar },
    Engine(Proj),
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pipeline::Identity => f.write_str("Identity"),
            Pipeline::ClosedForm { from, to } => {
                f.debug_struct("ClosedForm").field("from", from).field("to", to).finish()
            }
            Pipeline::Engine(_) => f.write_str("Engine"),
        }
    }
}

/// A prepared conversion from one CRS to another
#[derive(Debug)]
pub struct Transformer {
    from: u32,
    to: u32,
    pipeline: Pipeline,
}

impl Transformer {
    pub fn source(&self) -> u32 {
        self.from
    }

    pub fn target(&self) -> u32 {
        self.to
    }

    pub fn is_identity(&self) -> bool {
        matches!(self.pipeline, Pipeline::Identity)
    }

    /// Convert one coordinate pair
    pub fn apply(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        let (out_x, out_y) = match &self.pipeline {
            Pipeline::Identity => return Ok((x, y)),
            Pipeline::ClosedForm { from, to } => {
                let (lon, lat) = from.to_geographic(x, y);
                self.check_geographic(lon, lat)?;
                to.from_geographic(lon, lat)
            }
            Pipeline::Engine(proj) => proj.convert((x, y)).map_err(|e| self.error(e))?,
        };

        if !out_x.is_finite() || !out_y.is_finite() {
            return Err(self.error(format!("non-finite result for ({}, {})", x, y)));
        }
        if is_geographic(self.to) {
            self.check_geographic(out_x, out_y)?;
        }
        Ok((out_x, out_y))
    }

    /// Convert a GeoJSON position, keeping any elevation and extra values
    pub fn apply_position(&self, position: &[f64]) -> Result<Vec<f64>> {
        let (x, y) = match position {
            [x, y, ..] => (*x, *y),
            _ => {
                return Err(self.error(format!(
                    "position needs at least 2 values, found {}",
                    position.len()
                )))
            }
        };
        let (x, y) = self.apply(x, y)?;
        let mut converted = Vec::with_capacity(position.len());
        converted.push(x);
        converted.push(y);
        converted.extend_from_slice(&position[2..]);
        Ok(converted)
    }

    fn check_geographic(&self, lon: f64, lat: f64) -> Result<()> {
        if !lon.is_finite()
            || !lat.is_finite()
            || !(-180.0..=180.0).contains(&lon)
            || !(-90.0..=90.0).contains(&lat)
        {
            return Err(self.error(format!(
                "({}, {}) is outside geographic bounds",
                lon, lat
            )));
        }
        Ok(())
    }

    fn error(&self, reason: impl fmt::Display) -> AgroError {
        AgroError::Projection { from: self.from, to: self.to, reason: reason.to_string() }
    }
}

/// PROJ only reads a definition string as a CRS when it says so
fn as_crs(definition: &str) -> String {
    if definition.contains("+type=crs") {
        definition.to_string()
    } else {
        format!("{} +type=crs", definition)
    }
}

fn is_geographic(epsg: u32) -> bool {
    known_crs(epsg).map(|known| known.kind == CrsKind::Geographic).unwrap_or(false)
}

/// Converts coordinates between CRSs, sharing a definition cache
#[derive(Clone)]
pub struct Reprojector {
    cache: Arc<DefinitionCache>,
    source: Option<Arc<dyn DefinitionSource>>,
}

impl Reprojector {
    /// Reprojector using `cache` for fetched definitions and no remote source
    pub fn new(cache: Arc<DefinitionCache>) -> Self {
        Self { cache, source: None }
    }

    /// Reprojector with a private cache and no remote source
    pub fn offline() -> Self {
        Self::new(Arc::new(DefinitionCache::new()))
    }

    /// Attach the remote source consulted for unknown codes
    pub fn with_source(mut self, source: Arc<dyn DefinitionSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn cache(&self) -> &Arc<DefinitionCache> {
        &self.cache
    }

    /// PROJ definition for `epsg`, built in or cached
    pub fn definition(&self, epsg: u32) -> Option<String> {
        match known_crs(epsg) {
            Some(known) => Some(known.proj4.to_string()),
            None => self.cache.get(epsg),
        }
    }

    /// True when converting between the two codes needs no definition lookup
    pub fn is_closed_form(from: u32, to: u32) -> bool {
        from == to || (Planar::for_epsg(from).is_some() && Planar::for_epsg(to).is_some())
    }

    /// Make sure a definition for `epsg` is available, fetching it once if needed
    pub async fn ensure_definition(&self, epsg: u32) -> Result<()> {
        if self.definition(epsg).is_some() {
            return Ok(());
        }

        let source = self.source.as_ref().ok_or_else(|| AgroError::DefinitionUnavailable {
            epsg,
            reason: "no definition source configured".to_string(),
        })?;

        let definition = source.fetch(epsg).await?;
        tracing::info!(epsg, "Cached projection definition");
        self.cache.insert(epsg, definition);
        Ok(())
    }

    /// Fetch whatever the pair needs, then build its transformer
    pub async fn prepare(&self, from: u32, to: u32) -> Result<Transformer> {
        if !Self::is_closed_form(from, to) {
            self.ensure_definition(from).await?;
            self.ensure_definition(to).await?;
        }
        self.transformer(from, to)
    }

    /// Build a transformer from what is available right now
    pub fn transformer(&self, from: u32, to: u32) -> Result<Transformer> {
        if from == to {
            return Ok(Transformer { from, to, pipeline: Pipeline::Identity });
        }

        if let (Some(from_planar), Some(to_planar)) = (Planar::for_epsg(from), Planar::for_epsg(to))
        {
            return Ok(Transformer {
                from,
                to,
                pipeline: Pipeline::ClosedForm { from: from_planar, to: to_planar },
            });
        }

        let from_def = as_crs(&self.require_definition(from)?);
        let to_def = as_crs(&self.require_definition(to)?);
        let proj = Proj::new_known_crs(&from_def, &to_def, None).map_err(|e| {
            AgroError::Projection {
                from,
                to,
                reason: format!("Failed to create projection: {}", e),
            }
        })?;

        Ok(Transformer { from, to, pipeline: Pipeline::Engine(proj) })
    }

    fn require_definition(&self, epsg: u32) -> Result<String> {
        self.definition(epsg).ok_or_else(|| AgroError::DefinitionUnavailable {
            epsg,
            reason: "definition not loaded".to_string(),
        })
    }

    /// Convert one coordinate pair
    pub fn convert(&self, x: f64, y: f64, from: u32, to: u32) -> Result<(f64, f64)> {
        if from == to {
            return Ok((x, y));
        }
        self.transformer(from, to)?.apply(x, y)
    }

    /// Convert a GeoJSON position, keeping any elevation
    pub fn convert_position(&self, position: &[f64], from: u32, to: u32) -> Result<Vec<f64>> {
        self.transformer(from, to)?.apply_position(position)
    }

    /// Convert, or hand back the original coordinate tagged with the reason
    pub fn convert_or_original(&self, x: f64, y: f64, from: u32, to: u32) -> Conversion {
        match self.convert(x, y, from, to) {
            Ok((x, y)) => Conversion::Converted { x, y },
            Err(e) => {
                tracing::warn!(from, to, x, y, "Keeping unconverted coordinate: {}", e);
                Conversion::Unconverted { x, y, reason: e.to_string() }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agrosheet_core::models::crs::{PT_TM06, UTM_29N, WEB_MERCATOR, WGS84};

    #[test]
    fn test_identity_is_exact() {
        let reprojector = Reprojector::offline();
        let (x, y) = reprojector.convert(-84000.123456789, 160000.987654321, 3763, 3763).unwrap();
        assert_eq!((x, y), (-84000.123456789, 160000.987654321));

        // Identity does not need a definition even for unknown codes
        assert_eq!(reprojector.convert(1.5, 2.5, 99999, 99999).unwrap(), (1.5, 2.5));
    }

    #[test]
    fn test_tm06_to_wgs84() {
        let reprojector = Reprojector::offline();
        let (lon, lat) = reprojector.convert(-84000.0, 160000.0, PT_TM06, WGS84).unwrap();
        assert!((lon - -9.13308).abs() < 1e-4);
        assert!((lat - 41.10481).abs() < 1e-4);
    }

    #[test]
    fn test_tm06_to_utm_through_geographic() {
        let reprojector = Reprojector::offline();
        let (x, y) = reprojector.convert(-84000.0, 160000.0, PT_TM06, UTM_29N).unwrap();
        assert!(x > 400000.0 && x < 600000.0, "x = {}", x);
        assert!(y > 4500000.0 && y < 4600000.0, "y = {}", y);
    }

    #[test]
    fn test_web_mercator_pair() {
        let reprojector = Reprojector::offline();
        let (x, y) = reprojector.convert(-9.2, 38.6, WGS84, WEB_MERCATOR).unwrap();
        let (lon, lat) = reprojector.convert(x, y, WEB_MERCATOR, WGS84).unwrap();
        assert!((lon - -9.2).abs() < 1e-9);
        assert!((lat - 38.6).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_code_without_definition_fails_naming_crs() {
        let reprojector = Reprojector::offline();
        let err = reprojector.convert(100.0, 200.0, 27493, WGS84).unwrap_err();
        assert!(matches!(err, AgroError::DefinitionUnavailable { epsg: 27493, .. }));
        assert!(err.to_string().contains("EPSG:27493"));
    }

    #[test]
    fn test_convert_or_original_tags_fallback() {
        let reprojector = Reprojector::offline();
        let outcome = reprojector.convert_or_original(100.0, 200.0, 27493, WGS84);
        assert!(!outcome.is_converted());
        assert_eq!(outcome.coordinates(), (100.0, 200.0));
        assert!(matches!(outcome, Conversion::Unconverted { ref reason, .. } if reason.contains("27493")));
    }

    #[test]
    fn test_out_of_domain_result_is_an_error() {
        let reprojector = Reprojector::offline();
        let result = reprojector.convert(-84000.0, 9.0e7, PT_TM06, WGS84);
        assert!(matches!(result, Err(AgroError::Projection { from: 3763, to: 4326, .. })));
    }

    #[test]
    fn test_position_keeps_elevation() {
        let reprojector = Reprojector::offline();
        let converted = reprojector.convert_position(&[-84000.0, 160000.0, 212.5], PT_TM06, WGS84).unwrap();
        assert_eq!(converted.len(), 3);
        assert_eq!(converted[2], 212.5);

        assert!(reprojector.convert_position(&[1.0], PT_TM06, WGS84).is_err());
    }

    #[test]
    fn test_closed_form_classification() {
        assert!(Reprojector::is_closed_form(3763, 4326));
        assert!(Reprojector::is_closed_form(27493, 27493));
        assert!(!Reprojector::is_closed_form(3035, 4326));
    }
}
