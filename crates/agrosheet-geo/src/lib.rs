//! Agrosheet Geo - CRS detection, reprojection and geometry walking
//!
//! This crate detects the CRS of GeoJSON-like documents, converts
//! coordinates between EPSG systems and applies conversions across every
//! GeoJSON geometry kind.

pub mod definitions;
pub mod detect;
pub mod projection;
pub mod reproject;
pub mod transform;
pub mod validation;

pub use definitions::{DefinitionCache, DefinitionSource, EpsgIoSource};
pub use detect::detect;
pub use reproject::{Conversion, Reprojector, Transformer};
pub use transform::{reproject_geometry, reproject_geometry_lenient, Fallback};
pub use validation::parse_geometry;
