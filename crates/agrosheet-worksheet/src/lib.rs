//! Agrosheet Worksheet - backend and file forms of a worksheet
//!
//! Maps between the backend's flat worksheet JSON and the keyed in-memory
//! [`Worksheet`](agrosheet_core::models::Worksheet), and imports and exports
//! GeoJSON FeatureCollections with CRS detection and reprojection.

pub mod aigp;
pub mod export;
pub mod import;
pub mod keys;
pub mod normalize;
pub mod wire;

pub use export::export_feature_collection;
pub use import::{import_feature_collection, ImportOptions, ImportedWorksheet};
pub use normalize::{denormalize, normalize};
