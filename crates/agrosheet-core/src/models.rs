pub mod crs;
pub mod worksheet;

pub use crs::{known_crs, CrsDescriptor, CrsKind, KnownCrs, ReprojectionPolicy, KNOWN_CRS};
pub use worksheet::{
    key_text, AigpUsage, Feature, FeatureKey, JsonObject, Operation, Worksheet, WorksheetMetadata,
    AIGP_PROPERTY, AIGP_UNUSED_SENTINEL, KEY_PROPERTIES,
};
