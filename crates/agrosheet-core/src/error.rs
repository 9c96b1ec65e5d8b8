//! Error types for Agrosheet

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgroError {
    // Malformed input
    #[error("Malformed document: {reason}")]
    MalformedDocument { reason: String },

    #[error("Malformed geometry in feature {feature}: {reason}")]
    MalformedGeometry { feature: String, reason: String },

    #[error("Unsupported geometry kind: {kind}")]
    UnsupportedGeometryKind { kind: String },

    // Projection errors
    #[error("Projection definition unavailable for EPSG:{epsg}: {reason}")]
    DefinitionUnavailable { epsg: u32, reason: String },

    #[error("Projection from EPSG:{from} to EPSG:{to} failed: {reason}")]
    Projection { from: u32, to: u32, reason: String },

    // Feature key errors
    #[error("Feature key '{key}' is already used in this worksheet")]
    DuplicateFeatureKey { key: String },

    #[error("Feature not found: {key}")]
    FeatureNotFound { key: String },

    // Configuration errors
    #[error("Missing required configuration: {key}")]
    ConfigMissing { key: String },

    #[error("Invalid configuration value for {key}: {reason}")]
    ConfigInvalid { key: String, reason: String },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl AgroError {
    /// Shorthand for a malformed top-level document
    pub fn malformed(reason: impl Into<String>) -> Self {
        AgroError::MalformedDocument { reason: reason.into() }
    }

    /// True for errors caused by a projection that could not be carried out
    pub fn is_projection(&self) -> bool {
        matches!(self, AgroError::DefinitionUnavailable { .. } | AgroError::Projection { .. })
    }
}

pub type Result<T> = std::result::Result<T, AgroError>;
