//! Projection definitions for CRSs outside the closed-form set.
//!
//! Definitions are PROJ strings. Known codes carry a built-in definition;
//! anything else is fetched once from a [`DefinitionSource`] and kept in a
//! [`DefinitionCache`] for the lifetime of the process.

use agrosheet_core::config::DEFAULT_DEFINITION_URL;
use agrosheet_core::error::{AgroError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

/// Port for looking up a projection definition by EPSG code
#[async_trait]
pub trait DefinitionSource: Send + Sync {
    /// Fetch the PROJ definition text for `epsg`
    async fn fetch(&self, epsg: u32) -> Result<String>;
}

/// Definition source backed by an epsg.io compatible HTTP service
pub struct EpsgIoSource {
    /// Base URL (e.g., "https://epsg.io")
    base_url: String,

    /// HTTP client
    client: reqwest::Client,
}

impl EpsgIoSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into(), client: reqwest::Client::new() }
    }

    /// URL serving the PROJ definition of `epsg`
    pub fn url(&self, epsg: u32) -> String {
        format!("{}/{}.proj4", self.base_url.trim_end_matches('/'), epsg)
    }
}

impl Default for EpsgIoSource {
    fn default() -> Self {
        Self::new(DEFAULT_DEFINITION_URL)
    }
}

#[async_trait]
impl DefinitionSource for EpsgIoSource {
    async fn fetch(&self, epsg: u32) -> Result<String> {
        let url = self.url(epsg);
        tracing::debug!(epsg, url = %url, "Fetching projection definition");

        let response =
            self.client.get(&url).send().await.map_err(|e| AgroError::DefinitionUnavailable {
                epsg,
                reason: format!("Failed to reach {}: {}", self.base_url, e),
            })?;

        if !response.status().is_success() {
            return Err(AgroError::DefinitionUnavailable {
                epsg,
                reason: format!("{} answered {}", url, response.status()),
            });
        }

        let text = response.text().await.map_err(|e| AgroError::DefinitionUnavailable {
            epsg,
            reason: format!("Failed to read response body: {}", e),
        })?;

        parse_definition(epsg, &text)
    }
}

/// Validate the body returned by a definition service
pub fn parse_definition(epsg: u32, text: &str) -> Result<String> {
    let definition = text.trim();
    if !definition.contains("+proj=") {
        return Err(AgroError::DefinitionUnavailable {
            epsg,
            reason: "Response is not a PROJ definition".to_string(),
        });
    }
    Ok(definition.to_string())
}

/// Append-only cache of fetched definitions.
///
/// Constructed once and shared (`Arc`) by every reprojector that should see
/// the same fetched definitions.
#[derive(Debug, Default)]
pub struct DefinitionCache {
    entries: RwLock<HashMap<u32, String>>,
}

impl DefinitionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, epsg: u32) -> Option<String> {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).get(&epsg).cloned()
    }

    pub fn contains(&self, epsg: u32) -> bool {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).contains_key(&epsg)
    }

    /// Store a definition. An existing entry wins and is returned.
    pub fn insert(&self, epsg: u32, definition: String) -> String {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.entry(epsg).or_insert(definition).clone()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
