//! Configuration loading for CLI commands

use crate::cli::Cli;
use agrosheet_core::config::{CliConfigOverrides, LayeredConfig};
use agrosheet_geo::definitions::{DefinitionCache, EpsgIoSource};
use agrosheet_geo::reproject::Reprojector;
use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;

/// Config file picked up from the working directory
pub const DEFAULT_CONFIG_FILE: &str = "agrosheet.toml";

/// Load configuration with precedence: CLI > Environment > File > Defaults
pub fn load(cli: &Cli) -> Result<LayeredConfig> {
    let mut config = LayeredConfig::with_defaults();

    match &cli.config {
        Some(path) => {
            config = config
                .load_from_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?;
        }
        None => {
            let path = Path::new(DEFAULT_CONFIG_FILE);
            if path.exists() {
                config = config.load_from_file(path)?;
            }
        }
    }

    let mut config = config.load_from_env();
    config.update_from_cli(CliConfigOverrides {
        definition_url: cli.definition_url.clone(),
        ..Default::default()
    });

    Ok(config)
}

/// Reprojector backed by the configured definition service
pub fn reprojector(config: &LayeredConfig) -> Reprojector {
    let source = EpsgIoSource::new(config.definition_url.value.clone());
    Reprojector::new(Arc::new(DefinitionCache::new())).with_source(Arc::new(source))
}
