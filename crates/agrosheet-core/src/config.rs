use crate::error::{AgroError, Result};
use crate::models::ReprojectionPolicy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;

/// Default base URL of the projection-definition service
pub const DEFAULT_DEFINITION_URL: &str = "https://epsg.io";

/// Configuration source for tracking where values come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Default value
    Default,
    /// Loaded from config file
    File,
    /// Loaded from environment variable
    Environment,
    /// Provided via CLI argument
    Cli,
}

impl ConfigSource {
    /// Returns the precedence level (higher = higher priority)
    pub fn precedence(&self) -> u8 {
        match self {
            ConfigSource::Default => 0,
            ConfigSource::File => 1,
            ConfigSource::Environment => 2,
            ConfigSource::Cli => 3,
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }

    /// Update the value if the new source has higher precedence
    pub fn update(&mut self, value: T, source: ConfigSource) {
        if source.precedence() > self.source.precedence() {
            self.value = value;
            self.source = source;
        }
    }
}

/// Layered configuration for Agrosheet
#[derive(Debug, Clone)]
pub struct LayeredConfig {
    pub target_crs: ConfigValue<u32>,
    pub reprojection: ConfigValue<ReprojectionPolicy>,
    pub definition_url: ConfigValue<String>,
}

impl LayeredConfig {
    /// Create a new configuration with default values
    pub fn with_defaults() -> Self {
        Self {
            target_crs: ConfigValue::new(4326, ConfigSource::Default),
            reprojection: ConfigValue::new(ReprojectionPolicy::Lenient, ConfigSource::Default),
            definition_url: ConfigValue::new(
                DEFAULT_DEFINITION_URL.to_string(),
                ConfigSource::Default,
            ),
        }
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| AgroError::ConfigInvalid {
            key: "file".to_string(),
            reason: format!("Failed to read config file: {}", e),
        })?;

        let file_config: FileConfig =
            toml::from_str(&content).map_err(|e| AgroError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("Failed to parse TOML: {}", e),
            })?;

        if let Some(target_crs) = file_config.target_crs {
            self.target_crs.update(target_crs, ConfigSource::File);
        }

        if let Some(reprojection) = file_config.reprojection {
            self.reprojection.update(reprojection, ConfigSource::File);
        }

        if let Some(definition_url) = file_config.definition_url {
            self.definition_url.update(definition_url, ConfigSource::File);
        }

        Ok(self)
    }

    /// Load configuration from environment variables
    pub fn load_from_env(mut self) -> Self {
        // AGROSHEET_TARGET_CRS
        if let Ok(crs_str) = env::var("AGROSHEET_TARGET_CRS") {
            match parse_epsg(&crs_str) {
                Ok(crs) => self.target_crs.update(crs, ConfigSource::Environment),
                Err(_) => tracing::warn!(
                    "Invalid AGROSHEET_TARGET_CRS value '{}': expected an EPSG code",
                    crs_str
                ),
            }
        }

        // AGROSHEET_REPROJECTION
        if let Ok(policy_str) = env::var("AGROSHEET_REPROJECTION") {
            match parse_reprojection_policy(&policy_str) {
                Ok(policy) => self.reprojection.update(policy, ConfigSource::Environment),
                Err(_) => tracing::warn!(
                    "Invalid AGROSHEET_REPROJECTION value '{}': expected strict or lenient",
                    policy_str
                ),
            }
        }

        // AGROSHEET_DEFINITION_URL
        if let Ok(url) = env::var("AGROSHEET_DEFINITION_URL") {
            if url.trim().is_empty() {
                tracing::warn!("Ignoring empty AGROSHEET_DEFINITION_URL");
            } else {
                self.definition_url.update(url, ConfigSource::Environment);
            }
        }

        self
    }

    /// Update configuration from CLI arguments
    pub fn update_from_cli(&mut self, overrides: CliConfigOverrides) {
        if let Some(target_crs) = overrides.target_crs {
            self.target_crs.update(target_crs, ConfigSource::Cli);
        }

        if let Some(reprojection) = overrides.reprojection {
            self.reprojection.update(reprojection, ConfigSource::Cli);
        }

        if let Some(definition_url) = overrides.definition_url {
            self.definition_url.update(definition_url, ConfigSource::Cli);
        }
    }

    /// Get all configuration values as a map for inspection
    pub fn to_inspection_map(&self) -> HashMap<String, (String, ConfigSource)> {
        let mut map = HashMap::new();

        map.insert(
            "target_crs".to_string(),
            (format!("EPSG:{}", self.target_crs.value), self.target_crs.source),
        );

        map.insert(
            "reprojection".to_string(),
            (format!("{:?}", self.reprojection.value), self.reprojection.source),
        );

        map.insert(
            "definition_url".to_string(),
            (self.definition_url.value.clone(), self.definition_url.source),
        );

        map
    }
}

/// Configuration loaded from TOML file
#[derive(Debug, Deserialize, Serialize)]
struct FileConfig {
    target_crs: Option<u32>,
    reprojection: Option<ReprojectionPolicy>,
    definition_url: Option<String>,
}

/// CLI configuration overrides
#[derive(Debug, Default)]
pub struct CliConfigOverrides {
    pub target_crs: Option<u32>,
    pub reprojection: Option<ReprojectionPolicy>,
    pub definition_url: Option<String>,
}

/// Parse an EPSG code given as `4326` or `EPSG:4326`
pub fn parse_epsg(s: &str) -> Result<u32> {
    let trimmed = s.trim();
    let digits = match trimmed.get(..5) {
        Some(prefix) if prefix.eq_ignore_ascii_case("epsg:") => &trimmed[5..],
        _ => trimmed,
    };
    digits.parse::<u32>().map_err(|_| AgroError::ConfigInvalid {
        key: "crs".to_string(),
        reason: format!("Invalid EPSG code: {}. Use a number such as 4326 or EPSG:4326", s),
    })
}

/// Parse reprojection policy from string
pub fn parse_reprojection_policy(s: &str) -> Result<ReprojectionPolicy> {
    match s.to_lowercase().as_str() {
        "strict" => Ok(ReprojectionPolicy::Strict),
        "lenient" => Ok(ReprojectionPolicy::Lenient),
        _ => Err(AgroError::ConfigInvalid {
            key: "reprojection".to_string(),
            reason: format!("Invalid reprojection policy: {}. Use strict or lenient", s),
        }),
    }
}
