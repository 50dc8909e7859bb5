//! Load: config loading from file and environment variables.

use std::fs;
use std::path::Path;

use tracing::info;

use super::model::DelogConfig;
use crate::error::DelogError;

pub const CONFIG_FILE_VAR: &str = "DELOG_CONFIG_FILE";
pub const DEFAULT_CONFIG_FILE: &str = "delog.toml";

impl DelogConfig {
    /// Load configuration.
    /// Priority: Environment Variables > Config File > Defaults
    pub fn load() -> Result<Self, DelogError> {
        let config_path =
            std::env::var(CONFIG_FILE_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::load_from(&config_path)
    }

    /// Like [`DelogConfig::load`] with an explicit file path. A missing file
    /// falls back to defaults.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, DelogError> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            info!("Loading configuration from: {}", path.display());
            Self::from_file(path)?
        } else {
            info!("Config file not found at {}, using defaults", path.display());
            Self::default()
        };

        config.apply_env(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, DelogError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        toml::from_str(&contents).map_err(|e| {
            DelogError::configuration(format!("invalid config {}: {}", path.display(), e))
        })
    }

    /// Apply `DELOG_*` overrides read through `lookup`.
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), DelogError> {
        if let Some(parser) = lookup("DELOG_PARSER") {
            self.parser = parser;
        }
        if let Some(output) = lookup("DELOG_OUTPUT") {
            self.output = output.parse()?;
        }
        if let Some(filter) = lookup("DELOG_LOG") {
            self.log_filter = filter;
        }
        Ok(())
    }
}
