//! Model: DelogConfig and related types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::DelogError;
use crate::parser::{Options, DEFAULT_PARSER};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DelogConfig {
    /// Parser type selector, e.g. `basic`.
    pub parser: String,
    /// Read-only settings handed to rule code.
    pub settings: BTreeMap<String, String>,
    pub output: OutputFormat,
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub log_filter: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One JSON object per line.
    #[default]
    Json,
    /// Indented JSON.
    Pretty,
}

impl std::str::FromStr for OutputFormat {
    type Err = DelogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "pretty" => Ok(OutputFormat::Pretty),
            other => Err(DelogError::configuration(format!(
                "output must be `json' or `pretty', got `{}'",
                other
            ))),
        }
    }
}

impl Default for DelogConfig {
    fn default() -> Self {
        Self {
            parser: DEFAULT_PARSER.to_string(),
            settings: BTreeMap::new(),
            output: OutputFormat::Json,
            log_filter: "delog=info".to_string(),
        }
    }
}

impl DelogConfig {
    /// Check values that serde cannot.
    pub fn validate(&self) -> Result<(), DelogError> {
        if self.parser.trim().is_empty() {
            return Err(DelogError::configuration("parser must not be empty"));
        }
        if self.settings.keys().any(|k| k.trim().is_empty()) {
            return Err(DelogError::configuration("setting names must not be empty"));
        }
        Ok(())
    }

    /// The read-only options every parsed line receives.
    pub fn to_options(&self) -> Options {
        Options::new(self.parser.as_str()).with_settings(self.settings.clone())
    }
}
