use crate::runtime::{RegistryConfig, Visibility};
use crate::{MockError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::warn;

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = ".fnmock.toml";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub registry: RegistrySection,
    #[serde(default)]
    pub handle: HandleSection,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RegistrySection {
    /// Which threads observe a mock by default ("thread" or "process")
    #[serde(default)]
    pub visibility: Option<Visibility>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct HandleSection {
    /// What happens when an enabled handle is dropped ("warn" or "panic")
    #[serde(default)]
    pub on_leak: Option<LeakPolicy>,
}

/// Reaction to a handle that is dropped while still enabled.
///
/// The registry entry is removed in both cases.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LeakPolicy {
    #[default]
    Warn,
    Panic,
}

impl Config {
    /// Load configuration from a file in the working directory
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(DEFAULT_CONFIG_FILE))
    }

    /// Load configuration from `path`, returning defaults if it does not exist
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(config_path).map_err(|e| {
            MockError::ConfigError(format!(
                "Failed to read config file {:?}: {}",
                config_path, e
            ))
        })?;

        Self::from_toml(&content).map_err(|e| match e {
            MockError::ConfigError(msg) => {
                MockError::ConfigError(format!("{:?}: {}", config_path, msg))
            }
            other => other,
        })
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| MockError::ConfigError(format!("Failed to parse TOML config: {}", e)))
    }

    /// Load default config if file is missing, otherwise warn and fall back on failure
    pub fn load_or_default() -> Self {
        match Self::load() {
            Ok(config) => config,
            Err(e) => {
                warn!("Failed to load config: {}. Using defaults.", e);
                Config::default()
            }
        }
    }

    pub fn registry_config(&self) -> RegistryConfig {
        RegistryConfig {
            visibility: self.registry.visibility.unwrap_or_default(),
            on_leak: self.handle.on_leak.unwrap_or_default(),
        }
    }
}
