use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::keychain::{Options, DEFAULT_SERVICE};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Namespace and default write options of a keychain handle
///
/// ```toml
/// access_group = "com.example.shared"
/// service = "mail"
///
/// [options]
/// access_protection = "when_unlocked_this_device_only"
/// authentication = ["biometry_any"]
/// encrypt_items = true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeychainConfig {
    /// Access group records are scoped to (optional)
    #[serde(default)]
    pub access_group: Option<String>,
    /// Service items are saved under when none is given
    #[serde(default = "default_service")]
    pub service: String,
    /// Options items and keys are written with by default
    #[serde(default)]
    pub options: Options,
}

fn default_service() -> String {
    DEFAULT_SERVICE.to_string()
}

impl Default for KeychainConfig {
    fn default() -> Self {
        Self {
            access_group: None,
            service: default_service(),
            options: Options::default(),
        }
    }
}

impl KeychainConfig {
    pub fn from_toml_str(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path.as_ref())?;
        let config = Self::from_toml_str(&contents)?;
        tracing::debug!("loaded keychain config from {}", path.as_ref().display());
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        fs::write(path.as_ref(), self.to_toml_string()?)?;
        Ok(())
    }
}
