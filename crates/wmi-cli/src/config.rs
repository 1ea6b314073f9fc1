//! Client configuration (wmi.toml)
//!
//! ```toml
//! namespace = "ROOT\\CIMV2"
//! fixture = "repository.json"
//! log = "wmi_core=debug"
//! ```
//!
//! Every key is optional. A relative `fixture` path is resolved against the
//! directory of the config file. `WMI_NAMESPACE` overrides `namespace`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Config file looked up in the working directory when none is given
pub const DEFAULT_CONFIG_FILE: &str = "wmi.toml";

/// Environment variable overriding the configured namespace
pub const NAMESPACE_ENV: &str = "WMI_NAMESPACE";

/// Errors that can occur while loading the configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the config file
    #[error("Failed to read config file {}: {source}", path.display())]
    Io {
        /// File that was read
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Validation error
    #[error("Invalid config: {0}")]
    Validation(String),
}

/// Client settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    /// Namespace to connect to
    pub namespace: String,

    /// Repository fixture; the built-in sample repository when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fixture: Option<PathBuf>,

    /// Default log filter, used when `WMI_LOG` is not set
    pub log: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            namespace: wmi_core::ROOT_CIMV2.to_string(),
            fixture: None,
            log: "warn".to_string(),
        }
    }
}

impl ClientConfig {
    /// Parse a config from a string
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: ClientConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a config file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_str(&content)?;

        if let (Some(fixture), Some(dir)) = (&config.fixture, path.parent()) {
            if fixture.is_relative() {
                config.fixture = Some(dir.join(fixture));
            }
        }
        Ok(config)
    }

    /// Load the explicit config file, or `wmi.toml` when it exists, or the
    /// defaults; then apply the environment.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.is_file() {
                    Self::from_file(path)?
                } else {
                    Self::default()
                }
            }
        };
        config.with_env(|key| std::env::var(key).ok())
    }

    /// Apply environment overrides read through `lookup`
    pub fn with_env(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(namespace) = lookup(NAMESPACE_ENV).filter(|ns| !ns.trim().is_empty()) {
            tracing::debug!(namespace = %namespace, "namespace taken from {}", NAMESPACE_ENV);
            self.namespace = namespace;
        }
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if wmi_core::normalize_namespace(&self.namespace).is_empty() {
            return Err(ConfigError::Validation(
                "namespace cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}
