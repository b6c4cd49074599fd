//! Migration tool configuration
//!
//! ```toml
//! [chain_api]
//! base_url = "http://127.0.0.1:3002/api"
//! timeout_secs = 10
//! ```

use crate::error::ConfigError;
use chandb_chain::{ChainApiConfig, DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MigrateConfig {
    pub chain_api: ChainApiSection,
}

/// `[chain_api]` table
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChainApiSection {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ChainApiSection {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
        }
    }
}

impl MigrateConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from TOML text
    ///
    /// # Errors
    /// Returns [`ConfigError::Parse`] on malformed TOML or unknown keys
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a TOML file
    ///
    /// # Errors
    /// Returns error on IO failure or malformed TOML
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// With lookup service root
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.chain_api.base_url = base_url.into();
        self
    }

    /// With lookup timeout in seconds
    #[must_use]
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.chain_api.timeout_secs = secs;
        self
    }

    /// Lookup client configuration
    ///
    /// # Errors
    /// Returns [`ConfigError::Invalid`] for an empty url or a zero timeout
    pub fn chain_api_config(&self) -> Result<ChainApiConfig, ConfigError> {
        let config = ChainApiConfig::new(self.chain_api.base_url.clone())
            .with_timeout(Duration::from_secs(self.chain_api.timeout_secs));
        config
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Ok(config)
    }
}
