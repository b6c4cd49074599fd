//! Chain API client configuration

use crate::error::LookupError;
use std::time::Duration;

/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default transaction lookup service
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:3002/api";

/// Where and how long to ask for transaction locations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainApiConfig {
    /// Service root; requests go to `{base_url}/tx/{txid}`
    pub base_url: String,
    /// Whole-request timeout, always bounded
    pub timeout: Duration,
}

impl ChainApiConfig {
    /// Create configuration for a service root
    #[inline]
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// With request timeout
    #[inline]
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Check the configuration is usable
    ///
    /// # Errors
    /// Returns [`LookupError::Config`] for an empty base url or a zero timeout
    pub fn validate(&self) -> Result<(), LookupError> {
        if self.base_url.trim().is_empty() {
            return Err(LookupError::Config("base_url is empty".to_string()));
        }
        if self.timeout.is_zero() {
            return Err(LookupError::Config("timeout must be non-zero".to_string()));
        }
        Ok(())
    }

    /// Lookup URL for a transaction id in display (byte-reversed) hex
    #[must_use]
    pub fn tx_url(&self, txid_hex: &str) -> String {
        format!("{}/tx/{}", self.base_url.trim_end_matches('/'), txid_hex)
    }
}

impl Default for ChainApiConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_timeout_is_bounded() {
        let config = ChainApiConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_timeout_rejected() {
        let config = ChainApiConfig::default().with_timeout(Duration::ZERO);
        assert!(matches!(config.validate(), Err(LookupError::Config(_))));
    }

    #[test]
    fn empty_base_url_rejected() {
        assert!(ChainApiConfig::new("  ").validate().is_err());
    }

    #[test]
    fn tx_url_trims_trailing_slash() {
        let config = ChainApiConfig::new("http://host:1/api/");
        assert_eq!(config.tx_url("abcd"), "http://host:1/api/tx/abcd");
    }
}
