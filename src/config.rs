//! Instagram publishing plugin configuration
//!
//! Configuration can be loaded from environment variables or constructed programmatically.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{InstagramError, Result};
use crate::{DEFAULT_GRAPH_API_VERSION, DEFAULT_GRAPH_HOST};

/// Instagram publishing plugin configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstagramConfig {
    /// Graph API user access token with publish permissions (required)
    pub access_token: String,

    /// Default Graph API version for items that do not set one
    pub graph_api_version: String,

    /// Graph API host, without scheme
    pub host_url: String,

    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,

    /// Record failed items and keep going instead of aborting the batch
    pub continue_on_fail: bool,
}

impl InstagramConfig {
    /// Create a new configuration with required fields only
    ///
    /// # Example
    ///
    /// ```
    /// use elizaos_plugin_instagram_publish::InstagramConfig;
    ///
    /// let config = InstagramConfig::new("EAAG...".to_string());
    /// assert_eq!(config.graph_api_version, "v22.0");
    /// ```
    pub fn new(access_token: String) -> Self {
        Self {
            access_token,
            graph_api_version: DEFAULT_GRAPH_API_VERSION.to_string(),
            host_url: DEFAULT_GRAPH_HOST.to_string(),
            request_timeout_secs: 30,
            continue_on_fail: false,
        }
    }

    /// Load configuration from environment variables
    ///
    /// # Required Variables
    ///
    /// - `INSTAGRAM_ACCESS_TOKEN`: Graph API access token
    ///
    /// # Optional Variables
    ///
    /// - `INSTAGRAM_GRAPH_API_VERSION`: e.g. `v22.0`
    /// - `INSTAGRAM_GRAPH_HOST`: Graph API host
    /// - `INSTAGRAM_REQUEST_TIMEOUT_SECS`: Request timeout in seconds
    /// - `INSTAGRAM_CONTINUE_ON_FAIL`: "true" or "false"
    ///
    /// # Errors
    ///
    /// Returns `InstagramError::MissingSetting` if required variables are missing.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();

        let access_token = std::env::var("INSTAGRAM_ACCESS_TOKEN")
            .map_err(|_| InstagramError::MissingSetting("INSTAGRAM_ACCESS_TOKEN".to_string()))?;

        if access_token.is_empty() {
            return Err(InstagramError::ConfigError(
                "INSTAGRAM_ACCESS_TOKEN cannot be empty".to_string(),
            ));
        }

        let graph_api_version = std::env::var("INSTAGRAM_GRAPH_API_VERSION")
            .unwrap_or_else(|_| DEFAULT_GRAPH_API_VERSION.to_string());

        let host_url = std::env::var("INSTAGRAM_GRAPH_HOST")
            .unwrap_or_else(|_| DEFAULT_GRAPH_HOST.to_string());

        let request_timeout_secs = std::env::var("INSTAGRAM_REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(30);

        let continue_on_fail = std::env::var("INSTAGRAM_CONTINUE_ON_FAIL")
            .ok()
            .map(|s| s.to_lowercase() == "true")
            .unwrap_or(false);

        Ok(Self {
            access_token,
            graph_api_version,
            host_url,
            request_timeout_secs,
            continue_on_fail,
        })
    }

    /// Set the default Graph API version (builder pattern)
    pub fn with_graph_api_version(mut self, version: String) -> Self {
        self.graph_api_version = version;
        self
    }

    /// Set the Graph API host (builder pattern)
    pub fn with_host_url(mut self, host_url: String) -> Self {
        self.host_url = host_url;
        self
    }

    /// Set the request timeout (builder pattern)
    pub fn with_request_timeout_secs(mut self, seconds: u64) -> Self {
        self.request_timeout_secs = seconds;
        self
    }

    /// Set continue-on-fail (builder pattern)
    pub fn with_continue_on_fail(mut self, continue_on_fail: bool) -> Self {
        self.continue_on_fail = continue_on_fail;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.access_token.is_empty() {
            return Err(InstagramError::ConfigError(
                "Access token cannot be empty".to_string(),
            ));
        }

        validate_graph_api_version(&self.graph_api_version)?;

        if self.host_url.is_empty() || self.host_url.contains("://") || self.host_url.contains('/') {
            return Err(InstagramError::ConfigError(format!(
                "Graph host must be a bare hostname, got '{}'",
                self.host_url
            )));
        }

        Url::parse(&format!("https://{}/{}/", self.host_url, self.graph_api_version)).map_err(
            |e| InstagramError::ConfigError(format!("Invalid Graph API base URL: {}", e)),
        )?;

        if self.request_timeout_secs == 0 {
            return Err(InstagramError::ConfigError(
                "Request timeout must be at least 1 second".to_string(),
            ));
        }

        Ok(())
    }
}

static GRAPH_API_VERSION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^v\d+\.\d+$").expect("valid Graph API version pattern"));

/// Check a Graph API version string such as `v22.0`
pub fn validate_graph_api_version(version: &str) -> Result<()> {
    if !GRAPH_API_VERSION_PATTERN.is_match(version) {
        return Err(InstagramError::ConfigError(format!(
            "Graph API version must look like v22.0, got '{}'",
            version
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_new() {
        let config = InstagramConfig::new("token".to_string());
        assert_eq!(config.access_token, "token");
        assert_eq!(config.host_url, "graph.facebook.com");
        assert!(!config.continue_on_fail);
    }

    #[test]
    fn test_config_builder_pattern() {
        let config = InstagramConfig::new("token".to_string())
            .with_graph_api_version("v21.0".to_string())
            .with_continue_on_fail(true)
            .with_request_timeout_secs(5);

        assert_eq!(config.graph_api_version, "v21.0");
        assert!(config.continue_on_fail);
        assert_eq!(config.request_timeout_secs, 5);
    }

    #[test]
    fn test_validate_valid() {
        let config = InstagramConfig::new("token".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_token() {
        let config = InstagramConfig::new("".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_bad_version() {
        let config = InstagramConfig::new("token".to_string())
            .with_graph_api_version("22".to_string());
        assert!(config.validate().is_err());
        assert!(validate_graph_api_version("v19.0").is_ok());
    }

    #[test]
    fn test_graph_api_version_shapes() {
        for version in ["v22.0", "v9.1", "v100.10"] {
            assert!(validate_graph_api_version(version).is_ok(), "{version}");
        }
        for version in ["v22", "v22.0.1", "22.0", "V22.0", " v22.0", "v22.0 ", "vX.0", ""] {
            assert!(validate_graph_api_version(version).is_err(), "{version}");
        }
    }

    #[test]
    fn test_validate_bad_host() {
        let config = InstagramConfig::new("token".to_string())
            .with_host_url("https://graph.facebook.com".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_zero_timeout() {
        let config = InstagramConfig::new("token".to_string()).with_request_timeout_secs(0);
        assert!(config.validate().is_err());
    }
}
