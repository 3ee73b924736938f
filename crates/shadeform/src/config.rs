//! Provider configuration.
//!
//! Values given explicitly win; otherwise the environment is consulted:
//!
//! - `SHADEFORM_API_KEY`: API key sent as `X-API-KEY`
//! - `SHADEFORM_API_URL`: override the API base URL (proxies, tests)

use std::time::Duration;

use crate::error::{Result, ShadeformError};

/// Environment variable holding the API key.
pub const ENV_API_KEY: &str = "SHADEFORM_API_KEY";

/// Environment variable overriding the API base URL.
pub const ENV_API_URL: &str = "SHADEFORM_API_URL";

/// Base URL for the Shadeform API.
pub const DEFAULT_BASE_URL: &str = "https://api.shadeform.ai/v1";

/// Default timeout for a single API request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Interval between instance status checks while waiting for readiness.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(15);

/// How long instance creation may take before it is abandoned.
pub const DEFAULT_CREATE_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// Settings needed to build a client and drive resource operations.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// API key. `None` or empty falls back to [`ENV_API_KEY`].
    pub api_key: Option<String>,
    /// API base URL without trailing slash.
    pub base_url: String,
    /// Per-request HTTP timeout.
    pub request_timeout: Duration,
    /// Interval between readiness checks.
    pub poll_interval: Duration,
    /// Default deadline for instance creation.
    pub create_timeout: Duration,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            create_timeout: DEFAULT_CREATE_TIMEOUT,
        }
    }
}

impl ProviderConfig {
    /// Build a config from environment variables only.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var(ENV_API_URL) {
            if !url.trim().is_empty() {
                config.base_url = url.trim().trim_end_matches('/').to_string();
            }
        }
        config
    }

    /// Set the API key explicitly.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Point the client at a different API root.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Override the readiness poll interval.
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Override the default create deadline.
    #[must_use]
    pub const fn with_create_timeout(mut self, timeout: Duration) -> Self {
        self.create_timeout = timeout;
        self
    }

    /// Resolve the effective API key: explicit value, then environment.
    ///
    /// # Errors
    /// Returns [`ShadeformError::Config`] when neither source yields a
    /// non-empty key.
    pub fn resolve_api_key(&self) -> Result<String> {
        let explicit = self
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty());

        if let Some(key) = explicit {
            return Ok(key.to_string());
        }

        match std::env::var(ENV_API_KEY) {
            Ok(key) if !key.trim().is_empty() => Ok(key.trim().to_string()),
            _ => Err(ShadeformError::Config(format!(
                "missing Shadeform API key. Set api_key in the provider configuration or the \
                 {ENV_API_KEY} environment variable; if either is already set, ensure it is not empty"
            ))),
        }
    }

    /// Check the settings before a client is built.
    ///
    /// # Errors
    /// Returns [`ShadeformError::Config`] describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        self.resolve_api_key()?;

        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ShadeformError::Config(format!(
                "base URL must be http(s), got `{}`",
                self.base_url
            )));
        }
        if self.poll_interval.is_zero() {
            return Err(ShadeformError::Config(
                "poll interval must be greater than zero".to_string(),
            ));
        }
        if self.create_timeout.is_zero() {
            return Err(ShadeformError::Config(
                "create timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
