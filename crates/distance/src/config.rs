//! Configuration for the distance matrix client
//!
//! Built from the `[api]` settings section.

use crate::error::{ApiError, ApiResult};
use gosend_core::retry::{CircuitBreakerConfig, RetryConfig};
use gosend_rates::config::ApiSettings;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Google Maps Distance Matrix endpoint
pub const DEFAULT_API_URL: &str = "https://maps.googleapis.com/maps/api/distancematrix/json";

/// What an API key looks like in logs
pub const MASKED_KEY: &str = "********************";

/// Client configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Endpoint URL
    pub api_url: String,
    /// API key sent as the `key` query parameter
    #[serde(skip_serializing, default)]
    pub api_key: String,
    /// Request timeout
    #[serde(with = "secs")]
    pub timeout: Duration,
    /// Retry configuration
    pub retry: RetryConfig,
    /// Circuit breaker configuration
    pub circuit_breaker: CircuitBreakerConfig,
    /// Log each request with the key masked
    pub debug: bool,
}

mod secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &MASKED_KEY)
            .field("timeout", &self.timeout)
            .field("retry", &self.retry)
            .field("circuit_breaker", &self.circuit_breaker)
            .field("debug", &self.debug)
            .finish()
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_key: String::new(),
            timeout: Duration::from_secs(30),
            retry: RetryConfig::default(),
            circuit_breaker: CircuitBreakerConfig::default(),
            debug: false,
        }
    }
}

impl ClientConfig {
    /// Create configuration from the `[api]` settings section
    #[must_use]
    pub fn from_settings(api: &ApiSettings, debug: bool) -> Self {
        Self {
            api_url: api.url.clone().unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            api_key: api.key.clone(),
            timeout: Duration::from_secs(api.timeout_secs),
            retry: RetryConfig::default().with_max_attempts(api.max_retries),
            circuit_breaker: CircuitBreakerConfig::default(),
            debug,
        }
    }

    /// Builder-style method to set the endpoint
    #[must_use]
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    /// Builder-style method to set the API key
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = key.into();
        self
    }

    /// Builder-style method to set timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builder-style method to set retry config
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> ApiResult<()> {
        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            return Err(ApiError::InvalidUrl(self.api_url.clone()));
        }

        if self.api_key.trim().is_empty() {
            return Err(ApiError::config("API key cannot be empty"));
        }

        if self.timeout.is_zero() {
            return Err(ApiError::config("timeout cannot be zero"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_from_settings() {
        let api = ApiSettings {
            key: "secret".into(),
            timeout_secs: 5,
            max_retries: 2,
            ..Default::default()
        };
        let config = ClientConfig::from_settings(&api, true);
        assert_eq!(config.api_key, "secret");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.retry.max_attempts, 2);
        assert!(config.debug);
    }

    #[test]
    fn test_debug_masks_key() {
        let config = ClientConfig::default().with_api_key("AIzaSecret");
        let printed = format!("{config:?}");
        assert!(!printed.contains("AIzaSecret"));
        assert!(printed.contains(MASKED_KEY));
    }

    #[test]
    fn test_validation() {
        let valid = ClientConfig::default().with_api_key("k");
        assert!(valid.validate().is_ok());

        assert!(ClientConfig::default().validate().is_err());
        assert!(matches!(
            ClientConfig::default().with_api_key("k").with_api_url("ftp://x").validate(),
            Err(ApiError::InvalidUrl(_))
        ));
        assert!(valid.with_timeout(Duration::ZERO).validate().is_err());
    }
}
