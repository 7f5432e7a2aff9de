//! Main configuration type.

use hermes_core::Environment;
use hermes_telemetry::LogFormat;
use serde::{Deserialize, Serialize};

use crate::{BreakerConfig, ClientConfig, ConfigError, LoggingConfig, ServiceConfig};

/// Complete Hermes configuration.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to load it from files and
/// environment variables.
///
/// # Example
///
/// ```
/// use hermes_config::HermesConfig;
///
/// let config = HermesConfig::default();
/// assert_eq!(config.breaker.threshold, 5);
/// assert_eq!(config.client.timeout_ms, 5000);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct HermesConfig {
    /// Service identity.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Outbound client settings.
    #[serde(default)]
    pub client: ClientConfig,

    /// Circuit breaker settings.
    #[serde(default)]
    pub breaker: BreakerConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl HermesConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidSetting` if:
    /// - the service name is empty
    /// - the client base URL is not http(s) or the timeout is zero
    /// - the breaker threshold is zero
    /// - the retry period is not a positive, finite number of seconds
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service.name.trim().is_empty() {
            return Err(ConfigError::invalid_setting("service.name", "must not be empty"));
        }

        if !(self.client.base_url.starts_with("http://")
            || self.client.base_url.starts_with("https://"))
        {
            return Err(ConfigError::invalid_setting(
                "client.base_url",
                format!("expected an http(s) URL, got {}", self.client.base_url),
            ));
        }

        if self.client.timeout_ms == 0 {
            return Err(ConfigError::invalid_setting(
                "client.timeout_ms",
                "must be greater than 0",
            ));
        }

        if self.breaker.threshold == 0 {
            return Err(ConfigError::invalid_setting(
                "breaker.threshold",
                "must be at least 1",
            ));
        }

        let period = self.breaker.retry_period_secs;
        if !period.is_finite() || period <= 0.0 {
            return Err(ConfigError::invalid_setting(
                "breaker.retry_period_secs",
                "must be a positive number of seconds",
            ));
        }

        Ok(())
    }

    /// Create a development configuration preset.
    ///
    /// Pretty, debug-level logs and a short retry period.
    ///
    /// # Example
    ///
    /// ```
    /// use hermes_config::HermesConfig;
    ///
    /// let config = HermesConfig::development();
    /// assert_eq!(config.logging.level, "debug");
    /// ```
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();

        config.service.environment = Environment::Development;
        config.logging.level = "debug".to_string();
        config.logging.format = LogFormat::Pretty;
        config.breaker.retry_period_secs = 5.0;

        config
    }

    /// Create a production configuration preset.
    ///
    /// JSON, info-level logs and backtraces hidden from error bodies.
    ///
    /// # Example
    ///
    /// ```
    /// use hermes_config::HermesConfig;
    ///
    /// let config = HermesConfig::production();
    /// assert!(config.service.environment.is_production());
    /// ```
    #[must_use]
    pub fn production() -> Self {
        let mut config = Self::default();

        config.service.environment = Environment::Production;
        config.logging.level = "info".to_string();
        config.logging.format = LogFormat::Json;

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(HermesConfig::default().validate().is_ok());
        assert!(HermesConfig::development().validate().is_ok());
        assert!(HermesConfig::production().validate().is_ok());
    }

    #[test]
    fn test_zero_threshold_rejected() {
        let mut config = HermesConfig::default();
        config.breaker.threshold = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("breaker.threshold"));
    }

    #[test]
    fn test_non_positive_retry_period_rejected() {
        for period in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let mut config = HermesConfig::default();
            config.breaker.retry_period_secs = period;
            assert!(config.validate().is_err(), "{period} accepted");
        }
    }

    #[test]
    fn test_bad_base_url_rejected() {
        let mut config = HermesConfig::default();
        config.client.base_url = "ftp://example.com".to_string();
        assert!(matches!(
            config.validate(),
            Err(ref err) if err.setting() == Some("client.base_url")
        ));
    }

    #[test]
    fn test_toml_round_trip() {
        let config = HermesConfig::development();
        let rendered = toml::to_string(&config).unwrap();
        let parsed: HermesConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed, config);
    }
}
