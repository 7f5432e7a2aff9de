//! Layered configuration loading.
//!
//! Later layers override earlier ones:
//! 1. Built-in defaults (or a preset)
//! 2. A TOML or JSON file
//! 3. `PREFIX__SECTION__KEY` environment variables

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;

use hermes_telemetry::LogFormat;

use crate::{ConfigError, HermesConfig};

/// Builds a [`HermesConfig`] from defaults, files and the environment.
///
/// # Example
///
/// ```no_run
/// use hermes_config::ConfigLoader;
///
/// # fn main() -> Result<(), hermes_config::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_defaults()
///     .with_file("hermes.toml")?
///     .with_env_prefix("HERMES")
///     .load()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ConfigLoader {
    config: HermesConfig,
    env_prefix: Option<String>,
    file_loaded: bool,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a loader holding the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: HermesConfig::default(),
            env_prefix: None,
            file_loaded: false,
        }
    }

    /// Reset to default configuration values.
    #[must_use]
    pub fn with_defaults(mut self) -> Self {
        self.config = HermesConfig::default();
        self
    }

    /// Start from the development preset.
    #[must_use]
    pub fn with_development(mut self) -> Self {
        self.config = HermesConfig::development();
        self
    }

    /// Start from the production preset.
    #[must_use]
    pub fn with_production(mut self) -> Self {
        self.config = HermesConfig::production();
        self
    }

    /// Load configuration from a `.toml` or `.json` file.
    ///
    /// Sections missing from the file keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file is missing, unreadable, malformed,
    /// or contains unknown fields.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::missing_file(path));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::unreadable(path, e))?;

        self.config = Self::parse_file(&content, path)?;
        self.file_loaded = true;
        tracing::debug!(path = %path.display(), "configuration file loaded");

        Ok(self)
    }

    /// Load a file if it exists; otherwise continue unchanged.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file exists but cannot be loaded.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Load configuration from a string in `format` ("toml" or "json").
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if parsing fails or the format is unknown.
    ///
    /// # Example
    ///
    /// ```
    /// use hermes_config::ConfigLoader;
    ///
    /// let toml = r#"
    ///     [breaker]
    ///     threshold = 3
    /// "#;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_string(toml, "toml")
    ///     .unwrap()
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(config.breaker.threshold, 3);
    /// assert_eq!(config.client.timeout_ms, 5000);
    /// ```
    pub fn with_string(mut self, content: &str, format: &str) -> Result<Self, ConfigError> {
        self.config = match format.to_lowercase().as_str() {
            "toml" => toml::from_str(content)?,
            "json" => serde_json::from_str(content)?,
            _ => return Err(ConfigError::unsupported_format(format)),
        };
        Ok(self)
    }

    /// Set the environment variable prefix, e.g. `HERMES` for
    /// `HERMES__BREAKER__THRESHOLD=3`.
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Load a `.env` file into the process environment, if present.
    ///
    /// # Errors
    ///
    /// Never fails today; kept fallible for symmetry with the other layers.
    pub fn with_dotenv(self) -> Result<Self, ConfigError> {
        if let Err(error) = dotenvy::dotenv() {
            tracing::trace!(%error, "no .env file loaded");
        }
        Ok(self)
    }

    /// Apply environment overrides and validate.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if an environment variable cannot be parsed or
    /// the final configuration is invalid.
    pub fn load(mut self) -> Result<HermesConfig, ConfigError> {
        if let Some(prefix) = self.env_prefix.take() {
            self.apply_env_overrides(&prefix)?;
        }

        self.config.validate()?;
        tracing::debug!(
            from_file = self.file_loaded,
            environment = %self.config.service.environment,
            "configuration ready"
        );

        Ok(self.config)
    }

    /// Return the configuration without applying the environment or
    /// validating it.
    #[must_use]
    pub fn load_unvalidated(self) -> HermesConfig {
        self.config
    }

    fn parse_file(content: &str, path: &Path) -> Result<HermesConfig, ConfigError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);

        match extension.as_deref() {
            Some("toml") => Ok(toml::from_str(content)?),
            Some("json") => Ok(serde_json::from_str(content)?),
            _ => Err(ConfigError::unsupported_format(path.display().to_string())),
        }
    }

    fn apply_env_overrides(&mut self, prefix: &str) -> Result<(), ConfigError> {
        let marker = format!("{prefix}__");
        let env_vars: HashMap<String, String> =
            env::vars().filter(|(k, _)| k.starts_with(&marker)).collect();

        for (key, value) in env_vars {
            self.apply_env_var(&key, &value, prefix)?;
        }

        Ok(())
    }

    fn apply_env_var(&mut self, key: &str, value: &str, prefix: &str) -> Result<(), ConfigError> {
        let key_without_prefix = key
            .strip_prefix(prefix)
            .and_then(|k| k.strip_prefix("__"))
            .ok_or_else(|| ConfigError::invalid_override(key, "invalid key format"))?;

        let parts: Vec<&str> = key_without_prefix.split("__").collect();

        match parts.as_slice() {
            ["SERVICE", "NAME"] => {
                self.config.service.name = value.to_string();
            }
            ["SERVICE", "ENVIRONMENT"] => {
                self.config.service.environment = value
                    .parse()
                    .map_err(|reason: String| ConfigError::invalid_override(key, reason))?;
            }

            ["CLIENT", "BASE_URL"] => {
                self.config.client.base_url = value.to_string();
            }
            ["CLIENT", "TIMEOUT_MS"] => {
                self.config.client.timeout_ms = value
                    .parse()
                    .map_err(|_| ConfigError::invalid_override(key, "expected integer"))?;
            }
            ["CLIENT", "PRODUCER"] => {
                self.config.client.producer = non_empty(value);
            }
            ["CLIENT", "CONSUMER"] => {
                self.config.client.consumer = non_empty(value);
            }

            ["BREAKER", "THRESHOLD"] => {
                self.config.breaker.threshold = value
                    .parse()
                    .map_err(|_| ConfigError::invalid_override(key, "expected integer"))?;
            }
            ["BREAKER", "RETRY_PERIOD_SECS"] => {
                self.config.breaker.retry_period_secs = value
                    .parse()
                    .map_err(|_| ConfigError::invalid_override(key, "expected float"))?;
            }

            ["LOGGING", "ENABLED"] => {
                self.config.logging.enabled = parse_bool(value)
                    .ok_or_else(|| ConfigError::invalid_override(key, "expected boolean"))?;
            }
            ["LOGGING", "LEVEL"] => {
                self.config.logging.level = value.to_string();
            }
            ["LOGGING", "FORMAT"] => {
                self.config.logging.format = value.parse::<LogFormat>().map_err(|_| {
                    ConfigError::invalid_override(key, "expected 'json', 'pretty' or 'compact'")
                })?;
            }

            _ => {
                tracing::warn!(var = key, "ignoring unknown configuration variable");
            }
        }

        Ok(())
    }
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Parse a boolean from a string.
fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hermes_core::Environment;

    #[test]
    fn test_loader_new() {
        let config = ConfigLoader::new().load().unwrap();
        assert_eq!(config, HermesConfig::default());
    }

    #[test]
    fn test_loader_with_development() {
        let config = ConfigLoader::new().with_development().load().unwrap();
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert_eq!(config.service.environment, Environment::Development);
    }

    #[test]
    fn test_loader_with_production() {
        let config = ConfigLoader::new().with_production().load().unwrap();
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_loader_with_string_json() {
        let json = r#"{"client": {"base_url": "https://billing.internal", "consumer": "web"}}"#;
        let config = ConfigLoader::new()
            .with_string(json, "json")
            .unwrap()
            .load()
            .unwrap();

        assert_eq!(config.client.base_url, "https://billing.internal");
        assert_eq!(config.client.consumer.as_deref(), Some("web"));
    }

    #[test]
    fn test_loader_rejects_unknown_section() {
        let result = ConfigLoader::new().with_string("[server]\nport = 80", "toml");
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn test_loader_rejects_unknown_format() {
        let result = ConfigLoader::new().with_string("threshold: 3", "yaml");
        assert!(matches!(
            result,
            Err(ConfigError::UnsupportedFormat { ref format }) if format == "yaml"
        ));
    }

    #[test]
    fn test_load_validates() {
        let result = ConfigLoader::new()
            .with_string("[breaker]\nthreshold = 0", "toml")
            .unwrap()
            .load();
        assert!(matches!(result, Err(ConfigError::InvalidSetting { .. })));
    }

    #[test]
    fn test_loader_with_file_not_found() {
        let result = ConfigLoader::new().with_file("/nonexistent/hermes.toml");
        assert!(matches!(result, Err(ConfigError::MissingFile { .. })));
    }

    #[test]
    fn test_loader_with_optional_file_not_found() {
        let config = ConfigLoader::new()
            .with_optional_file("/nonexistent/hermes.toml")
            .unwrap()
            .load()
            .unwrap();
        assert_eq!(config.breaker.threshold, 5);
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("true"), Some(true));
        assert_eq!(parse_bool("YES"), Some(true));
        assert_eq!(parse_bool("1"), Some(true));
        assert_eq!(parse_bool("off"), Some(false));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
        assert_eq!(parse_bool(""), None);
    }

    // Overrides are exercised through apply_env_var directly: mutating the
    // process environment would need unsafe code under edition 2024.

    #[test]
    fn test_apply_env_var_breaker() {
        let mut loader = ConfigLoader::new();
        loader.apply_env_var("TEST__BREAKER__THRESHOLD", "3", "TEST").unwrap();
        loader
            .apply_env_var("TEST__BREAKER__RETRY_PERIOD_SECS", "0.5", "TEST")
            .unwrap();
        assert_eq!(loader.config.breaker.threshold, 3);
        assert!((loader.config.breaker.retry_period_secs - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_apply_env_var_client_and_service() {
        let mut loader = ConfigLoader::new();
        loader
            .apply_env_var("TEST__CLIENT__BASE_URL", "https://api.internal", "TEST")
            .unwrap();
        loader.apply_env_var("TEST__CLIENT__PRODUCER", "web", "TEST").unwrap();
        loader.apply_env_var("TEST__CLIENT__CONSUMER", "", "TEST").unwrap();
        loader
            .apply_env_var("TEST__SERVICE__ENVIRONMENT", "prod", "TEST")
            .unwrap();

        assert_eq!(loader.config.client.base_url, "https://api.internal");
        assert_eq!(loader.config.client.producer.as_deref(), Some("web"));
        assert!(loader.config.client.consumer.is_none());
        assert!(loader.config.service.environment.is_production());
    }

    #[test]
    fn test_apply_env_var_logging() {
        let mut loader = ConfigLoader::new();
        loader.apply_env_var("TEST__LOGGING__FORMAT", "compact", "TEST").unwrap();
        loader.apply_env_var("TEST__LOGGING__ENABLED", "no", "TEST").unwrap();
        assert_eq!(loader.config.logging.format, LogFormat::Compact);
        assert!(!loader.config.logging.enabled);
    }

    #[test]
    fn test_apply_env_var_invalid_values() {
        let mut loader = ConfigLoader::new();
        assert!(loader
            .apply_env_var("TEST__CLIENT__TIMEOUT_MS", "soon", "TEST")
            .is_err());
        assert!(loader
            .apply_env_var("TEST__SERVICE__ENVIRONMENT", "staging", "TEST")
            .is_err());
        assert!(matches!(
            loader.apply_env_var("TEST__LOGGING__FORMAT", "xml", "TEST"),
            Err(ConfigError::InvalidOverride { ref var, .. }) if var == "TEST__LOGGING__FORMAT"
        ));
    }

    #[test]
    fn test_apply_env_var_unknown_key_ignored() {
        let mut loader = ConfigLoader::new();
        loader.apply_env_var("TEST__SERVER__PORT", "80", "TEST").unwrap();
        assert_eq!(loader.config, HermesConfig::default());
    }
}
