//! Configuration schema types.
//!
//! This module defines the structure of every configuration section.

use std::time::Duration;

use hermes_core::Environment;
use hermes_telemetry::{LogConfig, LogFormat};
use serde::{Deserialize, Serialize};

/// Identity of the running service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Service name, used as the producer name and in log output.
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Deployment environment. Backtraces are hidden in production.
    #[serde(default)]
    pub environment: Environment,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            environment: Environment::default(),
        }
    }
}

fn default_service_name() -> String {
    "hermes".to_string()
}

/// Outbound client settings.
///
/// # Example
///
/// ```
/// use hermes_config::ClientConfig;
///
/// let config = ClientConfig {
///     base_url: "http://billing.internal:8080".to_string(),
///     consumer: Some("billing".to_string()),
///     ..Default::default()
/// };
/// assert_eq!(config.timeout().as_millis(), 5000);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    /// Base URL of the remote service.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-call timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Name sent as the producer header.
    #[serde(default)]
    pub producer: Option<String>,

    /// Name sent as the consumer header.
    #[serde(default)]
    pub consumer: Option<String>,
}

impl ClientConfig {
    /// Returns the timeout as a [`Duration`].
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_ms: default_timeout_ms(),
            producer: None,
            consumer: None,
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

const fn default_timeout_ms() -> u64 {
    5000
}

/// Circuit breaker settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct BreakerConfig {
    /// Consecutive failures that open the circuit.
    #[serde(default = "default_threshold")]
    pub threshold: u32,

    /// Seconds to wait after the last failure before probing.
    #[serde(default = "default_retry_period")]
    pub retry_period_secs: f64,
}

impl BreakerConfig {
    /// Returns the retry period as a [`Duration`].
    ///
    /// Invalid (negative or non-finite) periods collapse to zero; run
    /// [`HermesConfig::validate`](crate::HermesConfig::validate) first.
    #[must_use]
    pub fn retry_period(&self) -> Duration {
        Duration::try_from_secs_f64(self.retry_period_secs).unwrap_or_default()
    }
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            retry_period_secs: default_retry_period(),
        }
    }
}

const fn default_threshold() -> u32 {
    5
}

const fn default_retry_period() -> f64 {
    30.0
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Enable logging.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Log level filter (e.g., "info", "hermes_router=debug").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl LoggingConfig {
    /// Converts the section into a telemetry [`LogConfig`].
    #[must_use]
    pub fn to_log_config(&self, service_name: &str) -> LogConfig {
        let base = match self.format {
            LogFormat::Pretty => LogConfig::development(),
            LogFormat::Json | LogFormat::Compact => LogConfig::production(),
        };
        LogConfig {
            enabled: self.enabled,
            level: self.level.clone(),
            format: self.format,
            ..base
        }
        .with_service_name(service_name)
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

const fn default_true() -> bool {
    true
}
