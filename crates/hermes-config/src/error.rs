//! Errors raised while assembling a [`HermesConfig`](crate::HermesConfig).

use std::path::PathBuf;
use thiserror::Error;

/// Why a configuration could not be produced.
///
/// File and parse errors come from the loader layers; `InvalidSetting` comes
/// from [`HermesConfig::validate`](crate::HermesConfig::validate) and
/// `InvalidOverride` from `HERMES__SECTION__KEY` environment variables.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required configuration file does not exist.
    #[error("configuration file {} does not exist", path.display())]
    MissingFile {
        /// The path that was requested.
        path: PathBuf,
    },

    /// The file exists but could not be read.
    #[error("cannot read configuration file {}", path.display())]
    Unreadable {
        /// The file being read.
        path: PathBuf,
        /// I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// Neither TOML nor JSON.
    #[error("unsupported configuration format {format:?}, expected toml or json")]
    UnsupportedFormat {
        /// The format name or file path that was offered.
        format: String,
    },

    /// Malformed TOML, or a key no section declares.
    #[error("malformed TOML configuration: {0}")]
    Toml(#[from] toml::de::Error),

    /// Malformed JSON, or a key no section declares.
    #[error("malformed JSON configuration: {0}")]
    Json(#[from] serde_json::Error),

    /// A setting parsed but is out of range.
    #[error("{setting}: {reason}")]
    InvalidSetting {
        /// Dotted setting name, e.g. `breaker.threshold`.
        setting: String,
        /// What the value must satisfy.
        reason: String,
    },

    /// An environment override could not be applied.
    #[error("environment override {var}: {reason}")]
    InvalidOverride {
        /// The variable name, e.g. `HERMES__CLIENT__TIMEOUT_MS`.
        var: String,
        /// What was expected.
        reason: String,
    },
}

impl ConfigError {
    pub(crate) fn missing_file(path: impl Into<PathBuf>) -> Self {
        Self::MissingFile { path: path.into() }
    }

    pub(crate) fn unreadable(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Unreadable {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn unsupported_format(format: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            format: format.into(),
        }
    }

    pub(crate) fn invalid_setting(setting: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidSetting {
            setting: setting.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_override(var: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidOverride {
            var: var.into(),
            reason: reason.into(),
        }
    }

    /// Returns the dotted setting an `InvalidSetting` error concerns.
    #[must_use]
    pub fn setting(&self) -> Option<&str> {
        match self {
            Self::InvalidSetting { setting, .. } => Some(setting),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_names_path() {
        let err = ConfigError::missing_file("/etc/hermes/client.toml");
        assert_eq!(
            err.to_string(),
            "configuration file /etc/hermes/client.toml does not exist"
        );
    }

    #[test]
    fn test_invalid_setting() {
        let err = ConfigError::invalid_setting("breaker.threshold", "must be at least 1");
        assert_eq!(err.to_string(), "breaker.threshold: must be at least 1");
        assert_eq!(err.setting(), Some("breaker.threshold"));
    }

    #[test]
    fn test_invalid_override() {
        let err = ConfigError::invalid_override("HERMES__CLIENT__TIMEOUT_MS", "expected integer");
        assert_eq!(
            err.to_string(),
            "environment override HERMES__CLIENT__TIMEOUT_MS: expected integer"
        );
        assert_eq!(err.setting(), None);
    }

    #[test]
    fn test_unsupported_format() {
        let err = ConfigError::unsupported_format("yaml");
        assert_eq!(
            err.to_string(),
            "unsupported configuration format \"yaml\", expected toml or json"
        );
    }
}
