//! File-based loading scenarios.

use std::io::Write;

use hermes_config::{ConfigError, ConfigLoader, LogFormat};
use tempfile::{Builder, NamedTempFile};

fn config_file(suffix: &str, content: &str) -> NamedTempFile {
    let mut file = Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_toml_file_overrides_defaults() {
    let file = config_file(
        ".toml",
        r#"
        [service]
        name = "billing"
        environment = "production"

        [breaker]
        threshold = 3
        retry_period_secs = 2.5

        [logging]
        format = "compact"
        "#,
    );

    let config = ConfigLoader::new().with_file(file.path()).unwrap().load().unwrap();

    assert_eq!(config.service.name, "billing");
    assert!(config.service.environment.is_production());
    assert_eq!(config.breaker.threshold, 3);
    assert_eq!(config.breaker.retry_period().as_millis(), 2500);
    assert_eq!(config.logging.format, LogFormat::Compact);
    assert_eq!(config.client.timeout_ms, 5000);
}

#[test]
fn test_json_file() {
    let file = config_file(".json", r#"{"client": {"timeout_ms": 250}}"#);
    let config = ConfigLoader::new()
        .with_optional_file(file.path())
        .unwrap()
        .load()
        .unwrap();
    assert_eq!(config.client.timeout().as_millis(), 250);
}

#[test]
fn test_unknown_extension_rejected() {
    let file = config_file(".ini", "threshold=3");
    let err = ConfigLoader::new().with_file(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::UnsupportedFormat { .. }));
}

#[test]
fn test_unknown_field_in_file_rejected() {
    let file = config_file(".toml", "[client]\nretries = 3\n");
    let err = ConfigLoader::new().with_file(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Toml(_)));
}

#[test]
fn test_invalid_value_in_file_fails_on_load() {
    let file = config_file(".toml", "[breaker]\nretry_period_secs = 0.0\n");
    let err = ConfigLoader::new()
        .with_file(file.path())
        .unwrap()
        .load()
        .unwrap_err();
    assert_eq!(err.setting(), Some("breaker.retry_period_secs"));
}

#[test]
fn test_unvalidated_load_keeps_bad_values() {
    let file = config_file(".toml", "[breaker]\nthreshold = 0\n");
    let config = ConfigLoader::new()
        .with_file(file.path())
        .unwrap()
        .load_unvalidated();
    assert_eq!(config.breaker.threshold, 0);
    assert!(config.validate().is_err());
}
