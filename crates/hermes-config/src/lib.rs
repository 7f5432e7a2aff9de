//! Typed configuration for Hermes.
//!
//! Supports:
//! - TOML and JSON configuration files
//! - Environment variable overrides (`HERMES__SECTION__KEY`)
//! - Strict parsing (unknown fields are errors)
//! - Layering: defaults → file → env
//!
//! # Example
//!
//! ```no_run
//! use hermes_config::ConfigLoader;
//!
//! # fn main() -> Result<(), hermes_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_defaults()
//!     .with_optional_file("hermes.toml")?
//!     .with_env_prefix("HERMES")
//!     .load()?;
//!
//! println!("calling {}", config.client.base_url);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration File Format
//!
//! ```toml
//! [service]
//! name = "billing"
//! environment = "production"
//!
//! [client]
//! base_url = "http://accounts.internal:8080"
//! timeout_ms = 2000
//! consumer = "billing"
//!
//! [breaker]
//! threshold = 5
//! retry_period_secs = 30.0
//!
//! [logging]
//! level = "info"
//! format = "json"
//! ```

#![doc(html_root_url = "https://docs.rs/hermes-config/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::HermesConfig;
pub use error::ConfigError;
pub use hermes_telemetry::LogFormat;
pub use loader::ConfigLoader;
pub use schema::{BreakerConfig, ClientConfig, LoggingConfig, ServiceConfig};
