//! Logging and metrics for Hermes.
//!
//! - **Logging**: structured `tracing` output (JSON, pretty or compact)
//! - **Metrics**: standard metric names recorded through the `metrics` facade
//!
//! # Example
//!
//! ```rust,ignore
//! use hermes_telemetry::{init_logging, LogConfig};
//!
//! fn main() {
//!     init_logging(&LogConfig::production().with_service_name("catalog"))
//!         .expect("logging");
//!     hermes_telemetry::metrics::describe_metrics();
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/hermes-telemetry/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::TelemetryError;
pub use logging::{init_logging, LogConfig, LogFormat};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
