//! # Hermes
//!
//! **Versioned resource RPC over HTTP**
//!
//! - Resources are declared once with a builder and mounted under each other
//!   to form a tree: `/v1/accounts/42/statements`.
//! - Each of the five conventional operations (search, create, get, update,
//!   delete) carries a parameter schema that coerces wire strings into typed
//!   values and rejects malformed input with a 400.
//! - The client side wraps a pluggable transport in a circuit breaker and
//!   exposes remote resources through chained proxies.
//!
//! ## Quick Start
//!
//! ```rust
//! use hermes::prelude::*;
//! use serde_json::json;
//!
//! let accounts = ResourceBuilder::new("accounts", |id| id)
//!     .get_nullary(|id: &mut Option<String>, _: &RequestContext| Ok(json!({ "id": id })))
//!     .build()
//!     .unwrap();
//! let dispatcher = Dispatcher::new(Api::builder().version(1, [accounts]).build().unwrap());
//!
//! let response = dispatcher.dispatch(&RequestContext::new(), DispatchRequest::get("/v1/accounts/42"));
//! assert_eq!(response.body_string(), r#"{"id":"42"}"#);
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Client → ResourceProxy → CircuitBreaker → Transport ─┐
//!                                                        │ http / direct / stub
//! Dispatcher ← path resolver ← mount tree ← schema ←────┘
//! ```

#![doc(html_root_url = "https://docs.rs/hermes/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export core types
pub use hermes_core as core;

// Re-export schema types
pub use hermes_schema as schema;

// Re-export router types
pub use hermes_router as router;

// Re-export client types
pub use hermes_client as client;

// Re-export configuration types
pub use hermes_config as config;

// Re-export telemetry types
pub use hermes_telemetry as telemetry;

/// Installs logging from `config` and registers metric descriptions.
///
/// Call once at startup.
///
/// # Errors
///
/// Returns `TelemetryError` if a global subscriber is already installed or
/// the log level filter is invalid.
pub fn init(config: &hermes_config::HermesConfig) -> Result<(), hermes_telemetry::TelemetryError> {
    let log_config = config.logging.to_log_config(&config.service.name);
    hermes_telemetry::init_logging(&log_config)?;
    hermes_telemetry::metrics::describe_metrics();
    tracing::info!(
        service = %config.service.name,
        environment = %config.service.environment,
        "hermes initialized"
    );
    Ok(())
}

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust
/// use hermes::prelude::*;
/// ```
pub mod prelude {
    pub use hermes_core::{
        params, Environment, HermesError, HermesResult, Params, RequestContext, RequestId, Symbol,
        Value,
    };

    pub use hermes_schema::{Field, FieldType, Schema, SchemaBuilder};

    pub use hermes_router::{
        Api, DispatchRequest, DispatchResponse, Dispatcher, Operation, ResourceBuilder,
        ResourceType,
    };

    pub use hermes_client::{
        CircuitBreaker, Client, ClientError, DirectTransport, HttpTransport, ProxyAccess,
        ProxyArg, RemoteResponse, ResourceProxy, StubTransport, Transport,
    };

    pub use hermes_config::{ConfigLoader, HermesConfig};
}
