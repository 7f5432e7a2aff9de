//! Request context types.
//!
//! The [`RequestContext`] carries per-request state (correlation id, the
//! names of the calling and serving services, the deployment environment)
//! explicitly through dispatch and into business methods.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Instant;
use uuid::Uuid;

/// Header carrying the correlation id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Header naming the service that serves the request.
pub const PRODUCER_HEADER: &str = "x-hermes-producer";

/// Header naming the service that issued the request.
pub const CONSUMER_HEADER: &str = "x-hermes-consumer";

/// A unique identifier for each request, using UUID v7.
///
/// # Example
///
/// ```
/// use hermes_core::RequestId;
///
/// let id = RequestId::new();
/// let parsed = RequestId::parse_or_new(Some(&id.to_string()));
/// assert_eq!(id, parsed);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Creates a new unique request ID using UUID v7.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Creates a `RequestId` from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Parses a header value, falling back to a fresh id when the value is
    /// missing or malformed.
    #[must_use]
    pub fn parse_or_new(value: Option<&str>) -> Self {
        value
            .and_then(|v| Uuid::parse_str(v.trim()).ok())
            .map_or_else(Self::new, Self)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for RequestId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Deployment environment of the running service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    /// Local development.
    #[default]
    Development,
    /// Automated test runs.
    Test,
    /// Production traffic.
    Production,
}

impl Environment {
    /// Returns `true` for production.
    #[must_use]
    pub const fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    /// Returns the environment name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Test => "test",
            Self::Production => "production",
        }
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "test" => Ok(Self::Test),
            "production" | "prod" => Ok(Self::Production),
            other => Err(format!("unknown environment '{other}'")),
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-request context threaded through dispatch.
///
/// # Example
///
/// ```
/// use hermes_core::{Environment, RequestContext};
///
/// let ctx = RequestContext::new()
///     .with_consumer("billing")
///     .with_environment(Environment::Production);
/// assert_eq!(ctx.consumer(), Some("billing"));
/// assert!(ctx.environment().is_production());
/// ```
#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: RequestId,
    producer: Option<String>,
    consumer: Option<String>,
    environment: Environment,
    started_at: Instant,
}

impl RequestContext {
    /// Creates a new request context with a fresh request ID.
    #[must_use]
    pub fn new() -> Self {
        Self::with_request_id(RequestId::new())
    }

    /// Creates a new request context with the specified request ID.
    #[must_use]
    pub fn with_request_id(request_id: RequestId) -> Self {
        Self {
            request_id,
            producer: None,
            consumer: None,
            environment: Environment::default(),
            started_at: Instant::now(),
        }
    }

    /// Builds a context from request headers.
    ///
    /// Reads [`REQUEST_ID_HEADER`], [`PRODUCER_HEADER`] and [`CONSUMER_HEADER`].
    #[must_use]
    pub fn from_headers(headers: &http::HeaderMap) -> Self {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(ToString::to_string)
        };

        Self {
            request_id: RequestId::parse_or_new(header(REQUEST_ID_HEADER).as_deref()),
            producer: header(PRODUCER_HEADER),
            consumer: header(CONSUMER_HEADER),
            environment: Environment::default(),
            started_at: Instant::now(),
        }
    }

    /// Returns the request ID.
    #[must_use]
    pub const fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Returns the name of the serving service, if known.
    #[must_use]
    pub fn producer(&self) -> Option<&str> {
        self.producer.as_deref()
    }

    /// Returns a new context with the specified producer name.
    #[must_use]
    pub fn with_producer(mut self, producer: impl Into<String>) -> Self {
        self.producer = Some(producer.into());
        self
    }

    /// Returns the name of the calling service, if known.
    #[must_use]
    pub fn consumer(&self) -> Option<&str> {
        self.consumer.as_deref()
    }

    /// Returns a new context with the specified consumer name.
    #[must_use]
    pub fn with_consumer(mut self, consumer: impl Into<String>) -> Self {
        self.consumer = Some(consumer.into());
        self
    }

    /// Returns the deployment environment.
    #[must_use]
    pub const fn environment(&self) -> Environment {
        self.environment
    }

    /// Returns a new context with the specified environment.
    #[must_use]
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    /// Returns the elapsed time since the request started.
    #[must_use]
    pub fn elapsed(&self) -> std::time::Duration {
        self.started_at.elapsed()
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}
