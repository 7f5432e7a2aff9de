//! Client-side error types.

use std::path::PathBuf;
use std::time::Duration;

use http::{Method, StatusCode};
use thiserror::Error;

/// Result type for client calls.
pub type ClientResult<T> = Result<T, ClientError>;

/// A failure below the HTTP response level.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The call did not complete within the configured timeout.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The stub transport had no recording for the call.
    #[error(transparent)]
    Stub(#[from] StubError),

    /// Any other failure (connection refused, DNS, task panic, ...).
    #[error("transport failed: {0}")]
    Other(#[source] anyhow::Error),
}

impl TransportError {
    /// Wraps an opaque error.
    pub fn other(error: impl Into<anyhow::Error>) -> Self {
        Self::Other(error.into())
    }

    /// Returns `true` for [`TransportError::Timeout`].
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

/// A stub recording did not match the call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StubError {
    /// No recording for the path and verb.
    #[error("no stub recorded for {verb} {path}")]
    MissingRoute {
        /// Requested verb.
        verb: Method,
        /// Requested path.
        path: String,
    },

    /// The path and verb are recorded, but not under the active context.
    #[error("no stub recorded for {verb} {path} in context {context}")]
    MissingContext {
        /// Requested verb.
        verb: Method,
        /// Requested path.
        path: String,
        /// Active context marker.
        context: String,
    },

    /// The recorded request parameters differ from the actual ones.
    #[error("stub for {verb} {path} in context {context} expected {expected}, got {actual}")]
    RequestMismatch {
        /// Requested verb.
        verb: Method,
        /// Requested path.
        path: String,
        /// Active context marker.
        context: String,
        /// Recorded parameters, form-encoded.
        expected: String,
        /// Actual parameters, form-encoded.
        actual: String,
    },
}

/// A stub file could not be loaded.
#[derive(Debug, Error)]
pub enum InvalidStubFile {
    /// The file could not be read.
    #[error("failed to read stub file {path}")]
    Read {
        /// Stub file path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid YAML.
    #[error("stub file is not valid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The YAML does not follow the path → verb → context layout.
    #[error("invalid stub at {location}: {reason}")]
    Layout {
        /// Where in the file, e.g. `/v1/tests get default`.
        location: String,
        /// What is wrong.
        reason: String,
    },
}

impl InvalidStubFile {
    pub(crate) fn layout(location: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Layout {
            location: location.into(),
            reason: reason.into(),
        }
    }
}

/// The breaker refused the call without invoking the transport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("circuit open after {failure_count} consecutive failures{}", last_error_suffix(.last_error))]
pub struct CircuitOpenError {
    /// Consecutive failures recorded.
    pub failure_count: u32,
    /// Message of the last failure.
    pub last_error: Option<String>,
}

fn last_error_suffix(last_error: &Option<String>) -> String {
    last_error
        .as_ref()
        .map(|e| format!(" (last: {e})"))
        .unwrap_or_default()
}

/// Errors returned by [`Client`](crate::Client) and
/// [`ResourceProxy`](crate::ResourceProxy).
#[derive(Debug, Error)]
pub enum ClientError {
    /// The circuit breaker is open.
    #[error(transparent)]
    CircuitOpen(#[from] CircuitOpenError),

    /// The transport failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The remote service answered with a non-2xx status.
    #[error("remote call failed with {status}: {code}: {message}")]
    Remote {
        /// Response status.
        status: StatusCode,
        /// Error code from the body, or derived from the status.
        code: String,
        /// Error message from the body, or the status reason.
        message: String,
    },

    /// A 2xx body was not valid JSON or not of the expected shape.
    #[error("failed to decode response body: {0}")]
    Decode(#[from] serde_json::Error),

    /// A proxy accessor was used with an argument it cannot take.
    #[error("invalid proxy access: {0}")]
    InvalidAccess(String),

    /// The transport could not be built.
    #[error("client configuration failed: {0}")]
    Config(String),
}

impl ClientError {
    /// Returns the remote status, if any.
    #[must_use]
    pub const fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Remote { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns `true` if the breaker rejected the call.
    #[must_use]
    pub const fn is_circuit_open(&self) -> bool {
        matches!(self, Self::CircuitOpen(_))
    }
}
