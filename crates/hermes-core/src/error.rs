//! Error types for Hermes.
//!
//! This module provides the [`HermesError`] type, the error type raised by
//! path resolution, parameter validation, resource definition and business
//! methods. A single boundary (the dispatcher) converts it into a status code
//! and an optional [`ErrorEnvelope`] body.
//!
//! | Variant | Status | Body |
//! |---|---|---|
//! | `Validation` | 400 | `error` + `message` |
//! | `Authentication` | 401 | none |
//! | `Forbidden` | 403 | none |
//! | `NotFound` | 404 | none |
//! | `Server` | 500 | `error` + `message` (+ `backtrace` outside production) |
//! | `MethodDefinition` | 500 | `error` + `message` (+ `backtrace` outside production) |

use std::backtrace::Backtrace;

/// Alias so `thiserror` does not derive the nightly-only `Error::provide`.
type CapturedBacktrace = Backtrace;
use std::collections::BTreeMap;

use http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using [`HermesError`].
pub type HermesResult<T> = Result<T, HermesError>;

/// Categories of errors for classification and status mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Malformed, missing or unexpected parameters.
    Validation,
    /// Missing or invalid credentials.
    Authentication,
    /// Caller is not allowed to perform the operation.
    Forbidden,
    /// Unknown route, resource or method, or an invalid path shape.
    NotFound,
    /// Unexpected failure inside a business method.
    Server,
}

impl ErrorCategory {
    /// Returns the HTTP status code for this error category.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation => StatusCode::BAD_REQUEST,
            Self::Authentication => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Server => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns `true` when responses in this category carry a body.
    #[must_use]
    pub const fn has_body(&self) -> bool {
        matches!(self, Self::Validation | Self::Server)
    }
}

/// Standard error type for Hermes.
///
/// # Example
///
/// ```
/// use hermes_core::{ErrorCategory, HermesError};
///
/// fn require_name(name: &str) -> Result<(), HermesError> {
///     if name.is_empty() {
///         return Err(HermesError::validation("name cannot be empty"));
///     }
///     Ok(())
/// }
///
/// let err = require_name("").unwrap_err();
/// assert_eq!(err.category(), ErrorCategory::Validation);
/// ```
#[derive(Error, Debug)]
pub enum HermesError {
    /// Parameters failed validation.
    #[error("{message}")]
    Validation {
        /// Human-readable error message.
        message: String,
        /// Field-specific validation errors.
        field_errors: Option<FieldErrors>,
    },

    /// Authentication failed.
    #[error("authentication failed: {message}")]
    Authentication {
        /// Human-readable error message.
        message: String,
    },

    /// The caller may not perform this operation.
    #[error("forbidden: {message}")]
    Forbidden {
        /// Human-readable error message.
        message: String,
    },

    /// The route, resource or method does not exist.
    #[error("not found: {message}")]
    NotFound {
        /// Human-readable error message.
        message: String,
    },

    /// A business method failed or returned an unusable value.
    #[error("{message}")]
    Server {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        #[source]
        source: Option<anyhow::Error>,
        /// Where the error was raised.
        backtrace: CapturedBacktrace,
    },

    /// A resource type was defined inconsistently.
    #[error("invalid definition of {resource}#{method}: {reason}")]
    MethodDefinition {
        /// The resource type name.
        resource: String,
        /// The offending method.
        method: String,
        /// What is wrong with it.
        reason: String,
    },
}

impl HermesError {
    /// Creates a validation error with a message.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            field_errors: None,
        }
    }

    /// Creates a validation error with field-specific errors.
    #[must_use]
    pub fn validation_with_fields(message: impl Into<String>, field_errors: FieldErrors) -> Self {
        Self::Validation {
            message: message.into(),
            field_errors: Some(field_errors),
        }
    }

    /// Creates an authentication error.
    #[must_use]
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
        }
    }

    /// Creates a forbidden error.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    /// Creates a not found error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Creates a server error.
    #[must_use]
    pub fn server(message: impl Into<String>) -> Self {
        Self::Server {
            message: message.into(),
            source: None,
            backtrace: Backtrace::force_capture(),
        }
    }

    /// Creates a server error wrapping another error.
    pub fn server_with_source(message: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        Self::Server {
            message: message.into(),
            source: Some(source.into()),
            backtrace: Backtrace::force_capture(),
        }
    }

    /// Creates a method definition error.
    #[must_use]
    pub fn method_definition(
        resource: impl Into<String>,
        method: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::MethodDefinition {
            resource: resource.into(),
            method: method.into(),
            reason: reason.into(),
        }
    }

    /// Returns the error category.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation { .. } => ErrorCategory::Validation,
            Self::Authentication { .. } => ErrorCategory::Authentication,
            Self::Forbidden { .. } => ErrorCategory::Forbidden,
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::Server { .. } | Self::MethodDefinition { .. } => ErrorCategory::Server,
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        self.category().status_code()
    }

    /// Returns a machine-readable error code.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::Authentication { .. } => "AUTHENTICATION_ERROR",
            Self::Forbidden { .. } => "FORBIDDEN",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Server { .. } => "SERVER_ERROR",
            Self::MethodDefinition { .. } => "METHOD_DEFINITION_ERROR",
        }
    }

    /// Converts this error into a response body.
    ///
    /// Returns `None` for categories that respond without a body (401, 403, 404).
    /// Backtraces are attached to server errors only when `expose_backtrace`
    /// is set.
    #[must_use]
    pub fn to_envelope(&self, expose_backtrace: bool) -> Option<ErrorEnvelope> {
        if !self.category().has_body() {
            return None;
        }

        let backtrace = match self {
            Self::Server { backtrace, .. } if expose_backtrace => {
                Some(backtrace_lines(&backtrace.to_string()))
            }
            Self::MethodDefinition { .. } if expose_backtrace => {
                Some(backtrace_lines(&Backtrace::force_capture().to_string()))
            }
            _ => None,
        };

        let details = match self {
            Self::Validation {
                field_errors: Some(errors),
                ..
            } => serde_json::to_value(errors).ok(),
            _ => None,
        };

        Some(ErrorEnvelope {
            error: self.error_code().to_string(),
            message: self.to_string(),
            details,
            backtrace,
        })
    }
}

/// Splits a rendered backtrace into trimmed, non-empty lines.
#[must_use]
pub fn backtrace_lines(rendered: &str) -> Vec<String> {
    rendered
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Field-specific validation errors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldErrors {
    /// Map of field path to list of error messages.
    pub fields: BTreeMap<String, Vec<String>>,
}

impl FieldErrors {
    /// Creates a new empty `FieldErrors`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an error for a field.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.fields
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    /// Returns `true` if there are no field errors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns the number of fields with errors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }
}

/// Serializable error body for 400 and 500 responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// Machine-readable error code.
    pub error: String,
    /// Human-readable error message.
    pub message: String,
    /// Additional error details.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    /// Backtrace lines (non-production server errors only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backtrace: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error() {
        let error = HermesError::validation("age failed between?(0,120) validation");
        assert_eq!(error.category(), ErrorCategory::Validation);
        assert_eq!(error.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(error.to_string(), "age failed between?(0,120) validation");
    }

    #[test]
    fn test_validation_envelope_has_code_and_message() {
        let mut field_errors = FieldErrors::new();
        field_errors.add("name", "is required");

        let error = HermesError::validation_with_fields("missing: name", field_errors);
        let envelope = error.to_envelope(true).expect("validation errors carry a body");

        assert_eq!(envelope.error, "VALIDATION_ERROR");
        assert_eq!(envelope.message, "missing: name");
        assert!(envelope.details.is_some());
        assert!(envelope.backtrace.is_none());
    }

    #[test]
    fn test_bodyless_categories() {
        for error in [
            HermesError::authentication("bad token"),
            HermesError::forbidden("no"),
            HermesError::not_found("/v1/nothing"),
        ] {
            assert!(error.to_envelope(true).is_none());
        }
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            HermesError::authentication("x").status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(HermesError::forbidden("x").status_code(), StatusCode::FORBIDDEN);
        assert_eq!(HermesError::not_found("x").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            HermesError::server("x").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            HermesError::method_definition("tests", "get", "x").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_server_backtrace_only_when_exposed() {
        let error = HermesError::server("boom");

        let hidden = error.to_envelope(false).unwrap();
        assert!(hidden.backtrace.is_none());

        let shown = error.to_envelope(true).unwrap();
        assert_eq!(shown.error, "SERVER_ERROR");
        assert!(shown.backtrace.is_some());
    }

    #[test]
    fn test_server_with_source_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire");
        let error = HermesError::server_with_source("lookup failed", io);
        assert!(std::error::Error::source(&error).is_some());
    }

    #[test]
    fn test_envelope_serialization_skips_empty_fields() {
        let envelope = HermesError::validation("bad").to_envelope(false).unwrap();
        let json = serde_json::to_string(&envelope).expect("serialization should work");
        assert_eq!(json, r#"{"error":"VALIDATION_ERROR","message":"bad"}"#);
    }

    #[test]
    fn test_field_errors() {
        let mut errors = FieldErrors::new();
        assert!(errors.is_empty());

        errors.add("email", "Invalid format");
        errors.add("email", "Required");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.fields["email"].len(), 2);
    }

    #[test]
    fn test_backtrace_lines_drops_blank_lines() {
        let lines = backtrace_lines("  0: main\n\n   at src/main.rs:1\n");
        assert_eq!(lines, vec!["0: main", "at src/main.rs:1"]);
    }
}
