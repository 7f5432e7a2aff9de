//! Schema definition errors.
//!
//! These are raised while a schema is being built; validation failures are
//! reported as [`hermes_core::HermesError::Validation`].

use thiserror::Error;

/// Errors raised by [`SchemaBuilder::build`](crate::SchemaBuilder::build).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// A field names a predicate that is neither built in nor registered.
    #[error("field {field} uses unknown predicate {predicate}")]
    UnknownPredicate {
        /// The field declaring the predicate.
        field: String,
        /// The predicate name.
        predicate: String,
    },

    /// A default value cannot be coerced to the field type.
    #[error("default for {field} is not {expected}: {reason}")]
    InvalidDefault {
        /// The field declaring the default.
        field: String,
        /// The declared type, with article.
        expected: &'static str,
        /// Why coercion failed.
        reason: String,
    },

    /// A dynamically named field was declared required or given a default.
    #[error("pattern field {field} cannot be required or defaulted")]
    PatternRequirement {
        /// The pattern, rendered as `/.../`.
        field: String,
    },

    /// A nested schema was attached to a field that cannot hold one.
    #[error("field {field} of type {ty} cannot have a nested schema")]
    NestedOnScalar {
        /// The field name.
        field: String,
        /// The declared type.
        ty: String,
    },
}
