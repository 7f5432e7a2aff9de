//! # Hermes Schema
//!
//! Declarative parameter schemas for Hermes resources.
//!
//! A schema lists typed fields (literal names or regex patterns), marks some
//! required or defaulted, chains predicate checks, and nests schemas for hash
//! and array-of-hash fields. Validation turns a wire map of strings into a
//! typed map, or fails with a single
//! [`HermesError::Validation`](hermes_core::HermesError::Validation).
//!
//! ```rust
//! use hermes_core::params;
//! use hermes_schema::{Field, FieldType, Schema};
//!
//! let schema = Schema::builder()
//!     .strict(true)
//!     .field(Field::string("name").required())
//!     .field(Field::array("tags").of(FieldType::Symbol))
//!     .build()
//!     .unwrap();
//!
//! let err = schema
//!     .validate(&params! { "name" => "x", "colour" => "red" })
//!     .unwrap_err();
//! assert_eq!(err.to_string(), "unexpected parameters: colour");
//! ```
//!
//! Coercion rules per type live in [`coerce`]; the predicate table in
//! [`predicate`].

#![doc(html_root_url = "https://docs.rs/hermes-schema/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod coerce;
mod error;
mod field;
pub mod predicate;
mod schema;

pub use error::SchemaError;
pub use field::{Field, FieldType, Matcher, PredicateCall};
pub use predicate::PredicateTable;
pub use schema::{Schema, SchemaBuilder};
