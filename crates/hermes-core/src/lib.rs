//! # Hermes Core
//!
//! Core types shared by every Hermes crate:
//!
//! - [`HermesError`] - Error taxonomy and the 400/500 response envelope
//! - [`RequestContext`] - Per-request correlation id, producer/consumer names and environment
//! - [`Value`] / [`Params`] - Dynamic wire and typed parameter values
//! - [`wire`] - Nested `a[b][]=1` form encoding

#![doc(html_root_url = "https://docs.rs/hermes-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod context;
mod error;
mod value;
pub mod wire;

pub use context::{
    Environment, RequestContext, RequestId, CONSUMER_HEADER, PRODUCER_HEADER, REQUEST_ID_HEADER,
};
pub use error::{
    backtrace_lines, ErrorCategory, ErrorEnvelope, FieldErrors, HermesError, HermesResult,
};
pub use value::{Params, Symbol, Value};
