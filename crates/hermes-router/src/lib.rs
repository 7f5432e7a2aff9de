//! Versioned resource routing for Hermes.
//!
//! This crate turns a request like `GET /v1/tests/abc123/mounted_objects`
//! into a call of one business method on one resource instance:
//!
//! 1. [`RequestDescriptor`] parses the path into a version and an object
//!    chain of `(name, id)` pairs.
//! 2. The [`Api`] registry yields the top-level resource for the first pair;
//!    every following pair is looked up in the current resource's mount
//!    registry. Ids are injected as `<singular>_<id_name>` parameters.
//! 3. The verb plus "does the final resource carry an id" picks one of the
//!    five [`Operation`]s.
//! 4. The operation's schema validates the parameters and the handler runs
//!    on a fresh instance.
//!
//! # Example
//!
//! ```rust
//! use hermes_core::{Params, RequestContext};
//! use hermes_router::{Api, DispatchRequest, Dispatcher, ResourceBuilder};
//! use http::StatusCode;
//! use serde_json::json;
//!
//! let mounted = ResourceBuilder::new("mounted_objects", |_| ())
//!     .search(|_: &mut (), _: &RequestContext, params: Params| {
//!         Ok(json!({ "test_id": params["test_id"] }))
//!     })
//!     .build()
//!     .unwrap();
//! let tests = ResourceBuilder::new("tests", |_| ()).mount(mounted).build().unwrap();
//! let dispatcher = Dispatcher::new(Api::builder().version(1, [tests]).build().unwrap());
//!
//! let response = dispatcher.dispatch(
//!     &RequestContext::new(),
//!     DispatchRequest::get("/v1/tests/abc123/mounted_objects"),
//! );
//! assert_eq!(response.status, StatusCode::OK);
//! assert_eq!(response.body.unwrap()["test_id"], "abc123");
//! ```
//!
//! # Architecture
//!
//! ```text
//!            Api (v1)
//!               │
//!            "tests"          test_id ← /tests/{id}
//!               │
//!        "mounted_objects"    search / create / get / update / delete
//! ```

#![doc(html_root_url = "https://docs.rs/hermes-router/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod api;
mod dispatcher;
mod path;
mod resource;

pub use api::{Api, ApiBuilder};
pub use dispatcher::{DispatchRequest, DispatchResponse, Dispatcher};
pub use path::{resolve, ChainLink, RequestDescriptor, MAX_PATH_LEN};
pub use resource::{singularize, Operation, ResourceBuilder, ResourceType};
