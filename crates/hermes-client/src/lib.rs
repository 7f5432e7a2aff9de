//! Calling Hermes services.
//!
//! - [`Transport`] is the seam: [`HttpTransport`] talks to a remote service,
//!   [`DirectTransport`] calls a [`Dispatcher`](hermes_router::Dispatcher) in
//!   process and [`StubTransport`] plays back recorded YAML.
//! - [`CircuitBreaker`] stops calling a dependency after repeated failures
//!   and lets a single probe through once the retry period has passed.
//! - [`Client`] combines one transport with one breaker and decodes
//!   responses; [`ResourceProxy`] builds resource paths fluently.
//!
//! # Example
//!
//! ```rust
//! use hermes_client::{Client, DirectTransport};
//! use hermes_core::{params, Params, RequestContext};
//! use hermes_router::{Api, Dispatcher, ResourceBuilder};
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let tests = ResourceBuilder::new("tests", |_| ())
//!     .search(|_: &mut (), _: &RequestContext, params: Params| Ok(json!({ "q": params["q"] })))
//!     .build()
//!     .unwrap();
//! let dispatcher = Dispatcher::new(Api::builder().version(1, [tests]).build().unwrap());
//!
//! let client = Client::new(DirectTransport::new(dispatcher));
//! let response = client.resource("tests").search(params! { "q" => "rust" }).await.unwrap();
//! assert_eq!(response.body["q"], "rust");
//! # });
//! ```

#![doc(html_root_url = "https://docs.rs/hermes-client/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod breaker;
mod client;
mod direct;
mod error;
mod http_transport;
mod proxy;
mod stub;
mod transport;

pub use breaker::{BreakerError, CircuitBreaker, CircuitState};
pub use client::{Client, RemoteResponse};
pub use direct::DirectTransport;
pub use error::{
    CircuitOpenError, ClientError, ClientResult, InvalidStubFile, StubError, TransportError,
};
pub use http_transport::HttpTransport;
pub use proxy::{ProxyAccess, ProxyArg, ResourceProxy};
pub use stub::{StubTransport, DEFAULT_CONTEXT};
pub use transport::{Transport, TransportRequest, TransportResponse};
