//! In-process transport.

use async_trait::async_trait;
use hermes_core::{Environment, RequestContext};
use hermes_router::{DispatchRequest, Dispatcher};
use http::Method;

use crate::error::TransportError;
use crate::transport::{Transport, TransportRequest, TransportResponse};

/// Calls a [`Dispatcher`] in the same process.
///
/// Useful for tests and for services that host their own dependencies.
/// Query and body parameters are merged and rendered in wire form, so the
/// dispatcher coerces them exactly as it would after an HTTP hop. Request
/// headers become the dispatch [`RequestContext`].
#[derive(Debug, Clone)]
pub struct DirectTransport {
    dispatcher: Dispatcher,
    environment: Environment,
}

impl DirectTransport {
    /// Wraps `dispatcher`.
    #[must_use]
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher,
            environment: Environment::default(),
        }
    }

    /// Sets the environment reported to the dispatcher.
    #[must_use]
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }
}

#[async_trait]
impl Transport for DirectTransport {
    async fn invoke(
        &self,
        verb: Method,
        path: &str,
        request: TransportRequest,
    ) -> Result<TransportResponse, TransportError> {
        let ctx = RequestContext::from_headers(&request.headers).with_environment(self.environment);
        let dispatch = DispatchRequest::new(verb, path).with_params(request.wire_params());
        let dispatcher = self.dispatcher.clone();

        // Business methods are synchronous and may block.
        let response = tokio::task::spawn_blocking(move || dispatcher.dispatch(&ctx, dispatch))
            .await
            .map_err(TransportError::other)?;

        Ok(TransportResponse {
            status: response.status,
            body: response.body_string(),
            headers: response.headers,
        })
    }

    fn name(&self) -> &'static str {
        "direct"
    }
}
