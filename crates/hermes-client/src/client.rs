//! The client: one transport behind one circuit breaker.

use std::fmt;
use std::sync::Arc;

use hermes_config::HermesConfig;
use hermes_core::{
    ErrorEnvelope, Params, RequestContext, CONSUMER_HEADER, PRODUCER_HEADER, REQUEST_ID_HEADER,
};
use hermes_telemetry::metrics;
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::breaker::{BreakerError, CircuitBreaker};
use crate::error::{ClientError, ClientResult, TransportError};
use crate::http_transport::HttpTransport;
use crate::proxy::ResourceProxy;
use crate::transport::{Transport, TransportRequest, TransportResponse};

/// Failures that count against the breaker.
#[derive(Debug, Error)]
enum CallFailure {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("remote answered {status}")]
    ServerError {
        status: StatusCode,
        response: TransportResponse,
    },
}

/// A decoded 2xx response.
#[derive(Debug, Clone)]
pub struct RemoteResponse {
    /// Response status.
    pub status: StatusCode,
    /// Decoded JSON body; `Null` when the body was empty.
    pub body: serde_json::Value,
    /// Response headers.
    pub headers: HeaderMap,
}

impl RemoteResponse {
    /// Looks up a top-level key of the body.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.body.get(key)
    }

    /// Decodes the body into `T`.
    pub fn json<T: DeserializeOwned>(&self) -> ClientResult<T> {
        Ok(serde_json::from_value(self.body.clone())?)
    }

    /// Returns the request id echoed by the remote side.
    #[must_use]
    pub fn request_id(&self) -> Option<&str> {
        self.headers
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
    }
}

/// Calls a remote Hermes API.
///
/// Cloning is cheap; clones share the transport and the breaker.
///
/// # Example
///
/// ```no_run
/// use hermes_client::{Client, HttpTransport};
/// use hermes_core::params;
/// use std::time::Duration;
///
/// # async fn run() -> Result<(), hermes_client::ClientError> {
/// let transport = HttpTransport::new("http://accounts.internal:8080", Duration::from_secs(2))?;
/// let client = Client::new(transport).with_consumer("billing");
///
/// let accounts = client.resource("accounts").search(params! { "status" => "open" }).await?;
/// println!("{}", accounts.body);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    transport: Arc<dyn Transport>,
    breaker: Arc<CircuitBreaker>,
    producer: Option<String>,
    consumer: Option<String>,
    version: u32,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("transport", &self.transport.name())
            .field("breaker", &self.breaker)
            .field("producer", &self.producer)
            .field("consumer", &self.consumer)
            .field("version", &self.version)
            .finish()
    }
}

impl Client {
    /// Creates a client over `transport` with a default breaker.
    pub fn new(transport: impl Transport) -> Self {
        Self {
            transport: Arc::new(transport),
            breaker: Arc::new(CircuitBreaker::default()),
            producer: None,
            consumer: None,
            version: 1,
        }
    }

    /// Builds an HTTP client from configuration.
    ///
    /// The producer defaults to the service name.
    pub fn from_config(config: &HermesConfig) -> ClientResult<Self> {
        let transport = HttpTransport::from_config(&config.client)?;
        let mut client = Self::new(transport)
            .with_breaker(CircuitBreaker::from_config(&config.breaker))
            .with_producer(
                config
                    .client
                    .producer
                    .clone()
                    .unwrap_or_else(|| config.service.name.clone()),
            );
        client.consumer.clone_from(&config.client.consumer);
        Ok(client)
    }

    /// Replaces the breaker.
    #[must_use]
    pub fn with_breaker(mut self, breaker: CircuitBreaker) -> Self {
        self.breaker = Arc::new(breaker);
        self
    }

    /// Sets the producer name sent with every call.
    #[must_use]
    pub fn with_producer(mut self, producer: impl Into<String>) -> Self {
        self.producer = Some(producer.into());
        self
    }

    /// Sets the consumer name sent with every call.
    #[must_use]
    pub fn with_consumer(mut self, consumer: impl Into<String>) -> Self {
        self.consumer = Some(consumer.into());
        self
    }

    /// Sets the API version used by [`Client::resource`]. Defaults to 1.
    #[must_use]
    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Returns the breaker.
    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// Returns the API version.
    pub const fn version(&self) -> u32 {
        self.version
    }

    /// Starts a proxy at `/v<version>/<name>`.
    pub fn resource(&self, name: impl Into<String>) -> ResourceProxy {
        ResourceProxy::new(self.clone(), name)
    }

    /// Calls `path` with a fresh request context.
    pub async fn invoke(
        &self,
        verb: Method,
        path: &str,
        params: Params,
    ) -> ClientResult<RemoteResponse> {
        self.invoke_with(&RequestContext::new(), verb, path, params)
            .await
    }

    /// Calls `path`, propagating the request id of `ctx`.
    ///
    /// Transport errors and 5xx responses count as breaker failures.
    /// Non-2xx responses become [`ClientError::Remote`].
    pub async fn invoke_with(
        &self,
        ctx: &RequestContext,
        verb: Method,
        path: &str,
        params: Params,
    ) -> ClientResult<RemoteResponse> {
        let request =
            TransportRequest::for_verb(&verb, params).with_headers(self.headers(ctx));
        let transport = Arc::clone(&self.transport);
        let method = verb.clone();

        let outcome = self
            .breaker
            .call(move || async move {
                let response = transport.invoke(method, path, request).await?;
                if response.status.is_server_error() {
                    Err(CallFailure::ServerError {
                        status: response.status,
                        response,
                    })
                } else {
                    Ok(response)
                }
            })
            .await;

        let response = match outcome {
            Ok(response) => response,
            Err(BreakerError::Open(error)) => {
                tracing::warn!(http.method = %verb, http.path = path, error = %error, "call rejected");
                return Err(ClientError::CircuitOpen(error));
            }
            Err(BreakerError::Inner(CallFailure::Transport(error))) => {
                metrics::record_client_request(verb.as_str(), None);
                tracing::warn!(http.method = %verb, http.path = path, error = %error, "transport failed");
                return Err(ClientError::Transport(error));
            }
            Err(BreakerError::Inner(CallFailure::ServerError { response, .. })) => response,
        };

        metrics::record_client_request(verb.as_str(), Some(response.status.as_u16()));
        tracing::debug!(
            http.method = %verb,
            http.path = path,
            http.status_code = response.status.as_u16(),
            transport = self.transport.name(),
            "call completed"
        );

        decode(response)
    }

    fn headers(&self, ctx: &RequestContext) -> HeaderMap {
        let mut headers = HeaderMap::new();
        insert(&mut headers, REQUEST_ID_HEADER, &ctx.request_id().to_string());
        if let Some(producer) = self.producer.as_deref().or_else(|| ctx.producer()) {
            insert(&mut headers, PRODUCER_HEADER, producer);
        }
        if let Some(consumer) = self.consumer.as_deref().or_else(|| ctx.consumer()) {
            insert(&mut headers, CONSUMER_HEADER, consumer);
        }
        headers
    }
}

fn insert(headers: &mut HeaderMap, name: &'static str, value: &str) {
    if let Ok(value) = HeaderValue::from_str(value) {
        headers.insert(HeaderName::from_static(name), value);
    }
}

fn decode(response: TransportResponse) -> ClientResult<RemoteResponse> {
    if !response.status.is_success() {
        return Err(remote_error(&response));
    }

    let body = if response.body.trim().is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_str(&response.body)?
    };

    Ok(RemoteResponse {
        status: response.status,
        body,
        headers: response.headers,
    })
}

fn remote_error(response: &TransportResponse) -> ClientError {
    let status = response.status;
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(&response.body) {
        return ClientError::Remote {
            status,
            code: envelope.error,
            message: envelope.message,
        };
    }

    let code = match status {
        StatusCode::BAD_REQUEST => "VALIDATION_ERROR".to_string(),
        StatusCode::UNAUTHORIZED => "AUTHENTICATION_ERROR".to_string(),
        StatusCode::FORBIDDEN => "FORBIDDEN".to_string(),
        StatusCode::NOT_FOUND => "NOT_FOUND".to_string(),
        s if s.is_server_error() => "SERVER_ERROR".to_string(),
        s => format!("HTTP_{}", s.as_u16()),
    };
    let message = if response.body.trim().is_empty() {
        status.canonical_reason().unwrap_or("unknown status").to_string()
    } else {
        response.body.clone()
    };

    ClientError::Remote {
        status,
        code,
        message,
    }
}
