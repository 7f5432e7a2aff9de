//! Network transport over `reqwest`.

use std::time::Duration;

use async_trait::async_trait;
use hermes_config::ClientConfig;
use hermes_core::wire;
use http::header::CONTENT_TYPE;
use http::{HeaderValue, Method};
use reqwest::Client as ReqwestClient;

use crate::error::{ClientError, TransportError};
use crate::transport::{Transport, TransportRequest, TransportResponse};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Calls a remote Hermes service over HTTP.
///
/// `GET` and `DELETE` send their parameters in the query string; `POST` and
/// `PUT` send them as a form body.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: ReqwestClient,
    base_url: String,
    timeout: Duration,
}

impl HttpTransport {
    /// Creates a transport for `base_url` with a per-call `timeout`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ClientError> {
        let client = ReqwestClient::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(32)
            .build()
            .map_err(|e| ClientError::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        })
    }

    /// Creates a transport from the `[client]` configuration section.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ClientError> {
        Self::new(config.base_url.clone(), config.timeout())
    }

    /// Returns the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the per-call timeout.
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    fn url(&self, path: &str, request: &TransportRequest) -> String {
        if request.query.is_empty() {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}{}?{}", self.base_url, path, wire::encode(&request.query))
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn invoke(
        &self,
        verb: Method,
        path: &str,
        request: TransportRequest,
    ) -> Result<TransportResponse, TransportError> {
        let url = self.url(path, &request);

        let mut builder = match verb {
            Method::GET => self.client.get(&url),
            Method::POST => self.client.post(&url),
            Method::PUT => self.client.put(&url),
            Method::DELETE => self.client.delete(&url),
            other => {
                return Err(TransportError::other(anyhow::anyhow!(
                    "unsupported verb: {other}"
                )))
            }
        };

        builder = builder.headers(request.headers);
        if verb == Method::POST || verb == Method::PUT {
            builder = builder
                .header(CONTENT_TYPE, HeaderValue::from_static(FORM_CONTENT_TYPE))
                .body(wire::encode(&request.data));
        }

        tracing::debug!(http.method = %verb, url = %url, "sending request");

        let response = builder.send().await.map_err(|e| self.classify(e))?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await.map_err(|e| self.classify(e))?;

        Ok(TransportResponse {
            status,
            body,
            headers,
        })
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

impl HttpTransport {
    fn classify(&self, error: reqwest::Error) -> TransportError {
        if error.is_timeout() {
            TransportError::Timeout(self.timeout)
        } else {
            TransportError::other(error)
        }
    }
}
