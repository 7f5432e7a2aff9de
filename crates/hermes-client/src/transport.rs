//! The transport seam.
//!
//! A [`Transport`] performs one RPC call and reports the raw status, body and
//! headers. Everything above it (breaker, decoding, proxies) is transport
//! agnostic.

use async_trait::async_trait;
use hermes_core::Params;
use http::{HeaderMap, Method, StatusCode};

use crate::error::TransportError;

/// Parameters of one transport call.
#[derive(Debug, Clone, Default)]
pub struct TransportRequest {
    /// Sent in the query string.
    pub query: Params,
    /// Sent as a form body.
    pub data: Params,
    /// Extra request headers.
    pub headers: HeaderMap,
}

impl TransportRequest {
    /// Creates an empty request.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Places `params` where `verb` carries them: the query string for
    /// `GET`/`DELETE`, the body for `POST`/`PUT`.
    #[must_use]
    pub fn for_verb(verb: &Method, params: Params) -> Self {
        if *verb == Method::POST || *verb == Method::PUT {
            Self {
                data: params,
                ..Self::default()
            }
        } else {
            Self {
                query: params,
                ..Self::default()
            }
        }
    }

    /// Sets the headers.
    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Returns query and body parameters merged, body winning.
    #[must_use]
    pub fn merged_params(&self) -> Params {
        let mut merged = self.query.clone();
        merged.extend(self.data.iter().map(|(k, v)| (k.clone(), v.clone())));
        merged
    }

    /// Returns the merged parameters in wire form, every scalar rendered as
    /// a string exactly as an HTTP round trip would deliver it.
    #[must_use]
    pub fn wire_params(&self) -> Params {
        self.merged_params()
            .iter()
            .map(|(k, v)| (k.clone(), v.to_wire()))
            .collect()
    }
}

/// What came back from the remote side.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    /// Response status.
    pub status: StatusCode,
    /// Raw body; empty when the response had none.
    pub body: String,
    /// Response headers.
    pub headers: HeaderMap,
}

impl TransportResponse {
    /// Creates a response without headers.
    #[must_use]
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            headers: HeaderMap::new(),
        }
    }
}

/// Performs RPC calls.
///
/// Implementations must report a timeout as [`TransportError::Timeout`];
/// every other failure may be opaque.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Sends `request` to `path` with `verb`.
    async fn invoke(
        &self,
        verb: Method,
        path: &str,
        request: TransportRequest,
    ) -> Result<TransportResponse, TransportError>;

    /// Short name used in log output.
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use hermes_core::{params, Value};

    #[test]
    fn test_params_follow_verb() {
        let get = TransportRequest::for_verb(&Method::GET, params! { "page" => "2" });
        assert_eq!(get.query.len(), 1);
        assert!(get.data.is_empty());

        let put = TransportRequest::for_verb(&Method::PUT, params! { "name" => "x" });
        assert!(put.query.is_empty());
        assert_eq!(put.data["name"], Value::from("x"));
    }

    #[test]
    fn test_merged_params_prefer_body() {
        let request = TransportRequest {
            query: params! { "a" => "1", "b" => "query" },
            data: params! { "b" => "body" },
            headers: HeaderMap::new(),
        };
        let merged = request.merged_params();
        assert_eq!(merged["a"], Value::from("1"));
        assert_eq!(merged["b"], Value::from("body"));
    }

    #[test]
    fn test_wire_params_render_scalars_as_strings() {
        let request = TransportRequest {
            query: params! { "code" => 7, "open" => true },
            data: params! { "ids" => vec![1, 2] },
            headers: HeaderMap::new(),
        };
        let wire = request.wire_params();
        assert_eq!(wire["code"], Value::from("7"));
        assert_eq!(wire["open"], Value::from("true"));
        assert_eq!(wire["ids"], Value::from(vec!["1", "2"]));
    }
}
