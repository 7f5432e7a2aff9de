//! Playback of recorded calls for contract tests.
//!
//! A stub file maps path → verb → context → recording:
//!
//! ```yaml
//! /v1/tests:
//!   get:
//!     default:
//!       request: { page: 1 }
//!       response: { tests: [] }
//!   post:
//!     missing name:
//!       request: {}
//!       response[successful=false]:
//!         error: VALIDATION_ERROR
//!         message: missing parameters: name
//! ```
//!
//! The response key picks the status: `response` and
//! `response[successful=true]` answer 200 (201 for `POST`),
//! `response[successful=false]` answers 400. When a recording has a
//! `request`, the call's parameters must equal it in wire form.

use std::fs;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use hermes_core::{wire, Params, Value};
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderValue, Method, StatusCode};
use indexmap::IndexMap;
use parking_lot::Mutex;

use crate::error::{InvalidStubFile, StubError, TransportError};
use crate::transport::{Transport, TransportRequest, TransportResponse};

/// Context used when no marker is set.
pub const DEFAULT_CONTEXT: &str = "default";

#[derive(Debug, Clone, PartialEq)]
struct Recording {
    request: Option<Params>,
    successful: bool,
    body: serde_json::Value,
}

type Recordings = IndexMap<String, IndexMap<Method, IndexMap<String, Recording>>>;

#[derive(Debug)]
struct StubInner {
    recordings: Recordings,
    context: Mutex<Option<String>>,
}

/// Answers calls from a recorded stub file.
///
/// Clones share recordings and the context marker.
#[derive(Debug, Clone)]
pub struct StubTransport {
    inner: Arc<StubInner>,
}

impl StubTransport {
    /// Loads a stub file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, InvalidStubFile> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| InvalidStubFile::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    /// Parses stub YAML.
    pub fn from_yaml(content: &str) -> Result<Self, InvalidStubFile> {
        let raw: IndexMap<String, IndexMap<String, IndexMap<String, serde_yaml::Mapping>>> =
            serde_yaml::from_str(content)?;

        let mut recordings = Recordings::new();
        for (path, verbs) in raw {
            let mut by_verb = IndexMap::new();
            for (verb, contexts) in verbs {
                let method = parse_verb(&verb)
                    .ok_or_else(|| InvalidStubFile::layout(&path, format!("unknown verb {verb}")))?;
                let mut by_context = IndexMap::new();
                for (context, entry) in contexts {
                    let location = format!("{path} {verb} {context}");
                    by_context.insert(context, parse_recording(&location, entry)?);
                }
                by_verb.insert(method, by_context);
            }
            recordings.insert(path, by_verb);
        }

        Ok(Self {
            inner: Arc::new(StubInner {
                recordings,
                context: Mutex::new(None),
            }),
        })
    }

    /// Sets the context marker used to pick recordings.
    pub fn set_context(&self, context: impl Into<String>) {
        *self.inner.context.lock() = Some(context.into());
    }

    /// Clears the context marker; calls fall back to [`DEFAULT_CONTEXT`].
    pub fn clear_context(&self) {
        *self.inner.context.lock() = None;
    }

    /// Returns the active context.
    pub fn context(&self) -> String {
        self.inner
            .context
            .lock()
            .clone()
            .unwrap_or_else(|| DEFAULT_CONTEXT.to_string())
    }

    /// Runs `call` under `context`, restoring the previous marker afterwards.
    ///
    /// The marker is restored even when the returned future is dropped
    /// before completion.
    pub async fn with_context<F, T>(&self, context: impl Into<String>, call: F) -> T
    where
        F: Future<Output = T>,
    {
        let _restore = ContextGuard {
            stub: self,
            previous: self.inner.context.lock().replace(context.into()),
        };
        call.await
    }

    fn lookup(
        &self,
        verb: &Method,
        path: &str,
        params: &Params,
    ) -> Result<(String, &Recording), StubError> {
        let missing_route = || StubError::MissingRoute {
            verb: verb.clone(),
            path: path.to_string(),
        };
        let contexts = self
            .inner
            .recordings
            .get(path)
            .and_then(|verbs| verbs.get(verb))
            .ok_or_else(missing_route)?;

        let context = self.context();
        let recording = contexts
            .get(&context)
            .ok_or_else(|| StubError::MissingContext {
                verb: verb.clone(),
                path: path.to_string(),
                context: context.clone(),
            })?;

        if let Some(expected) = &recording.request {
            if expected != params {
                return Err(StubError::RequestMismatch {
                    verb: verb.clone(),
                    path: path.to_string(),
                    context,
                    expected: wire::encode(expected),
                    actual: wire::encode(params),
                });
            }
        }

        Ok((context, recording))
    }
}

struct ContextGuard<'a> {
    stub: &'a StubTransport,
    previous: Option<String>,
}

impl Drop for ContextGuard<'_> {
    fn drop(&mut self) {
        *self.stub.inner.context.lock() = self.previous.take();
    }
}

#[async_trait]
impl Transport for StubTransport {
    async fn invoke(
        &self,
        verb: Method,
        path: &str,
        request: TransportRequest,
    ) -> Result<TransportResponse, TransportError> {
        let (context, recording) = self.lookup(&verb, path, &request.wire_params())?;

        let status = if !recording.successful {
            StatusCode::BAD_REQUEST
        } else if verb == Method::POST {
            StatusCode::CREATED
        } else {
            StatusCode::OK
        };
        tracing::debug!(http.method = %verb, http.path = path, context = %context, status = status.as_u16(), "stub hit");

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(TransportResponse {
            status,
            body: recording.body.to_string(),
            headers,
        })
    }

    fn name(&self) -> &'static str {
        "stub"
    }
}

fn parse_verb(verb: &str) -> Option<Method> {
    match verb.to_ascii_uppercase().as_str() {
        "GET" => Some(Method::GET),
        "POST" => Some(Method::POST),
        "PUT" => Some(Method::PUT),
        "DELETE" => Some(Method::DELETE),
        _ => None,
    }
}

fn parse_recording(location: &str, entry: serde_yaml::Mapping) -> Result<Recording, InvalidStubFile> {
    let mut request = None;
    let mut response = None;

    for (key, value) in entry {
        let key = key
            .as_str()
            .ok_or_else(|| InvalidStubFile::layout(location, "keys must be strings"))?;
        let json = serde_json::to_value(&value)
            .map_err(|e| InvalidStubFile::layout(location, format!("{key}: {e}")))?;

        let successful = match key {
            "request" => {
                let params: Params = serde_json::from_value(json).map_err(|e| {
                    InvalidStubFile::layout(location, format!("request must be a map: {e}"))
                })?;
                request = Some(to_wire(&params));
                continue;
            }
            "response" | "response[successful=true]" => true,
            "response[successful=false]" => false,
            other => {
                return Err(InvalidStubFile::layout(
                    location,
                    format!("unexpected key {other}"),
                ))
            }
        };

        if response.replace((successful, json)).is_some() {
            return Err(InvalidStubFile::layout(location, "more than one response"));
        }
    }

    let (successful, body) =
        response.ok_or_else(|| InvalidStubFile::layout(location, "missing response"))?;
    Ok(Recording {
        request,
        successful,
        body,
    })
}

fn to_wire(params: &Params) -> Params {
    params
        .iter()
        .map(|(k, v)| (k.clone(), v.to_wire()))
        .collect::<IndexMap<String, Value>>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use hermes_core::params;

    const STUBS: &str = r#"
/v1/tests:
  get:
    default:
      request: { page: 1 }
      response: { tests: [] }
    empty page:
      response: { tests: [], page: 99 }
  POST:
    default:
      response[successful=true]: { id: t-1 }
    missing name:
      response[successful=false]:
        error: VALIDATION_ERROR
        message: "missing parameters: name"
"#;

    fn stub() -> StubTransport {
        StubTransport::from_yaml(STUBS).unwrap()
    }

    async fn call(stub: &StubTransport, verb: Method, params: Params) -> Result<TransportResponse, TransportError> {
        stub.invoke(verb.clone(), "/v1/tests", TransportRequest::for_verb(&verb, params))
            .await
    }

    #[tokio::test]
    async fn test_default_context_matches_request() {
        let stub = stub();
        let response = call(&stub, Method::GET, params! { "page" => "1" }).await.unwrap();
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body, r#"{"tests":[]}"#);
    }

    #[tokio::test]
    async fn test_typed_params_compare_in_wire_form() {
        let stub = stub();
        assert!(call(&stub, Method::GET, params! { "page" => 1 }).await.is_ok());
    }

    #[tokio::test]
    async fn test_request_mismatch() {
        let stub = stub();
        let err = call(&stub, Method::GET, params! { "page" => "2" }).await.unwrap_err();
        assert!(matches!(
            err,
            TransportError::Stub(StubError::RequestMismatch { ref expected, ref actual, .. })
                if expected == "page=1" && actual == "page=2"
        ));
    }

    #[tokio::test]
    async fn test_post_status_follows_successful_tag() {
        let stub = stub();
        let created = call(&stub, Method::POST, Params::new()).await.unwrap();
        assert_eq!(created.status, StatusCode::CREATED);

        let rejected = stub
            .with_context("missing name", call(&stub, Method::POST, Params::new()))
            .await
            .unwrap();
        assert_eq!(rejected.status, StatusCode::BAD_REQUEST);
        assert!(rejected.body.contains("VALIDATION_ERROR"));
        assert_eq!(stub.context(), DEFAULT_CONTEXT);
    }

    #[tokio::test]
    async fn test_context_marker_selects_recording() {
        let stub = stub();
        stub.set_context("empty page");
        let response = call(&stub, Method::GET, params! { "anything" => "goes" }).await.unwrap();
        assert_eq!(response.body, r#"{"page":99,"tests":[]}"#);

        stub.set_context("unknown");
        let err = call(&stub, Method::GET, Params::new()).await.unwrap_err();
        assert!(matches!(err, TransportError::Stub(StubError::MissingContext { .. })));
        stub.clear_context();
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_call_restores_previous_context() {
        let stub = stub();
        stub.set_context("empty page");

        let pending = stub.with_context("missing name", std::future::pending::<()>());
        let timed_out = tokio::time::timeout(std::time::Duration::from_secs(1), pending).await;
        assert!(timed_out.is_err());
        assert_eq!(stub.context(), "empty page");

        let clone = stub.clone();
        clone.with_context("missing name", async {}).await;
        assert_eq!(stub.context(), "empty page");
    }

    #[tokio::test]
    async fn test_missing_route() {
        let err = stub()
            .invoke(Method::DELETE, "/v1/tests/1", TransportRequest::new())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "no stub recorded for DELETE /v1/tests/1");
    }

    #[test]
    fn test_invalid_layouts() {
        for yaml in [
            "/v1/tests:\n  patch:\n    default:\n      response: {}\n",
            "/v1/tests:\n  get:\n    default:\n      request: {}\n",
            "/v1/tests:\n  get:\n    default:\n      response: {}\n      response[successful=false]: {}\n",
            "/v1/tests:\n  get:\n    default:\n      reply: {}\n",
        ] {
            assert!(matches!(
                StubTransport::from_yaml(yaml),
                Err(InvalidStubFile::Layout { .. })
            ));
        }
        assert!(matches!(
            StubTransport::from_yaml("- not a map"),
            Err(InvalidStubFile::Yaml(_))
        ));
    }
}
