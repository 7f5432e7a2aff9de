//! The dispatch boundary.
//!
//! [`Dispatcher::dispatch`] resolves a path against an [`Api`], walks the
//! mount tree, validates parameters, runs the business method and turns every
//! outcome (including panics) into a [`DispatchResponse`].

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use hermes_core::{
    wire, HermesError, HermesResult, Params, RequestContext, Value, REQUEST_ID_HEADER,
};
use hermes_telemetry::metrics;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderValue, Method, StatusCode};

use crate::api::Api;
use crate::path::resolve;
use crate::resource::{Operation, ResourceType};

/// An inbound call.
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    /// HTTP verb.
    pub verb: Method,
    /// Request path, e.g. `/v1/tests/abc123`.
    pub path: String,
    /// Wire parameters (query and body merged).
    pub params: Params,
}

impl DispatchRequest {
    /// Creates a request without parameters.
    #[must_use]
    pub fn new(verb: Method, path: impl Into<String>) -> Self {
        Self {
            verb,
            path: path.into(),
            params: Params::new(),
        }
    }

    /// Creates a `GET` request.
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// Creates a `POST` request.
    #[must_use]
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// Creates a `PUT` request.
    #[must_use]
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    /// Creates a `DELETE` request.
    #[must_use]
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Replaces the parameters.
    #[must_use]
    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    /// Merges parameters decoded from a query string or form body.
    #[must_use]
    pub fn with_encoded(mut self, encoded: &str) -> Self {
        self.params.extend(wire::decode(encoded));
        self
    }
}

/// The outcome of a dispatch.
#[derive(Debug, Clone)]
pub struct DispatchResponse {
    /// Response status.
    pub status: StatusCode,
    /// JSON body; `None` for 401, 403 and 404.
    pub body: Option<serde_json::Value>,
    /// Response headers.
    pub headers: HeaderMap,
}

impl DispatchResponse {
    /// Returns the body serialized as JSON, or an empty string.
    #[must_use]
    pub fn body_string(&self) -> String {
        self.body
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default()
    }

    /// Returns `true` for 2xx responses.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Routes requests to resource handlers.
///
/// The dispatcher is cheap to clone and holds only immutable state, so one
/// instance may serve any number of threads.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    api: Arc<Api>,
    expose_backtraces: Option<bool>,
}

impl Dispatcher {
    /// Creates a dispatcher over `api`.
    #[must_use]
    pub fn new(api: Api) -> Self {
        Self::from_shared(Arc::new(api))
    }

    /// Creates a dispatcher over a shared `api`.
    #[must_use]
    pub fn from_shared(api: Arc<Api>) -> Self {
        Self {
            api,
            expose_backtraces: None,
        }
    }

    /// Forces backtrace exposure on or off. By default backtraces are
    /// exposed outside production.
    #[must_use]
    pub fn with_backtraces(mut self, expose: bool) -> Self {
        self.expose_backtraces = Some(expose);
        self
    }

    /// Returns the registry.
    #[must_use]
    pub fn api(&self) -> &Api {
        &self.api
    }

    /// Handles one request. Never fails: errors become error responses.
    pub fn dispatch(&self, ctx: &RequestContext, request: DispatchRequest) -> DispatchResponse {
        let span = tracing::info_span!(
            "dispatch",
            request_id = %ctx.request_id(),
            http.method = %request.verb,
            http.path = %request.path,
        );
        let _entered = span.enter();

        let mut operation = None;
        let outcome = self.route(ctx, request, &mut operation);
        let operation_name = operation.map_or("unresolved", Operation::as_str);

        let (status, body) = match outcome {
            Ok((status, body)) => {
                tracing::info!(
                    operation = operation_name,
                    http.status_code = status.as_u16(),
                    duration_ms = u64::try_from(ctx.elapsed().as_millis()).unwrap_or(u64::MAX),
                    "request completed"
                );
                (status, Some(body))
            }
            Err(error) => {
                let status = error.status_code();
                if status.is_server_error() {
                    tracing::error!(
                        operation = operation_name,
                        http.status_code = status.as_u16(),
                        error = %error,
                        "request failed"
                    );
                } else {
                    tracing::info!(
                        operation = operation_name,
                        http.status_code = status.as_u16(),
                        error = %error,
                        "request rejected"
                    );
                }
                let expose = self
                    .expose_backtraces
                    .unwrap_or_else(|| !ctx.environment().is_production());
                let body = error
                    .to_envelope(expose)
                    .and_then(|envelope| serde_json::to_value(envelope).ok());
                (status, body)
            }
        };

        metrics::record_dispatch(operation_name, status.as_u16(), ctx.elapsed());

        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(&ctx.request_id().to_string()) {
            headers.insert(REQUEST_ID_HEADER, value);
        }
        if body.is_some() {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }

        DispatchResponse {
            status,
            body,
            headers,
        }
    }

    fn route(
        &self,
        ctx: &RequestContext,
        request: DispatchRequest,
        resolved: &mut Option<Operation>,
    ) -> HermesResult<(StatusCode, serde_json::Value)> {
        let descriptor = resolve(&request.path)?;
        let mut params = request.params;
        let mut injected = Vec::new();

        let mut current: Option<&Arc<ResourceType>> = None;
        for link in descriptor.object_chain() {
            let next = match current {
                None => self.api.resource(descriptor.version(), &link.name),
                Some(parent) => parent.mount(&link.name),
            };
            let resource = next.ok_or_else(|| {
                HermesError::not_found(format!(
                    "no resource {} in {}",
                    link.name,
                    descriptor.to_path()
                ))
            })?;

            if let Some(id) = &link.id {
                params.insert(resource.id_param().to_string(), Value::String(id.clone()));
                injected.push(resource.id_param().to_string());
            }
            current = Some(resource);
        }

        let resource = current
            .ok_or_else(|| HermesError::not_found(format!("no route for {}", request.path)))?;
        let id = descriptor
            .object_chain()
            .last()
            .and_then(|link| link.id.clone());

        let operation = Operation::from_request(&request.verb, id.is_some())
            .filter(|op| resource.supports(*op))
            .ok_or_else(|| {
                HermesError::not_found(format!(
                    "{} {} has no matching operation",
                    request.verb, request.path
                ))
            })?;
        *resolved = Some(operation);

        tracing::debug!(
            resource = resource.name(),
            operation = operation.as_str(),
            "resolved"
        );

        // Custom predicates run here and may panic.
        let body = catch_unwind(AssertUnwindSafe(|| {
            let typed = resource
                .schema(operation)
                .validate_allowing(&params, &injected)?;
            resource.invoke(operation, id, ctx, typed)
        }))
        .map_err(|payload| {
            HermesError::server(format!(
                "{}#{operation} panicked: {}",
                resource.name(),
                panic_message(payload.as_ref())
            ))
        })??;

        if !body.is_object() {
            return Err(HermesError::server(format!(
                "{}#{operation} returned {}, expected a map",
                resource.name(),
                json_kind(&body)
            )));
        }

        Ok((operation.success_status(), body))
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}

const fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "a map",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::ResourceBuilder;
    use hermes_core::{params, Environment};
    use hermes_schema::{Field, Schema};
    use serde_json::json;

    fn dispatcher() -> Dispatcher {
        let notes = ResourceBuilder::new("notes", |_| ())
            .search(|_: &mut (), _: &RequestContext, _: Params| Ok(json!(["not", "a", "map"])))
            .get(|_: &mut (), _: &RequestContext, _: Params| -> HermesResult<serde_json::Value> {
                panic!("storage offline")
            })
            .build()
            .unwrap();

        Dispatcher::new(Api::builder().version(1, [notes]).build().unwrap())
    }

    #[test]
    fn test_non_map_return_is_server_error() {
        let response = dispatcher().dispatch(&RequestContext::new(), DispatchRequest::get("/v1/notes"));
        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
        let body = response.body.unwrap();
        assert_eq!(body["error"], "SERVER_ERROR");
        assert_eq!(body["message"], "notes#search returned an array, expected a map");
    }

    #[test]
    fn test_panic_becomes_500() {
        let response = dispatcher().dispatch(&RequestContext::new(), DispatchRequest::get("/v1/notes/1"));
        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
        let body = response.body.unwrap();
        assert_eq!(body["message"], "notes#get panicked: storage offline");
        assert!(body["backtrace"].is_array());
    }

    #[test]
    fn test_panicking_predicate_becomes_500() {
        let lookups = ResourceBuilder::new("lookups", |_| ())
            .search(|_: &mut (), _: &RequestContext, _: Params| Ok(json!({})))
            .schema(
                Operation::Search,
                Schema::builder()
                    .predicate("known?", |_, _| panic!("lookup table missing"))
                    .field(Field::string("key").check("known?", Vec::<String>::new()))
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap();
        let dispatcher = Dispatcher::new(Api::builder().version(1, [lookups]).build().unwrap());

        let response = dispatcher.dispatch(
            &RequestContext::new(),
            DispatchRequest::get("/v1/lookups").with_params(params! { "key" => "a" }),
        );
        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
        let body = response.body.unwrap();
        assert_eq!(body["error"], "SERVER_ERROR");
        assert_eq!(body["message"], "lookups#search panicked: lookup table missing");
    }

    #[test]
    fn test_production_hides_backtrace() {
        let ctx = RequestContext::new().with_environment(Environment::Production);
        let response = dispatcher().dispatch(&ctx, DispatchRequest::get("/v1/notes"));
        let body = response.body.unwrap();
        assert!(body.get("backtrace").is_none());
        assert!(body.get("message").is_some());
    }

    #[test]
    fn test_unknown_paths_have_no_body() {
        for request in [
            DispatchRequest::get("/v2/notes"),
            DispatchRequest::get("/v1/missing"),
            DispatchRequest::get("not a path"),
            DispatchRequest::post("/v1/notes/1"),
            DispatchRequest::delete("/v1/notes/1"),
        ] {
            let response = dispatcher().dispatch(&RequestContext::new(), request);
            assert_eq!(response.status, StatusCode::NOT_FOUND);
            assert!(response.body.is_none());
            assert_eq!(response.body_string(), "");
        }
    }

    #[test]
    fn test_echoes_request_id() {
        let ctx = RequestContext::new();
        let response = dispatcher().dispatch(&ctx, DispatchRequest::get("/v1/missing"));
        assert_eq!(
            response.headers.get(REQUEST_ID_HEADER).unwrap(),
            &ctx.request_id().to_string()
        );
    }

    #[test]
    fn test_encoded_params_are_merged() {
        let request = DispatchRequest::get("/v1/notes")
            .with_params(params! { "a" => "1" })
            .with_encoded("b[]=2&b[]=3");
        assert_eq!(request.params["a"], Value::from("1"));
        assert_eq!(request.params["b"], Value::from(vec!["2", "3"]));
    }
}
