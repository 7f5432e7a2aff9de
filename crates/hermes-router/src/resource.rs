//! Resource type definitions and mount registries.
//!
//! A resource type is defined once, at startup, with a [`ResourceBuilder`]
//! and frozen into an immutable [`ResourceType`]. Its mount registry maps
//! child names to child types; per-operation schemas and handlers are fixed
//! at the same time.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use hermes_core::{HermesError, HermesResult, Params, RequestContext};
use hermes_schema::Schema;
use http::{Method, StatusCode};
use indexmap::IndexMap;
use serde::Serialize;

/// The five conventional resource operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Operation {
    /// `GET` on a collection.
    Search,
    /// `POST` on a collection.
    Create,
    /// `GET` on an identified resource.
    Get,
    /// `PUT` on an identified resource.
    Update,
    /// `DELETE` on an identified resource.
    Delete,
}

impl Operation {
    /// All operations, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::Search,
        Self::Create,
        Self::Get,
        Self::Update,
        Self::Delete,
    ];

    /// Maps a verb and whether the final resource carries an id to an operation.
    ///
    /// Returns `None` for combinations without a conventional operation,
    /// e.g. `POST` with an id.
    #[must_use]
    pub fn from_request(verb: &Method, identified: bool) -> Option<Self> {
        match (verb, identified) {
            (&Method::GET, false) => Some(Self::Search),
            (&Method::POST, false) => Some(Self::Create),
            (&Method::GET, true) => Some(Self::Get),
            (&Method::PUT, true) => Some(Self::Update),
            (&Method::DELETE, true) => Some(Self::Delete),
            _ => None,
        }
    }

    /// Returns the method name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Search => "search",
            Self::Create => "create",
            Self::Get => "get",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }

    /// Returns the HTTP verb this operation is reached with.
    #[must_use]
    pub fn verb(self) -> Method {
        match self {
            Self::Search | Self::Get => Method::GET,
            Self::Create => Method::POST,
            Self::Update => Method::PUT,
            Self::Delete => Method::DELETE,
        }
    }

    /// Returns `true` if the operation targets an identified resource.
    #[must_use]
    pub const fn is_identified(self) -> bool {
        matches!(self, Self::Get | Self::Update | Self::Delete)
    }

    /// Returns the status of a successful call.
    #[must_use]
    pub const fn success_status(self) -> StatusCode {
        match self {
            Self::Create => StatusCode::CREATED,
            _ => StatusCode::OK,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

type Invoker =
    Arc<dyn Fn(Option<String>, &RequestContext, Params) -> HermesResult<serde_json::Value> + Send + Sync>;

#[derive(Clone)]
struct Handler {
    invoke: Invoker,
    takes_params: bool,
}

fn open_schema() -> &'static Schema {
    static OPEN: OnceLock<Schema> = OnceLock::new();
    OPEN.get_or_init(Schema::open)
}

/// Derives the singular form of a collection name.
///
/// Handles the regular English plurals used for resource names:
/// `tests → test`, `categories → category`, `boxes → box`, `classes → class`.
#[must_use]
pub fn singularize(name: &str) -> String {
    if let Some(stem) = name.strip_suffix("ies") {
        if !stem.is_empty() {
            return format!("{stem}y");
        }
    }
    for suffix in ["sses", "xes", "ches", "shes", "zzes"] {
        if name.ends_with(suffix) {
            return name[..name.len() - 2].to_string();
        }
    }
    if name.ends_with("ss") || name.ends_with("us") {
        return name.to_string();
    }
    name.strip_suffix('s')
        .filter(|stem| !stem.is_empty())
        .unwrap_or(name)
        .to_string()
}

/// An immutable resource type.
pub struct ResourceType {
    name: String,
    singular: String,
    id_name: String,
    id_param: String,
    handlers: HashMap<Operation, Handler>,
    schemas: HashMap<Operation, Schema>,
    mounts: IndexMap<String, Arc<ResourceType>>,
}

impl fmt::Debug for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceType")
            .field("name", &self.name)
            .field("id_param", &self.id_param)
            .field("operations", &self.operations())
            .field("mounts", &self.mounts.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ResourceType {
    /// Returns the URL segment naming this resource.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the singular name used to derive the id parameter.
    #[must_use]
    pub fn singular(&self) -> &str {
        &self.singular
    }

    /// Returns the id name (default `id`).
    #[must_use]
    pub fn id_name(&self) -> &str {
        &self.id_name
    }

    /// Returns the parameter key an id from the path is injected under,
    /// e.g. `test_id` for `tests`.
    #[must_use]
    pub fn id_param(&self) -> &str {
        &self.id_param
    }

    /// Looks up a mounted child type by name.
    #[must_use]
    pub fn mount(&self, name: &str) -> Option<&Arc<ResourceType>> {
        self.mounts.get(name)
    }

    /// Returns the names of the mounted children.
    pub fn mounts(&self) -> impl Iterator<Item = &str> {
        self.mounts.keys().map(String::as_str)
    }

    /// Returns `true` if a handler is registered for `operation`.
    #[must_use]
    pub fn supports(&self, operation: Operation) -> bool {
        self.handlers.contains_key(&operation)
    }

    /// Returns the supported operations in declaration order.
    #[must_use]
    pub fn operations(&self) -> Vec<Operation> {
        Operation::ALL
            .into_iter()
            .filter(|op| self.supports(*op))
            .collect()
    }

    /// Returns whether the handler for `operation` receives the typed params.
    #[must_use]
    pub fn takes_params(&self, operation: Operation) -> Option<bool> {
        self.handlers.get(&operation).map(|h| h.takes_params)
    }

    /// Returns the schema for `operation`; operations without one accept any
    /// parameters.
    #[must_use]
    pub fn schema(&self, operation: Operation) -> &Schema {
        self.schemas
            .get(&operation)
            .unwrap_or_else(|| open_schema())
    }

    /// Builds a fresh instance bound to `id` and runs the `operation` handler.
    pub fn invoke(
        &self,
        operation: Operation,
        id: Option<String>,
        ctx: &RequestContext,
        params: Params,
    ) -> HermesResult<serde_json::Value> {
        let handler = self.handlers.get(&operation).ok_or_else(|| {
            HermesError::not_found(format!("{}#{operation} is not defined", self.name))
        })?;
        (handler.invoke)(id, ctx, params)
    }
}

/// Defines a [`ResourceType`] backed by instances of `R`.
///
/// # Example
///
/// ```rust
/// use hermes_core::{Params, RequestContext};
/// use hermes_router::{Operation, ResourceBuilder};
/// use serde_json::json;
///
/// struct Tests {
///     id: Option<String>,
/// }
///
/// let tests = ResourceBuilder::new("tests", |id| Tests { id })
///     .search(|_tests: &mut Tests, _ctx: &RequestContext, _params: Params| {
///         Ok(json!({ "tests": [] }))
///     })
///     .get_nullary(|tests: &mut Tests, _ctx: &RequestContext| {
///         Ok(json!({ "id": tests.id }))
///     })
///     .build()
///     .unwrap();
///
/// assert_eq!(tests.id_param(), "test_id");
/// assert_eq!(tests.operations(), [Operation::Search, Operation::Get]);
/// ```
pub struct ResourceBuilder<R> {
    name: String,
    singular: Option<String>,
    id_name: String,
    factory: Arc<dyn Fn(Option<String>) -> R + Send + Sync>,
    handlers: HashMap<Operation, Handler>,
    schemas: HashMap<Operation, Schema>,
    mounts: Vec<Arc<ResourceType>>,
}

impl<R: 'static> ResourceBuilder<R> {
    /// Starts a resource named `name`; `factory` creates one instance per
    /// dispatch, bound to the id from the path.
    #[must_use]
    pub fn new<F>(name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(Option<String>) -> R + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            singular: None,
            id_name: "id".to_string(),
            factory: Arc::new(factory),
            handlers: HashMap::new(),
            schemas: HashMap::new(),
            mounts: Vec::new(),
        }
    }

    /// Overrides the derived singular name.
    #[must_use]
    pub fn singular(mut self, singular: impl Into<String>) -> Self {
        self.singular = Some(singular.into());
        self
    }

    /// Overrides the id name (default `id`).
    #[must_use]
    pub fn id_name(mut self, id_name: impl Into<String>) -> Self {
        self.id_name = id_name.into();
        self
    }

    /// Registers a handler receiving the validated parameters.
    #[must_use]
    pub fn handle<F, T>(mut self, operation: Operation, handler: F) -> Self
    where
        F: Fn(&mut R, &RequestContext, Params) -> HermesResult<T> + Send + Sync + 'static,
        T: Serialize,
    {
        let factory = Arc::clone(&self.factory);
        let invoke: Invoker = Arc::new(move |id: Option<String>, ctx: &RequestContext, params: Params| {
            let mut resource = factory(id);
            to_json(&handler(&mut resource, ctx, params)?)
        });
        self.handlers.insert(
            operation,
            Handler {
                invoke,
                takes_params: true,
            },
        );
        self
    }

    /// Registers a handler that takes no parameters.
    ///
    /// Parameters are still validated against the operation schema.
    #[must_use]
    pub fn handle_nullary<F, T>(mut self, operation: Operation, handler: F) -> Self
    where
        F: Fn(&mut R, &RequestContext) -> HermesResult<T> + Send + Sync + 'static,
        T: Serialize,
    {
        let factory = Arc::clone(&self.factory);
        let invoke: Invoker = Arc::new(move |id: Option<String>, ctx: &RequestContext, _params: Params| {
            let mut resource = factory(id);
            to_json(&handler(&mut resource, ctx)?)
        });
        self.handlers.insert(
            operation,
            Handler {
                invoke,
                takes_params: false,
            },
        );
        self
    }

    /// Registers the `search` handler.
    #[must_use]
    pub fn search<F, T>(self, handler: F) -> Self
    where
        F: Fn(&mut R, &RequestContext, Params) -> HermesResult<T> + Send + Sync + 'static,
        T: Serialize,
    {
        self.handle(Operation::Search, handler)
    }

    /// Registers the `create` handler.
    #[must_use]
    pub fn create<F, T>(self, handler: F) -> Self
    where
        F: Fn(&mut R, &RequestContext, Params) -> HermesResult<T> + Send + Sync + 'static,
        T: Serialize,
    {
        self.handle(Operation::Create, handler)
    }

    /// Registers the `get` handler.
    #[must_use]
    pub fn get<F, T>(self, handler: F) -> Self
    where
        F: Fn(&mut R, &RequestContext, Params) -> HermesResult<T> + Send + Sync + 'static,
        T: Serialize,
    {
        self.handle(Operation::Get, handler)
    }

    /// Registers a `get` handler that takes no parameters.
    #[must_use]
    pub fn get_nullary<F, T>(self, handler: F) -> Self
    where
        F: Fn(&mut R, &RequestContext) -> HermesResult<T> + Send + Sync + 'static,
        T: Serialize,
    {
        self.handle_nullary(Operation::Get, handler)
    }

    /// Registers the `update` handler.
    #[must_use]
    pub fn update<F, T>(self, handler: F) -> Self
    where
        F: Fn(&mut R, &RequestContext, Params) -> HermesResult<T> + Send + Sync + 'static,
        T: Serialize,
    {
        self.handle(Operation::Update, handler)
    }

    /// Registers the `delete` handler.
    #[must_use]
    pub fn delete<F, T>(self, handler: F) -> Self
    where
        F: Fn(&mut R, &RequestContext, Params) -> HermesResult<T> + Send + Sync + 'static,
        T: Serialize,
    {
        self.handle(Operation::Delete, handler)
    }

    /// Declares the schema validating `operation` parameters.
    #[must_use]
    pub fn schema(mut self, operation: Operation, schema: Schema) -> Self {
        self.schemas.insert(operation, schema);
        self
    }

    /// Mounts a child resource type under this one.
    #[must_use]
    pub fn mount(mut self, child: Arc<ResourceType>) -> Self {
        self.mounts.push(child);
        self
    }

    /// Freezes the definition.
    ///
    /// # Errors
    ///
    /// Returns `HermesError::MethodDefinition` if the name is not a path
    /// segment, a schema is declared for an operation without handler, or
    /// two mounts share a name.
    pub fn build(self) -> HermesResult<Arc<ResourceType>> {
        if self.name.is_empty() || !self.name.chars().all(is_segment_char) {
            return Err(HermesError::method_definition(
                &self.name,
                "name",
                "resource names must be non-empty word characters",
            ));
        }

        let mut declared: Vec<_> = self.schemas.keys().copied().collect();
        declared.sort();
        if let Some(orphan) = declared.into_iter().find(|op| !self.handlers.contains_key(op)) {
            return Err(HermesError::method_definition(
                &self.name,
                orphan.as_str(),
                "schema declared without a handler",
            ));
        }

        let mut mounts = IndexMap::with_capacity(self.mounts.len());
        for child in self.mounts {
            let child_name = child.name.clone();
            if mounts.insert(child_name.clone(), child).is_some() {
                return Err(HermesError::method_definition(
                    &self.name,
                    child_name,
                    "mounted more than once",
                ));
            }
        }

        let singular = self.singular.unwrap_or_else(|| singularize(&self.name));
        let id_param = format!("{singular}_{}", self.id_name);

        tracing::debug!(
            resource = %self.name,
            id_param = %id_param,
            mounts = mounts.len(),
            "resource type defined"
        );

        Ok(Arc::new(ResourceType {
            name: self.name,
            singular,
            id_name: self.id_name,
            id_param,
            handlers: self.handlers,
            schemas: self.schemas,
            mounts,
        }))
    }
}

fn is_segment_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn to_json<T: Serialize>(output: &T) -> HermesResult<serde_json::Value> {
    serde_json::to_value(output)
        .map_err(|e| HermesError::server_with_source("failed to serialize response", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hermes_core::{params, ErrorCategory, Value};
    use hermes_schema::Field;
    use serde_json::json;

    struct Widget {
        id: Option<String>,
    }

    fn widgets() -> ResourceBuilder<Widget> {
        ResourceBuilder::new("widgets", |id| Widget { id })
    }

    #[test]
    fn test_operation_mapping() {
        assert_eq!(Operation::from_request(&Method::GET, false), Some(Operation::Search));
        assert_eq!(Operation::from_request(&Method::GET, true), Some(Operation::Get));
        assert_eq!(Operation::from_request(&Method::POST, false), Some(Operation::Create));
        assert_eq!(Operation::from_request(&Method::PUT, true), Some(Operation::Update));
        assert_eq!(Operation::from_request(&Method::DELETE, true), Some(Operation::Delete));
        assert_eq!(Operation::from_request(&Method::POST, true), None);
        assert_eq!(Operation::from_request(&Method::PUT, false), None);
        assert_eq!(Operation::from_request(&Method::PATCH, true), None);
    }

    #[test]
    fn test_singularize() {
        assert_eq!(singularize("tests"), "test");
        assert_eq!(singularize("categories"), "category");
        assert_eq!(singularize("mounted_objects"), "mounted_object");
        assert_eq!(singularize("boxes"), "box");
        assert_eq!(singularize("addresses"), "address");
        assert_eq!(singularize("status"), "status");
        assert_eq!(singularize("s"), "s");
    }

    #[test]
    fn test_id_param() {
        let widgets = widgets().build().unwrap();
        assert_eq!(widgets.id_param(), "widget_id");

        let people = ResourceBuilder::new("people", |_| ())
            .singular("person")
            .id_name("uuid")
            .build()
            .unwrap();
        assert_eq!(people.id_param(), "person_uuid");
    }

    #[test]
    fn test_invoke_binds_id() {
        let widgets = widgets()
            .get_nullary(|w: &mut Widget, _ctx: &RequestContext| Ok(json!({ "id": w.id })))
            .build()
            .unwrap();

        let body = widgets
            .invoke(Operation::Get, Some("w1".into()), &RequestContext::new(), Params::new())
            .unwrap();
        assert_eq!(body, json!({ "id": "w1" }));
        assert_eq!(widgets.takes_params(Operation::Get), Some(false));
    }

    #[test]
    fn test_unary_handler_receives_params() {
        let widgets = widgets()
            .search(|_w: &mut Widget, _ctx: &RequestContext, params: Params| {
                Ok(json!({ "count": params.len() }))
            })
            .build()
            .unwrap();

        let body = widgets
            .invoke(
                Operation::Search,
                None,
                &RequestContext::new(),
                params! { "a" => "1", "b" => Value::Null },
            )
            .unwrap();
        assert_eq!(body, json!({ "count": 2 }));
    }

    #[test]
    fn test_missing_operation_is_not_found() {
        let widgets = widgets().build().unwrap();
        let err = widgets
            .invoke(Operation::Delete, Some("1".into()), &RequestContext::new(), Params::new())
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::NotFound);
    }

    #[test]
    fn test_schema_without_handler_is_rejected() {
        let schema = Schema::builder().field(Field::string("q")).build().unwrap();
        let err = widgets().schema(Operation::Search, schema).build().unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid definition of widgets#search: schema declared without a handler"
        );
    }

    #[test]
    fn test_duplicate_mount_is_rejected() {
        let child = ResourceBuilder::new("parts", |_| ()).build().unwrap();
        let err = widgets()
            .mount(Arc::clone(&child))
            .mount(child)
            .build()
            .unwrap_err();
        assert!(matches!(err, HermesError::MethodDefinition { .. }));
    }

    #[test]
    fn test_invalid_name_is_rejected() {
        let err = ResourceBuilder::new("bad-name", |_| ()).build().unwrap_err();
        assert!(matches!(err, HermesError::MethodDefinition { .. }));
    }

    #[test]
    fn test_default_schema_is_open() {
        let widgets = widgets().build().unwrap();
        let typed = widgets
            .schema(Operation::Create)
            .validate(&params! { "anything" => "goes" })
            .unwrap();
        assert_eq!(typed["anything"], Value::from("goes"));
    }
}
