//! Chained resource access.
//!
//! A [`ResourceProxy`] accumulates an object chain and turns it into a path:
//!
//! ```text
//! client.resource("tests").id("abc").child("mounted_objects")   → /v1/tests/abc/mounted_objects
//! ```
//!
//! [`ResourceProxy::access`] applies the accessor rules used by dynamic
//! callers: a bare accessor yields a child proxy, an id yields an identified
//! child proxy, parameters trigger an immediate search, and a trailing `!`
//! turns the call into a create.

use hermes_core::{Params, Symbol};
use http::Method;

use crate::client::{Client, RemoteResponse};
use crate::error::{ClientError, ClientResult};

#[derive(Debug, Clone, PartialEq, Eq)]
struct Link {
    name: String,
    id: Option<String>,
}

/// Argument to [`ResourceProxy::access`].
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ProxyArg {
    /// No argument: collection access.
    #[default]
    None,
    /// An id: identified access.
    Id(String),
    /// Parameters: immediate call.
    Params(Params),
}

impl From<&str> for ProxyArg {
    fn from(id: &str) -> Self {
        Self::Id(id.to_string())
    }
}

impl From<String> for ProxyArg {
    fn from(id: String) -> Self {
        Self::Id(id)
    }
}

impl From<Symbol> for ProxyArg {
    fn from(id: Symbol) -> Self {
        Self::Id(id.as_str().to_string())
    }
}

impl From<Params> for ProxyArg {
    fn from(params: Params) -> Self {
        Self::Params(params)
    }
}

impl From<()> for ProxyArg {
    fn from((): ()) -> Self {
        Self::None
    }
}

/// Result of [`ResourceProxy::access`].
#[derive(Debug, Clone)]
pub enum ProxyAccess {
    /// A deeper proxy; nothing was sent.
    Proxy(ResourceProxy),
    /// The response of the call that was made.
    Response(RemoteResponse),
}

impl ProxyAccess {
    /// Returns the proxy, if this access produced one.
    #[must_use]
    pub fn into_proxy(self) -> Option<ResourceProxy> {
        match self {
            Self::Proxy(proxy) => Some(proxy),
            Self::Response(_) => None,
        }
    }

    /// Returns the response, if this access made a call.
    #[must_use]
    pub fn into_response(self) -> Option<RemoteResponse> {
        match self {
            Self::Proxy(_) => None,
            Self::Response(response) => Some(response),
        }
    }
}

/// A position in a remote API's resource tree.
#[derive(Debug, Clone)]
pub struct ResourceProxy {
    client: Client,
    chain: Vec<Link>,
}

impl ResourceProxy {
    pub(crate) fn root(client: Client) -> Self {
        Self {
            client,
            chain: Vec::new(),
        }
    }

    pub(crate) fn new(client: Client, name: impl Into<String>) -> Self {
        Self::root(client).child(name)
    }

    /// Identifies the current resource.
    #[must_use]
    pub fn id(mut self, id: impl Into<String>) -> Self {
        if let Some(last) = self.chain.last_mut() {
            last.id = Some(id.into());
        }
        self
    }

    /// Descends into a mounted resource.
    #[must_use]
    pub fn child(mut self, name: impl Into<String>) -> Self {
        self.chain.push(Link {
            name: name.into(),
            id: None,
        });
        self
    }

    /// Returns `true` if the current resource carries an id.
    pub fn is_identified(&self) -> bool {
        self.chain.last().is_some_and(|link| link.id.is_some())
    }

    /// Renders the request path.
    pub fn path(&self) -> String {
        let mut path = format!("/v{}", self.client.version());
        for link in &self.chain {
            path.push('/');
            path.push_str(&link.name);
            if let Some(id) = &link.id {
                path.push('/');
                path.push_str(id);
            }
        }
        path
    }

    /// `GET` on a collection.
    pub async fn search(&self, params: Params) -> ClientResult<RemoteResponse> {
        self.send(Method::GET, false, params).await
    }

    /// `POST` on a collection.
    pub async fn create(&self, params: Params) -> ClientResult<RemoteResponse> {
        self.send(Method::POST, false, params).await
    }

    /// `GET` on an identified resource.
    pub async fn get(&self, params: Params) -> ClientResult<RemoteResponse> {
        self.send(Method::GET, true, params).await
    }

    /// `PUT` on an identified resource.
    pub async fn update(&self, params: Params) -> ClientResult<RemoteResponse> {
        self.send(Method::PUT, true, params).await
    }

    /// `DELETE` on an identified resource.
    pub async fn delete(&self, params: Params) -> ClientResult<RemoteResponse> {
        self.send(Method::DELETE, true, params).await
    }

    /// Applies an accessor to this proxy.
    ///
    /// | accessor | argument  | result                         |
    /// |----------|-----------|--------------------------------|
    /// | `name`   | none      | child proxy                    |
    /// | `name`   | id        | identified child proxy         |
    /// | `name`   | params    | `GET` search on the child      |
    /// | `name!`  | none      | `POST` create with no params   |
    /// | `name!`  | params    | `POST` create on the child     |
    ///
    /// `name!` with an id is rejected.
    pub async fn access(
        &self,
        accessor: &str,
        arg: impl Into<ProxyArg>,
    ) -> ClientResult<ProxyAccess> {
        let (name, force_post) = match accessor.strip_suffix('!') {
            Some(name) => (name, true),
            None => (accessor, false),
        };
        if name.is_empty() {
            return Err(ClientError::InvalidAccess(format!(
                "empty accessor {accessor:?}"
            )));
        }

        let child = self.clone().child(name);
        match (arg.into(), force_post) {
            (ProxyArg::None, false) => Ok(ProxyAccess::Proxy(child)),
            (ProxyArg::Id(id), false) => Ok(ProxyAccess::Proxy(child.id(id))),
            (ProxyArg::Params(params), false) => {
                Ok(ProxyAccess::Response(child.search(params).await?))
            }
            (ProxyArg::None, true) => Ok(ProxyAccess::Response(child.create(Params::new()).await?)),
            (ProxyArg::Params(params), true) => {
                Ok(ProxyAccess::Response(child.create(params).await?))
            }
            (ProxyArg::Id(id), true) => Err(ClientError::InvalidAccess(format!(
                "{accessor} cannot take an id ({id})"
            ))),
        }
    }

    async fn send(
        &self,
        verb: Method,
        identified: bool,
        params: Params,
    ) -> ClientResult<RemoteResponse> {
        if self.chain.is_empty() {
            return Err(ClientError::InvalidAccess("no resource selected".to_string()));
        }
        if self.is_identified() != identified {
            let expected = if identified { "an identified" } else { "a collection" };
            return Err(ClientError::InvalidAccess(format!(
                "{verb} on {} requires {expected} resource",
                self.path()
            )));
        }
        self.client.invoke(verb, &self.path(), params).await
    }
}

impl Client {
    /// Applies an accessor at the API root; see [`ResourceProxy::access`].
    pub async fn access(
        &self,
        accessor: &str,
        arg: impl Into<ProxyArg>,
    ) -> ClientResult<ProxyAccess> {
        ResourceProxy::root(self.clone()).access(accessor, arg).await
    }
}
