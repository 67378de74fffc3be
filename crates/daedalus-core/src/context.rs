//! Per-request context threaded through the pipeline.

use http::{HeaderMap, Method, Uri};
use indexmap::IndexMap;
use serde_json::Value;

/// The authenticated caller, as produced by the identity provider.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Identity {
    /// Principal name, when known.
    pub name: Option<String>,
    /// Roles granted to the principal.
    pub roles: Vec<String>,
    /// Free-form claims attached by the provider.
    pub claims: Value,
}

impl Identity {
    /// Creates an identity with the given roles.
    #[must_use]
    pub fn with_roles<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: None,
            roles: roles.into_iter().map(Into::into).collect(),
            claims: Value::Null,
        }
    }

    /// Returns true if the identity holds the role.
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

/// Everything the pipeline knows about one in-flight request.
///
/// The query bag holds both query-string pairs and named path captures
/// merged by the router; binding treats them uniformly.
#[derive(Debug, Clone)]
pub struct RequestContext {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Value,
    query: IndexMap<String, Value>,
    cookies: Vec<(String, String)>,
    identity: Option<Identity>,
}

impl RequestContext {
    /// Starts building a context.
    #[must_use]
    pub fn builder() -> RequestContextBuilder {
        RequestContextBuilder::default()
    }

    /// Request method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Request URI.
    #[must_use]
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Request headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// A single header as UTF-8, when present and valid.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Parsed request body. `Null` when the request had none.
    #[must_use]
    pub fn body(&self) -> &Value {
        &self.body
    }

    /// Query-string pairs plus router path captures.
    #[must_use]
    pub fn query(&self) -> &IndexMap<String, Value> {
        &self.query
    }

    /// Mutable access to the query bag; the router merges path
    /// captures in through this.
    pub fn query_mut(&mut self) -> &mut IndexMap<String, Value> {
        &mut self.query
    }

    /// Cookies sent with the request.
    #[must_use]
    pub fn cookies(&self) -> &[(String, String)] {
        &self.cookies
    }

    /// The resolved caller identity, if the provider produced one.
    #[must_use]
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// Attaches the caller identity.
    pub fn set_identity(&mut self, identity: Identity) {
        self.identity = Some(identity);
    }

    /// A JSON snapshot of the context, used when an action binds the
    /// whole context as a parameter.
    #[must_use]
    pub fn snapshot(&self) -> Value {
        let headers: IndexMap<String, String> = self
            .headers
            .iter()
            .filter_map(|(k, v)| Some((k.as_str().to_string(), v.to_str().ok()?.to_string())))
            .collect();
        serde_json::json!({
            "method": self.method.as_str(),
            "url": self.uri.to_string(),
            "headers": headers,
            "query": self.query,
            "body": self.body,
        })
    }
}

/// Builder for [`RequestContext`].
#[derive(Debug, Default)]
pub struct RequestContextBuilder {
    method: Option<Method>,
    uri: Option<Uri>,
    headers: HeaderMap,
    body: Value,
    query: IndexMap<String, Value>,
    cookies: Vec<(String, String)>,
    identity: Option<Identity>,
}

impl RequestContextBuilder {
    /// Sets the request method.
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    /// Sets the request URI.
    #[must_use]
    pub fn uri(mut self, uri: Uri) -> Self {
        self.uri = Some(uri);
        self
    }

    /// Sets the request headers.
    #[must_use]
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Sets the parsed body.
    #[must_use]
    pub fn body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    /// Adds a query pair.
    #[must_use]
    pub fn query_pair(mut self, name: impl Into<String>, value: Value) -> Self {
        self.query.insert(name.into(), value);
        self
    }

    /// Replaces the query bag.
    #[must_use]
    pub fn query(mut self, query: IndexMap<String, Value>) -> Self {
        self.query = query;
        self
    }

    /// Adds a request cookie.
    #[must_use]
    pub fn cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.push((name.into(), value.into()));
        self
    }

    /// Sets the caller identity.
    #[must_use]
    pub fn identity(mut self, identity: Identity) -> Self {
        self.identity = Some(identity);
        self
    }

    /// Finalizes the context. Missing method defaults to GET, missing
    /// URI to `/`.
    #[must_use]
    pub fn build(self) -> RequestContext {
        RequestContext {
            method: self.method.unwrap_or(Method::GET),
            uri: self.uri.unwrap_or_else(Uri::default),
            headers: self.headers,
            body: self.body,
            query: self.query,
            cookies: self.cookies,
            identity: self.identity,
        }
    }
}
