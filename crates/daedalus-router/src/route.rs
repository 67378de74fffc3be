//! Route descriptions produced by the generator and consumed by the
//! matcher.

use http::Method;

use daedalus_reflect::{ClassId, HttpVerb};

/// One generated route: an HTTP method and path template bound to a
/// controller action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    /// HTTP method the route answers.
    pub method: Method,
    /// Path template, `/segment/:param` style.
    pub path: String,
    /// Controller class owning the action.
    pub controller: ClassId,
    /// Action (method) name on the controller.
    pub action: String,
}

impl Route {
    /// Creates a route.
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>, controller: ClassId, action: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            controller,
            action: action.into(),
        }
    }

    /// Names of the `:param` segments in the template, in order.
    #[must_use]
    pub fn param_names(&self) -> Vec<String> {
        self.path
            .split('/')
            .filter_map(|segment| segment.strip_prefix(':'))
            .map(ToString::to_string)
            .collect()
    }
}

/// Maps a decorator verb onto an HTTP method.
#[must_use]
pub fn method_of(verb: HttpVerb) -> Method {
    match verb {
        HttpVerb::Get => Method::GET,
        HttpVerb::Post => Method::POST,
        HttpVerb::Put => Method::PUT,
        HttpVerb::Patch => Method::PATCH,
        HttpVerb::Delete => Method::DELETE,
        HttpVerb::Head => Method::HEAD,
        HttpVerb::Options => Method::OPTIONS,
    }
}
