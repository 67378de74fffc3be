//! Regex route matching.
//!
//! Each route template compiles once into an anchored regex with a
//! named capture per `:param` segment. Lookup scans routes in
//! registration order and the first match wins; the outcome for every
//! distinct `method + path` pair (hits and misses alike) is memoized,
//! so repeated requests skip the scan entirely.

use dashmap::DashMap;
use http::Method;
use regex::Regex;

use crate::params::Params;
use crate::route::Route;

/// Route template compilation failure.
#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    /// The template produced an invalid or oversized regex.
    #[error("invalid route template `{path}`: {source}")]
    InvalidTemplate {
        /// The offending template.
        path: String,
        /// Regex compilation failure.
        #[source]
        source: regex::Error,
    },
    /// A `:param` segment has no name or a non-identifier name.
    #[error("invalid parameter segment `{segment}` in route template `{path}`")]
    InvalidParameter {
        /// The offending segment.
        segment: String,
        /// The template it appears in.
        path: String,
    },
}

/// Compiles a path template into an anchored regex.
///
/// Literal segments are escaped; `:name` segments become
/// `(?P<name>[^/]+)`, so a parameter matches exactly one segment.
fn compile_template(path: &str) -> Result<Regex, RouterError> {
    let mut pattern = String::with_capacity(path.len() + 16);
    pattern.push('^');
    for segment in path.split('/') {
        if segment.is_empty() {
            continue;
        }
        pattern.push('/');
        if let Some(name) = segment.strip_prefix(':') {
            if name.is_empty()
                || !name
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_')
            {
                return Err(RouterError::InvalidParameter {
                    segment: segment.to_string(),
                    path: path.to_string(),
                });
            }
            pattern.push_str("(?P<");
            pattern.push_str(name);
            pattern.push_str(">[^/]+)");
        } else {
            pattern.push_str(&regex::escape(segment));
        }
    }
    if pattern.len() == 1 {
        pattern.push('/');
    }
    pattern.push('$');
    Regex::new(&pattern).map_err(|source| RouterError::InvalidTemplate {
        path: path.to_string(),
        source,
    })
}

struct CompiledRoute {
    route: Route,
    regex: Regex,
    param_names: Vec<String>,
}

/// A successful route lookup.
#[derive(Debug, Clone)]
pub struct RouteMatch<'a> {
    /// The matched route.
    pub route: &'a Route,
    /// Captured path parameters.
    pub params: Params,
}

/// First-match-wins regex router with a memoized lookup cache.
pub struct Router {
    routes: Vec<CompiledRoute>,
    // Option<usize> caches misses too, so unroutable paths do not
    // rescan the table on every request.
    cache: DashMap<String, Option<usize>>,
}

impl Router {
    /// Compiles the given routes, preserving registration order.
    ///
    /// # Errors
    ///
    /// Returns the first template that fails to compile.
    pub fn new(routes: Vec<Route>) -> Result<Self, RouterError> {
        let mut compiled = Vec::with_capacity(routes.len());
        for route in routes {
            let regex = compile_template(&route.path)?;
            let param_names = route.param_names();
            tracing::debug!(method = %route.method, path = %route.path, "registered route");
            compiled.push(CompiledRoute {
                route,
                regex,
                param_names,
            });
        }
        Ok(Self {
            routes: compiled,
            cache: DashMap::new(),
        })
    }

    /// All registered routes in registration order.
    pub fn routes(&self) -> impl Iterator<Item = &Route> {
        self.routes.iter().map(|c| &c.route)
    }

    /// Looks up the route for a request.
    ///
    /// Trailing slashes are ignored (`/animals/` matches `/animals`).
    #[must_use]
    pub fn lookup(&self, method: &Method, path: &str) -> Option<RouteMatch<'_>> {
        let normalized = normalize(path);
        let key = format!("{method} {normalized}");
        if let Some(memo) = self.cache.get(&key) {
            return memo.and_then(|index| self.capture(index, &normalized));
        }

        let found = self
            .routes
            .iter()
            .position(|c| c.route.method == *method && c.regex.is_match(&normalized));
        self.cache.insert(key, found);
        found.and_then(|index| self.capture(index, &normalized))
    }

    fn capture(&self, index: usize, path: &str) -> Option<RouteMatch<'_>> {
        let compiled = self.routes.get(index)?;
        let captures = compiled.regex.captures(path)?;
        let mut params = Params::new();
        for name in &compiled.param_names {
            if let Some(value) = captures.name(name) {
                params.push(name.clone(), value.as_str());
            }
        }
        Some(RouteMatch {
            route: &compiled.route,
            params,
        })
    }
}

fn normalize(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.routes.len())
            .field("cached_lookups", &self.cache.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use daedalus_reflect::{ClassId, TypeSpace};

    fn controller() -> ClassId {
        let space = TypeSpace::new();
        space.define("Animals").register().expect("register")
    }

    #[test]
    fn test_static_and_parameterized_match() {
        let c = controller();
        let router = Router::new(vec![
            Route::new(Method::GET, "/animals", c, "list"),
            Route::new(Method::GET, "/animals/:id", c, "get"),
        ])
        .expect("router");

        let hit = router.lookup(&Method::GET, "/animals").expect("list");
        assert_eq!(hit.route.action, "list");
        assert!(hit.params.is_empty());

        let hit = router.lookup(&Method::GET, "/animals/41").expect("get");
        assert_eq!(hit.route.action, "get");
        assert_eq!(hit.params.get("id"), Some("41"));
    }

    #[test]
    fn test_method_discriminates() {
        let c = controller();
        let router = Router::new(vec![
            Route::new(Method::GET, "/animals", c, "list"),
            Route::new(Method::POST, "/animals", c, "save"),
        ])
        .expect("router");

        assert_eq!(
            router.lookup(&Method::POST, "/animals").expect("post").route.action,
            "save"
        );
        assert!(router.lookup(&Method::DELETE, "/animals").is_none());
    }

    #[test]
    fn test_first_registered_wins() {
        let c = controller();
        let router = Router::new(vec![
            Route::new(Method::GET, "/animals/special", c, "special"),
            Route::new(Method::GET, "/animals/:id", c, "get"),
        ])
        .expect("router");

        assert_eq!(
            router
                .lookup(&Method::GET, "/animals/special")
                .expect("hit")
                .route
                .action,
            "special"
        );

        // Reversed registration order shadows the static route.
        let router = Router::new(vec![
            Route::new(Method::GET, "/animals/:id", c, "get"),
            Route::new(Method::GET, "/animals/special", c, "special"),
        ])
        .expect("router");
        assert_eq!(
            router
                .lookup(&Method::GET, "/animals/special")
                .expect("hit")
                .route
                .action,
            "get"
        );
    }

    #[test]
    fn test_param_matches_single_segment_only() {
        let c = controller();
        let router = Router::new(vec![Route::new(Method::GET, "/animals/:id", c, "get")])
            .expect("router");
        assert!(router.lookup(&Method::GET, "/animals/1/extra").is_none());
        assert!(router.lookup(&Method::GET, "/animals").is_none());
    }

    #[test]
    fn test_trailing_slash_is_ignored() {
        let c = controller();
        let router =
            Router::new(vec![Route::new(Method::GET, "/animals", c, "list")]).expect("router");
        assert!(router.lookup(&Method::GET, "/animals/").is_some());
    }

    #[test]
    fn test_misses_are_memoized() {
        let c = controller();
        let router =
            Router::new(vec![Route::new(Method::GET, "/animals", c, "list")]).expect("router");
        assert!(router.lookup(&Method::GET, "/nowhere").is_none());
        assert!(router.lookup(&Method::GET, "/nowhere").is_none());
        assert_eq!(router.cache.len(), 1);
    }

    #[test]
    fn test_multiple_params_capture() {
        let c = controller();
        let router = Router::new(vec![Route::new(
            Method::GET,
            "/owners/:ownerId/pets/:petId",
            c,
            "pet",
        )])
        .expect("router");
        let hit = router
            .lookup(&Method::GET, "/owners/7/pets/12")
            .expect("hit");
        assert_eq!(hit.params.get("ownerId"), Some("7"));
        assert_eq!(hit.params.get("petId"), Some("12"));
    }

    #[test]
    fn test_bad_parameter_segment_rejected() {
        let c = controller();
        let result = Router::new(vec![Route::new(Method::GET, "/animals/:", c, "get")]);
        assert!(matches!(
            result,
            Err(RouterError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_root_route() {
        let c = controller();
        let router = Router::new(vec![Route::new(Method::GET, "/", c, "home")]).expect("router");
        assert_eq!(router.lookup(&Method::GET, "/").expect("hit").route.action, "home");
    }
}
