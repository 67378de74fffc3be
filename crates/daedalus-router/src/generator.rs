//! Convention-based route generation from controller reflections.
//!
//! Every action method of a controller becomes a route. The URL is
//! the decorator override when one is present, and
//! `/<strippedControllerName>/<methodName>` by convention otherwise;
//! a `RootRoute` class decorator replaces the controller base path.

use daedalus_reflect::{ClassReflection, DecoratorPayload, HttpVerb, MethodReflection};
use http::Method;

use crate::route::{method_of, Route};

/// Strips the `Controller` suffix and lowercases the remainder.
fn strip_controller_name(name: &str) -> String {
    name.strip_suffix("Controller").unwrap_or(name).to_lowercase()
}

/// The base path of a controller: its `RootRoute` override, or the
/// stripped class name by convention.
fn base_path(reflection: &ClassReflection) -> String {
    for decorator in &reflection.decorators {
        if let DecoratorPayload::RootRoute(url) = decorator {
            return normalize_base(url);
        }
    }
    format!("/{}", strip_controller_name(&reflection.name))
}

fn normalize_base(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

/// The URL of one action: decorator override when present, convention
/// otherwise. An empty override means the controller base itself.
fn action_path(base: &str, method: &MethodReflection, url: Option<&str>) -> String {
    let path = match url {
        None => format!("{base}/{}", method.name),
        Some("") => base.to_string(),
        Some(url) if url.starts_with('/') => url.to_string(),
        Some(url) => format!("{base}/{url}"),
    };
    if path.is_empty() {
        "/".to_string()
    } else {
        path
    }
}

/// Generates the routes of one controller in method declaration
/// order.
///
/// Methods with a `Route` decorator get that verb; methods carrying a
/// handler but no route decorator fall back to a conventional `GET`.
/// Methods without a handler and without a route decorator are not
/// routable and are skipped.
#[must_use]
pub fn generate(reflection: &ClassReflection) -> Vec<Route> {
    let base = base_path(reflection);
    let mut routes = Vec::new();

    for method in &reflection.methods {
        let decorated: Vec<(HttpVerb, Option<&str>)> = method
            .decorators
            .iter()
            .filter_map(|d| match d {
                DecoratorPayload::Route { verb, url } => Some((*verb, url.as_deref())),
                _ => None,
            })
            .collect();

        if decorated.is_empty() {
            if method.handler.is_some() {
                routes.push(Route::new(
                    Method::GET,
                    action_path(&base, method, None),
                    reflection.id,
                    method.name.clone(),
                ));
            }
            continue;
        }

        for (verb, url) in decorated {
            routes.push(Route::new(
                method_of(verb),
                action_path(&base, method, url),
                reflection.id,
                method.name.clone(),
            ));
        }
    }

    tracing::debug!(
        controller = %reflection.name,
        count = routes.len(),
        "generated routes"
    );
    routes
}

#[cfg(test)]
mod tests {
    use super::*;
    use daedalus_reflect::decorate::route;
    use daedalus_reflect::{number, TypeSpace};
    use std::sync::Arc;

    fn noop_handler() -> daedalus_reflect::OpaqueHandler {
        Arc::new(())
    }

    #[test]
    fn test_convention_path_strips_controller_suffix() {
        let space = TypeSpace::new();
        let id = space
            .define("AnimalController")
            .method("list", |m| m.decorate(route::get(None)))
            .register()
            .expect("register");
        let routes = generate(&space.reflect(id).expect("reflect"));
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].method, Method::GET);
        assert_eq!(routes[0].path, "/animal/list");
    }

    #[test]
    fn test_url_override_forms() {
        let space = TypeSpace::new();
        let id = space
            .define("AnimalController")
            .method("absolute", |m| m.decorate(route::get(Some("/animals/:id"))))
            .method("relative", |m| m.decorate(route::get(Some(":id"))))
            .method("empty", |m| m.decorate(route::get(Some(""))))
            .register()
            .expect("register");
        let routes = generate(&space.reflect(id).expect("reflect"));
        let paths: Vec<&str> = routes.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(paths, vec!["/animals/:id", "/animal/:id", "/animal"]);
    }

    #[test]
    fn test_root_route_overrides_base() {
        let space = TypeSpace::new();
        let id = space
            .define("HomeController")
            .decorate(route::root(""))
            .method("index", |m| m.decorate(route::get(Some(""))))
            .method("about", |m| m.decorate(route::get(None)))
            .register()
            .expect("register");
        let routes = generate(&space.reflect(id).expect("reflect"));
        let paths: Vec<&str> = routes.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(paths, vec!["/", "/about"]);
    }

    #[test]
    fn test_handler_without_decorator_gets_conventional_get() {
        let space = TypeSpace::new();
        let id = space
            .define("ReportController")
            .method("summary", |m| m.param("year", number()).handler(noop_handler()))
            .method("helper", |m| m.param("x", number())) // not routable
            .register()
            .expect("register");
        let routes = generate(&space.reflect(id).expect("reflect"));
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].method, Method::GET);
        assert_eq!(routes[0].path, "/report/summary");
    }

    #[test]
    fn test_head_and_options_decorators_route() {
        let space = TypeSpace::new();
        let id = space
            .define("AnimalController")
            .method("exists", |m| m.decorate(route::head(Some(":id"))))
            .method("preflight", |m| m.decorate(route::options(Some(""))))
            .register()
            .expect("register");
        let routes = generate(&space.reflect(id).expect("reflect"));
        assert_eq!(routes.len(), 2);
        assert_eq!(routes[0].method, Method::HEAD);
        assert_eq!(routes[0].path, "/animal/:id");
        assert_eq!(routes[1].method, Method::OPTIONS);
        assert_eq!(routes[1].path, "/animal");
    }

    #[test]
    fn test_multiple_verbs_on_one_method() {
        let space = TypeSpace::new();
        let id = space
            .define("AnimalController")
            .method("save", |m| {
                m.decorate(route::post(Some("")))
                    .decorate(route::put(Some("")))
            })
            .register()
            .expect("register");
        let routes = generate(&space.reflect(id).expect("reflect"));
        assert_eq!(routes.len(), 2);
        assert_eq!(routes[0].method, Method::POST);
        assert_eq!(routes[1].method, Method::PUT);
        assert_eq!(routes[0].path, "/animal");
    }
}
