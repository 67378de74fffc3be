//! Startup route analysis.
//!
//! The analyzer inspects the generated route table before the router
//! compiles it and reports issues a misconfigured controller would
//! otherwise only reveal at request time. Issues are warnings, not
//! errors: first-match-wins makes a duplicate route well-defined, just
//! probably unintended.

use std::collections::HashMap;

use daedalus_reflect::{ClassReflection, ClassId};

use crate::route::Route;

/// One problem found in the route table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteIssue {
    /// Two routes answer the same method and path template; the
    /// earlier one shadows the later.
    DuplicateRoute {
        /// The shadowed route's path.
        path: String,
        /// HTTP method as text.
        method: String,
        /// Actions involved, `Controller.action` form, first wins.
        actions: Vec<String>,
    },
    /// A `:param` segment has no same-named action parameter, so its
    /// capture can never bind.
    UnboundPathParam {
        /// The route path.
        path: String,
        /// The parameter segment name.
        param: String,
        /// The action, `Controller.action` form.
        action: String,
    },
}

impl std::fmt::Display for RouteIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateRoute {
                path,
                method,
                actions,
            } => write!(
                f,
                "duplicate route {method} {path}: {} (first registered wins)",
                actions.join(", ")
            ),
            Self::UnboundPathParam {
                path,
                param,
                action,
            } => write!(
                f,
                "route {path} declares `:{param}` but {action} has no parameter named `{param}`"
            ),
        }
    }
}

/// Analyzes a route table against the controller reflections that
/// produced it. Emits one warning log line per issue and returns the
/// full list.
#[must_use]
pub fn analyze(
    routes: &[Route],
    reflections: &HashMap<ClassId, std::sync::Arc<ClassReflection>>,
) -> Vec<RouteIssue> {
    let mut issues = Vec::new();

    // Duplicate detection groups by method + template text.
    let mut by_key: HashMap<(String, String), Vec<&Route>> = HashMap::new();
    for route in routes {
        by_key
            .entry((route.method.to_string(), route.path.clone()))
            .or_default()
            .push(route);
    }
    let mut duplicates: Vec<_> = by_key
        .into_iter()
        .filter(|(_, group)| group.len() > 1)
        .collect();
    duplicates.sort_by(|a, b| a.0.cmp(&b.0));
    for ((method, path), group) in duplicates {
        let actions = group
            .iter()
            .map(|r| action_label(r, reflections))
            .collect();
        issues.push(RouteIssue::DuplicateRoute {
            path,
            method,
            actions,
        });
    }

    // Every :param must have a same-named action parameter.
    for route in routes {
        let Some(reflection) = reflections.get(&route.controller) else {
            continue;
        };
        let Some(method) = reflection.method(&route.action) else {
            continue;
        };
        for param in route.param_names() {
            if !method
                .params
                .iter()
                .any(|p| p.name.eq_ignore_ascii_case(&param))
            {
                issues.push(RouteIssue::UnboundPathParam {
                    path: route.path.clone(),
                    param,
                    action: action_label(route, reflections),
                });
            }
        }
    }

    for issue in &issues {
        tracing::warn!(%issue, "route analysis");
    }
    issues
}

fn action_label(
    route: &Route,
    reflections: &HashMap<ClassId, std::sync::Arc<ClassReflection>>,
) -> String {
    let controller = reflections
        .get(&route.controller)
        .map_or("<unknown>", |r| r.name.as_str());
    format!("{controller}.{}", route.action)
}
