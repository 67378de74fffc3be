//! Application assembly and request dispatch.
//!
//! The builder collects controllers, middleware, registries and the
//! identity provider; `build` reflects every controller, generates
//! and analyzes the route table, and compiles the router. The built
//! [`Application`] turns raw HTTP requests into responses: parse,
//! route, run the middleware chain around the action, render the
//! result or the error envelope.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{Request, Response};
use indexmap::IndexMap;
use serde_json::Value;

use daedalus_authz::AuthorizerRegistry;
use daedalus_bind::{BinderRegistry, ValidatorRegistry};
use daedalus_core::{
    Container, DaedalusError, DaedalusResult, DependencyResolver, Identity, Invocation,
    Middleware, RequestContext, Terminal,
};
use daedalus_reflect::{ClassId, ClassReflection, DecoratorPayload, TypeSpace};
use daedalus_router::{analyze, generate, RouteIssue, Router};

use crate::action::{ActionInvocation, NotFoundInvocation};

/// Produces the caller identity from the raw request context, before
/// the pipeline runs.
pub type IdentityProvider = Arc<dyn Fn(&RequestContext) -> Option<Identity> + Send + Sync>;

/// Builder for [`Application`].
pub struct ApplicationBuilder {
    space: TypeSpace,
    controllers: Vec<ClassId>,
    global_middleware: Vec<Arc<dyn Middleware>>,
    named_middleware: HashMap<String, Arc<dyn Middleware>>,
    app_decorators: Vec<DecoratorPayload>,
    resolver: Arc<dyn DependencyResolver>,
    binders: BinderRegistry,
    validators: ValidatorRegistry,
    authorizers: AuthorizerRegistry,
    identity_provider: Option<IdentityProvider>,
}

impl ApplicationBuilder {
    fn new(space: TypeSpace) -> Self {
        Self {
            space,
            controllers: Vec::new(),
            global_middleware: Vec::new(),
            named_middleware: HashMap::new(),
            app_decorators: Vec::new(),
            resolver: Arc::new(Container::new()),
            binders: BinderRegistry::new(),
            validators: ValidatorRegistry::new(),
            authorizers: AuthorizerRegistry::new(),
            identity_provider: None,
        }
    }

    /// Registers a controller class. Route order follows controller
    /// registration order, then method declaration order.
    #[must_use]
    pub fn controller(mut self, class: ClassId) -> Self {
        self.controllers.push(class);
        self
    }

    /// Appends a global middleware, outermost first.
    #[must_use]
    pub fn middleware(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.global_middleware.push(middleware);
        self
    }

    /// Registers a route-scoped middleware under the name used by
    /// `decorate::middleware` decorators.
    #[must_use]
    pub fn named_middleware(
        mut self,
        name: impl Into<String>,
        middleware: Arc<dyn Middleware>,
    ) -> Self {
        self.named_middleware.insert(name.into(), middleware);
        self
    }

    /// Adds an application-level decorator applied to every route
    /// (typically an access rule).
    #[must_use]
    pub fn decorate(mut self, payload: DecoratorPayload) -> Self {
        self.app_decorators.push(payload);
        self
    }

    /// Replaces the dependency resolver (default: [`Container`]).
    #[must_use]
    pub fn resolver(mut self, resolver: Arc<dyn DependencyResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Sets the custom binder registry.
    #[must_use]
    pub fn binders(mut self, binders: BinderRegistry) -> Self {
        self.binders = binders;
        self
    }

    /// Sets the validator registry.
    #[must_use]
    pub fn validators(mut self, validators: ValidatorRegistry) -> Self {
        self.validators = validators;
        self
    }

    /// Sets the authorizer registry.
    #[must_use]
    pub fn authorizers(mut self, authorizers: AuthorizerRegistry) -> Self {
        self.authorizers = authorizers;
        self
    }

    /// Sets the identity provider.
    #[must_use]
    pub fn identity_provider<F>(mut self, provider: F) -> Self
    where
        F: Fn(&RequestContext) -> Option<Identity> + Send + Sync + 'static,
    {
        self.identity_provider = Some(Arc::new(provider));
        self
    }

    /// Reflects the controllers, generates and analyzes routes, and
    /// compiles the router.
    ///
    /// # Errors
    ///
    /// Configuration errors: reflection failures, invalid route
    /// templates, or a `decorate::middleware` name with no registered
    /// middleware. Analyzer findings are warnings, available through
    /// [`Application::route_issues`].
    pub fn build(self) -> DaedalusResult<Application> {
        let mut reflections: HashMap<ClassId, Arc<ClassReflection>> = HashMap::new();
        let mut routes = Vec::new();
        for controller in &self.controllers {
            let reflection = self.space.reflect(*controller)?;
            routes.extend(generate(&reflection));
            reflections.insert(*controller, reflection);
        }

        let issues = analyze(&routes, &reflections);

        let mut runtimes: HashMap<(ClassId, String), RouteRuntime> = HashMap::new();
        for route in &routes {
            let key = (route.controller, route.action.clone());
            if runtimes.contains_key(&key) {
                continue;
            }
            let reflection = reflections
                .get(&route.controller)
                .cloned()
                .ok_or_else(|| DaedalusError::configuration("route controller not reflected"))?;
            let method = reflection.method(&route.action).ok_or_else(|| {
                DaedalusError::configuration(format!(
                    "route action `{}` missing on `{}`",
                    route.action, reflection.name
                ))
            })?;

            let mut decorators = self.app_decorators.clone();
            decorators.extend(reflection.decorators.iter().cloned());
            decorators.extend(method.decorators.iter().cloned());

            let mut chain = self.global_middleware.clone();
            for payload in &decorators {
                if let DecoratorPayload::Middleware(name) = payload {
                    let middleware = self.named_middleware.get(name).cloned().ok_or_else(|| {
                        DaedalusError::configuration(format!(
                            "middleware `{name}` is not registered"
                        ))
                    })?;
                    chain.push(middleware);
                }
            }

            let terminal = Arc::new(ActionInvocation::new(
                self.space.clone(),
                reflection,
                route.action.clone(),
                decorators,
                self.resolver.clone(),
                self.binders.clone(),
                self.validators.clone(),
                self.authorizers.clone(),
            ));
            runtimes.insert(
                key,
                RouteRuntime {
                    chain: chain.into(),
                    terminal,
                },
            );
        }

        let router = Router::new(routes)
            .map_err(|e| DaedalusError::configuration(e.to_string()))?;

        Ok(Application {
            router,
            runtimes,
            global_chain: self.global_middleware.into(),
            identity_provider: self.identity_provider,
            route_issues: issues,
        })
    }
}

struct RouteRuntime {
    chain: Arc<[Arc<dyn Middleware>]>,
    terminal: Arc<ActionInvocation>,
}

/// A built application: immutable route table plus per-route
/// middleware chains and terminals.
pub struct Application {
    router: Router,
    runtimes: HashMap<(ClassId, String), RouteRuntime>,
    global_chain: Arc<[Arc<dyn Middleware>]>,
    identity_provider: Option<IdentityProvider>,
    route_issues: Vec<RouteIssue>,
}

impl Application {
    /// Starts building an application over a type space.
    #[must_use]
    pub fn builder(space: TypeSpace) -> ApplicationBuilder {
        ApplicationBuilder::new(space)
    }

    /// Warnings found by the route analyzer at build time.
    #[must_use]
    pub fn route_issues(&self) -> &[RouteIssue] {
        &self.route_issues
    }

    /// Serves one request.
    ///
    /// Never fails: pipeline errors render as their mapped HTTP status
    /// with a structured error envelope.
    pub async fn handle(&self, request: Request<Bytes>) -> Response<Bytes> {
        match self.dispatch(request).await {
            Ok(response) => response,
            Err(err) => error_response(&err),
        }
    }

    async fn dispatch(&self, request: Request<Bytes>) -> DaedalusResult<Response<Bytes>> {
        let mut ctx = parse_request(request)?;
        if let Some(provider) = &self.identity_provider {
            if let Some(identity) = provider(&ctx) {
                ctx.set_identity(identity);
            }
        }

        let path = ctx.uri().path().to_string();
        let hit = self.router.lookup(ctx.method(), &path);
        let result = match hit {
            Some(found) => {
                for (name, value) in found.params.iter() {
                    ctx.query_mut()
                        .insert(name.to_string(), Value::from(value));
                }
                let key = (found.route.controller, found.route.action.clone());
                let runtime = self.runtimes.get(&key).ok_or_else(|| {
                    DaedalusError::configuration("matched route has no runtime")
                })?;
                let terminal: Arc<dyn Terminal> = runtime.terminal.clone();
                Invocation::new(runtime.chain.clone(), terminal, ctx)
                    .proceed()
                    .await
            }
            None => {
                Invocation::new(self.global_chain.clone(), Arc::new(NotFoundInvocation), ctx)
                    .proceed()
                    .await
            }
        };

        match result {
            Ok(action_result) => action_result.into_response(),
            Err(err) => Ok(error_response(&err)),
        }
    }
}

fn parse_query(uri: &http::Uri) -> DaedalusResult<IndexMap<String, Value>> {
    let mut bag = IndexMap::new();
    if let Some(raw) = uri.query() {
        let pairs: Vec<(String, String)> =
            serde_urlencoded::from_str(raw).map_err(|_| DaedalusError::HttpStatus {
                status: http::StatusCode::BAD_REQUEST,
                message: "malformed query string".to_string(),
            })?;
        for (name, value) in pairs {
            bag.insert(name, Value::String(value));
        }
    }
    Ok(bag)
}

fn parse_body(headers: &http::HeaderMap, body: &Bytes) -> DaedalusResult<Value> {
    if body.is_empty() {
        return Ok(Value::Null);
    }
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if content_type.starts_with("application/json") {
        serde_json::from_slice(body).map_err(|_| DaedalusError::HttpStatus {
            status: http::StatusCode::BAD_REQUEST,
            message: "malformed JSON body".to_string(),
        })
    } else if content_type.starts_with("application/x-www-form-urlencoded") {
        let pairs: Vec<(String, String)> =
            serde_urlencoded::from_bytes(body).map_err(|_| DaedalusError::HttpStatus {
                status: http::StatusCode::BAD_REQUEST,
                message: "malformed form body".to_string(),
            })?;
        Ok(Value::Object(
            pairs
                .into_iter()
                .map(|(k, v)| (k, Value::String(v)))
                .collect(),
        ))
    } else {
        Ok(Value::Null)
    }
}

fn parse_cookies(headers: &http::HeaderMap) -> Vec<(String, String)> {
    let Some(raw) = headers.get(http::header::COOKIE).and_then(|v| v.to_str().ok()) else {
        return Vec::new();
    };
    raw.split(';')
        .filter_map(|pair| {
            let (name, value) = pair.split_once('=')?;
            Some((name.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}

fn parse_request(request: Request<Bytes>) -> DaedalusResult<RequestContext> {
    let (parts, body) = request.into_parts();
    let query = parse_query(&parts.uri)?;
    let parsed_body = parse_body(&parts.headers, &body)?;
    let mut builder = RequestContext::builder()
        .method(parts.method)
        .uri(parts.uri)
        .body(parsed_body)
        .query(query);
    for (name, value) in parse_cookies(&parts.headers) {
        builder = builder.cookie(name, value);
    }
    Ok(builder.headers(parts.headers).build())
}

fn error_response(err: &DaedalusError) -> Response<Bytes> {
    let status = err.status_code();
    if status.is_server_error() {
        tracing::error!(%err, %status, "request failed");
    } else {
        tracing::debug!(%err, %status, "request rejected");
    }
    let body = serde_json::to_vec(&err.to_envelope()).unwrap_or_default();
    let mut response = Response::new(Bytes::from(body));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, http::HeaderValue::from_static("application/json"));
    response
}
