//! Terminal invocations: the action itself, and the not-found
//! fallback.
//!
//! `ActionInvocation` is the innermost link of every routed request.
//! Its `run` performs, in strict order: parameter binding, conversion
//! and validation, route-level then parameter-level authorization,
//! controller resolution, and finally the handler call. Each stage
//! short-circuits with its typed error; status defaulting happens
//! when the result renders.

use std::sync::Arc;

use async_trait::async_trait;

use daedalus_authz::{authorize_parameters, authorize_route, AuthorizerRegistry};
use daedalus_bind::{bind_all, validate_parameters, BinderRegistry, ValidatorRegistry};
use daedalus_core::{
    downcast_action, ActionContext, ActionResult, DaedalusError, DaedalusResult,
    DependencyResolver, RequestContext, Terminal,
};
use daedalus_reflect::{ClassReflection, DecoratorPayload, TypeSpace};

/// The innermost invocation of a routed request.
pub struct ActionInvocation {
    space: TypeSpace,
    reflection: Arc<ClassReflection>,
    action: String,
    /// Merged access decorators: application, controller, action.
    route_decorators: Vec<DecoratorPayload>,
    resolver: Arc<dyn DependencyResolver>,
    binders: BinderRegistry,
    validators: ValidatorRegistry,
    authorizers: AuthorizerRegistry,
}

impl ActionInvocation {
    pub(crate) fn new(
        space: TypeSpace,
        reflection: Arc<ClassReflection>,
        action: String,
        route_decorators: Vec<DecoratorPayload>,
        resolver: Arc<dyn DependencyResolver>,
        binders: BinderRegistry,
        validators: ValidatorRegistry,
        authorizers: AuthorizerRegistry,
    ) -> Self {
        Self {
            space,
            reflection,
            action,
            route_decorators,
            resolver,
            binders,
            validators,
            authorizers,
        }
    }
}

#[async_trait]
impl Terminal for ActionInvocation {
    async fn run(&self, ctx: RequestContext) -> DaedalusResult<ActionResult> {
        let method = self.reflection.method(&self.action).ok_or_else(|| {
            DaedalusError::configuration(format!(
                "action `{}` missing on `{}`",
                self.action, self.reflection.name
            ))
        })?;

        let args = bind_all(method, &ctx, &self.binders);
        let args =
            validate_parameters(&self.space, method, args, &ctx, &self.validators).await?;

        authorize_route(&self.route_decorators, &ctx, &self.authorizers).await?;
        authorize_parameters(&self.space, method, &args, &ctx, &self.authorizers).await?;

        let instance = self.resolver.resolve(&self.space, self.reflection.id)?;

        let handler = method.handler.as_ref().ok_or_else(|| {
            DaedalusError::configuration(format!(
                "action `{}.{}` has no handler",
                self.reflection.name, self.action
            ))
        })?;
        let handler = downcast_action(handler).ok_or_else(|| {
            DaedalusError::configuration(format!(
                "handler of `{}.{}` is not an action function",
                self.reflection.name, self.action
            ))
        })?;

        tracing::debug!(
            controller = %self.reflection.name,
            action = %self.action,
            "invoking action"
        );
        handler(ActionContext {
            instance,
            request: ctx,
            args,
        })
        .await
    }
}

/// Terminal used when no route matched: runs the middleware chain,
/// then always fails with a 404-class error.
pub struct NotFoundInvocation;

#[async_trait]
impl Terminal for NotFoundInvocation {
    async fn run(&self, ctx: RequestContext) -> DaedalusResult<ActionResult> {
        Err(DaedalusError::not_found(format!(
            "no route matches {} {}",
            ctx.method(),
            ctx.uri().path()
        )))
    }
}
