//! Authorization evaluation.
//!
//! Two stages per request. Route level first: `Public` short-circuits
//! to allow, routes without access decorators are open, and otherwise
//! an identity must be present (401 when missing) and at least one
//! declared rule must pass (OR semantics, 403 when none do). Then
//! parameter level: access decorators on parameters and on nested
//! model properties are checked recursively (arrays per element,
//! classes per property); every denied path is collected and reported
//! in one aggregated failure.

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use serde_json::Value;

use daedalus_core::{DaedalusError, DaedalusResult, RequestContext};
use daedalus_reflect::{
    AccessDecorator, ClassId, DataType, DecoratorPayload, MethodReflection, TypeSpace,
};

use crate::registry::AuthorizerRegistry;

fn access_rules(decorators: &[DecoratorPayload]) -> Vec<&AccessDecorator> {
    decorators
        .iter()
        .filter_map(|d| match d {
            DecoratorPayload::Authorize(rule) => Some(rule),
            _ => None,
        })
        .collect()
}

/// Evaluates one decorator group with OR semantics: true as soon as
/// any rule passes. `entity` carries the value under check for entity
/// policies; at route level there is none and entity policies are
/// skipped.
async fn group_passes(
    rules: &[&AccessDecorator],
    entity: Option<(&ClassId, &Value)>,
    ctx: &RequestContext,
    registry: &AuthorizerRegistry,
) -> DaedalusResult<bool> {
    for rule in rules {
        match rule {
            AccessDecorator::Public => return Ok(true),
            AccessDecorator::Role(roles) => {
                if let Some(identity) = ctx.identity() {
                    if roles.iter().any(|role| identity.has_role(role)) {
                        return Ok(true);
                    }
                }
            }
            AccessDecorator::Custom(name) => {
                let Some(authorizer) = registry.authorizer(name) else {
                    return Err(DaedalusError::configuration(format!(
                        "authorizer `{name}` is not registered"
                    )));
                };
                if authorizer.authorize(ctx.identity(), ctx).await {
                    return Ok(true);
                }
            }
            AccessDecorator::EntityPolicy {
                entity: declared,
                policy,
            } => {
                let Some((class, value)) = entity else {
                    continue;
                };
                if declared != class {
                    continue;
                }
                let Some(policy) = registry.policy(*class, policy) else {
                    return Err(DaedalusError::configuration(format!(
                        "entity policy `{policy}` is not registered"
                    )));
                };
                if policy.allows(ctx.identity(), value, ctx).await {
                    return Ok(true);
                }
            }
        }
    }
    Ok(false)
}

/// Route-level authorization over the merged access decorators of the
/// action, its controller and the application.
///
/// # Errors
///
/// [`DaedalusError::Authentication`] when rules exist but the request
/// has no identity; [`DaedalusError::Authorization`] when every rule
/// denies.
pub async fn authorize_route(
    decorators: &[DecoratorPayload],
    ctx: &RequestContext,
    registry: &AuthorizerRegistry,
) -> DaedalusResult<()> {
    let rules = access_rules(decorators);
    if rules.is_empty() {
        return Ok(());
    }
    if rules.iter().any(|r| matches!(r, AccessDecorator::Public)) {
        return Ok(());
    }
    if ctx.identity().is_none() {
        return Err(DaedalusError::authentication(
            "route requires an authenticated caller",
        ));
    }
    if group_passes(&rules, None, ctx, registry).await? {
        Ok(())
    } else {
        Err(DaedalusError::forbidden("no authorization rule passed"))
    }
}

/// Recursive walk over one bound value: the node's own decorator
/// group first, then nested model properties and array elements.
fn check_value<'a>(
    space: &'a TypeSpace,
    decorators: &'a [DecoratorPayload],
    value: &'a Value,
    ty: &'a DataType,
    path: Vec<String>,
    ctx: &'a RequestContext,
    registry: &'a AuthorizerRegistry,
    denied: &'a mut Vec<String>,
) -> BoxFuture<'a, DaedalusResult<()>> {
    async move {
        let rules = access_rules(decorators);
        if !rules.is_empty() {
            let entity = match ty {
                DataType::Class(id) => Some((id, value)),
                _ => None,
            };
            if !group_passes(&rules, entity, ctx, registry).await? {
                denied.push(path.join("."));
                return Ok(());
            }
        }

        match ty {
            DataType::Class(id) => {
                if value.is_null() {
                    return Ok(());
                }
                let reflection = space.reflect(*id)?;
                for property in &reflection.properties {
                    let field = value.get(&property.name).cloned().unwrap_or(Value::Null);
                    if field.is_null() {
                        continue;
                    }
                    let mut child_path = path.clone();
                    child_path.push(property.name.clone());
                    check_value(
                        space,
                        &property.decorators,
                        &field,
                        &property.ty,
                        child_path,
                        ctx,
                        registry,
                        denied,
                    )
                    .await?;
                }
            }
            DataType::Array(inner) => {
                if let Value::Array(items) = value {
                    for (index, item) in items.iter().enumerate() {
                        let mut child_path = path.clone();
                        child_path.push(index.to_string());
                        check_value(
                            space, &[], item, inner, child_path, ctx, registry, denied,
                        )
                        .await?;
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }
    .boxed()
}

/// Parameter-level authorization, run after the route-level check
/// passed. Every denied leaf path is aggregated into one failure.
///
/// # Errors
///
/// [`DaedalusError::Authorization`] naming every denied path.
pub async fn authorize_parameters(
    space: &TypeSpace,
    method: &MethodReflection,
    args: &[Value],
    ctx: &RequestContext,
    registry: &AuthorizerRegistry,
) -> DaedalusResult<()> {
    let mut denied = Vec::new();
    for (param, value) in method.params.iter().zip(args) {
        check_value(
            space,
            &param.decorators,
            value,
            &param.ty,
            vec![param.name.clone()],
            ctx,
            registry,
            &mut denied,
        )
        .await?;
    }
    if denied.is_empty() {
        Ok(())
    } else {
        tracing::debug!(?denied, "parameter authorization failed");
        Err(DaedalusError::Authorization {
            message: "unauthorized parameter paths".to_string(),
            paths: denied,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use daedalus_core::Identity;
    use daedalus_reflect::decorate::authorize;
    use daedalus_reflect::{class, number, string};

    fn ctx_with_roles(roles: &[&str]) -> RequestContext {
        RequestContext::builder()
            .identity(Identity::with_roles(roles.iter().copied()))
            .build()
    }

    fn anonymous() -> RequestContext {
        RequestContext::builder().build()
    }

    #[tokio::test]
    async fn test_public_short_circuits() {
        let decorators = vec![authorize::public(), authorize::role(["admin"])];
        authorize_route(&decorators, &anonymous(), &AuthorizerRegistry::new())
            .await
            .expect("public route");
    }

    #[tokio::test]
    async fn test_undecorated_route_is_open() {
        authorize_route(&[], &anonymous(), &AuthorizerRegistry::new())
            .await
            .expect("open route");
    }

    #[tokio::test]
    async fn test_missing_identity_is_401() {
        let decorators = vec![authorize::role(["admin"])];
        let err = authorize_route(&decorators, &anonymous(), &AuthorizerRegistry::new())
            .await
            .expect_err("denied");
        assert!(matches!(err, DaedalusError::Authentication { .. }));
    }

    #[tokio::test]
    async fn test_or_semantics_across_rules() {
        let decorators = vec![authorize::role(["admin"]), authorize::role(["editor"])];
        // One of two passes: allowed.
        authorize_route(
            &decorators,
            &ctx_with_roles(&["editor"]),
            &AuthorizerRegistry::new(),
        )
        .await
        .expect("editor passes");

        // Both fail: 403.
        let err = authorize_route(
            &decorators,
            &ctx_with_roles(&["viewer"]),
            &AuthorizerRegistry::new(),
        )
        .await
        .expect_err("denied");
        assert!(matches!(err, DaedalusError::Authorization { .. }));
    }

    #[tokio::test]
    async fn test_custom_authorizer() {
        let mut registry = AuthorizerRegistry::new();
        registry.register_fn("always", |_identity| true);
        let decorators = vec![authorize::custom("always")];
        authorize_route(&decorators, &ctx_with_roles(&[]), &registry)
            .await
            .expect("custom passes");
    }

    #[tokio::test]
    async fn test_unregistered_authorizer_is_configuration_error() {
        let decorators = vec![authorize::custom("ghost")];
        let err = authorize_route(&decorators, &ctx_with_roles(&[]), &AuthorizerRegistry::new())
            .await
            .expect_err("unknown authorizer");
        assert!(matches!(err, DaedalusError::Configuration { .. }));
    }

    #[tokio::test]
    async fn test_nested_denied_paths_aggregate() {
        let space = TypeSpace::new();
        let secret = space
            .define("Secret")
            .property("level", number())
            .register()
            .expect("secret");
        let dto = space
            .define("Report")
            .property("title", string())
            .property("secret", class(secret))
            .decorate_member("secret", authorize::role(["admin"]))
            .register()
            .expect("report");
        let id = space
            .define("ReportController")
            .method("save", |m| {
                m.param("report", class(dto))
                    .decorate_param(0, authorize::role(["user", "admin"]))
            })
            .register()
            .expect("controller");
        let method = space
            .reflect(id)
            .expect("reflect")
            .method("save")
            .expect("method")
            .clone();

        let args = vec![serde_json::json!({
            "title": "t",
            "secret": {"level": 3},
        })];

        // A plain user passes the parameter group but not the nested
        // property group.
        let err = authorize_parameters(
            &space,
            &method,
            &args,
            &ctx_with_roles(&["user"]),
            &AuthorizerRegistry::new(),
        )
        .await
        .expect_err("denied");
        let DaedalusError::Authorization { paths, .. } = err else {
            panic!("expected authorization error");
        };
        assert_eq!(paths, vec!["report.secret"]);

        // An admin passes both groups.
        authorize_parameters(
            &space,
            &method,
            &args,
            &ctx_with_roles(&["admin"]),
            &AuthorizerRegistry::new(),
        )
        .await
        .expect("admin allowed");
    }

    #[tokio::test]
    async fn test_entity_policy_on_parameter() {
        let space = TypeSpace::new();
        let animal = space
            .define("Animal")
            .property("ownerId", number())
            .register()
            .expect("animal");
        let id = space
            .define("AnimalController")
            .method("save", |m| {
                m.param("animal", class(animal))
                    .decorate_param(0, authorize::entity_policy(animal, "own-animal"))
            })
            .register()
            .expect("controller");
        let method = space
            .reflect(id)
            .expect("reflect")
            .method("save")
            .expect("method")
            .clone();

        let mut registry = AuthorizerRegistry::new();
        registry.register_policy_fn(animal, "own-animal", |identity, entity| {
            identity.is_some() && entity["ownerId"] == serde_json::json!(7)
        });

        let args = vec![serde_json::json!({"ownerId": 7})];
        authorize_parameters(&space, &method, &args, &ctx_with_roles(&[]), &registry)
            .await
            .expect("own animal allowed");

        let args = vec![serde_json::json!({"ownerId": 8})];
        let err = authorize_parameters(&space, &method, &args, &ctx_with_roles(&[]), &registry)
            .await
            .expect_err("foreign animal denied");
        let DaedalusError::Authorization { paths, .. } = err else {
            panic!("expected authorization error");
        };
        assert_eq!(paths, vec!["animal"]);
    }
}
