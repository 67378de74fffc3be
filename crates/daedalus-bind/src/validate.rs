//! Two-phase parameter validation.
//!
//! Phase one is synchronous: structural conversion toward declared
//! types plus required/optional checks, recursing into class
//! properties and array elements, collecting issues per path without
//! throwing. Phase two runs decorator-declared named validators
//! concurrently and merges their findings into the same issue list.
//! Any issue anywhere fails the whole set with one aggregated
//! validation error.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::join_all;
use serde_json::Value;

use daedalus_core::{DaedalusError, DaedalusResult, RequestContext, ValidationIssue};
use daedalus_reflect::{
    DataType, DecoratorPayload, MethodReflection, TypeSpace, ValidationRule,
};

use crate::convert::convert;

/// A named asynchronous validation rule.
#[async_trait]
pub trait AsyncValidator: Send + Sync {
    /// Checks a value; `None` passes, `Some(message)` is an issue at
    /// the value's path.
    async fn validate(&self, value: &Value, ctx: &RequestContext) -> Option<String>;
}

struct FnValidator<F>(F);

#[async_trait]
impl<F> AsyncValidator for FnValidator<F>
where
    F: Fn(&Value) -> Option<String> + Send + Sync,
{
    async fn validate(&self, value: &Value, _ctx: &RequestContext) -> Option<String> {
        (self.0)(value)
    }
}

/// Named validators referenced by `val::rule` decorators.
#[derive(Default, Clone)]
pub struct ValidatorRegistry {
    validators: HashMap<String, Arc<dyn AsyncValidator>>,
}

impl ValidatorRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a validator object under a name.
    pub fn register(&mut self, name: impl Into<String>, validator: Arc<dyn AsyncValidator>) {
        self.validators.insert(name.into(), validator);
    }

    /// Registers a synchronous predicate under a name.
    pub fn register_fn<F>(&mut self, name: impl Into<String>, predicate: F)
    where
        F: Fn(&Value) -> Option<String> + Send + Sync + 'static,
    {
        self.validators
            .insert(name.into(), Arc::new(FnValidator(predicate)));
    }

    fn get(&self, name: &str) -> Option<Arc<dyn AsyncValidator>> {
        self.validators.get(name).cloned()
    }
}

impl std::fmt::Debug for ValidatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidatorRegistry")
            .field("validators", &self.validators.len())
            .finish()
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Rules {
    required: bool,
    optional: bool,
    partial: bool,
}

fn rules_of(decorators: &[DecoratorPayload]) -> Rules {
    let mut rules = Rules::default();
    for decorator in decorators {
        if let DecoratorPayload::Validate(rule) = decorator {
            match rule {
                ValidationRule::Required => rules.required = true,
                ValidationRule::Optional => rules.optional = true,
                ValidationRule::Partial => rules.partial = true,
                ValidationRule::Rule(_) => {}
            }
        }
    }
    rules
}

fn rule_names(decorators: &[DecoratorPayload]) -> Vec<String> {
    decorators
        .iter()
        .filter_map(|d| match d {
            DecoratorPayload::Validate(ValidationRule::Rule(name)) => Some(name.clone()),
            _ => None,
        })
        .collect()
}

/// A deferred phase-two check.
struct PendingRule {
    path: Vec<String>,
    name: String,
    value: Value,
}

/// Recursive required check and phase-two collection over a converted
/// value. `partial` is inherited downward: inside a partial model
/// every property behaves as optional.
fn check_structure(
    space: &TypeSpace,
    value: &Value,
    ty: &DataType,
    partial: bool,
    path: &mut Vec<String>,
    issues: &mut Vec<ValidationIssue>,
    pending: &mut Vec<PendingRule>,
) {
    match ty {
        DataType::Class(id) => {
            if value.is_null() {
                return;
            }
            let Ok(reflection) = space.reflect(*id) else {
                // Conversion already reported reflection failures.
                return;
            };
            let partial = partial
                || reflection
                    .decorators
                    .iter()
                    .any(|d| matches!(d, DecoratorPayload::Validate(ValidationRule::Partial)));
            for property in &reflection.properties {
                let rules = rules_of(&property.decorators);
                let field = value.get(&property.name).cloned().unwrap_or(Value::Null);
                path.push(property.name.clone());
                if field.is_null() {
                    if rules.required && !rules.optional && !partial {
                        issues.push(ValidationIssue::new(path.clone(), "Value is required"));
                    }
                } else {
                    for name in rule_names(&property.decorators) {
                        pending.push(PendingRule {
                            path: path.clone(),
                            name,
                            value: field.clone(),
                        });
                    }
                    check_structure(space, &field, &property.ty, partial, path, issues, pending);
                }
                path.pop();
            }
        }
        DataType::Array(inner) => {
            if let Value::Array(items) = value {
                for (index, item) in items.iter().enumerate() {
                    path.push(index.to_string());
                    check_structure(space, item, inner, partial, path, issues, pending);
                    path.pop();
                }
            }
        }
        _ => {}
    }
}

/// Converts and validates every bound argument of an action.
///
/// Returns the converted arguments in declaration order, or one
/// aggregated validation error carrying every issue found in both
/// phases.
///
/// # Errors
///
/// [`DaedalusError::Validation`] when any issue is found;
/// [`DaedalusError::Configuration`] when a decorator references an
/// unregistered validator name.
pub async fn validate_parameters(
    space: &TypeSpace,
    method: &MethodReflection,
    args: Vec<Value>,
    ctx: &RequestContext,
    validators: &ValidatorRegistry,
) -> DaedalusResult<Vec<Value>> {
    let mut issues = Vec::new();
    let mut pending = Vec::new();
    let mut converted = Vec::with_capacity(args.len());

    for (param, value) in method.params.iter().zip(args) {
        let rules = rules_of(&param.decorators);
        let mut path = vec![param.name.clone()];

        if value.is_null() {
            if rules.required && !rules.optional {
                issues.push(ValidationIssue::new(path, "Value is required"));
            }
            converted.push(Value::Null);
            continue;
        }

        let value = convert(space, value, &param.ty, &mut path, &mut issues);
        for name in rule_names(&param.decorators) {
            pending.push(PendingRule {
                path: path.clone(),
                name,
                value: value.clone(),
            });
        }
        check_structure(
            space,
            &value,
            &param.ty,
            rules.partial,
            &mut path,
            &mut issues,
            &mut pending,
        );
        converted.push(value);
    }

    // Phase two: named validators run concurrently.
    let mut checks = Vec::with_capacity(pending.len());
    for rule in &pending {
        let Some(validator) = validators.get(&rule.name) else {
            return Err(DaedalusError::configuration(format!(
                "validator `{}` is not registered",
                rule.name
            )));
        };
        checks.push(async move {
            let outcome = validator.validate(&rule.value, ctx).await;
            (rule.path.clone(), outcome)
        });
    }
    for (path, outcome) in join_all(checks).await {
        if let Some(message) = outcome {
            issues.push(ValidationIssue::new(path, message));
        }
    }

    if issues.is_empty() {
        Ok(converted)
    } else {
        tracing::debug!(count = issues.len(), "validation failed");
        Err(DaedalusError::Validation { issues })
    }
}
