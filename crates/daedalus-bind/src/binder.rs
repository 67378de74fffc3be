//! Parameter binding.
//!
//! For each action parameter the binder tries, in fixed priority
//! order: an explicit binding decorator, a case-insensitive name
//! lookup over the merged query and body keys, and whole-body binding
//! for class- and array-typed parameters. The first source that does
//! not answer "next" wins; a miss binds `Null` and is left to the
//! validator's required check, so binding itself never fails a
//! request.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use daedalus_core::RequestContext;
use daedalus_reflect::{
    BindingSource, DecoratorPayload, MethodReflection, ParameterReflection, TypeClassification,
};

/// Outcome of one binding source.
#[derive(Debug, Clone, PartialEq)]
pub enum BindResult {
    /// The source produced a value.
    Value(Value),
    /// The source does not apply; try the next one.
    Next,
}

/// A user-supplied binding source, registered by name and referenced
/// with a `bind::custom` decorator.
pub type CustomBinder = Arc<dyn Fn(&RequestContext) -> BindResult + Send + Sync>;

/// Named custom binders.
#[derive(Default, Clone)]
pub struct BinderRegistry {
    binders: HashMap<String, CustomBinder>,
}

impl BinderRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a binder under a name.
    pub fn register<F>(&mut self, name: impl Into<String>, binder: F)
    where
        F: Fn(&RequestContext) -> BindResult + Send + Sync + 'static,
    {
        self.binders.insert(name.into(), Arc::new(binder));
    }

    fn get(&self, name: &str) -> Option<&CustomBinder> {
        self.binders.get(name)
    }
}

impl std::fmt::Debug for BinderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinderRegistry")
            .field("binders", &self.binders.len())
            .finish()
    }
}

fn lookup_dotted<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = root;
    for segment in path.split('.') {
        current = current.get(segment)?;
    }
    Some(current)
}

fn identity_value(ctx: &RequestContext) -> Value {
    match ctx.identity() {
        Some(identity) => serde_json::json!({
            "name": identity.name,
            "roles": identity.roles,
            "claims": identity.claims,
        }),
        None => Value::Null,
    }
}

fn from_source(
    source: &BindingSource,
    param: &ParameterReflection,
    ctx: &RequestContext,
    registry: &BinderRegistry,
) -> BindResult {
    match source {
        BindingSource::Context => BindResult::Value(ctx.snapshot()),
        BindingSource::Body(path) => match path {
            Some(path) => lookup_dotted(ctx.body(), path)
                .map_or(BindResult::Next, |v| BindResult::Value(v.clone())),
            None => BindResult::Value(ctx.body().clone()),
        },
        BindingSource::Query(name) => {
            let key = name.as_deref().unwrap_or(&param.name);
            lookup_case_insensitive(ctx.query(), key)
                .map_or(BindResult::Next, |v| BindResult::Value(v.clone()))
        }
        BindingSource::Header(name) => {
            let key = name.as_deref().unwrap_or(&param.name);
            ctx.header(key)
                .map_or(BindResult::Next, |v| BindResult::Value(Value::from(v)))
        }
        BindingSource::User => BindResult::Value(identity_value(ctx)),
        BindingSource::Custom(name) => registry
            .get(name)
            .map_or(BindResult::Next, |binder| binder(ctx)),
    }
}

fn lookup_case_insensitive<'a>(
    bag: &'a indexmap::IndexMap<String, Value>,
    key: &str,
) -> Option<&'a Value> {
    bag.get(key)
        .or_else(|| bag.iter().find(|(k, _)| k.eq_ignore_ascii_case(key)).map(|(_, v)| v))
}

/// Binds a single parameter.
#[must_use]
pub fn bind_parameter(
    param: &ParameterReflection,
    ctx: &RequestContext,
    registry: &BinderRegistry,
) -> Value {
    // 1. Explicit binding decorators, in declaration order.
    for decorator in &param.decorators {
        if let DecoratorPayload::Bind(source) = decorator {
            match from_source(source, param, ctx, registry) {
                BindResult::Value(value) => return value,
                BindResult::Next => {}
            }
        }
    }

    // 2. Name lookup over merged query and body keys.
    if let Some(value) = lookup_case_insensitive(ctx.query(), &param.name) {
        return value.clone();
    }
    if let Some(fields) = ctx.body().as_object() {
        if let Some((_, value)) = fields
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(&param.name))
        {
            return value.clone();
        }
    }

    // 3. Whole body for structured parameter types.
    if matches!(
        param.classification,
        TypeClassification::Class | TypeClassification::Array
    ) && !ctx.body().is_null()
    {
        return ctx.body().clone();
    }

    // 4. Miss; the validator decides whether that is an error.
    Value::Null
}

/// Binds every parameter of an action, in declaration order.
#[must_use]
pub fn bind_all(
    method: &MethodReflection,
    ctx: &RequestContext,
    registry: &BinderRegistry,
) -> Vec<Value> {
    method
        .params
        .iter()
        .map(|param| bind_parameter(param, ctx, registry))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use daedalus_core::Identity;
    use daedalus_reflect::decorate::bind;
    use daedalus_reflect::{class, number, string, TypeSpace};

    fn reflect_method(space: &TypeSpace, configure: impl FnOnce(daedalus_reflect::MethodBuilder) -> daedalus_reflect::MethodBuilder) -> MethodReflection {
        let id = space
            .define("TestController")
            .method("act", configure)
            .register()
            .expect("register");
        space
            .reflect(id)
            .expect("reflect")
            .method("act")
            .expect("method")
            .clone()
    }

    #[test]
    fn test_name_lookup_is_case_insensitive() {
        let space = TypeSpace::new();
        let method = reflect_method(&space, |m| m.param("userId", number()));
        let ctx = RequestContext::builder()
            .query_pair("USERID", serde_json::json!("7"))
            .build();
        let args = bind_all(&method, &ctx, &BinderRegistry::new());
        assert_eq!(args, vec![serde_json::json!("7")]);
    }

    #[test]
    fn test_body_field_lookup() {
        let space = TypeSpace::new();
        let method = reflect_method(&space, |m| m.param("name", string()));
        let ctx = RequestContext::builder()
            .body(serde_json::json!({"name": "Rex"}))
            .build();
        let args = bind_all(&method, &ctx, &BinderRegistry::new());
        assert_eq!(args, vec![serde_json::json!("Rex")]);
    }

    #[test]
    fn test_query_wins_over_body() {
        let space = TypeSpace::new();
        let method = reflect_method(&space, |m| m.param("id", number()));
        let ctx = RequestContext::builder()
            .query_pair("id", serde_json::json!("1"))
            .body(serde_json::json!({"id": 2}))
            .build();
        let args = bind_all(&method, &ctx, &BinderRegistry::new());
        assert_eq!(args, vec![serde_json::json!("1")]);
    }

    #[test]
    fn test_class_parameter_binds_whole_body() {
        let space = TypeSpace::new();
        let dto = space
            .define("AnimalDto")
            .property("name", string())
            .register()
            .expect("dto");
        let method = reflect_method(&space, |m| m.param("animal", class(dto)));
        let ctx = RequestContext::builder()
            .body(serde_json::json!({"name": "Rex"}))
            .build();
        let args = bind_all(&method, &ctx, &BinderRegistry::new());
        assert_eq!(args, vec![serde_json::json!({"name": "Rex"})]);
    }

    #[test]
    fn test_explicit_body_path_decorator() {
        let space = TypeSpace::new();
        let method = reflect_method(&space, |m| {
            m.param("city", string())
                .decorate_param(0, bind::body(Some("address.city")))
        });
        let ctx = RequestContext::builder()
            .body(serde_json::json!({"address": {"city": "Lisbon"}}))
            .build();
        let args = bind_all(&method, &ctx, &BinderRegistry::new());
        assert_eq!(args, vec![serde_json::json!("Lisbon")]);
    }

    #[test]
    fn test_header_decorator() {
        let space = TypeSpace::new();
        let method = reflect_method(&space, |m| {
            m.param("trace", string())
                .decorate_param(0, bind::header(Some("x-trace-id")))
        });
        let mut headers = http::HeaderMap::new();
        headers.insert("x-trace-id", http::HeaderValue::from_static("abc"));
        let ctx = RequestContext::builder().headers(headers).build();
        let args = bind_all(&method, &ctx, &BinderRegistry::new());
        assert_eq!(args, vec![serde_json::json!("abc")]);
    }

    #[test]
    fn test_user_decorator_binds_identity() {
        let space = TypeSpace::new();
        let method = reflect_method(&space, |m| {
            m.param("user", string()).decorate_param(0, bind::user())
        });
        let ctx = RequestContext::builder()
            .identity(Identity::with_roles(["admin"]))
            .build();
        let args = bind_all(&method, &ctx, &BinderRegistry::new());
        assert_eq!(args[0]["roles"], serde_json::json!(["admin"]));
    }

    #[test]
    fn test_custom_binder_and_fallthrough() {
        let space = TypeSpace::new();
        let method = reflect_method(&space, |m| {
            m.param("tenant", string())
                .decorate_param(0, bind::custom("tenant"))
        });
        let mut registry = BinderRegistry::new();
        registry.register("tenant", |_ctx| {
            BindResult::Value(serde_json::json!("acme"))
        });
        let ctx = RequestContext::builder().build();
        assert_eq!(
            bind_all(&method, &ctx, &registry),
            vec![serde_json::json!("acme")]
        );

        // A custom binder answering "next" falls through to the name
        // lookup.
        let mut registry = BinderRegistry::new();
        registry.register("tenant", |_ctx| BindResult::Next);
        let ctx = RequestContext::builder()
            .query_pair("tenant", serde_json::json!("globex"))
            .build();
        assert_eq!(
            bind_all(&method, &ctx, &registry),
            vec![serde_json::json!("globex")]
        );
    }

    #[test]
    fn test_miss_binds_null() {
        let space = TypeSpace::new();
        let method = reflect_method(&space, |m| m.param("id", number()));
        let ctx = RequestContext::builder().build();
        let args = bind_all(&method, &ctx, &BinderRegistry::new());
        assert_eq!(args, vec![Value::Null]);
    }
}
