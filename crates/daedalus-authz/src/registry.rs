//! Named authorizers and entity policies.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use daedalus_core::{Identity, RequestContext};
use daedalus_reflect::ClassId;

/// A custom authorization predicate referenced by name from an
/// `authorize::custom` decorator.
#[async_trait]
pub trait Authorizer: Send + Sync {
    /// Returns true when the caller may proceed.
    async fn authorize(&self, identity: Option<&Identity>, ctx: &RequestContext) -> bool;
}

/// An authorization rule scoped to one entity type, referenced from
/// an `authorize::entity_policy` decorator and evaluated against the
/// bound entity value.
#[async_trait]
pub trait EntityPolicy: Send + Sync {
    /// Returns true when the caller may act on the entity value.
    async fn allows(
        &self,
        identity: Option<&Identity>,
        entity: &Value,
        ctx: &RequestContext,
    ) -> bool;
}

struct FnAuthorizer<F>(F);

#[async_trait]
impl<F> Authorizer for FnAuthorizer<F>
where
    F: Fn(Option<&Identity>) -> bool + Send + Sync,
{
    async fn authorize(&self, identity: Option<&Identity>, _ctx: &RequestContext) -> bool {
        (self.0)(identity)
    }
}

struct FnPolicy<F>(F);

#[async_trait]
impl<F> EntityPolicy for FnPolicy<F>
where
    F: Fn(Option<&Identity>, &Value) -> bool + Send + Sync,
{
    async fn allows(
        &self,
        identity: Option<&Identity>,
        entity: &Value,
        _ctx: &RequestContext,
    ) -> bool {
        (self.0)(identity, entity)
    }
}

/// Named authorizers plus entity policies keyed by entity class and
/// policy name.
#[derive(Default, Clone)]
pub struct AuthorizerRegistry {
    authorizers: HashMap<String, Arc<dyn Authorizer>>,
    policies: HashMap<(ClassId, String), Arc<dyn EntityPolicy>>,
}

impl AuthorizerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an authorizer object under a name.
    pub fn register(&mut self, name: impl Into<String>, authorizer: Arc<dyn Authorizer>) {
        self.authorizers.insert(name.into(), authorizer);
    }

    /// Registers a synchronous identity predicate under a name.
    pub fn register_fn<F>(&mut self, name: impl Into<String>, predicate: F)
    where
        F: Fn(Option<&Identity>) -> bool + Send + Sync + 'static,
    {
        self.authorizers
            .insert(name.into(), Arc::new(FnAuthorizer(predicate)));
    }

    /// Registers a policy object for an entity class.
    pub fn register_policy(
        &mut self,
        entity: ClassId,
        name: impl Into<String>,
        policy: Arc<dyn EntityPolicy>,
    ) {
        self.policies.insert((entity, name.into()), policy);
    }

    /// Registers a synchronous entity predicate for an entity class.
    pub fn register_policy_fn<F>(&mut self, entity: ClassId, name: impl Into<String>, predicate: F)
    where
        F: Fn(Option<&Identity>, &Value) -> bool + Send + Sync + 'static,
    {
        self.policies
            .insert((entity, name.into()), Arc::new(FnPolicy(predicate)));
    }

    /// Looks up an authorizer by name.
    #[must_use]
    pub fn authorizer(&self, name: &str) -> Option<Arc<dyn Authorizer>> {
        self.authorizers.get(name).cloned()
    }

    /// Looks up an entity policy.
    #[must_use]
    pub fn policy(&self, entity: ClassId, name: &str) -> Option<Arc<dyn EntityPolicy>> {
        self.policies.get(&(entity, name.to_string())).cloned()
    }
}

impl std::fmt::Debug for AuthorizerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizerRegistry")
            .field("authorizers", &self.authorizers.len())
            .field("policies", &self.policies.len())
            .finish()
    }
}
