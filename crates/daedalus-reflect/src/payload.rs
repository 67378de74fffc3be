//! Decorator payloads and per-record options.
//!
//! A decorator is a data payload attached to a class, member or
//! parameter through the [`crate::builder::ClassBuilder`] API. Payloads
//! are plain data; their semantics live in the consumers (router,
//! binder, validator, authorization engine). The [`DecoratorOptions`]
//! attached to each record control inheritance and shadowing.

use crate::types::{ClassId, DataType};

/// HTTP verbs accepted by route decorators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpVerb {
    /// GET
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// PATCH
    Patch,
    /// DELETE
    Delete,
    /// HEAD
    Head,
    /// OPTIONS
    Options,
}

impl HttpVerb {
    /// Returns the canonical upper-case method name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
        }
    }
}

/// Data source selected by an explicit binding decorator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BindingSource {
    /// Bind the whole request context snapshot.
    Context,
    /// Bind the request body, or a dotted path into it.
    Body(Option<String>),
    /// Bind the query bag, or a single named entry.
    Query(Option<String>),
    /// Bind a named request header.
    Header(Option<String>),
    /// Bind the authenticated identity.
    User,
    /// Bind through a named custom binder registered with the binder.
    Custom(String),
}

/// Validation rules declared on parameters and properties.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValidationRule {
    /// Null/missing value produces a "required" issue.
    Required,
    /// Null/missing value short-circuits to success.
    Optional,
    /// Every property of the bound class is treated as optional.
    Partial,
    /// A named asynchronous validator resolved through the validator
    /// registry (or the dependency resolver).
    Rule(String),
}

/// Access-control decorators consumed by the authorization engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AccessDecorator {
    /// Route is accessible without authentication.
    Public,
    /// Any of the listed roles grants access.
    Role(Vec<String>),
    /// A named authorizer predicate registered with the engine.
    Custom(String),
    /// A policy scoped to a specific entity type.
    EntityPolicy {
        /// The entity the policy is scoped to.
        entity: ClassId,
        /// The policy name registered for that entity.
        policy: String,
    },
}

/// The decorator payload tagged union.
#[derive(Debug, Clone, PartialEq)]
pub enum DecoratorPayload {
    /// Route registration for an action method.
    Route {
        /// The HTTP verb.
        verb: HttpVerb,
        /// Absolute (`/x`), relative (`x`), or empty (root) URL
        /// override; `None` uses the naming convention.
        url: Option<String>,
    },
    /// Controller-level root path override.
    RootRoute(String),
    /// Explicit parameter binding source.
    Bind(BindingSource),
    /// Validation rule.
    Validate(ValidationRule),
    /// Access-control rule.
    Authorize(AccessDecorator),
    /// Route-scoped middleware, resolved by name at application build.
    Middleware(String),
    /// Generic template declaration on a generic base class.
    GenericTemplate(Vec<String>),
    /// Generic argument supply on a concrete subtype.
    GenericArgument(Vec<DataType>),
    /// Overrides the declared type of a member or parameter.
    TypeOverride(DataType),
    /// Constructor parameters double as properties.
    ParameterProperties,
    /// Suppresses the decorated member from the reflection graph.
    Ignore,
    /// Extension payload for user-defined decorators.
    Custom {
        /// Stable identity key; required for non-repeatable records.
        key: String,
        /// Arbitrary payload data.
        value: serde_json::Value,
    },
}

impl DecoratorPayload {
    /// Returns the decorator kind name used for diagnostics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Route { .. } => "route",
            Self::RootRoute(_) => "root-route",
            Self::Bind(_) => "bind",
            Self::Validate(_) => "validate",
            Self::Authorize(_) => "authorize",
            Self::Middleware(_) => "middleware",
            Self::GenericTemplate(_) => "generic-template",
            Self::GenericArgument(_) => "generic-argument",
            Self::TypeOverride(_) => "type-override",
            Self::ParameterProperties => "parameter-properties",
            Self::Ignore => "ignore",
            Self::Custom { .. } => "custom",
        }
    }

    /// Returns the stable identity key used for non-repeatable
    /// shadowing across the inheritance chain.
    ///
    /// Built-in payloads use their kind name. Custom payloads use the
    /// caller-supplied key; an empty key yields `None`, which the store
    /// rejects for non-repeatable records.
    #[must_use]
    pub fn identity(&self) -> Option<String> {
        match self {
            Self::Custom { key, .. } => {
                if key.is_empty() {
                    None
                } else {
                    Some(format!("custom:{key}"))
                }
            }
            other => Some(other.kind().to_string()),
        }
    }
}

/// Per-record options controlling inheritance and shadowing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoratorOptions {
    /// Whether subtypes inherit the record. Defaults to true.
    pub inherit: bool,
    /// Whether multiple records of the same identity may coexist.
    pub allow_multiple: bool,
    /// Member names a class-level record is replicated onto.
    pub apply_to: Vec<String>,
    /// Whether the class-level original is removed once replicated.
    pub remove_applied: bool,
}

impl Default for DecoratorOptions {
    fn default() -> Self {
        Self {
            inherit: true,
            allow_multiple: true,
            apply_to: Vec::new(),
            remove_applied: true,
        }
    }
}

impl DecoratorOptions {
    /// Default options for a payload kind.
    ///
    /// Single-valued payloads (binding source, type override, ignore,
    /// required/optional/partial rules, generic declarations) default
    /// to non-repeatable so a subtype record replaces the inherited
    /// one instead of duplicating it.
    #[must_use]
    pub fn default_for(payload: &DecoratorPayload) -> Self {
        let allow_multiple = !matches!(
            payload,
            DecoratorPayload::Bind(_)
                | DecoratorPayload::TypeOverride(_)
                | DecoratorPayload::Ignore
                | DecoratorPayload::ParameterProperties
                | DecoratorPayload::RootRoute(_)
                | DecoratorPayload::GenericTemplate(_)
                | DecoratorPayload::GenericArgument(_)
                | DecoratorPayload::Validate(
                    ValidationRule::Required | ValidationRule::Optional | ValidationRule::Partial
                )
        );
        Self {
            allow_multiple,
            ..Self::default()
        }
    }

    /// Marks the record as not inherited by subtypes.
    #[must_use]
    pub fn private(mut self) -> Self {
        self.inherit = false;
        self
    }

    /// Replicates the record onto the named members.
    #[must_use]
    pub fn applied_to<I, S>(mut self, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.apply_to = members.into_iter().map(Into::into).collect();
        self
    }
}

/// Constructors for the built-in decorator payloads.
pub mod decorate {
    use super::{AccessDecorator, BindingSource, DataType, DecoratorPayload, HttpVerb, ValidationRule};

    /// Route decorator constructors, one per verb.
    pub mod route {
        use super::{DecoratorPayload, HttpVerb};

        fn verb(verb: HttpVerb, url: Option<&str>) -> DecoratorPayload {
            DecoratorPayload::Route {
                verb,
                url: url.map(str::to_string),
            }
        }

        /// `GET` route; `None` uses the naming convention.
        #[must_use]
        pub fn get(url: Option<&str>) -> DecoratorPayload {
            verb(HttpVerb::Get, url)
        }

        /// `POST` route.
        #[must_use]
        pub fn post(url: Option<&str>) -> DecoratorPayload {
            verb(HttpVerb::Post, url)
        }

        /// `PUT` route.
        #[must_use]
        pub fn put(url: Option<&str>) -> DecoratorPayload {
            verb(HttpVerb::Put, url)
        }

        /// `PATCH` route.
        #[must_use]
        pub fn patch(url: Option<&str>) -> DecoratorPayload {
            verb(HttpVerb::Patch, url)
        }

        /// `DELETE` route.
        #[must_use]
        pub fn delete(url: Option<&str>) -> DecoratorPayload {
            verb(HttpVerb::Delete, url)
        }

        /// `HEAD` route.
        #[must_use]
        pub fn head(url: Option<&str>) -> DecoratorPayload {
            verb(HttpVerb::Head, url)
        }

        /// `OPTIONS` route.
        #[must_use]
        pub fn options(url: Option<&str>) -> DecoratorPayload {
            verb(HttpVerb::Options, url)
        }

        /// Controller-level root path override.
        #[must_use]
        pub fn root(url: &str) -> DecoratorPayload {
            DecoratorPayload::RootRoute(url.to_string())
        }
    }

    /// Binding decorator constructors.
    pub mod bind {
        use super::{BindingSource, DecoratorPayload};

        /// Bind the request context snapshot.
        #[must_use]
        pub fn ctx() -> DecoratorPayload {
            DecoratorPayload::Bind(BindingSource::Context)
        }

        /// Bind the whole body or a dotted path into it.
        #[must_use]
        pub fn body(path: Option<&str>) -> DecoratorPayload {
            DecoratorPayload::Bind(BindingSource::Body(path.map(str::to_string)))
        }

        /// Bind the query bag or a single named entry.
        #[must_use]
        pub fn query(name: Option<&str>) -> DecoratorPayload {
            DecoratorPayload::Bind(BindingSource::Query(name.map(str::to_string)))
        }

        /// Bind a named request header.
        #[must_use]
        pub fn header(name: Option<&str>) -> DecoratorPayload {
            DecoratorPayload::Bind(BindingSource::Header(name.map(str::to_string)))
        }

        /// Bind the authenticated identity.
        #[must_use]
        pub fn user() -> DecoratorPayload {
            DecoratorPayload::Bind(BindingSource::User)
        }

        /// Bind through a named custom binder.
        #[must_use]
        pub fn custom(name: &str) -> DecoratorPayload {
            DecoratorPayload::Bind(BindingSource::Custom(name.to_string()))
        }
    }

    /// Validation decorator constructors.
    pub mod val {
        use super::{DecoratorPayload, ValidationRule};

        /// Null/missing value is a validation issue.
        #[must_use]
        pub fn required() -> DecoratorPayload {
            DecoratorPayload::Validate(ValidationRule::Required)
        }

        /// Null/missing value short-circuits to success.
        #[must_use]
        pub fn optional() -> DecoratorPayload {
            DecoratorPayload::Validate(ValidationRule::Optional)
        }

        /// All properties of the bound class are treated as optional.
        #[must_use]
        pub fn partial() -> DecoratorPayload {
            DecoratorPayload::Validate(ValidationRule::Partial)
        }

        /// A named asynchronous validator.
        #[must_use]
        pub fn rule(name: &str) -> DecoratorPayload {
            DecoratorPayload::Validate(ValidationRule::Rule(name.to_string()))
        }
    }

    /// Authorization decorator constructors.
    pub mod authorize {
        use super::{AccessDecorator, DecoratorPayload};
        use crate::types::ClassId;

        /// Accessible without authentication.
        #[must_use]
        pub fn public() -> DecoratorPayload {
            DecoratorPayload::Authorize(AccessDecorator::Public)
        }

        /// Any of the listed roles grants access.
        #[must_use]
        pub fn role<I, S>(roles: I) -> DecoratorPayload
        where
            I: IntoIterator<Item = S>,
            S: Into<String>,
        {
            DecoratorPayload::Authorize(AccessDecorator::Role(
                roles.into_iter().map(Into::into).collect(),
            ))
        }

        /// A named authorizer predicate.
        #[must_use]
        pub fn custom(name: &str) -> DecoratorPayload {
            DecoratorPayload::Authorize(AccessDecorator::Custom(name.to_string()))
        }

        /// A policy scoped to an entity type.
        #[must_use]
        pub fn entity_policy(entity: ClassId, policy: &str) -> DecoratorPayload {
            DecoratorPayload::Authorize(AccessDecorator::EntityPolicy {
                entity,
                policy: policy.to_string(),
            })
        }
    }

    /// Generic template/argument constructors.
    pub mod generic {
        use super::{DataType, DecoratorPayload};

        /// Declares symbolic type parameters on a generic base class.
        #[must_use]
        pub fn template<I, S>(names: I) -> DecoratorPayload
        where
            I: IntoIterator<Item = S>,
            S: Into<String>,
        {
            DecoratorPayload::GenericTemplate(names.into_iter().map(Into::into).collect())
        }

        /// Supplies concrete types on a subtype, positionally matched
        /// against the nearest enclosing template.
        #[must_use]
        pub fn argument<I>(types: I) -> DecoratorPayload
        where
            I: IntoIterator<Item = DataType>,
        {
            DecoratorPayload::GenericArgument(types.into_iter().collect())
        }
    }

    /// Overrides the declared type of a member or parameter.
    #[must_use]
    pub fn type_override(ty: DataType) -> DecoratorPayload {
        DecoratorPayload::TypeOverride(ty)
    }

    /// Suppresses the decorated member from the reflection graph.
    #[must_use]
    pub fn ignore() -> DecoratorPayload {
        DecoratorPayload::Ignore
    }

    /// Constructor parameters double as properties.
    #[must_use]
    pub fn parameter_properties() -> DecoratorPayload {
        DecoratorPayload::ParameterProperties
    }

    /// Route-scoped middleware, resolved by name at application build.
    #[must_use]
    pub fn middleware(name: &str) -> DecoratorPayload {
        DecoratorPayload::Middleware(name.to_string())
    }

    /// Extension payload for user-defined decorators.
    #[must_use]
    pub fn custom(key: &str, value: serde_json::Value) -> DecoratorPayload {
        DecoratorPayload::Custom {
            key: key.to_string(),
            value,
        }
    }
}
