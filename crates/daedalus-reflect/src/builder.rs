//! Fluent class definition and decoration API.
//!
//! The builder is the explicit replacement for language-level
//! decorators: it is called once at module-definition time, records
//! the structural shape of a class into the type registry, and writes
//! decorator payloads into the metadata store.
//!
//! # Example
//!
//! ```rust
//! use daedalus_reflect::decorate::{route, val};
//! use daedalus_reflect::{number, string, TypeSpace};
//!
//! let space = TypeSpace::new();
//! let animal = space
//!     .define("AnimalController")
//!     .method("get", |m| {
//!         m.param("id", number())
//!             .decorate(route::get(Some(":id")))
//!             .decorate_param(0, val::required())
//!     })
//!     .register()
//!     .expect("register controller");
//!
//! let reflection = space.reflect(animal).expect("reflect");
//! assert_eq!(reflection.methods.len(), 1);
//! ```

use std::any::Any;
use std::sync::Arc;

use crate::error::ReflectResult;
use crate::payload::{DecoratorOptions, DecoratorPayload};
use crate::registry::{ClassDef, MethodDef, OpaqueHandler, ParamDef, PropertyDef};
use crate::space::TypeSpace;
use crate::types::{ClassId, DataType};

/// A decoration queued until `register` assigns the class id.
struct PendingRecord {
    member: Option<String>,
    index: Option<usize>,
    payload: DecoratorPayload,
    options: Option<DecoratorOptions>,
}

/// Fluent builder for a class definition.
pub struct ClassBuilder<'a> {
    space: &'a TypeSpace,
    def: ClassDef,
    pending: Vec<PendingRecord>,
}

impl<'a> ClassBuilder<'a> {
    pub(crate) fn new(space: &'a TypeSpace, name: &str) -> Self {
        Self {
            space,
            def: ClassDef::new(name),
            pending: Vec::new(),
        }
    }

    /// Sets the parent class.
    #[must_use]
    pub fn parent(mut self, parent: ClassId) -> Self {
        self.def.parent = Some(parent);
        self
    }

    /// Sets the constructor logic producing fresh instances.
    #[must_use]
    pub fn factory<T, F>(mut self, factory: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.def.factory = Some(Arc::new(move || {
            Arc::new(factory()) as Arc<dyn Any + Send + Sync>
        }));
        self
    }

    /// Declares a constructor parameter.
    #[must_use]
    pub fn ctor_param(mut self, name: &str, ty: DataType) -> Self {
        self.def.ctor_params.push(ParamDef {
            name: name.to_string(),
            ty,
        });
        self
    }

    /// Decorates the constructor parameter at `index`.
    #[must_use]
    pub fn decorate_ctor_param(mut self, index: usize, payload: DecoratorPayload) -> Self {
        self.pending.push(PendingRecord {
            member: Some("constructor".to_string()),
            index: Some(index),
            payload,
            options: None,
        });
        self
    }

    /// Decorates the class itself with default options.
    #[must_use]
    pub fn decorate(mut self, payload: DecoratorPayload) -> Self {
        self.pending.push(PendingRecord {
            member: None,
            index: None,
            payload,
            options: None,
        });
        self
    }

    /// Decorates the class itself with explicit options.
    #[must_use]
    pub fn decorate_with(mut self, payload: DecoratorPayload, options: DecoratorOptions) -> Self {
        self.pending.push(PendingRecord {
            member: None,
            index: None,
            payload,
            options: Some(options),
        });
        self
    }

    /// Declares a property.
    #[must_use]
    pub fn property(mut self, name: &str, ty: DataType) -> Self {
        self.def.properties.push(PropertyDef {
            name: name.to_string(),
            ty,
        });
        self
    }

    /// Decorates a named property (or method) with default options.
    #[must_use]
    pub fn decorate_member(mut self, name: &str, payload: DecoratorPayload) -> Self {
        self.pending.push(PendingRecord {
            member: Some(name.to_string()),
            index: None,
            payload,
            options: None,
        });
        self
    }

    /// Declares a method through a nested builder.
    #[must_use]
    pub fn method<F>(mut self, name: &str, configure: F) -> Self
    where
        F: FnOnce(MethodBuilder) -> MethodBuilder,
    {
        let built = configure(MethodBuilder::new(name));
        for (index, payload, options) in built.pending {
            self.pending.push(PendingRecord {
                member: Some(name.to_string()),
                index,
                payload,
                options,
            });
        }
        self.def.methods.push(built.def);
        self
    }

    /// Registers the definition and writes queued decorations.
    ///
    /// # Errors
    ///
    /// Returns registration errors (duplicate name, unknown parent)
    /// and decoration-time configuration errors (non-repeatable record
    /// without an identity key).
    pub fn register(self) -> ReflectResult<ClassId> {
        // Validate decorations before touching the registry so a bad
        // decorator never leaves a half-registered class behind.
        for record in &self.pending {
            let options = record
                .options
                .clone()
                .unwrap_or_else(|| DecoratorOptions::default_for(&record.payload));
            if !options.allow_multiple && record.payload.identity().is_none() {
                return Err(crate::error::ReflectError::MissingIdentity {
                    kind: record.payload.kind().to_string(),
                });
            }
        }

        let id = self.space.registry().insert(self.def)?;
        for record in self.pending {
            let options = record
                .options
                .unwrap_or_else(|| DecoratorOptions::default_for(&record.payload));
            self.space.metadata().set(
                id,
                record.member.as_deref(),
                record.index,
                record.payload,
                options,
            )?;
        }
        Ok(id)
    }
}

/// Fluent builder for a method inside a [`ClassBuilder`].
pub struct MethodBuilder {
    def: MethodDef,
    pending: Vec<(Option<usize>, DecoratorPayload, Option<DecoratorOptions>)>,
}

impl MethodBuilder {
    fn new(name: &str) -> Self {
        Self {
            def: MethodDef {
                name: name.to_string(),
                params: Vec::new(),
                return_type: DataType::Unknown,
                handler: None,
            },
            pending: Vec::new(),
        }
    }

    /// Declares a parameter.
    #[must_use]
    pub fn param(mut self, name: &str, ty: DataType) -> Self {
        self.def.params.push(ParamDef {
            name: name.to_string(),
            ty,
        });
        self
    }

    /// Sets the declared return type.
    #[must_use]
    pub fn returns(mut self, ty: DataType) -> Self {
        self.def.return_type = ty;
        self
    }

    /// Decorates the method with default options.
    #[must_use]
    pub fn decorate(mut self, payload: DecoratorPayload) -> Self {
        self.pending.push((None, payload, None));
        self
    }

    /// Decorates the method with explicit options.
    #[must_use]
    pub fn decorate_with(mut self, payload: DecoratorPayload, options: DecoratorOptions) -> Self {
        self.pending.push((None, payload, Some(options)));
        self
    }

    /// Decorates the parameter at `index`.
    #[must_use]
    pub fn decorate_param(mut self, index: usize, payload: DecoratorPayload) -> Self {
        self.pending.push((Some(index), payload, None));
        self
    }

    /// Attaches the opaque action handler invoked by the pipeline.
    #[must_use]
    pub fn handler(mut self, handler: OpaqueHandler) -> Self {
        self.def.handler = Some(handler);
        self
    }
}
