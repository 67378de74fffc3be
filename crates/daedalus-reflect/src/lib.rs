//! # daedalus-reflect
//!
//! Metadata registry and reflection engine for the Daedalus framework.
//!
//! Language-level decorators and runtime type introspection are
//! replaced by three explicit, process-scoped structures bundled in a
//! [`TypeSpace`]:
//!
//! - a **type registry**: class definitions with parent pointers,
//!   written once at startup;
//! - a **metadata store**: an append-only multimap of decorator
//!   payloads keyed by `(class, member, parameter index)`;
//! - a **reflection cache**: immutable [`ClassReflection`] graphs,
//!   computed lazily by the walker and cached per class.
//!
//! On top of these, the engine resolves symbolic generic types
//! declared with `generic::template`/`generic::argument` decorators
//! across arbitrary inheritance depth, and synthesizes new classes at
//! runtime to bind generic bases to concrete type arguments.
//!
//! Every downstream subsystem (router, binder, validator,
//! authorization) consumes the resolved reflection graph; none of them
//! read the registry or the metadata store directly.

pub mod builder;
pub mod error;
pub mod generics;
pub mod metadata;
pub mod payload;
pub mod registry;
pub mod space;
pub mod synthesizer;
pub mod types;
pub mod walker;

pub use builder::{ClassBuilder, MethodBuilder};
pub use error::{ReflectError, ReflectResult};
pub use metadata::{DecoratorRecord, MetadataKey, MetadataStore};
pub use payload::{
    decorate, AccessDecorator, BindingSource, DecoratorOptions, DecoratorPayload, HttpVerb,
    ValidationRule,
};
pub use registry::{ClassDef, Factory, MethodDef, OpaqueHandler, ParamDef, PropertyDef, TypeRegistry};
pub use space::TypeSpace;
pub use types::{
    array, boolean, class, number, string, symbol, ClassId, DataType, Primitive,
    TypeClassification,
};
pub use walker::{
    ClassReflection, ConstructorReflection, MethodReflection, NodeKind, ParameterReflection,
    PropertyReflection,
};
