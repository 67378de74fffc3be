//! Error types for the reflection engine.
//!
//! All variants are configuration errors in the framework's taxonomy:
//! they are raised at registration or reflection time and are never
//! recovered from during request handling.

use thiserror::Error;

use crate::types::ClassId;

/// Result type alias using [`ReflectError`].
pub type ReflectResult<T> = Result<T, ReflectError>;

/// Errors raised by the metadata store, the reflection walker and the
/// generic type resolver.
#[derive(Error, Debug)]
pub enum ReflectError {
    /// A class id that was never registered in the type space.
    #[error("unknown class id {0:?}")]
    UnknownClass(ClassId),

    /// A class with the same name is already registered.
    #[error("a class named `{0}` is already registered")]
    DuplicateName(String),

    /// A non-repeatable decorator was stored without a stable identity
    /// key, so inheritance shadowing cannot be computed for it.
    #[error("non-repeatable decorator `{kind}` carries no identity key")]
    MissingIdentity {
        /// The decorator kind as reported by the payload.
        kind: String,
    },

    /// The inheritance chain contains a cycle.
    #[error("cyclic inheritance chain through class `{0}`")]
    CyclicInheritance(String),

    /// A symbolic generic type was resolved against a class that does
    /// not inherit from the class declaring the symbol.
    #[error("class `{class}` does not inherit from `{owner}`, cannot resolve generic parameter `{symbol}`")]
    NotInherited {
        /// The symbolic parameter name.
        symbol: String,
        /// The class declaring the symbol.
        owner: String,
        /// The class resolution was attempted against.
        class: String,
    },

    /// The class owning a symbolic type declares no generic template.
    #[error("class `{owner}` declares no generic template, cannot resolve parameter `{symbol}`")]
    MissingTemplate {
        /// The symbolic parameter name.
        symbol: String,
        /// The class expected to declare the template.
        owner: String,
    },

    /// A class supplies generic arguments whose arity does not match
    /// the nearest enclosing template.
    #[error("generic arguments on `{class}` have arity {supplied} but the template on `{template_owner}` expects {expected}")]
    ArityMismatch {
        /// The class supplying the arguments.
        class: String,
        /// Number of supplied arguments.
        supplied: usize,
        /// The class declaring the template.
        template_owner: String,
        /// Number of template parameters.
        expected: usize,
    },

    /// No generic argument record is reachable for a symbolic type.
    #[error("no generic argument reachable for parameter `{symbol}` declared on `{owner}`")]
    UnresolvedGeneric {
        /// The symbolic parameter name.
        symbol: String,
        /// The class declaring the symbol.
        owner: String,
    },
}
