//! Symbolic generic type resolution.
//!
//! A generic base class declares symbolic parameters with a
//! `generic::template` decorator; concrete subtypes supply types with
//! `generic::argument`, positionally matched against the nearest
//! enclosing template. Resolution walks from the declaring class down
//! to the concrete leaf, substituting until a concrete type is found.

use crate::error::{ReflectError, ReflectResult};
use crate::metadata::MetadataStore;
use crate::payload::DecoratorPayload;
use crate::registry::TypeRegistry;
use crate::types::{ClassId, DataType};

/// Returns the generic template declared directly on a class, if any.
fn own_template(metadata: &MetadataStore, class: ClassId) -> Option<Vec<String>> {
    metadata
        .get_own(class, None, None)
        .into_iter()
        .find_map(|r| match r.payload {
            DecoratorPayload::GenericTemplate(names) => Some(names),
            _ => None,
        })
}

/// Returns the generic arguments supplied directly on a class, if any.
fn own_arguments(metadata: &MetadataStore, class: ClassId) -> Option<Vec<DataType>> {
    metadata
        .get_own(class, None, None)
        .into_iter()
        .find_map(|r| match r.payload {
            DecoratorPayload::GenericArgument(types) => Some(types),
            _ => None,
        })
}

/// Finds the nearest class at or above `from` declaring a template.
pub(crate) fn nearest_template(
    registry: &TypeRegistry,
    metadata: &MetadataStore,
    from: ClassId,
) -> ReflectResult<Option<(ClassId, Vec<String>)>> {
    for level in registry.chain(from)? {
        if let Some(names) = own_template(metadata, level) {
            return Ok(Some((level, names)));
        }
    }
    Ok(None)
}

/// Resolves a symbolic generic type declared on `declaring` against
/// the concrete `leaf` class.
///
/// Walks from the declaring class down towards the leaf. Every level
/// supplying `generic::argument` values concretizes the nearest
/// enclosing template: when that template is the one owning the
/// current symbol, the argument at the symbol's position is
/// substituted. A still-symbolic result means the level
/// re-parameterized rather than concretized, so substitution continues
/// at the next level down with the re-parameterizing class as the new
/// owner. Resolution stops at the first concrete type.
///
/// # Errors
///
/// - [`ReflectError::NotInherited`] when `leaf` does not extend
///   `declaring`.
/// - [`ReflectError::MissingTemplate`] when the declaring class has no
///   template.
/// - [`ReflectError::ArityMismatch`] when a level supplies arguments
///   whose arity differs from the nearest template.
/// - [`ReflectError::UnresolvedGeneric`] when no reachable argument
///   record concretizes the symbol.
pub(crate) fn resolve(
    registry: &TypeRegistry,
    metadata: &MetadataStore,
    symbol: &str,
    declaring: ClassId,
    leaf: ClassId,
) -> ReflectResult<DataType> {
    let chain = registry.chain(leaf)?;
    let Some(position) = chain.iter().position(|c| *c == declaring) else {
        return Err(ReflectError::NotInherited {
            symbol: symbol.to_string(),
            owner: registry.name_of(declaring),
            class: registry.name_of(leaf),
        });
    };
    if own_template(metadata, declaring).is_none() {
        return Err(ReflectError::MissingTemplate {
            symbol: symbol.to_string(),
            owner: registry.name_of(declaring),
        });
    }

    // Walk from just below the declaring class down to the leaf.
    let mut symbol = symbol.to_string();
    let mut owner = declaring;
    for level in chain[..position].iter().rev() {
        let Some(arguments) = own_arguments(metadata, *level) else {
            continue;
        };
        let Some(parent) = registry.parent_of(*level) else {
            continue;
        };
        let Some((template_owner, names)) = nearest_template(registry, metadata, parent)? else {
            return Err(ReflectError::MissingTemplate {
                symbol,
                owner: registry.name_of(*level),
            });
        };
        if arguments.len() != names.len() {
            return Err(ReflectError::ArityMismatch {
                class: registry.name_of(*level),
                supplied: arguments.len(),
                template_owner: registry.name_of(template_owner),
                expected: names.len(),
            });
        }
        if template_owner != owner {
            // This level concretizes a different template.
            continue;
        }
        let Some(index) = names.iter().position(|n| *n == symbol) else {
            return Err(ReflectError::UnresolvedGeneric {
                symbol,
                owner: registry.name_of(owner),
            });
        };
        match &arguments[index] {
            DataType::Symbol(renamed) => {
                // Re-parameterized: the new symbol belongs to this
                // level's own template. Keep substituting below.
                symbol = renamed.clone();
                owner = *level;
            }
            concrete => return Ok(concrete.clone()),
        }
    }

    Err(ReflectError::UnresolvedGeneric {
        symbol,
        owner: registry.name_of(owner),
    })
}

/// Resolves symbols nested inside array types; concrete types pass
/// through unchanged.
pub(crate) fn resolve_type(
    registry: &TypeRegistry,
    metadata: &MetadataStore,
    ty: &DataType,
    declaring: ClassId,
    leaf: ClassId,
) -> ReflectResult<DataType> {
    match ty {
        DataType::Symbol(symbol) => resolve(registry, metadata, symbol, declaring, leaf),
        DataType::Array(inner) => Ok(DataType::Array(Box::new(resolve_type(
            registry, metadata, inner, declaring, leaf,
        )?))),
        concrete => Ok(concrete.clone()),
    }
}
