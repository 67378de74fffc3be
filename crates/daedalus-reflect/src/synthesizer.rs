//! Dynamic class synthesis.
//!
//! Materializes a new class at runtime by registering a fresh
//! definition that extends a parent and carries `generic::argument`
//! metadata, so subsequent reflection resolves the parent's generic
//! members against the supplied types. Synthesized classes are true
//! subclasses: `is_subclass_of` holds, and instantiation falls back to
//! the parent's constructor factory.

use crate::error::{ReflectError, ReflectResult};
use crate::generics::nearest_template;
use crate::metadata::MetadataStore;
use crate::payload::{DecoratorOptions, DecoratorPayload};
use crate::registry::{ClassDef, TypeRegistry};
use crate::types::{ClassId, DataType};

/// Registers a synthesized subclass of `parent` named `name`, bound
/// to the given generic arguments.
///
/// # Errors
///
/// Returns [`ReflectError::MissingTemplate`] when no template is
/// reachable from the parent, [`ReflectError::ArityMismatch`] when
/// the argument count differs from that template, and registration
/// errors for unknown parents or duplicate names.
pub(crate) fn synthesize(
    registry: &TypeRegistry,
    metadata: &MetadataStore,
    parent: ClassId,
    name: &str,
    arguments: Vec<DataType>,
) -> ReflectResult<ClassId> {
    // Validate the binding eagerly so a bad synthesis fails at
    // definition time, not at first reflection.
    let Some((template_owner, names)) = nearest_template(registry, metadata, parent)? else {
        return Err(ReflectError::MissingTemplate {
            symbol: String::new(),
            owner: registry.name_of(parent),
        });
    };
    if arguments.len() != names.len() {
        return Err(ReflectError::ArityMismatch {
            class: name.to_string(),
            supplied: arguments.len(),
            template_owner: registry.name_of(template_owner),
            expected: names.len(),
        });
    }

    let id = registry.insert(ClassDef::new(name).with_parent(parent))?;
    let payload = DecoratorPayload::GenericArgument(arguments);
    let options = DecoratorOptions::default_for(&payload);
    metadata.set(id, None, None, payload, options)?;
    tracing::debug!(class = name, parent = %registry.name_of(parent), "synthesized class");
    Ok(id)
}
