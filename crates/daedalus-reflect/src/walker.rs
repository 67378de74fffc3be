//! Reflection walker.
//!
//! Walks a class and its parent chain, merging the raw structural
//! shape from the registry with decorator records from the metadata
//! store, resolving type overrides and symbolic generic types, and
//! producing an immutable, cached [`ClassReflection`] graph.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::ReflectResult;
use crate::generics;
use crate::metadata::{DecoratorRecord, MetadataStore};
use crate::payload::DecoratorPayload;
use crate::registry::{MethodDef, OpaqueHandler, PropertyDef, TypeRegistry};
use crate::types::{ClassId, DataType, TypeClassification};

/// Tag identifying the kind of a reflection node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// A class node.
    Class,
    /// A method node.
    Method,
    /// A property node.
    Property,
    /// A parameter node.
    Parameter,
    /// A constructor node.
    Constructor,
}

/// A fully resolved method or constructor parameter.
#[derive(Debug, Clone)]
pub struct ParameterReflection {
    /// Node kind tag (always [`NodeKind::Parameter`]).
    pub kind: NodeKind,
    /// Parameter name.
    pub name: String,
    /// Merged decorator payloads.
    pub decorators: Vec<DecoratorPayload>,
    /// Resolved data type.
    pub ty: DataType,
    /// Classification of the resolved type.
    pub classification: TypeClassification,
}

/// A fully resolved method.
#[derive(Clone)]
pub struct MethodReflection {
    /// Node kind tag (always [`NodeKind::Method`]).
    pub kind: NodeKind,
    /// Method name.
    pub name: String,
    /// The inheritance level that contributed the signature.
    pub owner: ClassId,
    /// Merged decorator payloads (own plus inherited).
    pub decorators: Vec<DecoratorPayload>,
    /// Parameters of the owning signature. Parameter lists are never
    /// inherited across an override.
    pub params: Vec<ParameterReflection>,
    /// Resolved return type.
    pub return_type: DataType,
    /// Classification of the return type.
    pub return_classification: TypeClassification,
    /// Opaque action handler, if the definition carries one.
    pub handler: Option<OpaqueHandler>,
}

impl std::fmt::Debug for MethodReflection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodReflection")
            .field("name", &self.name)
            .field("owner", &self.owner)
            .field("decorators", &self.decorators)
            .field("params", &self.params)
            .field("return_type", &self.return_type)
            .field("handler", &self.handler.is_some())
            .finish()
    }
}

/// A fully resolved property.
#[derive(Debug, Clone)]
pub struct PropertyReflection {
    /// Node kind tag (always [`NodeKind::Property`]).
    pub kind: NodeKind,
    /// Property name.
    pub name: String,
    /// The inheritance level that contributed the property.
    pub owner: ClassId,
    /// Merged decorator payloads.
    pub decorators: Vec<DecoratorPayload>,
    /// Resolved data type.
    pub ty: DataType,
    /// Classification of the resolved type.
    pub classification: TypeClassification,
}

/// The resolved constructor of a class. Never inherited.
#[derive(Debug, Clone, Default)]
pub struct ConstructorReflection {
    /// Constructor parameters of the leaf class only.
    pub params: Vec<ParameterReflection>,
}

/// The fully resolved reflection graph of a class.
#[derive(Debug, Clone)]
pub struct ClassReflection {
    /// Node kind tag (always [`NodeKind::Class`]).
    pub kind: NodeKind,
    /// The reflected class.
    pub id: ClassId,
    /// Class name.
    pub name: String,
    /// Parent class, if any.
    pub parent: Option<ClassId>,
    /// Merged class-level decorator payloads.
    pub decorators: Vec<DecoratorPayload>,
    /// The constructor (leaf class only).
    pub ctor: ConstructorReflection,
    /// Merged methods, child entries overriding parent entries.
    pub methods: Vec<MethodReflection>,
    /// Merged properties.
    pub properties: Vec<PropertyReflection>,
}

impl ClassReflection {
    /// Looks up a method by name.
    #[must_use]
    pub fn method(&self, name: &str) -> Option<&MethodReflection> {
        self.methods.iter().find(|m| m.name == name)
    }

    /// Looks up a property by name.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&PropertyReflection> {
        self.properties.iter().find(|p| p.name == name)
    }
}

fn payloads(records: Vec<DecoratorRecord>) -> Vec<DecoratorPayload> {
    records.into_iter().map(|r| r.payload).collect()
}

fn is_ignored(decorators: &[DecoratorPayload]) -> bool {
    decorators
        .iter()
        .any(|d| matches!(d, DecoratorPayload::Ignore))
}

/// Picks the effective type of a member: the child-most type override
/// wins over the structural declaration. Returns the type together
/// with the class the declaration belongs to, which anchors symbolic
/// generic resolution.
fn effective_type(
    records: &[DecoratorRecord],
    structural: &DataType,
    structural_owner: ClassId,
) -> (DataType, ClassId) {
    for record in records {
        if let DecoratorPayload::TypeOverride(ty) = &record.payload {
            return (ty.clone(), record.declared_on);
        }
    }
    (structural.clone(), structural_owner)
}

fn reflect_parameter(
    registry: &TypeRegistry,
    metadata: &MetadataStore,
    leaf: ClassId,
    member: &str,
    index: usize,
    name: &str,
    structural: &DataType,
    structural_owner: ClassId,
) -> ReflectResult<ParameterReflection> {
    let records = metadata.get(registry, leaf, Some(member), Some(index))?;
    let (ty, declared_on) = effective_type(&records, structural, structural_owner);
    let ty = generics::resolve_type(registry, metadata, &ty, declared_on, leaf)?;
    Ok(ParameterReflection {
        kind: NodeKind::Parameter,
        name: name.to_string(),
        decorators: payloads(records),
        classification: ty.classification(),
        ty,
    })
}

fn reflect_method(
    registry: &TypeRegistry,
    metadata: &MetadataStore,
    leaf: ClassId,
    owner: ClassId,
    def: &MethodDef,
) -> ReflectResult<MethodReflection> {
    let records = metadata.get(registry, leaf, Some(&def.name), None)?;
    let (return_type, declared_on) = effective_type(&records, &def.return_type, owner);
    let return_type = generics::resolve_type(registry, metadata, &return_type, declared_on, leaf)?;

    let mut params = Vec::with_capacity(def.params.len());
    for (index, param) in def.params.iter().enumerate() {
        params.push(reflect_parameter(
            registry, metadata, leaf, &def.name, index, &param.name, &param.ty, owner,
        )?);
    }

    Ok(MethodReflection {
        kind: NodeKind::Method,
        name: def.name.clone(),
        owner,
        decorators: payloads(records),
        params,
        return_classification: return_type.classification(),
        return_type,
        handler: def.handler.clone(),
    })
}

fn reflect_property(
    registry: &TypeRegistry,
    metadata: &MetadataStore,
    leaf: ClassId,
    owner: ClassId,
    def: &PropertyDef,
) -> ReflectResult<PropertyReflection> {
    let records = metadata.get(registry, leaf, Some(&def.name), None)?;
    let (ty, declared_on) = effective_type(&records, &def.ty, owner);
    let ty = generics::resolve_type(registry, metadata, &ty, declared_on, leaf)?;
    Ok(PropertyReflection {
        kind: NodeKind::Property,
        name: def.name.clone(),
        owner,
        decorators: payloads(records),
        classification: ty.classification(),
        ty,
    })
}

/// Computes the reflection graph of a class.
///
/// The chain walk recurses to the root superclass first; child levels
/// then override parent members of the same name without duplication.
/// The constructor is taken from the leaf definition only. A second
/// pass (inside the member builders) resolves type overrides and
/// symbolic generic types; members tagged ignore are removed last so
/// an ignore decorator at any level suppresses inherited members.
pub(crate) fn reflect(
    registry: &TypeRegistry,
    metadata: &MetadataStore,
    id: ClassId,
) -> ReflectResult<ClassReflection> {
    // Cycle detection happens inside the chain walk: the chain is the
    // traversal path, and revisiting a class terminates reflection.
    let chain = registry.chain(id)?;
    let leaf_def = registry.get(id)?;

    // Structure merge, root level first so children override.
    let mut methods: IndexMap<String, (ClassId, MethodDef)> = IndexMap::new();
    let mut properties: IndexMap<String, (ClassId, PropertyDef)> = IndexMap::new();
    for level in chain.iter().rev() {
        let def = registry.get(*level)?;
        for method in def.methods {
            methods.insert(method.name.clone(), (*level, method));
        }
        for property in def.properties {
            properties.insert(property.name.clone(), (*level, property));
        }
    }

    let class_decorators = payloads(metadata.get(registry, id, None, None)?);

    // Constructor: leaf only, own metadata only.
    let mut ctor_params = Vec::with_capacity(leaf_def.ctor_params.len());
    for (index, param) in leaf_def.ctor_params.iter().enumerate() {
        let records = metadata.get_own(id, Some("constructor"), Some(index));
        let (ty, declared_on) = effective_type(&records, &param.ty, id);
        let ty = generics::resolve_type(registry, metadata, &ty, declared_on, id)?;
        ctor_params.push(ParameterReflection {
            kind: NodeKind::Parameter,
            name: param.name.clone(),
            decorators: payloads(records),
            classification: ty.classification(),
            ty,
        });
    }

    // The parameter-properties convention recovers constructor-based
    // properties that structural introspection cannot see.
    if class_decorators
        .iter()
        .any(|d| matches!(d, DecoratorPayload::ParameterProperties))
    {
        for param in &leaf_def.ctor_params {
            if !properties.contains_key(&param.name) {
                properties.insert(
                    param.name.clone(),
                    (
                        id,
                        PropertyDef {
                            name: param.name.clone(),
                            ty: param.ty.clone(),
                        },
                    ),
                );
            }
        }
    }

    let mut method_reflections = Vec::with_capacity(methods.len());
    for (owner, def) in methods.values() {
        let reflected = reflect_method(registry, metadata, id, *owner, def)?;
        if !is_ignored(&reflected.decorators) {
            method_reflections.push(reflected);
        }
    }

    let mut property_reflections = Vec::with_capacity(properties.len());
    for (owner, def) in properties.values() {
        let reflected = reflect_property(registry, metadata, id, *owner, def)?;
        if !is_ignored(&reflected.decorators) {
            property_reflections.push(reflected);
        }
    }

    Ok(ClassReflection {
        kind: NodeKind::Class,
        id,
        name: leaf_def.name,
        parent: leaf_def.parent,
        decorators: class_decorators,
        ctor: ConstructorReflection {
            params: ctor_params,
        },
        methods: method_reflections,
        properties: property_reflections,
    })
}

/// Wraps a computed reflection for the cache.
pub(crate) fn reflect_arc(
    registry: &TypeRegistry,
    metadata: &MetadataStore,
    id: ClassId,
) -> ReflectResult<Arc<ClassReflection>> {
    reflect(registry, metadata, id).map(Arc::new)
}
