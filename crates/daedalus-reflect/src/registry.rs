//! Explicit type-hierarchy table.
//!
//! The registry replaces language-level runtime reflection with an
//! explicit table of class definitions and parent pointers, written
//! once at startup and walked by the reflection algorithms. A
//! [`ClassDef`] is the raw, decorator-agnostic structural shape of a
//! class; decorators live in the [`crate::metadata::MetadataStore`].

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{ReflectError, ReflectResult};
use crate::types::{ClassId, DataType};

/// Constructor logic for a class: produces a fresh instance.
pub type Factory = Arc<dyn Fn() -> Arc<dyn Any + Send + Sync> + Send + Sync>;

/// Opaque action handler slot on a method definition.
///
/// The reflection engine stores the handler without interpreting it;
/// the request pipeline downcasts it to its concrete action type.
pub type OpaqueHandler = Arc<dyn Any + Send + Sync>;

/// A constructor or method parameter.
#[derive(Debug, Clone)]
pub struct ParamDef {
    /// Parameter name.
    pub name: String,
    /// Declared type.
    pub ty: DataType,
}

/// A method definition.
#[derive(Clone)]
pub struct MethodDef {
    /// Method name.
    pub name: String,
    /// Parameters in declaration order.
    pub params: Vec<ParamDef>,
    /// Declared return type.
    pub return_type: DataType,
    /// Optional action handler invoked by the pipeline.
    pub handler: Option<OpaqueHandler>,
}

impl fmt::Debug for MethodDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDef")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("return_type", &self.return_type)
            .field("handler", &self.handler.is_some())
            .finish()
    }
}

/// A property definition.
#[derive(Debug, Clone)]
pub struct PropertyDef {
    /// Property name.
    pub name: String,
    /// Declared type.
    pub ty: DataType,
}

/// The raw structural definition of a registered class.
#[derive(Clone, Default)]
pub struct ClassDef {
    /// Class name, unique within a registry.
    pub name: String,
    /// Parent class, if any.
    pub parent: Option<ClassId>,
    /// Constructor parameters.
    pub ctor_params: Vec<ParamDef>,
    /// Properties in declaration order.
    pub properties: Vec<PropertyDef>,
    /// Methods in declaration order.
    pub methods: Vec<MethodDef>,
    /// Constructor logic. Synthesized subclasses fall back to the
    /// nearest ancestor factory.
    pub factory: Option<Factory>,
}

impl ClassDef {
    /// Creates an empty definition with the given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Sets the parent class.
    #[must_use]
    pub fn with_parent(mut self, parent: ClassId) -> Self {
        self.parent = Some(parent);
        self
    }
}

impl fmt::Debug for ClassDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassDef")
            .field("name", &self.name)
            .field("parent", &self.parent)
            .field("ctor_params", &self.ctor_params)
            .field("properties", &self.properties)
            .field("methods", &self.methods)
            .field("factory", &self.factory.is_some())
            .finish()
    }
}

/// Process-wide table of class definitions with parent pointers.
#[derive(Default)]
pub struct TypeRegistry {
    classes: RwLock<Vec<ClassDef>>,
    by_name: RwLock<HashMap<String, ClassId>>,
}

impl TypeRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a class definition and returns its id.
    ///
    /// # Errors
    ///
    /// Returns [`ReflectError::DuplicateName`] when the name is taken
    /// and [`ReflectError::UnknownClass`] when the parent id is not
    /// registered.
    pub fn insert(&self, def: ClassDef) -> ReflectResult<ClassId> {
        let mut classes = self.classes.write();
        let mut by_name = self.by_name.write();
        if by_name.contains_key(&def.name) {
            return Err(ReflectError::DuplicateName(def.name));
        }
        if let Some(parent) = def.parent {
            if parent.index() >= classes.len() {
                return Err(ReflectError::UnknownClass(parent));
            }
        }
        let id = ClassId(u32::try_from(classes.len()).unwrap_or(u32::MAX));
        by_name.insert(def.name.clone(), id);
        classes.push(def);
        Ok(id)
    }

    /// Returns a clone of the class definition.
    pub fn get(&self, id: ClassId) -> ReflectResult<ClassDef> {
        self.classes
            .read()
            .get(id.index())
            .cloned()
            .ok_or(ReflectError::UnknownClass(id))
    }

    /// Looks a class up by name.
    #[must_use]
    pub fn by_name(&self, name: &str) -> Option<ClassId> {
        self.by_name.read().get(name).copied()
    }

    /// Returns the class name, or a placeholder for unknown ids.
    #[must_use]
    pub fn name_of(&self, id: ClassId) -> String {
        self.classes
            .read()
            .get(id.index())
            .map_or_else(|| format!("<unknown #{}>", id.0), |def| def.name.clone())
    }

    /// Returns the parent of a class, if any.
    #[must_use]
    pub fn parent_of(&self, id: ClassId) -> Option<ClassId> {
        self.classes.read().get(id.index()).and_then(|d| d.parent)
    }

    /// Returns the inheritance chain from the class (inclusive) to the
    /// root, child first.
    ///
    /// # Errors
    ///
    /// Returns [`ReflectError::CyclicInheritance`] when the parent
    /// pointers form a cycle, so self-referential graphs terminate.
    pub fn chain(&self, id: ClassId) -> ReflectResult<Vec<ClassId>> {
        let classes = self.classes.read();
        let mut chain = Vec::new();
        let mut current = Some(id);
        while let Some(c) = current {
            if chain.contains(&c) {
                return Err(ReflectError::CyclicInheritance(
                    classes
                        .get(c.index())
                        .map_or_else(|| format!("<unknown #{}>", c.0), |d| d.name.clone()),
                ));
            }
            let def = classes
                .get(c.index())
                .ok_or(ReflectError::UnknownClass(c))?;
            chain.push(c);
            current = def.parent;
        }
        Ok(chain)
    }

    /// Returns true if `id` is `ancestor` or transitively extends it.
    #[must_use]
    pub fn is_subclass_of(&self, id: ClassId, ancestor: ClassId) -> bool {
        self.chain(id)
            .map(|chain| chain.contains(&ancestor))
            .unwrap_or(false)
    }

    /// Returns the constructor factory for a class, falling back to
    /// the nearest ancestor (a synthesized subclass runs the parent's
    /// constructor logic).
    #[must_use]
    pub fn factory_of(&self, id: ClassId) -> Option<Factory> {
        let classes = self.classes.read();
        let mut current = Some(id);
        let mut hops = 0usize;
        while let Some(c) = current {
            let def = classes.get(c.index())?;
            if let Some(factory) = &def.factory {
                return Some(factory.clone());
            }
            current = def.parent;
            hops += 1;
            if hops > classes.len() {
                return None;
            }
        }
        None
    }

    /// Number of registered classes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.classes.read().len()
    }

    /// Returns true if no classes are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.classes.read().is_empty()
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("class_count", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_lookup() {
        let registry = TypeRegistry::new();
        let id = registry.insert(ClassDef::new("Animal")).expect("insert");
        assert_eq!(registry.by_name("Animal"), Some(id));
        assert_eq!(registry.name_of(id), "Animal");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let registry = TypeRegistry::new();
        registry.insert(ClassDef::new("Animal")).expect("insert");
        let result = registry.insert(ClassDef::new("Animal"));
        assert!(matches!(result, Err(ReflectError::DuplicateName(_))));
    }

    #[test]
    fn test_chain_and_subclass() {
        let registry = TypeRegistry::new();
        let a = registry.insert(ClassDef::new("A")).expect("a");
        let b = registry
            .insert(ClassDef::new("B").with_parent(a))
            .expect("b");
        let c = registry
            .insert(ClassDef::new("C").with_parent(b))
            .expect("c");

        assert_eq!(registry.chain(c).expect("chain"), vec![c, b, a]);
        assert!(registry.is_subclass_of(c, a));
        assert!(registry.is_subclass_of(c, c));
        assert!(!registry.is_subclass_of(a, c));
    }

    #[test]
    fn test_unknown_parent_rejected() {
        let registry = TypeRegistry::new();
        let result = registry.insert(ClassDef::new("Orphan").with_parent(ClassId(42)));
        assert!(matches!(result, Err(ReflectError::UnknownClass(_))));
    }

    #[test]
    fn test_factory_falls_back_to_ancestor() {
        let registry = TypeRegistry::new();
        let mut base = ClassDef::new("Base");
        base.factory = Some(Arc::new(|| Arc::new(7i32) as Arc<dyn Any + Send + Sync>));
        let base = registry.insert(base).expect("base");
        let child = registry
            .insert(ClassDef::new("Child").with_parent(base))
            .expect("child");

        let factory = registry.factory_of(child).expect("inherited factory");
        let instance = factory();
        assert_eq!(*instance.downcast::<i32>().expect("downcast"), 7);
    }
}
