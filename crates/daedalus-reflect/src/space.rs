//! The type space: registry, metadata store and reflection cache
//! bundled under one process-scoped handle.
//!
//! A [`TypeSpace`] is created once at startup, written to during
//! module definition (single writer) and read concurrently afterwards.
//! Tests create their own space instead of sharing implicit
//! module-level state; `flush`/`flush_all` invalidate cached
//! reflections explicitly.

use std::sync::Arc;

use dashmap::DashMap;

use crate::builder::ClassBuilder;
use crate::error::ReflectResult;
use crate::generics;
use crate::metadata::MetadataStore;
use crate::registry::TypeRegistry;
use crate::synthesizer;
use crate::types::{ClassId, DataType};
use crate::walker::{self, ClassReflection};

struct SpaceInner {
    registry: TypeRegistry,
    metadata: MetadataStore,
    cache: DashMap<ClassId, Arc<ClassReflection>>,
}

/// Shared handle over the registry, metadata store and reflection
/// cache. Cloning is cheap and all clones observe the same state.
#[derive(Clone)]
pub struct TypeSpace {
    inner: Arc<SpaceInner>,
}

impl Default for TypeSpace {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeSpace {
    /// Creates an empty type space.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SpaceInner {
                registry: TypeRegistry::new(),
                metadata: MetadataStore::new(),
                cache: DashMap::new(),
            }),
        }
    }

    /// Starts defining a class with the given name.
    #[must_use]
    pub fn define(&self, name: &str) -> ClassBuilder<'_> {
        ClassBuilder::new(self, name)
    }

    /// The underlying type-hierarchy table.
    #[must_use]
    pub fn registry(&self) -> &TypeRegistry {
        &self.inner.registry
    }

    /// The underlying decorator record store.
    #[must_use]
    pub fn metadata(&self) -> &MetadataStore {
        &self.inner.metadata
    }

    /// Computes (or returns the cached) reflection graph of a class.
    ///
    /// Repeated calls return the identical `Arc` until the class is
    /// flushed, so callers may rely on pointer equality.
    pub fn reflect(&self, id: ClassId) -> ReflectResult<Arc<ClassReflection>> {
        if let Some(cached) = self.inner.cache.get(&id) {
            return Ok(cached.clone());
        }
        let reflection = walker::reflect_arc(&self.inner.registry, &self.inner.metadata, id)?;
        // A concurrent reflection of the same class may have raced us;
        // both computed the same immutable graph, so either wins.
        let entry = self
            .inner
            .cache
            .entry(id)
            .or_insert_with(|| reflection.clone());
        Ok(entry.clone())
    }

    /// Drops the cached reflection of a single class.
    pub fn flush(&self, id: ClassId) {
        self.inner.cache.remove(&id);
    }

    /// Drops every cached reflection.
    pub fn flush_all(&self) {
        self.inner.cache.clear();
    }

    /// Resolves a symbolic generic type declared on `declaring`
    /// against the concrete `leaf` class.
    pub fn resolve_generic(
        &self,
        symbol: &str,
        declaring: ClassId,
        leaf: ClassId,
    ) -> ReflectResult<DataType> {
        generics::resolve(
            &self.inner.registry,
            &self.inner.metadata,
            symbol,
            declaring,
            leaf,
        )
    }

    /// Registers a synthesized subclass of `parent` bound to the given
    /// generic arguments.
    pub fn synthesize(
        &self,
        parent: ClassId,
        name: &str,
        arguments: Vec<DataType>,
    ) -> ReflectResult<ClassId> {
        synthesizer::synthesize(
            &self.inner.registry,
            &self.inner.metadata,
            parent,
            name,
            arguments,
        )
    }

    /// Returns true if `id` is `ancestor` or transitively extends it.
    #[must_use]
    pub fn is_subclass_of(&self, id: ClassId, ancestor: ClassId) -> bool {
        self.inner.registry.is_subclass_of(id, ancestor)
    }

    /// Looks a class up by name.
    #[must_use]
    pub fn by_name(&self, name: &str) -> Option<ClassId> {
        self.inner.registry.by_name(name)
    }
}

impl std::fmt::Debug for TypeSpace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeSpace")
            .field("classes", &self.inner.registry.len())
            .field("cached_reflections", &self.inner.cache.len())
            .finish()
    }
}
