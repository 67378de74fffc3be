//! Dependency resolution for controller and service instances.
//!
//! The pipeline resolves a controller instance per request through a
//! [`DependencyResolver`]. The default [`Container`] serves registered
//! singletons first and otherwise falls back to the constructor
//! factory recorded in the type registry, so synthesized subclasses
//! instantiate through their parent's constructor logic.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use daedalus_reflect::{ClassId, TypeSpace};

use crate::error::{DaedalusError, DaedalusResult};

/// Resolves class instances for the pipeline.
pub trait DependencyResolver: Send + Sync {
    /// Produces an instance of the given class.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the class cannot be
    /// instantiated.
    fn resolve(&self, space: &TypeSpace, class: ClassId) -> DaedalusResult<Arc<dyn Any + Send + Sync>>;
}

/// Singleton container with a registry-factory fallback.
#[derive(Default)]
pub struct Container {
    singletons: RwLock<HashMap<ClassId, Arc<dyn Any + Send + Sync>>>,
}

impl Container {
    /// Creates an empty container.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a singleton instance for a class. Later resolutions
    /// of the class return this instance.
    pub fn register<T: Send + Sync + 'static>(&self, class: ClassId, instance: T) {
        self.singletons.write().insert(class, Arc::new(instance));
    }

    /// Registers an already shared instance.
    pub fn register_arc(&self, class: ClassId, instance: Arc<dyn Any + Send + Sync>) {
        self.singletons.write().insert(class, instance);
    }
}

impl DependencyResolver for Container {
    fn resolve(
        &self,
        space: &TypeSpace,
        class: ClassId,
    ) -> DaedalusResult<Arc<dyn Any + Send + Sync>> {
        if let Some(instance) = self.singletons.read().get(&class) {
            return Ok(instance.clone());
        }
        match space.registry().factory_of(class) {
            Some(factory) => Ok(factory()),
            None => Err(DaedalusError::configuration(format!(
                "no instance or constructor registered for class `{}`",
                space.registry().name_of(class)
            ))),
        }
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("singletons", &self.singletons.read().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_singleton_wins_over_factory() {
        let space = TypeSpace::new();
        let id = space
            .define("Service")
            .factory(|| 1i32)
            .register()
            .expect("register");

        let container = Container::new();
        container.register(id, 2i32);

        let instance = container.resolve(&space, id).expect("resolve");
        assert_eq!(*instance.downcast::<i32>().expect("downcast"), 2);
    }

    #[test]
    fn test_factory_fallback() {
        let space = TypeSpace::new();
        let id = space
            .define("Service")
            .factory(|| "fresh".to_string())
            .register()
            .expect("register");

        let container = Container::new();
        let instance = container.resolve(&space, id).expect("resolve");
        assert_eq!(*instance.downcast::<String>().expect("downcast"), "fresh");
    }

    #[test]
    fn test_unresolvable_is_configuration_error() {
        let space = TypeSpace::new();
        let id = space.define("Bare").register().expect("register");
        let container = Container::new();
        let err = container.resolve(&space, id).expect_err("should fail");
        assert!(matches!(err, DaedalusError::Configuration { .. }));
    }
}
