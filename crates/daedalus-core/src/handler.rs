//! Action handlers.
//!
//! Method definitions in the reflection engine carry an opaque handler
//! slot; this module defines the concrete type the pipeline stores in
//! and downcasts out of that slot.

use std::any::Any;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;

use daedalus_reflect::OpaqueHandler;

use crate::context::RequestContext;
use crate::error::DaedalusResult;
use crate::result::ActionResult;

/// Boxed future returned by action handlers.
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// Everything an action receives: the resolved controller instance,
/// the request context, and the bound, validated arguments in
/// declaration order.
pub struct ActionContext {
    /// The controller instance produced by the resolver.
    pub instance: Arc<dyn Any + Send + Sync>,
    /// The request being served.
    pub request: RequestContext,
    /// Bound argument values, one per declared parameter.
    pub args: Vec<Value>,
}

impl ActionContext {
    /// Downcasts the controller instance to its concrete type.
    #[must_use]
    pub fn instance<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.instance.clone().downcast::<T>().ok()
    }

    /// The bound argument at `index`, `Null` when absent.
    #[must_use]
    pub fn arg(&self, index: usize) -> &Value {
        self.args.get(index).unwrap_or(&Value::Null)
    }
}

impl std::fmt::Debug for ActionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionContext")
            .field("args", &self.args)
            .finish()
    }
}

/// The concrete handler type stored in the opaque slot.
pub type ActionFn =
    Arc<dyn Fn(ActionContext) -> BoxFuture<DaedalusResult<ActionResult>> + Send + Sync>;

/// Wraps an async closure into an opaque handler for a method
/// definition.
pub fn action<F, Fut>(f: F) -> OpaqueHandler
where
    F: Fn(ActionContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = DaedalusResult<ActionResult>> + Send + 'static,
{
    let func: ActionFn = Arc::new(move |ctx| Box::pin(f(ctx)));
    Arc::new(func)
}

/// Recovers the concrete handler from the opaque slot. Returns `None`
/// when the slot holds something else.
#[must_use]
pub fn downcast_action(handler: &OpaqueHandler) -> Option<ActionFn> {
    handler.downcast_ref::<ActionFn>().cloned()
}
