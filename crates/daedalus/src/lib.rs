//! # Daedalus
//!
//! **Metadata-driven web framework: explicit reflection, routing,
//! binding, validation and authorization**
//!
//! Daedalus replaces language-level decorators and runtime type
//! reflection with an explicit, process-scoped metadata engine:
//!
//! - **Reflection engine** – classes, members and decorators are
//!   registered through a fluent builder into a [`TypeSpace`]; the
//!   walker merges structure and metadata across inheritance chains,
//!   resolves generic type parameters and caches immutable
//!   reflection graphs
//! - **Routing** – decorator overrides plus naming conventions
//!   generate a first-match-wins regex route table, analyzed for
//!   configuration mistakes at startup
//! - **Pipeline** – per request: middleware chain, parameter binding,
//!   conversion and validation, route- and parameter-level
//!   authorization, dependency resolution, action invocation
//! - **Generic controllers** – one CRUD template, many entity-bound
//!   classes synthesized at startup
//!
//! ## Quick start
//!
//! ```rust
//! use std::sync::Arc;
//! use daedalus::prelude::*;
//! use daedalus::decorate::route;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> DaedalusResult<()> {
//! let space = TypeSpace::new();
//! let animals = space
//!     .define("AnimalController")
//!     .factory(|| ())
//!     .method("get", |m| {
//!         m.param("id", daedalus::number())
//!             .decorate(route::get(Some(":id")))
//!             .handler(action(|ctx: ActionContext| async move {
//!                 Ok(ActionResult::from_body(ctx.arg(0).clone()))
//!             }))
//!     })
//!     .register()?;
//!
//! let app = Application::builder(space).controller(animals).build()?;
//! let request = http::Request::get("/animal/41")
//!     .body(bytes::Bytes::new())
//!     .expect("request");
//! let response = app.handle(request).await;
//! assert_eq!(response.status(), http::StatusCode::OK);
//! # Ok(())
//! # }
//! ```

pub mod action;
pub mod app;
pub mod crud;

// Re-export the subsystem crates.
pub use daedalus_authz as authz;
pub use daedalus_bind as bind;
pub use daedalus_core as core;
pub use daedalus_reflect as reflect;
pub use daedalus_router as router;

pub use action::{ActionInvocation, NotFoundInvocation};
pub use app::{Application, ApplicationBuilder, IdentityProvider};
pub use crud::{bind_entity, define_template, CrudController};

pub use daedalus_reflect::{
    array, boolean, class, decorate, number, string, symbol, ClassId, DataType, TypeSpace,
};

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust
/// use daedalus::prelude::*;
/// ```
pub mod prelude {
    pub use daedalus_core::{
        action, ActionContext, ActionResult, Container, DaedalusError, DaedalusResult, Identity,
        Invocation, Middleware, RequestContext, Terminal, ValidationIssue,
    };

    pub use daedalus_reflect::{decorate, ClassId, DataType, TypeSpace};

    pub use daedalus_bind::{BinderRegistry, ValidatorRegistry};

    pub use daedalus_authz::AuthorizerRegistry;

    pub use crate::app::{Application, ApplicationBuilder};
    pub use crate::crud::{bind_entity, define_template, CrudController};
}
