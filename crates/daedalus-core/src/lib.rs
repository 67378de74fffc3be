//! # daedalus-core
//!
//! Core types and traits shared by every Daedalus pipeline stage: the
//! unified error type with its HTTP status mapping, the per-request
//! context, action results and their rendering, dependency resolution,
//! the middleware chain, the concrete action handler type, and the
//! repository contracts.

pub mod context;
pub mod error;
pub mod handler;
pub mod invocation;
pub mod repository;
pub mod resolver;
pub mod result;

pub use context::{Identity, RequestContext, RequestContextBuilder};
pub use error::{DaedalusError, DaedalusResult, ErrorCategory, ValidationIssue};
pub use handler::{action, downcast_action, ActionContext, ActionFn, BoxFuture};
pub use invocation::{Invocation, Middleware, Terminal};
pub use repository::{
    FindOptions, InMemoryRepository, OneToManyRepository, Repository, SortOrder,
};
pub use resolver::{Container, DependencyResolver};
pub use result::{ActionResult, Cookie};
