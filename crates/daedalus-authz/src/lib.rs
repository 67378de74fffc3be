//! # daedalus-authz
//!
//! Authorization for the Daedalus pipeline. Route-level access
//! decorators are evaluated first (`Public` short-circuits to allow,
//! a missing identity fails fast, and the declared rules pass with OR
//! semantics); parameter and nested-model decorators are then checked
//! recursively, aggregating every denied path into a single failure.

pub mod engine;
pub mod registry;

pub use engine::{authorize_parameters, authorize_route};
pub use registry::{Authorizer, AuthorizerRegistry, EntityPolicy};
