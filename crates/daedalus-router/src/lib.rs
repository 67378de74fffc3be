//! # daedalus-router
//!
//! Route generation and matching for the Daedalus framework.
//!
//! Routes are generated once at startup from controller reflections
//! (decorator overrides plus naming conventions), analyzed for
//! configuration mistakes, then compiled into anchored regexes.
//! Lookup is first-match-wins in registration order with a memoized
//! `method + path` cache; the route table is immutable for the
//! process lifetime.

pub mod analyzer;
pub mod generator;
pub mod matcher;
pub mod params;
pub mod route;

pub use analyzer::{analyze, RouteIssue};
pub use generator::generate;
pub use matcher::{RouteMatch, Router, RouterError};
pub use params::Params;
pub use route::{method_of, Route};
