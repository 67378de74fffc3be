//! # daedalus-bind
//!
//! Parameter binding, structural conversion and two-phase validation
//! for the Daedalus framework. Binding resolves raw values from the
//! request per decorator and convention; conversion coerces them
//! toward the declared parameter types; validation aggregates every
//! issue into one structured 422-class error.

pub mod binder;
pub mod convert;
pub mod validate;

pub use binder::{bind_all, bind_parameter, BindResult, BinderRegistry, CustomBinder};
pub use convert::convert;
pub use validate::{validate_parameters, AsyncValidator, ValidatorRegistry};
