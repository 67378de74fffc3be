//! Data type descriptors used throughout the reflection graph.
//!
//! Registered classes are identified by [`ClassId`]; member and
//! parameter types are described by [`DataType`], which may be a
//! primitive, a registered class, an array, or an unresolved generic
//! placeholder ([`DataType::Symbol`]) that the walker resolves against
//! generic argument metadata.

use serde::{Deserialize, Serialize};

/// Opaque identity of a registered class in a type space.
///
/// Ids are assigned sequentially at registration time and are stable
/// for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(pub(crate) u32);

impl ClassId {
    /// Returns the index of this class in the registry table.
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Primitive value types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Primitive {
    /// UTF-8 string.
    String,
    /// Numeric value (JSON number).
    Number,
    /// Boolean value.
    Boolean,
}

impl Primitive {
    /// Returns the display name used in conversion error messages.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::String => "String",
            Self::Number => "Number",
            Self::Boolean => "Boolean",
        }
    }
}

/// A resolved or symbolic data type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum DataType {
    /// No type information available.
    #[default]
    Unknown,
    /// A primitive type.
    Primitive(Primitive),
    /// A registered class.
    Class(ClassId),
    /// An array of the inner type.
    Array(Box<DataType>),
    /// A symbolic generic placeholder (e.g. `"T"`), resolved by the
    /// walker against generic argument metadata.
    Symbol(String),
}

/// Coarse classification of a resolved type, used by the binder and
/// the validator to pick a strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeClassification {
    /// A registered class.
    Class,
    /// An array type.
    Array,
    /// A primitive or unknown type.
    Primitive,
}

impl DataType {
    /// Classifies this type for downstream consumers.
    #[must_use]
    pub fn classification(&self) -> TypeClassification {
        match self {
            Self::Class(_) => TypeClassification::Class,
            Self::Array(_) => TypeClassification::Array,
            Self::Unknown | Self::Primitive(_) | Self::Symbol(_) => TypeClassification::Primitive,
        }
    }

    /// Returns true if this type still contains a generic placeholder.
    #[must_use]
    pub fn is_symbolic(&self) -> bool {
        match self {
            Self::Symbol(_) => true,
            Self::Array(inner) => inner.is_symbolic(),
            _ => false,
        }
    }
}

/// Shorthand for `DataType::Primitive(Primitive::String)`.
#[must_use]
pub fn string() -> DataType {
    DataType::Primitive(Primitive::String)
}

/// Shorthand for `DataType::Primitive(Primitive::Number)`.
#[must_use]
pub fn number() -> DataType {
    DataType::Primitive(Primitive::Number)
}

/// Shorthand for `DataType::Primitive(Primitive::Boolean)`.
#[must_use]
pub fn boolean() -> DataType {
    DataType::Primitive(Primitive::Boolean)
}

/// Shorthand for `DataType::Array(..)`.
#[must_use]
pub fn array(inner: DataType) -> DataType {
    DataType::Array(Box::new(inner))
}

/// Shorthand for `DataType::Class(..)`.
#[must_use]
pub fn class(id: ClassId) -> DataType {
    DataType::Class(id)
}

/// Shorthand for `DataType::Symbol(..)`.
#[must_use]
pub fn symbol(name: impl Into<String>) -> DataType {
    DataType::Symbol(name.into())
}
