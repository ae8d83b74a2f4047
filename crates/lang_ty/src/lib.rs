mod complex;
mod generics;
mod parse;
mod transform;
mod unique;

#[cfg(any(test, feature = "proptest_support"))]
pub mod arbitrary;


pub use complex::ComplexType;
pub use generics::{bind_from_parameters, GenericBindings};
pub use parse::TypeParseError;
pub use transform::Qualifier;
pub use unique::{ParamKind, Scope, UniqueType, RESERVED_NAMES};

/// Leading marker of a duck type (`#to_s`): "anything responding to this method".
pub const DUCK_MARKER: char = '#';

/// Name of the placeholder wrapper, `generic<T>`.
pub const GENERIC_TAG_NAME: &str = "generic";
