//! Typed schema engine.
//!
//! Every resource and property kind declares an ordered attribute schema:
//! expected type, required-ness and an optional constraint, plus an optional
//! cross-field rule. Instances are free-form while being assembled and are
//! validated as a whole when lowered into a manifest.

mod attribute;
mod definition;
mod properties;
pub mod validators;
mod value;

pub use attribute::{Attribute, Constraint, CrossFieldValidator, FieldType, Predicate};
pub use definition::{Schema, SchemaBuilder};
pub use properties::{Properties, Resource};
pub use value::{Value, ValueKind};
