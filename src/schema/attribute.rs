//! Attribute declarations: expected type, required-ness and constraint.

use std::fmt;

use super::definition::Schema;
use super::properties::Properties;
use super::value::{Value, ValueKind};

/// Cross-field rule run after every per-field check has passed.
///
/// Returns a human-readable explanation on failure.
pub type CrossFieldValidator = fn(&Properties) -> std::result::Result<(), String>;

/// Declared type of an attribute.
#[derive(Debug, Clone, Copy)]
pub enum FieldType {
    /// A single value of the kind.
    One(ValueKind),
    /// A list whose every element is of the kind.
    ListOf(ValueKind),
}

impl FieldType {
    /// Returns the kind of the value or of the list elements.
    #[must_use]
    pub const fn kind(&self) -> ValueKind {
        match self {
            Self::One(kind) | Self::ListOf(kind) => *kind,
        }
    }

    /// Returns the name used in error messages.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::One(kind) => kind.describe().to_string(),
            Self::ListOf(kind) => format!("list of {}", kind.describe()),
        }
    }
}

/// A named predicate over a single value.
#[derive(Clone, Copy)]
pub struct Predicate {
    /// Name shown when the predicate rejects a value.
    pub name: &'static str,
    /// The check itself.
    pub check: fn(&Value) -> bool,
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Predicate").field(&self.name).finish()
    }
}

/// A constraint on an attribute's value.
#[derive(Debug, Clone)]
pub enum Constraint {
    /// The value must be one of these.
    OneOf(Vec<Value>),
    /// The integer must lie in `min..=max`.
    Range {
        /// Smallest allowed value.
        min: i64,
        /// Largest allowed value.
        max: i64,
    },
    /// The value must satisfy the predicate.
    Predicate(Predicate),
}

impl Constraint {
    /// Returns true if `value` satisfies the constraint.
    #[must_use]
    pub fn allows(&self, value: &Value) -> bool {
        match self {
            Self::OneOf(allowed) => allowed.contains(value),
            Self::Range { min, max } => value.as_int().is_some_and(|v| (*min..=*max).contains(&v)),
            Self::Predicate(predicate) => (predicate.check)(value),
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OneOf(allowed) => write!(f, "one of {}", Value::List(allowed.clone())),
            Self::Range { min, max } => write!(f, "a value in range({min}, {max})"),
            Self::Predicate(predicate) => write!(f, "a valid {}", predicate.name),
        }
    }
}

/// The declaration of a single attribute.
#[derive(Debug, Clone)]
pub struct Attribute {
    /// Expected type.
    pub field_type: FieldType,
    /// Whether validation fails when the attribute is absent.
    pub required: bool,
    /// Optional constraint, applied per element for lists.
    pub constraint: Option<Constraint>,
}

impl Attribute {
    /// Declares an attribute of the given type.
    #[must_use]
    pub const fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            required: false,
            constraint: None,
        }
    }

    /// A `bool` attribute.
    #[must_use]
    pub const fn boolean() -> Self {
        Self::new(FieldType::One(ValueKind::Bool))
    }

    /// An `int` attribute.
    #[must_use]
    pub const fn int() -> Self {
        Self::new(FieldType::One(ValueKind::Int))
    }

    /// A `float` attribute.
    #[must_use]
    pub const fn float() -> Self {
        Self::new(FieldType::One(ValueKind::Float))
    }

    /// A `string` attribute.
    #[must_use]
    pub const fn string() -> Self {
        Self::new(FieldType::One(ValueKind::String))
    }

    /// A free-form `map` attribute.
    #[must_use]
    pub const fn map() -> Self {
        Self::new(FieldType::One(ValueKind::Map))
    }

    /// A nested instance of `schema`.
    #[must_use]
    pub const fn node(schema: &'static Schema) -> Self {
        Self::new(FieldType::One(ValueKind::Node(schema)))
    }

    /// A list of values of `kind`.
    #[must_use]
    pub const fn list(kind: ValueKind) -> Self {
        Self::new(FieldType::ListOf(kind))
    }

    /// A list of nested instances of `schema`.
    #[must_use]
    pub const fn nodes(schema: &'static Schema) -> Self {
        Self::list(ValueKind::Node(schema))
    }

    /// Restricts the value to an enumerated set.
    #[must_use]
    pub fn one_of<I, V>(mut self, allowed: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.constraint = Some(Constraint::OneOf(allowed.into_iter().map(Into::into).collect()));
        self
    }

    /// Restricts the integer to `min..=max`.
    #[must_use]
    pub fn range(mut self, min: i64, max: i64) -> Self {
        self.constraint = Some(Constraint::Range { min, max });
        self
    }

    /// Restricts the value to those accepted by `predicate`.
    #[must_use]
    pub fn check(mut self, predicate: Predicate) -> Self {
        self.constraint = Some(Constraint::Predicate(predicate));
        self
    }
}
