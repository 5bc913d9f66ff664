//! Per-kind schemas and the per-field admission check.

use indexmap::IndexMap;
use std::fmt;
use tracing::trace;

use crate::error::SchemaError;

use super::attribute::{Attribute, CrossFieldValidator, FieldType};
use super::value::{Value, ValueKind};

/// The attribute schema of a resource or property kind.
///
/// Schemas are built once into `LazyLock` statics and shared by every
/// instance of the kind.
pub struct Schema {
    name: &'static str,
    resource_type: Option<&'static str>,
    attributes: IndexMap<&'static str, Attribute>,
    validator: Option<CrossFieldValidator>,
    name_in_properties: bool,
}

/// Builder for [`Schema`].
pub struct SchemaBuilder {
    schema: Schema,
}

impl Schema {
    /// Starts a schema for a nested property kind.
    #[must_use]
    pub fn property(name: &'static str) -> SchemaBuilder {
        SchemaBuilder {
            schema: Self {
                name,
                resource_type: None,
                attributes: IndexMap::new(),
                validator: None,
                name_in_properties: true,
            },
        }
    }

    /// Starts a schema for a top-level resource kind.
    #[must_use]
    pub fn resource(name: &'static str, resource_type: &'static str) -> SchemaBuilder {
        let mut builder = Self::property(name);
        builder.schema.resource_type = Some(resource_type);
        builder
    }

    /// Kind name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// The manifest `type` discriminator, for resource kinds only.
    #[must_use]
    pub const fn resource_type(&self) -> Option<&'static str> {
        self.resource_type
    }

    /// Returns true if this schema describes a top-level resource kind.
    #[must_use]
    pub const fn is_resource(&self) -> bool {
        self.resource_type.is_some()
    }

    /// Returns true if `name` is emitted inside `properties` as well.
    #[must_use]
    pub const fn name_in_properties(&self) -> bool {
        self.name_in_properties
    }

    /// Looks up an attribute declaration.
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&Attribute> {
        self.attributes.get(key)
    }

    /// Iterates declared attributes in declaration order.
    pub fn attributes(&self) -> impl Iterator<Item = (&'static str, &Attribute)> {
        self.attributes.iter().map(|(name, attribute)| (*name, attribute))
    }

    /// Iterates the names of required attributes in declaration order.
    pub fn required_attributes(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.attributes
            .iter()
            .filter(|(_, attribute)| attribute.required)
            .map(|(name, _)| *name)
    }

    /// The cross-field validator, if the kind declares one.
    #[must_use]
    pub const fn validator(&self) -> Option<CrossFieldValidator> {
        self.validator
    }

    /// Decides whether `value` may be stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns the first violation found: unknown attribute, type mismatch or
    /// constraint violation.
    pub fn admit(&self, key: &str, value: &Value) -> Result<(), SchemaError> {
        self.admit_at(key, value, key)
    }

    /// Same as [`Schema::admit`], reporting violations under `path`.
    pub(crate) fn admit_at(&self, key: &str, value: &Value, path: &str) -> Result<(), SchemaError> {
        let Some(attribute) = self.attributes.get(key) else {
            return Err(SchemaError::UnknownAttribute {
                kind: self.name.to_string(),
                path: path.to_string(),
            });
        };

        trace!("Admitting {}.{key} = {value}", self.name);

        match attribute.field_type {
            FieldType::One(kind) => {
                self.check_kind(kind, value, path, attribute)?;
                self.check_constraint(attribute, value, path)
            }
            FieldType::ListOf(kind) => {
                let Value::List(items) = value else {
                    return Err(self.mismatch(path, &attribute.field_type.describe(), value));
                };
                for (index, item) in items.iter().enumerate() {
                    let item_path = format!("{path}[{index}]");
                    self.check_kind(kind, item, &item_path, attribute)?;
                    self.check_constraint(attribute, item, &item_path)?;
                }
                Ok(())
            }
        }
    }

    fn check_kind(
        &self,
        kind: ValueKind,
        value: &Value,
        path: &str,
        attribute: &Attribute,
    ) -> Result<(), SchemaError> {
        if kind.matches(value) {
            return Ok(());
        }
        let expected = match attribute.field_type {
            FieldType::One(_) => kind.describe().to_string(),
            FieldType::ListOf(_) => format!("{} (in {})", kind.describe(), attribute.field_type.describe()),
        };
        Err(self.mismatch(path, &expected, value))
    }

    fn check_constraint(&self, attribute: &Attribute, value: &Value, path: &str) -> Result<(), SchemaError> {
        match &attribute.constraint {
            Some(constraint) if !constraint.allows(value) => Err(SchemaError::ConstraintViolation {
                kind: self.name.to_string(),
                path: path.to_string(),
                value: value.to_string(),
                constraint: constraint.to_string(),
            }),
            _ => Ok(()),
        }
    }

    fn mismatch(&self, path: &str, expected: &str, value: &Value) -> SchemaError {
        SchemaError::TypeMismatch {
            kind: self.name.to_string(),
            path: path.to_string(),
            expected: expected.to_string(),
            actual: value.type_name().to_string(),
        }
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("name", &self.name)
            .field("resource_type", &self.resource_type)
            .field("attributes", &self.attributes.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl SchemaBuilder {
    /// Declares a required attribute.
    #[must_use]
    pub fn required(mut self, name: &'static str, mut attribute: Attribute) -> Self {
        attribute.required = true;
        self.schema.attributes.insert(name, attribute);
        self
    }

    /// Declares an optional attribute.
    #[must_use]
    pub fn optional(mut self, name: &'static str, attribute: Attribute) -> Self {
        self.schema.attributes.insert(name, attribute);
        self
    }

    /// Sets the cross-field validator.
    #[must_use]
    pub fn validator(mut self, validator: CrossFieldValidator) -> Self {
        self.schema.validator = Some(validator);
        self
    }

    /// Keeps `name` out of the emitted `properties` mapping.
    #[must_use]
    pub fn name_outside_properties(mut self) -> Self {
        self.schema.name_in_properties = false;
        self
    }

    /// Finishes the schema.
    #[must_use]
    pub fn build(self) -> Schema {
        self.schema
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::LazyLock;

    static ALLOWED: LazyLock<Schema> = LazyLock::new(|| {
        Schema::property("Allowed")
            .required("IPProtocol", Attribute::string().one_of(["tcp", "udp", "icmp"]))
            .optional("ports", Attribute::list(ValueKind::String))
            .build()
    });

    #[test]
    fn test_admit_unknown_attribute() {
        let err = ALLOWED.admit("protocol", &Value::from("tcp")).unwrap_err();
        assert!(matches!(err, SchemaError::UnknownAttribute { ref path, .. } if path == "protocol"));
    }

    #[test]
    fn test_admit_type_mismatch() {
        let err = ALLOWED.admit("IPProtocol", &Value::Int(6)).unwrap_err();
        assert_eq!(
            err,
            SchemaError::TypeMismatch {
                kind: String::from("Allowed"),
                path: String::from("IPProtocol"),
                expected: String::from("string"),
                actual: String::from("int"),
            }
        );
    }

    #[test]
    fn test_admit_list_element_type() {
        let err = ALLOWED
            .admit("ports", &Value::List(vec![Value::from("80"), Value::Int(443)]))
            .unwrap_err();
        assert!(matches!(err, SchemaError::TypeMismatch { ref path, .. } if path == "ports[1]"));

        let err = ALLOWED.admit("ports", &Value::from("80")).unwrap_err();
        assert!(matches!(err, SchemaError::TypeMismatch { ref expected, .. } if expected == "list of string"));
    }

    #[test]
    fn test_admit_constraint_violation() {
        let err = ALLOWED.admit("IPProtocol", &Value::from("tcpx")).unwrap_err();
        assert!(matches!(err, SchemaError::ConstraintViolation { ref value, .. } if value == "'tcpx'"));
        assert!(ALLOWED.admit("IPProtocol", &Value::from("tcp")).is_ok());
    }

    #[test]
    fn test_required_attributes_in_order() {
        let required: Vec<_> = ALLOWED.required_attributes().collect();
        assert_eq!(required, vec!["IPProtocol"]);
        assert!(!ALLOWED.is_resource());
    }
}
