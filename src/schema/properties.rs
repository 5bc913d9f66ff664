//! Property instances, resources and their lowering into manifest values.
//!
//! Setting an attribute never fails. The whole tree is validated when it is
//! lowered, so a resource can be assembled in any order and checked once.

use indexmap::IndexMap;
use tracing::debug;

use crate::error::SchemaError;
use crate::manifest::{ManifestResource, ManifestValue};
use crate::reference::{Reference, SELF_LINK};

use super::definition::Schema;
use super::value::Value;

/// An insertion-ordered set of attribute values checked against a schema.
#[derive(Debug, Clone)]
pub struct Properties {
    schema: &'static Schema,
    values: IndexMap<String, Value>,
}

impl PartialEq for Properties {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.schema, other.schema) && self.values == other.values
    }
}

impl Properties {
    /// Creates an empty instance of `schema`.
    #[must_use]
    pub fn new(schema: &'static Schema) -> Self {
        Self {
            schema,
            values: IndexMap::new(),
        }
    }

    /// Sets an attribute and returns the instance.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    /// Sets an attribute, replacing any previous value in place.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// The schema this instance is checked against.
    #[must_use]
    pub const fn schema(&self) -> &'static Schema {
        self.schema
    }

    /// Returns the value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Returns true if `key` has been set, whatever its value.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Returns the string stored under `key`.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Returns the integer stored under `key`.
    #[must_use]
    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Value::as_int)
    }

    /// Returns the boolean stored under `key`.
    #[must_use]
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Value::as_bool)
    }

    /// Returns the list stored under `key`.
    #[must_use]
    pub fn get_list(&self, key: &str) -> Option<&[Value]> {
        self.get(key).and_then(Value::as_list)
    }

    /// Returns how many of `keys` are set.
    #[must_use]
    pub fn count_set(&self, keys: &[&str]) -> usize {
        keys.iter().filter(|key| self.contains(key)).count()
    }

    /// Iterates over attribute values in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Number of attributes set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if no attribute is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Validates the whole tree rooted at this instance.
    ///
    /// # Errors
    ///
    /// Returns the first [`SchemaError`] found.
    pub fn validate(&self) -> Result<(), SchemaError> {
        self.validate_at(self.schema.name())
    }

    /// Validates the tree, rooting error paths at `path`.
    ///
    /// Per-field checks run first, then nested instances, then required
    /// attributes, then the cross-field rule.
    pub(crate) fn validate_at(&self, path: &str) -> Result<(), SchemaError> {
        for (key, value) in &self.values {
            self.schema.admit_at(key, value, &join(path, key))?;
        }

        for (key, value) in &self.values {
            validate_nested(value, &join(path, key))?;
        }

        if let Some(missing) = self
            .schema
            .required_attributes()
            .find(|name| !self.values.contains_key(*name))
        {
            return Err(SchemaError::MissingRequiredAttribute {
                kind: self.schema.name().to_string(),
                path: join(path, missing),
            });
        }

        if let Some(validator) = self.schema.validator() {
            validator(self).map_err(|message| SchemaError::SemanticViolation {
                kind: self.schema.name().to_string(),
                path: path.to_string(),
                message,
            })?;
        }

        Ok(())
    }

    /// Validates the tree and lowers it into plain manifest values.
    ///
    /// # Errors
    ///
    /// Returns the first [`SchemaError`] found.
    pub fn to_manifest_value(&self) -> Result<IndexMap<String, ManifestValue>, SchemaError> {
        self.validate()?;
        Ok(self.lower())
    }

    fn lower(&self) -> IndexMap<String, ManifestValue> {
        self.values
            .iter()
            .map(|(key, value)| (key.clone(), lower_value(value)))
            .collect()
    }
}

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}

fn validate_nested(value: &Value, path: &str) -> Result<(), SchemaError> {
    match value {
        Value::Node(node) => node.validate_at(path),
        Value::List(items) => items
            .iter()
            .enumerate()
            .try_for_each(|(index, item)| validate_nested(item, &format!("{path}[{index}]"))),
        Value::Map(map) => map
            .iter()
            .try_for_each(|(key, item)| validate_nested(item, &join(path, key))),
        _ => Ok(()),
    }
}

fn lower_value(value: &Value) -> ManifestValue {
    match value {
        Value::Bool(b) => ManifestValue::Bool(*b),
        Value::Int(i) => ManifestValue::Int(*i),
        Value::Float(x) => ManifestValue::Float(*x),
        Value::String(s) => ManifestValue::String(s.clone()),
        Value::Map(map) => ManifestValue::Map(
            map.iter()
                .map(|(key, item)| (key.clone(), lower_value(item)))
                .collect(),
        ),
        Value::List(items) => ManifestValue::List(items.iter().map(lower_value).collect()),
        Value::Node(node) => ManifestValue::Map(node.lower()),
    }
}

/// A top-level resource: a property instance whose schema has a resource type.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    properties: Properties,
}

impl Resource {
    /// Creates an empty resource of `schema`.
    ///
    /// A property schema is rejected when the resource is lowered.
    #[must_use]
    pub fn new(schema: &'static Schema) -> Self {
        Self {
            properties: Properties::new(schema),
        }
    }

    /// Sets an attribute and returns the resource.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.set(key, value);
        self
    }

    /// Sets an attribute.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.properties.set(key, value);
        self
    }

    /// The resource's attribute values.
    #[must_use]
    pub const fn properties(&self) -> &Properties {
        &self.properties
    }

    /// The resource's schema.
    #[must_use]
    pub const fn schema(&self) -> &'static Schema {
        self.properties.schema()
    }

    /// The resource name, if set.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.properties.get_str("name")
    }

    /// A deferred reference to `attribute` of this resource.
    #[must_use]
    pub fn reference(&self, attribute: &str) -> Reference {
        Reference::to(self.name().unwrap_or_default(), attribute)
    }

    /// A deferred reference to this resource's `selfLink`.
    #[must_use]
    pub fn self_link(&self) -> Reference {
        self.reference(SELF_LINK)
    }

    /// Validates the resource, rooting error paths at its name.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::NotAResource`] for property kinds, otherwise the
    /// first validation error.
    pub fn validate(&self) -> Result<(), SchemaError> {
        let schema = self.schema();
        if !schema.is_resource() {
            return Err(SchemaError::NotAResource {
                kind: schema.name().to_string(),
            });
        }
        let root = self.name().unwrap_or(schema.name());
        self.properties.validate_at(root)
    }

    /// Validates the resource and lowers it into a manifest entry.
    ///
    /// # Errors
    ///
    /// Returns the first validation error.
    pub fn to_manifest(&self) -> Result<ManifestResource, SchemaError> {
        self.validate()?;
        let schema = self.schema();

        let name = self.name().ok_or_else(|| SchemaError::MissingRequiredAttribute {
            kind: schema.name().to_string(),
            path: String::from("name"),
        })?;

        let mut properties = self.properties.lower();
        if !schema.name_in_properties() {
            properties.shift_remove("name");
        }

        debug!("Lowered {} '{name}' ({} attributes)", schema.name(), properties.len());

        Ok(ManifestResource {
            resource_type: schema.resource_type().unwrap_or_default().to_string(),
            name: name.to_string(),
            properties,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Attribute, ValueKind};
    use std::sync::LazyLock;

    static RANGE: LazyLock<Schema> = LazyLock::new(|| {
        Schema::property("Range")
            .required("min", Attribute::int())
            .required("max", Attribute::int())
            .validator(|p| match (p.get_int("min"), p.get_int("max")) {
                (Some(min), Some(max)) if min >= max => Err(String::from("min must be less than max")),
                _ => Ok(()),
            })
            .build()
    });

    static BOX: LazyLock<Schema> = LazyLock::new(|| {
        Schema::resource("Box", "test.v1.box")
            .required("name", Attribute::string())
            .optional("ranges", Attribute::nodes(&RANGE))
            .optional("labels", Attribute::map())
            .optional("tags", Attribute::list(ValueKind::String))
            .build()
    });

    static HIDDEN: LazyLock<Schema> = LazyLock::new(|| {
        Schema::resource("Hidden", "test.v1.hidden")
            .required("name", Attribute::string())
            .optional("zone", Attribute::string())
            .name_outside_properties()
            .build()
    });

    fn range(min: i64, max: i64) -> Properties {
        Properties::new(&RANGE).with("min", min).with("max", max)
    }

    #[test]
    fn test_set_never_fails() {
        let props = Properties::new(&RANGE).with("bogus", true).with("min", "not an int");
        assert_eq!(props.len(), 2);
        assert!(props.validate().is_err());
    }

    #[test]
    fn test_missing_required_attribute() {
        let err = Properties::new(&RANGE).with("min", 1).validate().unwrap_err();
        assert_eq!(
            err,
            SchemaError::MissingRequiredAttribute {
                kind: String::from("Range"),
                path: String::from("Range.max"),
            }
        );
    }

    #[test]
    fn test_cross_field_runs_after_field_checks() {
        let err = range(5, 5).validate().unwrap_err();
        assert!(matches!(err, SchemaError::SemanticViolation { .. }));

        // A type error is reported before the cross-field rule gets a chance.
        let err = Properties::new(&RANGE)
            .with("min", 5)
            .with("max", "5")
            .validate()
            .unwrap_err();
        assert!(matches!(err, SchemaError::TypeMismatch { .. }));
    }

    #[test]
    fn test_nested_error_path() {
        let resource = Resource::new(&BOX)
            .with("name", "web-1")
            .with("ranges", vec![range(1, 2), Properties::new(&RANGE).with("min", 1)]);
        let err = resource.to_manifest().unwrap_err();
        assert!(
            matches!(err, SchemaError::MissingRequiredAttribute { ref path, .. } if path == "web-1.ranges[1].max")
        );
    }

    #[test]
    fn test_lowering_preserves_order() {
        let mut labels = IndexMap::new();
        labels.insert(String::from("zeta"), Value::from("z"));
        labels.insert(String::from("alpha"), Value::from("a"));

        let entry = Resource::new(&BOX)
            .with("name", "box")
            .with("tags", vec!["b", "a"])
            .with("labels", labels)
            .with("ranges", vec![range(1, 2)])
            .to_manifest()
            .unwrap();

        assert_eq!(entry.resource_type, "test.v1.box");
        let keys: Vec<_> = entry.properties.keys().cloned().collect();
        assert_eq!(keys, vec!["name", "tags", "labels", "ranges"]);
        let ManifestValue::Map(labels) = &entry.properties["labels"] else {
            panic!("labels should lower to a map");
        };
        assert_eq!(labels.keys().collect::<Vec<_>>(), vec!["zeta", "alpha"]);
    }

    #[test]
    fn test_name_outside_properties() {
        let entry = Resource::new(&HIDDEN)
            .with("name", "cluster-1")
            .with("zone", "us-central1-b")
            .to_manifest()
            .unwrap();
        assert_eq!(entry.name, "cluster-1");
        assert!(!entry.properties.contains_key("name"));
        assert!(entry.properties.contains_key("zone"));
    }

    #[test]
    fn test_property_kind_is_not_a_resource() {
        let err = Resource::new(&RANGE).with("min", 1).with("max", 2).validate().unwrap_err();
        assert!(matches!(err, SchemaError::NotAResource { .. }));
    }

    #[test]
    fn test_self_link() {
        let resource = Resource::new(&BOX).with("name", "net-1");
        assert_eq!(resource.self_link().to_string(), "$(ref.net-1.selfLink)");
    }
}
