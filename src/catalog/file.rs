//! Declarative catalog files.
//!
//! A catalog file names a template type and lists its resources:
//!
//! ```yaml
//! template: networks
//! resources:
//!   - kind: compute.v1.network
//!     properties:
//!       name: "{env}-network"
//!       autoCreateSubnetworks: false
//! ```
//!
//! Nested mappings are bound to the nested schema each attribute declares.
//! Strings get `{project}`, `{env}` and `{deployment}` substituted. A mapping
//! `{"$file": path, "$replace": {from: to}}` is replaced by the contents of a
//! startup script read relative to the catalog file.

use indexmap::IndexMap;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{ConfigError, Result};
use crate::manifest::{ManifestFormat, ManifestValue};
use crate::schema::{FieldType, Properties, Resource, Value, ValueKind};
use crate::template::{ResourceSet, TemplateContext, TemplateSource};

use super::resource_schema;
use super::startup::load_startup_script;

const FILE_KEY: &str = "$file";
const REPLACE_KEY: &str = "$replace";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct CatalogDocument {
    template: String,
    #[serde(default)]
    resources: Vec<CatalogEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct CatalogEntry {
    kind: String,
    #[serde(default)]
    properties: IndexMap<String, ManifestValue>,
}

/// A template source read from a YAML or JSON catalog file.
#[derive(Debug, Clone)]
pub struct CatalogFile {
    location: String,
    base_dir: PathBuf,
    document: CatalogDocument,
}

impl CatalogFile {
    /// Loads a catalog file; `.json` files are parsed as JSON, anything else as YAML.
    ///
    /// # Errors
    ///
    /// Returns an error if the file does not exist or cannot be parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            }
            .into());
        }

        info!("Loading catalog from {}", path.display());
        let content = std::fs::read_to_string(path)?;
        let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let mut catalog = Self::parse(&content, ManifestFormat::from_path(path), base_dir)?;
        catalog.location = path.display().to_string();
        Ok(catalog)
    }

    /// Parses catalog text; `$file` paths resolve against `base_dir`.
    ///
    /// # Errors
    ///
    /// Returns a parse error if the text is not a catalog document.
    pub fn parse(content: &str, format: ManifestFormat, base_dir: impl Into<PathBuf>) -> Result<Self> {
        let location = format!("{format} catalog");
        let parsed = match format {
            ManifestFormat::Yaml => serde_yaml::from_str::<CatalogDocument>(content).map_err(|e| e.to_string()),
            ManifestFormat::Json => serde_json::from_str::<CatalogDocument>(content).map_err(|e| e.to_string()),
        };
        let document = parsed.map_err(|message| ConfigError::parse(message, location.clone()))?;

        debug!(
            "Parsed catalog for template '{}' with {} entries",
            document.template,
            document.resources.len()
        );

        Ok(Self {
            location,
            base_dir: base_dir.into(),
            document,
        })
    }

    /// Number of resource entries in the file.
    #[must_use]
    pub fn len(&self) -> usize {
        self.document.resources.len()
    }

    /// Returns true if the file lists no resources.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.document.resources.is_empty()
    }
}

impl TemplateSource for CatalogFile {
    fn template_type(&self) -> &str {
        &self.document.template
    }

    fn configure(&self, context: &TemplateContext, resources: &mut ResourceSet) -> Result<()> {
        let deployment = format!("{}-{}", context.environment, self.document.template);
        let binder = Binder {
            substitutions: [
                ("{project}", context.project.as_str()),
                ("{env}", context.environment.as_str()),
                ("{deployment}", deployment.as_str()),
            ],
            base_dir: &self.base_dir,
        };

        for (index, entry) in self.document.resources.iter().enumerate() {
            let location = format!("{} resources[{index}]", self.location);
            let schema = resource_schema(&entry.kind).ok_or_else(|| ConfigError::UnknownResourceKind {
                kind: entry.kind.clone(),
                location: location.clone(),
            })?;

            let mut resource = Resource::new(schema);
            for (key, raw) in &entry.properties {
                let field = schema.attribute(key).map(|attribute| attribute.field_type);
                let value = binder.bind(field, raw, &format!("{location}.{key}"))?;
                resource.set(key.as_str(), value);
            }
            debug!("Bound {} '{}'", schema.name(), resource.name().unwrap_or("<unnamed>"));
            resources.add(resource);
        }

        Ok(())
    }
}

struct Binder<'a> {
    substitutions: [(&'static str, &'a str); 3],
    base_dir: &'a Path,
}

impl Binder<'_> {
    fn bind(&self, field: Option<FieldType>, raw: &ManifestValue, location: &str) -> Result<Value> {
        match (field, raw) {
            (Some(FieldType::ListOf(kind)), ManifestValue::List(items)) => items
                .iter()
                .enumerate()
                .map(|(index, item)| self.bind_kind(Some(kind), item, &format!("{location}[{index}]")))
                .collect::<Result<Vec<_>>>()
                .map(Value::List),
            (Some(FieldType::One(kind)), raw) => self.bind_kind(Some(kind), raw, location),
            // Left as-is so validation reports the mismatch.
            _ => self.bind_kind(None, raw, location),
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn bind_kind(&self, kind: Option<ValueKind>, raw: &ManifestValue, location: &str) -> Result<Value> {
        match (kind, raw) {
            (_, ManifestValue::Map(map)) if map.contains_key(FILE_KEY) => self.load_script(map, location),
            (Some(ValueKind::Node(schema)), ManifestValue::Map(map)) => {
                let mut node = Properties::new(schema);
                for (key, item) in map {
                    let field = schema.attribute(key).map(|attribute| attribute.field_type);
                    node.set(key.as_str(), self.bind(field, item, &format!("{location}.{key}"))?);
                }
                Ok(Value::Node(node))
            }
            (Some(ValueKind::Float), ManifestValue::Int(i)) => Ok(Value::Float(*i as f64)),
            (_, ManifestValue::Bool(b)) => Ok(Value::Bool(*b)),
            (_, ManifestValue::Int(i)) => Ok(Value::Int(*i)),
            (_, ManifestValue::Float(x)) => Ok(Value::Float(*x)),
            (_, ManifestValue::String(s)) => Ok(Value::String(self.substitute(s))),
            (_, ManifestValue::List(items)) => items
                .iter()
                .enumerate()
                .map(|(index, item)| self.bind_kind(None, item, &format!("{location}[{index}]")))
                .collect::<Result<Vec<_>>>()
                .map(Value::List),
            (_, ManifestValue::Map(map)) => {
                let mut bound = IndexMap::with_capacity(map.len());
                for (key, item) in map {
                    bound.insert(key.clone(), self.bind_kind(None, item, &format!("{location}.{key}"))?);
                }
                Ok(Value::Map(bound))
            }
        }
    }

    fn substitute(&self, text: &str) -> String {
        self.substitutions
            .iter()
            .fold(text.to_string(), |acc, (from, to)| acc.replace(from, to))
    }

    fn load_script(&self, map: &IndexMap<String, ManifestValue>, location: &str) -> Result<Value> {
        let Some(ManifestValue::String(file)) = map.get(FILE_KEY) else {
            return Err(ConfigError::parse(format!("{FILE_KEY} must be a string path"), location).into());
        };

        let mut replacements = Vec::new();
        match map.get(REPLACE_KEY) {
            None => {}
            Some(ManifestValue::Map(pairs)) => {
                for (from, to) in pairs {
                    let ManifestValue::String(to) = to else {
                        return Err(ConfigError::parse(
                            format!("{REPLACE_KEY} value for '{from}' must be a string"),
                            location,
                        )
                        .into());
                    };
                    replacements.push((from.clone(), self.substitute(to)));
                }
            }
            Some(_) => {
                return Err(ConfigError::parse(format!("{REPLACE_KEY} must be a mapping"), location).into());
            }
        }

        let path = self.base_dir.join(self.substitute(file));
        load_startup_script(path, replacements).map(Value::String)
    }
}
