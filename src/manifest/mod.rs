//! Manifest documents and their text renderings.
//!
//! A manifest is the plain, ordered lowering of a validated template:
//! `{resources: [{type, name, properties}]}`. It renders to YAML or JSON and
//! parses back from either without loss.

mod hash;

pub use hash::ManifestHasher;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::error::{ConfigError, Result, StratosphereError};

/// A plain manifest value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ManifestValue {
    /// Boolean.
    Bool(bool),
    /// Integer.
    Int(i64),
    /// Floating point number.
    Float(f64),
    /// String.
    String(String),
    /// Ordered list.
    List(Vec<ManifestValue>),
    /// Ordered mapping.
    Map(IndexMap<String, ManifestValue>),
}

/// One top-level manifest entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestResource {
    /// Resource type discriminator, e.g. `compute.v1.network`.
    #[serde(rename = "type")]
    pub resource_type: String,
    /// Resource name.
    pub name: String,
    /// Lowered attribute values.
    #[serde(default)]
    pub properties: IndexMap<String, ManifestValue>,
}

/// A whole manifest document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// Resources in template order.
    #[serde(default)]
    pub resources: Vec<ManifestResource>,
}

/// Text format of a rendered manifest.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ManifestFormat {
    /// YAML (the remote service's native format).
    #[default]
    Yaml,
    /// Pretty-printed JSON.
    Json,
}

impl ManifestFormat {
    /// Guesses the format from a file extension, defaulting to YAML.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Yaml,
        }
    }
}

impl fmt::Display for ManifestFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Yaml => write!(f, "yaml"),
            Self::Json => write!(f, "json"),
        }
    }
}

impl std::str::FromStr for ManifestFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "yaml" | "yml" => Ok(Self::Yaml),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::validation(
                format!("unknown manifest format '{other}', expected yaml or json"),
                "format",
            )),
        }
    }
}

impl Manifest {
    /// Creates a manifest from resources in order.
    #[must_use]
    pub const fn new(resources: Vec<ManifestResource>) -> Self {
        Self { resources }
    }

    /// Returns true if the manifest holds no resources.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Renders the manifest as text.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render(&self, format: ManifestFormat) -> Result<String> {
        match format {
            ManifestFormat::Yaml => serde_yaml::to_string(self)
                .map_err(|e| StratosphereError::internal(format!("Failed to render YAML manifest: {e}"))),
            ManifestFormat::Json => serde_json::to_string_pretty(self)
                .map(|text| text + "\n")
                .map_err(|e| StratosphereError::internal(format!("Failed to render JSON manifest: {e}"))),
        }
    }

    /// Parses manifest text.
    ///
    /// # Errors
    ///
    /// Returns a parse error if the text is not a manifest in `format`.
    pub fn parse(content: &str, format: ManifestFormat) -> Result<Self> {
        let parsed = match format {
            ManifestFormat::Yaml => serde_yaml::from_str(content).map_err(|e| e.to_string()),
            ManifestFormat::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
        };
        parsed.map_err(|message| ConfigError::parse(message, format!("{format} manifest")).into())
    }

    /// SHA-256 digest (hex) of the manifest rendered in `format`.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    pub fn digest(&self, format: ManifestFormat) -> Result<String> {
        Ok(ManifestHasher::new().hash_text(&self.render(format)?))
    }
}
