//! Templates: one deployment unit's ordered set of resources.
//!
//! A template is built from a [`TemplateSource`] that populates its
//! resources. The source runs at most once, on the first render; later renders
//! reuse the cached manifest text.

use std::collections::HashSet;
use tracing::{debug, info};

use crate::error::{Result, SchemaError};
use crate::manifest::{Manifest, ManifestFormat, ManifestHasher};
use crate::schema::Resource;

/// Project and environment a template is rendered for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateContext {
    /// Provisioning project id.
    pub project: String,
    /// Environment name, used as the deployment name prefix.
    pub environment: String,
}

impl TemplateContext {
    /// Creates a new context.
    #[must_use]
    pub fn new(project: impl Into<String>, environment: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            environment: environment.into(),
        }
    }
}

/// Supplies the resources of a template.
pub trait TemplateSource {
    /// Template type, the suffix of the deployment name.
    fn template_type(&self) -> &str;

    /// Appends this template's resources.
    ///
    /// # Errors
    ///
    /// Returns an error if the resources cannot be built.
    fn configure(&self, context: &TemplateContext, resources: &mut ResourceSet) -> Result<()>;
}

/// Append-only collection handed to [`TemplateSource::configure`].
#[derive(Debug, Default)]
pub struct ResourceSet {
    resources: Vec<Resource>,
}

impl ResourceSet {
    /// Appends a resource.
    pub fn add(&mut self, resource: Resource) -> &mut Self {
        self.resources.push(resource);
        self
    }

    /// Number of resources added so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Returns true if nothing was added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

/// A named, ordered collection of resources for one deployment.
pub struct Template {
    context: TemplateContext,
    name: String,
    source: Box<dyn TemplateSource>,
    format: ManifestFormat,
    resources: Vec<Resource>,
    configured: bool,
    rendered: Option<String>,
}

impl Template {
    /// Creates a template; the source is not run yet.
    #[must_use]
    pub fn new(context: TemplateContext, source: impl TemplateSource + 'static) -> Self {
        let name = format!("{}-{}", context.environment, source.template_type());
        Self {
            context,
            name,
            source: Box::new(source),
            format: ManifestFormat::default(),
            resources: Vec::new(),
            configured: false,
            rendered: None,
        }
    }

    /// Sets the manifest text format.
    #[must_use]
    pub const fn with_format(mut self, format: ManifestFormat) -> Self {
        self.format = format;
        self
    }

    /// Deployment name, `<env>-<templateType>`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Project and environment.
    #[must_use]
    pub const fn context(&self) -> &TemplateContext {
        &self.context
    }

    /// Manifest text format.
    #[must_use]
    pub const fn format(&self) -> ManifestFormat {
        self.format
    }

    /// Deployment description sent with create and update requests.
    #[must_use]
    pub fn description(&self) -> String {
        format!("project: {}, name: {}", self.context.project, self.name)
    }

    /// Returns true once the source has run.
    #[must_use]
    pub const fn is_configured(&self) -> bool {
        self.configured
    }

    /// Resources in insertion order (empty until configured).
    #[must_use]
    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    /// Runs the source if it has not run yet.
    ///
    /// # Errors
    ///
    /// Returns the source's error; the template stays unconfigured.
    pub fn configure(&mut self) -> Result<()> {
        if self.configured {
            return Ok(());
        }

        debug!("Configuring template {}", self.name);
        let mut set = ResourceSet::default();
        self.source.configure(&self.context, &mut set)?;
        debug!("Template {} configured with {} resources", self.name, set.len());

        self.resources = set.resources;
        self.configured = true;
        Ok(())
    }

    /// Configures the template and lowers every resource.
    ///
    /// # Errors
    ///
    /// Returns the first validation error, or [`SchemaError::DuplicateResource`]
    /// if two resources share a name.
    pub fn manifest(&mut self) -> Result<Manifest> {
        self.configure()?;

        let mut seen = HashSet::new();
        let mut entries = Vec::with_capacity(self.resources.len());
        for resource in &self.resources {
            let entry = resource.to_manifest()?;
            if !seen.insert(entry.name.clone()) {
                return Err(SchemaError::DuplicateResource { name: entry.name }.into());
            }
            entries.push(entry);
        }
        Ok(Manifest::new(entries))
    }

    /// Renders the manifest text, caching it.
    ///
    /// # Errors
    ///
    /// Returns the first validation or rendering error.
    pub fn render(&mut self) -> Result<&str> {
        if self.rendered.is_none() {
            let text = self.manifest()?.render(self.format)?;
            let digest = ManifestHasher::new().hash_text(&text);
            info!(
                "Rendered template {} ({} resources, digest {})",
                self.name,
                self.resources.len(),
                ManifestHasher::short_hash(&digest)
            );
            self.rendered = Some(text);
        }
        Ok(self.rendered.as_deref().unwrap_or_default())
    }
}

impl std::fmt::Debug for Template {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Template")
            .field("name", &self.name)
            .field("context", &self.context)
            .field("format", &self.format)
            .field("configured", &self.configured)
            .field("resources", &self.resources.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::compute;
    use std::cell::Cell;
    use std::rc::Rc;

    struct Empty;

    impl TemplateSource for Empty {
        fn template_type(&self) -> &str {
            "empty"
        }

        fn configure(&self, _: &TemplateContext, _: &mut ResourceSet) -> Result<()> {
            Ok(())
        }
    }

    struct Networks {
        calls: Rc<Cell<u32>>,
        duplicate: bool,
    }

    impl TemplateSource for Networks {
        fn template_type(&self) -> &str {
            "networks"
        }

        fn configure(&self, context: &TemplateContext, resources: &mut ResourceSet) -> Result<()> {
            self.calls.set(self.calls.get() + 1);
            let name = format!("{}-net", context.environment);
            resources.add(
                Resource::new(&compute::NETWORK)
                    .with("name", name.as_str())
                    .with("autoCreateSubnetworks", false),
            );
            if self.duplicate {
                resources.add(Resource::new(&compute::NETWORK).with("name", name));
            }
            Ok(())
        }
    }

    fn context() -> TemplateContext {
        TemplateContext::new("my-project", "dev")
    }

    #[test]
    fn test_empty_template_renders_empty_resources() {
        let mut template = Template::new(context(), Empty);
        assert_eq!(template.name(), "dev-empty");
        assert_eq!(template.render().unwrap().trim(), "resources: []");
    }

    #[test]
    fn test_configure_runs_once() {
        let calls = Rc::new(Cell::new(0));
        let mut template = Template::new(
            context(),
            Networks {
                calls: Rc::clone(&calls),
                duplicate: false,
            },
        );
        assert!(template.resources().is_empty());

        let first = template.render().unwrap().to_string();
        let second = template.render().unwrap().to_string();
        template.configure().unwrap();

        assert_eq!(first, second);
        assert_eq!(calls.get(), 1);
        assert_eq!(template.resources().len(), 1);
        assert!(first.contains("compute.v1.network"));
        assert_eq!(template.description(), "project: my-project, name: dev-networks");
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let mut template = Template::new(
            context(),
            Networks {
                calls: Rc::new(Cell::new(0)),
                duplicate: true,
            },
        );
        let err = template.render().unwrap_err();
        assert!(err.to_string().contains("dev-net"));
    }
}
