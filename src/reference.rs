//! Deferred references between resources of one deployment.
//!
//! A reference is the literal token `$(ref.<resource>.<attribute>)`. The
//! remote service resolves it; locally it is an opaque string.

use std::fmt;

use crate::schema::Value;

/// Attribute name of a resource's canonical URL.
pub const SELF_LINK: &str = "selfLink";

const PREFIX: &str = "$(ref.";
const SUFFIX: &str = ")";

/// A deferred reference to an attribute of another resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Reference {
    resource: String,
    attribute: String,
}

impl Reference {
    /// References `attribute` of the resource named `resource`.
    #[must_use]
    pub fn to(resource: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            attribute: attribute.into(),
        }
    }

    /// References the `selfLink` of the resource named `resource`.
    #[must_use]
    pub fn self_link(resource: impl Into<String>) -> Self {
        Self::to(resource, SELF_LINK)
    }

    /// Name of the referenced resource.
    #[must_use]
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Referenced attribute path.
    #[must_use]
    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    /// Parses a well-formed token. Attribute paths may contain dots.
    #[must_use]
    pub fn parse(token: &str) -> Option<Self> {
        let inner = token.strip_prefix(PREFIX)?.strip_suffix(SUFFIX)?;
        let (resource, attribute) = inner.split_once('.')?;
        let well_formed = |part: &str| !part.is_empty() && !part.contains(char::is_whitespace);
        (well_formed(resource) && well_formed(attribute)).then(|| Self::to(resource, attribute))
    }

    /// Returns true if `value` is a well-formed reference token.
    #[must_use]
    pub fn is_reference(value: &str) -> bool {
        Self::parse(value).is_some()
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{PREFIX}{}.{}{SUFFIX}", self.resource, self.attribute)
    }
}

impl From<Reference> for Value {
    fn from(reference: Reference) -> Self {
        Self::String(reference.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_format() {
        assert_eq!(Reference::self_link("net-1").to_string(), "$(ref.net-1.selfLink)");
        assert_eq!(Reference::to("ip", "address").to_string(), "$(ref.ip.address)");
    }

    #[test]
    fn test_parse() {
        let reference = Reference::parse("$(ref.vm-1.networkInterfaces[0].networkIP)").unwrap();
        assert_eq!(reference.resource(), "vm-1");
        assert_eq!(reference.attribute(), "networkInterfaces[0].networkIP");

        assert!(!Reference::is_reference("$(ref.vm-1)"));
        assert!(!Reference::is_reference("ref.vm-1.selfLink"));
        assert!(!Reference::is_reference("$(ref..selfLink)"));
        assert!(!Reference::is_reference("$(ref.vm 1.selfLink)"));
    }
}
