//! Built-in resource catalog.
//!
//! Compute and container-cluster kinds, the registry that maps a manifest
//! `type` to its schema, and the catalog-file template source.

pub mod compute;
pub mod container;
mod file;
mod startup;

pub use file::CatalogFile;
pub use startup::load_startup_script;

use crate::schema::Schema;

/// Every built-in top-level resource kind, in registry order.
#[must_use]
pub fn resource_kinds() -> [&'static Schema; 10] {
    [
        &*compute::ADDRESS,
        &*compute::DISK,
        &*compute::FIREWALL,
        &*compute::INSTANCE,
        &*compute::INSTANCE_GROUP_MANAGER,
        &*compute::INSTANCE_TEMPLATE,
        &*compute::NETWORK,
        &*compute::ROUTE,
        &*compute::SUBNETWORK,
        &*container::CLUSTER,
    ]
}

/// Looks up a resource kind by its manifest type, e.g. `compute.v1.network`.
#[must_use]
pub fn resource_schema(resource_type: &str) -> Option<&'static Schema> {
    resource_kinds()
        .into_iter()
        .find(|schema| schema.resource_type() == Some(resource_type))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_registry_lookup() {
        let network = resource_schema("compute.v1.network").unwrap();
        assert_eq!(network.name(), "Network");
        assert!(resource_schema("compute.v1.teapot").is_none());
    }

    #[test]
    fn test_registry_types_are_unique() {
        let types: HashSet<_> = resource_kinds().iter().filter_map(|s| s.resource_type()).collect();
        assert_eq!(types.len(), resource_kinds().len());
    }
}
