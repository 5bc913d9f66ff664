//! Container engine (GKE) kinds.

use std::sync::LazyLock;

use crate::schema::validators::{CIDR_RANGE, MACHINE_TYPE, RESOURCE_NAME, ZONE};
use crate::schema::{Attribute, Schema, Value, ValueKind};

/// HTTP (L7) load balancing addon.
pub static HTTP_LOAD_BALANCING: LazyLock<Schema> = LazyLock::new(|| {
    Schema::property("HttpLoadBalancing")
        .required("disabled", Attribute::boolean())
        .build()
});

/// Horizontal pod autoscaling addon.
pub static HORIZONTAL_POD_AUTOSCALING: LazyLock<Schema> = LazyLock::new(|| {
    Schema::property("HorizontalPodAutoscaling")
        .required("disabled", Attribute::boolean())
        .build()
});

/// Cluster addons.
pub static ADDONS_CONFIG: LazyLock<Schema> = LazyLock::new(|| {
    Schema::property("AddonsConfig")
        .optional("httpLoadBalancing", Attribute::node(&HTTP_LOAD_BALANCING))
        .optional("horizontalPodAutoscaling", Attribute::node(&HORIZONTAL_POD_AUTOSCALING))
        .build()
});

/// Basic auth for the master endpoint.
pub static MASTER_AUTH: LazyLock<Schema> = LazyLock::new(|| {
    Schema::property("MasterAuth")
        .required("username", Attribute::string())
        .required("password", Attribute::string())
        .build()
});

/// Node VM configuration.
pub static NODE_CONFIG: LazyLock<Schema> = LazyLock::new(|| {
    Schema::property("NodeConfig")
        .optional("machineType", Attribute::string().check(MACHINE_TYPE))
        .optional("diskSizeGb", Attribute::int())
        .optional("oauthScopes", Attribute::list(ValueKind::String))
        .optional("serviceAccount", Attribute::string())
        .optional("metadata", Attribute::map())
        .optional("imageType", Attribute::string().one_of(["COS", "COS_CONTAINERD", "UBUNTU", "UBUNTU_CONTAINERD"]))
        .optional("localSsdCount", Attribute::int())
        .optional("labels", Attribute::map())
        .optional("preemptible", Attribute::boolean())
        .optional("tags", Attribute::list(ValueKind::String))
        .build()
});

/// Cluster autoscaler bounds for a node pool.
pub static NODE_POOL_AUTOSCALING: LazyLock<Schema> = LazyLock::new(|| {
    Schema::property("NodePoolAutoscaling")
        .required("enabled", Attribute::boolean())
        .required("minNodeCount", Attribute::int())
        .required("maxNodeCount", Attribute::int())
        .validator(|p| match (p.get_int("minNodeCount"), p.get_int("maxNodeCount")) {
            (Some(min), Some(max)) if min >= max => {
                Err(format!("minNodeCount ({min}) must be less than maxNodeCount ({max})"))
            }
            _ => Ok(()),
        })
        .build()
});

/// Node auto-repair and auto-upgrade.
pub static NODE_MANAGEMENT: LazyLock<Schema> = LazyLock::new(|| {
    Schema::property("NodeManagement")
        .optional("autoUpgrade", Attribute::boolean())
        .optional("autoRepair", Attribute::boolean())
        .build()
});

/// A node pool of a cluster.
pub static NODE_POOL: LazyLock<Schema> = LazyLock::new(|| {
    Schema::property("NodePool")
        .required("name", Attribute::string().check(RESOURCE_NAME))
        .required("config", Attribute::node(&NODE_CONFIG))
        .required("initialNodeCount", Attribute::int())
        .optional("autoscaling", Attribute::node(&NODE_POOL_AUTOSCALING))
        .optional("management", Attribute::node(&NODE_MANAGEMENT))
        .optional("version", Attribute::string())
        .build()
});

/// The `cluster` block of a cluster resource.
pub static CLUSTER_PROPERTIES: LazyLock<Schema> = LazyLock::new(|| {
    Schema::property("ClusterProperties")
        .optional("description", Attribute::string())
        .optional("initialNodeCount", Attribute::int())
        .optional("initialClusterVersion", Attribute::string())
        .optional("nodeConfig", Attribute::node(&NODE_CONFIG))
        .optional("masterAuth", Attribute::node(&MASTER_AUTH))
        .optional("loggingService", Attribute::string().one_of(["logging.googleapis.com", "none"]))
        .optional("monitoringService", Attribute::string().one_of(["monitoring.googleapis.com", "none"]))
        .optional("network", Attribute::string().check(RESOURCE_NAME))
        .optional("clusterIpv4Cidr", Attribute::string().check(CIDR_RANGE))
        .optional("addonsConfig", Attribute::node(&ADDONS_CONFIG))
        .required("subnetwork", Attribute::string().check(RESOURCE_NAME))
        .optional("nodePools", Attribute::nodes(&NODE_POOL))
        .optional("locations", Attribute::list(ValueKind::String).check(ZONE))
        .validator(|p| {
            if p.count_set(&["initialNodeCount", "nodePools"]) != 1 {
                return Err(String::from("exactly one of initialNodeCount or nodePools must be set"));
            }
            if p.contains("nodeConfig") && p.contains("nodePools") {
                return Err(String::from("nodeConfig cannot be used with nodePools"));
            }
            Ok(())
        })
        .build()
});

/// `container.v1.cluster`
///
/// The cluster API takes the name as a separate field only.
pub static CLUSTER: LazyLock<Schema> = LazyLock::new(|| {
    Schema::resource("Cluster", "container.v1.cluster")
        .required("name", Attribute::string().check(RESOURCE_NAME))
        .required("zone", Attribute::string().check(ZONE))
        .required("cluster", Attribute::node(&CLUSTER_PROPERTIES))
        .name_outside_properties()
        .validator(|p| {
            let locations = p
                .get("cluster")
                .and_then(Value::as_node)
                .and_then(|cluster| cluster.get_list("locations"));
            let Some(locations) = locations else {
                return Ok(());
            };
            let zone = p.get("zone");
            if !locations.iter().any(|location| Some(location) == zone) {
                return Err(String::from("zone must be included in cluster.locations"));
            }
            Ok(())
        })
        .build()
});

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SchemaError;
    use crate::schema::{Properties, Resource};

    fn autoscaling(min: i64, max: i64) -> Properties {
        Properties::new(&NODE_POOL_AUTOSCALING)
            .with("enabled", true)
            .with("minNodeCount", min)
            .with("maxNodeCount", max)
    }

    fn pool() -> Properties {
        Properties::new(&NODE_POOL)
            .with("name", "default-pool")
            .with("initialNodeCount", 3)
            .with("config", Properties::new(&NODE_CONFIG).with("machineType", "e2-standard-4"))
            .with("autoscaling", autoscaling(1, 5))
    }

    fn cluster(properties: Properties) -> Resource {
        Resource::new(&CLUSTER)
            .with("name", "dev-cluster")
            .with("zone", "us-central1-b")
            .with("cluster", properties)
    }

    #[test]
    fn test_autoscaling_bounds() {
        assert!(autoscaling(1, 2).validate().is_ok());
        assert!(matches!(autoscaling(2, 2).validate(), Err(SchemaError::SemanticViolation { .. })));
        assert!(matches!(autoscaling(3, 2).validate(), Err(SchemaError::SemanticViolation { .. })));
    }

    #[test]
    fn test_cluster_excludes_name_from_properties() {
        let props = Properties::new(&CLUSTER_PROPERTIES)
            .with("subnetwork", "dev-subnet")
            .with("nodePools", vec![pool()]);
        let entry = cluster(props).to_manifest().unwrap();
        assert_eq!(entry.name, "dev-cluster");
        assert_eq!(entry.resource_type, "container.v1.cluster");
        assert_eq!(entry.properties.keys().collect::<Vec<_>>(), vec!["zone", "cluster"]);
    }

    #[test]
    fn test_node_count_or_pools() {
        let neither = Properties::new(&CLUSTER_PROPERTIES).with("subnetwork", "dev-subnet");
        assert!(cluster(neither).validate().is_err());

        let both = Properties::new(&CLUSTER_PROPERTIES)
            .with("subnetwork", "dev-subnet")
            .with("initialNodeCount", 3)
            .with("nodePools", vec![pool()]);
        assert!(cluster(both).validate().is_err());

        let config_with_pools = Properties::new(&CLUSTER_PROPERTIES)
            .with("subnetwork", "dev-subnet")
            .with("nodePools", vec![pool()])
            .with("nodeConfig", Properties::new(&NODE_CONFIG));
        assert!(cluster(config_with_pools).validate().is_err());
    }

    #[test]
    fn test_zone_in_locations() {
        let props = |locations: Vec<&str>| {
            Properties::new(&CLUSTER_PROPERTIES)
                .with("subnetwork", "dev-subnet")
                .with("initialNodeCount", 1)
                .with("locations", locations)
        };
        assert!(cluster(props(vec!["us-central1-a", "us-central1-b"])).validate().is_ok());
        let err = cluster(props(vec!["us-central1-a"])).validate().unwrap_err();
        assert!(matches!(err, SchemaError::SemanticViolation { ref kind, .. } if kind == "Cluster"));
    }
}
