//! Compute engine kinds.

use std::sync::LazyLock;

use crate::schema::validators::{BASE_INSTANCE_NAME, CIDR_RANGE, IP_ADDRESS, MACHINE_TYPE, RESOURCE_NAME, ZONE};
use crate::schema::{Attribute, Properties, Schema, Value, ValueKind};

/// Persistent disk type.
pub const PERSISTENT: &str = "PERSISTENT";
/// Scratch disk type.
pub const SCRATCH: &str = "SCRATCH";

/// Protocols accepted by firewall rules.
pub const FIREWALL_PROTOCOLS: [&str; 6] = ["tcp", "udp", "icmp", "esp", "ah", "sctp"];

const NEXT_HOPS: [&str; 4] = ["nextHopGateway", "nextHopInstance", "nextHopIp", "nextHopVpnTunnel"];

/// `allowed` entry of a firewall rule.
pub static FIREWALL_ALLOWED: LazyLock<Schema> = LazyLock::new(|| {
    Schema::property("FirewallAllowed")
        .required("IPProtocol", Attribute::string().one_of(FIREWALL_PROTOCOLS))
        .optional("ports", Attribute::list(ValueKind::String))
        .validator(|p| {
            let needs_ports = matches!(p.get_str("IPProtocol"), Some("tcp" | "udp"));
            if needs_ports && p.get_list("ports").is_none_or(<[Value]>::is_empty) {
                return Err(String::from("ports must be defined for tcp or udp rules"));
            }
            Ok(())
        })
        .build()
});

/// Parameters for a disk created along with its instance.
pub static DISK_INITIALIZE_PARAMS: LazyLock<Schema> = LazyLock::new(|| {
    Schema::property("DiskInitializeParams")
        .optional("diskName", Attribute::string())
        .required("diskSizeGb", Attribute::int())
        .optional("diskType", Attribute::string().one_of(["local-ssd", "pd-ssd", "pd-standard"]))
        .optional("sourceImage", Attribute::string())
        .build()
});

/// A disk attached to an instance or instance template.
pub static ATTACHED_DISK: LazyLock<Schema> = LazyLock::new(|| {
    Schema::property("AttachedDisk")
        .optional("autoDelete", Attribute::boolean())
        .required("boot", Attribute::boolean())
        .optional("deviceName", Attribute::string())
        .optional("index", Attribute::int())
        .optional("initializeParams", Attribute::node(&DISK_INITIALIZE_PARAMS))
        .optional("interface", Attribute::string().one_of(["SCSI", "NVME"]))
        .optional("mode", Attribute::string().one_of(["READ_WRITE", "READ_ONLY"]))
        .optional("source", Attribute::string())
        .optional("sizeGb", Attribute::int())
        .required("type", Attribute::string().one_of([SCRATCH, PERSISTENT]))
        .validator(|p| {
            if p.count_set(&["initializeParams", "source"]) != 1 {
                return Err(String::from("exactly one of initializeParams or source must be set"));
            }
            if p.get_bool("boot") != Some(true) && p.contains("initializeParams") {
                return Err(String::from("non-boot disks cannot have initializeParams"));
            }
            Ok(())
        })
        .build()
});

/// External access for a network interface.
pub static ACCESS_CONFIG: LazyLock<Schema> = LazyLock::new(|| {
    Schema::property("AccessConfig")
        .required("name", Attribute::string())
        .optional("natIP", Attribute::string())
        .required("type", Attribute::string().one_of(["ONE_TO_ONE_NAT"]))
        .build()
});

/// Network interface of an instance.
pub static NETWORK_INTERFACE: LazyLock<Schema> = LazyLock::new(|| {
    Schema::property("NetworkInterface")
        .required("accessConfigs", Attribute::nodes(&ACCESS_CONFIG))
        .optional("network", Attribute::string())
        .optional("networkIP", Attribute::string().check(IP_ADDRESS))
        .optional("subnetwork", Attribute::string())
        .validator(|p| {
            if p.contains("network") && !p.contains("subnetwork") {
                return Err(String::from("a custom network requires a subnetwork"));
            }
            Ok(())
        })
        .build()
});

/// One metadata key/value pair.
pub static METADATA_ITEM: LazyLock<Schema> = LazyLock::new(|| {
    Schema::property("MetadataItem")
        .required("key", Attribute::string())
        .required("value", Attribute::string())
        .build()
});

/// Instance metadata.
pub static METADATA: LazyLock<Schema> = LazyLock::new(|| {
    Schema::property("Metadata")
        .optional("fingerprint", Attribute::string())
        .optional("items", Attribute::nodes(&METADATA_ITEM))
        .build()
});

/// Scheduling options.
pub static SCHEDULING: LazyLock<Schema> = LazyLock::new(|| {
    Schema::property("Scheduling")
        .optional("automaticRestart", Attribute::boolean())
        .optional("onHostMaintenance", Attribute::string().one_of(["MIGRATE", "TERMINATE"]))
        .optional("preemptible", Attribute::boolean())
        .build()
});

/// Service account attached to an instance.
pub static SERVICE_ACCOUNT: LazyLock<Schema> = LazyLock::new(|| {
    Schema::property("ServiceAccount")
        .optional("email", Attribute::string())
        .required("scopes", Attribute::list(ValueKind::String))
        .build()
});

/// Network tags.
pub static TAGS: LazyLock<Schema> = LazyLock::new(|| {
    Schema::property("Tags")
        .optional("fingerprint", Attribute::string())
        .optional("items", Attribute::list(ValueKind::String))
        .build()
});

/// Named port of an instance group.
pub static NAMED_PORT: LazyLock<Schema> = LazyLock::new(|| {
    Schema::property("NamedPort")
        .required("name", Attribute::string().check(RESOURCE_NAME))
        .required("port", Attribute::int().range(1, 65535))
        .build()
});

/// The `properties` block of an instance template.
pub static INSTANCE_PROPERTIES: LazyLock<Schema> = LazyLock::new(|| {
    Schema::property("InstanceProperties")
        .optional("description", Attribute::string())
        .optional("canIpForward", Attribute::boolean())
        .required("disks", Attribute::nodes(&ATTACHED_DISK))
        .required("machineType", Attribute::string().check(MACHINE_TYPE))
        .optional("metadata", Attribute::node(&METADATA))
        .required("networkInterfaces", Attribute::nodes(&NETWORK_INTERFACE))
        .optional("scheduling", Attribute::node(&SCHEDULING))
        .optional("serviceAccounts", Attribute::nodes(&SERVICE_ACCOUNT))
        .optional("tags", Attribute::node(&TAGS))
        .validator(|p| check_boot_disk(p, BootSource::InitializeParams))
        .build()
});

/// `compute.v1.address`
pub static ADDRESS: LazyLock<Schema> = LazyLock::new(|| {
    Schema::resource("Address", "compute.v1.address")
        .optional("description", Attribute::string())
        .required("name", Attribute::string().check(RESOURCE_NAME))
        .required("region", Attribute::string())
        .build()
});

/// `compute.v1.disk`
pub static DISK: LazyLock<Schema> = LazyLock::new(|| {
    Schema::resource("Disk", "compute.v1.disk")
        .optional("description", Attribute::string())
        .required("name", Attribute::string().check(RESOURCE_NAME))
        .required("sizeGb", Attribute::int())
        .optional("sourceImage", Attribute::string())
        .optional("sourceSnapshot", Attribute::string())
        .required("type", Attribute::string())
        .required("zone", Attribute::string().check(ZONE))
        .validator(|p| {
            if p.contains("sourceImage") && p.contains("sourceSnapshot") {
                return Err(String::from("sourceImage and sourceSnapshot cannot both be set"));
            }
            Ok(())
        })
        .build()
});

/// `compute.v1.firewall`
pub static FIREWALL: LazyLock<Schema> = LazyLock::new(|| {
    Schema::resource("Firewall", "compute.v1.firewall")
        .required("name", Attribute::string().check(RESOURCE_NAME))
        .required("allowed", Attribute::nodes(&FIREWALL_ALLOWED))
        .optional("description", Attribute::string())
        .required("network", Attribute::string())
        .optional("sourceRanges", Attribute::list(ValueKind::String).check(CIDR_RANGE))
        .optional("sourceTags", Attribute::list(ValueKind::String))
        .optional("targetTags", Attribute::list(ValueKind::String))
        .validator(|p| {
            if p.count_set(&["sourceRanges", "sourceTags"]) != 1 {
                return Err(String::from("exactly one of sourceRanges or sourceTags must be set"));
            }
            Ok(())
        })
        .build()
});

/// `compute.v1.instance`
pub static INSTANCE: LazyLock<Schema> = LazyLock::new(|| {
    Schema::resource("Instance", "compute.v1.instance")
        .required("name", Attribute::string().check(RESOURCE_NAME))
        .optional("description", Attribute::string())
        .optional("canIpForward", Attribute::boolean())
        .required("disks", Attribute::nodes(&ATTACHED_DISK))
        .required("machineType", Attribute::string().check(MACHINE_TYPE))
        .optional("metadata", Attribute::node(&METADATA))
        .required("networkInterfaces", Attribute::nodes(&NETWORK_INTERFACE))
        .optional("scheduling", Attribute::node(&SCHEDULING))
        .optional("serviceAccounts", Attribute::nodes(&SERVICE_ACCOUNT))
        .optional("tags", Attribute::node(&TAGS))
        .required("zone", Attribute::string().check(ZONE))
        .validator(|p| check_boot_disk(p, BootSource::InitializeParamsOrSource))
        .build()
});

/// `compute.v1.instanceGroupManager`
pub static INSTANCE_GROUP_MANAGER: LazyLock<Schema> = LazyLock::new(|| {
    Schema::resource("InstanceGroupManager", "compute.v1.instanceGroupManager")
        .required("baseInstanceName", Attribute::string().check(BASE_INSTANCE_NAME))
        .optional("description", Attribute::string())
        .required("instanceTemplate", Attribute::string())
        .required("name", Attribute::string().check(RESOURCE_NAME))
        .optional("namedPorts", Attribute::nodes(&NAMED_PORT))
        .optional("targetPools", Attribute::list(ValueKind::String))
        .required("targetSize", Attribute::int())
        .required("zone", Attribute::string().check(ZONE))
        .build()
});

/// `compute.v1.instanceTemplate`
pub static INSTANCE_TEMPLATE: LazyLock<Schema> = LazyLock::new(|| {
    Schema::resource("InstanceTemplate", "compute.v1.instanceTemplate")
        .optional("description", Attribute::string())
        .required("name", Attribute::string().check(RESOURCE_NAME))
        .required("properties", Attribute::node(&INSTANCE_PROPERTIES))
        .build()
});

/// `compute.v1.network`
pub static NETWORK: LazyLock<Schema> = LazyLock::new(|| {
    Schema::resource("Network", "compute.v1.network")
        .optional("IPv4Range", Attribute::string().check(CIDR_RANGE))
        .optional("autoCreateSubnetworks", Attribute::boolean())
        .optional("description", Attribute::string())
        .optional("gatewayIPv4", Attribute::string().check(IP_ADDRESS))
        .required("name", Attribute::string().check(RESOURCE_NAME))
        .build()
});

/// `compute.v1.route`
pub static ROUTE: LazyLock<Schema> = LazyLock::new(|| {
    Schema::resource("Route", "compute.v1.route")
        .optional("description", Attribute::string())
        .required("destRange", Attribute::string().check(CIDR_RANGE))
        .required("name", Attribute::string().check(RESOURCE_NAME))
        .required("network", Attribute::string())
        .optional("nextHopGateway", Attribute::string())
        .optional("nextHopInstance", Attribute::string())
        .optional("nextHopIp", Attribute::string().check(IP_ADDRESS))
        .optional("nextHopVpnTunnel", Attribute::string())
        .optional("priority", Attribute::int().range(1, 65535))
        // The API rejects a route without a tags list, even an empty one.
        .required("tags", Attribute::list(ValueKind::String))
        .validator(|p| {
            if p.count_set(&NEXT_HOPS) != 1 {
                return Err(format!("exactly one of {} must be set", NEXT_HOPS.join(", ")));
            }
            Ok(())
        })
        .build()
});

/// `compute.v1.subnetwork`
pub static SUBNETWORK: LazyLock<Schema> = LazyLock::new(|| {
    Schema::resource("Subnetwork", "compute.v1.subnetwork")
        .optional("description", Attribute::string())
        .required("region", Attribute::string())
        .required("ipCidrRange", Attribute::string().check(CIDR_RANGE))
        .required("name", Attribute::string().check(RESOURCE_NAME))
        .required("network", Attribute::string())
        .build()
});

#[derive(Clone, Copy, PartialEq, Eq)]
enum BootSource {
    InitializeParams,
    InitializeParamsOrSource,
}

fn check_boot_disk(props: &Properties, source: BootSource) -> Result<(), String> {
    let disks = props.get_list("disks").unwrap_or_default();
    let mut boot_count = 0;

    for (index, disk) in disks.iter().filter_map(Value::as_node).enumerate() {
        if disk.get_bool("boot") != Some(true) {
            continue;
        }
        boot_count += 1;
        if disk.get_str("type") != Some(PERSISTENT) {
            return Err(format!("boot disk {index} must be {PERSISTENT}"));
        }
        let has_source = match source {
            BootSource::InitializeParams => disk.contains("initializeParams"),
            BootSource::InitializeParamsOrSource => disk.contains("initializeParams") || disk.contains("source"),
        };
        if !has_source {
            return Err(match source {
                BootSource::InitializeParams => format!("boot disk {index} must have initializeParams"),
                BootSource::InitializeParamsOrSource => {
                    format!("boot disk {index} must have initializeParams or source")
                }
            });
        }
    }

    if boot_count != 1 {
        return Err(format!("exactly one disk must be marked boot, found {boot_count}"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SchemaError;
    use crate::schema::Resource;

    fn boot_disk() -> Properties {
        Properties::new(&ATTACHED_DISK)
            .with("boot", true)
            .with("type", PERSISTENT)
            .with("autoDelete", true)
            .with(
                "initializeParams",
                Properties::new(&DISK_INITIALIZE_PARAMS)
                    .with("diskSizeGb", 10)
                    .with("sourceImage", "projects/debian-cloud/global/images/family/debian-12"),
            )
    }

    fn data_disk(boot: bool) -> Properties {
        Properties::new(&ATTACHED_DISK)
            .with("boot", boot)
            .with("type", PERSISTENT)
            .with("source", "$(ref.data-disk.selfLink)")
    }

    fn instance(disks: Vec<Properties>) -> Resource {
        Resource::new(&INSTANCE)
            .with("name", "web-1")
            .with("zone", "us-central1-b")
            .with("machineType", "zones/us-central1-b/machineTypes/e2-medium")
            .with("disks", disks)
            .with(
                "networkInterfaces",
                vec![Properties::new(&NETWORK_INTERFACE)
                    .with("network", "$(ref.dev-network.selfLink)")
                    .with("subnetwork", "$(ref.dev-subnet.selfLink)")
                    .with(
                        "accessConfigs",
                        vec![Properties::new(&ACCESS_CONFIG)
                            .with("name", "External NAT")
                            .with("type", "ONE_TO_ONE_NAT")],
                    )],
            )
    }

    fn semantic_message(err: SchemaError) -> String {
        match err {
            SchemaError::SemanticViolation { message, .. } => message,
            other => panic!("expected a semantic violation, got {other}"),
        }
    }

    #[test]
    fn test_instance_with_one_boot_disk() {
        let entry = instance(vec![boot_disk(), data_disk(false)]).to_manifest().unwrap();
        assert_eq!(entry.resource_type, "compute.v1.instance");
        assert_eq!(entry.name, "web-1");
    }

    #[test]
    fn test_instance_boot_disk_count() {
        let none = instance(vec![data_disk(false)]).validate().unwrap_err();
        assert!(semantic_message(none).contains("found 0"));

        let two = instance(vec![boot_disk(), data_disk(true)]).validate().unwrap_err();
        assert!(semantic_message(two).contains("found 2"));
    }

    #[test]
    fn test_boot_disk_must_be_persistent() {
        let scratch = boot_disk().with("type", SCRATCH);
        let err = instance(vec![scratch]).validate().unwrap_err();
        assert!(semantic_message(err).contains(PERSISTENT));
    }

    #[test]
    fn test_template_boot_disk_needs_initialize_params() {
        let props = Properties::new(&INSTANCE_PROPERTIES)
            .with("machineType", "n1-standard-1")
            .with("disks", vec![data_disk(true)])
            .with("networkInterfaces", Vec::<Properties>::new());
        let err = props.validate().unwrap_err();
        assert!(semantic_message(err).contains("initializeParams"));
    }

    #[test]
    fn test_nested_type_error_path() {
        let bad = Properties::new(&ATTACHED_DISK)
            .with("boot", true)
            .with("type", PERSISTENT)
            .with("initializeParams", Properties::new(&DISK_INITIALIZE_PARAMS).with("diskSizeGb", "10"));
        let err = instance(vec![bad]).validate().unwrap_err();
        assert!(matches!(
            err,
            SchemaError::TypeMismatch { ref path, .. } if path == "web-1.disks[0].initializeParams.diskSizeGb"
        ));
    }

    #[test]
    fn test_firewall_rules() {
        let allowed = |protocol: &str| Properties::new(&FIREWALL_ALLOWED).with("IPProtocol", protocol);

        let base = Resource::new(&FIREWALL)
            .with("name", "allow-ssh")
            .with("network", "$(ref.dev-network.selfLink)");

        let ok = base
            .clone()
            .with("allowed", vec![allowed("tcp").with("ports", vec!["22"])])
            .with("sourceRanges", vec!["0.0.0.0/0"]);
        assert!(ok.validate().is_ok());

        let both = ok.clone().with("sourceTags", vec!["bastion"]);
        assert!(matches!(both.validate(), Err(SchemaError::SemanticViolation { .. })));

        let no_ports = base
            .clone()
            .with("allowed", vec![allowed("tcp")])
            .with("sourceTags", vec!["bastion"]);
        assert!(matches!(no_ports.validate(), Err(SchemaError::SemanticViolation { .. })));

        let bad_protocol = base
            .with("allowed", vec![allowed("tcpx")])
            .with("sourceTags", vec!["bastion"]);
        assert!(matches!(
            bad_protocol.validate(),
            Err(SchemaError::ConstraintViolation { ref path, .. }) if path == "allow-ssh.allowed[0].IPProtocol"
        ));
    }

    #[test]
    fn test_firewall_source_counts_keys_not_values() {
        let base = Resource::new(&FIREWALL)
            .with("name", "allow-ssh")
            .with("network", "$(ref.dev-network.selfLink)")
            .with(
                "allowed",
                vec![Properties::new(&FIREWALL_ALLOWED).with("IPProtocol", "icmp")],
            );

        let empty_ranges = base.clone().with("sourceRanges", Vec::<String>::new());
        assert!(empty_ranges.validate().is_ok());

        let empty_ranges_and_tags = empty_ranges.with("sourceTags", vec!["bastion"]);
        assert!(matches!(
            empty_ranges_and_tags.validate(),
            Err(SchemaError::SemanticViolation { .. })
        ));

        assert!(matches!(base.validate(), Err(SchemaError::SemanticViolation { .. })));
    }

    #[test]
    fn test_route_priority_and_next_hop() {
        let route = Resource::new(&ROUTE)
            .with("name", "nat-route")
            .with("network", "$(ref.dev-network.selfLink)")
            .with("destRange", "0.0.0.0/0")
            .with("tags", Vec::<String>::new())
            .with("nextHopIp", "10.0.0.2");
        assert!(route.clone().with("priority", 65535).validate().is_ok());
        assert!(matches!(
            route.clone().with("priority", 65536).validate(),
            Err(SchemaError::ConstraintViolation { .. })
        ));

        let two_hops = route.with("nextHopGateway", "global/gateways/default-internet-gateway");
        assert!(matches!(two_hops.validate(), Err(SchemaError::SemanticViolation { .. })));
    }

    #[test]
    fn test_route_without_next_hop() {
        let route = Resource::new(&ROUTE)
            .with("name", "nat-route")
            .with("network", "$(ref.dev-network.selfLink)")
            .with("destRange", "0.0.0.0/0")
            .with("tags", Vec::<String>::new());
        assert!(matches!(route.validate(), Err(SchemaError::SemanticViolation { .. })));
    }

    #[test]
    fn test_disk_sources_exclusive() {
        let disk = Resource::new(&DISK)
            .with("name", "data-disk")
            .with("sizeGb", 100)
            .with("type", "pd-ssd")
            .with("zone", "us-central1-b")
            .with("sourceImage", "debian-12");
        assert!(disk.validate().is_ok());
        assert!(disk.with("sourceSnapshot", "snap").validate().is_err());
    }

    #[test]
    fn test_instance_group_manager_base_name() {
        let manager = Resource::new(&INSTANCE_GROUP_MANAGER)
            .with("name", "web-igm")
            .with("zone", "us-central1-b")
            .with("instanceTemplate", "$(ref.web-template.selfLink)")
            .with("targetSize", 2)
            .with("namedPorts", vec![Properties::new(&NAMED_PORT).with("name", "http").with("port", 80)]);
        assert!(manager.clone().with("baseInstanceName", "web").validate().is_ok());
        assert!(matches!(
            manager.with("baseInstanceName", "9web").validate(),
            Err(SchemaError::ConstraintViolation { .. })
        ));
    }
}
