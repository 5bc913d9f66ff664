//! Built-in value predicates used by the resource catalog.

use std::net::IpAddr;

use super::attribute::Predicate;
use super::value::Value;

/// RFC 1035 resource name: 1-63 chars, `[a-z]([-a-z0-9]*[a-z0-9])?`.
pub const RESOURCE_NAME: Predicate = Predicate {
    name: "resource name",
    check: |value| value.as_str().is_some_and(is_resource_name),
};

/// Zone name, e.g. `us-central1-b`.
pub const ZONE: Predicate = Predicate {
    name: "zone",
    check: |value| value.as_str().is_some_and(is_resource_name),
};

/// Managed instance group base name: up to 58 chars.
pub const BASE_INSTANCE_NAME: Predicate = Predicate {
    name: "base instance name",
    check: |value| value.as_str().is_some_and(is_base_instance_name),
};

/// IPv4 or IPv6 address.
pub const IP_ADDRESS: Predicate = Predicate {
    name: "IP address",
    check: |value| value.as_str().is_some_and(|s| s.parse::<IpAddr>().is_ok()),
};

/// IPv4 or IPv6 CIDR range, e.g. `10.0.0.0/16`.
pub const CIDR_RANGE: Predicate = Predicate {
    name: "CIDR range",
    check: |value| value.as_str().is_some_and(is_cidr_range),
};

/// Machine type, bare (`n1-standard-1`) or zonal (`zones/<zone>/machineTypes/<type>`).
pub const MACHINE_TYPE: Predicate = Predicate {
    name: "machine type",
    check: |value: &Value| value.as_str().is_some_and(is_machine_type),
};

/// Returns true if `name` is a valid RFC 1035 resource name.
#[must_use]
pub fn is_resource_name(name: &str) -> bool {
    is_label(name, 63)
}

/// Returns true if `name` is a valid managed instance group base name.
#[must_use]
pub fn is_base_instance_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    first.is_ascii_lowercase()
        && name.len() <= 58
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

/// Returns true if `range` is `<address>/<prefix>` with a prefix that fits the address family.
#[must_use]
pub fn is_cidr_range(range: &str) -> bool {
    let Some((address, prefix)) = range.split_once('/') else {
        return false;
    };
    let Ok(prefix) = prefix.parse::<u8>() else {
        return false;
    };
    match address.parse::<IpAddr>() {
        Ok(IpAddr::V4(_)) => prefix <= 32,
        Ok(IpAddr::V6(_)) => prefix <= 128,
        Err(_) => false,
    }
}

/// Returns true if `machine_type` is `<family>-<shape>`, bare or as a zonal
/// path or URL ending in `zones/<zone>/machineTypes/<type>`.
#[must_use]
pub fn is_machine_type(machine_type: &str) -> bool {
    let bare = match machine_type.rsplit_once("/machineTypes/") {
        Some((scope, bare)) => {
            let Some((parent, zone)) = scope.rsplit_once('/') else {
                return false;
            };
            if !(parent == "zones" || parent.ends_with("/zones")) || !is_resource_name(zone) {
                return false;
            }
            bare
        }
        None => machine_type,
    };
    bare.contains('-') && is_label(bare, 63)
}

fn is_label(name: &str, max_len: usize) -> bool {
    if name.is_empty() || name.len() > max_len {
        return false;
    }

    let mut chars = name.chars();

    // First character must be a letter
    if let Some(first) = chars.next()
        && !first.is_ascii_lowercase()
    {
        return false;
    }

    if !chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-') {
        return false;
    }

    !name.ends_with('-')
}
