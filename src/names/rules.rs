//! Lexical rule tables for table <-> type name translation.
//!
//! Each table is ordered; the first rule whose predicate matches wins.
//! New special cases are added as entries, not as new branches.

use std::sync::LazyLock;

use regex::Regex;

/// Suffix the schema appends to every model type name.
pub const TYPE_SUFFIX: &str = "Type";

/// Separators a table or model name may be split on.
const SEPARATORS: &[char] = &['_', '-', '.'];

/// Segments kept upper-case when PascalCasing.
pub const ACRONYMS: &[&str] = &[
    "ip", "vlan", "vrf", "rir", "vm", "asn", "api", "url", "dns", "mac",
];

/// App namespaces and the model keys (lower-case, no separators) each owns.
pub const NAMESPACE_MODELS: &[(&str, &[&str])] = &[
    (
        "dcim",
        &[
            "cable",
            "consoleport",
            "consoleporttemplate",
            "consoleserverport",
            "controller",
            "device",
            "devicebay",
            "devicefamily",
            "devicetype",
            "frontport",
            "interface",
            "interfaceredundancygroup",
            "inventoryitem",
            "location",
            "locationtype",
            "manufacturer",
            "module",
            "modulebay",
            "moduletype",
            "platform",
            "powerfeed",
            "poweroutlet",
            "powerpanel",
            "powerport",
            "rack",
            "rackgroup",
            "rackreservation",
            "rearport",
            "softwareimagefile",
            "softwareversion",
            "virtualchassis",
        ],
    ),
    (
        "ipam",
        &[
            "ipaddress",
            "ipaddresstointerface",
            "namespace",
            "prefix",
            "rir",
            "routetarget",
            "service",
            "vlan",
            "vlangroup",
            "vrf",
        ],
    ),
    (
        "circuits",
        &[
            "circuit",
            "circuittermination",
            "circuittype",
            "provider",
            "providernetwork",
        ],
    ),
    ("tenancy", &["tenant", "tenantgroup"]),
    (
        "virtualization",
        &[
            "cluster",
            "clustergroup",
            "clustertype",
            "virtualmachine",
            "vminterface",
        ],
    ),
    (
        "extras",
        &[
            "computedfield",
            "configcontext",
            "contact",
            "customfield",
            "dynamicgroup",
            "externalintegration",
            "gitrepository",
            "job",
            "note",
            "relationship",
            "role",
            "secret",
            "secretsgroup",
            "status",
            "tag",
            "team",
            "webhook",
        ],
    ),
    ("users", &["objectpermission", "token", "user"]),
    (
        "wireless",
        &["radioprofile", "supporteddatarate", "wirelessnetwork"],
    ),
    (
        "cloud",
        &[
            "cloudaccount",
            "cloudnetwork",
            "cloudresourcetype",
            "cloudservice",
        ],
    ),
];

/// Model keys whose words run together and cannot be split on separators.
pub const COMPOUND_OVERRIDES: &[(&str, &str)] = &[
    ("circuittermination", "CircuitTermination"),
    ("circuittype", "CircuitType"),
    ("cloudaccount", "CloudAccount"),
    ("cloudnetwork", "CloudNetwork"),
    ("cloudresourcetype", "CloudResourceType"),
    ("cloudservice", "CloudService"),
    ("clustergroup", "ClusterGroup"),
    ("clustertype", "ClusterType"),
    ("computedfield", "ComputedField"),
    ("configcontext", "ConfigContext"),
    ("consoleport", "ConsolePort"),
    ("consoleporttemplate", "ConsolePortTemplate"),
    ("consoleserverport", "ConsoleServerPort"),
    ("customfield", "CustomField"),
    ("devicebay", "DeviceBay"),
    ("devicefamily", "DeviceFamily"),
    ("devicetype", "DeviceType"),
    ("dynamicgroup", "DynamicGroup"),
    ("externalintegration", "ExternalIntegration"),
    ("frontport", "FrontPort"),
    ("gitrepository", "GitRepository"),
    ("interfaceredundancygroup", "InterfaceRedundancyGroup"),
    ("inventoryitem", "InventoryItem"),
    ("ipaddress", "IPAddress"),
    ("ipaddresstointerface", "IPAddressToInterface"),
    ("locationtype", "LocationType"),
    ("modulebay", "ModuleBay"),
    ("moduletype", "ModuleType"),
    ("objectpermission", "ObjectPermission"),
    ("powerfeed", "PowerFeed"),
    ("poweroutlet", "PowerOutlet"),
    ("powerpanel", "PowerPanel"),
    ("powerport", "PowerPort"),
    ("providernetwork", "ProviderNetwork"),
    ("rackgroup", "RackGroup"),
    ("rackreservation", "RackReservation"),
    ("radioprofile", "RadioProfile"),
    ("rearport", "RearPort"),
    ("routetarget", "RouteTarget"),
    ("secretsgroup", "SecretsGroup"),
    ("softwareimagefile", "SoftwareImageFile"),
    ("softwareversion", "SoftwareVersion"),
    ("supporteddatarate", "SupportedDataRate"),
    ("tenantgroup", "TenantGroup"),
    ("virtualchassis", "VirtualChassis"),
    ("virtualmachine", "VirtualMachine"),
    ("vlangroup", "VLANGroup"),
    ("vminterface", "VMInterface"),
    ("wirelessnetwork", "WirelessNetwork"),
];

/// A predicate/transform pair in an ordered rule table.
pub struct NameRule {
    pub name: &'static str,
    pub applies: fn(&str) -> bool,
    pub transform: fn(&str) -> String,
}

impl NameRule {
    /// Apply the first matching rule of `rules` to `input`.
    pub fn apply_first(rules: &[NameRule], input: &str) -> Option<String> {
        rules
            .iter()
            .find(|rule| (rule.applies)(input))
            .map(|rule| (rule.transform)(input))
    }
}

/// Model part (namespace already stripped) to PascalCase.
pub const MODEL_TO_PASCAL_RULES: &[NameRule] = &[
    NameRule {
        name: "compound-override",
        applies: has_compound_override,
        transform: apply_compound_override,
    },
    NameRule {
        name: "pascal-segments",
        applies: has_letters,
        transform: pascal_segments,
    },
];

static ACRONYM_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([A-Z]+)([A-Z][a-z])").expect("Invalid regex pattern"));
static WORD_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([a-z0-9])([A-Z])").expect("Invalid regex pattern"));

fn compound_override(model: &str) -> Option<&'static str> {
    COMPOUND_OVERRIDES
        .iter()
        .find(|(key, _)| *key == model)
        .map(|(_, pascal)| *pascal)
}

fn has_compound_override(model: &str) -> bool {
    compound_override(model).is_some()
}

fn apply_compound_override(model: &str) -> String {
    compound_override(model)
        .map(str::to_string)
        .unwrap_or_else(|| pascal_segments(model))
}

fn has_letters(model: &str) -> bool {
    model.chars().any(|c| c.is_ascii_alphanumeric())
}

/// Split on separators and PascalCase each segment, keeping acronyms upper-case.
pub fn pascal_segments(model: &str) -> String {
    model
        .split(SEPARATORS)
        .filter(|segment| !segment.is_empty())
        .map(pascal_segment)
        .collect()
}

fn pascal_segment(segment: &str) -> String {
    let lower = segment.to_ascii_lowercase();
    if ACRONYMS.contains(&lower.as_str()) {
        return lower.to_ascii_uppercase();
    }
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

/// PascalCase to snake_case, treating runs of capitals as one word:
/// `IPAddress` -> `ip_address`, `VLANGroup` -> `vlan_group`.
pub fn to_snake_case(name: &str) -> String {
    let spaced = ACRONYM_BOUNDARY.replace_all(name, "${1}_${2}");
    let spaced = WORD_BOUNDARY.replace_all(&spaced, "${1}_${2}");
    spaced.to_ascii_lowercase()
}

/// snake_case (or any separated name) to camelCase. Empty segments are skipped.
pub fn to_camel_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for segment in name.split(SEPARATORS).filter(|s| !s.is_empty()) {
        let lower = segment.to_ascii_lowercase();
        if out.is_empty() {
            out.push_str(&lower);
        } else {
            let mut chars = lower.chars();
            if let Some(first) = chars.next() {
                out.push(first.to_ascii_uppercase());
                out.push_str(chars.as_str());
            }
        }
    }
    out
}

pub fn is_namespace(segment: &str) -> bool {
    NAMESPACE_MODELS.iter().any(|(ns, _)| *ns == segment)
}

/// Namespace owning a model key, if any.
pub fn namespace_for_model_key(key: &str) -> Option<&'static str> {
    NAMESPACE_MODELS
        .iter()
        .find(|(_, models)| models.contains(&key))
        .map(|(ns, _)| *ns)
}

/// Split `dcim_devicetype` into (`Some("dcim")`, `devicetype`).
pub fn split_namespace(table: &str) -> (Option<&str>, &str) {
    match table.split_once('_') {
        Some((prefix, rest)) if is_namespace(prefix) && !rest.is_empty() => (Some(prefix), rest),
        _ => (None, table),
    }
}

/// Forward rule: table name to schema type name.
pub fn table_name_to_type_name(table: &str) -> Option<String> {
    let (_, model) = split_namespace(table);
    NameRule::apply_first(MODEL_TO_PASCAL_RULES, model).map(|pascal| pascal + TYPE_SUFFIX)
}

/// Model key for a type name: `IPAddressType` -> `ipaddress`.
pub fn model_key_for_type(type_name: &str) -> Option<String> {
    let base = type_name.strip_suffix(TYPE_SUFFIX)?;
    if base.is_empty() {
        return None;
    }
    Some(to_snake_case(base).replace('_', ""))
}

/// Reverse rule: type name to table name, best effort.
pub fn type_name_to_table_name(type_name: &str) -> Option<String> {
    let key = model_key_for_type(type_name)?;
    let namespace = namespace_for_model_key(&key)?;
    Some(format!("{}_{}", namespace, key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snake_case_acronyms() {
        assert_eq!(to_snake_case("IPAddress"), "ip_address");
        assert_eq!(to_snake_case("VLANGroup"), "vlan_group");
        assert_eq!(to_snake_case("VMInterface"), "vm_interface");
        assert_eq!(to_snake_case("DeviceType"), "device_type");
        assert_eq!(to_snake_case("PrimaryIP4"), "primary_ip4");
        assert_eq!(to_snake_case("VLAN"), "vlan");
    }

    #[test]
    fn test_camel_case() {
        assert_eq!(to_camel_case("device_type"), "deviceType");
        assert_eq!(to_camel_case("manufacturer"), "manufacturer");
        assert_eq!(to_camel_case("_cable_peer"), "cablePeer");
        assert_eq!(to_camel_case("Tagged_VLANS"), "taggedVlans");
    }

    #[test]
    fn test_forward_rules() {
        assert_eq!(table_name_to_type_name("dcim_device").unwrap(), "DeviceType");
        assert_eq!(table_name_to_type_name("dcim_devicetype").unwrap(), "DeviceTypeType");
        assert_eq!(table_name_to_type_name("ipam_ipaddress").unwrap(), "IPAddressType");
        assert_eq!(table_name_to_type_name("ipam_vlan").unwrap(), "VLANType");
        assert_eq!(table_name_to_type_name("dcim_front_port").unwrap(), "FrontPortType");
        assert_eq!(
            table_name_to_type_name("virtualization_vminterface").unwrap(),
            "VMInterfaceType"
        );
        // No namespace prefix: the whole name is the model
        assert_eq!(table_name_to_type_name("device").unwrap(), "DeviceType");
        assert!(table_name_to_type_name("__").is_none());
    }

    #[test]
    fn test_reverse_rules() {
        assert_eq!(type_name_to_table_name("DeviceType").unwrap(), "dcim_device");
        assert_eq!(type_name_to_table_name("DeviceTypeType").unwrap(), "dcim_devicetype");
        assert_eq!(type_name_to_table_name("IPAddressType").unwrap(), "ipam_ipaddress");
        assert_eq!(type_name_to_table_name("VLANGroupType").unwrap(), "ipam_vlangroup");
        assert_eq!(type_name_to_table_name("TenantType").unwrap(), "tenancy_tenant");
        assert!(type_name_to_table_name("Query").is_none());
        assert!(type_name_to_table_name("Type").is_none());
        assert!(type_name_to_table_name("UnknownThingType").is_none());
    }

    #[test]
    fn test_forward_and_reverse_round_trip_every_known_model() {
        for (namespace, models) in NAMESPACE_MODELS {
            for model in *models {
                let table = format!("{}_{}", namespace, model);
                let type_name = table_name_to_type_name(&table).unwrap();
                assert_eq!(
                    type_name_to_table_name(&type_name).as_deref(),
                    Some(table.as_str()),
                    "round trip failed for {} via {}",
                    table,
                    type_name
                );
            }
        }
    }

    #[test]
    fn test_every_compound_override_is_a_known_model() {
        for (key, _) in COMPOUND_OVERRIDES {
            assert!(namespace_for_model_key(key).is_some(), "{} has no namespace", key);
        }
    }

    #[test]
    fn test_model_keys_are_unique_across_namespaces() {
        let mut seen = std::collections::HashSet::new();
        for (_, models) in NAMESPACE_MODELS {
            for model in *models {
                assert!(seen.insert(*model), "{} listed twice", model);
            }
        }
    }

    #[test]
    fn test_rule_order_first_match_wins() {
        let matched = MODEL_TO_PASCAL_RULES
            .iter()
            .find(|rule| (rule.applies)("ipaddress"))
            .unwrap();
        assert_eq!(matched.name, "compound-override");
        let matched = MODEL_TO_PASCAL_RULES
            .iter()
            .find(|rule| (rule.applies)("rack"))
            .unwrap();
        assert_eq!(matched.name, "pascal-segments");
    }
}
