//! Field-name inference and table classification from relational names.

use crate::names::rules::{to_camel_case, NameRule};

use super::PgForeignKey;

/// Columns whose field name does not follow the `<name>_id` convention.
pub const SPECIAL_COLUMNS: &[(&str, &str)] = &[
    ("_path_id", "path"),
    ("_cable_peer_id", "cablePeer"),
    ("primary_ip4_id", "primaryIP4"),
    ("primary_ip6_id", "primaryIP6"),
    ("ipaddress_id", "ipAddress"),
    ("vminterface_id", "vmInterface"),
    ("devicetype_id", "deviceType"),
    ("content_type_id", "contentType"),
];

/// Token joining the two sides of an explicitly named association table.
pub const JUNCTION_CONNECTOR: &str = "_to_";

/// Suffixes of association tables backing many-to-many fields.
pub const JUNCTION_SUFFIXES: &[&str] = &[
    "_tagged_vlans",
    "_tags",
    "_members",
    "_groups",
    "_permissions",
    "_content_types",
    "_locations",
    "_prefixes",
    "_vlans",
    "_roles",
    "_devices",
];

/// Column name to field name, first matching rule wins.
pub const FIELD_NAME_RULES: &[NameRule] = &[
    NameRule {
        name: "special-column",
        applies: is_special_column,
        transform: special_column_field,
    },
    NameRule {
        name: "strip-id-suffix",
        applies: has_id_suffix,
        transform: strip_id_suffix,
    },
    NameRule {
        name: "camel-case",
        applies: always,
        transform: to_camel_case,
    },
];

fn special_column(column: &str) -> Option<&'static str> {
    SPECIAL_COLUMNS
        .iter()
        .find(|(name, _)| *name == column)
        .map(|(_, field)| *field)
}

fn is_special_column(column: &str) -> bool {
    special_column(column).is_some()
}

fn special_column_field(column: &str) -> String {
    special_column(column)
        .map(str::to_string)
        .unwrap_or_else(|| to_camel_case(column))
}

fn has_id_suffix(column: &str) -> bool {
    column.len() > 3 && column.ends_with("_id")
}

fn strip_id_suffix(column: &str) -> String {
    to_camel_case(column.strip_suffix("_id").unwrap_or(column))
}

fn always(_: &str) -> bool {
    true
}

/// Infer the schema field name carried by a foreign-key column.
///
/// `manufacturer_id` -> `manufacturer`, `device_type_id` -> `deviceType`.
pub fn infer_field_name(column: &str) -> String {
    NameRule::apply_first(FIELD_NAME_RULES, column).unwrap_or_else(|| to_camel_case(column))
}

/// Whether `table` looks like a many-to-many association table.
pub fn is_junction_table(table: &str) -> bool {
    if table.contains(JUNCTION_CONNECTOR) {
        return true;
    }
    if JUNCTION_SUFFIXES
        .iter()
        .any(|suffix| table.len() > suffix.len() && table.ends_with(suffix))
    {
        return true;
    }

    let segments: Vec<&str> = table.split('_').filter(|s| !s.is_empty()).collect();
    segments.len() >= 3 && segments.last().is_some_and(|last| is_plural(last))
}

fn is_plural(word: &str) -> bool {
    word.len() > 2
        && word.ends_with('s')
        && !word.ends_with("ss")
        && !word.ends_with("us")
        && !word.ends_with("is")
}

/// A foreign key pointing back at its own table.
pub fn is_self_reference(fk: &PgForeignKey) -> bool {
    fk.source_table == fk.target_table
}
