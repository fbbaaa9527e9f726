//! Foreign-key metadata: raw relational FK rows classified into a lookup
//! keyed by `"Type.field"`.

mod builder;
mod inference;
mod parse;

pub use builder::{build_fk_lookup, FkBuildStats, FkLookupResult};
pub use inference::{infer_field_name, is_junction_table, is_self_reference};
pub use parse::{parse_foreign_keys, ParsedForeignKeys};

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One raw foreign-key row as reported by the relational catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PgForeignKey {
    pub source_table: String,
    pub source_column: String,
    pub target_table: String,
    pub target_column: String,
}

impl PgForeignKey {
    pub fn new(
        source_table: impl Into<String>,
        source_column: impl Into<String>,
        target_table: impl Into<String>,
        target_column: impl Into<String>,
    ) -> Self {
        Self {
            source_table: source_table.into(),
            source_column: source_column.into(),
            target_table: target_table.into(),
            target_column: target_column.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Forward,
    Reverse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Cardinality {
    ManyToOne,
    OneToMany,
    ManyToMany,
}

/// Classified relationship for one `"Type.field"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FkMetadata {
    pub direction: Direction,
    pub cardinality: Cardinality,
    pub source_table: String,
    pub target_table: String,
    pub source_column: String,
    pub target_column: String,
    pub field_name: String,
    pub is_junction_table: bool,
    pub is_self_reference: bool,
}

/// `"Type.field" -> FkMetadata`. Read-only once built.
#[derive(Debug, Clone, Default)]
pub struct FkLookup {
    entries: HashMap<String, FkMetadata>,
}

impl FkLookup {
    pub fn key(type_name: &str, field_name: &str) -> String {
        format!("{}.{}", type_name, field_name)
    }

    pub fn get(&self, type_name: &str, field_name: &str) -> Option<&FkMetadata> {
        self.entries.get(&Self::key(type_name, field_name))
    }

    pub fn get_key(&self, key: &str) -> Option<&FkMetadata> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries sorted by key.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &FkMetadata)> {
        let mut entries: Vec<_> = self.entries.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries.into_iter()
    }

    /// Insert unless the key exists. Returns false on collision, leaving
    /// the existing entry untouched.
    pub(crate) fn insert_new(&mut self, key: String, metadata: FkMetadata) -> bool {
        if self.entries.contains_key(&key) {
            return false;
        }
        self.entries.insert(key, metadata);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(field: &str) -> FkMetadata {
        FkMetadata {
            direction: Direction::Forward,
            cardinality: Cardinality::ManyToOne,
            source_table: "dcim_device".to_string(),
            target_table: "dcim_rack".to_string(),
            source_column: "rack_id".to_string(),
            target_column: "id".to_string(),
            field_name: field.to_string(),
            is_junction_table: false,
            is_self_reference: false,
        }
    }

    #[test]
    fn test_lookup_insert_new_refuses_overwrite() {
        let mut lookup = FkLookup::default();
        assert!(lookup.insert_new(FkLookup::key("DeviceType", "rack"), metadata("rack")));

        let mut other = metadata("rack");
        other.target_table = "dcim_other".to_string();
        assert!(!lookup.insert_new(FkLookup::key("DeviceType", "rack"), other));

        assert_eq!(lookup.len(), 1);
        assert_eq!(lookup.get("DeviceType", "rack").unwrap().target_table, "dcim_rack");
        assert!(lookup.get_key("DeviceType.rack").is_some());
    }

    #[test]
    fn test_lookup_iter_sorted() {
        let mut lookup = FkLookup::default();
        lookup.insert_new(FkLookup::key("RackType", "location"), metadata("location"));
        lookup.insert_new(FkLookup::key("DeviceType", "rack"), metadata("rack"));
        let keys: Vec<&String> = lookup.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["DeviceType.rack", "RackType.location"]);
    }

    #[test]
    fn test_metadata_serializes_camel_case_and_kebab_cardinality() {
        let mut m = metadata("rack");
        m.cardinality = Cardinality::ManyToMany;
        let json = serde_json::to_value(&m).unwrap();
        assert_eq!(json["cardinality"], "many-to-many");
        assert_eq!(json["direction"], "forward");
        assert_eq!(json["isJunctionTable"], false);
        assert_eq!(json["sourceTable"], "dcim_device");
    }
}
