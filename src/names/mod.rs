//! Name mapping between relational table names and schema type names.
//!
//! The mapping is built once per session, either in reverse from the type
//! names discovered through introspection or forward from authoritative
//! `app_label.model` names. Both directions are lossy heuristics; every
//! lookup may miss and returns `None` when it does.

pub mod rules;

use std::collections::HashMap;

use crate::fk::is_junction_table;

pub use rules::{table_name_to_type_name, type_name_to_table_name, TYPE_SUFFIX};

/// Bidirectional, 1:1 table <-> type mapping.
#[derive(Debug, Clone, Default)]
pub struct NameMapper {
    table_to_type: HashMap<String, String>,
    type_to_table: HashMap<String, String>,
}

impl NameMapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build by reverse-engineering a table name for each discovered type.
    /// Types with no recognisable table are left unmapped.
    pub fn from_type_names<I, S>(type_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut mapper = Self::new();
        let mut unmapped = 0usize;
        for type_name in type_names {
            let type_name = type_name.as_ref();
            match type_name_to_table_name(type_name) {
                Some(table) => {
                    mapper.insert(table, type_name.to_string());
                }
                None => unmapped += 1,
            }
        }
        log::debug!(
            "Name mapper built from type names: {} mapped, {} unmapped",
            mapper.len(),
            unmapped
        );
        mapper
    }

    /// Build forward from authoritative model names, `dcim.device` or `dcim_device`.
    pub fn from_model_names<I, S>(model_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut mapper = Self::new();
        for model in model_names {
            let table = model.as_ref().trim().to_ascii_lowercase().replace('.', "_");
            if let Some(type_name) = table_name_to_type_name(&table) {
                mapper.insert(table, type_name);
            }
        }
        log::debug!("Name mapper built from model names: {} mapped", mapper.len());
        mapper
    }

    /// Register a pair. Refused (returns false) when either side is already
    /// mapped, keeping the mapping 1:1 in both directions.
    pub fn insert(&mut self, table: String, type_name: String) -> bool {
        if let Some(existing) = self.table_to_type.get(&table) {
            log::debug!(
                "Table {} already mapped to {}, ignoring {}",
                table,
                existing,
                type_name
            );
            return false;
        }
        if let Some(existing) = self.type_to_table.get(&type_name) {
            log::debug!(
                "Type {} already mapped to {}, ignoring {}",
                type_name,
                existing,
                table
            );
            return false;
        }
        self.type_to_table.insert(type_name.clone(), table.clone());
        self.table_to_type.insert(table, type_name);
        true
    }

    /// Type name for a table.
    ///
    /// A junction table that is not registered itself resolves to the type
    /// owning it: the longest registered table that prefixes it followed
    /// by `_` (`dcim_interface_tagged_vlans` -> the `dcim_interface` type).
    pub fn table_to_type(&self, table: &str) -> Option<&str> {
        if let Some(type_name) = self.table_to_type.get(table) {
            return Some(type_name.as_str());
        }
        if !is_junction_table(table) {
            return None;
        }
        self.table_to_type
            .iter()
            .filter(|(owner, _)| {
                table.len() > owner.len() + 1
                    && table.starts_with(owner.as_str())
                    && table.as_bytes()[owner.len()] == b'_'
            })
            .max_by_key(|(owner, _)| owner.len())
            .map(|(_, type_name)| type_name.as_str())
    }

    pub fn type_to_table(&self, type_name: &str) -> Option<&str> {
        self.type_to_table.get(type_name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.table_to_type.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table_to_type.is_empty()
    }

    /// All (table, type) pairs, sorted by table.
    pub fn pairs(&self) -> Vec<(&str, &str)> {
        let mut pairs: Vec<(&str, &str)> = self
            .table_to_type
            .iter()
            .map(|(table, type_name)| (table.as_str(), type_name.as_str()))
            .collect();
        pairs.sort();
        pairs
    }
}

/// Category (app namespace) a type belongs to, e.g. `dcim` for `DeviceType`.
pub fn namespace_for_type(type_name: &str) -> Option<&'static str> {
    let key = rules::model_key_for_type(type_name)?;
    rules::namespace_for_model_key(&key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_type_names() {
        let mapper = NameMapper::from_type_names(["DeviceType", "IPAddressType", "Query"]);
        assert_eq!(mapper.len(), 2);
        assert_eq!(mapper.type_to_table("DeviceType"), Some("dcim_device"));
        assert_eq!(mapper.table_to_type("ipam_ipaddress"), Some("IPAddressType"));
        assert_eq!(mapper.type_to_table("Query"), None);
    }

    #[test]
    fn test_from_model_names() {
        let mapper = NameMapper::from_model_names(["dcim.device", "DCIM.DeviceType", "ipam_vlan"]);
        assert_eq!(mapper.table_to_type("dcim_device"), Some("DeviceType"));
        assert_eq!(mapper.table_to_type("dcim_devicetype"), Some("DeviceTypeType"));
        assert_eq!(mapper.type_to_table("VLANType"), Some("ipam_vlan"));
    }

    #[test]
    fn test_insert_keeps_one_to_one() {
        let mut mapper = NameMapper::new();
        assert!(mapper.insert("dcim_device".into(), "DeviceType".into()));
        assert!(!mapper.insert("dcim_device".into(), "OtherType".into()));
        assert!(!mapper.insert("legacy_device".into(), "DeviceType".into()));

        assert_eq!(mapper.len(), 1);
        assert_eq!(mapper.table_to_type("dcim_device"), Some("DeviceType"));
        assert_eq!(mapper.type_to_table("DeviceType"), Some("dcim_device"));
        assert_eq!(mapper.table_to_type("legacy_device"), None);
    }

    #[test]
    fn test_junction_table_resolves_to_owner() {
        let mapper = NameMapper::from_type_names(["InterfaceType", "VLANType"]);
        assert_eq!(
            mapper.table_to_type("dcim_interface_tagged_vlans"),
            Some("InterfaceType")
        );
        // Fallback result is not registered
        assert_eq!(mapper.len(), 2);
    }

    #[test]
    fn test_junction_prefers_longest_owner() {
        let mut mapper = NameMapper::new();
        mapper.insert("dcim_interface".into(), "InterfaceType".into());
        mapper.insert("dcim_interface_template".into(), "InterfaceTemplateType".into());
        assert_eq!(
            mapper.table_to_type("dcim_interface_template_tags"),
            Some("InterfaceTemplateType")
        );
    }

    #[test]
    fn test_non_junction_miss_is_none() {
        let mapper = NameMapper::from_type_names(["InterfaceType"]);
        assert_eq!(mapper.table_to_type("dcim_interface_extra"), None);
        assert_eq!(mapper.table_to_type("dcim_rack"), None);
    }

    #[test]
    fn test_namespace_for_type() {
        assert_eq!(namespace_for_type("DeviceType"), Some("dcim"));
        assert_eq!(namespace_for_type("VLANType"), Some("ipam"));
        assert_eq!(namespace_for_type("VirtualMachineType"), Some("virtualization"));
        assert_eq!(namespace_for_type("Query"), None);
    }

    #[test]
    fn test_pairs_sorted() {
        let mapper = NameMapper::from_type_names(["VLANType", "DeviceType"]);
        assert_eq!(
            mapper.pairs(),
            vec![("dcim_device", "DeviceType"), ("ipam_vlan", "VLANType")]
        );
    }
}
