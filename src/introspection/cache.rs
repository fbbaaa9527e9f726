//! Session-wide cache of introspected types.
//!
//! Grows monotonically: an entry appears only once its fetch fully succeeded
//! and is never replaced. Only [`TypeCache::clear`] removes entries.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use super::IntrospectionType;

/// Caller-owned cache of `name -> IntrospectionType`.
#[derive(Default)]
pub struct TypeCache {
    inner: RwLock<HashMap<String, Arc<IntrospectionType>>>,
}

impl TypeCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a cache pre-populated with the given types.
    pub fn with_types(types: impl IntoIterator<Item = IntrospectionType>) -> Self {
        let cache = Self::new();
        cache.insert_all(types);
        cache
    }

    pub fn get(&self, name: &str) -> Option<Arc<IntrospectionType>> {
        self.read().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.read().contains_key(name)
    }

    /// Publish fetched types. Names already cached keep their first entry.
    /// Returns how many new entries were added.
    pub fn insert_all(&self, types: impl IntoIterator<Item = IntrospectionType>) -> usize {
        let mut guard = self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut added = 0;
        for introspected in types {
            if !guard.contains_key(&introspected.name) {
                guard.insert(introspected.name.clone(), Arc::new(introspected));
                added += 1;
            }
        }
        added
    }

    /// Names from `names` not yet in the cache, in input order, without duplicates.
    pub fn missing<'a, I>(&self, names: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a String>,
    {
        let guard = self.read();
        let mut seen = HashSet::new();
        names
            .into_iter()
            .filter(|name| !guard.contains_key(*name) && seen.insert(name.as_str()))
            .cloned()
            .collect()
    }

    /// All cached type names, sorted.
    pub fn type_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Drop every entry. Only called on an explicit session reset.
    pub fn clear(&self) {
        self.inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Arc<IntrospectionType>>> {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::introspection::{Field, TypeKind, TypeRef};

    #[test]
    fn test_cache_insert_and_get() {
        let cache = TypeCache::new();
        assert!(cache.is_empty());

        let added = cache.insert_all(vec![IntrospectionType::object("DeviceType", vec![])]);
        assert_eq!(added, 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.contains("DeviceType"));
        assert_eq!(cache.get("DeviceType").unwrap().name, "DeviceType");
        assert!(cache.get("RackType").is_none());
    }

    #[test]
    fn test_cache_first_entry_wins() {
        let cache = TypeCache::new();
        cache.insert_all(vec![IntrospectionType::object("DeviceType", vec![])]);

        let replacement = IntrospectionType::object(
            "DeviceType",
            vec![Field::new("rack", TypeRef::named(TypeKind::Object, "RackType"))],
        );
        let added = cache.insert_all(vec![replacement]);

        assert_eq!(added, 0);
        assert!(cache.get("DeviceType").unwrap().fields.is_empty());
    }

    #[test]
    fn test_cache_missing_preserves_order_and_dedupes() {
        let cache = TypeCache::with_types(vec![IntrospectionType::object("RackType", vec![])]);
        let wanted = vec![
            "SiteType".to_string(),
            "RackType".to_string(),
            "DeviceType".to_string(),
            "SiteType".to_string(),
        ];
        assert_eq!(cache.missing(&wanted), vec!["SiteType", "DeviceType"]);
    }

    #[test]
    fn test_cache_type_names_sorted_and_clear() {
        let cache = TypeCache::with_types(vec![
            IntrospectionType::object("VLANType", vec![]),
            IntrospectionType::object("DeviceType", vec![]),
        ]);
        assert_eq!(cache.type_names(), vec!["DeviceType", "VLANType"]);

        cache.clear();
        assert!(cache.is_empty());
        assert!(cache.type_names().is_empty());
    }
}
