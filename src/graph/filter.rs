//! Type predicates consumed by the graph builder.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::names::{namespace_for_type, NameMapper};

type Predicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Decides which relationship targets may become nodes. Roots are never
/// filtered.
///
/// Filters compose with [`TypeFilter::and`]: when a type allowlist and a
/// category filter are both active, a type must pass both. The allowlist
/// never overrides the category filter.
#[derive(Clone)]
pub struct TypeFilter {
    description: String,
    predicate: Predicate,
}

impl TypeFilter {
    pub fn new<F>(description: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        Self {
            description: description.into(),
            predicate: Arc::new(predicate),
        }
    }

    /// Only the listed types.
    pub fn allow_only<I, S>(types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let allowed: HashSet<String> = types.into_iter().map(Into::into).collect();
        let description = format!("allow {} types", allowed.len());
        Self::new(description, move |name| allowed.contains(name))
    }

    /// Only types whose app namespace (`dcim`, `ipam`, ...) is listed.
    /// Types with no known namespace are rejected.
    pub fn categories<I, S>(namespaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let namespaces: HashSet<String> = namespaces
            .into_iter()
            .map(|ns| ns.into().to_ascii_lowercase())
            .collect();
        let mut listed: Vec<&String> = namespaces.iter().collect();
        listed.sort();
        let description = format!(
            "categories {}",
            listed.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(",")
        );
        Self::new(description, move |name| {
            namespace_for_type(name).is_some_and(|ns| namespaces.contains(ns))
        })
    }

    /// Both filters must pass.
    pub fn and(self, other: TypeFilter) -> Self {
        let description = format!("{} and {}", self.description, other.description);
        let (left, right) = (self.predicate, other.predicate);
        Self {
            description,
            predicate: Arc::new(move |name: &str| left(name) && right(name)),
        }
    }

    /// Compose an optional allowlist with an optional category filter.
    pub fn combine(
        allowlist: Option<TypeFilter>,
        category: Option<TypeFilter>,
    ) -> Option<TypeFilter> {
        match (allowlist, category) {
            (Some(allow), Some(category)) => Some(allow.and(category)),
            (Some(filter), None) | (None, Some(filter)) => Some(filter),
            (None, None) => None,
        }
    }

    pub fn allows(&self, type_name: &str) -> bool {
        (self.predicate)(type_name)
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

impl fmt::Debug for TypeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TypeFilter").field(&self.description).finish()
    }
}

/// Whether a type is a primary model (backed by a real relational entity).
/// Supplied by whatever registry knows; the graph builder only asks.
#[derive(Clone)]
pub struct PrimaryModelChecker {
    predicate: Predicate,
}

impl PrimaryModelChecker {
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        Self {
            predicate: Arc::new(predicate),
        }
    }

    pub fn from_names<I, S>(types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let primary: HashSet<String> = types.into_iter().map(Into::into).collect();
        Self::new(move |name| primary.contains(name))
    }

    /// Every type the mapper can place in a table.
    pub fn mapped_by(mapper: &NameMapper) -> Self {
        let primary: HashSet<String> = mapper
            .pairs()
            .into_iter()
            .map(|(_, type_name)| type_name.to_string())
            .collect();
        Self::new(move |name| primary.contains(name))
    }

    pub fn is_primary(&self, type_name: &str) -> bool {
        (self.predicate)(type_name)
    }
}

impl fmt::Debug for PrimaryModelChecker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrimaryModelChecker").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allow_only() {
        let filter = TypeFilter::allow_only(["DeviceType", "RackType"]);
        assert!(filter.allows("DeviceType"));
        assert!(!filter.allows("VLANType"));
        assert_eq!(filter.description(), "allow 2 types");
    }

    #[test]
    fn test_categories() {
        let filter = TypeFilter::categories(["DCIM"]);
        assert!(filter.allows("DeviceType"));
        assert!(filter.allows("RackType"));
        assert!(!filter.allows("VLANType"));
        assert!(!filter.allows("Query"));
    }

    #[test]
    fn test_allowlist_and_category_compose_with_and() {
        let filter = TypeFilter::combine(
            Some(TypeFilter::allow_only(["DeviceType", "VLANType"])),
            Some(TypeFilter::categories(["dcim"])),
        )
        .unwrap();
        assert!(filter.allows("DeviceType"));
        // Allowlisted but outside the category
        assert!(!filter.allows("VLANType"));
        // In the category but not allowlisted
        assert!(!filter.allows("RackType"));
        assert_eq!(filter.description(), "allow 2 types and categories dcim");
    }

    #[test]
    fn test_combine_single_and_none() {
        assert!(TypeFilter::combine(None, None).is_none());
        let only = TypeFilter::combine(None, Some(TypeFilter::categories(["ipam"]))).unwrap();
        assert!(only.allows("VLANType"));
    }

    #[test]
    fn test_primary_model_checker() {
        let checker = PrimaryModelChecker::from_names(["DeviceType"]);
        assert!(checker.is_primary("DeviceType"));
        assert!(!checker.is_primary("ManufacturerType"));

        let mapper = NameMapper::from_type_names(["DeviceType", "Query"]);
        let checker = PrimaryModelChecker::mapped_by(&mapper);
        assert!(checker.is_primary("DeviceType"));
        assert!(!checker.is_primary("Query"));
    }

    #[test]
    fn test_debug_output() {
        let checker = PrimaryModelChecker::from_names(["DeviceType"]);
        assert_eq!(format!("{:?}", checker), "PrimaryModelChecker { .. }");
        let filter = TypeFilter::categories(["ipam"]);
        assert_eq!(format!("{:?}", filter), "TypeFilter(\"categories ipam\")");
    }
}
