use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::Deserialize;

use super::IntrospectionType;
use crate::error::Result;

/// Batch source of introspected types.
///
/// Returns the subset of `names` it could resolve. Unresolvable names are
/// omitted rather than failing the whole batch; retries, if any, are the
/// implementation's business.
#[async_trait]
pub trait TypeFetcher: Send + Sync {
    async fn fetch_types(&self, names: &[String]) -> HashMap<String, IntrospectionType>;
}

/// In-memory fetcher over a fixed set of types, e.g. a saved
/// `__schema { types }` dump.
///
/// Records every batch it receives so callers can inspect fetch behaviour.
#[derive(Default)]
pub struct StaticTypeFetcher {
    types: HashMap<String, IntrospectionType>,
    requests: Mutex<Vec<Vec<String>>>,
}

#[derive(Deserialize)]
struct SchemaDump {
    #[serde(rename = "__schema")]
    schema: SchemaTypes,
}

#[derive(Deserialize)]
struct SchemaTypes {
    types: Vec<IntrospectionType>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SchemaDocument {
    Wrapped { data: SchemaDump },
    Bare(SchemaDump),
    List(Vec<IntrospectionType>),
}

impl StaticTypeFetcher {
    pub fn new(types: impl IntoIterator<Item = IntrospectionType>) -> Self {
        Self {
            types: types.into_iter().map(|t| (t.name.clone(), t)).collect(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Parse a schema dump: `{"data": {"__schema": {"types": [...]}}}`,
    /// the same without the `data` envelope, or a bare array of types.
    pub fn from_json(json: &str) -> Result<Self> {
        let types = match serde_json::from_str::<SchemaDocument>(json)? {
            SchemaDocument::Wrapped { data } => data.schema.types,
            SchemaDocument::Bare(dump) => dump.schema.types,
            SchemaDocument::List(types) => types,
        };
        log::debug!("Loaded {} types from schema dump", types.len());
        Ok(Self::new(types))
    }

    pub fn type_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.types.keys().cloned().collect();
        names.sort();
        names
    }

    /// Every batch received so far, in call order.
    pub fn requests(&self) -> Vec<Vec<String>> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl TypeFetcher for StaticTypeFetcher {
    async fn fetch_types(&self, names: &[String]) -> HashMap<String, IntrospectionType> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(names.to_vec());

        names
            .iter()
            .filter_map(|name| self.types.get(name).map(|t| (name.clone(), t.clone())))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_fetcher_returns_subset() {
        let fetcher = StaticTypeFetcher::new(vec![IntrospectionType::object("DeviceType", vec![])]);
        let fetched = fetcher
            .fetch_types(&["DeviceType".to_string(), "GhostType".to_string()])
            .await;

        assert_eq!(fetched.len(), 1);
        assert!(fetched.contains_key("DeviceType"));
        assert_eq!(fetcher.requests().len(), 1);
        assert_eq!(fetcher.requests()[0].len(), 2);
    }

    #[test]
    fn test_from_json_wrapped_dump() {
        let json = r#"{"data": {"__schema": {"types": [
            {"name": "DeviceType", "kind": "OBJECT", "fields": [], "interfaces": []},
            {"name": "String", "kind": "SCALAR", "fields": null, "interfaces": null}
        ]}}}"#;
        let fetcher = StaticTypeFetcher::from_json(json).unwrap();
        assert_eq!(fetcher.type_names(), vec!["DeviceType", "String"]);
    }

    #[test]
    fn test_from_json_bare_list() {
        let json = r#"[{"name": "RackType", "kind": "OBJECT", "fields": []}]"#;
        let fetcher = StaticTypeFetcher::from_json(json).unwrap();
        assert_eq!(fetcher.type_names(), vec!["RackType"]);
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(StaticTypeFetcher::from_json(r#"{"nope": 1}"#).is_err());
    }
}
