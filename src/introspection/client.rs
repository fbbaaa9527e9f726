use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::join_all;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{IntrospectionType, TypeFetcher};
use crate::error::{Result, TypegraphError};

/// `__type` query. The `ofType` nesting matches
/// [`MAX_TYPE_REF_DEPTH`](super::MAX_TYPE_REF_DEPTH) wrappers.
const TYPE_QUERY: &str = r#"
query TypeDetails($name: String!) {
  __type(name: $name) {
    name
    kind
    interfaces { name }
    fields {
      name
      type {
        kind name
        ofType {
          kind name
          ofType {
            kind name
            ofType {
              kind name
              ofType {
                kind name
                ofType {
                  kind name
                  ofType {
                    kind name
                    ofType { kind name }
                  }
                }
              }
            }
          }
        }
      }
    }
  }
}
"#;

/// Request body for a GraphQL POST
#[derive(Serialize)]
struct GraphqlRequest<'a> {
    query: &'a str,
    variables: serde_json::Value,
}

/// Response envelope for the `__type` query
#[derive(Deserialize)]
struct GraphqlResponse {
    data: Option<TypeData>,
    #[serde(default)]
    errors: Vec<GraphqlError>,
}

#[derive(Deserialize)]
struct TypeData {
    #[serde(rename = "__type")]
    type_details: Option<IntrospectionType>,
}

#[derive(Deserialize)]
struct GraphqlError {
    message: String,
}

/// GraphQL introspection client.
///
/// Issues one `__type(name:)` query per requested name; a batch runs its
/// queries concurrently and joins them. Failed or unknown names are logged
/// and left out of the result.
pub struct IntrospectionClient {
    client: Client,
    endpoint: String,
    api_token: Option<String>,
}

impl IntrospectionClient {
    /// Create a client for `endpoint`.
    ///
    /// # Arguments
    ///
    /// * `endpoint` - GraphQL endpoint URL
    /// * `api_token` - Optional API token, sent as `Authorization: Token <token>`
    /// * `timeout` - Per-request timeout
    pub fn new(endpoint: String, api_token: Option<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TypegraphError::Fetch(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint,
            api_token,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Fetch a single type. `Ok(None)` when the server does not know the name.
    pub async fn fetch_type(&self, name: &str) -> Result<Option<IntrospectionType>> {
        let request = GraphqlRequest {
            query: TYPE_QUERY,
            variables: json!({ "name": name }),
        };

        let mut builder = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(&request);
        if let Some(token) = &self.api_token {
            builder = builder.header("Authorization", format!("Token {}", token));
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TypegraphError::Fetch(format!("Network error: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(TypegraphError::Fetch(format!(
                "GraphQL endpoint error {}: {}",
                status, body
            )));
        }

        let result: GraphqlResponse = response
            .json()
            .await
            .map_err(|e| TypegraphError::Fetch(format!("Failed to parse response: {}", e)))?;

        if !result.errors.is_empty() {
            let messages: Vec<String> = result.errors.into_iter().map(|e| e.message).collect();
            return Err(TypegraphError::Fetch(messages.join("; ")));
        }

        Ok(result.data.and_then(|d| d.type_details))
    }
}

#[async_trait]
impl TypeFetcher for IntrospectionClient {
    async fn fetch_types(&self, names: &[String]) -> HashMap<String, IntrospectionType> {
        let start = std::time::Instant::now();
        let results = join_all(names.iter().map(|name| self.fetch_type(name))).await;

        let mut fetched = HashMap::with_capacity(names.len());
        for (name, result) in names.iter().zip(results) {
            match result {
                Ok(Some(introspected)) => {
                    fetched.insert(name.clone(), introspected);
                }
                Ok(None) => log::debug!("Type {} not found on {}", name, self.endpoint),
                Err(e) => log::warn!("Failed to fetch type {}: {}", name, e),
            }
        }

        log::debug!(
            "Fetched {}/{} types in {:?}",
            fetched.len(),
            names.len(),
            start.elapsed()
        );
        fetched
    }
}
