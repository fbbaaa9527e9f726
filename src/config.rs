use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::graph::{TransformOptions, DEFAULT_FETCH_CAP_PER_DEPTH};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub schema: SchemaConfig,
    #[serde(default)]
    pub graph: GraphConfig,
    #[serde(default)]
    pub foreign_keys: ForeignKeysConfig,
    #[serde(default)]
    pub models: ModelsConfig,
    #[serde(default)]
    pub typegraph: TypegraphConfig,
}

/// GraphQL endpoint used for introspection
#[derive(Debug, Clone, Deserialize)]
pub struct SchemaConfig {
    /// e.g. `https://nautobot.example.com/api/graphql/`. Unset when types
    /// come from a schema dump instead.
    pub endpoint: Option<String>,
    #[serde(default = "default_api_token_env")]
    pub api_token_env: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_token_env: default_api_token_env(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Graph builder defaults
#[derive(Debug, Clone, Deserialize)]
pub struct GraphConfig {
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    #[serde(default = "default_fetch_cap")]
    pub fetch_cap_per_depth: usize,
    #[serde(default)]
    pub include_scalars: bool,
    #[serde(default)]
    pub show_field_nodes: bool,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            fetch_cap_per_depth: default_fetch_cap(),
            include_scalars: false,
            show_field_nodes: false,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ForeignKeysConfig {
    /// JSON file of FK rows
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelsConfig {
    /// Authoritative `app_label.model` names. When set, tables are mapped
    /// forward from these rather than from discovered type names.
    pub names: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TypegraphConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for TypegraphConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_api_token_env() -> String {
    "TYPEGRAPH_API_TOKEN".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_depth() -> usize {
    2
}

fn default_fetch_cap() -> usize {
    DEFAULT_FETCH_CAP_PER_DEPTH
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from file
    ///
    /// Loads environment variables from .env file (if present) before loading config.
    /// Looks for config file in this order:
    /// 1. Path specified in TYPEGRAPH_CONFIG environment variable
    /// 2. ./typegraph.toml in current directory
    pub fn load() -> Result<Self> {
        // Optional; the API token usually lives here
        let _ = dotenv::dotenv();

        let config_path = std::env::var("TYPEGRAPH_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("typegraph.toml"));

        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml_str(&config_str)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }

    pub fn from_toml_str(config_str: &str) -> Result<Self> {
        let config: Config = toml::from_str(config_str).context("Failed to parse config TOML")?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if let Some(endpoint) = &self.schema.endpoint {
            let parsed = url::Url::parse(endpoint)
                .with_context(|| format!("schema.endpoint is not a valid URL: {}", endpoint))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                anyhow::bail!("schema.endpoint must be http or https, got {}", parsed.scheme());
            }
        }

        if self.schema.timeout_secs == 0 {
            anyhow::bail!("schema.timeout_secs must be greater than 0");
        }

        if self.graph.max_depth == 0 {
            anyhow::bail!("graph.max_depth must be at least 1");
        }

        if self.graph.fetch_cap_per_depth == 0 {
            anyhow::bail!("graph.fetch_cap_per_depth must be at least 1");
        }

        if let Some(names) = &self.models.names {
            if let Some(bad) = names.iter().find(|name| name.trim().is_empty()) {
                anyhow::bail!("models.names contains an empty entry: {:?}", bad);
            }
        }

        Ok(())
    }

    /// API token from the environment variable named by `schema.api_token_env`
    pub fn api_token(&self) -> Option<String> {
        std::env::var(&self.schema.api_token_env)
            .ok()
            .filter(|token| !token.trim().is_empty())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.schema.timeout_secs)
    }

    /// Builder options seeded from `[graph]`. Filters, the primary-model
    /// checker and the FK lookup are attached per build.
    pub fn transform_options(&self) -> TransformOptions {
        TransformOptions {
            max_depth: self.graph.max_depth,
            include_scalars: self.graph.include_scalars,
            show_field_nodes: self.graph.show_field_nodes,
            fetch_cap_per_depth: self.graph.fetch_cap_per_depth,
            ..Default::default()
        }
    }
}
