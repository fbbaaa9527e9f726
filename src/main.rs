use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use typegraph::fk::{build_fk_lookup, is_junction_table, parse_foreign_keys, PgForeignKey};
use typegraph::graph::{GraphRequest, GraphSession, PrimaryModelChecker, TypeFilter};
use typegraph::introspection::{IntrospectionClient, StaticTypeFetcher, TypeCache, TypeFetcher};
use typegraph::names::{
    namespace_for_type, table_name_to_type_name, type_name_to_table_name, NameMapper,
};
use typegraph::Config;

#[derive(Parser, Debug)]
#[command(name = "typegraph")]
#[command(about = "Explore a GraphQL schema as a depth-bounded graph with foreign-key annotations")]
struct Args {
    /// Config file (defaults to $TYPEGRAPH_CONFIG, then ./typegraph.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build the graph from one or more root types and print it as JSON
    Build {
        #[arg(required = true)]
        roots: Vec<String>,

        /// Depth levels, roots included
        #[arg(short, long)]
        depth: Option<usize>,

        /// Read types from an introspection dump instead of the endpoint
        #[arg(long)]
        schema_file: Option<PathBuf>,

        /// JSON file of foreign-key rows
        #[arg(long)]
        fk_file: Option<PathBuf>,

        /// Types to treat as primary models
        #[arg(long = "primary")]
        primary: Vec<String>,

        /// Treat every type that maps to a table as primary
        #[arg(long, conflicts_with = "primary")]
        mapped_primary: bool,

        /// Only follow these types
        #[arg(long = "allow")]
        allow: Vec<String>,

        /// Only follow types in these app namespaces (dcim, ipam, ...)
        #[arg(long = "category")]
        category: Vec<String>,
    },

    /// Build the FK lookup from a row file and print stats and entries
    FkStats {
        #[arg(long)]
        fk_file: PathBuf,

        /// Type names to reverse-map tables from (defaults to configured model names)
        #[arg(long = "type")]
        types: Vec<String>,
    },

    /// Convert table names to type names and back
    Names {
        #[arg(required = true)]
        names: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;

    env_logger::Builder::from_env(
        env_logger::Env::default().filter_or("RUST_LOG", config.typegraph.log_level.as_str()),
    )
    .init();

    match args.command {
        Command::Build {
            roots,
            depth,
            schema_file,
            fk_file,
            primary,
            mapped_primary,
            allow,
            category,
        } => {
            let fetcher = build_fetcher(&config, schema_file.as_deref())?;
            let session = GraphSession::new(
                Arc::new(TypeCache::new()),
                fetcher,
                config.transform_options(),
            );

            if let Some(path) = fk_file.as_deref().or(config.foreign_keys.path.as_deref()) {
                session.set_foreign_keys(read_fk_rows(path)?);
            }
            if let Some(models) = &config.models.names {
                session.set_model_names(models.clone());
            }

            let mut request = GraphRequest::new(roots, depth.unwrap_or(config.graph.max_depth));
            let allowlist = (!allow.is_empty()).then(|| TypeFilter::allow_only(allow));
            let categories = (!category.is_empty()).then(|| TypeFilter::categories(category));
            if let Some(filter) = TypeFilter::combine(allowlist, categories) {
                log::info!("Type filter: {}", filter.description());
                request = request.with_type_filter(filter);
            }
            if mapped_primary {
                request = request.with_primary_model_checker(mapped_primary_checker(&config));
            } else if !primary.is_empty() {
                request =
                    request.with_primary_model_checker(PrimaryModelChecker::from_names(primary));
            }

            let build = session.rebuild(request).await?;
            println!("{}", serde_json::to_string_pretty(build.as_ref())?);
        }
        Command::FkStats { fk_file, types } => {
            let rows = read_fk_rows(&fk_file)?;
            let mapper = if !types.is_empty() {
                NameMapper::from_type_names(&types)
            } else if let Some(models) = &config.models.names {
                NameMapper::from_model_names(models)
            } else {
                anyhow::bail!("fk-stats needs --type names or [models] names in the config");
            };

            let result = build_fk_lookup(&rows, &mapper);
            let entries: BTreeMap<&String, _> = result.lookup.iter().collect();
            let report = json!({
                "stats": result.stats,
                "entries": entries,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Names { names } => {
            for name in names {
                println!("{}", describe_name(&name));
            }
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    if let Some(path) = path {
        let _ = dotenv::dotenv();
        return Config::load_from(path);
    }
    if std::env::var_os("TYPEGRAPH_CONFIG").is_some() || Path::new("typegraph.toml").exists() {
        return Config::load();
    }
    let _ = dotenv::dotenv();
    Ok(Config::default())
}

fn build_fetcher(config: &Config, schema_file: Option<&Path>) -> Result<Arc<dyn TypeFetcher>> {
    if let Some(path) = schema_file {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read schema file: {}", path.display()))?;
        let fetcher = StaticTypeFetcher::from_json(&json)
            .with_context(|| format!("Invalid schema file: {}", path.display()))?;
        return Ok(Arc::new(fetcher));
    }

    let endpoint = config
        .schema
        .endpoint
        .clone()
        .context("No schema source: set [schema] endpoint or pass --schema-file")?;
    let client = IntrospectionClient::new(endpoint, config.api_token(), config.timeout())?;
    log::info!("Introspecting {}", client.endpoint());
    Ok(Arc::new(client))
}

fn read_fk_rows(path: &Path) -> Result<Vec<PgForeignKey>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read FK file: {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&raw)
        .with_context(|| format!("FK file is not JSON: {}", path.display()))?;

    let parsed = parse_foreign_keys(&value);
    if !parsed.dropped.is_empty() {
        log::warn!(
            "{} FK records dropped from {}",
            parsed.dropped.len(),
            path.display()
        );
    }
    log::info!("Loaded {} FK rows from {}", parsed.rows.len(), path.display());
    Ok(parsed.rows)
}

fn mapped_primary_checker(config: &Config) -> PrimaryModelChecker {
    match &config.models.names {
        Some(models) => PrimaryModelChecker::mapped_by(&NameMapper::from_model_names(models)),
        None => PrimaryModelChecker::new(|name| type_name_to_table_name(name).is_some()),
    }
}

fn describe_name(name: &str) -> String {
    let looks_like_table = name.contains('_') || name.starts_with(|c: char| c.is_ascii_lowercase());
    if looks_like_table {
        let junction = if is_junction_table(name) { " (junction)" } else { "" };
        match table_name_to_type_name(name) {
            Some(type_name) => format!("{}{} -> {}", name, junction, type_name),
            None => format!("{}{} -> (no type)", name, junction),
        }
    } else {
        let namespace = namespace_for_type(name).unwrap_or("?");
        match type_name_to_table_name(name) {
            Some(table) => format!("{} [{}] -> {}", name, namespace, table),
            None => format!("{} [{}] -> (no table)", name, namespace),
        }
    }
}
