mod repl;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use graphlens::config::{CliConfig, ExtractorConfig};
use graphlens::graph_store::{GraphStore, InMemoryGraphStore, Neo4jGraphStore};
use graphlens::schema_context::{DynamicSchemaExtractor, MappingRegistry};

/// GraphLens - schema context extraction for natural-language graph queries
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// YAML configuration file (defaults to environment variables)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Mapping tables YAML (defaults to the built-in ERP tables)
    #[arg(long)]
    mappings: Option<PathBuf>,

    /// Serve metadata from a YAML graph fixture instead of Neo4j
    #[arg(long)]
    fixture: Option<PathBuf>,

    /// Samples per label and relationship type
    #[arg(long)]
    max_samples: Option<usize>,

    /// Rule-based term extraction only
    #[arg(long)]
    no_llm: bool,

    /// Disable the result cache
    #[arg(long)]
    no_cache: bool,

    /// Print results as JSON instead of markdown
    #[arg(long)]
    json: bool,

    /// Query to extract a schema context for; starts a REPL when omitted
    query: Option<String>,
}

impl From<&Cli> for CliConfig {
    fn from(cli: &Cli) -> Self {
        CliConfig {
            config_file: cli.config.clone(),
            mappings_path: cli.mappings.clone(),
            max_samples: cli.max_samples,
            no_llm: cli.no_llm,
            no_cache: cli.no_cache,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Missing .env is fine
    let _ = dotenvy::dotenv();

    // Initialize logger - defaults to INFO level, can be overridden with RUST_LOG env var
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = ExtractorConfig::from_cli(CliConfig::from(&cli)).context("Configuration error")?;

    let mappings = Arc::new(
        MappingRegistry::load(config.mapping_source()).context("Failed to load mapping tables")?,
    );

    let store: Arc<dyn GraphStore> = match &cli.fixture {
        Some(path) => {
            let store = InMemoryGraphStore::from_yaml_file(path)
                .with_context(|| format!("Failed to load graph fixture {}", path.display()))?;
            log::info!(
                "Loaded fixture {} ({} nodes, {} relationships)",
                path.display(),
                store.node_count(),
                store.relationship_count()
            );
            Arc::new(store)
        }
        None => Arc::new(
            Neo4jGraphStore::connect(&config.neo4j_config())
                .await
                .context("Failed to connect to Neo4j")?,
        ),
    };

    let extractor = DynamicSchemaExtractor::from_config(&config, mappings, store);

    match &cli.query {
        Some(query) => {
            let result = extractor.extract(query).await?;
            repl::print_result(&result, cli.json)?;
        }
        None => repl::run(&extractor, cli.json).await?,
    }

    Ok(())
}
