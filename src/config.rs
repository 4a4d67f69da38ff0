use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use validator::{Validate, ValidationError};

use crate::graph_store::Neo4jConfig;
use crate::schema_context::mapping::MappingSource;
use crate::schema_context::metadata_fetcher::{
    FetchLimits, DEFAULT_PATTERN_LIMIT, DEFAULT_PROPERTY_SAMPLE_SIZE,
};
use crate::schema_context::result_cache::ResultCacheConfig;

const BOLT_SCHEMES: &[&str] = &["bolt", "bolt+s", "bolt+ssc", "neo4j", "neo4j+s", "neo4j+ssc"];

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Parse error for {field}: {value} - {source}")]
    Parse {
        field: String,
        value: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Extractor configuration with validation
#[derive(Clone, Debug, Validate, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Bolt URI of the Neo4j server
    #[validate(custom(function = "validate_bolt_uri"))]
    pub neo4j_uri: String,

    #[validate(length(min = 1, message = "Neo4j user cannot be empty"))]
    pub neo4j_user: String,

    #[serde(skip_serializing)]
    pub neo4j_password: String,

    /// Database name, server default when unset
    pub neo4j_database: Option<String>,

    /// Mapping tables file, built-in tables when unset
    pub mappings_path: Option<PathBuf>,

    /// Default samples per label/type (1-50)
    #[validate(range(min = 1, max = 50, message = "max_samples must be between 1 and 50"))]
    pub max_samples: usize,

    /// Relationship patterns kept per type
    #[validate(range(min = 1, max = 100, message = "pattern_limit must be between 1 and 100"))]
    pub pattern_limit: usize,

    /// Elements inspected when collecting property keys
    #[validate(range(
        min = 1,
        max = 1000,
        message = "property_sample_size must be between 1 and 1000"
    ))]
    pub property_sample_size: usize,

    pub cache_enabled: bool,

    #[validate(range(min = 1, message = "cache_ttl_secs must be at least 1"))]
    pub cache_ttl_secs: u64,

    #[validate(range(min = 1, message = "cache_max_entries must be at least 1"))]
    pub cache_max_entries: usize,

    /// Use the LLM suggester when credentials are present
    pub llm_enabled: bool,

    #[validate(range(min = 1, max = 120, message = "llm_timeout_secs must be between 1 and 120"))]
    pub llm_timeout_secs: u64,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            neo4j_uri: "bolt://localhost:7687".to_string(),
            neo4j_user: "neo4j".to_string(),
            neo4j_password: String::new(),
            neo4j_database: None,
            mappings_path: None,
            max_samples: 3,
            pattern_limit: DEFAULT_PATTERN_LIMIT,
            property_sample_size: DEFAULT_PROPERTY_SAMPLE_SIZE,
            cache_enabled: true,
            cache_ttl_secs: 300,
            cache_max_entries: 1000,
            llm_enabled: true,
            llm_timeout_secs: 10,
        }
    }
}

impl ExtractorConfig {
    /// Create configuration from environment variables with validation
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            neo4j_uri: env::var("NEO4J_URI").unwrap_or_else(|_| "bolt://localhost:7687".to_string()),
            neo4j_user: env::var("NEO4J_USER").unwrap_or_else(|_| "neo4j".to_string()),
            neo4j_password: env::var("NEO4J_PASSWORD").unwrap_or_default(),
            neo4j_database: non_empty_env("NEO4J_DATABASE"),
            mappings_path: non_empty_env("GRAPHLENS_MAPPINGS").map(PathBuf::from),
            max_samples: parse_env_var("GRAPHLENS_MAX_SAMPLES", "3")?,
            pattern_limit: parse_env_var("GRAPHLENS_PATTERN_LIMIT", "10")?,
            property_sample_size: parse_env_var("GRAPHLENS_PROPERTY_SAMPLE_SIZE", "25")?,
            cache_enabled: parse_env_var("GRAPHLENS_CACHE_ENABLED", "true")?,
            cache_ttl_secs: parse_env_var("GRAPHLENS_CACHE_TTL_SECS", "300")?,
            cache_max_entries: parse_env_var("GRAPHLENS_CACHE_MAX_ENTRIES", "1000")?,
            llm_enabled: parse_env_var("GRAPHLENS_LLM_ENABLED", "true")?,
            llm_timeout_secs: parse_env_var("GRAPHLENS_LLM_TIMEOUT_SECS", "10")?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Create configuration from YAML file; missing keys take their defaults
    pub fn from_yaml_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Parse {
            field: "yaml_file".to_string(),
            value: "file read failed".to_string(),
            source: Box::new(e),
        })?;

        let config: Self = serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
            field: "yaml_content".to_string(),
            value: content,
            source: Box::new(e),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Create configuration from CLI arguments with validation.
    ///
    /// The base comes from `--config` when given, the environment otherwise;
    /// explicit flags override it.
    pub fn from_cli(cli: CliConfig) -> Result<Self, ConfigError> {
        let mut config = match &cli.config_file {
            Some(path) => Self::from_yaml_file(path)?,
            None => Self::from_env()?,
        };
        config.merge(cli);

        config.validate()?;
        Ok(config)
    }

    /// Apply CLI overrides
    pub fn merge(&mut self, cli: CliConfig) {
        if let Some(path) = cli.mappings_path {
            self.mappings_path = Some(path);
        }
        if let Some(max_samples) = cli.max_samples {
            self.max_samples = max_samples;
        }
        if cli.no_llm {
            self.llm_enabled = false;
        }
        if cli.no_cache {
            self.cache_enabled = false;
        }
    }

    pub fn neo4j_config(&self) -> Neo4jConfig {
        Neo4jConfig {
            uri: self.neo4j_uri.clone(),
            user: self.neo4j_user.clone(),
            password: self.neo4j_password.clone(),
            database: self.neo4j_database.clone(),
            ..Default::default()
        }
    }

    pub fn mapping_source(&self) -> MappingSource {
        match &self.mappings_path {
            Some(path) => MappingSource::File(path.clone()),
            None => MappingSource::Builtin,
        }
    }

    pub fn cache_config(&self) -> ResultCacheConfig {
        ResultCacheConfig {
            enabled: self.cache_enabled,
            ttl: Duration::from_secs(self.cache_ttl_secs),
            max_entries: self.cache_max_entries,
        }
    }

    pub fn fetch_limits(&self) -> FetchLimits {
        FetchLimits {
            pattern_limit: self.pattern_limit,
            property_sample_size: self.property_sample_size,
        }
    }

    pub fn suggest_timeout(&self) -> Duration {
        Duration::from_secs(self.llm_timeout_secs)
    }
}

/// CLI configuration (parsed from command line arguments)
#[derive(Clone, Debug, Default)]
pub struct CliConfig {
    pub config_file: Option<PathBuf>,
    pub mappings_path: Option<PathBuf>,
    pub max_samples: Option<usize>,
    pub no_llm: bool,
    pub no_cache: bool,
}

fn validate_bolt_uri(uri: &str) -> Result<(), ValidationError> {
    let scheme = uri.split("://").next().unwrap_or_default();
    if uri.contains("://") && BOLT_SCHEMES.contains(&scheme) {
        Ok(())
    } else {
        let mut error = ValidationError::new("bolt_uri");
        error.message = Some(format!("unsupported Neo4j URI '{}'", uri).into());
        Err(error)
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Parse an environment variable with a default value
fn parse_env_var<T: std::str::FromStr>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value = env::var(key).unwrap_or_else(|_| default.to_string());
    value.parse().map_err(|e| ConfigError::Parse {
        field: key.to_string(),
        value,
        source: Box::new(e),
    })
}
