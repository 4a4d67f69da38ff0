//! The extraction pipeline: terms, candidates, metadata, cache.

use std::sync::Arc;
use std::time::{Duration, Instant};

use super::candidate_matcher::{CandidateMatcher, SynonymLookup};
use super::errors::{ExtractionError, MappingError, SetupError};
use super::llm::LlmTermSuggester;
use super::mapping::{MappingRegistry, MappingTables};
use super::metadata_fetcher::{FetchLimits, MetadataFetcher, MAX_SAMPLES_CAP};
use super::result_cache::{CacheMetrics, ResultCache, ResultCacheConfig, ResultCacheKey};
use super::term_extractor::{TermExtractor, TermSuggester};
use super::types::{CandidateSchema, DynamicSchemaResult, QueryTerms};
use crate::config::ExtractorConfig;
use crate::graph_store::{GraphStore, Neo4jGraphStore};

pub const DEFAULT_MAX_SAMPLES: usize = 3;

/// Builds the schema context for natural-language queries.
///
/// Cheap to share behind an [`Arc`]; every method takes `&self`.
pub struct DynamicSchemaExtractor {
    mappings: Arc<MappingRegistry>,
    term_extractor: TermExtractor,
    matcher: CandidateMatcher,
    fetcher: MetadataFetcher,
    cache: ResultCache,
    default_max_samples: usize,
}

impl DynamicSchemaExtractor {
    /// Rule-based terms, default limits, default cache
    pub fn new(mappings: Arc<MappingRegistry>, store: Arc<dyn GraphStore>) -> Self {
        DynamicSchemaExtractor {
            term_extractor: TermExtractor::new(mappings.clone()),
            matcher: CandidateMatcher::new(mappings.clone()),
            fetcher: MetadataFetcher::new(store),
            cache: ResultCache::with_defaults(),
            default_max_samples: DEFAULT_MAX_SAMPLES,
            mappings,
        }
    }

    /// Apply limits, cache settings and (when enabled and configured) the
    /// LLM suggester from `config`
    pub fn from_config(
        config: &ExtractorConfig,
        mappings: Arc<MappingRegistry>,
        store: Arc<dyn GraphStore>,
    ) -> Self {
        let mut extractor = Self::new(mappings.clone(), store)
            .with_fetch_limits(config.fetch_limits())
            .with_cache_config(config.cache_config())
            .with_default_max_samples(config.max_samples);

        if config.llm_enabled {
            match LlmTermSuggester::from_env(mappings) {
                Some(suggester) => {
                    log::info!("LLM term suggestion enabled");
                    extractor = extractor.with_suggester(Arc::new(suggester), config.suggest_timeout());
                }
                None => log::info!("No LLM API key configured, using rule-based term extraction"),
            }
        }
        extractor
    }

    pub fn with_suggester(mut self, suggester: Arc<dyn TermSuggester>, timeout: Duration) -> Self {
        self.term_extractor = self.term_extractor.with_suggester(suggester, timeout);
        self
    }

    pub fn with_synonyms(mut self, synonyms: Arc<dyn SynonymLookup>) -> Self {
        self.matcher = self.matcher.with_synonyms(synonyms);
        self
    }

    pub fn with_cache_config(mut self, config: ResultCacheConfig) -> Self {
        self.cache = ResultCache::new(config);
        self
    }

    pub fn with_fetch_limits(mut self, limits: FetchLimits) -> Self {
        self.fetcher = self.fetcher.with_limits(limits);
        self
    }

    pub fn with_default_max_samples(mut self, max_samples: usize) -> Self {
        self.default_max_samples = max_samples.min(MAX_SAMPLES_CAP);
        self
    }

    pub fn mappings(&self) -> &Arc<MappingRegistry> {
        &self.mappings
    }

    pub fn suggester_enabled(&self) -> bool {
        self.term_extractor.suggester_enabled()
    }

    /// Extract with the cache on and the configured sample count
    pub async fn extract(&self, query_text: &str) -> Result<DynamicSchemaResult, ExtractionError> {
        self.extract_dynamic_schema(query_text, true, self.default_max_samples)
            .await
    }

    /// Build the schema context for one query.
    ///
    /// Cached entries are keyed by normalized text only; a hit is returned as
    /// stored, whatever `max_samples` it was built with. Only successful
    /// results are cached and the write is the last step.
    pub async fn extract_dynamic_schema(
        &self,
        query_text: &str,
        use_cache: bool,
        max_samples: usize,
    ) -> Result<DynamicSchemaResult, ExtractionError> {
        let key = ResultCacheKey::new(query_text);
        if use_cache {
            if let Some(cached) = self.cache.get(&key) {
                log::debug!("Schema context cache hit for '{}'", key.normalized_query);
                return Ok(cached);
            }
        }

        let started = Instant::now();
        let query_terms = self.term_extractor.extract(query_text).await;
        let candidate_schema = self.matcher.match_terms(&query_terms);
        let (nodes, relationships) = self.fetcher.fetch(&candidate_schema, max_samples).await?;

        let result = DynamicSchemaResult {
            nodes,
            relationships,
            query_terms,
            candidate_schema,
            extraction_time: started.elapsed().as_secs_f64(),
        };
        log::info!(
            "Extracted schema context for '{}' in {:.3}s: {} labels, {} relationship types",
            query_text,
            result.extraction_time,
            result.nodes.len(),
            result.relationships.len()
        );

        if use_cache {
            self.cache.put(key, result.clone());
        }
        Ok(result)
    }

    /// Term extraction on its own, for inspection
    pub async fn extract_terms(&self, query_text: &str) -> QueryTerms {
        self.term_extractor.extract(query_text).await
    }

    /// Candidate matching on its own, for inspection
    pub fn match_candidates(&self, terms: &QueryTerms) -> CandidateSchema {
        self.matcher.match_terms(terms)
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
        log::info!("Schema context cache cleared");
    }

    /// Re-read the mapping tables. Cached results were built from the old
    /// tables, so a successful reload also clears the cache.
    pub fn reload_mappings(&self) -> Result<Arc<MappingTables>, MappingError> {
        let tables = self.mappings.reload()?;
        self.cache.clear();
        Ok(tables)
    }

    pub fn cache_metrics(&self) -> CacheMetrics {
        self.cache.metrics()
    }
}

/// One-shot extraction against the Neo4j server named by the environment
pub async fn extract_dynamic_schema_for_query(
    query_text: &str,
) -> Result<DynamicSchemaResult, SetupError> {
    let config = ExtractorConfig::from_env()?;
    let mappings = Arc::new(MappingRegistry::load(config.mapping_source())?);
    let store = Neo4jGraphStore::connect(&config.neo4j_config()).await?;

    let extractor = DynamicSchemaExtractor::from_config(&config, mappings, Arc::new(store));
    Ok(extractor.extract(query_text).await?)
}
