//! Query-scoped schema context extraction.
//!
//! Given a natural-language question, find the slice of the graph catalog
//! that is relevant to it and render that slice as a compact block for an
//! LLM prompt:
//!
//! ```text
//! query text -> QueryTerms -> CandidateSchema -> node/relationship metadata -> markdown
//! ```
//!
//! [`DynamicSchemaExtractor`] wires the stages together and memoizes results.

pub mod candidate_matcher;
pub mod context_block;
pub mod errors;
pub mod extractor;
pub mod llm;
pub mod mapping;
pub mod metadata_fetcher;
pub mod result_cache;
pub mod term_extractor;
pub mod types;

pub use candidate_matcher::{CandidateMatcher, StaticSynonyms, SynonymLookup};
pub use errors::{ExtractionError, GraphStoreError, MappingError, SetupError, SuggestError};
pub use extractor::{extract_dynamic_schema_for_query, DynamicSchemaExtractor};
pub use llm::{LlmConfig, LlmProvider, LlmTermSuggester};
pub use mapping::{MappingRegistry, MappingSource, MappingTables};
pub use metadata_fetcher::{FetchLimits, MetadataFetcher};
pub use result_cache::{CacheMetrics, ResultCache, ResultCacheConfig, ResultCacheKey};
pub use term_extractor::{normalize_text, NoopSuggester, TermExtractor, TermSuggester};
pub use types::{
    CandidateSchema, DynamicSchemaResult, NodeMetadata, PropertyMap, QueryTerms,
    RelationshipMetadata, RelationshipPattern, RelationshipSample,
};
