//! # Schema Context Error Types
//!
//! Only a few conditions in the extraction pipeline are real errors. Most
//! failures are absorbed by the component that can compensate for them:
//!
//! - a failing or absent LLM suggester degrades to rule-based terms
//!   ([`SuggestError`] never leaves the term extractor)
//! - an empty candidate set triggers the configured fallback
//! - a failing metadata query degrades that field to zero/empty
//!   ([`GraphStoreError::Query`] never leaves the metadata fetcher)
//!
//! What reaches the caller is [`ExtractionError`]: the graph store was
//! unreachable for every candidate, so an empty schema context would be
//! misleading.

use thiserror::Error;

/// Errors raised by a [`crate::graph_store::GraphStore`] implementation
#[derive(Debug, Clone, Error, PartialEq)]
pub enum GraphStoreError {
    /// Connection-level failure; the store cannot answer anything right now
    #[error("Graph store unavailable: {message}")]
    Unavailable { message: String },
    /// A single meta-query failed (missing label, permission, bad row, ...)
    #[error("Meta-query `{query}` failed for `{target}`: {message}")]
    Query {
        query: &'static str,
        target: String,
        message: String,
    },
}

impl GraphStoreError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        GraphStoreError::Unavailable {
            message: message.into(),
        }
    }

    pub fn query(query: &'static str, target: impl Into<String>, message: impl Into<String>) -> Self {
        GraphStoreError::Query {
            query,
            target: target.into(),
            message: message.into(),
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, GraphStoreError::Unavailable { .. })
    }
}

/// Errors surfaced by [`crate::schema_context::DynamicSchemaExtractor`]
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ExtractionError {
    #[error("Graph store unavailable for all {candidates} schema candidates: {message}")]
    GraphStoreUnavailable { candidates: usize, message: String },
}

/// Errors building an extractor from configuration and running it once
#[derive(Debug, Error)]
pub enum SetupError {
    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),
    #[error(transparent)]
    Mapping(#[from] MappingError),
    #[error(transparent)]
    GraphStore(#[from] GraphStoreError),
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
}

/// Errors loading or validating mapping tables
#[derive(Debug, Clone, Error, PartialEq)]
pub enum MappingError {
    #[error("Failed to read mapping file: {error}")]
    ReadError { error: String },
    #[error("Failed to parse mapping file: {error}")]
    ParseError { error: String },
    #[error("Invalid term pattern `{pattern}`: {error}")]
    InvalidPattern { pattern: String, error: String },
    #[error("Invalid mapping configuration: {message}")]
    InvalidConfig { message: String },
}

/// Errors from an LLM term suggester
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SuggestError {
    #[error("LLM request failed: {0}")]
    Request(String),
    #[error("LLM request timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error("Malformed LLM response: {0}")]
    MalformedResponse(String),
}
