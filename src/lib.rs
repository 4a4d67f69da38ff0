//! GraphLens - query-scoped schema context for LLM-driven Cypher generation
//!
//! This crate turns a natural-language question about an ERP knowledge graph
//! into a compact description of the part of the graph the question touches:
//! - Rule-based and optional LLM term extraction
//! - Term to label/relationship-type matching through mapping tables
//! - Bounded, concurrent metadata queries against Neo4j
//! - TTL memoization and markdown rendering for prompt injection

pub mod config;
pub mod graph_store;
pub mod schema_context;

pub use schema_context::{
    extract_dynamic_schema_for_query, DynamicSchemaExtractor, DynamicSchemaResult,
    ExtractionError,
};
