//! Graph store access for schema-context extraction.
//!
//! The extractor only ever needs a handful of bounded meta-queries. They are
//! modelled as one trait so the Neo4j backend, the in-memory fixture store and
//! test doubles are interchangeable.
//!
//! Labels and relationship types are passed as identifiers taken from the
//! mapping tables, never as raw user text; implementations must still escape
//! them. Every row-returning method takes an explicit limit.

pub mod memory;
pub mod neo4j_client;

use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::schema_context::errors::GraphStoreError;
use crate::schema_context::types::{PropertyMap, RelationshipPattern, RelationshipSample};

pub use memory::InMemoryGraphStore;
pub use neo4j_client::{Neo4jConfig, Neo4jGraphStore};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Number of nodes carrying `label`
    async fn count_nodes(&self, label: &str) -> Result<u64, GraphStoreError>;

    /// Union of property keys over at most `sample_size` nodes of `label`
    async fn node_property_keys(
        &self,
        label: &str,
        sample_size: usize,
    ) -> Result<BTreeSet<String>, GraphStoreError>;

    /// Property maps of at most `limit` nodes of `label`
    async fn sample_nodes(&self, label: &str, limit: usize)
        -> Result<Vec<PropertyMap>, GraphStoreError>;

    /// Number of relationships of `rel_type`
    async fn count_relationships(&self, rel_type: &str) -> Result<u64, GraphStoreError>;

    /// Union of property keys over at most `sample_size` relationships of `rel_type`
    async fn relationship_property_keys(
        &self,
        rel_type: &str,
        sample_size: usize,
    ) -> Result<BTreeSet<String>, GraphStoreError>;

    /// Most frequent source/target label combinations, most frequent first
    async fn relationship_patterns(
        &self,
        rel_type: &str,
        limit: usize,
    ) -> Result<Vec<RelationshipPattern>, GraphStoreError>;

    /// At most `limit` relationships of `rel_type` with endpoint labels resolved
    async fn sample_relationships(
        &self,
        rel_type: &str,
        limit: usize,
    ) -> Result<Vec<RelationshipSample>, GraphStoreError>;
}
