use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use graphlens::graph_store::{GraphStore, InMemoryGraphStore};
use graphlens::schema_context::{
    DynamicSchemaExtractor, GraphStoreError, MappingRegistry, MappingTables, PropertyMap,
    RelationshipPattern, RelationshipSample,
};

pub const FIXTURE_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/erp_graph.yaml");

pub fn fixture_store() -> Arc<InMemoryGraphStore> {
    Arc::new(InMemoryGraphStore::from_yaml_file(FIXTURE_PATH).unwrap())
}

pub fn builtin_mappings() -> Arc<MappingRegistry> {
    Arc::new(MappingRegistry::from_tables(MappingTables::builtin().unwrap()))
}

pub fn fixture_extractor() -> (DynamicSchemaExtractor, Arc<InMemoryGraphStore>) {
    let store = fixture_store();
    let extractor = DynamicSchemaExtractor::new(builtin_mappings(), store.clone());
    (extractor, store)
}

pub fn set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Store whose every query fails at the connection level
pub struct UnreachableStore;

fn refused() -> GraphStoreError {
    GraphStoreError::unavailable("connection refused (os error 111)")
}

#[async_trait]
impl GraphStore for UnreachableStore {
    async fn count_nodes(&self, _label: &str) -> Result<u64, GraphStoreError> {
        Err(refused())
    }

    async fn node_property_keys(
        &self,
        _label: &str,
        _sample_size: usize,
    ) -> Result<BTreeSet<String>, GraphStoreError> {
        Err(refused())
    }

    async fn sample_nodes(
        &self,
        _label: &str,
        _limit: usize,
    ) -> Result<Vec<PropertyMap>, GraphStoreError> {
        Err(refused())
    }

    async fn count_relationships(&self, _rel_type: &str) -> Result<u64, GraphStoreError> {
        Err(refused())
    }

    async fn relationship_property_keys(
        &self,
        _rel_type: &str,
        _sample_size: usize,
    ) -> Result<BTreeSet<String>, GraphStoreError> {
        Err(refused())
    }

    async fn relationship_patterns(
        &self,
        _rel_type: &str,
        _limit: usize,
    ) -> Result<Vec<RelationshipPattern>, GraphStoreError> {
        Err(refused())
    }

    async fn sample_relationships(
        &self,
        _rel_type: &str,
        _limit: usize,
    ) -> Result<Vec<RelationshipSample>, GraphStoreError> {
        Err(refused())
    }
}

/// Fixture graph whose node counts take a minute to answer
pub struct SlowStore {
    inner: Arc<InMemoryGraphStore>,
    delay: Duration,
}

impl SlowStore {
    pub fn new(delay: Duration) -> Self {
        SlowStore {
            inner: fixture_store(),
            delay,
        }
    }
}

#[async_trait]
impl GraphStore for SlowStore {
    async fn count_nodes(&self, label: &str) -> Result<u64, GraphStoreError> {
        tokio::time::sleep(self.delay).await;
        self.inner.count_nodes(label).await
    }

    async fn node_property_keys(
        &self,
        label: &str,
        sample_size: usize,
    ) -> Result<BTreeSet<String>, GraphStoreError> {
        self.inner.node_property_keys(label, sample_size).await
    }

    async fn sample_nodes(&self, label: &str, limit: usize) -> Result<Vec<PropertyMap>, GraphStoreError> {
        self.inner.sample_nodes(label, limit).await
    }

    async fn count_relationships(&self, rel_type: &str) -> Result<u64, GraphStoreError> {
        self.inner.count_relationships(rel_type).await
    }

    async fn relationship_property_keys(
        &self,
        rel_type: &str,
        sample_size: usize,
    ) -> Result<BTreeSet<String>, GraphStoreError> {
        self.inner.relationship_property_keys(rel_type, sample_size).await
    }

    async fn relationship_patterns(
        &self,
        rel_type: &str,
        limit: usize,
    ) -> Result<Vec<RelationshipPattern>, GraphStoreError> {
        self.inner.relationship_patterns(rel_type, limit).await
    }

    async fn sample_relationships(
        &self,
        rel_type: &str,
        limit: usize,
    ) -> Result<Vec<RelationshipSample>, GraphStoreError> {
        self.inner.sample_relationships(rel_type, limit).await
    }
}
