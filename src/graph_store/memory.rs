//! In-memory graph loaded from a YAML fixture.
//!
//! Used for offline runs of the CLI (`--fixture`) and throughout the tests.
//! Every trait call counts as one meta-query so cache behaviour can be
//! observed.
//!
//! ```yaml
//! nodes:
//!   - id: v1
//!     labels: [凭证]
//!     properties: { 凭证号: 记-001, 金额: 1200 }
//! relationships:
//!   - type: 凭证由人员制单
//!     from: v1
//!     to: p1
//! ```

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use super::GraphStore;
use crate::schema_context::errors::GraphStoreError;
use crate::schema_context::types::{PropertyMap, RelationshipPattern, RelationshipSample};

#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("Failed to read fixture file: {0}")]
    Read(#[from] std::io::Error),
    #[error("Failed to parse fixture: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Duplicate node id `{0}`")]
    DuplicateNode(String),
    #[error("Relationship `{rel_type}` references unknown node `{node}`")]
    UnknownNode { rel_type: String, node: String },
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GraphFixture {
    #[serde(default)]
    pub nodes: Vec<FixtureNode>,
    #[serde(default)]
    pub relationships: Vec<FixtureRelationship>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FixtureNode {
    /// Only needed when a relationship refers to the node
    #[serde(default)]
    pub id: Option<String>,
    pub labels: Vec<String>,
    #[serde(default)]
    pub properties: PropertyMap,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FixtureRelationship {
    #[serde(rename = "type")]
    pub rel_type: String,
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub properties: PropertyMap,
}

#[derive(Debug)]
struct StoredRelationship {
    rel_type: String,
    source: usize,
    target: usize,
    properties: PropertyMap,
}

#[derive(Debug, Default)]
pub struct InMemoryGraphStore {
    nodes: Vec<FixtureNode>,
    relationships: Vec<StoredRelationship>,
    queries: AtomicUsize,
}

impl InMemoryGraphStore {
    pub fn from_fixture(fixture: GraphFixture) -> Result<Self, FixtureError> {
        let mut index = HashMap::new();
        for (position, node) in fixture.nodes.iter().enumerate() {
            if let Some(id) = &node.id {
                if index.insert(id.clone(), position).is_some() {
                    return Err(FixtureError::DuplicateNode(id.clone()));
                }
            }
        }

        let resolve = |rel_type: &str, id: &str| {
            index.get(id).copied().ok_or_else(|| FixtureError::UnknownNode {
                rel_type: rel_type.to_string(),
                node: id.to_string(),
            })
        };

        let mut relationships = Vec::with_capacity(fixture.relationships.len());
        for rel in fixture.relationships {
            let source = resolve(&rel.rel_type, &rel.from)?;
            let target = resolve(&rel.rel_type, &rel.to)?;
            relationships.push(StoredRelationship {
                rel_type: rel.rel_type,
                source,
                target,
                properties: rel.properties,
            });
        }

        Ok(InMemoryGraphStore {
            nodes: fixture.nodes,
            relationships,
            queries: AtomicUsize::new(0),
        })
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, FixtureError> {
        Self::from_fixture(serde_yaml::from_str(yaml)?)
    }

    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, FixtureError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Number of meta-queries answered so far
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::Relaxed)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn relationship_count(&self) -> usize {
        self.relationships.len()
    }

    fn record_query(&self) {
        self.queries.fetch_add(1, Ordering::Relaxed);
    }

    fn nodes_with<'a>(&'a self, label: &'a str) -> impl Iterator<Item = &'a FixtureNode> + 'a {
        self.nodes
            .iter()
            .filter(move |node| node.labels.iter().any(|l| l == label))
    }

    fn relationships_of<'a>(
        &'a self,
        rel_type: &'a str,
    ) -> impl Iterator<Item = &'a StoredRelationship> + 'a {
        self.relationships
            .iter()
            .filter(move |rel| rel.rel_type == rel_type)
    }

    fn labels_of(&self, position: usize) -> Vec<String> {
        self.nodes
            .get(position)
            .map(|node| node.labels.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl GraphStore for InMemoryGraphStore {
    async fn count_nodes(&self, label: &str) -> Result<u64, GraphStoreError> {
        self.record_query();
        Ok(self.nodes_with(label).count() as u64)
    }

    async fn node_property_keys(
        &self,
        label: &str,
        sample_size: usize,
    ) -> Result<BTreeSet<String>, GraphStoreError> {
        self.record_query();
        Ok(self
            .nodes_with(label)
            .take(sample_size)
            .flat_map(|node| node.properties.keys().cloned())
            .collect())
    }

    async fn sample_nodes(
        &self,
        label: &str,
        limit: usize,
    ) -> Result<Vec<PropertyMap>, GraphStoreError> {
        self.record_query();
        Ok(self
            .nodes_with(label)
            .take(limit)
            .map(|node| node.properties.clone())
            .collect())
    }

    async fn count_relationships(&self, rel_type: &str) -> Result<u64, GraphStoreError> {
        self.record_query();
        Ok(self.relationships_of(rel_type).count() as u64)
    }

    async fn relationship_property_keys(
        &self,
        rel_type: &str,
        sample_size: usize,
    ) -> Result<BTreeSet<String>, GraphStoreError> {
        self.record_query();
        Ok(self
            .relationships_of(rel_type)
            .take(sample_size)
            .flat_map(|rel| rel.properties.keys().cloned())
            .collect())
    }

    async fn relationship_patterns(
        &self,
        rel_type: &str,
        limit: usize,
    ) -> Result<Vec<RelationshipPattern>, GraphStoreError> {
        self.record_query();

        let mut frequencies: BTreeMap<(Vec<String>, Vec<String>), u64> = BTreeMap::new();
        for rel in self.relationships_of(rel_type) {
            let key = (self.labels_of(rel.source), self.labels_of(rel.target));
            *frequencies.entry(key).or_default() += 1;
        }

        let mut patterns: Vec<RelationshipPattern> = frequencies
            .into_iter()
            .map(|((source_labels, target_labels), frequency)| RelationshipPattern {
                source_labels,
                target_labels,
                frequency,
            })
            .collect();
        // Stable sort keeps label order among equal frequencies
        patterns.sort_by(|a, b| b.frequency.cmp(&a.frequency));
        patterns.truncate(limit);
        Ok(patterns)
    }

    async fn sample_relationships(
        &self,
        rel_type: &str,
        limit: usize,
    ) -> Result<Vec<RelationshipSample>, GraphStoreError> {
        self.record_query();
        Ok(self
            .relationships_of(rel_type)
            .take(limit)
            .map(|rel| RelationshipSample {
                source_labels: self.labels_of(rel.source),
                target_labels: self.labels_of(rel.target),
                properties: rel.properties.clone(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"
nodes:
  - id: v1
    labels: [凭证]
    properties: { 凭证号: 记-001, 金额: 1200 }
  - id: v2
    labels: [凭证]
    properties: { 凭证号: 记-002, 摘要: 报销 }
  - id: p1
    labels: [人员]
    properties: { 姓名: 张三 }
  - id: a1
    labels: [科目]
    properties: { 编码: "1002" }
relationships:
  - { type: 凭证由人员制单, from: v1, to: p1 }
  - { type: 凭证由人员制单, from: v2, to: p1, properties: { 时间: 2024-01-05 } }
  - { type: 凭证使用科目, from: v1, to: a1 }
"#;

    fn store() -> InMemoryGraphStore {
        InMemoryGraphStore::from_yaml_str(FIXTURE).unwrap()
    }

    #[tokio::test]
    async fn test_node_queries() {
        let store = store();

        assert_eq!(store.count_nodes("凭证").await.unwrap(), 2);
        assert_eq!(store.count_nodes("银行账户").await.unwrap(), 0);

        let keys = store.node_property_keys("凭证", 25).await.unwrap();
        let expected: BTreeSet<String> = ["凭证号", "金额", "摘要"].iter().map(|s| s.to_string()).collect();
        assert_eq!(keys, expected);

        // Keys only come from the sampled nodes
        let keys = store.node_property_keys("凭证", 1).await.unwrap();
        assert!(!keys.contains("摘要"));

        let samples = store.sample_nodes("凭证", 1).await.unwrap();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0]["凭证号"], "记-001");
    }

    #[tokio::test]
    async fn test_relationship_queries() {
        let store = store();

        assert_eq!(store.count_relationships("凭证由人员制单").await.unwrap(), 2);

        let patterns = store.relationship_patterns("凭证由人员制单", 10).await.unwrap();
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].source_labels, vec!["凭证".to_string()]);
        assert_eq!(patterns[0].target_labels, vec!["人员".to_string()]);
        assert_eq!(patterns[0].frequency, 2);

        let samples = store.sample_relationships("凭证由人员制单", 5).await.unwrap();
        assert_eq!(samples.len(), 2);
        assert!(samples[1].properties.contains_key("时间"));

        let keys = store.relationship_property_keys("凭证使用科目", 25).await.unwrap();
        assert!(keys.is_empty());
    }

    #[tokio::test]
    async fn test_query_counter() {
        let store = store();
        assert_eq!(store.query_count(), 0);

        store.count_nodes("凭证").await.unwrap();
        store.sample_relationships("凭证使用科目", 5).await.unwrap();
        assert_eq!(store.query_count(), 2);
    }

    #[test]
    fn test_unknown_endpoint_rejected() {
        let yaml = r#"
nodes:
  - { id: v1, labels: [凭证] }
relationships:
  - { type: 凭证使用科目, from: v1, to: missing }
"#;
        let err = InMemoryGraphStore::from_yaml_str(yaml).unwrap_err();
        assert!(matches!(err, FixtureError::UnknownNode { ref node, .. } if node == "missing"));
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let yaml = r#"
nodes:
  - { id: v1, labels: [凭证] }
  - { id: v1, labels: [科目] }
"#;
        assert!(matches!(
            InMemoryGraphStore::from_yaml_str(yaml),
            Err(FixtureError::DuplicateNode(_))
        ));
    }
}
