//! Data model shared by the extraction pipeline.
//!
//! Everything here is created fresh per extraction (or taken whole from the
//! result cache) and never mutated after the pipeline stage that builds it.
//! Ordered collections keep serialization and the rendered context block
//! deterministic.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Raw property map of a sampled node or relationship.
pub type PropertyMap = serde_json::Map<String, serde_json::Value>;

/// Terms extracted from one user query
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryTerms {
    pub entities: BTreeSet<String>,
    pub attributes: BTreeSet<String>,
    pub actions: BTreeSet<String>,
}

impl QueryTerms {
    /// Union of all three categories
    pub fn all_terms(&self) -> BTreeSet<String> {
        self.entities
            .iter()
            .chain(&self.attributes)
            .chain(&self.actions)
            .cloned()
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty() && self.attributes.is_empty() && self.actions.is_empty()
    }

    /// Union `other` into `self`, category by category
    pub fn merge(mut self, other: QueryTerms) -> Self {
        self.entities.extend(other.entities);
        self.attributes.extend(other.attributes);
        self.actions.extend(other.actions);
        self
    }
}

/// Node labels and relationship types believed relevant to a query
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateSchema {
    pub node_labels: BTreeSet<String>,
    pub relationship_types: BTreeSet<String>,
}

impl CandidateSchema {
    pub fn is_empty(&self) -> bool {
        self.node_labels.is_empty() && self.relationship_types.is_empty()
    }

    pub fn len(&self) -> usize {
        self.node_labels.len() + self.relationship_types.len()
    }
}

/// Catalog facts for one node label
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeMetadata {
    pub count: u64,
    pub properties: BTreeSet<String>,
    pub samples: Vec<PropertyMap>,
}

/// One `(source labels)-[type]->(target labels)` combination and how often it occurs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipPattern {
    pub source_labels: Vec<String>,
    pub target_labels: Vec<String>,
    pub frequency: u64,
}

/// A sampled relationship with its endpoint labels resolved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipSample {
    pub source_labels: Vec<String>,
    pub target_labels: Vec<String>,
    pub properties: PropertyMap,
}

/// Catalog facts for one relationship type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelationshipMetadata {
    pub count: u64,
    pub properties: BTreeSet<String>,
    /// Sorted by frequency, most frequent first
    pub patterns: Vec<RelationshipPattern>,
    pub samples: Vec<RelationshipSample>,
}

/// The schema context extracted for one query.
///
/// This is the only artifact handed to prompt construction. Render it with
/// [`DynamicSchemaResult::to_markdown`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DynamicSchemaResult {
    pub nodes: BTreeMap<String, NodeMetadata>,
    pub relationships: BTreeMap<String, RelationshipMetadata>,
    pub query_terms: QueryTerms,
    pub candidate_schema: CandidateSchema,
    /// Wall-clock seconds spent in term extraction, matching and fetching
    pub extraction_time: f64,
}
