//! Fetch bounded catalog facts for candidate labels and relationship types.
//!
//! Every candidate is queried concurrently, and the queries for one candidate
//! run concurrently too. A failed query only blanks its own field. The fetch
//! as a whole fails only when every query reported the store as unavailable.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures_util::future::join_all;

use super::errors::{ExtractionError, GraphStoreError};
use super::types::{CandidateSchema, NodeMetadata, RelationshipMetadata};
use crate::graph_store::GraphStore;

pub const DEFAULT_PATTERN_LIMIT: usize = 10;
pub const DEFAULT_PROPERTY_SAMPLE_SIZE: usize = 25;
/// Hard upper bound on samples per label or relationship type
pub const MAX_SAMPLES_CAP: usize = 50;

pub type NodeCatalog = BTreeMap<String, NodeMetadata>;
pub type RelationshipCatalog = BTreeMap<String, RelationshipMetadata>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchLimits {
    /// Top-N relationship patterns kept per type
    pub pattern_limit: usize,
    /// Elements inspected when collecting property keys
    pub property_sample_size: usize,
}

impl Default for FetchLimits {
    fn default() -> Self {
        FetchLimits {
            pattern_limit: DEFAULT_PATTERN_LIMIT,
            property_sample_size: DEFAULT_PROPERTY_SAMPLE_SIZE,
        }
    }
}

/// Outcome bookkeeping for the queries of one fetch
#[derive(Debug, Default)]
struct QueryTally {
    total: usize,
    unavailable: usize,
    last_unavailable: Option<String>,
}

impl QueryTally {
    /// Unwrap a query result, degrading failures to the empty value
    fn settle<T: Default>(
        &mut self,
        query: &str,
        target: &str,
        result: Result<T, GraphStoreError>,
    ) -> T {
        self.total += 1;
        match result {
            Ok(value) => value,
            Err(e) => {
                if let GraphStoreError::Unavailable { message } = &e {
                    self.unavailable += 1;
                    self.last_unavailable = Some(message.clone());
                }
                log::warn!("{} for '{}' failed, leaving it empty: {}", query, target, e);
                T::default()
            }
        }
    }

    fn absorb(&mut self, other: QueryTally) {
        self.total += other.total;
        self.unavailable += other.unavailable;
        if other.last_unavailable.is_some() {
            self.last_unavailable = other.last_unavailable;
        }
    }

    fn all_unavailable(&self) -> bool {
        self.total > 0 && self.unavailable == self.total
    }
}

pub struct MetadataFetcher {
    store: Arc<dyn GraphStore>,
    limits: FetchLimits,
}

impl MetadataFetcher {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        MetadataFetcher {
            store,
            limits: FetchLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: FetchLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Fetch metadata for every candidate.
    ///
    /// Each candidate label and type gets an entry, zero/empty when it has no
    /// data or its queries failed. `max_samples` is capped at [`MAX_SAMPLES_CAP`].
    pub async fn fetch(
        &self,
        candidates: &CandidateSchema,
        max_samples: usize,
    ) -> Result<(NodeCatalog, RelationshipCatalog), ExtractionError> {
        let max_samples = max_samples.min(MAX_SAMPLES_CAP);

        let node_fetches = candidates
            .node_labels
            .iter()
            .map(|label| self.fetch_node(label, max_samples));
        let relationship_fetches = candidates
            .relationship_types
            .iter()
            .map(|rel_type| self.fetch_relationship(rel_type, max_samples));

        let (node_results, relationship_results) =
            tokio::join!(join_all(node_fetches), join_all(relationship_fetches));

        let mut tally = QueryTally::default();
        let mut nodes = NodeCatalog::new();
        for (label, (metadata, node_tally)) in candidates.node_labels.iter().zip(node_results) {
            tally.absorb(node_tally);
            nodes.insert(label.clone(), metadata);
        }
        let mut relationships = RelationshipCatalog::new();
        for (rel_type, (metadata, rel_tally)) in candidates
            .relationship_types
            .iter()
            .zip(relationship_results)
        {
            tally.absorb(rel_tally);
            relationships.insert(rel_type.clone(), metadata);
        }

        if tally.all_unavailable() {
            return Err(ExtractionError::GraphStoreUnavailable {
                candidates: candidates.len(),
                message: tally.last_unavailable.unwrap_or_default(),
            });
        }

        Ok((nodes, relationships))
    }

    async fn fetch_node(&self, label: &str, max_samples: usize) -> (NodeMetadata, QueryTally) {
        let (count, properties, samples) = tokio::join!(
            self.store.count_nodes(label),
            self.store
                .node_property_keys(label, self.limits.property_sample_size),
            self.store.sample_nodes(label, max_samples),
        );

        let mut tally = QueryTally::default();
        let count = tally.settle("node_count", label, count);
        let properties = tally.settle("node_properties", label, properties);
        let mut samples = tally.settle("node_samples", label, samples);
        samples.truncate(max_samples);

        let metadata = NodeMetadata {
            count,
            properties,
            samples,
        };
        (metadata, tally)
    }

    async fn fetch_relationship(
        &self,
        rel_type: &str,
        max_samples: usize,
    ) -> (RelationshipMetadata, QueryTally) {
        let (count, properties, patterns, samples) = tokio::join!(
            self.store.count_relationships(rel_type),
            self.store
                .relationship_property_keys(rel_type, self.limits.property_sample_size),
            self.store
                .relationship_patterns(rel_type, self.limits.pattern_limit),
            self.store.sample_relationships(rel_type, max_samples),
        );

        let mut tally = QueryTally::default();
        let count = tally.settle("relationship_count", rel_type, count);
        let properties = tally.settle("relationship_properties", rel_type, properties);
        let mut patterns = tally.settle("relationship_patterns", rel_type, patterns);
        let mut samples = tally.settle("relationship_samples", rel_type, samples);

        patterns.sort_by(|a, b| b.frequency.cmp(&a.frequency));
        patterns.truncate(self.limits.pattern_limit);
        samples.truncate(max_samples);

        let metadata = RelationshipMetadata {
            count,
            properties,
            patterns,
            samples,
        };
        (metadata, tally)
    }
}
