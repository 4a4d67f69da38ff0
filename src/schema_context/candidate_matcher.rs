//! Map query terms onto candidate node labels and relationship types.
//!
//! Candidates come only from the mapping tables, never from live graph
//! content. When nothing matches, the configured fallback set is used, so the
//! metadata fetcher never runs against an empty candidate set.

use std::collections::HashMap;
use std::sync::Arc;

use super::mapping::{MappingRegistry, MappingTables};
use super::types::{CandidateSchema, QueryTerms};

/// Optional synonym source, e.g. a vector index over business terms.
///
/// Returns vocabulary terms (not labels) for a term the mapping tables do not
/// know; those are then resolved through the tables like any other term.
pub trait SynonymLookup: Send + Sync {
    fn synonyms(&self, term: &str) -> Vec<String>;
}

/// Lookup backed by a fixed `term -> vocabulary terms` map
#[derive(Debug, Clone, Default)]
pub struct StaticSynonyms {
    synonyms: HashMap<String, Vec<String>>,
}

impl StaticSynonyms {
    pub fn new(synonyms: HashMap<String, Vec<String>>) -> Self {
        StaticSynonyms { synonyms }
    }
}

impl SynonymLookup for StaticSynonyms {
    fn synonyms(&self, term: &str) -> Vec<String> {
        self.synonyms.get(term).cloned().unwrap_or_default()
    }
}

pub struct CandidateMatcher {
    mappings: Arc<MappingRegistry>,
    synonyms: Option<Arc<dyn SynonymLookup>>,
}

impl CandidateMatcher {
    pub fn new(mappings: Arc<MappingRegistry>) -> Self {
        CandidateMatcher {
            mappings,
            synonyms: None,
        }
    }

    pub fn with_synonyms(mut self, synonyms: Arc<dyn SynonymLookup>) -> Self {
        self.synonyms = Some(synonyms);
        self
    }

    /// Resolve terms to a non-empty candidate schema
    pub fn match_terms(&self, terms: &QueryTerms) -> CandidateSchema {
        let tables = self.mappings.snapshot();
        let mut candidates = CandidateSchema::default();

        for entity in &terms.entities {
            let labels = self.resolve_entity(&tables, entity);
            if labels.is_empty() {
                log::debug!("No label mapping for entity term '{}'", entity);
            }
            candidates.node_labels.extend(labels);
        }

        for action in &terms.actions {
            candidates
                .relationship_types
                .extend(tables.relationship_types_for_action(action).iter().cloned());
        }

        // Labels matched but no relationship named: bring in the usual neighbours
        if candidates.relationship_types.is_empty() {
            let companions: Vec<String> = candidates
                .node_labels
                .iter()
                .flat_map(|label| tables.companion_relationships(label).iter().cloned())
                .collect();
            candidates.relationship_types.extend(companions);
        }

        if candidates.is_empty() {
            log::warn!(
                "No candidate schema for terms {:?}, falling back to default labels",
                terms.all_terms()
            );
            candidates = tables.fallback().clone();
        }

        candidates
    }

    fn resolve_entity(&self, tables: &MappingTables, entity: &str) -> Vec<String> {
        let labels = tables.labels_for_entity(entity);
        if !labels.is_empty() {
            return labels;
        }

        match &self.synonyms {
            Some(lookup) => lookup
                .synonyms(entity)
                .iter()
                .flat_map(|synonym| tables.labels_for_entity(synonym))
                .collect(),
            None => Vec::new(),
        }
    }
}
