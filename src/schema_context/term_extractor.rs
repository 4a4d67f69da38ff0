//! Query term extraction.
//!
//! Two passes produce the same [`QueryTerms`] shape and are merged:
//!
//! 1. A rule-based pass over the normalized query: substring hits against the
//!    mapping vocabulary, then the configured regex patterns, then (only if
//!    nothing matched) a looser token match for multi-word terms.
//! 2. An optional [`TermSuggester`] (usually an LLM). It is best-effort: an
//!    error, a timeout or a disabled suggester contributes nothing.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::errors::SuggestError;
use super::mapping::{MappingRegistry, MappingTables};
use super::types::QueryTerms;

/// Default upper bound for one suggester call
pub const DEFAULT_SUGGEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Minimum token length for the loose multi-word pass
const MIN_LOOSE_TOKEN_CHARS: usize = 3;

/// Lower-case, turn punctuation into spaces and collapse whitespace.
///
/// Letters of every script, digits and `_` are kept, so CJK text passes
/// through unchanged apart from punctuation.
pub fn normalize_text(text: &str) -> String {
    let cleaned: String = text
        .chars()
        .flat_map(char::to_lowercase)
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { ' ' })
        .collect();

    cleaned.split_whitespace().collect::<Vec<&str>>().join(" ")
}

/// Source of additional query terms.
///
/// Implementations must not panic; failures are reported as [`SuggestError`]
/// and the caller decides what to do with them.
#[async_trait]
pub trait TermSuggester: Send + Sync {
    async fn suggest(&self, query_text: &str) -> Result<QueryTerms, SuggestError>;

    /// Disabled suggesters are skipped without being called
    fn is_enabled(&self) -> bool {
        true
    }
}

/// Suggester used when no LLM client is configured
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSuggester;

#[async_trait]
impl TermSuggester for NoopSuggester {
    async fn suggest(&self, _query_text: &str) -> Result<QueryTerms, SuggestError> {
        Ok(QueryTerms::default())
    }

    fn is_enabled(&self) -> bool {
        false
    }
}

pub struct TermExtractor {
    mappings: Arc<MappingRegistry>,
    suggester: Arc<dyn TermSuggester>,
    suggest_timeout: Duration,
}

impl TermExtractor {
    /// Rule-based extraction only
    pub fn new(mappings: Arc<MappingRegistry>) -> Self {
        TermExtractor {
            mappings,
            suggester: Arc::new(NoopSuggester),
            suggest_timeout: DEFAULT_SUGGEST_TIMEOUT,
        }
    }

    pub fn with_suggester(mut self, suggester: Arc<dyn TermSuggester>, timeout: Duration) -> Self {
        self.suggester = suggester;
        self.suggest_timeout = timeout;
        self
    }

    pub fn suggester_enabled(&self) -> bool {
        self.suggester.is_enabled()
    }

    /// Extract terms from a raw user query. Never fails.
    pub async fn extract(&self, query_text: &str) -> QueryTerms {
        let tables = self.mappings.snapshot();
        let rule_terms = rule_based_terms(&tables, query_text);
        let suggested = self.suggested_terms(query_text).await;

        let terms = rule_terms.merge(suggested);
        log::debug!(
            "Extracted terms for '{}': entities={:?}, attributes={:?}, actions={:?}",
            query_text,
            terms.entities,
            terms.attributes,
            terms.actions
        );
        terms
    }

    async fn suggested_terms(&self, query_text: &str) -> QueryTerms {
        if !self.suggester.is_enabled() {
            return QueryTerms::default();
        }

        let outcome = tokio::time::timeout(self.suggest_timeout, self.suggester.suggest(query_text))
            .await
            .unwrap_or(Err(SuggestError::Timeout(self.suggest_timeout)));

        match outcome {
            Ok(terms) => known_terms(&self.mappings.snapshot(), terms),
            Err(e) => {
                log::warn!("Term suggestion skipped, using rule-based terms only: {}", e);
                QueryTerms::default()
            }
        }
    }
}

/// The rule-based pass on its own
pub fn rule_based_terms(tables: &MappingTables, query_text: &str) -> QueryTerms {
    let normalized = normalize_text(query_text);
    let mut terms = QueryTerms::default();
    if normalized.is_empty() {
        return terms;
    }

    for (term, labels) in tables.entity_vocabulary() {
        if normalized.contains(term) {
            log::debug!("Found term '{}' in query, adding labels {:?}", term, labels);
            terms.entities.extend(labels.iter().cloned());
        }
    }

    for (action, _) in tables.relation_vocabulary() {
        if normalized.contains(action) {
            log::debug!("Found action '{}' in query", action);
            terms.actions.insert(action.to_string());
        }
    }

    for (term, canonical) in tables.attribute_vocabulary() {
        if normalized.contains(term) {
            terms.attributes.extend(canonical.iter().cloned());
        }
    }

    for pattern in tables.patterns() {
        if pattern.regex.is_match(&normalized) {
            log::debug!(
                "Pattern '{}' matched query, adding entity '{}'",
                pattern.regex.as_str(),
                pattern.entity
            );
            terms.entities.insert(pattern.entity.clone());
        }
    }

    if terms.entities.is_empty() && terms.actions.is_empty() {
        let tokens: Vec<&str> = normalized.split(' ').collect();
        for (term, labels) in tables.entity_vocabulary() {
            let parts: Vec<&str> = term
                .split(|c: char| c == '_' || c.is_whitespace())
                .filter(|p| p.chars().count() >= MIN_LOOSE_TOKEN_CHARS)
                .collect();
            if parts.len() < 2 {
                continue;
            }
            if parts.iter().any(|p| tokens.contains(p)) {
                log::debug!("Loose match for term '{}', adding labels {:?}", term, labels);
                terms.entities.extend(labels.iter().cloned());
            }
        }
    }

    terms
}

/// Normalize suggested terms and drop attributes and actions the vocabulary
/// does not know. Entities are kept; the matcher resolves them, synonyms
/// included, and drops what it cannot.
fn known_terms(tables: &MappingTables, terms: QueryTerms) -> QueryTerms {
    let clean = |set: BTreeSet<String>| -> BTreeSet<String> {
        set.into_iter()
            .map(|t| normalize_text(&t))
            .filter(|t| !t.is_empty())
            .collect()
    };

    let (attributes, unknown_attributes): (BTreeSet<String>, BTreeSet<String>) =
        clean(terms.attributes)
            .into_iter()
            .partition(|t| tables.is_attribute_term(t));
    let (actions, unknown_actions): (BTreeSet<String>, BTreeSet<String>) = clean(terms.actions)
        .into_iter()
        .partition(|t| !tables.relationship_types_for_action(t).is_empty());
    if !unknown_attributes.is_empty() || !unknown_actions.is_empty() {
        log::debug!(
            "Dropping suggested terms outside the vocabulary: attributes={:?}, actions={:?}",
            unknown_attributes,
            unknown_actions
        );
    }

    QueryTerms {
        entities: clean(terms.entities),
        attributes,
        actions,
    }
}
