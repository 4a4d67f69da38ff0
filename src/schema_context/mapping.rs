//! Business vocabulary to graph schema mapping tables.
//!
//! Mapping tables are defined in YAML (see `config/mappings.yaml`, which is
//! also embedded as the built-in table):
//!
//! ```yaml
//! entities:                 # query term -> node labels
//!   voucher: [凭证]
//!   bank: [银行账户, 银行类别]
//! relations:                # action word -> relationship types
//!   审核: [凭证由人员审核]
//! attributes:               # query term -> canonical attribute
//!   amount: [金额]
//! patterns:                 # regex over the normalized query -> entity
//!   - pattern: '[张王李][\p{Han}]{1,2}的'
//!     entity: 人员
//! companion_relationships:  # label -> types added when no type matched
//!   凭证: [凭证使用科目]
//! fallback:                 # used when nothing matched at all
//!   node_labels: [凭证]
//!   relationship_types: [凭证使用科目]
//! ```
//!
//! A parsed [`MappingConfig`] is compiled into an immutable [`MappingTables`]
//! value. [`MappingRegistry`] holds the current tables and swaps in a fresh
//! snapshot on an explicit [`MappingRegistry::reload`].

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::errors::MappingError;
use super::term_extractor::normalize_text;
use super::types::CandidateSchema;

const BUILTIN_MAPPINGS: &str = include_str!("../../config/mappings.yaml");

/// Mapping configuration as written in YAML
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MappingConfig {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub entities: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub relations: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub attributes: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub patterns: Vec<PatternRule>,
    #[serde(default)]
    pub companion_relationships: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub fallback: FallbackConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternRule {
    pub pattern: String,
    pub entity: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FallbackConfig {
    #[serde(default)]
    pub node_labels: Vec<String>,
    #[serde(default)]
    pub relationship_types: Vec<String>,
}

/// A compiled pattern rule
#[derive(Debug, Clone)]
pub struct TermPattern {
    pub regex: Regex,
    pub entity: String,
}

/// Compiled, immutable mapping tables.
///
/// Vocabulary keys are stored normalized (see [`normalize_text`]) so they can
/// be matched directly against a normalized query.
#[derive(Debug, Clone)]
pub struct MappingTables {
    name: String,
    entities: BTreeMap<String, Vec<String>>,
    relations: BTreeMap<String, Vec<String>>,
    attributes: BTreeMap<String, Vec<String>>,
    patterns: Vec<TermPattern>,
    companions: BTreeMap<String, Vec<String>>,
    fallback: CandidateSchema,
    known_labels: BTreeSet<String>,
}

impl MappingTables {
    /// The table shipped with the crate
    pub fn builtin() -> Result<Self, MappingError> {
        Self::from_yaml_str(BUILTIN_MAPPINGS)
    }

    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, MappingError> {
        let contents = fs::read_to_string(path).map_err(|e| MappingError::ReadError {
            error: e.to_string(),
        })?;

        Self::from_yaml_str(&contents)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, MappingError> {
        let config: MappingConfig =
            serde_yaml::from_str(yaml).map_err(|e| MappingError::ParseError {
                error: e.to_string(),
            })?;

        Self::from_config(config)
    }

    /// Validate and compile a parsed configuration
    pub fn from_config(config: MappingConfig) -> Result<Self, MappingError> {
        let entities = compile_vocabulary("entities", config.entities)?;
        let relations = compile_vocabulary("relations", config.relations)?;
        let attributes = compile_vocabulary("attributes", config.attributes)?;

        let fallback = CandidateSchema {
            node_labels: non_empty_names(config.fallback.node_labels),
            relationship_types: non_empty_names(config.fallback.relationship_types),
        };
        // The matcher relies on this to never hand an empty candidate set to the fetcher
        if fallback.is_empty() {
            return Err(MappingError::InvalidConfig {
                message: "fallback must name at least one node label or relationship type"
                    .to_string(),
            });
        }

        let mut patterns = Vec::with_capacity(config.patterns.len());
        for rule in config.patterns {
            let regex = Regex::new(&rule.pattern).map_err(|e| MappingError::InvalidPattern {
                pattern: rule.pattern.clone(),
                error: e.to_string(),
            })?;
            if rule.entity.trim().is_empty() {
                return Err(MappingError::InvalidConfig {
                    message: format!("pattern `{}` has an empty entity", rule.pattern),
                });
            }
            patterns.push(TermPattern {
                regex,
                entity: rule.entity.trim().to_string(),
            });
        }

        let companions = config
            .companion_relationships
            .into_iter()
            .map(|(label, types)| (label, clean_names(types)))
            .collect();

        let mut known_labels: BTreeSet<String> = entities.values().flatten().cloned().collect();
        known_labels.extend(patterns.iter().map(|p| p.entity.clone()));
        known_labels.extend(fallback.node_labels.iter().cloned());

        Ok(MappingTables {
            name: config.name.unwrap_or_else(|| "unnamed".to_string()),
            entities,
            relations,
            attributes,
            patterns,
            companions,
            fallback,
            known_labels,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `(term, labels)` pairs of the entity vocabulary
    pub fn entity_vocabulary(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entities.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// `(action, relationship types)` pairs of the relation vocabulary
    pub fn relation_vocabulary(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.relations.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn attribute_vocabulary(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn patterns(&self) -> &[TermPattern] {
        &self.patterns
    }

    /// Resolve an entity term to node labels.
    ///
    /// Vocabulary terms resolve through the table; a term that already is a
    /// canonical label resolves to itself. Anything else resolves to nothing.
    pub fn labels_for_entity(&self, term: &str) -> Vec<String> {
        let key = normalize_text(term);
        if let Some(labels) = self.entities.get(&key) {
            return labels.clone();
        }
        if self.known_labels.contains(term) {
            return vec![term.to_string()];
        }
        Vec::new()
    }

    pub fn relationship_types_for_action(&self, action: &str) -> &[String] {
        self.relations
            .get(&normalize_text(action))
            .map(|types| types.as_slice())
            .unwrap_or(&[])
    }

    pub fn is_attribute_term(&self, term: &str) -> bool {
        self.attributes.contains_key(&normalize_text(term))
    }

    pub fn companion_relationships(&self, label: &str) -> &[String] {
        self.companions
            .get(label)
            .map(|types| types.as_slice())
            .unwrap_or(&[])
    }

    pub fn fallback(&self) -> &CandidateSchema {
        &self.fallback
    }

    /// Every vocabulary term, for prompting an LLM with the known business terms
    pub fn vocabulary_terms(&self) -> Vec<&str> {
        self.entities
            .keys()
            .chain(self.relations.keys())
            .chain(self.attributes.keys())
            .map(|k| k.as_str())
            .collect()
    }
}

fn compile_vocabulary(
    section: &str,
    raw: BTreeMap<String, Vec<String>>,
) -> Result<BTreeMap<String, Vec<String>>, MappingError> {
    let mut compiled: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (term, targets) in raw {
        let key = normalize_text(&term);
        if key.is_empty() {
            return Err(MappingError::InvalidConfig {
                message: format!("{}: term `{}` is empty after normalization", section, term),
            });
        }
        let targets = clean_names(targets);
        if targets.is_empty() {
            return Err(MappingError::InvalidConfig {
                message: format!("{}: term `{}` maps to nothing", section, term),
            });
        }

        // "Voucher" and "voucher" normalize to the same key
        let entry = compiled.entry(key).or_default();
        for target in targets {
            if !entry.contains(&target) {
                entry.push(target);
            }
        }
    }
    Ok(compiled)
}

/// Trimmed, de-duplicated names in their configured order
fn clean_names(names: Vec<String>) -> Vec<String> {
    let mut cleaned: Vec<String> = Vec::with_capacity(names.len());
    for name in names {
        let name = name.trim();
        if !name.is_empty() && !cleaned.iter().any(|n| n == name) {
            cleaned.push(name.to_string());
        }
    }
    cleaned
}

fn non_empty_names(names: Vec<String>) -> BTreeSet<String> {
    names
        .into_iter()
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .collect()
}

/// Where the registry's tables come from
#[derive(Debug, Clone, PartialEq)]
pub enum MappingSource {
    /// The table embedded in the crate
    Builtin,
    /// A YAML file, re-read on every reload
    File(PathBuf),
    /// Tables handed in directly; reload keeps them
    Fixed,
}

/// Holds the current mapping tables.
///
/// Readers take a cheap [`Arc`] snapshot, so a reload never changes the
/// tables under an extraction that is already running.
#[derive(Debug)]
pub struct MappingRegistry {
    source: MappingSource,
    current: RwLock<Arc<MappingTables>>,
}

impl MappingRegistry {
    pub fn load(source: MappingSource) -> Result<Self, MappingError> {
        let tables = match &source {
            MappingSource::Builtin => MappingTables::builtin()?,
            MappingSource::File(path) => MappingTables::from_yaml_file(path)?,
            MappingSource::Fixed => {
                return Err(MappingError::InvalidConfig {
                    message: "fixed tables are registered with MappingRegistry::from_tables"
                        .to_string(),
                })
            }
        };
        log::info!("Loaded mapping tables '{}' from {:?}", tables.name(), source);

        Ok(MappingRegistry {
            source,
            current: RwLock::new(Arc::new(tables)),
        })
    }

    pub fn from_tables(tables: MappingTables) -> Self {
        MappingRegistry {
            source: MappingSource::Fixed,
            current: RwLock::new(Arc::new(tables)),
        }
    }

    pub fn source(&self) -> &MappingSource {
        &self.source
    }

    pub fn snapshot(&self) -> Arc<MappingTables> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Re-read the tables from their source.
    ///
    /// On error the previous tables stay in place.
    pub fn reload(&self) -> Result<Arc<MappingTables>, MappingError> {
        let tables = match &self.source {
            MappingSource::Builtin => Arc::new(MappingTables::builtin()?),
            MappingSource::File(path) => Arc::new(MappingTables::from_yaml_file(path)?),
            MappingSource::Fixed => return Ok(self.snapshot()),
        };

        *self.current.write().unwrap_or_else(PoisonError::into_inner) = tables.clone();
        log::info!("Reloaded mapping tables '{}'", tables.name());
        Ok(tables)
    }
}
