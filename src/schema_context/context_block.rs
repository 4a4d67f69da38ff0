//! Markdown rendering of a [`DynamicSchemaResult`] for prompt injection.
//!
//! Output only depends on the result: labels and relationship types come out
//! in key order, terms sorted, samples in the order they were fetched.

use std::fmt;
use std::fmt::Write;

use super::types::{
    DynamicSchemaResult, NodeMetadata, PropertyMap, RelationshipMetadata, RelationshipPattern,
};

impl DynamicSchemaResult {
    /// Render the schema context block
    pub fn to_markdown(&self) -> String {
        let mut md = String::with_capacity(256 + 200 * (self.nodes.len() + self.relationships.len()));

        md.push_str("# Dynamic Schema Context\n\n");
        let _ = writeln!(md, "**Extraction time**: {:.3}s", self.extraction_time);
        let terms: Vec<String> = self.query_terms.all_terms().into_iter().collect();
        let _ = writeln!(md, "**Query terms**: {}\n", join_or_none(&terms));

        if !self.nodes.is_empty() {
            md.push_str("## Node Labels\n\n");
            for (label, node) in &self.nodes {
                write_node(&mut md, label, node);
            }
        }

        if !self.relationships.is_empty() {
            md.push_str("## Relationship Types\n\n");
            for (rel_type, rel) in &self.relationships {
                write_relationship(&mut md, rel_type, rel);
            }
        }

        md
    }
}

impl fmt::Display for DynamicSchemaResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_markdown())
    }
}

fn write_node(md: &mut String, label: &str, node: &NodeMetadata) {
    let _ = writeln!(md, "- `{}` ({} nodes)", label, node.count);
    let properties: Vec<String> = node.properties.iter().cloned().collect();
    let _ = writeln!(md, "  - Properties: {}", join_or_none(&properties));

    let samples: Vec<String> = node.samples.iter().map(compact_json).collect();
    write_list(md, "Samples", &samples);
    md.push('\n');
}

fn write_relationship(md: &mut String, rel_type: &str, rel: &RelationshipMetadata) {
    let _ = writeln!(md, "- `{}` ({} relationships)", rel_type, rel.count);
    let properties: Vec<String> = rel.properties.iter().cloned().collect();
    let _ = writeln!(md, "  - Properties: {}", join_or_none(&properties));

    let patterns: Vec<String> = rel
        .patterns
        .iter()
        .map(|pattern| pattern_line(rel_type, pattern))
        .collect();
    write_list(md, "Patterns", &patterns);

    let samples: Vec<String> = rel
        .samples
        .iter()
        .map(|sample| {
            format!(
                "({})->({}) {}",
                sample.source_labels.join(":"),
                sample.target_labels.join(":"),
                compact_json(&sample.properties)
            )
        })
        .collect();
    write_list(md, "Samples", &samples);
    md.push('\n');
}

/// Nested list, or `none` so an empty field is still visible
fn write_list(md: &mut String, field: &str, items: &[String]) {
    if items.is_empty() {
        let _ = writeln!(md, "  - {}: none", field);
        return;
    }
    let _ = writeln!(md, "  - {}:", field);
    for item in items {
        let _ = writeln!(md, "    - {}", item);
    }
}

fn pattern_line(rel_type: &str, pattern: &RelationshipPattern) -> String {
    format!(
        "({})-[:{}]->({}) x{}",
        pattern.source_labels.join(":"),
        rel_type,
        pattern.target_labels.join(":"),
        pattern.frequency
    )
}

fn compact_json(properties: &PropertyMap) -> String {
    serde_json::to_string(properties).unwrap_or_else(|_| "{}".to_string())
}

fn join_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "none".to_string()
    } else {
        items.join(", ")
    }
}
