//! Neo4j backend for [`GraphStore`] over Bolt, via `neo4rs`.

use std::collections::BTreeSet;

use async_trait::async_trait;
use neo4rs::{query, ConfigBuilder, Graph, Query, Row};
use serde::{Deserialize, Serialize};

use super::GraphStore;
use crate::schema_context::errors::GraphStoreError;
use crate::schema_context::types::{PropertyMap, RelationshipPattern, RelationshipSample};

const DEFAULT_MAX_CONNECTIONS: usize = 4;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Neo4jConfig {
    pub uri: String,
    pub user: String,
    #[serde(skip_serializing)]
    pub password: String,
    /// `None` uses the server's default database
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

fn default_max_connections() -> usize {
    DEFAULT_MAX_CONNECTIONS
}

impl Default for Neo4jConfig {
    fn default() -> Self {
        Neo4jConfig {
            uri: "bolt://localhost:7687".to_string(),
            user: "neo4j".to_string(),
            password: String::new(),
            database: None,
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }
}

#[derive(Clone)]
pub struct Neo4jGraphStore {
    graph: Graph,
}

impl Neo4jGraphStore {
    /// Build the connection pool and ping the server.
    ///
    /// `neo4rs` connects lazily, so without the ping an unreachable server
    /// would only show up on the first metadata query.
    pub async fn connect(config: &Neo4jConfig) -> Result<Self, GraphStoreError> {
        let mut builder = ConfigBuilder::default()
            .uri(config.uri.as_str())
            .user(config.user.as_str())
            .password(config.password.as_str())
            .max_connections(config.max_connections);
        if let Some(database) = &config.database {
            builder = builder.db(database.as_str());
        }
        let neo4j_config = builder.build().map_err(|e| {
            GraphStoreError::unavailable(format!("invalid Neo4j config for {}: {}", config.uri, e))
        })?;

        let graph = Graph::connect(neo4j_config).await.map_err(|e| {
            GraphStoreError::unavailable(format!("failed to connect to {}: {}", config.uri, e))
        })?;

        graph.run(query("RETURN 1")).await.map_err(|e| {
            GraphStoreError::unavailable(format!("{} is not answering queries: {}", config.uri, e))
        })?;

        log::info!("Connected to Neo4j at {}", config.uri);
        Ok(Neo4jGraphStore { graph })
    }

    async fn rows(
        &self,
        shape: &'static str,
        target: &str,
        query: Query,
    ) -> Result<Vec<Row>, GraphStoreError> {
        let mut stream = self
            .graph
            .execute(query)
            .await
            .map_err(|e| classify(shape, target, e))?;

        let mut rows = Vec::new();
        while let Some(row) = stream.next().await.map_err(|e| classify(shape, target, e))? {
            rows.push(row);
        }
        Ok(rows)
    }

    async fn count(&self, shape: &'static str, target: &str, cypher: String) -> Result<u64, GraphStoreError> {
        let rows = self.rows(shape, target, query(&cypher)).await?;
        match rows.first() {
            Some(row) => {
                let count: i64 = row
                    .get("count")
                    .map_err(|e| GraphStoreError::query(shape, target, e.to_string()))?;
                Ok(count.max(0) as u64)
            }
            None => Ok(0),
        }
    }

    async fn keys(
        &self,
        shape: &'static str,
        target: &str,
        cypher: String,
        sample_size: usize,
    ) -> Result<BTreeSet<String>, GraphStoreError> {
        let rows = self
            .rows(shape, target, query(&cypher).param("limit", limit_param(sample_size)))
            .await?;

        let mut keys = BTreeSet::new();
        for row in rows {
            let key: String = row
                .get("key")
                .map_err(|e| GraphStoreError::query(shape, target, e.to_string()))?;
            keys.insert(key);
        }
        Ok(keys)
    }
}

#[async_trait]
impl GraphStore for Neo4jGraphStore {
    async fn count_nodes(&self, label: &str) -> Result<u64, GraphStoreError> {
        let cypher = format!("MATCH (n:{}) RETURN count(n) AS count", escape_identifier(label));
        self.count("node_count", label, cypher).await
    }

    async fn node_property_keys(
        &self,
        label: &str,
        sample_size: usize,
    ) -> Result<BTreeSet<String>, GraphStoreError> {
        let cypher = format!(
            "MATCH (n:{}) WITH n LIMIT $limit UNWIND keys(n) AS key RETURN DISTINCT key",
            escape_identifier(label)
        );
        self.keys("node_properties", label, cypher, sample_size).await
    }

    async fn sample_nodes(
        &self,
        label: &str,
        limit: usize,
    ) -> Result<Vec<PropertyMap>, GraphStoreError> {
        let cypher = format!(
            "MATCH (n:{}) RETURN properties(n) AS props LIMIT $limit",
            escape_identifier(label)
        );
        let rows = self
            .rows("node_samples", label, query(&cypher).param("limit", limit_param(limit)))
            .await?;

        Ok(rows
            .iter()
            .filter_map(|row| properties_of(row, "node_samples", label))
            .collect())
    }

    async fn count_relationships(&self, rel_type: &str) -> Result<u64, GraphStoreError> {
        let cypher = format!(
            "MATCH ()-[r:{}]->() RETURN count(r) AS count",
            escape_identifier(rel_type)
        );
        self.count("relationship_count", rel_type, cypher).await
    }

    async fn relationship_property_keys(
        &self,
        rel_type: &str,
        sample_size: usize,
    ) -> Result<BTreeSet<String>, GraphStoreError> {
        let cypher = format!(
            "MATCH ()-[r:{}]->() WITH r LIMIT $limit UNWIND keys(r) AS key RETURN DISTINCT key",
            escape_identifier(rel_type)
        );
        self.keys("relationship_properties", rel_type, cypher, sample_size)
            .await
    }

    async fn relationship_patterns(
        &self,
        rel_type: &str,
        limit: usize,
    ) -> Result<Vec<RelationshipPattern>, GraphStoreError> {
        let shape = "relationship_patterns";
        let cypher = format!(
            "MATCH (s)-[r:{}]->(t) \
             RETURN labels(s) AS source_labels, labels(t) AS target_labels, count(*) AS frequency \
             ORDER BY frequency DESC LIMIT $limit",
            escape_identifier(rel_type)
        );
        let rows = self
            .rows(shape, rel_type, query(&cypher).param("limit", limit_param(limit)))
            .await?;

        rows.iter()
            .map(|row| {
                let source_labels: Vec<String> = row
                    .get("source_labels")
                    .map_err(|e| GraphStoreError::query(shape, rel_type, e.to_string()))?;
                let target_labels: Vec<String> = row
                    .get("target_labels")
                    .map_err(|e| GraphStoreError::query(shape, rel_type, e.to_string()))?;
                let frequency: i64 = row
                    .get("frequency")
                    .map_err(|e| GraphStoreError::query(shape, rel_type, e.to_string()))?;
                Ok(RelationshipPattern {
                    source_labels,
                    target_labels,
                    frequency: frequency.max(0) as u64,
                })
            })
            .collect()
    }

    async fn sample_relationships(
        &self,
        rel_type: &str,
        limit: usize,
    ) -> Result<Vec<RelationshipSample>, GraphStoreError> {
        let shape = "relationship_samples";
        let cypher = format!(
            "MATCH (s)-[r:{}]->(t) \
             RETURN labels(s) AS source_labels, labels(t) AS target_labels, properties(r) AS props \
             LIMIT $limit",
            escape_identifier(rel_type)
        );
        let rows = self
            .rows(shape, rel_type, query(&cypher).param("limit", limit_param(limit)))
            .await?;

        let mut samples = Vec::with_capacity(rows.len());
        for row in &rows {
            let Some(properties) = properties_of(row, shape, rel_type) else {
                continue;
            };
            let source_labels: Vec<String> = row
                .get("source_labels")
                .map_err(|e| GraphStoreError::query(shape, rel_type, e.to_string()))?;
            let target_labels: Vec<String> = row
                .get("target_labels")
                .map_err(|e| GraphStoreError::query(shape, rel_type, e.to_string()))?;
            samples.push(RelationshipSample {
                source_labels,
                target_labels,
                properties,
            });
        }
        Ok(samples)
    }
}

/// Quote a label or relationship type as a Cypher identifier
pub fn escape_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

fn limit_param(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

/// Connection-level failures mean the store is down; everything else is a
/// problem with this one query.
fn classify(shape: &'static str, target: &str, error: neo4rs::Error) -> GraphStoreError {
    match error {
        neo4rs::Error::IOError { .. } | neo4rs::Error::ConnectionError => {
            GraphStoreError::unavailable(error.to_string())
        }
        other => GraphStoreError::query(shape, target, other.to_string()),
    }
}

/// Sample rows whose properties cannot be represented as JSON are skipped
fn properties_of(row: &Row, shape: &str, target: &str) -> Option<PropertyMap> {
    match row.get::<serde_json::Value>("props") {
        Ok(serde_json::Value::Object(map)) => Some(map),
        Ok(serde_json::Value::Null) => Some(PropertyMap::new()),
        Ok(other) => {
            log::warn!("{} for '{}' returned non-map properties: {}", shape, target, other);
            None
        }
        Err(e) => {
            log::warn!("Skipping {} row for '{}': {}", shape, target, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_identifier() {
        assert_eq!(escape_identifier("凭证"), "`凭证`");
        assert_eq!(escape_identifier("Bank Account"), "`Bank Account`");
        assert_eq!(escape_identifier("a`) DETACH DELETE n //"), "`a``) DETACH DELETE n //`");
    }

    #[test]
    fn test_limit_param_saturates() {
        assert_eq!(limit_param(25), 25);
        assert_eq!(limit_param(usize::MAX), i64::MAX);
    }

    #[test]
    fn test_connection_errors_are_unavailable() {
        let io = neo4rs::Error::IOError {
            detail: std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused"),
        };
        assert!(classify("node_count", "凭证", io).is_unavailable());
        assert!(classify("node_count", "凭证", neo4rs::Error::ConnectionError).is_unavailable());
    }

    #[test]
    fn test_config_defaults() {
        let config = Neo4jConfig::default();
        assert_eq!(config.uri, "bolt://localhost:7687");
        assert_eq!(config.database, None);
        assert_eq!(config.max_connections, DEFAULT_MAX_CONNECTIONS);
    }
}
