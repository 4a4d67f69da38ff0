//! Integration tests - Tests that require a running Neo4j server
//!
//! Run with `--ignored` against a server described by NEO4J_URI, NEO4J_USER,
//! NEO4J_PASSWORD and (optionally) NEO4J_DATABASE.

mod neo4j_tests;
