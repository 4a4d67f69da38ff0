//! Unit tests - Pipeline behaviour against the in-memory fixture graph
//!
//! No external services are needed; the graph comes from tests/fixtures.

mod common;
mod extraction_tests;
mod fixture_store_tests;
mod mapping_file_tests;
