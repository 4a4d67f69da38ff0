//! Extraction against a live Neo4j server

#[cfg(test)]
mod neo4j_tests {
    use std::sync::Arc;

    use graphlens::config::ExtractorConfig;
    use graphlens::graph_store::{GraphStore, Neo4jConfig, Neo4jGraphStore};
    use graphlens::schema_context::{
        extract_dynamic_schema_for_query, DynamicSchemaExtractor, GraphStoreError, MappingRegistry,
        SetupError,
    };

    async fn connect() -> Neo4jGraphStore {
        let config = ExtractorConfig::from_env().unwrap();
        Neo4jGraphStore::connect(&config.neo4j_config()).await.unwrap()
    }

    #[tokio::test]
    #[ignore]
    async fn test_meta_queries_are_well_formed() {
        let store = connect().await;

        // Label that cannot exist; every query must still succeed
        let label = "graphlens `probe` label";
        assert_eq!(store.count_nodes(label).await.unwrap(), 0);
        assert!(store.node_property_keys(label, 25).await.unwrap().is_empty());
        assert!(store.sample_nodes(label, 3).await.unwrap().is_empty());
        assert_eq!(store.count_relationships(label).await.unwrap(), 0);
        assert!(store.relationship_patterns(label, 10).await.unwrap().is_empty());
        assert!(store.sample_relationships(label, 3).await.unwrap().is_empty());
    }

    #[tokio::test]
    #[ignore]
    async fn test_extraction_against_server() {
        let config = ExtractorConfig::from_env().unwrap();
        let mappings = Arc::new(MappingRegistry::load(config.mapping_source()).unwrap());
        let extractor = DynamicSchemaExtractor::from_config(&config, mappings, Arc::new(connect().await));

        let result = extractor.extract("查询张三的凭证信息").await.unwrap();
        assert!(result.nodes.contains_key("凭证"));
        assert!(result.nodes.contains_key("人员"));
        for node in result.nodes.values() {
            assert!(node.samples.len() <= config.max_samples);
        }
        println!("{}", result.to_markdown());
    }

    #[tokio::test]
    #[ignore]
    async fn test_one_shot_helper() {
        let result = extract_dynamic_schema_for_query("显示应付账款科目的余额")
            .await
            .unwrap();
        assert!(result.candidate_schema.node_labels.contains("科目"));
    }

    #[tokio::test]
    #[ignore]
    async fn test_unreachable_server() {
        let config = Neo4jConfig {
            uri: "bolt://127.0.0.1:1".to_string(),
            ..Default::default()
        };

        match Neo4jGraphStore::connect(&config).await {
            Err(e) => assert!(matches!(e, GraphStoreError::Unavailable { .. })),
            Ok(_) => panic!("connected to a closed port"),
        }

        // Same failure through the one-shot helper's error type
        let err: SetupError = GraphStoreError::unavailable("down").into();
        assert!(err.to_string().contains("unavailable"));
    }
}
