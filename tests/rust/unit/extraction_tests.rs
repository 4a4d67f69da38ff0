//! End-to-end extraction behaviour over the fixture graph

#[cfg(test)]
mod extraction_tests {
    use std::sync::Arc;
    use std::time::Duration;

    use graphlens::schema_context::{
        DynamicSchemaExtractor, ExtractionError, FetchLimits, ResultCacheConfig,
    };

    use crate::common::{
        builtin_mappings, fixture_extractor, fixture_store, set, SlowStore, UnreachableStore,
    };

    #[tokio::test]
    async fn test_person_voucher_query() {
        let (extractor, _) = fixture_extractor();
        let result = extractor.extract("查询张三的凭证信息").await.unwrap();

        assert!(result.query_terms.entities.is_superset(&set(&["凭证", "人员"])));
        assert!(result
            .candidate_schema
            .node_labels
            .is_superset(&set(&["凭证", "人员"])));
        assert_eq!(result.nodes["凭证"].count, 5);
        assert_eq!(result.nodes["人员"].count, 2);
        assert!(result.nodes["人员"].properties.contains("姓名"));
        assert!(result.relationships.contains_key("凭证由人员制单"));
    }

    #[tokio::test]
    async fn test_unrecognized_query_uses_fallback() {
        let (extractor, _) = fixture_extractor();
        let result = extractor.extract("asdkjasd123").await.unwrap();

        assert!(result.query_terms.is_empty());
        assert_eq!(
            result.candidate_schema.node_labels,
            set(&["凭证", "科目", "客户", "供应商", "余额"])
        );
        assert_eq!(
            result.candidate_schema.relationship_types,
            set(&["凭证使用科目", "余额对应科目"])
        );
        assert_eq!(result.nodes.len(), 5);
        assert_eq!(result.relationships["余额对应科目"].count, 3);
        assert!(result.to_markdown().contains("## Node Labels"));
    }

    #[tokio::test]
    async fn test_result_keys_match_candidates() {
        let (extractor, _) = fixture_extractor();

        for query in ["查询张三的凭证信息", "显示应付账款科目的余额", "谁审核了凭证", "银行账户和仓库"] {
            let result = extractor.extract(query).await.unwrap();
            let node_keys = result.nodes.keys().cloned().collect();
            let rel_keys = result.relationships.keys().cloned().collect();

            assert_eq!(result.candidate_schema.node_labels, node_keys, "{}", query);
            assert_eq!(result.candidate_schema.relationship_types, rel_keys, "{}", query);
        }
    }

    #[tokio::test]
    async fn test_empty_and_populated_labels() {
        let (extractor, _) = fixture_extractor();
        let result = extractor.extract("银行账户和凭证").await.unwrap();

        let bank = &result.nodes["银行账户"];
        assert_eq!(bank.count, 0);
        assert!(bank.properties.is_empty());
        assert!(bank.samples.is_empty());

        let voucher = &result.nodes["凭证"];
        assert_eq!(voucher.count, 5);
        assert!(voucher.properties.is_superset(&set(&["凭证号", "金额", "摘要"])));
        assert_eq!(voucher.samples.len(), 3);
    }

    #[tokio::test]
    async fn test_cached_result_skips_graph_store() {
        let (extractor, store) = fixture_extractor();

        let first = extractor.extract("查询张三的凭证信息").await.unwrap();
        let queries_after_first = store.query_count();
        assert!(queries_after_first > 0);

        // Same question, different spacing and punctuation
        let second = extractor.extract("  查询张三的凭证信息？").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(store.query_count(), queries_after_first);
        assert_eq!(extractor.cache_metrics().hits, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cached_result_expires_after_ttl() {
        let store = fixture_store();
        let extractor = DynamicSchemaExtractor::new(builtin_mappings(), store.clone())
            .with_cache_config(ResultCacheConfig {
                ttl: Duration::from_secs(300),
                ..Default::default()
            });

        extractor.extract("查询凭证").await.unwrap();
        let queries_after_first = store.query_count();

        tokio::time::advance(Duration::from_secs(299)).await;
        extractor.extract("查询凭证").await.unwrap();
        assert_eq!(store.query_count(), queries_after_first);

        tokio::time::advance(Duration::from_secs(1)).await;
        extractor.extract("查询凭证").await.unwrap();
        assert_eq!(store.query_count(), queries_after_first * 2);
        assert_eq!(extractor.cache_metrics().expirations, 1);
    }

    #[tokio::test]
    async fn test_sample_and_pattern_bounds() {
        let store = fixture_store();
        let extractor = DynamicSchemaExtractor::new(builtin_mappings(), store).with_fetch_limits(
            FetchLimits {
                pattern_limit: 1,
                ..Default::default()
            },
        );

        let result = extractor
            .extract_dynamic_schema("余额对应哪些科目和客户", false, 2)
            .await
            .unwrap();

        for node in result.nodes.values() {
            assert!(node.samples.len() <= 2);
        }
        for rel in result.relationships.values() {
            assert!(rel.samples.len() <= 2);
            assert!(rel.patterns.len() <= 1);
        }
        assert_eq!(result.nodes["余额"].samples.len(), 2);
        assert_eq!(result.relationships["余额对应科目"].patterns[0].frequency, 3);
    }

    #[tokio::test]
    async fn test_unreachable_store_is_an_error() {
        let extractor = DynamicSchemaExtractor::new(builtin_mappings(), Arc::new(UnreachableStore));

        let err = extractor.extract("查询张三的凭证信息").await.unwrap_err();
        assert!(matches!(err, ExtractionError::GraphStoreUnavailable { .. }));
        assert!(err.to_string().contains("connection refused"));

        // Nothing was cached, so the next call fails again
        assert_eq!(extractor.cache_metrics().size, 0);
        assert!(extractor.extract("查询张三的凭证信息").await.is_err());
    }

    #[tokio::test]
    async fn test_unreachable_store_with_fallback_candidates() {
        let extractor = DynamicSchemaExtractor::new(builtin_mappings(), Arc::new(UnreachableStore));
        assert!(extractor.extract("asdkjasd123").await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_extraction_leaves_cache_empty() {
        let store = Arc::new(SlowStore::new(Duration::from_secs(60)));
        let extractor = DynamicSchemaExtractor::new(builtin_mappings(), store);

        let outcome = tokio::time::timeout(
            Duration::from_secs(1),
            extractor.extract("查询张三的凭证信息"),
        )
        .await;
        assert!(outcome.is_err());
        assert_eq!(extractor.cache_metrics().size, 0);

        // Left to finish, the same query is fetched and cached
        let result = extractor.extract("查询张三的凭证信息").await.unwrap();
        assert_eq!(result.nodes["凭证"].count, 5);
        assert_eq!(extractor.cache_metrics().size, 1);
    }
}
