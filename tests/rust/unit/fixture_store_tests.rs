//! The bundled fixture graph as a GraphStore

#[cfg(test)]
mod fixture_store_tests {
    use graphlens::graph_store::GraphStore;

    use crate::common::{fixture_store, set};

    #[tokio::test]
    async fn test_fixture_loads() {
        let store = fixture_store();
        assert_eq!(store.node_count(), 17);
        assert_eq!(store.relationship_count(), 17);
    }

    #[tokio::test]
    async fn test_account_metadata() {
        let store = fixture_store();

        assert_eq!(store.count_nodes("科目").await.unwrap(), 4);
        assert_eq!(
            store.node_property_keys("科目", 25).await.unwrap(),
            set(&["编码", "名称", "类别"])
        );
    }

    #[tokio::test]
    async fn test_patterns_sorted_by_frequency() {
        let store = fixture_store();

        let patterns = store.relationship_patterns("凭证使用科目", 10).await.unwrap();
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].frequency, 5);

        let patterns = store.relationship_patterns("凭证由人员制单", 10).await.unwrap();
        assert_eq!(patterns[0].source_labels, vec!["凭证".to_string()]);
        assert_eq!(patterns[0].target_labels, vec!["人员".to_string()]);
        assert_eq!(patterns[0].frequency, 3);
    }

    #[tokio::test]
    async fn test_relationship_samples_carry_endpoint_labels() {
        let store = fixture_store();

        let samples = store.sample_relationships("凭证由人员审核", 10).await.unwrap();
        assert_eq!(samples.len(), 2);
        for sample in &samples {
            assert_eq!(sample.source_labels, vec!["凭证".to_string()]);
            assert_eq!(sample.target_labels, vec!["人员".to_string()]);
            assert!(sample.properties.contains_key("审核日期"));
        }
    }

    #[tokio::test]
    async fn test_missing_label_is_empty_not_error() {
        let store = fixture_store();

        assert_eq!(store.count_nodes("仓库").await.unwrap(), 0);
        assert!(store.node_property_keys("仓库", 25).await.unwrap().is_empty());
        assert!(store.sample_nodes("仓库", 3).await.unwrap().is_empty());
        assert_eq!(store.count_relationships("凭证涉及仓库").await.unwrap(), 0);
    }
}
