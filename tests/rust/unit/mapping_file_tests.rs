//! Mapping tables loaded from files and swapped at runtime

#[cfg(test)]
mod mapping_file_tests {
    use std::io::Write;
    use std::sync::Arc;

    use graphlens::schema_context::{
        DynamicSchemaExtractor, MappingError, MappingRegistry, MappingSource, MappingTables,
    };

    use crate::common::{fixture_store, set};

    const BUILTIN_MAPPINGS: &str =
        concat!(env!("CARGO_MANIFEST_DIR"), "/config/mappings.yaml");

    fn write_mappings(file: &mut tempfile::NamedTempFile, yaml: &str) {
        let handle = file.as_file_mut();
        handle.set_len(0).unwrap();
        std::io::Seek::rewind(handle).unwrap();
        handle.write_all(yaml.as_bytes()).unwrap();
        handle.flush().unwrap();
    }

    #[test]
    fn test_shipped_file_matches_builtin() {
        let from_file = MappingTables::from_yaml_file(BUILTIN_MAPPINGS).unwrap();
        let builtin = MappingTables::builtin().unwrap();

        assert_eq!(from_file.name(), builtin.name());
        assert_eq!(from_file.fallback(), builtin.fallback());
        assert_eq!(from_file.vocabulary_terms(), builtin.vocabulary_terms());
    }

    #[test]
    fn test_missing_file() {
        let err = MappingRegistry::load(MappingSource::File("/nonexistent/mappings.yaml".into()))
            .unwrap_err();
        assert!(matches!(err, MappingError::ReadError { .. }));
    }

    #[tokio::test]
    async fn test_reload_picks_up_new_vocabulary() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write_mappings(
            &mut file,
            "name: v1\nentities:\n  凭证: [凭证]\nfallback:\n  node_labels: [凭证]\n",
        );
        let registry =
            Arc::new(MappingRegistry::load(MappingSource::File(file.path().to_path_buf())).unwrap());
        let extractor = DynamicSchemaExtractor::new(registry, fixture_store());

        // 客户 is unknown to v1, so the fallback answers
        let before = extractor.extract("客户列表").await.unwrap();
        assert_eq!(before.candidate_schema.node_labels, set(&["凭证"]));

        write_mappings(
            &mut file,
            "name: v2\nentities:\n  凭证: [凭证]\n  客户: [客户]\nfallback:\n  node_labels: [凭证]\n",
        );
        extractor.reload_mappings().unwrap();

        let after = extractor.extract("客户列表").await.unwrap();
        assert_eq!(after.candidate_schema.node_labels, set(&["客户"]));
        assert_eq!(after.nodes["客户"].count, 2);
    }

    #[tokio::test]
    async fn test_broken_reload_keeps_tables() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write_mappings(
            &mut file,
            "name: good\nentities:\n  客户: [客户]\nfallback:\n  node_labels: [凭证]\n",
        );
        let registry =
            Arc::new(MappingRegistry::load(MappingSource::File(file.path().to_path_buf())).unwrap());
        let extractor = DynamicSchemaExtractor::new(registry, fixture_store());

        write_mappings(&mut file, "name: broken\nfallback:\n  node_labels: []\n");
        assert!(extractor.reload_mappings().is_err());

        assert_eq!(extractor.mappings().snapshot().name(), "good");
        let result = extractor.extract("客户列表").await.unwrap();
        assert_eq!(result.candidate_schema.node_labels, set(&["客户"]));
    }
}
