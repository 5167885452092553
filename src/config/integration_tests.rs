#[cfg(test)]
mod integration_tests {
    use serde_json::json;
    use std::io::Write;
    use std::path::Path;

    use crate::config::{load_and_validate_config, RuntimeBuilder, UnresolvedFeaturePolicy};
    use crate::errors::{ConfigError, RuntimeError};
    use crate::features::{FeatureManifest, FsFeatureCatalog};
    use crate::model::{Pipeline, RunMode, RunStatus, StepStatus};
    use crate::pipeline::{EdgeSpec, NodeSpec, PipelineGraph};
    use crate::storage::RecordStore;

    fn write_config(dir: &Path, body: &str) -> std::path::PathBuf {
        let path = dir.join("featurepipe.yaml");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(file, "storage:\n  root: {}\n{}", dir.join("data").display(), body).unwrap();
        path
    }

    /// A YAML file on disk drives every runtime setting
    #[test]
    fn test_yaml_config_builds_runtime() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            "  retention_days: 7\nexecutor_options:\n  default_mode: async\n  max_concurrency: 2\nfeatures:\n  unresolved_policy: reject\n",
        );

        let config = load_and_validate_config(&path).unwrap();
        assert_eq!(config.features.unresolved_policy, UnresolvedFeaturePolicy::Reject);

        let runtime = RuntimeBuilder::from_config(&config).unwrap();
        assert_eq!(runtime.default_mode, RunMode::Async);
        assert_eq!(runtime.retention, chrono::Duration::days(7));
        assert!(dir.path().join("data/records").is_dir());
        assert!(dir.path().join("data/artefacts").is_dir());
        assert!(dir.path().join("data/features").is_dir());
    }

    #[test]
    fn test_invalid_values_stop_the_builder() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "  compression_level: 0\n");

        let config = crate::config::load_config(&path).unwrap();
        match RuntimeBuilder::from_config(&config) {
            Err(RuntimeError::Config(ConfigError::Invalid { field, .. })) => {
                assert_eq!(field, "storage.compression_level")
            }
            Err(other) => panic!("Expected an invalid config error, got {}", other),
            Ok(_) => panic!("Expected an invalid config error"),
        }
        assert!(!dir.path().join("data").exists());
    }

    #[test]
    fn test_published_features_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "");
        let config = load_and_validate_config(&path).unwrap();

        let hash = {
            let runtime = RuntimeBuilder::from_config(&config).unwrap();
            runtime
                .catalog
                .publish(FeatureManifest::builtin("shout", "uppercase"))
                .unwrap()
                .hash
        };

        let reopened = FsFeatureCatalog::open(config.features.get_catalog_dir(&config.storage))
            .unwrap();
        assert_eq!(reopened.list().len(), 1);
        assert_eq!(reopened.list()[0].hash, hash);
    }

    /// End to end through a real child process: `sh` copies its inputs to
    /// its output, so each step echoes what it was given.
    #[cfg(unix)]
    #[tokio::test]
    async fn test_sync_run_through_sandboxed_children() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            "sandbox:\n  program: sh\n  args: [\"-c\", 'cp \"$2\" \"$3\"', \"sandbox\"]\n  timeout_seconds: 30\n",
        );
        let config = load_and_validate_config(&path).unwrap();
        let runtime = RuntimeBuilder::from_config(&config).unwrap();

        runtime
            .catalog
            .publish(FeatureManifest::builtin("copy", "identity"))
            .unwrap();
        let pipeline = Pipeline::new(
            "copies",
            PipelineGraph::new(
                vec![NodeSpec::named("first", "copy"), NodeSpec::named("second", "copy")],
                vec![EdgeSpec::new("first", "second")],
            ),
            runtime.catalog.as_ref(),
        );
        runtime.records.save_pipeline(&pipeline).unwrap();

        let manifest = serde_json::from_value(json!({"first": {"text": "hello"}})).unwrap();
        let run = runtime
            .orchestrator
            .create_run(&pipeline, manifest, runtime.default_mode)
            .unwrap();
        let finished = runtime.orchestrator.execute(run.id).await.unwrap();

        assert_eq!(finished.status, RunStatus::Success);
        let second = runtime.orchestrator.step(run.id, "second").unwrap();
        assert_eq!(second.status, StepStatus::Success);
        assert_eq!(second.exit_code, Some(0));

        let value = runtime
            .artefacts
            .get(&finished.output_artefacts["second"])
            .unwrap();
        assert_eq!(value, json!({"input": {"text": "hello"}}));

        let stored = runtime.records.load_pipeline(pipeline.id).unwrap().unwrap();
        assert_eq!(stored.name, "copies");
        runtime.flush().unwrap();
    }
}
