use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use crate::backends::stub::{StubBehavior, StubExecutor};
use crate::config::UnresolvedFeaturePolicy;
use crate::engine::{OrchestratorOptions, RetryPolicy, RunOrchestrator, TokioJobQueue};
use crate::errors::OrchestratorError;
use crate::features::{FeatureManifest, FsFeatureCatalog};
use crate::model::{InputManifest, Pipeline, PipelineRun, RunMode, RunStatus, StepRun, StepStatus};
use crate::pipeline::{EdgeSpec, NodeSpec, PipelineGraph};
use crate::storage::testing::InterleavingStore;
use crate::storage::{ArtefactStore, BlobStore, RecordStore, SledRecordStore};

/// Orchestration tests against a real record store and artefact store, with
/// the stub executor standing in for the sandbox.
#[cfg(test)]
mod tests {
    use super::*;

    struct Harness {
        _dir: TempDir,
        catalog: Arc<FsFeatureCatalog>,
        artefacts: Arc<ArtefactStore>,
        executor: Arc<StubExecutor>,
        orchestrator: Arc<RunOrchestrator>,
    }

    impl Harness {
        fn new() -> Self {
            Self::with_policy(UnresolvedFeaturePolicy::Skip)
        }

        fn with_policy(unresolved_policy: UnresolvedFeaturePolicy) -> Self {
            let records: Arc<dyn RecordStore> = Arc::new(SledRecordStore::temporary().unwrap());
            Self::build(unresolved_policy, records)
        }

        fn with_store(records: Arc<dyn RecordStore>) -> Self {
            Self::build(UnresolvedFeaturePolicy::Skip, records)
        }

        fn build(unresolved_policy: UnresolvedFeaturePolicy, records: Arc<dyn RecordStore>) -> Self {
            let dir = tempfile::tempdir().unwrap();
            let artefacts = Arc::new(ArtefactStore::new(
                BlobStore::new(dir.path(), 3),
                Arc::clone(&records),
                1024 * 1024,
            ));
            let catalog = Arc::new(FsFeatureCatalog::in_memory());
            let executor = Arc::new(StubExecutor::new());
            let queue = Arc::new(TokioJobQueue::new(
                4,
                RetryPolicy {
                    max_attempts: 3,
                    delay: Duration::from_millis(5),
                },
            ));

            let orchestrator = Arc::new(RunOrchestrator::new(
                records,
                Arc::clone(&artefacts),
                catalog.clone(),
                executor.clone(),
                queue,
                OrchestratorOptions {
                    max_attempts: 3,
                    unresolved_policy,
                },
            ));

            Self {
                _dir: dir,
                catalog,
                artefacts,
                executor,
                orchestrator,
            }
        }

        /// Publish a feature and return its hash
        fn feature(&self, name: &str) -> String {
            self.catalog
                .publish(FeatureManifest::builtin(name, "identity"))
                .unwrap()
                .hash
        }

        fn pipeline(&self, nodes: Vec<NodeSpec>, edges: Vec<EdgeSpec>) -> Pipeline {
            Pipeline::new("test", PipelineGraph::new(nodes, edges), self.catalog.as_ref())
        }

        fn status(&self, run_id: uuid::Uuid, node_id: &str) -> StepStatus {
            self.orchestrator.step(run_id, node_id).unwrap().status
        }

        fn output(&self, run_id: uuid::Uuid, node_id: &str) -> Value {
            let hash = self
                .orchestrator
                .step(run_id, node_id)
                .unwrap()
                .artefact_hash
                .unwrap();
            self.artefacts.get(&hash).unwrap()
        }
    }

    fn manifest(value: Value) -> InputManifest {
        serde_json::from_value(value).unwrap()
    }

    fn node(id: &str, feature: &str) -> NodeSpec {
        NodeSpec::named(id, feature)
    }

    #[tokio::test]
    async fn test_sync_chain_passes_artefacts_downstream() {
        let h = Harness::new();
        h.feature("f");
        let pipeline = h.pipeline(
            vec![node("a", "f"), node("b", "f"), node("c", "f")],
            vec![EdgeSpec::new("a", "b"), EdgeSpec::new("b", "c")],
        );

        let run = h
            .orchestrator
            .create_run(&pipeline, manifest(json!({"a": {"text": "hi"}})), RunMode::Sync)
            .unwrap();
        assert_eq!(run.status, RunStatus::Pending);

        let finished = h.orchestrator.execute_sync(run.id).await.unwrap();
        assert_eq!(finished.status, RunStatus::Success);
        assert_eq!(finished.output_artefacts.len(), 3);
        assert!(finished.started_at.is_some());
        assert!(finished.duration().is_some());

        assert_eq!(h.output(run.id, "a"), json!({"text": "hi"}));
        assert_eq!(h.output(run.id, "b"), json!({"input": {"text": "hi"}}));
        assert_eq!(
            h.output(run.id, "c"),
            json!({"input": {"input": {"text": "hi"}}})
        );

        let b = h.orchestrator.step(run.id, "b").unwrap();
        assert_eq!(b.attempts, 1);
        assert_eq!(b.max_attempts, 1);
        assert_eq!(
            b.inputs["input"],
            json!({"artefact": finished.output_artefacts["a"]})
        );
        assert_eq!(b.exit_code, Some(0));
    }

    #[tokio::test]
    async fn test_failure_skips_transitive_dependents_only() {
        let h = Harness::new();
        let broken = h.feature("broken");
        h.feature("f");
        h.executor
            .set(broken.clone(), StubBehavior::Fail("boom".to_string()));

        let pipeline = h.pipeline(
            vec![
                node("a", "broken"),
                node("b", "f"),
                node("c", "f"),
                node("d", "f"),
            ],
            vec![EdgeSpec::new("a", "b"), EdgeSpec::new("b", "c")],
        );
        let run = h
            .orchestrator
            .create_run(&pipeline, InputManifest::new(), RunMode::Sync)
            .unwrap();

        let finished = h.orchestrator.execute_sync(run.id).await.unwrap();

        assert_eq!(finished.status, RunStatus::Failed);
        assert_eq!(
            finished.error_message.as_deref(),
            Some("1 step(s) failed, 1 succeeded")
        );
        assert_eq!(h.status(run.id, "a"), StepStatus::Failed);
        assert_eq!(h.status(run.id, "b"), StepStatus::Skipped);
        assert_eq!(h.status(run.id, "c"), StepStatus::Skipped);
        assert_eq!(h.status(run.id, "d"), StepStatus::Success);

        let a = h.orchestrator.step(run.id, "a").unwrap();
        assert_eq!(a.attempts, 1);
        assert_eq!(a.stderr, "boom");
        assert_eq!(a.exit_code, Some(1));
        assert!(a.error.unwrap().contains("boom"));
        assert_eq!(h.executor.calls(&broken), 1);
    }

    #[tokio::test]
    async fn test_async_fan_in_binds_ports() {
        let h = Harness::new();
        let left = h.feature("left");
        let right = h.feature("right");
        h.feature("join");
        h.executor.set(left, StubBehavior::Constant(json!("L")));
        h.executor.set(right, StubBehavior::Constant(json!("R")));

        let pipeline = h.pipeline(
            vec![node("A", "left"), node("B", "right"), node("C", "join")],
            vec![
                EdgeSpec::new("A", "C").with_in_port("left"),
                EdgeSpec::new("B", "C").with_in_port("right"),
            ],
        );
        let run = h
            .orchestrator
            .create_run(&pipeline, InputManifest::new(), RunMode::Async)
            .unwrap();

        let finished = h
            .orchestrator
            .execute_async(run.id)
            .unwrap()
            .await
            .unwrap()
            .unwrap();

        assert_eq!(finished.status, RunStatus::Success);
        assert_eq!(h.output(run.id, "C"), json!({"left": "L", "right": "R"}));
        let c = h.orchestrator.step(run.id, "C").unwrap();
        assert!(c.started_at >= h.orchestrator.step(run.id, "A").unwrap().finished_at);
    }

    #[tokio::test]
    async fn test_async_step_fails_at_exactly_max_attempts() {
        let h = Harness::new();
        let broken = h.feature("broken");
        h.feature("f");
        h.executor
            .set(broken.clone(), StubBehavior::Fail("always".to_string()));

        let pipeline = h.pipeline(
            vec![node("a", "broken"), node("b", "f")],
            vec![EdgeSpec::new("a", "b")],
        );
        let run = h
            .orchestrator
            .create_run(&pipeline, InputManifest::new(), RunMode::Async)
            .unwrap();

        let finished = h.orchestrator.execute(run.id).await.unwrap();

        assert_eq!(finished.status, RunStatus::Failed);
        let a = h.orchestrator.step(run.id, "a").unwrap();
        assert_eq!(a.status, StepStatus::Failed);
        assert_eq!(a.attempts, 3);
        assert_eq!(a.max_attempts, 3);
        assert_eq!(h.executor.calls(&broken), 3);
        assert_eq!(h.status(run.id, "b"), StepStatus::Skipped);
    }

    #[tokio::test]
    async fn test_async_flaky_step_succeeds_on_retry() {
        let h = Harness::new();
        let flaky = h.feature("flaky");
        h.executor.set(flaky.clone(), StubBehavior::FailTimes(2));

        let pipeline = h.pipeline(vec![node("a", "flaky")], vec![]);
        let run = h
            .orchestrator
            .create_run(&pipeline, manifest(json!({"a": {"n": 1}})), RunMode::Async)
            .unwrap();

        let finished = h.orchestrator.execute(run.id).await.unwrap();

        assert_eq!(finished.status, RunStatus::Success);
        let a = h.orchestrator.step(run.id, "a").unwrap();
        assert_eq!(a.attempts, 3);
        assert!(a.error.is_none());
        assert_eq!(h.output(run.id, "a"), json!({"n": 1}));
    }

    #[tokio::test]
    async fn test_cancel_pending_run() {
        let h = Harness::new();
        h.feature("f");
        let pipeline = h.pipeline(
            vec![node("a", "f"), node("b", "f")],
            vec![EdgeSpec::new("a", "b")],
        );
        let run = h
            .orchestrator
            .create_run(&pipeline, InputManifest::new(), RunMode::Sync)
            .unwrap();

        let cancelled = h.orchestrator.cancel_run(run.id).unwrap();
        assert_eq!(cancelled.status, RunStatus::Cancelled);
        assert_eq!(h.status(run.id, "a"), StepStatus::Skipped);
        assert_eq!(h.status(run.id, "b"), StepStatus::Skipped);

        assert!(matches!(
            h.orchestrator.cancel_run(run.id),
            Err(OrchestratorError::InvalidRunTransition { action: "cancel", .. })
        ));
        assert!(matches!(
            h.orchestrator.execute_sync(run.id).await,
            Err(OrchestratorError::InvalidRunTransition { action: "start", .. })
        ));
        assert_eq!(h.executor.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_cancel_discards_in_flight_result() {
        let h = Harness::new();
        let slow = h.feature("slow");
        h.feature("f");
        h.executor
            .set(slow, StubBehavior::Slow(Duration::from_millis(300)));

        let pipeline = h.pipeline(
            vec![node("a", "slow"), node("b", "f")],
            vec![EdgeSpec::new("a", "b")],
        );
        let run = h
            .orchestrator
            .create_run(&pipeline, manifest(json!({"a": {"v": 1}})), RunMode::Async)
            .unwrap();

        let handle = h.orchestrator.execute_async(run.id).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(h.status(run.id, "a"), StepStatus::Running);

        h.orchestrator.cancel_run(run.id).unwrap();
        let finished = handle.await.unwrap().unwrap();

        assert_eq!(finished.status, RunStatus::Cancelled);
        assert!(finished.output_artefacts.is_empty());
        let a = h.orchestrator.step(run.id, "a").unwrap();
        assert_eq!(a.status, StepStatus::Failed);
        assert!(a.artefact_hash.is_none());
        assert_eq!(h.status(run.id, "b"), StepStatus::Skipped);

        // The late result was stored but holds no reference
        let stats = h.artefacts.stats().unwrap();
        assert_eq!(stats.count, 1);
        assert_eq!(stats.referenced, 0);
    }

    fn mark_running(h: &Harness, run_id: uuid::Uuid) -> PipelineRun {
        h.orchestrator
            .records()
            .update_run(run_id, &mut |run: &mut PipelineRun| {
                run.status = RunStatus::Running;
                true
            })
            .unwrap()
            .applied()
            .unwrap()
    }

    /// A worker moves a step to RUNNING after cancel has listed the steps
    /// as PENDING; the step must still end up closed.
    #[tokio::test]
    async fn test_cancel_closes_step_started_after_the_scan() {
        let store = Arc::new(InterleavingStore::new());
        let h = Harness::with_store(store.clone());
        h.feature("f");
        let pipeline = h.pipeline(
            vec![node("a", "f"), node("b", "f")],
            vec![EdgeSpec::new("a", "b")],
        );
        let run = h
            .orchestrator
            .create_run(&pipeline, InputManifest::new(), RunMode::Async)
            .unwrap();
        mark_running(&h, run.id);

        let run_id = run.id;
        store.after_list_steps(move |inner| {
            inner
                .update_step(run_id, "a", &mut |step: &mut StepRun| {
                    step.status = StepStatus::Running;
                    step.attempts += 1;
                    true
                })
                .unwrap();
        });

        let cancelled = h.orchestrator.cancel_run(run.id).unwrap();
        assert_eq!(cancelled.status, RunStatus::Cancelled);
        let a = h.orchestrator.step(run.id, "a").unwrap();
        assert_eq!(a.status, StepStatus::Failed);
        assert_eq!(
            a.error.as_deref(),
            Some("Run cancelled while the step was running")
        );
        assert_eq!(h.status(run.id, "b"), StepStatus::Skipped);
        assert!(h.orchestrator.run(run.id).unwrap().output_artefacts.is_empty());
    }

    /// The run is cancelled while the step is being claimed: the step is
    /// closed and the executor never runs.
    #[tokio::test]
    async fn test_step_claimed_on_a_cancelled_run_does_not_execute() {
        let h = Harness::new();
        h.feature("f");
        let pipeline = h.pipeline(vec![node("a", "f")], vec![]);
        let run = h
            .orchestrator
            .create_run(&pipeline, InputManifest::new(), RunMode::Sync)
            .unwrap();
        let snapshot = mark_running(&h, run.id);
        h.orchestrator
            .records()
            .update_run(run.id, &mut |run: &mut PipelineRun| {
                run.status = RunStatus::Cancelled;
                true
            })
            .unwrap();

        match h.orchestrator.execute_step(&snapshot, "a").await {
            Err(OrchestratorError::InvalidRunTransition { from, .. }) => {
                assert_eq!(from, RunStatus::Cancelled)
            }
            other => panic!("Expected InvalidRunTransition, got {:?}", other),
        }
        assert_eq!(h.status(run.id, "a"), StepStatus::Failed);
        assert_eq!(h.executor.total_calls(), 0);
        assert_eq!(h.artefacts.stats().unwrap().count, 0);
    }

    /// When a step's outcome cannot be written the run fails instead of
    /// staying RUNNING.
    #[tokio::test]
    async fn test_sync_run_fails_when_step_state_cannot_be_written() {
        let store = Arc::new(InterleavingStore::new());
        let h = Harness::with_store(store.clone());
        h.feature("f");
        let pipeline = h.pipeline(
            vec![node("a", "f"), node("b", "f")],
            vec![EdgeSpec::new("a", "b")],
        );
        let run = h
            .orchestrator
            .create_run(&pipeline, InputManifest::new(), RunMode::Sync)
            .unwrap();
        store.fail_running_step_updates();

        let result = h.orchestrator.execute_sync(run.id).await;
        assert!(matches!(result, Err(OrchestratorError::Store(_))));

        let failed = h.orchestrator.run(run.id).unwrap();
        assert_eq!(failed.status, RunStatus::Failed);
        assert!(failed.error_message.unwrap().contains("refused"));
        assert!(failed.finished_at.is_some());
        assert_eq!(h.status(run.id, "b"), StepStatus::Pending);
        assert_eq!(h.executor.total_calls(), 1);
    }

    #[tokio::test]
    async fn test_async_run_fails_when_step_state_cannot_be_written() {
        let store = Arc::new(InterleavingStore::new());
        let h = Harness::with_store(store.clone());
        h.feature("f");
        let pipeline = h.pipeline(
            vec![node("a", "f"), node("b", "f")],
            vec![EdgeSpec::new("a", "b")],
        );
        let run = h
            .orchestrator
            .create_run(&pipeline, InputManifest::new(), RunMode::Async)
            .unwrap();
        store.fail_running_step_updates();

        let finished = h.orchestrator.execute(run.id).await.unwrap();
        assert_eq!(finished.status, RunStatus::Failed);
        assert!(finished.error_message.unwrap().contains("refused"));
        assert_eq!(h.status(run.id, "b"), StepStatus::Pending);
        assert_eq!(h.executor.total_calls(), 1);
    }

    #[tokio::test]
    async fn test_invalid_or_inactive_pipelines_are_rejected() {
        let h = Harness::new();
        h.feature("f");

        let cyclic = h.pipeline(
            vec![node("a", "f"), node("b", "f")],
            vec![EdgeSpec::new("a", "b"), EdgeSpec::new("b", "a")],
        );
        match h
            .orchestrator
            .create_run(&cyclic, InputManifest::new(), RunMode::Sync)
        {
            Err(OrchestratorError::PipelineInvalid { errors, .. }) => {
                assert_eq!(errors, vec!["Cycle detected: a -> b -> a"])
            }
            other => panic!("Expected PipelineInvalid, got {:?}", other.map(|r| r.id)),
        }

        let mut inactive = h.pipeline(vec![node("a", "f")], vec![]);
        inactive.set_active(false);
        assert!(matches!(
            h.orchestrator
                .create_run(&inactive, InputManifest::new(), RunMode::Sync),
            Err(OrchestratorError::PipelineInactive { .. })
        ));
    }

    #[tokio::test]
    async fn test_unresolved_feature_policy() {
        // Validated against a catalog the orchestrator doesn't share
        let other = FsFeatureCatalog::in_memory();
        other
            .publish(FeatureManifest::builtin("ghost", "identity"))
            .unwrap();
        other
            .publish(FeatureManifest::builtin("f", "identity"))
            .unwrap();
        let graph = PipelineGraph::new(
            vec![node("a", "ghost"), node("b", "f"), node("c", "f")],
            vec![EdgeSpec::new("a", "b")],
        );
        let pipeline = Pipeline::new("drifted", graph, &other);
        assert!(pipeline.is_valid);

        let rejecting = Harness::with_policy(UnresolvedFeaturePolicy::Reject);
        rejecting.feature("f");
        assert!(matches!(
            rejecting
                .orchestrator
                .create_run(&pipeline, InputManifest::new(), RunMode::Sync),
            Err(OrchestratorError::UnresolvedFeature { node_id, .. }) if node_id == "a"
        ));

        let skipping = Harness::new();
        skipping.feature("f");
        let run = skipping
            .orchestrator
            .create_run(&pipeline, InputManifest::new(), RunMode::Sync)
            .unwrap();
        assert_eq!(skipping.orchestrator.steps(run.id).unwrap().len(), 2);

        let finished = skipping.orchestrator.execute_sync(run.id).await.unwrap();
        assert_eq!(finished.status, RunStatus::Success);
        assert_eq!(skipping.status(run.id, "b"), StepStatus::Skipped);
        assert_eq!(skipping.status(run.id, "c"), StepStatus::Success);
    }

    #[tokio::test]
    async fn test_input_binding_precedence() {
        let h = Harness::new();
        let source = h.feature("source");
        h.feature("f");
        h.executor
            .set(source, StubBehavior::Constant(json!("from edge")));

        let mut b = node("b", "f");
        b.config.insert("input".to_string(), json!("from config"));
        b.config.insert("other".to_string(), json!(0));
        b.config.insert("cfg".to_string(), json!(true));

        let pipeline = h.pipeline(vec![node("a", "source"), b], vec![EdgeSpec::new("a", "b")]);
        let run = h
            .orchestrator
            .create_run(
                &pipeline,
                manifest(json!({"b": {"input": "from manifest", "other": 1}})),
                RunMode::Sync,
            )
            .unwrap();
        h.orchestrator.execute_sync(run.id).await.unwrap();

        assert_eq!(
            h.output(run.id, "b"),
            json!({"input": "from edge", "other": 1, "cfg": true})
        );
    }

    #[tokio::test]
    async fn test_manifest_artefact_references_are_loaded() {
        let h = Harness::new();
        h.feature("f");
        let stored = h
            .artefacts
            .put(&json!({"rows": 3}), serde_json::Map::new())
            .unwrap();

        let pipeline = h.pipeline(vec![node("a", "f")], vec![]);
        let run = h
            .orchestrator
            .create_run(
                &pipeline,
                manifest(json!({"a": {"data": {"artefact": stored.hash}}})),
                RunMode::Sync,
            )
            .unwrap();
        h.orchestrator.execute_sync(run.id).await.unwrap();

        assert_eq!(h.output(run.id, "a"), json!({"data": {"rows": 3}}));
        let a = h.orchestrator.step(run.id, "a").unwrap();
        assert_eq!(a.inputs["data"], json!({"artefact": stored.hash}));
    }

    #[tokio::test]
    async fn test_missing_manifest_artefact_fails_step() {
        let h = Harness::new();
        h.feature("f");
        let pipeline = h.pipeline(vec![node("a", "f")], vec![]);
        let run = h
            .orchestrator
            .create_run(
                &pipeline,
                manifest(json!({"a": {"data": {"artefact": "feedface"}}})),
                RunMode::Sync,
            )
            .unwrap();

        let finished = h.orchestrator.execute_sync(run.id).await.unwrap();
        assert_eq!(finished.status, RunStatus::Failed);
        let a = h.orchestrator.step(run.id, "a").unwrap();
        assert!(a.error.unwrap().contains("feedface"));
        assert_eq!(h.executor.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_runs_snapshot_the_graph() {
        let h = Harness::new();
        h.feature("f");
        let mut pipeline = h.pipeline(vec![node("a", "f")], vec![]);
        let run = h
            .orchestrator
            .create_run(&pipeline, InputManifest::new(), RunMode::Sync)
            .unwrap();

        pipeline.add_node(node("late", "f"), h.catalog.as_ref());
        pipeline.add_edge(EdgeSpec::new("a", "late"), h.catalog.as_ref());
        assert_eq!(pipeline.version, 3);

        let finished = h.orchestrator.execute_sync(run.id).await.unwrap();
        assert_eq!(finished.pipeline_version, 1);
        assert_eq!(finished.graph.nodes.len(), 1);
        assert_eq!(h.orchestrator.steps(run.id).unwrap().len(), 1);
        assert_eq!(finished.status, RunStatus::Success);
    }

    #[tokio::test]
    async fn test_identical_outputs_share_one_artefact_until_released() {
        let h = Harness::new();
        let constant = h.feature("constant");
        h.executor
            .set(constant, StubBehavior::Constant(json!({"model": "b"})));
        let pipeline = h.pipeline(vec![node("a", "constant")], vec![]);

        let first = h
            .orchestrator
            .create_run(&pipeline, InputManifest::new(), RunMode::Sync)
            .unwrap();
        let second = h
            .orchestrator
            .create_run(&pipeline, InputManifest::new(), RunMode::Sync)
            .unwrap();

        assert!(matches!(
            h.orchestrator.release_run(first.id),
            Err(OrchestratorError::InvalidRunTransition { action: "release", .. })
        ));

        let first = h.orchestrator.execute_sync(first.id).await.unwrap();
        let second = h.orchestrator.execute_sync(second.id).await.unwrap();
        let hash = first.output_artefacts["a"].clone();
        assert_eq!(second.output_artefacts["a"], hash);
        assert_eq!(h.artefacts.blobs().hashes().unwrap(), vec![hash.clone()]);
        assert_eq!(h.artefacts.metadata(&hash).unwrap().ref_count, 2);

        assert_eq!(h.orchestrator.release_run(first.id).unwrap(), 1);
        assert_eq!(h.orchestrator.release_run(first.id).unwrap(), 0);
        assert_eq!(h.artefacts.metadata(&hash).unwrap().ref_count, 1);

        h.orchestrator.release_run(second.id).unwrap();
        assert!(h.artefacts.metadata(&hash).unwrap().is_deletable());
    }

    #[tokio::test]
    async fn test_empty_pipeline_succeeds_immediately() {
        let h = Harness::new();
        let pipeline = h.pipeline(vec![], vec![]);
        let run = h
            .orchestrator
            .create_run(&pipeline, InputManifest::new(), RunMode::Async)
            .unwrap();

        let finished = h.orchestrator.execute(run.id).await.unwrap();
        assert_eq!(finished.status, RunStatus::Success);
    }
}
