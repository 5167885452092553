// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Run orchestration.
//!
//! A [`RunOrchestrator`] turns a validated pipeline into a run, drives the
//! run's steps through the step executor and records every transition in the
//! record store. All state changes are compare-and-swap updates on a single
//! step or run record:
//!
//! ```text
//! step:  PENDING -> RUNNING -> SUCCESS
//!                          \-> PENDING (attempt failed, attempts left)
//!                          \-> FAILED  (attempt failed, none left)
//!        PENDING -> SKIPPED (dependency did not succeed, or run cancelled)
//!
//! run:   PENDING -> RUNNING -> SUCCESS | FAILED   (once, when no step is open)
//!        PENDING | RUNNING -> CANCELLED
//! ```
//!
//! Synchronous runs walk the topological order in the calling task with one
//! attempt per step. Asynchronous runs hand each execution layer to the job
//! queue and wait for the layer to settle before dispatching the next.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::config::consts::DEFAULT_RETRY_ATTEMPTS;
use crate::config::{Config, UnresolvedFeaturePolicy};
use crate::errors::{ArtefactError, DependencyUnsatisfied, OrchestratorError};
use crate::model::{
    InputManifest, ManifestValue, Pipeline, PipelineRun, RunMode, RunStatus, StepRun, StepStatus,
};
use crate::observability::messages::engine::{
    JobAborted, LayerDispatched, RunCancelled, RunCreated, RunFinalized, RunReferencesReleased,
    RunStarted, SchedulingFailed, StepCompleted, StepFailed, StepResultDiscarded, StepSkipped,
    StepStarted, UnresolvedFeatureDropped,
};
use crate::observability::messages::StructuredLog;
use crate::pipeline::{dependencies, execution_layers, topological_sort};
use crate::sandbox::CapturedOutput;
use crate::storage::{ArtefactStore, RecordStore, UpdateOutcome};
use crate::traits::{
    FeatureCatalog, JobError, JobHandler, JobOutcome, JobQueue, StepExecutor, StepJob,
};

const CANCELLED_BEFORE_START: &str = "Run cancelled before the step started";
const CANCELLED_WHILE_RUNNING: &str = "Run cancelled while the step was running";

#[derive(Debug, Clone, Copy)]
pub struct OrchestratorOptions {
    /// Attempt ceiling for steps of asynchronous runs
    pub max_attempts: u32,
    pub unresolved_policy: UnresolvedFeaturePolicy,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_RETRY_ATTEMPTS,
            unresolved_policy: UnresolvedFeaturePolicy::default(),
        }
    }
}

impl OrchestratorOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_attempts: config.executor_options.get_retry_attempts().max(1),
            unresolved_policy: config.features.unresolved_policy,
        }
    }
}

pub struct RunOrchestrator {
    records: Arc<dyn RecordStore>,
    artefacts: Arc<ArtefactStore>,
    catalog: Arc<dyn FeatureCatalog>,
    executor: Arc<dyn StepExecutor>,
    queue: Arc<dyn JobQueue>,
    options: OrchestratorOptions,
}

impl RunOrchestrator {
    pub fn new(
        records: Arc<dyn RecordStore>,
        artefacts: Arc<ArtefactStore>,
        catalog: Arc<dyn FeatureCatalog>,
        executor: Arc<dyn StepExecutor>,
        queue: Arc<dyn JobQueue>,
        options: OrchestratorOptions,
    ) -> Self {
        Self {
            records,
            artefacts,
            catalog,
            executor,
            queue,
            options,
        }
    }

    pub fn records(&self) -> &Arc<dyn RecordStore> {
        &self.records
    }

    pub fn artefacts(&self) -> &Arc<ArtefactStore> {
        &self.artefacts
    }

    /// Create a PENDING run from a snapshot of the pipeline's graph, with
    /// one PENDING step per node whose feature resolves.
    pub fn create_run(
        &self,
        pipeline: &Pipeline,
        manifest: InputManifest,
        mode: RunMode,
    ) -> Result<PipelineRun, OrchestratorError> {
        if !pipeline.is_valid {
            return Err(OrchestratorError::PipelineInvalid {
                name: pipeline.name.clone(),
                errors: pipeline.validation_errors.clone(),
            });
        }
        if !pipeline.is_active {
            return Err(OrchestratorError::PipelineInactive {
                name: pipeline.name.clone(),
            });
        }

        let run = PipelineRun::new(pipeline, manifest, mode);
        let max_attempts = match mode {
            RunMode::Sync => 1,
            RunMode::Async => self.options.max_attempts,
        };

        let mut steps = Vec::with_capacity(run.graph.nodes.len());
        for node in &run.graph.nodes {
            let reference = node.feature_reference().unwrap_or_default();
            match self.catalog.resolve(node) {
                Some(record) => steps.push(StepRun::new(
                    run.id,
                    node.id.clone(),
                    record.name(),
                    record.hash.clone(),
                    max_attempts,
                )),
                None => match self.options.unresolved_policy {
                    UnresolvedFeaturePolicy::Reject => {
                        return Err(OrchestratorError::UnresolvedFeature {
                            node_id: node.id.clone(),
                            reference: reference.to_string(),
                        })
                    }
                    UnresolvedFeaturePolicy::Skip => UnresolvedFeatureDropped {
                        pipeline: &pipeline.name,
                        node_id: &node.id,
                        reference,
                    }
                    .log(),
                },
            }
        }

        self.records.insert_run(&run)?;
        for step in &steps {
            self.records.insert_step(step)?;
        }

        RunCreated {
            run_id: run.id,
            pipeline: &run.pipeline_name,
            pipeline_version: run.pipeline_version,
            step_count: steps.len(),
            mode,
        }
        .log();
        Ok(run)
    }

    /// Run in the mode the run was created with and wait for it to finish.
    pub async fn execute(self: &Arc<Self>, run_id: Uuid) -> Result<PipelineRun, OrchestratorError> {
        match self.run(run_id)?.mode {
            RunMode::Sync => self.execute_sync(run_id).await,
            RunMode::Async => match self.execute_async(run_id)?.await {
                Ok(result) => result,
                Err(join_error) => {
                    JobAborted {
                        run_id,
                        node_id: "",
                        error: &join_error,
                    }
                    .log();
                    self.fail_run(run_id, &join_error.to_string())?;
                    self.run(run_id)
                }
            },
        }
    }

    /// Execute every step in topological order in the calling task.
    ///
    /// A failing step is recorded and execution moves on; steps whose
    /// dependencies did not succeed are skipped. Returns the finished run.
    pub async fn execute_sync(&self, run_id: Uuid) -> Result<PipelineRun, OrchestratorError> {
        let run = self.start_run(run_id)?;

        let order = match topological_sort(&run.graph) {
            Ok(order) => order,
            Err(e) => {
                SchedulingFailed { run_id, error: &e }.log();
                self.fail_run(run_id, &e.to_string())?;
                return Err(e.into());
            }
        };

        for node_id in &order {
            if self.is_stopped(run_id)? {
                break;
            }
            match self.records.load_step(run_id, node_id)? {
                Some(step) if step.status == StepStatus::Pending => {}
                _ => continue,
            }
            if let Err(unsatisfied) = self.check_dependencies(&run, node_id)? {
                self.skip_step(run_id, node_id, &unsatisfied.to_string())?;
                continue;
            }
            match self.execute_step(&run, node_id).await {
                Ok(_) => {}
                // The step's state could not be written; it would stay open
                Err(error @ OrchestratorError::Store(_)) => {
                    self.abandon_run(run_id, &error);
                    return Err(error);
                }
                // Failures are recorded on the step; the run carries on
                Err(_) => {}
            }
        }

        self.finalize_if_complete(run_id)?;
        self.run(run_id)
    }

    /// Start the run and dispatch it layer by layer onto the job queue.
    ///
    /// Returns once the run is RUNNING; the handle resolves to the finished
    /// run.
    pub fn execute_async(
        self: &Arc<Self>,
        run_id: Uuid,
    ) -> Result<JoinHandle<Result<PipelineRun, OrchestratorError>>, OrchestratorError> {
        let run = self.start_run(run_id)?;

        let layers = match execution_layers(&run.graph) {
            Ok(layers) => layers,
            Err(e) => {
                SchedulingFailed { run_id, error: &e }.log();
                self.fail_run(run_id, &e.to_string())?;
                return Err(e.into());
            }
        };

        let this = Arc::clone(self);
        Ok(tokio::spawn(async move {
            this.dispatch_layers(run_id, layers).await
        }))
    }

    async fn dispatch_layers(
        self: Arc<Self>,
        run_id: Uuid,
        layers: Vec<Vec<String>>,
    ) -> Result<PipelineRun, OrchestratorError> {
        let handler: Arc<dyn JobHandler> = self.clone();

        for (layer, node_ids) in layers.iter().enumerate() {
            if self.is_stopped(run_id)? {
                break;
            }
            LayerDispatched {
                run_id,
                layer,
                node_ids,
            }
            .log();

            let handles: Vec<_> = node_ids
                .iter()
                .map(|node_id| {
                    let job = StepJob {
                        run_id,
                        node_id: node_id.clone(),
                        layer,
                    };
                    self.queue.submit(job, Arc::clone(&handler))
                })
                .collect();

            for (node_id, handle) in node_ids.iter().zip(handles) {
                if let Err(join_error) = handle.await {
                    JobAborted {
                        run_id,
                        node_id,
                        error: &join_error,
                    }
                    .log();
                    self.abort_step(run_id, node_id, &join_error.to_string())?;
                }
            }
        }

        self.finalize_if_complete(run_id)?;
        self.run(run_id)
    }

    /// One attempt at a step: PENDING -> RUNNING, resolve inputs, execute,
    /// store the result and take a reference on it.
    ///
    /// On failure the step returns to PENDING while attempts remain, else it
    /// becomes FAILED; either way the error is returned to the caller.
    pub async fn execute_step(
        &self,
        run: &PipelineRun,
        node_id: &str,
    ) -> Result<String, OrchestratorError> {
        let now = Utc::now();
        let started = self
            .records
            .update_step(run.id, node_id, &mut |step: &mut StepRun| {
                if step.status != StepStatus::Pending || step.attempts >= step.max_attempts {
                    return false;
                }
                step.status = StepStatus::Running;
                step.attempts += 1;
                step.started_at = Some(now);
                step.finished_at = None;
                step.error = None;
                true
            })?;
        let step = match started {
            UpdateOutcome::Applied(step) => step,
            UpdateOutcome::Rejected(step) if step.status == StepStatus::Pending => {
                return Err(OrchestratorError::AttemptsExhausted {
                    node_id: node_id.to_string(),
                    attempts: step.attempts,
                })
            }
            UpdateOutcome::Rejected(step) => {
                return Err(OrchestratorError::InvalidStepTransition {
                    node_id: node_id.to_string(),
                    from: step.status,
                })
            }
            UpdateOutcome::Missing => {
                return Err(OrchestratorError::StepNotFound {
                    run_id: run.id,
                    node_id: node_id.to_string(),
                })
            }
        };

        // A cancel that lands after the start swap must still stop the step
        let current = self.run(run.id)?;
        if current.status != RunStatus::Running {
            self.abort_step(run.id, node_id, CANCELLED_WHILE_RUNNING)?;
            return Err(OrchestratorError::InvalidRunTransition {
                run_id: run.id,
                from: current.status,
                action: "continue",
            });
        }

        StepStarted {
            run_id: run.id,
            node_id,
            feature_hash: &step.feature_hash,
            attempt: step.attempts,
            max_attempts: step.max_attempts,
        }
        .log();

        let mut echo = Map::new();
        match self.attempt(run, &step, &mut echo).await {
            Ok((hash, captured)) => self.complete_step(run.id, &step, hash, captured, echo),
            Err(error) => {
                self.record_failure(run.id, &step, &error, echo)?;
                Err(error)
            }
        }
    }

    async fn attempt(
        &self,
        run: &PipelineRun,
        step: &StepRun,
        echo: &mut Map<String, Value>,
    ) -> Result<(String, CapturedOutput), OrchestratorError> {
        let (inputs, resolved_echo) = self.resolve_inputs(run, &step.node_id)?;
        *echo = resolved_echo;

        let output = self.executor.execute(&step.feature_hash, &inputs).await?;
        let value: Value =
            serde_json::from_slice(&output.result).map_err(OrchestratorError::ResultDecode)?;

        let mut attributes = Map::new();
        attributes.insert("feature_hash".to_string(), json!(step.feature_hash));
        attributes.insert("feature_name".to_string(), json!(step.feature_name));
        attributes.insert("run_id".to_string(), json!(run.id.to_string()));
        attributes.insert("node_id".to_string(), json!(step.node_id));
        attributes.insert(
            "input_names".to_string(),
            json!(inputs.keys().collect::<Vec<_>>()),
        );

        let receipt = self.artefacts.put(&value, attributes)?;
        if self.artefacts.increment_ref(&receipt.hash)?.is_none() {
            // Swept between the write and the reference
            return Err(ArtefactError::NotFound { hash: receipt.hash }.into());
        }
        Ok((receipt.hash, output.captured))
    }

    fn complete_step(
        &self,
        run_id: Uuid,
        step: &StepRun,
        hash: String,
        captured: CapturedOutput,
        echo: Map<String, Value>,
    ) -> Result<String, OrchestratorError> {
        let now = Utc::now();
        let outcome = self
            .records
            .update_step(run_id, &step.node_id, &mut |s: &mut StepRun| {
                if s.status != StepStatus::Running {
                    return false;
                }
                s.status = StepStatus::Success;
                s.artefact_hash = Some(hash.clone());
                s.inputs = echo.clone();
                s.stdout = captured.stdout.clone();
                s.stderr = captured.stderr.clone();
                s.exit_code = captured.exit_code;
                s.error = None;
                s.finished_at = Some(now);
                true
            })?;

        match outcome {
            UpdateOutcome::Applied(done) => {
                self.records.record_output(run_id, &step.node_id, &hash)?;
                StepCompleted {
                    run_id,
                    node_id: &step.node_id,
                    artefact_hash: &hash,
                    duration: done
                        .duration()
                        .and_then(|d| d.to_std().ok())
                        .unwrap_or(Duration::ZERO),
                }
                .log();
                Ok(hash)
            }
            UpdateOutcome::Rejected(current) => {
                // Cancelled while running; the result is not kept
                self.artefacts.decrement_ref(&hash)?;
                StepResultDiscarded {
                    run_id,
                    node_id: &step.node_id,
                    artefact_hash: &hash,
                }
                .log();
                Err(OrchestratorError::InvalidStepTransition {
                    node_id: step.node_id.clone(),
                    from: current.status,
                })
            }
            UpdateOutcome::Missing => Err(OrchestratorError::StepNotFound {
                run_id,
                node_id: step.node_id.clone(),
            }),
        }
    }

    fn record_failure(
        &self,
        run_id: Uuid,
        step: &StepRun,
        error: &OrchestratorError,
        echo: Map<String, Value>,
    ) -> Result<(), OrchestratorError> {
        let now = Utc::now();
        let message = error.to_string();
        let captured = error.captured().cloned();
        let next = if step.attempts < step.max_attempts {
            StepStatus::Pending
        } else {
            StepStatus::Failed
        };

        self.records
            .update_step(run_id, &step.node_id, &mut |s: &mut StepRun| {
                if s.status != StepStatus::Running {
                    return false;
                }
                s.status = next;
                s.error = Some(message.clone());
                s.inputs = echo.clone();
                if let Some(captured) = &captured {
                    s.stdout = captured.stdout.clone();
                    s.stderr = captured.stderr.clone();
                    s.exit_code = captured.exit_code;
                }
                s.finished_at = Some(now);
                true
            })?;

        StepFailed {
            run_id,
            node_id: &step.node_id,
            attempt: step.attempts,
            max_attempts: step.max_attempts,
            error,
        }
        .log();
        Ok(())
    }

    /// Build a step's inputs.
    ///
    /// Bindings are layered: the node's `config`, then the run manifest
    /// (artefact references are loaded from the store), then one binding
    /// per incoming edge on the edge's input port. Later layers win.
    ///
    /// Returns the inputs and an echo of them in which every value that came
    /// from the artefact store is shown as `{"artefact": hash}`.
    pub fn resolve_inputs(
        &self,
        run: &PipelineRun,
        node_id: &str,
    ) -> Result<(Map<String, Value>, Map<String, Value>), OrchestratorError> {
        let node = run
            .graph
            .node(node_id)
            .ok_or_else(|| OrchestratorError::StepNotFound {
                run_id: run.id,
                node_id: node_id.to_string(),
            })?;

        let mut inputs = node.config.clone();
        let mut echo = node.config.clone();

        if let Some(bindings) = run.input_manifest.get(node_id) {
            for (param, binding) in bindings {
                match binding {
                    ManifestValue::Literal(value) => {
                        inputs.insert(param.clone(), value.clone());
                        echo.insert(param.clone(), value.clone());
                    }
                    ManifestValue::Artefact(reference) => {
                        let value = self.artefacts.get(&reference.artefact)?;
                        inputs.insert(param.clone(), value);
                        echo.insert(param.clone(), json!({"artefact": reference.artefact}));
                    }
                }
            }
        }

        let mut incoming = run.graph.incoming(node_id).peekable();
        if incoming.peek().is_some() {
            let outputs = self.records.run_outputs(run.id)?;
            for edge in incoming {
                let hash = outputs.get(&edge.from).ok_or_else(|| {
                    OrchestratorError::UpstreamArtefactMissing {
                        node_id: node_id.to_string(),
                        source_node: edge.from.clone(),
                    }
                })?;
                let value = self.artefacts.get(hash)?;
                inputs.insert(edge.in_port().to_string(), value);
                echo.insert(edge.in_port().to_string(), json!({"artefact": hash}));
            }
        }

        Ok((inputs, echo))
    }

    /// `Ok(Err(..))` names the first direct dependency that did not reach
    /// SUCCESS.
    pub fn check_dependencies(
        &self,
        run: &PipelineRun,
        node_id: &str,
    ) -> Result<Result<(), DependencyUnsatisfied>, OrchestratorError> {
        for dependency in dependencies(&run.graph, node_id) {
            let status = self
                .records
                .load_step(run.id, &dependency)?
                .map(|step| step.status);
            if status != Some(StepStatus::Success) {
                return Ok(Err(DependencyUnsatisfied {
                    node_id: node_id.to_string(),
                    dependency,
                    status,
                }));
            }
        }
        Ok(Ok(()))
    }

    /// Settle the run once no step is PENDING or RUNNING. Only the caller
    /// whose compare-and-swap moves the run out of RUNNING reports a status.
    pub fn finalize_if_complete(
        &self,
        run_id: Uuid,
    ) -> Result<Option<RunStatus>, OrchestratorError> {
        let steps = self.records.list_steps(run_id)?;
        if steps.iter().any(|step| !step.status.is_terminal()) {
            return Ok(None);
        }

        let count = |status: StepStatus| steps.iter().filter(|s| s.status == status).count();
        let succeeded = count(StepStatus::Success);
        let failed = count(StepStatus::Failed);
        let skipped = count(StepStatus::Skipped);
        let status = if failed > 0 {
            RunStatus::Failed
        } else {
            RunStatus::Success
        };

        let now = Utc::now();
        let outcome = self.records.update_run(run_id, &mut |run: &mut PipelineRun| {
            if run.status != RunStatus::Running {
                return false;
            }
            run.status = status;
            run.finished_at = Some(now);
            if failed > 0 {
                run.error_message = Some(format!(
                    "{} step(s) failed, {} succeeded",
                    failed, succeeded
                ));
            }
            true
        })?;

        if !outcome.is_applied() {
            return Ok(None);
        }
        RunFinalized {
            run_id,
            status,
            succeeded,
            failed,
            skipped,
        }
        .log();
        Ok(Some(status))
    }

    /// Cancel a PENDING or RUNNING run. Pending steps become SKIPPED and
    /// running steps FAILED; an in-flight child is not interrupted and its
    /// result is discarded when it arrives.
    pub fn cancel_run(&self, run_id: Uuid) -> Result<PipelineRun, OrchestratorError> {
        let now = Utc::now();
        let outcome = self.records.update_run(run_id, &mut |run: &mut PipelineRun| {
            if !matches!(run.status, RunStatus::Pending | RunStatus::Running) {
                return false;
            }
            run.status = RunStatus::Cancelled;
            run.finished_at = Some(now);
            true
        })?;
        match outcome {
            UpdateOutcome::Applied(_) => {}
            UpdateOutcome::Rejected(run) => {
                return Err(OrchestratorError::InvalidRunTransition {
                    run_id,
                    from: run.status,
                    action: "cancel",
                })
            }
            UpdateOutcome::Missing => return Err(OrchestratorError::RunNotFound(run_id)),
        }

        let mut skipped = 0;
        let mut interrupted = 0;
        for step in self.records.list_steps(run_id)? {
            match step.status {
                StepStatus::Pending => {
                    if self.skip_step(run_id, &step.node_id, CANCELLED_BEFORE_START)? {
                        skipped += 1;
                    } else if self.abort_step(run_id, &step.node_id, CANCELLED_WHILE_RUNNING)? {
                        // Started after the scan
                        interrupted += 1;
                    }
                }
                StepStatus::Running => {
                    if self.abort_step(run_id, &step.node_id, CANCELLED_WHILE_RUNNING)? {
                        interrupted += 1;
                    }
                }
                _ => {}
            }
        }

        RunCancelled {
            run_id,
            skipped,
            interrupted,
        }
        .log();
        self.run(run_id)
    }

    /// Release the reference each output of a finished run holds, so the
    /// retention sweep can reclaim them. Happens at most once per run.
    pub fn release_run(&self, run_id: Uuid) -> Result<usize, OrchestratorError> {
        let run = self.run(run_id)?;
        if !run.status.is_terminal() {
            return Err(OrchestratorError::InvalidRunTransition {
                run_id,
                from: run.status,
                action: "release",
            });
        }

        let claimed = self.records.update_run(run_id, &mut |run: &mut PipelineRun| {
            if run.references_released {
                return false;
            }
            run.references_released = true;
            true
        })?;
        if !claimed.is_applied() {
            return Ok(0);
        }

        let mut released = 0;
        for hash in run.output_artefacts.values() {
            if self.artefacts.decrement_ref(hash)?.is_some() {
                released += 1;
            }
        }
        RunReferencesReleased { run_id, released }.log();
        Ok(released)
    }

    pub fn run(&self, run_id: Uuid) -> Result<PipelineRun, OrchestratorError> {
        self.records
            .load_run(run_id)?
            .ok_or(OrchestratorError::RunNotFound(run_id))
    }

    pub fn steps(&self, run_id: Uuid) -> Result<Vec<StepRun>, OrchestratorError> {
        Ok(self.records.list_steps(run_id)?)
    }

    pub fn step(&self, run_id: Uuid, node_id: &str) -> Result<StepRun, OrchestratorError> {
        self.records
            .load_step(run_id, node_id)?
            .ok_or_else(|| OrchestratorError::StepNotFound {
                run_id,
                node_id: node_id.to_string(),
            })
    }

    fn start_run(&self, run_id: Uuid) -> Result<PipelineRun, OrchestratorError> {
        let now = Utc::now();
        let outcome = self.records.update_run(run_id, &mut |run: &mut PipelineRun| {
            if run.status != RunStatus::Pending {
                return false;
            }
            run.status = RunStatus::Running;
            run.started_at = Some(now);
            true
        })?;
        let run = match outcome {
            UpdateOutcome::Applied(run) => run,
            UpdateOutcome::Rejected(run) => {
                return Err(OrchestratorError::InvalidRunTransition {
                    run_id,
                    from: run.status,
                    action: "start",
                })
            }
            UpdateOutcome::Missing => return Err(OrchestratorError::RunNotFound(run_id)),
        };

        RunStarted {
            run_id,
            mode: run.mode,
            step_count: self.records.list_steps(run_id)?.len(),
        }
        .log();
        Ok(run)
    }

    fn fail_run(&self, run_id: Uuid, message: &str) -> Result<(), OrchestratorError> {
        let now = Utc::now();
        self.records.update_run(run_id, &mut |run: &mut PipelineRun| {
            if run.status != RunStatus::Running {
                return false;
            }
            run.status = RunStatus::Failed;
            run.error_message = Some(message.to_string());
            run.finished_at = Some(now);
            true
        })?;
        Ok(())
    }

    /// Best effort: mark the run FAILED after a storage error. A second
    /// storage error is only logged.
    fn abandon_run(&self, run_id: Uuid, error: &OrchestratorError) {
        if let Err(e) = self.fail_run(run_id, &error.to_string()) {
            JobAborted {
                run_id,
                node_id: "",
                error: &e,
            }
            .log();
        }
    }

    fn is_stopped(&self, run_id: Uuid) -> Result<bool, OrchestratorError> {
        Ok(self.run(run_id)?.status != RunStatus::Running)
    }

    fn skip_step(&self, run_id: Uuid, node_id: &str, reason: &str) -> Result<bool, OrchestratorError> {
        let now = Utc::now();
        let outcome = self.records.update_step(run_id, node_id, &mut |step: &mut StepRun| {
            if step.status != StepStatus::Pending {
                return false;
            }
            step.status = StepStatus::Skipped;
            step.error = Some(reason.to_string());
            step.finished_at = Some(now);
            true
        })?;
        let applied = outcome.is_applied();
        if applied {
            StepSkipped {
                run_id,
                node_id,
                reason,
            }
            .log();
        }
        Ok(applied)
    }

    /// Force an open step to FAILED
    fn abort_step(&self, run_id: Uuid, node_id: &str, reason: &str) -> Result<bool, OrchestratorError> {
        let now = Utc::now();
        let outcome = self.records.update_step(run_id, node_id, &mut |step: &mut StepRun| {
            if step.status.is_terminal() {
                return false;
            }
            step.status = StepStatus::Failed;
            step.error = Some(reason.to_string());
            step.finished_at = Some(now);
            true
        })?;
        Ok(outcome.is_applied())
    }

    async fn handle_job(&self, job: &StepJob) -> Result<JobOutcome, JobError> {
        let run = match self.records.load_run(job.run_id) {
            Ok(Some(run)) if run.status == RunStatus::Running => run,
            Ok(_) => return Ok(JobOutcome::Discarded),
            Err(e) => return Err(JobError::fatal(e.to_string())),
        };
        match self.records.load_step(job.run_id, &job.node_id) {
            Ok(Some(step)) if step.status == StepStatus::Pending => {}
            Ok(_) => return Ok(JobOutcome::Discarded),
            Err(e) => return Err(JobError::fatal(e.to_string())),
        }

        match self.check_dependencies(&run, &job.node_id) {
            Ok(Ok(())) => {}
            Ok(Err(unsatisfied)) => {
                let reason = unsatisfied.to_string();
                return match self.skip_step(job.run_id, &job.node_id, &reason) {
                    Ok(_) => Ok(JobOutcome::Skipped { reason }),
                    Err(e) => Err(JobError::fatal(e.to_string())),
                };
            }
            Err(e) => return Err(JobError::fatal(e.to_string())),
        }

        match self.execute_step(&run, &job.node_id).await {
            Ok(artefact_hash) => Ok(JobOutcome::Succeeded { artefact_hash }),
            Err(e @ OrchestratorError::Store(_)) => {
                self.abandon_run(job.run_id, &e);
                Err(JobError::fatal(e.to_string()))
            }
            Err(e) => {
                let retryable = matches!(
                    self.records.load_step(job.run_id, &job.node_id),
                    Ok(Some(step)) if step.status == StepStatus::Pending
                );
                Err(JobError {
                    message: e.to_string(),
                    retryable,
                })
            }
        }
    }

    fn finalize_after_job(&self, job: &StepJob) {
        if let Err(e) = self.finalize_if_complete(job.run_id) {
            JobAborted {
                run_id: job.run_id,
                node_id: &job.node_id,
                error: &e,
            }
            .log();
        }
    }
}

#[async_trait]
impl JobHandler for RunOrchestrator {
    async fn handle(&self, job: &StepJob) -> Result<JobOutcome, JobError> {
        let result = self.handle_job(job).await;
        self.finalize_after_job(job);
        result
    }

    async fn on_exhausted(&self, job: &StepJob, error: &JobError) {
        let now = Utc::now();
        let result = self
            .records
            .update_step(job.run_id, &job.node_id, &mut |step: &mut StepRun| {
                if step.status != StepStatus::Pending {
                    return false;
                }
                step.status = StepStatus::Failed;
                step.error = Some(error.message.clone());
                step.finished_at = Some(now);
                true
            });
        if let Err(e) = result {
            JobAborted {
                run_id: job.run_id,
                node_id: &job.node_id,
                error: &e,
            }
            .log();
        }
        self.finalize_after_job(job);
    }
}
