// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for run orchestration events.
//!
//! This module contains message types for logging events related to:
//! * Run creation, start, finalization and cancellation
//! * Step lifecycle (start, completion, failure, skip)
//! * Layer dispatch and job retries in asynchronous mode

use crate::model::{RunMode, RunStatus};
use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use tracing::Span;
use uuid::Uuid;

/// Run created from a pipeline snapshot.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use featurepipe::model::RunMode;
/// use featurepipe::observability::messages::engine::RunCreated;
/// use uuid::Uuid;
///
/// let msg = RunCreated {
///     run_id: Uuid::nil(),
///     pipeline: "ingest",
///     pipeline_version: 3,
///     step_count: 4,
///     mode: RunMode::Async,
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct RunCreated<'a> {
    pub run_id: Uuid,
    pub pipeline: &'a str,
    pub pipeline_version: u32,
    pub step_count: usize,
    pub mode: RunMode,
}

impl Display for RunCreated<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Created {} run {} of pipeline '{}' v{} with {} steps",
            self.mode, self.run_id, self.pipeline, self.pipeline_version, self.step_count
        )
    }
}

impl StructuredLog for RunCreated<'_> {
    fn log(&self) {
        tracing::info!(
            run_id = %self.run_id,
            pipeline = self.pipeline,
            pipeline_version = self.pipeline_version,
            step_count = self.step_count,
            mode = %self.mode,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "run",
            span_name = name,
            run_id = %self.run_id,
            pipeline = self.pipeline,
        )
    }
}

/// Run moved from PENDING to RUNNING.
///
/// # Log Level
/// `info!` - Important operational event
pub struct RunStarted {
    pub run_id: Uuid,
    pub mode: RunMode,
    pub step_count: usize,
}

impl Display for RunStarted {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Starting {} run {} with {} steps",
            self.mode, self.run_id, self.step_count
        )
    }
}

impl StructuredLog for RunStarted {
    fn log(&self) {
        tracing::info!(
            run_id = %self.run_id,
            mode = %self.mode,
            step_count = self.step_count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "run_execution",
            span_name = name,
            run_id = %self.run_id,
            mode = %self.mode,
        )
    }
}

/// One execution layer handed to the job queue.
///
/// # Log Level
/// `debug!` - Scheduling detail
pub struct LayerDispatched<'a> {
    pub run_id: Uuid,
    pub layer: usize,
    pub node_ids: &'a [String],
}

impl Display for LayerDispatched<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Dispatching layer {} of run {}: [{}]",
            self.layer,
            self.run_id,
            self.node_ids.join(", ")
        )
    }
}

impl StructuredLog for LayerDispatched<'_> {
    fn log(&self) {
        tracing::debug!(
            run_id = %self.run_id,
            layer = self.layer,
            node_count = self.node_ids.len(),
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "layer",
            span_name = name,
            run_id = %self.run_id,
            layer = self.layer,
        )
    }
}

/// Step attempt started.
///
/// # Log Level
/// `info!` - Important operational event
pub struct StepStarted<'a> {
    pub run_id: Uuid,
    pub node_id: &'a str,
    pub feature_hash: &'a str,
    pub attempt: u32,
    pub max_attempts: u32,
}

impl Display for StepStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Step '{}' started (attempt {}/{})",
            self.node_id, self.attempt, self.max_attempts
        )
    }
}

impl StructuredLog for StepStarted<'_> {
    fn log(&self) {
        tracing::info!(
            run_id = %self.run_id,
            node_id = self.node_id,
            feature_hash = self.feature_hash,
            attempt = self.attempt,
            max_attempts = self.max_attempts,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "step",
            span_name = name,
            run_id = %self.run_id,
            node_id = self.node_id,
            attempt = self.attempt,
        )
    }
}

/// Step produced an artefact.
///
/// # Log Level
/// `info!` - Important operational event
pub struct StepCompleted<'a> {
    pub run_id: Uuid,
    pub node_id: &'a str,
    pub artefact_hash: &'a str,
    pub duration: Duration,
}

impl Display for StepCompleted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Step '{}' succeeded in {:?}: artefact {}",
            self.node_id, self.duration, self.artefact_hash
        )
    }
}

impl StructuredLog for StepCompleted<'_> {
    fn log(&self) {
        tracing::info!(
            run_id = %self.run_id,
            node_id = self.node_id,
            artefact_hash = self.artefact_hash,
            duration_ms = self.duration.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "step_completed",
            span_name = name,
            run_id = %self.run_id,
            node_id = self.node_id,
        )
    }
}

/// Step attempt failed.
///
/// # Log Level
/// `warn!` while a retry remains, `error!` on the final attempt
///
/// # Example
/// ```
/// use featurepipe::observability::messages::engine::StepFailed;
/// use uuid::Uuid;
///
/// let error = std::io::Error::new(std::io::ErrorKind::Other, "exit code 1");
/// let msg = StepFailed {
///     run_id: Uuid::nil(),
///     node_id: "train",
///     attempt: 1,
///     max_attempts: 3,
///     error: &error,
/// };
///
/// assert!(msg.will_retry());
/// ```
pub struct StepFailed<'a> {
    pub run_id: Uuid,
    pub node_id: &'a str,
    pub attempt: u32,
    pub max_attempts: u32,
    pub error: &'a dyn std::error::Error,
}

impl StepFailed<'_> {
    pub fn will_retry(&self) -> bool {
        self.attempt < self.max_attempts
    }
}

impl Display for StepFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Step '{}' failed on attempt {}/{}: {}",
            self.node_id, self.attempt, self.max_attempts, self.error
        )
    }
}

impl StructuredLog for StepFailed<'_> {
    fn log(&self) {
        if self.will_retry() {
            tracing::warn!(
                run_id = %self.run_id,
                node_id = self.node_id,
                attempt = self.attempt,
                max_attempts = self.max_attempts,
                error = %self.error,
                "{}", self
            );
        } else {
            tracing::error!(
                run_id = %self.run_id,
                node_id = self.node_id,
                attempt = self.attempt,
                max_attempts = self.max_attempts,
                error = %self.error,
                "{}", self
            );
        }
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "step_failed",
            span_name = name,
            run_id = %self.run_id,
            node_id = self.node_id,
        )
    }
}

/// Step skipped because a dependency did not succeed, or the run stopped.
///
/// # Log Level
/// `info!`
pub struct StepSkipped<'a> {
    pub run_id: Uuid,
    pub node_id: &'a str,
    pub reason: &'a str,
}

impl Display for StepSkipped<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Step '{}' skipped: {}", self.node_id, self.reason)
    }
}

impl StructuredLog for StepSkipped<'_> {
    fn log(&self) {
        tracing::info!(
            run_id = %self.run_id,
            node_id = self.node_id,
            reason = self.reason,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "step_skipped",
            span_name = name,
            run_id = %self.run_id,
            node_id = self.node_id,
        )
    }
}

/// A step result arrived after the step left RUNNING (usually a
/// cancellation) and was dropped.
///
/// # Log Level
/// `warn!`
pub struct StepResultDiscarded<'a> {
    pub run_id: Uuid,
    pub node_id: &'a str,
    pub artefact_hash: &'a str,
}

impl Display for StepResultDiscarded<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Discarding late result of step '{}' (artefact {})",
            self.node_id, self.artefact_hash
        )
    }
}

impl StructuredLog for StepResultDiscarded<'_> {
    fn log(&self) {
        tracing::warn!(
            run_id = %self.run_id,
            node_id = self.node_id,
            artefact_hash = self.artefact_hash,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "step_result_discarded",
            span_name = name,
            run_id = %self.run_id,
            node_id = self.node_id,
        )
    }
}

/// A node dropped from the step set at run creation because its feature
/// reference could not be resolved.
///
/// # Log Level
/// `warn!`
pub struct UnresolvedFeatureDropped<'a> {
    pub pipeline: &'a str,
    pub node_id: &'a str,
    pub reference: &'a str,
}

impl Display for UnresolvedFeatureDropped<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Node '{}' of pipeline '{}' dropped: feature '{}' could not be resolved",
            self.node_id, self.pipeline, self.reference
        )
    }
}

impl StructuredLog for UnresolvedFeatureDropped<'_> {
    fn log(&self) {
        tracing::warn!(
            pipeline = self.pipeline,
            node_id = self.node_id,
            reference = self.reference,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "unresolved_feature",
            span_name = name,
            node_id = self.node_id,
        )
    }
}

/// Run reached a terminal status.
///
/// # Log Level
/// `info!` on success, `warn!` otherwise
pub struct RunFinalized {
    pub run_id: Uuid,
    pub status: RunStatus,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl Display for RunFinalized {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Run {} finished {}: {} succeeded, {} failed, {} skipped",
            self.run_id, self.status, self.succeeded, self.failed, self.skipped
        )
    }
}

impl StructuredLog for RunFinalized {
    fn log(&self) {
        if self.status == RunStatus::Success {
            tracing::info!(
                run_id = %self.run_id,
                status = %self.status,
                succeeded = self.succeeded,
                "{}", self
            );
        } else {
            tracing::warn!(
                run_id = %self.run_id,
                status = %self.status,
                succeeded = self.succeeded,
                failed = self.failed,
                skipped = self.skipped,
                "{}", self
            );
        }
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "run_finalized",
            span_name = name,
            run_id = %self.run_id,
            status = %self.status,
        )
    }
}

/// Run cancelled.
///
/// # Log Level
/// `warn!`
pub struct RunCancelled {
    pub run_id: Uuid,
    pub skipped: usize,
    pub interrupted: usize,
}

impl Display for RunCancelled {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Run {} cancelled: {} pending steps skipped, {} running steps marked failed",
            self.run_id, self.skipped, self.interrupted
        )
    }
}

impl StructuredLog for RunCancelled {
    fn log(&self) {
        tracing::warn!(
            run_id = %self.run_id,
            skipped = self.skipped,
            interrupted = self.interrupted,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!("run_cancelled", span_name = name, run_id = %self.run_id)
    }
}

/// Run could not be ordered for execution.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct SchedulingFailed<'a> {
    pub run_id: Uuid,
    pub error: &'a dyn std::error::Error,
}

impl Display for SchedulingFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Run {} could not be scheduled: {}", self.run_id, self.error)
    }
}

impl StructuredLog for SchedulingFailed<'_> {
    fn log(&self) {
        tracing::error!(run_id = %self.run_id, error = %self.error, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!("scheduling_failed", span_name = name, run_id = %self.run_id)
    }
}

/// A job attempt failed and will be retried after a delay.
///
/// # Log Level
/// `warn!`
pub struct JobRetryScheduled<'a> {
    pub run_id: Uuid,
    pub node_id: &'a str,
    pub next_attempt: u32,
    pub delay: Duration,
    pub error: &'a str,
}

impl Display for JobRetryScheduled<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Retrying step '{}' (attempt {}) in {:?}: {}",
            self.node_id, self.next_attempt, self.delay, self.error
        )
    }
}

impl StructuredLog for JobRetryScheduled<'_> {
    fn log(&self) {
        tracing::warn!(
            run_id = %self.run_id,
            node_id = self.node_id,
            next_attempt = self.next_attempt,
            delay_ms = self.delay.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "job_retry",
            span_name = name,
            run_id = %self.run_id,
            node_id = self.node_id,
        )
    }
}

/// A job task panicked or was aborted.
///
/// # Log Level
/// `error!`
pub struct JobAborted<'a> {
    pub run_id: Uuid,
    pub node_id: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for JobAborted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Job for step '{}' aborted: {}", self.node_id, self.error)
    }
}

impl StructuredLog for JobAborted<'_> {
    fn log(&self) {
        tracing::error!(
            run_id = %self.run_id,
            node_id = self.node_id,
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!("job_aborted", span_name = name, node_id = self.node_id)
    }
}

/// References held by a finished run's outputs were released.
///
/// # Log Level
/// `info!`
pub struct RunReferencesReleased {
    pub run_id: Uuid,
    pub released: usize,
}

impl Display for RunReferencesReleased {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Released {} artefact references held by run {}",
            self.released, self.run_id
        )
    }
}

impl StructuredLog for RunReferencesReleased {
    fn log(&self) {
        tracing::info!(run_id = %self.run_id, released = self.released, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("run_release", span_name = name, run_id = %self.run_id)
    }
}
