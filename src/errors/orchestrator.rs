// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;
use uuid::Uuid;

use super::{ArtefactError, SandboxError, SchedulingError, StoreError};
use crate::model::{RunStatus, StepStatus};
use crate::sandbox::CapturedOutput;

/// A step's direct dependency did not reach SUCCESS. The step is marked
/// SKIPPED rather than FAILED.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Dependency '{dependency}' of '{node_id}' did not succeed ({})", describe_status(.status))]
pub struct DependencyUnsatisfied {
    pub node_id: String,
    pub dependency: String,
    pub status: Option<StepStatus>,
}

fn describe_status(status: &Option<StepStatus>) -> String {
    match status {
        Some(status) => status.to_string(),
        None => "not scheduled".to_string(),
    }
}

fn join_errors(errors: &[String]) -> String {
    errors.join("; ")
}

/// Errors raised while creating or driving a pipeline run
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("Pipeline '{name}' is not valid: {}", join_errors(.errors))]
    PipelineInvalid { name: String, errors: Vec<String> },

    #[error("Pipeline '{name}' is not active")]
    PipelineInactive { name: String },

    #[error("Node '{node_id}' references unresolvable feature '{reference}'")]
    UnresolvedFeature { node_id: String, reference: String },

    #[error("Run not found: {0}")]
    RunNotFound(Uuid),

    #[error("Step '{node_id}' not found in run {run_id}")]
    StepNotFound { run_id: Uuid, node_id: String },

    #[error("Cannot {action} run {run_id} from status {from}")]
    InvalidRunTransition {
        run_id: Uuid,
        from: RunStatus,
        action: &'static str,
    },

    #[error("Step '{node_id}' cannot start from status {from}")]
    InvalidStepTransition { node_id: String, from: StepStatus },

    #[error("Step '{node_id}' has used all {attempts} attempts")]
    AttemptsExhausted { node_id: String, attempts: u32 },

    #[error("Upstream artefact from '{source_node}' is missing for '{node_id}'")]
    UpstreamArtefactMissing { node_id: String, source_node: String },

    #[error("Feature result could not be decoded: {0}")]
    ResultDecode(#[source] serde_json::Error),

    #[error(transparent)]
    Scheduling(#[from] SchedulingError),

    #[error(transparent)]
    Sandbox(#[from] SandboxError),

    #[error(transparent)]
    Artefact(#[from] ArtefactError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl OrchestratorError {
    pub fn captured(&self) -> Option<&CapturedOutput> {
        match self {
            OrchestratorError::Sandbox(error) => error.captured(),
            _ => None,
        }
    }
}
