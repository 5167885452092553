// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

use crate::model::Pipeline;
use crate::pipeline::PipelineGraph;

/// Execution mode for a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Strictly sequential, one attempt per step
    #[default]
    Sync,
    /// Layered dispatch onto the job queue, with retries
    Async,
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunMode::Sync => write!(f, "sync"),
            RunMode::Async => write!(f, "async"),
        }
    }
}

impl std::str::FromStr for RunMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sync" => Ok(RunMode::Sync),
            "async" => Ok(RunMode::Async),
            other => Err(format!("Unknown run mode '{}' (expected sync or async)", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Pending,
    Running,
    Success,
    Failed,
    Cancelled,
}

impl RunStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunStatus::Success | RunStatus::Failed | RunStatus::Cancelled
        )
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RunStatus::Pending => "PENDING",
            RunStatus::Running => "RUNNING",
            RunStatus::Success => "SUCCESS",
            RunStatus::Failed => "FAILED",
            RunStatus::Cancelled => "CANCELLED",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepStatus {
    Pending,
    Running,
    Success,
    Failed,
    Skipped,
}

impl StepStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            StepStatus::Success | StepStatus::Failed | StepStatus::Skipped
        )
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StepStatus::Pending => "PENDING",
            StepStatus::Running => "RUNNING",
            StepStatus::Success => "SUCCESS",
            StepStatus::Failed => "FAILED",
            StepStatus::Skipped => "SKIPPED",
        };
        f.write_str(label)
    }
}

/// `{"artefact": "<hash>"}` inside an input manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArtefactRef {
    pub artefact: String,
}

/// A manifest binding is either a reference to a stored artefact or a literal
/// JSON value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ManifestValue {
    Artefact(ArtefactRef),
    Literal(Value),
}

impl ManifestValue {
    pub fn artefact(hash: impl Into<String>) -> Self {
        ManifestValue::Artefact(ArtefactRef {
            artefact: hash.into(),
        })
    }
}

/// `node_id -> {param: literal | {"artefact": hash}}`
pub type InputManifest = BTreeMap<String, BTreeMap<String, ManifestValue>>;

/// One instantiation of a pipeline against an input manifest.
///
/// The graph is a snapshot taken at creation time. `output_artefacts` is not
/// part of the stored run document: outputs are written as separate keyed
/// records and merged in when the run is read back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRun {
    pub id: Uuid,
    pub pipeline_id: Uuid,
    pub pipeline_name: String,
    pub pipeline_version: u32,
    pub graph: PipelineGraph,
    pub mode: RunMode,
    pub status: RunStatus,
    #[serde(default)]
    pub input_manifest: InputManifest,
    #[serde(skip)]
    pub output_artefacts: BTreeMap<String, String>,
    pub error_message: Option<String>,
    #[serde(default)]
    pub references_released: bool,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl PipelineRun {
    pub fn new(pipeline: &Pipeline, input_manifest: InputManifest, mode: RunMode) -> Self {
        Self {
            id: Uuid::new_v4(),
            pipeline_id: pipeline.id,
            pipeline_name: pipeline.name.clone(),
            pipeline_version: pipeline.version,
            graph: pipeline.graph.clone(),
            mode,
            status: RunStatus::Pending,
            input_manifest,
            output_artefacts: BTreeMap::new(),
            error_message: None,
            references_released: false,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
        }
    }

    pub fn duration(&self) -> Option<chrono::Duration> {
        Some(self.finished_at? - self.started_at?)
    }
}

/// One node's execution within a run, keyed by `(run_id, node_id)`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRun {
    pub run_id: Uuid,
    pub node_id: String,
    pub feature_name: String,
    pub feature_hash: String,
    pub status: StepStatus,
    pub attempts: u32,
    pub max_attempts: u32,
    /// Resolved inputs, with upstream values shown as artefact references
    #[serde(default)]
    pub inputs: Map<String, Value>,
    pub artefact_hash: Option<String>,
    #[serde(default)]
    pub stdout: String,
    #[serde(default)]
    pub stderr: String,
    pub exit_code: Option<i32>,
    pub error: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl StepRun {
    pub fn new(
        run_id: Uuid,
        node_id: impl Into<String>,
        feature_name: impl Into<String>,
        feature_hash: impl Into<String>,
        max_attempts: u32,
    ) -> Self {
        Self {
            run_id,
            node_id: node_id.into(),
            feature_name: feature_name.into(),
            feature_hash: feature_hash.into(),
            status: StepStatus::Pending,
            attempts: 0,
            max_attempts: max_attempts.max(1),
            inputs: Map::new(),
            artefact_hash: None,
            stdout: String::new(),
            stderr: String::new(),
            exit_code: None,
            error: None,
            started_at: None,
            finished_at: None,
        }
    }

    pub fn duration(&self) -> Option<chrono::Duration> {
        Some(self.finished_at? - self.started_at?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_manifest_values_distinguish_artefact_references() {
        let manifest: InputManifest = serde_json::from_value(json!({
            "load": {
                "path": "data.csv",
                "threshold": 0.5,
                "previous": {"artefact": "abc123"},
                "options": {"artefact": "abc123", "extra": true}
            }
        }))
        .unwrap();

        let bindings = &manifest["load"];
        assert_eq!(bindings["path"], ManifestValue::Literal(json!("data.csv")));
        assert_eq!(bindings["threshold"], ManifestValue::Literal(json!(0.5)));
        assert_eq!(bindings["previous"], ManifestValue::artefact("abc123"));
        assert_eq!(
            bindings["options"],
            ManifestValue::Literal(json!({"artefact": "abc123", "extra": true}))
        );
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(
            serde_json::to_value(StepStatus::Skipped).unwrap(),
            json!("SKIPPED")
        );
        assert_eq!(
            serde_json::from_value::<RunStatus>(json!("CANCELLED")).unwrap(),
            RunStatus::Cancelled
        );
        assert!(RunStatus::Failed.is_terminal());
        assert!(!StepStatus::Running.is_terminal());
    }

    #[test]
    fn test_step_attempt_ceiling_is_at_least_one() {
        let step = StepRun::new(Uuid::new_v4(), "a", "feature", "hash", 0);
        assert_eq!(step.max_attempts, 1);
        assert_eq!(step.status, StepStatus::Pending);
    }

    #[test]
    fn test_run_mode_parse() {
        assert_eq!("async".parse::<RunMode>().unwrap(), RunMode::Async);
        assert!("parallel".parse::<RunMode>().is_err());
    }
}
