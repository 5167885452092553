// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Persistent records: pipelines, runs, steps and artefact metadata.

pub mod artefact;
pub mod pipeline;
pub mod run;

pub use artefact::ArtefactMeta;
pub use pipeline::Pipeline;
pub use run::{
    ArtefactRef, InputManifest, ManifestValue, PipelineRun, RunMode, RunStatus, StepRun,
    StepStatus,
};
