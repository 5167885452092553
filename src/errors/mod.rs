// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod artefact;
mod config;
mod feature;
mod orchestrator;
mod sandbox;
mod scheduling;
mod store;
mod validation;

pub use artefact::{ArtefactError, StorageInconsistency};
pub use config::{ConfigError, RuntimeError};
pub use feature::FeatureError;
pub use orchestrator::{DependencyUnsatisfied, OrchestratorError};
pub use sandbox::SandboxError;
pub use scheduling::SchedulingError;
pub use store::StoreError;
pub use validation::{ValidationError, ValidationWarning};
