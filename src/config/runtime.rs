// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::Arc;

use crate::config::Config;
use crate::engine::{OrchestratorOptions, RunOrchestrator, TokioJobQueue};
use crate::errors::RuntimeError;
use crate::features::FsFeatureCatalog;
use crate::model::RunMode;
use crate::sandbox::{SandboxExecutor, SandboxSettings};
use crate::storage::{ArtefactStore, RecordStore, SledRecordStore};

/// The wired-up services a process needs to validate, run and clean up
/// pipelines.
pub struct Runtime {
    pub records: Arc<SledRecordStore>,
    pub artefacts: Arc<ArtefactStore>,
    pub catalog: Arc<FsFeatureCatalog>,
    pub orchestrator: Arc<RunOrchestrator>,
    pub default_mode: RunMode,
    pub retention: chrono::Duration,
}

impl Runtime {
    /// Flush the record store to disk
    pub fn flush(&self) -> Result<(), RuntimeError> {
        self.records.flush()?;
        Ok(())
    }
}

/// Builds a [`Runtime`] from configuration.
///
/// # Examples
///
/// ```
/// use featurepipe::config::{Config, RuntimeBuilder};
///
/// let dir = tempfile::tempdir()?;
/// let yaml = format!("storage:\n  root: {}\n", dir.path().display());
/// let config: Config = serde_yaml::from_str(&yaml)?;
///
/// let runtime = RuntimeBuilder::from_config(&config)?;
/// assert_eq!(runtime.retention, chrono::Duration::days(30));
/// assert!(dir.path().join("records").exists());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct RuntimeBuilder;

impl RuntimeBuilder {
    /// Open the record store, artefact store and feature catalog under the
    /// configured storage root and connect them to a sandboxed orchestrator.
    pub fn from_config(config: &Config) -> Result<Runtime, RuntimeError> {
        config.validate()?;

        let records = Arc::new(SledRecordStore::open(config.storage.get_records_dir())?);
        let shared: Arc<dyn RecordStore> = records.clone();

        let artefacts = Arc::new(ArtefactStore::open(&config.storage, Arc::clone(&shared))?);
        let catalog = Arc::new(FsFeatureCatalog::open(
            config.features.get_catalog_dir(&config.storage),
        )?);

        let executor = Arc::new(SandboxExecutor::new(SandboxSettings::from_config(config)?));
        let queue = Arc::new(TokioJobQueue::from_options(&config.executor_options));

        let orchestrator = Arc::new(RunOrchestrator::new(
            shared,
            Arc::clone(&artefacts),
            catalog.clone(),
            executor,
            queue,
            OrchestratorOptions::from_config(config),
        ));

        Ok(Runtime {
            records,
            artefacts,
            catalog,
            orchestrator,
            default_mode: config.executor_options.get_default_mode(),
            retention: chrono::Duration::days(i64::from(config.storage.get_retention_days())),
        })
    }
}
