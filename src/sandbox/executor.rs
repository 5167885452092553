// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;

use super::{
    CapturedOutput, SandboxOutput, INPUTS_FILE, MEMORY_LIMIT_ENV, OUTPUT_FILE, SANDBOX_ENV,
    TIMEOUT_ENV,
};
use crate::config::{Config, SandboxConfig};
use crate::errors::{ConfigError, SandboxError};
use crate::observability::messages::{sandbox::*, StructuredLog};
use crate::traits::StepExecutor;

const STAGING_PREFIX: &str = "featurepipe_exec_";

/// How long to wait for pipe readers once the child is gone. A grandchild
/// that inherited the pipes can keep them open past a kill.
const STREAM_GRACE: Duration = Duration::from_secs(2);

/// Resolved sandbox configuration
#[derive(Debug, Clone)]
pub struct SandboxSettings {
    pub program: PathBuf,
    /// Placed before the trailing `<hash> <inputs> <output>` arguments
    pub args: Vec<String>,
    pub timeout: Duration,
    pub memory_limit_mb: u64,
    pub staging_dir: Option<PathBuf>,
    pub keep_staging: bool,
}

impl SandboxSettings {
    /// Settings that run `program args..` directly, with config defaults for
    /// everything else.
    pub fn for_program(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        let defaults = SandboxConfig::default();
        Self {
            program: program.into(),
            args,
            timeout: defaults.get_timeout(),
            memory_limit_mb: defaults.get_memory_limit_mb(),
            staging_dir: None,
            keep_staging: false,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Resolve from configuration. Without an explicit program the current
    /// executable is re-entered in `sandbox-child` mode against the
    /// configured catalog.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let sandbox = &config.sandbox;
        let (program, args) = match &sandbox.program {
            Some(program) => (program.clone(), sandbox.args.clone().unwrap_or_default()),
            None => {
                let program = std::env::current_exe()?;
                let catalog = config.features.get_catalog_dir(&config.storage);
                let args = vec![
                    "sandbox-child".to_string(),
                    "--catalog".to_string(),
                    catalog.display().to_string(),
                ];
                (program, args)
            }
        };

        Ok(Self {
            program,
            args,
            timeout: sandbox.get_timeout(),
            memory_limit_mb: sandbox.get_memory_limit_mb(),
            staging_dir: sandbox.staging_dir.clone(),
            keep_staging: sandbox.keep_staging,
        })
    }
}

/// Runs each feature invocation in its own child process.
pub struct SandboxExecutor {
    settings: SandboxSettings,
}

impl SandboxExecutor {
    pub fn new(settings: SandboxSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &SandboxSettings {
        &self.settings
    }

    fn stage(&self) -> Result<TempDir, SandboxError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(STAGING_PREFIX);
        match &self.settings.staging_dir {
            Some(dir) => {
                std::fs::create_dir_all(dir).map_err(SandboxError::Staging)?;
                builder.tempdir_in(dir)
            }
            None => builder.tempdir(),
        }
        .map_err(SandboxError::Staging)
    }

    fn finish(&self, staging: TempDir) {
        if self.settings.keep_staging {
            let path = staging.keep();
            StagingRetained { path: &path }.log();
        }
        // Dropping the TempDir removes it
    }

    async fn run_child(
        &self,
        feature_hash: &str,
        staging: &Path,
    ) -> Result<SandboxOutput, SandboxError> {
        let input_path = staging.join(INPUTS_FILE);
        let output_path = staging.join(OUTPUT_FILE);

        let mut command = Command::new(&self.settings.program);
        command
            .args(&self.settings.args)
            .arg(feature_hash)
            .arg(&input_path)
            .arg(&output_path)
            .current_dir(staging)
            .env(SANDBOX_ENV, "1")
            .env(MEMORY_LIMIT_ENV, self.settings.memory_limit_mb.to_string())
            .env(TIMEOUT_ENV, self.settings.timeout.as_millis().to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let started = Instant::now();
        let mut child = command.spawn().map_err(SandboxError::Spawn)?;

        ChildSpawned {
            feature_hash,
            program: &self.settings.program,
            staging,
            timeout: self.settings.timeout,
        }
        .log();

        let stdout = tokio::spawn(drain(child.stdout.take()));
        let stderr = tokio::spawn(drain(child.stderr.take()));

        let status = match tokio::time::timeout(self.settings.timeout, child.wait()).await {
            Ok(waited) => Some(waited.map_err(SandboxError::Spawn)?),
            Err(_) => {
                // Already-exited children make kill fail; either way it is gone.
                // Programs the child started enforce their own, shorter limit.
                let _ = child.kill().await;
                None
            }
        };

        let duration = started.elapsed();
        let captured = CapturedOutput {
            stdout: collect(stdout).await,
            stderr: collect(stderr).await,
            exit_code: status.and_then(|s| s.code()),
            duration_ms: duration.as_millis() as u64,
        };

        let status = match status {
            Some(status) => status,
            None => {
                ChildTimedOut {
                    feature_hash,
                    timeout: self.settings.timeout,
                }
                .log();
                return Err(SandboxError::Timeout {
                    timeout: self.settings.timeout,
                    captured,
                });
            }
        };

        ChildExited {
            feature_hash,
            exit_code: status.code(),
            duration,
        }
        .log();

        if !status.success() {
            return Err(SandboxError::NonZeroExit {
                code: status.code(),
                captured,
            });
        }

        match tokio::fs::read(&output_path).await {
            Ok(result) => Ok(SandboxOutput { result, captured }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(SandboxError::NoOutput { captured })
            }
            Err(e) => Err(SandboxError::Staging(e)),
        }
    }
}

async fn drain<R>(reader: Option<R>) -> String
where
    R: AsyncRead + Unpin,
{
    let mut buffer = Vec::new();
    if let Some(mut reader) = reader {
        // A read error just truncates what was captured
        let _ = reader.read_to_end(&mut buffer).await;
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

async fn collect(handle: JoinHandle<String>) -> String {
    match tokio::time::timeout(STREAM_GRACE, handle).await {
        Ok(Ok(text)) => text,
        _ => String::new(),
    }
}

#[async_trait]
impl StepExecutor for SandboxExecutor {
    async fn execute(
        &self,
        feature_hash: &str,
        inputs: &Map<String, Value>,
    ) -> Result<SandboxOutput, SandboxError> {
        let staging = self.stage()?;
        let payload = serde_json::to_vec(inputs)?;

        let outcome = match tokio::fs::write(staging.path().join(INPUTS_FILE), payload).await {
            Ok(()) => self.run_child(feature_hash, staging.path()).await,
            Err(e) => Err(SandboxError::Staging(e)),
        };

        self.finish(staging);
        outcome
    }

    fn name(&self) -> &'static str {
        "sandbox"
    }
}
