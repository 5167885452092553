// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for sandbox child process events.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::time::Duration;
use tracing::Span;

/// Child process spawned for a feature invocation.
///
/// # Log Level
/// `debug!`
pub struct ChildSpawned<'a> {
    pub feature_hash: &'a str,
    pub program: &'a Path,
    pub staging: &'a Path,
    pub timeout: Duration,
}

impl Display for ChildSpawned<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Spawned {} for feature {} in {} (timeout {:?})",
            self.program.display(),
            self.feature_hash,
            self.staging.display(),
            self.timeout
        )
    }
}

impl StructuredLog for ChildSpawned<'_> {
    fn log(&self) {
        tracing::debug!(
            feature_hash = self.feature_hash,
            program = %self.program.display(),
            staging = %self.staging.display(),
            timeout_ms = self.timeout.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "sandbox",
            span_name = name,
            feature_hash = self.feature_hash,
        )
    }
}

/// Child exited on its own.
///
/// # Log Level
/// `debug!` on success, `warn!` on a nonzero exit
pub struct ChildExited<'a> {
    pub feature_hash: &'a str,
    pub exit_code: Option<i32>,
    pub duration: Duration,
}

impl Display for ChildExited<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self.exit_code {
            Some(code) => write!(
                f,
                "Sandbox child for {} exited with code {} after {:?}",
                self.feature_hash, code, self.duration
            ),
            None => write!(
                f,
                "Sandbox child for {} terminated by signal after {:?}",
                self.feature_hash, self.duration
            ),
        }
    }
}

impl StructuredLog for ChildExited<'_> {
    fn log(&self) {
        if self.exit_code == Some(0) {
            tracing::debug!(
                feature_hash = self.feature_hash,
                duration_ms = self.duration.as_millis() as u64,
                "{}", self
            );
        } else {
            tracing::warn!(
                feature_hash = self.feature_hash,
                exit_code = ?self.exit_code,
                duration_ms = self.duration.as_millis() as u64,
                "{}", self
            );
        }
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("sandbox_exit", span_name = name, feature_hash = self.feature_hash)
    }
}

/// Child killed after its timeout.
///
/// # Log Level
/// `error!`
pub struct ChildTimedOut<'a> {
    pub feature_hash: &'a str,
    pub timeout: Duration,
}

impl Display for ChildTimedOut<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Sandbox child for {} exceeded {:?} and was killed",
            self.feature_hash, self.timeout
        )
    }
}

impl StructuredLog for ChildTimedOut<'_> {
    fn log(&self) {
        tracing::error!(
            feature_hash = self.feature_hash,
            timeout_ms = self.timeout.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!("sandbox_timeout", span_name = name, feature_hash = self.feature_hash)
    }
}

/// Staging directory kept for inspection.
///
/// # Log Level
/// `info!`
pub struct StagingRetained<'a> {
    pub path: &'a Path,
}

impl Display for StagingRetained<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Keeping staging directory {}", self.path.display())
    }
}

impl StructuredLog for StagingRetained<'_> {
    fn log(&self) {
        tracing::info!(path = %self.path.display(), "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("staging", span_name = name)
    }
}
