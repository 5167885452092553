// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::time::Duration;
use thiserror::Error;

use crate::sandbox::CapturedOutput;

/// Step-level failures of a sandboxed invocation. Captured output is
/// attached whenever the child got as far as running.
#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("Feature execution timed out after {timeout:?}")]
    Timeout {
        timeout: Duration,
        captured: CapturedOutput,
    },

    #[error("Feature execution failed with exit code {code:?}: {}", stderr_excerpt(.captured))]
    NonZeroExit {
        code: Option<i32>,
        captured: CapturedOutput,
    },

    #[error("Output file not created by sandbox child")]
    NoOutput { captured: CapturedOutput },

    #[error("Failed to prepare staging directory: {0}")]
    Staging(#[source] std::io::Error),

    #[error("Failed to spawn sandbox child: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("Failed to serialize feature inputs: {0}")]
    Serialization(#[from] serde_json::Error),
}

fn stderr_excerpt(captured: &CapturedOutput) -> &str {
    captured.stderr.trim()
}

impl SandboxError {
    pub fn captured(&self) -> Option<&CapturedOutput> {
        match self {
            SandboxError::Timeout { captured, .. }
            | SandboxError::NonZeroExit { captured, .. }
            | SandboxError::NoOutput { captured } => Some(captured),
            _ => None,
        }
    }
}
