// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

/// Errors from feature packaging, lookup and invocation
#[derive(Debug, Error)]
pub enum FeatureError {
    #[error("Feature not found: {reference}")]
    NotFound { reference: String },

    #[error("Unknown feature implementation: '{name}'")]
    UnknownImplementation { name: String },

    #[error("Missing input '{name}'")]
    MissingInput { name: String },

    #[error("Invalid input '{name}': {reason}")]
    InvalidInput { name: String, reason: String },

    #[error("Command '{program}' exited with code {code:?}: {stderr}")]
    CommandFailed {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Command '{program}' did not finish within {timeout:?} and was killed")]
    CommandTimedOut {
        program: String,
        timeout: std::time::Duration,
    },

    #[error("Feature catalog I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Feature document could not be encoded or decoded: {0}")]
    Codec(#[from] serde_json::Error),
}
