// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Process isolation for feature invocations.
//!
//! The parent ([`executor::SandboxExecutor`]) stages `inputs.json` in a
//! private directory and spawns a child with
//! `<feature_hash> <inputs_path> <output_path>` as trailing arguments. The
//! child ([`child::run_child`]) resolves the feature by hash from the
//! catalog, invokes it and writes `output.json`. Exit status, stdout and
//! stderr travel back as a [`CapturedOutput`].

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub mod child;
pub mod executor;

pub use child::run_child;
pub use executor::{SandboxExecutor, SandboxSettings};

pub const INPUTS_FILE: &str = "inputs.json";
pub const OUTPUT_FILE: &str = "output.json";

/// Memory ceiling hint handed to the child, in megabytes
pub const MEMORY_LIMIT_ENV: &str = "FEATUREPIPE_MEMORY_LIMIT_MB";
/// Set in the child's environment so it knows it is sandboxed
pub const SANDBOX_ENV: &str = "FEATUREPIPE_SANDBOX";
/// The parent's wall-clock limit for the child, in milliseconds
pub const TIMEOUT_ENV: &str = "FEATUREPIPE_TIMEOUT_MS";

/// The limit the parent set for this process, when running as a sandbox
/// child.
pub fn timeout_from_env() -> Option<Duration> {
    std::env::var(TIMEOUT_ENV)
        .ok()?
        .parse()
        .ok()
        .map(Duration::from_millis)
}

/// What the child printed and how it exited
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CapturedOutput {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the child was killed by a signal or never exited
    pub exit_code: Option<i32>,
    pub duration_ms: u64,
}

/// A successful invocation: the serialized result plus captured output
#[derive(Debug, Clone)]
pub struct SandboxOutput {
    pub result: Vec<u8>,
    pub captured: CapturedOutput,
}
