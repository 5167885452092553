// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use crate::errors::SandboxError;
use crate::sandbox::{CapturedOutput, SandboxOutput};
use crate::traits::StepExecutor;

/// What the stub does when asked to run a given feature hash
#[derive(Debug, Clone)]
pub enum StubBehavior {
    /// Return the inputs object unchanged
    Echo,
    /// Return a fixed value
    Constant(Value),
    /// Exit nonzero with this stderr on every call
    Fail(String),
    /// Fail the first `n` calls, then echo
    FailTimes(u32),
    /// Sleep, then echo
    Slow(Duration),
}

/// In-process stand-in for the sandbox executor.
///
/// Unknown hashes echo their inputs.
#[derive(Default)]
pub struct StubExecutor {
    behaviors: Mutex<HashMap<String, StubBehavior>>,
    calls: Mutex<HashMap<String, u32>>,
}

impl StubExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, feature_hash: impl Into<String>, behavior: StubBehavior) -> Self {
        self.set(feature_hash, behavior);
        self
    }

    pub fn set(&self, feature_hash: impl Into<String>, behavior: StubBehavior) {
        self.behaviors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(feature_hash.into(), behavior);
    }

    /// How many times `feature_hash` was executed
    pub fn calls(&self, feature_hash: &str) -> u32 {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(feature_hash)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_calls(&self) -> u32 {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .sum()
    }
}

fn succeed(value: &Value) -> Result<SandboxOutput, SandboxError> {
    Ok(SandboxOutput {
        result: serde_json::to_vec(value)?,
        captured: CapturedOutput {
            stdout: "stub ok\n".to_string(),
            exit_code: Some(0),
            ..CapturedOutput::default()
        },
    })
}

fn fail(message: &str) -> Result<SandboxOutput, SandboxError> {
    Err(SandboxError::NonZeroExit {
        code: Some(1),
        captured: CapturedOutput {
            stderr: message.to_string(),
            exit_code: Some(1),
            ..CapturedOutput::default()
        },
    })
}

#[async_trait]
impl StepExecutor for StubExecutor {
    async fn execute(
        &self,
        feature_hash: &str,
        inputs: &Map<String, Value>,
    ) -> Result<SandboxOutput, SandboxError> {
        let call = {
            let mut calls = self.calls.lock().unwrap_or_else(PoisonError::into_inner);
            let count = calls.entry(feature_hash.to_string()).or_insert(0);
            *count += 1;
            *count
        };
        let behavior = self
            .behaviors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(feature_hash)
            .cloned()
            .unwrap_or(StubBehavior::Echo);

        let echo = Value::Object(inputs.clone());
        match behavior {
            StubBehavior::Echo => succeed(&echo),
            StubBehavior::Constant(value) => succeed(&value),
            StubBehavior::Fail(message) => fail(&message),
            StubBehavior::FailTimes(n) if call <= n => {
                fail(&format!("simulated failure {} of {}", call, n))
            }
            StubBehavior::FailTimes(_) => succeed(&echo),
            StubBehavior::Slow(delay) => {
                tokio::time::sleep(delay).await;
                succeed(&echo)
            }
        }
    }

    fn name(&self) -> &'static str {
        "stub"
    }
}
