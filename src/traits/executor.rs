use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::errors::SandboxError;
use crate::sandbox::SandboxOutput;

/// Runs one feature invocation and returns its serialized result.
///
/// The sandbox executor is the production implementation; tests substitute
/// the stubs in `backends::stub`.
#[async_trait]
pub trait StepExecutor: Send + Sync {
    async fn execute(
        &self,
        feature_hash: &str,
        inputs: &Map<String, Value>,
    ) -> Result<SandboxOutput, SandboxError>;

    fn name(&self) -> &'static str;
}
