use serde_json::{Map, Value};

use crate::errors::FeatureError;

/// A loaded, invocable unit of computation.
///
/// Features run inside the sandbox child, so invocation is synchronous.
pub trait Feature: Send + Sync {
    fn invoke(&self, inputs: &Map<String, Value>) -> Result<Value, FeatureError>;

    fn name(&self) -> &'static str;
}
