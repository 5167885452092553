// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde_json::{Map, Value};

use crate::errors::FeatureError;
use crate::pipeline::DEFAULT_IN_PORT;
use crate::traits::Feature;

/// Returns the default input port's value, or every input as an object.
pub struct IdentityFeature;

impl Feature for IdentityFeature {
    fn invoke(&self, inputs: &Map<String, Value>) -> Result<Value, FeatureError> {
        match inputs.get(DEFAULT_IN_PORT) {
            Some(value) if inputs.len() == 1 => Ok(value.clone()),
            _ => Ok(Value::Object(inputs.clone())),
        }
    }

    fn name(&self) -> &'static str {
        "identity"
    }
}
