// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde_json::{Map, Value};

use super::text_input;
use crate::errors::FeatureError;
use crate::traits::Feature;

/// Reverse Text feature - reverses the input string
pub struct ReverseTextFeature;

impl Feature for ReverseTextFeature {
    fn invoke(&self, inputs: &Map<String, Value>) -> Result<Value, FeatureError> {
        let input = text_input(inputs)?;
        Ok(Value::String(input.chars().rev().collect()))
    }

    fn name(&self) -> &'static str {
        "reverse"
    }
}
