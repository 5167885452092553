// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde_json::{Map, Number, Value};

use crate::errors::FeatureError;
use crate::traits::Feature;

/// Sums every numeric input. Arrays of numbers are summed element-wise into
/// the total.
pub struct SumFeature;

fn add(
    name: &str,
    value: &Value,
    ints: &mut i64,
    floats: &mut f64,
    is_float: &mut bool,
) -> Result<(), FeatureError> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                *ints = ints.checked_add(i).ok_or_else(|| FeatureError::InvalidInput {
                    name: name.to_string(),
                    reason: "integer overflow".to_string(),
                })?;
            } else {
                *is_float = true;
                *floats += n.as_f64().unwrap_or(0.0);
            }
            Ok(())
        }
        Value::Array(items) => items
            .iter()
            .try_for_each(|item| add(name, item, ints, floats, is_float)),
        other => Err(FeatureError::InvalidInput {
            name: name.to_string(),
            reason: format!("expected a number, got {}", other),
        }),
    }
}

impl Feature for SumFeature {
    fn invoke(&self, inputs: &Map<String, Value>) -> Result<Value, FeatureError> {
        let mut ints = 0i64;
        let mut floats = 0.0f64;
        let mut is_float = false;
        for (name, value) in inputs {
            add(name, value, &mut ints, &mut floats, &mut is_float)?;
        }

        if !is_float {
            return Ok(Value::Number(ints.into()));
        }
        let total = ints as f64 + floats;
        Number::from_f64(total)
            .map(Value::Number)
            .ok_or_else(|| FeatureError::InvalidInput {
                name: "sum".to_string(),
                reason: format!("result {} is not a finite number", total),
            })
    }

    fn name(&self) -> &'static str {
        "sum"
    }
}
