// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::Serialize;
use serde_json::{Map, Value};

use super::text_input;
use crate::errors::FeatureError;
use crate::traits::Feature;

/// Token Counter feature - counts characters, words and lines
pub struct TokenCounterFeature;

#[derive(Debug, Serialize)]
struct TokenCounts {
    char_count: usize,
    word_count: usize,
    line_count: usize,
}

impl Feature for TokenCounterFeature {
    fn invoke(&self, inputs: &Map<String, Value>) -> Result<Value, FeatureError> {
        let input = text_input(inputs)?;
        let counts = TokenCounts {
            char_count: input.chars().count(),
            word_count: input.split_whitespace().count(),
            line_count: input.lines().count().max(1), // At least 1 line even if empty
        };
        Ok(serde_json::to_value(counts)?)
    }

    fn name(&self) -> &'static str {
        "token_count"
    }
}
