// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::Deserialize;
use serde_json::{Map, Value};

use super::text_input;
use crate::errors::FeatureError;
use crate::traits::Feature;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PrefixSuffixConfig {
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub suffix: Option<String>,
}

/// Prefix/Suffix feature - wraps the input text
pub struct PrefixSuffixFeature {
    config: PrefixSuffixConfig,
}

impl PrefixSuffixFeature {
    pub fn new(config: PrefixSuffixConfig) -> Self {
        Self { config }
    }

    /// Build from manifest options; missing options leave that side bare.
    pub fn from_options(options: &Map<String, Value>) -> Result<Self, FeatureError> {
        let config = serde_json::from_value(Value::Object(options.clone())).map_err(|e| {
            FeatureError::InvalidInput {
                name: "options".to_string(),
                reason: e.to_string(),
            }
        })?;
        Ok(Self::new(config))
    }

    pub fn with_prefix_and_suffix(prefix: String, suffix: String) -> Self {
        Self::new(PrefixSuffixConfig {
            prefix: Some(prefix),
            suffix: Some(suffix),
        })
    }
}

impl Feature for PrefixSuffixFeature {
    fn invoke(&self, inputs: &Map<String, Value>) -> Result<Value, FeatureError> {
        let input = text_input(inputs)?;
        let mut result = String::new();
        if let Some(prefix) = &self.config.prefix {
            result.push_str(prefix);
        }
        result.push_str(&input);
        if let Some(suffix) = &self.config.suffix {
            result.push_str(suffix);
        }
        Ok(Value::String(result))
    }

    fn name(&self) -> &'static str {
        "prefix_suffix"
    }
}
