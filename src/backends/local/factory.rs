// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde_json::{Map, Value};
use std::sync::Arc;

use super::processors::*;
use crate::errors::FeatureError;
use crate::traits::Feature;

/// Factory for built-in (in-process) feature implementations
pub struct LocalFeatureFactory;

impl LocalFeatureFactory {
    /// Create a built-in feature from its manifest entry.
    ///
    /// The `processor` name determines which implementation to create:
    /// - "identity" -> IdentityFeature
    /// - "reverse" -> ReverseTextFeature
    /// - "uppercase" / "lowercase" / "proper_case" / "title_case" -> ChangeTextCaseFeature
    /// - "token_count" -> TokenCounterFeature
    /// - "word_frequency" -> WordFrequencyFeature
    /// - "prefix_suffix" -> PrefixSuffixFeature (reads `prefix` and `suffix` options)
    /// - "sum" -> SumFeature
    pub fn create_feature(
        processor: &str,
        options: &Map<String, Value>,
    ) -> Result<Arc<dyn Feature>, FeatureError> {
        match processor {
            "identity" => Ok(Arc::new(IdentityFeature)),

            // Text manipulation
            "reverse" => Ok(Arc::new(ReverseTextFeature)),
            "uppercase" => Ok(Arc::new(ChangeTextCaseFeature::upper())),
            "lowercase" => Ok(Arc::new(ChangeTextCaseFeature::lower())),
            "proper_case" => Ok(Arc::new(ChangeTextCaseFeature::proper())),
            "title_case" => Ok(Arc::new(ChangeTextCaseFeature::title())),
            "prefix_suffix" => Ok(Arc::new(PrefixSuffixFeature::from_options(options)?)),

            // Analysis
            "token_count" => Ok(Arc::new(TokenCounterFeature)),
            "word_frequency" => Ok(Arc::new(WordFrequencyFeature)),

            // Numeric
            "sum" => Ok(Arc::new(SumFeature)),

            _ => Err(FeatureError::UnknownImplementation {
                name: processor.to_string(),
            }),
        }
    }

    /// List all available built-in implementations
    pub fn list_available_implementations() -> Vec<&'static str> {
        vec![
            "identity",
            "reverse",
            "uppercase",
            "lowercase",
            "proper_case",
            "title_case",
            "prefix_suffix",
            "token_count",
            "word_frequency",
            "sum",
        ]
    }

    /// Check if an implementation is available
    pub fn is_implementation_available(processor: &str) -> bool {
        Self::list_available_implementations().contains(&processor)
    }
}
