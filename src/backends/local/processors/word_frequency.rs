// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde_json::{Map, Value};
use std::collections::BTreeMap;

use super::text_input;
use crate::errors::FeatureError;
use crate::traits::Feature;

/// Word Frequency feature - counts normalized word occurrences
pub struct WordFrequencyFeature;

impl WordFrequencyFeature {
    fn count(input: &str) -> BTreeMap<String, usize> {
        let mut word_counts = BTreeMap::new();
        for word in input.split_whitespace() {
            let normalized = word
                .chars()
                .filter(|c| c.is_alphanumeric())
                .collect::<String>()
                .to_lowercase();

            if !normalized.is_empty() {
                *word_counts.entry(normalized).or_insert(0) += 1;
            }
        }
        word_counts
    }
}

impl Feature for WordFrequencyFeature {
    fn invoke(&self, inputs: &Map<String, Value>) -> Result<Value, FeatureError> {
        let input = text_input(inputs)?;
        Ok(serde_json::to_value(Self::count(&input))?)
    }

    fn name(&self) -> &'static str {
        "word_frequency"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_punctuation_and_case_are_normalized() {
        let counts = WordFrequencyFeature::count("The cat, the HAT. the!");
        assert_eq!(counts["the"], 3);
        assert_eq!(counts["cat"], 1);
        assert_eq!(counts.len(), 3);
    }
}
