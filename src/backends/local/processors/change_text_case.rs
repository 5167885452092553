// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::text_input;
use crate::errors::FeatureError;
use crate::traits::Feature;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TextCase {
    Upper,
    Lower,
    Proper,
    Title,
}

const TITLE_SMALL_WORDS: &[&str] = &[
    "a", "an", "the", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
];

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
    }
}

pub struct ChangeTextCaseFeature {
    case: TextCase,
}

impl ChangeTextCaseFeature {
    pub fn new(case: TextCase) -> Self {
        Self { case }
    }

    pub fn upper() -> Self {
        Self::new(TextCase::Upper)
    }

    pub fn lower() -> Self {
        Self::new(TextCase::Lower)
    }

    pub fn proper() -> Self {
        Self::new(TextCase::Proper)
    }

    pub fn title() -> Self {
        Self::new(TextCase::Title)
    }

    fn convert(&self, input: &str) -> String {
        match self.case {
            TextCase::Upper => input.to_uppercase(),
            TextCase::Lower => input.to_lowercase(),
            TextCase::Proper => input
                .split_whitespace()
                .map(capitalize)
                .collect::<Vec<_>>()
                .join(" "),
            TextCase::Title => input
                .split_whitespace()
                .enumerate()
                .map(|(i, word)| {
                    let lower = word.to_lowercase();
                    // First word is always capitalized
                    if i == 0 || !TITLE_SMALL_WORDS.contains(&lower.as_str()) {
                        capitalize(word)
                    } else {
                        lower
                    }
                })
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

impl Feature for ChangeTextCaseFeature {
    fn invoke(&self, inputs: &Map<String, Value>) -> Result<Value, FeatureError> {
        let input = text_input(inputs)?;
        Ok(Value::String(self.convert(&input)))
    }

    fn name(&self) -> &'static str {
        match self.case {
            TextCase::Upper => "uppercase",
            TextCase::Lower => "lowercase",
            TextCase::Proper => "proper_case",
            TextCase::Title => "title_case",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_case_keeps_small_words_lower() {
        let feature = ChangeTextCaseFeature::title();
        assert_eq!(
            feature.convert("the lord OF the rings"),
            "The Lord of the Rings"
        );
    }

    #[test]
    fn test_proper_case_capitalizes_every_word() {
        let feature = ChangeTextCaseFeature::proper();
        assert_eq!(feature.convert("hELLO   wORLD"), "Hello World");
    }
}
