// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde_json::{Map, Value};

use crate::errors::FeatureError;

pub mod change_text_case;
pub mod identity;
pub mod prefix_suffix;
pub mod reverse_text;
pub mod sum;
pub mod token_counter;
pub mod word_frequency;

pub use change_text_case::*;
pub use identity::*;
pub use prefix_suffix::*;
pub use reverse_text::*;
pub use sum::*;
pub use token_counter::*;
pub use word_frequency::*;

/// The text a text feature works on: the `text` input, else the default
/// `input` port, else the only input given. Non-string values are rendered
/// as JSON.
pub(crate) fn text_input(inputs: &Map<String, Value>) -> Result<String, FeatureError> {
    let value = inputs
        .get("text")
        .or_else(|| inputs.get(crate::pipeline::DEFAULT_IN_PORT))
        .or_else(|| match inputs.len() {
            1 => inputs.values().next(),
            _ => None,
        })
        .ok_or_else(|| FeatureError::MissingInput {
            name: "text".to_string(),
        })?;

    Ok(match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    })
}
