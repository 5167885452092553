// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::FeatureError;
use crate::utils::sha256_hex;

fn default_port_type() -> String {
    "any".to_string()
}

/// A declared input or output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortSpec {
    pub name: String,
    #[serde(rename = "type", default = "default_port_type")]
    pub kind: String,
}

impl PortSpec {
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
        }
    }
}

/// How the sandbox child turns a feature into a callable unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeatureEntry {
    /// One of the built-in implementations in `backends::local`
    Builtin {
        processor: String,
        #[serde(default, skip_serializing_if = "Map::is_empty")]
        options: Map<String, Value>,
    },
    /// An external program given `<inputs.json> <output.json>`
    Command {
        program: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        args: Vec<String>,
    },
}

/// The packaged form of a feature, before it is content-addressed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureManifest {
    pub name: String,
    #[serde(default)]
    pub inputs: Vec<PortSpec>,
    pub output: PortSpec,
    pub entry: FeatureEntry,
}

impl FeatureManifest {
    pub fn builtin(name: impl Into<String>, processor: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inputs: Vec::new(),
            output: PortSpec::new("result", "any"),
            entry: FeatureEntry::Builtin {
                processor: processor.into(),
                options: Map::new(),
            },
        }
    }

    pub fn with_input(mut self, name: impl Into<String>, kind: impl Into<String>) -> Self {
        self.inputs.push(PortSpec::new(name, kind));
        self
    }

    /// SHA-256 of the manifest's canonical JSON. Field order is fixed by the
    /// struct layout and option maps are sorted, so equal manifests hash
    /// equally.
    pub fn content_hash(&self) -> Result<String, FeatureError> {
        let canonical = serde_json::to_vec(self)?;
        Ok(sha256_hex(&canonical))
    }
}

/// A published, immutable feature version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    pub hash: String,
    #[serde(flatten)]
    pub manifest: FeatureManifest,
    pub version: u32,
    pub previous_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl FeatureRecord {
    pub fn name(&self) -> &str {
        &self.manifest.name
    }

    pub fn input_names(&self) -> impl Iterator<Item = &str> {
        self.manifest.inputs.iter().map(|port| port.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_content_hash_is_stable() {
        let a = FeatureManifest::builtin("shout", "uppercase").with_input("text", "string");
        let b = FeatureManifest::builtin("shout", "uppercase").with_input("text", "string");

        let hash = a.content_hash().unwrap();
        assert_eq!(hash, b.content_hash().unwrap());
        assert_eq!(hash.len(), 64);
    }

    #[test]
    fn test_content_hash_changes_with_entry() {
        let upper = FeatureManifest::builtin("shout", "uppercase");
        let lower = FeatureManifest::builtin("shout", "lowercase");
        assert_ne!(upper.content_hash().unwrap(), lower.content_hash().unwrap());
    }

    #[test]
    fn test_manifest_document_format() {
        let manifest: FeatureManifest = serde_json::from_value(json!({
            "name": "wrap",
            "inputs": [{"name": "text", "type": "string"}, {"name": "extra"}],
            "output": {"name": "wrapped", "type": "string"},
            "entry": {"kind": "builtin", "processor": "prefix_suffix", "options": {"prefix": "<"}}
        }))
        .unwrap();

        assert_eq!(manifest.inputs[1].kind, "any");
        match &manifest.entry {
            FeatureEntry::Builtin { processor, options } => {
                assert_eq!(processor, "prefix_suffix");
                assert_eq!(options["prefix"], json!("<"));
            }
            other => panic!("Expected builtin entry, got {:?}", other),
        }

        let command: FeatureEntry = serde_json::from_value(json!({
            "kind": "command", "program": "/usr/bin/env", "args": ["python3", "f.py"]
        }))
        .unwrap();
        assert!(matches!(command, FeatureEntry::Command { .. }));
    }
}
